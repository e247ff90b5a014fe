// ChatSift - core/mod.rs
//
// Core filtering engine: rule catalog, configuration snapshot, text
// extraction, classification and the chat log container.
// Must NOT depend on: app, platform, or any I/O.

pub mod chat_log;
pub mod classifier;
pub mod extract;
pub mod model;
pub mod rules;
pub mod settings;
