// ChatSift - app/mod.rs
//
// Application layer: entry state, stream watching, the filter controller,
// and the background I/O feeding it (chat file tail, settings store).
// Dependencies: core layer.

pub mod controller;
pub mod entry_state;
pub mod store;
pub mod tail;
pub mod watcher;
