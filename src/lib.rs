// ChatSift - lib.rs
//
// Library entry point, exposing the filtering engine and its application
// layer for integration testing and embedding in other hosts.
//
// The command-line front end lives in `main.rs` and is not part of the
// library surface.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;
