// FairMine - lib.rs
//
// Library entry point, exposing every layer for the CLI binary and for
// integration testing.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;
