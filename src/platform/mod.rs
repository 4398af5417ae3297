// FairMine - platform/mod.rs
//
// Platform abstraction layer: configuration files, scoped filesystem
// resources and the external discovery subprocess.
// Must NOT depend on: app.

pub mod config;
pub mod fs;
pub mod split_miner;
