// FairMine - app/mod.rs
//
// Application layer: experiment orchestration and artifact output.
// Dependencies: core and platform layers.

pub mod artifacts;
pub mod experiment;
pub mod pipeline;
