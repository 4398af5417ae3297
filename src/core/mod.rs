// FairMine - core/mod.rs
//
// Core business logic layer: log model, discovery, conformance, fairness
// statistics and rendering.
// Must NOT depend on: platform or app. Output is written through `Write`
// trait objects or returned as strings; only the log loaders touch files.

pub mod bpmn;
pub mod chart;
pub mod conformance;
pub mod export;
pub mod fairness;
pub mod logfiles;
pub mod mining;
pub mod model;
pub mod outlier;
pub mod petri;
pub mod replay;
pub mod xes;
