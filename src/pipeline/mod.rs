//! # Mastering Pipeline
//!
//! Ties the analysis, decision, chain and engine layers together into a
//! single request: load, analyze, decide, build, render. Also hosts the
//! before/after comparison used to suggest presets from a reference master.

pub mod compare;
pub mod master;

pub use compare::{compare_files, BandDelta, ComparisonReport, MetricDeltas, PresetSuggestion};
pub use master::{MasterOptions, MasteringMode, MasteringOutcome, MasteringPipeline, MasteringPlan, SizedRender};
