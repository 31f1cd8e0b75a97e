//! # Mastering Decisions
//!
//! Turns measurements into mastering parameters, either automatically through
//! the [`DecisionEngine`] or from named presets through the [`PresetRegistry`].

pub mod decision;
pub mod params;
pub mod presets;

pub use decision::DecisionEngine;
pub use params::{CompressorParams, LoudnessTarget, MasteringParameters, ToneParams};
pub use presets::{suggest_presets, Intensity, PresetRegistry, PresetSelection, PresetTable, Tone};
