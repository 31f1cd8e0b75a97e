//! # Filter Chain
//!
//! Mastering parameters compile into a typed, ordered list of stages. The
//! engine's textual filter-graph syntax is produced only by
//! [`FilterChainSpec::render`], which validates and escapes every value.

pub mod builder;
pub mod stage;

pub use builder::ChainBuilder;
pub use stage::{FilterChainSpec, ParamValue, Stage, StageKind};
