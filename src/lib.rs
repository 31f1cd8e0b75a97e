//! # Auto-Master
//!
//! Automatic mastering of finished mixes. A recording is measured (loudness,
//! loudness range, true peak, spectral balance, stereo image, transients),
//! the measurements are mapped to mastering parameters without human tuning,
//! and the parameters are compiled into a filter chain that an external
//! engine (`ffmpeg`) renders with two-pass loudness normalization.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use auto_master::{
//!     config::Config,
//!     engine::OutputFormat,
//!     pipeline::{MasterOptions, MasteringMode, MasteringPipeline},
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let pipeline = MasteringPipeline::new(Config::default());
//! let options = MasterOptions {
//!     mode: MasteringMode::Auto,
//!     format: OutputFormat::Wav24,
//!     max_bytes: None,
//! };
//!
//! let outcome = pipeline.master("mix.wav", "mastered.wav", &options).await?;
//! println!("{}", outcome.summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`audio`] - Decoding and measurement, producing an [`AnalysisReport`]
//! - [`mastering`] - Decision engine and named presets
//! - [`chain`] - Typed filter chain and its rendering
//! - [`engine`] - External engine boundary and the two-pass normalizer
//! - [`pipeline`] - End-to-end mastering and before/after comparison
//! - [`session`] - Per-user preferences
//! - [`config`] - Configuration management
//!
//! ## Deciding Without Rendering
//!
//! The analysis and decision layers are pure and can be used on their own:
//!
//! ```rust,no_run
//! use auto_master::{audio::{AudioAnalyzer, AudioLoader}, chain::ChainBuilder, config::Config, mastering::DecisionEngine};
//!
//! # fn main() -> auto_master::Result<()> {
//! let config = Config::default();
//! let buffer = AudioLoader::load_blocking(std::path::Path::new("mix.wav"), &config.analysis)?;
//! let report = AudioAnalyzer::with_config(&config).analyze(&buffer)?;
//! let params = DecisionEngine::new(config.decision.clone()).decide(&report);
//! println!("{}", ChainBuilder::new(config.chain.clone()).build(&params).render()?);
//! # Ok(())
//! # }
//! ```

pub mod audio;
pub mod chain;
pub mod config;
pub mod engine;
pub mod error;
pub mod mastering;
pub mod pipeline;
pub mod session;

// Re-export commonly used types for convenience
pub use crate::{
    audio::AnalysisReport,
    chain::FilterChainSpec,
    config::Config,
    error::{MasteringError, Result},
    mastering::{MasteringParameters, PresetSelection},
    pipeline::MasteringPipeline,
};
