//! # Audio Analysis Module
//!
//! Decoding and measurement of a recording before any mastering decision is
//! made. Everything here works on a fully decoded [`AudioBuffer`].
//!
//! ## Meters
//!
//! - **Loudness**: BS.1770-style gated integrated loudness and loudness range
//! - **True peak**: 4x oversampled peak level
//! - **Spectrum**: 1/3-octave band levels, tonal tilt and sub-bass excess
//! - **Stereo**: mid/side width ratio and inter-channel correlation
//! - **Transients**: percentile of the spectral-flux onset envelope
//!
//! ## Usage
//!
//! ```rust,no_run
//! use auto_master::audio::{AudioAnalyzer, AudioLoader};
//! use auto_master::config::AnalysisConfig;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let buffer = AudioLoader::load("song.wav", &AnalysisConfig::default()).await?;
//! let report = AudioAnalyzer::new().analyze(&buffer)?;
//!
//! println!("Integrated loudness: {:.1} LUFS", report.integrated_lufs);
//! println!("Tilt: {:+.1} dB", report.tilt_db);
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod dsp;
pub mod loader;
pub mod loudness;
pub mod resample;
pub mod spectrum;
pub mod stereo;
pub mod stft;
pub mod transient;
pub mod true_peak;
pub mod types;

pub use analyzer::AudioAnalyzer;
pub use loader::AudioLoader;
pub use loudness::{LoudnessMeter, LoudnessStats};
pub use spectrum::{SpectralAnalyzer, SpectralFeatures};
pub use stereo::{StereoAnalyzer, StereoFeatures};
pub use transient::TransientAnalyzer;
pub use true_peak::TruePeakEstimator;
pub use types::{AnalysisReport, AudioBuffer, BandLevel};
