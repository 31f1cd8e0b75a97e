//! # Processing Engine
//!
//! The sample-level work (EQ, compression, widening, loudness normalization,
//! encoding) is delegated to an external engine, `ffmpeg` by default. This
//! module owns the boundary: building invocations, running them on the
//! blocking pool under a timeout, reading back the loudness measurement, and
//! sequencing the two normalization passes.

pub mod ffmpeg;
pub mod format;
pub mod measurement;
pub mod normalizer;

pub use ffmpeg::{AudioEngine, EngineInvocation, EngineOutput, EngineRun, EngineRunner, FfmpegEngine, Pass};
pub use format::OutputFormat;
pub use measurement::{last_json_block, parse_measurement, LoudnessMeasurement, MeasurementError};
pub use normalizer::{NormalizationOutcome, NormalizationReport, NormalizerState, TwoPassNormalizer};
