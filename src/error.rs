use thiserror::Error;

/// Main error type for the auto-master library
#[derive(Error, Debug)]
pub enum MasteringError {
    #[error("Audio input error: {0}")]
    Audio(#[from] AudioError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Filter chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("Processing engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Errors raised while decoding and preparing the input recording
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Failed to load audio file: {path}")]
    LoadFailed { path: String },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Audio file contains no samples: {path}")]
    Empty { path: String },

    #[error("Audio is silent or empty after trimming silence: {path}")]
    Silent { path: String },

    #[error("Unsupported channel count: {channels} (expected 1 or 2)")]
    UnsupportedChannels { channels: usize },

    #[error("Invalid audio parameters: {details}")]
    InvalidParameters { details: String },
}

/// Errors raised by the measurement stages
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("FFT processing failed: {reason}")]
    Fft { reason: String },

    #[error("Resampling failed: {reason}")]
    Resample { reason: String },

    #[error("Invalid analysis parameters: {details}")]
    InvalidParameters { details: String },
}

/// Errors raised while validating or rendering a filter chain
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Parameter {stage}.{key} is not a finite number")]
    NonFiniteValue { stage: String, key: String },

    #[error("Parameter key {key:?} on stage {stage} contains illegal characters")]
    InvalidKey { stage: String, key: String },

    #[error("Filter chain has no loudness normalizer stage")]
    MissingNormalizer,
}

/// Errors raised by the external audio-processing engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{pass} pass failed (exit code {exit_code:?}):\n{diagnostics}")]
    Failed {
        pass: String,
        exit_code: Option<i32>,
        diagnostics: String,
    },

    #[error("{pass} pass timed out after {seconds}s")]
    TimedOut { pass: String, seconds: u64 },

    #[error("Failed to launch engine {program}: {reason}")]
    LaunchFailed { program: String, reason: String },

    #[error("Engine worker task failed: {reason}")]
    Worker { reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Unknown preset: {kind} {name:?}")]
    UnknownPreset { kind: String, name: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Errors from the per-user session store
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Stale session update for user {user}: expected version {expected}, found {found}")]
    VersionConflict { user: u64, expected: u64, found: u64 },
}

/// Convenience type alias for Results using MasteringError
pub type Result<T> = std::result::Result<T, MasteringError>;

impl MasteringError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Check if this error is recoverable (can be retried)
    ///
    /// Engine failures are never retried automatically; the caller decides.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Audio(AudioError::LoadFailed { .. }) => true,
            Self::Session(SessionError::VersionConflict { .. }) => true,
            _ => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Audio(AudioError::LoadFailed { path }) => {
                format!("Could not load audio file '{}'. Please check the file exists and is a supported format.", path)
            }
            Self::Audio(AudioError::UnsupportedFormat { format }) => {
                format!("Format '{}' is not supported. Send a .wav, .mp3, .flac, .ogg or .m4a file.", format)
            }
            Self::Audio(AudioError::Silent { .. }) | Self::Audio(AudioError::Empty { .. }) => {
                "The file contains no audible audio.".to_string()
            }
            Self::Config(ConfigError::UnknownPreset { kind, name }) => {
                format!("Unknown {} preset '{}'.", kind, name)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            // Engine diagnostics are surfaced verbatim
            _ => self.to_string(),
        }
    }
}
