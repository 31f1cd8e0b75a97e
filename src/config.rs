use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, Result},
    mastering::presets::PresetTable,
};

/// Main configuration for auto-master
///
/// Every tunable constant of the analysis and decision pipeline lives here so
/// that one deployment always measures and decides the same way.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Decoding and silence trimming
    pub analysis: AnalysisConfig,

    /// Loudness metering (integrated, range, true peak)
    pub loudness: LoudnessConfig,

    /// Spectral, stereo and transient features
    pub spectral: SpectralConfig,

    /// Measurement to parameter mapping
    pub decision: DecisionConfig,

    /// Filter chain rendering
    pub chain: ChainConfig,

    /// External processing engine
    pub engine: EngineConfig,

    /// Named intensity and tone presets for manual mode
    pub presets: PresetTable,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound { path: path.display().to_string() })?;

        let config: Config = toml::from_str(&content)
            .map_err(|_| ConfigError::ParseFailed { path: path.display().to_string() })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidValue {
                key: "config".to_string(),
                value: e.to_string()
            })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.analysis.validate()?;
        self.loudness.validate()?;
        self.spectral.validate()?;
        self.decision.validate()?;
        self.chain.validate()?;
        self.engine.validate()?;
        self.presets.validate()?;
        Ok(())
    }
}

fn invalid(key: &str, value: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

/// Inclusive numeric range used for clamps
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Clamp into the range; NaN maps to `fallback` (itself clamped)
    pub fn clamp(&self, value: f64, fallback: f64) -> f64 {
        if value.is_nan() {
            fallback.clamp(self.min, self.max)
        } else {
            value.clamp(self.min, self.max)
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    fn validate(&self, key: &str) -> Result<()> {
        if !(self.min.is_finite() && self.max.is_finite()) || self.min > self.max {
            return Err(invalid(key, format!("{}..{}", self.min, self.max)).into());
        }
        Ok(())
    }
}

/// Frequency band `[low_hz, high_hz)` used by the spectral features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandRange {
    pub low_hz: f64,
    pub high_hz: f64,
}

impl BandRange {
    pub const fn new(low_hz: f64, high_hz: f64) -> Self {
        Self { low_hz, high_hz }
    }

    fn validate(&self, key: &str) -> Result<()> {
        if !(self.low_hz >= 0.0 && self.low_hz < self.high_hz) {
            return Err(invalid(key, format!("{}-{} Hz", self.low_hz, self.high_hz)).into());
        }
        Ok(())
    }
}

/// Piecewise-linear control curve: `inputs` must be strictly increasing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curve {
    pub inputs: Vec<f64>,
    pub outputs: Vec<f64>,
}

impl Curve {
    pub fn new(inputs: &[f64], outputs: &[f64]) -> Self {
        Self {
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
        }
    }

    fn validate(&self, key: &str) -> Result<()> {
        let increasing = self.inputs.windows(2).all(|w| w[0] < w[1]);
        if self.inputs.is_empty() || self.inputs.len() != self.outputs.len() || !increasing {
            return Err(invalid(key, format!("{:?} -> {:?}", self.inputs, self.outputs)).into());
        }
        Ok(())
    }
}

/// Decoding and trimming settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Every input is resampled to this rate (Hz)
    pub target_sample_rate: u32,

    /// Frames quieter than this many dB below the loudest frame are trimmed
    pub trim_top_db: f64,

    /// RMS frame length used by the trimmer
    pub trim_frame_length: usize,

    /// RMS hop length used by the trimmer
    pub trim_hop_length: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 48_000,
            trim_top_db: 40.0,
            trim_frame_length: 2048,
            trim_hop_length: 512,
        }
    }
}

impl AnalysisConfig {
    fn validate(&self) -> Result<()> {
        if !(8_000..=384_000).contains(&self.target_sample_rate) {
            return Err(invalid("analysis.target_sample_rate", self.target_sample_rate).into());
        }
        if self.trim_top_db <= 0.0 {
            return Err(invalid("analysis.trim_top_db", self.trim_top_db).into());
        }
        if self.trim_hop_length == 0 || self.trim_hop_length > self.trim_frame_length {
            return Err(invalid(
                "analysis.trim_hop_length",
                format!("{} (frame {})", self.trim_hop_length, self.trim_frame_length),
            )
            .into());
        }
        Ok(())
    }
}

/// Loudness metering settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoudnessConfig {
    /// Gating block length in seconds
    pub block_secs: f64,

    /// Overlap between consecutive gating blocks (0.75 = 100 ms step)
    pub block_overlap: f64,

    /// Blocks below this loudness are discarded before relative gating
    pub absolute_gate_lufs: f64,

    /// Relative gate offset from the ungated mean (negative LU)
    pub relative_gate_lu: f64,

    /// Reported integrated loudness when no block survives gating
    pub fallback_lufs: f64,

    /// Loudness range window length in seconds
    pub lra_window_secs: f64,

    /// Loudness range window hop in seconds
    pub lra_hop_secs: f64,

    /// Windows at or below `integrated + lra_relative_gate_lu` are dropped
    pub lra_relative_gate_lu: f64,

    /// Minimum number of gated windows before falling back to all windows
    pub lra_min_windows: usize,

    pub lra_low_percentile: f64,
    pub lra_high_percentile: f64,

    /// Windows whose raw peak is below this amplitude are treated as silence
    pub silence_peak: f64,

    /// Integer oversampling factor for true peak estimation
    pub true_peak_oversampling: usize,
}

impl Default for LoudnessConfig {
    fn default() -> Self {
        Self {
            block_secs: 0.4,
            block_overlap: 0.75,
            absolute_gate_lufs: -70.0,
            relative_gate_lu: -10.0,
            fallback_lufs: -23.0,
            lra_window_secs: 3.0,
            lra_hop_secs: 1.0,
            lra_relative_gate_lu: -20.0,
            lra_min_windows: 3,
            lra_low_percentile: 10.0,
            lra_high_percentile: 95.0,
            silence_peak: 1e-6,
            true_peak_oversampling: 4,
        }
    }
}

impl LoudnessConfig {
    fn validate(&self) -> Result<()> {
        if self.block_secs <= 0.0 {
            return Err(invalid("loudness.block_secs", self.block_secs).into());
        }
        if !(0.0..1.0).contains(&self.block_overlap) {
            return Err(invalid("loudness.block_overlap", self.block_overlap).into());
        }
        if self.relative_gate_lu >= 0.0 {
            return Err(invalid("loudness.relative_gate_lu", self.relative_gate_lu).into());
        }
        if self.lra_window_secs < self.block_secs || self.lra_hop_secs <= 0.0 {
            return Err(invalid(
                "loudness.lra_window",
                format!("{}s / {}s", self.lra_window_secs, self.lra_hop_secs),
            )
            .into());
        }
        let percentiles = 0.0..=100.0;
        if !percentiles.contains(&self.lra_low_percentile)
            || !percentiles.contains(&self.lra_high_percentile)
            || self.lra_low_percentile >= self.lra_high_percentile
        {
            return Err(invalid(
                "loudness.lra_percentiles",
                format!("{}-{}", self.lra_low_percentile, self.lra_high_percentile),
            )
            .into());
        }
        if self.true_peak_oversampling < 1 {
            return Err(invalid("loudness.true_peak_oversampling", self.true_peak_oversampling).into());
        }
        Ok(())
    }
}

/// Spectral, stereo and transient feature settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectralConfig {
    /// STFT size for the averaged power spectrum
    pub fft_size: usize,

    /// STFT hop for the averaged power spectrum
    pub hop_size: usize,

    /// Lowest 1/3-octave band center (Hz)
    pub band_start_hz: f64,

    /// Bands with centers in this range form the "high" side of the tilt
    pub tilt_high: BandRange,

    /// Bands with centers in this range form the "low" side of the tilt
    pub tilt_low: BandRange,

    pub sub_band: BandRange,
    pub bass_band: BandRange,

    /// Sub band must exceed the bass band by more than this to be flagged
    pub sub_excess_margin_db: f64,

    /// Narrow stereo requires correlation above this...
    pub narrow_correlation: f64,

    /// ...and a side/mid energy ratio below this
    pub narrow_width_ratio: f64,

    pub onset_fft_size: usize,
    pub onset_hop_size: usize,

    /// Dynamic range kept by the onset spectrogram before flooring
    pub onset_top_db: f64,

    pub transient_percentile: f64,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            fft_size: 8192,
            hop_size: 2048,
            band_start_hz: 20.0,
            tilt_high: BandRange::new(8_000.0, 12_000.0),
            tilt_low: BandRange::new(150.0, 300.0),
            sub_band: BandRange::new(20.0, 50.0),
            bass_band: BandRange::new(50.0, 250.0),
            sub_excess_margin_db: 3.0,
            narrow_correlation: 0.9,
            narrow_width_ratio: 0.1,
            onset_fft_size: 2048,
            onset_hop_size: 512,
            onset_top_db: 80.0,
            transient_percentile: 95.0,
        }
    }
}

impl SpectralConfig {
    fn validate(&self) -> Result<()> {
        for (key, size, hop) in [
            ("spectral.fft_size", self.fft_size, self.hop_size),
            ("spectral.onset_fft_size", self.onset_fft_size, self.onset_hop_size),
        ] {
            if size == 0 || !size.is_power_of_two() || hop == 0 || hop > size {
                return Err(invalid(key, format!("{} (hop {})", size, hop)).into());
            }
        }
        if self.band_start_hz <= 0.0 {
            return Err(invalid("spectral.band_start_hz", self.band_start_hz).into());
        }
        self.tilt_high.validate("spectral.tilt_high")?;
        self.tilt_low.validate("spectral.tilt_low")?;
        self.sub_band.validate("spectral.sub_band")?;
        self.bass_band.validate("spectral.bass_band")?;
        Ok(())
    }
}

/// One step of the compressor selection table
///
/// A band matches when its conditions hold (all of them, or any of them when
/// `match_any` is set). A band without conditions always matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressorBand {
    pub lra_at_least: Option<f64>,
    pub rms_below_db: Option<f64>,
    #[serde(default)]
    pub match_any: bool,
    pub ratio: f64,
    /// Threshold is the measured RMS plus this offset
    pub threshold_offset_db: f64,
}

impl CompressorBand {
    pub fn matches(&self, lra: f64, rms_db: f64) -> bool {
        let conditions: Vec<bool> = [
            self.lra_at_least.map(|min| lra >= min),
            self.rms_below_db.map(|max| rms_db < max),
        ]
        .into_iter()
        .flatten()
        .collect();

        if conditions.is_empty() {
            return true;
        }
        if self.match_any {
            conditions.iter().any(|&c| c)
        } else {
            conditions.iter().all(|&c| c)
        }
    }
}

/// Values substituted for non-finite measurements before deciding
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputFallbacks {
    pub integrated_lufs: f64,
    pub loudness_range_lu: f64,
    pub true_peak_dbfs: f64,
    pub rms_db: f64,
    pub tilt_db: f64,
}

impl Default for InputFallbacks {
    fn default() -> Self {
        Self {
            integrated_lufs: -23.0,
            loudness_range_lu: 0.0,
            true_peak_dbfs: -1.0,
            rms_db: -20.0,
            tilt_db: 0.0,
        }
    }
}

/// Measurement to parameter mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionConfig {
    #[serde(default)]
    pub fallbacks: InputFallbacks,

    /// Input integrated loudness -> target integrated loudness
    pub loudness_curve: Curve,
    pub loudness_clamp: Range,

    /// Input loudness range -> target loudness range
    pub lra_curve: Curve,
    pub lra_clamp: Range,

    /// Inputs peaking at or above this are treated as clipping-risk material
    pub hot_input_peak_dbfs: f64,
    pub hot_true_peak_target: f64,
    pub true_peak_target: f64,
    pub true_peak_clamp: Range,

    /// Tilt is clipped to +/- this before the shelf curves are applied
    pub tilt_limit_db: f64,
    pub high_shelf_curve: Curve,
    pub low_shelf_curve: Curve,
    pub shelf_clamp: Range,
    pub low_shelf_freq: f64,
    pub low_shelf_width: f64,
    pub high_shelf_freq: f64,
    pub high_shelf_width: f64,

    /// First matching band wins
    pub compressor_bands: Vec<CompressorBand>,
    pub ratio_clamp: Range,
    pub threshold_clamp: Range,
    pub attack_ms: f64,
    pub release_ms: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            fallbacks: InputFallbacks::default(),
            loudness_curve: Curve::new(
                &[-30.0, -22.0, -16.0, -12.0, -10.0],
                &[-18.0, -16.0, -14.5, -13.0, -12.0],
            ),
            loudness_clamp: Range::new(-16.5, -11.5),
            lra_curve: Curve::new(&[5.0, 10.0, 20.0], &[5.0, 6.0, 8.0]),
            lra_clamp: Range::new(4.0, 10.0),
            hot_input_peak_dbfs: -0.1,
            hot_true_peak_target: -1.0,
            true_peak_target: -0.5,
            true_peak_clamp: Range::new(-3.0, 0.0),
            tilt_limit_db: 20.0,
            high_shelf_curve: Curve::new(&[-20.0, 0.0, 20.0], &[3.0, 0.0, -3.0]),
            low_shelf_curve: Curve::new(&[-20.0, 0.0, 20.0], &[-2.5, 0.0, 2.0]),
            shelf_clamp: Range::new(-3.0, 3.0),
            low_shelf_freq: 250.0,
            low_shelf_width: 1.0,
            high_shelf_freq: 8_000.0,
            high_shelf_width: 0.8,
            compressor_bands: vec![
                CompressorBand {
                    lra_at_least: Some(15.0),
                    rms_below_db: Some(-24.0),
                    match_any: true,
                    ratio: 1.3,
                    threshold_offset_db: 6.0,
                },
                CompressorBand {
                    lra_at_least: Some(8.0),
                    rms_below_db: Some(-20.0),
                    match_any: false,
                    ratio: 1.5,
                    threshold_offset_db: 4.0,
                },
                CompressorBand {
                    lra_at_least: None,
                    rms_below_db: Some(-16.0),
                    match_any: false,
                    ratio: 1.8,
                    threshold_offset_db: 2.0,
                },
                CompressorBand {
                    lra_at_least: None,
                    rms_below_db: None,
                    match_any: false,
                    ratio: 2.0,
                    threshold_offset_db: 0.0,
                },
            ],
            ratio_clamp: Range::new(1.0, 4.0),
            threshold_clamp: Range::new(-40.0, 0.0),
            attack_ms: 20.0,
            release_ms: 150.0,
        }
    }
}

impl DecisionConfig {
    fn validate(&self) -> Result<()> {
        self.loudness_curve.validate("decision.loudness_curve")?;
        self.lra_curve.validate("decision.lra_curve")?;
        self.high_shelf_curve.validate("decision.high_shelf_curve")?;
        self.low_shelf_curve.validate("decision.low_shelf_curve")?;
        self.loudness_clamp.validate("decision.loudness_clamp")?;
        self.lra_clamp.validate("decision.lra_clamp")?;
        self.true_peak_clamp.validate("decision.true_peak_clamp")?;
        self.shelf_clamp.validate("decision.shelf_clamp")?;
        self.ratio_clamp.validate("decision.ratio_clamp")?;
        self.threshold_clamp.validate("decision.threshold_clamp")?;

        if self.compressor_bands.is_empty() {
            return Err(invalid("decision.compressor_bands", "[]").into());
        }
        if self.tilt_limit_db <= 0.0 {
            return Err(invalid("decision.tilt_limit_db", self.tilt_limit_db).into());
        }
        let f = &self.fallbacks;
        if ![f.integrated_lufs, f.loudness_range_lu, f.true_peak_dbfs, f.rms_db, f.tilt_db]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(invalid("decision.fallbacks", format!("{:?}", f)).into());
        }
        Ok(())
    }
}

/// Filter chain rendering settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub highpass_freq: f64,
    pub highpass_width: f64,

    /// Shelves with smaller absolute gain render as pass-through
    pub shelf_bypass_db: f64,

    pub widen_delay_ms: f64,
    pub widen_drymix: f64,
    pub widen_crossfeed: f64,
    pub widen_feedback: f64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            highpass_freq: 30.0,
            highpass_width: 0.7,
            shelf_bypass_db: 0.01,
            widen_delay_ms: 10.0,
            widen_drymix: 0.9,
            widen_crossfeed: 0.4,
            widen_feedback: 0.4,
        }
    }
}

impl ChainConfig {
    fn validate(&self) -> Result<()> {
        if !(self.highpass_freq > 0.0) {
            return Err(invalid("chain.highpass_freq", self.highpass_freq).into());
        }
        if !(self.highpass_width > 0.0) {
            return Err(invalid("chain.highpass_width", self.highpass_width).into());
        }
        if !(self.shelf_bypass_db >= 0.0 && self.shelf_bypass_db.is_finite()) {
            return Err(invalid("chain.shelf_bypass_db", self.shelf_bypass_db).into());
        }
        // stereowiden accepts delay 1-100 ms, feedback 0-0.9, crossfeed 0-0.8, drymix 0-1
        for (key, value, range) in [
            ("chain.widen_delay_ms", self.widen_delay_ms, Range::new(1.0, 100.0)),
            ("chain.widen_feedback", self.widen_feedback, Range::new(0.0, 0.9)),
            ("chain.widen_crossfeed", self.widen_crossfeed, Range::new(0.0, 0.8)),
            ("chain.widen_drymix", self.widen_drymix, Range::new(0.0, 1.0)),
        ] {
            if !range.contains(value) {
                return Err(invalid(key, value).into());
            }
        }
        Ok(())
    }
}

/// External engine settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Executable name or path
    pub program: String,

    /// Upper bound for each of the two passes, in seconds
    pub pass_timeout_secs: u64,

    /// Number of engine processes allowed to run at once
    pub max_concurrent_renders: usize,

    pub output_sample_rate: u32,
    pub output_channels: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            pass_timeout_secs: 600,
            max_concurrent_renders: num_cpus::get(),
            output_sample_rate: 48_000,
            output_channels: 2,
        }
    }
}

impl EngineConfig {
    fn validate(&self) -> Result<()> {
        if self.program.trim().is_empty() {
            return Err(invalid("engine.program", "<empty>").into());
        }
        if self.pass_timeout_secs == 0 {
            return Err(invalid("engine.pass_timeout_secs", self.pass_timeout_secs).into());
        }
        if self.max_concurrent_renders == 0 {
            return Err(invalid("engine.max_concurrent_renders", self.max_concurrent_renders).into());
        }
        if !(1..=2).contains(&self.output_channels) {
            return Err(invalid("engine.output_channels", self.output_channels).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("auto_master.toml");

        let original_config = Config::default();

        original_config.save_to_file(&file_path).unwrap();
        let loaded_config = Config::from_file(&file_path).unwrap();

        assert_eq!(original_config.analysis.target_sample_rate, loaded_config.analysis.target_sample_rate);
        assert_eq!(original_config.decision.loudness_curve, loaded_config.decision.loudness_curve);
        assert_eq!(original_config.decision.compressor_bands, loaded_config.decision.compressor_bands);
        assert_eq!(original_config.spectral.tilt_high, loaded_config.spectral.tilt_high);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let result = Config::from_file(dir.path().join("nope.toml"));
        assert!(matches!(
            result,
            Err(crate::error::MasteringError::Config(ConfigError::FileNotFound { .. }))
        ));
    }

    #[test]
    fn test_unsorted_curve_rejected() {
        let mut config = Config::default();
        config.decision.loudness_curve = Curve::new(&[-10.0, -20.0], &[-12.0, -16.0]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_fft_size() {
        let mut config = Config::default();
        config.spectral.fft_size = 1000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_chain_settings_rejected() {
        let mut config = Config::default();
        config.chain.shelf_bypass_db = -0.5;
        assert!(matches!(
            config.validate(),
            Err(crate::error::MasteringError::Config(ConfigError::InvalidValue { ref key, .. }))
                if key == "chain.shelf_bypass_db"
        ));

        let mut config = Config::default();
        config.chain.highpass_freq = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.chain.widen_delay_ms = -10.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.chain.widen_feedback = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_chain_file_fails_to_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad_chain.toml");
        let mut config = Config::default();
        config.chain.highpass_width = -1.0;
        config.save_to_file(&path).unwrap();
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn test_range_clamp_handles_nan() {
        let range = Range::new(-3.0, 3.0);
        assert_eq!(range.clamp(f64::NAN, 0.0), 0.0);
        assert_eq!(range.clamp(f64::INFINITY, 0.0), 3.0);
        assert_eq!(range.clamp(-7.0, 0.0), -3.0);
    }

    #[test]
    fn test_compressor_band_matching() {
        let bands = DecisionConfig::default().compressor_bands;
        // any-of band
        assert!(bands[0].matches(16.0, -10.0));
        assert!(bands[0].matches(2.0, -30.0));
        assert!(!bands[0].matches(2.0, -10.0));
        // all-of band
        assert!(bands[1].matches(9.0, -22.0));
        assert!(!bands[1].matches(9.0, -18.0));
        // unconditional fallback
        assert!(bands[3].matches(f64::NAN, f64::NAN));
    }
}
