use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::audio::types::AnalysisReport;
use crate::config::DecisionConfig;
use crate::engine::format::OutputFormat;
use crate::error::{ConfigError, MasteringError, Result};
use crate::mastering::params::{CompressorParams, LoudnessTarget, MasteringParameters, ToneParams};

/// Tilt at or below this suggests the bright tone preset
const BRIGHT_TILT_DB: f64 = -0.8;
/// Tilt at or above this suggests the warm tone preset
const WARM_TILT_DB: f64 = 0.8;
/// Inputs at or below this loudness suggest the balanced intensity
const BALANCED_MAX_LUFS: f64 = -14.5;

/// How hard the recording is pushed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Balanced,
    High,
}

/// Broad tonal character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Warm,
    Balanced,
    Bright,
}

impl Intensity {
    pub const ALL: [Intensity; 3] = [Intensity::Low, Intensity::Balanced, Intensity::High];

    pub fn name(&self) -> &'static str {
        match self {
            Intensity::Low => "low",
            Intensity::Balanced => "balanced",
            Intensity::High => "high",
        }
    }
}

impl Tone {
    pub const ALL: [Tone; 3] = [Tone::Warm, Tone::Balanced, Tone::Bright];

    pub fn name(&self) -> &'static str {
        match self {
            Tone::Warm => "warm",
            Tone::Balanced => "balanced",
            Tone::Bright => "bright",
        }
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Intensity {
    type Err = MasteringError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|i| i.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| unknown("intensity", s))
    }
}

impl FromStr for Tone {
    type Err = MasteringError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| unknown("tone", s))
    }
}

fn unknown(kind: &str, name: &str) -> MasteringError {
    ConfigError::UnknownPreset {
        kind: kind.to_string(),
        name: name.to_string(),
    }
    .into()
}

/// Loudness targets and dynamics for one intensity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntensityPreset {
    pub integrated_lufs: f64,
    pub true_peak_db: f64,
    pub loudness_range_lu: f64,
    pub compressor: CompressorParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShelfPreset {
    pub gain_db: f64,
    pub freq_hz: f64,
    pub width: f64,
}

/// Shelving EQ for one tone; a missing shelf is left flat
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TonePreset {
    pub low_shelf: Option<ShelfPreset>,
    pub high_shelf: Option<ShelfPreset>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntensityPresets {
    pub low: IntensityPreset,
    pub balanced: IntensityPreset,
    pub high: IntensityPreset,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TonePresets {
    pub warm: TonePreset,
    pub balanced: TonePreset,
    pub bright: TonePreset,
}

/// Choices applied to a user who has not picked anything yet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresetDefaults {
    pub intensity: Intensity,
    pub tone: Tone,
    pub format: OutputFormat,
}

/// Preset values as stored in the configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetTable {
    pub intensity: IntensityPresets,
    pub tone: TonePresets,
    pub defaults: PresetDefaults,
}

impl Default for PresetTable {
    fn default() -> Self {
        let shelf = |gain_db, freq_hz, width| Some(ShelfPreset { gain_db, freq_hz, width });
        Self {
            intensity: IntensityPresets {
                low: IntensityPreset {
                    integrated_lufs: -16.0,
                    true_peak_db: -1.0,
                    loudness_range_lu: 9.0,
                    compressor: CompressorParams { ratio: 1.5, threshold_db: -24.0, attack_ms: 25.0, release_ms: 200.0 },
                },
                balanced: IntensityPreset {
                    integrated_lufs: -14.0,
                    true_peak_db: -1.0,
                    loudness_range_lu: 7.0,
                    compressor: CompressorParams { ratio: 2.0, threshold_db: -20.0, attack_ms: 20.0, release_ms: 150.0 },
                },
                high: IntensityPreset {
                    integrated_lufs: -11.0,
                    true_peak_db: -1.0,
                    loudness_range_lu: 5.0,
                    compressor: CompressorParams { ratio: 3.0, threshold_db: -18.0, attack_ms: 10.0, release_ms: 100.0 },
                },
            },
            tone: TonePresets {
                warm: TonePreset {
                    low_shelf: shelf(2.0, 120.0, 0.7),
                    high_shelf: shelf(-1.5, 8_000.0, 0.7),
                },
                balanced: TonePreset::default(),
                bright: TonePreset {
                    low_shelf: shelf(-1.0, 120.0, 0.7),
                    high_shelf: shelf(2.5, 9_000.0, 0.7),
                },
            },
            defaults: PresetDefaults {
                intensity: Intensity::Balanced,
                tone: Tone::Balanced,
                format: OutputFormat::Wav16,
            },
        }
    }
}

impl PresetTable {
    pub fn validate(&self) -> Result<()> {
        for intensity in Intensity::ALL {
            let p = self.intensity(intensity);
            let c = &p.compressor;
            let finite = [p.integrated_lufs, p.true_peak_db, p.loudness_range_lu, c.threshold_db]
                .iter()
                .all(|v| v.is_finite());
            if !finite
                || !(-70.0..=-5.0).contains(&p.integrated_lufs)
                || p.true_peak_db > 0.0
                || !(1.0..=20.0).contains(&c.ratio)
                || c.attack_ms <= 0.0
                || c.release_ms <= 0.0
            {
                return Err(ConfigError::InvalidValue {
                    key: format!("presets.intensity.{}", intensity),
                    value: format!("{:?}", p),
                }
                .into());
            }
        }
        for tone in Tone::ALL {
            let p = self.tone(tone);
            let valid = [p.low_shelf, p.high_shelf].iter().flatten().all(|s| {
                s.gain_db.is_finite() && s.freq_hz > 0.0 && s.width > 0.0
            });
            if !valid {
                return Err(ConfigError::InvalidValue {
                    key: format!("presets.tone.{}", tone),
                    value: format!("{:?}", p),
                }
                .into());
            }
        }
        Ok(())
    }

    pub fn intensity(&self, intensity: Intensity) -> &IntensityPreset {
        match intensity {
            Intensity::Low => &self.intensity.low,
            Intensity::Balanced => &self.intensity.balanced,
            Intensity::High => &self.intensity.high,
        }
    }

    pub fn tone(&self, tone: Tone) -> &TonePreset {
        match tone {
            Tone::Warm => &self.tone.warm,
            Tone::Balanced => &self.tone.balanced,
            Tone::Bright => &self.tone.bright,
        }
    }
}

/// Read-only lookup of named presets, built once at startup
///
/// Flat shelves fall back to the decision engine's shelf frequencies and
/// widths so that manual and automatic chains share the same stage layout.
#[derive(Debug, Clone)]
pub struct PresetRegistry {
    table: PresetTable,
    flat_low: ShelfPreset,
    flat_high: ShelfPreset,
}

impl PresetRegistry {
    pub fn new(table: PresetTable, decision: &DecisionConfig) -> Self {
        Self {
            table,
            flat_low: ShelfPreset {
                gain_db: 0.0,
                freq_hz: decision.low_shelf_freq,
                width: decision.low_shelf_width,
            },
            flat_high: ShelfPreset {
                gain_db: 0.0,
                freq_hz: decision.high_shelf_freq,
                width: decision.high_shelf_width,
            },
        }
    }

    pub fn defaults(&self) -> PresetDefaults {
        self.table.defaults
    }

    /// Look up an intensity preset by name
    pub fn intensity_by_name(&self, name: &str) -> Result<&IntensityPreset> {
        Ok(self.table.intensity(name.parse()?))
    }

    /// Look up a tone preset by name
    pub fn tone_by_name(&self, name: &str) -> Result<&TonePreset> {
        Ok(self.table.tone(name.parse()?))
    }

    pub fn available_intensities(&self) -> Vec<&'static str> {
        Intensity::ALL.iter().map(|i| i.name()).collect()
    }

    pub fn available_tones(&self) -> Vec<&'static str> {
        Tone::ALL.iter().map(|t| t.name()).collect()
    }

    /// Manual-mode parameters: no high-pass and no widening
    pub fn parameters(&self, selection: PresetSelection) -> MasteringParameters {
        let intensity = self.table.intensity(selection.intensity);
        let tone = self.table.tone(selection.tone);
        let low = tone.low_shelf.unwrap_or(self.flat_low);
        let high = tone.high_shelf.unwrap_or(self.flat_high);

        MasteringParameters {
            loudness: LoudnessTarget {
                integrated_lufs: intensity.integrated_lufs,
                true_peak_db: intensity.true_peak_db,
                loudness_range_lu: intensity.loudness_range_lu,
            },
            tone: ToneParams {
                low_shelf_gain_db: low.gain_db,
                low_shelf_freq: low.freq_hz,
                low_shelf_width: low.width,
                high_shelf_gain_db: high.gain_db,
                high_shelf_freq: high.freq_hz,
                high_shelf_width: high.width,
                high_pass: false,
            },
            compressor: intensity.compressor,
            stereo_widen: false,
        }
    }
}

/// A named intensity/tone pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetSelection {
    pub intensity: Intensity,
    pub tone: Tone,
}

impl PresetSelection {
    pub fn new(intensity: Intensity, tone: Tone) -> Self {
        Self { intensity, tone }
    }

    pub fn parameters(&self, registry: &PresetRegistry) -> MasteringParameters {
        registry.parameters(*self)
    }
}

impl fmt::Display for PresetSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Intensity={}, Tone={}", self.intensity, self.tone)
    }
}

/// Nearest named presets for an analysis; a dark mix suggests a bright tone
pub fn suggest_presets(report: &AnalysisReport) -> PresetSelection {
    let tone = if report.tilt_db <= BRIGHT_TILT_DB {
        Tone::Bright
    } else if report.tilt_db >= WARM_TILT_DB {
        Tone::Warm
    } else {
        Tone::Balanced
    };

    let intensity = if report.integrated_lufs <= BALANCED_MAX_LUFS {
        Intensity::Balanced
    } else {
        Intensity::Low
    };

    PresetSelection { intensity, tone }
}
