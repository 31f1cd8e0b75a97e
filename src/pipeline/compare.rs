use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::audio::{AnalysisReport, AudioAnalyzer, AudioLoader, BandLevel};
use crate::config::Config;
use crate::error::{MasteringError, Result};
use crate::mastering::presets::{Intensity, PresetSelection, Tone};

/// Loudness change (dB) beyond which a stronger or gentler intensity is suggested
const INTENSITY_DELTA_LU: f64 = 1.0;
/// Difference tilt (dB) beyond which a brighter or warmer tone is suggested
const TONE_TILT_DB: f64 = 0.75;
/// Bands at or above this center form the high side of the difference tilt
const DIFF_TILT_HIGH_HZ: f64 = 8_000.0;

/// `after - before` for the scalar measurements
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricDeltas {
    pub integrated_lufs: f64,
    pub loudness_range_lu: f64,
    pub rms_db: f64,
    pub true_peak_dbfs: f64,
    pub crest_db: f64,
    pub transient_index: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandDelta {
    pub center_hz: f64,
    pub before_db: Option<f64>,
    pub after_db: Option<f64>,
    /// Undefined when either side has no level for the band
    pub diff_db: Option<f64>,
}

/// Preset that would most nearly reproduce the observed change
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresetSuggestion {
    pub intensity: Intensity,
    pub tone: Tone,
    /// Mean high-band minus mean low-mid-band difference
    pub tilt_indicator_db: f64,
}

impl PresetSuggestion {
    pub fn selection(&self) -> PresetSelection {
        PresetSelection::new(self.intensity, self.tone)
    }
}

/// Measurements of a recording before and after mastering, and what changed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub before: AnalysisReport,
    pub after: AnalysisReport,
    pub deltas: MetricDeltas,
    pub bands: Vec<BandDelta>,
    pub suggestion: PresetSuggestion,
}

impl ComparisonReport {
    pub fn new(before: AnalysisReport, after: AnalysisReport, config: &Config) -> Self {
        let deltas = MetricDeltas {
            integrated_lufs: after.integrated_lufs - before.integrated_lufs,
            loudness_range_lu: after.loudness_range_lu - before.loudness_range_lu,
            rms_db: after.rms_db - before.rms_db,
            true_peak_dbfs: after.true_peak_dbfs - before.true_peak_dbfs,
            crest_db: after.crest_db - before.crest_db,
            transient_index: after.transient_index - before.transient_index,
        };
        let bands = band_deltas(&before.bands, &after.bands);

        let low = config.spectral.tilt_low;
        let high_side = mean_diff(&bands, |hz| hz >= DIFF_TILT_HIGH_HZ);
        let low_side = mean_diff(&bands, |hz| hz >= low.low_hz && hz <= low.high_hz);
        let tilt_indicator_db = high_side - low_side;

        let suggestion = PresetSuggestion {
            intensity: suggest_intensity(deltas.integrated_lufs),
            tone: suggest_tone(tilt_indicator_db),
            tilt_indicator_db,
        };

        Self {
            before,
            after,
            deltas,
            bands,
            suggestion,
        }
    }

    pub fn summary(&self) -> String {
        let d = &self.deltas;
        format!(
            "LUFS \u{394}: {:.2} | LRA \u{394}: {:.2} | RMS \u{394} (dB): {:.2}\n\
             TP \u{394} (dB): {:.2} | Crest \u{394}: {:.2} | Transients \u{394}: {:.2}\n\
             Suggested preset: {} (tilt={:.2} dB)",
            d.integrated_lufs,
            d.loudness_range_lu,
            d.rms_db,
            d.true_peak_dbfs,
            d.crest_db,
            d.transient_index,
            self.suggestion.selection(),
            self.suggestion.tilt_indicator_db,
        )
    }

    /// Write `report.json` and `preset_suggestion.json` into `outdir`
    pub fn write_to(&self, outdir: &Path) -> Result<()> {
        std::fs::create_dir_all(outdir)?;
        let report = serde_json::to_string_pretty(self)
            .map_err(|e| MasteringError::generic(format!("failed to serialize report: {}", e)))?;
        std::fs::write(outdir.join("report.json"), report)?;

        let suggestion = serde_json::to_string_pretty(&self.suggestion)
            .map_err(|e| MasteringError::generic(format!("failed to serialize suggestion: {}", e)))?;
        std::fs::write(outdir.join("preset_suggestion.json"), suggestion)?;
        Ok(())
    }
}

/// Analyze two recordings in parallel and compare them
pub fn compare_files(before: &Path, after: &Path, config: &Config) -> Result<ComparisonReport> {
    let analyzer = AudioAnalyzer::with_config(config);
    let analyze = |path: &Path| -> Result<AnalysisReport> {
        let buffer = AudioLoader::load_blocking(path, &config.analysis)?;
        analyzer.analyze(&buffer)
    };

    info!("Comparing {} against {}", after.display(), before.display());
    let (before, after) = rayon::join(|| analyze(before), || analyze(after));
    Ok(ComparisonReport::new(before?, after?, config))
}

fn band_deltas(before: &[BandLevel], after: &[BandLevel]) -> Vec<BandDelta> {
    before
        .iter()
        .zip(after)
        .map(|(b, a)| BandDelta {
            center_hz: b.center_hz,
            before_db: b.level_db,
            after_db: a.level_db,
            diff_db: match (b.level_db, a.level_db) {
                (Some(b), Some(a)) => Some(a - b),
                _ => None,
            },
        })
        .collect()
}

/// Mean of the defined differences whose band center satisfies `select`, else 0
fn mean_diff<F: Fn(f64) -> bool>(bands: &[BandDelta], select: F) -> f64 {
    let diffs: Vec<f64> = bands
        .iter()
        .filter(|b| select(b.center_hz))
        .filter_map(|b| b.diff_db)
        .collect();
    if diffs.is_empty() {
        0.0
    } else {
        diffs.iter().sum::<f64>() / diffs.len() as f64
    }
}

fn suggest_intensity(loudness_delta: f64) -> Intensity {
    if loudness_delta < -INTENSITY_DELTA_LU {
        Intensity::Low
    } else if loudness_delta <= INTENSITY_DELTA_LU {
        Intensity::Balanced
    } else {
        Intensity::High
    }
}

fn suggest_tone(tilt_db: f64) -> Tone {
    if tilt_db > TONE_TILT_DB {
        Tone::Bright
    } else if tilt_db < -TONE_TILT_DB {
        Tone::Warm
    } else {
        Tone::Balanced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;
    use tempfile::tempdir;

    fn report(integrated_lufs: f64, bands: Vec<BandLevel>) -> AnalysisReport {
        AnalysisReport {
            integrated_lufs,
            loudness_range_lu: 6.0,
            rms_db: -18.0,
            true_peak_dbfs: -1.0,
            crest_db: 17.0,
            tilt_db: 0.0,
            sub_bass_excess: false,
            stereo_width_ratio: 0.2,
            stereo_correlation: 0.5,
            stereo_narrow: false,
            transient_index: 3.0,
            bands,
            sample_rate: 48_000,
            duration_secs: 30.0,
        }
    }

    fn bands(levels: &[(f64, Option<f64>)]) -> Vec<BandLevel> {
        levels
            .iter()
            .map(|&(center_hz, level_db)| BandLevel { center_hz, level_db })
            .collect()
    }

    #[test]
    fn test_brightened_louder_master() {
        let before = report(-20.0, bands(&[(20.0, None), (200.0, Some(-30.0)), (250.0, Some(-31.0)), (10_000.0, Some(-50.0))]));
        let after = report(-14.0, bands(&[(20.0, Some(-60.0)), (200.0, Some(-29.0)), (250.0, Some(-30.0)), (10_000.0, Some(-45.0))]));

        let comparison = ComparisonReport::new(before, after, &Config::default());
        assert_eq!(comparison.deltas.integrated_lufs, 6.0);
        assert_eq!(comparison.bands[0].diff_db, None);
        assert_eq!(comparison.bands[1].diff_db, Some(1.0));
        assert!((comparison.suggestion.tilt_indicator_db - 4.0).abs() < 1e-9);
        assert_eq!(comparison.suggestion.intensity, Intensity::High);
        assert_eq!(comparison.suggestion.tone, Tone::Bright);
    }

    #[test]
    fn test_suggestion_thresholds() {
        assert_eq!(suggest_intensity(-1.5), Intensity::Low);
        assert_eq!(suggest_intensity(-1.0), Intensity::Balanced);
        assert_eq!(suggest_intensity(1.0), Intensity::Balanced);
        assert_eq!(suggest_intensity(1.01), Intensity::High);
        assert_eq!(suggest_tone(0.75), Tone::Balanced);
        assert_eq!(suggest_tone(-0.8), Tone::Warm);
    }

    #[test]
    fn test_missing_high_bands_give_zero_tilt() {
        let before = report(-14.0, bands(&[(200.0, Some(-30.0))]));
        let after = report(-14.0, bands(&[(200.0, Some(-30.0))]));
        let comparison = ComparisonReport::new(before, after, &Config::default());
        assert_eq!(comparison.suggestion.tilt_indicator_db, 0.0);
        assert_eq!(comparison.suggestion.tone, Tone::Balanced);
    }

    #[test]
    fn test_compare_files_writes_reports() {
        let dir = tempdir().unwrap();
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 48_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        for (name, amplitude) in [("before.wav", 0.1f32), ("after.wav", 0.4f32)] {
            let mut writer = hound::WavWriter::create(dir.path().join(name), spec).unwrap();
            for i in 0..96_000 {
                let s = amplitude * (2.0 * PI * 440.0 * i as f32 / 48_000.0).sin();
                let v = (s * i16::MAX as f32) as i16;
                writer.write_sample(v).unwrap();
                writer.write_sample(v).unwrap();
            }
            writer.finalize().unwrap();
        }

        let config = Config::default();
        let comparison = compare_files(
            &dir.path().join("before.wav"),
            &dir.path().join("after.wav"),
            &config,
        )
        .unwrap();
        // four times the amplitude is about 12 dB louder
        assert!((comparison.deltas.integrated_lufs - 12.04).abs() < 0.5);
        assert_eq!(comparison.suggestion.intensity, Intensity::High);

        let outdir = dir.path().join("out");
        comparison.write_to(&outdir).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(outdir.join("report.json")).unwrap()).unwrap();
        assert!(written["deltas"]["integrated_lufs"].is_number());
        assert!(outdir.join("preset_suggestion.json").exists());
    }
}
