//! Pure mapping from an [`AnalysisReport`] to [`MasteringParameters`].
//!
//! Measurements are sanitized first (non-finite values replaced by the
//! configured fallbacks, tilt clipped), then pushed through piecewise-linear
//! curves and a compressor step table. Every output is clamped, so degenerate
//! input can never produce an out-of-range control value.

use tracing::debug;

use crate::audio::dsp::interpolate;
use crate::audio::types::AnalysisReport;
use crate::config::{Curve, DecisionConfig};
use crate::mastering::params::{CompressorParams, LoudnessTarget, MasteringParameters, ToneParams};

/// Measurements after sanitizing
#[derive(Debug, Clone, Copy, PartialEq)]
struct Inputs {
    integrated_lufs: f64,
    loudness_range_lu: f64,
    true_peak_dbfs: f64,
    rms_db: f64,
    tilt_db: f64,
}

#[derive(Debug, Clone, Default)]
pub struct DecisionEngine {
    config: DecisionConfig,
}

impl DecisionEngine {
    pub fn new(config: DecisionConfig) -> Self {
        Self { config }
    }

    pub fn decide(&self, report: &AnalysisReport) -> MasteringParameters {
        let inputs = self.sanitize(report);
        let c = &self.config;

        let loudness = LoudnessTarget {
            integrated_lufs: c
                .loudness_clamp
                .clamp(eval(&c.loudness_curve, inputs.integrated_lufs), c.fallbacks.integrated_lufs),
            true_peak_db: c.true_peak_clamp.clamp(self.true_peak_target(inputs.true_peak_dbfs), -1.0),
            loudness_range_lu: c
                .lra_clamp
                .clamp(eval(&c.lra_curve, inputs.loudness_range_lu), c.lra_clamp.min),
        };

        let tone = ToneParams {
            low_shelf_gain_db: c.shelf_clamp.clamp(eval(&c.low_shelf_curve, inputs.tilt_db), 0.0),
            low_shelf_freq: c.low_shelf_freq,
            low_shelf_width: c.low_shelf_width,
            high_shelf_gain_db: c.shelf_clamp.clamp(eval(&c.high_shelf_curve, inputs.tilt_db), 0.0),
            high_shelf_freq: c.high_shelf_freq,
            high_shelf_width: c.high_shelf_width,
            high_pass: report.sub_bass_excess,
        };

        let compressor = self.compressor(inputs.loudness_range_lu, inputs.rms_db);

        let params = MasteringParameters {
            loudness,
            tone,
            compressor,
            stereo_widen: report.stereo_narrow,
        };
        debug!("Decided parameters from {:?}: {:?}", inputs, params);
        params
    }

    fn sanitize(&self, report: &AnalysisReport) -> Inputs {
        let f = &self.config.fallbacks;
        let finite_or = |value: f64, fallback: f64| if value.is_finite() { value } else { fallback };
        let limit = self.config.tilt_limit_db;

        Inputs {
            integrated_lufs: finite_or(report.integrated_lufs, f.integrated_lufs),
            loudness_range_lu: finite_or(report.loudness_range_lu, f.loudness_range_lu),
            true_peak_dbfs: finite_or(report.true_peak_dbfs, f.true_peak_dbfs),
            rms_db: finite_or(report.rms_db, f.rms_db),
            tilt_db: finite_or(report.tilt_db, f.tilt_db).clamp(-limit, limit),
        }
    }

    fn true_peak_target(&self, true_peak_dbfs: f64) -> f64 {
        if true_peak_dbfs >= self.config.hot_input_peak_dbfs {
            self.config.hot_true_peak_target
        } else {
            self.config.true_peak_target
        }
    }

    /// First matching band of the step table; threshold follows the measured RMS
    fn compressor(&self, lra: f64, rms_db: f64) -> CompressorParams {
        let c = &self.config;
        let (ratio, offset) = c
            .compressor_bands
            .iter()
            .find(|band| band.matches(lra, rms_db))
            .map(|band| (band.ratio, band.threshold_offset_db))
            .unwrap_or((c.ratio_clamp.min, 0.0));

        CompressorParams {
            ratio: c.ratio_clamp.clamp(ratio, c.ratio_clamp.min),
            threshold_db: c.threshold_clamp.clamp(rms_db + offset, c.threshold_clamp.max),
            attack_ms: c.attack_ms,
            release_ms: c.release_ms,
        }
    }
}

fn eval(curve: &Curve, x: f64) -> f64 {
    interpolate(x, &curve.inputs, &curve.outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn report() -> AnalysisReport {
        AnalysisReport {
            integrated_lufs: -16.0,
            loudness_range_lu: 6.0,
            rms_db: -18.0,
            true_peak_dbfs: -2.0,
            crest_db: 16.0,
            tilt_db: 0.0,
            sub_bass_excess: false,
            stereo_width_ratio: 0.3,
            stereo_correlation: 0.6,
            stereo_narrow: false,
            transient_index: 4.0,
            bands: Vec::new(),
            sample_rate: 48_000,
            duration_secs: 180.0,
        }
    }

    fn assert_within_clamps(params: &MasteringParameters, config: &DecisionConfig) {
        assert!(config.loudness_clamp.contains(params.loudness.integrated_lufs), "{:?}", params);
        assert!(config.lra_clamp.contains(params.loudness.loudness_range_lu), "{:?}", params);
        assert!(config.true_peak_clamp.contains(params.loudness.true_peak_db), "{:?}", params);
        assert!(config.shelf_clamp.contains(params.tone.low_shelf_gain_db), "{:?}", params);
        assert!(config.shelf_clamp.contains(params.tone.high_shelf_gain_db), "{:?}", params);
        assert!(config.ratio_clamp.contains(params.compressor.ratio), "{:?}", params);
        assert!(config.threshold_clamp.contains(params.compressor.threshold_db), "{:?}", params);
    }

    #[test]
    fn test_balanced_input() {
        let params = DecisionEngine::default().decide(&report());
        assert_eq!(params.loudness.integrated_lufs, -14.5);
        assert_eq!(params.loudness.true_peak_db, -0.5);
        assert!((params.loudness.loudness_range_lu - 5.2).abs() < 1e-9);
        assert_eq!(params.tone.low_shelf_gain_db, 0.0);
        assert_eq!(params.tone.high_shelf_gain_db, 0.0);
        assert!(!params.tone.high_pass);
        assert!(!params.stereo_widen);
        // RMS -18 falls in the third band
        assert_eq!(params.compressor.ratio, 1.8);
        assert_eq!(params.compressor.threshold_db, -16.0);
    }

    #[test]
    fn test_degenerate_inputs_stay_within_clamps() {
        let config = DecisionConfig::default();
        let engine = DecisionEngine::new(config.clone());
        let specials = [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -1e9, 1e9, 0.0];

        for &a in &specials {
            for &b in &specials {
                let mut r = report();
                r.integrated_lufs = a;
                r.loudness_range_lu = b;
                r.true_peak_dbfs = a;
                r.rms_db = b;
                r.tilt_db = a;
                assert_within_clamps(&engine.decide(&r), &config);
            }
        }

        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..1_000 {
            let mut r = report();
            r.integrated_lufs = rng.gen_range(-80.0..10.0);
            r.loudness_range_lu = rng.gen_range(0.0..40.0);
            r.true_peak_dbfs = rng.gen_range(-60.0..6.0);
            r.rms_db = rng.gen_range(-90.0..0.0);
            r.tilt_db = rng.gen_range(-60.0..60.0);
            assert_within_clamps(&engine.decide(&r), &config);
        }
    }

    #[test]
    fn test_nan_measurements_use_fallbacks() {
        let mut r = report();
        r.integrated_lufs = f64::NAN;
        r.tilt_db = f64::NAN;
        let params = DecisionEngine::default().decide(&r);

        // -23 LUFS interpolates between -30 and -22
        assert!((params.loudness.integrated_lufs - -16.25).abs() < 1e-9);
        assert_eq!(params.tone.high_shelf_gain_db, 0.0);
    }

    #[test]
    fn test_shelves_counter_the_tilt() {
        let engine = DecisionEngine::default();
        let mut previous: Option<MasteringParameters> = None;

        for step in -30..=30 {
            let mut r = report();
            r.tilt_db = step as f64;
            let params = engine.decide(&r);

            if let Some(prev) = previous {
                assert!(params.tone.high_shelf_gain_db <= prev.tone.high_shelf_gain_db);
                assert!(params.tone.low_shelf_gain_db >= prev.tone.low_shelf_gain_db);
            }
            if step < 0 {
                assert!(params.tone.high_shelf_gain_db > 0.0);
                assert!(params.tone.low_shelf_gain_db < 0.0);
            }
            previous = Some(params);
        }
    }

    #[test]
    fn test_quiet_bass_heavy_input() {
        let mut r = report();
        r.integrated_lufs = -24.0;
        r.tilt_db = -1.0;
        let params = DecisionEngine::default().decide(&r);

        assert!(params.loudness.integrated_lufs > r.integrated_lufs);
        assert_eq!(params.loudness.integrated_lufs, -16.5);
        assert!(params.tone.high_shelf_gain_db > 0.0);
    }

    #[test]
    fn test_narrow_stereo_enables_widening() {
        let mut r = report();
        r.stereo_correlation = 0.98;
        r.stereo_width_ratio = 0.05;
        r.stereo_narrow = true;
        assert!(DecisionEngine::default().decide(&r).stereo_widen);
    }

    #[test]
    fn test_sub_bass_excess_enables_high_pass() {
        let mut r = report();
        r.sub_bass_excess = true;
        assert!(DecisionEngine::default().decide(&r).tone.high_pass);
    }

    #[test]
    fn test_hot_input_gets_lower_ceiling() {
        let mut r = report();
        r.true_peak_dbfs = -0.05;
        assert_eq!(DecisionEngine::default().decide(&r).loudness.true_peak_db, -1.0);
    }

    #[test]
    fn test_compressor_step_table() {
        let engine = DecisionEngine::default();
        let decide = |lra: f64, rms: f64| {
            let mut r = report();
            r.loudness_range_lu = lra;
            r.rms_db = rms;
            engine.decide(&r).compressor
        };

        let wide = decide(16.0, -12.0);
        assert_eq!(wide.ratio, 1.3);
        assert_eq!(wide.threshold_db, -6.0);

        let moderate = decide(9.0, -21.0);
        assert_eq!(moderate.ratio, 1.5);
        assert_eq!(moderate.threshold_db, -17.0);

        let dense = decide(3.0, -10.0);
        assert_eq!(dense.ratio, 2.0);
        assert_eq!(dense.threshold_db, -10.0);

        // very quiet material is clamped to the threshold floor
        let quiet = decide(3.0, -60.0);
        assert_eq!(quiet.threshold_db, -40.0);
        assert_eq!(quiet.attack_ms, 20.0);
        assert_eq!(quiet.release_ms, 150.0);
    }
}
