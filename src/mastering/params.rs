use serde::{Deserialize, Serialize};

/// Loudness normalizer targets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoudnessTarget {
    /// Integrated loudness (LUFS)
    pub integrated_lufs: f64,

    /// True peak ceiling (dBTP)
    pub true_peak_db: f64,

    /// Loudness range (LU)
    pub loudness_range_lu: f64,
}

/// Shelving EQ and rumble filter settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToneParams {
    pub low_shelf_gain_db: f64,
    pub low_shelf_freq: f64,
    pub low_shelf_width: f64,
    pub high_shelf_gain_db: f64,
    pub high_shelf_freq: f64,
    pub high_shelf_width: f64,

    /// Insert a high-pass filter ahead of the shelves
    pub high_pass: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressorParams {
    pub ratio: f64,
    pub threshold_db: f64,
    pub attack_ms: f64,
    pub release_ms: f64,
}

/// Everything the filter chain needs to master one recording
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MasteringParameters {
    pub loudness: LoudnessTarget,
    pub tone: ToneParams,
    pub compressor: CompressorParams,
    pub stereo_widen: bool,
}

impl MasteringParameters {
    /// Multi-line description for captions and CLI output
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!(
                "Target: I {:.1} LUFS, TP {:.1} dBTP, LRA {:.1} LU",
                self.loudness.integrated_lufs, self.loudness.true_peak_db, self.loudness.loudness_range_lu
            ),
            format!(
                "EQ: low shelf {:+.1} dB @ {:.0} Hz, high shelf {:+.1} dB @ {:.0} Hz",
                self.tone.low_shelf_gain_db,
                self.tone.low_shelf_freq,
                self.tone.high_shelf_gain_db,
                self.tone.high_shelf_freq
            ),
            format!(
                "Compressor: {:.1}:1 at {:.1} dB ({:.0}/{:.0} ms)",
                self.compressor.ratio,
                self.compressor.threshold_db,
                self.compressor.attack_ms,
                self.compressor.release_ms
            ),
        ];
        if self.tone.high_pass {
            lines.push("High-pass: on".to_string());
        }
        if self.stereo_widen {
            lines.push("Stereo widening: on".to_string());
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_mentions_optional_stages_only_when_enabled() {
        let mut params = MasteringParameters {
            loudness: LoudnessTarget { integrated_lufs: -14.0, true_peak_db: -1.0, loudness_range_lu: 7.0 },
            tone: ToneParams {
                low_shelf_gain_db: 1.0,
                low_shelf_freq: 250.0,
                low_shelf_width: 1.0,
                high_shelf_gain_db: -0.5,
                high_shelf_freq: 8_000.0,
                high_shelf_width: 0.8,
                high_pass: false,
            },
            compressor: CompressorParams { ratio: 2.0, threshold_db: -18.0, attack_ms: 20.0, release_ms: 150.0 },
            stereo_widen: false,
        };

        let summary = params.summary();
        assert!(summary.contains("I -14.0 LUFS"));
        assert!(!summary.contains("High-pass"));

        params.tone.high_pass = true;
        params.stereo_widen = true;
        let summary = params.summary();
        assert!(summary.contains("High-pass: on"));
        assert!(summary.contains("Stereo widening: on"));
    }
}
