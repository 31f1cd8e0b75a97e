use tracing::{debug, info};

use crate::audio::dsp::ENERGY_FLOOR;
use crate::audio::loudness::{LoudnessMeter, LoudnessStats};
use crate::audio::spectrum::{SpectralAnalyzer, SpectralFeatures};
use crate::audio::stereo::StereoAnalyzer;
use crate::audio::transient::TransientAnalyzer;
use crate::audio::true_peak::TruePeakEstimator;
use crate::audio::types::{AnalysisReport, AudioBuffer};
use crate::config::Config;
use crate::error::Result;

/// Runs every meter over a buffer and assembles the [`AnalysisReport`]
#[derive(Debug, Clone, Default)]
pub struct AudioAnalyzer {
    loudness: LoudnessMeter,
    true_peak: TruePeakEstimator,
    spectral: SpectralAnalyzer,
    stereo: StereoAnalyzer,
    transient: TransientAnalyzer,
}

impl AudioAnalyzer {
    /// Create an analyzer with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &Config) -> Self {
        Self {
            loudness: LoudnessMeter::new(config.loudness.clone()),
            true_peak: TruePeakEstimator::new(config.loudness.true_peak_oversampling),
            spectral: SpectralAnalyzer::new(config.spectral.clone()),
            stereo: StereoAnalyzer::new(config.spectral.clone()),
            transient: TransientAnalyzer::new(config.spectral.clone()),
        }
    }

    /// Measure one buffer. The time-domain and frequency-domain meters run in parallel.
    pub fn analyze(&self, buffer: &AudioBuffer) -> Result<AnalysisReport> {
        info!(
            "Analyzing {:.2}s of audio ({} Hz, {} ch)",
            buffer.duration_secs(),
            buffer.sample_rate(),
            buffer.channel_count()
        );

        let mono = buffer.mono_mix();

        let (level, frequency) = rayon::join(
            || -> Result<(LoudnessStats, f64)> {
                debug!("Measuring loudness and true peak...");
                Ok((self.loudness.measure(buffer), self.true_peak.estimate(buffer)?))
            },
            || -> Result<(SpectralFeatures, f64)> {
                debug!("Measuring spectrum and transients...");
                Ok((self.spectral.analyze(buffer)?, self.transient.transient_index(&mono)?))
            },
        );
        let (loudness, true_peak_dbfs) = level?;
        let (spectral, transient_index) = frequency?;
        let stereo = self.stereo.analyze(buffer);
        let rms_db = rms_db(&mono);

        let report = AnalysisReport {
            integrated_lufs: loudness.integrated_lufs,
            loudness_range_lu: loudness.loudness_range_lu,
            rms_db,
            true_peak_dbfs,
            crest_db: true_peak_dbfs - rms_db,
            tilt_db: spectral.tilt_db,
            sub_bass_excess: spectral.sub_bass_excess,
            stereo_width_ratio: stereo.width_ratio,
            stereo_correlation: stereo.correlation,
            stereo_narrow: stereo.narrow,
            transient_index,
            bands: spectral.bands,
            sample_rate: buffer.sample_rate(),
            duration_secs: buffer.duration_secs(),
        };

        info!("Analysis complete: {}", report.summary_line());
        Ok(report)
    }
}

/// RMS level in dB of a mono signal
pub fn rms_db(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 20.0 * ENERGY_FLOOR.sqrt().log10();
    }
    let mean_square = samples.iter().map(|&x| x as f64 * x as f64).sum::<f64>() / samples.len() as f64;
    20.0 * (mean_square + ENERGY_FLOOR).sqrt().log10()
}
