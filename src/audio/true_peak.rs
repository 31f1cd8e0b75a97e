use tracing::debug;

use crate::audio::dsp;
use crate::audio::resample::resample_planar;
use crate::audio::types::AudioBuffer;
use crate::error::Result;

/// Inter-sample peak estimation by integer oversampling
#[derive(Debug, Clone)]
pub struct TruePeakEstimator {
    oversampling: usize,
}

impl TruePeakEstimator {
    pub fn new(oversampling: usize) -> Self {
        Self { oversampling: oversampling.max(1) }
    }

    /// Largest absolute value of the oversampled signal, over all channels
    pub fn peak_amplitude(&self, buffer: &AudioBuffer) -> Result<f64> {
        if self.oversampling == 1 || buffer.is_empty() {
            return Ok(buffer.sample_peak() as f64);
        }

        let oversampled = resample_planar(buffer.channels(), self.oversampling as f64)?;
        let peak = oversampled
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0f32, |acc, &x| acc.max(x.abs()));

        // the interpolated signal never reads lower than the original samples
        Ok(peak.max(buffer.sample_peak()) as f64)
    }

    /// True peak in dBFS
    pub fn estimate(&self, buffer: &AudioBuffer) -> Result<f64> {
        let peak = self.peak_amplitude(buffer)?;
        let db = dsp::amplitude_to_db(peak);
        debug!(
            "True peak {:.2} dBFS (sample peak {:.2} dBFS, {}x)",
            db,
            dsp::amplitude_to_db(buffer.sample_peak() as f64),
            self.oversampling
        );
        Ok(db)
    }
}

impl Default for TruePeakEstimator {
    fn default() -> Self {
        Self::new(4)
    }
}
