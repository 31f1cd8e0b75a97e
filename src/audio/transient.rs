//! Transient index: a high percentile of the spectral-flux onset envelope.
//!
//! Each STFT frame is converted to dB relative to the loudest bin in the
//! whole signal and floored `onset_top_db` below it. The envelope value of a
//! frame is the mean positive change per bin from the previous frame.

use tracing::debug;

use crate::audio::dsp;
use crate::audio::stft::Stft;
use crate::config::SpectralConfig;
use crate::error::Result;

/// Power floor before taking logs
const POWER_FLOOR: f32 = 1e-10;

#[derive(Debug, Clone, Default)]
pub struct TransientAnalyzer {
    config: SpectralConfig,
}

impl TransientAnalyzer {
    pub fn new(config: SpectralConfig) -> Self {
        Self { config }
    }

    /// Configured percentile of the onset envelope, in dB per bin
    pub fn transient_index(&self, samples: &[f32]) -> Result<f64> {
        let envelope = self.onset_envelope(samples)?;
        let index = dsp::percentile(&envelope, self.config.transient_percentile).unwrap_or(0.0);
        debug!("Transient index {:.3} over {} frames", index, envelope.len());
        Ok(index)
    }

    /// Onset strength per STFT frame; the first frame is always zero
    pub fn onset_envelope(&self, samples: &[f32]) -> Result<Vec<f64>> {
        let mut stft = Stft::new(self.config.onset_fft_size, self.config.onset_hop_size);

        // the dB reference is the loudest bin anywhere in the signal
        let mut max_power = 0.0f32;
        stft.for_each_power_frame(samples, |power| {
            max_power = power.iter().fold(max_power, |m, &p| m.max(p));
        })?;

        let reference_db = 10.0 * max_power.max(POWER_FLOOR).log10();
        let floor_db = -(self.config.onset_top_db as f32);

        let mut previous: Option<Vec<f32>> = None;
        let mut envelope = Vec::new();
        stft.for_each_power_frame(samples, |power| {
            let current: Vec<f32> = power
                .iter()
                .map(|&p| (10.0 * p.max(POWER_FLOOR).log10() - reference_db).max(floor_db))
                .collect();

            let flux = match &previous {
                Some(prev) => {
                    let rise: f64 = current
                        .iter()
                        .zip(prev)
                        .map(|(&c, &p)| (c - p).max(0.0) as f64)
                        .sum();
                    rise / current.len() as f64
                }
                None => 0.0,
            };
            envelope.push(flux);
            previous = Some(current);
        })?;

        Ok(envelope)
    }
}
