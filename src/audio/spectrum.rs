//! Averaged power spectrum, 1/3-octave band levels, tilt and sub-bass excess.

use tracing::debug;

use crate::audio::dsp;
use crate::audio::stft::Stft;
use crate::audio::types::{AudioBuffer, BandLevel};
use crate::config::{BandRange, SpectralConfig};
use crate::error::Result;

/// Added to every PSD bin so empty spectra stay finite in dB
const PSD_FLOOR: f64 = 1e-18;

/// Spectral summary of one buffer
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralFeatures {
    pub bands: Vec<BandLevel>,
    pub tilt_db: f64,
    pub sub_level_db: Option<f64>,
    pub bass_level_db: Option<f64>,
    pub sub_bass_excess: bool,
}

/// Frame-averaged power spectral density
#[derive(Debug, Clone)]
pub struct PowerSpectrum {
    pub psd: Vec<f64>,
    pub fft_size: usize,
    pub sample_rate: u32,
}

impl PowerSpectrum {
    fn frequency(&self, bin: usize) -> f64 {
        bin as f64 * self.sample_rate as f64 / self.fft_size as f64
    }

    /// Mean PSD over bins with `low <= f < high`, or `None` if no bin qualifies
    pub fn mean_power(&self, low_hz: f64, high_hz: f64) -> Option<f64> {
        let (sum, count) = self
            .psd
            .iter()
            .enumerate()
            .filter(|(k, _)| {
                let f = self.frequency(*k);
                f >= low_hz && f < high_hz
            })
            .fold((0.0, 0usize), |(s, n), (_, &p)| (s + p, n + 1));
        (count > 0).then(|| sum / count as f64)
    }

    pub fn band_db(&self, band: BandRange) -> Option<f64> {
        self.mean_power(band.low_hz, band.high_hz)
            .map(|p| 10.0 * p.log10())
    }
}

/// Analyzer for the tonal balance of a buffer
#[derive(Debug, Clone, Default)]
pub struct SpectralAnalyzer {
    config: SpectralConfig,
}

impl SpectralAnalyzer {
    pub fn new(config: SpectralConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, buffer: &AudioBuffer) -> Result<SpectralFeatures> {
        let spectrum = self.power_spectrum(&buffer.mono_mix(), buffer.sample_rate())?;
        let bands = self.band_levels(&spectrum);
        let tilt_db = self.tilt(&bands);

        let sub_level_db = spectrum.band_db(self.config.sub_band);
        let bass_level_db = spectrum.band_db(self.config.bass_band);
        let sub_bass_excess = match (sub_level_db, bass_level_db) {
            (Some(sub), Some(bass)) => sub - bass > self.config.sub_excess_margin_db,
            _ => false,
        };

        debug!(
            "Spectrum: {} bands, tilt {:+.2} dB, sub {:?} dB vs bass {:?} dB",
            bands.len(),
            tilt_db,
            sub_level_db,
            bass_level_db
        );

        Ok(SpectralFeatures {
            bands,
            tilt_db,
            sub_level_db,
            bass_level_db,
            sub_bass_excess,
        })
    }

    /// Power spectrum averaged over all STFT frames
    pub fn power_spectrum(&self, samples: &[f32], sample_rate: u32) -> Result<PowerSpectrum> {
        let mut stft = Stft::new(self.config.fft_size, self.config.hop_size);
        let mut accumulated = vec![0.0f64; stft.bins()];

        let frames = stft.for_each_power_frame(samples, |power| {
            for (acc, &p) in accumulated.iter_mut().zip(power) {
                *acc += p as f64;
            }
        })?;

        let psd = accumulated
            .into_iter()
            .map(|sum| sum / frames as f64 + PSD_FLOOR)
            .collect();

        Ok(PowerSpectrum {
            psd,
            fft_size: self.config.fft_size,
            sample_rate,
        })
    }

    /// 1/3-octave band centers from the configured start frequency up to Nyquist
    pub fn band_centers(&self, sample_rate: u32) -> Vec<f64> {
        let nyquist = sample_rate as f64 / 2.0;
        let step = 2f64.powf(1.0 / 3.0);
        std::iter::successors(Some(self.config.band_start_hz), |&f| Some(f * step))
            .take_while(|&f| f < nyquist)
            .collect()
    }

    pub fn band_levels(&self, spectrum: &PowerSpectrum) -> Vec<BandLevel> {
        let edge = 2f64.powf(1.0 / 6.0);
        self.band_centers(spectrum.sample_rate)
            .into_iter()
            .map(|center_hz| BandLevel {
                center_hz,
                level_db: spectrum
                    .mean_power(center_hz / edge, center_hz * edge)
                    .map(|p| 10.0 * p.log10()),
            })
            .collect()
    }

    /// Mean high-reference band level minus mean low-reference band level.
    ///
    /// Zero when either reference range has no defined band.
    pub fn tilt(&self, bands: &[BandLevel]) -> f64 {
        let mean_in = |range: BandRange| {
            dsp::finite_mean(
                bands
                    .iter()
                    .filter(|b| b.center_hz >= range.low_hz && b.center_hz <= range.high_hz)
                    .filter_map(|b| b.level_db),
            )
        };

        match (mean_in(self.config.tilt_high), mean_in(self.config.tilt_low)) {
            (Some(high), Some(low)) => high - low,
            _ => 0.0,
        }
    }
}
