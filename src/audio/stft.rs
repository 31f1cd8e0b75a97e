use std::sync::Arc;

use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;

use crate::audio::dsp::hann_window;
use crate::error::{AnalysisError, Result};

/// Short-time Fourier transform over centered, Hann-windowed frames.
///
/// Frames are centered on multiples of `hop` with `size / 2` zeros of padding
/// on both ends, so a signal of `n` samples yields `1 + n / hop` frames.
pub struct Stft {
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    hop: usize,
    input: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    power: Vec<f32>,
}

impl Stft {
    pub fn new(size: usize, hop: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(size);
        let input = fft.make_input_vec();
        let spectrum = fft.make_output_vec();
        let power = vec![0.0; spectrum.len()];

        Self {
            fft,
            window: hann_window(size),
            hop: hop.max(1),
            input,
            spectrum,
            power,
        }
    }

    pub fn size(&self) -> usize {
        self.window.len()
    }

    /// Number of frequency bins per frame (`size / 2 + 1`)
    pub fn bins(&self) -> usize {
        self.spectrum.len()
    }

    /// Center frequency of bin `k`
    pub fn bin_frequency(&self, k: usize, sample_rate: u32) -> f64 {
        k as f64 * sample_rate as f64 / self.size() as f64
    }

    /// Call `visit` with the power spectrum (|X|²) of every frame; returns the frame count
    pub fn for_each_power_frame<F>(&mut self, samples: &[f32], mut visit: F) -> Result<usize>
    where
        F: FnMut(&[f32]),
    {
        let size = self.size();
        let half = size / 2;
        let frames = 1 + samples.len() / self.hop;

        for frame in 0..frames {
            // frame center sits at `frame * hop` in the unpadded signal
            let origin = (frame * self.hop) as isize - half as isize;
            for (i, slot) in self.input.iter_mut().enumerate() {
                let index = origin + i as isize;
                let sample = if index >= 0 && (index as usize) < samples.len() {
                    samples[index as usize]
                } else {
                    0.0
                };
                *slot = sample * self.window[i];
            }

            self.fft
                .process(&mut self.input, &mut self.spectrum)
                .map_err(|e| AnalysisError::Fft { reason: e.to_string() })?;

            for (p, c) in self.power.iter_mut().zip(&self.spectrum) {
                *p = c.norm_sqr();
            }
            visit(&self.power);
        }

        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_count_is_centered() {
        let mut stft = Stft::new(1024, 256);
        let frames = stft.for_each_power_frame(&vec![0.0; 4096], |_| {}).unwrap();
        assert_eq!(frames, 1 + 4096 / 256);

        let frames = stft.for_each_power_frame(&[], |_| {}).unwrap();
        assert_eq!(frames, 1);
    }

    #[test]
    fn test_tone_lands_in_expected_bin() {
        let sample_rate = 48_000;
        let size = 4096;
        let bin = 100;
        let freq = bin as f32 * sample_rate as f32 / size as f32;
        let samples: Vec<f32> = (0..size * 4)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect();

        let mut stft = Stft::new(size, size / 4);
        let mut peak_bins = Vec::new();
        stft.for_each_power_frame(&samples, |power| {
            let (idx, _) = power
                .iter()
                .enumerate()
                .fold((0, 0.0f32), |best, (i, &p)| if p > best.1 { (i, p) } else { best });
            peak_bins.push(idx);
        })
        .unwrap();

        // interior frames see the full tone
        assert!(peak_bins[4..peak_bins.len() - 4].iter().all(|&b| b == bin));
        assert!((stft.bin_frequency(bin, sample_rate) - freq as f64).abs() < 1e-3);
    }
}
