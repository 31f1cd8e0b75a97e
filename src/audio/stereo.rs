use tracing::debug;

use crate::audio::dsp::ENERGY_FLOOR;
use crate::audio::types::AudioBuffer;
use crate::config::SpectralConfig;

/// Channels with a standard deviation below this count as constant
const CONSTANT_STD: f64 = 1e-6;

/// Stereo image of one buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StereoFeatures {
    /// Side energy over mid energy
    pub width_ratio: f64,

    /// Pearson correlation of left and right
    pub correlation: f64,

    pub narrow: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StereoAnalyzer {
    config: SpectralConfig,
}

impl StereoAnalyzer {
    pub fn new(config: SpectralConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, buffer: &AudioBuffer) -> StereoFeatures {
        let (left, right) = buffer.stereo_pair();
        let width_ratio = width_ratio(left, right);
        let correlation = correlation(left, right);
        let narrow = self.is_narrow(correlation, width_ratio);

        debug!(
            "Stereo: width {:.3}, correlation {:.3}, narrow={}",
            width_ratio, correlation, narrow
        );

        StereoFeatures { width_ratio, correlation, narrow }
    }

    pub fn is_narrow(&self, correlation: f64, width_ratio: f64) -> bool {
        correlation > self.config.narrow_correlation && width_ratio < self.config.narrow_width_ratio
    }
}

/// Mean-square side over mean-square mid
pub fn width_ratio(left: &[f32], right: &[f32]) -> f64 {
    let n = left.len().min(right.len());
    if n == 0 {
        return 0.0;
    }
    let (mid, side) = left
        .iter()
        .zip(right)
        .fold((0.0f64, 0.0f64), |(m, s), (&l, &r)| {
            let mid = 0.5 * (l as f64 + r as f64);
            let side = 0.5 * (l as f64 - r as f64);
            (m + mid * mid, s + side * side)
        });
    (side / n as f64) / (mid / n as f64 + ENERGY_FLOOR)
}

/// Pearson correlation; 1.0 when either channel is effectively constant
pub fn correlation(left: &[f32], right: &[f32]) -> f64 {
    let n = left.len().min(right.len());
    if n == 0 {
        return 1.0;
    }
    let mean_l = left[..n].iter().map(|&x| x as f64).sum::<f64>() / n as f64;
    let mean_r = right[..n].iter().map(|&x| x as f64).sum::<f64>() / n as f64;

    let (mut cov, mut var_l, mut var_r) = (0.0f64, 0.0f64, 0.0f64);
    for (&l, &r) in left.iter().zip(right) {
        let dl = l as f64 - mean_l;
        let dr = r as f64 - mean_r;
        cov += dl * dr;
        var_l += dl * dl;
        var_r += dr * dr;
    }

    let std_l = (var_l / n as f64).sqrt();
    let std_r = (var_r / n as f64).sqrt();
    if std_l < CONSTANT_STD || std_r < CONSTANT_STD {
        return 1.0;
    }
    (cov / (var_l.sqrt() * var_r.sqrt())).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn noise(seed: u64, len: usize, amplitude: f32) -> Vec<f32> {
        let mut rng = SmallRng::seed_from_u64(seed);
        (0..len).map(|_| rng.gen_range(-amplitude..amplitude)).collect()
    }

    #[test]
    fn test_mono_is_fully_correlated() {
        let buffer = AudioBuffer::mono(noise(1, 48_000, 0.5), 48_000).unwrap();
        let features = StereoAnalyzer::default().analyze(&buffer);
        assert!((features.correlation - 1.0).abs() < 1e-9);
        assert!(features.width_ratio < 1e-9);
        assert!(features.narrow);
    }

    #[test]
    fn test_independent_channels_are_wide() {
        let buffer = AudioBuffer::stereo(noise(1, 48_000, 0.5), noise(2, 48_000, 0.5), 48_000).unwrap();
        let features = StereoAnalyzer::default().analyze(&buffer);
        assert!(features.correlation.abs() < 0.05);
        assert!((features.width_ratio - 1.0).abs() < 0.1);
        assert!(!features.narrow);
    }

    #[test]
    fn test_slightly_decorrelated_mix_is_narrow() {
        let center = noise(3, 48_000, 0.5);
        let spread = noise(4, 48_000, 0.05);
        let left: Vec<f32> = center.iter().zip(&spread).map(|(c, s)| c + s).collect();
        let right: Vec<f32> = center.iter().zip(&spread).map(|(c, s)| c - s).collect();

        let features = StereoAnalyzer::default().analyze(&AudioBuffer::stereo(left, right, 48_000).unwrap());
        assert!(features.correlation > 0.97, "corr {}", features.correlation);
        assert!(features.width_ratio < 0.02, "width {}", features.width_ratio);
        assert!(features.narrow);
    }

    #[test]
    fn test_constant_channel_counts_as_correlated() {
        let left = vec![0.25f32; 1_000];
        let right = noise(5, 1_000, 0.5);
        assert_eq!(correlation(&left, &right), 1.0);
    }

    #[test]
    fn test_phase_inverted_channels() {
        let left = noise(6, 10_000, 0.5);
        let right: Vec<f32> = left.iter().map(|x| -x).collect();
        assert!((correlation(&left, &right) + 1.0).abs() < 1e-9);
        assert!(width_ratio(&left, &right) > 1e6);
    }
}
