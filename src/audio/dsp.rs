//! Small numeric building blocks shared by the meters.

use std::f64::consts::PI;

/// Floor added before taking logarithms of energies
pub const ENERGY_FLOOR: f64 = 1e-12;

/// Second-order IIR section, transposed direct form II
#[derive(Debug, Clone, Copy)]
pub struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    z1: f64,
    z2: f64,
}

impl Biquad {
    /// Coefficients must already be normalized by a0
    pub fn new(b0: f64, b1: f64, b2: f64, a1: f64, a2: f64) -> Self {
        Self { b0, b1, b2, a1, a2, z1: 0.0, z2: 0.0 }
    }

    #[inline(always)]
    pub fn process(&mut self, x: f64) -> f64 {
        let y = self.b0 * x + self.z1;
        self.z1 = self.b1 * x - self.a1 * y + self.z2;
        self.z2 = self.b2 * x - self.a2 * y;
        y
    }
}

/// BS.1770 K-weighting: high-shelf pre-filter followed by the RLB high-pass
#[derive(Debug, Clone, Copy)]
pub struct KWeighting {
    shelf: Biquad,
    highpass: Biquad,
}

impl KWeighting {
    /// Coefficients derived by bilinear transform for any sample rate
    pub fn new(sample_rate: f64) -> Self {
        let f0 = 1681.974_450_955_533;
        let gain_db = 3.999_843_853_97;
        let q = 0.707_175_236_955_419_6;

        let k = (PI * f0 / sample_rate).tan();
        let vh = 10f64.powf(gain_db / 20.0);
        let vb = 10f64.powf(gain_db / 40.0);
        let a0 = 1.0 + k / q + k * k;

        let shelf = Biquad::new(
            (vh + vb * k / q + k * k) / a0,
            2.0 * (k * k - vh) / a0,
            (vh - vb * k / q + k * k) / a0,
            2.0 * (k * k - 1.0) / a0,
            (1.0 - k / q + k * k) / a0,
        );

        let f0 = 38.135_470_876_024_44;
        let q = 0.500_327_037_323_877_3;
        let k = (PI * f0 / sample_rate).tan();
        let a0 = 1.0 + k / q + k * k;

        let highpass = Biquad::new(
            1.0 / a0,
            -2.0 / a0,
            1.0 / a0,
            2.0 * (k * k - 1.0) / a0,
            (1.0 - k / q + k * k) / a0,
        );

        Self { shelf, highpass }
    }

    #[inline(always)]
    pub fn process(&mut self, x: f64) -> f64 {
        self.highpass.process(self.shelf.process(x))
    }

    /// Filter a whole channel from a zeroed state
    pub fn apply(sample_rate: u32, samples: &[f32]) -> Vec<f64> {
        let mut filter = Self::new(sample_rate as f64);
        samples.iter().map(|&x| filter.process(x as f64)).collect()
    }
}

/// Periodic Hann window (the FFT-friendly variant)
pub fn hann_window(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / len as f32;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

/// Percentile with linear interpolation between closest ranks.
///
/// Returns `None` for an empty slice. NaN values are ignored.
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Piecewise-linear interpolation; constant extrapolation past either end.
///
/// `xs` must be strictly increasing and as long as `ys`.
pub fn interpolate(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    debug_assert_eq!(xs.len(), ys.len());
    if xs.is_empty() {
        return f64::NAN;
    }
    if x.is_nan() {
        return f64::NAN;
    }
    if x <= xs[0] {
        return ys[0];
    }
    let last = xs.len() - 1;
    if x >= xs[last] {
        return ys[last];
    }

    let upper = xs.partition_point(|&p| p <= x);
    let (x0, x1) = (xs[upper - 1], xs[upper]);
    let (y0, y1) = (ys[upper - 1], ys[upper]);
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// Mean of the finite values, `None` if there are none
pub fn finite_mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Amplitude to dBFS with a floor so that silence stays finite
pub fn amplitude_to_db(amplitude: f64) -> f64 {
    20.0 * (amplitude.abs() + ENERGY_FLOOR).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_matches_linear_interpolation() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 0.0), Some(1.0));
        assert_eq!(percentile(&values, 50.0), Some(3.0));
        assert_eq!(percentile(&values, 100.0), Some(5.0));
        assert!((percentile(&values, 95.0).unwrap() - 4.8).abs() < 1e-12);
        assert!((percentile(&values, 10.0).unwrap() - 1.4).abs() < 1e-12);
        assert_eq!(percentile(&[], 50.0), None);
    }

    #[test]
    fn test_interpolate() {
        let xs = [-20.0, 0.0, 20.0];
        let ys = [3.0, 0.0, -3.0];
        assert_eq!(interpolate(-40.0, &xs, &ys), 3.0);
        assert_eq!(interpolate(40.0, &xs, &ys), -3.0);
        assert_eq!(interpolate(0.0, &xs, &ys), 0.0);
        assert!((interpolate(-10.0, &xs, &ys) - 1.5).abs() < 1e-12);
        assert!(interpolate(f64::NAN, &xs, &ys).is_nan());
    }

    #[test]
    fn test_k_weighting_coefficients_48k() {
        // ITU-R BS.1770-4 reference values at 48 kHz
        let k = KWeighting::new(48_000.0);
        let tol = 5e-4;
        assert!((k.shelf.b0 - 1.535_124_859_586_97).abs() < tol);
        assert!((k.shelf.b1 - -2.691_696_189_406_38).abs() < tol);
        assert!((k.shelf.b2 - 1.198_392_810_852_85).abs() < tol);
        assert!((k.shelf.a1 - -1.690_659_293_182_41).abs() < tol);
        assert!((k.shelf.a2 - 0.732_480_774_215_85).abs() < tol);
        assert!((k.highpass.a1 - -1.990_047_454_833_98).abs() < tol);
        assert!((k.highpass.a2 - 0.990_072_250_366_21).abs() < tol);
    }

    #[test]
    fn test_hann_window_is_periodic() {
        let w = hann_window(8);
        assert_eq!(w[0], 0.0);
        assert!((w[4] - 1.0).abs() < 1e-6);
        assert!((w[1] - w[7]).abs() < 1e-6);
    }

    #[test]
    fn test_finite_mean_skips_nan() {
        assert_eq!(finite_mean([1.0, f64::NAN, 3.0]), Some(2.0));
        assert_eq!(finite_mean([f64::NEG_INFINITY]), None);
    }
}
