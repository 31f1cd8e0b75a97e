//! Gated loudness metering in the manner of ITU-R BS.1770 / EBU R128.
//!
//! The K-weighted signal is cut into overlapping gating blocks once; the
//! integrated loudness and every loudness-range window are computed from
//! those block energies, so the range windows reuse exactly the same gating
//! algorithm on a subset of blocks.

use tracing::debug;

use crate::audio::dsp::{self, KWeighting};
use crate::audio::types::AudioBuffer;
use crate::config::LoudnessConfig;

/// Offset between mean-square energy and LUFS
const LUFS_OFFSET: f64 = -0.691;

/// Integrated loudness and loudness range of one buffer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessStats {
    pub integrated_lufs: f64,

    /// False when gating left nothing and the configured fallback was used
    pub gated: bool,

    pub loudness_range_lu: f64,
}

/// Per-block channel-summed mean-square energies of the K-weighted signal
#[derive(Debug, Clone)]
struct BlockEnergies {
    energies: Vec<f64>,
    block_len: usize,
    step: usize,
}

impl BlockEnergies {
    /// Index range of the blocks lying entirely inside `[start, start + len)`
    fn blocks_within(&self, start: usize, len: usize) -> std::ops::Range<usize> {
        if len < self.block_len {
            return 0..0;
        }
        let first = start.div_ceil(self.step);
        let last = (start + len - self.block_len) / self.step + 1;
        first.min(self.energies.len())..last.min(self.energies.len())
    }
}

/// Loudness meter driven by [`LoudnessConfig`]
#[derive(Debug, Clone, Default)]
pub struct LoudnessMeter {
    config: LoudnessConfig,
}

impl LoudnessMeter {
    pub fn new(config: LoudnessConfig) -> Self {
        Self { config }
    }

    /// Integrated loudness and loudness range in one pass over the signal
    pub fn measure(&self, buffer: &AudioBuffer) -> LoudnessStats {
        let blocks = self.block_energies(buffer);
        let gated = self.gated_loudness(&blocks.energies);
        let integrated_lufs = gated.unwrap_or(self.config.fallback_lufs);
        let loudness_range_lu = self.range_from_blocks(buffer, &blocks, integrated_lufs);

        debug!(
            "Loudness: {:.2} LUFS ({} blocks, gated={}), LRA {:.2} LU",
            integrated_lufs,
            blocks.energies.len(),
            gated.is_some(),
            loudness_range_lu
        );

        LoudnessStats {
            integrated_lufs,
            gated: gated.is_some(),
            loudness_range_lu,
        }
    }

    /// Gated integrated loudness, or the configured fallback
    pub fn integrated_loudness(&self, buffer: &AudioBuffer) -> f64 {
        let blocks = self.block_energies(buffer);
        self.gated_loudness(&blocks.energies)
            .unwrap_or(self.config.fallback_lufs)
    }

    /// Loudness range relative to a previously measured integrated loudness
    pub fn loudness_range(&self, buffer: &AudioBuffer, integrated_lufs: f64) -> f64 {
        let blocks = self.block_energies(buffer);
        self.range_from_blocks(buffer, &blocks, integrated_lufs)
    }

    fn block_energies(&self, buffer: &AudioBuffer) -> BlockEnergies {
        let sample_rate = buffer.sample_rate() as f64;
        let block_len = ((self.config.block_secs * sample_rate).round() as usize).max(1);
        let step = ((block_len as f64 * (1.0 - self.config.block_overlap)).round() as usize).max(1);

        let frames = buffer.len();
        if frames < block_len {
            return BlockEnergies { energies: Vec::new(), block_len, step };
        }
        let count = (frames - block_len) / step + 1;
        let mut energies = vec![0.0f64; count];

        for channel in buffer.channels() {
            let weighted = KWeighting::apply(buffer.sample_rate(), channel);

            // prefix sums of squares make each block O(1)
            let mut prefix = Vec::with_capacity(weighted.len() + 1);
            prefix.push(0.0f64);
            let mut acc = 0.0f64;
            for y in &weighted {
                acc += y * y;
                prefix.push(acc);
            }

            for (i, energy) in energies.iter_mut().enumerate() {
                let start = i * step;
                let sum = prefix[start + block_len] - prefix[start];
                *energy += (sum / block_len as f64).max(0.0);
            }
        }

        BlockEnergies { energies, block_len, step }
    }

    /// Two-stage gating over a set of block energies
    fn gated_loudness(&self, energies: &[f64]) -> Option<f64> {
        let absolute: Vec<f64> = energies
            .iter()
            .copied()
            .filter(|&e| energy_to_lufs(e) > self.config.absolute_gate_lufs)
            .collect();
        if absolute.is_empty() {
            return None;
        }

        let ungated_mean = absolute.iter().sum::<f64>() / absolute.len() as f64;
        let relative_gate = energy_to_lufs(ungated_mean) + self.config.relative_gate_lu;

        let surviving: Vec<f64> = absolute
            .into_iter()
            .filter(|&e| energy_to_lufs(e) > relative_gate)
            .collect();
        if surviving.is_empty() {
            return None;
        }

        let mean = surviving.iter().sum::<f64>() / surviving.len() as f64;
        Some(energy_to_lufs(mean))
    }

    fn range_from_blocks(&self, buffer: &AudioBuffer, blocks: &BlockEnergies, integrated_lufs: f64) -> f64 {
        let sample_rate = buffer.sample_rate() as f64;
        let window = (self.config.lra_window_secs * sample_rate).round() as usize;
        let hop = ((self.config.lra_hop_secs * sample_rate).round() as usize).max(1);
        let frames = buffer.len();

        let mut short_term = Vec::new();
        let mut start = 0usize;
        while window > 0 && start + window <= frames {
            let peak = buffer
                .channels()
                .iter()
                .flat_map(|c| c[start..start + window].iter())
                .fold(0.0f32, |acc, &x| acc.max(x.abs()));

            if (peak as f64) >= self.config.silence_peak {
                let range = blocks.blocks_within(start, window);
                if let Some(value) = self.gated_loudness(&blocks.energies[range]) {
                    short_term.push(value);
                }
            }
            start += hop;
        }

        if short_term.is_empty() {
            return 0.0;
        }

        let gate = integrated_lufs + self.config.lra_relative_gate_lu;
        let gated: Vec<f64> = short_term.iter().copied().filter(|&v| v > gate).collect();
        let values = if gated.len() < self.config.lra_min_windows {
            &short_term
        } else {
            &gated
        };

        let low = dsp::percentile(values, self.config.lra_low_percentile);
        let high = dsp::percentile(values, self.config.lra_high_percentile);
        match (low, high) {
            (Some(low), Some(high)) => (high - low).max(0.0),
            _ => 0.0,
        }
    }
}

fn energy_to_lufs(energy: f64) -> f64 {
    if energy <= 0.0 {
        f64::NEG_INFINITY
    } else {
        LUFS_OFFSET + 10.0 * energy.log10()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 48_000;

    fn sine(freq: f32, amplitude: f32, secs: f32) -> Vec<f32> {
        (0..(SR as f32 * secs) as usize)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / SR as f32).sin())
            .collect()
    }

    #[test]
    fn test_full_scale_sine_reads_minus_three() {
        let buffer = AudioBuffer::mono(sine(1_000.0, 1.0, 5.0), SR).unwrap();
        let stats = LoudnessMeter::default().measure(&buffer);
        assert!(stats.gated);
        assert!((stats.integrated_lufs - -3.01).abs() < 0.3, "got {}", stats.integrated_lufs);
    }

    #[test]
    fn test_stereo_adds_channel_energy() {
        let tone = sine(1_000.0, 0.5, 5.0);
        let mono = AudioBuffer::mono(tone.clone(), SR).unwrap();
        let stereo = AudioBuffer::stereo(tone.clone(), tone, SR).unwrap();

        let meter = LoudnessMeter::default();
        let difference = meter.integrated_loudness(&stereo) - meter.integrated_loudness(&mono);
        assert!((difference - 3.01).abs() < 0.05, "got {}", difference);
    }

    #[test]
    fn test_silence_falls_back_to_default() {
        let buffer = AudioBuffer::mono(vec![0.0; SR as usize * 5], SR).unwrap();
        let stats = LoudnessMeter::default().measure(&buffer);
        assert!(!stats.gated);
        assert_eq!(stats.integrated_lufs, -23.0);
        assert_eq!(stats.loudness_range_lu, 0.0);
    }

    #[test]
    fn test_too_short_for_one_block() {
        let buffer = AudioBuffer::mono(sine(440.0, 0.5, 0.2), SR).unwrap();
        let stats = LoudnessMeter::default().measure(&buffer);
        assert_eq!(stats.integrated_lufs, -23.0);
        assert_eq!(stats.loudness_range_lu, 0.0);
    }

    #[test]
    fn test_constant_loudness_has_near_zero_range() {
        let buffer = AudioBuffer::mono(sine(1_000.0, 0.3, 12.0), SR).unwrap();
        let stats = LoudnessMeter::default().measure(&buffer);
        assert!(stats.loudness_range_lu >= 0.0);
        assert!(stats.loudness_range_lu < 0.1, "got {}", stats.loudness_range_lu);
    }

    #[test]
    fn test_dynamic_material_has_wide_range() {
        let mut samples = sine(1_000.0, 0.5, 10.0);
        samples.extend(sine(1_000.0, 0.1, 10.0));
        let buffer = AudioBuffer::mono(samples, SR).unwrap();

        let stats = LoudnessMeter::default().measure(&buffer);
        assert!(stats.loudness_range_lu > 10.0, "got {}", stats.loudness_range_lu);
        assert!(stats.loudness_range_lu < 16.0, "got {}", stats.loudness_range_lu);
    }

    #[test]
    fn test_relative_gate_ignores_quiet_tail() {
        let loud = sine(1_000.0, 0.5, 5.0);
        let mut with_tail = loud.clone();
        with_tail.extend(sine(1_000.0, 0.001, 5.0));

        let meter = LoudnessMeter::default();
        let plain = meter.integrated_loudness(&AudioBuffer::mono(loud, SR).unwrap());
        let tailed = meter.integrated_loudness(&AudioBuffer::mono(with_tail, SR).unwrap());
        assert!((plain - tailed).abs() < 0.2, "{} vs {}", plain, tailed);
    }

    #[test]
    fn test_blocks_within_window() {
        let blocks = BlockEnergies {
            energies: vec![0.0; 100],
            block_len: 400,
            step: 100,
        };
        // window [1000, 4000) holds blocks starting at 1000..=3600
        assert_eq!(blocks.blocks_within(1000, 3000), 10..37);
        assert_eq!(blocks.blocks_within(0, 300), 0..0);
    }
}
