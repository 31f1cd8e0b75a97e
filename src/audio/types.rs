use serde::{Deserialize, Serialize};

use crate::error::{AudioError, Result};

/// Decoded, trimmed PCM audio
///
/// Samples are stored planar, one `Vec` per channel, all of equal length.
/// Only mono and stereo material is accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Build a buffer from planar channel data
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if !(1..=2).contains(&channels.len()) {
            return Err(AudioError::UnsupportedChannels { channels: channels.len() }.into());
        }
        if sample_rate == 0 {
            return Err(AudioError::InvalidParameters {
                details: "sample rate must be positive".to_string(),
            }
            .into());
        }
        let frames = channels[0].len();
        if channels.iter().any(|c| c.len() != frames) {
            return Err(AudioError::InvalidParameters {
                details: "channels have different lengths".to_string(),
            }
            .into());
        }
        Ok(Self { channels, sample_rate })
    }

    /// Single-channel convenience constructor
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(vec![samples], sample_rate)
    }

    /// Two-channel convenience constructor
    pub fn stereo(left: Vec<f32>, right: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(vec![left, right], sample_rate)
    }

    /// Split interleaved samples into planar channels
    pub fn from_interleaved(samples: &[f32], channel_count: usize, sample_rate: u32) -> Result<Self> {
        if !(1..=2).contains(&channel_count) {
            return Err(AudioError::UnsupportedChannels { channels: channel_count }.into());
        }
        let mut channels = vec![Vec::with_capacity(samples.len() / channel_count); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (plane, &sample) in channels.iter_mut().zip(frame) {
                plane.push(sample);
            }
        }
        Self::new(channels, sample_rate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Number of sample frames
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    /// Left/right view; mono is presented as two identical channels
    pub fn stereo_pair(&self) -> (&[f32], &[f32]) {
        let left = &self.channels[0];
        let right = self.channels.get(1).unwrap_or(left);
        (left, right)
    }

    /// Average of all channels
    pub fn mono_mix(&self) -> Vec<f32> {
        if self.channels.len() == 1 {
            return self.channels[0].clone();
        }

        let (left, right) = self.stereo_pair();
        left.iter().zip(right).map(|(&l, &r)| (l + r) * 0.5).collect()
    }

    /// Largest absolute sample value over all channels
    pub fn sample_peak(&self) -> f32 {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0f32, |acc, &x| acc.max(x.abs()))
    }
}

/// Level of one 1/3-octave band; `level_db` is `None` when no FFT bin falls in it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandLevel {
    pub center_hz: f64,
    pub level_db: Option<f64>,
}

/// Complete measurement record for one analyzed buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Gated integrated loudness (LUFS)
    pub integrated_lufs: f64,

    /// Loudness range (LU)
    pub loudness_range_lu: f64,

    /// RMS level of the mono mix (dBFS)
    pub rms_db: f64,

    /// Oversampled peak level (dBFS)
    pub true_peak_dbfs: f64,

    /// `true_peak_dbfs - rms_db`
    pub crest_db: f64,

    /// High reference bands minus low reference bands (dB)
    pub tilt_db: f64,

    pub sub_bass_excess: bool,

    /// Side/mid energy ratio (0 = mono)
    pub stereo_width_ratio: f64,

    /// Pearson correlation between left and right
    pub stereo_correlation: f64,

    pub stereo_narrow: bool,

    /// Percentile of the onset-strength envelope
    pub transient_index: f64,

    pub bands: Vec<BandLevel>,

    pub sample_rate: u32,
    pub duration_secs: f64,
}

impl AnalysisReport {
    /// Short single-line description for logs and captions
    pub fn summary_line(&self) -> String {
        format!(
            "I={:.1} LUFS, LRA={:.1} LU, TP={:.1} dBFS, RMS={:.1} dB, tilt={:+.1} dB, width={:.3}{}{}",
            self.integrated_lufs,
            self.loudness_range_lu,
            self.true_peak_dbfs,
            self.rms_db,
            self.tilt_db,
            self.stereo_width_ratio,
            if self.sub_bass_excess { ", sub-bass excess" } else { "" },
            if self.stereo_narrow { ", narrow stereo" } else { "" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleaved_split() {
        let buffer = AudioBuffer::from_interleaved(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2, 48_000).unwrap();
        assert_eq!(buffer.channels()[0], vec![1.0, 3.0, 5.0]);
        assert_eq!(buffer.channels()[1], vec![2.0, 4.0, 6.0]);
        assert_eq!(buffer.mono_mix(), vec![1.5, 3.5, 5.5]);
    }

    #[test]
    fn test_mono_is_presented_as_identical_pair() {
        let buffer = AudioBuffer::mono(vec![0.1, -0.2, 0.3], 48_000).unwrap();
        let (left, right) = buffer.stereo_pair();
        assert_eq!(left, right);
    }

    #[test]
    fn test_rejects_unequal_channels() {
        assert!(AudioBuffer::stereo(vec![0.0; 4], vec![0.0; 3], 48_000).is_err());
        assert!(AudioBuffer::new(vec![vec![0.0]; 3], 48_000).is_err());
    }

    #[test]
    fn test_sample_peak_and_duration() {
        let buffer = AudioBuffer::stereo(vec![0.25; 24_000], vec![-0.5; 24_000], 48_000).unwrap();
        assert_eq!(buffer.sample_peak(), 0.5);
        assert_eq!(buffer.duration_secs(), 0.5);
    }
}
