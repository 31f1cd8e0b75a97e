use std::fs::File;
use std::path::{Path, PathBuf};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info};

use crate::audio::resample::resample_planar;
use crate::audio::types::AudioBuffer;
use crate::config::AnalysisConfig;
use crate::error::{AudioError, MasteringError, Result};

/// Interleaved samples straight out of a decoder
struct Decoded {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: usize,
}

/// Decodes audio files into trimmed buffers at the analysis sample rate
pub struct AudioLoader;

impl AudioLoader {
    /// Decode, resample and trim a file on the blocking pool
    pub async fn load<P: AsRef<Path>>(path: P, config: &AnalysisConfig) -> Result<AudioBuffer> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let config = config.clone();
        tokio::task::spawn_blocking(move || Self::load_blocking(&path, &config))
            .await
            .map_err(|e| MasteringError::generic(format!("decoder task failed: {}", e)))?
    }

    /// Decode, resample to `target_sample_rate` and trim leading/trailing silence
    pub fn load_blocking(path: &Path, config: &AnalysisConfig) -> Result<AudioBuffer> {
        let extension = Self::detect_format(path).unwrap_or_default();
        let decoded = match extension.as_str() {
            "wav" => Self::decode_wav(path)?,
            "mp3" | "flac" | "ogg" | "m4a" | "aac" => Self::decode_with_symphonia(path)?,
            _ => return Err(AudioError::UnsupportedFormat { format: extension }.into()),
        };

        if decoded.samples.is_empty() {
            return Err(AudioError::Empty { path: path.display().to_string() }.into());
        }

        let buffer = AudioBuffer::from_interleaved(&decoded.samples, decoded.channels, decoded.sample_rate)?;
        let buffer = Self::resample(buffer, config.target_sample_rate)?;
        let trimmed = Self::trim_silence(&buffer, config)
            .ok_or_else(|| AudioError::Silent { path: path.display().to_string() })?;

        info!(
            "Loaded {}: {} ch, {} Hz -> {} Hz, {:.2}s after trim ({:.2}s before)",
            path.display(),
            decoded.channels,
            decoded.sample_rate,
            trimmed.sample_rate(),
            trimmed.duration_secs(),
            buffer.duration_secs()
        );
        Ok(trimmed)
    }

    fn decode_wav(path: &Path) -> Result<Decoded> {
        let load_failed = || AudioError::LoadFailed { path: path.display().to_string() };

        let reader = hound::WavReader::open(path).map_err(|_| load_failed())?;
        let spec = reader.spec();

        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| load_failed())?,
            hound::SampleFormat::Int => reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| Self::int_to_float(v, spec.bits_per_sample)))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| load_failed())?,
        };

        Ok(Decoded {
            samples,
            sample_rate: spec.sample_rate,
            channels: spec.channels as usize,
        })
    }

    fn decode_with_symphonia(path: &Path) -> Result<Decoded> {
        let load_failed = || AudioError::LoadFailed { path: path.display().to_string() };

        let file = File::open(path).map_err(|_| load_failed())?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|_| load_failed())?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(load_failed)?;
        let track_id = track.id;

        let sample_rate = track.codec_params.sample_rate.ok_or_else(|| AudioError::InvalidParameters {
            details: "No sample rate found".to_string(),
        })?;
        let channels = track
            .codec_params
            .channels
            .ok_or_else(|| AudioError::InvalidParameters {
                details: "No channel information found".to_string(),
            })?
            .count();

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|_| load_failed())?;

        let mut samples = Vec::new();
        // decoded buffer plus the frame capacity it was sized for
        let mut sample_buf: Option<(SampleBuffer<f32>, usize)> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                // end of stream
                Err(_) => break,
            };

            while !format.metadata().is_latest() {
                format.metadata().pop();
            }

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    debug!("Skipping undecodable packet in {}: {}", path.display(), e);
                    continue;
                }
                Err(_) => break,
            };

            let frames = decoded.capacity();
            if sample_buf.as_ref().map_or(true, |(_, capacity)| *capacity < frames) {
                sample_buf = Some((SampleBuffer::new(frames as u64, *decoded.spec()), frames));
            }
            let Some((buf, _)) = sample_buf.as_mut() else {
                continue;
            };
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }

        Ok(Decoded { samples, sample_rate, channels })
    }

    fn resample(buffer: AudioBuffer, target_rate: u32) -> Result<AudioBuffer> {
        if buffer.sample_rate() == target_rate {
            return Ok(buffer);
        }
        let ratio = target_rate as f64 / buffer.sample_rate() as f64;
        let channels = resample_planar(buffer.channels(), ratio)?;
        AudioBuffer::new(channels, target_rate)
    }

    /// Cut leading and trailing frames whose RMS is more than `trim_top_db`
    /// below the loudest frame. `None` when nothing is left.
    pub fn trim_silence(buffer: &AudioBuffer, config: &AnalysisConfig) -> Option<AudioBuffer> {
        let mono = buffer.mono_mix();
        let rms = frame_rms(&mono, config.trim_frame_length, config.trim_hop_length);

        let loudest = rms.iter().copied().fold(0.0f64, f64::max);
        if loudest <= 1e-10 {
            return None;
        }
        let threshold = loudest * 10f64.powf(-config.trim_top_db / 20.0);

        let first = rms.iter().position(|&r| r > threshold)?;
        let last = rms.iter().rposition(|&r| r > threshold)?;

        let start = first * config.trim_hop_length;
        let end = ((last + 1) * config.trim_hop_length).min(mono.len());
        if start >= end {
            return None;
        }

        let channels = buffer.channels().iter().map(|c| c[start..end].to_vec()).collect();
        AudioBuffer::new(channels, buffer.sample_rate()).ok()
    }

    /// Convert integer sample to float (-1.0 to 1.0)
    fn int_to_float(sample: i32, bit_depth: u16) -> f32 {
        match bit_depth {
            8 => sample as f32 / 128.0,
            16 => sample as f32 / 32768.0,
            24 => sample as f32 / 8388608.0,
            32 => sample as f32 / 2147483648.0,
            _ => sample as f32 / 32768.0,
        }
    }

    /// Lowercased file extension
    pub fn detect_format<P: AsRef<Path>>(path: P) -> Option<String> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }

    pub fn is_format_supported(extension: &str) -> bool {
        matches!(
            extension.to_lowercase().as_str(),
            "wav" | "mp3" | "flac" | "ogg" | "m4a" | "aac"
        )
    }
}

/// RMS of centered, zero-padded frames: frame `t` covers
/// `[t * hop - frame / 2, t * hop + frame / 2)`.
fn frame_rms(samples: &[f32], frame: usize, hop: usize) -> Vec<f64> {
    let hop = hop.max(1);
    let frame = frame.max(1);
    let half = frame / 2;

    let mut prefix = Vec::with_capacity(samples.len() + 1);
    prefix.push(0.0f64);
    let mut acc = 0.0f64;
    for &x in samples {
        acc += x as f64 * x as f64;
        prefix.push(acc);
    }

    (0..1 + samples.len() / hop)
        .map(|t| {
            let center = t * hop;
            let lo = center.saturating_sub(half).min(samples.len());
            let hi = (center + frame - half).min(samples.len());
            ((prefix[hi] - prefix[lo]) / frame as f64).sqrt()
        })
        .collect()
}
