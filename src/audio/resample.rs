//! Offline sample-rate conversion of whole planar buffers with rubato.

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::error::{AnalysisError, Result};

const CHUNK_FRAMES: usize = 4096;

fn sinc_params() -> SincInterpolationParameters {
    SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    }
}

fn resample_error(e: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::Resample { reason: e.to_string() }
}

/// Resample every channel by `ratio` (output rate / input rate).
///
/// The filter delay is removed so output sample `k` lines up with input time
/// `k / ratio`, and the result is truncated to `round(len * ratio)` frames.
pub fn resample_planar(channels: &[Vec<f32>], ratio: f64) -> Result<Vec<Vec<f32>>> {
    if channels.is_empty() || !(ratio.is_finite() && ratio > 0.0) {
        return Err(AnalysisError::InvalidParameters {
            details: format!("cannot resample {} channels by {}", channels.len(), ratio),
        }
        .into());
    }
    let frames = channels[0].len();
    let expected = (frames as f64 * ratio).round() as usize;
    if frames == 0 {
        return Ok(vec![Vec::new(); channels.len()]);
    }

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, sinc_params(), CHUNK_FRAMES, channels.len())
        .map_err(resample_error)?;
    let delay = resampler.output_delay();

    let mut output: Vec<Vec<f32>> = vec![Vec::with_capacity(expected + delay + CHUNK_FRAMES); channels.len()];

    let mut position = 0;
    while position + resampler.input_frames_next() <= frames {
        let needed = resampler.input_frames_next();
        let slices: Vec<&[f32]> = channels.iter().map(|c| &c[position..position + needed]).collect();
        append(&mut output, resampler.process(&slices, None).map_err(resample_error)?);
        position += needed;
    }

    if position < frames {
        let slices: Vec<&[f32]> = channels.iter().map(|c| &c[position..]).collect();
        append(
            &mut output,
            resampler
                .process_partial(Some(slices.as_slice()), None)
                .map_err(resample_error)?,
        );
    }

    // push the tail out of the filter
    while output[0].len() < expected + delay {
        append(
            &mut output,
            resampler
                .process_partial(None::<&[&[f32]]>, None)
                .map_err(resample_error)?,
        );
    }

    for channel in &mut output {
        channel.drain(..delay);
        channel.truncate(expected);
    }
    Ok(output)
}

fn append(output: &mut [Vec<f32>], block: Vec<Vec<f32>>) {
    for (out, chunk) in output.iter_mut().zip(block) {
        out.extend_from_slice(&chunk);
    }
}
