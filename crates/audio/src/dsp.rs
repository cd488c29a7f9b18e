use rubato::{FftFixedIn, Resampler};
use tracing::debug;

use crate::AudioError;

const RESAMPLE_CHUNK: usize = 1024;

/// Converts a mono signal to `to_rate`, returning `ceil(len * to / from)` samples.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, AudioError> {
    if from_rate == 0 || to_rate == 0 {
        return Err(AudioError::InvalidInput(format!(
            "cannot resample {from_rate} Hz -> {to_rate} Hz"
        )));
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let mut resampler = FftFixedIn::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        RESAMPLE_CHUNK,
        2,
        1,
    )
    .map_err(|e| AudioError::Resample(e.to_string()))?;

    let scaled = samples.len() as u64 * to_rate as u64;
    let expected = scaled.div_ceil(from_rate as u64) as usize;
    let delay = resampler.output_delay();
    debug!(from_rate, to_rate, expected, delay, "resampling");

    let mut output = Vec::with_capacity(expected + delay + RESAMPLE_CHUNK);
    let mut chunk = vec![0.0f32; RESAMPLE_CHUNK];
    let mut offset = 0;
    // zero chunks past the end of the input flush the filter delay
    while output.len() < expected + delay {
        chunk.fill(0.0);
        if offset < samples.len() {
            let end = (offset + RESAMPLE_CHUNK).min(samples.len());
            chunk[..end - offset].copy_from_slice(&samples[offset..end]);
        }
        offset += RESAMPLE_CHUNK;
        let frames = resampler
            .process(&[chunk.as_slice()], None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;
        match frames.into_iter().next() {
            Some(channel) if !channel.is_empty() => output.extend(channel),
            _ => break,
        }
    }

    Ok(output.into_iter().skip(delay).take(expected).collect())
}
