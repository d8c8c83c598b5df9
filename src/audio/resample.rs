//! Mono sample-rate conversion for devices that negotiate a rate other than
//! the one the wire format uses.

use anyhow::{Context, Result};
use rubato::{FftFixedIn, Resampler};

const CHUNK_SIZE: usize = 1024;

/// Streaming converter. Input is buffered until a full resampler chunk is
/// available, so output lags input by up to one chunk.
pub struct RateConverter {
    resampler: Option<FftFixedIn<f32>>,
    pending: Vec<f32>,
}

impl RateConverter {
    pub fn new(from_rate: u32, to_rate: u32) -> Result<Self> {
        let resampler = if from_rate == to_rate {
            None
        } else {
            Some(
                FftFixedIn::<f32>::new(from_rate as usize, to_rate as usize, CHUNK_SIZE, 2, 1)
                    .context("failed to create resampler")?,
            )
        };
        Ok(Self {
            resampler,
            pending: Vec::with_capacity(CHUNK_SIZE * 2),
        })
    }

    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }

    /// Feed samples in, get whatever whole chunks could be converted.
    pub fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let Some(resampler) = self.resampler.as_mut() else {
            return Ok(input.to_vec());
        };

        self.pending.extend_from_slice(input);
        let mut output = Vec::new();
        loop {
            let needed = resampler.input_frames_next();
            if self.pending.len() < needed {
                break;
            }
            let chunk = vec![self.pending[..needed].to_vec()];
            let resampled = resampler
                .process(&chunk, None)
                .map_err(|e| anyhow::anyhow!("resampling failed: {e:?}"))?;
            if let Some(channel) = resampled.into_iter().next() {
                output.extend(channel);
            }
            self.pending.drain(..needed);
        }
        Ok(output)
    }
}

/// Convert a complete buffer in one go. The resampler's delay is dropped
/// from the head and flushed out with trailing zeros, so the result is
/// aligned with the input and exactly `len * to_rate / from_rate` samples.
pub fn resample_buffer(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let expected =
        (samples.len() as u64 * to_rate as u64).div_ceil(from_rate as u64) as usize;

    let mut resampler =
        FftFixedIn::<f32>::new(from_rate as usize, to_rate as usize, CHUNK_SIZE, 2, 1)
            .context("failed to create resampler")?;
    let delay = resampler.output_delay();

    let mut output = Vec::with_capacity(delay + expected + CHUNK_SIZE);
    let mut pos = 0;
    while pos < samples.len() || output.len() < delay + expected {
        let needed = resampler.input_frames_next();
        let end = (pos + needed).min(samples.len());
        let mut input_chunk = samples[pos..end].to_vec();
        input_chunk.resize(needed, 0.0);

        let resampled = resampler
            .process(&[input_chunk], None)
            .map_err(|e| anyhow::anyhow!("resampling failed: {e:?}"))?;
        match resampled.into_iter().next() {
            Some(channel) if !channel.is_empty() => output.extend(channel),
            _ => break,
        }
        pos = end;
    }

    output.drain(..delay.min(output.len()));
    output.resize(expected, 0.0);
    Ok(output)
}
