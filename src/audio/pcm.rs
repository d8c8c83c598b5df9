//! PCM conversion shared by capture and playback.
//!
//! Wire format in both directions is base64 of little-endian signed 16-bit
//! samples. Outbound chunks carry the `audio/pcm;rate=16000` MIME tag;
//! inbound audio is assumed to be 24 kHz mono and is not negotiated.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::error::{LiveError, Result};

pub const INPUT_SAMPLE_RATE: u32 = 16_000;
pub const OUTPUT_SAMPLE_RATE: u32 = 24_000;
pub const INPUT_MIME_TYPE: &str = "audio/pcm;rate=16000";

const I16_SCALE: f32 = 32768.0;

/// Immutable block of interleaved f32 samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    samples: Arc<[f32]>,
    sample_rate: u32,
    channels: u16,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
            channels: channels.max(1),
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Shared handle to the sample storage, for handing to a device thread.
    pub fn shared_samples(&self) -> Arc<[f32]> {
        Arc::clone(&self.samples)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Samples per channel.
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Playback length in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }
}

/// Base64 PCM payload tagged with its MIME type, as sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedChunk {
    pub mime_type: String,
    pub data: String,
}

/// Quantize one sample. Out-of-range input saturates instead of wrapping.
pub fn f32_to_i16(sample: f32) -> i16 {
    // float -> int `as` casts saturate and map NaN to 0
    (sample * I16_SCALE).round() as i16
}

pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / I16_SCALE
}

/// Float samples to little-endian 16-bit PCM bytes.
pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        bytes.extend_from_slice(&f32_to_i16(sample).to_le_bytes());
    }
    bytes
}

/// Little-endian 16-bit PCM bytes to float samples.
pub fn decode_pcm16(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 2 != 0 {
        return Err(LiveError::Decode(format!(
            "odd PCM byte count: {}",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16_to_f32(i16::from_le_bytes([pair[0], pair[1]])))
        .collect())
}

/// Capture side: one block of mic samples to one transmittable chunk.
/// Total over any input; an empty block gives an empty payload.
pub fn encode_block(samples: &[f32]) -> EncodedChunk {
    EncodedChunk {
        mime_type: INPUT_MIME_TYPE.to_string(),
        data: STANDARD.encode(encode_pcm16(samples)),
    }
}

/// Cuts a stream of mic samples into fixed-size blocks, in arrival order.
pub struct BlockFramer {
    block_size: usize,
    pending: Vec<f32>,
}

impl BlockFramer {
    pub fn new(block_size: usize) -> Self {
        let block_size = block_size.max(1);
        Self {
            block_size,
            pending: Vec::with_capacity(block_size * 2),
        }
    }

    pub fn push(&mut self, samples: &[f32]) {
        self.pending.extend_from_slice(samples);
    }

    /// Next whole block, encoded. Leftover samples wait for the next push.
    pub fn next_block(&mut self) -> Option<EncodedChunk> {
        if self.pending.len() < self.block_size {
            return None;
        }
        let chunk = encode_block(&self.pending[..self.block_size]);
        self.pending.drain(..self.block_size);
        Some(chunk)
    }

    pub fn buffered(&self) -> usize {
        self.pending.len()
    }
}

/// Playback side: base64 payload to a frame at the declared rate and layout.
/// A trailing partial frame (fewer samples than `channels`) is discarded.
pub fn decode_chunk(data: &str, sample_rate: u32, channels: u16) -> Result<AudioFrame> {
    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|e| LiveError::Decode(format!("invalid base64: {e}")))?;
    let mut samples = decode_pcm16(&bytes)?;
    let channels = channels.max(1);
    let whole = samples.len() - samples.len() % channels as usize;
    samples.truncate(whole);
    Ok(AudioFrame::new(samples, sample_rate, channels))
}
