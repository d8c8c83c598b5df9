//! Device contexts the live controller drives.
//!
//! Real implementations live in the ALSA modules; tests use scripted fakes.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::pcm::{AudioFrame, EncodedChunk};
use crate::error::Result;

/// An output context with its own playback clock.
pub trait OutputDevice: Send {
    fn sample_rate(&self) -> u32;

    /// Current position of the device timeline, in seconds.
    fn current_time(&self) -> f64;

    /// Queue `frame` to start at `start_time` on the device timeline.
    fn schedule(&mut self, frame: AudioFrame, start_time: f64);

    /// Release the device. Safe to call more than once.
    fn close(&mut self);
}

/// A running microphone capture.
pub trait CaptureStream: Send {
    /// Stop delivering blocks and release the device. Safe to call more than once.
    fn stop(&mut self);
}

/// Hand one captured chunk to the controller without blocking. A full queue
/// drops the chunk; returns false once the receiver is gone.
pub fn offer_chunk(sink: &mpsc::Sender<EncodedChunk>, chunk: EncodedChunk) -> bool {
    match sink.try_send(chunk) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            log::warn!("Send queue full, dropping capture block");
            true
        }
        Err(TrySendError::Closed(_)) => {
            log::info!("Capture receiver dropped");
            false
        }
    }
}

/// Factory for device contexts.
pub trait AudioBackend: Send + Sync {
    /// Acquire the microphone. Blocks of `block_size` samples at
    /// `sample_rate` are encoded on the capture thread and pushed to `sink`
    /// without ever blocking; a full sink drops the chunk.
    fn open_capture(
        &self,
        sample_rate: u32,
        block_size: usize,
        sink: mpsc::Sender<EncodedChunk>,
    ) -> Result<Box<dyn CaptureStream>>;

    fn open_output(&self, sample_rate: u32) -> Result<Box<dyn OutputDevice>>;
}
