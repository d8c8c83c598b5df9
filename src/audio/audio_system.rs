//! ALSA-backed device contexts.
//!
//! Uses std::thread (NOT tokio tasks) for real-time audio I/O to avoid
//! contention with async network tasks.

use tokio::sync::mpsc;

use super::device::{AudioBackend, CaptureStream, OutputDevice};
use super::pcm::EncodedChunk;
use super::play::AlsaOutput;
use super::record::AlsaCapture;
use crate::config::Config;
use crate::error::{LiveError, Result};

/// Opens capture and playback contexts on the configured ALSA devices.
#[derive(Debug, Clone)]
pub struct AlsaBackend {
    /// ALSA capture device name (e.g. "default", "plughw:0,0")
    capture_device: String,
    /// ALSA playback device name
    playback_device: String,
    /// Desired ALSA playback period size (0 = let ALSA decide)
    playback_period_size: usize,
}

impl AlsaBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            capture_device: config.capture_device.to_string(),
            playback_device: config.playback_device.to_string(),
            playback_period_size: config.playback_period_size,
        }
    }
}

impl AudioBackend for AlsaBackend {
    fn open_capture(
        &self,
        sample_rate: u32,
        block_size: usize,
        sink: mpsc::Sender<EncodedChunk>,
    ) -> Result<Box<dyn CaptureStream>> {
        let capture = AlsaCapture::start(&self.capture_device, sample_rate, block_size, sink)
            .map_err(|e| LiveError::Acquisition(format!("{e:#}")))?;
        Ok(Box::new(capture))
    }

    fn open_output(&self, sample_rate: u32) -> Result<Box<dyn OutputDevice>> {
        let output = AlsaOutput::start(&self.playback_device, sample_rate, self.playback_period_size)
            .map_err(|e| LiveError::Acquisition(format!("{e:#}")))?;
        Ok(Box::new(output))
    }
}
