//! audio - PCM codec, capture, and gapless scheduled playback
//!
//! Uses ALSA for audio I/O (feature `alsa`, on by default) and rubato for
//! sample-rate conversion when the hardware negotiates a different rate.

#![cfg_attr(not(feature = "alsa"), allow(dead_code))]

mod channels;
pub mod device;
pub mod pcm;
pub mod playback;
mod resample;
mod timeline;

#[cfg(feature = "alsa")]
mod alsa_device;
#[cfg(feature = "alsa")]
mod audio_system;
#[cfg(feature = "alsa")]
mod play;
#[cfg(feature = "alsa")]
mod record;

#[cfg(feature = "alsa")]
pub use audio_system::AlsaBackend;
pub use device::{AudioBackend, CaptureStream, OutputDevice};
pub use pcm::{AudioFrame, EncodedChunk};
pub use playback::{PlaybackScheduler, ScheduledFrame};

use crate::config::Config;

/// Device backend for this build.
#[cfg(feature = "alsa")]
pub fn default_backend(config: &Config) -> anyhow::Result<Box<dyn AudioBackend>> {
    Ok(Box::new(AlsaBackend::new(config)))
}

#[cfg(not(feature = "alsa"))]
pub fn default_backend(_config: &Config) -> anyhow::Result<Box<dyn AudioBackend>> {
    anyhow::bail!("built without an audio backend; enable the `alsa` feature")
}
