use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use alsa::pcm::PCM;
use anyhow::Result;
use tokio::sync::mpsc;

use super::alsa_device::{self, AlsaParams};
use super::channels::downmix_to_mono;
use super::device::{CaptureStream, offer_chunk};
use super::pcm::{BlockFramer, EncodedChunk};
use super::resample::RateConverter;

/// Microphone capture on a dedicated `audio-record` thread.
pub struct AlsaCapture {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl AlsaCapture {
    /// Open the device on the caller's thread so a missing device or denied
    /// permission is reported here, then hand it to the record thread.
    pub fn start(
        device: &str,
        sample_rate: u32,
        block_size: usize,
        sink: mpsc::Sender<EncodedChunk>,
    ) -> Result<Self> {
        let (pcm, params) = alsa_device::open_capture(device, sample_rate, 1)?;
        let running = Arc::new(AtomicBool::new(true));

        let handle = {
            let running = running.clone();
            thread::Builder::new()
                .name("audio-record".into())
                .spawn(move || {
                    if let Err(e) =
                        record_thread(pcm, params, sample_rate, block_size, sink, &running)
                    {
                        log::error!("Recording thread error: {:#}", e);
                    }
                })?
        };

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }
}

impl CaptureStream for AlsaCapture {
    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for AlsaCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

fn record_thread(
    pcm: PCM,
    params: AlsaParams,
    target_rate: u32,
    block_size: usize,
    sink: mpsc::Sender<EncodedChunk>,
    running: &AtomicBool,
) -> Result<()> {
    let channels = params.channels as usize;

    // 硬件协商的采样率可能不是 16kHz，需要重采样
    let mut converter = RateConverter::new(params.sample_rate, target_rate)?;

    // ALSA read buffer (interleaved f32, one period)
    let mut read_buf = vec![0f32; params.period_size * channels];

    // Accumulates mono samples at the target rate until a full block is ready
    let mut framer = BlockFramer::new(block_size);

    let io = pcm.io_f32()?;

    log::info!(
        "Recording started: rate={} -> {}, ch={}, period={}, block={}",
        params.sample_rate,
        target_rate,
        channels,
        params.period_size,
        block_size,
    );

    while running.load(Ordering::Relaxed) {
        match io.readi(&mut read_buf) {
            Ok(frames) => {
                let mono = downmix_to_mono(&read_buf[..frames * channels], channels);
                let resampled = match converter.process(&mono) {
                    Ok(samples) => samples,
                    Err(e) => {
                        log::error!("Capture resample error: {:#}", e);
                        continue;
                    }
                };

                framer.push(&resampled);
                // blocks read after stop() are discarded
                while running.load(Ordering::Relaxed) {
                    let Some(chunk) = framer.next_block() else {
                        break;
                    };
                    // 实时线程不能阻塞：队列满则丢弃
                    if !offer_chunk(&sink, chunk) {
                        return Ok(());
                    }
                }
            }
            Err(e) => {
                log::warn!("ALSA capture error: {}, recovering...", e);
                if let Err(e2) = pcm.prepare() {
                    log::error!("Failed to recover PCM capture: {}", e2);
                    break;
                }
            }
        }
    }

    log::info!("Recording stopped");
    Ok(())
}
