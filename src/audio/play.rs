use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use alsa::pcm::PCM;
use anyhow::Result;

use super::alsa_device::{self, AlsaParams};
use super::channels::{downmix_to_mono, expand_into};
use super::device::OutputDevice;
use super::pcm::AudioFrame;
use super::resample::resample_buffer;
use super::timeline::Timeline;

/// Speaker output: an `audio-play` thread renders the shared timeline into
/// ALSA one period at a time.
pub struct AlsaOutput {
    timeline: Arc<Mutex<Timeline>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    device_rate: u32,
}

impl AlsaOutput {
    pub fn start(device: &str, sample_rate: u32, period_size: usize) -> Result<Self> {
        let period_size_opt = if period_size > 0 {
            Some(period_size)
        } else {
            None
        };
        let (pcm, params) = alsa_device::open_playback(device, sample_rate, 1, period_size_opt)?;

        let device_rate = params.sample_rate;
        let timeline = Arc::new(Mutex::new(Timeline::new(device_rate)));
        let running = Arc::new(AtomicBool::new(true));

        let handle = {
            let running = running.clone();
            let timeline = timeline.clone();
            thread::Builder::new()
                .name("audio-play".into())
                .spawn(move || {
                    if let Err(e) = play_thread(pcm, params, &timeline, &running) {
                        log::error!("Playback thread error: {:#}", e);
                    }
                })?
        };

        Ok(Self {
            timeline,
            running,
            handle: Some(handle),
            device_rate,
        })
    }
}

fn lock_timeline(timeline: &Mutex<Timeline>) -> MutexGuard<'_, Timeline> {
    timeline.lock().unwrap_or_else(PoisonError::into_inner)
}

impl OutputDevice for AlsaOutput {
    fn sample_rate(&self) -> u32 {
        self.device_rate
    }

    fn current_time(&self) -> f64 {
        lock_timeline(&self.timeline).current_time()
    }

    fn schedule(&mut self, frame: AudioFrame, start_time: f64) {
        let channels = frame.channels() as usize;
        let samples: Arc<[f32]> = if frame.sample_rate() != self.device_rate {
            let mono = downmix_to_mono(frame.samples(), channels);
            match resample_buffer(&mono, frame.sample_rate(), self.device_rate) {
                Ok(resampled) => resampled.into(),
                Err(e) => {
                    log::error!("Dropping frame, resample failed: {:#}", e);
                    return;
                }
            }
        } else if channels > 1 {
            downmix_to_mono(frame.samples(), channels).into()
        } else {
            frame.shared_samples()
        };

        lock_timeline(&self.timeline).insert(start_time, samples);
    }

    fn close(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        lock_timeline(&self.timeline).clear();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for AlsaOutput {
    fn drop(&mut self) {
        self.close();
    }
}

fn play_thread(
    pcm: PCM,
    params: AlsaParams,
    timeline: &Mutex<Timeline>,
    running: &AtomicBool,
) -> Result<()> {
    let channels = params.channels as usize;
    let period = params.period_size;

    let mut mono = vec![0f32; period];
    let mut interleaved: Vec<f32> = Vec::with_capacity(period * channels);

    let io = pcm.io_f32()?;

    log::info!(
        "Playback started: rate={}, ch={}, period={}",
        params.sample_rate,
        channels,
        period,
    );

    while running.load(Ordering::Relaxed) {
        // 锁只在渲染一个 period 期间持有
        lock_timeline(timeline).render(&mut mono);

        let out: &[f32] = if channels == 1 {
            &mono
        } else {
            expand_into(&mono, channels, &mut interleaved);
            &interleaved
        };

        // Write with retry loop to handle short writes and XRUN recovery.
        let total_frames = out.len() / channels;
        let mut frames_written = 0;
        let mut retry_count = 0u32;

        while frames_written < total_frames {
            let offset = frames_written * channels;
            match io.writei(&out[offset..]) {
                Ok(n) => {
                    frames_written += n;
                    retry_count = 0;
                }
                Err(e) => {
                    log::warn!("ALSA XRUN or error: {}, recovering...", e);
                    retry_count += 1;

                    if let Err(e2) = pcm.prepare() {
                        log::error!("Failed to recover PCM playback: {}", e2);
                        return Ok(());
                    }

                    // 熔断器：底层持续跟不上写入速度时，丢弃剩余帧防止死循环
                    if retry_count >= 3 {
                        log::error!(
                            "Max recovery retries ({}) reached. Dropping {} unwritten frames.",
                            retry_count,
                            total_frames - frames_written
                        );
                        break;
                    }
                }
            }
        }
    }

    log::info!("Playback stopped");
    Ok(())
}
