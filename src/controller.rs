use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use crate::audio::playback::play_once;
use crate::audio::{
    AudioBackend, CaptureStream, EncodedChunk, OutputDevice, PlaybackScheduler, ScheduledFrame,
};
use crate::channel::{ChannelEvent, RemoteChannel, SessionHandle};
use crate::config::Config;
use crate::error::{LiveError, Result};
use crate::state_machine::LiveState;

const OUTPUT_CHANNELS: u16 = 1;
const SPEECH_POLL: Duration = Duration::from_millis(50);
// how long past the scheduled end we keep waiting for a stalled clock
const SPEECH_SLACK: Duration = Duration::from_secs(2);

/// Owns one live voice session: microphone, playback cursor and remote
/// channel. Everything is driven from a single task.
pub struct LiveController {
    state: LiveState,
    config: Config,
    backend: Box<dyn AudioBackend>,
    channel: Box<dyn RemoteChannel>,
    session_id: Uuid,

    capture: Option<Box<dyn CaptureStream>>,
    capture_rx: Option<mpsc::Receiver<EncodedChunk>>,
    playback: Option<PlaybackScheduler>,
    handle: Option<Box<dyn SessionHandle>>,
    event_rx: Option<mpsc::Receiver<ChannelEvent>>,

    // output context of the last one-shot utterance
    speech_output: Option<Box<dyn OutputDevice>>,
}

impl LiveController {
    pub fn new(
        config: Config,
        backend: Box<dyn AudioBackend>,
        channel: Box<dyn RemoteChannel>,
    ) -> Self {
        Self {
            state: LiveState::Idle,
            config,
            backend,
            channel,
            session_id: Uuid::nil(),
            capture: None,
            capture_rx: None,
            playback: None,
            handle: None,
            event_rx: None,
            speech_output: None,
        }
    }

    pub fn state(&self) -> LiveState {
        self.state
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Acquire devices and open the remote session. On any failure the
    /// controller is back in `Idle` with nothing held.
    pub async fn start(&mut self) -> Result<()> {
        if self.state != LiveState::Idle {
            return Err(LiveError::Busy(self.state));
        }
        self.session_id = Uuid::new_v4();
        self.state = LiveState::Connecting;
        tracing::info!(session_id = %self.session_id, "starting live session");

        match self.open_session().await {
            Ok(()) => {
                self.state = LiveState::Active;
                tracing::info!(session_id = %self.session_id, "live session active");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, error = %e, "live session failed to start");
                self.release();
                Err(e)
            }
        }
    }

    async fn open_session(&mut self) -> Result<()> {
        let output = self.backend.open_output(self.config.output_sample_rate)?;
        self.playback = Some(PlaybackScheduler::new(
            output,
            self.config.output_sample_rate,
            OUTPUT_CHANNELS,
        ));

        // chunks captured before the session is active wait here
        let (tx_capture, rx_capture) = mpsc::channel(self.config.send_queue_depth.max(1));
        self.capture = Some(self.backend.open_capture(
            self.config.input_sample_rate,
            self.config.block_size,
            tx_capture,
        )?);
        self.capture_rx = Some(rx_capture);

        let (tx_event, rx_event) = mpsc::channel(self.config.event_queue_depth.max(1));
        self.event_rx = Some(rx_event);
        self.handle = Some(self.channel.connect(tx_event).await?);
        Ok(())
    }

    /// Tear the session down. Valid from any state; a no-op when idle.
    pub fn stop(&mut self) {
        if self.state == LiveState::Idle {
            return;
        }
        tracing::info!(session_id = %self.session_id, from = %self.state, "stopping live session");
        self.state = LiveState::Closing;
        self.release();
    }

    fn release(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            capture.stop();
        }
        // drops anything still queued from the microphone
        self.capture_rx = None;
        if let Some(mut handle) = self.handle.take() {
            handle.close();
        }
        self.event_rx = None;
        if let Some(playback) = self.playback.take() {
            playback.close();
        }
        self.state = LiveState::Idle;
    }

    /// Forward one encoded microphone block. Only an active session sends.
    pub fn handle_capture(&mut self, chunk: EncodedChunk) {
        if self.state != LiveState::Active {
            return;
        }
        if let Some(handle) = &self.handle {
            handle.send(chunk);
        }
    }

    pub fn handle_channel_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Audio(data) => {
                let Some(playback) = self.playback.as_mut() else {
                    return;
                };
                match playback.enqueue(&data) {
                    Ok(frame) => tracing::trace!(
                        start = frame.start_time,
                        duration = frame.duration,
                        "scheduled model audio"
                    ),
                    Err(e) => tracing::warn!(
                        session_id = %self.session_id,
                        error = %e,
                        "dropping undecodable audio"
                    ),
                }
            }
            ChannelEvent::Interrupted => {
                tracing::info!(session_id = %self.session_id, "model turn interrupted");
            }
            ChannelEvent::TurnComplete => {
                tracing::debug!(session_id = %self.session_id, "model turn complete");
            }
            ChannelEvent::Closed => {
                tracing::info!(session_id = %self.session_id, "remote closed the session");
                self.stop();
            }
            ChannelEvent::Error(msg) => {
                tracing::error!(session_id = %self.session_id, error = %msg, "live session error");
                self.stop();
            }
        }
    }

    /// Pump both queues until the session is no longer active.
    pub async fn run(&mut self) {
        while self.state == LiveState::Active {
            let (Some(capture_rx), Some(event_rx)) =
                (self.capture_rx.as_mut(), self.event_rx.as_mut())
            else {
                break;
            };

            tokio::select! {
                chunk = capture_rx.recv() => match chunk {
                    Some(chunk) => self.handle_capture(chunk),
                    None => {
                        tracing::warn!(session_id = %self.session_id, "microphone stream ended");
                        self.stop();
                    }
                },
                event = event_rx.recv() => match event {
                    Some(event) => self.handle_channel_event(event),
                    None => {
                        tracing::warn!(session_id = %self.session_id, "session ended without notice");
                        self.stop();
                    }
                },
            }
        }
    }

    /// Fetch speech for `text` and play it immediately on a fresh output
    /// context. The previous utterance's context is released first.
    pub async fn speak(&mut self, text: &str) -> Result<ScheduledFrame> {
        let data = self.channel.request_once(text).await?;

        if let Some(mut previous) = self.speech_output.take() {
            previous.close();
        }
        let mut output = self.backend.open_output(self.config.output_sample_rate)?;
        let result = play_once(
            output.as_mut(),
            &data,
            self.config.output_sample_rate,
            OUTPUT_CHANNELS,
        );
        self.speech_output = Some(output);

        match &result {
            Ok(frame) => tracing::info!(duration = frame.duration, "speaking"),
            Err(e) => tracing::warn!(error = %e, "speech payload could not be played"),
        }
        result
    }

    /// Resolve once the device clock has passed the end of `frame`.
    pub async fn wait_for_speech(&self, frame: &ScheduledFrame) {
        let Some(output) = self.speech_output.as_ref() else {
            return;
        };
        let deadline = tokio::time::Instant::now()
            + Duration::from_secs_f64(frame.duration.max(0.0))
            + SPEECH_SLACK;
        while output.current_time() < frame.end_time() {
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!("output clock stalled; giving up on speech");
                break;
            }
            tokio::time::sleep(SPEECH_POLL).await;
        }
    }
}

impl Drop for LiveController {
    fn drop(&mut self) {
        self.stop();
        if let Some(mut output) = self.speech_output.take() {
            output.close();
        }
    }
}
