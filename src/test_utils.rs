//! In-memory fakes for the device and remote-channel seams.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::audio::{AudioBackend, AudioFrame, CaptureStream, EncodedChunk, OutputDevice};
use crate::channel::{ChannelEvent, RemoteChannel, SessionHandle};
use crate::error::{LiveError, Result};

// ---------------------------------------------------------------------------
// Output device with a hand-driven clock
// ---------------------------------------------------------------------------

#[derive(Default)]
struct OutputLog {
    now: f64,
    starts: Vec<f64>,
    closes: usize,
}

/// Clones share one clock and one log.
#[derive(Clone)]
pub struct ManualOutput {
    sample_rate: u32,
    log: Arc<Mutex<OutputLog>>,
}

impl ManualOutput {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            log: Arc::default(),
        }
    }

    pub fn set_time(&self, now: f64) {
        self.log.lock().unwrap().now = now;
    }

    pub fn scheduled_starts(&self) -> Vec<f64> {
        self.log.lock().unwrap().starts.clone()
    }

    pub fn close_count(&self) -> usize {
        self.log.lock().unwrap().closes
    }
}

impl OutputDevice for ManualOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        self.log.lock().unwrap().now
    }

    fn schedule(&mut self, _frame: AudioFrame, start_time: f64) {
        self.log.lock().unwrap().starts.push(start_time);
    }

    fn close(&mut self) {
        self.log.lock().unwrap().closes += 1;
    }
}

// ---------------------------------------------------------------------------
// Audio backend
// ---------------------------------------------------------------------------

#[derive(Default)]
struct BackendLog {
    deny_capture: bool,
    deny_output: bool,
    outputs: Vec<ManualOutput>,
    captures_opened: usize,
    captures_stopped: usize,
    sink: Option<mpsc::Sender<EncodedChunk>>,
}

#[derive(Clone, Default)]
pub struct FakeBackend {
    log: Arc<Mutex<BackendLog>>,
}

impl FakeBackend {
    /// Microphone acquisition fails as if permission were refused.
    pub fn deny_capture(&self) {
        self.log.lock().unwrap().deny_capture = true;
    }

    pub fn deny_output(&self) {
        self.log.lock().unwrap().deny_output = true;
    }

    /// Every output context opened so far, oldest first.
    pub fn outputs(&self) -> Vec<ManualOutput> {
        self.log.lock().unwrap().outputs.clone()
    }

    pub fn captures_opened(&self) -> usize {
        self.log.lock().unwrap().captures_opened
    }

    pub fn captures_stopped(&self) -> usize {
        self.log.lock().unwrap().captures_stopped
    }

    /// Feed one block as if the capture thread had produced it.
    pub fn push_chunk(&self, chunk: EncodedChunk) -> bool {
        match &self.log.lock().unwrap().sink {
            Some(sink) => sink.try_send(chunk).is_ok(),
            None => false,
        }
    }
}

struct FakeCapture {
    log: Arc<Mutex<BackendLog>>,
    stopped: bool,
}

impl CaptureStream for FakeCapture {
    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        let mut log = self.log.lock().unwrap();
        log.captures_stopped += 1;
        log.sink = None;
    }
}

impl AudioBackend for FakeBackend {
    fn open_capture(
        &self,
        _sample_rate: u32,
        _block_size: usize,
        sink: mpsc::Sender<EncodedChunk>,
    ) -> Result<Box<dyn CaptureStream>> {
        let mut log = self.log.lock().unwrap();
        if log.deny_capture {
            return Err(LiveError::Acquisition("permission denied".to_string()));
        }
        log.captures_opened += 1;
        log.sink = Some(sink);
        Ok(Box::new(FakeCapture {
            log: self.log.clone(),
            stopped: false,
        }))
    }

    fn open_output(&self, sample_rate: u32) -> Result<Box<dyn OutputDevice>> {
        let mut log = self.log.lock().unwrap();
        if log.deny_output {
            return Err(LiveError::Acquisition("no output device".to_string()));
        }
        let output = ManualOutput::new(sample_rate);
        log.outputs.push(output.clone());
        Ok(Box::new(output))
    }
}

// ---------------------------------------------------------------------------
// Remote channel
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ChannelLog {
    fail_connect: bool,
    hold_connect: bool,
    connects: usize,
    sent: Vec<EncodedChunk>,
    closes: usize,
    events: Option<mpsc::Sender<ChannelEvent>>,
    speech: VecDeque<std::result::Result<String, String>>,
}

#[derive(Clone, Default)]
pub struct FakeChannel {
    log: Arc<Mutex<ChannelLog>>,
}

impl FakeChannel {
    pub fn fail_connect(&self) {
        self.log.lock().unwrap().fail_connect = true;
    }

    /// `connect` never resolves, as if the server never answered setup.
    pub fn hold_connect(&self) {
        self.log.lock().unwrap().hold_connect = true;
    }

    /// Queue the outcome of the next `request_once`.
    pub fn script_speech(&self, outcome: std::result::Result<String, String>) {
        self.log.lock().unwrap().speech.push_back(outcome);
    }

    pub fn connect_count(&self) -> usize {
        self.log.lock().unwrap().connects
    }

    pub fn sent(&self) -> Vec<EncodedChunk> {
        self.log.lock().unwrap().sent.clone()
    }

    pub fn close_count(&self) -> usize {
        self.log.lock().unwrap().closes
    }

    /// Sender for the most recent session's events.
    pub fn event_sender(&self) -> Option<mpsc::Sender<ChannelEvent>> {
        self.log.lock().unwrap().events.clone()
    }
}

struct FakeHandle {
    log: Arc<Mutex<ChannelLog>>,
    closed: bool,
}

impl SessionHandle for FakeHandle {
    fn send(&self, chunk: EncodedChunk) {
        if !self.closed {
            self.log.lock().unwrap().sent.push(chunk);
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let mut log = self.log.lock().unwrap();
        log.closes += 1;
        log.events = None;
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        self.close();
    }
}

#[async_trait]
impl RemoteChannel for FakeChannel {
    async fn connect(&self, events: mpsc::Sender<ChannelEvent>) -> Result<Box<dyn SessionHandle>> {
        let hold = {
            let mut log = self.log.lock().unwrap();
            log.connects += 1;
            if log.fail_connect {
                return Err(LiveError::Transport("connection refused".to_string()));
            }
            log.hold_connect
        };
        if hold {
            std::future::pending::<()>().await;
        }
        self.log.lock().unwrap().events = Some(events);
        Ok(Box::new(FakeHandle {
            log: self.log.clone(),
            closed: false,
        }))
    }

    async fn request_once(&self, _text: &str) -> Result<String> {
        match self.log.lock().unwrap().speech.pop_front() {
            Some(Ok(data)) => Ok(data),
            Some(Err(msg)) => Err(LiveError::Speech(msg)),
            None => Err(LiveError::Speech("No audio generated".to_string())),
        }
    }
}
