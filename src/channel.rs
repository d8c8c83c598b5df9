//! Contract for the remote model session.
//!
//! The audio core only sees these traits; `net_link::GeminiChannel` is the
//! production implementation.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::audio::EncodedChunk;
use crate::error::Result;

/// Asynchronous notifications from an open session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Base64 PCM audio from the model.
    Audio(String),
    /// The model stopped its turn because the user talked over it.
    Interrupted,
    TurnComplete,
    /// The remote ended the session.
    Closed,
    /// Transport failure; the session is unusable afterwards.
    Error(String),
}

/// An open bidirectional session.
pub trait SessionHandle: Send {
    /// Best-effort, never blocks. Dropped silently once the session is closed.
    fn send(&self, chunk: EncodedChunk);

    /// Terminate the session. Safe to call repeatedly.
    fn close(&mut self);
}

#[async_trait]
pub trait RemoteChannel: Send + Sync {
    /// Open a session. Events are delivered on `events` until the session
    /// closes or the receiver is dropped.
    async fn connect(&self, events: mpsc::Sender<ChannelEvent>) -> Result<Box<dyn SessionHandle>>;

    /// One-shot text-to-speech: returns a single base64 PCM payload.
    async fn request_once(&self, text: &str) -> Result<String>;
}
