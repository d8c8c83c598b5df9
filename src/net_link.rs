use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use crate::audio::EncodedChunk;
use crate::channel::{ChannelEvent, RemoteChannel, SessionHandle};
use crate::config::Config;
use crate::error::{LiveError, Result};
use crate::protocol::{RealtimeInputMessage, ServerMessage, SetupMessage};
use crate::speech;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

#[derive(Debug)]
pub enum NetCommand {
    SendAudio(EncodedChunk),
    Close,
}

/// Gemini Live over WebSocket, plus generateContent for one-shot speech.
pub struct GeminiChannel {
    config: Config,
    http: reqwest::Client,
}

impl GeminiChannel {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

/// Configured endpoint with the API key as the `key` query parameter.
pub fn live_url(ws_url: &str, api_key: &str) -> Result<Url> {
    let mut url =
        Url::parse(ws_url).map_err(|e| LiveError::Transport(format!("bad ws_url: {e}")))?;
    url.query_pairs_mut().append_pair("key", api_key);
    Ok(url)
}

#[async_trait]
impl RemoteChannel for GeminiChannel {
    async fn connect(&self, events: mpsc::Sender<ChannelEvent>) -> Result<Box<dyn SessionHandle>> {
        let api_key = self.config.api_key()?;
        let url = live_url(self.config.ws_url, &api_key)?;
        let setup = SetupMessage::new(self.config.live_model, self.config.live_voice);
        connect_live(&url, &setup, events, self.config.send_queue_depth).await
    }

    async fn request_once(&self, text: &str) -> Result<String> {
        speech::generate_speech(&self.http, &self.config, text).await
    }
}

/// Open the socket, send `setup`, and resolve once the server confirms it.
/// The returned handle feeds a link task that runs until either side closes.
pub async fn connect_live(
    url: &Url,
    setup: &SetupMessage,
    events: mpsc::Sender<ChannelEvent>,
    queue_depth: usize,
) -> Result<Box<dyn SessionHandle>> {
    tracing::info!(host = url.host_str().unwrap_or(""), "connecting live session");

    let (ws_stream, _) = connect_async(url.as_str())
        .await
        .map_err(|e| LiveError::Transport(format!("connect failed: {e}")))?;
    let (mut write, mut read) = ws_stream.split();

    let setup_json = serde_json::to_string(setup)
        .map_err(|e| LiveError::Transport(format!("setup encode: {e}")))?;
    write
        .send(Message::Text(setup_json.into()))
        .await
        .map_err(|e| LiveError::Transport(format!("setup send: {e}")))?;

    wait_for_setup(&mut read).await?;
    tracing::info!("live session ready");

    let (tx_cmd, rx_cmd) = mpsc::channel(queue_depth.max(1));
    let link = NetLink { tx: events, rx_cmd };
    tokio::spawn(link.run(write, read));

    Ok(Box::new(LiveHandle {
        tx_cmd,
        closed: false,
    }))
}

async fn wait_for_setup(read: &mut WsSource) -> Result<()> {
    loop {
        let payload = match read.next().await {
            Some(Ok(Message::Text(text))) => text.as_bytes().to_vec(),
            Some(Ok(Message::Binary(data))) => data.to_vec(),
            Some(Ok(Message::Close(frame))) => {
                return Err(LiveError::Transport(format!(
                    "closed during setup: {:?}",
                    frame
                )));
            }
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(LiveError::Transport(e.to_string())),
            None => return Err(LiveError::Transport("closed during setup".to_string())),
        };
        match serde_json::from_slice::<ServerMessage>(&payload) {
            Ok(msg) if msg.setup_complete.is_some() => return Ok(()),
            Ok(_) => tracing::debug!("ignoring message before setupComplete"),
            Err(e) => tracing::debug!(error = %e, "unparsable message during setup"),
        }
    }
}

/// Sender side of an open session.
struct LiveHandle {
    tx_cmd: mpsc::Sender<NetCommand>,
    closed: bool,
}

impl SessionHandle for LiveHandle {
    fn send(&self, chunk: EncodedChunk) {
        if self.closed {
            return;
        }
        if let Err(e) = self.tx_cmd.try_send(NetCommand::SendAudio(chunk)) {
            tracing::trace!("dropping outbound chunk: {}", e);
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        // if the queue is full, dropping the sender still ends the link
        let _ = self.tx_cmd.try_send(NetCommand::Close);
    }
}

impl Drop for LiveHandle {
    fn drop(&mut self) {
        self.close();
    }
}

enum LinkExit {
    Local,
    Remote,
}

struct NetLink {
    tx: mpsc::Sender<ChannelEvent>,
    rx_cmd: mpsc::Receiver<NetCommand>,
}

impl NetLink {
    async fn run(mut self, mut write: WsSink, mut read: WsSource) {
        match self.pump(&mut write, &mut read).await {
            Ok(LinkExit::Local) => {
                let _ = write.send(Message::Close(None)).await;
                tracing::debug!("live link closed locally");
            }
            Ok(LinkExit::Remote) => {
                tracing::info!("live session closed by server");
                let _ = self.tx.send(ChannelEvent::Closed).await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "live link failed");
                let _ = self.tx.send(ChannelEvent::Error(e.to_string())).await;
            }
        }
    }

    // 主循环，处理读取和写入
    async fn pump(&mut self, write: &mut WsSink, read: &mut WsSource) -> anyhow::Result<LinkExit> {
        loop {
            tokio::select! {
                msg = read.next() => {
                    let delivered = match msg {
                        Some(Ok(Message::Text(text))) => self.dispatch(text.as_bytes()).await,
                        Some(Ok(Message::Binary(data))) => self.dispatch(&data).await,
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(?frame, "server sent close");
                            return Ok(LinkExit::Remote);
                        }
                        Some(Ok(_)) => true,
                        Some(Err(e)) => return Err(e.into()),
                        None => return Ok(LinkExit::Remote),
                    };
                    if !delivered {
                        // nobody is listening for events any more
                        return Ok(LinkExit::Local);
                    }
                }
                cmd = self.rx_cmd.recv() => {
                    match cmd {
                        Some(NetCommand::SendAudio(chunk)) => {
                            let json = serde_json::to_string(&RealtimeInputMessage::from(chunk))?;
                            write.send(Message::Text(json.into())).await?;
                        }
                        Some(NetCommand::Close) | None => return Ok(LinkExit::Local),
                    }
                }
            }
        }
    }

    /// Forward the events in one server message. Returns false once the
    /// event receiver is gone.
    async fn dispatch(&self, payload: &[u8]) -> bool {
        let msg: ServerMessage = match serde_json::from_slice(payload) {
            Ok(msg) => msg,
            Err(e) => {
                // 可能不是JSON，忽略
                tracing::debug!(error = %e, "ignoring unparsable server message");
                return true;
            }
        };
        if msg.go_away.is_some() {
            tracing::warn!("server announced goAway; session will end soon");
        }
        for event in msg.into_events() {
            if let ChannelEvent::Interrupted = event {
                tracing::info!("model turn interrupted");
            }
            if self.tx.send(event).await.is_err() {
                return false;
            }
        }
        true
    }
}
