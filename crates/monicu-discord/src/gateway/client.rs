//! Gateway connection loop

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{Backoff, ResumeState};
use crate::error::{DiscordError, DiscordResult};
use crate::events::{GatewayEvent, GatewayEventType};
use crate::protocol::{
    CloseCode, GatewayFrame, IdentifyPayload, Intents, OpCode, ResumePayload,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long to wait for Hello after connecting
const HELLO_TIMEOUT: Duration = Duration::from_secs(20);

/// Gateway connection settings
#[derive(Clone)]
pub struct GatewayConfig {
    /// Gateway URL including version and encoding query
    pub url: String,
    /// Bot token (without the `Bot ` prefix)
    pub token: String,
    pub intents: Intents,
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("intents", &self.intents)
            .finish()
    }
}

/// Why a single connection ended without an error
enum SessionEnd {
    /// Shutdown was requested or the event receiver went away
    Stopped,
    /// The gateway asked for a reconnect
    Reconnect,
}

/// Gateway client delivering [`GatewayEvent`]s on a bounded channel
pub struct GatewayClient {
    config: GatewayConfig,
    events: mpsc::Sender<GatewayEvent>,
    resume: ResumeState,
    backoff: Backoff,
}

impl GatewayClient {
    /// Create a new client; events are sent to `events`
    pub fn new(config: GatewayConfig, events: mpsc::Sender<GatewayEvent>) -> Self {
        Self {
            config,
            events,
            resume: ResumeState::default(),
            backoff: Backoff::default(),
        }
    }

    /// Run until shutdown is signalled or the gateway rejects the session
    ///
    /// Transient failures reconnect after a capped backoff. Close codes that
    /// reconnecting cannot fix (bad token, disallowed intents) are returned.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> DiscordResult<()> {
        loop {
            if *shutdown.borrow() {
                return Ok(());
            }

            let delay = match self.run_session(&mut shutdown).await {
                Ok(SessionEnd::Stopped) => return Ok(()),
                Ok(SessionEnd::Reconnect) => {
                    tracing::info!("Gateway requested reconnect");
                    self.backoff.reset();
                    self.backoff.next_delay()
                }
                Err(e) if e.is_fatal() => {
                    tracing::error!(error = %e, "Gateway session rejected");
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.backoff.next_delay();
                    tracing::warn!(
                        error = %e,
                        retry_in_ms = delay.as_millis() as u64,
                        resumable = self.resume.can_resume(),
                        "Gateway connection lost"
                    );
                    delay
                }
            };

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => return Ok(()),
            }
        }
    }

    async fn run_session(
        &mut self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> DiscordResult<SessionEnd> {
        let url = self.resume.connect_url(&self.config.url);
        tracing::debug!(url = %url, "Connecting to gateway");
        let (socket, _) = connect_async(url.as_str()).await?;
        let (mut sink, mut stream) = socket.split();

        let hello = tokio::time::timeout(HELLO_TIMEOUT, next_frame(&mut stream))
            .await
            .map_err(|_| DiscordError::Protocol("no Hello received".to_string()))??;
        let heartbeat_interval = hello
            .as_hello()
            .map(|h| Duration::from_millis(h.heartbeat_interval))
            .ok_or_else(|| DiscordError::Protocol(format!("expected Hello, got {hello}")))?;

        if self.resume.can_resume() {
            let payload = ResumePayload {
                token: self.config.token.clone(),
                session_id: self.resume.session_id.clone().unwrap_or_default(),
                seq: self.resume.sequence,
            };
            send_frame(&mut sink, &GatewayFrame::resume(&payload)?).await?;
            tracing::debug!(seq = ?payload.seq, "Sent Resume");
        } else {
            let payload = IdentifyPayload::new(self.config.token.clone(), self.config.intents);
            send_frame(&mut sink, &GatewayFrame::identify(&payload)?).await?;
            tracing::debug!(intents = payload.intents.bits(), "Sent Identify");
        }

        let mut heartbeat = interval_at(Instant::now() + heartbeat_interval, heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut acked = true;

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    let _ = sink.close().await;
                    return Ok(SessionEnd::Stopped);
                }
                _ = heartbeat.tick() => {
                    if !acked {
                        return Err(DiscordError::HeartbeatTimeout);
                    }
                    acked = false;
                    send_frame(&mut sink, &GatewayFrame::heartbeat(self.resume.sequence)).await?;
                    tracing::trace!(seq = ?self.resume.sequence, "Heartbeat sent");
                }
                message = stream.next() => {
                    let frame = match message {
                        Some(Ok(WsMessage::Text(text))) => GatewayFrame::from_json(&text)?,
                        Some(Ok(WsMessage::Close(frame))) => {
                            return Err(self.closed(frame.map(|f| u16::from(f.code))));
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => return Err(e.into()),
                        None => return Err(DiscordError::Closed("stream ended".to_string())),
                    };

                    match frame.op {
                        OpCode::Dispatch => {
                            if !self.dispatch(frame).await {
                                let _ = sink.close().await;
                                return Ok(SessionEnd::Stopped);
                            }
                            self.backoff.reset();
                        }
                        OpCode::Heartbeat => {
                            send_frame(&mut sink, &GatewayFrame::heartbeat(self.resume.sequence)).await?;
                        }
                        OpCode::HeartbeatAck => acked = true,
                        OpCode::Reconnect => {
                            let _ = sink.close().await;
                            return Ok(SessionEnd::Reconnect);
                        }
                        OpCode::InvalidSession => {
                            if frame.as_invalid_session() != Some(true) {
                                self.resume.invalidate();
                            }
                            tracing::info!(resumable = self.resume.can_resume(), "Session invalidated");
                            let _ = sink.close().await;
                            return Ok(SessionEnd::Reconnect);
                        }
                        op => tracing::debug!(op = %op, "Ignoring gateway frame"),
                    }
                }
            }
        }
    }

    /// Decode and forward one dispatch; `false` when the receiver is gone
    async fn dispatch(&mut self, frame: GatewayFrame) -> bool {
        self.resume.observe(frame.s);
        let Some(event_type) = frame.t else {
            return true;
        };
        let data = frame.d.unwrap_or_default();

        let event = match GatewayEvent::decode(&event_type, data) {
            Ok(Some(event)) => event,
            Ok(None) => {
                if GatewayEventType::from_name(&event_type) == Some(GatewayEventType::Resumed) {
                    tracing::info!(seq = ?self.resume.sequence, "Session resumed");
                } else {
                    tracing::debug!(event = %event_type, "Ignoring dispatch");
                }
                return true;
            }
            Err(e) => {
                tracing::warn!(event = %event_type, error = %e, "Failed to decode dispatch");
                return true;
            }
        };

        if let GatewayEvent::Ready(ready) = &event {
            tracing::info!(
                user = %ready.user.id,
                session_id = %ready.session_id,
                "Gateway session ready"
            );
            self.resume
                .start(ready.session_id.clone(), ready.resume_gateway_url.clone());
        }

        self.events.send(event).await.is_ok()
    }

    fn closed(&mut self, code: Option<u16>) -> DiscordError {
        let Some(code) = code.map(CloseCode) else {
            return DiscordError::Closed("no close code".to_string());
        };
        if code.is_fatal() {
            return DiscordError::Fatal(code);
        }
        if !code.is_resumable() {
            self.resume.invalidate();
        }
        DiscordError::Closed(code.to_string())
    }
}

async fn next_frame(stream: &mut SplitStream<WsStream>) -> DiscordResult<GatewayFrame> {
    while let Some(message) = stream.next().await {
        match message? {
            WsMessage::Text(text) => return Ok(GatewayFrame::from_json(&text)?),
            WsMessage::Close(frame) => {
                return Err(DiscordError::Closed(format!(
                    "closed before Hello: {:?}",
                    frame.map(|f| u16::from(f.code))
                )));
            }
            _ => {}
        }
    }
    Err(DiscordError::Closed("stream ended before Hello".to_string()))
}

async fn send_frame(
    sink: &mut SplitSink<WsStream, WsMessage>,
    frame: &GatewayFrame,
) -> DiscordResult<()> {
    sink.send(WsMessage::Text(frame.to_json()?)).await?;
    Ok(())
}
