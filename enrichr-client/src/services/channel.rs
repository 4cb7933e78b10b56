//! Persistent duplex channel abstraction
//!
//! The coordinator talks to a [`DuplexChannel`] obtained from a
//! [`ChannelConnector`]. [`WsConnector`] is the production WebSocket
//! implementation; tests substitute scripted channels.

use crate::error::{EnrichError, EnrichResult};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::error::{Error as WsError, ProtocolError};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;
use url::Url;

/// Inbound channel event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Text payload from the peer
    Message(String),
    /// Transport-level failure; the channel is unusable afterwards
    Error(String),
    /// Peer or network closed the channel
    Closed { code: Option<u16>, reason: String },
}

/// One open channel
#[async_trait]
pub trait DuplexChannel: Send {
    /// Send a text frame
    async fn send_text(&mut self, text: String) -> EnrichResult<()>;

    /// Wait for the next inbound event
    ///
    /// Must be cancel-safe: dropping the future loses no event.
    async fn next_event(&mut self) -> ChannelEvent;

    /// Close from this side
    async fn close(&mut self) -> EnrichResult<()>;
}

/// Opens channels
#[async_trait]
pub trait ChannelConnector: Send + Sync {
    async fn connect(&self, url: &Url) -> EnrichResult<Box<dyn DuplexChannel>>;
}

/// WebSocket connector
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl ChannelConnector for WsConnector {
    async fn connect(&self, url: &Url) -> EnrichResult<Box<dyn DuplexChannel>> {
        debug!(url = %url, "Opening WebSocket channel");
        let (stream, response) = connect_async(url.as_str())
            .await
            .map_err(|e| EnrichError::Transport(format!("Failed to open channel to {}: {}", url, e)))?;
        debug!(status = %response.status(), "WebSocket handshake complete");
        Ok(Box::new(WsChannel { stream }))
    }
}

/// WebSocket-backed channel
pub struct WsChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl DuplexChannel for WsChannel {
    async fn send_text(&mut self, text: String) -> EnrichResult<()> {
        self.stream
            .send(Message::Text(text))
            .await
            .map_err(|e| EnrichError::Transport(format!("Failed to send message: {}", e)))
    }

    async fn next_event(&mut self) -> ChannelEvent {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return ChannelEvent::Message(text),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => return ChannelEvent::Message(text),
                    Err(_) => debug!("Ignoring non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = match frame {
                        Some(frame) => (Some(u16::from(frame.code)), frame.reason.into_owned()),
                        None => (None, String::new()),
                    };
                    return ChannelEvent::Closed { code, reason };
                }
                // Ping/pong are answered by tungstenite itself
                Some(Ok(_)) => continue,
                Some(Err(WsError::ConnectionClosed)) | Some(Err(WsError::AlreadyClosed)) | None => {
                    return ChannelEvent::Closed {
                        code: None,
                        reason: "connection closed".to_string(),
                    }
                }
                Some(Err(WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake))) => {
                    return ChannelEvent::Closed {
                        code: None,
                        reason: "connection reset without closing handshake".to_string(),
                    }
                }
                Some(Err(e)) => return ChannelEvent::Error(e.to_string()),
            }
        }
    }

    async fn close(&mut self) -> EnrichResult<()> {
        match self.stream.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(EnrichError::Transport(format!("Failed to close channel: {}", e))),
        }
    }
}
