//! Persistent socket transport.
//!
//! [`Transport`] is one live text-frame connection; [`Connector`] dials new
//! ones so [`ReconnectingSocket`] can redial after a drop. The production
//! pair is [`WsConnector`] / [`WsTransport`] over `tokio-tungstenite`.

mod socket;

#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::protocol::OutboundMessage;

pub use socket::{ReconnectingSocket, SocketEvent};

/// A connected text-frame channel.
#[async_trait]
pub trait Transport: Send + 'static {
    async fn send(&mut self, text: String) -> Result<()>;

    /// Next text frame. `None` means the peer closed cleanly.
    async fn recv(&mut self) -> Option<Result<String>>;

    async fn close(&mut self) -> Result<()>;
}

/// Dials [`Transport`]s.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport;

    async fn connect(&self, url: &str) -> Result<Self::Transport>;
}

/// Destination for user actions in networked sessions.
pub trait Outbound: Send {
    fn send(&self, msg: &OutboundMessage) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    type Transport = WsTransport;

    async fn connect(&self, url: &str) -> Result<WsTransport> {
        let (stream, _response) = connect_async(url).await?;
        Ok(WsTransport { stream })
    }
}

pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, text: String) -> Result<()> {
        self.stream.send(Message::text(text)).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => debug!("dropping non-UTF-8 binary frame"),
                },
                Ok(Message::Close(_)) => return None,
                // ping/pong are answered by tungstenite
                Ok(_) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

/// Socket path for a room's chat.
pub fn room_path(room_id: &str) -> String {
    format!("/rooms/{}", room_id)
}

/// Socket path for a game's traffic.
pub fn game_path(game_id: &str) -> String {
    format!("/game/{}", game_id)
}

/// Full socket URL, with the credential as the `token` query parameter.
pub fn socket_url(ws_base: &str, path: &str, token: Option<&str>) -> Result<String> {
    let raw = format!("{}{}", ws_base.trim_end_matches('/'), path);
    let mut url = Url::parse(&raw).map_err(|e| ClientError::InvalidUrl(format!("{raw}: {e}")))?;
    if let Some(token) = token {
        url.query_pairs_mut().append_pair("token", token);
    }
    Ok(url.to_string())
}
