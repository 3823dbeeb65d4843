//! WebSocket transport backed by tokio-tungstenite.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use linguahub_core::error::AppError;
use linguahub_core::result::AppResult;

use super::{CloseReason, Connector, Incoming, Transport};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens real WebSocket connections.
#[derive(Debug, Default)]
pub struct WsConnector;

impl WsConnector {
    /// Creates a new connector.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, url: &str) -> AppResult<Box<dyn Transport>> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| AppError::connection(format!("websocket handshake failed: {e}")))?;
        Ok(Box::new(WsTransport { stream }))
    }
}

/// A live tokio-tungstenite WebSocket connection.
pub struct WsTransport {
    stream: WsStream,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, text: String) -> AppResult<()> {
        self.stream
            .send(Message::text(text))
            .await
            .map_err(|e| AppError::connection(format!("websocket send failed: {e}")))
    }

    async fn recv(&mut self) -> Incoming {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Incoming::Frame(text.to_string()),
                Some(Ok(Message::Close(frame))) => {
                    return Incoming::Closed(frame.map(|f| CloseReason {
                        code: f.code.into(),
                        reason: f.reason.to_string(),
                    }));
                }
                // Binary framing is not part of the protocol; control
                // ping/pong is handled by the library.
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    debug!(error = %e, "websocket stream error");
                    return Incoming::Closed(None);
                }
                None => return Incoming::Closed(None),
            }
        }
    }

    async fn close(&mut self, code: u16) -> AppResult<()> {
        self.stream
            .close(Some(CloseFrame {
                code: CloseCode::from(code),
                reason: "".into(),
            }))
            .await
            .map_err(|e| AppError::connection(format!("websocket close failed: {e}")))
    }
}
