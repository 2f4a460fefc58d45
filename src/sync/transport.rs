//! Push-channel transport
//!
//! [`Transport`] opens sockets for the connection manager. The production
//! implementation speaks websocket through `tokio-tungstenite`.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::error::Result;

/// Opens push-channel sockets
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a socket to `url`; resolves once the channel is usable
    async fn open(&self, url: &str) -> Result<Box<dyn Socket>>;
}

/// One open push-channel connection
#[async_trait]
pub trait Socket: Send {
    /// Next inbound text frame.
    ///
    /// `None` means the peer closed the channel; `Some(Err)` is a transport
    /// failure.
    async fn next_frame(&mut self) -> Option<Result<String>>;

    /// Send one outbound text frame
    async fn send_text(&mut self, text: String) -> Result<()>;

    /// Close the channel
    async fn close(&mut self);
}

/// Websocket transport
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, url: &str) -> Result<Box<dyn Socket>> {
        let (stream, response) = connect_async(url).await?;
        debug!(status = %response.status(), "WebSocket handshake complete");
        Ok(Box::new(WebSocketSocket { stream }))
    }
}

struct WebSocketSocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Socket for WebSocketSocket {
    async fn next_frame(&mut self) -> Option<Result<String>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => debug!("Dropping non UTF-8 binary frame"),
                },
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "WebSocket close frame received");
                    return None;
                }
                // Ping/pong are answered by tungstenite
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn send_text(&mut self, text: String) -> Result<()> {
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!("WebSocket close failed: {}", e);
        }
    }
}
