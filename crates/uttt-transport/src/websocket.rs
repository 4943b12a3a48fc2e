//! WebSocket transport implementation using `tokio-tungstenite`.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{StatusCode, header};

use crate::{Connection, ConnectionId, Frame, Transport, TransportError, Upgrade};

/// How long a peer has to finish the WebSocket upgrade after TCP accept.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
    /// When set, upgrades carrying a different `Origin` header get a 403.
    allowed_origin: Option<Arc<str>>,
    next_id: u64,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::BindFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self {
            listener,
            allowed_origin: None,
            next_id: 1,
        })
    }

    /// Restricts upgrades to browsers served from `origin`.
    ///
    /// Requests without an `Origin` header (non-browser clients) are still
    /// accepted.
    pub fn with_allowed_origin(mut self, origin: Option<String>) -> Self {
        self.allowed_origin = origin.map(Arc::from);
        self
    }

    /// Returns the local address the listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for WebSocketTransport {
    type Upgrade = WebSocketUpgrade;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Upgrade, Self::Error> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let id = ConnectionId::new(self.next_id);
        self.next_id += 1;
        tracing::debug!(%id, %addr, "accepted TCP peer");

        Ok(WebSocketUpgrade {
            id,
            peer_addr: addr,
            stream,
            allowed_origin: self.allowed_origin.clone(),
        })
    }
}

/// A TCP peer that has not yet completed the WebSocket handshake.
pub struct WebSocketUpgrade {
    id: ConnectionId,
    peer_addr: SocketAddr,
    stream: TcpStream,
    allowed_origin: Option<Arc<str>>,
}

impl WebSocketUpgrade {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

impl Upgrade for WebSocketUpgrade {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    /// Runs the HTTP upgrade, refusing foreign origins with 403 and giving
    /// up after [`HANDSHAKE_TIMEOUT`].
    async fn upgrade(self) -> Result<Self::Connection, Self::Error> {
        let Self {
            id,
            peer_addr,
            stream,
            allowed_origin,
        } = self;

        let check_origin = |req: &Request, resp: Response| {
            if origin_allowed(allowed_origin.as_deref(), req) {
                Ok(resp)
            } else {
                let mut refusal = ErrorResponse::new(Some("origin not allowed".to_string()));
                *refusal.status_mut() = StatusCode::FORBIDDEN;
                Err(refusal)
            }
        };

        let ws = tokio::time::timeout(
            HANDSHAKE_TIMEOUT,
            tokio_tungstenite::accept_hdr_async(stream, check_origin),
        )
        .await
        .map_err(|_| TransportError::HandshakeFailed(format!("{peer_addr}: timed out")))?
        .map_err(|e| TransportError::HandshakeFailed(format!("{peer_addr}: {e}")))?;

        tracing::debug!(%id, %peer_addr, "WebSocket upgrade complete");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            peer_addr,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

/// A single WebSocket connection.
///
/// The socket is split so a task parked in [`recv`](Connection::recv)
/// does not hold up [`send`](Connection::send).
pub struct WebSocketConnection {
    id: ConnectionId,
    peer_addr: SocketAddr,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, frame: Frame) -> Result<(), Self::Error> {
        let msg = match frame {
            Frame::Text(text) => Message::Text(text.into()),
            Frame::Binary(data) => Message::Binary(data.into()),
            Frame::Ping => Message::Ping(Default::default()),
        };
        self.sink
            .lock()
            .await
            .send(msg)
            .await
            .map_err(|e| TransportError::SendFailed(io::Error::new(io::ErrorKind::BrokenPipe, e)))
    }

    /// Data frames come back as `Text`/`Binary`. Ping and pong control
    /// frames come back as [`Frame::Ping`]; tungstenite answers pings on
    /// its own.
    async fn recv(&self) -> Result<Option<Frame>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(Frame::Text(text.as_str().to_owned())));
                }
                Some(Ok(Message::Binary(data))) => return Ok(Some(Frame::Binary(data.into()))),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => return Ok(Some(Frame::Ping)),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(Message::Frame(_))) => continue,
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| TransportError::SendFailed(io::Error::new(io::ErrorKind::BrokenPipe, e)))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Whether an upgrade request may proceed under the origin policy.
fn origin_allowed(allowed: Option<&str>, req: &Request) -> bool {
    let Some(allowed) = allowed else {
        return true;
    };
    match req.headers().get(header::ORIGIN) {
        None => true,
        Some(origin) => origin.to_str().is_ok_and(|o| o == allowed),
    }
}
