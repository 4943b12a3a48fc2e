//! Transport abstraction layer for the Ultimate Tic-Tac-Toe server.
//!
//! Provides the [`Transport`], [`Upgrade`] and [`Connection`] traits so the
//! server loop only deals in accepted peers and [`Frame`]s, never in a
//! specific network protocol.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport, WebSocketUpgrade};

use std::fmt;

/// Opaque identifier for a connection, unique per listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// One unit of traffic on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A UTF-8 payload.
    Text(String),
    /// An opaque payload.
    Binary(Vec<u8>),
    /// Keepalive traffic. Carries nothing for the application but shows
    /// the peer is still there.
    Ping,
}

/// Accepts new incoming peers.
///
/// `accept` returns as soon as a peer is at the door. Any protocol
/// handshake happens later in [`Upgrade::upgrade`], so the caller can run
/// it off the accept loop.
pub trait Transport: Send + Sync + 'static {
    /// A peer that has connected but not finished its handshake.
    type Upgrade: Upgrade;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming peer.
    async fn accept(&mut self) -> Result<Self::Upgrade, Self::Error>;
}

/// An accepted peer whose handshake is still pending.
pub trait Upgrade: Send + 'static {
    /// The connection produced once the handshake succeeds.
    type Connection: Connection;
    /// The error type for a failed handshake.
    type Error: std::error::Error + Send + Sync;

    /// Completes the handshake.
    async fn upgrade(self) -> Result<Self::Connection, Self::Error>;
}

/// A single connection that can send and receive frames.
///
/// `send` and `recv` may be called concurrently from different futures;
/// a pending `recv` must not block a `send`.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one frame to the remote peer.
    async fn send(&self, frame: Frame) -> Result<(), Self::Error>;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Frame>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
