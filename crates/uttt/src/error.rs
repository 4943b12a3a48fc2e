//! Unified error type for the server.

use uttt_lobby::LobbyError;
use uttt_protocol::ProtocolError;
use uttt_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impls the
/// `?` operator needs, so handler and server code propagate sub-crate
/// errors without mapping them by hand.
#[derive(Debug, thiserror::Error)]
pub enum UtttError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The lobby actor is gone.
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// The configuration could not be read.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
