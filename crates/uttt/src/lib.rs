//! # uttt
//!
//! Authoritative server for two-player Ultimate Tic-Tac-Toe.
//!
//! Clients connect over WebSocket and exchange JSON events. The server
//! pairs them, owns every game, validates each move, and broadcasts the
//! resulting state to both players. Clients never compute game state.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use uttt::prelude::*;
//!
//! # async fn start() -> Result<(), UtttError> {
//! let config = ServerConfig::from_env()?;
//! let server = UtttServerBuilder::from_config(config).build().await?;
//! server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{ConfigError, DEFAULT_HOST, DEFAULT_PORT, ServerConfig};
pub use error::UtttError;
pub use server::{UtttServer, UtttServerBuilder};

pub mod prelude {
    //! Everything needed to run a server and speak its protocol.

    pub use crate::{ConfigError, ServerConfig, UtttError, UtttServer, UtttServerBuilder};
    pub use uttt_engine::{Game, GameStatus, MoveRejection};
    pub use uttt_lobby::{LobbyHandle, LobbyStats};
    pub use uttt_protocol::{
        ClientMessage, Codec, GameId, JsonCodec, Mark, MoveIntent, Outcome, ServerMessage,
        SessionId, StateView,
    };
    pub use uttt_transport::TransportError;
}
