//! Wire protocol for the Ultimate Tic-Tac-Toe server.
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`StateView`], marks
//!   and ids) — what travels over the socket.
//! - **Codec** ([`Codec`], [`JsonCodec`]) — how those values become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (events) → Lobby (sessions, games)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    BOARD_CELLS, Cell, ClientMessage, GameId, Mark, MoveIntent, Outcome,
    ServerMessage, SessionId, StateView,
};
