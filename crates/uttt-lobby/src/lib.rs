//! Matchmaking and session lifecycle.
//!
//! The [`Matchmaker`] pairs anonymous sessions two at a time, owns every
//! live [`Game`](uttt_engine::Game), and routes move intents to the right
//! one. In a running server it lives inside a single actor task reached
//! through a [`LobbyHandle`].
//!
//! # Key types
//!
//! - [`Matchmaker`] — synchronous pairing and routing state
//! - [`LobbyHandle`] — send commands to the running lobby actor
//! - [`Session`] — one connected client
//! - [`LobbyStats`] — counts for diagnostics

mod actor;
mod error;
mod matchmaker;
mod session;

pub use actor::{LobbyHandle, spawn_lobby};
pub use error::LobbyError;
pub use matchmaker::{LobbyStats, Matchmaker};
pub use session::{OutboundSender, Session};
