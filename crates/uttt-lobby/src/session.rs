//! Session records: one per live connection.

use tokio::sync::mpsc;
use uttt_protocol::{GameId, Mark, ServerMessage, SessionId};

/// Channel the lobby uses to push events to one connection.
///
/// Unbounded so the lobby never waits on a slow socket; the connection
/// task drains it and writes frames.
pub type OutboundSender = mpsc::UnboundedSender<ServerMessage>;

/// The lobby's record of a connected client.
///
/// ```text
///   connect ──→ [Idle] ──join──→ [Waiting] ──pair──→ [Playing]
///                  ↑                                    │
///                  └──────(opponent left / rejoin)──────┘
/// ```
///
/// The phases are implied by `game_id` and the matchmaker's waiting slot;
/// there is no stored state enum.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    /// The game this session plays in, once paired.
    pub game_id: Option<GameId>,
    /// X while waiting (provisional), then the mark assigned at pairing.
    pub mark: Option<Mark>,
    outbound: OutboundSender,
}

impl Session {
    pub(crate) fn new(id: SessionId, outbound: OutboundSender) -> Self {
        Self {
            id,
            game_id: None,
            mark: None,
            outbound,
        }
    }

    /// Queues `msg` for delivery. Silently drops it if the connection task
    /// is already gone; its disconnect is on the way.
    pub(crate) fn send(&self, msg: ServerMessage) {
        let _ = self.outbound.send(msg);
    }

    /// Forgets the game assignment so the session can join again.
    pub(crate) fn leave_game(&mut self) {
        self.game_id = None;
        self.mark = None;
    }
}
