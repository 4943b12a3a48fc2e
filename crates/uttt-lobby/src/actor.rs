//! Lobby actor: a Tokio task that owns the [`Matchmaker`].
//!
//! Connection handlers never touch the matchmaker directly. They hold a
//! [`LobbyHandle`] and send commands through a bounded mpsc channel; the
//! actor applies them in arrival order. Because one task owns every game,
//! two moves can never interleave inside a read-modify-broadcast cycle.

use tokio::sync::{mpsc, oneshot};
use uttt_protocol::{MoveIntent, SessionId};

use crate::matchmaker::{LobbyStats, Matchmaker};
use crate::session::OutboundSender;
use crate::LobbyError;

/// Commands sent to the lobby actor.
///
/// Only `Connect` and `Stats` carry a reply channel. Everything else is
/// fire-and-forget: its results reach clients through their outbound
/// channels, not through the caller.
pub(crate) enum LobbyCommand {
    Connect {
        outbound: OutboundSender,
        reply: oneshot::Sender<SessionId>,
    },
    Join {
        session_id: SessionId,
    },
    Move {
        session_id: SessionId,
        intent: MoveIntent,
    },
    Disconnect {
        session_id: SessionId,
    },
    Stats {
        reply: oneshot::Sender<LobbyStats>,
    },
    Shutdown,
}

/// Handle to the running lobby. Cheap to clone; every connection task
/// holds one.
#[derive(Clone)]
pub struct LobbyHandle {
    sender: mpsc::Sender<LobbyCommand>,
}

impl LobbyHandle {
    /// Registers a connection and returns the session id assigned to it.
    ///
    /// Events for the session are delivered through `outbound`.
    pub async fn connect(&self, outbound: OutboundSender) -> Result<SessionId, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(LobbyCommand::Connect {
            outbound,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| LobbyError::Unavailable)
    }

    /// Asks to be paired with an opponent.
    pub async fn join(&self, session_id: SessionId) -> Result<(), LobbyError> {
        self.send(LobbyCommand::Join { session_id }).await
    }

    /// Submits a move intent for the session's game.
    pub async fn submit_move(
        &self,
        session_id: SessionId,
        intent: MoveIntent,
    ) -> Result<(), LobbyError> {
        self.send(LobbyCommand::Move { session_id, intent }).await
    }

    /// Removes the session, forfeiting any game it is in.
    pub async fn disconnect(&self, session_id: SessionId) -> Result<(), LobbyError> {
        self.send(LobbyCommand::Disconnect { session_id }).await
    }

    /// Current session and game counts.
    pub async fn stats(&self) -> Result<LobbyStats, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(LobbyCommand::Stats { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| LobbyError::Unavailable)
    }

    /// Stops the actor. Commands already queued ahead of this are still
    /// processed.
    pub async fn shutdown(&self) -> Result<(), LobbyError> {
        self.send(LobbyCommand::Shutdown).await
    }

    async fn send(&self, cmd: LobbyCommand) -> Result<(), LobbyError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| LobbyError::Unavailable)
    }
}

struct LobbyActor {
    matchmaker: Matchmaker,
    receiver: mpsc::Receiver<LobbyCommand>,
}

impl LobbyActor {
    async fn run(mut self) {
        tracing::info!("lobby started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                LobbyCommand::Connect { outbound, reply } => {
                    let session_id = self.matchmaker.connect(outbound);
                    let _ = reply.send(session_id);
                }
                LobbyCommand::Join { session_id } => {
                    self.matchmaker.request_match(session_id);
                }
                LobbyCommand::Move { session_id, intent } => {
                    self.matchmaker.submit_move(session_id, intent);
                }
                LobbyCommand::Disconnect { session_id } => {
                    self.matchmaker.disconnect(session_id);
                }
                LobbyCommand::Stats { reply } => {
                    let _ = reply.send(self.matchmaker.stats());
                }
                LobbyCommand::Shutdown => {
                    tracing::info!("lobby shutting down");
                    break;
                }
            }
        }

        tracing::info!("lobby stopped");
    }
}

/// Spawns the lobby task and returns a handle to it.
///
/// `channel_size` bounds the command queue; when it is full, callers wait.
pub fn spawn_lobby(channel_size: usize) -> LobbyHandle {
    let (tx, rx) = mpsc::channel(channel_size.max(1));

    let actor = LobbyActor {
        matchmaker: Matchmaker::new(),
        receiver: rx,
    };
    tokio::spawn(actor.run());

    LobbyHandle { sender: tx }
}
