//! The matchmaker: sessions, the waiting slot, and every live game.
//!
//! `Matchmaker` is plain synchronous state. It is not shared between
//! tasks; the lobby actor owns it and feeds it one command at a time, so
//! each operation runs to completion (including its broadcasts) before the
//! next one starts.

use std::collections::HashMap;

use uttt_engine::{Game, GameStatus, Players};
use uttt_protocol::{GameId, Mark, MoveIntent, ServerMessage, SessionId, StateView};

use crate::session::{OutboundSender, Session};

/// Counts reported by [`Matchmaker::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LobbyStats {
    /// Connected sessions, paired or not.
    pub sessions: usize,
    /// Games currently stored (in progress or finished but not yet left).
    pub games: usize,
    /// Whether a session is waiting for an opponent.
    pub waiting: bool,
}

/// Pairs sessions into games and routes their moves.
#[derive(Debug, Default)]
pub struct Matchmaker {
    /// At most one session waiting for an opponent.
    waiting: Option<SessionId>,
    sessions: HashMap<SessionId, Session>,
    games: HashMap<GameId, Game>,
    next_session_id: u64,
    next_game_id: u64,
}

impl Matchmaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection and returns its session id.
    pub fn connect(&mut self, outbound: OutboundSender) -> SessionId {
        self.next_session_id += 1;
        let session_id = SessionId(self.next_session_id);
        self.sessions
            .insert(session_id, Session::new(session_id, outbound));
        tracing::info!(%session_id, sessions = self.sessions.len(), "session connected");
        session_id
    }

    /// Puts `session_id` into matchmaking.
    ///
    /// Pairs it with the waiting session if there is one, otherwise makes
    /// it the waiting session. Does nothing while the session is in a game
    /// that has not finished. A session whose game has finished leaves
    /// that game first.
    pub fn request_match(&mut self, session_id: SessionId) {
        let Some(session) = self.sessions.get(&session_id) else {
            tracing::debug!(%session_id, "join from unknown session, ignoring");
            return;
        };

        if let Some(game_id) = session.game_id {
            match self.games.get(&game_id).map(Game::status) {
                Some(GameStatus::InProgress) => {
                    tracing::debug!(%session_id, %game_id, "join while in game, ignoring");
                    return;
                }
                Some(_) => self.close_game(game_id),
                None => {}
            }
            if let Some(session) = self.sessions.get_mut(&session_id) {
                session.leave_game();
            }
        }

        match self.waiting {
            Some(waiting_id) if waiting_id != session_id => {
                self.waiting = None;
                self.start_game(waiting_id, session_id);
            }
            _ => {
                self.waiting = Some(session_id);
                if let Some(session) = self.sessions.get_mut(&session_id) {
                    session.mark = Some(Mark::X);
                    session.send(ServerMessage::Waiting);
                }
                tracing::info!(%session_id, "session waiting for opponent");
            }
        }
    }

    /// Routes a move intent to the session's game and broadcasts the
    /// resulting state to both players.
    ///
    /// Intents from sessions without a game, and intents the engine
    /// rejects, are dropped without any event.
    pub fn submit_move(&mut self, session_id: SessionId, intent: MoveIntent) {
        let Some(game_id) = self.sessions.get(&session_id).and_then(|s| s.game_id)
        else {
            tracing::debug!(%session_id, "move from session without a game, ignoring");
            return;
        };
        let Some(game) = self.games.get_mut(&game_id) else {
            return;
        };

        let view = match game.apply_move(session_id, intent.board_index, intent.cell_index) {
            Ok(view) => view,
            Err(reason) => {
                tracing::debug!(%session_id, %game_id, %reason, "move rejected");
                return;
            }
        };

        let players = game.players();
        let status = game.status();
        self.broadcast(players, &view);

        match status {
            GameStatus::InProgress => {}
            GameStatus::Won(winner) => {
                tracing::info!(%game_id, %winner, "game finished")
            }
            GameStatus::Drawn => tracing::info!(%game_id, "game drawn"),
        }
    }

    /// Removes `session_id`, forfeiting its game if it has one.
    ///
    /// The opponent gets exactly one `opponentLeft` and becomes free to
    /// join again. Leaving the waiting slot notifies nobody.
    pub fn disconnect(&mut self, session_id: SessionId) {
        let Some(session) = self.sessions.remove(&session_id) else {
            return;
        };

        if self.waiting == Some(session_id) {
            self.waiting = None;
        } else if let Some(game_id) = session.game_id {
            if let Some(game) = self.games.remove(&game_id) {
                if let Some(opponent_id) = game.players().opponent_of(session_id) {
                    if let Some(opponent) = self.sessions.get_mut(&opponent_id) {
                        opponent.leave_game();
                        opponent.send(ServerMessage::OpponentLeft);
                    }
                }
                tracing::info!(%game_id, %session_id, "game closed by disconnect");
            }
        }

        tracing::info!(%session_id, sessions = self.sessions.len(), "session disconnected");
    }

    pub fn stats(&self) -> LobbyStats {
        LobbyStats {
            sessions: self.sessions.len(),
            games: self.games.len(),
            waiting: self.waiting.is_some(),
        }
    }

    /// The game `session_id` is assigned to, if any.
    pub fn game_of(&self, session_id: SessionId) -> Option<GameId> {
        self.sessions.get(&session_id).and_then(|s| s.game_id)
    }

    /// A snapshot of a stored game.
    pub fn game_state(&self, game_id: GameId) -> Option<StateView> {
        self.games.get(&game_id).map(Game::snapshot)
    }

    fn start_game(&mut self, x: SessionId, o: SessionId) {
        self.next_game_id += 1;
        let game_id = GameId(self.next_game_id);
        let game = Game::new(game_id, Players { x, o });
        let state = game.snapshot();

        for (session_id, mark) in [(x, Mark::X), (o, Mark::O)] {
            if let Some(session) = self.sessions.get_mut(&session_id) {
                session.game_id = Some(game_id);
                session.mark = Some(mark);
                session.send(ServerMessage::MatchStart {
                    mark,
                    state: state.clone(),
                });
            }
        }
        self.games.insert(game_id, game);

        tracing::info!(%game_id, x = %x, o = %o, "match started");
    }

    /// Drops a finished game and detaches whichever players still point
    /// at it.
    fn close_game(&mut self, game_id: GameId) {
        let Some(game) = self.games.remove(&game_id) else {
            return;
        };
        let players = game.players();
        for session_id in [players.x, players.o] {
            if let Some(session) = self.sessions.get_mut(&session_id) {
                if session.game_id == Some(game_id) {
                    session.leave_game();
                }
            }
        }
        tracing::debug!(%game_id, "finished game removed");
    }

    fn broadcast(&self, players: Players, view: &StateView) {
        for session_id in [players.x, players.o] {
            if let Some(session) = self.sessions.get(&session_id) {
                session.send(ServerMessage::StateUpdate(view.clone()));
            }
        }
    }
}
