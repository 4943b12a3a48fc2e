//! Wire types shared by the engine, the lobby and the server.
//!
//! Everything in here is either an identity handle or something that is
//! serialized and sent to a browser client. The JSON shapes are part of
//! the client contract, so the serde attributes matter as much as the
//! Rust types themselves.

use serde::{Deserialize, Serialize};

use std::fmt;

/// Number of cells in a sub-board, and number of sub-boards in a game.
pub const BOARD_CELLS: usize = 9;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Anonymous handle for one connected client.
///
/// Sessions have no account behind them. The lobby hands out a fresh id
/// when a connection registers and forgets it on disconnect.
///
/// `#[serde(transparent)]` keeps the JSON form a plain number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S-{}", self.0)
    }
}

/// Identifier of one match between two sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub u64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Marks and outcomes
// ---------------------------------------------------------------------------

/// A player's symbol. X always moves first.
///
/// Serialized as the bare tokens `"X"` and `"O"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    /// The other player's mark.
    pub fn opponent(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => write!(f, "X"),
            Self::O => write!(f, "O"),
        }
    }
}

/// Contents of one cell: `None` is empty, serialized as `null`.
pub type Cell = Option<Mark>;

/// The decided result of a sub-board.
///
/// An undecided sub-board has no outcome at all (`Option<Outcome>` is
/// `None`), so this enum only covers the two terminal cases. On the wire a
/// win is the winner's mark and a draw is the string `"draw"`, which is the
/// shape the browser client already renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    X,
    O,
    #[serde(rename = "draw")]
    Draw,
}

impl Outcome {
    /// The winning mark, or `None` for a draw.
    ///
    /// The super-board line check goes through this, which is what keeps
    /// three drawn sub-boards in a row from counting as a win.
    pub fn winner(self) -> Option<Mark> {
        match self {
            Self::X => Some(Mark::X),
            Self::O => Some(Mark::O),
            Self::Draw => None,
        }
    }
}

impl From<Mark> for Outcome {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::X => Self::X,
            Mark::O => Self::O,
        }
    }
}

// ---------------------------------------------------------------------------
// StateView — the snapshot every client renders
// ---------------------------------------------------------------------------

/// An owned copy of a game's public state.
///
/// Every field is a value type (fixed-size arrays, not references), so a
/// view that has been handed to a channel can never observe later moves.
/// Session identities are deliberately absent: clients learn their own mark
/// from `matchStart` and nothing about the other connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateView {
    /// `boards[b][c]` is cell `c` of sub-board `b`, both row-major 0–8.
    pub boards: [[Cell; BOARD_CELLS]; BOARD_CELLS],

    /// Decided outcome per sub-board, `null` while undecided.
    pub board_outcomes: [Option<Outcome>; BOARD_CELLS],

    /// Sub-board the player to move is forced into; `null` means free choice.
    pub active_board: Option<usize>,

    /// Whose turn it is. Frozen once the game has ended.
    pub current_player: Mark,

    pub winner: Option<Mark>,

    pub draw: bool,
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// A move intent as the client sent it.
///
/// The indices are plain signed integers rather than `u8` so an
/// out-of-range value such as `9` or `-1` still decodes and reaches the
/// engine's bounds check. Non-integer values fail to decode and are
/// dropped before that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveIntent {
    pub board_index: i64,
    pub cell_index: i64,
}

/// Everything a client can send.
///
/// Adjacently tagged, so a frame looks like
/// `{ "event": "move", "data": { "boardIndex": 4, "cellIndex": 2 } }`
/// and unit events carry no `data` at all: `{ "event": "join" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Enter matchmaking. Ignored while the session is in a running game.
    Join,

    /// Place the session's mark.
    Move(MoveIntent),

    /// Keep-alive. The server answers with [`ServerMessage::Pong`].
    Ping { client_time: u64 },
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// Everything the server can send. Same framing as [`ClientMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// The session is parked until a second player joins.
    Waiting,

    /// A match was formed. Sent to both players with their own mark.
    MatchStart { mark: Mark, state: StateView },

    /// Full snapshot after an accepted move, sent to both players.
    StateUpdate(StateView),

    /// The other player disconnected; the match is gone.
    OpponentLeft,

    /// Reply to [`ClientMessage::Ping`]. `server_time` is milliseconds
    /// since the connection was accepted.
    Pong { client_time: u64, server_time: u64 },
}

// =========================================================================
// Tests
// =========================================================================
