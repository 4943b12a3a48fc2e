//! Why a move intent was not applied.

use uttt_protocol::{Mark, SessionId};

/// A move intent that failed one of the engine's preconditions.
///
/// These never reach a client. The lobby logs them at debug level and
/// drops the intent; the game is left exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveRejection {
    /// One of the indices is outside 0–8.
    #[error("indices out of range: board {board_index}, cell {cell_index}")]
    OutOfRange { board_index: i64, cell_index: i64 },

    /// The session is not one of this game's two players.
    #[error("session {0} does not play in this game")]
    NotAPlayer(SessionId),

    /// The game already has a winner or is drawn.
    #[error("game is over")]
    GameOver,

    /// It is the other mark's turn.
    #[error("not your turn: {expected} to move")]
    NotYourTurn { expected: Mark },

    /// The player is routed to a different sub-board.
    #[error("must play in sub-board {required}, not {requested}")]
    WrongBoard { required: usize, requested: usize },

    /// The target cell already holds a mark.
    #[error("cell {cell} of sub-board {board} is occupied")]
    Occupied { board: usize, cell: usize },
}
