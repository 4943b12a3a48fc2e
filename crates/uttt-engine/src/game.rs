//! One match: nine sub-boards, their outcomes, and the turn/routing state.

use uttt_protocol::{BOARD_CELLS, GameId, Mark, Outcome, SessionId, StateView};

use crate::board::{SubBoard, line_winner};
use crate::MoveRejection;

/// The two sessions of a game, fixed for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Players {
    pub x: SessionId,
    pub o: SessionId,
}

impl Players {
    /// The session playing `mark`.
    pub fn session(&self, mark: Mark) -> SessionId {
        match mark {
            Mark::X => self.x,
            Mark::O => self.o,
        }
    }

    /// The mark `session` plays, or `None` if it is not in this game.
    pub fn mark_of(&self, session: SessionId) -> Option<Mark> {
        if session == self.x {
            Some(Mark::X)
        } else if session == self.o {
            Some(Mark::O)
        } else {
            None
        }
    }

    /// The other player's session.
    pub fn opponent_of(&self, session: SessionId) -> Option<SessionId> {
        self.mark_of(session).map(|mark| self.session(mark.opponent()))
    }
}

/// Where a game is in its lifecycle.
///
/// ```text
/// InProgress ──(winning move)──→ Won(mark)
///     │
///     └──────(last sub-board decided, no line)──→ Drawn
/// ```
///
/// `Won` and `Drawn` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    InProgress,
    Won(Mark),
    Drawn,
}

/// Authoritative state of one match.
///
/// All mutation goes through [`Game::apply_move`], which checks every
/// precondition before touching anything. A rejected move leaves the game
/// bit-for-bit unchanged.
#[derive(Debug, Clone)]
pub struct Game {
    id: GameId,
    boards: [SubBoard; BOARD_CELLS],
    /// Set at most once per sub-board, never cleared.
    outcomes: [Option<Outcome>; BOARD_CELLS],
    /// `None` means the player to move may pick any open sub-board.
    active_board: Option<usize>,
    current_player: Mark,
    winner: Option<Mark>,
    draw: bool,
    players: Players,
}

impl Game {
    /// A fresh game: empty boards, X to move, free choice of sub-board.
    pub fn new(id: GameId, players: Players) -> Self {
        Self {
            id,
            boards: [SubBoard::new(); BOARD_CELLS],
            outcomes: [None; BOARD_CELLS],
            active_board: None,
            current_player: Mark::X,
            winner: None,
            draw: false,
            players,
        }
    }

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn players(&self) -> Players {
        self.players
    }

    pub fn current_player(&self) -> Mark {
        self.current_player
    }

    pub fn active_board(&self) -> Option<usize> {
        self.active_board
    }

    /// Sub-board `index`. Panics if `index >= 9`.
    pub fn board(&self, index: usize) -> &SubBoard {
        &self.boards[index]
    }

    /// Recorded outcome of sub-board `index`. Panics if `index >= 9`.
    pub fn outcome(&self, index: usize) -> Option<Outcome> {
        self.outcomes[index]
    }

    pub fn status(&self) -> GameStatus {
        match (self.winner, self.draw) {
            (Some(mark), _) => GameStatus::Won(mark),
            (None, true) => GameStatus::Drawn,
            (None, false) => GameStatus::InProgress,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status() != GameStatus::InProgress
    }

    /// Validates and applies one move, returning the snapshot to broadcast.
    ///
    /// Preconditions, checked in this order before anything is written:
    /// 1. both indices are in 0–8,
    /// 2. `session` is one of the two players,
    /// 3. the game is still in progress,
    /// 4. it is `session`'s turn,
    /// 5. the target sub-board is the active one (or any is allowed),
    /// 6. the target cell is empty.
    ///
    /// Moving into a sub-board that is already decided but still has
    /// empty cells is allowed under free choice; its recorded outcome does
    /// not change.
    ///
    /// # Errors
    /// The first failed precondition as a [`MoveRejection`].
    pub fn apply_move(
        &mut self,
        session: SessionId,
        board_index: i64,
        cell_index: i64,
    ) -> Result<StateView, MoveRejection> {
        let (board, cell) = match (to_index(board_index), to_index(cell_index)) {
            (Some(board), Some(cell)) => (board, cell),
            _ => {
                return Err(MoveRejection::OutOfRange {
                    board_index,
                    cell_index,
                });
            }
        };
        let mark = self
            .players
            .mark_of(session)
            .ok_or(MoveRejection::NotAPlayer(session))?;
        if self.is_finished() {
            return Err(MoveRejection::GameOver);
        }
        if mark != self.current_player {
            return Err(MoveRejection::NotYourTurn {
                expected: self.current_player,
            });
        }
        if let Some(required) = self.active_board {
            if required != board {
                return Err(MoveRejection::WrongBoard {
                    required,
                    requested: board,
                });
            }
        }
        if !self.boards[board].place(cell, mark) {
            return Err(MoveRejection::Occupied { board, cell });
        }

        if self.outcomes[board].is_none() {
            self.outcomes[board] = self.boards[board].evaluate();
        }

        // The cell just played names the opponent's sub-board, unless that
        // sub-board can no longer be played.
        self.active_board = self.is_open(cell).then_some(cell);

        match line_winner(&self.outcomes, |o| o.and_then(Outcome::winner)) {
            Some(mark) => self.winner = Some(mark),
            None if self.outcomes.iter().all(Option::is_some) => {
                self.draw = true
            }
            None => {}
        }

        if !self.is_finished() {
            self.current_player = mark.opponent();
        }

        Ok(self.snapshot())
    }

    /// An owned copy of the public state.
    pub fn snapshot(&self) -> StateView {
        StateView {
            boards: self.boards.map(|b| b.cells()),
            board_outcomes: self.outcomes,
            active_board: self.active_board,
            current_player: self.current_player,
            winner: self.winner,
            draw: self.draw,
        }
    }

    /// Undecided and not full.
    fn is_open(&self, index: usize) -> bool {
        self.outcomes[index].is_none() && !self.boards[index].is_full()
    }
}

fn to_index(raw: i64) -> Option<usize> {
    usize::try_from(raw).ok().filter(|i| *i < BOARD_CELLS)
}
