//! Rules engine for Ultimate Tic-Tac-Toe.
//!
//! A [`Game`] is nine [`SubBoard`]s plus the routing state that says where
//! the next move must go. The engine is synchronous and owns no I/O; the
//! lobby calls [`Game::apply_move`] and broadcasts the returned
//! [`StateView`](uttt_protocol::StateView).
//!
//! # Key types
//!
//! - [`Game`] — one match, mutated only through `apply_move`
//! - [`SubBoard`] — one inner 3×3 grid
//! - [`GameStatus`] — InProgress / Won / Drawn
//! - [`MoveRejection`] — why an intent was ignored

mod board;
mod error;
mod game;

pub use board::{LINES, SubBoard, line_winner};
pub use error::MoveRejection;
pub use game::{Game, GameStatus, Players};
