//! A single 3×3 sub-board and the line check shared with the super-board.

use uttt_protocol::{BOARD_CELLS, Cell, Mark, Outcome};

/// The eight winning triples of a row-major 3×3 grid.
pub const LINES: [[usize; 3]; 8] = [
    // Rows
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    // Columns
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    // Diagonals
    [0, 4, 8],
    [2, 4, 6],
];

/// Returns the mark that owns a complete line in `cells`, if any.
///
/// `mark_of` projects each value onto the mark it stands for. Values that
/// project to `None` (an empty cell, a drawn sub-board) never form a line,
/// even if the same value appears three times in a row. The same function
/// decides sub-boards (over cells) and the game (over sub-board outcomes).
pub fn line_winner<T: Copy>(
    cells: &[T; BOARD_CELLS],
    mark_of: impl Fn(T) -> Option<Mark>,
) -> Option<Mark> {
    LINES.iter().find_map(|&[a, b, c]| {
        let mark = mark_of(cells[a])?;
        (mark_of(cells[b]) == Some(mark) && mark_of(cells[c]) == Some(mark))
            .then_some(mark)
    })
}

/// Nine cells, row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubBoard {
    cells: [Cell; BOARD_CELLS],
}

impl SubBoard {
    /// An empty sub-board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents of cell `index`. Panics if `index >= 9`.
    pub fn get(&self, index: usize) -> Cell {
        self.cells[index]
    }

    /// Copy of all nine cells.
    pub fn cells(&self) -> [Cell; BOARD_CELLS] {
        self.cells
    }

    /// Writes `mark` into an empty cell.
    ///
    /// Returns `false` and leaves the board untouched if the cell is taken.
    pub(crate) fn place(&mut self, index: usize, mark: Mark) -> bool {
        if self.cells[index].is_some() {
            return false;
        }
        self.cells[index] = Some(mark);
        true
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// The mark holding a complete line, if any.
    pub fn winner(&self) -> Option<Mark> {
        line_winner(&self.cells, |cell| cell)
    }

    /// The outcome this board would record now.
    ///
    /// A line wins even on a full board; only a full board with no line is
    /// a draw.
    pub fn evaluate(&self) -> Option<Outcome> {
        match self.winner() {
            Some(mark) => Some(mark.into()),
            None if self.is_full() => Some(Outcome::Draw),
            None => None,
        }
    }
}
