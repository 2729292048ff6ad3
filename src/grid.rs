use std::ops::{Index, IndexMut};

use crate::error::SimError;
use crate::types::{CellState, Position};

/// The eight king-move offsets, orthogonal first.
pub const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// Dense row-major store of every tile's state.
///
/// Every in-bounds position always holds exactly one `CellState`; there is no
/// way to remove a cell, only to overwrite it.
#[derive(Clone, Debug)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<CellState>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![CellState::Empty; width * height],
        }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    pub fn get(&self, pos: Position) -> Result<&CellState, SimError> {
        let idx = self.index_of(pos)?;
        Ok(&self.cells[idx])
    }

    pub fn set(&mut self, pos: Position, state: CellState) -> Result<(), SimError> {
        let idx = self.index_of(pos)?;
        self.cells[idx] = state;
        Ok(())
    }

    /// Overwrite every tile with `state`.
    pub fn fill(&mut self, state: CellState) {
        self.cells.fill(state);
    }

    /// `pos` shifted by `(dx, dy)`, or `None` if that leaves the grid.
    pub fn offset(&self, pos: Position, dx: isize, dy: isize) -> Option<Position> {
        let x = pos.x.checked_add_signed(dx)?;
        let y = pos.y.checked_add_signed(dy)?;
        let shifted = Position::new(x, y);
        self.contains(shifted).then_some(shifted)
    }

    /// All positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> {
        let width = self.width;
        (0..self.width * self.height).map(move |i| Position::new(i % width, i / width))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, &CellState)> {
        self.positions().zip(self.cells.iter())
    }

    pub fn count_matching(&self, pred: impl Fn(&CellState) -> bool) -> usize {
        self.cells.iter().filter(|c| pred(c)).count()
    }

    fn index_of(&self, pos: Position) -> Result<usize, SimError> {
        if self.contains(pos) {
            Ok(pos.y * self.width + pos.x)
        } else {
            Err(SimError::OutOfBounds {
                x: pos.x,
                y: pos.y,
                width: self.width,
                height: self.height,
            })
        }
    }
}

// Internal callers only index with coordinates derived from the grid itself,
// so a miss here is a bug and panics.
impl Index<Position> for Grid {
    type Output = CellState;

    fn index(&self, pos: Position) -> &CellState {
        match self.index_of(pos) {
            Ok(idx) => &self.cells[idx],
            Err(e) => panic!("{e}"),
        }
    }
}

impl IndexMut<Position> for Grid {
    fn index_mut(&mut self, pos: Position) -> &mut CellState {
        match self.index_of(pos) {
            Ok(idx) => &mut self.cells[idx],
            Err(e) => panic!("{e}"),
        }
    }
}
