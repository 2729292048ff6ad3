use serde::{Deserialize, Serialize};
use std::fmt;

/// A tile coordinate on the simulation grid.
///
/// Ordering is row-major (y first, then x) so that sorted collections of
/// positions and A* tie-breaks walk the grid the same way `Grid::positions`
/// does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Largest per-axis distance (the number of king moves between the two).
    pub fn chebyshev_distance(self, other: Position) -> usize {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Cost of the cheapest 8-directional path on an open grid: diagonal
    /// steps cost sqrt(2), orthogonal steps cost 1.
    pub fn octile_distance(self, other: Position) -> f32 {
        let dx = self.x.abs_diff(other.x) as f32;
        let dy = self.y.abs_diff(other.y) as f32;
        let (lo, hi) = if dx < dy { (dx, dy) } else { (dy, dx) };
        hi + (std::f32::consts::SQRT_2 - 1.0) * lo
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.y.cmp(&other.y).then_with(|| self.x.cmp(&other.x))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// What occupies a single tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CellState {
    #[default]
    Empty,
    Food {
        /// Only ever decreases; the tile turns into mould once this drops
        /// below the disappear threshold.
        remaining_energy: f32,
    },
    Mould {
        /// Visible energy of the tile, always within [0, 1].
        saturation: f32,
        /// How many times growth has passed back through this tile.
        times_reinforced: u32,
        /// Set while the tile anchors an active (or pending) frontier.
        is_head: bool,
    },
}

impl CellState {
    /// A freshly grown, non-head mould tile.
    pub fn mould(saturation: f32) -> Self {
        CellState::Mould {
            saturation,
            times_reinforced: 0,
            is_head: false,
        }
    }

    pub fn head(saturation: f32) -> Self {
        CellState::Mould {
            saturation,
            times_reinforced: 0,
            is_head: true,
        }
    }

    pub fn food(remaining_energy: f32) -> Self {
        CellState::Food { remaining_energy }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellState::Empty)
    }

    pub fn is_food(&self) -> bool {
        matches!(self, CellState::Food { .. })
    }

    pub fn is_mould(&self) -> bool {
        matches!(self, CellState::Mould { .. })
    }

    pub fn is_head(&self) -> bool {
        matches!(self, CellState::Mould { is_head: true, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_order_row_major() {
        let mut cells = vec![
            Position::new(2, 1),
            Position::new(0, 2),
            Position::new(1, 1),
            Position::new(3, 0),
        ];
        cells.sort();
        assert_eq!(
            cells,
            vec![
                Position::new(3, 0),
                Position::new(1, 1),
                Position::new(2, 1),
                Position::new(0, 2),
            ]
        );
    }

    #[test]
    fn octile_distance_mixes_diagonal_and_straight_steps() {
        let a = Position::new(0, 0);
        assert_eq!(a.octile_distance(Position::new(3, 0)), 3.0);
        let diag = a.octile_distance(Position::new(2, 2));
        assert!((diag - 2.0 * std::f32::consts::SQRT_2).abs() < 1e-5);
        let mixed = a.octile_distance(Position::new(4, 1));
        assert!((mixed - (3.0 + std::f32::consts::SQRT_2)).abs() < 1e-5);
        assert_eq!(a.chebyshev_distance(Position::new(4, 1)), 4);
    }

    #[test]
    fn cell_state_serializes_with_kind_tag() {
        let json = serde_json::to_value(CellState::food(5.0)).unwrap();
        assert_eq!(json["kind"], "food");
        assert_eq!(json["remaining_energy"], 5.0);
        let head = CellState::head(1.0);
        assert!(head.is_head());
        assert!(head.is_mould());
        assert!(!CellState::mould(1.0).is_head());
    }
}
