// A* search over the tile grid.
//
// The open set is a `BinaryHeap` turned into a min-heap by reversing the
// ordering of `OpenEntry`. All per-tile scratch data lives in a `NodePool`
// that is allocated once per grid and reset before every search, so the
// engine can run one search per frontier per pass without reallocating.
//
// Determinism: among open entries with equal `f`, the one with the larger `g`
// (closer to the goal) is expanded first, then the smaller position in
// row-major order. No randomness is involved.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use crate::error::SimError;
use crate::grid::{Grid, NEIGHBOR_OFFSETS};
use crate::types::{CellState, Position};

const ORTHOGONAL_COST: f32 = 1.0;
const DIAGONAL_COST: f32 = std::f32::consts::SQRT_2;

/// Scratch state for one tile during a search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchNode {
    pub g: f32,
    pub h: f32,
    pub f: f32,
    pub parent: Option<Position>,
    pub open: bool,
    pub closed: bool,
}

impl SearchNode {
    const NEUTRAL: SearchNode = SearchNode {
        g: f32::INFINITY,
        h: 0.0,
        f: f32::INFINITY,
        parent: None,
        open: false,
        closed: false,
    };
}

impl Default for SearchNode {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Entry in the A* open set (min-heap via reversed ordering).
#[derive(Clone, Copy, Debug)]
struct OpenEntry {
    pos: Position,
    f: f32,
    g: f32,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Smallest f is "greatest"; on ties the larger g wins, then the
        // earlier position.
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| self.g.total_cmp(&other.g))
            .then_with(|| other.pos.cmp(&self.pos))
    }
}

/// Reusable lattice of search nodes, one per grid tile.
///
/// Sized once from the grid dimensions and never resized. `reset_for_search`
/// must run before each search; `astar` does this itself.
#[derive(Clone, Debug)]
pub struct NodePool {
    width: usize,
    height: usize,
    nodes: Vec<SearchNode>,
    open: BinaryHeap<OpenEntry>,
}

impl NodePool {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            nodes: vec![SearchNode::NEUTRAL; width * height],
            open: BinaryHeap::new(),
        }
    }

    pub fn for_grid(grid: &Grid) -> Self {
        let (width, height) = grid.dimensions();
        Self::new(width, height)
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Return every node to its neutral state and drop any leftover open
    /// entries, keeping both allocations.
    pub fn reset_for_search(&mut self) {
        self.nodes.fill(SearchNode::NEUTRAL);
        self.open.clear();
    }

    pub fn node_at(&self, pos: Position) -> Result<&SearchNode, SimError> {
        let idx = self.index_of(pos)?;
        Ok(&self.nodes[idx])
    }

    fn node_mut(&mut self, pos: Position) -> Result<&mut SearchNode, SimError> {
        let idx = self.index_of(pos)?;
        Ok(&mut self.nodes[idx])
    }

    fn index_of(&self, pos: Position) -> Result<usize, SimError> {
        if pos.x < self.width && pos.y < self.height {
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

/// The result of a successful A* search.
#[derive(Clone, Debug, PartialEq)]
pub struct PathResult {
    /// Tiles from the first step after `start` up to and including `goal`.
    /// Empty when start and goal coincide.
    pub steps: VecDeque<Position>,
    /// Total traversal cost.
    pub total_cost: f32,
}

/// Find the cheapest 8-directional path from `start` to `goal`.
///
/// `passable` is consulted for every tile entered, including the goal; the
/// start tile is never checked. The grid is only read; the pool is reset and
/// then used as scratch space.
pub fn astar<P>(
    grid: &Grid,
    pool: &mut NodePool,
    start: Position,
    goal: Position,
    passable: P,
) -> Result<PathResult, SimError>
where
    P: Fn(&CellState) -> bool,
{
    grid.get(start)?;
    grid.get(goal)?;
    debug_assert_eq!(
        pool.dimensions(),
        grid.dimensions(),
        "node pool must mirror the grid it searches"
    );

    pool.reset_for_search();

    if start == goal {
        return Ok(PathResult {
            steps: VecDeque::new(),
            total_cost: 0.0,
        });
    }

    let h_start = start.octile_distance(goal);
    {
        let node = pool.node_mut(start)?;
        node.g = 0.0;
        node.h = h_start;
        node.f = h_start;
        node.open = true;
    }
    pool.open.push(OpenEntry {
        pos: start,
        f: h_start,
        g: 0.0,
    });

    while let Some(current) = pool.open.pop() {
        let current_pos = current.pos;

        if current_pos == goal {
            let total_cost = pool.node_at(goal)?.g;
            return Ok(PathResult {
                steps: reconstruct_path(pool, start, goal)?,
                total_cost,
            });
        }

        let current_g = {
            let node = pool.node_mut(current_pos)?;
            // Stale heap entry for a node already expanded via a cheaper route.
            if node.closed || current.g > node.g {
                continue;
            }
            node.closed = true;
            node.open = false;
            node.g
        };

        for &(dx, dy) in &NEIGHBOR_OFFSETS {
            let Some(neighbor) = grid.offset(current_pos, dx, dy) else {
                continue;
            };
            if !passable(&grid[neighbor]) {
                continue;
            }

            let step = if dx != 0 && dy != 0 {
                DIAGONAL_COST
            } else {
                ORTHOGONAL_COST
            };
            let tentative_g = current_g + step;

            let node = pool.node_mut(neighbor)?;
            if node.closed || tentative_g >= node.g {
                continue;
            }
            let h = neighbor.octile_distance(goal);
            node.g = tentative_g;
            node.h = h;
            node.f = tentative_g + h;
            node.parent = Some(current_pos);
            node.open = true;
            let f = node.f;
            pool.open.push(OpenEntry {
                pos: neighbor,
                f,
                g: tentative_g,
            });
        }
    }

    Err(SimError::NoPathFound {
        from: start,
        to: goal,
    })
}

/// Walk parent links back from the goal.
fn reconstruct_path(
    pool: &NodePool,
    start: Position,
    goal: Position,
) -> Result<VecDeque<Position>, SimError> {
    let mut steps = VecDeque::new();
    let mut current = goal;
    while current != start {
        steps.push_front(current);
        match pool.node_at(current)?.parent {
            Some(prev) => current = prev,
            None => {
                return Err(SimError::NoPathFound {
                    from: start,
                    to: goal,
                })
            }
        }
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permissive(_: &CellState) -> bool {
        true
    }

    fn avoid_mould(cell: &CellState) -> bool {
        !cell.is_mould()
    }

    fn path_cost(start: Position, steps: &VecDeque<Position>) -> f32 {
        let mut cost = 0.0;
        let mut prev = start;
        for &next in steps {
            cost += if prev.x != next.x && prev.y != next.y {
                DIAGONAL_COST
            } else {
                ORTHOGONAL_COST
            };
            prev = next;
        }
        cost
    }

    /// Plain Dijkstra over the same 8-connected grid, as a reference.
    fn brute_force_cost(
        grid: &Grid,
        start: Position,
        goal: Position,
        passable: impl Fn(&CellState) -> bool,
    ) -> Option<f32> {
        let (w, h) = grid.dimensions();
        let mut dist = vec![f32::INFINITY; w * h];
        let mut done = vec![false; w * h];
        dist[start.y * w + start.x] = 0.0;
        loop {
            let mut best: Option<(usize, f32)> = None;
            for (i, &d) in dist.iter().enumerate() {
                if !done[i] && d.is_finite() && best.map_or(true, |(_, bd)| d < bd) {
                    best = Some((i, d));
                }
            }
            let (i, d) = best?;
            let pos = Position::new(i % w, i / w);
            if pos == goal {
                return Some(d);
            }
            done[i] = true;
            for &(dx, dy) in &NEIGHBOR_OFFSETS {
                if let Some(n) = grid.offset(pos, dx, dy) {
                    if !passable(&grid[n]) {
                        continue;
                    }
                    let step = if dx != 0 && dy != 0 {
                        DIAGONAL_COST
                    } else {
                        ORTHOGONAL_COST
                    };
                    let ni = n.y * w + n.x;
                    if d + step < dist[ni] {
                        dist[ni] = d + step;
                    }
                }
            }
        }
    }

    #[test]
    fn same_start_and_goal_gives_empty_path() {
        let grid = Grid::new(3, 3);
        let mut pool = NodePool::for_grid(&grid);
        let p = Position::new(1, 1);
        let result = astar(&grid, &mut pool, p, p, permissive).unwrap();
        assert!(result.steps.is_empty());
        assert_eq!(result.total_cost, 0.0);
    }

    #[test]
    fn diagonal_path_excludes_start_and_includes_goal() {
        let grid = Grid::new(5, 5);
        let mut pool = NodePool::for_grid(&grid);
        let result = astar(
            &grid,
            &mut pool,
            Position::new(0, 0),
            Position::new(4, 4),
            permissive,
        )
        .unwrap();
        assert_eq!(
            result.steps,
            VecDeque::from(vec![
                Position::new(1, 1),
                Position::new(2, 2),
                Position::new(3, 3),
                Position::new(4, 4),
            ])
        );
        assert!((result.total_cost - 4.0 * DIAGONAL_COST).abs() < 1e-5);
    }

    #[test]
    fn cost_matches_brute_force_on_open_grids() {
        let grid = Grid::new(6, 5);
        let mut pool = NodePool::for_grid(&grid);
        let positions: Vec<_> = grid.positions().collect();
        for &start in &positions {
            for &goal in positions.iter().step_by(3) {
                let result = astar(&grid, &mut pool, start, goal, permissive).unwrap();
                let expected = brute_force_cost(&grid, start, goal, permissive).unwrap();
                assert!(
                    (result.total_cost - expected).abs() < 1e-4,
                    "{start} -> {goal}: astar {} vs dijkstra {expected}",
                    result.total_cost
                );
                assert!((path_cost(start, &result.steps) - expected).abs() < 1e-4);
                assert!((expected - start.octile_distance(goal)).abs() < 1e-4);
            }
        }
    }

    #[test]
    fn cost_matches_brute_force_around_walls() {
        let mut grid = Grid::new(7, 6);
        for y in 0..5 {
            grid[Position::new(3, y)] = CellState::mould(1.0);
        }
        grid[Position::new(5, 2)] = CellState::mould(1.0);
        grid[Position::new(5, 3)] = CellState::mould(1.0);
        let mut pool = NodePool::for_grid(&grid);

        for start in [Position::new(0, 0), Position::new(1, 4), Position::new(2, 5)] {
            for goal in [Position::new(6, 0), Position::new(4, 2), Position::new(6, 5)] {
                let result = astar(&grid, &mut pool, start, goal, avoid_mould).unwrap();
                let expected = brute_force_cost(&grid, start, goal, avoid_mould).unwrap();
                assert!((result.total_cost - expected).abs() < 1e-4);
                assert!(result.steps.iter().all(|&p| !grid[p].is_mould()));
            }
        }
    }

    #[test]
    fn walled_off_goal_reports_no_path() {
        let mut grid = Grid::new(5, 5);
        for y in 0..5 {
            grid[Position::new(2, y)] = CellState::mould(1.0);
        }
        let mut pool = NodePool::for_grid(&grid);
        let err = astar(
            &grid,
            &mut pool,
            Position::new(0, 0),
            Position::new(4, 4),
            avoid_mould,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SimError::NoPathFound {
                from: Position::new(0, 0),
                to: Position::new(4, 4)
            }
        );
        assert!(err.is_recoverable());
    }

    #[test]
    fn out_of_bounds_goal_is_rejected() {
        let grid = Grid::new(3, 3);
        let mut pool = NodePool::for_grid(&grid);
        let err = astar(
            &grid,
            &mut pool,
            Position::new(0, 0),
            Position::new(3, 0),
            permissive,
        )
        .unwrap_err();
        assert!(matches!(err, SimError::OutOfBounds { .. }));
    }

    #[test]
    fn reset_clears_every_node() {
        let grid = Grid::new(4, 4);
        let mut pool = NodePool::for_grid(&grid);
        astar(
            &grid,
            &mut pool,
            Position::new(0, 0),
            Position::new(3, 2),
            permissive,
        )
        .unwrap();
        assert!(pool.node_at(Position::new(0, 0)).unwrap().closed);

        pool.reset_for_search();
        for pos in grid.positions() {
            assert_eq!(*pool.node_at(pos).unwrap(), SearchNode::NEUTRAL);
        }
        assert!(pool.node_at(Position::new(4, 0)).is_err());
    }

    #[test]
    fn reused_pool_gives_same_answer_as_fresh_pool() {
        let mut grid = Grid::new(8, 8);
        grid[Position::new(4, 4)] = CellState::mould(1.0);
        let mut reused = NodePool::for_grid(&grid);
        let pairs = [
            (Position::new(0, 0), Position::new(7, 7)),
            (Position::new(7, 0), Position::new(0, 6)),
            (Position::new(3, 5), Position::new(5, 3)),
        ];
        for (start, goal) in pairs {
            let a = astar(&grid, &mut reused, start, goal, permissive).unwrap();
            let mut fresh = NodePool::for_grid(&grid);
            let b = astar(&grid, &mut fresh, start, goal, permissive).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn equal_f_prefers_deeper_node() {
        let mut heap = BinaryHeap::new();
        let shallow = OpenEntry {
            pos: Position::new(0, 0),
            f: 5.0,
            g: 1.0,
        };
        let deep = OpenEntry {
            pos: Position::new(9, 9),
            f: 5.0,
            g: 4.0,
        };
        let cheap = OpenEntry {
            pos: Position::new(5, 5),
            f: 4.5,
            g: 0.5,
        };
        heap.push(shallow);
        heap.push(deep);
        heap.push(cheap);
        assert_eq!(heap.pop().unwrap().pos, cheap.pos);
        assert_eq!(heap.pop().unwrap().pos, deep.pos);
        assert_eq!(heap.pop().unwrap().pos, shallow.pos);
    }

    #[test]
    fn deterministic_across_runs() {
        let grid = Grid::new(9, 9);
        let mut pool = NodePool::for_grid(&grid);
        let a = astar(&grid, &mut pool, Position::new(1, 7), Position::new(8, 2), permissive)
            .unwrap();
        let b = astar(&grid, &mut pool, Position::new(1, 7), Position::new(8, 2), permissive)
            .unwrap();
        assert_eq!(a.steps, b.steps);
    }
}
