use ::rand as external_rand;
use external_rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::config::SimulationConfig;
use crate::error::{ConfigError, SimError};
use crate::frontier::Frontier;
use crate::grid::Grid;
use crate::pathfinding::{astar, NodePool};
use crate::render::{NullSink, RenderSink};
use crate::types::{CellState, Position};

/// What happened during one `tick`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub grown: usize,
    pub reinforced: usize,
    pub removed: usize,
    pub food_bites: usize,
    pub food_consumed: usize,
    pub promoted: usize,
    /// Frontier-passes that made no progress (no path or no target).
    pub idle: usize,
    pub active_frontiers: usize,
}

/// Point-in-time counters for the whole grid.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationStats {
    pub tick: u64,
    pub running: bool,
    pub empty_cells: usize,
    pub food_cells: usize,
    pub mould_cells: usize,
    pub frontiers: usize,
    pub max_reinforcement: u32,
    pub avg_saturation: f32,
    pub remaining_food_energy: f32,
    pub food_being_chased: bool,
}

/// Serializable copy of the grid, row-major.
#[derive(Clone, Debug, Serialize)]
pub struct GridSnapshot {
    pub width: usize,
    pub height: usize,
    pub cells: Vec<CellState>,
}

/// The mould growth engine.
///
/// Owns the grid, the search node pool and every frontier. Mutations are
/// reported to the render sink `S` as they happen.
pub struct Simulation<S: RenderSink = NullSink> {
    config: SimulationConfig,
    grid: Grid,
    pool: NodePool,
    frontiers: Vec<Frontier>,
    // Heads promoted during the current pass; merged once the pass ends.
    promoted: Vec<Frontier>,
    max_reinforcement: u32,
    food_being_chased: bool,
    running: bool,
    tick_index: u64,
    seed: u64,
    rng: ChaCha8Rng,
    sink: S,
}

impl Simulation<NullSink> {
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        Self::with_sink(config, NullSink)
    }
}

impl<S: RenderSink> Simulation<S> {
    pub fn with_sink(config: SimulationConfig, sink: S) -> Result<Self, ConfigError> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(|| external_rand::thread_rng().gen());
        let grid = Grid::new(config.grid_width(), config.grid_height());
        let pool = NodePool::for_grid(&grid);
        info!(
            width = grid.width(),
            height = grid.height(),
            seed,
            "created simulation"
        );
        Ok(Self {
            config,
            grid,
            pool,
            frontiers: Vec::new(),
            promoted: Vec::new(),
            max_reinforcement: 0,
            food_being_chased: false,
            running: false,
            tick_index: 0,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            sink,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn frontiers(&self) -> &[Frontier] {
        &self.frontiers
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn tick_index(&self) -> u64 {
        self.tick_index
    }

    pub fn max_reinforcement(&self) -> u32 {
        self.max_reinforcement
    }

    pub fn food_being_chased(&self) -> bool {
        self.food_being_chased
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) {
        if !self.running {
            info!(tick = self.tick_index, "simulation started");
        }
        self.running = true;
    }

    pub fn stop(&mut self) {
        if self.running {
            info!(tick = self.tick_index, "simulation stopped");
        }
        self.running = false;
    }

    /// Halts ticking, leaving the grid as it is. Use `reset` to begin a new run.
    pub fn restart(&mut self) {
        self.stop();
    }

    /// Fill the whole grid with empty tiles. Any frontier loses its tile and
    /// is dropped.
    pub fn populate_empty(&mut self) {
        self.grid.fill(CellState::Empty);
        self.frontiers.clear();
        self.promoted.clear();
        for pos in self.grid.positions() {
            self.sink.on_place(pos, &CellState::Empty);
        }
    }

    /// Scatter up to `count` food tiles on random empty tiles. Returns how
    /// many were placed; fewer than `count` only when no empty tile turned up
    /// within the placement budget.
    pub fn populate_food(&mut self, count: usize) -> usize {
        let mut placed = 0;
        for _ in 0..count {
            match self.random_empty_position() {
                Ok(pos) => {
                    self.put(pos, CellState::food(self.config.default_food_energy));
                    placed += 1;
                }
                Err(e) => {
                    warn!(placed, requested = count, error = %e, "stopped scattering food");
                    break;
                }
            }
        }
        debug!(placed, "scattered food");
        placed
    }

    /// Put a single food tile at `pos`.
    pub fn place_food(&mut self, pos: Position) -> Result<(), SimError> {
        if !self.grid.get(pos)?.is_empty() {
            return Err(SimError::NotEmpty(pos));
        }
        self.put(pos, CellState::food(self.config.default_food_energy));
        Ok(())
    }

    /// Turn the empty tile at `pos` into a mould head and start a frontier
    /// there.
    pub fn place_head(&mut self, pos: Position) -> Result<(), SimError> {
        if !self.grid.get(pos)?.is_empty() {
            return Err(SimError::NotEmpty(pos));
        }
        self.put(pos, CellState::head(self.config.initial_saturation));
        self.frontiers.push(Frontier::new(pos, &mut self.rng));
        debug!(%pos, "placed mould head");
        Ok(())
    }

    /// Place a head on a random empty tile, giving up after
    /// `max_placement_attempts` occupied draws.
    pub fn place_random_head(&mut self) -> Result<Position, SimError> {
        let pos = self.random_empty_position()?;
        self.place_head(pos)?;
        Ok(pos)
    }

    /// Start a fresh run: empty grid, new food, one random head, counters
    /// cleared. Whether ticks are accepted is left unchanged.
    pub fn reset(&mut self) -> Result<Position, SimError> {
        self.max_reinforcement = 0;
        self.food_being_chased = false;
        self.tick_index = 0;
        self.populate_empty();
        self.populate_food(self.config.initial_food_count);
        let head = self.place_random_head()?;
        info!(%head, "simulation reset");
        Ok(head)
    }

    /// Advance one time unit: a decay pass, then `expansion_rate` expansion
    /// passes. Returns `None` while stopped.
    pub fn tick(&mut self) -> Option<TickReport> {
        if !self.running {
            return None;
        }
        self.tick_index += 1;
        let mut report = TickReport {
            tick: self.tick_index,
            ..TickReport::default()
        };

        self.decay_pass(&mut report);
        self.retire_frontiers();

        for _ in 0..self.config.expansion_rate {
            self.expansion_pass(&mut report);
        }

        report.active_frontiers = self.frontiers.len();
        debug!(
            tick = report.tick,
            grown = report.grown,
            reinforced = report.reinforced,
            removed = report.removed,
            bites = report.food_bites,
            promoted = report.promoted,
            idle = report.idle,
            frontiers = report.active_frontiers,
            "tick complete"
        );
        Some(report)
    }

    pub fn stats(&self) -> SimulationStats {
        let mut empty_cells = 0;
        let mut food_cells = 0;
        let mut mould_cells = 0;
        let mut total_saturation = 0.0f32;
        let mut remaining_food_energy = 0.0f32;
        for (_, cell) in self.grid.iter() {
            match *cell {
                CellState::Empty => empty_cells += 1,
                CellState::Food { remaining_energy } => {
                    food_cells += 1;
                    remaining_food_energy += remaining_energy;
                }
                CellState::Mould { saturation, .. } => {
                    mould_cells += 1;
                    total_saturation += saturation;
                }
            }
        }
        let avg_saturation = if mould_cells > 0 {
            total_saturation / mould_cells as f32
        } else {
            0.0
        };
        SimulationStats {
            tick: self.tick_index,
            running: self.running,
            empty_cells,
            food_cells,
            mould_cells,
            frontiers: self.frontiers.len(),
            max_reinforcement: self.max_reinforcement,
            avg_saturation,
            remaining_food_energy,
            food_being_chased: self.food_being_chased,
        }
    }

    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            width: self.grid.width(),
            height: self.grid.height(),
            cells: self.grid.iter().map(|(_, c)| *c).collect(),
        }
    }

    fn put(&mut self, pos: Position, state: CellState) {
        self.grid[pos] = state;
        self.sink.on_place(pos, &state);
    }

    fn random_empty_position(&mut self) -> Result<Position, SimError> {
        let (width, height) = self.grid.dimensions();
        let attempts = self.config.max_placement_attempts;
        for _ in 0..attempts {
            let pos = Position::new(self.rng.gen_range(0..width), self.rng.gen_range(0..height));
            if self.grid[pos].is_empty() {
                return Ok(pos);
            }
        }
        Err(SimError::NoEmptyCell { attempts })
    }

    fn decay_pass(&mut self, report: &mut TickReport) {
        let decay = self.config.decay_rate;
        let threshold = self.config.disappear_threshold;

        for pos in self.grid.positions() {
            let cell = &mut self.grid[pos];
            let CellState::Mould { saturation, .. } = cell else {
                continue;
            };
            let next = *saturation - decay;
            if next < threshold {
                *cell = CellState::Empty;
                report.removed += 1;
                self.sink.on_remove(pos);
            } else if decay > 0.0 {
                *saturation = next;
                let state = *cell;
                self.sink.on_place(pos, &state);
            }
        }
    }

    /// Drop frontiers whose head tile no longer holds mould.
    fn retire_frontiers(&mut self) {
        let grid = &self.grid;
        let before = self.frontiers.len();
        self.frontiers.retain(|f| grid[f.head].is_mould());
        let retired = before - self.frontiers.len();
        if retired > 0 {
            trace!(retired, "retired frontiers");
        }
    }

    fn expansion_pass(&mut self, report: &mut TickReport) {
        // Frontiers promoted mid-pass land in `promoted`, so this length is a
        // stable snapshot of who moves this pass.
        let active = self.frontiers.len();
        for idx in 0..active {
            match self.next_step(idx) {
                Ok(step) => self.spread_to(idx, step, report),
                Err(e) => self.mark_idle(idx, e, report),
            }
        }
        self.frontiers.append(&mut self.promoted);
    }

    /// Frontier `idx` has no move this pass. Only recoverable errors mean
    /// "idle"; an off-grid coordinate is a bug in step computation.
    fn mark_idle(&self, idx: usize, e: SimError, report: &mut TickReport) {
        let head = self.frontiers[idx].head;
        assert!(
            e.is_recoverable(),
            "frontier at {head} computed a bad coordinate: {e}"
        );
        report.idle += 1;
        trace!(%head, error = %e, "frontier idle");
    }

    /// Where frontier `idx` grows next, searching for a new route if its
    /// cached one is used up.
    fn next_step(&mut self, idx: usize) -> Result<Position, SimError> {
        let Self {
            grid,
            pool,
            frontiers,
            rng,
            config,
            ..
        } = self;
        let frontier = &mut frontiers[idx];
        let head = frontier.head;
        // No tile kind blocks growth; routes may cross the colony's own mould.
        let passable = |_: &CellState| true;

        let mut stale_food = false;
        if let Some(target) = frontier.food.as_mut() {
            if target.path.is_empty() {
                if grid[target.pos].is_food() {
                    target.path = astar(grid, pool, head, target.pos, passable)?.steps;
                } else {
                    stale_food = true;
                }
            }
            if let Some(step) = target.path.pop_front() {
                return Ok(step);
            }
        }
        if stale_food {
            frontier.food = None;
        }

        if frontier.path.is_empty() {
            let goal = frontier.choose_expansion_goal(
                grid,
                rng,
                config.expansion_step_max,
                config.max_expansion_hops,
            )?;
            frontier.path = astar(grid, pool, head, goal, passable)?.steps;
        }
        frontier.path.pop_front().ok_or(SimError::NoPathFound {
            from: head,
            to: head,
        })
    }

    fn spread_to(&mut self, idx: usize, pos: Position, report: &mut TickReport) {
        let cell = self.grid[pos];
        match cell {
            CellState::Empty => {
                self.put(pos, CellState::mould(self.config.initial_saturation));
                report.grown += 1;
            }
            CellState::Food { remaining_energy } => {
                self.eat_food(idx, pos, remaining_energy, report);
            }
            CellState::Mould {
                saturation,
                times_reinforced,
                is_head,
            } => {
                let times_reinforced = times_reinforced.saturating_add(1);
                let saturation = (saturation + self.config.reinforcement).min(1.0);
                let mut is_head = is_head;
                report.reinforced += 1;

                if times_reinforced > self.max_reinforcement {
                    self.max_reinforcement = times_reinforced;
                    if !is_head {
                        is_head = true;
                        self.promoted.push(Frontier::new(pos, &mut self.rng));
                        report.promoted += 1;
                        trace!(%pos, times_reinforced, "promoted mould to head");
                    }
                }

                self.put(
                    pos,
                    CellState::Mould {
                        saturation,
                        times_reinforced,
                        is_head,
                    },
                );
            }
        }
    }

    fn eat_food(&mut self, idx: usize, pos: Position, energy: f32, report: &mut TickReport) {
        let remaining = energy - self.config.food_bite;
        report.food_bites += 1;

        if remaining < self.config.disappear_threshold {
            for frontier in self.frontiers.iter_mut().chain(self.promoted.iter_mut()) {
                frontier.forget_food(pos);
            }
            self.food_being_chased = false;
            self.put(pos, CellState::head(self.config.initial_saturation));
            self.promoted.push(Frontier::new(pos, &mut self.rng));
            report.food_consumed += 1;
            report.promoted += 1;
            debug!(%pos, "food consumed");
        } else {
            self.put(pos, CellState::food(remaining));
            self.frontiers[idx].pursue(pos);
            self.food_being_chased = true;
        }
    }
}
