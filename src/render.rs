// Render collaborator seam.
//
// The engine never draws anything; it reports every tile it changes to a
// `RenderSink`, which owns presentation (shape, colour, opacity). Sinks only
// observe: they get shared references and cannot reach back into the grid.

use serde::Serialize;

use crate::types::{CellState, Position};

pub trait RenderSink {
    /// A tile was placed or changed; `state` is its new content.
    fn on_place(&mut self, pos: Position, state: &CellState);

    /// A tile reverted to empty after decaying away.
    fn on_remove(&mut self, pos: Position);
}

/// Discards every notification (headless runs).
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn on_place(&mut self, _pos: Position, _state: &CellState) {}
    fn on_remove(&mut self, _pos: Position) {}
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CellEvent {
    Place { pos: Position, state: CellState },
    Remove { pos: Position },
}

/// Keeps every notification in arrival order.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<CellEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn removals(&self) -> impl Iterator<Item = Position> + '_ {
        self.events.iter().filter_map(|e| match e {
            CellEvent::Remove { pos } => Some(*pos),
            CellEvent::Place { .. } => None,
        })
    }

    pub fn placements(&self) -> impl Iterator<Item = (Position, &CellState)> + '_ {
        self.events.iter().filter_map(|e| match e {
            CellEvent::Place { pos, state } => Some((*pos, state)),
            CellEvent::Remove { .. } => None,
        })
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl RenderSink for RecordingSink {
    fn on_place(&mut self, pos: Position, state: &CellState) {
        self.events.push(CellEvent::Place { pos, state: *state });
    }

    fn on_remove(&mut self, pos: Position) {
        self.events.push(CellEvent::Remove { pos });
    }
}

/// Running totals only; cheap enough to leave attached to a long headless run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TallySink {
    pub placed: u64,
    pub removed: u64,
}

impl RenderSink for TallySink {
    fn on_place(&mut self, _pos: Position, _state: &CellState) {
        self.placed += 1;
    }

    fn on_remove(&mut self, _pos: Position) {
        self.removed += 1;
    }
}
