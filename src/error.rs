use thiserror::Error;

use crate::types::Position;

/// Failures raised by the grid, the pathfinder and the engine's driver API.
///
/// Only `OutOfBounds` signals a bug; the rest mean "skip this unit of work and
/// try again next tick".
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    #[error("position ({x}, {y}) is outside the {width}x{height} grid")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
    #[error("no path from {from} to {to}")]
    NoPathFound { from: Position, to: Position },
    #[error("cell {0} is already occupied")]
    NotEmpty(Position),
    #[error("frontier at {0} found no expansion target within its hop budget")]
    NoExpansionTarget(Position),
    #[error("no empty cell found after {attempts} attempts")]
    NoEmptyCell { attempts: usize },
}

impl SimError {
    /// Whether the error is part of normal play rather than a broken
    /// coordinate computation.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SimError::OutOfBounds { .. })
    }
}

/// Errors produced while loading or validating a `SimulationConfig`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported config format `{0}` (expected .yaml, .yml or .json)")]
    UnsupportedFormat(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}
