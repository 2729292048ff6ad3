// Global configuration and constants

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

const DEFAULT_CONFIG_PATHS: [&str; 3] = ["config.yaml", "config.yml", "config.json"];

// Configuration struct for simulation parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // Grid/display
    pub viewport_width: usize,
    pub viewport_height: usize,
    pub tile_size: usize,

    // Growth
    pub expansion_rate: usize,
    pub initial_saturation: f32,
    pub reinforcement: f32,
    pub expansion_step_max: usize,
    pub max_expansion_hops: usize,

    // Decay
    pub decay_rate: f32,
    pub disappear_threshold: f32,

    // Food
    pub initial_food_count: usize,
    pub default_food_energy: f32,
    pub food_bite: f32,

    // Placement
    pub max_placement_attempts: usize,

    // Run control
    pub seed: Option<u64>,
    pub tick_interval_ms: u64,
    /// Upper bound on ticks run by one `/step` request.
    pub max_steps_per_request: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            viewport_width: 800,
            viewport_height: 600,
            tile_size: 10,
            expansion_rate: 1,
            initial_saturation: 1.0,
            reinforcement: 0.1,
            expansion_step_max: 8,
            max_expansion_hops: 64,
            decay_rate: 0.005,
            disappear_threshold: 0.001,
            initial_food_count: 8,
            default_food_energy: 5.0,
            food_bite: 1.0,
            max_placement_attempts: 256,
            seed: None,
            tick_interval_ms: 16, // ~60 ticks per second
            max_steps_per_request: 1000,
        }
    }
}

impl SimulationConfig {
    /// Config for a grid of exactly `width` x `height` tiles.
    pub fn with_grid(width: usize, height: usize) -> Self {
        Self {
            viewport_width: width,
            viewport_height: height,
            tile_size: 1,
            ..Self::default()
        }
    }

    /// Number of tiles along x; partial tiles at the viewport edge are dropped.
    pub fn grid_width(&self) -> usize {
        self.viewport_width / self.tile_size.max(1)
    }

    pub fn grid_height(&self) -> usize {
        self.viewport_height / self.tile_size.max(1)
    }

    /// Load a config file, choosing the format from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let config: Self = match ext.as_str() {
            "yaml" | "yml" => serde_yaml::from_str(&text)?,
            "json" => serde_json::from_str(&text)?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };
        config.validate()?;
        Ok(config)
    }

    /// Try `config.yaml`, `config.yml` and `config.json` in the working
    /// directory, falling back to defaults when none loads.
    pub fn from_default_paths() -> Self {
        for candidate in DEFAULT_CONFIG_PATHS {
            if !Path::new(candidate).exists() {
                continue;
            }
            match Self::from_file(candidate) {
                Ok(config) => {
                    tracing::info!(path = candidate, "loaded configuration");
                    return config;
                }
                Err(e) => tracing::warn!(path = candidate, error = %e, "ignoring config file"),
            }
        }
        Self::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn invalid(msg: impl Into<String>) -> Result<(), ConfigError> {
            Err(ConfigError::Invalid(msg.into()))
        }

        if self.viewport_width == 0 || self.viewport_height == 0 {
            return invalid("viewport dimensions must be positive");
        }
        if self.tile_size == 0 {
            return invalid("tile_size must be positive");
        }
        if self.grid_width() == 0 || self.grid_height() == 0 {
            return invalid(format!(
                "tile_size {} leaves no whole tile in a {}x{} viewport",
                self.tile_size, self.viewport_width, self.viewport_height
            ));
        }
        if self.expansion_rate == 0 {
            return invalid("expansion_rate must be at least 1");
        }
        if !(self.disappear_threshold > 0.0 && self.disappear_threshold < 1.0) {
            return invalid("disappear_threshold must lie in (0, 1)");
        }
        if !(0.0..=1.0).contains(&self.decay_rate) {
            return invalid("decay_rate must lie in [0, 1]");
        }
        if !(self.default_food_energy > 0.0) {
            return invalid("default_food_energy must be positive");
        }
        if !(self.food_bite > 0.0) {
            return invalid("food_bite must be positive");
        }
        if !(self.initial_saturation > self.disappear_threshold && self.initial_saturation <= 1.0) {
            return invalid("initial_saturation must lie in (disappear_threshold, 1]");
        }
        if !(0.0..=1.0).contains(&self.reinforcement) {
            return invalid("reinforcement must lie in [0, 1]");
        }
        if self.expansion_step_max == 0 {
            return invalid("expansion_step_max must be at least 1");
        }
        if self.max_expansion_hops == 0 || self.max_placement_attempts == 0 {
            return invalid("retry budgets must be at least 1");
        }
        if self.tick_interval_ms == 0 {
            return invalid("tick_interval_ms must be at least 1");
        }
        if self.max_steps_per_request == 0 {
            return invalid("max_steps_per_request must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_layout() {
        let config = SimulationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.grid_width(), 80);
        assert_eq!(config.grid_height(), 60);
    }

    #[test]
    fn partial_tiles_are_dropped() {
        let config = SimulationConfig {
            viewport_width: 805,
            viewport_height: 59,
            tile_size: 10,
            ..SimulationConfig::default()
        };
        assert_eq!(config.grid_width(), 80);
        assert_eq!(config.grid_height(), 5);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let bad = [
            SimulationConfig {
                tile_size: 0,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                tile_size: 1000,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                expansion_rate: 0,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                disappear_threshold: 1.0,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                decay_rate: 1.5,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                default_food_energy: 0.0,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                initial_saturation: 0.0005,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                max_steps_per_request: 0,
                ..SimulationConfig::default()
            },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid(_))),
                "{config:?} should be rejected"
            );
        }
    }

    #[test]
    fn zero_decay_is_allowed() {
        let config = SimulationConfig {
            decay_rate: 0.0,
            ..SimulationConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let config: SimulationConfig =
            serde_yaml::from_str("expansion_rate: 3\nseed: 42\n").unwrap();
        assert_eq!(config.expansion_rate, 3);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.tile_size, SimulationConfig::default().tile_size);
    }

    #[test]
    fn loads_json_file_by_extension() {
        let dir = std::env::temp_dir().join(format!("mouldrust-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("run.json");
        std::fs::write(&path, r#"{ "initial_food_count": 3, "decay_rate": 0.01 }"#).unwrap();

        let config = SimulationConfig::from_file(&path).unwrap();
        assert_eq!(config.initial_food_count, 3);
        assert_eq!(config.decay_rate, 0.01);

        let toml = dir.join("run.toml");
        std::fs::write(&toml, "").unwrap();
        assert!(matches!(
            SimulationConfig::from_file(&toml),
            Err(ConfigError::UnsupportedFormat(_))
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
