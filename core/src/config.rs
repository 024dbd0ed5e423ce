//! Simulation configuration and its start-up validation.
//!
//! Every tuning knob is plain data so adapters can load it from a file.
//! Durations are stored as integer milliseconds and exposed as
//! [`Duration`] through accessors.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::GridBounds;

/// Aggregated configuration consumed when constructing a world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Battlefield grid layout.
    pub grid: GridConfig,
    /// Wave sizing, cadence, and difficulty scaling.
    pub waves: WaveConfig,
    /// Movement controller tuning.
    pub movement: MovementConfig,
    /// Target search cadence and lock duration.
    pub targeting: TargetingConfig,
    /// Upper clamp applied to every tick delta.
    pub max_tick_ms: u64,
    /// How long the wave banner stays visible.
    pub banner_ms: u64,
    /// Seed for the wave director's random stream.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            waves: WaveConfig::default(),
            movement: MovementConfig::default(),
            targeting: TargetingConfig::default(),
            max_tick_ms: 100,
            banner_ms: 2_000,
            seed: 0x5eed_1a4e_d3f3_4ce5,
        }
    }
}

impl SimulationConfig {
    /// Upper clamp applied to every tick delta.
    #[must_use]
    pub const fn max_tick(&self) -> Duration {
        Duration::from_millis(self.max_tick_ms)
    }

    /// How long the wave banner stays visible.
    #[must_use]
    pub const fn banner_duration(&self) -> Duration {
        Duration::from_millis(self.banner_ms)
    }

    /// Checks every configuration invariant the simulation relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;
        self.waves.validate()?;
        self.movement.validate()?;
        self.targeting.validate()?;
        if self.max_tick_ms == 0 {
            return Err(ConfigError::ZeroMaxTick);
        }
        // Waypoints closer than the epsilon count as reached without moving.
        if self.movement.axis_epsilon >= self.grid.cell_size / 2.0 {
            return Err(ConfigError::AxisEpsilonTooCoarse {
                axis_epsilon: self.movement.axis_epsilon,
                cell_size: self.grid.cell_size,
            });
        }
        Ok(())
    }
}

/// Battlefield grid layout.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Number of columns; enemies enter at column zero.
    pub columns: u32,
    /// First playable row.
    pub start_row: u32,
    /// Row one past the last playable row.
    pub end_row: u32,
    /// Edge length of a cell in world units.
    pub cell_size: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: 16,
            start_row: 0,
            end_row: 8,
            cell_size: 64.0,
        }
    }
}

impl GridConfig {
    /// Grid bounds described by the configuration.
    #[must_use]
    pub const fn bounds(&self) -> GridBounds {
        GridBounds::new(self.columns, self.start_row, self.end_row)
    }

    /// X coordinate enemies must reach with their right edge to breach.
    #[must_use]
    pub fn finish_line(&self) -> f32 {
        self.columns as f32 * self.cell_size
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.columns < 2 {
            return Err(ConfigError::TooFewColumns {
                columns: self.columns,
            });
        }
        if self.end_row <= self.start_row {
            return Err(ConfigError::EmptyRowRange {
                start_row: self.start_row,
                end_row: self.end_row,
            });
        }
        if !(self.cell_size.is_finite() && self.cell_size > 0.0) {
            return Err(ConfigError::InvalidCellSize(self.cell_size));
        }
        Ok(())
    }
}

/// Wave sizing, cadence, and difficulty scaling.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveConfig {
    /// Number of waves before victory; zero runs forever.
    pub total_waves: u32,
    /// Enemies spawned by the first wave.
    pub base_enemies: u32,
    /// Additional enemies per wave level.
    pub enemies_per_wave: u32,
    /// Linear hit point bonus added per wave level.
    pub hp_bonus_per_wave: f32,
    /// Spawn interval of the first wave.
    pub base_interval_ms: u64,
    /// Geometric decay applied to the spawn interval per level.
    pub interval_reduction: f64,
    /// Floor the spawn interval never drops below.
    pub min_interval_ms: u64,
}

impl Default for WaveConfig {
    fn default() -> Self {
        Self {
            total_waves: 0,
            base_enemies: 10,
            enemies_per_wave: 2,
            hp_bonus_per_wave: 0.15,
            base_interval_ms: 2_000,
            interval_reduction: 0.97,
            min_interval_ms: 800,
        }
    }
}

impl WaveConfig {
    /// Spawn interval of the first wave.
    #[must_use]
    pub const fn base_interval(&self) -> Duration {
        Duration::from_millis(self.base_interval_ms)
    }

    /// Floor the spawn interval never drops below.
    #[must_use]
    pub const fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.base_enemies == 0 {
            return Err(ConfigError::EmptyWave);
        }
        if !(self.hp_bonus_per_wave.is_finite() && self.hp_bonus_per_wave >= 0.0) {
            return Err(ConfigError::InvalidHpBonus(self.hp_bonus_per_wave));
        }
        if !(self.interval_reduction > 0.0 && self.interval_reduction <= 1.0) {
            return Err(ConfigError::InvalidReduction(self.interval_reduction));
        }
        if self.min_interval_ms == 0 {
            return Err(ConfigError::ZeroMinInterval);
        }
        if self.base_interval_ms < self.min_interval_ms {
            return Err(ConfigError::IntervalBelowFloor {
                base_ms: self.base_interval_ms,
                min_ms: self.min_interval_ms,
            });
        }
        Ok(())
    }
}

/// Movement controller tuning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Cached paths are refreshed at least this often.
    pub replan_interval_ms: u64,
    /// Time without displacement after which a re-plan is forced.
    pub stuck_threshold_ms: u64,
    /// Displacement below which a sample counts as stationary.
    pub stuck_epsilon: f32,
    /// Axis delta below which the axis counts as resolved.
    pub axis_epsilon: f32,
    /// Consecutive planning failures before forcing a move.
    pub forced_move_streak: u32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            replan_interval_ms: 2_000,
            stuck_threshold_ms: 500,
            stuck_epsilon: 0.5,
            axis_epsilon: 1.0,
            forced_move_streak: 10,
        }
    }
}

impl MovementConfig {
    /// Cached paths are refreshed at least this often.
    #[must_use]
    pub const fn replan_interval(&self) -> Duration {
        Duration::from_millis(self.replan_interval_ms)
    }

    /// Time without displacement after which a re-plan is forced.
    #[must_use]
    pub const fn stuck_threshold(&self) -> Duration {
        Duration::from_millis(self.stuck_threshold_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.replan_interval_ms == 0 {
            return Err(ConfigError::ZeroReplanInterval);
        }
        if self.forced_move_streak == 0 {
            return Err(ConfigError::ZeroForcedStreak);
        }
        if !(self.stuck_epsilon.is_finite() && self.stuck_epsilon > 0.0) {
            return Err(ConfigError::InvalidEpsilon(self.stuck_epsilon));
        }
        if !(self.axis_epsilon.is_finite() && self.axis_epsilon >= 0.0) {
            return Err(ConfigError::InvalidEpsilon(self.axis_epsilon));
        }
        Ok(())
    }
}

/// Target search cadence and lock duration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetingConfig {
    /// How often locks are re-validated and new targets searched for.
    pub search_interval_ms: u64,
    /// Grace period a lock survives after its target leaves range.
    pub lock_duration_ms: u64,
}

impl Default for TargetingConfig {
    fn default() -> Self {
        Self {
            search_interval_ms: 250,
            lock_duration_ms: 1_000,
        }
    }
}

impl TargetingConfig {
    /// How often locks are re-validated and new targets searched for.
    #[must_use]
    pub const fn search_interval(&self) -> Duration {
        Duration::from_millis(self.search_interval_ms)
    }

    /// Grace period a lock survives after its target leaves range.
    #[must_use]
    pub const fn lock_duration(&self) -> Duration {
        Duration::from_millis(self.lock_duration_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.search_interval_ms == 0 {
            return Err(ConfigError::ZeroSearchInterval);
        }
        Ok(())
    }
}

/// Reasons a configuration is rejected at start-up.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// Enemies need at least an entry and a goal column.
    #[error("grid needs at least two columns, got {columns}")]
    TooFewColumns {
        /// Configured column count.
        columns: u32,
    },
    /// The playable row range is empty.
    #[error("row range {start_row}..{end_row} is empty")]
    EmptyRowRange {
        /// Configured first row.
        start_row: u32,
        /// Configured end row.
        end_row: u32,
    },
    /// Cell size must be positive and finite.
    #[error("cell size must be positive and finite, got {0}")]
    InvalidCellSize(f32),
    /// The first wave must spawn something.
    #[error("the first wave must spawn at least one enemy")]
    EmptyWave,
    /// Hit point bonus must be non-negative and finite.
    #[error("hp bonus per wave must be non-negative and finite, got {0}")]
    InvalidHpBonus(f32),
    /// Interval reduction must lie in `(0, 1]`.
    #[error("spawn interval reduction must lie in (0, 1], got {0}")]
    InvalidReduction(f64),
    /// The spawn interval floor must be positive.
    #[error("minimum spawn interval must be positive")]
    ZeroMinInterval,
    /// The first wave's interval sits below the floor.
    #[error("base spawn interval {base_ms} ms is below the {min_ms} ms floor")]
    IntervalBelowFloor {
        /// Configured base interval.
        base_ms: u64,
        /// Configured floor.
        min_ms: u64,
    },
    /// Re-plan interval must be positive.
    #[error("replan interval must be positive")]
    ZeroReplanInterval,
    /// The forced-move escape valve needs a positive streak.
    #[error("forced move streak must be at least one")]
    ZeroForcedStreak,
    /// Movement epsilons must be finite; the stuck epsilon must also be
    /// positive and the axis epsilon non-negative.
    #[error("movement epsilon out of range, got {0}")]
    InvalidEpsilon(f32),
    /// The axis epsilon must stay below half a cell.
    #[error("axis epsilon {axis_epsilon} must be below half the {cell_size} cell size")]
    AxisEpsilonTooCoarse {
        /// Configured axis epsilon.
        axis_epsilon: f32,
        /// Configured cell size.
        cell_size: f32,
    },
    /// Target search interval must be positive.
    #[error("target search interval must be positive")]
    ZeroSearchInterval,
    /// Tick clamp must be positive.
    #[error("maximum tick length must be positive")]
    ZeroMaxTick,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configuration_is_valid() {
        assert_eq!(SimulationConfig::default().validate(), Ok(()));
    }

    #[test]
    fn single_column_grid_is_rejected() {
        let mut config = SimulationConfig::default();
        config.grid.columns = 1;
        assert_eq!(
            config.validate(),
            Err(ConfigError::TooFewColumns { columns: 1 })
        );
    }

    #[test]
    fn inverted_rows_are_rejected() {
        let mut config = SimulationConfig::default();
        config.grid.start_row = 4;
        config.grid.end_row = 4;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyRowRange { .. })
        ));
    }

    #[test]
    fn interval_floor_must_not_exceed_base() {
        let mut config = SimulationConfig::default();
        config.waves.min_interval_ms = 3_000;
        assert_eq!(
            config.validate(),
            Err(ConfigError::IntervalBelowFloor {
                base_ms: 2_000,
                min_ms: 3_000
            })
        );
    }

    #[test]
    fn reduction_outside_unit_interval_is_rejected() {
        let mut config = SimulationConfig::default();
        config.waves.interval_reduction = 1.5;
        assert_eq!(config.validate(), Err(ConfigError::InvalidReduction(1.5)));
    }

    #[test]
    fn zero_tick_clamp_is_rejected() {
        let config = SimulationConfig {
            max_tick_ms: 0,
            ..SimulationConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroMaxTick));
    }

    #[test]
    fn axis_epsilon_must_stay_below_half_a_cell() {
        let mut config = SimulationConfig::default();
        config.grid.cell_size = 1.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::AxisEpsilonTooCoarse {
                axis_epsilon: 1.0,
                cell_size: 1.0
            })
        );

        config.grid.cell_size = 2.0;
        assert!(config.validate().is_err());

        config.movement.axis_epsilon = 0.25;
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn zero_stuck_epsilon_is_rejected() {
        let mut config = SimulationConfig::default();
        config.movement.stuck_epsilon = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidEpsilon(0.0)));
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let source = r#"
            seed = 7

            [grid]
            columns = 10
            end_row = 3

            [waves]
            total_waves = 5
        "#;
        let config: SimulationConfig = toml::from_str(source).expect("valid toml");

        assert_eq!(config.seed, 7);
        assert_eq!(config.grid.columns, 10);
        assert_eq!(config.grid.end_row, 3);
        assert_eq!(config.grid.cell_size, 64.0);
        assert_eq!(config.waves.total_waves, 5);
        assert_eq!(config.waves.base_interval(), Duration::from_secs(2));
        assert_eq!(config.max_tick(), Duration::from_millis(100));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn finish_line_spans_every_column() {
        let grid = GridConfig {
            columns: 10,
            cell_size: 32.0,
            ..GridConfig::default()
        };
        assert_eq!(grid.finish_line(), 320.0);
        assert_eq!(grid.bounds().last_column(), 9);
    }
}
