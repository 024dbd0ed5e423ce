#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Lane Defence simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then reports [`Event`] values describing what
//! happened during the tick. Systems only ever see immutable views such as
//! [`ObstacleMap`] and [`WeaponSnapshot`].

mod config;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use config::{
    ConfigError, GridConfig, MovementConfig, SimulationConfig, TargetingConfig, WaveConfig,
};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    ///
    /// The world clamps the delta to the configured maximum tick length.
    Tick {
        /// Duration of wall time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Replaces the obstacle map used for pathfinding and collision.
    SetObstacleMap {
        /// Obstacle layout that becomes authoritative.
        obstacles: ObstacleMap,
    },
    /// Clears every enemy and restarts the wave sequence from the first wave.
    Reset,
    /// Suspends or resumes tick advancement.
    SetPaused {
        /// Whether ticks should be ignored.
        paused: bool,
    },
    /// Replaces the read-only weapon snapshots used as enemy targets.
    SyncWeapons {
        /// Latest state of every weapon on the battlefield.
        weapons: Vec<WeaponSnapshot>,
    },
    /// Applies weapon damage to an enemy.
    DamageEnemy {
        /// Handle of the enemy receiving the damage.
        enemy: EnemyId,
        /// Hit points removed from the enemy.
        amount: u32,
    },
}

/// Events reported by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Clamped duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Announces that a new wave began spawning.
    WaveStarted {
        /// One-based wave level.
        level: u32,
        /// Number of enemies the wave will spawn.
        cap: u32,
    },
    /// Announces that every enemy of a wave was spawned and is gone.
    WaveCleared {
        /// Level of the wave that was cleared.
        level: u32,
    },
    /// Announces that the configured number of waves was cleared.
    AllWavesCleared,
    /// Confirms that an enemy entered the battlefield.
    EnemySpawned {
        /// Handle allocated for the enemy.
        enemy: EnemyId,
        /// Kind of enemy that spawned.
        kind: EnemyKind,
        /// Cell the enemy occupies after spawning.
        cell: CellCoord,
        /// Hit points assigned after wave scaling.
        health: u32,
    },
    /// Reports that an enemy was pushed one cell east, ignoring obstacles,
    /// after repeatedly failing to find a path. The cell may be free.
    EnemyForcedMove {
        /// Enemy that used the escape valve.
        enemy: EnemyId,
        /// Cell the enemy was pushed into.
        cell: CellCoord,
    },
    /// Reports that an enemy fired at a weapon.
    EnemyFired {
        /// Enemy that fired.
        enemy: EnemyId,
        /// Weapon receiving the damage.
        weapon: WeaponId,
        /// Damage dealt by the shot.
        damage: u32,
    },
    /// Confirms that an enemy was destroyed by weapon fire.
    EnemyDestroyed {
        /// Handle of the destroyed enemy.
        enemy: EnemyId,
        /// Kind of the destroyed enemy.
        kind: EnemyKind,
        /// Reward granted for the kill.
        reward: u32,
    },
    /// Reports that an enemy crossed the right boundary of the battlefield.
    EnemyBreached {
        /// Handle of the enemy that reached the base line.
        enemy: EnemyId,
    },
    /// Announces that the session ended because the base line was breached.
    GameOver,
    /// Confirms a pause state change.
    PauseChanged {
        /// Whether the simulation is now paused.
        paused: bool,
    },
    /// Confirms that a new obstacle map became authoritative.
    ObstaclesChanged,
    /// Confirms that enemies and wave state were cleared.
    SimulationReset,
}

/// Cardinal directions on the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// Reports whether `offset`, measured from an origin, lies in the closed
    /// half-plane this direction faces.
    #[must_use]
    pub fn faces(self, dx: f32, dy: f32) -> bool {
        match self {
            Self::North => dy <= 0.0,
            Self::East => dx >= 0.0,
            Self::South => dy >= 0.0,
            Self::West => dx <= 0.0,
        }
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Returns the adjacent cell in the provided direction, if it is
    /// representable.
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<CellCoord> {
        match direction {
            Direction::North => self.row.checked_sub(1).map(|row| Self::new(self.column, row)),
            Direction::East => self
                .column
                .checked_add(1)
                .map(|column| Self::new(column, self.row)),
            Direction::South => self.row.checked_add(1).map(|row| Self::new(self.column, row)),
            Direction::West => self
                .column
                .checked_sub(1)
                .map(|column| Self::new(column, self.row)),
        }
    }

    /// Returns the direction leading from `self` to an orthogonally adjacent
    /// cell, or `None` when the cells are not neighbours.
    #[must_use]
    pub fn direction_to(self, to: CellCoord) -> Option<Direction> {
        let column_diff = self.column.abs_diff(to.column);
        let row_diff = self.row.abs_diff(to.row);
        if column_diff + row_diff != 1 {
            return None;
        }

        if column_diff == 1 {
            if to.column > self.column {
                Some(Direction::East)
            } else {
                Some(Direction::West)
            }
        } else if to.row > self.row {
            Some(Direction::South)
        } else {
            Some(Direction::North)
        }
    }
}

/// Rectangular extent of the battlefield grid.
///
/// Columns span `[0, columns)` and rows span `[start_row, end_row)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridBounds {
    columns: u32,
    start_row: u32,
    end_row: u32,
}

impl GridBounds {
    /// Creates new grid bounds.
    #[must_use]
    pub const fn new(columns: u32, start_row: u32, end_row: u32) -> Self {
        Self {
            columns,
            start_row,
            end_row,
        }
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// First row contained in the grid.
    #[must_use]
    pub const fn start_row(&self) -> u32 {
        self.start_row
    }

    /// Row one past the last row contained in the grid.
    #[must_use]
    pub const fn end_row(&self) -> u32 {
        self.end_row
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.end_row.saturating_sub(self.start_row)
    }

    /// Rightmost column, which enemies path toward.
    #[must_use]
    pub const fn last_column(&self) -> u32 {
        self.columns.saturating_sub(1)
    }

    /// Total number of cells covered by the bounds.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        let count = u64::from(self.columns) * u64::from(self.rows());
        usize::try_from(count).unwrap_or(0)
    }

    /// Reports whether the row lies inside the bounds.
    #[must_use]
    pub const fn contains_row(&self, row: u32) -> bool {
        row >= self.start_row && row < self.end_row
    }

    /// Reports whether the cell lies inside the bounds.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.columns && self.contains_row(cell.row())
    }

    /// Row-major dense index of the cell, if it lies inside the bounds.
    #[must_use]
    pub fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let row = usize::try_from(cell.row() - self.start_row).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.columns).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }

    /// Inverse of [`GridBounds::index`].
    #[must_use]
    pub fn cell_at(&self, index: usize) -> Option<CellCoord> {
        if index >= self.cell_count() {
            return None;
        }
        let width = usize::try_from(self.columns).ok()?;
        let column = u32::try_from(index % width).ok()?;
        let row = u32::try_from(index / width).ok()?;
        Some(CellCoord::new(column, row + self.start_row))
    }

    /// Iterator over every row index contained in the bounds.
    pub fn row_range(&self) -> std::ops::Range<u32> {
        self.start_row..self.end_row
    }
}

/// Dense boolean occupancy over the battlefield grid.
///
/// Cells outside the bounds report as unblocked; callers that need to keep
/// entities on the grid check [`GridBounds::contains`] separately.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObstacleMap {
    bounds: GridBounds,
    cells: Vec<bool>,
}

impl ObstacleMap {
    /// Creates an obstacle map with every cell free.
    #[must_use]
    pub fn new(bounds: GridBounds) -> Self {
        Self {
            bounds,
            cells: vec![false; bounds.cell_count()],
        }
    }

    /// Creates an obstacle map with the provided cells blocked.
    ///
    /// Cells outside the bounds are ignored.
    #[must_use]
    pub fn with_obstacles<I>(bounds: GridBounds, obstacles: I) -> Self
    where
        I: IntoIterator<Item = CellCoord>,
    {
        let mut map = Self::new(bounds);
        for cell in obstacles {
            let _ = map.block(cell);
        }
        map
    }

    /// Extent covered by the map.
    #[must_use]
    pub const fn bounds(&self) -> GridBounds {
        self.bounds
    }

    /// Marks the cell as blocked. Returns `false` when the cell lies outside
    /// the bounds.
    pub fn block(&mut self, cell: CellCoord) -> bool {
        match self.bounds.index(cell) {
            Some(index) => {
                self.cells[index] = true;
                true
            }
            None => false,
        }
    }

    /// Reports whether the cell holds an obstacle.
    #[must_use]
    pub fn is_blocked(&self, cell: CellCoord) -> bool {
        self.bounds
            .index(cell)
            .and_then(|index| self.cells.get(index).copied())
            .unwrap_or(false)
    }

    /// Reports whether the cell is free of obstacles.
    #[must_use]
    pub fn is_free(&self, cell: CellCoord) -> bool {
        !self.is_blocked(cell)
    }

    /// Iterator over every blocked cell in row-major order.
    pub fn blocked_cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, blocked)| **blocked)
            .filter_map(|(index, _)| self.bounds.cell_at(index))
    }

    /// Number of blocked cells.
    #[must_use]
    pub fn obstacle_count(&self) -> usize {
        self.cells.iter().filter(|blocked| **blocked).count()
    }
}

/// Continuous battlefield position measured in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    /// Horizontal coordinate; grows toward the base line.
    pub x: f32,
    /// Vertical coordinate; grows with the row index.
    pub y: f32,
}

impl WorldPoint {
    /// Creates a new point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    #[must_use]
    pub fn distance_squared(self, other: WorldPoint) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }
}

/// Handle to a live enemy: a slot index plus the slot's generation.
///
/// A handle whose generation no longer matches its slot never resolves, so
/// target locks held across a destroy are invalidated rather than dangling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnemyId {
    index: u32,
    generation: u32,
}

impl EnemyId {
    /// Creates a new enemy handle.
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index within the live-enemy table.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when the handle was issued.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

/// Unique identifier assigned to a weapon by the weapon subsystem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeaponId(u32);

impl WeaponId {
    /// Creates a new weapon identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Read-only weapon state consumed as an enemy targeting candidate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeaponSnapshot {
    /// Identifier of the weapon.
    pub id: WeaponId,
    /// Centre of the weapon in world units.
    pub position: WorldPoint,
    /// Whether the weapon has already been destroyed.
    pub destroyed: bool,
    /// Edge length of the weapon footprint in world units.
    pub size: f32,
}

/// Closed set of enemy variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Balanced armoured walker.
    Tank,
    /// Fragile runner.
    Fast,
    /// Slow, durable, long-ranged.
    Heavy,
    /// Ignores obstacles entirely.
    Flying,
    /// Short-ranged heavy hitter that only attacks what lies ahead.
    Bomber,
}

impl EnemyKind {
    /// Every enemy kind in stat-table order.
    pub const ALL: [EnemyKind; 5] = [
        Self::Tank,
        Self::Fast,
        Self::Heavy,
        Self::Flying,
        Self::Bomber,
    ];

    /// Base statistics of the kind before wave scaling.
    #[must_use]
    pub const fn stats(self) -> EnemyStats {
        match self {
            Self::Tank => EnemyStats {
                health: 100,
                damage: 10,
                fire_interval_ms: 1_500,
                move_speed: 40.0,
                attack_range: 150.0,
                reward: 20,
                spawn_weight: 30.0,
                can_fly: false,
                size: 40.0,
                target_filter: None,
            },
            Self::Fast => EnemyStats {
                health: 50,
                damage: 5,
                fire_interval_ms: 800,
                move_speed: 80.0,
                attack_range: 100.0,
                reward: 15,
                spawn_weight: 30.0,
                can_fly: false,
                size: 28.0,
                target_filter: None,
            },
            Self::Heavy => EnemyStats {
                health: 200,
                damage: 20,
                fire_interval_ms: 2_000,
                move_speed: 25.0,
                attack_range: 200.0,
                reward: 30,
                spawn_weight: 20.0,
                can_fly: false,
                size: 48.0,
                target_filter: None,
            },
            Self::Flying => EnemyStats {
                health: 60,
                damage: 8,
                fire_interval_ms: 1_200,
                move_speed: 60.0,
                attack_range: 120.0,
                reward: 25,
                spawn_weight: 10.0,
                can_fly: true,
                size: 32.0,
                target_filter: None,
            },
            Self::Bomber => EnemyStats {
                health: 80,
                damage: 30,
                fire_interval_ms: 2_500,
                move_speed: 35.0,
                attack_range: 80.0,
                reward: 30,
                spawn_weight: 10.0,
                can_fly: false,
                size: 36.0,
                target_filter: Some(Direction::East),
            },
        }
    }
}

/// Per-kind combat and movement statistics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyStats {
    /// Hit points at wave one.
    pub health: u32,
    /// Damage dealt per shot.
    pub damage: u32,
    /// Minimum time between shots in milliseconds.
    pub fire_interval_ms: u64,
    /// Travel speed in world units per second.
    pub move_speed: f32,
    /// Attack reach in world units.
    pub attack_range: f32,
    /// Reward granted when the enemy is destroyed.
    pub reward: u32,
    /// Relative likelihood of the kind being drawn into a wave.
    pub spawn_weight: f32,
    /// Whether the kind ignores obstacles.
    pub can_fly: bool,
    /// Edge length of the enemy footprint in world units.
    pub size: f32,
    /// Half-plane targets must lie in, if the kind has a facing cone.
    pub target_filter: Option<Direction>,
}

impl EnemyStats {
    /// Minimum time between shots.
    #[must_use]
    pub const fn fire_interval(&self) -> Duration {
        Duration::from_millis(self.fire_interval_ms)
    }

    /// Hit points after applying a linear wave bonus.
    ///
    /// The result never drops below one so that a freshly spawned enemy is
    /// always alive.
    #[must_use]
    pub fn scaled_health(&self, hp_bonus: f32) -> u32 {
        let scaled = (self.health as f32 * (1.0 + hp_bonus.max(0.0))).round();
        if scaled >= u32::MAX as f32 {
            return u32::MAX;
        }
        (scaled as u32).max(1)
    }
}

/// Observable phase of an enemy's movement controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementPhase {
    /// Consuming a cached path.
    #[default]
    FollowingPath,
    /// Planning a new path this update.
    Replanning,
    /// Using a local detour because no path could be found.
    StuckFallback,
    /// Crossed the right boundary of the battlefield.
    Finished,
}

/// Immutable representation of a single enemy used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemySnapshot {
    /// Handle of the enemy.
    pub id: EnemyId,
    /// Kind of the enemy.
    pub kind: EnemyKind,
    /// Centre of the enemy in world units.
    pub position: WorldPoint,
    /// Grid cell containing the enemy centre.
    pub cell: CellCoord,
    /// Remaining hit points.
    pub health: u32,
    /// Hit points at spawn.
    pub max_health: u32,
    /// Heading of the most recent movement in radians.
    pub facing: f32,
    /// Edge length of the enemy footprint in world units.
    pub size: f32,
    /// Current movement phase.
    pub phase: MovementPhase,
    /// Weapon the enemy is locked onto, if any.
    pub target: Option<WeaponId>,
}

/// Read-only snapshot describing all live enemies.
#[derive(Clone, Debug, Default)]
pub struct EnemyView {
    snapshots: Vec<EnemySnapshot>,
}

impl EnemyView {
    /// Creates a new enemy view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<EnemySnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemySnapshot> {
        self.snapshots.iter()
    }

    /// Number of enemies captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<EnemySnapshot> {
        self.snapshots
    }
}

/// Phase of the wave director's state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WavePhase {
    /// Enemies of the current wave are still being emitted.
    #[default]
    Spawning,
    /// Every enemy was emitted; waiting for the battlefield to clear.
    AwaitingWaveEnd,
    /// The configured number of waves was cleared.
    Victory,
}

/// Read-only wave progress.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WaveStatus {
    /// One-based level of the current wave.
    pub level: u32,
    /// Enemies emitted so far in the current wave.
    pub spawned: u32,
    /// Enemies the current wave will emit.
    pub cap: u32,
    /// Linear hit point bonus applied to this wave.
    pub hp_bonus: f32,
    /// Time between spawns in this wave.
    pub spawn_interval: Duration,
    /// Current phase of the director.
    pub phase: WavePhase,
}

/// Transient banner announcing a new wave.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WaveBanner {
    /// Level announced by the banner.
    pub level: u32,
    /// Display time left.
    pub remaining: Duration,
}
