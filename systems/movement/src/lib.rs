#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-enemy movement controller: cached paths, re-planning, stuck
//! recovery, and strictly single-axis stepping.

use std::time::Duration;

use lane_defence_core::{
    CellCoord, Direction, GridConfig, MovementConfig, MovementPhase, ObstacleMap, WorldPoint,
};
use lane_defence_system_pathfinding::{Path, PathPlanner};
use tracing::{debug, warn};

/// Distance kept between a clamped entity and the cell boundary it stopped at.
const CLAMP_MARGIN: f32 = 0.01;

/// Physical properties of a moving entity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mover {
    /// Centre of the entity in world units.
    pub position: WorldPoint,
    /// Travel speed in world units per second.
    pub speed: f32,
    /// Edge length of the entity footprint.
    pub size: f32,
    /// Whether the entity ignores obstacles.
    pub can_fly: bool,
    /// Heading of the most recent movement in radians.
    pub facing: f32,
}

/// Axis changed by a committed movement step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Horizontal movement.
    Column,
    /// Vertical movement.
    Row,
}

/// Outcome of a single controller update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Phase of the controller after the update.
    pub phase: MovementPhase,
    /// Whether the planner ran during the update.
    pub replanned: bool,
    /// Blocked cell the entity was forced into, if the escape valve fired.
    pub forced: Option<CellCoord>,
    /// Axis moved along, if the entity moved.
    pub moved: Option<Axis>,
    /// Whether the step was clamped at an obstacle boundary.
    pub clamped: bool,
}

/// Movement state owned by a single entity.
#[derive(Clone, Debug, Default)]
pub struct MovementState {
    path: Path,
    path_index: usize,
    stuck_timer: Duration,
    plan_timer: Duration,
    no_path_streak: u32,
    last_sample: Option<WorldPoint>,
    phase: MovementPhase,
    forced_step: bool,
}

impl MovementState {
    /// Creates a state with no cached path, forcing a plan on first update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Index of the next waypoint within the cached path.
    #[must_use]
    pub fn path_index(&self) -> usize {
        self.path_index
    }

    /// Time accumulated without meaningful displacement.
    #[must_use]
    pub fn stuck_timer(&self) -> Duration {
        self.stuck_timer
    }

    /// Time since the last plan.
    #[must_use]
    pub fn plan_timer(&self) -> Duration {
        self.plan_timer
    }

    /// Consecutive re-plans that found no route to the goal column.
    #[must_use]
    pub fn no_path_streak(&self) -> u32 {
        self.no_path_streak
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> MovementPhase {
        self.phase
    }

    /// Reports whether the cached path has been fully consumed.
    #[must_use]
    pub fn path_exhausted(&self) -> bool {
        self.path_index >= self.path.len()
    }

    fn adopt(&mut self, path: Path, forced: bool) {
        self.path = path;
        self.path_index = 1.min(self.path.len());
        self.stuck_timer = Duration::ZERO;
        self.plan_timer = Duration::ZERO;
        self.forced_step = forced;
    }

    fn drop_path(&mut self) {
        self.path = Path::empty();
        self.path_index = 0;
        self.forced_step = false;
    }

    fn next_waypoint(&self) -> Option<CellCoord> {
        self.path.get(self.path_index)
    }
}

/// Drives [`MovementState`] values along planned routes.
///
/// One controller serves every entity; it owns the planner scratch buffers.
#[derive(Debug)]
pub struct MovementController {
    grid: GridConfig,
    config: MovementConfig,
    planner: PathPlanner,
}

impl MovementController {
    /// Creates a controller for the provided grid and tuning.
    #[must_use]
    pub fn new(grid: GridConfig, config: MovementConfig) -> Self {
        Self {
            grid,
            config,
            planner: PathPlanner::new(),
        }
    }

    /// Grid cell containing the provided point.
    #[must_use]
    pub fn cell_of(&self, position: WorldPoint) -> CellCoord {
        CellCoord::new(
            to_index(position.x, self.grid.cell_size),
            to_index(position.y, self.grid.cell_size),
        )
    }

    /// Centre of the provided cell in world units.
    #[must_use]
    pub fn cell_center(&self, cell: CellCoord) -> WorldPoint {
        let size = self.grid.cell_size;
        WorldPoint::new(
            (cell.column() as f32 + 0.5) * size,
            (cell.row() as f32 + 0.5) * size,
        )
    }

    /// Advances the entity by one tick.
    ///
    /// Each call moves along at most one axis. Finished entities are left
    /// untouched.
    pub fn update(
        &mut self,
        state: &mut MovementState,
        mover: &mut Mover,
        dt: Duration,
        obstacles: &ObstacleMap,
    ) -> StepReport {
        let mut report = StepReport {
            phase: state.phase,
            ..StepReport::default()
        };
        if state.phase == MovementPhase::Finished {
            return report;
        }

        self.sample_displacement(state, mover.position, dt);
        state.plan_timer = state.plan_timer.saturating_add(dt);

        let cell = self.cell_of(mover.position);
        let target_column = self.grid.bounds().last_column();

        if cell.column() >= target_column {
            state.drop_path();
            state.phase = MovementPhase::FollowingPath;
            // Aim past the line so the axis epsilon never stops short of it.
            let goal = WorldPoint::new(
                self.grid.finish_line() + self.config.axis_epsilon,
                mover.position.y,
            );
            let moved = self.commit_step(state, mover, cell, goal, dt, obstacles, &mut report);
            report.moved = moved;
        } else {
            if self.needs_plan(state) {
                report.replanned = true;
                self.replan(state, mover, cell, target_column, obstacles, &mut report);
            }
            let moved = self.follow_path(state, mover, cell, dt, obstacles, &mut report);
            report.moved = moved;
        }

        if mover.position.x + mover.size / 2.0 >= self.grid.finish_line() {
            state.phase = MovementPhase::Finished;
        }
        report.phase = state.phase;
        report
    }

    fn sample_displacement(&self, state: &mut MovementState, position: WorldPoint, dt: Duration) {
        let epsilon = self.config.stuck_epsilon;
        match state.last_sample {
            Some(sample) if sample.distance_squared(position) < epsilon * epsilon => {
                state.stuck_timer = state.stuck_timer.saturating_add(dt);
            }
            _ => state.stuck_timer = Duration::ZERO,
        }
        state.last_sample = Some(position);
    }

    fn needs_plan(&self, state: &MovementState) -> bool {
        state.path.is_empty()
            || state.path_exhausted()
            || state.plan_timer >= self.config.replan_interval()
            || state.stuck_timer >= self.config.stuck_threshold()
    }

    fn replan(
        &mut self,
        state: &mut MovementState,
        mover: &Mover,
        cell: CellCoord,
        target_column: u32,
        obstacles: &ObstacleMap,
        report: &mut StepReport,
    ) {
        state.phase = MovementPhase::Replanning;
        state.plan_timer = Duration::ZERO;

        let path = self
            .planner
            .find_path(cell, target_column, obstacles, mover.can_fly);
        if !path.is_trivial() {
            state.adopt(path, false);
            state.no_path_streak = 0;
            state.phase = MovementPhase::FollowingPath;
            return;
        }

        // Detours do not reset the streak, so oscillating between two
        // detour cells still ends in a forced move.
        state.phase = MovementPhase::StuckFallback;
        state.no_path_streak = state.no_path_streak.saturating_add(1);
        if state.no_path_streak >= self.config.forced_move_streak {
            if let Some(forced) = cell.step(Direction::East) {
                warn!(
                    ?cell,
                    ?forced,
                    streak = state.no_path_streak,
                    "forcing a move east regardless of obstacles"
                );
                state.adopt(Path::from_cells(vec![cell, forced]), true);
                state.no_path_streak = 0;
                report.forced = Some(forced);
                return;
            }
        }

        if let Some(detour) = self.local_detour(cell, obstacles, mover.can_fly) {
            debug!(?cell, ?detour, "no route found, taking local detour");
            state.adopt(Path::from_cells(vec![cell, detour]), false);
            return;
        }
        state.drop_path();
    }

    /// Single step right, then up, then down.
    fn local_detour(
        &self,
        cell: CellCoord,
        obstacles: &ObstacleMap,
        can_fly: bool,
    ) -> Option<CellCoord> {
        let bounds = obstacles.bounds();
        [Direction::East, Direction::North, Direction::South]
            .into_iter()
            .filter_map(|direction| cell.step(direction))
            .find(|candidate| {
                bounds.contains(*candidate) && (can_fly || obstacles.is_free(*candidate))
            })
    }

    fn follow_path(
        &self,
        state: &mut MovementState,
        mover: &mut Mover,
        cell: CellCoord,
        dt: Duration,
        obstacles: &ObstacleMap,
        report: &mut StepReport,
    ) -> Option<Axis> {
        let epsilon = self.config.axis_epsilon;
        while let Some(waypoint) = state.next_waypoint() {
            let goal = self.cell_center(waypoint);
            let dx = goal.x - mover.position.x;
            let dy = goal.y - mover.position.y;
            if dx.abs() <= epsilon && dy.abs() <= epsilon {
                state.path_index += 1;
                state.forced_step = false;
                continue;
            }
            return self.commit_step(state, mover, cell, goal, dt, obstacles, report);
        }
        None
    }

    /// Moves toward `goal` along one axis, refusing to enter blocked cells.
    #[allow(clippy::too_many_arguments)]
    fn commit_step(
        &self,
        state: &mut MovementState,
        mover: &mut Mover,
        cell: CellCoord,
        goal: WorldPoint,
        dt: Duration,
        obstacles: &ObstacleMap,
        report: &mut StepReport,
    ) -> Option<Axis> {
        let budget = mover.speed * dt.as_secs_f32();
        if budget <= 0.0 {
            return None;
        }

        let epsilon = self.config.axis_epsilon;
        let origin = mover.position;
        let dx = goal.x - origin.x;
        let dy = goal.y - origin.y;
        let (axis, mut destination) = if dx.abs() > epsilon {
            (
                Axis::Column,
                WorldPoint::new(origin.x + dx.signum() * dx.abs().min(budget), origin.y),
            )
        } else if dy.abs() > epsilon {
            (
                Axis::Row,
                WorldPoint::new(origin.x, origin.y + dy.signum() * dy.abs().min(budget)),
            )
        } else {
            return None;
        };

        let destination_cell = self.cell_of(destination);
        let blocked = destination_cell != cell
            && !mover.can_fly
            && !state.forced_step
            && obstacles.is_blocked(destination_cell);
        if blocked {
            destination = self.clamp_to_cell(cell, origin, destination, axis);
            state.drop_path();
            report.clamped = true;
            debug!(?cell, ?destination_cell, "step blocked by obstacle, clamping");
        }

        let moved_x = destination.x - origin.x;
        let moved_y = destination.y - origin.y;
        if moved_x == 0.0 && moved_y == 0.0 {
            return None;
        }
        mover.facing = moved_y.atan2(moved_x);
        mover.position = destination;
        Some(axis)
    }

    fn clamp_to_cell(
        &self,
        cell: CellCoord,
        origin: WorldPoint,
        destination: WorldPoint,
        axis: Axis,
    ) -> WorldPoint {
        let size = self.grid.cell_size;
        let low_x = cell.column() as f32 * size;
        let low_y = cell.row() as f32 * size;
        match axis {
            Axis::Column if destination.x > origin.x => {
                WorldPoint::new(low_x + size - CLAMP_MARGIN, origin.y)
            }
            Axis::Column => WorldPoint::new(low_x, origin.y),
            Axis::Row if destination.y > origin.y => {
                WorldPoint::new(origin.x, low_y + size - CLAMP_MARGIN)
            }
            Axis::Row => WorldPoint::new(origin.x, low_y),
        }
    }
}

fn to_index(coordinate: f32, cell_size: f32) -> u32 {
    let scaled = (coordinate / cell_size).floor();
    if scaled <= 0.0 {
        0
    } else if scaled >= u32::MAX as f32 {
        u32::MAX
    } else {
        scaled as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_defence_core::GridBounds;

    fn controller() -> MovementController {
        let grid = GridConfig {
            columns: 6,
            start_row: 0,
            end_row: 3,
            cell_size: 10.0,
        };
        MovementController::new(grid, MovementConfig::default())
    }

    #[test]
    fn cell_of_floors_and_clamps_negative_coordinates() {
        let controller = controller();
        assert_eq!(
            controller.cell_of(WorldPoint::new(15.0, 29.9)),
            CellCoord::new(1, 2)
        );
        assert_eq!(
            controller.cell_of(WorldPoint::new(-4.0, 0.0)),
            CellCoord::new(0, 0)
        );
    }

    #[test]
    fn cell_center_is_midpoint() {
        let controller = controller();
        assert_eq!(
            controller.cell_center(CellCoord::new(2, 1)),
            WorldPoint::new(25.0, 15.0)
        );
    }

    #[test]
    fn clamp_keeps_entity_inside_its_cell() {
        let controller = controller();
        let cell = CellCoord::new(2, 1);
        let origin = WorldPoint::new(25.0, 15.0);

        let east = controller.clamp_to_cell(cell, origin, WorldPoint::new(31.0, 15.0), Axis::Column);
        assert_eq!(controller.cell_of(east), cell);
        assert!(east.x > 29.9);

        let north = controller.clamp_to_cell(cell, origin, WorldPoint::new(25.0, 8.0), Axis::Row);
        assert_eq!(north, WorldPoint::new(25.0, 10.0));
        assert_eq!(controller.cell_of(north), cell);
    }

    #[test]
    fn detour_order_is_right_then_up_then_down() {
        let controller = controller();
        let bounds = GridBounds::new(6, 0, 3);
        let cell = CellCoord::new(2, 1);

        let open = ObstacleMap::new(bounds);
        assert_eq!(
            controller.local_detour(cell, &open, false),
            Some(CellCoord::new(3, 1))
        );

        let right_blocked = ObstacleMap::with_obstacles(bounds, [CellCoord::new(3, 1)]);
        assert_eq!(
            controller.local_detour(cell, &right_blocked, false),
            Some(CellCoord::new(2, 0))
        );

        let only_down =
            ObstacleMap::with_obstacles(bounds, [CellCoord::new(3, 1), CellCoord::new(2, 0)]);
        assert_eq!(
            controller.local_detour(cell, &only_down, false),
            Some(CellCoord::new(2, 2))
        );

        assert_eq!(
            controller.local_detour(CellCoord::new(2, 0), &right_blocked, false),
            Some(CellCoord::new(3, 0))
        );
    }

    #[test]
    fn new_state_requests_a_plan() {
        let controller = controller();
        let state = MovementState::new();
        assert!(controller.needs_plan(&state));
        assert!(state.path_exhausted());
    }
}
