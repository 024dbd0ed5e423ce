use std::time::Duration;

use lane_defence_core::{
    CellCoord, GridBounds, GridConfig, MovementConfig, MovementPhase, ObstacleMap,
    SimulationConfig, WorldPoint,
};
use lane_defence_system_movement::{Axis, MovementController, MovementState, Mover, StepReport};

const TICK: Duration = Duration::from_millis(100);

fn grid(columns: u32, rows: u32) -> GridConfig {
    GridConfig {
        columns,
        start_row: 0,
        end_row: rows,
        cell_size: 10.0,
    }
}

fn mover(x: f32, y: f32, speed: f32, can_fly: bool) -> Mover {
    Mover {
        position: WorldPoint::new(x, y),
        speed,
        size: 4.0,
        can_fly,
        facing: 0.0,
    }
}

/// Runs the controller until the mover finishes, returning every report.
fn run_to_finish(
    controller: &mut MovementController,
    state: &mut MovementState,
    mover: &mut Mover,
    obstacles: &ObstacleMap,
    max_updates: usize,
) -> Vec<StepReport> {
    let mut reports = Vec::new();
    for _ in 0..max_updates {
        let before = mover.position;
        let report = controller.update(state, mover, TICK, obstacles);
        let after = mover.position;

        assert!(
            before.x == after.x || before.y == after.y,
            "moved along both axes: {before:?} -> {after:?}"
        );
        assert!(state.path_index() <= state.path().len());
        reports.push(report);
        if report.phase == MovementPhase::Finished {
            return reports;
        }
    }
    panic!("mover did not finish within {max_updates} updates: {mover:?}");
}

#[test]
fn open_lane_walks_straight_to_the_finish_line() {
    let grid = grid(6, 3);
    let obstacles = ObstacleMap::new(grid.bounds());
    let mut controller = MovementController::new(grid, MovementConfig::default());
    let mut state = MovementState::new();
    let mut mover = mover(5.0, 15.0, 40.0, false);

    let reports = run_to_finish(&mut controller, &mut state, &mut mover, &obstacles, 500);

    assert_eq!(mover.position.y, 15.0);
    assert!(mover.position.x + mover.size / 2.0 >= grid.finish_line());
    assert!(reports
        .iter()
        .filter_map(|report| report.moved)
        .all(|axis| axis == Axis::Column));
    assert_eq!(state.phase(), MovementPhase::Finished);
}

#[test]
fn unit_cells_still_reach_the_finish_line() {
    let grid = GridConfig {
        cell_size: 1.0,
        ..grid(6, 3)
    };
    let config = MovementConfig {
        axis_epsilon: 0.25,
        stuck_epsilon: 0.05,
        ..MovementConfig::default()
    };
    let simulation = SimulationConfig {
        grid,
        movement: config,
        ..SimulationConfig::default()
    };
    assert_eq!(simulation.validate(), Ok(()));

    let obstacles = ObstacleMap::new(grid.bounds());
    let mut controller = MovementController::new(grid, config);
    let mut state = MovementState::new();
    let mut mover = Mover {
        size: 0.5,
        ..mover(0.5, 1.5, 2.0, false)
    };

    let reports = run_to_finish(&mut controller, &mut state, &mut mover, &obstacles, 2_000);

    assert_eq!(mover.position.y, 1.5);
    assert!(reports.iter().all(|report| report.forced.is_none()));
    assert_eq!(state.phase(), MovementPhase::Finished);
}

#[test]
fn small_movers_are_not_stopped_short_of_the_line() {
    let grid = grid(6, 3);
    let config = MovementConfig {
        axis_epsilon: 4.0,
        ..MovementConfig::default()
    };
    let obstacles = ObstacleMap::new(grid.bounds());
    let mut controller = MovementController::new(grid, config);
    let mut state = MovementState::new();
    let mut mover = Mover {
        size: 1.0,
        ..mover(55.0, 15.0, 40.0, false)
    };

    let _ = run_to_finish(&mut controller, &mut state, &mut mover, &obstacles, 100);

    assert!(mover.position.x + mover.size / 2.0 >= grid.finish_line());
}

#[test]
fn detour_never_enters_blocked_cells() {
    let grid = grid(10, 3);
    let obstacle = CellCoord::new(3, 1);
    let obstacles = ObstacleMap::with_obstacles(grid.bounds(), [obstacle]);
    let mut controller = MovementController::new(grid, MovementConfig::default());
    let mut state = MovementState::new();
    let mut mover = mover(5.0, 15.0, 40.0, false);

    for _ in 0..1_000 {
        let report = controller.update(&mut state, &mut mover, TICK, &obstacles);
        assert_ne!(controller.cell_of(mover.position), obstacle);
        assert!(!report.clamped);
        if report.phase == MovementPhase::Finished {
            return;
        }
    }
    panic!("mover did not finish: {mover:?}");
}

#[test]
fn repeated_planning_failures_force_a_move_east() {
    // Column 3 is a solid wall and the cells above and below the mover are
    // blocked, so neither the planner nor a local detour can help.
    let grid = grid(6, 3);
    let mut blocked: Vec<CellCoord> = (0..3).map(|row| CellCoord::new(3, row)).collect();
    blocked.push(CellCoord::new(2, 0));
    blocked.push(CellCoord::new(2, 2));
    let obstacles = ObstacleMap::with_obstacles(grid.bounds(), blocked);
    let config = MovementConfig::default();
    let mut controller = MovementController::new(grid, config);
    let mut state = MovementState::new();
    let mut mover = mover(25.0, 15.0, 100.0, false);

    for attempt in 1..config.forced_move_streak {
        let report = controller.update(&mut state, &mut mover, TICK, &obstacles);
        assert!(report.replanned);
        assert_eq!(report.forced, None);
        assert_eq!(report.moved, None);
        assert_eq!(report.phase, MovementPhase::StuckFallback);
        assert_eq!(state.no_path_streak(), attempt);
        assert_eq!(mover.position, WorldPoint::new(25.0, 15.0));
    }

    let report = controller.update(&mut state, &mut mover, TICK, &obstacles);
    assert_eq!(report.forced, Some(CellCoord::new(3, 1)));
    assert_eq!(report.moved, Some(Axis::Column));
    assert_eq!(state.no_path_streak(), 0);
    assert_eq!(controller.cell_of(mover.position), CellCoord::new(3, 1));

    let reports = run_to_finish(&mut controller, &mut state, &mut mover, &obstacles, 200);
    assert!(reports.iter().all(|report| report.forced.is_none()));
}

#[test]
fn stale_path_is_clamped_at_a_new_obstacle() {
    let grid = grid(6, 3);
    let open = ObstacleMap::new(grid.bounds());
    let mut controller = MovementController::new(grid, MovementConfig::default());
    let mut state = MovementState::new();
    let mut mover = mover(5.0, 15.0, 40.0, false);

    let first = controller.update(&mut state, &mut mover, TICK, &open);
    assert!(first.replanned);
    assert_eq!(mover.position, WorldPoint::new(9.0, 15.0));

    let obstacle = CellCoord::new(1, 1);
    let walled = ObstacleMap::with_obstacles(grid.bounds(), [obstacle]);
    let second = controller.update(&mut state, &mut mover, TICK, &walled);

    assert!(!second.replanned, "cached path is still fresh");
    assert!(second.clamped);
    assert_eq!(controller.cell_of(mover.position), CellCoord::new(0, 1));
    assert!(mover.position.x > 9.9);
    assert!(state.path().is_empty());

    for _ in 0..500 {
        let report = controller.update(&mut state, &mut mover, TICK, &walled);
        assert_ne!(controller.cell_of(mover.position), obstacle);
        if report.phase == MovementPhase::Finished {
            return;
        }
    }
    panic!("mover did not recover from the stale path: {mover:?}");
}

#[test]
fn flyers_cross_walls_in_a_straight_line() {
    let grid = grid(6, 3);
    let wall = (0..3).map(|row| CellCoord::new(3, row));
    let obstacles = ObstacleMap::with_obstacles(grid.bounds(), wall);
    let mut controller = MovementController::new(grid, MovementConfig::default());
    let mut state = MovementState::new();
    let mut mover = mover(5.0, 25.0, 60.0, true);

    let reports = run_to_finish(&mut controller, &mut state, &mut mover, &obstacles, 500);

    assert_eq!(mover.position.y, 25.0);
    assert!(reports.iter().all(|report| !report.clamped));
    assert!(reports.iter().all(|report| report.forced.is_none()));
}

#[test]
fn cached_path_is_refreshed_on_the_replan_interval() {
    let grid = grid(20, 3);
    let obstacles = ObstacleMap::new(grid.bounds());
    let mut controller = MovementController::new(grid, MovementConfig::default());
    let mut state = MovementState::new();
    let mut mover = mover(5.0, 15.0, 10.0, false);

    let replans: Vec<usize> = (0..25)
        .filter(|_| {
            controller
                .update(&mut state, &mut mover, TICK, &obstacles)
                .replanned
        })
        .collect();

    assert_eq!(replans, vec![0, 20]);
}

#[test]
fn stationary_mover_replans_after_the_stuck_threshold() {
    let grid = grid(6, 3);
    let obstacles = ObstacleMap::new(grid.bounds());
    let mut controller = MovementController::new(grid, MovementConfig::default());
    let mut state = MovementState::new();
    let mut mover = mover(5.0, 15.0, 0.0, false);

    let replans: Vec<usize> = (0..16)
        .filter(|_| {
            controller
                .update(&mut state, &mut mover, TICK, &obstacles)
                .replanned
        })
        .collect();

    assert_eq!(replans, vec![0, 5, 10, 15]);
    assert_eq!(mover.position, WorldPoint::new(5.0, 15.0));
}

#[test]
fn finished_movers_are_left_untouched() {
    let grid = grid(4, 2);
    let obstacles = ObstacleMap::new(GridBounds::new(4, 0, 2));
    let mut controller = MovementController::new(grid, MovementConfig::default());
    let mut state = MovementState::new();
    let mut mover = mover(35.0, 5.0, 50.0, false);

    let _ = run_to_finish(&mut controller, &mut state, &mut mover, &obstacles, 50);
    let resting = mover.position;

    let report = controller.update(&mut state, &mut mover, TICK, &obstacles);
    assert_eq!(report.phase, MovementPhase::Finished);
    assert_eq!(report.moved, None);
    assert_eq!(mover.position, resting);
}
