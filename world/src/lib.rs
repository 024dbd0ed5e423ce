#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for Lane Defence.
//!
//! The world owns every live enemy, the obstacle map, the wave director, and
//! the systems that move enemies and pick their targets. Adapters mutate it
//! exclusively through [`apply`] and observe it through [`query`].

mod enemies;

use std::time::Duration;

use lane_defence_core::{
    CellCoord, Command, ConfigError, EnemyId, EnemyKind, Event, MovementPhase, ObstacleMap,
    SimulationConfig, WaveBanner, WeaponSnapshot,
};
use lane_defence_system_movement::{MovementController, Mover};
use lane_defence_system_targeting::TargetResolver;
use lane_defence_system_waves::{WaveDirector, WaveSignal};
use tracing::{debug, info, warn};

use crate::enemies::{EnemyRegistry, EnemyState};

/// Represents the authoritative Lane Defence world state.
#[derive(Debug)]
pub struct World {
    config: SimulationConfig,
    obstacles: ObstacleMap,
    enemies: EnemyRegistry,
    weapons: Vec<WeaponSnapshot>,
    director: WaveDirector,
    movement: MovementController,
    targeting: TargetResolver,
    banner: Option<WaveBanner>,
    paused: bool,
    game_over: bool,
    tick_index: u64,
    wave_signals: Vec<WaveSignal>,
    lane_workspace: Vec<u32>,
    reap_workspace: Vec<EnemyId>,
}

impl World {
    /// Creates a world with an obstacle-free grid after validating `config`.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            obstacles: ObstacleMap::new(config.grid.bounds()),
            enemies: EnemyRegistry::new(),
            weapons: Vec::new(),
            director: WaveDirector::new(config.waves, config.seed),
            movement: MovementController::new(config.grid, config.movement),
            targeting: TargetResolver::new(config.targeting),
            banner: None,
            paused: false,
            game_over: false,
            tick_index: 0,
            wave_signals: Vec::new(),
            lane_workspace: Vec::new(),
            reap_workspace: Vec::new(),
            config,
        })
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if self.paused || self.game_over {
            return;
        }

        let dt = dt.min(self.config.max_tick());
        self.tick_index = self.tick_index.saturating_add(1);
        out_events.push(Event::TimeAdvanced { dt });
        self.advance_banner(dt);

        self.run_director(dt, out_events);
        self.update_enemies(dt, out_events);
        self.reap(out_events);
    }

    fn advance_banner(&mut self, dt: Duration) {
        if let Some(banner) = self.banner.as_mut() {
            banner.remaining = banner.remaining.saturating_sub(dt);
            if banner.remaining.is_zero() {
                self.banner = None;
            }
        }
    }

    fn run_director(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        let live = self.enemies.iter().filter(|enemy| !enemy.dead).count();
        let mut signals = std::mem::take(&mut self.wave_signals);
        signals.clear();
        self.director.handle(dt, live, &mut signals);

        for signal in signals.drain(..) {
            match signal {
                WaveSignal::WaveStarted { level, cap } => {
                    self.banner = Some(WaveBanner {
                        level,
                        remaining: self.config.banner_duration(),
                    });
                    out_events.push(Event::WaveStarted { level, cap });
                }
                WaveSignal::Spawn { kind, hp_bonus } => {
                    self.spawn_enemy(kind, hp_bonus, out_events);
                }
                WaveSignal::WaveCleared { level } => {
                    out_events.push(Event::WaveCleared { level });
                }
                WaveSignal::AllWavesCleared => out_events.push(Event::AllWavesCleared),
            }
        }
        self.wave_signals = signals;
    }

    fn spawn_enemy(&mut self, kind: EnemyKind, hp_bonus: f32, out_events: &mut Vec<Event>) {
        self.collect_spawn_lanes();
        let bounds = self.obstacles.bounds();
        let row = self
            .director
            .choose_lane(&self.lane_workspace)
            .unwrap_or(bounds.start_row());
        let cell = CellCoord::new(0, row);

        let stats = kind.stats();
        let health = stats.scaled_health(hp_bonus);
        let mover = Mover {
            position: self.movement.cell_center(cell),
            speed: stats.move_speed,
            size: stats.size,
            can_fly: stats.can_fly,
            facing: 0.0,
        };
        let enemy = self
            .enemies
            .insert(|id| EnemyState::spawn(id, kind, health, mover));

        debug!(?enemy, ?kind, row, health, "enemy spawned");
        out_events.push(Event::EnemySpawned {
            enemy,
            kind,
            cell,
            health,
        });
    }

    /// Rows whose entrance is free of obstacles and enemies, falling back to
    /// obstacle-free rows and then to every row.
    fn collect_spawn_lanes(&mut self) {
        let bounds = self.obstacles.bounds();
        self.lane_workspace.clear();

        for row in bounds.row_range() {
            let entrance = CellCoord::new(0, row);
            if self.obstacles.is_blocked(entrance) {
                continue;
            }
            let occupied = self.enemies.iter().any(|enemy| {
                enemy.is_active() && self.movement.cell_of(enemy.mover.position) == entrance
            });
            if !occupied {
                self.lane_workspace.push(row);
            }
        }

        if self.lane_workspace.is_empty() {
            self.lane_workspace.extend(
                bounds
                    .row_range()
                    .filter(|row| self.obstacles.is_free(CellCoord::new(0, *row))),
            );
        }

        if self.lane_workspace.is_empty() {
            self.lane_workspace.extend(bounds.row_range());
        }
    }

    fn update_enemies(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        for enemy in self.enemies.iter_mut() {
            if !enemy.is_active() {
                continue;
            }

            let lock = self.targeting.update(
                &mut enemy.lock,
                enemy.mover.position,
                enemy.stats.attack_range,
                enemy.stats.target_filter,
                &self.weapons,
                dt,
            );
            enemy.fire_timer = enemy.fire_timer.saturating_add(dt);

            let engaged = lock.target.and_then(|target| {
                self.weapons
                    .iter()
                    .find(|weapon| weapon.id == target && !weapon.destroyed)
            });

            if let Some(weapon) = engaged {
                if enemy.fire_timer >= enemy.stats.fire_interval() {
                    enemy.fire_timer = Duration::ZERO;
                    out_events.push(Event::EnemyFired {
                        enemy: enemy.id,
                        weapon: weapon.id,
                        damage: enemy.stats.damage,
                    });
                }
                continue;
            }

            let report = self.movement.update(
                &mut enemy.movement,
                &mut enemy.mover,
                dt,
                &self.obstacles,
            );
            if let Some(cell) = report.forced {
                out_events.push(Event::EnemyForcedMove {
                    enemy: enemy.id,
                    cell,
                });
            }
            if report.phase == MovementPhase::Finished {
                enemy.finished = true;
            }
        }
    }

    fn reap(&mut self, out_events: &mut Vec<Event>) {
        self.reap_workspace.clear();
        self.reap_workspace.extend(
            self.enemies
                .iter()
                .filter(|enemy| !enemy.is_active())
                .map(|enemy| enemy.id),
        );

        for index in 0..self.reap_workspace.len() {
            let id = self.reap_workspace[index];
            let Some(enemy) = self.enemies.remove(id) else {
                continue;
            };

            if enemy.dead {
                debug!(enemy = ?id, kind = ?enemy.kind, "enemy destroyed");
                out_events.push(Event::EnemyDestroyed {
                    enemy: id,
                    kind: enemy.kind,
                    reward: enemy.stats.reward,
                });
                continue;
            }

            out_events.push(Event::EnemyBreached { enemy: id });
            if !self.game_over {
                self.game_over = true;
                info!(enemy = ?id, tick = self.tick_index, "base line breached, game over");
                out_events.push(Event::GameOver);
            }
        }
    }

    fn reset(&mut self) {
        self.enemies.clear();
        self.director.reset();
        self.banner = None;
        self.game_over = false;
        self.tick_index = 0;
        info!("simulation reset");
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => world.tick(dt, out_events),
        Command::SetObstacleMap { obstacles } => {
            let expected = world.config.grid.bounds();
            if obstacles.bounds() != expected {
                warn!(
                    ?expected,
                    received = ?obstacles.bounds(),
                    "ignoring obstacle map with mismatched bounds"
                );
                return;
            }
            debug!(obstacles = obstacles.obstacle_count(), "obstacle map replaced");
            world.obstacles = obstacles;
            out_events.push(Event::ObstaclesChanged);
        }
        Command::Reset => {
            world.reset();
            out_events.push(Event::SimulationReset);
        }
        Command::SetPaused { paused } => {
            if world.paused != paused {
                world.paused = paused;
                out_events.push(Event::PauseChanged { paused });
            }
        }
        Command::SyncWeapons { weapons } => {
            world.weapons = weapons;
        }
        Command::DamageEnemy { enemy, amount } => {
            if let Some(state) = world.enemies.get_mut(enemy) {
                state.apply_damage(amount);
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use lane_defence_core::{
        CellCoord, Direction, EnemyId, EnemySnapshot, EnemyView, ObstacleMap, SimulationConfig,
        WaveBanner, WaveStatus, WeaponSnapshot, WorldPoint,
    };
    use lane_defence_system_targeting::find_nearest;

    use super::World;

    /// Captures a read-only view of every enemy still held by the world.
    ///
    /// Enemies destroyed since the last tick remain visible with zero health
    /// until the next tick removes them.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        let snapshots = world
            .enemies
            .iter()
            .map(|enemy| enemy.snapshot(world.movement.cell_of(enemy.mover.position)))
            .collect();
        EnemyView::from_snapshots(snapshots)
    }

    /// Looks up a single enemy by handle.
    #[must_use]
    pub fn enemy(world: &World, id: EnemyId) -> Option<EnemySnapshot> {
        world
            .enemies
            .get(id)
            .map(|enemy| enemy.snapshot(world.movement.cell_of(enemy.mover.position)))
    }

    /// Number of enemies held by the world.
    #[must_use]
    pub fn enemy_count(world: &World) -> usize {
        world.enemies.len()
    }

    /// Nearest living enemy within `range` of `origin`, for weapon targeting.
    #[must_use]
    pub fn nearest_enemy(
        world: &World,
        origin: WorldPoint,
        range: f32,
        filter: Option<Direction>,
    ) -> Option<EnemySnapshot> {
        let candidates = world
            .enemies
            .iter()
            .map(|enemy| enemy.snapshot(world.movement.cell_of(enemy.mover.position)));
        find_nearest(origin, candidates, range, filter)
    }

    /// World-space centre of `cell` on the world's grid.
    #[must_use]
    pub fn cell_center(world: &World, cell: CellCoord) -> WorldPoint {
        world.movement.cell_center(cell)
    }

    /// Current wave progress.
    #[must_use]
    pub fn wave_status(world: &World) -> WaveStatus {
        world.director.status()
    }

    /// Banner announcing the most recent wave, while it is still displayed.
    #[must_use]
    pub fn wave_banner(world: &World) -> Option<WaveBanner> {
        world.banner
    }

    /// Reports whether ticks are currently suspended.
    #[must_use]
    pub fn is_paused(world: &World) -> bool {
        world.paused
    }

    /// Reports whether an enemy breached the base line.
    #[must_use]
    pub fn is_game_over(world: &World) -> bool {
        world.game_over
    }

    /// Obstacle map currently used for pathfinding and collision.
    #[must_use]
    pub fn obstacles(world: &World) -> &ObstacleMap {
        &world.obstacles
    }

    /// Weapon snapshots most recently synchronised into the world.
    #[must_use]
    pub fn weapons(world: &World) -> &[WeaponSnapshot] {
        &world.weapons
    }

    /// Configuration the world was built with.
    #[must_use]
    pub fn config(world: &World) -> &SimulationConfig {
        &world.config
    }

    /// Number of ticks processed since creation or the last reset.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }
}
