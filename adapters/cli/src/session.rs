//! Headless session driver: owns the world, resolves weapon fire, and
//! tallies events into a summary.

use std::time::Duration;

use lane_defence_core::{
    CellCoord, Command, Event, ObstacleMap, WaveStatus, WeaponId, WeaponSnapshot,
};
use lane_defence_world::{apply, query, World};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, info};

/// Hit points of a freshly placed weapon.
pub(crate) const WEAPON_HEALTH: u32 = 200;
/// Damage dealt per weapon shot.
pub(crate) const WEAPON_DAMAGE: u32 = 20;
/// Time between weapon shots.
pub(crate) const WEAPON_COOLDOWN: Duration = Duration::from_millis(500);
/// Weapon reach expressed in cells.
pub(crate) const WEAPON_RANGE_CELLS: f32 = 3.0;

/// A stationary weapon owned by the adapter.
#[derive(Clone, Debug)]
struct Weapon {
    id: WeaponId,
    cell: CellCoord,
    health: u32,
    cooldown: Duration,
}

impl Weapon {
    fn is_destroyed(&self) -> bool {
        self.health == 0
    }
}

/// Totals reported once the session ends.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub(crate) struct Summary {
    /// Ticks applied before the session stopped.
    pub(crate) ticks: u64,
    /// Highest wave level reached.
    pub(crate) waves_reached: u32,
    /// Waves fully cleared.
    pub(crate) waves_cleared: u32,
    /// Enemies that entered the battlefield.
    pub(crate) spawned: u32,
    /// Enemies destroyed by weapon fire.
    pub(crate) destroyed: u32,
    /// Enemies that crossed the base line.
    pub(crate) breached: u32,
    /// Forced moves east after repeated planning failures.
    pub(crate) forced_moves: u32,
    /// Rewards collected from destroyed enemies.
    pub(crate) rewards: u32,
    /// Weapons placed on the battlefield.
    pub(crate) weapons_placed: u32,
    /// Weapons destroyed by enemy fire.
    pub(crate) weapons_lost: u32,
    /// Obstacles on the battlefield.
    pub(crate) obstacles: usize,
    /// Whether the base line was breached.
    pub(crate) game_over: bool,
    /// Whether every configured wave was cleared.
    pub(crate) victory: bool,
}

/// World plus the adapter-side state needed to play it headlessly.
#[derive(Debug)]
pub(crate) struct Session {
    world: World,
    weapons: Vec<Weapon>,
    summary: Summary,
    events: Vec<Event>,
}

impl Session {
    /// Installs `obstacles` and places up to `weapon_count` weapons on free
    /// cells of the right half of the board.
    pub(crate) fn new(
        mut world: World,
        obstacles: ObstacleMap,
        weapon_count: usize,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let mut events = Vec::new();
        apply(&mut world, Command::SetObstacleMap { obstacles }, &mut events);

        let weapons = place_weapons(query::obstacles(&world), weapon_count, rng);
        let summary = Summary {
            weapons_placed: u32::try_from(weapons.len()).unwrap_or(u32::MAX),
            obstacles: query::obstacles(&world).obstacle_count(),
            ..Summary::default()
        };
        info!(
            weapons = summary.weapons_placed,
            obstacles = summary.obstacles,
            "session ready"
        );

        let mut session = Self {
            world,
            weapons,
            summary,
            events,
        };
        session.sync_weapons();
        session
    }

    /// Applies up to `ticks` ticks of `dt`, stopping early once the session
    /// is decided.
    pub(crate) fn run(&mut self, ticks: u64, dt: Duration) -> &Summary {
        for _ in 0..ticks {
            if self.summary.game_over || self.summary.victory {
                break;
            }
            self.step(dt);
        }
        self.summary.waves_reached = self.wave_status().level;
        &self.summary
    }

    /// Fires ready weapons, advances the world once, and folds its events.
    pub(crate) fn step(&mut self, dt: Duration) {
        self.fire_weapons(dt);

        self.events.clear();
        apply(&mut self.world, Command::Tick { dt }, &mut self.events);
        self.summary.ticks += 1;

        let events = std::mem::take(&mut self.events);
        let mut weapons_changed = false;
        for event in &events {
            match *event {
                Event::WaveCleared { .. } => self.summary.waves_cleared += 1,
                Event::AllWavesCleared => self.summary.victory = true,
                Event::EnemySpawned { .. } => self.summary.spawned += 1,
                Event::EnemyForcedMove { .. } => self.summary.forced_moves += 1,
                Event::EnemyFired { weapon, damage, .. } => {
                    weapons_changed |= self.damage_weapon(weapon, damage);
                }
                Event::EnemyDestroyed { reward, .. } => {
                    self.summary.destroyed += 1;
                    self.summary.rewards = self.summary.rewards.saturating_add(reward);
                }
                Event::EnemyBreached { .. } => self.summary.breached += 1,
                Event::GameOver => self.summary.game_over = true,
                _ => {}
            }
        }

        self.events = events;

        if weapons_changed {
            self.sync_weapons();
        }
    }

    pub(crate) fn wave_status(&self) -> WaveStatus {
        query::wave_status(&self.world)
    }

    pub(crate) fn obstacles(&self) -> &ObstacleMap {
        query::obstacles(&self.world)
    }

    fn fire_weapons(&mut self, dt: Duration) {
        let range = WEAPON_RANGE_CELLS * query::config(&self.world).grid.cell_size;
        let mut shots = Vec::new();
        for weapon in self.weapons.iter_mut().filter(|weapon| !weapon.is_destroyed()) {
            weapon.cooldown = weapon.cooldown.saturating_sub(dt);
            if !weapon.cooldown.is_zero() {
                continue;
            }
            let origin = query::cell_center(&self.world, weapon.cell);
            if let Some(target) = query::nearest_enemy(&self.world, origin, range, None) {
                weapon.cooldown = WEAPON_COOLDOWN;
                shots.push(target.id);
            }
        }

        for enemy in shots {
            apply(
                &mut self.world,
                Command::DamageEnemy {
                    enemy,
                    amount: WEAPON_DAMAGE,
                },
                &mut self.events,
            );
        }
    }

    /// Returns whether the weapon was destroyed by the hit.
    fn damage_weapon(&mut self, id: WeaponId, damage: u32) -> bool {
        let Some(weapon) = self.weapons.iter_mut().find(|weapon| weapon.id == id) else {
            return false;
        };
        if weapon.is_destroyed() {
            return false;
        }
        weapon.health = weapon.health.saturating_sub(damage);
        if weapon.is_destroyed() {
            self.summary.weapons_lost += 1;
            debug!(weapon = id.get(), "weapon destroyed");
            return true;
        }
        false
    }

    fn sync_weapons(&mut self) {
        let snapshots: Vec<WeaponSnapshot> = self
            .weapons
            .iter()
            .map(|weapon| WeaponSnapshot {
                id: weapon.id,
                position: query::cell_center(&self.world, weapon.cell),
                destroyed: weapon.is_destroyed(),
                size: query::config(&self.world).grid.cell_size,
            })
            .collect();
        apply(
            &mut self.world,
            Command::SyncWeapons { weapons: snapshots },
            &mut self.events,
        );
    }
}

fn place_weapons(obstacles: &ObstacleMap, count: usize, rng: &mut ChaCha8Rng) -> Vec<Weapon> {
    let bounds = obstacles.bounds();
    let first_column = bounds.columns() / 2;
    let mut cells: Vec<CellCoord> = bounds
        .row_range()
        .flat_map(|row| (first_column..bounds.columns()).map(move |column| CellCoord::new(column, row)))
        .filter(|cell| obstacles.is_free(*cell))
        .collect();
    cells.shuffle(rng);
    cells.truncate(count);
    cells.sort();

    cells
        .into_iter()
        .zip(0_u32..)
        .map(|(cell, index)| Weapon {
            id: WeaponId::new(index),
            cell,
            health: WEAPON_HEALTH,
            cooldown: Duration::ZERO,
        })
        .collect()
}
