#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave director: decides how many enemies each wave spawns, which kinds,
//! how fast, and when the next wave begins.

use std::{collections::VecDeque, time::Duration};

use lane_defence_core::{EnemyKind, WaveConfig, WavePhase, WaveStatus};
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

/// Growth of every spawn weight per wave level.
const WEIGHT_GROWTH_PER_LEVEL: f32 = 0.1;
/// Ceiling of the spawn weight multiplier.
const MAX_WEIGHT_MULTIPLIER: f32 = 2.0;

/// Instructions emitted by [`WaveDirector::handle`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WaveSignal {
    /// A wave began.
    WaveStarted {
        /// One-based wave level.
        level: u32,
        /// Enemies the wave will spawn.
        cap: u32,
    },
    /// The caller should spawn one enemy.
    Spawn {
        /// Kind drawn from the wave's pool.
        kind: EnemyKind,
        /// Linear hit point bonus of the current wave.
        hp_bonus: f32,
    },
    /// Every enemy of the wave was spawned and none remain alive.
    WaveCleared {
        /// Level of the cleared wave.
        level: u32,
    },
    /// The final configured wave was cleared.
    AllWavesCleared,
}

/// Linear hit point bonus applied to enemies of `level`.
#[must_use]
pub fn hp_bonus(config: &WaveConfig, level: u32) -> f32 {
    level.saturating_sub(1) as f32 * config.hp_bonus_per_wave
}

/// Spawn interval of `level`: geometric decay clamped at the configured floor.
#[must_use]
pub fn spawn_interval(config: &WaveConfig, level: u32) -> Duration {
    let exponent = i32::try_from(level.saturating_sub(1)).unwrap_or(i32::MAX);
    let decayed_ms = config.base_interval_ms as f64 * config.interval_reduction.powi(exponent);
    let decayed = Duration::from_secs_f64((decayed_ms / 1_000.0).max(0.0));
    decayed.max(config.min_interval())
}

/// Number of enemies spawned by `level`.
#[must_use]
pub fn wave_cap(config: &WaveConfig, level: u32) -> u32 {
    config
        .base_enemies
        .saturating_add(level.saturating_sub(1).saturating_mul(config.enemies_per_wave))
}

/// Multiplier applied to every spawn weight at `level`.
#[must_use]
pub fn weight_multiplier(level: u32) -> f32 {
    (1.0 + level.saturating_sub(1) as f32 * WEIGHT_GROWTH_PER_LEVEL).min(MAX_WEIGHT_MULTIPLIER)
}

/// Seeded state machine that paces spawns and wave transitions.
///
/// The director starts at level zero and opens the first wave on its first
/// [`handle`](Self::handle) call.
#[derive(Debug)]
pub struct WaveDirector {
    config: WaveConfig,
    seed: u64,
    rng: ChaCha8Rng,
    level: u32,
    spawned: u32,
    cap: u32,
    hp_bonus: f32,
    spawn_interval: Duration,
    spawn_timer: Duration,
    pool: VecDeque<EnemyKind>,
    phase: WavePhase,
}

impl WaveDirector {
    /// Creates a director that draws from a stream seeded with `seed`.
    #[must_use]
    pub fn new(config: WaveConfig, seed: u64) -> Self {
        Self {
            config,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            level: 0,
            spawned: 0,
            cap: 0,
            hp_bonus: 0.0,
            spawn_interval: config.base_interval(),
            spawn_timer: Duration::ZERO,
            pool: VecDeque::new(),
            phase: WavePhase::Spawning,
        }
    }

    /// Returns the director to level zero and reseeds its random stream.
    pub fn reset(&mut self) {
        *self = Self::new(self.config, self.seed);
    }

    /// Current wave progress.
    #[must_use]
    pub fn status(&self) -> WaveStatus {
        WaveStatus {
            level: self.level,
            spawned: self.spawned,
            cap: self.cap,
            hp_bonus: self.hp_bonus,
            spawn_interval: self.spawn_interval,
            phase: self.phase,
        }
    }

    /// Kinds still queued for the current wave, front first.
    pub fn pending_kinds(&self) -> impl Iterator<Item = EnemyKind> + '_ {
        self.pool.iter().copied()
    }

    /// Picks a spawn row uniformly from `rows`.
    pub fn choose_lane(&mut self, rows: &[u32]) -> Option<u32> {
        rows.choose(&mut self.rng).copied()
    }

    /// Advances timers by `dt` given the number of enemies still alive.
    ///
    /// Enemies that reached the base line must already be excluded from
    /// `live_enemies`.
    pub fn handle(&mut self, dt: Duration, live_enemies: usize, out: &mut Vec<WaveSignal>) {
        if self.phase == WavePhase::Victory {
            return;
        }

        if self.level == 0 {
            self.start_new_wave(out);
        } else if self.spawned >= self.cap && live_enemies == 0 {
            out.push(WaveSignal::WaveCleared { level: self.level });
            info!(level = self.level, "wave cleared");

            if self.config.total_waves > 0 && self.level >= self.config.total_waves {
                self.phase = WavePhase::Victory;
                out.push(WaveSignal::AllWavesCleared);
                info!(waves = self.level, "all waves cleared");
                return;
            }
            self.start_new_wave(out);
        }

        if self.phase != WavePhase::Spawning {
            return;
        }

        self.spawn_timer = self.spawn_timer.saturating_add(dt);
        if self.spawned < self.cap && self.spawn_timer >= self.spawn_interval {
            self.spawn_timer = Duration::ZERO;
            let kind = match self.pool.pop_front() {
                Some(kind) => kind,
                None => self.weighted_draw(),
            };
            self.spawned += 1;
            debug!(?kind, spawned = self.spawned, cap = self.cap, "spawning enemy");
            out.push(WaveSignal::Spawn {
                kind,
                hp_bonus: self.hp_bonus,
            });
        }

        if self.spawned >= self.cap {
            self.phase = WavePhase::AwaitingWaveEnd;
        }
    }

    fn start_new_wave(&mut self, out: &mut Vec<WaveSignal>) {
        self.level = self.level.saturating_add(1);
        self.spawned = 0;
        self.spawn_timer = Duration::ZERO;
        self.hp_bonus = hp_bonus(&self.config, self.level);
        self.spawn_interval = spawn_interval(&self.config, self.level);
        self.cap = wave_cap(&self.config, self.level);
        self.phase = WavePhase::Spawning;
        self.generate_pool();

        info!(
            level = self.level,
            cap = self.cap,
            interval_ms = self.spawn_interval.as_millis() as u64,
            hp_bonus = self.hp_bonus,
            "wave started"
        );
        out.push(WaveSignal::WaveStarted {
            level: self.level,
            cap: self.cap,
        });
    }

    fn generate_pool(&mut self) {
        self.pool.clear();
        let cap = usize::try_from(self.cap).unwrap_or(usize::MAX);
        let guaranteed = cap.min(EnemyKind::ALL.len());
        self.pool.extend(EnemyKind::ALL.iter().take(guaranteed).copied());
        while self.pool.len() < cap {
            let kind = self.weighted_draw();
            self.pool.push_back(kind);
        }
        self.pool.make_contiguous().shuffle(&mut self.rng);
    }

    fn weighted_draw(&mut self) -> EnemyKind {
        let multiplier = weight_multiplier(self.level);
        let total: f32 = EnemyKind::ALL
            .iter()
            .map(|kind| kind.stats().spawn_weight * multiplier)
            .sum();
        let roll = self.rng.gen::<f32>() * total;

        let mut cumulative = 0.0;
        for kind in EnemyKind::ALL {
            cumulative += kind.stats().spawn_weight * multiplier;
            if roll < cumulative {
                return kind;
            }
        }
        EnemyKind::ALL[EnemyKind::ALL.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_multiplier_is_capped() {
        assert_eq!(weight_multiplier(1), 1.0);
        assert!((weight_multiplier(6) - 1.5).abs() < 1e-6);
        assert_eq!(weight_multiplier(11), 2.0);
        assert_eq!(weight_multiplier(500), 2.0);
    }

    #[test]
    fn cap_grows_linearly() {
        let config = WaveConfig::default();
        assert_eq!(wave_cap(&config, 1), 10);
        assert_eq!(wave_cap(&config, 4), 16);
    }

    #[test]
    fn small_wave_pool_still_holds_distinct_kinds() {
        let config = WaveConfig {
            base_enemies: 3,
            enemies_per_wave: 0,
            ..WaveConfig::default()
        };
        let mut director = WaveDirector::new(config, 5);
        let mut signals = Vec::new();
        director.handle(Duration::ZERO, 0, &mut signals);

        let mut kinds: Vec<EnemyKind> = director.pending_kinds().collect();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), 3);
    }

    #[test]
    fn exhausted_pool_falls_back_to_weighted_draws() {
        let mut director = WaveDirector::new(WaveConfig::default(), 11);
        let mut signals = Vec::new();
        director.handle(Duration::ZERO, 0, &mut signals);
        director.pool.clear();

        let kind = director.weighted_draw();
        assert!(EnemyKind::ALL.contains(&kind));

        let interval = director.status().spawn_interval;
        director.handle(interval, 0, &mut signals);
        assert!(signals
            .iter()
            .any(|signal| matches!(signal, WaveSignal::Spawn { .. })));
    }
}
