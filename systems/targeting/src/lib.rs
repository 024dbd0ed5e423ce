#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Nearest-target resolution and time-limited target locks.
//!
//! Distances are compared squared against the squared reach, so no square
//! roots are taken while scanning candidates.

use std::time::Duration;

use lane_defence_core::{
    Direction, EnemyId, EnemySnapshot, TargetingConfig, WeaponId, WeaponSnapshot, WorldPoint,
};

/// Anything that can be selected as a target.
pub trait Candidate {
    /// Handle used to re-identify the candidate across ticks.
    type Id: Copy + Eq;

    /// Handle of the candidate.
    fn id(&self) -> Self::Id;

    /// Centre of the candidate in world units.
    fn position(&self) -> WorldPoint;

    /// Extra reach granted by the candidate's footprint.
    fn radius(&self) -> f32 {
        0.0
    }

    /// Whether the candidate may be targeted at all.
    fn is_eligible(&self) -> bool {
        true
    }
}

impl Candidate for WeaponSnapshot {
    type Id = WeaponId;

    fn id(&self) -> WeaponId {
        self.id
    }

    fn position(&self) -> WorldPoint {
        self.position
    }

    fn radius(&self) -> f32 {
        self.size / 2.0
    }

    fn is_eligible(&self) -> bool {
        !self.destroyed
    }
}

impl Candidate for EnemySnapshot {
    type Id = EnemyId;

    fn id(&self) -> EnemyId {
        self.id
    }

    fn position(&self) -> WorldPoint {
        self.position
    }

    fn radius(&self) -> f32 {
        self.size / 2.0
    }

    fn is_eligible(&self) -> bool {
        self.health > 0
    }
}

impl<C: Candidate + ?Sized> Candidate for &C {
    type Id = C::Id;

    fn id(&self) -> Self::Id {
        (**self).id()
    }

    fn position(&self) -> WorldPoint {
        (**self).position()
    }

    fn radius(&self) -> f32 {
        (**self).radius()
    }

    fn is_eligible(&self) -> bool {
        (**self).is_eligible()
    }
}

/// Reports whether `candidate` lies within `range` of `origin` and inside
/// the optional half-plane `filter`.
#[must_use]
pub fn in_reach<C: Candidate>(
    origin: WorldPoint,
    candidate: &C,
    range: f32,
    filter: Option<Direction>,
) -> bool {
    reach_distance(origin, candidate, range, filter).is_some()
}

/// Returns the nearest eligible candidate within reach.
///
/// Equal distances keep the candidate that appeared first in `candidates`.
/// Candidates may be borrowed or built on the fly.
pub fn find_nearest<C, I>(
    origin: WorldPoint,
    candidates: I,
    range: f32,
    filter: Option<Direction>,
) -> Option<C>
where
    C: Candidate,
    I: IntoIterator<Item = C>,
{
    let mut best: Option<(f32, C)> = None;
    for candidate in candidates {
        let Some(distance) = reach_distance(origin, &candidate, range, filter) else {
            continue;
        };
        match best {
            Some((best_distance, _)) if distance >= best_distance => {}
            _ => best = Some((distance, candidate)),
        }
    }
    best.map(|(_, candidate)| candidate)
}

fn reach_distance<C: Candidate>(
    origin: WorldPoint,
    candidate: &C,
    range: f32,
    filter: Option<Direction>,
) -> Option<f32> {
    if !candidate.is_eligible() {
        return None;
    }
    let position = candidate.position();
    if let Some(direction) = filter {
        if !direction.faces(position.x - origin.x, position.y - origin.y) {
            return None;
        }
    }
    let reach = range + candidate.radius();
    let distance = origin.distance_squared(position);
    (distance <= reach * reach).then_some(distance)
}

/// Target held by a single attacker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetLock<Id> {
    target: Option<Id>,
    out_of_range: bool,
    lost_timer: Duration,
    search_timer: Duration,
}

impl<Id> Default for TargetLock<Id> {
    fn default() -> Self {
        Self {
            target: None,
            out_of_range: false,
            lost_timer: Duration::ZERO,
            // A fresh lock searches on its first update.
            search_timer: Duration::MAX,
        }
    }
}

impl<Id: Copy> TargetLock<Id> {
    /// Creates an empty lock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Currently locked target.
    #[must_use]
    pub fn target(&self) -> Option<Id> {
        self.target
    }

    /// Whether the last validation found the target out of range.
    #[must_use]
    pub fn is_out_of_range(&self) -> bool {
        self.out_of_range
    }

    /// Time the target has spent out of range.
    #[must_use]
    pub fn lost_timer(&self) -> Duration {
        self.lost_timer
    }

    fn acquire(&mut self, target: Id) {
        self.target = Some(target);
        self.out_of_range = false;
        self.lost_timer = Duration::ZERO;
    }

    fn release(&mut self) {
        self.target = None;
        self.out_of_range = false;
        self.lost_timer = Duration::ZERO;
    }
}

/// Outcome of a single [`TargetResolver::update`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockUpdate<Id> {
    /// Target held after the update.
    pub target: Option<Id>,
    /// A new target was acquired.
    pub acquired: bool,
    /// The previous target was released.
    pub released: bool,
}

/// Maintains [`TargetLock`] values on a fixed search cadence.
///
/// Validity and range are only re-checked every `search_interval`; between
/// checks an attacker keeps its target, and once a check finds it out of
/// range the lock survives for `lock_duration` before being dropped.
#[derive(Clone, Copy, Debug)]
pub struct TargetResolver {
    config: TargetingConfig,
}

impl TargetResolver {
    /// Creates a resolver with the provided cadence.
    #[must_use]
    pub const fn new(config: TargetingConfig) -> Self {
        Self { config }
    }

    /// Advances the lock by `dt`, re-validating or searching when the
    /// cadence elapses.
    pub fn update<C: Candidate>(
        &self,
        lock: &mut TargetLock<C::Id>,
        origin: WorldPoint,
        range: f32,
        filter: Option<Direction>,
        candidates: &[C],
        dt: Duration,
    ) -> LockUpdate<C::Id> {
        let mut update = LockUpdate {
            target: lock.target,
            acquired: false,
            released: false,
        };
        lock.search_timer = lock.search_timer.saturating_add(dt);

        if lock.target.is_some() && lock.out_of_range {
            lock.lost_timer = lock.lost_timer.saturating_add(dt);
            if lock.lost_timer >= self.config.lock_duration() {
                lock.release();
                update.released = true;
            }
        }

        if lock.search_timer >= self.config.search_interval() {
            lock.search_timer = Duration::ZERO;

            if let Some(target) = lock.target {
                match candidates.iter().find(|candidate| candidate.id() == target) {
                    Some(candidate) if candidate.is_eligible() => {
                        if in_reach(origin, candidate, range, filter) {
                            lock.out_of_range = false;
                            lock.lost_timer = Duration::ZERO;
                        } else {
                            lock.out_of_range = true;
                        }
                    }
                    _ => {
                        lock.release();
                        update.released = true;
                    }
                }
            }

            if lock.target.is_none() {
                if let Some(candidate) = find_nearest(origin, candidates, range, filter) {
                    lock.acquire(candidate.id());
                    update.acquired = true;
                }
            }
        }

        update.target = lock.target;
        update
    }
}
