//! Live enemy storage with generational handles.

use std::time::Duration;

use lane_defence_core::{CellCoord, EnemyId, EnemyKind, EnemySnapshot, EnemyStats, WeaponId};
use lane_defence_system_movement::{MovementState, Mover};
use lane_defence_system_targeting::TargetLock;

/// Authoritative state of a single enemy.
#[derive(Clone, Debug)]
pub(crate) struct EnemyState {
    pub(crate) id: EnemyId,
    pub(crate) kind: EnemyKind,
    pub(crate) stats: EnemyStats,
    pub(crate) health: u32,
    pub(crate) max_health: u32,
    pub(crate) mover: Mover,
    pub(crate) movement: MovementState,
    pub(crate) lock: TargetLock<WeaponId>,
    pub(crate) fire_timer: Duration,
    pub(crate) dead: bool,
    pub(crate) finished: bool,
}

impl EnemyState {
    /// Creates a freshly spawned enemy at full health.
    pub(crate) fn spawn(id: EnemyId, kind: EnemyKind, health: u32, mover: Mover) -> Self {
        Self {
            id,
            kind,
            stats: kind.stats(),
            health,
            max_health: health,
            mover,
            movement: MovementState::new(),
            lock: TargetLock::new(),
            fire_timer: Duration::ZERO,
            dead: false,
            finished: false,
        }
    }

    /// Whether the enemy still takes part in the simulation.
    pub(crate) fn is_active(&self) -> bool {
        !self.dead && !self.finished
    }

    /// Removes hit points, marking the enemy dead at zero.
    pub(crate) fn apply_damage(&mut self, amount: u32) {
        if self.dead {
            return;
        }
        self.health = self.health.saturating_sub(amount);
        if self.health == 0 {
            self.dead = true;
        }
    }

    pub(crate) fn snapshot(&self, cell: CellCoord) -> EnemySnapshot {
        EnemySnapshot {
            id: self.id,
            kind: self.kind,
            position: self.mover.position,
            cell,
            health: self.health,
            max_health: self.max_health,
            facing: self.mover.facing,
            size: self.mover.size,
            phase: self.movement.phase(),
            target: self.lock.target(),
        }
    }
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    enemy: Option<EnemyState>,
}

/// Slab of enemies addressed by [`EnemyId`].
///
/// Freeing a slot bumps its generation so handles issued before the removal
/// stop resolving.
#[derive(Clone, Debug, Default)]
pub(crate) struct EnemyRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl EnemyRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Allocates a handle and stores the enemy built for it.
    pub(crate) fn insert<F>(&mut self, build: F) -> EnemyId
    where
        F: FnOnce(EnemyId) -> EnemyState,
    {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            let id = EnemyId::new(index, slot.generation);
            slot.enemy = Some(build(id));
            return id;
        }

        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        let id = EnemyId::new(index, 0);
        self.slots.push(Slot {
            generation: 0,
            enemy: Some(build(id)),
        });
        id
    }

    pub(crate) fn get(&self, id: EnemyId) -> Option<&EnemyState> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.enemy.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: EnemyId) -> Option<&mut EnemyState> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.enemy.as_mut())
    }

    pub(crate) fn remove(&mut self, id: EnemyId) -> Option<EnemyState> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        let enemy = slot.enemy.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        Some(enemy)
    }

    /// Removes every enemy while keeping previously issued handles invalid.
    pub(crate) fn clear(&mut self) {
        let ids: Vec<EnemyId> = self.iter().map(|enemy| enemy.id).collect();
        for id in ids.into_iter().rev() {
            let _ = self.remove(id);
        }
    }

    /// Iterates live enemies in slot order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &EnemyState> {
        self.slots.iter().filter_map(|slot| slot.enemy.as_ref())
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut EnemyState> {
        self.slots.iter_mut().filter_map(|slot| slot.enemy.as_mut())
    }

    pub(crate) fn len(&self) -> usize {
        self.iter().count()
    }
}
