use std::time::Duration;

use lane_defence_core::{Direction, TargetingConfig, WeaponId, WeaponSnapshot, WorldPoint};
use lane_defence_system_targeting::{find_nearest, TargetLock, TargetResolver};

const TICK: Duration = Duration::from_millis(50);

fn weapon(id: u32, x: f32, y: f32) -> WeaponSnapshot {
    WeaponSnapshot {
        id: WeaponId::new(id),
        position: WorldPoint::new(x, y),
        destroyed: false,
        size: 0.0,
    }
}

#[test]
fn nearest_in_range_excludes_farther_candidates() {
    let origin = WorldPoint::new(0.0, 0.0);
    let candidates = [weapon(1, 5.0, 0.0), weapon(2, 0.0, 3.0)];

    let nearest = find_nearest(origin, &candidates, 4.0, None);

    assert_eq!(nearest.map(|weapon| weapon.id), Some(WeaponId::new(2)));

    let only_far = [weapon(1, 5.0, 0.0)];
    assert!(find_nearest(origin, &only_far, 4.0, None).is_none());
}

#[test]
fn destroyed_weapons_are_never_selected() {
    let origin = WorldPoint::new(0.0, 0.0);
    let mut near = weapon(1, 1.0, 0.0);
    near.destroyed = true;
    let candidates = [near, weapon(2, 3.0, 0.0)];

    let nearest = find_nearest(origin, &candidates, 10.0, None);

    assert_eq!(nearest.map(|weapon| weapon.id), Some(WeaponId::new(2)));
}

#[test]
fn weapon_footprint_extends_reach() {
    let origin = WorldPoint::new(0.0, 0.0);
    let mut large = weapon(1, 6.0, 0.0);
    large.size = 4.0;

    assert!(find_nearest(origin, &[large], 4.0, None).is_some());
    assert!(find_nearest(origin, &[weapon(1, 6.0, 0.0)], 4.0, None).is_none());
}

#[test]
fn forward_filter_ignores_weapons_behind_the_attacker() {
    let origin = WorldPoint::new(50.0, 50.0);
    let candidates = [weapon(1, 45.0, 50.0), weapon(2, 60.0, 80.0)];

    let forward = find_nearest(origin, &candidates, 100.0, Some(Direction::East));
    let any = find_nearest(origin, &candidates, 100.0, None);

    assert_eq!(forward.map(|weapon| weapon.id), Some(WeaponId::new(2)));
    assert_eq!(any.map(|weapon| weapon.id), Some(WeaponId::new(1)));
}

#[test]
fn lock_outlives_range_loss_for_the_lock_duration() {
    let config = TargetingConfig {
        search_interval_ms: 250,
        lock_duration_ms: 1_000,
    };
    let resolver = TargetResolver::new(config);
    let mut lock = TargetLock::new();
    let origin = WorldPoint::new(0.0, 0.0);
    let mut weapons = [weapon(9, 3.0, 0.0)];

    let first = resolver.update(&mut lock, origin, 4.0, None, &weapons, TICK);
    assert!(first.acquired);

    weapons[0].position = WorldPoint::new(10.0, 0.0);

    for call in 1..=24 {
        let update = resolver.update(&mut lock, origin, 4.0, None, &weapons, TICK);
        assert_eq!(
            update.target,
            Some(WeaponId::new(9)),
            "lock dropped early on call {call}"
        );
        assert_eq!(lock.is_out_of_range(), call >= 5);
    }

    let dropped = resolver.update(&mut lock, origin, 4.0, None, &weapons, TICK);
    assert!(dropped.released);
    assert_eq!(dropped.target, None);
}

#[test]
fn returning_to_range_restores_the_lock() {
    let resolver = TargetResolver::new(TargetingConfig::default());
    let mut lock = TargetLock::new();
    let origin = WorldPoint::new(0.0, 0.0);
    let mut weapons = [weapon(4, 3.0, 0.0)];

    let _ = resolver.update(&mut lock, origin, 4.0, None, &weapons, TICK);
    weapons[0].position = WorldPoint::new(8.0, 0.0);
    for _ in 0..6 {
        let _ = resolver.update(&mut lock, origin, 4.0, None, &weapons, TICK);
    }
    assert!(lock.is_out_of_range());
    assert!(lock.lost_timer() > Duration::ZERO);

    weapons[0].position = WorldPoint::new(2.0, 0.0);
    for _ in 0..5 {
        let _ = resolver.update(&mut lock, origin, 4.0, None, &weapons, TICK);
    }

    assert_eq!(lock.target(), Some(WeaponId::new(4)));
    assert!(!lock.is_out_of_range());
    assert_eq!(lock.lost_timer(), Duration::ZERO);
}

#[test]
fn destroyed_target_is_released_at_the_next_check() {
    let resolver = TargetResolver::new(TargetingConfig::default());
    let mut lock = TargetLock::new();
    let origin = WorldPoint::new(0.0, 0.0);
    let mut weapons = [weapon(1, 2.0, 0.0), weapon(2, 3.5, 0.0)];

    let _ = resolver.update(&mut lock, origin, 4.0, None, &weapons, TICK);
    assert_eq!(lock.target(), Some(WeaponId::new(1)));

    weapons[0].destroyed = true;
    for _ in 1..5 {
        let update = resolver.update(&mut lock, origin, 4.0, None, &weapons, TICK);
        assert_eq!(update.target, Some(WeaponId::new(1)));
    }

    let update = resolver.update(&mut lock, origin, 4.0, None, &weapons, TICK);
    assert!(update.released);
    assert!(update.acquired);
    assert_eq!(update.target, Some(WeaponId::new(2)));
}

#[test]
fn missing_target_is_released() {
    let resolver = TargetResolver::new(TargetingConfig::default());
    let mut lock = TargetLock::new();
    let origin = WorldPoint::new(0.0, 0.0);

    let _ = resolver.update(&mut lock, origin, 4.0, None, &[weapon(1, 1.0, 0.0)], TICK);
    let empty: [WeaponSnapshot; 0] = [];
    let mut released = false;
    for _ in 0..5 {
        released |= resolver
            .update(&mut lock, origin, 4.0, None, &empty, TICK)
            .released;
    }

    assert!(released);
    assert_eq!(lock.target(), None);
}
