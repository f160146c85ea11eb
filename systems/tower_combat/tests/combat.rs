use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use lane_defence_core::{
    EconomySink, EnemyDefinition, EnemyMotion, Event, PathId, ProjectileTarget, TowerType,
    WorldPoint,
};
use lane_defence_system_tower_combat::{CombatConfig, TowerCatalog, TowerCoordinator};
use lane_defence_world::{EnemyCatalog, PathTable, World};

struct Purse(u32);

impl EconomySink for Purse {
    fn gold(&self) -> u32 {
        self.0
    }

    fn lives(&self) -> u32 {
        20
    }

    fn try_spend_gold(&mut self, amount: u32) -> bool {
        if amount > self.0 {
            return false;
        }
        self.0 -= amount;
        true
    }

    fn add_gold(&mut self, amount: u32) {
        self.0 += amount;
    }

    fn damage_lives(&mut self, _amount: u32) {}
}

fn lane() -> Vec<WorldPoint> {
    vec![WorldPoint::new(-6.0, 0.0), WorldPoint::new(6.0, 0.0)]
}

fn world(lane: Vec<WorldPoint>) -> World {
    World::new(
        PathTable::new([(PathId::new(0), lane)]),
        EnemyCatalog::new([
            EnemyDefinition {
                id: "dummy".to_owned(),
                move_speed: 0.0,
                ..EnemyDefinition::default()
            },
            EnemyDefinition {
                id: "walker".to_owned(),
                move_speed: 2.5,
                health: 400.0,
                ..EnemyDefinition::default()
            },
        ]),
    )
}

fn coordinator(projectiles_enabled: bool, seed: u64) -> TowerCoordinator {
    TowerCoordinator::new(
        TowerCatalog::default(),
        CombatConfig {
            projectiles_enabled,
            rng_seed: seed,
            ..CombatConfig::default()
        },
    )
    .with_lanes([lane()])
}

#[test]
fn direct_hits_kill_enemies_in_range() {
    let mut world = world(vec![WorldPoint::new(-3.0, 0.0), WorldPoint::new(6.0, 0.0)]);
    let mut towers = coordinator(false, 1);
    let mut purse = Purse(70);
    let mut events = Vec::new();
    let mut requests = Vec::new();
    let _ = towers
        .try_build_next_tower(TowerType::Archer, &mut purse, &mut events)
        .expect("build");
    let dummy = world.spawn_enemy("dummy", PathId::new(0), &mut events);
    events.clear();

    for _ in 0..30 {
        towers.tick(0.1, &mut world, &mut requests, &mut events);
    }
    world.remove_departed(&mut events);

    assert!(requests.is_empty());
    assert!(world.enemy(dummy).is_none());
    let attacks = events
        .iter()
        .filter(|event| matches!(event, Event::TowerAttacked { .. }))
        .count();
    assert_eq!(attacks, 3);
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::EnemyKilled { enemy, .. } if *enemy == dummy)));
}

#[test]
fn projectile_deliveries_become_requests() {
    let mut world = world(vec![WorldPoint::new(-1.7, 0.0), WorldPoint::new(6.0, 0.0)]);
    let mut towers = coordinator(true, 1);
    let mut purse = Purse(70 + 126);
    let mut events = Vec::new();
    let mut requests = Vec::new();
    let archer = towers
        .try_build_next_tower(TowerType::Archer, &mut purse, &mut events)
        .expect("archer");
    let artillery = towers
        .try_build_next_tower(TowerType::Artillery, &mut purse, &mut events)
        .expect("artillery");
    let dummy = world.spawn_enemy("dummy", PathId::new(0), &mut events);

    towers.tick(0.1, &mut world, &mut requests, &mut events);

    assert_eq!(requests.len(), 2);
    let arrow = &requests[0];
    assert_eq!(arrow.tower, archer);
    assert_eq!(arrow.target, ProjectileTarget::Enemy(dummy));
    assert_eq!(arrow.profile_id, "Archer_Arrow");
    assert!(arrow.can_hit_air);
    assert!((arrow.reacquire_range - 3.2).abs() < 1e-5);

    let shell = &requests[1];
    assert_eq!(shell.tower, artillery);
    assert_eq!(
        shell.target,
        ProjectileTarget::Point(WorldPoint::new(-1.7, 0.0))
    );
    assert!(!shell.can_hit_air);
    assert!(shell.half_penetration);
    assert_eq!(world.enemy(dummy).expect("dummy").health(), 100.0);
}

#[test]
fn barracks_hold_walking_enemies() {
    let mut world = world(lane());
    let mut towers = coordinator(false, 1);
    let mut purse = Purse(77);
    let mut events = Vec::new();
    let mut requests = Vec::new();
    let mut attacks = Vec::new();
    let barracks = towers
        .try_build_next_tower(TowerType::Barracks, &mut purse, &mut events)
        .expect("barracks");
    let walker = world.spawn_enemy("walker", PathId::new(0), &mut events);

    for _ in 0..30 {
        attacks.clear();
        world.advance_enemies(0.1, &mut attacks);
        towers.tick(0.1, &mut world, &mut requests, &mut events);
        towers.handle_enemy_attacks(&attacks, &mut world, &mut events);
    }

    assert!(events.contains(&Event::EnemyBlocked {
        enemy: walker,
        tower: barracks,
    }));
    let enemy = world.enemy(walker).expect("walker");
    assert_eq!(enemy.blocker(), Some(barracks));
    assert!(matches!(
        enemy.motion(),
        EnemyMotion::Blocked | EnemyMotion::Attacking
    ));
    assert!(enemy.health() < 400.0, "soldiers should be fighting");

    let snapshot = &towers.snapshots()[0];
    assert_eq!(snapshot.soldiers.len(), 3);
    assert_eq!(snapshot.blocked, vec![walker]);
}

#[test]
fn selling_barracks_releases_their_enemies() {
    let mut world = world(lane());
    let mut towers = coordinator(false, 1);
    let mut purse = Purse(77);
    let mut events = Vec::new();
    let mut requests = Vec::new();
    let mut attacks = Vec::new();
    let barracks = towers
        .try_build_next_tower(TowerType::Barracks, &mut purse, &mut events)
        .expect("barracks");
    let walker = world.spawn_enemy("walker", PathId::new(0), &mut events);
    for _ in 0..20 {
        world.advance_enemies(0.1, &mut attacks);
        towers.tick(0.1, &mut world, &mut requests, &mut events);
    }
    assert_eq!(
        world.enemy(walker).expect("walker").blocker(),
        Some(barracks)
    );
    events.clear();

    let refund = towers
        .try_sell_tower(barracks, &mut world, &mut purse, &mut events)
        .expect("sell");

    assert_eq!(refund, 46);
    assert!(events.contains(&Event::EnemyReleased {
        enemy: walker,
        tower: barracks,
    }));
    let enemy = world.enemy(walker).expect("walker");
    assert_eq!(enemy.blocker(), None);
    assert_eq!(enemy.motion(), EnemyMotion::Moving);
}

#[test]
fn skill_rolls_replay_deterministically() {
    let first = replay(7);
    let second = replay(7);

    assert_eq!(first, second);
    assert_eq!(fingerprint(&first), fingerprint(&second));
}

fn replay(seed: u64) -> Vec<Event> {
    let mut world = world(lane());
    let mut towers = coordinator(false, seed);
    let mut purse = Purse(10_000);
    let mut events = Vec::new();
    let mut requests = Vec::new();
    let mut attacks = Vec::new();
    for tower_type in [TowerType::Archer, TowerType::Mage, TowerType::Artillery] {
        let id = towers
            .try_build_next_tower(tower_type, &mut purse, &mut events)
            .expect("build");
        let _ = towers
            .try_upgrade_tower(id, &mut purse, &mut events)
            .expect("tier two");
        let _ = towers
            .try_upgrade_tower(id, &mut purse, &mut events)
            .expect("tier three");
    }

    for tick in 0..400u32 {
        if tick % 8 == 0 {
            let _ = world.spawn_enemy("walker", PathId::new(0), &mut events);
        }
        attacks.clear();
        world.advance_enemies(0.05, &mut attacks);
        towers.tick(0.05, &mut world, &mut requests, &mut events);
        world.remove_departed(&mut events);
    }
    events
}

fn fingerprint(events: &[Event]) -> u64 {
    let mut hasher = DefaultHasher::new();
    events.len().hash(&mut hasher);
    for event in events {
        format!("{event:?}").hash(&mut hasher);
    }
    hasher.finish()
}
