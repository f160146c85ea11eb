use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    time::Duration,
};

use lane_defence_core::{Event, PathId, SpawnEntry, WaveDefinition};
use lane_defence_system_spawning::{SpawnOutput, SpawnScheduler};
use lane_defence_world::{query, EnemyCatalog, PathTable, World};

fn mixed_wave() -> WaveDefinition {
    WaveDefinition {
        entries: vec![
            SpawnEntry {
                enemy_id: "wolf".to_owned(),
                count: 4,
                interval: 0.5,
                delay: 0.0,
                path: PathId::new(0),
            },
            SpawnEntry {
                enemy_id: "ogre".to_owned(),
                count: 2,
                interval: 1.25,
                delay: 1.0,
                path: PathId::new(1),
            },
        ],
        early_call_bonus: 0,
        boss_wave: false,
    }
}

#[test]
fn emits_multiple_spawns_for_large_dt() {
    let mut world = World::new(PathTable::default(), EnemyCatalog::default());
    let mut scheduler = SpawnScheduler::new();
    assert!(scheduler.start_wave(1, &mixed_wave()));

    let mut outputs = Vec::new();
    scheduler.tick(Duration::from_secs(2), &mut outputs);

    let mut events = Vec::new();
    for output in &outputs {
        if let SpawnOutput::Spawn(request) = output {
            let _ = world.spawn_enemy(&request.enemy_id, request.path, &mut events);
        }
    }

    assert_eq!(query::active_enemy_count(&world), 4, "one spawn per interval");
    assert!(events
        .iter()
        .all(|event| matches!(event, Event::EnemySpawned { definition, .. } if definition == "wolf")));
}

#[test]
fn overlapping_waves_spawn_independently() {
    let mut scheduler = SpawnScheduler::new();
    let _ = scheduler.start_wave(1, &mixed_wave());
    let _ = scheduler.start_wave(2, &WaveDefinition::fallback());

    let mut outputs = Vec::new();
    for _ in 0..100 {
        scheduler.tick(Duration::from_millis(100), &mut outputs);
    }

    let count = |wave: u32| {
        outputs
            .iter()
            .filter(|output| matches!(output, SpawnOutput::Spawn(request) if request.wave == wave))
            .count()
    };
    assert_eq!(count(1), 6);
    assert_eq!(count(2), 3);
    assert!(outputs.contains(&SpawnOutput::Completed { wave: 1 }));
    assert!(outputs.contains(&SpawnOutput::Completed { wave: 2 }));
    assert_eq!(scheduler.active_waves(), 0);
}

#[test]
fn replay_is_deterministic_across_tick_sizes() {
    let coarse = replay(Duration::from_millis(250), 40);
    let fine = replay(Duration::from_millis(50), 200);

    assert_eq!(coarse.fingerprint(), fine.fingerprint());
    assert_eq!(coarse.spawns.len(), 6);
}

fn replay(dt: Duration, ticks: usize) -> ReplayOutcome {
    let mut scheduler = SpawnScheduler::new();
    let _ = scheduler.start_wave(1, &mixed_wave());
    let mut spawns = Vec::new();
    let mut outputs = Vec::new();

    for _ in 0..ticks {
        scheduler.tick(dt, &mut outputs);
        for output in outputs.drain(..) {
            if let SpawnOutput::Spawn(request) = output {
                spawns.push((request.enemy_id, request.path.get()));
            }
        }
    }

    ReplayOutcome { spawns }
}

struct ReplayOutcome {
    spawns: Vec<(String, u32)>,
}

impl ReplayOutcome {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.spawns.len().hash(&mut hasher);
        for spawn in &self.spawns {
            spawn.hash(&mut hasher);
        }
        hasher.finish()
    }
}
