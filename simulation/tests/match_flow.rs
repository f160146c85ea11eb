use std::{
    cell::RefCell,
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
    rc::Rc,
    time::Duration,
};

use lane_defence_core::{
    BuildError, Command, CommandError, Event, FlowState, MetaUpgradeTiers, StageId, TowerType,
    WorldPoint,
};
use lane_defence_simulation::{Simulation, SimulationConfig, StaticContent};
use lane_defence_system_flow::FlowConfig;
use lane_defence_system_tower_combat::CombatConfig;

const STEP: Duration = Duration::from_millis(50);

fn content(enemy: &str, lives: u32, waves: &str) -> StaticContent {
    StaticContent::from_toml_str(&format!(
        r#"
version = 1

[[enemies]]
{enemy}

[[stages]]
id = 1
initial_gold = 100
initial_lives = {lives}
waves = [{waves}]

[[paths]]
id = 0
points = [{{ x = -6.0, y = 0.0 }}, {{ x = 6.0, y = 0.0 }}]
"#
    ))
    .expect("content")
}

fn slug_content() -> StaticContent {
    content(
        r#"id = "slug"
health = 30.0
move_speed = 0.5
bounty = 5"#,
        20,
        r#"{ entries = [{ enemy_id = "slug", count = 3, interval = 0.75 }] }"#,
    )
}

fn config(prepare_seconds: f32, wave_ready_seconds: f32) -> SimulationConfig {
    SimulationConfig {
        stage: StageId::new(1),
        flow: FlowConfig {
            prepare_seconds,
            wave_ready_seconds,
            wave_break_seconds: 0.1,
            total_waves: 1,
        },
        combat: CombatConfig {
            projectiles_enabled: false,
            ..CombatConfig::default()
        },
    }
}

fn simulation(content: &StaticContent, config: SimulationConfig) -> Simulation {
    Simulation::new(config, content, &MetaUpgradeTiers::default())
}

fn run(simulation: &mut Simulation, ticks: u32, log: &mut Vec<Event>) {
    for _ in 0..ticks {
        log.extend_from_slice(simulation.tick(STEP));
    }
}

#[test]
fn wave_clears_once_after_the_last_kill() {
    let content = slug_content();
    let mut simulation = simulation(&content, config(0.1, 0.1));
    let _ = simulation
        .try_build_next_tower(TowerType::Archer)
        .expect("archer");
    simulation.start();

    let mut log = Vec::new();
    run(&mut simulation, 400, &mut log);

    let clears: Vec<usize> = log
        .iter()
        .enumerate()
        .filter(|(_, event)| matches!(event, Event::WaveCleared { wave: 1 }))
        .map(|(index, _)| index)
        .collect();
    let kills: Vec<usize> = log
        .iter()
        .enumerate()
        .filter(|(_, event)| matches!(event, Event::EnemyKilled { .. }))
        .map(|(index, _)| index)
        .collect();
    assert_eq!(kills.len(), 3);
    assert_eq!(clears.len(), 1);
    assert!(clears[0] > kills[2]);

    assert_eq!(simulation.flow_state(), FlowState::Result);
    assert_eq!(simulation.alive_count(), 0);
    assert_eq!(simulation.gold(), 100 - 70 + 3 * 5);
    assert_eq!(simulation.lives(), 20);
}

#[test]
fn failed_builds_leave_gold_untouched() {
    let content = slug_content();
    let mut simulation = simulation(&content, config(0.1, 0.1));

    let _ = simulation
        .try_build_next_tower(TowerType::Archer)
        .expect("archer");
    assert_eq!(simulation.gold(), 30);

    let error = simulation
        .try_build_next_tower(TowerType::Mage)
        .expect_err("too expensive");
    assert_eq!(
        error,
        BuildError::InsufficientGold {
            required: 98,
            available: 30,
        }
    );
    assert_eq!(simulation.gold(), 30);
    assert_eq!(simulation.tower_snapshots().len(), 1);

    let rejected = simulation.apply(Command::BuildTower {
        tower_type: TowerType::Artillery,
        slot: None,
    });
    assert!(matches!(rejected, Err(CommandError::Build(_))));
    assert!(matches!(
        simulation.recent_events().last(),
        Some(Event::CommandRejected { .. })
    ));
    assert_eq!(simulation.gold(), 30);
}

#[test]
fn selling_refunds_sixty_percent() {
    let content = slug_content();
    let mut simulation = simulation(&content, config(0.1, 0.1));
    let archer = simulation
        .try_build_next_tower(TowerType::Archer)
        .expect("archer");
    assert_eq!(
        simulation.action_info(archer).map(|info| info.sell_refund),
        Some(42)
    );

    let refund = simulation.try_sell_tower(archer).expect("sell");

    assert_eq!(refund, 42);
    assert_eq!(simulation.gold(), 100 - 70 + 42);
    assert!(simulation.tower_snapshots().is_empty());
    assert!(simulation.try_sell_tower(archer).is_err());
}

#[test]
fn pausing_freezes_every_phase() {
    let content = slug_content();
    let mut simulation = simulation(&content, config(0.1, 0.1));
    simulation.start();

    let mut log = Vec::new();
    while simulation.world().enemies().count() < 2 {
        run(&mut simulation, 1, &mut log);
    }
    simulation.pause().expect("pause");
    assert_eq!(simulation.flow_state(), FlowState::Pause);
    let positions: Vec<WorldPoint> = simulation
        .world()
        .enemies()
        .map(|enemy| enemy.position())
        .collect();

    for _ in 0..40 {
        assert!(simulation.tick(STEP).is_empty());
    }

    let frozen: Vec<WorldPoint> = simulation
        .world()
        .enemies()
        .map(|enemy| enemy.position())
        .collect();
    assert_eq!(positions, frozen);

    simulation.resume().expect("resume");
    assert_eq!(simulation.flow_state(), FlowState::WaveRunning);
    let _ = simulation.tick(STEP);
    assert_ne!(
        simulation.world().enemies().next().map(|enemy| enemy.position()),
        positions.first().copied()
    );
}

#[test]
fn losing_the_last_life_ends_the_match() {
    let content = content(
        r#"id = "runner"
move_speed = 10.0
damage_to_base = 1"#,
        2,
        r#"{ entries = [{ enemy_id = "runner", count = 3, interval = 0.75 }] }"#,
    );
    let mut simulation = simulation(&content, config(0.1, 0.1));
    simulation.start();

    let mut log = Vec::new();
    run(&mut simulation, 200, &mut log);

    let depleted = log
        .iter()
        .filter(|event| matches!(event, Event::LivesDepleted))
        .count();
    assert_eq!(depleted, 1);
    assert_eq!(simulation.lives(), 0);
    assert_eq!(simulation.flow_state(), FlowState::Result);
    assert!(!log
        .iter()
        .any(|event| matches!(event, Event::WaveCleared { .. })));
}

#[test]
fn early_calls_pay_for_the_skipped_countdown() {
    let content = content(
        r#"id = "slug"
move_speed = 0.5"#,
        20,
        r#"{ entries = [{ enemy_id = "slug", count = 1 }], early_call_bonus = 20 },
{ entries = [{ enemy_id = "slug", count = 1 }], early_call_bonus = 8 }"#,
    );
    let mut simulation = simulation(&content, config(0.5, 4.0));
    simulation.start();
    assert!(matches!(
        simulation.try_early_call_next_wave(),
        Err(CommandError::EarlyCallUnavailable(FlowState::Prepare))
    ));

    for _ in 0..3 {
        let _ = simulation.tick(Duration::from_millis(500));
    }
    assert_eq!(simulation.flow_state(), FlowState::WaveReady);
    assert_eq!(simulation.wave_ready_remaining(), 3.0);

    let reward = simulation.try_early_call_next_wave().expect("early call");
    assert_eq!(reward, 15);
    assert_eq!(simulation.gold(), 115);
    assert_eq!(simulation.flow_state(), FlowState::WaveRunning);
    assert!(simulation
        .recent_events()
        .contains(&Event::EarlyCalled { wave: 1, reward: 15 }));
    assert!(simulation
        .recent_events()
        .iter()
        .any(|event| matches!(event, Event::WaveStarted { wave: 1, .. })));

    let reward = simulation.try_early_call_next_wave().expect("overlap");
    assert_eq!(reward, 8);
    assert_eq!(simulation.current_wave(), 2);
    assert_eq!(simulation.gold(), 123);
}

#[test]
fn matches_replay_deterministically() {
    let (first_log, first_sink) = replay(11);
    let (second_log, second_sink) = replay(11);

    assert!(!first_log.is_empty());
    assert_eq!(first_log, second_log);
    assert_eq!(fingerprint(&first_log), fingerprint(&second_log));
    assert_eq!(first_sink, second_sink);
    assert!(first_sink.ends_with(&first_log));
}

fn replay(seed: u64) -> (Vec<Event>, Vec<Event>) {
    let content = StaticContent::from_toml_str(
        r#"
version = 1

[[enemies]]
id = "brute"
health = 260.0
move_speed = 0.9
bounty = 12
death_burst = { radius = 0.8, damage = 15.0 }

[[enemies]]
id = "bat"
flying = true
health = 80.0
move_speed = 1.6

[[stages]]
id = 1
initial_gold = 5000
initial_lives = 50
waves = [
    { entries = [{ enemy_id = "brute", count = 6, interval = 0.6 }, { enemy_id = "bat", count = 4, interval = 0.4 }] },
    { entries = [{ enemy_id = "brute", count = 8, interval = 0.5 }] },
]

[[paths]]
id = 0
points = [{ x = -6.0, y = 0.0 }, { x = 0.0, y = 0.4 }, { x = 6.0, y = 0.0 }]
"#,
    )
    .expect("content");
    let config = SimulationConfig {
        stage: StageId::new(1),
        flow: FlowConfig {
            prepare_seconds: 0.2,
            wave_ready_seconds: 0.5,
            wave_break_seconds: 0.5,
            total_waves: 2,
        },
        combat: CombatConfig {
            rng_seed: seed,
            ..CombatConfig::default()
        },
    };
    let mut simulation = Simulation::new(config, &content, &MetaUpgradeTiers::default());
    let sink = Rc::new(RefCell::new(Vec::<Event>::new()));
    let _ = simulation.subscribe(Box::new(Rc::clone(&sink)));

    for tower_type in [TowerType::Barracks, TowerType::Mage, TowerType::Artillery] {
        let tower = simulation.try_build_next_tower(tower_type).expect("build");
        let _ = simulation.try_upgrade_tower(tower).expect("tier two");
        let _ = simulation.try_upgrade_tower(tower).expect("tier three");
    }
    simulation.start();

    let mut log = Vec::new();
    for _ in 0..1500 {
        log.extend_from_slice(simulation.tick(Duration::from_millis(20)));
    }

    let collected = sink.borrow().clone();
    (log, collected)
}

fn fingerprint(events: &[Event]) -> u64 {
    let mut hasher = DefaultHasher::new();
    events.len().hash(&mut hasher);
    for event in events {
        format!("{event:?}").hash(&mut hasher);
    }
    hasher.finish()
}
