#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a lane defence match without a renderer.

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use lane_defence_core::{
    ConfigProvider, Event, FlowState, MetaUpgradeTiers, NoContent, StageId, TowerType,
};
use lane_defence_simulation::{Simulation, SimulationConfig, StaticContent};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Runs a headless lane defence match and prints a summary.
#[derive(Debug, Parser)]
#[command(name = "lane-defence", version)]
struct Cli {
    /// TOML content manifest. Built-in defaults are used when omitted.
    #[arg(long)]
    content: Option<PathBuf>,
    /// TOML simulation configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Stage to play, overriding the configuration.
    #[arg(long)]
    stage: Option<u32>,
    /// Seed for tower skill rolls, overriding the configuration.
    #[arg(long)]
    seed: Option<u64>,
    /// Fixed simulation step in milliseconds.
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u64).range(1..))]
    step_ms: u64,
    /// Steps to run before the match is abandoned.
    #[arg(long, default_value_t = 12_000)]
    max_steps: u32,
    /// Towers to build before the match starts, in slot order.
    #[arg(long = "build", value_enum)]
    builds: Vec<TowerArg>,
    /// Upgrades attempted on every tower right after it is built.
    #[arg(long, default_value_t = 0)]
    upgrades: u32,
    /// Call every wave as soon as its countdown begins.
    #[arg(long)]
    early_call: bool,
    /// Print every event as it is raised.
    #[arg(long)]
    events: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum TowerArg {
    Archer,
    Barracks,
    Mage,
    Artillery,
}

impl From<TowerArg> for TowerType {
    fn from(value: TowerArg) -> Self {
        match value {
            TowerArg::Archer => TowerType::Archer,
            TowerArg::Barracks => TowerType::Barracks,
            TowerArg::Mage => TowerType::Mage,
            TowerArg::Artillery => TowerType::Artillery,
        }
    }
}

/// Running totals printed once the match ends.
#[derive(Debug, Default, PartialEq, Eq)]
struct Tally {
    kills: u32,
    escapes: u32,
    waves_cleared: u32,
    early_call_gold: u32,
    soldiers_lost: u32,
}

impl Tally {
    fn record(&mut self, event: &Event) {
        match event {
            Event::EnemyKilled { .. } => self.kills += 1,
            Event::EnemyReachedGoal { .. } => self.escapes += 1,
            Event::WaveCleared { .. } => self.waves_cleared += 1,
            Event::EarlyCalled { reward, .. } => self.early_call_gold += reward,
            Event::SoldierDied { .. } => self.soldiers_lost += 1,
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let content = cli
        .content
        .as_ref()
        .map(|path| {
            StaticContent::load(path)
                .with_context(|| format!("failed to load content from {}", path.display()))
        })
        .transpose()?;
    let meta = content
        .as_ref()
        .map_or_else(MetaUpgradeTiers::default, |content| *content.meta());
    let provider: &dyn ConfigProvider = match &content {
        Some(content) => content,
        None => &NoContent,
    };

    let mut simulation = Simulation::new(config, provider, &meta);
    let mut tally = Tally::default();
    build_towers(&mut simulation, &cli, &mut tally);

    simulation.start();
    let step = Duration::from_millis(cli.step_ms);
    let mut steps = 0;
    while steps < cli.max_steps && !simulation.is_finished() {
        if cli.early_call && simulation.flow_state() == FlowState::WaveReady {
            let seen = simulation.recent_events().len();
            if simulation.try_early_call_next_wave().is_ok() {
                record(&mut tally, &simulation.recent_events()[seen..], cli.events);
            }
        }
        let events = simulation.tick(step);
        record(&mut tally, events, cli.events);
        steps += 1;
    }

    if !simulation.is_finished() {
        warn!(steps, "match did not finish before the step limit");
    }
    info!(steps, "run complete");

    println!(
        "{:?} at wave {}/{}: gold {}, lives {}",
        simulation.flow_state(),
        simulation.current_wave(),
        simulation.total_waves(),
        simulation.gold(),
        simulation.lives()
    );
    println!(
        "kills {}, escapes {}, waves cleared {}, early-call gold {}, soldiers lost {}",
        tally.kills, tally.escapes, tally.waves_cleared, tally.early_call_gold, tally.soldiers_lost
    );
    Ok(())
}

fn load_config(cli: &Cli) -> Result<SimulationConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read configuration at {}", path.display()))?;
            SimulationConfig::from_toml_str(&contents)
                .with_context(|| format!("failed to parse configuration at {}", path.display()))?
        }
        None => SimulationConfig::default(),
    };
    if let Some(stage) = cli.stage {
        config.stage = StageId::new(stage);
    }
    if let Some(seed) = cli.seed {
        config.combat.rng_seed = seed;
    }
    Ok(config)
}

fn build_towers(simulation: &mut Simulation, cli: &Cli, tally: &mut Tally) {
    let seen = simulation.recent_events().len();
    for &build in &cli.builds {
        let tower_type = TowerType::from(build);
        let tower = match simulation.try_build_next_tower(tower_type) {
            Ok(tower) => tower,
            Err(error) => {
                warn!(?tower_type, %error, "build skipped");
                continue;
            }
        };
        for _ in 0..cli.upgrades {
            if let Err(error) = simulation.try_upgrade_tower(tower) {
                warn!(?tower_type, %error, "upgrade skipped");
                break;
            }
        }
    }
    record(tally, &simulation.recent_events()[seen..], cli.events);
}

fn record(tally: &mut Tally, events: &[Event], print: bool) {
    for event in events {
        tally.record(event);
        if print {
            println!("{event:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_parse_into_builds_and_overrides() {
        let cli = Cli::try_parse_from([
            "lane-defence",
            "--build",
            "archer",
            "--build",
            "barracks",
            "--seed",
            "9",
            "--upgrades",
            "2",
        ])
        .expect("arguments");

        assert_eq!(cli.builds, vec![TowerArg::Archer, TowerArg::Barracks]);
        assert_eq!(cli.upgrades, 2);
        assert_eq!(cli.step_ms, 50);

        let config = load_config(&cli).expect("config");
        assert_eq!(config.combat.rng_seed, 9);
        assert_eq!(config.stage, StageId::new(1));
    }

    #[test]
    fn zero_step_is_rejected() {
        assert!(Cli::try_parse_from(["lane-defence", "--step-ms", "0"]).is_err());
    }

    #[test]
    fn bundled_stage_plays_to_a_result() {
        let content = StaticContent::from_toml_str(include_str!("../content/stage_one.toml"))
            .expect("bundled content");
        let mut simulation = Simulation::new(SimulationConfig::default(), &content, content.meta());
        for tower_type in [TowerType::Archer, TowerType::Barracks, TowerType::Mage] {
            let _ = simulation.try_build_next_tower(tower_type).expect("build");
        }
        assert_eq!(simulation.total_waves(), 4);

        simulation.start();
        let mut tally = Tally::default();
        for _ in 0..20_000 {
            record(&mut tally, simulation.tick(Duration::from_millis(50)), false);
            if simulation.is_finished() {
                break;
            }
        }

        assert!(simulation.is_finished());
        assert!(tally.kills > 0);
    }
}
