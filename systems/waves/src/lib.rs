#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Bridges the match flow to the spawn scheduler and declares wave clears.

mod content;

use std::collections::BTreeSet;

use lane_defence_core::{Event, FlowState, StageDefinition, WaveDefinition};
use lane_defence_system_spawning::SpawnScheduler;
use tracing::{info, warn};

pub use content::{referenced_enemies, referenced_paths, resolve_stage};

/// Requests the coordinator makes of the flow state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaveSignal {
    /// The current wave is clear; the flow should leave `WaveRunning`.
    WaveCleared {
        /// Wave that was cleared.
        wave: u32,
    },
    /// Wave content is missing; the match must end.
    ForceResult,
}

/// Tracks living enemies and spawn progress to detect cleared waves.
#[derive(Debug)]
pub struct WaveCoordinator {
    waves: Vec<WaveDefinition>,
    started_wave: Option<u32>,
    cleared_wave: Option<u32>,
    spawning: BTreeSet<u32>,
    alive: u32,
}

impl WaveCoordinator {
    /// Creates a coordinator for the stage's waves.
    #[must_use]
    pub fn new(stage: &StageDefinition) -> Self {
        Self {
            waves: stage.waves.clone(),
            started_wave: None,
            cleared_wave: None,
            spawning: BTreeSet::new(),
            alive: 0,
        }
    }

    /// Number of waves in the stage.
    #[must_use]
    pub fn wave_count(&self) -> u32 {
        u32::try_from(self.waves.len()).unwrap_or(u32::MAX)
    }

    /// Definition of a one-based wave.
    #[must_use]
    pub fn wave(&self, wave: u32) -> Option<&WaveDefinition> {
        let index = usize::try_from(wave.checked_sub(1)?).ok()?;
        self.waves.get(index)
    }

    /// Enemies spawned and not yet killed or escaped.
    #[must_use]
    pub fn alive_count(&self) -> u32 {
        self.alive
    }

    /// Most recently started wave.
    #[must_use]
    pub fn started_wave(&self) -> Option<u32> {
        self.started_wave
    }

    /// Consumes simulation events, starting spawns on `WaveRunning` entry and
    /// raising a signal once the current wave is clear.
    pub fn handle(
        &mut self,
        events: &[Event],
        scheduler: &mut SpawnScheduler,
        out_events: &mut Vec<Event>,
        out_signals: &mut Vec<WaveSignal>,
    ) {
        for event in events {
            match event {
                Event::FlowStateChanged {
                    to: FlowState::WaveRunning,
                    wave,
                    ..
                } => self.start_wave(*wave, scheduler, out_events, out_signals),
                Event::FlowStateChanged {
                    to: FlowState::Prepare | FlowState::Result,
                    ..
                } => {
                    self.started_wave = None;
                    self.cleared_wave = None;
                    self.spawning.clear();
                    scheduler.clear();
                }
                Event::EnemySpawned { .. } => self.alive = self.alive.saturating_add(1),
                Event::EnemyKilled { .. } | Event::EnemyReachedGoal { .. } => {
                    self.alive = self.alive.saturating_sub(1);
                }
                Event::WaveSpawnCompleted { wave } => {
                    let _ = self.spawning.remove(wave);
                }
                _ => {}
            }
        }

        let Some(wave) = self.started_wave else {
            return;
        };
        if self.spawning.is_empty() && self.alive == 0 && self.cleared_wave != Some(wave) {
            self.cleared_wave = Some(wave);
            info!(wave, "wave cleared");
            out_events.push(Event::WaveCleared { wave });
            out_signals.push(WaveSignal::WaveCleared { wave });
        }
    }

    fn start_wave(
        &mut self,
        wave: u32,
        scheduler: &mut SpawnScheduler,
        out_events: &mut Vec<Event>,
        out_signals: &mut Vec<WaveSignal>,
    ) {
        if self.started_wave == Some(wave) {
            return;
        }

        let Some(definition) = self.wave(wave) else {
            warn!(wave, waves = self.waves.len(), "wave index out of range, ending match");
            out_signals.push(WaveSignal::ForceResult);
            return;
        };

        let enemies = definition.enemy_count();
        let _ = scheduler.start_wave(wave, definition);
        self.started_wave = Some(wave);
        let _ = self.spawning.insert(wave);
        info!(wave, enemies, "wave started");
        out_events.push(Event::WaveStarted { wave, enemies });
    }
}
