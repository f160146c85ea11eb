#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawn scheduler that turns wave scripts into spawn requests.
//!
//! Each started wave becomes an explicit schedule that walks its entries in
//! order: wait the entry's delay, then alternate between spawning one enemy
//! and waiting the entry's interval until the entry's count is exhausted.
//! After the last entry the wave reports completion. Several schedules may
//! run at once when waves overlap.

use std::time::Duration;

use lane_defence_core::{PathId, SpawnEntry, WaveDefinition};
use tracing::debug;

/// Shortest permitted gap between two spawns of the same entry.
pub const MIN_SPAWN_INTERVAL: Duration = Duration::from_millis(50);

const MAX_WAIT_SECONDS: f32 = 3_600.0;

/// Enemy the simulation should create.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpawnRequest {
    /// Wave the enemy belongs to.
    pub wave: u32,
    /// Enemy definition to spawn.
    pub enemy_id: String,
    /// Path the enemy follows.
    pub path: PathId,
}

/// Output of a scheduler tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpawnOutput {
    /// One enemy is due.
    Spawn(SpawnRequest),
    /// A wave has spawned every enemy in its script.
    Completed {
        /// Wave that finished spawning.
        wave: u32,
    },
}

/// Scheduler driving every wave that is still spawning.
#[derive(Debug, Default)]
pub struct SpawnScheduler {
    schedules: Vec<WaveSchedule>,
}

impl SpawnScheduler {
    /// Creates a scheduler with no waves in flight.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins spawning `definition` as wave `wave`.
    ///
    /// Returns `false` if the wave is already being spawned.
    pub fn start_wave(&mut self, wave: u32, definition: &WaveDefinition) -> bool {
        if self.is_spawning(wave) {
            return false;
        }
        debug!(wave, entries = definition.entries.len(), "wave schedule started");
        self.schedules
            .push(WaveSchedule::new(wave, definition.entries.clone()));
        true
    }

    /// Advances every schedule by `dt`, emitting due spawns and completions.
    pub fn tick(&mut self, dt: Duration, out: &mut Vec<SpawnOutput>) {
        self.schedules
            .retain_mut(|schedule| !schedule.advance(dt, out));
    }

    /// Reports whether wave `wave` is still spawning.
    #[must_use]
    pub fn is_spawning(&self, wave: u32) -> bool {
        self.schedules.iter().any(|schedule| schedule.wave == wave)
    }

    /// Number of waves still spawning.
    #[must_use]
    pub fn active_waves(&self) -> usize {
        self.schedules.len()
    }

    /// Abandons every schedule.
    pub fn clear(&mut self) {
        self.schedules.clear();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Wait,
    Spawn,
}

#[derive(Debug)]
struct WaveSchedule {
    wave: u32,
    entries: Vec<SpawnEntry>,
    entry_index: usize,
    remaining: u32,
    step: Step,
    countdown: Duration,
}

impl WaveSchedule {
    fn new(wave: u32, entries: Vec<SpawnEntry>) -> Self {
        let mut schedule = Self {
            wave,
            entries,
            entry_index: 0,
            remaining: 0,
            step: Step::Spawn,
            countdown: Duration::ZERO,
        };
        if !schedule.entries.is_empty() {
            schedule.begin_entry(0);
        }
        schedule
    }

    fn begin_entry(&mut self, index: usize) {
        let entry = &self.entries[index];
        self.entry_index = index;
        self.remaining = entry.count;
        self.countdown = seconds(entry.delay);
        self.step = Step::Wait;
    }

    /// Returns `true` once the schedule has finished.
    fn advance(&mut self, dt: Duration, out: &mut Vec<SpawnOutput>) -> bool {
        let mut budget = dt;
        loop {
            match self.step {
                Step::Wait => {
                    if self.countdown > budget {
                        self.countdown -= budget;
                        return false;
                    }
                    budget -= self.countdown;
                    self.countdown = Duration::ZERO;
                    self.step = Step::Spawn;
                }
                Step::Spawn if self.remaining == 0 => {
                    let next = self.entry_index + 1;
                    if next >= self.entries.len() {
                        out.push(SpawnOutput::Completed { wave: self.wave });
                        return true;
                    }
                    self.begin_entry(next);
                }
                Step::Spawn => {
                    let entry = &self.entries[self.entry_index];
                    out.push(SpawnOutput::Spawn(SpawnRequest {
                        wave: self.wave,
                        enemy_id: entry.enemy_id.clone(),
                        path: entry.path,
                    }));
                    self.remaining -= 1;
                    self.countdown = seconds(entry.interval).max(MIN_SPAWN_INTERVAL);
                    self.step = Step::Wait;
                }
            }
        }
    }
}

fn seconds(value: f32) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f32(value.min(MAX_WAIT_SECONDS))
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(enemy_id: &str, count: u32, interval: f32, delay: f32) -> SpawnEntry {
        SpawnEntry {
            enemy_id: enemy_id.to_owned(),
            count,
            interval,
            delay,
            path: PathId::new(0),
        }
    }

    fn spawned(out: &[SpawnOutput]) -> Vec<&str> {
        out.iter()
            .filter_map(|output| match output {
                SpawnOutput::Spawn(request) => Some(request.enemy_id.as_str()),
                SpawnOutput::Completed { .. } => None,
            })
            .collect()
    }

    #[test]
    fn first_spawn_is_immediate_without_delay() {
        let mut scheduler = SpawnScheduler::new();
        let wave = WaveDefinition {
            entries: vec![entry("wolf", 3, 0.75, 0.0)],
            ..WaveDefinition::default()
        };
        assert!(scheduler.start_wave(1, &wave));

        let mut out = Vec::new();
        scheduler.tick(Duration::ZERO, &mut out);

        assert_eq!(spawned(&out), vec!["wolf"]);
    }

    #[test]
    fn entries_run_in_order_with_their_delays() {
        let mut scheduler = SpawnScheduler::new();
        let wave = WaveDefinition {
            entries: vec![entry("wolf", 2, 0.5, 0.0), entry("ogre", 1, 1.0, 2.0)],
            ..WaveDefinition::default()
        };
        let _ = scheduler.start_wave(1, &wave);
        let mut out = Vec::new();

        scheduler.tick(Duration::from_millis(500), &mut out);
        assert_eq!(spawned(&out), vec!["wolf", "wolf"]);

        out.clear();
        scheduler.tick(Duration::from_millis(2_000), &mut out);
        assert!(spawned(&out).is_empty());

        scheduler.tick(Duration::from_millis(500), &mut out);
        assert_eq!(spawned(&out), vec!["ogre"]);
        assert!(scheduler.is_spawning(1));

        out.clear();
        scheduler.tick(Duration::from_millis(1_000), &mut out);
        assert_eq!(out, vec![SpawnOutput::Completed { wave: 1 }]);
        assert!(!scheduler.is_spawning(1));
    }

    #[test]
    fn intervals_are_clamped_to_minimum() {
        let mut scheduler = SpawnScheduler::new();
        let wave = WaveDefinition {
            entries: vec![entry("bat", 10, 0.0, 0.0)],
            ..WaveDefinition::default()
        };
        let _ = scheduler.start_wave(1, &wave);

        let mut out = Vec::new();
        scheduler.tick(Duration::from_millis(100), &mut out);

        assert_eq!(spawned(&out).len(), 3);
    }

    #[test]
    fn empty_waves_complete_on_first_tick() {
        let mut scheduler = SpawnScheduler::new();
        let _ = scheduler.start_wave(4, &WaveDefinition::default());

        let mut out = Vec::new();
        scheduler.tick(Duration::ZERO, &mut out);

        assert_eq!(out, vec![SpawnOutput::Completed { wave: 4 }]);
        assert_eq!(scheduler.active_waves(), 0);
    }

    #[test]
    fn starting_the_same_wave_twice_is_ignored() {
        let mut scheduler = SpawnScheduler::new();
        let wave = WaveDefinition::fallback();

        assert!(scheduler.start_wave(2, &wave));
        assert!(!scheduler.start_wave(2, &wave));
        assert!(scheduler.start_wave(3, &wave));
        assert_eq!(scheduler.active_waves(), 2);
    }
}
