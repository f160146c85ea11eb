#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Match phase state machine.
//!
//! The flow moves through `Prepare → WaveReady → WaveRunning → WaveBreak`
//! until the last wave is cleared and `Result` is reached. Timed phases
//! advance from [`CombatFlow::tick`]; `WaveRunning` is only ever left through
//! [`CombatFlow::try_complete_current_wave`], an early call, or
//! [`CombatFlow::force_result`]. `Pause` overlays any phase except `Result`
//! and restores the phase's elapsed time on resume.

use lane_defence_core::{CommandError, Event, FlowState};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Phase durations and wave count.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Seconds spent in `Prepare` before wave one is announced.
    pub prepare_seconds: f32,
    /// Seconds of countdown in `WaveReady`.
    pub wave_ready_seconds: f32,
    /// Seconds of rest in `WaveBreak`.
    pub wave_break_seconds: f32,
    /// Number of waves in the match.
    pub total_waves: u32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            prepare_seconds: 1.0,
            wave_ready_seconds: 3.0,
            wave_break_seconds: 2.0,
            total_waves: 3,
        }
    }
}

/// Outcome of a successful early call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EarlyCall {
    /// A wave started ahead of schedule.
    Started {
        /// Wave that began running.
        wave: u32,
        /// Share of the countdown that was skipped, in `0.0..=1.0`.
        remaining_fraction: f32,
    },
    /// The last wave was running, so the match ended.
    Finished,
}

#[derive(Clone, Copy, Debug)]
struct Suspended {
    state: FlowState,
    elapsed: f32,
}

/// Owner of the match phase and wave counter.
#[derive(Debug)]
pub struct CombatFlow {
    config: FlowConfig,
    state: FlowState,
    current_wave: u32,
    total_waves: u32,
    state_elapsed: f32,
    suspended: Option<Suspended>,
}

impl CombatFlow {
    /// Creates an idle flow using the provided configuration.
    #[must_use]
    pub fn new(config: FlowConfig) -> Self {
        Self {
            config: sanitize(config),
            state: FlowState::Idle,
            current_wave: 0,
            total_waves: config.total_waves.max(1),
            state_elapsed: 0.0,
            suspended: None,
        }
    }

    /// Replaces the number of waves in the match.
    pub fn set_total_waves(&mut self, total_waves: u32) {
        self.total_waves = total_waves.max(1);
    }

    /// Resets the wave counter and enters `Prepare`.
    pub fn start_flow(&mut self, out: &mut Vec<Event>) {
        self.suspended = None;
        self.set_wave(0, out);
        self.enter(FlowState::Prepare, out);
    }

    /// Advances timed phases by `dt` seconds.
    pub fn tick(&mut self, dt: f32, out: &mut Vec<Event>) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }

        match self.state {
            FlowState::Idle | FlowState::Pause => {}
            FlowState::WaveRunning | FlowState::Result => self.state_elapsed += dt,
            FlowState::Prepare => {
                self.state_elapsed += dt;
                if self.state_elapsed >= self.config.prepare_seconds {
                    self.set_wave(1, out);
                    self.enter(FlowState::WaveReady, out);
                }
            }
            FlowState::WaveReady => {
                self.state_elapsed += dt;
                if self.state_elapsed >= self.config.wave_ready_seconds {
                    self.enter(FlowState::WaveRunning, out);
                }
            }
            FlowState::WaveBreak => {
                self.state_elapsed += dt;
                if self.state_elapsed >= self.config.wave_break_seconds {
                    self.set_wave(self.current_wave.saturating_add(1), out);
                    self.enter(FlowState::WaveReady, out);
                }
            }
        }
    }

    /// Leaves `WaveRunning` after the current wave was cleared.
    ///
    /// Enters `Result` after the last wave and `WaveBreak` otherwise. Returns
    /// `false` without effect in any other phase.
    pub fn try_complete_current_wave(&mut self, out: &mut Vec<Event>) -> bool {
        if self.state != FlowState::WaveRunning {
            return false;
        }

        if self.is_last_wave() {
            self.enter(FlowState::Result, out);
        } else {
            self.enter(FlowState::WaveBreak, out);
        }
        true
    }

    /// Starts the pending wave immediately.
    ///
    /// From `WaveReady` the countdown is skipped. From `WaveRunning` the flow
    /// passes through `WaveBreak` into the next wave at once, leaving the
    /// previous wave's enemies in play; on the last wave the match ends.
    pub fn try_early_call_next_wave(
        &mut self,
        out: &mut Vec<Event>,
    ) -> Result<EarlyCall, CommandError> {
        match self.state {
            FlowState::WaveReady => {
                let remaining_fraction = self.wave_ready_remaining_fraction();
                self.enter(FlowState::WaveRunning, out);
                Ok(EarlyCall::Started {
                    wave: self.current_wave,
                    remaining_fraction,
                })
            }
            FlowState::WaveRunning if self.is_last_wave() => {
                self.enter(FlowState::Result, out);
                Ok(EarlyCall::Finished)
            }
            FlowState::WaveRunning => {
                self.enter(FlowState::WaveBreak, out);
                self.set_wave(self.current_wave.saturating_add(1), out);
                self.enter(FlowState::WaveRunning, out);
                Ok(EarlyCall::Started {
                    wave: self.current_wave,
                    remaining_fraction: 1.0,
                })
            }
            state => Err(CommandError::EarlyCallUnavailable(state)),
        }
    }

    /// Freezes the current phase. Pausing twice is a no-op.
    pub fn pause(&mut self, out: &mut Vec<Event>) -> Result<(), CommandError> {
        match self.state {
            FlowState::Pause => Ok(()),
            FlowState::Result | FlowState::Idle => {
                Err(CommandError::PauseUnavailable(self.state))
            }
            state => {
                self.suspended = Some(Suspended {
                    state,
                    elapsed: self.state_elapsed,
                });
                self.enter(FlowState::Pause, out);
                Ok(())
            }
        }
    }

    /// Restores the paused phase and its elapsed time. Resuming while not
    /// paused is a no-op.
    pub fn resume(&mut self, out: &mut Vec<Event>) -> Result<(), CommandError> {
        let Some(suspended) = self.suspended.take() else {
            return Ok(());
        };
        self.enter(suspended.state, out);
        self.state_elapsed = suspended.elapsed;
        Ok(())
    }

    /// Pauses a running match or resumes a paused one.
    pub fn toggle_pause(&mut self, out: &mut Vec<Event>) -> Result<(), CommandError> {
        if self.is_paused() {
            self.resume(out)
        } else {
            self.pause(out)
        }
    }

    /// Ends the match unconditionally.
    pub fn force_result(&mut self, out: &mut Vec<Event>) {
        self.suspended = None;
        if self.state != FlowState::Result {
            self.enter(FlowState::Result, out);
        }
    }

    /// Current phase.
    #[must_use]
    pub fn state(&self) -> FlowState {
        self.state
    }

    /// One-based wave counter; zero before the first wave is announced.
    #[must_use]
    pub fn current_wave(&self) -> u32 {
        self.current_wave
    }

    /// Number of waves in the match.
    #[must_use]
    pub fn total_waves(&self) -> u32 {
        self.total_waves
    }

    /// Reports whether the current wave is the last one.
    #[must_use]
    pub fn is_last_wave(&self) -> bool {
        self.current_wave >= self.total_waves
    }

    /// Reports whether the pause overlay is active.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.state == FlowState::Pause
    }

    /// Reports whether the match has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == FlowState::Result
    }

    /// Seconds spent in the current phase.
    #[must_use]
    pub fn state_elapsed(&self) -> f32 {
        self.state_elapsed
    }

    /// Seconds left on the `WaveReady` countdown, zero in other phases.
    #[must_use]
    pub fn wave_ready_remaining(&self) -> f32 {
        if self.state != FlowState::WaveReady {
            return 0.0;
        }
        (self.config.wave_ready_seconds - self.state_elapsed).max(0.0)
    }

    fn wave_ready_remaining_fraction(&self) -> f32 {
        if self.config.wave_ready_seconds <= 0.0 {
            return 0.0;
        }
        (self.wave_ready_remaining() / self.config.wave_ready_seconds).clamp(0.0, 1.0)
    }

    fn set_wave(&mut self, wave: u32, out: &mut Vec<Event>) {
        if self.current_wave == wave {
            return;
        }
        self.current_wave = wave;
        out.push(Event::WaveChanged {
            wave,
            total: self.total_waves,
        });
    }

    fn enter(&mut self, to: FlowState, out: &mut Vec<Event>) {
        let from = self.state;
        self.state = to;
        self.state_elapsed = 0.0;
        debug!(?from, ?to, wave = self.current_wave, "flow state changed");
        out.push(Event::FlowStateChanged {
            from,
            to,
            wave: self.current_wave,
        });
    }
}

fn sanitize(config: FlowConfig) -> FlowConfig {
    let seconds = |value: f32| if value.is_finite() { value.max(0.0) } else { 0.0 };
    FlowConfig {
        prepare_seconds: seconds(config.prepare_seconds),
        wave_ready_seconds: seconds(config.wave_ready_seconds),
        wave_break_seconds: seconds(config.wave_break_seconds),
        total_waves: config.total_waves.max(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(total_waves: u32) -> (CombatFlow, Vec<Event>) {
        let mut flow = CombatFlow::new(FlowConfig {
            total_waves,
            ..FlowConfig::default()
        });
        let mut events = Vec::new();
        flow.start_flow(&mut events);
        (flow, events)
    }

    #[test]
    fn prepare_timeout_announces_wave_one() {
        let (mut flow, mut events) = started(3);
        events.clear();

        flow.tick(0.5, &mut events);
        assert_eq!(flow.state(), FlowState::Prepare);

        flow.tick(0.5, &mut events);
        assert_eq!(flow.state(), FlowState::WaveReady);
        assert_eq!(flow.current_wave(), 1);
        assert_eq!(
            events,
            vec![
                Event::WaveChanged { wave: 1, total: 3 },
                Event::FlowStateChanged {
                    from: FlowState::Prepare,
                    to: FlowState::WaveReady,
                    wave: 1,
                },
            ]
        );
    }

    #[test]
    fn wave_running_waits_for_completion() {
        let (mut flow, mut events) = started(2);
        flow.tick(1.0, &mut events);
        flow.tick(3.0, &mut events);
        assert_eq!(flow.state(), FlowState::WaveRunning);

        flow.tick(120.0, &mut events);
        assert_eq!(flow.state(), FlowState::WaveRunning);

        assert!(flow.try_complete_current_wave(&mut events));
        assert_eq!(flow.state(), FlowState::WaveBreak);

        flow.tick(2.0, &mut events);
        assert_eq!(flow.state(), FlowState::WaveReady);
        assert_eq!(flow.current_wave(), 2);

        flow.tick(3.0, &mut events);
        assert!(flow.try_complete_current_wave(&mut events));
        assert_eq!(flow.state(), FlowState::Result);
        assert!(!flow.try_complete_current_wave(&mut events));
    }

    #[test]
    fn early_call_from_ready_reports_remaining_fraction() {
        let (mut flow, mut events) = started(3);
        flow.tick(1.0, &mut events);
        flow.tick(0.75, &mut events);

        let call = flow.try_early_call_next_wave(&mut events).expect("call");

        assert_eq!(
            call,
            EarlyCall::Started {
                wave: 1,
                remaining_fraction: 0.75,
            }
        );
        assert_eq!(flow.state(), FlowState::WaveRunning);
    }

    #[test]
    fn early_call_while_running_overlaps_next_wave() {
        let (mut flow, mut events) = started(3);
        flow.tick(1.0, &mut events);
        flow.tick(3.0, &mut events);
        events.clear();

        let call = flow.try_early_call_next_wave(&mut events).expect("call");

        assert_eq!(
            call,
            EarlyCall::Started {
                wave: 2,
                remaining_fraction: 1.0,
            }
        );
        assert_eq!(
            events,
            vec![
                Event::FlowStateChanged {
                    from: FlowState::WaveRunning,
                    to: FlowState::WaveBreak,
                    wave: 1,
                },
                Event::WaveChanged { wave: 2, total: 3 },
                Event::FlowStateChanged {
                    from: FlowState::WaveBreak,
                    to: FlowState::WaveRunning,
                    wave: 2,
                },
            ]
        );
    }

    #[test]
    fn early_call_on_last_wave_ends_match() {
        let (mut flow, mut events) = started(1);
        flow.tick(1.0, &mut events);
        flow.tick(3.0, &mut events);

        let call = flow.try_early_call_next_wave(&mut events).expect("call");

        assert_eq!(call, EarlyCall::Finished);
        assert_eq!(flow.state(), FlowState::Result);
    }

    #[test]
    fn early_call_is_rejected_outside_ready_and_running() {
        let (mut flow, mut events) = started(3);
        events.clear();

        let error = flow.try_early_call_next_wave(&mut events).unwrap_err();

        assert_eq!(error, CommandError::EarlyCallUnavailable(FlowState::Prepare));
        assert!(events.is_empty());
    }

    #[test]
    fn pause_restores_state_and_elapsed_time() {
        let (mut flow, mut events) = started(3);
        flow.tick(1.0, &mut events);
        flow.tick(1.25, &mut events);

        flow.pause(&mut events).expect("pause");
        flow.pause(&mut events).expect("second pause is a no-op");
        flow.tick(10.0, &mut events);
        assert_eq!(flow.state(), FlowState::Pause);

        flow.resume(&mut events).expect("resume");
        assert_eq!(flow.state(), FlowState::WaveReady);
        assert_eq!(flow.state_elapsed(), 1.25);
        assert_eq!(flow.wave_ready_remaining(), 1.75);
    }

    #[test]
    fn pause_is_rejected_after_result() {
        let (mut flow, mut events) = started(3);
        flow.force_result(&mut events);

        assert_eq!(
            flow.pause(&mut events),
            Err(CommandError::PauseUnavailable(FlowState::Result))
        );
        assert_eq!(flow.resume(&mut events), Ok(()));
        assert_eq!(flow.state(), FlowState::Result);
    }

    #[test]
    fn toggle_pause_round_trips() {
        let (mut flow, mut events) = started(3);

        flow.toggle_pause(&mut events).expect("pause");
        assert!(flow.is_paused());
        flow.toggle_pause(&mut events).expect("resume");
        assert_eq!(flow.state(), FlowState::Prepare);
    }
}
