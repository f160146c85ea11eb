#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Single-threaded match loop tying every combat system together.
//!
//! [`Simulation::tick`] runs a fixed phase order: flow, spawns, enemy
//! movement, towers, projectiles, then departures and economy. Wave
//! bookkeeping is pumped after the flow phase and again after departures so
//! that clears and forced results land in the same tick that caused them.
//! While the match is paused only the flow machine is consulted.

mod bus;
mod config;
mod content;
mod economy;

use std::time::Duration;

use lane_defence_core::{
    BuildError, Command, CommandError, ConfigProvider, DeathBurst, EconomySink, EnemyId,
    EventSink, Event, FlowState, MetaUpgradeProvider, ProjectileRequest, RallyError, SellError,
    SlotIndex, TowerId, TowerType, UpgradeError, WorldPoint,
};
use lane_defence_system_flow::{CombatFlow, EarlyCall};
use lane_defence_system_projectiles::{ProjectileProfiles, ProjectileSimulator, ProjectileSnapshot};
use lane_defence_system_spawning::{SpawnOutput, SpawnScheduler};
use lane_defence_system_tower_combat::{
    TowerActionInfo, TowerCatalog, TowerCoordinator, TowerSnapshot,
};
use lane_defence_system_waves::{
    referenced_enemies, referenced_paths, resolve_stage, WaveCoordinator, WaveSignal,
};
use lane_defence_world::{EnemyAttack, EnemyCatalog, PathTable, World};
use tracing::{info, warn};

pub use bus::{EventBus, SubscriberId};
pub use config::SimulationConfig;
pub use content::{ContentError, StaticContent, SUPPORTED_CONTENT_VERSION};
pub use economy::Treasury;

enum Departure {
    Killed {
        enemy: EnemyId,
        bounty: u32,
        position: WorldPoint,
        death_burst: Option<DeathBurst>,
    },
    Escaped {
        enemy: EnemyId,
        damage_to_base: u32,
    },
}

/// A complete match: flow, waves, enemies, towers, projectiles and economy.
pub struct Simulation {
    flow: CombatFlow,
    scheduler: SpawnScheduler,
    waves: WaveCoordinator,
    world: World,
    towers: TowerCoordinator,
    projectiles: ProjectileSimulator,
    economy: Box<dyn EconomySink>,
    bus: EventBus,
    lives_depleted: bool,
    events: Vec<Event>,
    wave_cursor: usize,
    published: usize,
    wave_events: Vec<Event>,
    signals: Vec<WaveSignal>,
    spawns: Vec<SpawnOutput>,
    attacks: Vec<EnemyAttack>,
    requests: Vec<ProjectileRequest>,
    departures: Vec<Departure>,
}

impl Simulation {
    /// Builds a match from configuration and content.
    ///
    /// Missing content never fails construction: absent stages, enemies,
    /// paths, towers and projectile profiles are replaced by defaults and
    /// reported through `tracing`.
    #[must_use]
    pub fn new(
        config: SimulationConfig,
        content: &dyn ConfigProvider,
        meta: &dyn MetaUpgradeProvider,
    ) -> Self {
        let stage = resolve_stage(content, config.stage, config.flow.total_waves);
        let waves = WaveCoordinator::new(&stage);

        let mut flow = CombatFlow::new(config.flow);
        flow.set_total_waves(waves.wave_count());

        let path_ids = referenced_paths(&stage);
        let paths = PathTable::new(path_ids.iter().filter_map(|&id| match content.path(id) {
            Some(points) => Some((id, points)),
            None => {
                warn!(path = id.get(), "path missing from content, using default lane");
                None
            }
        }));
        let lanes: Vec<Vec<WorldPoint>> = path_ids
            .iter()
            .map(|&id| paths.resolve(id).to_vec())
            .collect();

        let enemies = EnemyCatalog::new(referenced_enemies(&stage).into_iter().filter_map(|id| {
            let definition = content.enemy_definition(&id);
            if definition.is_none() {
                warn!(enemy = %id, "enemy missing from content, using default enemy");
            }
            definition
        }));

        let catalog = TowerCatalog::resolve(content, meta);
        let profiles = ProjectileProfiles::from_provider(content, catalog.projectile_profile_ids());
        let towers = TowerCoordinator::new(catalog, config.combat).with_lanes(lanes);

        info!(
            stage = stage.id.get(),
            waves = waves.wave_count(),
            gold = stage.initial_gold,
            lives = stage.initial_lives,
            "match created"
        );

        Self {
            flow,
            scheduler: SpawnScheduler::new(),
            waves,
            world: World::new(paths, enemies),
            towers,
            projectiles: ProjectileSimulator::new(profiles),
            economy: Box::new(Treasury::new(stage.initial_gold, stage.initial_lives)),
            bus: EventBus::default(),
            lives_depleted: false,
            events: Vec::new(),
            wave_cursor: 0,
            published: 0,
            wave_events: Vec::new(),
            signals: Vec::new(),
            spawns: Vec::new(),
            attacks: Vec::new(),
            requests: Vec::new(),
            departures: Vec::new(),
        }
    }

    /// Replaces the built-in [`Treasury`] with an external economy.
    #[must_use]
    pub fn with_economy(mut self, economy: Box<dyn EconomySink>) -> Self {
        self.economy = economy;
        self
    }

    /// Registers an event subscriber.
    pub fn subscribe(&mut self, sink: Box<dyn EventSink>) -> SubscriberId {
        self.bus.subscribe(sink)
    }

    /// Removes an event subscriber. Returns `false` if the id was unknown.
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Enters `Prepare` and resets the wave counter.
    pub fn start(&mut self) {
        self.begin_frame();
        self.flow.start_flow(&mut self.events);
        self.settle();
    }

    /// Advances the match by `dt` and returns the events raised.
    pub fn tick(&mut self, dt: Duration) -> &[Event] {
        self.begin_frame();
        let seconds = dt.as_secs_f32();

        self.flow.tick(seconds, &mut self.events);
        self.pump_waves();

        if !self.combat_active() {
            self.settle();
            return &self.events;
        }

        self.spawns.clear();
        self.scheduler.tick(dt, &mut self.spawns);
        for output in self.spawns.drain(..) {
            match output {
                SpawnOutput::Spawn(request) => {
                    let _ = self
                        .world
                        .spawn_enemy(&request.enemy_id, request.path, &mut self.events);
                }
                SpawnOutput::Completed { wave } => {
                    self.events.push(Event::WaveSpawnCompleted { wave });
                }
            }
        }

        self.attacks.clear();
        self.world.advance_enemies(seconds, &mut self.attacks);

        self.towers
            .tick(seconds, &mut self.world, &mut self.requests, &mut self.events);
        self.towers
            .handle_enemy_attacks(&self.attacks, &mut self.world, &mut self.events);
        for request in self.requests.drain(..) {
            let _ = self.projectiles.launch(request, &mut self.events);
        }

        self.projectiles.tick(seconds, &mut self.world);

        self.collect_departures();
        self.settle();
        &self.events
    }

    /// Builds a tower at a specific slot.
    pub fn try_build_tower_at_slot(
        &mut self,
        tower_type: TowerType,
        slot: SlotIndex,
    ) -> Result<TowerId, BuildError> {
        let result = self.towers.try_build_tower_at_slot(
            tower_type,
            slot,
            self.economy.as_mut(),
            &mut self.events,
        );
        self.settle();
        result
    }

    /// Builds a tower at the first free slot.
    pub fn try_build_next_tower(&mut self, tower_type: TowerType) -> Result<TowerId, BuildError> {
        let result =
            self.towers
                .try_build_next_tower(tower_type, self.economy.as_mut(), &mut self.events);
        self.settle();
        result
    }

    /// Upgrades a tower by one level and returns its new level.
    pub fn try_upgrade_tower(&mut self, tower: TowerId) -> Result<u32, UpgradeError> {
        let result = self
            .towers
            .try_upgrade_tower(tower, self.economy.as_mut(), &mut self.events);
        self.settle();
        result
    }

    /// Sells a tower and returns the refund.
    pub fn try_sell_tower(&mut self, tower: TowerId) -> Result<u32, SellError> {
        let result = self.towers.try_sell_tower(
            tower,
            &mut self.world,
            self.economy.as_mut(),
            &mut self.events,
        );
        self.settle();
        result
    }

    /// Moves a barracks rally point and returns the clamped point.
    pub fn try_set_rally_point(
        &mut self,
        tower: TowerId,
        point: WorldPoint,
    ) -> Result<WorldPoint, RallyError> {
        let result = self
            .towers
            .try_set_rally_point(tower, point, &mut self.events);
        self.settle();
        result
    }

    /// Starts the next wave now and returns the gold awarded for it.
    pub fn try_early_call_next_wave(&mut self) -> Result<u32, CommandError> {
        let call = self.flow.try_early_call_next_wave(&mut self.events);
        let reward = call.map(|call| match call {
            EarlyCall::Started {
                wave,
                remaining_fraction,
            } => {
                let bonus = self.waves.wave(wave).map_or(0, |wave| wave.early_call_bonus);
                let reward = early_call_reward(bonus, remaining_fraction);
                self.economy.add_gold(reward);
                info!(wave, reward, "wave called early");
                self.events.push(Event::EarlyCalled { wave, reward });
                reward
            }
            EarlyCall::Finished => 0,
        });
        self.settle();
        reward
    }

    /// Freezes the match.
    pub fn pause(&mut self) -> Result<(), CommandError> {
        let result = self.flow.pause(&mut self.events);
        self.settle();
        result
    }

    /// Unfreezes the match.
    pub fn resume(&mut self) -> Result<(), CommandError> {
        let result = self.flow.resume(&mut self.events);
        self.settle();
        result
    }

    /// Pauses a running match or resumes a paused one.
    pub fn toggle_pause(&mut self) -> Result<(), CommandError> {
        let result = self.flow.toggle_pause(&mut self.events);
        self.settle();
        result
    }

    /// Executes a command, announcing a rejection as
    /// [`Event::CommandRejected`].
    pub fn apply(&mut self, command: Command) -> Result<(), CommandError> {
        let result = match command {
            Command::BuildTower {
                tower_type,
                slot: Some(slot),
            } => self
                .try_build_tower_at_slot(tower_type, slot)
                .map(|_| ())
                .map_err(CommandError::from),
            Command::BuildTower {
                tower_type,
                slot: None,
            } => self
                .try_build_next_tower(tower_type)
                .map(|_| ())
                .map_err(CommandError::from),
            Command::UpgradeTower { tower } => self
                .try_upgrade_tower(tower)
                .map(|_| ())
                .map_err(CommandError::from),
            Command::SellTower { tower } => self
                .try_sell_tower(tower)
                .map(|_| ())
                .map_err(CommandError::from),
            Command::SetRallyPoint { tower, point } => self
                .try_set_rally_point(tower, point)
                .map(|_| ())
                .map_err(CommandError::from),
            Command::EarlyCallNextWave => self.try_early_call_next_wave().map(|_| ()),
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
        };

        if let Err(reason) = &result {
            warn!(%reason, "command rejected");
            self.events.push(Event::CommandRejected {
                reason: *reason,
            });
            self.settle();
        }
        result
    }

    /// Current match phase.
    #[must_use]
    pub fn flow_state(&self) -> FlowState {
        self.flow.state()
    }

    /// One-based wave counter; zero before the first wave.
    #[must_use]
    pub fn current_wave(&self) -> u32 {
        self.flow.current_wave()
    }

    /// Number of waves in the stage.
    #[must_use]
    pub fn total_waves(&self) -> u32 {
        self.flow.total_waves()
    }

    /// Seconds left before the pending wave starts on its own.
    #[must_use]
    pub fn wave_ready_remaining(&self) -> f32 {
        self.flow.wave_ready_remaining()
    }

    /// Reports whether the match reached `Result`.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.flow.is_finished()
    }

    /// Gold on hand.
    #[must_use]
    pub fn gold(&self) -> u32 {
        self.economy.gold()
    }

    /// Lives left.
    #[must_use]
    pub fn lives(&self) -> u32 {
        self.economy.lives()
    }

    /// Enemies spawned and not yet killed or escaped.
    #[must_use]
    pub fn alive_count(&self) -> u32 {
        self.waves.alive_count()
    }

    /// Read-only enemy store.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Checks whether a tower could be built right now.
    pub fn can_build(
        &self,
        tower_type: TowerType,
        slot: Option<SlotIndex>,
    ) -> Result<SlotIndex, BuildError> {
        self.towers.can_build(tower_type, slot, self.economy.gold())
    }

    /// Upgrade and sell figures for a placed tower.
    #[must_use]
    pub fn action_info(&self, tower: TowerId) -> Option<TowerActionInfo> {
        self.towers.action_info(tower)
    }

    /// Snapshot of every placed tower.
    #[must_use]
    pub fn tower_snapshots(&self) -> Vec<TowerSnapshot> {
        self.towers.snapshots()
    }

    /// Snapshot of every projectile in flight.
    #[must_use]
    pub fn projectile_snapshots(&self) -> Vec<ProjectileSnapshot> {
        self.projectiles.snapshots()
    }

    /// Events raised since the last tick began, including later commands.
    #[must_use]
    pub fn recent_events(&self) -> &[Event] {
        &self.events
    }

    fn combat_active(&self) -> bool {
        !matches!(
            self.flow.state(),
            FlowState::Idle | FlowState::Pause | FlowState::Result
        )
    }

    fn begin_frame(&mut self) {
        self.events.clear();
        self.wave_cursor = 0;
        self.published = 0;
    }

    fn settle(&mut self) {
        self.pump_waves();
        self.bus.publish(&self.events[self.published..]);
        self.published = self.events.len();
    }

    fn pump_waves(&mut self) {
        while self.wave_cursor < self.events.len() {
            let start = self.wave_cursor;
            self.wave_cursor = self.events.len();

            self.wave_events.clear();
            self.signals.clear();
            self.waves.handle(
                &self.events[start..],
                &mut self.scheduler,
                &mut self.wave_events,
                &mut self.signals,
            );
            self.events.append(&mut self.wave_events);

            for signal in self.signals.drain(..) {
                match signal {
                    WaveSignal::WaveCleared { .. } => {
                        let _ = self.flow.try_complete_current_wave(&mut self.events);
                    }
                    WaveSignal::ForceResult => self.flow.force_result(&mut self.events),
                }
            }
        }
    }

    fn collect_departures(&mut self) {
        loop {
            let start = self.events.len();
            self.world.remove_departed(&mut self.events);
            if self.events.len() == start {
                return;
            }

            self.departures.clear();
            self.departures
                .extend(self.events[start..].iter().filter_map(|event| match *event {
                    Event::EnemyKilled {
                        enemy,
                        bounty,
                        position,
                        death_burst,
                    } => Some(Departure::Killed {
                        enemy,
                        bounty,
                        position,
                        death_burst,
                    }),
                    Event::EnemyReachedGoal {
                        enemy,
                        damage_to_base,
                    } => Some(Departure::Escaped {
                        enemy,
                        damage_to_base,
                    }),
                    _ => None,
                }));

            let mut departures = std::mem::take(&mut self.departures);
            for departure in departures.drain(..) {
                match departure {
                    Departure::Killed {
                        enemy,
                        bounty,
                        position,
                        death_burst,
                    } => {
                        self.economy.add_gold(bounty);
                        self.towers.forget_enemy(enemy);
                        if let Some(burst) = death_burst {
                            self.towers.apply_death_burst(
                                position,
                                burst,
                                &mut self.world,
                                &mut self.events,
                            );
                        }
                    }
                    Departure::Escaped {
                        enemy,
                        damage_to_base,
                    } => {
                        self.economy.damage_lives(damage_to_base.max(1));
                        self.towers.forget_enemy(enemy);
                        if self.economy.lives() == 0 && !self.lives_depleted {
                            self.lives_depleted = true;
                            info!("lives depleted, ending match");
                            self.events.push(Event::LivesDepleted);
                            self.flow.force_result(&mut self.events);
                        }
                    }
                }
            }
            self.departures = departures;
        }
    }
}

fn early_call_reward(bonus: u32, remaining_fraction: f32) -> u32 {
    let fraction = f64::from(remaining_fraction.clamp(0.0, 1.0));
    (f64::from(bonus) * fraction).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_defence_core::{MetaUpgradeTiers, NoContent};

    #[test]
    fn missing_content_falls_back_to_default_stage() {
        let mut simulation = Simulation::new(
            SimulationConfig::default(),
            &NoContent,
            &MetaUpgradeTiers::default(),
        );

        assert_eq!(simulation.total_waves(), 3);
        assert_eq!(simulation.gold(), 100);
        assert_eq!(simulation.lives(), 20);
        assert_eq!(simulation.flow_state(), FlowState::Idle);
        assert!(simulation.tick(Duration::from_millis(50)).is_empty());

        simulation.start();
        assert_eq!(simulation.flow_state(), FlowState::Prepare);
    }

    #[test]
    fn early_call_reward_scales_with_the_skipped_countdown() {
        assert_eq!(early_call_reward(20, 1.0), 20);
        assert_eq!(early_call_reward(20, 0.75), 15);
        assert_eq!(early_call_reward(7, 0.5), 4);
        assert_eq!(early_call_reward(20, 0.0), 0);
    }
}
