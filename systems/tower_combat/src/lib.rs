#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Tower placement, economy gating and combat.
//!
//! [`TowerCoordinator`] owns the build slots and every placed tower. Ranged
//! towers pick the nearest eligible enemy, roll their tier-three skills and
//! either strike immediately or queue a [`ProjectileRequest`]. Barracks field
//! a squad of soldiers that hold enemies in place through the enemy's
//! mutual-exclusion lock.

mod barracks;
mod levels;
mod skills;
mod soldier;
mod tower;

use std::collections::{BTreeMap, BTreeSet};

use lane_defence_core::{
    BuildError, DeathBurst, EconomySink, EnemyId, Event, ProjectileRequest, RallyError, SellError,
    SlotIndex, SoldierId, SoldierState, TowerId, TowerType, UpgradeError, WorldPoint,
};
use lane_defence_world::{EnemyAttack, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use levels::{
    apply_meta_upgrades, default_definition, normalize_levels, TowerCatalog, MAX_SQUAD_SIZE,
};
pub use skills::SkillConfig;

use tower::{AttackContext, Tower};

/// Build slots used when none are configured.
pub const DEFAULT_SLOTS: [WorldPoint; 3] = [
    WorldPoint::new(-3.0, -1.4),
    WorldPoint::new(-0.4, -1.3),
    WorldPoint::new(2.2, -1.2),
];

/// Tunables of the tower combat system.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Launch projectiles for projectile deliveries. When disabled every
    /// attack lands immediately.
    pub projectiles_enabled: bool,
    /// Seed of the skill proc generator.
    pub rng_seed: u64,
    /// Build slot positions. Empty selects [`DEFAULT_SLOTS`].
    pub slots: Vec<WorldPoint>,
    /// Tier-three skill tuning.
    pub skills: SkillConfig,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            projectiles_enabled: true,
            rng_seed: 0,
            slots: Vec::new(),
            skills: SkillConfig::default(),
        }
    }
}

/// Information needed to present upgrade and sell actions for a tower.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TowerActionInfo {
    /// Tower described.
    pub tower: TowerId,
    /// Type of the tower.
    pub tower_type: TowerType,
    /// Current one-based level.
    pub level: u32,
    /// Highest reachable level.
    pub max_level: u32,
    /// Cost of the next level, `None` at the maximum level.
    pub upgrade_cost: Option<u32>,
    /// Gold returned when selling.
    pub sell_refund: u32,
}

/// Read-only view of a barracks soldier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SoldierSnapshot {
    /// Identifier of the soldier.
    pub id: SoldierId,
    /// Current position.
    pub position: WorldPoint,
    /// Remaining health.
    pub health: f32,
    /// Lifecycle state.
    pub state: SoldierState,
    /// Enemy the soldier holds.
    pub target: Option<EnemyId>,
}

/// Read-only view of a placed tower.
#[derive(Clone, Debug, PartialEq)]
pub struct TowerSnapshot {
    /// Identifier of the tower.
    pub id: TowerId,
    /// Type of the tower.
    pub tower_type: TowerType,
    /// Slot the tower occupies.
    pub slot: SlotIndex,
    /// Position of the tower.
    pub position: WorldPoint,
    /// Current one-based level.
    pub level: u32,
    /// Gold spent on building and upgrades.
    pub total_spend: u32,
    /// Seconds until the next attack.
    pub cooldown: f32,
    /// Rally point, for barracks.
    pub rally: Option<WorldPoint>,
    /// Squad members, for barracks.
    pub soldiers: Vec<SoldierSnapshot>,
    /// Enemies held by the squad.
    pub blocked: Vec<EnemyId>,
}

/// Registry of build slots and placed towers.
#[derive(Debug)]
pub struct TowerCoordinator {
    catalog: TowerCatalog,
    config: CombatConfig,
    slots: Vec<WorldPoint>,
    free_slots: BTreeSet<SlotIndex>,
    lanes: Vec<Vec<WorldPoint>>,
    towers: BTreeMap<TowerId, Tower>,
    next_tower: u32,
    next_soldier: u32,
    rng: ChaCha8Rng,
}

impl TowerCoordinator {
    /// Creates a coordinator with every configured slot free.
    #[must_use]
    pub fn new(catalog: TowerCatalog, config: CombatConfig) -> Self {
        let slots = if config.slots.is_empty() {
            DEFAULT_SLOTS.to_vec()
        } else {
            config.slots.clone()
        };
        let free_slots = (0..slots.len())
            .filter_map(|index| u32::try_from(index).ok())
            .map(SlotIndex::new)
            .collect();
        Self {
            catalog,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            config,
            slots,
            free_slots,
            lanes: Vec::new(),
            towers: BTreeMap::new(),
            next_tower: 0,
            next_soldier: 0,
        }
    }

    /// Lanes used to place the initial rally point of new barracks.
    #[must_use]
    pub fn with_lanes(mut self, lanes: impl IntoIterator<Item = Vec<WorldPoint>>) -> Self {
        self.lanes = lanes.into_iter().filter(|lane| lane.len() >= 2).collect();
        self
    }

    /// Normalised tower definitions in use.
    #[must_use]
    pub fn catalog(&self) -> &TowerCatalog {
        &self.catalog
    }

    /// Position of a build slot.
    #[must_use]
    pub fn slot_position(&self, slot: SlotIndex) -> Option<WorldPoint> {
        self.slots.get(usize::try_from(slot.get()).ok()?).copied()
    }

    /// Number of build slots.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Free slots in ascending order.
    pub fn free_slots(&self) -> impl Iterator<Item = SlotIndex> + '_ {
        self.free_slots.iter().copied()
    }

    /// Number of placed towers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.towers.len()
    }

    /// Reports whether no tower is placed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.towers.is_empty()
    }

    /// Checks whether a tower could be built with `gold` on hand.
    ///
    /// `slot` selects a specific slot; `None` picks the first free slot.
    /// Returns the slot the tower would occupy.
    pub fn can_build(
        &self,
        tower_type: TowerType,
        slot: Option<SlotIndex>,
        gold: u32,
    ) -> Result<SlotIndex, BuildError> {
        let slot = match slot {
            Some(slot) if self.free_slots.contains(&slot) => slot,
            Some(slot) => return Err(BuildError::SlotUnavailable(slot)),
            None => self
                .free_slots
                .first()
                .copied()
                .ok_or(BuildError::NoFreeSlot)?,
        };
        let required = self.catalog.definition(tower_type).build_cost();
        if gold < required {
            return Err(BuildError::InsufficientGold {
                required,
                available: gold,
            });
        }
        Ok(slot)
    }

    /// Builds a tower at a specific slot.
    pub fn try_build_tower_at_slot(
        &mut self,
        tower_type: TowerType,
        slot: SlotIndex,
        economy: &mut dyn EconomySink,
        out: &mut Vec<Event>,
    ) -> Result<TowerId, BuildError> {
        self.build(tower_type, Some(slot), economy, out)
    }

    /// Builds a tower at the first free slot.
    pub fn try_build_next_tower(
        &mut self,
        tower_type: TowerType,
        economy: &mut dyn EconomySink,
        out: &mut Vec<Event>,
    ) -> Result<TowerId, BuildError> {
        self.build(tower_type, None, economy, out)
    }

    fn build(
        &mut self,
        tower_type: TowerType,
        slot: Option<SlotIndex>,
        economy: &mut dyn EconomySink,
        out: &mut Vec<Event>,
    ) -> Result<TowerId, BuildError> {
        let slot = self.can_build(tower_type, slot, economy.gold())?;
        let position = self
            .slot_position(slot)
            .ok_or(BuildError::SlotUnavailable(slot))?;
        let definition = self.catalog.definition(tower_type);
        let cost = definition.build_cost();
        if !economy.try_spend_gold(cost) {
            return Err(BuildError::InsufficientGold {
                required: cost,
                available: economy.gold(),
            });
        }

        let rally = tower::nearest_lane_point(&self.lanes, position)
            .map_or(position, |point| {
                point.clamped_around(position, tower::rally_radius(definition))
            });
        let id = TowerId::new(self.next_tower);
        self.next_tower = self.next_tower.saturating_add(1);
        let _ = self.free_slots.remove(&slot);
        let _ = self
            .towers
            .insert(id, Tower::new(id, slot, tower_type, position, cost, rally));

        debug!(tower = id.get(), ?tower_type, slot = slot.get(), cost, "tower built");
        out.push(Event::TowerBuilt {
            tower: id,
            tower_type,
            slot,
            cost,
        });
        Ok(id)
    }

    /// Raises a tower by one level. Returns the new level.
    pub fn try_upgrade_tower(
        &mut self,
        tower: TowerId,
        economy: &mut dyn EconomySink,
        out: &mut Vec<Event>,
    ) -> Result<u32, UpgradeError> {
        let entry = self
            .towers
            .get_mut(&tower)
            .ok_or(UpgradeError::MissingTower(tower))?;
        let definition = self.catalog.definition(entry.tower_type);
        let next = entry.level + 1;
        let cost = definition
            .level(next)
            .ok_or(UpgradeError::MaxLevel)?
            .cost
            .max(1);
        if !economy.try_spend_gold(cost) {
            return Err(UpgradeError::InsufficientGold {
                required: cost,
                available: economy.gold(),
            });
        }

        entry.level = next;
        entry.total_spend = entry.total_spend.saturating_add(cost);
        debug!(tower = tower.get(), level = next, cost, "tower upgraded");
        out.push(Event::TowerUpgraded {
            tower,
            level: next,
            cost,
        });
        Ok(next)
    }

    /// Removes a tower, refunds part of its cost and frees its slot.
    /// Returns the refund.
    pub fn try_sell_tower(
        &mut self,
        tower: TowerId,
        world: &mut World,
        economy: &mut dyn EconomySink,
        out: &mut Vec<Event>,
    ) -> Result<u32, SellError> {
        let mut entry = self
            .towers
            .remove(&tower)
            .ok_or(SellError::MissingTower(tower))?;

        if let Some(squad) = entry.squad.as_mut() {
            squad.disband(tower, world, out);
        }
        for enemy in world.enemies_mut() {
            if enemy.blocker() == Some(tower) && enemy.release_block(Some(tower)) {
                out.push(Event::EnemyReleased {
                    enemy: enemy.id(),
                    tower,
                });
            }
        }

        let refund = entry.sell_refund();
        economy.add_gold(refund);
        let _ = self.free_slots.insert(entry.slot);
        debug!(tower = tower.get(), refund, "tower sold");
        out.push(Event::TowerSold {
            tower,
            slot: entry.slot,
            refund,
        });
        Ok(refund)
    }

    /// Moves a barracks rally point, clamped to its rally range. Returns the
    /// point actually used.
    pub fn try_set_rally_point(
        &mut self,
        tower: TowerId,
        point: WorldPoint,
        out: &mut Vec<Event>,
    ) -> Result<WorldPoint, RallyError> {
        let entry = self
            .towers
            .get_mut(&tower)
            .ok_or(RallyError::MissingTower(tower))?;
        if entry.tower_type != TowerType::Barracks {
            return Err(RallyError::NotBarracks(tower));
        }

        let radius = tower::rally_radius(self.catalog.definition(TowerType::Barracks));
        let point = point.clamped_around(entry.position, radius);
        entry.rally = point;
        out.push(Event::RallyPointMoved { tower, point });
        Ok(point)
    }

    /// Level, upgrade cost and sell refund of a tower.
    #[must_use]
    pub fn action_info(&self, tower: TowerId) -> Option<TowerActionInfo> {
        let entry = self.towers.get(&tower)?;
        let definition = self.catalog.definition(entry.tower_type);
        Some(TowerActionInfo {
            tower,
            tower_type: entry.tower_type,
            level: entry.level,
            max_level: definition.max_level(),
            upgrade_cost: definition
                .level(entry.level + 1)
                .map(|level| level.cost.max(1)),
            sell_refund: entry.sell_refund(),
        })
    }

    /// Captures every tower in identifier order.
    #[must_use]
    pub fn snapshots(&self) -> Vec<TowerSnapshot> {
        self.towers
            .values()
            .map(|tower| {
                let (soldiers, blocked) = tower.squad.as_ref().map_or_else(
                    || (Vec::new(), Vec::new()),
                    |squad| {
                        let soldiers = squad
                            .soldiers()
                            .iter()
                            .map(|soldier| SoldierSnapshot {
                                id: soldier.id(),
                                position: soldier.position(),
                                health: soldier.health(),
                                state: soldier.state(),
                                target: soldier.target(),
                            })
                            .collect();
                        (soldiers, squad.blocked_enemies().collect())
                    },
                );
                TowerSnapshot {
                    id: tower.id,
                    tower_type: tower.tower_type,
                    slot: tower.slot,
                    position: tower.position,
                    level: tower.level,
                    total_spend: tower.total_spend,
                    cooldown: tower.cooldown.max(0.0),
                    rally: tower.squad.is_some().then_some(tower.rally),
                    soldiers,
                    blocked,
                }
            })
            .collect()
    }

    /// Advances every tower by `dt` seconds.
    ///
    /// Direct hits are applied to `world` immediately; projectile attacks are
    /// appended to `requests` for the projectile simulator.
    pub fn tick(
        &mut self,
        dt: f32,
        world: &mut World,
        requests: &mut Vec<ProjectileRequest>,
        out: &mut Vec<Event>,
    ) {
        let Self {
            catalog,
            config,
            towers,
            next_soldier,
            rng,
            ..
        } = self;
        let mut context = AttackContext {
            rng,
            skills: &config.skills,
            projectiles_enabled: config.projectiles_enabled,
        };

        for tower in towers.values_mut() {
            let definition = catalog.definition(tower.tower_type);
            if tower.tower_type == TowerType::Barracks {
                tower.tick_barracks(dt, definition, &config.skills, next_soldier, world, out);
            } else {
                tower.tick_ranged(dt, definition, &mut context, world, requests, out);
            }
        }
    }

    /// Routes attacks of blocked enemies to the soldiers holding them.
    pub fn handle_enemy_attacks(
        &mut self,
        attacks: &[EnemyAttack],
        world: &mut World,
        out: &mut Vec<Event>,
    ) {
        for attack in attacks {
            let squad = self
                .towers
                .get_mut(&attack.tower)
                .and_then(|tower| tower.squad.as_mut());
            match squad {
                Some(squad) => {
                    squad.absorb_attack(attack.tower, attack.enemy, attack.damage, world, out);
                }
                None => {
                    let released = world
                        .enemy_mut(attack.enemy)
                        .is_some_and(|enemy| enemy.release_block(Some(attack.tower)));
                    if released {
                        out.push(Event::EnemyReleased {
                            enemy: attack.enemy,
                            tower: attack.tower,
                        });
                    }
                }
            }
        }
    }

    /// Damages soldiers caught in an enemy's death burst.
    pub fn apply_death_burst(
        &mut self,
        position: WorldPoint,
        burst: DeathBurst,
        world: &mut World,
        out: &mut Vec<Event>,
    ) {
        for tower in self.towers.values_mut() {
            let id = tower.id;
            if let Some(squad) = tower.squad.as_mut() {
                squad.absorb_burst(id, position, burst.radius, burst.damage, world, out);
            }
        }
    }

    /// Drops every reference to an enemy that left the world.
    pub fn forget_enemy(&mut self, enemy: EnemyId) {
        for tower in self.towers.values_mut() {
            if let Some(squad) = tower.squad.as_mut() {
                squad.forget_enemy(enemy);
            }
        }
    }
}
