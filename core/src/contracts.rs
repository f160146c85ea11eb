//! Narrow interfaces through which the combat core talks to its collaborators.

use std::{cell::RefCell, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::{
    EnemyDefinition, Event, PathId, ProjectileProfile, StageDefinition, StageId,
    TowerDefinition, TowerType, WorldPoint,
};

/// Supplies static content. Any lookup may come back empty; the core then
/// substitutes a synthetic default and logs a warning.
pub trait ConfigProvider {
    /// Definition of a tower type.
    fn tower_definition(&self, tower_type: TowerType) -> Option<TowerDefinition>;

    /// Definition of a stage, including its waves.
    fn stage_definition(&self, stage: StageId) -> Option<StageDefinition>;

    /// Definition of an enemy archetype.
    fn enemy_definition(&self, id: &str) -> Option<EnemyDefinition>;

    /// Ordered waypoints of a path.
    fn path(&self, path: PathId) -> Option<Vec<WorldPoint>>;

    /// Flight profile of a projectile.
    fn projectile_profile(&self, id: &str) -> Option<ProjectileProfile>;
}

/// Provider that has no content at all, forcing every default.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoContent;

impl ConfigProvider for NoContent {
    fn tower_definition(&self, _tower_type: TowerType) -> Option<TowerDefinition> {
        None
    }

    fn stage_definition(&self, _stage: StageId) -> Option<StageDefinition> {
        None
    }

    fn enemy_definition(&self, _id: &str) -> Option<EnemyDefinition> {
        None
    }

    fn path(&self, _path: PathId) -> Option<Vec<WorldPoint>> {
        None
    }

    fn projectile_profile(&self, _id: &str) -> Option<ProjectileProfile> {
        None
    }
}

/// Reports purchased meta-progression tiers per tower category.
pub trait MetaUpgradeProvider {
    /// Number of upgrade tiers owned for the tower type.
    fn upgrade_tiers(&self, tower_type: TowerType) -> u32;
}

/// Fixed per-type tier counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaUpgradeTiers {
    /// Tiers owned for archer towers.
    pub archer: u32,
    /// Tiers owned for barracks towers.
    pub barracks: u32,
    /// Tiers owned for mage towers.
    pub mage: u32,
    /// Tiers owned for artillery towers.
    pub artillery: u32,
}

impl MetaUpgradeTiers {
    /// Creates a table with no tiers owned.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the table with `tiers` recorded for `tower_type`.
    #[must_use]
    pub fn with(mut self, tower_type: TowerType, tiers: u32) -> Self {
        *self.slot_mut(tower_type) = tiers;
        self
    }

    fn slot_mut(&mut self, tower_type: TowerType) -> &mut u32 {
        match tower_type {
            TowerType::Archer => &mut self.archer,
            TowerType::Barracks => &mut self.barracks,
            TowerType::Mage => &mut self.mage,
            TowerType::Artillery => &mut self.artillery,
        }
    }
}

impl MetaUpgradeProvider for MetaUpgradeTiers {
    fn upgrade_tiers(&self, tower_type: TowerType) -> u32 {
        match tower_type {
            TowerType::Archer => self.archer,
            TowerType::Barracks => self.barracks,
            TowerType::Mage => self.mage,
            TowerType::Artillery => self.artillery,
        }
    }
}

/// Owner of match gold and lives.
pub trait EconomySink {
    /// Gold currently available.
    fn gold(&self) -> u32;

    /// Lives currently remaining.
    fn lives(&self) -> u32;

    /// Deducts `amount` if affordable. Returns `false` and leaves gold
    /// untouched otherwise.
    fn try_spend_gold(&mut self, amount: u32) -> bool;

    /// Adds `amount` gold.
    fn add_gold(&mut self, amount: u32);

    /// Removes up to `amount` lives.
    fn damage_lives(&mut self, amount: u32);
}

/// Receives events published by the simulation.
pub trait EventSink {
    /// Observes a single event.
    fn on_event(&mut self, event: &Event);
}

impl EventSink for Vec<Event> {
    fn on_event(&mut self, event: &Event) {
        self.push(event.clone());
    }
}

/// Shared sinks let the subscriber keep a handle to what it collected.
impl<T: EventSink + ?Sized> EventSink for Rc<RefCell<T>> {
    fn on_event(&mut self, event: &Event) {
        self.borrow_mut().on_event(event);
    }
}
