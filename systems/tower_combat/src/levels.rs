//! Tower level tables: defaults, meta upgrades and normalisation.

use lane_defence_core::{
    BarracksProfile, ConfigProvider, DamageType, DeliveryType, MetaUpgradeProvider, TargetType,
    TowerDefinition, TowerLevelDefinition, TowerType,
};
use tracing::warn;

/// Largest squad a barracks may field.
pub const MAX_SQUAD_SIZE: u32 = 6;

const DEFAULT_LEVELS: u32 = 3;
const BASE_COST: f32 = 70.0;
const MIN_LEVEL_ONE_RANGE: f32 = 0.1;

/// Resolved, normalised definitions for every tower type.
#[derive(Clone, Debug)]
pub struct TowerCatalog {
    definitions: [TowerDefinition; 4],
}

impl TowerCatalog {
    /// Resolves every tower type through `provider`, substituting defaults
    /// for missing or invalid content, then applies meta upgrades and
    /// normalises the level tables.
    #[must_use]
    pub fn resolve(provider: &dyn ConfigProvider, meta: &dyn MetaUpgradeProvider) -> Self {
        let definitions = TowerType::ALL.map(|tower_type| {
            let definition = match provider.tower_definition(tower_type) {
                Some(definition) if is_valid(&definition) => definition,
                Some(_) => {
                    warn!(?tower_type, "tower definition invalid, using default levels");
                    default_definition(tower_type)
                }
                None => {
                    warn!(?tower_type, "tower definition missing, using default levels");
                    default_definition(tower_type)
                }
            };
            finalize(tower_type, definition, meta.upgrade_tiers(tower_type))
        });
        Self { definitions }
    }

    /// Builds a catalog from explicit definitions. Types without a valid
    /// definition receive the defaults.
    #[must_use]
    pub fn from_definitions(definitions: impl IntoIterator<Item = TowerDefinition>) -> Self {
        let mut resolved = TowerType::ALL.map(default_definition);
        for definition in definitions {
            if is_valid(&definition) {
                let slot = index(definition.tower_type);
                resolved[slot] = definition;
            }
        }
        let definitions = resolved.map(|definition| {
            let tower_type = definition.tower_type;
            finalize(tower_type, definition, 0)
        });
        Self { definitions }
    }

    /// Normalised definition of a tower type.
    #[must_use]
    pub fn definition(&self, tower_type: TowerType) -> &TowerDefinition {
        &self.definitions[index(tower_type)]
    }

    /// Every projectile profile referenced by any level.
    pub fn projectile_profile_ids(&self) -> impl Iterator<Item = &str> {
        self.definitions
            .iter()
            .flat_map(|definition| definition.levels.iter())
            .map(|level| level.projectile_profile.as_str())
            .filter(|id| !id.is_empty())
    }
}

impl Default for TowerCatalog {
    fn default() -> Self {
        Self::from_definitions(std::iter::empty())
    }
}

/// Synthetic definition used when content is missing or invalid.
#[must_use]
pub fn default_definition(tower_type: TowerType) -> TowerDefinition {
    let base_damage = match tower_type {
        TowerType::Artillery => 25.0,
        TowerType::Barracks => 5.0,
        TowerType::Archer | TowerType::Mage => 34.0,
    };
    let base_cooldown = match tower_type {
        TowerType::Mage => 1.2,
        _ => 0.75,
    };
    let base_range = match tower_type {
        TowerType::Barracks => 1.6,
        TowerType::Mage => 2.0,
        TowerType::Artillery => 2.4,
        TowerType::Archer => 2.2,
    };
    let cost_modifier = match tower_type {
        TowerType::Mage => 1.4,
        TowerType::Artillery => 1.8,
        TowerType::Barracks => 1.1,
        TowerType::Archer => 1.0,
    };
    let (delivery, profile) = match tower_type {
        TowerType::Archer => (DeliveryType::Projectile, "Archer_Arrow"),
        TowerType::Mage => (DeliveryType::Projectile, "Mage_Bolt"),
        TowerType::Artillery => (DeliveryType::Projectile, "Artillery_Shell"),
        TowerType::Barracks => (DeliveryType::Melee, "Melee_None"),
    };

    let levels = (0..DEFAULT_LEVELS)
        .map(|level| {
            let step = level as f32;
            let cost = ((BASE_COST * (1.0 + 0.4 * step)).round() * cost_modifier).round();
            TowerLevelDefinition {
                cost: cost as u32,
                damage: base_damage * (1.0 + 0.3 * step),
                cooldown: (base_cooldown * (1.0 - 0.1 * step).max(0.5)).max(0.2),
                range: base_range + 0.2 * step,
                delivery,
                projectile_profile: profile.to_owned(),
                visual_scale: 1.0 + 0.1 * step,
            }
        })
        .collect();

    TowerDefinition {
        tower_type,
        damage_type: if tower_type == TowerType::Mage {
            DamageType::Magic
        } else {
            DamageType::Physical
        },
        target_type: TargetType::Ground,
        can_target_air: !matches!(tower_type, TowerType::Barracks | TowerType::Artillery),
        half_penetration: tower_type == TowerType::Artillery,
        levels,
        barracks: BarracksProfile {
            squad_size: 3,
            rally_range: base_range,
            ..BarracksProfile::default()
        },
    }
}

/// Scales every level by the purchased meta-upgrade tiers.
pub fn apply_meta_upgrades(definition: &mut TowerDefinition, tiers: u32) {
    if tiers == 0 {
        return;
    }
    let tiers = tiers as f32;
    let cooldown_factor = (1.0 - 0.02 * tiers).clamp(0.5, 1.0);
    for level in &mut definition.levels {
        level.damage = (level.damage * (1.0 + 0.04 * tiers)).max(1.0);
        level.range = (level.range * (1.0 + 0.03 * tiers)).max(0.4);
        level.cooldown = (level.cooldown * cooldown_factor).max(0.08);
    }
}

/// Enforces strictly improving levels.
///
/// For each level after the first: cost is at least 1.2× the previous cost,
/// damage at least 1.3×, range at least 1.05× (level one to two) or 1.10×
/// (later levels), and cooldown at most 0.95× the previous cooldown.
pub fn normalize_levels(levels: &mut [TowerLevelDefinition]) {
    for level in levels.iter_mut() {
        level.cost = level.cost.max(1);
        level.damage = finite_or(level.damage, 1.0).max(0.0);
        level.cooldown = finite_or(level.cooldown, 1.0).max(0.08);
        level.range = finite_or(level.range, 1.0).max(MIN_LEVEL_ONE_RANGE);
    }

    for index in 1..levels.len() {
        let (head, tail) = levels.split_at_mut(index);
        let previous = &head[index - 1];
        let next = &mut tail[0];

        let min_cost = (u64::from(previous.cost) * 6 + 4) / 5;
        next.cost = next.cost.max(u32::try_from(min_cost).unwrap_or(u32::MAX));

        let min_damage = previous.damage * 1.3;
        if next.damage < min_damage {
            next.damage = min_damage;
        }

        let range_factor = if index == 1 { 1.05 } else { 1.10 };
        let min_range = previous.range * range_factor;
        if next.range < min_range {
            next.range = min_range;
        }

        let max_cooldown = previous.cooldown * 0.95;
        if next.cooldown > max_cooldown {
            next.cooldown = max_cooldown;
        }
    }
}

fn finalize(tower_type: TowerType, mut definition: TowerDefinition, tiers: u32) -> TowerDefinition {
    definition.tower_type = tower_type;
    apply_meta_upgrades(&mut definition, tiers);
    normalize_levels(&mut definition.levels);

    let barracks = &mut definition.barracks;
    barracks.squad_size = barracks.squad_size.clamp(1, MAX_SQUAD_SIZE);
    barracks.soldier_max_hp = finite_or(barracks.soldier_max_hp, 60.0).max(1.0);
    barracks.soldier_damage = finite_or(barracks.soldier_damage, 5.0).max(1.0);
    barracks.soldier_attack_cooldown = finite_or(barracks.soldier_attack_cooldown, 1.0).max(0.1);
    barracks.soldier_respawn_seconds = finite_or(barracks.soldier_respawn_seconds, 10.0).max(0.1);
    barracks.rally_range = finite_or(barracks.rally_range, 0.0).max(0.0);
    definition
}

fn is_valid(definition: &TowerDefinition) -> bool {
    definition
        .levels
        .first()
        .is_some_and(|level| level.range.is_finite() && level.range >= MIN_LEVEL_ONE_RANGE)
}

fn index(tower_type: TowerType) -> usize {
    match tower_type {
        TowerType::Archer => 0,
        TowerType::Barracks => 1,
        TowerType::Mage => 2,
        TowerType::Artillery => 3,
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}
