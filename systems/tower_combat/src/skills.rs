//! Tier-three tower abilities.

use lane_defence_core::{DamageType, EnemyId, WorldPoint};
use lane_defence_world::{Enemy, World};
use serde::{Deserialize, Serialize};

/// Tuning of the tier-three skills.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillConfig {
    /// Probability that an archer attack becomes a headshot.
    pub headshot_chance: f32,
    /// Damage multiplier of a headshot that fails to kill outright.
    pub headshot_multiplier: f32,
    /// Seconds between headshots.
    pub headshot_cooldown: f32,
    /// Probability that a mage attack becomes a disintegrate.
    pub disintegrate_chance: f32,
    /// Damage multiplier of a disintegrate that fails to kill outright.
    pub disintegrate_multiplier: f32,
    /// Seconds between disintegrates.
    pub disintegrate_cooldown: f32,
    /// Splash radius around the primary target of a cluster blast.
    pub cluster_radius: f32,
    /// Share of the base damage dealt to each splashed enemy.
    pub cluster_damage_ratio: f32,
    /// Seconds between cluster blasts.
    pub cluster_cooldown: f32,
    /// Share of the base damage dealt by a throwing axe.
    pub axe_damage_ratio: f32,
    /// Seconds between throwing axes.
    pub axe_cooldown: f32,
}

impl Default for SkillConfig {
    fn default() -> Self {
        Self {
            headshot_chance: 0.18,
            headshot_multiplier: 2.4,
            headshot_cooldown: 12.0,
            disintegrate_chance: 0.20,
            disintegrate_multiplier: 2.8,
            disintegrate_cooldown: 10.0,
            cluster_radius: 1.2,
            cluster_damage_ratio: 0.55,
            cluster_cooldown: 4.0,
            axe_damage_ratio: 0.65,
            axe_cooldown: 6.0,
        }
    }
}

/// Kills `enemy` outright when it allows it, otherwise deals `bonus_damage`.
/// Returns whether the kill was instant.
pub(crate) fn execute_or_strike(
    enemy: &mut Enemy,
    bonus_damage: f32,
    damage_type: DamageType,
    half_penetration: bool,
) -> bool {
    if enemy.try_apply_instant_kill() {
        return true;
    }
    let _ = enemy.apply_damage(bonus_damage, damage_type, half_penetration);
    false
}

/// Splashes every ground enemy within `radius` of `center` except `primary`.
/// Returns the number of enemies hit.
pub(crate) fn cluster_blast(
    world: &mut World,
    primary: EnemyId,
    center: WorldPoint,
    radius: f32,
    damage: f32,
    damage_type: DamageType,
    half_penetration: bool,
) -> usize {
    let mut hits = 0;
    for enemy in world.enemies_mut() {
        if enemy.id() == primary
            || !enemy.is_active()
            || enemy.definition().flying
            || !enemy.position().within(center, radius)
        {
            continue;
        }
        let _ = enemy.apply_damage(damage, damage_type, half_penetration);
        hits += 1;
    }
    hits
}

/// Clamps a proc chance into a valid probability.
pub(crate) fn chance(value: f32) -> f64 {
    if value.is_finite() {
        f64::from(value.clamp(0.0, 1.0))
    } else {
        0.0
    }
}
