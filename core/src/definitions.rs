//! Immutable content definitions consumed by the combat core.
//!
//! Definitions arrive from a [`crate::ConfigProvider`] and are resolved once,
//! before a match starts. Every struct tolerates missing fields through
//! `#[serde(default)]`, and the `sanitized` helpers clamp values into the
//! ranges the simulation relies on.

use serde::{Deserialize, Serialize};

use crate::{
    DamageType, DeliveryType, PathId, ProjectileMoveType, ResistProfile, StageId, TargetType,
    TowerType,
};

/// Identifier of the enemy definition used when content is missing.
pub const FALLBACK_ENEMY_ID: &str = "grunt";

/// Damage dealt to nearby soldiers when an enemy dies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeathBurst {
    /// Radius of the burst around the enemy's final position.
    pub radius: f32,
    /// Damage applied to every soldier inside the radius.
    pub damage: f32,
}

/// Static description of an enemy archetype.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyDefinition {
    /// Content identifier referenced by spawn entries.
    pub id: String,
    /// Maximum health of a freshly spawned enemy.
    pub health: f32,
    /// Movement speed in world units per second.
    pub move_speed: f32,
    /// Flying enemies ignore ground-only towers and cannot be blocked.
    pub flying: bool,
    /// Bosses cannot be blocked or instantly killed.
    pub boss: bool,
    /// Enemies immune to instant-kill procs take bonus damage instead.
    pub insta_kill_immune: bool,
    /// Whether barracks soldiers may hold this enemy in place.
    pub blockable: bool,
    /// Lives removed when the enemy reaches the end of its path.
    pub damage_to_base: u32,
    /// Gold awarded when the enemy is killed.
    pub bounty: u32,
    /// Armour and magic resistance.
    pub resist: ResistProfile,
    /// Damage dealt to the blocking soldier on every attack.
    pub attack_damage: f32,
    /// Seconds between attacks while the enemy is blocked.
    pub attack_interval: f32,
    /// Optional burst released on death.
    pub death_burst: Option<DeathBurst>,
}

impl Default for EnemyDefinition {
    fn default() -> Self {
        Self {
            id: FALLBACK_ENEMY_ID.to_owned(),
            health: 100.0,
            move_speed: 2.5,
            flying: false,
            boss: false,
            insta_kill_immune: false,
            blockable: true,
            damage_to_base: 1,
            bounty: 5,
            resist: ResistProfile::default(),
            attack_damage: 4.0,
            attack_interval: 1.0,
            death_burst: None,
        }
    }
}

impl EnemyDefinition {
    /// Synthesises a default enemy carrying the requested identifier.
    #[must_use]
    pub fn fallback(id: &str) -> Self {
        Self {
            id: id.to_owned(),
            ..Self::default()
        }
    }

    /// Returns a copy with every numeric field clamped into a usable range.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.health = finite_or(self.health, 100.0).max(1.0);
        self.move_speed = finite_or(self.move_speed, 2.5).max(0.0);
        self.resist.physical = finite_or(self.resist.physical, 0.0).clamp(0.0, 100.0);
        self.resist.magic = finite_or(self.resist.magic, 0.0).clamp(0.0, 100.0);
        self.attack_damage = finite_or(self.attack_damage, 0.0).max(0.0);
        self.attack_interval = finite_or(self.attack_interval, 1.0).max(0.1);
        self.death_burst = self.death_burst.and_then(|burst| {
            let radius = finite_or(burst.radius, 0.0);
            let damage = finite_or(burst.damage, 0.0);
            (radius > 0.0 && damage > 0.0).then_some(DeathBurst { radius, damage })
        });
        self
    }
}

/// Stats of a single tower level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TowerLevelDefinition {
    /// Gold required to reach this level. Level one's cost is the build cost.
    pub cost: u32,
    /// Base damage per attack.
    pub damage: f32,
    /// Seconds between attacks.
    pub cooldown: f32,
    /// Attack range in world units.
    pub range: f32,
    /// How attacks reach their target.
    pub delivery: DeliveryType,
    /// Projectile profile used when `delivery` is [`DeliveryType::Projectile`].
    pub projectile_profile: String,
    /// Presentation scale; ignored by the simulation.
    pub visual_scale: f32,
}

impl Default for TowerLevelDefinition {
    fn default() -> Self {
        Self {
            cost: 70,
            damage: 34.0,
            cooldown: 0.75,
            range: 2.2,
            delivery: DeliveryType::Projectile,
            projectile_profile: String::new(),
            visual_scale: 1.0,
        }
    }
}

/// Melee squad parameters used by barracks towers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarracksProfile {
    /// Number of soldiers the tower maintains.
    pub squad_size: u32,
    /// Radius around the rally point in which soldiers intercept enemies.
    pub rally_range: f32,
    /// Maximum health of a soldier at level one.
    pub soldier_max_hp: f32,
    /// Minimum damage of a soldier attack.
    pub soldier_damage: f32,
    /// Seconds between soldier attacks.
    pub soldier_attack_cooldown: f32,
    /// Seconds a fallen soldier waits before returning.
    pub soldier_respawn_seconds: f32,
}

impl Default for BarracksProfile {
    fn default() -> Self {
        Self {
            squad_size: 3,
            rally_range: 1.6,
            soldier_max_hp: 60.0,
            soldier_damage: 5.0,
            soldier_attack_cooldown: 1.0,
            soldier_respawn_seconds: 10.0,
        }
    }
}

/// Full description of a tower type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TowerDefinition {
    /// Archetype described by this definition.
    pub tower_type: TowerType,
    /// Damage type applied by attacks.
    pub damage_type: DamageType,
    /// Which enemies the tower may attack.
    pub target_type: TargetType,
    /// Legacy flag widening a ground-only tower to air targets as well.
    pub can_target_air: bool,
    /// Halves the defender's armour for physical hits.
    pub half_penetration: bool,
    /// Ordered level table, level one first.
    pub levels: Vec<TowerLevelDefinition>,
    /// Squad parameters, only consulted for barracks.
    pub barracks: BarracksProfile,
}

impl Default for TowerDefinition {
    fn default() -> Self {
        Self {
            tower_type: TowerType::Archer,
            damage_type: DamageType::Physical,
            target_type: TargetType::Ground,
            can_target_air: false,
            half_penetration: false,
            levels: Vec::new(),
            barracks: BarracksProfile::default(),
        }
    }
}

impl TowerDefinition {
    /// Effective target filter after folding in the legacy air flag.
    #[must_use]
    pub fn resolved_target_type(&self) -> TargetType {
        match (self.target_type, self.can_target_air) {
            (TargetType::Ground, true) => TargetType::Both,
            (target_type, _) => target_type,
        }
    }

    /// Number of levels available.
    #[must_use]
    pub fn max_level(&self) -> u32 {
        u32::try_from(self.levels.len()).unwrap_or(u32::MAX)
    }

    /// Stats of a one-based level, if present.
    #[must_use]
    pub fn level(&self, level: u32) -> Option<&TowerLevelDefinition> {
        let index = usize::try_from(level.checked_sub(1)?).ok()?;
        self.levels.get(index)
    }

    /// Gold required to build the tower.
    #[must_use]
    pub fn build_cost(&self) -> u32 {
        self.levels.first().map_or(0, |level| level.cost)
    }
}

/// Flight characteristics of a projectile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileProfile {
    /// Identifier referenced by tower levels.
    pub id: String,
    /// Trajectory family.
    pub move_type: ProjectileMoveType,
    /// Travel speed in world units per second.
    pub speed: f32,
    /// Seconds before an unresolved projectile is discarded.
    pub max_lifetime: f32,
    /// Distance at which the projectile connects with its target.
    pub hit_radius: f32,
    /// Area radius applied when striking a fixed point.
    pub explosion_radius: f32,
    /// Whether the projectile continues after a hit.
    pub pierce: bool,
    /// Maximum number of distinct enemies a piercing projectile may hit.
    pub max_hits: u32,
}

impl Default for ProjectileProfile {
    fn default() -> Self {
        Self {
            id: String::new(),
            move_type: ProjectileMoveType::Homing,
            speed: 10.0,
            max_lifetime: 1.5,
            hit_radius: 0.12,
            explosion_radius: 0.0,
            pierce: false,
            max_hits: 1,
        }
    }
}

impl ProjectileProfile {
    /// Built-in profile for a well-known identifier, if one exists.
    #[must_use]
    pub fn builtin(id: &str) -> Option<Self> {
        let profile = match id {
            "Archer_Arrow" => Self {
                id: id.to_owned(),
                move_type: ProjectileMoveType::Homing,
                speed: 11.0,
                max_lifetime: 1.6,
                hit_radius: 0.12,
                ..Self::default()
            },
            "Mage_Bolt" => Self {
                id: id.to_owned(),
                move_type: ProjectileMoveType::Homing,
                speed: 9.0,
                max_lifetime: 1.8,
                hit_radius: 0.14,
                ..Self::default()
            },
            "Artillery_Shell" => Self {
                id: id.to_owned(),
                move_type: ProjectileMoveType::Ballistic,
                speed: 6.0,
                max_lifetime: 2.4,
                hit_radius: 0.16,
                explosion_radius: 1.1,
                ..Self::default()
            },
            "Melee_None" => Self {
                id: id.to_owned(),
                move_type: ProjectileMoveType::Linear,
                speed: 0.0,
                max_lifetime: 0.1,
                hit_radius: 0.1,
                ..Self::default()
            },
            _ => return None,
        };
        Some(profile)
    }

    /// Returns a copy with every field clamped into a usable range.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.speed = finite_or(self.speed, 10.0).max(0.5);
        self.max_lifetime = finite_or(self.max_lifetime, 1.5).max(0.15);
        self.hit_radius = finite_or(self.hit_radius, 0.12).max(0.05);
        self.explosion_radius = finite_or(self.explosion_radius, 0.0).max(0.0);
        self.max_hits = self.max_hits.max(1);
        self
    }
}

/// One run of identical enemies inside a wave.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnEntry {
    /// Enemy definition to spawn.
    pub enemy_id: String,
    /// Number of enemies in the run.
    pub count: u32,
    /// Seconds between consecutive spawns.
    pub interval: f32,
    /// Seconds to wait before the first spawn of the run.
    pub delay: f32,
    /// Path the enemies follow.
    pub path: PathId,
}

impl Default for SpawnEntry {
    fn default() -> Self {
        Self {
            enemy_id: FALLBACK_ENEMY_ID.to_owned(),
            count: 3,
            interval: 0.75,
            delay: 0.0,
            path: PathId::new(0),
        }
    }
}

/// Ordered spawn script for a single wave.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveDefinition {
    /// Spawn runs executed in order.
    pub entries: Vec<SpawnEntry>,
    /// Gold awarded for calling this wave before its countdown elapses.
    pub early_call_bonus: u32,
    /// Marks the wave as a boss encounter.
    pub boss_wave: bool,
}

impl WaveDefinition {
    /// Wave used when stage content is unavailable.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            entries: vec![SpawnEntry::default()],
            early_call_bonus: 0,
            boss_wave: false,
        }
    }

    /// Total number of enemies the wave spawns.
    #[must_use]
    pub fn enemy_count(&self) -> u32 {
        self.entries
            .iter()
            .fold(0u32, |total, entry| total.saturating_add(entry.count))
    }
}

/// Starting resources and wave list of a stage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageDefinition {
    /// Stage identifier.
    pub id: StageId,
    /// Gold available when the match begins.
    pub initial_gold: u32,
    /// Lives available when the match begins.
    pub initial_lives: u32,
    /// Waves in play order.
    pub waves: Vec<WaveDefinition>,
}

impl Default for StageDefinition {
    fn default() -> Self {
        Self {
            id: StageId::new(0),
            initial_gold: 100,
            initial_lives: 20,
            waves: Vec::new(),
        }
    }
}

impl StageDefinition {
    /// Stage used when content is unavailable: `wave_count` fallback waves.
    #[must_use]
    pub fn fallback(id: StageId, wave_count: u32) -> Self {
        let waves = (0..wave_count.max(1))
            .map(|_| WaveDefinition::fallback())
            .collect();
        Self {
            id,
            waves,
            ..Self::default()
        }
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enemy_sanitization_clamps_health_and_resistances() {
        let definition = EnemyDefinition {
            health: -4.0,
            resist: ResistProfile::new(140.0, -10.0),
            death_burst: Some(DeathBurst {
                radius: 0.0,
                damage: 12.0,
            }),
            ..EnemyDefinition::default()
        }
        .sanitized();

        assert_eq!(definition.health, 1.0);
        assert_eq!(definition.resist, ResistProfile::new(100.0, 0.0));
        assert_eq!(definition.death_burst, None);
    }

    #[test]
    fn projectile_sanitization_enforces_minimums() {
        let profile = ProjectileProfile {
            speed: 0.0,
            max_lifetime: 0.0,
            hit_radius: 0.0,
            explosion_radius: -1.0,
            max_hits: 0,
            ..ProjectileProfile::default()
        }
        .sanitized();

        assert_eq!(profile.speed, 0.5);
        assert_eq!(profile.max_lifetime, 0.15);
        assert_eq!(profile.hit_radius, 0.05);
        assert_eq!(profile.explosion_radius, 0.0);
        assert_eq!(profile.max_hits, 1);
    }

    #[test]
    fn builtin_shell_explodes() {
        let shell = ProjectileProfile::builtin("Artillery_Shell").expect("builtin shell");
        assert_eq!(shell.move_type, ProjectileMoveType::Ballistic);
        assert_eq!(shell.explosion_radius, 1.1);
        assert!(ProjectileProfile::builtin("Unknown").is_none());
    }

    #[test]
    fn legacy_air_flag_widens_ground_towers() {
        let definition = TowerDefinition {
            can_target_air: true,
            ..TowerDefinition::default()
        };
        assert_eq!(definition.resolved_target_type(), TargetType::Both);

        let air_only = TowerDefinition {
            target_type: TargetType::Air,
            can_target_air: true,
            ..TowerDefinition::default()
        };
        assert_eq!(air_only.resolved_target_type(), TargetType::Air);
    }

    #[test]
    fn fallback_stage_has_at_least_one_wave() {
        let stage = StageDefinition::fallback(StageId::new(4), 0);
        assert_eq!(stage.waves.len(), 1);
        assert_eq!(stage.waves[0].enemy_count(), 3);
        assert_eq!(stage.initial_gold, 100);
        assert_eq!(stage.initial_lives, 20);
    }

    #[test]
    fn wave_definitions_parse_with_defaults() {
        let source = r#"
            early_call_bonus = 30

            [[entries]]
            enemy_id = "wolf"
            count = 5

            [[entries]]
            enemy_id = "ogre"
            count = 1
            delay = 2.5
            path = 1
        "#;
        let wave: WaveDefinition = toml::from_str(source).expect("parse wave");

        assert_eq!(wave.early_call_bonus, 30);
        assert_eq!(wave.entries.len(), 2);
        assert_eq!(wave.entries[0].interval, 0.75);
        assert_eq!(wave.entries[1].path, PathId::new(1));
        assert_eq!(wave.enemy_count(), 6);
    }
}
