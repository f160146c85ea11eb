#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! In-flight projectile simulation.
//!
//! Projectiles either chase a live enemy, re-reading its position every tick,
//! or fly to a fixed point and explode. Each projectile damages a given enemy
//! at most once. Piercing projectiles re-acquire the nearest untouched enemy
//! after every hit until their hit budget runs out.

mod profiles;

use std::collections::BTreeMap;

use lane_defence_core::{
    DamageType, EnemyId, Event, ProjectileId, ProjectileMoveType, ProjectileProfile,
    ProjectileRequest, ProjectileTarget, TargetType, TowerId, WorldPoint,
};
use lane_defence_system_tower_targeting::{closest_target, ranked_targets, TargetQuery};
use lane_defence_world::{query, World};
use tracing::debug;

pub use profiles::ProjectileProfiles;

const MIN_REACQUIRE_RANGE: f32 = 0.25;

/// Read-only description of an in-flight projectile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectileSnapshot {
    /// Identifier of the projectile.
    pub id: ProjectileId,
    /// Tower that fired it.
    pub tower: TowerId,
    /// Current position.
    pub position: WorldPoint,
    /// Trajectory family.
    pub move_type: ProjectileMoveType,
    /// Current destination.
    pub target: ProjectileTarget,
}

#[derive(Clone, Debug)]
struct Projectile {
    id: ProjectileId,
    tower: TowerId,
    position: WorldPoint,
    target: ProjectileTarget,
    damage: f32,
    damage_type: DamageType,
    half_penetration: bool,
    target_type: TargetType,
    reacquire_range: f32,
    profile: ProjectileProfile,
    elapsed: f32,
    retarget_available: bool,
    hit: Vec<EnemyId>,
}

impl Projectile {
    fn snapshot(&self) -> ProjectileSnapshot {
        ProjectileSnapshot {
            id: self.id,
            tower: self.tower,
            position: self.position,
            move_type: self.profile.move_type,
            target: self.target,
        }
    }

    /// Advances the projectile; returns `false` once it should be removed.
    fn advance(&mut self, dt: f32, world: &mut World) -> bool {
        self.elapsed += dt;
        if self.elapsed > self.profile.max_lifetime {
            debug!(projectile = self.id.get(), "projectile expired");
            return false;
        }

        let step = self.profile.speed * dt;
        match self.target {
            ProjectileTarget::Point(point) => {
                self.position = self.position.move_towards(point, step);
                if !self.position.within(point, self.profile.hit_radius) {
                    return true;
                }
                self.explode(point, world);
                false
            }
            ProjectileTarget::Enemy(enemy) => {
                let Some(destination) = query::enemy_position(world, enemy) else {
                    return self.retarget_after_loss(world);
                };
                self.position = self.position.move_towards(destination, step);
                if !self.position.within(destination, self.profile.hit_radius) {
                    return true;
                }
                self.strike(enemy, world);
                self.continue_piercing(world)
            }
        }
    }

    fn strike(&mut self, enemy: EnemyId, world: &mut World) {
        if self.hit.contains(&enemy) {
            return;
        }
        self.hit.push(enemy);
        if let Some(target) = world.enemy_mut(enemy) {
            let dealt = target.apply_damage(self.damage, self.damage_type, self.half_penetration);
            debug!(projectile = self.id.get(), enemy = enemy.get(), dealt, "projectile hit");
        }
    }

    fn explode(&mut self, point: WorldPoint, world: &mut World) {
        let radius = self.profile.hit_radius.max(self.profile.explosion_radius);
        let view = query::enemy_view(world);
        let mut victims = Vec::new();
        ranked_targets(
            &view,
            &TargetQuery::new(point, radius, self.target_type).excluding(&self.hit),
            &mut victims,
        );
        for enemy in victims {
            self.strike(enemy, world);
        }
    }

    fn continue_piercing(&mut self, world: &World) -> bool {
        let budget = usize::try_from(self.profile.max_hits).unwrap_or(usize::MAX);
        if !self.profile.pierce || self.hit.len() >= budget {
            return false;
        }
        match self.reacquire(world) {
            Some(next) => {
                self.target = ProjectileTarget::Enemy(next);
                true
            }
            None => false,
        }
    }

    fn retarget_after_loss(&mut self, world: &World) -> bool {
        if !self.retarget_available {
            return false;
        }
        self.retarget_available = false;
        match self.reacquire(world) {
            Some(next) => {
                debug!(projectile = self.id.get(), enemy = next.get(), "projectile retargeted");
                self.target = ProjectileTarget::Enemy(next);
                true
            }
            None => false,
        }
    }

    fn reacquire(&self, world: &World) -> Option<EnemyId> {
        let view = query::enemy_view(world);
        let query = TargetQuery::new(
            self.position,
            self.reacquire_range.max(MIN_REACQUIRE_RANGE),
            self.target_type,
        )
        .excluding(&self.hit);
        closest_target(&view, &query)
    }
}

/// Owner of every projectile in flight.
#[derive(Debug, Default)]
pub struct ProjectileSimulator {
    projectiles: BTreeMap<ProjectileId, Projectile>,
    next_projectile_id: u32,
    profiles: ProjectileProfiles,
}

impl ProjectileSimulator {
    /// Creates a simulator using the provided profile table.
    #[must_use]
    pub fn new(profiles: ProjectileProfiles) -> Self {
        Self {
            projectiles: BTreeMap::new(),
            next_projectile_id: 0,
            profiles,
        }
    }

    /// Launches a projectile described by `request`.
    pub fn launch(&mut self, request: ProjectileRequest, out: &mut Vec<Event>) -> ProjectileId {
        let id = ProjectileId::new(self.next_projectile_id);
        self.next_projectile_id = self.next_projectile_id.saturating_add(1);

        let profile = self.profiles.get(&request.profile_id);
        let retarget_available = request.allow_single_retarget
            && matches!(request.target, ProjectileTarget::Enemy(_));
        let target_type = if request.can_hit_air {
            TargetType::Both
        } else {
            TargetType::Ground
        };

        let _ = self.projectiles.insert(
            id,
            Projectile {
                id,
                tower: request.tower,
                position: request.origin,
                target: request.target,
                damage: request.damage,
                damage_type: request.damage_type,
                half_penetration: request.half_penetration,
                target_type,
                reacquire_range: request.reacquire_range,
                profile,
                elapsed: 0.0,
                retarget_available,
                hit: Vec::new(),
            },
        );
        out.push(Event::ProjectileLaunched {
            projectile: id,
            tower: request.tower,
        });
        id
    }

    /// Advances every projectile by `dt` seconds, applying hits to `world`.
    pub fn tick(&mut self, dt: f32, world: &mut World) {
        if !dt.is_finite() || dt < 0.0 {
            return;
        }
        self.projectiles
            .retain(|_, projectile| projectile.advance(dt, world));
    }

    /// Number of projectiles in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.projectiles.len()
    }

    /// Reports whether nothing is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.projectiles.is_empty()
    }

    /// Snapshots of every projectile in identifier order.
    #[must_use]
    pub fn snapshots(&self) -> Vec<ProjectileSnapshot> {
        self.projectiles.values().map(Projectile::snapshot).collect()
    }

    /// Removes every projectile.
    pub fn clear(&mut self) {
        self.projectiles.clear();
    }
}
