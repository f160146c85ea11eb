//! A single placed tower and its attack logic.

use lane_defence_core::{
    DamageType, DeliveryType, EnemyId, Event, ProjectileRequest, ProjectileTarget, SlotIndex, TargetType,
    TowerDefinition, TowerId, TowerLevelDefinition, TowerSkill, TowerType, WorldPoint,
};
use lane_defence_system_tower_targeting::{closest_target, TargetQuery};
use lane_defence_world::{query, World};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::{
    barracks::{Squad, SquadOrders, ThrowingAxe},
    skills::{self, SkillConfig},
    soldier::SoldierStats,
};

const MIN_ATTACK_COOLDOWN: f32 = 0.1;
const MIN_RALLY_RADIUS: f32 = 0.6;
const FALLBACK_RALLY_RADIUS: f32 = 1.6;
const MIN_SOLDIER_COOLDOWN: f32 = 0.22;
const SKILL_TIER: u32 = 3;
const SELL_RATIO: f64 = 0.6;

/// Shared state every ranged tower consults when attacking.
pub(crate) struct AttackContext<'a> {
    pub(crate) rng: &'a mut ChaCha8Rng,
    pub(crate) skills: &'a SkillConfig,
    pub(crate) projectiles_enabled: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct Tower {
    pub(crate) id: TowerId,
    pub(crate) slot: SlotIndex,
    pub(crate) tower_type: TowerType,
    pub(crate) position: WorldPoint,
    pub(crate) level: u32,
    pub(crate) total_spend: u32,
    pub(crate) cooldown: f32,
    pub(crate) skill_cooldown: f32,
    pub(crate) rally: WorldPoint,
    pub(crate) squad: Option<Squad>,
}

impl Tower {
    pub(crate) fn new(
        id: TowerId,
        slot: SlotIndex,
        tower_type: TowerType,
        position: WorldPoint,
        cost: u32,
        rally: WorldPoint,
    ) -> Self {
        Self {
            id,
            slot,
            tower_type,
            position,
            level: 1,
            total_spend: cost,
            cooldown: 0.0,
            skill_cooldown: 0.0,
            rally,
            squad: (tower_type == TowerType::Barracks).then(Squad::default),
        }
    }

    pub(crate) fn sell_refund(&self) -> u32 {
        let refund = (f64::from(self.total_spend) * SELL_RATIO).round();
        (refund as u32).max(1)
    }

    pub(crate) fn tick_barracks(
        &mut self,
        dt: f32,
        definition: &TowerDefinition,
        skills: &SkillConfig,
        next_soldier: &mut u32,
        world: &mut World,
        out: &mut Vec<Event>,
    ) {
        let Some(orders) = self.squad_orders(definition, skills) else {
            return;
        };
        let Some(squad) = self.squad.as_mut() else {
            return;
        };
        squad.sync(&orders, next_soldier, world, out);
        squad.tick(dt, &orders, world, out);
    }

    pub(crate) fn squad_orders(
        &self,
        definition: &TowerDefinition,
        skills: &SkillConfig,
    ) -> Option<SquadOrders> {
        let first = definition.level(1)?;
        let level = definition.level(self.level)?;
        let profile = &definition.barracks;

        let step = self.level.saturating_sub(1) as f32;
        let damage_ratio = if first.damage > 0.0 {
            level.damage / first.damage
        } else {
            1.0
        };
        let cooldown_ratio = if first.cooldown > 0.0 {
            level.cooldown / first.cooldown
        } else {
            1.0
        };
        let stats = SoldierStats {
            max_health: profile.soldier_max_hp * (1.0 + 0.25 * step),
            damage: (profile.soldier_damage * damage_ratio).max(1.0),
            attack_cooldown: (profile.soldier_attack_cooldown * cooldown_ratio)
                .max(MIN_SOLDIER_COOLDOWN),
            respawn_seconds: profile.soldier_respawn_seconds,
        };

        let block_range = if profile.rally_range > 0.05 {
            profile.rally_range
        } else {
            level.range
        }
        .max(MIN_RALLY_RADIUS);

        let axe = (self.level >= SKILL_TIER).then(|| ThrowingAxe {
            origin: self.position,
            range: level.range,
            damage: level.damage * skills.axe_damage_ratio,
            cooldown: skills.axe_cooldown,
        });

        Some(SquadOrders {
            tower: self.id,
            rally: self.rally,
            block_range,
            size: profile.squad_size as usize,
            stats,
            axe,
        })
    }

    pub(crate) fn tick_ranged(
        &mut self,
        dt: f32,
        definition: &TowerDefinition,
        context: &mut AttackContext<'_>,
        world: &mut World,
        requests: &mut Vec<ProjectileRequest>,
        out: &mut Vec<Event>,
    ) {
        self.cooldown -= dt;
        self.skill_cooldown = (self.skill_cooldown - dt).max(0.0);
        if self.cooldown > 0.0 {
            return;
        }
        let Some(level) = definition.level(self.level) else {
            return;
        };

        let view = query::enemy_view(world);
        let search = TargetQuery::new(self.position, level.range, definition.resolved_target_type());
        let Some(enemy) = closest_target(&view, &search) else {
            return;
        };
        let Some(target_position) = view.get(enemy).map(|snapshot| snapshot.position) else {
            return;
        };

        let replaced = self.level >= SKILL_TIER
            && self.skill_cooldown <= 0.0
            && self.try_skill(definition, level, enemy, target_position, context, world, out);

        if !replaced {
            self.dispatch(definition, level, enemy, target_position, context, world, requests, out);
        }
        self.cooldown = level.cooldown.max(MIN_ATTACK_COOLDOWN);
    }

    /// Rolls the tier-three skill. Returns `true` when the skill replaced the
    /// regular attack.
    #[allow(clippy::too_many_arguments)]
    fn try_skill(
        &mut self,
        definition: &TowerDefinition,
        level: &TowerLevelDefinition,
        enemy: EnemyId,
        target_position: WorldPoint,
        context: &mut AttackContext<'_>,
        world: &mut World,
        out: &mut Vec<Event>,
    ) -> bool {
        let config = context.skills;
        let (skill, chance, multiplier, damage_type, cooldown) = match self.tower_type {
            TowerType::Archer => (
                TowerSkill::Headshot,
                config.headshot_chance,
                config.headshot_multiplier,
                DamageType::True,
                config.headshot_cooldown,
            ),
            TowerType::Mage => (
                TowerSkill::Disintegrate,
                config.disintegrate_chance,
                config.disintegrate_multiplier,
                DamageType::Magic,
                config.disintegrate_cooldown,
            ),
            TowerType::Artillery => {
                let _ = skills::cluster_blast(
                    world,
                    enemy,
                    target_position,
                    config.cluster_radius,
                    level.damage * config.cluster_damage_ratio,
                    definition.damage_type,
                    definition.half_penetration,
                );
                self.skill_cooldown = config.cluster_cooldown.max(MIN_ATTACK_COOLDOWN);
                out.push(Event::SkillTriggered {
                    tower: self.id,
                    skill: TowerSkill::ClusterBlast,
                    enemy,
                    instant_kill: false,
                });
                return false;
            }
            TowerType::Barracks => return false,
        };

        if !context.rng.gen_bool(skills::chance(chance)) {
            return false;
        }
        let Some(target) = world.enemy_mut(enemy) else {
            return false;
        };

        let instant_kill = skills::execute_or_strike(
            target,
            level.damage * multiplier,
            damage_type,
            definition.half_penetration,
        );
        self.skill_cooldown = cooldown.max(MIN_ATTACK_COOLDOWN);
        out.push(Event::SkillTriggered {
            tower: self.id,
            skill,
            enemy,
            instant_kill,
        });
        true
    }

    #[allow(clippy::too_many_arguments)]
    fn dispatch(
        &self,
        definition: &TowerDefinition,
        level: &TowerLevelDefinition,
        enemy: EnemyId,
        target_position: WorldPoint,
        context: &AttackContext<'_>,
        world: &mut World,
        requests: &mut Vec<ProjectileRequest>,
        out: &mut Vec<Event>,
    ) {
        let delivery = self.resolve_delivery(level.delivery);
        if delivery == DeliveryType::Projectile && context.projectiles_enabled {
            let target = if self.tower_type == TowerType::Artillery {
                ProjectileTarget::Point(target_position)
            } else {
                ProjectileTarget::Enemy(enemy)
            };
            requests.push(ProjectileRequest {
                tower: self.id,
                origin: self.position,
                target,
                damage: level.damage,
                damage_type: definition.damage_type,
                half_penetration: definition.half_penetration,
                can_hit_air: definition.resolved_target_type() != TargetType::Ground,
                reacquire_range: level.range + 1.0,
                profile_id: level.projectile_profile.clone(),
                allow_single_retarget: self.tower_type == TowerType::Mage
                    && matches!(target, ProjectileTarget::Enemy(_)),
            });
        } else if let Some(target) = world.enemy_mut(enemy) {
            let _ = target.apply_damage(
                level.damage,
                definition.damage_type,
                definition.half_penetration,
            );
        }

        out.push(Event::TowerAttacked {
            tower: self.id,
            enemy,
            delivery,
        });
    }

    fn resolve_delivery(&self, configured: DeliveryType) -> DeliveryType {
        match (self.tower_type, configured) {
            (TowerType::Mage, _) if self.level >= SKILL_TIER => DeliveryType::HitScan,
            (_, DeliveryType::Melee) => DeliveryType::HitScan,
            (_, delivery) => delivery,
        }
    }
}

/// Radius around a barracks inside which its rally point may sit.
pub(crate) fn rally_radius(definition: &TowerDefinition) -> f32 {
    let rally_range = definition.barracks.rally_range;
    if rally_range > 0.05 {
        rally_range
    } else {
        FALLBACK_RALLY_RADIUS
    }
    .max(MIN_RALLY_RADIUS)
}

/// Closest point on any lane to `origin`.
pub(crate) fn nearest_lane_point(lanes: &[Vec<WorldPoint>], origin: WorldPoint) -> Option<WorldPoint> {
    lanes
        .iter()
        .flat_map(|lane| lane.windows(2))
        .map(|segment| closest_on_segment(segment[0], segment[1], origin))
        .min_by(|left, right| {
            left.distance_squared(origin)
                .total_cmp(&right.distance_squared(origin))
        })
}

fn closest_on_segment(start: WorldPoint, end: WorldPoint, point: WorldPoint) -> WorldPoint {
    let length_sq = start.distance_squared(end);
    if length_sq <= f32::EPSILON {
        return start;
    }
    let t = ((point.x() - start.x()) * (end.x() - start.x())
        + (point.y() - start.y()) * (end.y() - start.y()))
        / length_sq;
    let t = t.clamp(0.0, 1.0);
    WorldPoint::new(
        start.x() + (end.x() - start.x()) * t,
        start.y() + (end.y() - start.y()) * t,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sell_refund_rounds_and_never_drops_below_one() {
        let mut tower = Tower::new(
            TowerId::new(0),
            SlotIndex::new(0),
            TowerType::Archer,
            WorldPoint::ORIGIN,
            70,
            WorldPoint::ORIGIN,
        );
        assert_eq!(tower.sell_refund(), 42);

        tower.total_spend = 1;
        assert_eq!(tower.sell_refund(), 1);
    }

    #[test]
    fn nearest_lane_point_projects_onto_segments() {
        let lanes = vec![vec![WorldPoint::new(-6.0, 0.0), WorldPoint::new(6.0, 0.0)]];

        let point = nearest_lane_point(&lanes, WorldPoint::new(2.0, -1.2)).expect("lane point");

        assert!(point.within(WorldPoint::new(2.0, 0.0), 1e-4));
        assert_eq!(nearest_lane_point(&[], WorldPoint::ORIGIN), None);
    }

    #[test]
    fn tier_three_mages_strike_instantly() {
        let mut mage = Tower::new(
            TowerId::new(0),
            SlotIndex::new(0),
            TowerType::Mage,
            WorldPoint::ORIGIN,
            98,
            WorldPoint::ORIGIN,
        );
        assert_eq!(
            mage.resolve_delivery(DeliveryType::Projectile),
            DeliveryType::Projectile
        );

        mage.level = 3;
        assert_eq!(
            mage.resolve_delivery(DeliveryType::Projectile),
            DeliveryType::HitScan
        );
    }
}
