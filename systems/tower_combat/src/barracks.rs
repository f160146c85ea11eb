//! Barracks squads: formation, block assignment and melee upkeep.

use std::collections::BTreeMap;

use lane_defence_core::{
    DamageType, EnemyId, Event, SoldierId, TargetType, TowerId, TowerSkill, WorldPoint,
};
use lane_defence_system_tower_targeting::{closest_target, ranked_targets, TargetQuery};
use lane_defence_world::{query, World};

use crate::soldier::{Soldier, SoldierProgress, SoldierStats};

const FORMATION_RADIUS: f32 = 0.35;
const RELEASE_RANGE_FACTOR: f32 = 1.8;

/// Parameters a squad needs for one tick.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SquadOrders {
    pub(crate) tower: TowerId,
    pub(crate) rally: WorldPoint,
    pub(crate) block_range: f32,
    pub(crate) size: usize,
    pub(crate) stats: SoldierStats,
    pub(crate) axe: Option<ThrowingAxe>,
}

/// Tier-three throwing axe parameters.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ThrowingAxe {
    pub(crate) origin: WorldPoint,
    pub(crate) range: f32,
    pub(crate) damage: f32,
    pub(crate) cooldown: f32,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Squad {
    soldiers: Vec<Soldier>,
    assignments: BTreeMap<EnemyId, SoldierId>,
    axe_cooldown: f32,
    scratch: Vec<EnemyId>,
}

impl Squad {
    pub(crate) fn soldiers(&self) -> &[Soldier] {
        &self.soldiers
    }

    pub(crate) fn blocked_enemies(&self) -> impl Iterator<Item = EnemyId> + '_ {
        self.assignments.keys().copied()
    }

    /// Grows or shrinks the squad and refreshes stats and posts.
    pub(crate) fn sync(
        &mut self,
        orders: &SquadOrders,
        next_soldier: &mut u32,
        world: &mut World,
        out: &mut Vec<Event>,
    ) {
        while self.soldiers.len() > orders.size {
            let Some(soldier) = self.soldiers.pop() else {
                break;
            };
            if let Some(enemy) = soldier.target() {
                self.unassign(enemy, orders.tower, world, out);
            }
        }

        while self.soldiers.len() < orders.size {
            let id = SoldierId::new(*next_soldier);
            *next_soldier = next_soldier.saturating_add(1);
            let post = formation_post(orders.rally, self.soldiers.len(), orders.size);
            self.soldiers.push(Soldier::new(id, post, orders.stats));
        }

        let size = self.soldiers.len();
        for (index, soldier) in self.soldiers.iter_mut().enumerate() {
            soldier.update_stats(orders.stats);
            soldier.set_post(formation_post(orders.rally, index, size));
        }
    }

    pub(crate) fn tick(
        &mut self,
        dt: f32,
        orders: &SquadOrders,
        world: &mut World,
        out: &mut Vec<Event>,
    ) {
        self.release_invalid(orders, world, out);
        self.assign_targets(orders, world, out);

        for soldier in &mut self.soldiers {
            if soldier.tick(dt, world) == SoldierProgress::Respawned {
                out.push(Event::SoldierRespawned {
                    soldier: soldier.id(),
                    tower: orders.tower,
                });
            }
        }

        self.axe_cooldown = (self.axe_cooldown - dt).max(0.0);
        if let Some(axe) = orders.axe {
            self.throw_axe(orders.tower, axe, world, out);
        }
    }

    /// Routes an enemy attack to the soldier holding that enemy.
    pub(crate) fn absorb_attack(
        &mut self,
        tower: TowerId,
        enemy: EnemyId,
        damage: f32,
        world: &mut World,
        out: &mut Vec<Event>,
    ) {
        let holder = self
            .assignments
            .get(&enemy)
            .and_then(|id| self.soldiers.iter_mut().find(|soldier| soldier.id() == *id))
            .filter(|soldier| soldier.is_alive() && soldier.target() == Some(enemy));

        let Some(soldier) = holder else {
            self.unassign(enemy, tower, world, out);
            return;
        };

        if soldier.take_damage(damage) {
            out.push(Event::SoldierDied {
                soldier: soldier.id(),
                tower,
            });
            self.unassign(enemy, tower, world, out);
        }
    }

    /// Damages every living soldier caught in a burst.
    pub(crate) fn absorb_burst(
        &mut self,
        tower: TowerId,
        center: WorldPoint,
        radius: f32,
        damage: f32,
        world: &mut World,
        out: &mut Vec<Event>,
    ) {
        self.scratch.clear();
        for soldier in &mut self.soldiers {
            if !soldier.is_alive() || !soldier.position().within(center, radius) {
                continue;
            }
            let target = soldier.target();
            if soldier.take_damage(damage) {
                out.push(Event::SoldierDied {
                    soldier: soldier.id(),
                    tower,
                });
                self.scratch.extend(target);
            }
        }

        let fallen = std::mem::take(&mut self.scratch);
        for enemy in &fallen {
            self.unassign(*enemy, tower, world, out);
        }
        self.scratch = fallen;
    }

    /// Drops every reference to an enemy that left the world.
    pub(crate) fn forget_enemy(&mut self, enemy: EnemyId) {
        let Some(holder) = self.assignments.remove(&enemy) else {
            return;
        };
        if let Some(soldier) = self.soldiers.iter_mut().find(|soldier| soldier.id() == holder) {
            if soldier.target() == Some(enemy) {
                soldier.clear_block_target();
            }
        }
    }

    /// Releases every enemy the squad holds.
    pub(crate) fn disband(&mut self, tower: TowerId, world: &mut World, out: &mut Vec<Event>) {
        let held: Vec<EnemyId> = self.assignments.keys().copied().collect();
        for enemy in held {
            self.unassign(enemy, tower, world, out);
        }
        self.soldiers.clear();
    }

    fn release_invalid(&mut self, orders: &SquadOrders, world: &mut World, out: &mut Vec<Event>) {
        let leash = orders.block_range * RELEASE_RANGE_FACTOR;
        self.scratch.clear();
        for (&enemy_id, &soldier_id) in &self.assignments {
            let soldier_holds = self
                .soldiers
                .iter()
                .find(|soldier| soldier.id() == soldier_id)
                .is_some_and(|soldier| soldier.is_alive() && soldier.target() == Some(enemy_id));
            let enemy_held = world.enemy(enemy_id).is_some_and(|enemy| {
                enemy.is_active()
                    && enemy.blocker() == Some(orders.tower)
                    && enemy.position().within(orders.rally, leash)
            });
            if !soldier_holds || !enemy_held {
                self.scratch.push(enemy_id);
            }
        }

        let stale = std::mem::take(&mut self.scratch);
        for enemy in &stale {
            self.unassign(*enemy, orders.tower, world, out);
        }
        self.scratch = stale;
    }

    fn assign_targets(&mut self, orders: &SquadOrders, world: &mut World, out: &mut Vec<Event>) {
        if !self.soldiers.iter().any(Soldier::can_engage) {
            return;
        }

        let view = query::enemy_view(world);
        let search = TargetQuery::new(orders.rally, orders.block_range, TargetType::Ground)
            .blockable()
            .unblocked();
        ranked_targets(&view, &search, &mut self.scratch);

        for &enemy_id in &self.scratch {
            let Some(enemy) = world.enemy_mut(enemy_id) else {
                continue;
            };
            let position = enemy.position();
            let Some(soldier) = self
                .soldiers
                .iter_mut()
                .filter(|soldier| soldier.can_engage())
                .min_by(|left, right| {
                    left.position()
                        .distance_squared(position)
                        .total_cmp(&right.position().distance_squared(position))
                })
            else {
                break;
            };

            if !soldier.assign_block_target(enemy_id) {
                continue;
            }
            if !enemy.try_enter_block(orders.tower, orders.rally) {
                soldier.clear_block_target();
                continue;
            }
            let _ = self.assignments.insert(enemy_id, soldier.id());
            out.push(Event::EnemyBlocked {
                enemy: enemy_id,
                tower: orders.tower,
            });
        }
    }

    fn throw_axe(
        &mut self,
        tower: TowerId,
        axe: ThrowingAxe,
        world: &mut World,
        out: &mut Vec<Event>,
    ) {
        if self.axe_cooldown > 0.0 {
            return;
        }
        let view = query::enemy_view(world);
        let search = TargetQuery::new(axe.origin, axe.range, TargetType::Ground).unblocked();
        let Some(enemy_id) = closest_target(&view, &search) else {
            return;
        };
        let Some(enemy) = world.enemy_mut(enemy_id) else {
            return;
        };

        let _ = enemy.apply_damage(axe.damage, DamageType::Physical, false);
        self.axe_cooldown = axe.cooldown.max(0.1);
        out.push(Event::SkillTriggered {
            tower,
            skill: TowerSkill::ThrowingAxe,
            enemy: enemy_id,
            instant_kill: false,
        });
    }

    fn unassign(&mut self, enemy: EnemyId, tower: TowerId, world: &mut World, out: &mut Vec<Event>) {
        if let Some(holder) = self.assignments.remove(&enemy) {
            if let Some(soldier) = self
                .soldiers
                .iter_mut()
                .find(|soldier| soldier.id() == holder)
            {
                if soldier.target() == Some(enemy) {
                    soldier.clear_block_target();
                }
            }
        }

        let released = world
            .enemy_mut(enemy)
            .is_some_and(|enemy| enemy.release_block(Some(tower)));
        if released {
            out.push(Event::EnemyReleased { enemy, tower });
        }
    }
}

fn formation_post(rally: WorldPoint, index: usize, size: usize) -> WorldPoint {
    if size <= 1 {
        return rally;
    }
    let angle = std::f32::consts::TAU * index as f32 / size as f32;
    rally.offset(FORMATION_RADIUS * angle.cos(), FORMATION_RADIUS * angle.sin())
}
