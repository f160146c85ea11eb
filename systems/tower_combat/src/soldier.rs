//! Barracks soldiers and their melee lifecycle.

use lane_defence_core::{DamageType, EnemyId, SoldierId, SoldierState, WorldPoint};
use lane_defence_world::World;

const MOVE_SPEED: f32 = 5.5;
const ARRIVE_DISTANCE: f32 = 0.05;
const MELEE_REACH: f32 = 0.6;
const ENGAGE_OFFSET: f32 = 0.25;

/// Combat stats of a soldier at the current barracks level.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SoldierStats {
    pub(crate) max_health: f32,
    pub(crate) damage: f32,
    pub(crate) attack_cooldown: f32,
    pub(crate) respawn_seconds: f32,
}

impl SoldierStats {
    fn sanitized(self) -> Self {
        Self {
            max_health: self.max_health.max(1.0),
            damage: self.damage.max(1.0),
            attack_cooldown: self.attack_cooldown.max(0.1),
            respawn_seconds: self.respawn_seconds.max(0.1),
        }
    }
}

/// What happened to a soldier during its tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SoldierProgress {
    Unchanged,
    Respawned,
}

#[derive(Clone, Debug)]
pub(crate) struct Soldier {
    id: SoldierId,
    position: WorldPoint,
    post: WorldPoint,
    health: f32,
    stats: SoldierStats,
    state: SoldierState,
    target: Option<EnemyId>,
    attack_cooldown: f32,
    respawn_remaining: f32,
}

impl Soldier {
    pub(crate) fn new(id: SoldierId, post: WorldPoint, stats: SoldierStats) -> Self {
        let stats = stats.sanitized();
        Self {
            id,
            position: post,
            post,
            health: stats.max_health,
            stats,
            state: SoldierState::Idle,
            target: None,
            attack_cooldown: 0.0,
            respawn_remaining: 0.0,
        }
    }

    pub(crate) fn id(&self) -> SoldierId {
        self.id
    }

    pub(crate) fn position(&self) -> WorldPoint {
        self.position
    }

    pub(crate) fn health(&self) -> f32 {
        self.health
    }

    pub(crate) fn state(&self) -> SoldierState {
        self.state
    }

    pub(crate) fn target(&self) -> Option<EnemyId> {
        self.target
    }

    pub(crate) fn is_alive(&self) -> bool {
        !matches!(self.state, SoldierState::Dead | SoldierState::Respawning)
    }

    pub(crate) fn can_engage(&self) -> bool {
        self.is_alive() && self.target.is_none()
    }

    pub(crate) fn set_post(&mut self, post: WorldPoint) {
        self.post = post;
    }

    /// Replaces the stats, keeping the current health ratio.
    pub(crate) fn update_stats(&mut self, stats: SoldierStats) {
        let stats = stats.sanitized();
        if stats == self.stats {
            return;
        }
        let ratio = (self.health / self.stats.max_health).clamp(0.0, 1.0);
        self.stats = stats;
        if self.is_alive() {
            self.health = (stats.max_health * ratio).max(1.0);
        }
    }

    pub(crate) fn assign_block_target(&mut self, enemy: EnemyId) -> bool {
        if !self.can_engage() {
            return false;
        }
        self.target = Some(enemy);
        self.state = SoldierState::Blocking;
        self.attack_cooldown = 0.0;
        true
    }

    pub(crate) fn clear_block_target(&mut self) {
        self.target = None;
        if self.state == SoldierState::Blocking {
            self.state = SoldierState::Moving;
        }
    }

    /// Applies raw damage. Returns `true` if the soldier died from it.
    pub(crate) fn take_damage(&mut self, amount: f32) -> bool {
        if !self.is_alive() || amount <= 0.0 {
            return false;
        }
        self.health -= amount;
        if self.health > 0.0 {
            return false;
        }
        self.health = 0.0;
        self.state = SoldierState::Dead;
        self.target = None;
        self.respawn_remaining = self.stats.respawn_seconds;
        true
    }

    pub(crate) fn tick(&mut self, dt: f32, world: &mut World) -> SoldierProgress {
        match self.state {
            SoldierState::Dead | SoldierState::Respawning => {
                self.state = SoldierState::Respawning;
                self.respawn_remaining -= dt;
                if self.respawn_remaining > 0.0 {
                    return SoldierProgress::Unchanged;
                }
                self.health = self.stats.max_health;
                self.position = self.post;
                self.attack_cooldown = 0.0;
                self.state = SoldierState::Idle;
                SoldierProgress::Respawned
            }
            SoldierState::Blocking => {
                self.fight(dt, world);
                SoldierProgress::Unchanged
            }
            SoldierState::Idle | SoldierState::Moving => {
                self.position = self.position.move_towards(self.post, MOVE_SPEED * dt);
                self.state = if self.position.within(self.post, ARRIVE_DISTANCE) {
                    SoldierState::Idle
                } else {
                    SoldierState::Moving
                };
                SoldierProgress::Unchanged
            }
        }
    }

    fn fight(&mut self, dt: f32, world: &mut World) {
        let Some(enemy_id) = self.target else {
            self.state = SoldierState::Moving;
            return;
        };
        let Some(enemy) = world.enemy_mut(enemy_id).filter(|enemy| enemy.is_active()) else {
            self.clear_block_target();
            return;
        };

        let engage_point = enemy.position().offset(-ENGAGE_OFFSET, 0.0);
        self.position = self.position.move_towards(engage_point, MOVE_SPEED * dt);

        self.attack_cooldown -= dt;
        if self.attack_cooldown > 0.0 || !self.position.within(enemy.position(), MELEE_REACH) {
            return;
        }
        let _ = enemy.apply_damage(self.stats.damage, DamageType::Physical, false);
        self.attack_cooldown = self.stats.attack_cooldown;
    }
}
