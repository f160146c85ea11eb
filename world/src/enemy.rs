//! Single enemy state: path traversal, blocking lock and health.

use lane_defence_core::{
    resolve_damage, DamageType, EnemyDefinition, EnemyId, EnemyMotion, EnemySnapshot, PathId,
    TowerId, WorldPoint,
};

use crate::EnemyAttack;

/// Seconds a freshly blocked enemy settles before it starts attacking.
pub const BLOCK_SETTLE_SECONDS: f32 = 0.25;

const ARRIVAL_DISTANCE_SQUARED: f32 = 0.0001;

/// Live enemy owned by the world.
#[derive(Clone, Debug)]
pub struct Enemy {
    id: EnemyId,
    definition: EnemyDefinition,
    path: PathId,
    position: WorldPoint,
    health: f32,
    motion: EnemyMotion,
    next_waypoint: usize,
    blocker: Option<TowerId>,
    block_anchor: WorldPoint,
    blocked_elapsed: f32,
    attack_timer: f32,
    reached_goal: bool,
}

impl Enemy {
    pub(crate) fn new(
        id: EnemyId,
        definition: EnemyDefinition,
        path: PathId,
        spawn: WorldPoint,
    ) -> Self {
        let health = definition.health;
        Self {
            id,
            definition,
            path,
            position: spawn,
            health,
            motion: EnemyMotion::Moving,
            next_waypoint: 1,
            blocker: None,
            block_anchor: spawn,
            blocked_elapsed: 0.0,
            attack_timer: 0.0,
            reached_goal: false,
        }
    }

    /// Identifier of the enemy.
    #[must_use]
    pub fn id(&self) -> EnemyId {
        self.id
    }

    /// Definition the enemy was spawned from.
    #[must_use]
    pub fn definition(&self) -> &EnemyDefinition {
        &self.definition
    }

    /// Path the enemy follows.
    #[must_use]
    pub fn path(&self) -> PathId {
        self.path
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> WorldPoint {
        self.position
    }

    /// Remaining health.
    #[must_use]
    pub fn health(&self) -> f32 {
        self.health
    }

    /// Current motion state.
    #[must_use]
    pub fn motion(&self) -> EnemyMotion {
        self.motion
    }

    /// Tower currently holding the enemy.
    #[must_use]
    pub fn blocker(&self) -> Option<TowerId> {
        self.blocker
    }

    /// Reports whether the enemy is still alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.motion != EnemyMotion::Dead
    }

    /// Reports whether the enemy is alive and still on the battlefield.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_alive() && !self.reached_goal
    }

    /// Reports whether the enemy walked off the end of its path.
    #[must_use]
    pub fn reached_goal(&self) -> bool {
        self.reached_goal
    }

    /// Captures a read-only snapshot.
    #[must_use]
    pub fn snapshot(&self) -> EnemySnapshot {
        EnemySnapshot {
            id: self.id,
            position: self.position,
            health: self.health,
            motion: self.motion,
            flying: self.definition.flying,
            boss: self.definition.boss,
            blockable: self.definition.blockable,
            blocked_by: self.blocker,
        }
    }

    /// Attempts to lock the enemy in place on behalf of `tower`.
    ///
    /// Fails for dead, flying, boss or unblockable enemies, and when another
    /// tower already holds the lock. Re-locking by the holder moves the anchor.
    pub fn try_enter_block(&mut self, tower: TowerId, anchor: WorldPoint) -> bool {
        if !self.is_active()
            || self.definition.boss
            || self.definition.flying
            || !self.definition.blockable
        {
            return false;
        }

        match self.blocker {
            Some(holder) if holder != tower => false,
            Some(_) => {
                self.block_anchor = anchor;
                true
            }
            None => {
                self.blocker = Some(tower);
                self.block_anchor = anchor;
                self.blocked_elapsed = 0.0;
                self.attack_timer = self.definition.attack_interval;
                self.motion = EnemyMotion::Blocked;
                true
            }
        }
    }

    /// Releases the lock if it is held by `tower`, or unconditionally when
    /// `tower` is `None`. Returns whether a lock was cleared.
    pub fn release_block(&mut self, tower: Option<TowerId>) -> bool {
        let Some(holder) = self.blocker else {
            return false;
        };
        if tower.is_some_and(|tower| tower != holder) {
            return false;
        }

        self.blocker = None;
        self.blocked_elapsed = 0.0;
        if self.is_alive() {
            self.motion = EnemyMotion::Moving;
        }
        true
    }

    /// Kills the enemy outright unless it is dead, immune or a boss.
    pub fn try_apply_instant_kill(&mut self) -> bool {
        if !self.is_active() || self.definition.insta_kill_immune || self.definition.boss {
            return false;
        }
        self.health = 0.0;
        self.die();
        true
    }

    /// Applies a hit after resistances and returns the damage dealt.
    pub fn apply_damage(
        &mut self,
        amount: f32,
        damage_type: DamageType,
        half_penetration: bool,
    ) -> f32 {
        if !self.is_active() {
            return 0.0;
        }

        let dealt = resolve_damage(amount, self.definition.resist, damage_type, half_penetration)
            .min(self.health);
        self.health -= dealt;
        if self.health <= 0.0 {
            self.health = 0.0;
            self.die();
        }
        dealt
    }

    pub(crate) fn advance(
        &mut self,
        dt: f32,
        waypoints: &[WorldPoint],
        attacks: &mut Vec<EnemyAttack>,
    ) {
        match self.motion {
            EnemyMotion::Dead => {}
            EnemyMotion::Moving => self.walk(dt, waypoints),
            EnemyMotion::Blocked => {
                self.settle(dt);
                self.blocked_elapsed += dt;
                if self.blocked_elapsed >= BLOCK_SETTLE_SECONDS {
                    self.motion = EnemyMotion::Attacking;
                }
            }
            EnemyMotion::Attacking => {
                self.settle(dt);
                self.attack(dt, attacks);
            }
        }
    }

    fn walk(&mut self, dt: f32, waypoints: &[WorldPoint]) {
        if self.reached_goal {
            return;
        }

        let mut budget = self.definition.move_speed * dt;
        loop {
            let Some(&waypoint) = waypoints.get(self.next_waypoint) else {
                self.reached_goal = true;
                return;
            };

            let distance = self.position.distance(waypoint);
            if distance * distance <= ARRIVAL_DISTANCE_SQUARED || distance <= budget {
                self.position = waypoint;
                budget = (budget - distance).max(0.0);
                self.next_waypoint += 1;
                continue;
            }

            if budget > 0.0 {
                self.position = self.position.move_towards(waypoint, budget);
            }
            return;
        }
    }

    fn settle(&mut self, dt: f32) {
        let step = self.definition.move_speed.max(1.0) * dt;
        self.position = self.position.move_towards(self.block_anchor, step);
    }

    fn attack(&mut self, dt: f32, attacks: &mut Vec<EnemyAttack>) {
        let Some(tower) = self.blocker else {
            return;
        };
        if self.definition.attack_damage <= 0.0 {
            return;
        }

        let interval = self.definition.attack_interval.max(0.1);
        self.attack_timer -= dt;
        while self.attack_timer <= 0.0 {
            self.attack_timer += interval;
            attacks.push(EnemyAttack {
                enemy: self.id,
                tower,
                damage: self.definition.attack_damage,
            });
        }
    }

    fn die(&mut self) {
        self.motion = EnemyMotion::Dead;
        self.blocker = None;
    }
}
