#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative enemy state for Lane Defence.
//!
//! The world owns every live enemy in an id-keyed store. Towers, soldiers and
//! projectiles only ever hold [`EnemyId`] values and look the enemy up again
//! whenever they need it, so removal never leaves a dangling reference.

mod enemy;
mod paths;

use std::collections::BTreeMap;

use lane_defence_core::{EnemyDefinition, EnemyId, Event, PathId, TowerId};
use tracing::debug;

pub use enemy::{Enemy, BLOCK_SETTLE_SECONDS};
pub use paths::{PathTable, DEFAULT_PATH};

/// Attack performed by a blocked enemy against whoever holds it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnemyAttack {
    /// Attacking enemy.
    pub enemy: EnemyId,
    /// Tower whose soldier holds the enemy.
    pub tower: TowerId,
    /// Raw damage of the attack.
    pub damage: f32,
}

/// Sanitised enemy definitions keyed by content identifier.
#[derive(Clone, Debug, Default)]
pub struct EnemyCatalog {
    definitions: BTreeMap<String, EnemyDefinition>,
}

impl EnemyCatalog {
    /// Creates a catalog from the provided definitions.
    #[must_use]
    pub fn new(definitions: impl IntoIterator<Item = EnemyDefinition>) -> Self {
        let definitions = definitions
            .into_iter()
            .map(|definition| (definition.id.clone(), definition.sanitized()))
            .collect();
        Self { definitions }
    }

    /// Reports whether a definition with the identifier exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    /// Definition for `id`, or a default enemy carrying that identifier.
    #[must_use]
    pub fn resolve(&self, id: &str) -> EnemyDefinition {
        self.definitions
            .get(id)
            .cloned()
            .unwrap_or_else(|| EnemyDefinition::fallback(id).sanitized())
    }
}

/// Represents the authoritative enemy state.
#[derive(Debug)]
pub struct World {
    enemies: BTreeMap<EnemyId, Enemy>,
    next_enemy_id: EnemyId,
    paths: PathTable,
    catalog: EnemyCatalog,
    departed: Vec<EnemyId>,
}

impl World {
    /// Creates an empty world using the provided content.
    #[must_use]
    pub fn new(paths: PathTable, catalog: EnemyCatalog) -> Self {
        Self {
            enemies: BTreeMap::new(),
            next_enemy_id: EnemyId::new(0),
            paths,
            catalog,
            departed: Vec::new(),
        }
    }

    /// Spawns an enemy at the start of `path`.
    pub fn spawn_enemy(
        &mut self,
        definition: &str,
        path: PathId,
        out_events: &mut Vec<Event>,
    ) -> EnemyId {
        let id = self.next_enemy_id;
        self.next_enemy_id = EnemyId::new(id.get().saturating_add(1));

        let definition = self.catalog.resolve(definition);
        let spawn = self.paths.resolve(path)[0];
        debug!(enemy = id.get(), definition = %definition.id, "enemy spawned");
        out_events.push(Event::EnemySpawned {
            enemy: id,
            definition: definition.id.clone(),
            path,
            position: spawn,
        });
        let _ = self
            .enemies
            .insert(id, Enemy::new(id, definition, path, spawn));
        id
    }

    /// Advances every enemy by `dt` seconds, collecting attacks made by
    /// blocked enemies.
    pub fn advance_enemies(&mut self, dt: f32, attacks: &mut Vec<EnemyAttack>) {
        let paths = &self.paths;
        for enemy in self.enemies.values_mut() {
            enemy.advance(dt, paths.resolve(enemy.path()), attacks);
        }
    }

    /// Looks up an enemy.
    #[must_use]
    pub fn enemy(&self, id: EnemyId) -> Option<&Enemy> {
        self.enemies.get(&id)
    }

    /// Looks up an enemy for mutation.
    pub fn enemy_mut(&mut self, id: EnemyId) -> Option<&mut Enemy> {
        self.enemies.get_mut(&id)
    }

    /// Iterates over every enemy in identifier order.
    pub fn enemies(&self) -> impl Iterator<Item = &Enemy> {
        self.enemies.values()
    }

    /// Iterates mutably over every enemy in identifier order.
    pub fn enemies_mut(&mut self) -> impl Iterator<Item = &mut Enemy> {
        self.enemies.values_mut()
    }

    /// Removes dead and escaped enemies, announcing each removal.
    pub fn remove_departed(&mut self, out_events: &mut Vec<Event>) {
        self.departed.clear();
        self.departed.extend(
            self.enemies
                .values()
                .filter(|enemy| !enemy.is_active())
                .map(Enemy::id),
        );

        for id in self.departed.drain(..) {
            let Some(enemy) = self.enemies.remove(&id) else {
                continue;
            };
            let definition = enemy.definition();
            if enemy.is_alive() {
                debug!(enemy = id.get(), "enemy reached the goal");
                out_events.push(Event::EnemyReachedGoal {
                    enemy: id,
                    damage_to_base: definition.damage_to_base.max(1),
                });
            } else {
                debug!(enemy = id.get(), "enemy killed");
                out_events.push(Event::EnemyKilled {
                    enemy: id,
                    bounty: definition.bounty,
                    position: enemy.position(),
                    death_burst: definition.death_burst,
                });
            }
        }
    }

    /// Immutable path table.
    #[must_use]
    pub fn paths(&self) -> &PathTable {
        &self.paths
    }
}

/// Query functions that expose read-only world state.
pub mod query {
    use lane_defence_core::{EnemyId, EnemyView, WorldPoint};

    use super::World;

    /// Captures a read-only view of every enemy still on the battlefield.
    #[must_use]
    pub fn enemy_view(world: &World) -> EnemyView {
        EnemyView::from_snapshots(
            world
                .enemies
                .values()
                .filter(|enemy| enemy.is_active())
                .map(|enemy| enemy.snapshot())
                .collect(),
        )
    }

    /// Number of enemies alive and on the battlefield.
    #[must_use]
    pub fn active_enemy_count(world: &World) -> usize {
        world
            .enemies
            .values()
            .filter(|enemy| enemy.is_active())
            .count()
    }

    /// Position of an active enemy.
    #[must_use]
    pub fn enemy_position(world: &World, id: EnemyId) -> Option<WorldPoint> {
        world
            .enemies
            .get(&id)
            .filter(|enemy| enemy.is_active())
            .map(|enemy| enemy.position())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_defence_core::{DamageType, WorldPoint};

    fn world() -> World {
        World::new(
            PathTable::default(),
            EnemyCatalog::new([EnemyDefinition {
                id: "wolf".to_owned(),
                health: 20.0,
                bounty: 9,
                damage_to_base: 0,
                move_speed: 4.0,
                ..EnemyDefinition::default()
            }]),
        )
    }

    #[test]
    fn spawned_enemies_start_at_the_first_waypoint() {
        let mut world = world();
        let mut events = Vec::new();

        let id = world.spawn_enemy("wolf", PathId::new(7), &mut events);

        assert_eq!(
            events,
            vec![Event::EnemySpawned {
                enemy: id,
                definition: "wolf".to_owned(),
                path: PathId::new(7),
                position: WorldPoint::new(-6.0, 0.0),
            }]
        );
        assert_eq!(query::active_enemy_count(&world), 1);
    }

    #[test]
    fn unknown_definitions_spawn_default_enemies() {
        let mut world = world();
        let mut events = Vec::new();

        let id = world.spawn_enemy("phantom", PathId::new(0), &mut events);

        let enemy = world.enemy(id).expect("spawned enemy");
        assert_eq!(enemy.definition().id, "phantom");
        assert_eq!(enemy.health(), 100.0);
    }

    #[test]
    fn departed_enemies_emit_kill_and_goal_events() {
        let mut world = world();
        let mut events = Vec::new();
        let doomed = world.spawn_enemy("wolf", PathId::new(0), &mut events);
        let runner = world.spawn_enemy("wolf", PathId::new(0), &mut events);
        events.clear();

        let _ = world
            .enemy_mut(doomed)
            .expect("doomed")
            .apply_damage(50.0, DamageType::True, false);
        let mut attacks = Vec::new();
        world.advance_enemies(1.0, &mut attacks);
        world.advance_enemies(3.0, &mut attacks);
        world.remove_departed(&mut events);

        assert_eq!(
            events,
            vec![
                Event::EnemyKilled {
                    enemy: doomed,
                    bounty: 9,
                    position: WorldPoint::new(-6.0, 0.0),
                    death_burst: None,
                },
                Event::EnemyReachedGoal {
                    enemy: runner,
                    damage_to_base: 1,
                },
            ]
        );
        assert!(world.enemy(doomed).is_none());
        assert!(world.enemy(runner).is_none());
    }

    #[test]
    fn enemy_view_skips_escaped_enemies() {
        let mut world = world();
        let mut events = Vec::new();
        let _ = world.spawn_enemy("wolf", PathId::new(0), &mut events);
        let mut attacks = Vec::new();
        world.advance_enemies(10.0, &mut attacks);

        assert!(query::enemy_view(&world).is_empty());
    }
}
