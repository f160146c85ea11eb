#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure target queries over enemy snapshots.
//!
//! The nearest eligible enemy wins. Equal distances resolve to the lower
//! enemy identifier so that identical inputs always select the same target.

use lane_defence_core::{EnemyId, EnemySnapshot, EnemyView, TargetType, WorldPoint};

/// Eligibility rules for a single target search.
#[derive(Clone, Copy, Debug)]
pub struct TargetQuery<'a> {
    origin: WorldPoint,
    range: f32,
    target_type: TargetType,
    exclude: &'a [EnemyId],
    blockable_only: bool,
    unblocked_only: bool,
}

impl<'a> TargetQuery<'a> {
    /// Searches around `origin` within `range` for enemies `target_type` allows.
    #[must_use]
    pub fn new(origin: WorldPoint, range: f32, target_type: TargetType) -> Self {
        Self {
            origin,
            range: range.max(0.0),
            target_type,
            exclude: &[],
            blockable_only: false,
            unblocked_only: false,
        }
    }

    /// Skips the listed enemies.
    #[must_use]
    pub fn excluding(mut self, exclude: &'a [EnemyId]) -> Self {
        self.exclude = exclude;
        self
    }

    /// Keeps only enemies that a soldier could hold: blockable non-bosses.
    #[must_use]
    pub fn blockable(mut self) -> Self {
        self.blockable_only = true;
        self
    }

    /// Keeps only enemies that nobody currently holds.
    #[must_use]
    pub fn unblocked(mut self) -> Self {
        self.unblocked_only = true;
        self
    }

    /// Centre of the search.
    #[must_use]
    pub fn origin(&self) -> WorldPoint {
        self.origin
    }

    fn accepts(&self, snapshot: &EnemySnapshot) -> Option<f32> {
        if !snapshot.is_alive() || !self.target_type.allows(snapshot.flying) {
            return None;
        }
        if self.blockable_only && (snapshot.boss || !snapshot.blockable) {
            return None;
        }
        if self.unblocked_only && snapshot.blocked_by.is_some() {
            return None;
        }
        if self.exclude.contains(&snapshot.id) {
            return None;
        }

        let distance_sq = self.origin.distance_squared(snapshot.position);
        (distance_sq <= self.range * self.range).then_some(distance_sq)
    }
}

/// Returns the nearest enemy the query accepts.
#[must_use]
pub fn closest_target(enemies: &EnemyView, query: &TargetQuery<'_>) -> Option<EnemyId> {
    let mut best: Option<BestCandidate> = None;
    for snapshot in enemies.iter() {
        let Some(distance_sq) = query.accepts(snapshot) else {
            continue;
        };
        let current = BestCandidate {
            distance_sq,
            enemy: snapshot.id,
        };
        match &mut best {
            Some(existing) => {
                if current.precedes(existing) {
                    *existing = current;
                }
            }
            None => best = Some(current),
        }
    }
    best.map(|candidate| candidate.enemy)
}

/// Collects every accepted enemy ordered nearest first.
pub fn ranked_targets(enemies: &EnemyView, query: &TargetQuery<'_>, out: &mut Vec<EnemyId>) {
    out.clear();
    let mut ranked: Vec<BestCandidate> = enemies
        .iter()
        .filter_map(|snapshot| {
            query.accepts(snapshot).map(|distance_sq| BestCandidate {
                distance_sq,
                enemy: snapshot.id,
            })
        })
        .collect();
    ranked.sort_by(BestCandidate::ordering);
    out.extend(ranked.into_iter().map(|candidate| candidate.enemy));
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct BestCandidate {
    distance_sq: f32,
    enemy: EnemyId,
}

impl BestCandidate {
    fn precedes(&self, other: &Self) -> bool {
        if self.distance_sq != other.distance_sq {
            return self.distance_sq < other.distance_sq;
        }
        self.enemy < other.enemy
    }

    fn ordering(left: &Self, right: &Self) -> std::cmp::Ordering {
        left.distance_sq
            .total_cmp(&right.distance_sq)
            .then(left.enemy.cmp(&right.enemy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_defence_core::{EnemyMotion, TowerId};

    fn snapshot(id: u32, x: f32, y: f32) -> EnemySnapshot {
        EnemySnapshot {
            id: EnemyId::new(id),
            position: WorldPoint::new(x, y),
            health: 100.0,
            motion: EnemyMotion::Moving,
            flying: false,
            boss: false,
            blockable: true,
            blocked_by: None,
        }
    }

    #[test]
    fn nearest_enemy_in_range_is_selected() {
        let enemies = EnemyView::from_snapshots(vec![snapshot(1, 2.0, 0.0), snapshot(2, 1.0, 0.0)]);
        let query = TargetQuery::new(WorldPoint::ORIGIN, 2.2, TargetType::Ground);

        assert_eq!(closest_target(&enemies, &query), Some(EnemyId::new(2)));
    }

    #[test]
    fn enemy_outside_range_is_ignored() {
        let enemies = EnemyView::from_snapshots(vec![snapshot(1, 5.0, 0.0)]);
        let query = TargetQuery::new(WorldPoint::ORIGIN, 2.2, TargetType::Both);
        let mut out = Vec::new();

        ranked_targets(&enemies, &query, &mut out);

        assert_eq!(closest_target(&enemies, &query), None);
        assert!(out.is_empty());
    }

    #[test]
    fn smaller_enemy_id_is_preferred_when_distances_match() {
        let enemies = EnemyView::from_snapshots(vec![snapshot(20, 1.0, 0.0), snapshot(10, -1.0, 0.0)]);
        let query = TargetQuery::new(WorldPoint::ORIGIN, 3.0, TargetType::Ground);

        assert_eq!(closest_target(&enemies, &query), Some(EnemyId::new(10)));
    }

    #[test]
    fn ground_towers_skip_flying_enemies() {
        let mut flyer = snapshot(1, 0.5, 0.0);
        flyer.flying = true;
        let enemies = EnemyView::from_snapshots(vec![flyer, snapshot(2, 1.5, 0.0)]);

        let ground = TargetQuery::new(WorldPoint::ORIGIN, 2.0, TargetType::Ground);
        let air = TargetQuery::new(WorldPoint::ORIGIN, 2.0, TargetType::Air);

        assert_eq!(closest_target(&enemies, &ground), Some(EnemyId::new(2)));
        assert_eq!(closest_target(&enemies, &air), Some(EnemyId::new(1)));
    }

    #[test]
    fn blockable_queries_skip_bosses_and_held_enemies() {
        let mut boss = snapshot(1, 0.2, 0.0);
        boss.boss = true;
        let mut held = snapshot(2, 0.4, 0.0);
        held.blocked_by = Some(TowerId::new(9));
        let enemies = EnemyView::from_snapshots(vec![boss, held, snapshot(3, 0.6, 0.0)]);

        let query = TargetQuery::new(WorldPoint::ORIGIN, 2.0, TargetType::Ground)
            .blockable()
            .unblocked();

        assert_eq!(closest_target(&enemies, &query), Some(EnemyId::new(3)));
    }

    #[test]
    fn ranked_targets_are_sorted_and_respect_exclusions() {
        let enemies = EnemyView::from_snapshots(vec![
            snapshot(1, 1.5, 0.0),
            snapshot(2, 0.5, 0.0),
            snapshot(3, 1.0, 0.0),
            snapshot(4, 9.0, 0.0),
        ]);
        let exclude = [EnemyId::new(3)];
        let query = TargetQuery::new(WorldPoint::ORIGIN, 2.0, TargetType::Both).excluding(&exclude);
        let mut out = vec![EnemyId::new(99)];

        ranked_targets(&enemies, &query, &mut out);

        assert_eq!(out, vec![EnemyId::new(2), EnemyId::new(1)]);
    }
}
