//! Waypoint lookup with a built-in fallback lane.

use std::collections::BTreeMap;

use lane_defence_core::{PathId, WorldPoint};
use tracing::warn;

/// Path used whenever a lane is missing or malformed.
pub const DEFAULT_PATH: [WorldPoint; 3] = [
    WorldPoint::new(-6.0, 0.0),
    WorldPoint::new(0.0, 0.0),
    WorldPoint::new(6.0, 0.0),
];

/// Immutable table of waypoint paths.
#[derive(Clone, Debug, Default)]
pub struct PathTable {
    paths: BTreeMap<PathId, Vec<WorldPoint>>,
}

impl PathTable {
    /// Creates a table from `(id, waypoints)` pairs.
    ///
    /// Paths with fewer than two waypoints are discarded with a warning.
    #[must_use]
    pub fn new(paths: impl IntoIterator<Item = (PathId, Vec<WorldPoint>)>) -> Self {
        let mut table = BTreeMap::new();
        for (id, waypoints) in paths {
            if waypoints.len() < 2 {
                warn!(path = id.get(), "path has fewer than two waypoints, ignoring");
                continue;
            }
            let _ = table.insert(id, waypoints);
        }
        Self { paths: table }
    }

    /// Reports whether a path with the identifier was configured.
    #[must_use]
    pub fn contains(&self, id: PathId) -> bool {
        self.paths.contains_key(&id)
    }

    /// Waypoints of `id`, falling back to path zero and then the built-in lane.
    #[must_use]
    pub fn resolve(&self, id: PathId) -> &[WorldPoint] {
        self.paths
            .get(&id)
            .or_else(|| self.paths.get(&PathId::new(0)))
            .map_or(&DEFAULT_PATH[..], Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_paths_fall_back_to_path_zero_then_default() {
        let empty = PathTable::default();
        assert_eq!(empty.resolve(PathId::new(3)), &DEFAULT_PATH[..]);

        let lane = vec![WorldPoint::new(0.0, 4.0), WorldPoint::new(8.0, 4.0)];
        let table = PathTable::new([(PathId::new(0), lane.clone())]);
        assert_eq!(table.resolve(PathId::new(3)), lane.as_slice());
    }

    #[test]
    fn degenerate_paths_are_dropped() {
        let table = PathTable::new([(PathId::new(1), vec![WorldPoint::ORIGIN])]);
        assert!(!table.contains(PathId::new(1)));
    }
}
