//! Stage content resolution.

use std::collections::BTreeSet;

use lane_defence_core::{ConfigProvider, PathId, StageDefinition, StageId};
use tracing::warn;

/// Loads the stage from `provider`, substituting fallback waves when the
/// stage is missing or has no waves.
#[must_use]
pub fn resolve_stage(
    provider: &dyn ConfigProvider,
    stage: StageId,
    fallback_waves: u32,
) -> StageDefinition {
    match provider.stage_definition(stage) {
        Some(definition) if !definition.waves.is_empty() => definition,
        Some(definition) => {
            warn!(
                stage = stage.get(),
                "stage defines no waves, using fallback waves"
            );
            StageDefinition {
                waves: StageDefinition::fallback(stage, fallback_waves).waves,
                ..definition
            }
        }
        None => {
            warn!(stage = stage.get(), "stage content missing, using fallback stage");
            StageDefinition::fallback(stage, fallback_waves)
        }
    }
}

/// Every enemy definition referenced by the stage's spawn entries.
#[must_use]
pub fn referenced_enemies(stage: &StageDefinition) -> BTreeSet<String> {
    stage
        .waves
        .iter()
        .flat_map(|wave| wave.entries.iter())
        .map(|entry| entry.enemy_id.clone())
        .collect()
}

/// Every path referenced by the stage, plus the default path zero.
#[must_use]
pub fn referenced_paths(stage: &StageDefinition) -> BTreeSet<PathId> {
    let mut paths: BTreeSet<PathId> = stage
        .waves
        .iter()
        .flat_map(|wave| wave.entries.iter())
        .map(|entry| entry.path)
        .collect();
    let _ = paths.insert(PathId::new(0));
    paths
}
