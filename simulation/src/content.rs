//! TOML content manifest implementing [`ConfigProvider`].

use std::{collections::BTreeMap, fs, path::Path};

use lane_defence_core::{
    ConfigProvider, EnemyDefinition, MetaUpgradeTiers, PathId, ProjectileProfile,
    StageDefinition, StageId, TowerDefinition, TowerType, WorldPoint,
};
use serde::Deserialize;
use thiserror::Error;

/// Manifest version understood by [`StaticContent`].
pub const SUPPORTED_CONTENT_VERSION: u32 = 1;

/// Failures while loading a content manifest.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The file could not be read.
    #[error("failed to read content manifest at {path}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The manifest is not valid TOML for the content schema.
    #[error("failed to parse content manifest")]
    Parse(#[from] toml::de::Error),
    /// The manifest declares a version this build does not understand.
    #[error("unsupported content manifest version {found}; expected {expected}")]
    UnsupportedVersion {
        /// Version declared by the manifest.
        found: u32,
        /// Version this build reads.
        expected: u32,
    },
    /// Two entries share an identifier.
    #[error("content manifest defines {kind} `{id}` more than once")]
    Duplicate {
        /// Kind of entry.
        kind: &'static str,
        /// Duplicated identifier.
        id: String,
    },
}

#[derive(Debug, Deserialize)]
struct Manifest {
    version: u32,
    #[serde(default)]
    towers: Vec<TowerDefinition>,
    #[serde(default)]
    enemies: Vec<EnemyDefinition>,
    #[serde(default)]
    stages: Vec<StageDefinition>,
    #[serde(default)]
    paths: Vec<PathEntry>,
    #[serde(default)]
    projectiles: Vec<ProjectileProfile>,
    #[serde(default)]
    meta: MetaUpgradeTiers,
}

#[derive(Debug, Deserialize)]
struct PathEntry {
    id: PathId,
    points: Vec<WorldPoint>,
}

/// Content loaded once from a manifest and served by identifier.
#[derive(Clone, Debug, Default)]
pub struct StaticContent {
    towers: BTreeMap<TowerType, TowerDefinition>,
    enemies: BTreeMap<String, EnemyDefinition>,
    stages: BTreeMap<StageId, StageDefinition>,
    paths: BTreeMap<PathId, Vec<WorldPoint>>,
    projectiles: BTreeMap<String, ProjectileProfile>,
    meta: MetaUpgradeTiers,
}

impl StaticContent {
    /// Parses a manifest from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ContentError> {
        let manifest: Manifest = toml::from_str(contents)?;
        if manifest.version != SUPPORTED_CONTENT_VERSION {
            return Err(ContentError::UnsupportedVersion {
                found: manifest.version,
                expected: SUPPORTED_CONTENT_VERSION,
            });
        }

        Ok(Self {
            towers: index(manifest.towers, "tower", |tower| {
                (tower.tower_type, format!("{:?}", tower.tower_type))
            })?,
            enemies: index(manifest.enemies, "enemy", |enemy| {
                (enemy.id.clone(), enemy.id.clone())
            })?,
            stages: index(manifest.stages, "stage", |stage| {
                (stage.id, stage.id.get().to_string())
            })?,
            paths: index(manifest.paths, "path", |entry| {
                (entry.id, entry.id.get().to_string())
            })?
            .into_iter()
            .map(|(id, entry)| (id, entry.points))
            .collect(),
            projectiles: index(manifest.projectiles, "projectile", |profile| {
                (profile.id.clone(), profile.id.clone())
            })?,
            meta: manifest.meta,
        })
    }

    /// Reads and parses a manifest file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ContentError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ContentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Meta-upgrade tiers declared by the manifest.
    #[must_use]
    pub fn meta(&self) -> &MetaUpgradeTiers {
        &self.meta
    }
}

fn index<K: Ord, V>(
    entries: impl IntoIterator<Item = V>,
    kind: &'static str,
    key: impl Fn(&V) -> (K, String),
) -> Result<BTreeMap<K, V>, ContentError> {
    let mut map = BTreeMap::new();
    for entry in entries {
        let (id, label) = key(&entry);
        if map.insert(id, entry).is_some() {
            return Err(ContentError::Duplicate { kind, id: label });
        }
    }
    Ok(map)
}

impl ConfigProvider for StaticContent {
    fn tower_definition(&self, tower_type: TowerType) -> Option<TowerDefinition> {
        self.towers.get(&tower_type).cloned()
    }

    fn stage_definition(&self, stage: StageId) -> Option<StageDefinition> {
        self.stages.get(&stage).cloned()
    }

    fn enemy_definition(&self, id: &str) -> Option<EnemyDefinition> {
        self.enemies.get(id).cloned()
    }

    fn path(&self, path: PathId) -> Option<Vec<WorldPoint>> {
        self.paths.get(&path).cloned()
    }

    fn projectile_profile(&self, id: &str) -> Option<ProjectileProfile> {
        self.projectiles.get(id).cloned()
    }
}
