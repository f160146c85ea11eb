//! Match configuration.

use lane_defence_core::StageId;
use lane_defence_system_flow::FlowConfig;
use lane_defence_system_tower_combat::CombatConfig;
use serde::{Deserialize, Serialize};

/// Everything a [`crate::Simulation`] needs besides content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Stage to play.
    pub stage: StageId,
    /// Phase durations and fallback wave count.
    pub flow: FlowConfig,
    /// Tower combat tunables.
    pub combat: CombatConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            stage: StageId::new(1),
            flow: FlowConfig::default(),
            combat: CombatConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Parses a configuration from TOML text. Missing keys keep their
    /// defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}
