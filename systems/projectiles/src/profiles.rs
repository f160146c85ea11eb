use std::collections::BTreeMap;

use lane_defence_core::{ConfigProvider, ProjectileProfile};
use tracing::warn;

/// Sanitised projectile profiles keyed by identifier.
#[derive(Clone, Debug, Default)]
pub struct ProjectileProfiles {
    profiles: BTreeMap<String, ProjectileProfile>,
}

impl ProjectileProfiles {
    /// Creates a table from explicit profiles.
    #[must_use]
    pub fn new(profiles: impl IntoIterator<Item = ProjectileProfile>) -> Self {
        let profiles = profiles
            .into_iter()
            .map(|profile| (profile.id.clone(), profile.sanitized()))
            .collect();
        Self { profiles }
    }

    /// Resolves every requested identifier through `provider`, falling back
    /// to the built-in profile of the same name and finally to a generic one.
    #[must_use]
    pub fn from_provider<'a>(
        provider: &dyn ConfigProvider,
        ids: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut profiles = BTreeMap::new();
        for id in ids {
            if id.is_empty() || profiles.contains_key(id) {
                continue;
            }
            let profile = provider
                .projectile_profile(id)
                .or_else(|| ProjectileProfile::builtin(id))
                .unwrap_or_else(|| {
                    warn!(profile = id, "projectile profile missing, using generic profile");
                    ProjectileProfile {
                        id: id.to_owned(),
                        ..ProjectileProfile::default()
                    }
                });
            let _ = profiles.insert(id.to_owned(), profile.sanitized());
        }
        Self { profiles }
    }

    /// Profile for `id`; unknown identifiers get a built-in or generic profile.
    #[must_use]
    pub fn get(&self, id: &str) -> ProjectileProfile {
        self.profiles
            .get(id)
            .cloned()
            .or_else(|| ProjectileProfile::builtin(id))
            .unwrap_or_else(|| ProjectileProfile {
                id: id.to_owned(),
                ..ProjectileProfile::default()
            })
            .sanitized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lane_defence_core::{NoContent, ProjectileMoveType};

    #[test]
    fn known_ids_resolve_to_builtins() {
        let profiles = ProjectileProfiles::from_provider(&NoContent, ["Mage_Bolt", "Mystery"]);

        let bolt = profiles.get("Mage_Bolt");
        assert_eq!(bolt.speed, 9.0);
        assert_eq!(bolt.move_type, ProjectileMoveType::Homing);

        let mystery = profiles.get("Mystery");
        assert_eq!(mystery.id, "Mystery");
        assert_eq!(mystery.max_hits, 1);
    }

    #[test]
    fn explicit_profiles_are_sanitized() {
        let profiles = ProjectileProfiles::new([ProjectileProfile {
            id: "Slow".to_owned(),
            speed: 0.1,
            ..ProjectileProfile::default()
        }]);

        assert_eq!(profiles.get("Slow").speed, 0.5);
    }
}
