//! Damage resolution against armour and magic resistance.

use serde::{Deserialize, Serialize};

use crate::DamageType;

/// Upper bound applied to any resistance fraction after penetration.
pub const MAX_RESISTANCE: f32 = 0.9;

/// Armour and magic resistance of a defender, expressed as percentages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResistProfile {
    /// Percentage of physical damage absorbed, nominally `0..=100`.
    pub physical: f32,
    /// Percentage of magic damage absorbed, nominally `0..=100`.
    pub magic: f32,
}

impl ResistProfile {
    /// Creates a profile from physical armour and magic resistance percentages.
    #[must_use]
    pub const fn new(physical: f32, magic: f32) -> Self {
        Self { physical, magic }
    }
}

/// Computes the final damage a defender receives from a single hit.
///
/// Physical damage is reduced by armour, halved when `half_penetration` is
/// set. Magic damage is reduced by magic resistance. True damage ignores both.
/// Non-positive or non-finite amounts resolve to zero.
#[must_use]
pub fn resolve_damage(
    amount: f32,
    resist: ResistProfile,
    damage_type: DamageType,
    half_penetration: bool,
) -> f32 {
    if !amount.is_finite() || amount <= 0.0 {
        return 0.0;
    }

    let percent = match damage_type {
        DamageType::Physical if half_penetration => resist.physical * 0.5,
        DamageType::Physical => resist.physical,
        DamageType::Magic => resist.magic,
        DamageType::True => return amount,
    };

    let fraction = if percent.is_finite() {
        (percent / 100.0).clamp(0.0, MAX_RESISTANCE)
    } else {
        0.0
    };

    (amount * (1.0 - fraction)).max(0.0)
}
