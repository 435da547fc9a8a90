//! Global combat settings and per-fighter configuration.
//!
//! Both are plain serde structs with defaults for every field, so a JSON
//! file only needs to list what it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::adapter::LayerMask;
use crate::catalog::{ClipRef, DodgeProfile, KnockdownDirection, ReactionTable, WeaponId};
use crate::error::SettingsError;

/// World-wide combat rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatSettings {
    /// A counter is only accepted while the defender would block the attack.
    pub only_counter_while_blocking: bool,
    /// Only the first attack of a combo can be countered.
    pub only_counter_first_attack_of_combo: bool,
    /// An attack request turns into a counter when the requester is being
    /// attacked by a fighter in its windup.
    pub same_input_for_attack_and_counter: bool,
    /// Seconds an attack input must be held to count as charged. Read by
    /// input layers, not by the core.
    pub hold_time_for_charged_attacks: f32,
    /// Normalized time at which a hit reaction counts as complete.
    pub reaction_complete_at: f32,
    /// Normalized time at which a roll ends.
    pub roll_end_at: f32,
    /// A dodge keeps turning towards its direction until this normalized time.
    pub dodge_rotate_until: f32,
    /// When set, an ordinary hit that leaves the defender at zero health plays
    /// the death sequence. When clear, only finishers and knockdowns kill and
    /// a zero-health defender merely staggers.
    pub zero_health_without_knockdown_kills: bool,
}

impl Default for CombatSettings {
    fn default() -> Self {
        Self {
            only_counter_while_blocking: false,
            only_counter_first_attack_of_combo: true,
            same_input_for_attack_and_counter: false,
            hold_time_for_charged_attacks: 0.2,
            reaction_complete_at: 0.8,
            roll_end_at: 0.9,
            dodge_rotate_until: 0.8,
            zero_health_without_knockdown_kills: false,
        }
    }
}

impl CombatSettings {
    /// Parses and validates settings from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Json`] for malformed input or
    /// [`SettingsError::Invalid`] for out-of-range values.
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads settings from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Io`] if the file cannot be read, otherwise
    /// the same errors as [`CombatSettings::from_json_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first offending field.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.hold_time_for_charged_attacks < 0.0 {
            return Err(SettingsError::Invalid {
                field: "hold_time_for_charged_attacks",
                reason: format!("{} is negative", self.hold_time_for_charged_attacks),
            });
        }
        for (field, value) in [
            ("reaction_complete_at", self.reaction_complete_at),
            ("roll_end_at", self.roll_end_at),
            ("dodge_rotate_until", self.dodge_rotate_until),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SettingsError::Invalid {
                    field,
                    reason: format!("{value} is outside 0..=1"),
                });
            }
        }
        Ok(())
    }
}

/// Per-fighter setup applied at spawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FighterConfig {
    /// Maximum (and starting) health.
    pub max_health: f32,
    /// Turn rate towards the target during an attack, degrees per second.
    pub rotation_speed_during_attack: f32,
    /// Collision layer index (0..32).
    pub layer: u8,
    /// Layers this fighter's hit-volumes can strike.
    pub hit_layers: LayerMask,
    /// Weapon equipped automatically on the first attack request.
    pub default_weapon: Option<WeaponId>,
    /// Dodging is allowed.
    pub can_dodge: bool,
    /// Rolling is allowed.
    pub can_roll: bool,
    /// Weapon switching is allowed.
    pub can_switch_weapon: bool,
    /// Dodge data used unless the weapon overrides it.
    pub dodge: Option<DodgeProfile>,
    /// Roll data used unless the weapon overrides it.
    pub roll: Option<DodgeProfile>,
    /// Hit reactions used without a weapon.
    pub reactions: ReactionTable,
    /// Blocked reactions used without a weapon.
    pub blocked_reactions: ReactionTable,
    /// Lying clip after a knockdown onto the back.
    pub lying_on_back: Option<ClipRef>,
    /// Get-up clip after a knockdown onto the back.
    pub get_up_from_back: Option<ClipRef>,
    /// Lying clip after a knockdown onto the front.
    pub lying_on_front: Option<ClipRef>,
    /// Get-up clip after a knockdown onto the front.
    pub get_up_from_front: Option<ClipRef>,
    /// Death clips, one picked at random.
    pub death_clips: Vec<ClipRef>,
}

impl Default for FighterConfig {
    fn default() -> Self {
        Self {
            max_health: 25.0,
            rotation_speed_during_attack: 500.0,
            layer: 0,
            hit_layers: LayerMask::ALL,
            default_weapon: None,
            can_dodge: true,
            can_roll: true,
            can_switch_weapon: true,
            dodge: None,
            roll: None,
            reactions: ReactionTable::default(),
            blocked_reactions: ReactionTable::default(),
            lying_on_back: None,
            get_up_from_back: None,
            lying_on_front: None,
            get_up_from_front: None,
            death_clips: Vec::new(),
        }
    }
}

impl FighterConfig {
    /// Creates a configuration with the given maximum health.
    #[must_use]
    pub fn with_health(max_health: f32) -> Self {
        Self {
            max_health,
            ..Self::default()
        }
    }

    /// Default lying and get-up clips for a landing side.
    #[must_use]
    pub fn knockdown_clips(
        &self,
        direction: KnockdownDirection,
    ) -> (Option<&ClipRef>, Option<&ClipRef>) {
        match direction {
            KnockdownDirection::OnBack => {
                (self.lying_on_back.as_ref(), self.get_up_from_back.as_ref())
            }
            KnockdownDirection::OnFront => {
                (self.lying_on_front.as_ref(), self.get_up_from_front.as_ref())
            }
        }
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] for a non-positive maximum health
    /// or a layer outside `0..32`.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_health <= 0.0 {
            return Err(SettingsError::Invalid {
                field: "max_health",
                reason: format!("{} must be positive", self.max_health),
            });
        }
        if self.layer >= 32 {
            return Err(SettingsError::Invalid {
                field: "layer",
                reason: format!("{} is outside 0..32", self.layer),
            });
        }
        Ok(())
    }
}
