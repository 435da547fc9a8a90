//! On-disk catalog format.
//!
//! The document references attacks by id; [`super::MoveCatalog::from_document`]
//! resolves those references into shared definitions and validates the data.

use serde::{Deserialize, Serialize};

use super::attack::{AttackDefinition, AttackId, AttackType};
use super::reaction::ReactionTable;
use super::weapon::{DodgeProfile, MovementSpeeds, SwitchAnimation, WeaponId};
use super::ClipRef;

/// Catalog format version read by this build.
pub const CATALOG_VERSION: u32 = 1;

/// Root of a catalog JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    /// Format version, must equal [`CATALOG_VERSION`].
    pub version: u32,
    /// All attack definitions.
    #[serde(default)]
    pub attacks: Vec<AttackDefinition>,
    /// All weapons.
    #[serde(default)]
    pub weapons: Vec<WeaponSpec>,
}

/// A combo position referencing attacks by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotSpec {
    /// Ordinary attack.
    pub attack: AttackId,
    /// Charged variant.
    #[serde(default)]
    pub charged: Option<AttackId>,
}

fn full_threshold() -> f32 {
    100.0
}

/// An attack group referencing attacks by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackGroupSpec {
    /// Situation the group is meant for.
    #[serde(default)]
    pub attack_type: AttackType,
    /// Minimum distance to the target.
    #[serde(default)]
    pub min_distance: f32,
    /// Maximum distance to the target.
    pub max_distance: f32,
    /// Health ceiling (percentage).
    #[serde(default = "full_threshold")]
    pub health_threshold: f32,
    /// Combo positions.
    pub slots: Vec<SlotSpec>,
}

fn default_blocked_damage() -> f32 {
    25.0
}

fn yes() -> bool {
    true
}

/// A weapon referencing attacks by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponSpec {
    /// Weapon id.
    pub id: WeaponId,
    /// Ordinary attacks.
    #[serde(default)]
    pub attacks: Vec<AttackGroupSpec>,
    /// Heavy attacks.
    #[serde(default)]
    pub heavy_attacks: Vec<AttackGroupSpec>,
    /// Special attacks.
    #[serde(default)]
    pub special_attacks: Vec<AttackGroupSpec>,
    /// Unblocked hit reactions.
    #[serde(default)]
    pub reactions: ReactionTable,
    /// Blocked hit reactions.
    #[serde(default)]
    pub blocked_reactions: ReactionTable,
    /// Weapon can block.
    #[serde(default)]
    pub can_block: bool,
    /// Blocking pose clip.
    #[serde(default)]
    pub blocking_clip: Option<ClipRef>,
    /// Percentage of damage that gets through a block.
    #[serde(default = "default_blocked_damage")]
    pub blocked_damage_percent: f32,
    /// Weapon can counter.
    #[serde(default = "yes")]
    pub can_counter: bool,
    /// Taunt on counter misuse.
    #[serde(default)]
    pub play_action_if_counter_misused: bool,
    /// Taunt clip.
    #[serde(default)]
    pub counter_misused_clip: Option<ClipRef>,
    /// Locomotion overrides.
    #[serde(default)]
    pub speeds: Option<MovementSpeeds>,
    /// Dodge override.
    #[serde(default)]
    pub dodge: Option<DodgeProfile>,
    /// Roll override.
    #[serde(default)]
    pub roll: Option<DodgeProfile>,
    /// Equip sequence.
    #[serde(default)]
    pub equip: SwitchAnimation,
    /// Unequip sequence.
    #[serde(default)]
    pub unequip: SwitchAnimation,
    /// Push-back distance threshold.
    #[serde(default)]
    pub min_attack_distance: f32,
}
