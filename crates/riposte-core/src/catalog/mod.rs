//! Move catalog: immutable attack, reaction and weapon data.
//!
//! The catalog is pure data. It is loaded once from a JSON
//! [`CatalogDocument`], validated, and then shared read-only by every fighter
//! in a [`crate::world::CombatWorld`].
//!
//! # Example
//!
//! ```
//! use riposte_core::catalog::MoveCatalog;
//!
//! let json = r#"{
//!     "version": 1,
//!     "attacks": [
//!         { "id": "slash", "damage": 10.0, "clip": { "name": "slash", "length": 1.0 } }
//!     ],
//!     "weapons": [
//!         { "id": "sword", "attacks": [
//!             { "max_distance": 2.5, "slots": [ { "attack": "slash" } ] }
//!         ] }
//!     ]
//! }"#;
//!
//! let catalog = MoveCatalog::from_json_str(json).unwrap();
//! assert_eq!(catalog.attack_count(), 1);
//! assert!(catalog.weapon(&"sword".into()).is_some());
//! ```

pub mod attack;
pub mod document;
pub mod reaction;
pub mod weapon;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use attack::{
    AttackDefinition, AttackFlags, AttackId, AttackTiming, AttackType, CounterEntry, HitDirection,
    HitVolume,
};
pub use document::{AttackGroupSpec, CatalogDocument, SlotSpec, WeaponSpec, CATALOG_VERSION};
pub use reaction::{KnockdownDirection, KnockdownProfile, Reaction, ReactionEntry, ReactionTable};
pub use weapon::{
    AttackGroup, AttackPool, AttackSlot, DirectionalClips, DodgeDirection, DodgeProfile,
    MovementSpeeds, SwitchAnimation, WeaponId, WeaponProfile, DEFAULT_MAX_ATTACK_RANGE,
};

use crate::error::CatalogError;

/// Reference to an animation clip owned by the animation system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipRef {
    /// Clip name understood by the animator.
    pub name: String,
    /// Clip length in seconds at speed 1.
    pub length: f32,
}

impl ClipRef {
    /// Creates a clip reference.
    #[must_use]
    pub fn new(name: impl Into<String>, length: f32) -> Self {
        Self {
            name: name.into(),
            length,
        }
    }
}

/// Validated collection of attacks and weapons.
#[derive(Debug, Clone, Default)]
pub struct MoveCatalog {
    attacks: BTreeMap<AttackId, Arc<AttackDefinition>>,
    weapons: BTreeMap<WeaponId, Arc<WeaponProfile>>,
}

impl MoveCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a catalog from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Json`] for malformed input, or any validation
    /// error from [`MoveCatalog::from_document`].
    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_str(json)?;
        Self::from_document(document)
    }

    /// Reads, parses and validates a catalog file.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`MoveCatalog::from_json_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let catalog = Self::from_json_str(&json)?;
        tracing::debug!(
            path = %path.display(),
            attacks = catalog.attack_count(),
            weapons = catalog.weapon_count(),
            "loaded move catalog"
        );
        Ok(catalog)
    }

    /// Resolves attack references and validates a parsed document.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found: unsupported version, duplicate
    /// ids, bad timing, unknown references, empty or inverted groups,
    /// blocked damage outside `0..=100`, or missing blocking/taunt clips.
    pub fn from_document(document: CatalogDocument) -> Result<Self, CatalogError> {
        if document.version != CATALOG_VERSION {
            return Err(CatalogError::UnsupportedVersion {
                found: document.version,
                expected: CATALOG_VERSION,
            });
        }

        let mut catalog = Self::new();
        for attack in document.attacks {
            attack
                .timing
                .validate()
                .map_err(|reason| CatalogError::InvalidTiming {
                    attack: attack.id.to_string(),
                    reason,
                })?;
            if catalog.attacks.contains_key(&attack.id) {
                return Err(CatalogError::DuplicateAttack(attack.id.to_string()));
            }
            catalog.attacks.insert(attack.id.clone(), Arc::new(attack));
        }

        for attack in catalog.attacks.values() {
            for counter in &attack.counters {
                if !catalog.attacks.contains_key(&counter.attack) {
                    return Err(CatalogError::UnknownAttack {
                        attack: counter.attack.to_string(),
                        owner: format!("counters of attack '{}'", attack.id),
                    });
                }
            }
        }

        let mut seen = BTreeSet::new();
        for spec in document.weapons {
            if !seen.insert(spec.id.clone()) {
                return Err(CatalogError::DuplicateWeapon(spec.id.to_string()));
            }
            let weapon = catalog.resolve_weapon(spec)?;
            catalog.weapons.insert(weapon.id.clone(), Arc::new(weapon));
        }

        Ok(catalog)
    }

    fn resolve_weapon(&self, spec: WeaponSpec) -> Result<WeaponProfile, CatalogError> {
        let id = spec.id.to_string();
        if !(0.0..=100.0).contains(&spec.blocked_damage_percent) {
            return Err(CatalogError::BlockedDamageOutOfRange {
                weapon: id,
                percent: spec.blocked_damage_percent,
            });
        }
        if spec.can_block && spec.blocking_clip.is_none() {
            return Err(CatalogError::MissingBlockingClip(id));
        }
        if spec.play_action_if_counter_misused && spec.counter_misused_clip.is_none() {
            return Err(CatalogError::MissingCounterMisusedClip(id));
        }

        let attacks = self.resolve_groups(&id, "attacks", &spec.attacks)?;
        let heavy_attacks = self.resolve_groups(&id, "heavy_attacks", &spec.heavy_attacks)?;
        let special_attacks = self.resolve_groups(&id, "special_attacks", &spec.special_attacks)?;

        Ok(WeaponProfile {
            id: spec.id,
            attacks,
            heavy_attacks,
            special_attacks,
            reactions: spec.reactions,
            blocked_reactions: spec.blocked_reactions,
            can_block: spec.can_block,
            blocking_clip: spec.blocking_clip,
            blocked_damage_percent: spec.blocked_damage_percent,
            can_counter: spec.can_counter,
            play_action_if_counter_misused: spec.play_action_if_counter_misused,
            counter_misused_clip: spec.counter_misused_clip,
            speeds: spec.speeds,
            dodge: spec.dodge,
            roll: spec.roll,
            equip: spec.equip,
            unequip: spec.unequip,
            min_attack_distance: spec.min_attack_distance,
        })
    }

    fn resolve_groups(
        &self,
        weapon: &str,
        list: &str,
        specs: &[AttackGroupSpec],
    ) -> Result<Vec<AttackGroup>, CatalogError> {
        specs
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                if spec.slots.is_empty() {
                    return Err(CatalogError::EmptyGroup(weapon.to_string()));
                }
                if spec.min_distance < 0.0 || spec.min_distance > spec.max_distance {
                    return Err(CatalogError::InvalidRange {
                        weapon: weapon.to_string(),
                        min: spec.min_distance,
                        max: spec.max_distance,
                    });
                }
                let owner = format!("weapon '{weapon}' {list}[{index}]");
                let slots = spec
                    .slots
                    .iter()
                    .map(|slot| {
                        Ok(AttackSlot {
                            attack: self.lookup(&slot.attack, &owner)?,
                            charged: slot
                                .charged
                                .as_ref()
                                .map(|id| self.lookup(id, &owner))
                                .transpose()?,
                        })
                    })
                    .collect::<Result<Vec<_>, CatalogError>>()?;
                Ok(AttackGroup {
                    attack_type: spec.attack_type,
                    min_distance: spec.min_distance,
                    max_distance: spec.max_distance,
                    health_threshold: spec.health_threshold,
                    slots,
                })
            })
            .collect()
    }

    fn lookup(&self, id: &AttackId, owner: &str) -> Result<Arc<AttackDefinition>, CatalogError> {
        self.attacks
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownAttack {
                attack: id.to_string(),
                owner: owner.to_string(),
            })
    }

    /// Adds or replaces an attack without validation.
    pub fn insert_attack(&mut self, attack: AttackDefinition) -> Arc<AttackDefinition> {
        let attack = Arc::new(attack);
        self.attacks.insert(attack.id.clone(), Arc::clone(&attack));
        attack
    }

    /// Adds or replaces a weapon without validation.
    pub fn insert_weapon(&mut self, weapon: WeaponProfile) -> Arc<WeaponProfile> {
        let weapon = Arc::new(weapon);
        self.weapons.insert(weapon.id.clone(), Arc::clone(&weapon));
        weapon
    }

    /// Looks up an attack.
    #[must_use]
    pub fn attack(&self, id: &AttackId) -> Option<&Arc<AttackDefinition>> {
        self.attacks.get(id)
    }

    /// Looks up a weapon.
    #[must_use]
    pub fn weapon(&self, id: &WeaponId) -> Option<&Arc<WeaponProfile>> {
        self.weapons.get(id)
    }

    /// Number of attacks.
    #[must_use]
    pub fn attack_count(&self) -> usize {
        self.attacks.len()
    }

    /// Number of weapons.
    #[must_use]
    pub fn weapon_count(&self) -> usize {
        self.weapons.len()
    }
}
