//! Error types for catalog and settings loading.
//!
//! Nothing inside a running simulation returns these errors. Combat
//! operations report recoverable failures through outcome values instead
//! (see [`crate::world::AttackOutcome`]); only data loading can fail, and it
//! fails before play starts.

use thiserror::Error;

/// Errors raised while loading or validating a move catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The catalog file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The catalog document is not valid JSON for the catalog schema.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document declares a format version this build does not read.
    #[error("Unsupported catalog version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version found in the document.
        found: u32,
        /// Version this build reads.
        expected: u32,
    },

    /// Two attacks share one id.
    #[error("Duplicate attack id: {0}")]
    DuplicateAttack(String),

    /// Two weapons share one id.
    #[error("Duplicate weapon id: {0}")]
    DuplicateWeapon(String),

    /// A slot or counter entry names an attack that is not defined.
    #[error("Unknown attack '{attack}' referenced by {owner}")]
    UnknownAttack {
        /// The missing attack id.
        attack: String,
        /// Human-readable location of the reference.
        owner: String,
    },

    /// Timing fractions must lie in `0..=1` and impact must start before it ends.
    #[error("Invalid timing on attack '{attack}': {reason}")]
    InvalidTiming {
        /// Attack carrying the bad timing.
        attack: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A slot group has `min_distance > max_distance` or a negative bound.
    #[error("Invalid distance bracket on weapon '{weapon}': {min}..{max}")]
    InvalidRange {
        /// Weapon owning the group.
        weapon: String,
        /// Lower bound.
        min: f32,
        /// Upper bound.
        max: f32,
    },

    /// A slot group without any slots.
    #[error("Empty attack group on weapon '{0}'")]
    EmptyGroup(String),

    /// Blocked-damage percentage outside `0..=100`.
    #[error("Blocked damage {percent}% on weapon '{weapon}' is outside 0..=100")]
    BlockedDamageOutOfRange {
        /// Weapon carrying the value.
        weapon: String,
        /// Offending percentage.
        percent: f32,
    },

    /// A weapon is marked block-capable but has no blocking clip.
    #[error("Weapon '{0}' can block but has no blocking clip")]
    MissingBlockingClip(String),

    /// A weapon enables the counter-misuse action without a clip to play.
    #[error("Weapon '{0}' plays an action on counter misuse but has no clip")]
    MissingCounterMisusedClip(String),
}

/// Errors raised while loading combat settings or fighter configuration.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The settings document is not valid JSON for the settings schema.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// A value is outside its accepted range.
    #[error("Invalid setting '{field}': {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_attack_message_names_owner() {
        let err = CatalogError::UnknownAttack {
            attack: "slash".into(),
            owner: "weapon 'sword' group 0".into(),
        };
        assert_eq!(
            err.to_string(),
            "Unknown attack 'slash' referenced by weapon 'sword' group 0"
        );
    }

    #[test]
    fn json_errors_convert() {
        let parse: Result<u32, _> = serde_json::from_str("not json");
        let err: CatalogError = parse.unwrap_err().into();
        assert!(matches!(err, CatalogError::Json(_)));
    }
}
