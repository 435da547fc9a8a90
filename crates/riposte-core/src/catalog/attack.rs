//! Attack definitions.
//!
//! An [`AttackDefinition`] is one swing: its clip, damage, timing windows,
//! flags and the counters a defender may answer it with. Definitions are
//! immutable once the catalog is loaded and are shared through `Arc`.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::reaction::Reaction;
use super::ClipRef;

/// Identifier of an attack inside a catalog.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttackId(String);

impl AttackId {
    /// Creates an attack id from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AttackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttackId({})", self.0)
    }
}

impl fmt::Display for AttackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AttackId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Category of an attack group, used to match the target's situation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AttackType {
    /// A standalone attack.
    #[default]
    Single,
    /// A chain of attacks played in sequence.
    Combo,
    /// Only usable on a target that has not noticed the attacker.
    Stealth,
    /// Only usable on a knocked-down target.
    GroundAttack,
}

impl AttackType {
    /// Returns true for the everyday attack types (`Single` and `Combo`).
    #[must_use]
    pub const fn is_normal(self) -> bool {
        matches!(self, Self::Single | Self::Combo)
    }
}

/// Which hit-volume an attack activates during its impact window.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum HitVolume {
    /// The equipped weapon.
    #[default]
    Weapon,
    /// Left fist.
    LeftHand,
    /// Right fist.
    RightHand,
    /// Left foot.
    LeftFoot,
    /// Right foot.
    RightFoot,
}

/// Direction a hit lands from, relative to the defender.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum HitDirection {
    /// Matches reactions with no direction preference.
    #[default]
    Any,
    /// From the defender's left.
    Left,
    /// From the defender's right.
    Right,
    /// From above.
    Top,
    /// From below.
    Bottom,
    /// Computed from the contact point at hit time.
    FromCollision,
}

bitflags! {
    /// Behaviour switches of an attack.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
    pub struct AttackFlags: u32 {
        /// Always reduces an unblocked target to zero health.
        const FINISHER = 1 << 0;
        /// Locks attacker and defender into a paired animation when unblocked.
        const SYNCED_REACTION = 1 << 1;
        /// Starts the defender's blocked reaction early, in sync with the swing.
        const SYNCED_BLOCKED_REACTION = 1 << 2;
        /// The defender may answer this attack with one of its counters.
        const CAN_BE_COUNTERED = 1 << 3;
        /// Fighters other than the declared target can be struck.
        const CAN_HIT_MULTIPLE_TARGETS = 1 << 4;
        /// Ignores the defender's block.
        const UNBLOCKABLE = 1 << 5;
        /// Closes the distance to the target during the move window.
        const MOVE_TO_TARGET = 1 << 6;
        /// Disables body collisions while moving to the target.
        const IGNORE_COLLISIONS = 1 << 7;
        /// A queued combo continuation waits for `wait_for_attack`.
        const WAIT_FOR_NEXT_ATTACK = 1 << 8;
        /// Keeps turning towards the target for the whole swing.
        const ALWAYS_LOOK_AT_TARGET = 1 << 9;
    }
}

/// Normalized (0..1) timing marks of an attack clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackTiming {
    /// Windup ends and the hit-volume activates.
    pub impact_start: f32,
    /// Impact ends and the hit-volume deactivates.
    pub impact_end: f32,
    /// Synced reaction is triggered on the defender.
    pub sync_start: f32,
    /// Synced blocked reaction is triggered on the defender.
    pub block_sync_start: f32,
    /// Moment the blow visually connects, used for reaction alignment.
    pub hitting_time: f32,
    /// Same as `hitting_time`, for the blocked variant.
    pub blocked_hitting_time: f32,
    /// Start of the move-to-target window.
    pub move_start: f32,
    /// End of the move-to-target window.
    pub move_end: f32,
    /// Earliest time a queued combo continuation may start.
    pub wait_for_attack: f32,
}

impl Default for AttackTiming {
    fn default() -> Self {
        Self {
            impact_start: 0.3,
            impact_end: 0.5,
            sync_start: 0.0,
            block_sync_start: 0.0,
            hitting_time: 0.3,
            blocked_hitting_time: 0.3,
            move_start: 0.0,
            move_end: 0.3,
            wait_for_attack: 0.0,
        }
    }
}

impl AttackTiming {
    /// Checks that all marks are fractions and the impact window is ordered.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated constraint.
    pub fn validate(&self) -> Result<(), String> {
        let marks = [
            ("impact_start", self.impact_start),
            ("impact_end", self.impact_end),
            ("sync_start", self.sync_start),
            ("block_sync_start", self.block_sync_start),
            ("hitting_time", self.hitting_time),
            ("blocked_hitting_time", self.blocked_hitting_time),
            ("move_start", self.move_start),
            ("move_end", self.move_end),
            ("wait_for_attack", self.wait_for_attack),
        ];
        for (name, value) in marks {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{name} = {value} is outside 0..=1"));
            }
        }
        if self.impact_start > self.impact_end {
            return Err(format!(
                "impact_start {} is after impact_end {}",
                self.impact_start, self.impact_end
            ));
        }
        if self.move_start > self.move_end {
            return Err(format!(
                "move_start {} is after move_end {}",
                self.move_start, self.move_end
            ));
        }
        Ok(())
    }
}

/// A counter the defender may perform against an attack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterEntry {
    /// The attack played as the counter.
    pub attack: AttackId,
    /// Counter is only usable while the countered fighter's health percentage
    /// is at or below this value.
    #[serde(default = "full_threshold")]
    pub health_threshold: f32,
    /// Normalized time of the countered swing at which the counter starts.
    #[serde(default)]
    pub start_time: f32,
}

fn full_threshold() -> f32 {
    100.0
}

fn unit_speed() -> f32 {
    1.0
}

fn default_distance_from_target() -> f32 {
    1.0
}

/// One attack, as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackDefinition {
    /// Catalog id.
    pub id: AttackId,
    /// Clip played for the swing. `None` is reported as missing data.
    #[serde(default)]
    pub clip: Option<ClipRef>,
    /// Playback speed multiplier.
    #[serde(default = "unit_speed")]
    pub speed: f32,
    /// Damage dealt by an unblocked hit.
    pub damage: f32,
    /// Behaviour switches.
    #[serde(default)]
    pub flags: AttackFlags,
    /// Timing marks.
    #[serde(default)]
    pub timing: AttackTiming,
    /// Hit-volume activated during impact.
    #[serde(default)]
    pub hit_volume: HitVolume,
    /// Declared hit direction for reaction selection.
    #[serde(default)]
    pub hit_direction: HitDirection,
    /// Tag matched against reaction tags.
    #[serde(default)]
    pub reaction_tag: Option<String>,
    /// Reaction forced on an unblocked defender instead of a table pick.
    #[serde(default)]
    pub reaction: Option<Reaction>,
    /// Reaction forced on a blocking defender instead of a table pick.
    #[serde(default)]
    pub blocked_reaction: Option<Reaction>,
    /// Counters a defender may answer this attack with.
    #[serde(default)]
    pub counters: Vec<CounterEntry>,
    /// Stop distance when moving to the target.
    #[serde(default = "default_distance_from_target")]
    pub distance_from_target: f32,
}

impl AttackDefinition {
    /// Creates a plain attack with default timing and no flags.
    #[must_use]
    pub fn new(id: impl Into<String>, damage: f32, clip: ClipRef) -> Self {
        Self {
            id: AttackId::new(id),
            clip: Some(clip),
            speed: 1.0,
            damage,
            flags: AttackFlags::empty(),
            timing: AttackTiming::default(),
            hit_volume: HitVolume::Weapon,
            hit_direction: HitDirection::Any,
            reaction_tag: None,
            reaction: None,
            blocked_reaction: None,
            counters: Vec::new(),
            distance_from_target: 1.0,
        }
    }

    /// Returns true if the attack carries the finisher flag.
    #[must_use]
    pub const fn is_finisher(&self) -> bool {
        self.flags.contains(AttackFlags::FINISHER)
    }

    /// Returns true if the attack pairs with the defender when unblocked.
    #[must_use]
    pub const fn is_synced_reaction(&self) -> bool {
        self.flags.contains(AttackFlags::SYNCED_REACTION)
    }

    /// Returns true if the attack pairs with the defender when blocked.
    #[must_use]
    pub const fn is_synced_blocked_reaction(&self) -> bool {
        self.flags.contains(AttackFlags::SYNCED_BLOCKED_REACTION)
    }

    /// Returns true if the attack ignores blocking.
    #[must_use]
    pub const fn is_unblockable(&self) -> bool {
        self.flags.contains(AttackFlags::UNBLOCKABLE)
    }

    /// Returns true if its forced reaction knocks the defender down.
    #[must_use]
    pub fn knocks_down(&self) -> bool {
        self.reaction.as_ref().is_some_and(Reaction::is_knockdown)
    }

    /// Returns true if the attack is allowed to end a fight: a finisher or an
    /// explicit knockdown.
    #[must_use]
    pub fn may_finish(&self) -> bool {
        self.is_finisher() || self.knocks_down()
    }

    /// Returns true if either synced variant is declared.
    #[must_use]
    pub const fn is_any_synced(&self) -> bool {
        self.flags
            .intersects(AttackFlags::SYNCED_REACTION.union(AttackFlags::SYNCED_BLOCKED_REACTION))
    }

    /// Clip length in seconds adjusted for playback speed, or zero.
    #[must_use]
    pub fn duration(&self) -> f32 {
        match &self.clip {
            Some(clip) if self.speed > 0.0 => clip.length / self.speed,
            Some(clip) => clip.length,
            None => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::reaction::KnockdownProfile;

    fn clip() -> ClipRef {
        ClipRef::new("slash", 1.0)
    }

    mod timing_tests {
        use super::*;

        #[test]
        fn default_timing_is_valid() {
            assert!(AttackTiming::default().validate().is_ok());
        }

        #[test]
        fn out_of_range_mark_is_rejected() {
            let timing = AttackTiming {
                sync_start: 1.5,
                ..AttackTiming::default()
            };
            let err = timing.validate().unwrap_err();
            assert!(err.contains("sync_start"));
        }

        #[test]
        fn inverted_impact_window_is_rejected() {
            let timing = AttackTiming {
                impact_start: 0.7,
                impact_end: 0.4,
                ..AttackTiming::default()
            };
            assert!(timing.validate().is_err());
        }
    }

    mod definition_tests {
        use super::*;

        #[test]
        fn plain_attack_may_not_finish() {
            let attack = AttackDefinition::new("slash", 10.0, clip());
            assert!(!attack.may_finish());
            assert!(!attack.is_any_synced());
        }

        #[test]
        fn finisher_may_finish() {
            let mut attack = AttackDefinition::new("execute", 10.0, clip());
            attack.flags |= AttackFlags::FINISHER;
            assert!(attack.may_finish());
        }

        #[test]
        fn knockdown_reaction_may_finish() {
            let mut attack = AttackDefinition::new("sweep", 10.0, clip());
            attack.reaction = Some(Reaction {
                knockdown: Some(KnockdownProfile::default()),
                ..Reaction::default()
            });
            assert!(attack.knocks_down());
            assert!(attack.may_finish());
        }

        #[test]
        fn duration_accounts_for_speed() {
            let mut attack = AttackDefinition::new("slash", 10.0, ClipRef::new("slash", 2.0));
            attack.speed = 2.0;
            assert!((attack.duration() - 1.0).abs() < f32::EPSILON);
        }

        #[test]
        fn flags_parse_from_names() {
            let json = r#"{"id":"x","damage":5.0,"flags":"FINISHER | UNBLOCKABLE"}"#;
            let attack: AttackDefinition = serde_json::from_str(json).unwrap();
            assert!(attack.is_finisher());
            assert!(attack.is_unblockable());
            assert!(attack.clip.is_none());
            assert!((attack.speed - 1.0).abs() < f32::EPSILON);
        }

        #[test]
        fn counter_entry_defaults() {
            let entry: CounterEntry = serde_json::from_str(r#"{"attack":"riposte"}"#).unwrap();
            assert_eq!(entry.attack, AttackId::new("riposte"));
            assert!((entry.health_threshold - 100.0).abs() < f32::EPSILON);
            assert!(entry.start_time.abs() < f32::EPSILON);
        }
    }
}
