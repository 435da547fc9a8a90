//! Hit reactions and reaction tables.

use serde::{Deserialize, Serialize};

use super::attack::HitDirection;
use super::ClipRef;

/// Which side a knocked-down fighter lands on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum KnockdownDirection {
    /// Lying on the back.
    #[default]
    OnBack,
    /// Lying face down.
    OnFront,
}

/// How long and in which pose a knocked-down fighter stays on the ground.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnockdownProfile {
    /// Landing side, used to pick default lying and get-up clips.
    pub direction: KnockdownDirection,
    /// Lying duration range in seconds, drawn uniformly.
    pub lying_duration: [f32; 2],
    /// Replaces the fighter's default lying clip when set.
    pub lying_clip: Option<ClipRef>,
    /// Replaces the fighter's default get-up clip when set.
    pub get_up_clip: Option<ClipRef>,
}

impl Default for KnockdownProfile {
    fn default() -> Self {
        Self {
            direction: KnockdownDirection::OnBack,
            lying_duration: [1.0, 2.0],
            lying_clip: None,
            get_up_clip: None,
        }
    }
}

/// How a hit is portrayed on the defender.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Reaction {
    /// Clip to play. `None` is reported as missing data.
    pub clip: Option<ClipRef>,
    /// Knockdown behaviour, if the reaction floors the defender.
    pub knockdown: Option<KnockdownProfile>,
}

impl Reaction {
    /// Creates a reaction that plays `clip` and leaves the fighter standing.
    #[must_use]
    pub fn with_clip(clip: ClipRef) -> Self {
        Self {
            clip: Some(clip),
            knockdown: None,
        }
    }

    /// Returns true if the reaction ends in a knockdown.
    #[must_use]
    pub const fn is_knockdown(&self) -> bool {
        self.knockdown.is_some()
    }
}

/// A reaction plus the conditions under which it may be picked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionEntry {
    /// Direction this entry portrays.
    #[serde(default)]
    pub direction: HitDirection,
    /// Optional semantic tag matched against an attack's reaction tag.
    #[serde(default)]
    pub tag: Option<String>,
    /// Entry is reserved for hits landing from behind.
    #[serde(default)]
    pub attacked_from_behind: bool,
    /// The reaction itself.
    pub reaction: Reaction,
}

impl ReactionEntry {
    /// Creates an untagged entry for `direction`.
    #[must_use]
    pub fn new(direction: HitDirection, reaction: Reaction) -> Self {
        Self {
            direction,
            tag: None,
            attacked_from_behind: false,
            reaction,
        }
    }

    /// Returns this entry with `tag` set.
    #[must_use]
    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Returns this entry marked as a from-behind reaction.
    #[must_use]
    pub fn from_behind(mut self) -> Self {
        self.attacked_from_behind = true;
        self
    }
}

/// Set of reactions a fighter or weapon picks from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ReactionTable {
    /// The defender turns to face the attacker before reacting, which disables
    /// the from-behind filter.
    pub rotate_to_attacker: bool,
    /// Candidate entries.
    pub reactions: Vec<ReactionEntry>,
}

impl ReactionTable {
    /// Creates a table from entries.
    #[must_use]
    pub fn new(reactions: Vec<ReactionEntry>) -> Self {
        Self {
            rotate_to_attacker: false,
            reactions,
        }
    }

    /// Returns true if there is nothing to pick from.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }
}
