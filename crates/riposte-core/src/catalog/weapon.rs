//! Weapon profiles: movesets, block/counter capability, dodge data.

use std::fmt;
use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::attack::{AttackDefinition, AttackType};
use super::reaction::ReactionTable;
use super::ClipRef;
use crate::fighter::Transform;

/// Attack range assumed for a weapon without normal attacks.
pub const DEFAULT_MAX_ATTACK_RANGE: f32 = 3.0;

/// Identifier of a weapon inside a catalog.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeaponId(String);

impl WeaponId {
    /// Creates a weapon id from any string-like value.
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

impl fmt::Debug for WeaponId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeaponId({})", self.0)
    }
}

impl fmt::Display for WeaponId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WeaponId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

// =============================================================================
// Attack groups
// =============================================================================

/// One position in a combo: the attack and its optional charged variant.
#[derive(Debug, Clone, PartialEq)]
pub struct AttackSlot {
    /// Attack played for an ordinary request.
    pub attack: Arc<AttackDefinition>,
    /// Attack played when the request is charged.
    pub charged: Option<Arc<AttackDefinition>>,
}

impl AttackSlot {
    /// Creates a slot without a charged variant.
    #[must_use]
    pub fn new(attack: Arc<AttackDefinition>) -> Self {
        Self {
            attack,
            charged: None,
        }
    }

    /// Returns the attack to play for a request.
    #[must_use]
    pub fn resolve(&self, charged: bool) -> &Arc<AttackDefinition> {
        match (&self.charged, charged) {
            (Some(variant), true) => variant,
            _ => &self.attack,
        }
    }
}

/// A combo or single attack with the conditions under which it is eligible.
///
/// Distance bracket, health ceiling and type tag are shared by every slot of
/// the group.
#[derive(Debug, Clone, PartialEq)]
pub struct AttackGroup {
    /// Situation this group is meant for.
    pub attack_type: AttackType,
    /// Minimum distance to the target.
    pub min_distance: f32,
    /// Maximum distance to the target.
    pub max_distance: f32,
    /// Usable while the target's health percentage is at or below this.
    pub health_threshold: f32,
    /// Slots played in sequence.
    pub slots: Vec<AttackSlot>,
}

impl AttackGroup {
    /// Creates a single-slot group.
    #[must_use]
    pub fn single(attack: Arc<AttackDefinition>, min: f32, max: f32, threshold: f32) -> Self {
        Self {
            attack_type: AttackType::Single,
            min_distance: min,
            max_distance: max,
            health_threshold: threshold,
            slots: vec![AttackSlot::new(attack)],
        }
    }

    /// Creates a group holding one counter attack. Counters carry no
    /// distance or health constraints of their own.
    #[must_use]
    pub fn counter(attack: Arc<AttackDefinition>) -> Self {
        Self {
            attack_type: AttackType::Single,
            min_distance: 0.0,
            max_distance: f32::MAX,
            health_threshold: 100.0,
            slots: vec![AttackSlot::new(attack)],
        }
    }

    /// Returns true if `distance` lies inside the bracket (inclusive).
    #[must_use]
    pub fn in_range(&self, distance: f32) -> bool {
        distance >= self.min_distance && distance <= self.max_distance
    }

    /// Returns true if any slot is a finisher.
    #[must_use]
    pub fn has_finisher(&self) -> bool {
        self.slots.iter().any(|s| s.attack.is_finisher())
    }

    /// Returns true if any slot is a blockable synced-reaction attack.
    #[must_use]
    pub fn has_blockable_synced(&self) -> bool {
        self.slots
            .iter()
            .any(|s| s.attack.is_synced_reaction() && !s.attack.is_unblockable())
    }

    /// Returns true if any slot is neither synced nor a finisher.
    #[must_use]
    pub fn has_plain_slot(&self) -> bool {
        self.slots
            .iter()
            .any(|s| !s.attack.is_synced_reaction() && !s.attack.is_finisher())
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the group has no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Which attack list of a weapon a request draws from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum AttackPool {
    /// Ordinary attacks.
    #[default]
    Normal,
    /// Heavy attacks.
    Heavy,
    /// Special attacks.
    Special,
}

// =============================================================================
// Movement, dodge and switching data
// =============================================================================

/// Locomotion speeds while the weapon is held.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementSpeeds {
    /// Walk speed.
    pub walk: f32,
    /// Run speed.
    pub run: f32,
    /// Sprint speed.
    pub sprint: f32,
    /// Speed while locked onto a target.
    pub combat: f32,
}

impl Default for MovementSpeeds {
    fn default() -> Self {
        Self {
            walk: 2.0,
            run: 4.5,
            sprint: 6.5,
            combat: 2.0,
        }
    }
}

/// Direction used when a dodge or roll is requested without one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DodgeDirection {
    /// Away from the current target, backward without one.
    #[default]
    AwayFromTarget,
    /// Towards the current target, forward without one.
    TowardsTarget,
    /// Straight back.
    Backward,
    /// Straight ahead.
    Forward,
}

/// Per-direction clips for a dodge or roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionalClips {
    /// Moving forward.
    pub front: ClipRef,
    /// Moving backward.
    pub back: ClipRef,
    /// Moving left.
    pub left: ClipRef,
    /// Moving right.
    pub right: ClipRef,
}

/// Clip and direction rules for a dodge or roll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DodgeProfile {
    /// Clip used when no directional clips are given.
    pub clip: ClipRef,
    /// Direction used for a zero-length request.
    #[serde(default)]
    pub default_direction: DodgeDirection,
    /// Distinct clips per dominant local direction.
    #[serde(default)]
    pub directional: Option<DirectionalClips>,
}

impl DodgeProfile {
    /// Creates a profile with one clip for every direction.
    #[must_use]
    pub fn new(clip: ClipRef) -> Self {
        Self {
            clip,
            default_direction: DodgeDirection::AwayFromTarget,
            directional: None,
        }
    }

    /// Resolves the world-space direction of a request.
    ///
    /// A non-zero `requested` direction is used as is; otherwise the default
    /// direction is applied relative to `target`.
    #[must_use]
    pub fn direction(&self, transform: &Transform, requested: Vec3, target: Option<Vec3>) -> Vec3 {
        if requested.length_squared() > f32::EPSILON {
            return requested;
        }
        match (self.default_direction, target) {
            (DodgeDirection::Forward, _) | (DodgeDirection::TowardsTarget, None) => {
                transform.forward
            }
            (DodgeDirection::Backward, _) | (DodgeDirection::AwayFromTarget, None) => {
                -transform.forward
            }
            (DodgeDirection::AwayFromTarget, Some(target)) => transform.position - target,
            (DodgeDirection::TowardsTarget, Some(target)) => target - transform.position,
        }
    }

    /// Picks the clip for a world-space direction.
    #[must_use]
    pub fn clip_for(&self, transform: &Transform, direction: Vec3) -> &ClipRef {
        let Some(clips) = &self.directional else {
            return &self.clip;
        };
        let local = transform.to_local_direction(direction);
        if local.z.abs() >= local.x.abs() {
            if local.z > 0.0 {
                &clips.front
            } else {
                &clips.back
            }
        } else if local.x > 0.0 {
            &clips.right
        } else {
            &clips.left
        }
    }
}

/// Clip and timing of an equip or unequip sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SwitchAnimation {
    /// Clip played while switching, if any.
    pub clip: Option<ClipRef>,
    /// Seconds until the weapon model is shown or hidden.
    pub time: f32,
}

// =============================================================================
// Weapon profile
// =============================================================================

/// Everything a fighter needs to know about the weapon it holds.
#[derive(Debug, Clone, PartialEq)]
pub struct WeaponProfile {
    /// Catalog id.
    pub id: WeaponId,
    /// Ordinary attacks.
    pub attacks: Vec<AttackGroup>,
    /// Heavy attacks.
    pub heavy_attacks: Vec<AttackGroup>,
    /// Special attacks.
    pub special_attacks: Vec<AttackGroup>,
    /// Reactions for unblocked hits taken while holding this weapon.
    pub reactions: ReactionTable,
    /// Reactions for blocked hits taken while holding this weapon.
    pub blocked_reactions: ReactionTable,
    /// Weapon can block.
    pub can_block: bool,
    /// Blocking pose clip.
    pub blocking_clip: Option<ClipRef>,
    /// Percentage of damage that gets through a block when this weapon attacks.
    pub blocked_damage_percent: f32,
    /// Weapon can counter.
    pub can_counter: bool,
    /// Play a taunt when a counter is requested with nothing to counter.
    pub play_action_if_counter_misused: bool,
    /// Taunt clip for counter misuse.
    pub counter_misused_clip: Option<ClipRef>,
    /// Locomotion overrides.
    pub speeds: Option<MovementSpeeds>,
    /// Dodge override.
    pub dodge: Option<DodgeProfile>,
    /// Roll override.
    pub roll: Option<DodgeProfile>,
    /// Equip sequence.
    pub equip: SwitchAnimation,
    /// Unequip sequence.
    pub unequip: SwitchAnimation,
    /// Below this distance the target is pushed back at swing start.
    pub min_attack_distance: f32,
}

impl WeaponProfile {
    /// Creates a weapon with the given normal attacks and default settings.
    #[must_use]
    pub fn new(id: impl Into<String>, attacks: Vec<AttackGroup>) -> Self {
        Self {
            id: WeaponId::new(id),
            attacks,
            heavy_attacks: Vec::new(),
            special_attacks: Vec::new(),
            reactions: ReactionTable::default(),
            blocked_reactions: ReactionTable::default(),
            can_block: false,
            blocking_clip: None,
            blocked_damage_percent: 25.0,
            can_counter: true,
            play_action_if_counter_misused: false,
            counter_misused_clip: None,
            speeds: None,
            dodge: None,
            roll: None,
            equip: SwitchAnimation::default(),
            unequip: SwitchAnimation::default(),
            min_attack_distance: 0.0,
        }
    }

    /// Returns the attack list a request draws from.
    #[must_use]
    pub fn pool(&self, pool: AttackPool) -> &[AttackGroup] {
        match pool {
            AttackPool::Normal => &self.attacks,
            AttackPool::Heavy => &self.heavy_attacks,
            AttackPool::Special => &self.special_attacks,
        }
    }

    /// Largest max distance among normal attacks, or
    /// [`DEFAULT_MAX_ATTACK_RANGE`] when there are none.
    #[must_use]
    pub fn max_attack_range(&self) -> f32 {
        if self.attacks.is_empty() {
            return DEFAULT_MAX_ATTACK_RANGE;
        }
        self.attacks
            .iter()
            .map(|g| g.max_distance)
            .fold(0.0, f32::max)
    }

    /// Applies the blocked-damage percentage to `damage`, rounded to whole
    /// points.
    #[must_use]
    pub fn mitigate(&self, damage: f32) -> f32 {
        (damage * (self.blocked_damage_percent / 100.0)).round()
    }

    /// Returns the taunt clip when counter misuse should play one.
    #[must_use]
    pub fn counter_misuse_action(&self) -> Option<&ClipRef> {
        if self.play_action_if_counter_misused {
            self.counter_misused_clip.as_ref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attack(id: &str) -> Arc<AttackDefinition> {
        Arc::new(AttackDefinition::new(id, 10.0, ClipRef::new(id, 1.0)))
    }

    mod group_tests {
        use super::*;
        use crate::catalog::attack::AttackFlags;

        #[test]
        fn range_is_inclusive() {
            let group = AttackGroup::single(attack("a"), 1.0, 3.0, 100.0);
            assert!(group.in_range(1.0));
            assert!(group.in_range(3.0));
            assert!(!group.in_range(3.01));
            assert!(!group.in_range(0.5));
        }

        #[test]
        fn synced_unblockable_is_not_blockable_synced() {
            let mut def = AttackDefinition::new("u", 10.0, ClipRef::new("u", 1.0));
            def.flags = AttackFlags::SYNCED_REACTION | AttackFlags::UNBLOCKABLE;
            let group = AttackGroup::single(Arc::new(def), 0.0, 2.0, 100.0);
            assert!(!group.has_blockable_synced());
            assert!(!group.has_plain_slot());
        }

        #[test]
        fn charged_variant_resolves_only_when_requested() {
            let mut slot = AttackSlot::new(attack("light"));
            slot.charged = Some(attack("charged"));
            assert_eq!(slot.resolve(false).id.as_str(), "light");
            assert_eq!(slot.resolve(true).id.as_str(), "charged");
            assert_eq!(AttackSlot::new(attack("x")).resolve(true).id.as_str(), "x");
        }
    }

    mod weapon_tests {
        use super::*;

        #[test]
        fn max_range_defaults_without_attacks() {
            let weapon = WeaponProfile::new("fists", Vec::new());
            assert!((weapon.max_attack_range() - DEFAULT_MAX_ATTACK_RANGE).abs() < f32::EPSILON);
        }

        #[test]
        fn max_range_is_largest_bracket() {
            let weapon = WeaponProfile::new(
                "sword",
                vec![
                    AttackGroup::single(attack("a"), 0.0, 2.0, 100.0),
                    AttackGroup::single(attack("b"), 1.0, 4.5, 100.0),
                ],
            );
            assert!((weapon.max_attack_range() - 4.5).abs() < f32::EPSILON);
        }

        #[test]
        fn mitigate_uses_percentage() {
            let weapon = WeaponProfile::new("sword", Vec::new());
            assert!((weapon.mitigate(20.0) - 5.0).abs() < f32::EPSILON);
            // 25% of 10 rounds to 3
            assert!((weapon.mitigate(10.0) - 3.0).abs() < f32::EPSILON);
        }

        #[test]
        fn misuse_action_requires_flag() {
            let mut weapon = WeaponProfile::new("sword", Vec::new());
            weapon.counter_misused_clip = Some(ClipRef::new("taunt", 1.0));
            assert!(weapon.counter_misuse_action().is_none());
            weapon.play_action_if_counter_misused = true;
            assert!(weapon.counter_misuse_action().is_some());
        }
    }

    mod dodge_tests {
        use super::*;

        fn profile() -> DodgeProfile {
            DodgeProfile {
                clip: ClipRef::new("dodge", 0.6),
                default_direction: DodgeDirection::AwayFromTarget,
                directional: Some(DirectionalClips {
                    front: ClipRef::new("front", 0.6),
                    back: ClipRef::new("back", 0.6),
                    left: ClipRef::new("left", 0.6),
                    right: ClipRef::new("right", 0.6),
                }),
            }
        }

        #[test]
        fn zero_request_moves_away_from_target() {
            let transform = Transform::new(Vec3::ZERO, Vec3::Z);
            let dir = profile().direction(&transform, Vec3::ZERO, Some(Vec3::new(0.0, 0.0, 2.0)));
            assert!(dir.z < 0.0);
        }

        #[test]
        fn zero_request_without_target_moves_backward() {
            let transform = Transform::new(Vec3::ZERO, Vec3::Z);
            let dir = profile().direction(&transform, Vec3::ZERO, None);
            assert_eq!(dir, -Vec3::Z);
        }

        #[test]
        fn clip_follows_dominant_local_axis() {
            let transform = Transform::new(Vec3::ZERO, Vec3::Z);
            let p = profile();
            assert_eq!(p.clip_for(&transform, Vec3::Z).name, "front");
            assert_eq!(p.clip_for(&transform, -Vec3::Z).name, "back");
            assert_eq!(p.clip_for(&transform, Vec3::X).name, "right");
            assert_eq!(p.clip_for(&transform, -Vec3::X).name, "left");
        }
    }
}
