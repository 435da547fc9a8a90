//! Fighter runtime state.
//!
//! This module provides the per-fighter combat state:
//! - [`FighterId`]: stable handle used for every cross-fighter reference
//! - [`FighterState`]: coarse activity of the fighter
//! - [`AttackSubState`]: the nested swing phase while attacking
//! - [`FighterFlags`]: boolean status bits
//! - [`Fighter`]: the complete fighter record
//!
//! # Architecture
//!
//! Fighters never hold references to each other. Targets, attackers and
//! synced partners are stored as [`FighterId`] handles and resolved through
//! the [`crate::arena::Arena`] on every access, so a despawned fighter simply
//! reads as "no target".
//!
//! Fields that make up the combat state machine are only written by the
//! crate's transition code (world requests, procedures, the hit arbiter and
//! the sync protocol). Consumers read them through accessors.
//!
//! # Example
//!
//! ```
//! use riposte_core::fighter::{Fighter, FighterId, FighterState, Transform};
//! use riposte_core::settings::FighterConfig;
//!
//! let fighter = Fighter::new(FighterId::new(1), FighterConfig::with_health(40.0), Transform::default());
//!
//! assert_eq!(fighter.state(), FighterState::None);
//! assert!((fighter.health() - 40.0).abs() < f32::EPSILON);
//! assert!(!fighter.is_busy());
//! ```

pub mod components;

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

pub use components::{SyncedAction, Transform};

use crate::catalog::{AttackDefinition, AttackGroup, HitVolume, Reaction, WeaponProfile};
use crate::procedure::Procedure;
use crate::settings::{CombatSettings, FighterConfig};

/// Unique identifier for a fighter.
///
/// Ids are assigned monotonically by the arena and ordered by value, which
/// gives the world a deterministic stepping order.
///
/// # Example
///
/// ```
/// use riposte_core::fighter::FighterId;
///
/// let a = FighterId::new(1);
/// let b = FighterId::new(2);
///
/// assert!(a < b);
/// assert_eq!(a.as_u64(), 1);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FighterId(u64);

impl FighterId {
    /// Creates a `FighterId` from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for FighterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FighterId({})", self.0)
    }
}

impl fmt::Display for FighterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for FighterId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<FighterId> for u64 {
    fn from(id: FighterId) -> Self {
        id.0
    }
}

/// Coarse activity of a fighter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FighterState {
    /// Idle; free to act.
    #[default]
    None,
    /// Performing an attack; see [`AttackSubState`].
    Attacking,
    /// Holding a block.
    Blocking,
    /// Dodging or rolling.
    Dodging,
    /// Reacting to an unblocked hit.
    TakingHit,
    /// Reacting to a blocked hit.
    TakingBlockedHit,
    /// Lying on the ground after a knockdown.
    KnockedDown,
    /// Getting up after a knockdown.
    GettingUp,
    /// Equipping or unequipping a weapon.
    SwitchingWeapon,
    /// Dead. Terminal.
    Dead,
    /// Playing a taunt.
    Taunt,
}

impl fmt::Display for FighterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "None",
            Self::Attacking => "Attacking",
            Self::Blocking => "Blocking",
            Self::Dodging => "Dodging",
            Self::TakingHit => "TakingHit",
            Self::TakingBlockedHit => "TakingBlockedHit",
            Self::KnockedDown => "KnockedDown",
            Self::GettingUp => "GettingUp",
            Self::SwitchingWeapon => "SwitchingWeapon",
            Self::Dead => "Dead",
            Self::Taunt => "Taunt",
        };
        f.write_str(name)
    }
}

/// Phase of the current swing. Only meaningful while attacking.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AttackSubState {
    /// No swing in progress.
    #[default]
    Idle,
    /// Before the impact window; the counter window.
    Windup,
    /// Hit-volume active.
    Impact,
    /// After the impact window; combo continuations start here.
    Cooldown,
}

bitflags! {
    /// Boolean status bits of a fighter.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct FighterFlags: u16 {
        /// Hits are ignored.
        const INVINCIBLE = 1 << 0;
        /// The fighter can be hit at all.
        const CAN_TAKE_HIT = 1 << 1;
        /// Block input is held.
        const BLOCKING = 1 << 2;
        /// Locked into a synced exchange with a partner.
        const IN_SYNCED_ANIMATION = 1 << 3;
        /// Body collisions are disabled.
        const IGNORE_COLLISIONS = 1 << 4;
        /// Moving to the attack target.
        const MATCHING_TARGET = 1 << 5;
        /// Another fighter's swing targets this fighter.
        const BEING_ATTACKED = 1 << 6;
        /// A synced blocked reaction already started for the incoming hit.
        const PLAYING_BLOCK_EARLY = 1 << 7;
    }
}

impl Default for FighterFlags {
    fn default() -> Self {
        Self::CAN_TAKE_HIT
    }
}

/// A combat-capable entity.
#[derive(Debug, Clone)]
pub struct Fighter {
    pub(crate) id: FighterId,
    pub(crate) config: FighterConfig,
    pub(crate) health: f32,
    pub(crate) state: FighterState,
    pub(crate) prev_state: FighterState,
    pub(crate) attack_state: AttackSubState,
    pub(crate) flags: FighterFlags,
    pub(crate) transform: Transform,
    pub(crate) weapon: Option<Arc<WeaponProfile>>,
    pub(crate) current_attacks: Option<Arc<AttackGroup>>,
    pub(crate) combo_index: usize,
    pub(crate) current_attack: Option<Arc<AttackDefinition>>,
    pub(crate) combo_queued: bool,
    pub(crate) charged_input: bool,
    pub(crate) attack_start_delay: f32,
    pub(crate) attack_time_normalized: f32,
    pub(crate) target: Option<FighterId>,
    pub(crate) attacking_target: Option<FighterId>,
    pub(crate) attacker: Option<FighterId>,
    pub(crate) synced_action: Option<SyncedAction>,
    pub(crate) current_reaction: Option<Reaction>,
    pub(crate) hit_count: u32,
    pub(crate) active_volume: Option<HitVolume>,
    pub(crate) max_attack_range: f32,
    pub(crate) procedures: Vec<Procedure>,
    /// Bumped by every knockdown; a lying procedure with an older value is stale.
    pub(crate) knockdown_serial: u32,
    /// Transitions not yet reported as events.
    pub(crate) transitions: Vec<(FighterState, FighterState)>,
}

impl Fighter {
    /// Creates a fighter at full health in the `None` state.
    #[must_use]
    pub fn new(id: FighterId, config: FighterConfig, transform: Transform) -> Self {
        let health = config.max_health;
        Self {
            id,
            config,
            health,
            state: FighterState::None,
            prev_state: FighterState::None,
            attack_state: AttackSubState::Idle,
            flags: FighterFlags::default(),
            transform,
            weapon: None,
            current_attacks: None,
            combo_index: 0,
            current_attack: None,
            combo_queued: false,
            charged_input: false,
            attack_start_delay: 0.0,
            attack_time_normalized: 0.0,
            target: None,
            attacking_target: None,
            attacker: None,
            synced_action: None,
            current_reaction: None,
            hit_count: 0,
            active_volume: None,
            max_attack_range: crate::catalog::DEFAULT_MAX_ATTACK_RANGE,
            procedures: Vec::new(),
            knockdown_serial: 0,
            transitions: Vec::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Returns the fighter's id.
    #[must_use]
    pub const fn id(&self) -> FighterId {
        self.id
    }

    /// Returns the spawn configuration.
    #[must_use]
    pub const fn config(&self) -> &FighterConfig {
        &self.config
    }

    /// Current health in `0..=max_health`.
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// Maximum health.
    #[must_use]
    pub const fn max_health(&self) -> f32 {
        self.config.max_health
    }

    /// Current health as a percentage of maximum (0..=100).
    #[must_use]
    pub fn health_percent(&self) -> f32 {
        if self.config.max_health <= 0.0 {
            return 0.0;
        }
        self.health / self.config.max_health * 100.0
    }

    /// Current coarse state.
    #[must_use]
    pub const fn state(&self) -> FighterState {
        self.state
    }

    /// State before the last transition.
    #[must_use]
    pub const fn prev_state(&self) -> FighterState {
        self.prev_state
    }

    /// Current swing phase.
    #[must_use]
    pub const fn attack_state(&self) -> AttackSubState {
        self.attack_state
    }

    /// Status bits.
    #[must_use]
    pub const fn flags(&self) -> FighterFlags {
        self.flags
    }

    /// Position and facing.
    #[must_use]
    pub const fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Collision layer.
    #[must_use]
    pub const fn layer(&self) -> u8 {
        self.config.layer
    }

    /// Equipped weapon.
    #[must_use]
    pub fn weapon(&self) -> Option<&Arc<WeaponProfile>> {
        self.weapon.as_ref()
    }

    /// Slot list of the current attack selection.
    #[must_use]
    pub fn current_attacks(&self) -> Option<&Arc<AttackGroup>> {
        self.current_attacks.as_ref()
    }

    /// Index of the current slot within [`Fighter::current_attacks`].
    #[must_use]
    pub const fn combo_index(&self) -> usize {
        self.combo_index
    }

    /// Attack currently being swung.
    #[must_use]
    pub fn current_attack(&self) -> Option<&Arc<AttackDefinition>> {
        self.current_attack.as_ref()
    }

    /// Normalized time of the current swing.
    #[must_use]
    pub const fn attack_time_normalized(&self) -> f32 {
        self.attack_time_normalized
    }

    /// Fighter this one is focused on.
    #[must_use]
    pub const fn target(&self) -> Option<FighterId> {
        self.target
    }

    /// Target of the swing in progress.
    #[must_use]
    pub const fn attacking_target(&self) -> Option<FighterId> {
        self.attacking_target
    }

    /// Fighter whose swing currently targets this one.
    #[must_use]
    pub const fn attacker(&self) -> Option<FighterId> {
        self.attacker
    }

    /// Synced exchange this fighter is locked into.
    #[must_use]
    pub fn synced_action(&self) -> Option<&SyncedAction> {
        self.synced_action.as_ref()
    }

    /// Number of hit reactions currently playing.
    #[must_use]
    pub const fn hit_count(&self) -> u32 {
        self.hit_count
    }

    /// Hit-volume active for the current impact window.
    #[must_use]
    pub const fn active_volume(&self) -> Option<HitVolume> {
        self.active_volume
    }

    /// Largest max distance among the weapon's normal attacks.
    #[must_use]
    pub const fn max_attack_range(&self) -> f32 {
        self.max_attack_range
    }

    /// Returns true if a combo continuation is queued.
    #[must_use]
    pub const fn combo_queued(&self) -> bool {
        self.combo_queued
    }

    // -------------------------------------------------------------------------
    // Derived state
    // -------------------------------------------------------------------------

    /// Busy with anything other than idling or holding a block.
    #[must_use]
    pub fn in_action(&self) -> bool {
        !matches!(self.state, FighterState::None | FighterState::Blocking)
    }

    /// Returns true once the fighter has died.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.state == FighterState::Dead
    }

    /// In action or dead.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_action() || self.is_dead()
    }

    /// On the ground, including a hit taken while on the ground.
    #[must_use]
    pub fn is_knocked_down(&self) -> bool {
        self.state == FighterState::KnockedDown
            || (self.state == FighterState::TakingHit
                && self.prev_state == FighterState::KnockedDown)
    }

    /// Block input is held.
    #[must_use]
    pub const fn is_blocking(&self) -> bool {
        self.flags.contains(FighterFlags::BLOCKING)
    }

    /// The fighter can currently be hit.
    #[must_use]
    pub const fn can_take_hit(&self) -> bool {
        self.flags.contains(FighterFlags::CAN_TAKE_HIT)
    }

    /// Hits are ignored.
    #[must_use]
    pub const fn is_invincible(&self) -> bool {
        self.flags.contains(FighterFlags::INVINCIBLE)
    }

    /// Locked into a synced exchange.
    #[must_use]
    pub const fn is_in_synced_animation(&self) -> bool {
        self.flags.contains(FighterFlags::IN_SYNCED_ANIMATION)
    }

    /// Another fighter's swing targets this one.
    #[must_use]
    pub const fn is_being_attacked(&self) -> bool {
        self.flags.contains(FighterFlags::BEING_ATTACKED)
    }

    /// The current swing can be countered: windup, and optionally only the
    /// first attack of a combo.
    #[must_use]
    pub fn is_countable(&self, settings: &CombatSettings) -> bool {
        self.attack_state == AttackSubState::Windup
            && (!settings.only_counter_first_attack_of_combo || self.combo_index == 0)
    }

    /// The fighter would block `attack`.
    #[must_use]
    pub fn will_block(&self, attack: &AttackDefinition) -> bool {
        self.is_blocking() && !attack.is_unblockable()
    }

    /// Damage `attack` would deal to this fighter, given the attacker's weapon.
    #[must_use]
    pub fn incoming_damage(
        &self,
        attack: &AttackDefinition,
        attacker_weapon: Option<&WeaponProfile>,
    ) -> f32 {
        if self.will_block(attack) {
            attacker_weapon.map_or(attack.damage, |w| w.mitigate(attack.damage))
        } else {
            attack.damage
        }
    }

    /// Returns true if `attack` would bring this fighter to zero health.
    #[must_use]
    pub fn attack_would_kill(
        &self,
        attack: &AttackDefinition,
        attacker_weapon: Option<&WeaponProfile>,
    ) -> bool {
        self.health - self.incoming_damage(attack, attacker_weapon) <= 0.0
    }

    // -------------------------------------------------------------------------
    // Transitions (crate-internal)
    // -------------------------------------------------------------------------

    /// Moves to `state`, remembering the previous one. Returns true if the
    /// state changed.
    pub(crate) fn set_state(&mut self, state: FighterState) -> bool {
        if self.state == state {
            return false;
        }
        tracing::debug!(fighter = %self.id, from = %self.state, to = %state, "state transition");
        self.transitions.push((self.state, state));
        self.prev_state = self.state;
        self.state = state;
        true
    }

    /// Returns to `None` only if the fighter is still in `expected`.
    pub(crate) fn reset_state_to_none(&mut self, expected: FighterState) -> bool {
        if self.state != expected {
            return false;
        }
        self.set_state(FighterState::None)
    }

    /// Subtracts damage, clamping health to `0..=max_health`.
    pub(crate) fn apply_damage(&mut self, damage: f32) {
        self.health = (self.health - damage.max(0.0)).clamp(0.0, self.config.max_health);
    }

    /// Restores full health.
    pub(crate) fn restore_health(&mut self) {
        self.health = self.config.max_health;
    }

    pub(crate) fn set_flag(&mut self, flag: FighterFlags, value: bool) {
        self.flags.set(flag, value);
    }

    /// Records the fighter whose swing now targets this one.
    pub(crate) fn begin_being_attacked(&mut self, attacker: FighterId) {
        self.flags.insert(FighterFlags::BEING_ATTACKED);
        self.attacker = Some(attacker);
    }

    /// Clears the attacker link if it still refers to `attacker`.
    pub(crate) fn end_being_attacked(&mut self, attacker: FighterId) {
        if self.attacker == Some(attacker) {
            self.flags.remove(FighterFlags::BEING_ATTACKED);
            self.attacker = None;
        }
    }

    /// Equips a weapon instantly and refreshes derived data.
    pub(crate) fn install_weapon(&mut self, weapon: Option<Arc<WeaponProfile>>) {
        self.max_attack_range = weapon
            .as_deref()
            .map_or(crate::catalog::DEFAULT_MAX_ATTACK_RANGE, WeaponProfile::max_attack_range);
        self.weapon = weapon;
        self.current_attacks = None;
    }

    /// Kinds of the multi-tick procedures currently running.
    pub fn running_procedures(&self) -> impl Iterator<Item = crate::procedure::ProcedureKind> + '_ {
        self.procedures.iter().map(Procedure::kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AttackFlags, ClipRef};

    fn fighter(health: f32) -> Fighter {
        Fighter::new(
            FighterId::new(0),
            FighterConfig::with_health(health),
            Transform::default(),
        )
    }

    mod fighter_id_tests {
        use super::*;

        #[test]
        fn display_and_debug() {
            let id = FighterId::new(7);
            assert_eq!(id.to_string(), "7");
            assert_eq!(format!("{id:?}"), "FighterId(7)");
        }

        #[test]
        fn conversions() {
            let id: FighterId = 5u64.into();
            let raw: u64 = id.into();
            assert_eq!(raw, 5);
        }

        #[test]
        fn serialization_roundtrip() {
            let id = FighterId::new(42);
            let json = serde_json::to_string(&id).unwrap();
            let back: FighterId = serde_json::from_str(&json).unwrap();
            assert_eq!(back, id);
        }
    }

    mod state_tests {
        use super::*;

        #[test]
        fn set_state_tracks_previous() {
            let mut f = fighter(10.0);
            assert!(f.set_state(FighterState::Attacking));
            assert!(!f.set_state(FighterState::Attacking));
            assert_eq!(f.prev_state(), FighterState::None);
            f.set_state(FighterState::TakingHit);
            assert_eq!(f.prev_state(), FighterState::Attacking);
            assert_eq!(
                f.transitions,
                vec![
                    (FighterState::None, FighterState::Attacking),
                    (FighterState::Attacking, FighterState::TakingHit),
                ]
            );
        }

        #[test]
        fn reset_to_none_only_from_expected() {
            let mut f = fighter(10.0);
            f.set_state(FighterState::Dodging);
            assert!(!f.reset_state_to_none(FighterState::Attacking));
            assert_eq!(f.state(), FighterState::Dodging);
            assert!(f.reset_state_to_none(FighterState::Dodging));
            assert_eq!(f.state(), FighterState::None);
        }

        #[test]
        fn blocking_is_not_in_action() {
            let mut f = fighter(10.0);
            f.set_state(FighterState::Blocking);
            assert!(!f.in_action());
            assert!(!f.is_busy());
            f.set_state(FighterState::Dead);
            assert!(f.is_busy());
        }

        #[test]
        fn hit_while_down_counts_as_knocked_down() {
            let mut f = fighter(10.0);
            f.set_state(FighterState::KnockedDown);
            f.set_state(FighterState::TakingHit);
            assert!(f.is_knocked_down());
            f.set_state(FighterState::None);
            assert!(!f.is_knocked_down());
        }

        #[test]
        fn countable_respects_first_attack_setting() {
            let settings = CombatSettings::default();
            let mut f = fighter(10.0);
            f.attack_state = AttackSubState::Windup;
            assert!(f.is_countable(&settings));
            f.combo_index = 1;
            assert!(!f.is_countable(&settings));
            let lenient = CombatSettings {
                only_counter_first_attack_of_combo: false,
                ..CombatSettings::default()
            };
            assert!(f.is_countable(&lenient));
            f.attack_state = AttackSubState::Impact;
            assert!(!f.is_countable(&lenient));
        }
    }

    mod health_tests {
        use super::*;

        #[test]
        fn damage_clamps_at_zero() {
            let mut f = fighter(10.0);
            f.apply_damage(25.0);
            assert!(f.health().abs() < f32::EPSILON);
        }

        #[test]
        fn negative_damage_does_not_heal() {
            let mut f = fighter(10.0);
            f.apply_damage(4.0);
            f.apply_damage(-50.0);
            assert!((f.health() - 6.0).abs() < f32::EPSILON);
        }

        #[test]
        fn health_percent() {
            let mut f = fighter(50.0);
            f.apply_damage(30.0);
            assert!((f.health_percent() - 40.0).abs() < 1e-4);
        }

        #[test]
        fn kill_check_uses_block_mitigation() {
            let mut f = fighter(10.0);
            let attack = AttackDefinition::new("heavy", 20.0, ClipRef::new("heavy", 1.0));
            let weapon = WeaponProfile::new("axe", Vec::new());
            assert!(f.attack_would_kill(&attack, Some(&weapon)));

            f.set_flag(FighterFlags::BLOCKING, true);
            // 25% of 20 gets through
            assert!(!f.attack_would_kill(&attack, Some(&weapon)));

            let mut unblockable = attack.clone();
            unblockable.flags |= AttackFlags::UNBLOCKABLE;
            assert!(f.attack_would_kill(&unblockable, Some(&weapon)));
        }
    }

    mod link_tests {
        use super::*;

        #[test]
        fn attack_over_only_clears_matching_attacker() {
            let mut f = fighter(10.0);
            f.begin_being_attacked(FighterId::new(1));
            f.begin_being_attacked(FighterId::new(2));
            f.end_being_attacked(FighterId::new(1));
            assert_eq!(f.attacker(), Some(FighterId::new(2)));
            assert!(f.is_being_attacked());
            f.end_being_attacked(FighterId::new(2));
            assert_eq!(f.attacker(), None);
            assert!(!f.is_being_attacked());
        }

        #[test]
        fn install_weapon_refreshes_range() {
            let mut f = fighter(10.0);
            let weapon = WeaponProfile::new(
                "spear",
                vec![AttackGroup::single(
                    Arc::new(AttackDefinition::new("poke", 5.0, ClipRef::new("poke", 1.0))),
                    0.0,
                    4.0,
                    100.0,
                )],
            );
            f.install_weapon(Some(Arc::new(weapon)));
            assert!((f.max_attack_range() - 4.0).abs() < f32::EPSILON);
            f.install_weapon(None);
            assert!((f.max_attack_range() - 3.0).abs() < f32::EPSILON);
        }
    }
}
