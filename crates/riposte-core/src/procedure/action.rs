//! Dodges, rolls, weapon switches and taunts.

use std::sync::Arc;

use glam::Vec3;

use super::{start, Procedure, Step, StepContext};
use crate::adapter::PlaybackId;
use crate::catalog::{ClipRef, WeaponId, WeaponProfile};
use crate::event::CombatEvent;
use crate::fighter::{FighterFlags, FighterId, FighterState};
use crate::selector::AttackRequest;

/// Turn rate while orienting into a dodge, degrees per second.
const DODGE_TURN_SPEED: f32 = 1000.0;

/// Plays `clip` once if there is one.
fn play_optional(ctx: &mut StepContext<'_>, id: FighterId, clip: Option<&ClipRef>) -> Option<PlaybackId> {
    clip.map(|clip| ctx.play(id, clip, 1.0))
}

/// True while `playback` is still running short of its end.
fn still_playing(ctx: &StepContext<'_>, id: FighterId, playback: Option<PlaybackId>) -> bool {
    playback
        .and_then(|p| ctx.progress(id, p))
        .is_some_and(|t| t < 1.0)
}

// =============================================================================
// Dodge and roll
// =============================================================================

/// A dodge or roll in progress.
#[derive(Debug, Clone)]
pub(crate) struct Dodge {
    direction: Vec3,
    playback: PlaybackId,
    /// Single-clip profiles turn the fighter into the dodge direction.
    rotate: bool,
    roll: bool,
}

/// Starts a dodge (`roll == false`) or roll towards `direction`.
///
/// A zero `direction` falls back to the profile's default direction. Returns
/// false when the fighter is busy, not allowed to or has no profile.
pub(crate) fn request_dodge(ctx: &mut StepContext<'_>, id: FighterId, direction: Vec3, roll: bool) -> bool {
    let Some(fighter) = ctx.arena.get(id) else {
        return false;
    };
    let allowed = if roll {
        fighter.config.can_roll
    } else {
        fighter.config.can_dodge
    };
    if fighter.is_busy() || !allowed {
        return false;
    }

    let weapon_profile = fighter
        .weapon()
        .and_then(|w| if roll { w.roll.as_ref() } else { w.dodge.as_ref() });
    let own_profile = if roll {
        fighter.config.roll.as_ref()
    } else {
        fighter.config.dodge.as_ref()
    };
    let Some(profile) = weapon_profile.or(own_profile) else {
        tracing::debug!(fighter = %id, roll, "no dodge profile");
        return false;
    };

    let target_pos = fighter
        .target()
        .and_then(|t| ctx.arena.get(t))
        .map(|t| t.transform.position);
    let transform = fighter.transform;
    let direction = profile.direction(&transform, direction, target_pos);
    let clip = profile.clip_for(&transform, direction).clone();
    let rotate = profile.directional.is_none();

    ctx.emit(CombatEvent::ActionStarted { fighter: id });
    if let Some(fighter) = ctx.arena.get_mut(id) {
        fighter.set_state(FighterState::Dodging);
        fighter.set_flag(FighterFlags::INVINCIBLE, true);
    }
    let playback = ctx.play(id, &clip, 1.0);
    start(
        ctx,
        id,
        Procedure::Dodge(Dodge {
            direction,
            playback,
            rotate,
            roll,
        }),
    );
    true
}

impl Dodge {
    pub fn step(&mut self, ctx: &mut StepContext<'_>, id: FighterId) -> Step {
        let dodging = ctx
            .arena
            .get(id)
            .is_some_and(|f| f.state() == FighterState::Dodging);
        let Some(t) = ctx.progress(id, self.playback).filter(|_| dodging) else {
            self.finish(ctx, id);
            return Step::Done;
        };

        let rotate_until = if self.roll {
            ctx.settings.roll_end_at
        } else {
            ctx.settings.dodge_rotate_until
        };
        if self.rotate && t <= rotate_until {
            let max = DODGE_TURN_SPEED * ctx.dt;
            if let Some(fighter) = ctx.arena.get_mut(id) {
                fighter.transform.rotate_towards(self.direction, max);
            }
        }

        let done = if self.roll {
            t > ctx.settings.roll_end_at
        } else {
            t >= 1.0
        };
        if done {
            self.finish(ctx, id);
            return Step::Done;
        }
        Step::Continue
    }

    /// Cleanup shared by completion and cancellation.
    pub fn finish(&self, ctx: &mut StepContext<'_>, id: FighterId) {
        let Some(fighter) = ctx.arena.get_mut(id) else {
            return;
        };
        fighter.set_flag(FighterFlags::INVINCIBLE, false);
        fighter.reset_state_to_none(FighterState::Dodging);
        if !fighter.is_busy() {
            ctx.emit(CombatEvent::ActionEnded { fighter: id });
        }
    }
}

// =============================================================================
// Weapon switching
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum SwitchPhase {
    /// Putting the old weapon away.
    Unequipping(Option<PlaybackId>),
    /// Drawing the new weapon.
    Equipping(Option<PlaybackId>),
}

/// An animated unequip, equip or both.
#[derive(Debug, Clone)]
pub(crate) struct SwitchWeapon {
    next: Option<Arc<WeaponProfile>>,
    phase: SwitchPhase,
    /// Attack to run once the new weapon is in hand.
    pending: Option<AttackRequest>,
}

/// Switches to the catalog weapon `weapon`, playing unequip and equip clips.
///
/// # Arguments
///
/// * `ctx` - World state
/// * `id` - Fighter switching weapons
/// * `weapon` - Catalog id of the weapon to draw
/// * `pending` - Attack request replayed once the weapon is drawn
///
/// # Returns
///
/// False if the fighter is busy, may not switch, already holds the weapon or
/// the weapon is unknown.
pub(crate) fn request_equip(
    ctx: &mut StepContext<'_>,
    id: FighterId,
    weapon: &WeaponId,
    pending: Option<AttackRequest>,
) -> bool {
    let Some(fighter) = ctx.arena.get(id) else {
        return false;
    };
    if fighter.is_busy() || !fighter.config.can_switch_weapon {
        return false;
    }
    let Some(next) = ctx.catalog.weapon(weapon).cloned() else {
        tracing::warn!(fighter = %id, weapon = %weapon, "unknown weapon");
        return false;
    };
    if fighter.weapon().is_some_and(|w| w.id == next.id) {
        return false;
    }
    begin_switch(ctx, id, Some(next), pending);
    true
}

/// Puts the current weapon away. False if busy, not allowed or unarmed.
pub(crate) fn request_unequip(ctx: &mut StepContext<'_>, id: FighterId) -> bool {
    let Some(fighter) = ctx.arena.get(id) else {
        return false;
    };
    if fighter.is_busy() || !fighter.config.can_switch_weapon || fighter.weapon().is_none() {
        return false;
    }
    begin_switch(ctx, id, None, None);
    true
}

fn begin_switch(
    ctx: &mut StepContext<'_>,
    id: FighterId,
    next: Option<Arc<WeaponProfile>>,
    pending: Option<AttackRequest>,
) {
    ctx.emit(CombatEvent::ActionStarted { fighter: id });
    let Some(fighter) = ctx.arena.get_mut(id) else {
        return;
    };
    fighter.set_state(FighterState::SwitchingWeapon);
    fighter.current_attacks = None;

    let mut switch = SwitchWeapon {
        next,
        phase: SwitchPhase::Unequipping(None),
        pending,
    };
    match fighter.weapon.clone() {
        Some(old) => {
            ctx.emit(CombatEvent::WeaponUnequipped {
                fighter: id,
                weapon: old.id.clone(),
                animated: true,
            });
            let playback = play_optional(ctx, id, old.unequip.clip.as_ref());
            switch.phase = SwitchPhase::Unequipping(playback);
        }
        None => switch.draw(ctx, id),
    }
    start(ctx, id, Procedure::SwitchWeapon(switch));
}

impl SwitchWeapon {
    /// Installs the next weapon and starts its equip clip.
    fn draw(&mut self, ctx: &mut StepContext<'_>, id: FighterId) {
        let Some(fighter) = ctx.arena.get_mut(id) else {
            return;
        };
        fighter.install_weapon(self.next.clone());
        let Some(next) = self.next.clone() else {
            self.phase = SwitchPhase::Equipping(None);
            return;
        };
        tracing::debug!(fighter = %id, weapon = %next.id, "weapon equipped");
        ctx.emit(CombatEvent::WeaponEquipped {
            fighter: id,
            weapon: next.id.clone(),
            animated: true,
        });
        let playback = play_optional(ctx, id, next.equip.clip.as_ref());
        self.phase = SwitchPhase::Equipping(playback);
    }

    pub fn step(&mut self, ctx: &mut StepContext<'_>, id: FighterId) -> Step {
        let switching = ctx
            .arena
            .get(id)
            .is_some_and(|f| f.state() == FighterState::SwitchingWeapon);
        if !switching {
            return Step::Done;
        }

        if let SwitchPhase::Unequipping(playback) = self.phase {
            if still_playing(ctx, id, playback) {
                return Step::Continue;
            }
            self.draw(ctx, id);
        }
        if let SwitchPhase::Equipping(playback) = self.phase {
            if still_playing(ctx, id, playback) {
                return Step::Continue;
            }
        }

        let Some(fighter) = ctx.arena.get_mut(id) else {
            return Step::Done;
        };
        fighter.reset_state_to_none(FighterState::SwitchingWeapon);
        if !fighter.is_busy() {
            ctx.emit(CombatEvent::ActionEnded { fighter: id });
        }
        if let Some(request) = self.pending.take() {
            let outcome = super::attack::handle_attack(ctx, id, request);
            tracing::debug!(fighter = %id, ?outcome, "attack after weapon switch");
        }
        Step::Done
    }
}

/// Swaps weapons instantly without clips. `None` unequips.
///
/// Returns false if `weapon` is not in the catalog or there is nothing to
/// unequip.
pub(crate) fn quick_switch(ctx: &mut StepContext<'_>, id: FighterId, weapon: Option<&WeaponId>) -> bool {
    let next = match weapon {
        Some(weapon_id) => match ctx.catalog.weapon(weapon_id) {
            Some(w) => Some(Arc::clone(w)),
            None => {
                tracing::warn!(fighter = %id, weapon = %weapon_id, "unknown weapon");
                return false;
            }
        },
        None => None,
    };
    let Some(fighter) = ctx.arena.get_mut(id) else {
        return false;
    };
    let old = fighter.weapon.clone();
    if next.is_none() && old.is_none() {
        return false;
    }
    fighter.install_weapon(next.clone());

    match next {
        Some(next) => ctx.emit(CombatEvent::WeaponEquipped {
            fighter: id,
            weapon: next.id.clone(),
            animated: false,
        }),
        None => {
            if let Some(old) = old {
                ctx.emit(CombatEvent::WeaponUnequipped {
                    fighter: id,
                    weapon: old.id.clone(),
                    animated: false,
                });
            }
        }
    }
    true
}

// =============================================================================
// Taunt
// =============================================================================

/// A taunt clip playing out.
#[derive(Debug, Clone)]
pub(crate) struct Taunt {
    playback: PlaybackId,
}

/// Plays `clip` as a taunt.
pub(crate) fn start_taunt(ctx: &mut StepContext<'_>, id: FighterId, clip: &ClipRef) {
    ctx.emit(CombatEvent::ActionStarted { fighter: id });
    let Some(fighter) = ctx.arena.get_mut(id) else {
        return;
    };
    fighter.set_state(FighterState::Taunt);
    let playback = ctx.play(id, clip, 1.0);
    start(ctx, id, Procedure::Taunt(Taunt { playback }));
}

impl Taunt {
    pub fn step(&mut self, ctx: &mut StepContext<'_>, id: FighterId) -> Step {
        let taunting = ctx
            .arena
            .get(id)
            .is_some_and(|f| f.state() == FighterState::Taunt);
        if taunting && still_playing(ctx, id, Some(self.playback)) {
            return Step::Continue;
        }
        if let Some(fighter) = ctx.arena.get_mut(id) {
            fighter.reset_state_to_none(FighterState::Taunt);
            if !fighter.is_busy() {
                ctx.emit(CombatEvent::ActionEnded { fighter: id });
            }
        }
        Step::Done
    }
}
