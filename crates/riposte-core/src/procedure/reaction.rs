//! Hit reactions, knockdowns and the death sequence.
//!
//! A hit reaction runs until the defender's current clip reaches
//! [`CombatSettings::reaction_complete_at`](crate::settings::CombatSettings).
//! Overlapping reactions share one `hit_count`; only the last one to finish
//! restores the defender's state.

use rand::Rng;

use super::{cancel_all, start, Procedure, Step, StepContext};
use crate::adapter::PlaybackId;
use crate::catalog::{ClipRef, KnockdownProfile, Reaction};
use crate::event::CombatEvent;
use crate::fighter::{FighterFlags, FighterId, FighterState};

// =============================================================================
// Hit reaction
// =============================================================================

/// One playing hit reaction.
#[derive(Debug, Clone)]
pub(crate) struct HitReaction {
    reaction: Reaction,
    blocked: bool,
    will_be_dead: bool,
    playback: Option<PlaybackId>,
}

/// Starts a (blocked) hit reaction on `id`.
///
/// A defender at zero health whose reaction knocks down, or who was struck
/// by a finisher, dies once the reaction has played.
pub(crate) fn start_hit_reaction(
    ctx: &mut StepContext<'_>,
    id: FighterId,
    attacker: FighterId,
    reaction: Reaction,
    blocked: bool,
    finisher: bool,
) {
    let Some(fighter) = ctx.arena.get_mut(id) else {
        return;
    };
    fighter.set_state(if blocked {
        FighterState::TakingBlockedHit
    } else {
        FighterState::TakingHit
    });
    fighter.hit_count += 1;

    let will_be_dead = fighter.health() <= 0.0 && (reaction.is_knockdown() || finisher);
    if will_be_dead {
        fighter.set_state(FighterState::Dead);
        fighter.active_volume = None;
    }
    ctx.emit(CombatEvent::ActionStarted { fighter: id });

    let playback = match &reaction.clip {
        Some(clip) => Some(ctx.play(id, clip, 1.0)),
        None => {
            tracing::error!(fighter = %id, attacker = %attacker, "hit reaction has no clip");
            ctx.animator.return_to_base_pose(id);
            None
        }
    };

    start(
        ctx,
        id,
        Procedure::HitReaction(HitReaction {
            reaction,
            blocked,
            will_be_dead,
            playback,
        }),
    );
}

impl HitReaction {
    pub fn step(&mut self, ctx: &mut StepContext<'_>, id: FighterId) -> Step {
        let Some(fighter) = ctx.arena.get(id) else {
            return Step::Done;
        };
        let superseded = !matches!(
            fighter.state(),
            FighterState::TakingHit | FighterState::TakingBlockedHit | FighterState::Dead
        );
        // Any clip counts: a newer reaction replaces ours and finishes for both.
        let reached = self.playback.is_none()
            || ctx
                .animator
                .playback(id)
                .map_or(true, |p| p.normalized_time >= ctx.settings.reaction_complete_at);
        if !superseded && !reached {
            return Step::Continue;
        }
        self.complete(ctx, id);
        Step::Done
    }

    fn complete(&mut self, ctx: &mut StepContext<'_>, id: FighterId) {
        if !self.will_be_dead {
            if let Some(profile) = self.reaction.knockdown.clone() {
                start_knockdown(ctx, id, profile);
            }
        }

        let Some(fighter) = ctx.arena.get_mut(id) else {
            return;
        };
        fighter.hit_count = fighter.hit_count.saturating_sub(1);
        if fighter.hit_count == 0 {
            if fighter.is_knocked_down() {
                fighter.set_state(FighterState::KnockedDown);
            } else if self.blocked
                && fighter.is_blocking()
                && fighter.state() == FighterState::TakingBlockedHit
            {
                fighter.set_state(FighterState::Blocking);
            } else {
                fighter.reset_state_to_none(if self.blocked {
                    FighterState::TakingBlockedHit
                } else {
                    FighterState::TakingHit
                });
            }
            if self.blocked {
                fighter.set_flag(FighterFlags::PLAYING_BLOCK_EARLY, false);
            }
            let busy = fighter.is_busy();
            ctx.emit(CombatEvent::HitComplete { fighter: id });
            if !busy {
                ctx.emit(CombatEvent::ActionEnded { fighter: id });
            }
        }

        if self.will_be_dead {
            tracing::info!(fighter = %id, "fighter died");
            ctx.emit(CombatEvent::Death { fighter: id });
        }
    }

    /// Cleanup when the reaction is cut short.
    pub fn abandon(self, ctx: &mut StepContext<'_>, id: FighterId) {
        if let Some(fighter) = ctx.arena.get_mut(id) {
            fighter.hit_count = fighter.hit_count.saturating_sub(1);
            if self.blocked {
                fighter.set_flag(FighterFlags::PLAYING_BLOCK_EARLY, false);
            }
        }
    }
}

// =============================================================================
// Knockdown
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum KnockPhase {
    /// Seconds left on the ground.
    Lying(f32),
    /// Lying time is over; waiting for hit reactions on the ground to end.
    WaitNotHit,
    GettingUp(PlaybackId),
}

/// Lying on the ground, then getting up.
#[derive(Debug, Clone)]
pub(crate) struct KnockDown {
    serial: u32,
    profile: KnockdownProfile,
    phase: KnockPhase,
}

/// Floors `id` for a duration drawn from `profile`.
pub(crate) fn start_knockdown(ctx: &mut StepContext<'_>, id: FighterId, profile: KnockdownProfile) {
    let [low, high] = profile.lying_duration;
    let lying = if high > low {
        ctx.rng.gen_range(low..=high)
    } else {
        low
    };

    let Some(fighter) = ctx.arena.get_mut(id) else {
        return;
    };
    fighter.knockdown_serial = fighter.knockdown_serial.wrapping_add(1);
    let serial = fighter.knockdown_serial;
    if fighter.is_dead() {
        return;
    }
    fighter.set_state(FighterState::KnockedDown);
    let clip = profile
        .lying_clip
        .clone()
        .or_else(|| fighter.config.knockdown_clips(profile.direction).0.cloned());
    ctx.emit(CombatEvent::KnockedDown { fighter: id });

    if let Some(clip) = clip {
        ctx.play(id, &clip, 1.0);
    }
    tracing::debug!(fighter = %id, lying, "knocked down");

    start(
        ctx,
        id,
        Procedure::KnockDown(KnockDown {
            serial,
            profile,
            phase: KnockPhase::Lying(lying),
        }),
    );
}

impl KnockDown {
    pub fn step(&mut self, ctx: &mut StepContext<'_>, id: FighterId) -> Step {
        let Some(fighter) = ctx.arena.get(id) else {
            return Step::Done;
        };
        if fighter.knockdown_serial != self.serial || fighter.is_dead() {
            return Step::Done;
        }

        if let KnockPhase::Lying(remaining) = self.phase {
            let remaining = remaining - ctx.dt;
            if remaining > 0.0 {
                self.phase = KnockPhase::Lying(remaining);
                return Step::Continue;
            }
            self.phase = KnockPhase::WaitNotHit;
        }

        match self.phase {
            KnockPhase::Lying(_) => Step::Continue,
            KnockPhase::WaitNotHit => self.try_get_up(ctx, id),
            KnockPhase::GettingUp(playback) => {
                let still_up = ctx
                    .arena
                    .get(id)
                    .is_some_and(|f| f.state() == FighterState::GettingUp);
                if !still_up {
                    return Step::Done;
                }
                if ctx.progress(id, playback).is_some_and(|t| t < 1.0) {
                    return Step::Continue;
                }
                end_action(ctx, id, FighterState::GettingUp);
                Step::Done
            }
        }
    }

    fn try_get_up(&mut self, ctx: &mut StepContext<'_>, id: FighterId) -> Step {
        let Some(fighter) = ctx.arena.get_mut(id) else {
            return Step::Done;
        };
        match fighter.state() {
            FighterState::TakingHit => return Step::Continue,
            FighterState::KnockedDown => {}
            _ => return Step::Done,
        }
        // Out of health without a finishing blow: stays down.
        if fighter.health() <= 0.0 {
            return Step::Done;
        }

        let clip = self
            .profile
            .get_up_clip
            .clone()
            .or_else(|| fighter.config.knockdown_clips(self.profile.direction).1.cloned());
        let Some(clip) = clip else {
            tracing::warn!(fighter = %id, "no get-up clip; standing up instantly");
            end_action(ctx, id, FighterState::KnockedDown);
            return Step::Done;
        };

        fighter.set_state(FighterState::GettingUp);
        ctx.emit(CombatEvent::GettingUp { fighter: id });
        let playback = ctx.play(id, &clip, 1.0);
        self.phase = KnockPhase::GettingUp(playback);
        Step::Continue
    }
}

/// Returns `id` to idle from `expected` and reports the end of the action.
fn end_action(ctx: &mut StepContext<'_>, id: FighterId, expected: FighterState) {
    let Some(fighter) = ctx.arena.get_mut(id) else {
        return;
    };
    fighter.reset_state_to_none(expected);
    if !fighter.is_busy() {
        ctx.emit(CombatEvent::ActionEnded { fighter: id });
    }
}

// =============================================================================
// Death
// =============================================================================

/// The death clip playing out.
#[derive(Debug, Clone)]
pub(crate) struct Death {
    playback: PlaybackId,
}

/// Kills `id`: cancels everything it does and plays a death clip.
///
/// The clip is drawn from the fighter's death clips, falling back to
/// `fallback`. `Death` is emitted when it ends, or at once without a clip.
pub(crate) fn start_death(
    ctx: &mut StepContext<'_>,
    id: FighterId,
    attacker: FighterId,
    fallback: Option<ClipRef>,
) {
    cancel_all(ctx, id);
    let attacker_pos = ctx.arena.get(attacker).map(|a| a.transform.position);

    let Some(fighter) = ctx.arena.get_mut(id) else {
        return;
    };
    fighter.set_state(FighterState::Dead);
    fighter.active_volume = None;
    fighter.hit_count = 0;
    if let Some(pos) = attacker_pos {
        fighter.transform.face_towards(pos);
    }
    let clips = &fighter.config.death_clips;
    let clip = if clips.is_empty() {
        fallback
    } else {
        Some(clips[ctx.rng.gen_range(0..clips.len())].clone())
    };
    ctx.emit(CombatEvent::ActionStarted { fighter: id });

    match clip {
        Some(clip) => {
            let playback = ctx.play(id, &clip, 1.0);
            start(ctx, id, Procedure::Death(Death { playback }));
        }
        None => {
            tracing::info!(fighter = %id, "fighter died");
            ctx.emit(CombatEvent::Death { fighter: id });
        }
    }
}

impl Death {
    pub fn step(&mut self, ctx: &mut StepContext<'_>, id: FighterId) -> Step {
        if ctx.progress(id, self.playback).is_some_and(|t| t < 1.0) {
            return Step::Continue;
        }
        tracing::info!(fighter = %id, "fighter died");
        ctx.emit(CombatEvent::Death { fighter: id });
        Step::Done
    }
}
