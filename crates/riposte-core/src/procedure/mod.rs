//! Multi-tick combat procedures.
//!
//! Anything that spans several ticks (a swing, a hit reaction, lying on the
//! ground, a dodge, a weapon switch, a taunt) is an explicit step-function
//! object stored on the fighter that runs it. The world invokes every running
//! procedure once per tick; a procedure reads the animator, mutates the arena
//! and reports whether it is finished.
//!
//! # Architecture
//!
//! - [`StepContext`] bundles the mutable world state a procedure may touch.
//! - [`Procedure`] is a closed enum over the procedure kinds, so stepping is
//!   a `match` rather than dynamic dispatch.
//! - Cancellation goes through [`cancel`], which removes the procedure and
//!   runs the same cleanup as normal completion.
//!
//! While a fighter is being stepped its procedure list is detached. Anything
//! started during the step is pushed onto the fighter and merged back after
//! the surviving procedures.

pub(crate) mod action;
pub(crate) mod attack;
pub(crate) mod reaction;

use serde::{Deserialize, Serialize};

use rand_chacha::ChaCha8Rng;

use crate::adapter::{Animator, ClipRequest, PlaybackId, SpatialQuery};
use crate::arena::Arena;
use crate::catalog::{ClipRef, MoveCatalog};
use crate::event::{CombatEvent, EventLog};
use crate::fighter::FighterId;
use crate::settings::CombatSettings;

pub(crate) use action::{Dodge, SwitchWeapon, Taunt};
pub(crate) use attack::AttackProcedure;
pub(crate) use reaction::{Death, HitReaction, KnockDown};

// =============================================================================
// Context
// =============================================================================

/// Mutable world state available to procedures and request handlers.
pub(crate) struct StepContext<'a> {
    pub arena: &'a mut Arena,
    pub animator: &'a mut dyn Animator,
    pub spatial: &'a dyn SpatialQuery,
    pub rng: &'a mut ChaCha8Rng,
    pub events: &'a mut EventLog,
    pub settings: &'a CombatSettings,
    pub catalog: &'a MoveCatalog,
    /// Seconds simulated by the current step; zero outside of a step.
    pub dt: f32,
}

impl StepContext<'_> {
    /// Records an event at the current tick, after any pending state changes.
    pub fn emit(&mut self, event: CombatEvent) {
        self.flush_transitions();
        let tick = self.arena.current_tick();
        self.events.push(tick, event);
    }

    /// Turns buffered state transitions into `StateChanged` events.
    pub fn flush_transitions(&mut self) {
        let tick = self.arena.current_tick();
        let ids: Vec<FighterId> = self.arena.ids_sorted().collect();
        for id in ids {
            let Some(fighter) = self.arena.get_mut(id) else {
                continue;
            };
            for (from, to) in std::mem::take(&mut fighter.transitions) {
                self.events.push(
                    tick,
                    CombatEvent::StateChanged {
                        fighter: id,
                        from,
                        to,
                    },
                );
            }
        }
    }

    /// Plays `clip` on `fighter`.
    pub fn play(&mut self, fighter: FighterId, clip: &ClipRef, speed: f32) -> PlaybackId {
        self.animator
            .play(fighter, &ClipRequest::new(clip.clone()).with_speed(speed))
    }

    /// Normalized time of the playback `id`, or `None` once it was replaced
    /// or stopped.
    pub fn progress(&self, fighter: FighterId, id: PlaybackId) -> Option<f32> {
        self.animator
            .playback(fighter)
            .filter(|p| p.id == id)
            .map(|p| p.normalized_time)
    }
}

// =============================================================================
// Procedures
// =============================================================================

/// Kind of a running procedure.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcedureKind {
    /// A swing, including combo continuations.
    Attack,
    /// A hit or blocked-hit reaction.
    HitReaction,
    /// Lying on the ground and getting up.
    KnockDown,
    /// The death sequence.
    Death,
    /// A dodge or roll.
    Dodge,
    /// Equipping or unequipping a weapon.
    SwitchWeapon,
    /// A taunt.
    Taunt,
}

/// Result of stepping a procedure once.
#[derive(Debug)]
pub(crate) enum Step {
    /// Keep running next tick.
    Continue,
    /// Finished; cleanup already ran.
    Done,
    /// Finished and handed over to a follow-up procedure.
    Replace(Procedure),
}

/// A running multi-tick procedure.
#[derive(Debug, Clone)]
pub(crate) enum Procedure {
    Attack(AttackProcedure),
    HitReaction(HitReaction),
    KnockDown(KnockDown),
    Death(Death),
    Dodge(Dodge),
    SwitchWeapon(SwitchWeapon),
    Taunt(Taunt),
}

impl Procedure {
    pub fn kind(&self) -> ProcedureKind {
        match self {
            Self::Attack(_) => ProcedureKind::Attack,
            Self::HitReaction(_) => ProcedureKind::HitReaction,
            Self::KnockDown(_) => ProcedureKind::KnockDown,
            Self::Death(_) => ProcedureKind::Death,
            Self::Dodge(_) => ProcedureKind::Dodge,
            Self::SwitchWeapon(_) => ProcedureKind::SwitchWeapon,
            Self::Taunt(_) => ProcedureKind::Taunt,
        }
    }

    fn step(&mut self, ctx: &mut StepContext<'_>, owner: FighterId) -> Step {
        match self {
            Self::Attack(p) => p.step(ctx, owner),
            Self::HitReaction(p) => p.step(ctx, owner),
            Self::KnockDown(p) => p.step(ctx, owner),
            Self::Death(p) => p.step(ctx, owner),
            Self::Dodge(p) => p.step(ctx, owner),
            Self::SwitchWeapon(p) => p.step(ctx, owner),
            Self::Taunt(p) => p.step(ctx, owner),
        }
    }

    fn cancel(self, ctx: &mut StepContext<'_>, owner: FighterId) {
        tracing::trace!(fighter = %owner, kind = ?self.kind(), "cancel procedure");
        match self {
            Self::Attack(mut p) => p.finish(ctx, owner),
            Self::HitReaction(p) => p.abandon(ctx, owner),
            Self::Dodge(p) => p.finish(ctx, owner),
            Self::KnockDown(_) | Self::Death(_) | Self::SwitchWeapon(_) | Self::Taunt(_) => {}
        }
    }
}

/// Starts `procedure` on `owner`.
pub(crate) fn start(ctx: &mut StepContext<'_>, owner: FighterId, procedure: Procedure) {
    if let Some(fighter) = ctx.arena.get_mut(owner) {
        tracing::trace!(fighter = %owner, kind = ?procedure.kind(), "start procedure");
        fighter.procedures.push(procedure);
    }
}

/// Cancels every procedure of `owner` whose kind is in `kinds`, running its
/// cleanup.
pub(crate) fn cancel(ctx: &mut StepContext<'_>, owner: FighterId, kinds: &[ProcedureKind]) {
    let Some(fighter) = ctx.arena.get_mut(owner) else {
        return;
    };
    let (cancelled, kept): (Vec<Procedure>, Vec<Procedure>) = std::mem::take(&mut fighter.procedures)
        .into_iter()
        .partition(|p| kinds.contains(&p.kind()));
    fighter.procedures = kept;
    for procedure in cancelled {
        procedure.cancel(ctx, owner);
    }
}

/// Cancels everything `owner` is doing.
pub(crate) fn cancel_all(ctx: &mut StepContext<'_>, owner: FighterId) {
    cancel(
        ctx,
        owner,
        &[
            ProcedureKind::Attack,
            ProcedureKind::HitReaction,
            ProcedureKind::KnockDown,
            ProcedureKind::Death,
            ProcedureKind::Dodge,
            ProcedureKind::SwitchWeapon,
            ProcedureKind::Taunt,
        ],
    );
}

/// Steps every procedure of `owner` once.
pub(crate) fn step_fighter(ctx: &mut StepContext<'_>, owner: FighterId) {
    let Some(fighter) = ctx.arena.get_mut(owner) else {
        return;
    };
    let running = std::mem::take(&mut fighter.procedures);
    let mut survivors = Vec::with_capacity(running.len());
    for mut procedure in running {
        match procedure.step(ctx, owner) {
            Step::Continue => survivors.push(procedure),
            Step::Done => {}
            Step::Replace(next) => survivors.push(next),
        }
    }
    if let Some(fighter) = ctx.arena.get_mut(owner) {
        survivors.append(&mut fighter.procedures);
        fighter.procedures = survivors;
    }
    ctx.flush_transitions();
}
