//! Synced-animation pairing.
//!
//! A synced attack locks attacker and defender into one scripted exchange.
//! Both sides carry [`FighterFlags::IN_SYNCED_ANIMATION`] and a
//! [`SyncedAction`] naming the attack and the partner. The pair is locked and
//! released as a unit: after either operation both records agree.

use crate::arena::Arena;
use crate::catalog::AttackId;
use crate::event::CombatEvent;
use crate::fighter::{FighterFlags, FighterId, SyncedAction};
use crate::procedure::StepContext;

/// Locks `attacker` and `defender` into the exchange driven by `attack`.
///
/// Returns false (and changes nothing) if either fighter is missing or already
/// locked with someone.
pub(crate) fn lock_pair(
    ctx: &mut StepContext<'_>,
    attacker: FighterId,
    defender: FighterId,
    attack: &AttackId,
) -> bool {
    let Some((a, d)) = ctx.arena.pair_mut(attacker, defender) else {
        return false;
    };
    if a.is_in_synced_animation() || d.is_in_synced_animation() {
        tracing::debug!(%attacker, %defender, "already synced; not locking");
        return false;
    }
    a.set_flag(FighterFlags::IN_SYNCED_ANIMATION, true);
    a.synced_action = Some(SyncedAction {
        attack: attack.clone(),
        partner: defender,
    });
    d.set_flag(FighterFlags::IN_SYNCED_ANIMATION, true);
    d.synced_action = Some(SyncedAction {
        attack: attack.clone(),
        partner: attacker,
    });
    ctx.emit(CombatEvent::SyncLocked {
        attacker,
        defender,
        attack: attack.clone(),
    });
    true
}

/// Releases the exchange `attacker` is locked into, on both sides.
///
/// The partner is only cleared if its record points back at `attacker`.
pub(crate) fn release_pair(ctx: &mut StepContext<'_>, attacker: FighterId) {
    let Some(partner) = ctx
        .arena
        .get(attacker)
        .and_then(|f| f.synced_action())
        .map(|s| s.partner)
    else {
        return;
    };
    clear(ctx.arena, attacker);
    let points_back = ctx
        .arena
        .get(partner)
        .and_then(|f| f.synced_action())
        .is_some_and(|s| s.partner == attacker);
    if points_back {
        clear(ctx.arena, partner);
    }
    ctx.emit(CombatEvent::SyncReleased {
        attacker,
        defender: partner,
    });
}

/// Drops any sync record of `id` without touching a partner.
pub(crate) fn clear(arena: &mut Arena, id: FighterId) {
    if let Some(fighter) = arena.get_mut(id) {
        fighter.set_flag(FighterFlags::IN_SYNCED_ANIMATION, false);
        fighter.synced_action = None;
    }
}

/// Returns true if `a` and `b` agree on their pairing: either both are
/// locked with each other on the same attack, or neither is locked with the
/// other.
#[must_use]
pub fn pair_consistent(arena: &Arena, a: FighterId, b: FighterId) -> bool {
    let (Some(fa), Some(fb)) = (arena.get(a), arena.get(b)) else {
        return true;
    };
    let a_to_b = fa.synced_action().filter(|s| s.partner == b);
    let b_to_a = fb.synced_action().filter(|s| s.partner == a);
    match (a_to_b, b_to_a) {
        (Some(x), Some(y)) => {
            x.attack == y.attack && fa.is_in_synced_animation() && fb.is_in_synced_animation()
        }
        (None, None) => true,
        _ => false,
    }
}
