//! Hit arbitration.
//!
//! Turns a contact or a synced hit into damage, a reaction and the
//! defender's next state. Two entry points exist:
//! - [`admit_contact`] filters overlaps reported during an impact window
//! - [`take_hit`] resolves a hit that is already known to land
//!
//! Reaction choice is exposed separately as [`choose_reaction`] and
//! [`hit_direction`] so the filtering can be exercised on its own.

use std::sync::Arc;

use glam::Vec3;
use rand::Rng;

use crate::adapter::Contact;
use crate::catalog::{
    AttackDefinition, AttackFlags, HitDirection, Reaction, ReactionEntry, ReactionTable,
};
use crate::event::CombatEvent;
use crate::fighter::{FighterFlags, FighterId, FighterState, Transform};
use crate::procedure::{self, reaction, ProcedureKind, StepContext};

/// A hit that is going to be resolved on a defender.
#[derive(Debug, Clone)]
pub struct Hit {
    /// Attack that landed.
    pub attack: Arc<AttackDefinition>,
    /// Contact point in world space.
    pub point: Vec3,
    /// The defender blocks it.
    pub blocked: bool,
    /// Reaction forced by a synced exchange; chosen from tables when `None`.
    pub reaction: Option<Reaction>,
    /// Seconds until the blow visually connects.
    pub hitting_time: f32,
}

impl Hit {
    /// An ordinary unblocked hit at `point`.
    #[must_use]
    pub fn new(attack: Arc<AttackDefinition>, point: Vec3) -> Self {
        Self {
            attack,
            point,
            blocked: false,
            reaction: None,
            hitting_time: 0.0,
        }
    }

    /// Marks the hit as blocked.
    #[must_use]
    pub fn blocked(mut self) -> Self {
        self.blocked = true;
        self
    }
}

/// Procedures a landed hit interrupts.
const INTERRUPTED_BY_HIT: [ProcedureKind; 4] = [
    ProcedureKind::Attack,
    ProcedureKind::Dodge,
    ProcedureKind::SwitchWeapon,
    ProcedureKind::Taunt,
];

/// Filters a contact of `attacker`'s active volume and resolves it if it
/// counts.
pub(crate) fn admit_contact(
    ctx: &mut StepContext<'_>,
    attacker_id: FighterId,
    attack: &Arc<AttackDefinition>,
    ground_attack: bool,
    contact: Contact,
) {
    let (Some(attacker), Some(defender)) =
        (ctx.arena.get(attacker_id), ctx.arena.get(contact.fighter))
    else {
        return;
    };
    if !defender.can_take_hit() || defender.is_invincible() || defender.is_dead() {
        return;
    }
    let down_reacting = defender.state() == FighterState::TakingHit
        && defender
            .current_reaction
            .as_ref()
            .is_some_and(Reaction::is_knockdown);
    if defender.is_in_synced_animation()
        || defender.state() == FighterState::GettingUp
        || down_reacting
    {
        return;
    }
    if ground_attack != defender.is_knocked_down() {
        return;
    }
    if attacker.attacking_target() != Some(contact.fighter)
        && !attack.flags.contains(AttackFlags::CAN_HIT_MULTIPLE_TARGETS)
    {
        return;
    }
    let blocked = defender.will_block(attack);
    if blocked && defender.flags().contains(FighterFlags::PLAYING_BLOCK_EARLY) {
        return;
    }

    let mut hit = Hit::new(Arc::clone(attack), contact.point);
    hit.blocked = blocked;
    take_hit(ctx, contact.fighter, attacker_id, hit);
}

/// Resolves a landed hit on `defender_id`.
///
/// Applies damage (block mitigation, finisher override), picks a reaction,
/// interrupts the defender's current action and starts the reaction or the
/// death sequence. A dead or untouchable defender is left alone.
pub(crate) fn take_hit(
    ctx: &mut StepContext<'_>,
    defender_id: FighterId,
    attacker_id: FighterId,
    hit: Hit,
) {
    let Some((attacker, defender)) = ctx.arena.pair_mut(attacker_id, defender_id) else {
        return;
    };
    if defender.is_dead() || !defender.can_take_hit() {
        return;
    }
    let attack = &hit.attack;

    let damage = if hit.blocked {
        attacker
            .weapon()
            .map_or(attack.damage, |w| w.mitigate(attack.damage))
    } else if attack.is_finisher() {
        defender.health()
    } else {
        attack.damage
    };

    let (own_table, fallback_table, forced) = if hit.blocked {
        (
            defender.weapon.as_deref().map(|w| &w.blocked_reactions),
            &defender.config.blocked_reactions,
            attack.blocked_reaction.as_ref(),
        )
    } else {
        (
            defender.weapon.as_deref().map(|w| &w.reactions),
            &defender.config.reactions,
            attack.reaction.as_ref(),
        )
    };
    let table = own_table.filter(|t| !t.is_empty()).unwrap_or(fallback_table);
    let reaction = match hit.reaction.clone().or_else(|| forced.cloned()) {
        Some(reaction) => reaction,
        None => {
            if table.rotate_to_attacker {
                defender.transform.face_towards(attacker.transform.position);
            }
            choose_reaction(
                table,
                &defender.transform,
                &attacker.transform,
                hit.point,
                attack,
                &mut *ctx.rng,
            )
            .cloned()
            .unwrap_or_default()
        }
    };

    tracing::debug!(
        attacker = %attacker_id,
        defender = %defender_id,
        attack = %attack.id,
        damage,
        blocked = hit.blocked,
        "hit"
    );

    ctx.emit(CombatEvent::GotHit {
        defender: defender_id,
        attacker: attacker_id,
        point: hit.point,
        hitting_time: hit.hitting_time,
        blocked: hit.blocked,
        damage,
    });

    procedure::cancel(ctx, defender_id, &INTERRUPTED_BY_HIT);

    let Some(defender) = ctx.arena.get_mut(defender_id) else {
        return;
    };
    defender.apply_damage(damage);
    defender.current_reaction = Some(reaction.clone());
    let alive = defender.health() > 0.0;

    if alive || reaction.is_knockdown() || attack.is_finisher() {
        reaction::start_hit_reaction(
            ctx,
            defender_id,
            attacker_id,
            reaction,
            hit.blocked,
            attack.is_finisher(),
        );
    } else if ctx.settings.zero_health_without_knockdown_kills {
        reaction::start_death(ctx, defender_id, attacker_id, reaction.clip);
    } else {
        // Zero health without a finishing blow only staggers.
        reaction::start_hit_reaction(ctx, defender_id, attacker_id, reaction, hit.blocked, false);
    }
}

/// Classifies where `point` hit a fighter, relative to its right and up axes.
///
/// The horizontal axis wins when it dominates, the vertical one when it
/// dominates, and an exact tie yields [`HitDirection::Any`].
#[must_use]
pub fn hit_direction(defender: &Transform, point: Vec3) -> HitDirection {
    let dir = (point - defender.position + Vec3::Y * 0.5).normalize_or_zero();
    let right = dir.dot(defender.right());
    let up = dir.dot(defender.up());
    if right.abs() > up.abs() {
        if right > 0.0 {
            HitDirection::Right
        } else {
            HitDirection::Left
        }
    } else if up.abs() > right.abs() {
        if up > 0.0 {
            HitDirection::Top
        } else {
            HitDirection::Bottom
        }
    } else {
        HitDirection::Any
    }
}

/// Picks a reaction from `table` for a hit by `attack`.
///
/// # Arguments
///
/// * `table` - Candidate reactions
/// * `defender` - Defender pose, after any rotation towards the attacker
/// * `attacker` - Attacker pose
/// * `point` - Contact point
/// * `attack` - The landing attack (direction and tag)
/// * `rng` - Tie-break source
///
/// # Returns
///
/// A uniformly random reaction among the survivors of the behind, direction
/// and tag filters, or `None` when the direction filter leaves nothing.
pub fn choose_reaction<'t, R: Rng>(
    table: &'t ReactionTable,
    defender: &Transform,
    attacker: &Transform,
    point: Vec3,
    attack: &AttackDefinition,
    rng: &mut R,
) -> Option<&'t Reaction> {
    let direction = match attack.hit_direction {
        HitDirection::FromCollision => hit_direction(defender, point),
        declared => declared,
    };

    let mut entries: Vec<&ReactionEntry> = table.reactions.iter().collect();

    let from_behind = defender.facing_angle_to(attacker) <= 90.0;
    if !table.rotate_to_attacker && from_behind {
        let behind: Vec<&ReactionEntry> = entries
            .iter()
            .copied()
            .filter(|e| e.attacked_from_behind)
            .collect();
        if !behind.is_empty() {
            entries = behind;
        }
    }

    let same: Vec<&ReactionEntry> = entries
        .iter()
        .copied()
        .filter(|e| e.direction == direction)
        .collect();
    entries = if same.is_empty() {
        entries
            .into_iter()
            .filter(|e| e.direction == HitDirection::Any)
            .collect()
    } else {
        same
    };

    if let Some(tag) = attack.reaction_tag.as_deref().filter(|t| !t.is_empty()) {
        let tag = tag.to_lowercase();
        let exact: Vec<&ReactionEntry> = entries
            .iter()
            .copied()
            .filter(|e| e.tag.as_deref().is_some_and(|t| t.to_lowercase() == tag))
            .collect();
        if exact.is_empty() {
            let partial: Vec<&ReactionEntry> = entries
                .iter()
                .copied()
                .filter(|e| {
                    e.tag.as_deref().filter(|t| !t.is_empty()).is_some_and(|t| {
                        let t = t.to_lowercase();
                        t.contains(&tag) || tag.contains(&t)
                    })
                })
                .collect();
            if !partial.is_empty() {
                entries = partial;
            }
        } else {
            entries = exact;
        }
    }

    match entries.len() {
        0 => None,
        n => Some(&entries[rng.gen_range(0..n)].reaction),
    }
}
