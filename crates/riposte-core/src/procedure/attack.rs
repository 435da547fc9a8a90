//! The swing procedure and attack request handling.

use std::collections::BTreeSet;
use std::sync::Arc;

use glam::Vec3;

use super::{start, Procedure, Step, StepContext};
use crate::adapter::{PlaybackId, VolumePose};
use crate::arbiter::{self, Hit};
use crate::catalog::{AttackDefinition, AttackFlags, AttackGroup, AttackType};
use crate::event::CombatEvent;
use crate::fighter::{AttackSubState, FighterFlags, FighterId, FighterState};
use crate::selector::{self, AttackRequest, Choice};
use crate::sync;
use crate::world::AttackOutcome;

/// Where a swing is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    /// Counter waiting for the target's swing to reach a normalized time.
    Delayed(f32),
    /// Clip playing.
    Swinging(PlaybackId),
}

/// One swing of a slot from an attack group.
#[derive(Debug, Clone)]
pub(crate) struct AttackProcedure {
    group: Arc<AttackGroup>,
    attack: Arc<AttackDefinition>,
    target: Option<FighterId>,
    phase: Phase,
    was_charged: bool,
    will_be_blocked: bool,
    synced_hit_pending: bool,
    early_block_pending: bool,
    move_from: Vec3,
    move_to: Option<Vec3>,
    prev_pose: Option<VolumePose>,
    struck: BTreeSet<FighterId>,
}

// =============================================================================
// Requests
// =============================================================================

/// Handles an attack request from input or AI.
pub(crate) fn request_attack(
    ctx: &mut StepContext<'_>,
    id: FighterId,
    mut request: AttackRequest,
) -> AttackOutcome {
    let Some(fighter) = ctx.arena.get(id) else {
        return AttackOutcome::Ignored;
    };
    if fighter.is_dead() {
        return AttackOutcome::Ignored;
    }

    if ctx.settings.same_input_for_attack_and_counter && !request.counter {
        let countering = fighter.is_being_attacked()
            && fighter
                .attacker()
                .and_then(|a| ctx.arena.get(a))
                .is_some_and(|a| a.is_countable(ctx.settings));
        if countering {
            request.counter = true;
        }
    }

    if fighter.state() == FighterState::TakingBlockedHit {
        let can_counter = fighter.weapon().is_some_and(|w| w.can_counter);
        if !request.counter || !can_counter {
            return AttackOutcome::Ignored;
        }
    } else {
        let target_synced = request
            .target
            .and_then(|t| ctx.arena.get(t))
            .is_some_and(|t| t.is_in_synced_animation());
        if (fighter.in_action() && fighter.state() != FighterState::Attacking)
            || fighter.is_in_synced_animation()
            || target_synced
        {
            return AttackOutcome::Ignored;
        }
    }

    if fighter.weapon().is_none() {
        let Some(default) = fighter.config().default_weapon.clone() else {
            return AttackOutcome::Ignored;
        };
        if fighter.in_action() {
            return AttackOutcome::Ignored;
        }
        return if super::action::request_equip(ctx, id, &default, Some(request)) {
            AttackOutcome::EquippingDefault
        } else {
            AttackOutcome::Ignored
        };
    }

    handle_attack(ctx, id, request)
}

/// Runs selection and starts or queues the swing.
pub(crate) fn handle_attack(
    ctx: &mut StepContext<'_>,
    id: FighterId,
    request: AttackRequest,
) -> AttackOutcome {
    if let Some(fighter) = ctx.arena.get_mut(id) {
        if request.target.is_some() {
            fighter.target = request.target;
        }
    }

    let choice = selector::choose_attack(
        ctx.arena,
        id,
        &request,
        ctx.settings,
        ctx.catalog,
        &mut *ctx.rng,
    );

    let Some(choice) = choice else {
        misuse_counter(ctx, id, &request);
        return AttackOutcome::NoPossibleAttack;
    };

    let Some(fighter) = ctx.arena.get_mut(id) else {
        return AttackOutcome::Ignored;
    };
    if let Choice::Fresh {
        group,
        start_delay,
        target,
    } = choice
    {
        fighter.current_attacks = Some(group);
        fighter.attack_start_delay = start_delay;
        if target.is_some() {
            fighter.target = target;
        }
    }
    fighter.charged_input = request.charged;

    if !fighter.in_action() || fighter.state() == FighterState::TakingBlockedHit {
        fighter.combo_index = 0;
        return match begin_swing(ctx, id) {
            Some(procedure) => {
                start(ctx, id, Procedure::Attack(procedure));
                AttackOutcome::Started
            }
            None => AttackOutcome::NoPossibleAttack,
        };
    }

    if fighter.state() == FighterState::Attacking
        && matches!(
            fighter.attack_state(),
            AttackSubState::Impact | AttackSubState::Cooldown
        )
        && !request.counter
    {
        fighter.combo_queued = true;
        return AttackOutcome::ComboQueued;
    }

    AttackOutcome::Ignored
}

/// Plays the weapon's misuse taunt after a failed counter.
fn misuse_counter(ctx: &mut StepContext<'_>, id: FighterId, request: &AttackRequest) {
    if !request.counter {
        return;
    }
    let Some(fighter) = ctx.arena.get(id) else {
        return;
    };
    let clip = fighter
        .weapon()
        .and_then(|w| w.counter_misuse_action())
        .cloned();
    let Some(clip) = clip else {
        return;
    };
    if fighter.in_action() || fighter.target().is_none() {
        return;
    }
    super::action::start_taunt(ctx, id, &clip);
    ctx.emit(CombatEvent::CounterMisused { fighter: id });
}

// =============================================================================
// Swing
// =============================================================================

/// Sets up the swing of the current slot.
fn begin_swing(ctx: &mut StepContext<'_>, id: FighterId) -> Option<AttackProcedure> {
    let fighter = ctx.arena.get_mut(id)?;
    let group = fighter.current_attacks.clone()?;
    if fighter.combo_index >= group.len() {
        fighter.combo_index = 0;
    }
    let slot = group.slots.get(fighter.combo_index)?;
    let attack = Arc::clone(slot.resolve(fighter.charged_input));
    let was_charged = fighter.charged_input;
    fighter.charged_input = false;

    fighter.set_state(FighterState::Attacking);
    fighter.attack_state = AttackSubState::Windup;
    fighter.attacking_target = fighter.target;
    fighter.current_attack = Some(Arc::clone(&attack));
    fighter.attack_time_normalized = 0.0;
    fighter.combo_queued = false;
    let delay = std::mem::take(&mut fighter.attack_start_delay);
    let target = fighter.target;
    let position = fighter.transform.position;

    ctx.emit(CombatEvent::ActionStarted { fighter: id });

    let mut procedure = AttackProcedure {
        group,
        attack,
        target,
        phase: Phase::Delayed(delay),
        was_charged,
        will_be_blocked: false,
        synced_hit_pending: false,
        early_block_pending: false,
        move_from: position,
        move_to: None,
        prev_pose: None,
        struck: BTreeSet::new(),
    };

    let target_swinging = target
        .and_then(|t| ctx.arena.get(t))
        .is_some_and(|t| t.current_attack().is_some());
    if delay <= 0.0 || !target_swinging {
        procedure.launch(ctx, id);
    }
    Some(procedure)
}

impl AttackProcedure {
    /// Starts the clip and engages the target.
    fn launch(&mut self, ctx: &mut StepContext<'_>, id: FighterId) {
        let attack = Arc::clone(&self.attack);
        ctx.emit(CombatEvent::AttackStarted {
            attacker: id,
            target: self.target,
            attack: attack.id.clone(),
        });

        if let Some(target_id) = self.target.filter(|t| ctx.arena.get(*t).is_some()) {
            self.engage(ctx, id, target_id);
        }

        let Some(clip) = attack.clip.clone() else {
            tracing::error!(fighter = %id, attack = %attack.id, "attack has no clip");
            ctx.animator.return_to_base_pose(id);
            // No playback carries this handle, so the next step ends the swing.
            self.phase = Phase::Swinging(PlaybackId::new(u64::MAX));
            return;
        };
        let playback = ctx.play(id, &clip, attack.speed);
        self.phase = Phase::Swinging(playback);
    }

    /// Target-side setup of a launched swing.
    fn engage(&mut self, ctx: &mut StepContext<'_>, id: FighterId, target_id: FighterId) {
        let attack = Arc::clone(&self.attack);
        let Some((me, target)) = ctx.arena.pair_mut(id, target_id) else {
            return;
        };
        self.will_be_blocked = target.will_block(&attack);
        target.begin_being_attacked(id);
        me.transform.face_towards(target.transform.position);

        let synced_flag = if self.will_be_blocked {
            attack.is_synced_blocked_reaction() && attack.blocked_reaction.is_some()
        } else {
            attack.is_synced_reaction() && attack.reaction.is_some()
        };
        let lethal = target.attack_would_kill(&attack, me.weapon.as_deref());
        let lockable = !me.is_in_synced_animation() && !target.is_in_synced_animation();
        let synced = synced_flag && lockable && !(lethal && !attack.may_finish());

        if attack.flags.contains(AttackFlags::MOVE_TO_TARGET) {
            let dir = target
                .transform
                .flat_direction_to(me.transform.position)
                .unwrap_or(-target.transform.forward);
            self.move_from = me.transform.position;
            self.move_to = Some(target.transform.position + dir * attack.distance_from_target);
            me.set_flag(FighterFlags::IGNORE_COLLISIONS, true);
            if synced {
                target.set_flag(FighterFlags::IGNORE_COLLISIONS, true);
            }
        } else if !attack.is_any_synced() {
            push_back(me, target);
        }

        ctx.emit(CombatEvent::BeingAttacked {
            defender: target_id,
            attacker: id,
        });

        if synced_flag && !synced {
            tracing::debug!(
                fighter = %id,
                attack = %attack.id,
                lethal,
                lockable,
                "synced attack resolving normally"
            );
            return;
        }
        if !synced || !sync::lock_pair(ctx, id, target_id, &attack.id) {
            return;
        }
        if self.will_be_blocked {
            self.early_block_pending = true;
        } else {
            self.synced_hit_pending = true;
        }
    }

    pub fn step(&mut self, ctx: &mut StepContext<'_>, id: FighterId) -> Step {
        let Some(fighter) = ctx.arena.get(id) else {
            return Step::Done;
        };
        if fighter.state() != FighterState::Attacking {
            self.finish(ctx, id);
            return Step::Done;
        }

        let playback = match self.phase {
            Phase::Delayed(delay) => {
                let reached = self
                    .target
                    .and_then(|t| ctx.arena.get(t))
                    .filter(|t| t.current_attack().is_some())
                    .map_or(true, |t| t.attack_time_normalized() >= delay);
                if !reached {
                    return Step::Continue;
                }
                self.launch(ctx, id);
                match self.phase {
                    Phase::Swinging(playback) => playback,
                    Phase::Delayed(_) => return Step::Continue,
                }
            }
            Phase::Swinging(playback) => playback,
        };

        let Some(t) = ctx.progress(id, playback) else {
            // Clip replaced, stopped or never started.
            self.finish(ctx, id);
            return Step::Done;
        };
        if let Some(fighter) = ctx.arena.get_mut(id) {
            fighter.attack_time_normalized = t;
        }

        self.track_target(ctx, id, t);
        self.synced_hits(ctx, id, t);
        if ctx
            .arena
            .get(id)
            .map_or(true, |f| f.state() != FighterState::Attacking)
        {
            self.finish(ctx, id);
            return Step::Done;
        }
        self.advance_phases(ctx, id, t);

        let (attack_state, combo_queued) = match ctx.arena.get(id) {
            Some(f) => (f.attack_state(), f.combo_queued()),
            None => return Step::Done,
        };

        if attack_state == AttackSubState::Cooldown && combo_queued {
            let timing = &self.attack.timing;
            let waiting = self.attack.flags.contains(AttackFlags::WAIT_FOR_NEXT_ATTACK)
                && t < timing.wait_for_attack;
            if !waiting {
                if let Some(next) = self.continue_combo(ctx, id) {
                    return Step::Replace(Procedure::Attack(next));
                }
            }
        }

        if t >= 1.0 {
            self.finish(ctx, id);
            return Step::Done;
        }
        Step::Continue
    }

    /// Turns towards the target and moves into the attack position.
    fn track_target(&mut self, ctx: &mut StepContext<'_>, id: FighterId, t: f32) {
        let target_pos = self
            .target
            .and_then(|tid| ctx.arena.get(tid))
            .filter(|f| !f.is_dead())
            .map(|f| f.transform.position);
        let timing = self.attack.timing;
        let dt = ctx.dt;
        let Some(me) = ctx.arena.get_mut(id) else {
            return;
        };

        if let Some(target_pos) = target_pos {
            let look = me.attack_state == AttackSubState::Windup
                || self.attack.flags.contains(AttackFlags::ALWAYS_LOOK_AT_TARGET);
            if look {
                if let Some(dir) = me.transform.flat_direction_to(target_pos) {
                    let max = me.config.rotation_speed_during_attack * dt;
                    me.transform.rotate_towards(dir, max);
                }
            }
        }

        if let Some(to) = self.move_to {
            if t >= timing.move_start {
                let span = timing.move_end - timing.move_start;
                let frac = if span > f32::EPSILON {
                    ((t - timing.move_start) / span).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                me.transform.position = self.move_from.lerp(to, frac);
                me.set_flag(FighterFlags::MATCHING_TARGET, frac < 1.0);
                if frac >= 1.0 {
                    self.move_to = None;
                }
            }
        }
    }

    /// Fires the data-declared hit of a synced exchange.
    fn synced_hits(&mut self, ctx: &mut StepContext<'_>, id: FighterId, t: f32) {
        let Some(target) = self.target else {
            return;
        };
        let timing = self.attack.timing;
        let length = self.attack.duration();

        if self.synced_hit_pending && t >= timing.sync_start {
            self.synced_hit_pending = false;
            let hit_at = timing.hitting_time * length;
            let point = self.contact_point(ctx, target);
            arbiter::take_hit(
                ctx,
                target,
                id,
                Hit {
                    attack: Arc::clone(&self.attack),
                    point,
                    blocked: false,
                    reaction: self.attack.reaction.clone(),
                    hitting_time: (hit_at - t * length).clamp(0.0, hit_at),
                },
            );
        }

        if self.early_block_pending && t >= timing.block_sync_start {
            self.early_block_pending = false;
            if let Some(defender) = ctx.arena.get_mut(target) {
                defender.set_flag(FighterFlags::PLAYING_BLOCK_EARLY, true);
            }
            let hit_at = timing.blocked_hitting_time * length;
            let point = self.contact_point(ctx, target);
            arbiter::take_hit(
                ctx,
                target,
                id,
                Hit {
                    attack: Arc::clone(&self.attack),
                    point,
                    blocked: true,
                    reaction: self.attack.blocked_reaction.clone(),
                    hitting_time: (hit_at - t * length).clamp(0.0, hit_at),
                },
            );
        }
    }

    fn contact_point(&self, ctx: &StepContext<'_>, target: FighterId) -> Vec3 {
        ctx.arena
            .get(target)
            .map_or(Vec3::ZERO, |f| f.transform.position + Vec3::Y)
    }

    /// Windup, impact and cooldown transitions plus the impact sweep.
    fn advance_phases(&mut self, ctx: &mut StepContext<'_>, id: FighterId, t: f32) {
        let timing = self.attack.timing;
        let volume = self.attack.hit_volume;

        let state = match ctx.arena.get(id) {
            Some(f) => f.attack_state(),
            None => return,
        };

        if state == AttackSubState::Windup && t >= timing.impact_start {
            if let Some(me) = ctx.arena.get_mut(id) {
                me.attack_state = AttackSubState::Impact;
                me.active_volume = Some(volume);
            }
            self.prev_pose = ctx.spatial.volume_pose(id, volume);
            self.struck.clear();
        }

        let Some(me) = ctx.arena.get(id) else {
            return;
        };
        if me.attack_state() != AttackSubState::Impact {
            return;
        }
        if !me.is_in_synced_animation() {
            self.sweep(ctx, id);
        }
        if t >= timing.impact_end {
            if let Some(me) = ctx.arena.get_mut(id) {
                me.attack_state = AttackSubState::Cooldown;
                me.active_volume = None;
            }
            self.prev_pose = None;
        }
    }

    /// Tests the active volume along its path since the last tick.
    fn sweep(&mut self, ctx: &mut StepContext<'_>, id: FighterId) {
        let Some(me) = ctx.arena.get(id) else {
            return;
        };
        let mask = me.config().hit_layers;
        let Some(pose) = ctx.spatial.volume_pose(id, self.attack.hit_volume) else {
            return;
        };
        let from = self.prev_pose.unwrap_or(pose);
        let contacts = ctx.spatial.overlap_swept(&from, &pose, mask, id);
        self.prev_pose = Some(pose);

        let ground = self.group.attack_type == AttackType::GroundAttack;
        for contact in contacts {
            if !self.struck.insert(contact.fighter) {
                continue;
            }
            arbiter::admit_contact(ctx, id, &self.attack, ground, contact);
        }
    }

    /// Moves on to the next slot of the combo.
    fn continue_combo(&mut self, ctx: &mut StepContext<'_>, id: FighterId) -> Option<AttackProcedure> {
        let target_alive = self
            .target
            .and_then(|t| ctx.arena.get(t))
            .map_or(true, |t| !t.is_dead());

        let releases = ctx
            .arena
            .get(id)?
            .synced_action()
            .is_some_and(|s| s.attack == self.attack.id);
        if releases {
            sync::release_pair(ctx, id);
        }
        if !target_alive {
            return None;
        }

        self.disengage(ctx, id);
        let me = ctx.arena.get_mut(id)?;
        let same_group = me
            .current_attacks
            .as_ref()
            .is_some_and(|g| Arc::ptr_eq(g, &self.group));
        me.combo_index = if self.was_charged || !same_group || self.group.is_empty() {
            0
        } else {
            (me.combo_index + 1) % self.group.len()
        };
        me.combo_queued = false;
        me.active_volume = None;
        begin_swing(ctx, id)
    }

    /// Undoes the target-side effects of this swing.
    fn disengage(&mut self, ctx: &mut StepContext<'_>, id: FighterId) {
        let synced = ctx.arena.get(id).is_some_and(|f| f.is_in_synced_animation());
        if let Some(me) = ctx.arena.get_mut(id) {
            if !synced {
                me.set_flag(FighterFlags::IGNORE_COLLISIONS, false);
            }
            me.set_flag(FighterFlags::MATCHING_TARGET, false);
        }
        if let Some(target) = self.target.and_then(|t| ctx.arena.get_mut(t)) {
            if !target.is_in_synced_animation() {
                target.set_flag(FighterFlags::IGNORE_COLLISIONS, false);
            }
            target.end_being_attacked(id);
        }
        self.move_to = None;
    }

    /// Cleanup shared by completion and cancellation.
    pub fn finish(&mut self, ctx: &mut StepContext<'_>, id: FighterId) {
        let releases = ctx
            .arena
            .get(id)
            .and_then(|f| f.synced_action())
            .is_some_and(|s| s.attack == self.attack.id);
        if releases {
            sync::release_pair(ctx, id);
        }
        self.disengage(ctx, id);

        let Some(me) = ctx.arena.get_mut(id) else {
            return;
        };
        me.attack_state = AttackSubState::Idle;
        me.active_volume = None;
        me.combo_index = 0;
        me.combo_queued = false;
        me.attacking_target = None;
        me.current_attack = None;
        me.attack_time_normalized = 0.0;
        if me.reset_state_to_none(FighterState::Attacking) {
            ctx.emit(CombatEvent::ActionEnded { fighter: id });
        }
    }
}

/// Pushes a target standing inside the weapon's minimum distance back out.
fn push_back(me: &crate::fighter::Fighter, target: &mut crate::fighter::Fighter) {
    let Some(min) = me.weapon().map(|w| w.min_attack_distance) else {
        return;
    };
    let offset = target.transform.position - me.transform.position;
    let distance = offset.length();
    if min <= 0.0 || distance >= min {
        return;
    }
    let dir = Vec3::new(offset.x, 0.0, offset.z)
        .try_normalize()
        .unwrap_or(me.transform.forward);
    target.transform.position = me.transform.position + dir * min;
}
