//! Attack and counter selection.
//!
//! Selection is a pure read of the arena: given a fighter, its weapon and an
//! optional target, it returns which attack group to swing next. Nothing is
//! mutated here; the caller applies the [`Choice`].
//!
//! # Policy
//!
//! Candidate groups are filtered in a fixed order (type eligibility against
//! the target, blocking, range, health threshold) and then ranked: finishers
//! pre-empt everything, an unfinished combo keeps its own slots, and
//! otherwise the lowest health-threshold tier wins. Randomness is only used
//! to break ties inside a tier, so a seeded RNG makes selection reproducible.

use std::sync::Arc;

use rand::Rng;

use crate::arena::Arena;
use crate::catalog::{AttackFlags, AttackGroup, AttackPool, AttackType, CounterEntry, MoveCatalog};
use crate::fighter::{Fighter, FighterId, FighterState};
use crate::settings::CombatSettings;

/// Tolerance when comparing health thresholds for tier membership.
const THRESHOLD_EPSILON: f32 = 1e-3;

/// An attack request from input or AI.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AttackRequest {
    /// Fighter to attack.
    pub target: Option<FighterId>,
    /// Attack list to draw from.
    pub pool: AttackPool,
    /// Request a counter against the current attacker.
    pub counter: bool,
    /// Use the charged variant of the slot when it has one.
    pub charged: bool,
}

impl AttackRequest {
    /// A normal attack on `target`.
    #[must_use]
    pub fn new(target: Option<FighterId>) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    /// Draws from the heavy list.
    #[must_use]
    pub fn heavy(mut self) -> Self {
        self.pool = AttackPool::Heavy;
        self
    }

    /// Draws from the special list.
    #[must_use]
    pub fn special(mut self) -> Self {
        self.pool = AttackPool::Special;
        self
    }

    /// Requests a counter.
    #[must_use]
    pub fn counter(mut self) -> Self {
        self.counter = true;
        self
    }

    /// Requests the charged variant.
    #[must_use]
    pub fn charged(mut self) -> Self {
        self.charged = true;
        self
    }
}

/// Outcome of a successful selection.
#[derive(Debug, Clone, PartialEq)]
pub enum Choice {
    /// Swing a newly selected group from its first slot.
    Fresh {
        /// Selected group.
        group: Arc<AttackGroup>,
        /// Normalized time of the target's swing to wait for before starting.
        start_delay: f32,
        /// Fighter the swing is aimed at.
        target: Option<FighterId>,
    },
    /// Keep the combo in progress.
    ContinueCombo,
}

/// Picks a uniformly random element.
fn pick<'a, T, R: Rng>(items: &[&'a T], rng: &mut R) -> Option<&'a T> {
    match items.len() {
        0 => None,
        1 => Some(items[0]),
        n => Some(items[rng.gen_range(0..n)]),
    }
}

/// Keeps the entries sharing the lowest threshold. `items` must be sorted by
/// threshold.
fn lowest_tier<'a, T>(items: &[&'a T], threshold: impl Fn(&T) -> f32) -> Vec<&'a T> {
    let Some(first) = items.first() else {
        return Vec::new();
    };
    let lowest = threshold(*first);
    items
        .iter()
        .copied()
        .take_while(|item| (threshold(*item) - lowest).abs() < THRESHOLD_EPSILON)
        .collect()
}

/// Returns true if `fighter` is partway through a combo.
fn in_combo(fighter: &Fighter) -> bool {
    fighter.state() == FighterState::Attacking
        && fighter
            .current_attacks()
            .is_some_and(|group| !group.is_empty() && fighter.combo_index() + 1 != group.len())
}

/// Chooses the next attack for `fighter_id`.
///
/// # Arguments
///
/// * `arena` - Fighter registry
/// * `fighter_id` - Attacking fighter
/// * `request` - Pool, counter and target of the request
/// * `settings` - Counter rules
/// * `catalog` - Resolves counter attacks
/// * `rng` - Tie-break source
///
/// # Returns
///
/// The selection, or `None` when no attack fits. A counter request never
/// falls back to a normal attack.
pub fn choose_attack<R: Rng>(
    arena: &Arena,
    fighter_id: FighterId,
    request: &AttackRequest,
    settings: &CombatSettings,
    catalog: &MoveCatalog,
    rng: &mut R,
) -> Option<Choice> {
    let fighter = arena.get(fighter_id)?;
    let weapon = fighter.weapon()?;
    let target = request.target.and_then(|id| arena.get(id));

    if target.is_some_and(|t| !t.can_take_hit()) {
        return None;
    }

    if request.counter {
        if !weapon.can_counter {
            return None;
        }
        return choose_counter(arena, fighter_id, settings, catalog, rng);
    }

    let pool = weapon.pool(request.pool);
    let mut normal: Vec<&AttackGroup> = pool.iter().filter(|g| g.attack_type.is_normal()).collect();
    normal.sort_by(|a, b| a.min_distance.total_cmp(&b.min_distance));

    let Some(target) = target.filter(|t| !t.is_dead()) else {
        // Nothing to react to: take the nearest plain group without rolling.
        let group = normal.into_iter().find(|g| g.has_plain_slot());
        if group.is_none() {
            tracing::debug!(fighter = %fighter_id, "no possible attacks without a target");
        }
        return group.map(|g| Choice::Fresh {
            group: Arc::new(g.clone()),
            start_delay: 0.0,
            target: None,
        });
    };

    let wanted = if target.target().is_none() {
        Some(AttackType::Stealth)
    } else if target.is_knocked_down() {
        Some(AttackType::GroundAttack)
    } else {
        None
    };
    let mut candidates: Vec<&AttackGroup> = match wanted {
        Some(kind) => pool.iter().filter(|g| g.attack_type == kind).collect(),
        None => normal,
    };

    if target.is_blocking() {
        candidates.retain(|g| !g.has_blockable_synced());
    }

    let distance = fighter
        .transform()
        .position
        .distance(target.transform().position);
    let health = target.health_percent();
    candidates.retain(|g| g.in_range(distance) && health <= g.health_threshold);
    candidates.sort_by(|a, b| a.health_threshold.total_cmp(&b.health_threshold));

    if candidates.is_empty() {
        tracing::debug!(fighter = %fighter_id, distance, "no possible attacks for the given range");
        return None;
    }

    let finishers: Vec<&AttackGroup> = candidates.iter().copied().filter(|g| g.has_finisher()).collect();
    let selected = if !finishers.is_empty() {
        pick(&finishers, rng)
    } else if in_combo(fighter) && !target.is_knocked_down() {
        return Some(Choice::ContinueCombo);
    } else {
        pick(&lowest_tier(&candidates, |g| g.health_threshold), rng)
    };

    selected.map(|g| Choice::Fresh {
        group: Arc::new(g.clone()),
        start_delay: 0.0,
        target: Some(target.id()),
    })
}

/// Chooses a counter against whoever is attacking `fighter_id`.
///
/// The counter must come from the attack being countered, the attack must be
/// in its countable window, and a counter that would kill is rejected unless
/// it is a finisher or an explicit knockdown.
///
/// # Returns
///
/// A single-slot group aimed at the attacker, carrying the normalized time of
/// the attacker's swing at which the counter starts.
pub fn choose_counter<R: Rng>(
    arena: &Arena,
    fighter_id: FighterId,
    settings: &CombatSettings,
    catalog: &MoveCatalog,
    rng: &mut R,
) -> Option<Choice> {
    let fighter = arena.get(fighter_id)?;
    let weapon = fighter.weapon()?;
    if !fighter.is_being_attacked() {
        return None;
    }
    let attacker = arena.get(fighter.attacker()?)?;
    if attacker.is_dead() || !attacker.is_countable(settings) {
        return None;
    }
    let attack = attacker.current_attack()?;
    if settings.only_counter_while_blocking && !fighter.will_block(attack) {
        return None;
    }
    if !attack.flags.contains(AttackFlags::CAN_BE_COUNTERED) || attack.counters.is_empty() {
        return None;
    }

    let health = attacker.health_percent();
    let mut entries: Vec<&CounterEntry> = attack
        .counters
        .iter()
        .filter(|e| health <= e.health_threshold)
        .collect();
    entries.sort_by(|a, b| a.health_threshold.total_cmp(&b.health_threshold));
    let entry = pick(&lowest_tier(&entries, |e| e.health_threshold), rng)?;

    let counter = catalog.attack(&entry.attack)?;
    if attacker.attack_would_kill(counter, Some(weapon)) && !counter.may_finish() {
        tracing::debug!(
            fighter = %fighter_id,
            counter = %counter.id,
            "counter would kill without finishing; rejected"
        );
        return None;
    }

    Some(Choice::Fresh {
        group: Arc::new(AttackGroup::counter(Arc::clone(counter))),
        start_delay: entry.start_time,
        target: Some(attacker.id()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AttackDefinition, AttackSlot, ClipRef, CounterEntry, WeaponProfile};
    use crate::fighter::{AttackSubState, FighterFlags, Transform};
    use crate::settings::FighterConfig;
    use glam::Vec3;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn attack(id: &str, damage: f32) -> Arc<AttackDefinition> {
        Arc::new(AttackDefinition::new(id, damage, ClipRef::new(id, 1.0)))
    }

    fn flagged(id: &str, flags: AttackFlags) -> Arc<AttackDefinition> {
        let mut def = AttackDefinition::new(id, 5.0, ClipRef::new(id, 1.0));
        def.flags = flags;
        Arc::new(def)
    }

    /// Two fighters facing each other `distance` apart, aware of each other.
    fn duel(weapon: WeaponProfile, distance: f32) -> (Arena, FighterId, FighterId) {
        let mut arena = Arena::new();
        let a = arena.spawn(FighterConfig::with_health(100.0), Transform::new(Vec3::ZERO, Vec3::Z));
        let b = arena.spawn(
            FighterConfig::with_health(100.0),
            Transform::new(Vec3::new(0.0, 0.0, distance), -Vec3::Z),
        );
        arena.get_mut(a).unwrap().install_weapon(Some(Arc::new(weapon)));
        arena.get_mut(b).unwrap().target = Some(a);
        (arena, a, b)
    }

    fn selected_id(choice: Option<Choice>) -> Option<String> {
        match choice? {
            Choice::Fresh { group, .. } => Some(group.slots[0].attack.id.to_string()),
            Choice::ContinueCombo => Some("<combo>".to_owned()),
        }
    }

    fn run(arena: &Arena, a: FighterId, b: FighterId, seed: u64) -> Option<String> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        selected_id(choose_attack(
            arena,
            a,
            &AttackRequest::new(Some(b)),
            &CombatSettings::default(),
            &MoveCatalog::new(),
            &mut rng,
        ))
    }

    mod filter_tests {
        use super::*;

        #[test]
        fn health_threshold_picks_lower_tier() {
            let weapon = WeaponProfile::new(
                "sword",
                vec![
                    AttackGroup::single(attack("a", 5.0), 1.0, 3.0, 100.0),
                    AttackGroup::single(attack("b", 5.0), 1.0, 3.0, 30.0),
                ],
            );
            let (mut arena, a, b) = duel(weapon, 2.0);
            arena.get_mut(b).unwrap().apply_damage(75.0);
            for seed in 0..16 {
                assert_eq!(run(&arena, a, b, seed).as_deref(), Some("b"));
            }
        }

        #[test]
        fn lowest_tier_wins_at_full_health() {
            let weapon = WeaponProfile::new(
                "sword",
                vec![
                    AttackGroup::single(attack("a", 5.0), 1.0, 3.0, 100.0),
                    AttackGroup::single(attack("b", 5.0), 1.0, 3.0, 30.0),
                ],
            );
            let (arena, a, b) = duel(weapon, 2.0);
            // b's threshold excludes a fighter at 100%
            assert_eq!(run(&arena, a, b, 1).as_deref(), Some("a"));
        }

        #[test]
        fn range_bracket_is_inclusive() {
            let weapon = WeaponProfile::new(
                "sword",
                vec![AttackGroup::single(attack("a", 5.0), 1.0, 2.0, 100.0)],
            );
            let (arena, a, b) = duel(weapon.clone(), 2.0);
            assert_eq!(run(&arena, a, b, 0).as_deref(), Some("a"));
            let (arena, a, b) = duel(weapon, 2.5);
            assert_eq!(run(&arena, a, b, 0), None);
        }

        #[test]
        fn blocking_target_excludes_blockable_synced() {
            let weapon = WeaponProfile::new(
                "sword",
                vec![
                    AttackGroup::single(flagged("s", AttackFlags::SYNCED_REACTION), 0.0, 3.0, 100.0),
                    AttackGroup::single(
                        flagged("u", AttackFlags::SYNCED_REACTION | AttackFlags::UNBLOCKABLE),
                        0.0,
                        3.0,
                        100.0,
                    ),
                ],
            );
            let (mut arena, a, b) = duel(weapon, 2.0);
            arena.get_mut(b).unwrap().set_flag(FighterFlags::BLOCKING, true);
            for seed in 0..16 {
                assert_eq!(run(&arena, a, b, seed).as_deref(), Some("u"));
            }
        }

        #[test]
        fn unaware_target_restricts_to_stealth() {
            let mut stealth = AttackGroup::single(attack("assassinate", 50.0), 0.0, 3.0, 100.0);
            stealth.attack_type = AttackType::Stealth;
            let weapon = WeaponProfile::new(
                "dagger",
                vec![AttackGroup::single(attack("stab", 5.0), 0.0, 3.0, 100.0), stealth],
            );
            let (mut arena, a, b) = duel(weapon, 2.0);
            arena.get_mut(b).unwrap().target = None;
            assert_eq!(run(&arena, a, b, 0).as_deref(), Some("assassinate"));
        }

        #[test]
        fn knocked_down_target_restricts_to_ground_attacks() {
            let mut ground = AttackGroup::single(attack("stomp", 5.0), 0.0, 3.0, 100.0);
            ground.attack_type = AttackType::GroundAttack;
            let weapon = WeaponProfile::new(
                "club",
                vec![AttackGroup::single(attack("swing", 5.0), 0.0, 3.0, 100.0), ground],
            );
            let (mut arena, a, b) = duel(weapon, 2.0);
            arena.get_mut(b).unwrap().set_state(FighterState::KnockedDown);
            assert_eq!(run(&arena, a, b, 0).as_deref(), Some("stomp"));
        }

        #[test]
        fn untouchable_target_fails() {
            let weapon = WeaponProfile::new(
                "sword",
                vec![AttackGroup::single(attack("a", 5.0), 0.0, 3.0, 100.0)],
            );
            let (mut arena, a, b) = duel(weapon, 2.0);
            arena.get_mut(b).unwrap().set_flag(FighterFlags::CAN_TAKE_HIT, false);
            assert_eq!(run(&arena, a, b, 0), None);
        }
    }

    mod ranking_tests {
        use super::*;

        #[test]
        fn finisher_preempts_everything() {
            let weapon = WeaponProfile::new(
                "sword",
                vec![
                    AttackGroup::single(attack("plain", 5.0), 0.0, 3.0, 10.0),
                    AttackGroup::single(flagged("finish", AttackFlags::FINISHER), 0.0, 3.0, 100.0),
                ],
            );
            let (mut arena, a, b) = duel(weapon, 2.0);
            arena.get_mut(b).unwrap().apply_damage(95.0);
            for seed in 0..16 {
                assert_eq!(run(&arena, a, b, seed).as_deref(), Some("finish"));
            }
        }

        #[test]
        fn mid_combo_keeps_current_group() {
            let combo = AttackGroup {
                attack_type: AttackType::Combo,
                min_distance: 0.0,
                max_distance: 3.0,
                health_threshold: 100.0,
                slots: vec![AttackSlot::new(attack("one", 5.0)), AttackSlot::new(attack("two", 5.0))],
            };
            let weapon = WeaponProfile::new("sword", vec![combo.clone()]);
            let (mut arena, a, b) = duel(weapon, 2.0);
            {
                let fighter = arena.get_mut(a).unwrap();
                fighter.set_state(FighterState::Attacking);
                fighter.current_attacks = Some(Arc::new(combo));
            }
            assert_eq!(run(&arena, a, b, 0).as_deref(), Some("<combo>"));

            arena.get_mut(a).unwrap().combo_index = 1;
            assert_eq!(run(&arena, a, b, 0).as_deref(), Some("one"));
        }

        #[test]
        fn no_target_takes_nearest_plain_group() {
            let weapon = WeaponProfile::new(
                "sword",
                vec![
                    AttackGroup::single(attack("far", 5.0), 2.0, 4.0, 100.0),
                    AttackGroup::single(flagged("synced", AttackFlags::SYNCED_REACTION), 0.0, 2.0, 100.0),
                    AttackGroup::single(attack("near", 5.0), 0.5, 2.0, 100.0),
                ],
            );
            let (arena, a, _) = duel(weapon, 2.0);
            let mut rng = ChaCha8Rng::seed_from_u64(0);
            let choice = choose_attack(
                &arena,
                a,
                &AttackRequest::new(None),
                &CombatSettings::default(),
                &MoveCatalog::new(),
                &mut rng,
            );
            assert_eq!(selected_id(choice).as_deref(), Some("near"));
        }

        #[test]
        fn seeded_selection_is_reproducible() {
            let weapon = WeaponProfile::new(
                "sword",
                (0..6)
                    .map(|i| AttackGroup::single(attack(&format!("a{i}"), 5.0), 1.0, 3.0, 50.0))
                    .collect(),
            );
            let (mut arena, a, b) = duel(weapon, 2.0);
            arena.get_mut(b).unwrap().apply_damage(60.0);
            let first = run(&arena, a, b, 42);
            assert!(first.is_some());
            for _ in 0..8 {
                assert_eq!(run(&arena, a, b, 42), first);
            }
        }
    }

    mod counter_tests {
        use super::*;

        /// `a` swings `incoming` at `b`, who holds a counter-capable weapon.
        fn counter_setup(
            incoming: AttackDefinition,
            counter: AttackDefinition,
            attacker_health: f32,
        ) -> (Arena, MoveCatalog, FighterId, FighterId) {
            let mut catalog = MoveCatalog::new();
            catalog.insert_attack(counter);
            let incoming = catalog.insert_attack(incoming);
            let weapon = Arc::new(WeaponProfile::new("sword", Vec::new()));

            let mut arena = Arena::new();
            let a = arena.spawn(FighterConfig::with_health(attacker_health), Transform::default());
            let b = arena.spawn(
                FighterConfig::default(),
                Transform::new(Vec3::new(0.0, 0.0, 2.0), -Vec3::Z),
            );
            {
                let attacker = arena.get_mut(a).unwrap();
                attacker.install_weapon(Some(Arc::clone(&weapon)));
                attacker.set_state(FighterState::Attacking);
                attacker.attack_state = AttackSubState::Windup;
                attacker.current_attack = Some(incoming);
            }
            {
                let defender = arena.get_mut(b).unwrap();
                defender.install_weapon(Some(weapon));
                defender.begin_being_attacked(a);
            }
            (arena, catalog, a, b)
        }

        fn counterable(counter_id: &str) -> AttackDefinition {
            let mut incoming = AttackDefinition::new("swing", 5.0, ClipRef::new("swing", 1.0));
            incoming.flags = AttackFlags::CAN_BE_COUNTERED;
            incoming.counters = vec![CounterEntry {
                attack: counter_id.into(),
                health_threshold: 100.0,
                start_time: 0.2,
            }];
            incoming
        }

        fn counter(arena: &Arena, catalog: &MoveCatalog, b: FighterId) -> Option<Choice> {
            let mut rng = ChaCha8Rng::seed_from_u64(0);
            choose_counter(arena, b, &CombatSettings::default(), catalog, &mut rng)
        }

        #[test]
        fn counter_targets_attacker_with_start_delay() {
            let riposte = AttackDefinition::new("riposte", 5.0, ClipRef::new("riposte", 1.0));
            let (arena, catalog, a, b) = counter_setup(counterable("riposte"), riposte, 25.0);
            match counter(&arena, &catalog, b) {
                Some(Choice::Fresh {
                    group,
                    start_delay,
                    target,
                }) => {
                    assert_eq!(target, Some(a));
                    assert!((start_delay - 0.2).abs() < f32::EPSILON);
                    assert_eq!(group.slots[0].attack.id.as_str(), "riposte");
                }
                other => panic!("expected counter, got {other:?}"),
            }
        }

        #[test]
        fn lethal_counter_without_finish_is_rejected() {
            let weak = AttackDefinition::new("riposte", 30.0, ClipRef::new("riposte", 1.0));
            let (arena, catalog, _, b) = counter_setup(counterable("riposte"), weak, 25.0);
            assert!(counter(&arena, &catalog, b).is_none());
        }

        #[test]
        fn lethal_finisher_counter_is_allowed() {
            let mut finisher = AttackDefinition::new("riposte", 30.0, ClipRef::new("riposte", 1.0));
            finisher.flags = AttackFlags::FINISHER;
            let (arena, catalog, _, b) = counter_setup(counterable("riposte"), finisher, 25.0);
            assert!(counter(&arena, &catalog, b).is_some());
        }

        #[test]
        fn counter_outside_windup_fails() {
            let riposte = AttackDefinition::new("riposte", 5.0, ClipRef::new("riposte", 1.0));
            let (mut arena, catalog, a, b) = counter_setup(counterable("riposte"), riposte, 25.0);
            arena.get_mut(a).unwrap().attack_state = AttackSubState::Impact;
            assert!(counter(&arena, &catalog, b).is_none());
        }

        #[test]
        fn uncounterable_attack_fails() {
            let riposte = AttackDefinition::new("riposte", 5.0, ClipRef::new("riposte", 1.0));
            let mut incoming = counterable("riposte");
            incoming.flags = AttackFlags::empty();
            let (arena, catalog, _, b) = counter_setup(incoming, riposte, 25.0);
            assert!(counter(&arena, &catalog, b).is_none());
        }

        #[test]
        fn blocking_requirement_is_honoured() {
            let riposte = AttackDefinition::new("riposte", 5.0, ClipRef::new("riposte", 1.0));
            let (mut arena, catalog, _, b) = counter_setup(counterable("riposte"), riposte, 25.0);
            let strict = CombatSettings {
                only_counter_while_blocking: true,
                ..CombatSettings::default()
            };
            let mut rng = ChaCha8Rng::seed_from_u64(0);
            assert!(choose_counter(&arena, b, &strict, &catalog, &mut rng).is_none());
            arena.get_mut(b).unwrap().set_flag(FighterFlags::BLOCKING, true);
            assert!(choose_counter(&arena, b, &strict, &catalog, &mut rng).is_some());
        }
    }
}
