//! Test helper functions for setting up duels.
//!
//! The shared catalog holds a sword (single slash, counterable, can block),
//! a knife whose only move is a synced takedown, a rapier that taunts on a
//! wasted counter, two combo weapons, a mace with a synced blocked reaction,
//! a cleaver that strikes every body in reach, and a handful of loose attacks
//! used to drive hits directly.

use std::sync::Arc;

use glam::Vec3;

use crate::arbiter::Hit;
use crate::catalog::{
    AttackDefinition, AttackFlags, AttackGroup, AttackId, AttackSlot, AttackTiming, AttackType,
    ClipRef, CounterEntry, HitDirection, KnockdownProfile, MoveCatalog, Reaction, ReactionEntry,
    ReactionTable, SwitchAnimation, WeaponId, WeaponProfile,
};
use crate::event::{CombatEvent, EventEnvelope};
use crate::fighter::{FighterId, Transform};
use crate::settings::{CombatSettings, FighterConfig};
use crate::world::CombatWorld;

/// Distance between the two duelists.
pub const DUEL_DISTANCE: f32 = 2.0;

// =============================================================================
// Catalog
// =============================================================================

fn swing_timing() -> AttackTiming {
    AttackTiming {
        impact_start: 0.3,
        impact_end: 0.6,
        ..AttackTiming::default()
    }
}

/// Builds the catalog every integration test runs against.
///
/// # Returns
///
/// A catalog with the weapons `sword`, `knife`, `rapier`, `chain`, `flail`,
/// `mace` and `cleaver` and the attacks `slash`, `riposte`, `takedown`,
/// `execute`, `sweep`, `bash` and `cleave`.
pub fn test_catalog() -> MoveCatalog {
    let mut catalog = MoveCatalog::new();

    let riposte = catalog.insert_attack(AttackDefinition {
        timing: swing_timing(),
        ..AttackDefinition::new("riposte", 5.0, ClipRef::new("riposte", 1.0))
    });

    let mut slash = AttackDefinition::new("slash", 10.0, ClipRef::new("slash", 1.0));
    slash.timing = swing_timing();
    slash.flags = AttackFlags::CAN_BE_COUNTERED;
    slash.counters = vec![CounterEntry {
        attack: riposte.id.clone(),
        health_threshold: 100.0,
        start_time: 0.0,
    }];
    let slash = catalog.insert_attack(slash);

    let mut takedown = AttackDefinition::new("takedown", 10.0, ClipRef::new("takedown", 1.0));
    takedown.timing = AttackTiming {
        sync_start: 0.2,
        ..swing_timing()
    };
    takedown.flags = AttackFlags::SYNCED_REACTION;
    takedown.reaction = Some(Reaction::with_clip(ClipRef::new("takedown_hit", 1.0)));
    let takedown = catalog.insert_attack(takedown);

    let mut execute = AttackDefinition::new("execute", 1.0, ClipRef::new("execute", 1.0));
    execute.flags = AttackFlags::FINISHER;
    catalog.insert_attack(execute);

    let mut sweep = AttackDefinition::new("sweep", 5.0, ClipRef::new("sweep", 1.0));
    sweep.reaction = Some(Reaction {
        clip: Some(ClipRef::new("fall", 1.0)),
        knockdown: Some(KnockdownProfile {
            lying_duration: [0.5, 0.5],
            lying_clip: Some(ClipRef::new("lying", 1.0)),
            get_up_clip: Some(ClipRef::new("get_up", 1.0)),
            ..KnockdownProfile::default()
        }),
    });
    let sweep = catalog.insert_attack(sweep);

    let mut bash = AttackDefinition::new("bash", 10.0, ClipRef::new("bash", 1.0));
    bash.timing = AttackTiming {
        block_sync_start: 0.1,
        ..swing_timing()
    };
    bash.flags = AttackFlags::SYNCED_BLOCKED_REACTION;
    bash.blocked_reaction = Some(Reaction::with_clip(ClipRef::new("bash_blocked", 1.0)));
    let bash = catalog.insert_attack(bash);

    let mut cleave = AttackDefinition::new("cleave", 10.0, ClipRef::new("cleave", 1.0));
    cleave.timing = swing_timing();
    cleave.flags = AttackFlags::CAN_HIT_MULTIPLE_TARGETS;
    let cleave = catalog.insert_attack(cleave);

    let mut sword = WeaponProfile::new(
        "sword",
        vec![AttackGroup::single(slash.clone(), 0.0, 3.0, 100.0)],
    );
    sword.can_block = true;
    sword.blocking_clip = Some(ClipRef::new("block", 1.0));
    sword.reactions = standing_reactions();
    sword.blocked_reactions = ReactionTable::new(vec![ReactionEntry::new(
        HitDirection::Any,
        Reaction::with_clip(ClipRef::new("block_hit", 1.0)),
    )]);
    catalog.insert_weapon(sword);

    let mut knife = WeaponProfile::new(
        "knife",
        vec![AttackGroup::single(Arc::clone(&takedown), 0.0, 3.0, 100.0)],
    );
    knife.equip = SwitchAnimation {
        clip: Some(ClipRef::new("knife_draw", 1.0)),
        time: 0.5,
    };
    knife.unequip = SwitchAnimation {
        clip: Some(ClipRef::new("knife_stow", 1.0)),
        time: 0.5,
    };
    catalog.insert_weapon(knife);

    let mut rapier = WeaponProfile::new(
        "rapier",
        vec![AttackGroup::single(slash.clone(), 0.0, 3.0, 100.0)],
    );
    rapier.play_action_if_counter_misused = true;
    rapier.counter_misused_clip = Some(ClipRef::new("taunt", 1.0));
    catalog.insert_weapon(rapier);

    let chain = combo(vec![
        AttackSlot::new(slash.clone()),
        AttackSlot::new(takedown),
    ]);
    catalog.insert_weapon(WeaponProfile::new("chain", vec![chain]));

    let flail = combo(vec![
        AttackSlot {
            attack: slash,
            charged: Some(Arc::clone(&sweep)),
        },
        AttackSlot::new(riposte),
        AttackSlot::new(sweep),
    ]);
    catalog.insert_weapon(WeaponProfile::new("flail", vec![flail]));

    catalog.insert_weapon(WeaponProfile::new(
        "mace",
        vec![AttackGroup::single(bash, 0.0, 3.0, 100.0)],
    ));
    catalog.insert_weapon(WeaponProfile::new(
        "cleaver",
        vec![AttackGroup::single(cleave, 0.0, 3.0, 100.0)],
    ));

    catalog
}

/// A combo group usable from 0 to 3 m at any health.
fn combo(slots: Vec<AttackSlot>) -> AttackGroup {
    AttackGroup {
        attack_type: AttackType::Combo,
        min_distance: 0.0,
        max_distance: 3.0,
        health_threshold: 100.0,
        slots,
    }
}

/// Two interchangeable hit reactions, so picks consume randomness.
fn standing_reactions() -> ReactionTable {
    ReactionTable::new(vec![
        ReactionEntry::new(HitDirection::Any, Reaction::with_clip(ClipRef::new("hit_a", 1.0))),
        ReactionEntry::new(HitDirection::Any, Reaction::with_clip(ClipRef::new("hit_b", 1.0))),
    ])
}

/// Fighter configuration with hit reactions even when unarmed.
///
/// # Returns
///
/// A default configuration with standing reactions and two death clips.
pub fn duelist_config() -> FighterConfig {
    FighterConfig {
        reactions: standing_reactions(),
        death_clips: vec![ClipRef::new("death_a", 1.0), ClipRef::new("death_b", 1.0)],
        ..FighterConfig::default()
    }
}

// =============================================================================
// Duel setup
// =============================================================================

/// Spawns two duelists facing each other [`DUEL_DISTANCE`] apart, each
/// targeting the other.
///
/// # Arguments
///
/// * `world` - World to spawn into
///
/// # Returns
///
/// A tuple of (attacker at the origin, defender further along +Z).
pub fn setup_duel(world: &mut CombatWorld) -> (FighterId, FighterId) {
    let a = spawn_at(world, Vec3::ZERO, Vec3::Z);
    let b = spawn_at(world, Vec3::new(0.0, 0.0, DUEL_DISTANCE), -Vec3::Z);
    assert!(world.set_target(a, Some(b)));
    assert!(world.set_target(b, Some(a)));
    (a, b)
}

/// Spawns a duelist at `position` looking along `forward`.
pub fn spawn_at(world: &mut CombatWorld, position: Vec3, forward: Vec3) -> FighterId {
    world
        .spawn_fighter(duelist_config(), Transform::new(position, forward))
        .expect("duelist config is valid")
}

/// Creates a headless world over [`test_catalog`] with default settings.
pub fn duel_world(seed: u64) -> CombatWorld {
    CombatWorld::headless(seed, test_catalog(), CombatSettings::default())
}

/// Equips `weapon` on `fighter` without animation.
pub fn arm(world: &mut CombatWorld, fighter: FighterId, weapon: &str) {
    assert!(world.quick_switch_weapon(fighter, Some(&WeaponId::new(weapon))));
}

/// Builds a hit with the catalog attack `attack`, landing on the chest of
/// `defender`.
pub fn hit_with(world: &CombatWorld, attack: &str, defender: FighterId) -> Hit {
    let definition = world
        .catalog()
        .attack(&AttackId::new(attack))
        .cloned()
        .expect("attack is in the test catalog");
    let point = world
        .fighter(defender)
        .map_or(Vec3::ZERO, |f| f.transform().position + Vec3::Y);
    Hit::new(definition, point)
}

/// Builds a hit from an ad hoc attack dealing `damage`.
pub fn raw_hit(damage: f32) -> Hit {
    let attack = AttackDefinition::new("probe", damage, ClipRef::new("probe", 1.0));
    Hit::new(Arc::new(attack), Vec3::Y)
}

/// Jumps the fighter's current clip to `normalized` and runs a zero-length
/// tick so procedures observe the new time.
pub fn scrub(world: &mut CombatWorld, fighter: FighterId, normalized: f32) {
    assert!(world.animator_mut().seek(fighter, normalized));
    world.step(0.0);
}

/// Counts drained events matching `predicate`.
pub fn count_events(events: &[EventEnvelope], predicate: impl Fn(&CombatEvent) -> bool) -> usize {
    events.iter().filter(|e| predicate(&e.event)).count()
}
