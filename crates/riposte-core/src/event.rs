//! Combat events and the event log.
//!
//! The core never calls out to listeners. Everything observable (state
//! changes, hits, deaths, weapon swaps) is appended to an [`EventLog`] owned
//! by the world and drained by consumers with
//! [`crate::world::CombatWorld::take_events`]. Consumers cannot mutate combat
//! state from inside a notification because there is no callback to do it
//! from.
//!
//! # Ordering
//!
//! Envelopes carry the tick they were produced in and a sequence number that
//! is strictly increasing for the lifetime of the log, so a drained batch can
//! be merged with earlier batches without re-sorting.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::catalog::{AttackId, WeaponId};
use crate::fighter::{FighterId, FighterState};

/// Something that happened in the combat world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    /// A fighter's coarse state changed.
    StateChanged {
        /// Fighter whose state changed.
        fighter: FighterId,
        /// Previous state.
        from: FighterState,
        /// New state.
        to: FighterState,
    },
    /// A fighter began a multi-tick action.
    ActionStarted {
        /// Acting fighter.
        fighter: FighterId,
    },
    /// A fighter finished its last running action.
    ActionEnded {
        /// Fighter that became idle.
        fighter: FighterId,
    },
    /// A swing started.
    AttackStarted {
        /// Attacking fighter.
        attacker: FighterId,
        /// Target of the swing, if any.
        target: Option<FighterId>,
        /// Attack being swung.
        attack: AttackId,
    },
    /// A fighter learned it is the target of a swing.
    BeingAttacked {
        /// Targeted fighter.
        defender: FighterId,
        /// Swinging fighter.
        attacker: FighterId,
    },
    /// A hit was resolved on a fighter.
    GotHit {
        /// Fighter that was hit.
        defender: FighterId,
        /// Fighter that landed the hit.
        attacker: FighterId,
        /// Contact point in world space.
        point: Vec3,
        /// Seconds until the blow visually connects.
        hitting_time: f32,
        /// The hit was blocked.
        blocked: bool,
        /// Health removed.
        damage: f32,
    },
    /// All concurrent hit reactions of a fighter finished.
    HitComplete {
        /// Fighter that recovered.
        fighter: FighterId,
    },
    /// Two fighters locked into a synced exchange.
    SyncLocked {
        /// Fighter driving the exchange.
        attacker: FighterId,
        /// Paired defender.
        defender: FighterId,
        /// Attack driving the exchange.
        attack: AttackId,
    },
    /// A synced exchange was released on both sides.
    SyncReleased {
        /// Fighter that drove the exchange.
        attacker: FighterId,
        /// Paired defender.
        defender: FighterId,
    },
    /// A fighter was knocked down.
    KnockedDown {
        /// Fighter on the ground.
        fighter: FighterId,
    },
    /// A knocked-down fighter started getting up.
    GettingUp {
        /// Fighter getting up.
        fighter: FighterId,
    },
    /// A fighter died.
    Death {
        /// Dead fighter.
        fighter: FighterId,
    },
    /// A counter was requested with nothing to counter.
    CounterMisused {
        /// Fighter that misused the counter.
        fighter: FighterId,
    },
    /// A weapon was equipped.
    WeaponEquipped {
        /// Fighter holding the weapon.
        fighter: FighterId,
        /// Equipped weapon.
        weapon: WeaponId,
        /// A switching clip was played.
        animated: bool,
    },
    /// A weapon was put away.
    WeaponUnequipped {
        /// Fighter that held the weapon.
        fighter: FighterId,
        /// Removed weapon.
        weapon: WeaponId,
        /// A switching clip was played.
        animated: bool,
    },
    /// A fighter was reset to full health.
    FighterReset {
        /// Reset fighter.
        fighter: FighterId,
    },
}

impl CombatEvent {
    /// The fighter the event is primarily about.
    #[must_use]
    pub const fn subject(&self) -> FighterId {
        match self {
            Self::StateChanged { fighter, .. }
            | Self::ActionStarted { fighter }
            | Self::ActionEnded { fighter }
            | Self::HitComplete { fighter }
            | Self::KnockedDown { fighter }
            | Self::GettingUp { fighter }
            | Self::Death { fighter }
            | Self::CounterMisused { fighter }
            | Self::WeaponEquipped { fighter, .. }
            | Self::WeaponUnequipped { fighter, .. }
            | Self::FighterReset { fighter } => *fighter,
            Self::AttackStarted { attacker, .. }
            | Self::SyncLocked { attacker, .. }
            | Self::SyncReleased { attacker, .. } => *attacker,
            Self::BeingAttacked { defender, .. } | Self::GotHit { defender, .. } => *defender,
        }
    }
}

/// An event stamped with when it happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Tick the event was produced in.
    pub tick: u64,
    /// Position in the log, strictly increasing.
    pub sequence: u64,
    /// The event.
    pub event: CombatEvent,
}

/// Append-only event buffer drained by consumers.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Vec<EventEnvelope>,
    next_sequence: u64,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event.
    pub fn push(&mut self, tick: u64, event: CombatEvent) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.events.push(EventEnvelope {
            tick,
            sequence,
            event,
        });
    }

    /// Drains and returns all recorded events in the order they were recorded.
    pub fn take_events(&mut self) -> Vec<EventEnvelope> {
        std::mem::take(&mut self.events)
    }

    /// Number of undrained events.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Returns true if there is nothing to drain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Discards undrained events. Sequence numbers keep counting.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Iterates undrained events without draining them.
    pub fn iter(&self) -> impl Iterator<Item = &EventEnvelope> + '_ {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn death(id: u64) -> CombatEvent {
        CombatEvent::Death {
            fighter: FighterId::new(id),
        }
    }

    mod log_tests {
        use super::*;

        #[test]
        fn take_events_drains_in_order() {
            let mut log = EventLog::new();
            log.push(0, death(1));
            log.push(0, death(2));
            assert_eq!(log.event_count(), 2);

            let events = log.take_events();
            assert!(log.is_empty());
            assert_eq!(events[0].event.subject(), FighterId::new(1));
            assert_eq!(events[1].event.subject(), FighterId::new(2));
        }

        #[test]
        fn sequence_survives_drain_and_clear() {
            let mut log = EventLog::new();
            log.push(0, death(1));
            let _ = log.take_events();
            log.push(1, death(1));
            log.clear();
            log.push(2, death(1));
            let events = log.take_events();
            assert_eq!(events[0].sequence, 2);
            assert_eq!(events[0].tick, 2);
        }
    }

    mod event_tests {
        use super::*;

        #[test]
        fn subject_of_hit_is_defender() {
            let event = CombatEvent::GotHit {
                defender: FighterId::new(3),
                attacker: FighterId::new(4),
                point: Vec3::ZERO,
                hitting_time: 0.0,
                blocked: false,
                damage: 5.0,
            };
            assert_eq!(event.subject(), FighterId::new(3));
        }

        #[test]
        fn serialization_roundtrip() {
            let envelope = EventEnvelope {
                tick: 9,
                sequence: 4,
                event: CombatEvent::WeaponEquipped {
                    fighter: FighterId::new(1),
                    weapon: WeaponId::new("sword"),
                    animated: true,
                },
            };
            let json = serde_json::to_string(&envelope).unwrap();
            let back: EventEnvelope = serde_json::from_str(&json).unwrap();
            assert_eq!(back, envelope);
        }
    }
}
