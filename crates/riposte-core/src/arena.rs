//! Fighter registry for a combat world.
//!
//! The Arena owns every [`Fighter`] in a world. It provides:
//! - Fighter storage with deterministic iteration order (`BTreeMap`)
//! - Fighter lifecycle (spawn/despawn)
//! - Handle resolution, including disjoint mutable access to two fighters
//! - Simulation tick tracking
//!
//! # Architecture
//!
//! Cross-fighter links are [`FighterId`] handles. Every access goes through
//! [`Arena::get`] or [`Arena::get_mut`], so a despawned fighter resolves to
//! `None` and callers treat it as "no target". Ids are monotonically
//! increasing and never reused.
//!
//! # Example
//!
//! ```
//! use riposte_core::arena::Arena;
//! use riposte_core::fighter::Transform;
//! use riposte_core::settings::FighterConfig;
//! use glam::Vec3;
//!
//! let mut arena = Arena::new();
//! let a = arena.spawn(FighterConfig::default(), Transform::new(Vec3::ZERO, Vec3::Z));
//! let b = arena.spawn(FighterConfig::default(), Transform::new(Vec3::new(0.0, 0.0, 2.0), -Vec3::Z));
//!
//! let ids: Vec<_> = arena.ids_sorted().collect();
//! assert_eq!(ids, vec![a, b]);
//! assert_eq!(arena.distance(a, b), Some(2.0));
//! ```

use std::collections::BTreeMap;

use crate::fighter::{Fighter, FighterId, Transform};
use crate::settings::FighterConfig;

/// Registry of all fighters in a world.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    /// Monotonically increasing id counter.
    next_id: u64,
    /// Fighter storage with deterministic iteration order.
    fighters: BTreeMap<FighterId, Fighter>,
    /// Current simulation tick.
    tick: u64,
}

impl Arena {
    /// Creates an empty arena at tick 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a fighter at full health.
    ///
    /// # Arguments
    ///
    /// * `config` - Per-fighter configuration
    /// * `transform` - Initial position and facing
    ///
    /// # Returns
    ///
    /// The id assigned to the new fighter.
    pub fn spawn(&mut self, config: FighterConfig, transform: Transform) -> FighterId {
        let id = FighterId::new(self.next_id);
        self.next_id += 1;
        self.fighters.insert(id, Fighter::new(id, config, transform));
        id
    }

    /// Removes a fighter.
    ///
    /// # Returns
    ///
    /// The removed fighter, if it existed.
    pub fn despawn(&mut self, id: FighterId) -> Option<Fighter> {
        self.fighters.remove(&id)
    }

    /// Returns a fighter by id.
    #[must_use]
    pub fn get(&self, id: FighterId) -> Option<&Fighter> {
        self.fighters.get(&id)
    }

    /// Returns a mutable fighter by id.
    #[must_use]
    pub fn get_mut(&mut self, id: FighterId) -> Option<&mut Fighter> {
        self.fighters.get_mut(&id)
    }

    /// Returns mutable references to two distinct fighters.
    ///
    /// Returns `None` if `a == b` or either fighter is missing.
    #[must_use]
    pub fn pair_mut(&mut self, a: FighterId, b: FighterId) -> Option<(&mut Fighter, &mut Fighter)> {
        if a == b {
            return None;
        }
        let mut first = None;
        let mut second = None;
        for (id, fighter) in &mut self.fighters {
            if *id == a {
                first = Some(fighter);
            } else if *id == b {
                second = Some(fighter);
            }
        }
        Some((first?, second?))
    }

    /// Iterates fighter ids in deterministic (sorted) order.
    pub fn ids_sorted(&self) -> impl Iterator<Item = FighterId> + '_ {
        self.fighters.keys().copied()
    }

    /// Iterates fighters in id order.
    pub fn fighters_sorted(&self) -> impl Iterator<Item = &Fighter> + '_ {
        self.fighters.values()
    }

    /// Distance between two fighters, if both exist.
    #[must_use]
    pub fn distance(&self, a: FighterId, b: FighterId) -> Option<f32> {
        let a = self.get(a)?;
        let b = self.get(b)?;
        Some(a.transform.position.distance(b.transform.position))
    }

    /// Number of fighters.
    #[must_use]
    pub fn fighter_count(&self) -> usize {
        self.fighters.len()
    }

    /// Returns true if the arena has no fighters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fighters.is_empty()
    }

    /// Current simulation tick.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Advances the tick counter.
    pub fn advance_tick(&mut self) {
        self.tick += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn spawn_at(arena: &mut Arena, z: f32) -> FighterId {
        arena.spawn(
            FighterConfig::default(),
            Transform::new(Vec3::new(0.0, 0.0, z), Vec3::Z),
        )
    }

    #[test]
    fn new_creates_empty_arena() {
        let arena = Arena::new();
        assert!(arena.is_empty());
        assert_eq!(arena.fighter_count(), 0);
        assert_eq!(arena.current_tick(), 0);
    }

    #[test]
    fn spawn_assigns_sequential_ids() {
        let mut arena = Arena::new();
        let a = spawn_at(&mut arena, 0.0);
        let b = spawn_at(&mut arena, 1.0);
        assert_eq!(a, FighterId::new(0));
        assert_eq!(b, FighterId::new(1));
        assert_eq!(arena.fighter_count(), 2);
    }

    #[test]
    fn ids_are_not_reused_after_despawn() {
        let mut arena = Arena::new();
        let a = spawn_at(&mut arena, 0.0);
        assert!(arena.despawn(a).is_some());
        let b = spawn_at(&mut arena, 0.0);
        assert_ne!(a, b);
        assert!(arena.get(a).is_none());
    }

    #[test]
    fn pair_mut_returns_disjoint_fighters() {
        let mut arena = Arena::new();
        let a = spawn_at(&mut arena, 0.0);
        let b = spawn_at(&mut arena, 1.0);
        let (fa, fb) = arena.pair_mut(b, a).unwrap();
        assert_eq!(fa.id(), b);
        assert_eq!(fb.id(), a);
        fa.apply_damage(5.0);
        assert!((arena.get(b).unwrap().health() - 20.0).abs() < f32::EPSILON);
    }

    #[test]
    fn pair_mut_rejects_same_or_missing() {
        let mut arena = Arena::new();
        let a = spawn_at(&mut arena, 0.0);
        assert!(arena.pair_mut(a, a).is_none());
        assert!(arena.pair_mut(a, FighterId::new(99)).is_none());
    }

    #[test]
    fn ids_sorted_after_despawn() {
        let mut arena = Arena::new();
        let a = spawn_at(&mut arena, 0.0);
        let b = spawn_at(&mut arena, 1.0);
        let c = spawn_at(&mut arena, 2.0);
        arena.despawn(b);
        let ids: Vec<_> = arena.ids_sorted().collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    fn distance_requires_both() {
        let mut arena = Arena::new();
        let a = spawn_at(&mut arena, 0.0);
        let b = spawn_at(&mut arena, 3.0);
        assert!((arena.distance(a, b).unwrap() - 3.0).abs() < f32::EPSILON);
        assert!(arena.distance(a, FighterId::new(9)).is_none());
    }

    #[test]
    fn advance_tick_increments() {
        let mut arena = Arena::new();
        arena.advance_tick();
        arena.advance_tick();
        assert_eq!(arena.current_tick(), 2);
    }
}
