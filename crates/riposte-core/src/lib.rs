//! # Riposte Core
//!
//! Melee combat resolution for action games.
//!
//! This crate decides, for each fighter, which attack to perform, whether a
//! defender blocks or is countered, how damage and reactions propagate, and
//! how two fighters lock into a synchronized exchange such as a scripted
//! parry or finisher.
//!
//! ## Architecture
//!
//! - **Arena**: fighter registry; fighters refer to each other by [`fighter::FighterId`]
//! - **Selector**: pure attack and counter selection over data-driven move lists
//! - **Arbiter**: turns hits into damage, reactions, knockdowns and deaths
//! - **Sync**: pairs attacker and defender for synced exchanges
//! - **Procedures**: multi-tick actions as explicit step functions
//! - **Adapters**: animation playback and spatial queries behind traits
//!
//! Everything is single-threaded and frame-stepped. Given the same seed,
//! catalog and requests, a [`world::CombatWorld`] produces the same events.
//!
//! ## Usage
//!
//! ```
//! use riposte_core::catalog::MoveCatalog;
//! use riposte_core::fighter::Transform;
//! use riposte_core::settings::{CombatSettings, FighterConfig};
//! use riposte_core::world::CombatWorld;
//!
//! let catalog = MoveCatalog::from_json_str(r#"{"version": 1, "attacks": [], "weapons": []}"#).unwrap();
//! let mut world = CombatWorld::headless(42, catalog, CombatSettings::default());
//! let fighter = world.spawn_fighter(FighterConfig::default(), Transform::default()).unwrap();
//!
//! world.step(1.0 / 60.0);
//! for envelope in world.take_events() {
//!     println!("{:?}", envelope.event);
//! }
//! # let _ = fighter;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod adapter;
pub mod arbiter;
pub mod arena;
pub mod catalog;
pub mod error;
pub mod event;
pub mod fighter;
pub mod procedure;
pub mod selector;
pub mod settings;
pub mod sync;
pub mod world;

pub use arena::Arena;
pub use error::{CatalogError, SettingsError};
pub use event::{CombatEvent, EventEnvelope};
pub use fighter::{Fighter, FighterId, FighterState};
pub use world::{AttackOutcome, CombatWorld};

#[cfg(test)]
mod tests;
