//! Test module for determinism and integration tests.
//!
//! This module exercises the combat world end to end:
//! - **Determinism tests**: Verify same seed produces identical event logs
//! - **Integration tests**: Swings, blocks, counters, syncs, knockdowns and deaths
//! - **Helper functions**: Catalog and duel setup
//!
//! # Test Structure
//!
//! - `determinism.rs`: Scripted duels replayed with the same seed
//! - `integration.rs`: End-to-end tests through [`crate::world::CombatWorld`]
//! - `helpers.rs`: Test setup utilities and factory functions

mod determinism;
mod helpers;

// Re-export for convenience
pub use helpers::*;
