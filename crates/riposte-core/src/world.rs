//! The combat world: requests in, ticks forward, events out.
//!
//! [`CombatWorld`] owns the arena, the move catalog, the settings, the two
//! adapters, the seeded RNG and the event log. Input and AI layers call the
//! `request_*` methods; the host calls [`CombatWorld::step`] once per frame
//! and drains [`CombatWorld::take_events`].
//!
//! # Architecture
//!
//! Each tick:
//! 1. The animator advances its clips by `dt`
//! 2. The spatial adapter snapshots fighter positions
//! 3. Every fighter's procedures are stepped, in id order
//! 4. The tick counter advances
//!
//! Requests are applied immediately and take effect on the current tick.
//!
//! # Example
//!
//! ```
//! use riposte_core::catalog::MoveCatalog;
//! use riposte_core::fighter::{FighterState, Transform};
//! use riposte_core::settings::{CombatSettings, FighterConfig};
//! use riposte_core::world::CombatWorld;
//!
//! let mut world = CombatWorld::headless(7, MoveCatalog::new(), CombatSettings::default());
//! let id = world
//!     .spawn_fighter(FighterConfig::default(), Transform::default())
//!     .unwrap();
//!
//! world.step(1.0 / 60.0);
//!
//! assert_eq!(world.current_tick(), 1);
//! assert_eq!(world.fighter(id).unwrap().state(), FighterState::None);
//! ```

use glam::Vec3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::adapter::{Animator, ProximitySpatial, SpatialQuery, TimelineAnimator};
use crate::arbiter::{self, Hit};
use crate::arena::Arena;
use crate::catalog::{MoveCatalog, WeaponId};
use crate::error::SettingsError;
use crate::event::{CombatEvent, EventEnvelope, EventLog};
use crate::fighter::{AttackSubState, Fighter, FighterFlags, FighterId, FighterState, Transform};
use crate::procedure::{self, action, attack, StepContext};
use crate::selector::AttackRequest;
use crate::settings::{CombatSettings, FighterConfig};
use crate::sync;

/// What became of an attack request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackOutcome {
    /// A swing started.
    Started,
    /// The next combo slot will follow the current swing.
    ComboQueued,
    /// Not accepted in the fighter's current state.
    Ignored,
    /// Nothing in the weapon's lists fits the situation.
    NoPossibleAttack,
    /// The default weapon is being drawn; the attack follows.
    EquippingDefault,
}

impl AttackOutcome {
    /// Returns true if the request led or will lead to a swing.
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(
            self,
            Self::Started | Self::ComboQueued | Self::EquippingDefault
        )
    }
}

/// A deterministic melee combat simulation.
pub struct CombatWorld<A: Animator = TimelineAnimator, S: SpatialQuery = ProximitySpatial> {
    arena: Arena,
    catalog: MoveCatalog,
    settings: CombatSettings,
    animator: A,
    spatial: S,
    rng: ChaCha8Rng,
    events: EventLog,
}

impl CombatWorld {
    /// Creates a world with the in-crate timeline animator and proximity
    /// spatial adapter.
    #[must_use]
    pub fn headless(seed: u64, catalog: MoveCatalog, settings: CombatSettings) -> Self {
        Self::new(
            seed,
            catalog,
            settings,
            TimelineAnimator::new(),
            ProximitySpatial::new(),
        )
    }
}

impl<A: Animator, S: SpatialQuery> CombatWorld<A, S> {
    /// Creates a world with custom adapters.
    ///
    /// # Arguments
    ///
    /// * `seed` - Seed for every random choice the world makes
    /// * `catalog` - Validated moves and weapons
    /// * `settings` - Global combat rules
    /// * `animator` - Playback adapter
    /// * `spatial` - Spatial query adapter
    #[must_use]
    pub fn new(seed: u64, catalog: MoveCatalog, settings: CombatSettings, animator: A, spatial: S) -> Self {
        Self {
            arena: Arena::new(),
            catalog,
            settings,
            animator,
            spatial,
            rng: ChaCha8Rng::seed_from_u64(seed),
            events: EventLog::new(),
        }
    }

    fn context(&mut self, dt: f32) -> StepContext<'_> {
        StepContext {
            arena: &mut self.arena,
            animator: &mut self.animator,
            spatial: &self.spatial,
            rng: &mut self.rng,
            events: &mut self.events,
            settings: &self.settings,
            catalog: &self.catalog,
            dt,
        }
    }

    /// Runs `f` against a zero-`dt` context and reports its state changes.
    fn apply<R>(&mut self, f: impl FnOnce(&mut StepContext<'_>) -> R) -> R {
        let mut ctx = self.context(0.0);
        let result = f(&mut ctx);
        ctx.flush_transitions();
        result
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Spawns a fighter at full health.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Invalid`] if `config` fails validation.
    pub fn spawn_fighter(&mut self, config: FighterConfig, transform: Transform) -> Result<FighterId, SettingsError> {
        config.validate()?;
        let id = self.arena.spawn(config, transform);
        self.spatial.refresh(&self.arena);
        tracing::debug!(fighter = %id, "spawned");
        Ok(id)
    }

    /// Removes a fighter, cancelling what it does and dropping every link
    /// other fighters hold to it. Returns false if it did not exist.
    pub fn despawn_fighter(&mut self, id: FighterId) -> bool {
        if self.arena.get(id).is_none() {
            return false;
        }
        self.apply(|ctx| {
            procedure::cancel_all(ctx, id);
            sync::release_pair(ctx, id);
        });
        self.arena.despawn(id);
        self.animator.return_to_base_pose(id);

        let others: Vec<FighterId> = self.arena.ids_sorted().collect();
        for other in others {
            let stale_sync = self
                .arena
                .get(other)
                .and_then(Fighter::synced_action)
                .is_some_and(|s| s.partner == id);
            if stale_sync {
                sync::clear(&mut self.arena, other);
            }
            if let Some(fighter) = self.arena.get_mut(other) {
                if fighter.target == Some(id) {
                    fighter.target = None;
                }
                if fighter.attacking_target == Some(id) {
                    fighter.attacking_target = None;
                }
                fighter.end_being_attacked(id);
            }
        }
        self.spatial.refresh(&self.arena);
        true
    }

    /// Restores a fighter that is not in action: full health, no attack
    /// state, no weapon. Returns false if it is in action.
    pub fn reset_fighter(&mut self, id: FighterId) -> bool {
        let Some(fighter) = self.arena.get_mut(id) else {
            return false;
        };
        if fighter.in_action() {
            return false;
        }
        fighter.attack_state = AttackSubState::Idle;
        fighter.restore_health();
        fighter.attacking_target = None;
        fighter.current_reaction = None;
        self.apply(|ctx| {
            action::quick_switch(ctx, id, None);
            ctx.emit(CombatEvent::FighterReset { fighter: id });
        });
        true
    }

    // -------------------------------------------------------------------------
    // Requests
    // -------------------------------------------------------------------------

    /// Sets or clears the fighter's target. Returns false for an unknown
    /// fighter or target.
    pub fn set_target(&mut self, id: FighterId, target: Option<FighterId>) -> bool {
        if target.is_some_and(|t| t == id || self.arena.get(t).is_none()) {
            return false;
        }
        let Some(fighter) = self.arena.get_mut(id) else {
            return false;
        };
        fighter.target = target;
        true
    }

    /// Requests an attack. See [`AttackRequest`] for the variants.
    pub fn request_attack(&mut self, id: FighterId, request: AttackRequest) -> AttackOutcome {
        let outcome = self.apply(|ctx| attack::request_attack(ctx, id, request));
        match outcome {
            AttackOutcome::Ignored => tracing::trace!(fighter = %id, "attack request ignored"),
            AttackOutcome::NoPossibleAttack => {
                tracing::warn!(fighter = %id, "no possible attacks for the given range");
            }
            _ => tracing::debug!(fighter = %id, ?outcome, "attack request"),
        }
        outcome
    }

    /// Requests a dodge towards `direction` (zero for the default direction).
    pub fn request_dodge(&mut self, id: FighterId, direction: Vec3) -> bool {
        self.apply(|ctx| action::request_dodge(ctx, id, direction, false))
    }

    /// Requests a roll towards `direction` (zero for the default direction).
    pub fn request_roll(&mut self, id: FighterId, direction: Vec3) -> bool {
        self.apply(|ctx| action::request_dodge(ctx, id, direction, true))
    }

    /// Raises or lowers the guard.
    ///
    /// Raising needs a weapon that can block and a fighter that is idle or
    /// absorbing a blocked hit. Lowering always succeeds. Returns the
    /// resulting blocking status.
    pub fn set_blocking(&mut self, id: FighterId, blocking: bool) -> bool {
        let Some(fighter) = self.arena.get_mut(id) else {
            return false;
        };
        let was_blocking = fighter.is_blocking();
        let allowed = fighter.weapon().is_some_and(|w| w.can_block)
            && (!fighter.is_busy() || fighter.state() == FighterState::TakingBlockedHit);
        let blocking = blocking && allowed;

        fighter.set_flag(FighterFlags::BLOCKING, blocking);
        if blocking && !was_blocking && fighter.state() == FighterState::None {
            fighter.set_state(FighterState::Blocking);
        } else if !blocking && was_blocking {
            fighter.reset_state_to_none(FighterState::Blocking);
        }
        self.apply(|ctx| ctx.flush_transitions());
        blocking
    }

    /// Draws the catalog weapon `weapon` with its switch clips.
    pub fn request_weapon_equip(&mut self, id: FighterId, weapon: &WeaponId) -> bool {
        self.apply(|ctx| action::request_equip(ctx, id, weapon, None))
    }

    /// Puts the current weapon away with its unequip clip.
    pub fn request_weapon_unequip(&mut self, id: FighterId) -> bool {
        self.apply(|ctx| action::request_unequip(ctx, id))
    }

    /// Swaps weapons instantly. `None` unequips.
    pub fn quick_switch_weapon(&mut self, id: FighterId, weapon: Option<&WeaponId>) -> bool {
        self.apply(|ctx| action::quick_switch(ctx, id, weapon))
    }

    /// Resolves `hit` on `defender` as if `attacker` had landed it, bypassing
    /// spatial detection.
    pub fn resolve_hit(&mut self, attacker: FighterId, defender: FighterId, hit: Hit) {
        self.apply(|ctx| arbiter::take_hit(ctx, defender, attacker, hit));
    }

    // -------------------------------------------------------------------------
    // Simulation
    // -------------------------------------------------------------------------

    /// Advances the simulation by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        self.animator.tick(dt);
        self.spatial.refresh(&self.arena);
        let ids: Vec<FighterId> = self.arena.ids_sorted().collect();
        {
            let mut ctx = self.context(dt);
            for id in ids {
                procedure::step_fighter(&mut ctx, id);
            }
        }
        self.arena.advance_tick();
    }

    /// Drains the event log.
    pub fn take_events(&mut self) -> Vec<EventEnvelope> {
        self.events.take_events()
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// The fighter registry.
    #[must_use]
    pub const fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Looks up a fighter.
    #[must_use]
    pub fn fighter(&self, id: FighterId) -> Option<&Fighter> {
        self.arena.get(id)
    }

    /// The playback adapter.
    #[must_use]
    pub const fn animator(&self) -> &A {
        &self.animator
    }

    /// Mutable access to the playback adapter, e.g. to scrub clips in tests.
    pub fn animator_mut(&mut self) -> &mut A {
        &mut self.animator
    }

    /// The spatial adapter.
    #[must_use]
    pub const fn spatial(&self) -> &S {
        &self.spatial
    }

    /// The move catalog.
    #[must_use]
    pub const fn catalog(&self) -> &MoveCatalog {
        &self.catalog
    }

    /// The combat settings.
    #[must_use]
    pub const fn settings(&self) -> &CombatSettings {
        &self.settings
    }

    /// Current simulation tick.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.arena.current_tick()
    }

    /// Number of events waiting to be drained.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.events.event_count()
    }
}
