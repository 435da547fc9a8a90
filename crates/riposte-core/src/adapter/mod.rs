//! Boundaries to the animation and spatial systems.
//!
//! The combat core does not play animations or run physics. It consumes two
//! collaborators through traits:
//! - [`Animator`]: starts clips and reports the normalized time of what is
//!   currently playing on a fighter
//! - [`SpatialQuery`]: poses hit-volumes and reports swept overlaps
//!
//! Neither trait can reach back into combat state. The core polls them once
//! per tick and decides everything itself.
//!
//! Two reference implementations are provided for headless simulation and
//! tests: [`TimelineAnimator`] (clips advance with simulated time) and
//! [`ProximitySpatial`] (fighters are spheres, volumes sit in front of them).

pub mod proximity;
pub mod timeline;

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

pub use proximity::{ProximitySpatial, Reach};
pub use timeline::TimelineAnimator;

use crate::arena::Arena;
use crate::catalog::{ClipRef, HitVolume};
use crate::fighter::FighterId;

// =============================================================================
// Animation
// =============================================================================

/// A request to play a clip on a fighter.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipRequest {
    /// Clip to play.
    pub clip: ClipRef,
    /// Playback speed multiplier.
    pub speed: f32,
    /// Blend-in time in seconds.
    pub transition_in: f32,
    /// Blend-out time in seconds.
    pub transition_out: f32,
}

impl ClipRequest {
    /// Plays `clip` at normal speed with the default blend times.
    #[must_use]
    pub fn new(clip: ClipRef) -> Self {
        Self {
            clip,
            speed: 1.0,
            transition_in: 0.2,
            transition_out: 0.2,
        }
    }

    /// Sets the playback speed.
    #[must_use]
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }
}

/// Handle of one started playback. A new handle is issued for every
/// [`Animator::play`] call, so a procedure can tell whether its clip was
/// replaced.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlaybackId(u64);

impl PlaybackId {
    /// Creates a handle from a raw value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Debug for PlaybackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlaybackId({})", self.0)
    }
}

/// What a fighter is currently playing.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    /// Handle returned when the clip was started.
    pub id: PlaybackId,
    /// Clip name.
    pub clip: String,
    /// Progress in `0..=1`.
    pub normalized_time: f32,
    /// Playback length in seconds, speed applied.
    pub length: f32,
}

impl PlaybackState {
    /// Returns true once the clip has played to the end.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.normalized_time >= 1.0
    }
}

/// Animation playback consumed by the combat core.
pub trait Animator {
    /// Starts `request` on `fighter`, replacing whatever was playing.
    fn play(&mut self, fighter: FighterId, request: &ClipRequest) -> PlaybackId;

    /// Current playback of `fighter`, or `None` when it is in its base pose.
    fn playback(&self, fighter: FighterId) -> Option<PlaybackState>;

    /// Stops any clip and returns `fighter` to its base pose.
    fn return_to_base_pose(&mut self, fighter: FighterId);

    /// Advances playback by `dt` seconds. Called once per world step before
    /// any fighter is stepped.
    fn tick(&mut self, _dt: f32) {}
}

// =============================================================================
// Spatial queries
// =============================================================================

/// Bit set of collision layers.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(u32);

impl LayerMask {
    /// Every layer.
    pub const ALL: Self = Self(u32::MAX);
    /// No layer.
    pub const NONE: Self = Self(0);

    /// Creates a mask from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// A mask holding one layer. Layers outside `0..32` give an empty mask.
    #[must_use]
    pub const fn layer(layer: u8) -> Self {
        if layer < 32 {
            Self(1 << layer)
        } else {
            Self::NONE
        }
    }

    /// Returns true if `layer` is in the mask.
    #[must_use]
    pub const fn contains(self, layer: u8) -> bool {
        layer < 32 && self.0 & (1 << layer) != 0
    }

    /// The mask with `layer` removed.
    #[must_use]
    pub const fn without(self, layer: u8) -> Self {
        Self(self.0 & !Self::layer(layer).0)
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl fmt::Debug for LayerMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerMask({:#010x})", self.0)
    }
}

/// World-space pose of a spherical hit-volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumePose {
    /// Sphere center.
    pub center: Vec3,
    /// Sphere radius.
    pub radius: f32,
}

/// A fighter touched by a swept volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Fighter that was touched.
    pub fighter: FighterId,
    /// Contact point on the fighter's body.
    pub point: Vec3,
}

/// Spatial overlap queries consumed by the combat core during impact.
pub trait SpatialQuery {
    /// Refreshes the query structures from fighter positions. Called once per
    /// world step after animation advanced.
    fn refresh(&mut self, _arena: &Arena) {}

    /// Current pose of one of `fighter`'s hit-volumes.
    fn volume_pose(&self, fighter: FighterId, volume: HitVolume) -> Option<VolumePose>;

    /// Fighters on `mask` touched by a volume moving from `from` to `to`,
    /// sorted by fighter id. `exclude` is never reported.
    fn overlap_swept(
        &self,
        from: &VolumePose,
        to: &VolumePose,
        mask: LayerMask,
        exclude: FighterId,
    ) -> Vec<Contact>;
}
