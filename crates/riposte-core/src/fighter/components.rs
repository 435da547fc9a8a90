//! Plain data components of a fighter.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::FighterId;
use crate::catalog::AttackId;

/// Position and facing of a fighter on the ground plane.
///
/// `forward` is kept horizontal and normalized. The right axis is
/// `Y x forward`, so with `forward = +Z` the right axis is `+X`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// World position of the fighter's feet.
    pub position: Vec3,
    /// Horizontal facing direction.
    pub forward: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::Z,
        }
    }
}

impl Transform {
    /// Creates a transform, flattening and normalizing `forward`.
    #[must_use]
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        let flat = Vec3::new(forward.x, 0.0, forward.z);
        Self {
            position,
            forward: flat.try_normalize().unwrap_or(Vec3::Z),
        }
    }

    /// Right axis.
    #[must_use]
    pub fn right(&self) -> Vec3 {
        Vec3::Y.cross(self.forward)
    }

    /// Up axis.
    #[must_use]
    pub const fn up(&self) -> Vec3 {
        Vec3::Y
    }

    /// Expresses a world direction in local axes (`x` right, `y` up, `z` forward).
    #[must_use]
    pub fn to_local_direction(&self, direction: Vec3) -> Vec3 {
        Vec3::new(
            direction.dot(self.right()),
            direction.dot(self.up()),
            direction.dot(self.forward),
        )
    }

    /// Horizontal distance-independent direction to a point, if not degenerate.
    #[must_use]
    pub fn flat_direction_to(&self, point: Vec3) -> Option<Vec3> {
        let delta = point - self.position;
        Vec3::new(delta.x, 0.0, delta.z).try_normalize()
    }

    /// Turns to face `point` immediately.
    pub fn face_towards(&mut self, point: Vec3) {
        if let Some(dir) = self.flat_direction_to(point) {
            self.forward = dir;
        }
    }

    /// Turns towards a horizontal direction by at most `max_degrees`.
    pub fn rotate_towards(&mut self, direction: Vec3, max_degrees: f32) {
        let Some(desired) = Vec3::new(direction.x, 0.0, direction.z).try_normalize() else {
            return;
        };
        let angle = self.forward.angle_between(desired);
        if angle <= f32::EPSILON {
            return;
        }
        let step = angle.min(max_degrees.to_radians().max(0.0));
        let sign = if self.forward.cross(desired).y >= 0.0 {
            1.0
        } else {
            -1.0
        };
        let rotated = Quat::from_rotation_y(step * sign) * self.forward;
        self.forward = rotated.try_normalize().unwrap_or(desired);
    }

    /// Angle in degrees between this facing and another.
    #[must_use]
    pub fn facing_angle_to(&self, other: &Transform) -> f32 {
        self.forward.angle_between(other.forward).to_degrees()
    }
}

/// The scripted exchange a fighter is locked into, shared with its partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedAction {
    /// Attack driving the exchange.
    pub attack: AttackId,
    /// The other fighter in the exchange.
    pub partner: FighterId,
}
