//! Sphere-based spatial queries for headless simulation.
//!
//! Every fighter is a sphere of [`Reach::body_radius`] centered
//! [`Reach::body_height`] above its feet. Hit-volumes are spheres placed in
//! front of the fighter at a per-volume reach. A swept query tests the segment
//! between two volume centers against each body sphere.

use std::collections::BTreeMap;

use glam::Vec3;

use super::{Contact, LayerMask, SpatialQuery, VolumePose};
use crate::arena::Arena;
use crate::catalog::HitVolume;
use crate::fighter::FighterId;

/// Geometry used by [`ProximitySpatial`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reach {
    /// Forward offset of the weapon volume.
    pub weapon: f32,
    /// Forward offset of the hand volumes.
    pub hand: f32,
    /// Forward offset of the foot volumes.
    pub foot: f32,
    /// Radius of every hit-volume.
    pub volume_radius: f32,
    /// Radius of a fighter's body sphere.
    pub body_radius: f32,
    /// Height of the body sphere and the upper-body volumes.
    pub body_height: f32,
}

impl Default for Reach {
    fn default() -> Self {
        Self {
            weapon: 1.6,
            hand: 0.8,
            foot: 0.9,
            volume_radius: 0.35,
            body_radius: 0.45,
            body_height: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Body {
    position: Vec3,
    forward: Vec3,
    layer: u8,
}

/// Spatial queries over a snapshot of fighter positions.
#[derive(Debug, Clone, Default)]
pub struct ProximitySpatial {
    reach: Reach,
    bodies: BTreeMap<FighterId, Body>,
}

impl ProximitySpatial {
    /// Creates an empty snapshot with default geometry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty snapshot with custom geometry.
    #[must_use]
    pub fn with_reach(reach: Reach) -> Self {
        Self {
            reach,
            bodies: BTreeMap::new(),
        }
    }

    /// Geometry in use.
    #[must_use]
    pub const fn reach(&self) -> &Reach {
        &self.reach
    }

    fn body_center(&self, body: &Body) -> Vec3 {
        body.position + Vec3::Y * self.reach.body_height
    }
}

/// Closest point to `point` on the segment `a..b`.
fn closest_on_segment(a: Vec3, b: Vec3, point: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return a;
    }
    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

impl SpatialQuery for ProximitySpatial {
    fn refresh(&mut self, arena: &Arena) {
        self.bodies = arena
            .fighters_sorted()
            .filter(|f| !f.is_dead())
            .map(|f| {
                (
                    f.id(),
                    Body {
                        position: f.transform().position,
                        forward: f.transform().forward,
                        layer: f.layer(),
                    },
                )
            })
            .collect();
    }

    fn volume_pose(&self, fighter: FighterId, volume: HitVolume) -> Option<VolumePose> {
        let body = self.bodies.get(&fighter)?;
        let right = Vec3::Y.cross(body.forward);
        let (reach, side, height) = match volume {
            HitVolume::Weapon => (self.reach.weapon, 0.0, self.reach.body_height),
            HitVolume::LeftHand => (self.reach.hand, -0.2, self.reach.body_height),
            HitVolume::RightHand => (self.reach.hand, 0.2, self.reach.body_height),
            HitVolume::LeftFoot => (self.reach.foot, -0.15, self.reach.body_height * 0.5),
            HitVolume::RightFoot => (self.reach.foot, 0.15, self.reach.body_height * 0.5),
        };
        Some(VolumePose {
            center: body.position + body.forward * reach + right * side + Vec3::Y * height,
            radius: self.reach.volume_radius,
        })
    }

    fn overlap_swept(
        &self,
        from: &VolumePose,
        to: &VolumePose,
        mask: LayerMask,
        exclude: FighterId,
    ) -> Vec<Contact> {
        let radius = from.radius.max(to.radius) + self.reach.body_radius;
        self.bodies
            .iter()
            .filter(|(id, body)| **id != exclude && mask.contains(body.layer))
            .filter_map(|(id, body)| {
                let center = self.body_center(body);
                let closest = closest_on_segment(from.center, to.center, center);
                let offset = closest - center;
                if offset.length() > radius {
                    return None;
                }
                let point = center + offset.normalize_or_zero() * self.reach.body_radius;
                Some(Contact {
                    fighter: *id,
                    point,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fighter::Transform;
    use crate::settings::FighterConfig;

    fn duel(distance: f32) -> (Arena, FighterId, FighterId) {
        let mut arena = Arena::new();
        let a = arena.spawn(FighterConfig::default(), Transform::new(Vec3::ZERO, Vec3::Z));
        let b = arena.spawn(
            FighterConfig::default(),
            Transform::new(Vec3::new(0.0, 0.0, distance), -Vec3::Z),
        );
        (arena, a, b)
    }

    #[test]
    fn weapon_reaches_fighter_at_two_meters() {
        let (arena, a, b) = duel(2.0);
        let mut spatial = ProximitySpatial::new();
        spatial.refresh(&arena);
        let pose = spatial.volume_pose(a, HitVolume::Weapon).unwrap();
        let contacts = spatial.overlap_swept(&pose, &pose, LayerMask::ALL, a);
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].fighter, b);
        assert!(contacts[0].point.z < 2.0);
    }

    #[test]
    fn weapon_misses_at_three_meters() {
        let (arena, a, _) = duel(3.0);
        let mut spatial = ProximitySpatial::new();
        spatial.refresh(&arena);
        let pose = spatial.volume_pose(a, HitVolume::Weapon).unwrap();
        assert!(spatial.overlap_swept(&pose, &pose, LayerMask::ALL, a).is_empty());
    }

    #[test]
    fn sweep_catches_what_endpoints_miss() {
        let (arena, a, b) = duel(0.0);
        let mut spatial = ProximitySpatial::new();
        spatial.refresh(&arena);
        let from = VolumePose {
            center: Vec3::new(-3.0, 1.0, 0.0),
            radius: 0.1,
        };
        let to = VolumePose {
            center: Vec3::new(3.0, 1.0, 0.0),
            radius: 0.1,
        };
        let contacts = spatial.overlap_swept(&from, &to, LayerMask::ALL, a);
        assert_eq!(contacts.iter().map(|c| c.fighter).collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn mask_filters_layers() {
        let (arena, a, _) = duel(2.0);
        let mut spatial = ProximitySpatial::new();
        spatial.refresh(&arena);
        let pose = spatial.volume_pose(a, HitVolume::Weapon).unwrap();
        assert!(spatial
            .overlap_swept(&pose, &pose, LayerMask::ALL.without(0), a)
            .is_empty());
    }
}
