//! Headless animator driven by simulated time.

use std::collections::BTreeMap;

use super::{Animator, ClipRequest, PlaybackId, PlaybackState};
use crate::fighter::FighterId;

#[derive(Debug, Clone)]
struct Track {
    id: PlaybackId,
    clip: String,
    /// Playback length in seconds, speed applied.
    length: f32,
    elapsed: f32,
}

impl Track {
    fn normalized(&self) -> f32 {
        if self.length <= 0.0 {
            return 1.0;
        }
        (self.elapsed / self.length).clamp(0.0, 1.0)
    }
}

/// Plays clips as timers that advance with [`Animator::tick`].
///
/// Clips never loop; a finished clip holds at normalized time 1 until it is
/// replaced or the fighter returns to its base pose.
#[derive(Debug, Clone, Default)]
pub struct TimelineAnimator {
    next_id: u64,
    tracks: BTreeMap<FighterId, Track>,
}

impl TimelineAnimator {
    /// Creates an animator with nothing playing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Jumps the current clip of `fighter` to a normalized time.
    ///
    /// Returns false if nothing is playing.
    pub fn seek(&mut self, fighter: FighterId, normalized: f32) -> bool {
        match self.tracks.get_mut(&fighter) {
            Some(track) => {
                track.elapsed = normalized.clamp(0.0, 1.0) * track.length;
                true
            }
            None => false,
        }
    }

    /// Name of the clip currently playing on `fighter`.
    #[must_use]
    pub fn current_clip(&self, fighter: FighterId) -> Option<&str> {
        self.tracks.get(&fighter).map(|t| t.clip.as_str())
    }
}

impl Animator for TimelineAnimator {
    fn play(&mut self, fighter: FighterId, request: &ClipRequest) -> PlaybackId {
        let id = PlaybackId::new(self.next_id);
        self.next_id += 1;
        let speed = if request.speed > 0.0 { request.speed } else { 1.0 };
        tracing::trace!(%fighter, clip = %request.clip.name, "play clip");
        self.tracks.insert(
            fighter,
            Track {
                id,
                clip: request.clip.name.clone(),
                length: request.clip.length / speed,
                elapsed: 0.0,
            },
        );
        id
    }

    fn playback(&self, fighter: FighterId) -> Option<PlaybackState> {
        self.tracks.get(&fighter).map(|track| PlaybackState {
            id: track.id,
            clip: track.clip.clone(),
            normalized_time: track.normalized(),
            length: track.length,
        })
    }

    fn return_to_base_pose(&mut self, fighter: FighterId) {
        self.tracks.remove(&fighter);
    }

    fn tick(&mut self, dt: f32) {
        for track in self.tracks.values_mut() {
            track.elapsed = (track.elapsed + dt.max(0.0)).min(track.length.max(0.0));
        }
    }
}
