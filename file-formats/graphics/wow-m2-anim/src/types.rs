//! Keyframe containers and the value kinds they can hold

use glam::{Quat, Vec3};

/// Values that can be mixed between two keyframes
///
/// Vectors mix linearly, rotations spherically.
pub trait Interpolate: Copy {
    /// Mix from `self` towards `other` by `t` in `[0, 1]`
    fn interpolate(self, other: Self, t: f32) -> Self;
}

impl Interpolate for f32 {
    fn interpolate(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Interpolate for Vec3 {
    fn interpolate(self, other: Self, t: f32) -> Self {
        self.lerp(other, t)
    }
}

impl Interpolate for Quat {
    fn interpolate(self, other: Self, t: f32) -> Self {
        self.slerp(other, t)
    }
}

/// Keyframes of one channel for one sequence
#[derive(Debug, Clone, PartialEq)]
pub struct Track<T> {
    /// Keyframe times in seconds, ascending
    pub timestamps: Vec<f32>,
    /// One value per timestamp
    pub values: Vec<T>,
}

impl<T> Track<T> {
    /// Create a track from parallel timestamp/value lists
    pub fn new(timestamps: Vec<f32>, values: Vec<T>) -> Self {
        Self { timestamps, values }
    }

    /// Track holding a single keyframe at time 0
    pub fn constant(value: T) -> Self {
        Self {
            timestamps: vec![0.0],
            values: vec![value],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty() || self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len().min(self.values.len())
    }
}

impl<T> Default for Track<T> {
    fn default() -> Self {
        Self {
            timestamps: Vec::new(),
            values: Vec::new(),
        }
    }
}

/// One animated property (translation, rotation or scale) of a bone or
/// texture transform
#[derive(Debug, Clone, PartialEq)]
pub struct Channel<T> {
    /// Tracks indexed by sequence index
    pub tracks: Vec<Track<T>>,
    /// When set, the channel ignores sequences and samples `tracks[0]`
    /// at this global loop's current time
    pub global_loop: Option<u16>,
}

impl<T> Channel<T> {
    /// Channel without any keyframes
    pub fn empty() -> Self {
        Self {
            tracks: Vec::new(),
            global_loop: None,
        }
    }

    /// Channel with one track per sequence
    pub fn per_sequence(tracks: Vec<Track<T>>) -> Self {
        Self {
            tracks,
            global_loop: None,
        }
    }

    /// Channel driven by a global loop
    pub fn global(global_loop: u16, track: Track<T>) -> Self {
        Self {
            tracks: vec![track],
            global_loop: Some(global_loop),
        }
    }

    /// Check if the channel has any keyframes at all
    pub fn has_data(&self) -> bool {
        self.tracks.iter().any(|track| !track.is_empty())
    }

    /// Check if channel uses a global loop
    pub fn uses_global_loop(&self) -> bool {
        self.global_loop.is_some()
    }

    /// Track used for `sequence`, if present and non-empty
    pub fn track_for(&self, sequence: usize) -> Option<&Track<T>> {
        let index = if self.uses_global_loop() { 0 } else { sequence };
        self.tracks.get(index).filter(|track| !track.is_empty())
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::empty()
    }
}
