//! Keyframe interpolation for animation tracks

use super::types::{Interpolate, Track};

/// Find the keyframe that closes the segment containing `time`
///
/// Returns the index of the first keyframe (from index 1 onward) whose
/// timestamp is at or after `time`, so the bracketing pair is
/// `[index - 1, index]`. Returns `None` when `time` is at or past the last
/// keyframe, or when the track has fewer than two keyframes.
pub fn find_segment_end(timestamps: &[f32], time: f32) -> Option<usize> {
    let last = timestamps.len().checked_sub(1)?;
    if last == 0 || time >= timestamps[last] {
        return None;
    }

    // Tracks are short, a linear scan beats a binary search here
    (1..=last).find(|&index| timestamps[index] >= time)
}

/// Sample a track at `time` seconds
///
/// Single keyframes are returned verbatim, times past the last keyframe
/// clamp to the last value. There is no wraparound: looping is the
/// caller's business. Returns `None` for an empty track.
pub fn sample<T: Interpolate>(track: &Track<T>, time: f32) -> Option<T> {
    let len = track.len();
    if len == 0 {
        return None;
    }

    let timestamps = &track.timestamps[..len];
    let values = &track.values[..len];

    if len == 1 {
        return Some(values[0]);
    }

    let Some(end) = find_segment_end(timestamps, time) else {
        return Some(values[len - 1]);
    };

    let start = end - 1;
    let time0 = timestamps[start];
    let time1 = timestamps[end];

    // Zero-length segment, keep the earlier value
    if time1 <= time0 {
        return Some(values[start]);
    }

    let t = ((time - time0) / (time1 - time0)).clamp(0.0, 1.0);
    Some(values[start].interpolate(values[end], t))
}

/// Sample a track that may be missing, falling back to `default`
pub fn sample_or<T: Interpolate>(track: Option<&Track<T>>, time: f32, default: T) -> T {
    track.and_then(|track| sample(track, time)).unwrap_or(default)
}

/// Mix a sampled value towards the value of the sequence being blended in
///
/// `progress` is the transition progress in `[0, 1]`, 0 meaning only the
/// outgoing value.
pub fn blend<T: Interpolate>(current: T, next: T, progress: f32) -> T {
    current.interpolate(next, progress.clamp(0.0, 1.0))
}
