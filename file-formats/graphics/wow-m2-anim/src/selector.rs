//! Sequence selection: weighted variations, repeat counts, aliases and
//! fallbacks from the animation metadata table

use std::collections::HashMap;

use log::trace;
use rand::Rng;

use crate::flags::AnimationFlags;
use crate::ids::AnimationId;
use crate::skeleton::Skeleton;

/// Upper bound (exclusive) of the variation probability draw
pub const VARIATION_PROBABILITY_RANGE: u16 = 0x7fff;

/// Maximum number of alias hops followed before giving up
const MAX_ALIAS_DEPTH: usize = 100;

/// Per-animation-type metadata kept outside the model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnimationMetadata {
    /// Animation to play when a model lacks this one
    pub fallback: Option<AnimationId>,
    /// Upper and lower body may play different animations
    pub split_body: bool,
    /// Fallback sequence plays backwards
    pub fallback_plays_reverse: bool,
    /// Fallback sequence holds its last frame
    pub fallback_holds_end: bool,
}

/// Source of [`AnimationMetadata`] records
pub trait AnimationMetadataProvider {
    fn metadata(&self, animation_id: AnimationId) -> Option<AnimationMetadata>;
}

impl AnimationMetadataProvider for HashMap<AnimationId, AnimationMetadata> {
    fn metadata(&self, animation_id: AnimationId) -> Option<AnimationMetadata> {
        self.get(&animation_id).copied()
    }
}

/// Provider without any records, every lookup misses
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadata;

impl AnimationMetadataProvider for NoMetadata {
    fn metadata(&self, _animation_id: AnimationId) -> Option<AnimationMetadata> {
        None
    }
}

/// Sequence picked for a requested animation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedSequence {
    /// Sequence index in the skeleton
    pub index: u16,
    /// Animation id actually resolved, differs from the request for fallbacks
    pub animation_id: AnimationId,
    /// Whether the fallback animation was substituted
    pub is_fallback: bool,
    /// Split-body behavior of the requested animation
    pub split_body: bool,
    /// Flags implied by the fallback metadata
    pub flags: AnimationFlags,
}

/// Look up the first sequence of an animation type
pub fn resolve_first_sequence(skeleton: &Skeleton, animation_id: AnimationId) -> Option<u16> {
    skeleton.first_sequence(animation_id)
}

/// Resolve an animation type, substituting the metadata fallback when the
/// skeleton has no sequence for it
pub fn resolve_with_fallback<M>(
    skeleton: &Skeleton,
    animation_id: AnimationId,
    metadata: &M,
) -> Option<ResolvedSequence>
where
    M: AnimationMetadataProvider + ?Sized,
{
    let record = metadata.metadata(animation_id).unwrap_or_default();

    if let Some(index) = resolve_first_sequence(skeleton, animation_id) {
        return Some(ResolvedSequence {
            index,
            animation_id,
            is_fallback: false,
            split_body: record.split_body,
            flags: AnimationFlags::empty(),
        });
    }

    let fallback = record.fallback?;
    let index = resolve_first_sequence(skeleton, fallback)?;

    let mut flags = AnimationFlags::empty();
    flags.set(AnimationFlags::PLAY_REVERSED, record.fallback_plays_reverse);
    flags.set(AnimationFlags::HOLD_AT_END, record.fallback_holds_end);

    trace!("Animation {animation_id} resolved through fallback {fallback} (sequence {index})");

    Some(ResolvedSequence {
        index,
        animation_id: fallback,
        is_fallback: true,
        split_body: record.split_body,
        flags,
    })
}

/// Follow alias links until a playable sequence is reached
///
/// Returns the input index if the chain leaves the sequence table or does
/// not terminate.
pub fn resolve_alias(skeleton: &Skeleton, index: u16) -> u16 {
    let mut current = index;

    for _ in 0..MAX_ALIAS_DEPTH {
        let Some(sequence) = skeleton.sequence(current) else {
            return index;
        };

        if !sequence.flags.is_alias() {
            return current;
        }

        current = sequence.alias_next;
    }

    index
}

/// Pick a weighted variation of an animation type
///
/// Walks the variation chain from the type's first sequence, summing
/// frequencies until the sum reaches a uniform draw in
/// `[0, VARIATION_PROBABILITY_RANGE)`. `times_to_repeat` receives the
/// number of additional plays of the chosen sequence.
pub fn select_variation<R>(
    skeleton: &Skeleton,
    animation_id: AnimationId,
    rng: &mut R,
    times_to_repeat: &mut i32,
) -> Option<u16>
where
    R: Rng + ?Sized,
{
    let first = resolve_first_sequence(skeleton, animation_id)?;
    let probability = rng.random_range(0..VARIATION_PROBABILITY_RANGE);

    let mut accumulated = 0u32;
    let mut current = first;

    // A malformed chain may cycle, never visit more nodes than exist
    for _ in 0..skeleton.sequence_count() {
        let Some(sequence) = skeleton.sequence(current) else {
            break;
        };

        accumulated += u32::from(sequence.frequency);
        if accumulated >= u32::from(probability) {
            break;
        }

        match sequence.next_variation {
            Some(next) if (next as usize) < skeleton.sequence_count() => current = next,
            _ => break,
        }
    }

    let index = resolve_alias(skeleton, current);
    *times_to_repeat = skeleton
        .sequence(index)
        .map_or(0, |sequence| {
            calculate_repeats(sequence.min_repetitions, sequence.max_repetitions, rng)
        });

    Some(index)
}

/// Draw the number of additional plays for a `[min, max]` repetition range
pub fn calculate_repeats<R>(min: u32, max: u32, rng: &mut R) -> i32
where
    R: Rng + ?Sized,
{
    let (low, high) = if max < min { (min, min) } else { (min, max) };
    let plays = rng.random_range(low..=high);
    i32::try_from(plays).unwrap_or(i32::MAX) - 1
}
