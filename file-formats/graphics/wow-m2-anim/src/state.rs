//! Animation state slots
//!
//! A slot tracks which sequence a group of bones is playing, how far into it
//! they are, and the queued sequence they will blend into next. Bones
//! sharing a slot animate in lockstep.

use log::trace;
use rand::Rng;

use crate::flags::AnimationFlags;
use crate::ids::{AnimationCallback, AnimationId};
use crate::selector;
use crate::skeleton::{Sequence, Skeleton};

/// Tolerance for comparing playback times in seconds
pub const TIME_EPSILON: f32 = 1e-5;

/// Playback state of one slot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationState {
    /// Animation type of the current sequence
    pub current_animation: AnimationId,
    /// Sequence being played
    pub current_sequence: Option<u16>,
    /// Animation type of the queued sequence
    pub next_animation: AnimationId,
    /// Sequence queued after the current one
    pub next_sequence: Option<u16>,
    /// Playback position in seconds
    pub progress: f32,
    /// Time spent blending into the queued sequence (seconds)
    pub transition_time: f32,
    /// Blend duration of the running transition (milliseconds)
    pub time_to_transition_ms: u32,
    /// Additional plays of the current sequence before a new variation is drawn
    pub times_to_repeat: i32,
    /// Flags of the current sequence
    pub flags: AnimationFlags,
    /// Flags applied when the queued sequence becomes current
    pub next_flags: AnimationFlags,
    /// Reported once the current sequence is swapped out
    pub callback: Option<AnimationCallback>,
    /// Becomes `callback` when the queued sequence becomes current
    pub next_callback: Option<AnimationCallback>,
}

/// Outcome of advancing a slot by one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotUpdate {
    /// Bones driven by this slot must be re-evaluated
    pub dirty: bool,
    /// Callback released by a sequence swap
    pub completed: Option<AnimationCallback>,
}

impl AnimationState {
    /// Slot playing `sequence` from its start
    pub fn playing(
        skeleton: &Skeleton,
        animation_id: AnimationId,
        sequence: u16,
        flags: AnimationFlags,
    ) -> Self {
        let mut state = Self::default();
        state.start(skeleton, animation_id, sequence, flags);
        state
    }

    /// Check if no sequence is assigned
    pub fn is_idle(&self) -> bool {
        self.current_sequence.is_none()
    }

    /// Blend weight of the queued sequence in `[0, 1]`
    pub fn transition_progress(&self) -> f32 {
        if !self.flags.is_transitioning() {
            return 0.0;
        }

        let duration = self.time_to_transition_ms as f32 / 1000.0;
        if duration <= 0.0 {
            1.0
        } else {
            (self.transition_time / duration).clamp(0.0, 1.0)
        }
    }

    /// Make `sequence` current immediately, discarding anything queued
    pub fn start(
        &mut self,
        skeleton: &Skeleton,
        animation_id: AnimationId,
        sequence: u16,
        flags: AnimationFlags,
    ) {
        let sequence = selector::resolve_alias(skeleton, sequence);
        let flags = flags.carried_over();

        self.current_animation = animation_id;
        self.current_sequence = Some(sequence);
        self.next_animation = animation_id;
        self.next_sequence = None;
        self.next_flags = AnimationFlags::empty();
        self.next_callback = None;
        self.flags = flags;
        self.transition_time = 0.0;
        self.time_to_transition_ms = 0;
        self.times_to_repeat = 0;
        self.progress = start_progress(skeleton.sequence(sequence), flags);
    }

    /// Queue `sequence` to interrupt the current one
    ///
    /// A running transition restarts towards the new target. Repeats left
    /// over from the interrupted sequence are dropped.
    pub fn force_next(
        &mut self,
        skeleton: &Skeleton,
        animation_id: AnimationId,
        sequence: u16,
        flags: AnimationFlags,
        blend_time_ms: Option<u32>,
    ) {
        self.next_animation = animation_id;
        self.next_sequence = Some(selector::resolve_alias(skeleton, sequence));
        self.next_flags = flags.carried_over() | AnimationFlags::FORCE_TRANSITION;
        self.next_callback = None;
        self.flags.set_transitioning(false);
        self.transition_time = 0.0;
        self.time_to_transition_ms = blend_time_ms.unwrap_or(0);
        self.times_to_repeat = 0;
    }

    /// Replace the requestable flags of the current sequence
    ///
    /// Whatever was queued is dropped, forced interrupts and running
    /// transitions included, so the next tick queues a follow-up that
    /// matches the new flags.
    pub fn replace_flags(&mut self, flags: AnimationFlags) {
        self.flags = (self.flags - AnimationFlags::REQUESTABLE) | flags.carried_over();
        self.flags.set_transitioning(false);

        // Repeats drawn for a cancelled interrupt do not belong to this sequence
        if self.next_flags.is_force_transition() {
            self.times_to_repeat = 0;
        }

        self.next_animation = self.current_animation;
        self.next_sequence = None;
        self.next_flags = AnimationFlags::empty();
        self.next_callback = None;
        self.transition_time = 0.0;
        self.time_to_transition_ms = 0;
    }

    /// Forget the current and queued sequences along with their callback
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Advance the slot by `dt` seconds
    pub fn update<R>(&mut self, skeleton: &Skeleton, dt: f32, rng: &mut R) -> SlotUpdate
    where
        R: Rng + ?Sized,
    {
        let mut update = SlotUpdate::default();

        let Some(current) = self.current_sequence.and_then(|index| skeleton.sequence(index))
        else {
            return update;
        };
        let duration = current.duration();

        let paused = self.flags.is_paused();
        if paused && !self.flags.is_transitioning() {
            return update;
        }

        if !paused {
            let before = self.progress;
            self.progress = if self.flags.is_play_reversed() {
                (self.progress - dt).max(0.0)
            } else {
                (self.progress + dt).min(duration)
            };
            update.dirty |= self.progress != before;

            if self.next_sequence.is_none() && !self.flags.is_hold_at_end() {
                self.queue_next(skeleton, rng);
            }

            if !self.flags.is_transitioning() && self.should_start_transition(skeleton, current) {
                self.flags.set_transitioning(true);
                self.transition_time = 0.0;
                update.dirty = true;
            }
        }

        if self.flags.is_transitioning() {
            if !self.next_flags.is_force_transition() {
                self.progress = self.terminal_progress(duration);
            }

            let finished = if self.time_to_transition_ms > 0 {
                let blend = self.time_to_transition_ms as f32 / 1000.0;
                self.transition_time = (self.transition_time + dt).min(blend);
                self.transition_time >= blend - TIME_EPSILON
            } else {
                true
            };

            update.dirty = true;
            if finished {
                self.flags.set_finished(true);
                update.completed = self.swap(skeleton);
            }
        } else {
            if !self.flags.is_finished() && self.at_terminal(duration) {
                self.flags.set_finished(true);
                update.dirty = true;
            }

            if self.flags.is_finished()
                && !self.flags.is_hold_at_end()
                && self.next_sequence.is_some()
            {
                update.completed = self.swap(skeleton);
                update.dirty = true;
            }
        }

        update
    }

    /// Queue the sequence that follows the current one
    fn queue_next<R>(&mut self, skeleton: &Skeleton, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let Some(current) = self.current_sequence else {
            return;
        };

        let has_variations = skeleton
            .first_sequence(self.current_animation)
            .and_then(|first| skeleton.sequence(first))
            .is_some_and(|first| first.next_variation.is_some());

        let next = if self.times_to_repeat > 0 {
            self.times_to_repeat -= 1;
            current
        } else if has_variations {
            let mut times_to_repeat = 0;
            match selector::select_variation(
                skeleton,
                self.current_animation,
                rng,
                &mut times_to_repeat,
            ) {
                Some(index) => {
                    self.times_to_repeat = times_to_repeat;
                    index
                }
                None => current,
            }
        } else {
            current
        };

        trace!(
            "Queued sequence {next} after {current} (animation {}, {} repeats left)",
            self.current_animation, self.times_to_repeat
        );

        self.next_animation = self.current_animation;
        self.next_sequence = Some(next);
        self.next_flags = self.flags.carried_over();
    }

    fn should_start_transition(&mut self, skeleton: &Skeleton, current: &Sequence) -> bool {
        let Some(next) = self.next_sequence.and_then(|index| skeleton.sequence(index)) else {
            return false;
        };

        let blends = current.flags.blends() || next.flags.blends();

        if self.next_flags.is_force_transition() {
            if self.time_to_transition_ms == 0 && blends {
                self.time_to_transition_ms = next.blend_time_ms;
            }
            return true;
        }

        let duration = current.duration();
        if self.time_to_transition_ms > 0 || blends {
            let blend_ms = if self.time_to_transition_ms > 0 {
                self.time_to_transition_ms
            } else {
                next.blend_time_ms
            };

            let remaining = if self.flags.is_play_reversed() {
                self.progress
            } else {
                duration - self.progress
            };

            if remaining <= blend_ms as f32 / 1000.0 + TIME_EPSILON {
                self.time_to_transition_ms = blend_ms;
                return true;
            }
            return false;
        }

        if self.at_terminal(duration) {
            self.time_to_transition_ms = 0;
            return true;
        }

        false
    }

    /// Make the queued sequence current
    fn swap(&mut self, skeleton: &Skeleton) -> Option<AnimationCallback> {
        let mut flags = self.next_flags;
        flags.set_force_transition(false);

        self.current_animation = self.next_animation;
        self.current_sequence = self.next_sequence.take();
        self.flags = flags;
        self.next_flags = AnimationFlags::empty();
        self.time_to_transition_ms = 0;
        self.transition_time = 0.0;
        self.progress = start_progress(
            self.current_sequence.and_then(|index| skeleton.sequence(index)),
            flags,
        );

        std::mem::replace(&mut self.callback, self.next_callback.take())
    }

    fn at_terminal(&self, duration: f32) -> bool {
        if self.flags.is_play_reversed() {
            self.progress <= TIME_EPSILON
        } else {
            self.progress >= duration - TIME_EPSILON
        }
    }

    fn terminal_progress(&self, duration: f32) -> f32 {
        if self.flags.is_play_reversed() {
            0.0
        } else {
            duration
        }
    }
}

/// Reversed playback starts from the end of the sequence
fn start_progress(sequence: Option<&Sequence>, flags: AnimationFlags) -> f32 {
    match sequence {
        Some(sequence) if flags.is_play_reversed() => sequence.duration(),
        _ => 0.0,
    }
}
