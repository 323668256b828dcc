//! Playback control: requesting animations on key bones, pausing,
//! stopping and procedural rotations
//!
//! These calls run between ticks. They only edit the animation record and
//! mark the affected slot dirty; the next tick picks the change up.

use glam::Quat;
use log::debug;

use crate::flags::AnimationFlags;
use crate::ids::{AnimationCallback, AnimationId, KeyBone};
use crate::instance::AnimationData;
use crate::selector::{self, AnimationMetadataProvider};
use crate::skeleton::Skeleton;
use crate::state::AnimationState;

/// Request to play an animation on a part of the skeleton
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationRequest {
    /// Key bone whose subtree plays the animation
    pub key_bone: KeyBone,
    pub animation_id: AnimationId,
    /// Requested playback flags, only paused/reversed/hold are honored
    pub flags: AnimationFlags,
    /// Blend duration overriding the sequence's own (milliseconds)
    pub blend_time_ms: Option<u32>,
    /// Reported when the sequence is swapped out
    pub callback: Option<AnimationCallback>,
}

impl AnimationRequest {
    pub fn new(animation_id: AnimationId) -> Self {
        Self {
            key_bone: KeyBone::Default,
            animation_id,
            flags: AnimationFlags::empty(),
            blend_time_ms: None,
            callback: None,
        }
    }

    pub fn on(mut self, key_bone: KeyBone) -> Self {
        self.key_bone = key_bone;
        self
    }

    pub fn with_flags(mut self, flags: AnimationFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_blend_time(mut self, blend_time_ms: u32) -> Self {
        self.blend_time_ms = Some(blend_time_ms);
        self
    }

    pub fn with_callback(mut self, callback: AnimationCallback) -> Self {
        self.callback = Some(callback);
        self
    }
}

/// Play an animation on the slot driving the request's key bone
///
/// Falls back to the metadata fallback animation when the skeleton lacks
/// the requested one. A slot already playing the animation only takes the
/// new flags and drops whatever it had queued. Otherwise a weighted
/// variation is drawn and either started on an idle slot or queued to
/// interrupt the current sequence.
pub fn play_animation<M>(
    skeleton: &Skeleton,
    data: &mut AnimationData,
    metadata: &M,
    request: AnimationRequest,
) -> bool
where
    M: AnimationMetadataProvider + ?Sized,
{
    let Some(resolved) = selector::resolve_with_fallback(skeleton, request.animation_id, metadata)
    else {
        debug!(
            "Model {:?} has no sequence for animation {}",
            data.model_identity, request.animation_id
        );
        return false;
    };

    let Some(slot) = acquire_slot(skeleton, data, request.key_bone) else {
        return false;
    };

    let flags = request.flags.carried_over() | resolved.flags;

    let state = &mut data.states[slot as usize];
    if !state.is_idle() && state.current_animation == resolved.animation_id {
        state.replace_flags(flags);
        state.callback = request.callback;
        data.mark_dirty(slot);
        return true;
    }

    let (sequence, times_to_repeat) = data
        .select_variation(skeleton, resolved.animation_id)
        .unwrap_or((resolved.index, 0));

    let state = &mut data.states[slot as usize];
    if state.is_idle() {
        state.start(skeleton, resolved.animation_id, sequence, flags);
        state.callback = request.callback;
    } else {
        state.force_next(
            skeleton,
            resolved.animation_id,
            sequence,
            flags,
            request.blend_time_ms,
        );
        state.next_callback = request.callback;
    }
    state.times_to_repeat = times_to_repeat;

    data.mark_dirty(slot);
    true
}

/// Check if the slot of a key bone is playing an animation
pub fn is_playing(
    skeleton: &Skeleton,
    data: &AnimationData,
    key_bone: KeyBone,
    animation_id: AnimationId,
) -> bool {
    state_for_key_bone(skeleton, data, key_bone)
        .is_some_and(|state| !state.is_idle() && state.current_animation == animation_id)
}

/// Check if the skeleton has any sequence for an animation
pub fn has_animation(skeleton: &Skeleton, animation_id: AnimationId) -> bool {
    selector::resolve_first_sequence(skeleton, animation_id).is_some()
}

/// State of the slot driving a key bone
pub fn state_for_key_bone<'a>(
    skeleton: &Skeleton,
    data: &'a AnimationData,
    key_bone: KeyBone,
) -> Option<&'a AnimationState> {
    let slot = slot_for_key_bone(skeleton, data, key_bone)?;
    data.states.get(slot as usize)
}

/// Pause or resume the slot driving a key bone
pub fn set_paused(
    skeleton: &Skeleton,
    data: &mut AnimationData,
    key_bone: KeyBone,
    paused: bool,
) -> bool {
    let Some(slot) = slot_for_key_bone(skeleton, data, key_bone) else {
        return false;
    };

    data.states[slot as usize].flags.set_paused(paused);
    data.mark_dirty(slot);
    true
}

/// Drop the current and queued sequences of the slot driving a key bone
///
/// Bones split off onto their own slot rejoin the slot of their parent and
/// follow it from the next tick. Stopping the root slot leaves its bones on
/// their last matrices.
pub fn stop(skeleton: &Skeleton, data: &mut AnimationData, key_bone: KeyBone) -> bool {
    let Some(slot) = slot_for_key_bone(skeleton, data, key_bone) else {
        return false;
    };

    data.states[slot as usize].clear();
    if slot != 0 {
        release_slot(skeleton, data, slot);
    }
    true
}

/// Rotate a bone on top of its authored animation
pub fn set_procedural_rotation(data: &mut AnimationData, bone: u16, rotation: Quat) -> bool {
    if !rotation.is_finite() || rotation.length_squared() <= f32::EPSILON {
        return false;
    }

    let Some(instance) = data.bone_instances.get(bone as usize) else {
        return false;
    };

    let index = match instance.procedural_rotation_index {
        Some(index) => index as usize,
        None => {
            data.procedural_rotation_offsets.push(Quat::IDENTITY);
            let index = data.procedural_rotation_offsets.len() - 1;
            data.bone_instances[bone as usize].procedural_rotation_index = Some(index as u16);
            index
        }
    };

    data.procedural_rotation_offsets[index] = rotation.normalize();
    if let Some(slot) = data.state_index_for_bone(bone) {
        data.mark_dirty(slot);
    }
    true
}

/// Reset a bone's procedural rotation to identity
pub fn clear_procedural_rotation(data: &mut AnimationData, bone: u16) -> bool {
    let Some(index) = data
        .bone_instances
        .get(bone as usize)
        .and_then(|instance| instance.procedural_rotation_index)
    else {
        return false;
    };

    if let Some(offset) = data.procedural_rotation_offsets.get_mut(index as usize) {
        *offset = Quat::IDENTITY;
    }
    if let Some(slot) = data.state_index_for_bone(bone) {
        data.mark_dirty(slot);
    }
    true
}

/// Slot currently driving a key bone, without allocating
fn slot_for_key_bone(skeleton: &Skeleton, data: &AnimationData, key_bone: KeyBone) -> Option<u16> {
    if key_bone == KeyBone::Default {
        return Some(0);
    }

    let bone = skeleton.key_bone(key_bone)?;
    data.state_index_for_bone(bone)
}

/// Slot owned by a key bone, split off its parent's slot on first use
fn acquire_slot(skeleton: &Skeleton, data: &mut AnimationData, key_bone: KeyBone) -> Option<u16> {
    if key_bone == KeyBone::Default {
        return Some(0);
    }

    let Some(bone) = skeleton.key_bone(key_bone) else {
        debug!("Skeleton has no {key_bone:?} key bone");
        return None;
    };

    let current = data.state_index_for_bone(bone);
    let parent_slot = skeleton.bones[bone as usize]
        .parent
        .and_then(|parent| data.state_index_for_bone(parent));

    match (current, parent_slot) {
        (Some(slot), Some(parent)) if slot != parent => return Some(slot),
        (Some(slot), None) => return Some(slot),
        _ => {}
    }

    let slot = data.allocate_state().ok()?;
    assign_subtree(skeleton, data, bone, current, slot);
    Some(slot)
}

/// Hand every bone driven by `slot` back to its parent's slot
///
/// Parents come first in the bone list, so a released parent has already
/// picked its new slot when its children are visited.
fn release_slot(skeleton: &Skeleton, data: &mut AnimationData, slot: u16) {
    for index in 0..data.bone_instances.len() {
        if data.bone_instances[index].state_index != Some(slot) {
            continue;
        }

        let inherited = skeleton
            .bones
            .get(index)
            .and_then(|bone| bone.parent)
            .and_then(|parent| data.state_index_for_bone(parent))
            .filter(|&parent_slot| parent_slot != slot)
            .unwrap_or(0);

        data.bone_instances[index].state_index = Some(inherited);
        data.mark_dirty(inherited);
    }

    debug!("Released state slot {slot} of model {:?}", data.model_identity);
}

/// Move `root` and every descendant driven by `previous` to `slot`
fn assign_subtree(
    skeleton: &Skeleton,
    data: &mut AnimationData,
    root: u16,
    previous: Option<u16>,
    slot: u16,
) {
    let mut stack = vec![root];

    while let Some(bone) = stack.pop() {
        let Some(instance) = data.bone_instances.get_mut(bone as usize) else {
            continue;
        };

        // Descendants with a slot of their own keep it, and so does their subtree
        if bone != root && instance.state_index != previous {
            continue;
        }

        instance.state_index = Some(slot);
        if let Some(children) = skeleton.children.get(bone as usize) {
            stack.extend_from_slice(children);
        }
    }
}
