//! Bone hierarchy transform computation
//!
//! Bones are stored parents first, so one forward pass over the bone list
//! composes every model-space matrix from its parent's result of the same
//! pass.

use glam::{Mat4, Quat, Vec3};

use crate::clock::GlobalLoop;
use crate::instance::{AnimationData, DirtyMask};
use crate::interpolation::{blend, sample_or};
use crate::skeleton::Skeleton;
use crate::state::AnimationState;
use crate::types::{Channel, Interpolate};

/// Sample a channel for the state driving it
///
/// Global-loop channels read their first track at the loop's clock and
/// ignore the state entirely. Otherwise the current sequence's track is
/// sampled at the state's progress and, while a transition is running,
/// mixed towards the first frame of the queued sequence.
pub fn sample_channel<T: Interpolate>(
    channel: &Channel<T>,
    state: &AnimationState,
    global_loops: &[GlobalLoop],
    default: T,
) -> T {
    if let Some(global_loop) = channel.global_loop {
        let time = global_loops
            .get(global_loop as usize)
            .map_or(0.0, |global_loop| global_loop.current_time);
        return sample_or(channel.track_for(0), time, default);
    }

    let Some(current) = state.current_sequence else {
        return default;
    };

    let value = sample_or(channel.track_for(current as usize), state.progress, default);

    match state.next_sequence {
        Some(next) if state.flags.is_transitioning() && state.transition_time > 0.0 => {
            let next_value = sample_or(channel.track_for(next as usize), 0.0, default);
            blend(value, next_value, state.transition_progress())
        }
        _ => value,
    }
}

/// Local matrix: pivot, translation, rotation, scale, then back from pivot
pub fn compose_local(pivot: Vec3, translation: Vec3, rotation: Quat, scale: Vec3) -> Mat4 {
    Mat4::from_translation(pivot)
        * Mat4::from_scale_rotation_translation(scale, rotation, translation)
        * Mat4::from_translation(-pivot)
}

/// Apply a procedural offset on top of a sampled rotation
pub fn apply_procedural_rotation(offset: Quat, rotation: Quat) -> Quat {
    (offset * rotation.normalize()).normalize()
}

/// Compute the model-space matrix of one bone
///
/// The parent's matrix must already be up to date in
/// `data.bone_transforms`.
pub fn compose_bone_matrix(skeleton: &Skeleton, data: &AnimationData, bone_index: usize) -> Mat4 {
    let Some(bone) = skeleton.bones.get(bone_index) else {
        return Mat4::IDENTITY;
    };

    let offset = data
        .bone_instances
        .get(bone_index)
        .and_then(|instance| instance.procedural_rotation_index)
        .and_then(|index| data.procedural_rotation_offsets.get(index as usize))
        .copied();

    let local = if bone.is_transformed() || offset.is_some() {
        let idle = AnimationState::default();
        let state = data
            .state_index_for_bone(bone_index as u16)
            .and_then(|slot| data.states.get(slot as usize))
            .unwrap_or(&idle);

        let loops = &data.global_loops;
        let translation = sample_channel(&bone.translation, state, loops, Vec3::ZERO);
        let mut rotation = sample_channel(&bone.rotation, state, loops, Quat::IDENTITY);
        let scale = sample_channel(&bone.scale, state, loops, Vec3::ONE);

        if let Some(offset) = offset {
            rotation = apply_procedural_rotation(offset, rotation);
        }

        compose_local(bone.pivot, translation, rotation, scale)
    } else {
        Mat4::IDENTITY
    };

    match bone.parent {
        Some(parent) => {
            debug_assert!((parent as usize) < bone_index);
            data.bone_transforms
                .get(parent as usize)
                .map_or(local, |parent| *parent * local)
        }
        None => local,
    }
}

/// Recompute the bones affected by this tick
///
/// A bone is re-evaluated when its slot is dirty, when its parent was
/// re-evaluated, or when it is driven by a global loop and any loop moved.
/// Bones with neither animation nor a parent keep their matrix. Returns
/// whether any matrix was written.
pub fn update_bone_matrices(
    skeleton: &Skeleton,
    data: &mut AnimationData,
    dirty: DirtyMask,
    loops_advanced: bool,
) -> bool {
    let count = skeleton.bone_count().min(data.bone_transforms.len());
    debug_assert_eq!(skeleton.bone_count(), data.bone_transforms.len());

    let mut recomputed = std::mem::take(&mut data.recomputed);
    recomputed.clear();
    recomputed.resize(count, false);

    for index in 0..count {
        let bone = &skeleton.bones[index];

        let has_offset = data
            .bone_instances
            .get(index)
            .is_some_and(|instance| instance.procedural_rotation_index.is_some());
        if !bone.is_transformed() && bone.parent.is_none() && !has_offset {
            continue;
        }

        let slot_dirty = data
            .state_index_for_bone(index as u16)
            .is_some_and(|slot| dirty.contains(slot as usize));
        let parent_recomputed = bone
            .parent
            .is_some_and(|parent| recomputed.get(parent as usize).copied().unwrap_or(false));
        let loop_driven = loops_advanced && bone.uses_global_loop();

        if !(slot_dirty || parent_recomputed || loop_driven) {
            continue;
        }

        let matrix = compose_bone_matrix(skeleton, data, index);
        data.bone_transforms[index] = matrix;
        recomputed[index] = true;
    }

    let any = recomputed.contains(&true);
    data.recomputed = recomputed;
    any
}
