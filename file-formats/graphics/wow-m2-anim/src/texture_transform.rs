//! Animated texture coordinate transforms

use glam::{Quat, Vec3};

use crate::bone_transform::{compose_local, sample_channel};
use crate::instance::{AnimationData, DirtyMask};
use crate::skeleton::Skeleton;
use crate::state::AnimationState;

/// Texture space is rotated and scaled around its center
pub const TEXTURE_PIVOT: Vec3 = Vec3::splat(0.5);

/// Recompute texture transforms when the root bone's slot changed
///
/// Texture transforms follow the state driving bone 0. Returns whether any
/// matrix was written.
pub fn update_texture_transforms(
    skeleton: &Skeleton,
    data: &mut AnimationData,
    dirty: DirtyMask,
) -> bool {
    if !skeleton.has_texture_transforms() {
        return false;
    }

    let Some(root_slot) = data.state_index_for_bone(0) else {
        return false;
    };
    if !dirty.contains(root_slot as usize) {
        return false;
    }

    let idle = AnimationState::default();
    let state = data.states.get(root_slot as usize).unwrap_or(&idle);
    let loops = &data.global_loops;

    let targets = data.texture_transforms.iter_mut().zip(&skeleton.texture_transforms);

    let mut written = false;
    for (matrix, transform) in targets {
        let translation = sample_channel(&transform.translation, state, loops, Vec3::ZERO);
        let rotation = sample_channel(&transform.rotation, state, loops, Quat::IDENTITY);
        let scale = sample_channel(&transform.scale, state, loops, Vec3::ONE);
        *matrix = compose_local(TEXTURE_PIVOT, translation, rotation, scale);
        written = true;
    }
    written
}
