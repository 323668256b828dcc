//! Shared fixtures for the integration tests

mod composition;
mod driver;
mod state_machine;

use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};
use wow_m2_anim::{
    AnimationTarget, Bone, Channel, EntityId, InstanceId, ModelIdentity, RenderSink, Sequence,
    SharedSlot, Skeleton, SkeletonBuilder, Track, TransformSink, animation_id,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Renderer that records every call
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub bone_calls: Vec<(AnimationTarget, u32, Vec<Mat4>)>,
    pub texture_calls: Vec<(AnimationTarget, u32, usize)>,
    pub bound: Vec<(InstanceId, SharedSlot)>,
}

impl RenderSink for RecordingRenderer {
    fn mark_bone_matrices_dirty(
        &mut self,
        target: AnimationTarget,
        offset: u32,
        matrices: &[Mat4],
    ) {
        self.bone_calls.push((target, offset, matrices.to_vec()));
    }

    fn mark_texture_transforms_dirty(
        &mut self,
        target: AnimationTarget,
        offset: u32,
        matrices: &[Mat4],
    ) {
        self.texture_calls.push((target, offset, matrices.len()));
    }

    fn allocate_shared_animation_slot(&mut self, _model: ModelIdentity) -> Option<SharedSlot> {
        Some(SharedSlot {
            bone_offset: 0,
            texture_offset: 0,
        })
    }

    fn bind_instance_to_shared_slot(&mut self, instance: InstanceId, slot: SharedSlot) {
        self.bound.push((instance, slot));
    }
}

/// Transform hierarchy that hands out proxy ids and records transforms
#[derive(Debug, Default)]
pub struct RecordingTransforms {
    pub created: Vec<(EntityId, EntityId)>,
    pub destroyed: Vec<EntityId>,
    pub transforms: HashMap<EntityId, (Vec3, Quat, Vec3)>,
}

impl TransformSink for RecordingTransforms {
    fn create_attachment_proxy(&mut self, parent: EntityId) -> Option<EntityId> {
        let proxy = EntityId(10_000 + self.created.len() as u32);
        self.created.push((parent, proxy));
        Some(proxy)
    }

    fn destroy_entity(&mut self, entity: EntityId) {
        self.destroyed.push(entity);
        self.transforms.remove(&entity);
    }

    fn set_local_transform(
        &mut self,
        entity: EntityId,
        position: Vec3,
        rotation: Quat,
        scale: Vec3,
    ) {
        self.transforms.insert(entity, (position, rotation, scale));
    }
}

/// Root, child and grandchild with a single two-second Stand sequence
pub fn three_bone_skeleton() -> Skeleton {
    SkeletonBuilder::new()
        .with_bone(Bone::new(None, Vec3::ZERO))
        .with_bone(Bone::new(Some(0), Vec3::ZERO))
        .with_bone(Bone::new(Some(1), Vec3::ZERO))
        .with_sequence(Sequence::new(animation_id::STAND, 2000))
        .build()
        .expect("valid skeleton")
}

/// Root translating along X over one second of Stand, child offset by Y
pub fn walking_skeleton() -> Skeleton {
    let root = Bone::new(None, Vec3::ZERO).with_translation(Channel::per_sequence(vec![
        Track::new(vec![0.0, 1.0], vec![Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0)]),
        Track::constant(Vec3::new(0.0, 0.0, 5.0)),
    ]));
    let child = Bone::new(Some(0), Vec3::ZERO).with_translation(Channel::per_sequence(vec![
        Track::constant(Vec3::new(0.0, 1.0, 0.0)),
        Track::constant(Vec3::new(0.0, 1.0, 0.0)),
    ]));

    SkeletonBuilder::new()
        .with_bone(root)
        .with_bone(child)
        .with_sequence(Sequence::new(animation_id::STAND, 1000))
        .with_sequence(Sequence::new(animation_id::WALK, 1000))
        .build()
        .expect("valid skeleton")
}

pub fn skeletons(entries: Vec<(u32, Skeleton)>) -> HashMap<ModelIdentity, Skeleton> {
    entries
        .into_iter()
        .map(|(id, skeleton)| (ModelIdentity(id), skeleton))
        .collect()
}
