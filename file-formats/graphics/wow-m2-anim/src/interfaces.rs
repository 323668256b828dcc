//! Collaborators the simulation talks to
//!
//! The driver never owns skeletons, renderer buffers or the transform
//! hierarchy. It is handed implementations of these traits on every tick.

use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};

use crate::ids::{EntityId, InstanceId, ModelIdentity};
use crate::skeleton::Skeleton;

/// Lookup of loaded skeletons by model identity
///
/// Read concurrently from worker threads while a tick runs.
pub trait SkeletonProvider: Sync {
    /// Skeleton of a model, `None` while it is not loaded
    fn skeleton(&self, model_identity: ModelIdentity) -> Option<&Skeleton>;
}

impl SkeletonProvider for HashMap<ModelIdentity, Skeleton> {
    fn skeleton(&self, model_identity: ModelIdentity) -> Option<&Skeleton> {
        self.get(&model_identity)
    }
}

/// Where a block of matrices is written in the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationTarget {
    /// Matrices owned by one drawn instance
    Instance(InstanceId),
    /// Matrices shared by every static instance of a model
    Shared(ModelIdentity),
}

/// Matrix ranges reserved for a shared animation record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedSlot {
    pub bone_offset: u32,
    pub texture_offset: u32,
}

/// Renderer side of the simulation; only called from the joining thread
pub trait RenderSink {
    /// Upload `matrices` into the bone range starting at `offset`
    fn mark_bone_matrices_dirty(&mut self, target: AnimationTarget, offset: u32, matrices: &[Mat4]);

    /// Upload `matrices` into the texture transform range starting at `offset`
    fn mark_texture_transforms_dirty(
        &mut self,
        target: AnimationTarget,
        offset: u32,
        matrices: &[Mat4],
    );

    /// Reserve matrix ranges shared by every static instance of a model
    fn allocate_shared_animation_slot(&mut self, model_identity: ModelIdentity)
    -> Option<SharedSlot>;

    /// Point a drawn instance at a shared matrix range
    fn bind_instance_to_shared_slot(&mut self, instance: InstanceId, slot: SharedSlot);
}

/// Transform hierarchy owning attachment proxy entities
pub trait TransformSink {
    /// Create an entity parented under `parent`
    fn create_attachment_proxy(&mut self, parent: EntityId) -> Option<EntityId>;

    fn destroy_entity(&mut self, entity: EntityId);

    /// Set the transform of an entity relative to its parent
    fn set_local_transform(
        &mut self,
        entity: EntityId,
        position: Vec3,
        rotation: Quat,
        scale: Vec3,
    );
}
