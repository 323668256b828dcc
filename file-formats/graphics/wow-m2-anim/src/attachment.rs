//! Attachment points (weapons, name tags, effects)
//!
//! An enabled attachment owns a proxy entity in the external transform
//! hierarchy. Every tick its bone's matrix is combined with the static
//! attachment offset and pushed to that proxy as a local transform.

use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};
use log::{debug, trace};

use crate::ids::{AttachmentType, EntityId};
use crate::instance::AnimationData;
use crate::interfaces::TransformSink;
use crate::skeleton::Skeleton;

/// Determinants below this are treated as non-invertible
const MIN_DETERMINANT: f32 = 1e-8;

/// Decomposed transform handed to the transform hierarchy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalTransform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl LocalTransform {
    /// Split a matrix into position, rotation and scale
    ///
    /// Returns `None` for matrices that contain non-finite values or
    /// collapse space (zero scale on some axis).
    pub fn from_matrix(matrix: &Mat4) -> Option<Self> {
        if !matrix.is_finite() || matrix.determinant().abs() < MIN_DETERMINANT {
            return None;
        }

        let (scale, rotation, position) = matrix.to_scale_rotation_translation();
        if !(scale.is_finite() && rotation.is_finite() && position.is_finite()) {
            return None;
        }

        Some(Self {
            position,
            rotation,
            scale,
        })
    }
}

/// One enabled attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttachmentInstance {
    /// Proxy entity parented under the owner
    pub entity: EntityId,
    /// Last model-space matrix pushed to the proxy
    pub matrix: Mat4,
}

/// Attachments enabled on one entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttachmentData {
    pub attachments: HashMap<AttachmentType, AttachmentInstance>,
}

impl AttachmentData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self, attachment_type: AttachmentType) -> bool {
        self.attachments.contains_key(&attachment_type)
    }

    /// Proxy entity of an enabled attachment
    pub fn proxy(&self, attachment_type: AttachmentType) -> Option<EntityId> {
        self.attachments
            .get(&attachment_type)
            .map(|instance| instance.entity)
    }

    /// Enable an attachment, creating its proxy entity
    ///
    /// Succeeds immediately when the attachment is already enabled. Fails
    /// when the skeleton does not declare the attachment type or the
    /// transform hierarchy refuses to create the proxy.
    pub fn enable_attachment<T>(
        &mut self,
        owner: EntityId,
        skeleton: &Skeleton,
        attachment_type: AttachmentType,
        transforms: &mut T,
    ) -> bool
    where
        T: TransformSink + ?Sized,
    {
        if self.is_enabled(attachment_type) {
            return true;
        }

        if skeleton.attachment(attachment_type).is_none() {
            debug!("Entity {owner:?}: skeleton has no {attachment_type:?} attachment");
            return false;
        }

        let Some(entity) = transforms.create_attachment_proxy(owner) else {
            debug!("Entity {owner:?}: could not create proxy for {attachment_type:?}");
            return false;
        };

        self.attachments.insert(
            attachment_type,
            AttachmentInstance {
                entity,
                matrix: Mat4::IDENTITY,
            },
        );
        true
    }

    /// Remove an attachment and destroy its proxy entity
    pub fn disable_attachment<T>(
        &mut self,
        attachment_type: AttachmentType,
        transforms: &mut T,
    ) -> bool
    where
        T: TransformSink + ?Sized,
    {
        match self.attachments.remove(&attachment_type) {
            Some(instance) => {
                transforms.destroy_entity(instance.entity);
                true
            }
            None => false,
        }
    }

    /// Destroy every proxy, used when the owner goes away
    pub fn clear<T>(&mut self, transforms: &mut T)
    where
        T: TransformSink + ?Sized,
    {
        for (_, instance) in self.attachments.drain() {
            transforms.destroy_entity(instance.entity);
        }
    }
}

/// Model-space matrix of an attachment point
///
/// Falls back to bone 0 when the attachment targets a bone the skeleton
/// does not have. Returns `None` when the skeleton lacks the attachment
/// type.
pub fn resolve_attachment_matrix(
    skeleton: &Skeleton,
    data: &AnimationData,
    attachment_type: AttachmentType,
) -> Option<Mat4> {
    let attachment = skeleton.attachment(attachment_type)?;

    let bone = if (attachment.bone as usize) < skeleton.bone_count() {
        attachment.bone as usize
    } else {
        0
    };

    let bone_matrix = data
        .bone_transforms
        .get(bone)
        .copied()
        .unwrap_or(Mat4::IDENTITY);

    Some(bone_matrix * Mat4::from_translation(attachment.position))
}

/// Recompute every enabled attachment of an entity
///
/// Returns the proxy transforms to forward; attachments whose matrix
/// cannot be decomposed are skipped.
pub fn update_attachments(
    skeleton: &Skeleton,
    data: &AnimationData,
    attachments: &mut AttachmentData,
) -> Vec<(EntityId, LocalTransform)> {
    let mut updates = Vec::with_capacity(attachments.attachments.len());

    for (&attachment_type, instance) in attachments.attachments.iter_mut() {
        let Some(matrix) = resolve_attachment_matrix(skeleton, data, attachment_type) else {
            continue;
        };
        instance.matrix = matrix;

        match LocalTransform::from_matrix(&matrix) {
            Some(transform) => updates.push((instance.entity, transform)),
            None => trace!("Skipping {attachment_type:?}: matrix cannot be decomposed"),
        }
    }

    updates
}
