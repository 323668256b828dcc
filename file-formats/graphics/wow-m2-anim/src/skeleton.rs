//! Read-only skeleton descriptor
//!
//! A [`Skeleton`] is built once per model from already-parsed model data and
//! shared by every entity showing that model. It is never mutated while a
//! simulation tick is running.

use std::collections::HashMap;

use glam::{Quat, Vec3};
use log::debug;

use crate::error::{AnimError, Result};
use crate::flags::{BoneFlags, SequenceFlags};
use crate::ids::{AnimationId, AttachmentType, KeyBone};
use crate::types::{Channel, Track};

/// Bone with its hierarchy link and keyframe channels
#[derive(Debug, Clone, Default)]
pub struct Bone {
    /// Parent bone index, always lower than this bone's index
    pub parent: Option<u16>,
    /// Pivot point
    pub pivot: Vec3,
    /// Bone flags
    pub flags: BoneFlags,
    /// Translation animation channel
    pub translation: Channel<Vec3>,
    /// Rotation animation channel (quaternion)
    pub rotation: Channel<Quat>,
    /// Scale animation channel
    pub scale: Channel<Vec3>,
}

impl Bone {
    /// Bone without animation
    pub fn new(parent: Option<u16>, pivot: Vec3) -> Self {
        Self {
            parent,
            pivot,
            ..Default::default()
        }
    }

    /// Set the translation channel and mark the bone as transformed
    pub fn with_translation(mut self, channel: Channel<Vec3>) -> Self {
        self.translation = channel;
        self.flags |= BoneFlags::TRANSFORMED;
        self
    }

    /// Set the rotation channel and mark the bone as transformed
    pub fn with_rotation(mut self, channel: Channel<Quat>) -> Self {
        self.rotation = channel;
        self.flags |= BoneFlags::TRANSFORMED;
        self
    }

    /// Set the scale channel and mark the bone as transformed
    pub fn with_scale(mut self, channel: Channel<Vec3>) -> Self {
        self.scale = channel;
        self.flags |= BoneFlags::TRANSFORMED;
        self
    }

    pub fn is_transformed(&self) -> bool {
        self.flags.is_transformed()
    }

    /// Check if any channel is driven by a global loop
    pub fn uses_global_loop(&self) -> bool {
        self.translation.uses_global_loop()
            || self.rotation.uses_global_loop()
            || self.scale.uses_global_loop()
    }
}

/// Animation sequence (one clip of one animation type)
#[derive(Debug, Clone)]
pub struct Sequence {
    /// Animation ID (e.g., 0=Stand, 4=Walk, 5=Run)
    pub animation_id: AnimationId,
    /// Sub-animation ID for variations
    pub variation_id: u16,
    /// Duration in milliseconds
    pub duration_ms: u32,
    /// Flags
    pub flags: SequenceFlags,
    /// Blend-in time for transitions (milliseconds)
    pub blend_time_ms: u32,
    /// Probability weight for variation selection
    pub frequency: u16,
    /// Minimum repeat count
    pub min_repetitions: u32,
    /// Maximum repeat count
    pub max_repetitions: u32,
    /// Index of next variation
    pub next_variation: Option<u16>,
    /// Index of the aliased sequence
    pub alias_next: u16,
}

impl Sequence {
    /// Sequence with a single variation that always plays once
    pub fn new(animation_id: AnimationId, duration_ms: u32) -> Self {
        Self {
            animation_id,
            variation_id: 0,
            duration_ms,
            flags: SequenceFlags::empty(),
            blend_time_ms: 0,
            frequency: 0x7fff,
            min_repetitions: 0,
            max_repetitions: 0,
            next_variation: None,
            alias_next: 0,
        }
    }

    pub fn with_blend_time(mut self, blend_time_ms: u32) -> Self {
        self.blend_time_ms = blend_time_ms;
        self
    }

    pub fn with_flags(mut self, flags: SequenceFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_frequency(mut self, frequency: u16) -> Self {
        self.frequency = frequency;
        self
    }

    pub fn with_repetitions(mut self, min: u32, max: u32) -> Self {
        self.min_repetitions = min;
        self.max_repetitions = max;
        self
    }

    /// Duration in seconds
    pub fn duration(&self) -> f32 {
        self.duration_ms as f32 / 1000.0
    }

    /// Blend-in time in seconds
    pub fn blend_time(&self) -> f32 {
        self.blend_time_ms as f32 / 1000.0
    }
}

/// Animated UV transform
#[derive(Debug, Clone, Default)]
pub struct TextureTransform {
    pub translation: Channel<Vec3>,
    pub rotation: Channel<Quat>,
    pub scale: Channel<Vec3>,
}

/// Attachment point declared by the model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attachment {
    /// Bone to attach to
    pub bone: u16,
    /// Position relative to the bone
    pub position: Vec3,
}

/// Parsed, validated skeleton of one model
#[derive(Debug, Clone, Default)]
pub struct Skeleton {
    /// Bones, parents stored before children
    pub bones: Vec<Bone>,
    /// Animation sequences
    pub sequences: Vec<Sequence>,
    /// First sequence index per animation id, may be longer than the
    /// sequence table suggests
    pub animation_lookup: Vec<Option<u16>>,
    /// Bone index per key bone
    pub key_bones: HashMap<KeyBone, u16>,
    /// Child bone indices per bone
    pub children: Vec<Vec<u16>>,
    /// Global loop durations in milliseconds
    pub global_loops: Vec<u32>,
    /// Texture transforms
    pub texture_transforms: Vec<TextureTransform>,
    /// Attachment points
    pub attachments: Vec<Attachment>,
    /// Attachment index per attachment type
    pub attachment_lookup: HashMap<AttachmentType, u16>,
}

impl Skeleton {
    /// Get number of bones
    pub fn bone_count(&self) -> usize {
        self.bones.len()
    }

    /// Get number of sequences
    pub fn sequence_count(&self) -> usize {
        self.sequences.len()
    }

    pub fn sequence(&self, index: u16) -> Option<&Sequence> {
        self.sequences.get(index as usize)
    }

    /// First sequence index for an animation id, bounds checked against the
    /// sequence table
    pub fn first_sequence(&self, animation_id: AnimationId) -> Option<u16> {
        self.animation_lookup
            .get(animation_id as usize)
            .copied()
            .flatten()
            .filter(|&index| (index as usize) < self.sequences.len())
    }

    /// Bone index of a key bone; `KeyBone::Default` maps to the root bone
    pub fn key_bone(&self, key_bone: KeyBone) -> Option<u16> {
        match self.key_bones.get(&key_bone) {
            Some(&bone) if (bone as usize) < self.bones.len() => Some(bone),
            Some(_) => None,
            None if key_bone == KeyBone::Default && !self.bones.is_empty() => Some(0),
            None => None,
        }
    }

    /// Attachment declared for a semantic attachment type
    pub fn attachment(&self, attachment_type: AttachmentType) -> Option<&Attachment> {
        self.attachment_lookup
            .get(&attachment_type)
            .and_then(|&index| self.attachments.get(index as usize))
    }

    pub fn has_texture_transforms(&self) -> bool {
        !self.texture_transforms.is_empty()
    }

    /// Check the structural invariants the simulation relies on
    ///
    /// Every parent index must be strictly lower than its child's index so a
    /// single forward pass visits parents first. Variation and alias links
    /// must stay inside the sequence table, global-loop bindings inside the
    /// loop table, and keyframe timestamps must be ascending.
    pub fn validate(&self) -> Result<()> {
        for (index, bone) in self.bones.iter().enumerate() {
            if let Some(parent) = bone.parent
                && parent as usize >= index
            {
                return Err(AnimError::InvalidHierarchy {
                    bone: index,
                    parent: parent as usize,
                });
            }

            let owner = format!("bone {index}");
            self.validate_channel(&owner, &bone.translation)?;
            self.validate_channel(&owner, &bone.rotation)?;
            self.validate_channel(&owner, &bone.scale)?;
        }

        for (index, sequence) in self.sequences.iter().enumerate() {
            if let Some(next) = sequence.next_variation
                && next as usize >= self.sequences.len()
            {
                return Err(AnimError::InvalidSequenceReference {
                    sequence: index,
                    target: next as usize,
                });
            }

            if sequence.flags.is_alias() && sequence.alias_next as usize >= self.sequences.len()
            {
                return Err(AnimError::InvalidSequenceReference {
                    sequence: index,
                    target: sequence.alias_next as usize,
                });
            }
        }

        for (index, transform) in self.texture_transforms.iter().enumerate() {
            let owner = format!("texture transform {index}");
            self.validate_channel(&owner, &transform.translation)?;
            self.validate_channel(&owner, &transform.rotation)?;
            self.validate_channel(&owner, &transform.scale)?;
        }

        for (key_bone, &bone) in &self.key_bones {
            if bone as usize >= self.bones.len() {
                return Err(AnimError::ReferenceError(format!(
                    "key bone {key_bone:?} points at bone {bone}, skeleton has {}",
                    self.bones.len()
                )));
            }
        }

        for (attachment_type, &index) in &self.attachment_lookup {
            if index as usize >= self.attachments.len() {
                return Err(AnimError::ReferenceError(format!(
                    "attachment {attachment_type:?} points at attachment {index}, skeleton has {}",
                    self.attachments.len()
                )));
            }
        }

        Ok(())
    }

    fn validate_channel<T>(&self, owner: &str, channel: &Channel<T>) -> Result<()> {
        if let Some(global_loop) = channel.global_loop
            && global_loop as usize >= self.global_loops.len()
        {
            return Err(AnimError::InvalidGlobalLoop {
                owner: owner.to_string(),
                index: global_loop as usize,
                count: self.global_loops.len(),
            });
        }

        for (sequence, track) in channel.tracks.iter().enumerate() {
            validate_track(owner, sequence, track)?;
        }

        Ok(())
    }
}

fn validate_track<T>(owner: &str, sequence: usize, track: &Track<T>) -> Result<()> {
    if track.timestamps.len() != track.values.len() {
        return Err(AnimError::InvalidTrack(format!(
            "{owner}, sequence {sequence}: {} timestamps but {} values",
            track.timestamps.len(),
            track.values.len()
        )));
    }

    if track.timestamps.windows(2).any(|pair| pair[1] < pair[0]) {
        return Err(AnimError::InvalidTrack(format!(
            "{owner}, sequence {sequence}: timestamps are not ascending"
        )));
    }

    Ok(())
}

/// Builder assembling a [`Skeleton`] and its lookup tables
///
/// Sequences added for the same animation id are chained as variations in
/// insertion order; the first one becomes the lookup entry.
#[derive(Debug, Default)]
pub struct SkeletonBuilder {
    skeleton: Skeleton,
    last_variation: HashMap<AnimationId, u16>,
}

impl SkeletonBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bone and return its index
    pub fn add_bone(&mut self, bone: Bone) -> u16 {
        self.skeleton.bones.push(bone);
        (self.skeleton.bones.len() - 1) as u16
    }

    pub fn with_bone(mut self, bone: Bone) -> Self {
        self.add_bone(bone);
        self
    }

    /// Append a sequence and return its index
    pub fn add_sequence(&mut self, mut sequence: Sequence) -> u16 {
        let index = self.skeleton.sequences.len() as u16;
        let animation_id = sequence.animation_id;

        match self.last_variation.get(&animation_id) {
            Some(&previous) => {
                let previous_sequence = &mut self.skeleton.sequences[previous as usize];
                sequence.variation_id = previous_sequence.variation_id + 1;
                previous_sequence.next_variation = Some(index);
            }
            None => {
                let slot = animation_id as usize;
                if self.skeleton.animation_lookup.len() <= slot {
                    self.skeleton.animation_lookup.resize(slot + 1, None);
                }
                self.skeleton.animation_lookup[slot] = Some(index);
            }
        }

        self.last_variation.insert(animation_id, index);
        self.skeleton.sequences.push(sequence);
        index
    }

    pub fn with_sequence(mut self, sequence: Sequence) -> Self {
        self.add_sequence(sequence);
        self
    }

    /// Append a global loop (duration in milliseconds)
    pub fn with_global_loop(mut self, duration_ms: u32) -> Self {
        self.skeleton.global_loops.push(duration_ms);
        self
    }

    pub fn with_texture_transform(mut self, transform: TextureTransform) -> Self {
        self.skeleton.texture_transforms.push(transform);
        self
    }

    pub fn with_key_bone(mut self, key_bone: KeyBone, bone: u16) -> Self {
        self.skeleton.key_bones.insert(key_bone, bone);
        self
    }

    pub fn with_attachment(
        mut self,
        attachment_type: AttachmentType,
        attachment: Attachment,
    ) -> Self {
        let index = self.skeleton.attachments.len() as u16;
        self.skeleton.attachments.push(attachment);
        self.skeleton.attachment_lookup.insert(attachment_type, index);
        self
    }

    /// Validate and finish the skeleton, deriving the children table
    pub fn build(self) -> Result<Skeleton> {
        let mut skeleton = self.skeleton;
        skeleton.validate()?;

        skeleton.children = vec![Vec::new(); skeleton.bones.len()];
        for (index, bone) in skeleton.bones.iter().enumerate() {
            if let Some(parent) = bone.parent {
                skeleton.children[parent as usize].push(index as u16);
            }
        }

        debug!(
            "Built skeleton: {} bones, {} sequences, {} global loops, {} texture transforms, \
             {} attachments",
            skeleton.bones.len(),
            skeleton.sequences.len(),
            skeleton.global_loops.len(),
            skeleton.texture_transforms.len(),
            skeleton.attachments.len()
        );

        Ok(skeleton)
    }
}
