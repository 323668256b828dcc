//! Skeletal animation simulation for M2 models
//!
//! This crate advances the animation of many entities per frame:
//! - Animation state slots (looping, weighted variations, blended transitions)
//! - Keyframe interpolation (linear for vectors, spherical for rotations)
//! - Global sequence clocks
//! - Bone hierarchy and texture transform composition
//! - Attachment points
//! - A driver that partitions entities across a rayon thread pool
//!
//! # Example
//!
//! ```rust,ignore
//! use wow_m2_anim::{
//!     AnimatedEntity, AnimationRequest, AnimationSystem, SimulationConfig, animation_id,
//! };
//!
//! let mut system = AnimationSystem::new(SimulationConfig::default())?;
//! let mut entities = vec![AnimatedEntity::new(entity, model, instance)];
//!
//! // First tick builds the animation data, later ticks advance it
//! let report = system.tick(delta, &mut entities, &skeletons, &mut renderer, &mut transforms);
//!
//! if let Some(data) = entities[0].current_animation_mut() {
//!     let request = AnimationRequest::new(animation_id::RUN);
//!     wow_m2_anim::play_animation(skeleton, data, &metadata, request);
//! }
//! ```

pub mod attachment;
pub mod bone_transform;
pub mod clock;
pub mod config;
pub mod error;
pub mod flags;
pub mod ids;
pub mod instance;
pub mod interfaces;
pub mod interpolation;
pub mod playback;
pub mod selector;
pub mod skeleton;
pub mod state;
pub mod system;
pub mod texture_transform;
pub mod types;

// Re-export common types
pub use attachment::{AttachmentData, AttachmentInstance, LocalTransform, resolve_attachment_matrix};
pub use bone_transform::{compose_bone_matrix, update_bone_matrices};
pub use clock::GlobalLoop;
pub use config::SimulationConfig;
pub use error::{AnimError, Result};
pub use flags::{AnimationFlags, BoneFlags, SequenceFlags};
pub use ids::{
    AnimationCallback, AnimationId, AttachmentType, EntityId, InstanceId, KeyBone, ModelIdentity,
    animation_id,
};
pub use instance::{AnimationData, BoneInstance, DirtyMask, MAX_STATE_SLOTS};
pub use interfaces::{AnimationTarget, RenderSink, SharedSlot, SkeletonProvider, TransformSink};
pub use playback::{
    AnimationRequest, clear_procedural_rotation, has_animation, is_playing, play_animation,
    set_paused, set_procedural_rotation, state_for_key_bone, stop,
};
pub use selector::{AnimationMetadata, AnimationMetadataProvider, NoMetadata, ResolvedSequence};
pub use skeleton::{Attachment, Bone, Sequence, Skeleton, SkeletonBuilder, TextureTransform};
pub use state::{AnimationState, SlotUpdate};
pub use system::{
    AnimatedEntity, AnimationOwner, AnimationSystem, FinishedAnimation, SharedAnimation, TickReport,
};
pub use types::{Channel, Interpolate, Track};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
