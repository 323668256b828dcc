//! Per-entity animation data

use glam::{Mat4, Quat};
use log::{debug, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::clock::{self, GlobalLoop};
use crate::error::{AnimError, Result};
use crate::flags::AnimationFlags;
use crate::ids::{AnimationCallback, AnimationId, ModelIdentity, animation_id};
use crate::selector;
use crate::skeleton::Skeleton;
use crate::state::AnimationState;

/// Hard limit on state slots per instance, one bit each in [`DirtyMask`]
pub const MAX_STATE_SLOTS: usize = 64;

/// Set of state slots touched during a tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DirtyMask(pub u64);

impl DirtyMask {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u64::MAX);

    pub fn set(&mut self, slot: usize) {
        debug_assert!(slot < MAX_STATE_SLOTS);
        self.0 |= 1 << slot;
    }

    pub fn contains(self, slot: usize) -> bool {
        slot < MAX_STATE_SLOTS && self.0 & (1 << slot) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Runtime link of a skeleton bone to its state slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoneInstance {
    /// State slot driving this bone
    pub state_index: Option<u16>,
    /// Entry in the procedural rotation table
    pub procedural_rotation_index: Option<u16>,
}

/// Mutable animation record of one entity (or one shared model)
#[derive(Debug, Clone)]
pub struct AnimationData {
    /// Model the record was built for; a mismatch marks it stale
    pub model_identity: ModelIdentity,
    /// Live global loop clocks
    pub global_loops: Vec<GlobalLoop>,
    /// One entry per skeleton bone
    pub bone_instances: Vec<BoneInstance>,
    /// State slots, slot 0 drives every bone without a slot of its own
    pub states: Vec<AnimationState>,
    /// Model-space bone matrices
    pub bone_transforms: Vec<Mat4>,
    /// Texture transform matrices
    pub texture_transforms: Vec<Mat4>,
    /// Rotations applied on top of authored rotation
    pub procedural_rotation_offsets: Vec<Quat>,
    /// Slots changed outside the tick (new requests) that must be
    /// re-evaluated next tick
    pub pending_dirty: DirtyMask,
    /// Slot limit for this record
    pub max_state_slots: usize,
    /// Per-bone scratch reused by every matrix update
    pub(crate) recomputed: Vec<bool>,
    rng: StdRng,
}

impl AnimationData {
    /// Build the record for `skeleton`, with slot 0 playing Stand
    pub fn new(skeleton: &Skeleton, model_identity: ModelIdentity, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let mut root = AnimationState::default();
        let mut times_to_repeat = 0;
        match selector::select_variation(
            skeleton,
            animation_id::STAND,
            &mut rng,
            &mut times_to_repeat,
        ) {
            Some(sequence) => {
                root.start(skeleton, animation_id::STAND, sequence, AnimationFlags::empty());
                root.times_to_repeat = times_to_repeat;
            }
            None => debug!("Model {model_identity:?} has no Stand sequence, root slot starts idle"),
        }

        let bone_instances = skeleton
            .bones
            .iter()
            .map(|_| BoneInstance {
                state_index: Some(0),
                procedural_rotation_index: None,
            })
            .collect();

        let mut pending_dirty = DirtyMask::NONE;
        pending_dirty.set(0);

        Self {
            model_identity,
            global_loops: skeleton
                .global_loops
                .iter()
                .map(|&duration| GlobalLoop::from_millis(duration))
                .collect(),
            bone_instances,
            states: vec![root],
            bone_transforms: vec![Mat4::IDENTITY; skeleton.bone_count()],
            texture_transforms: vec![Mat4::IDENTITY; skeleton.texture_transforms.len()],
            procedural_rotation_offsets: Vec::new(),
            pending_dirty,
            max_state_slots: MAX_STATE_SLOTS,
            recomputed: Vec::with_capacity(skeleton.bone_count()),
            rng,
        }
    }

    /// Lower the slot limit, capped at [`MAX_STATE_SLOTS`]
    pub fn with_max_state_slots(mut self, max_state_slots: usize) -> Self {
        self.max_state_slots = max_state_slots.clamp(1, MAX_STATE_SLOTS);
        self
    }

    /// Whether the record still belongs to the entity's current model
    pub fn is_current(&self, model_identity: ModelIdentity) -> bool {
        self.model_identity == model_identity
    }

    /// Slot driving `bone`
    pub fn state_index_for_bone(&self, bone: u16) -> Option<u16> {
        self.bone_instances
            .get(bone as usize)
            .and_then(|instance| instance.state_index)
            .filter(|&slot| (slot as usize) < self.states.len())
    }

    /// Claim a slot for a new bone group
    ///
    /// An idle slot that no bone refers to any more is handed out again
    /// before a fresh one is appended.
    pub fn allocate_state(&mut self) -> Result<u16> {
        let released = (1..self.states.len()).find(|&slot| {
            self.states[slot].is_idle()
                && !self
                    .bone_instances
                    .iter()
                    .any(|instance| instance.state_index == Some(slot as u16))
        });
        if let Some(slot) = released {
            return Ok(slot as u16);
        }

        if self.states.len() >= self.max_state_slots {
            warn!(
                "Model {:?} ran out of animation state slots ({})",
                self.model_identity, self.max_state_slots
            );
            return Err(AnimError::StateSlotsExhausted {
                limit: self.max_state_slots,
            });
        }

        self.states.push(AnimationState::default());
        Ok((self.states.len() - 1) as u16)
    }

    /// Draw a weighted variation of `animation_id` with this record's
    /// generator, returning the sequence and its extra plays
    pub fn select_variation(
        &mut self,
        skeleton: &Skeleton,
        animation_id: AnimationId,
    ) -> Option<(u16, i32)> {
        let mut times_to_repeat = 0;
        let sequence = selector::select_variation(
            skeleton,
            animation_id,
            &mut self.rng,
            &mut times_to_repeat,
        )?;
        Some((sequence, times_to_repeat))
    }

    /// Mark a slot for re-evaluation on the next tick
    pub fn mark_dirty(&mut self, slot: u16) {
        if (slot as usize) < MAX_STATE_SLOTS {
            self.pending_dirty.set(slot as usize);
        }
    }

    /// Advance clocks and every occupied slot by `dt` seconds
    ///
    /// Returns the dirty slots, whether any global loop moved, and the
    /// callbacks released by sequence swaps as `(slot, callback)`.
    pub fn advance(&mut self, skeleton: &Skeleton, dt: f32) -> AdvanceResult {
        let loops_advanced = clock::advance_all(&mut self.global_loops, dt);

        let mut dirty = std::mem::take(&mut self.pending_dirty);
        let mut finished = Vec::new();

        for (slot, state) in self.states.iter_mut().enumerate() {
            let update = state.update(skeleton, dt, &mut self.rng);
            if update.dirty {
                dirty.set(slot);
            }
            if let Some(callback) = update.completed {
                finished.push((slot as u16, callback));
            }
        }

        AdvanceResult {
            dirty,
            loops_advanced,
            finished,
        }
    }
}

/// Outcome of [`AnimationData::advance`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdvanceResult {
    pub dirty: DirtyMask,
    pub loops_advanced: bool,
    pub finished: Vec<(u16, AnimationCallback)>,
}

impl AdvanceResult {
    /// Check if any bone may need re-evaluation
    pub fn needs_update(&self) -> bool {
        !self.dirty.is_empty() || self.loops_advanced
    }
}
