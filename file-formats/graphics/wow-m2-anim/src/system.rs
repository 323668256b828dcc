//! Per-tick animation driver
//!
//! A tick runs in three phases:
//!
//! 1. Initialization of entities carrying a pending init marker (single
//!    threaded, may talk to the renderer to set up shared records).
//! 2. Simulation of every entity, split into contiguous partitions that run
//!    on the rayon pool. Each partition only touches its own entities and
//!    returns what it wants forwarded.
//! 3. Drain of the collected partition output into the renderer and
//!    transform collaborators on the calling thread.

use std::collections::HashMap;

use log::{debug, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::attachment::{self, AttachmentData, LocalTransform};
use crate::bone_transform::update_bone_matrices;
use crate::config::SimulationConfig;
use crate::error::Result;
#[cfg(feature = "parallel")]
use crate::error::AnimError;
use crate::ids::{AnimationCallback, AttachmentType, EntityId, InstanceId, ModelIdentity};
use crate::instance::AnimationData;
use crate::interfaces::{AnimationTarget, RenderSink, SharedSlot, SkeletonProvider, TransformSink};
use crate::skeleton::Skeleton;
use crate::texture_transform::update_texture_transforms;

/// Entity as seen by the animation system
#[derive(Debug, Clone)]
pub struct AnimatedEntity {
    pub entity: EntityId,
    /// Model currently shown by the entity
    pub model_identity: ModelIdentity,
    /// Renderer instance drawing the entity
    pub instance_id: InstanceId,
    /// Shares one animation record with every static instance of its model
    pub is_static: bool,
    /// Pending init marker, consumed by the next tick
    pub needs_init: bool,
    /// Own animation record (never set for static entities)
    pub animation: Option<AnimationData>,
    /// Enabled attachments
    pub attachments: Option<AttachmentData>,
}

impl AnimatedEntity {
    /// Entity with its own animation record, initialized on the next tick
    pub fn new(entity: EntityId, model_identity: ModelIdentity, instance_id: InstanceId) -> Self {
        Self {
            entity,
            model_identity,
            instance_id,
            is_static: false,
            needs_init: true,
            animation: None,
            attachments: None,
        }
    }

    /// Entity sharing its model's animation record
    pub fn shared(
        entity: EntityId,
        model_identity: ModelIdentity,
        instance_id: InstanceId,
    ) -> Self {
        Self {
            is_static: true,
            ..Self::new(entity, model_identity, instance_id)
        }
    }

    /// Switch to another model; the old record goes stale until re-init
    pub fn change_model(&mut self, model_identity: ModelIdentity) {
        self.model_identity = model_identity;
        self.needs_init = true;
    }

    /// Enable an attachment, creating the attachment data on first use
    pub fn enable_attachment<S, T>(
        &mut self,
        skeletons: &S,
        attachment_type: AttachmentType,
        transforms: &mut T,
    ) -> bool
    where
        S: SkeletonProvider + ?Sized,
        T: TransformSink + ?Sized,
    {
        let Some(skeleton) = skeletons.skeleton(self.model_identity) else {
            return false;
        };

        self.attachments
            .get_or_insert_with(AttachmentData::new)
            .enable_attachment(self.entity, skeleton, attachment_type, transforms)
    }

    pub fn disable_attachment<T>(
        &mut self,
        attachment_type: AttachmentType,
        transforms: &mut T,
    ) -> bool
    where
        T: TransformSink + ?Sized,
    {
        self.attachments
            .as_mut()
            .is_some_and(|attachments| attachments.disable_attachment(attachment_type, transforms))
    }

    /// Tear down attachment proxies before the entity is destroyed
    pub fn release<T>(&mut self, transforms: &mut T)
    where
        T: TransformSink + ?Sized,
    {
        if let Some(mut attachments) = self.attachments.take() {
            attachments.clear(transforms);
        }
        self.animation = None;
    }

    /// Own animation record, if it matches the current model
    pub fn current_animation(&self) -> Option<&AnimationData> {
        self.animation
            .as_ref()
            .filter(|data| data.is_current(self.model_identity))
    }

    pub fn current_animation_mut(&mut self) -> Option<&mut AnimationData> {
        let model_identity = self.model_identity;
        self.animation
            .as_mut()
            .filter(|data| data.is_current(model_identity))
    }
}

/// Animation record shared by static instances of one model
#[derive(Debug, Clone)]
pub struct SharedAnimation {
    pub data: AnimationData,
    pub slot: SharedSlot,
}

/// Who owned a finished sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationOwner {
    Entity(EntityId),
    Shared(ModelIdentity),
}

/// Callback released during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishedAnimation {
    pub owner: AnimationOwner,
    pub slot: u16,
    pub callback: AnimationCallback,
}

/// Summary of one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Records simulated (entities and shared records)
    pub animated: usize,
    /// Entities skipped for a missing skeleton or a stale record
    pub skipped: usize,
    /// Records whose matrices were forwarded to the renderer
    pub renderer_updates: usize,
    /// Callbacks released by sequence swaps
    pub finished: Vec<FinishedAnimation>,
}

/// What one entity asks to forward
#[derive(Debug, Clone, Copy, Default)]
struct EntityUpdate {
    index: usize,
    bones: bool,
    textures: bool,
}

/// Output of one partition, merged on the joining thread
#[derive(Debug, Default)]
struct PartitionOutput {
    animated: usize,
    skipped: usize,
    updates: Vec<EntityUpdate>,
    attachments: Vec<(EntityId, LocalTransform)>,
    finished: Vec<FinishedAnimation>,
}

impl PartitionOutput {
    fn merge(mut self, other: Self) -> Self {
        self.animated += other.animated;
        self.skipped += other.skipped;
        self.updates.extend(other.updates);
        self.attachments.extend(other.attachments);
        self.finished.extend(other.finished);
        self
    }
}

/// Result of simulating one record
#[derive(Debug, Default)]
struct RecordOutcome {
    bones: bool,
    textures: bool,
    finished: Vec<(u16, AnimationCallback)>,
}

/// Advance one record: clocks, slots, then the matrices they invalidated
fn simulate_record(skeleton: &Skeleton, data: &mut AnimationData, dt: f32) -> RecordOutcome {
    let advance = data.advance(skeleton, dt);
    if !advance.needs_update() {
        return RecordOutcome {
            finished: advance.finished,
            ..Default::default()
        };
    }

    let bones = update_bone_matrices(skeleton, data, advance.dirty, advance.loops_advanced);
    let textures = update_texture_transforms(skeleton, data, advance.dirty);

    RecordOutcome {
        bones,
        textures,
        finished: advance.finished,
    }
}

fn is_compatible(skeleton: &Skeleton, data: &AnimationData) -> bool {
    data.bone_transforms.len() == skeleton.bone_count()
        && data.bone_instances.len() == skeleton.bone_count()
        && data.texture_transforms.len() == skeleton.texture_transforms.len()
}

/// Simulate a contiguous range of entities starting at `offset`
fn simulate_partition<S>(
    offset: usize,
    entities: &mut [AnimatedEntity],
    skeletons: &S,
    dt: f32,
) -> PartitionOutput
where
    S: SkeletonProvider + ?Sized,
{
    let mut output = PartitionOutput::default();

    for (i, entity) in entities.iter_mut().enumerate() {
        if entity.is_static {
            continue;
        }
        let Some(data) = entity.animation.as_mut() else {
            continue;
        };

        if !data.is_current(entity.model_identity) {
            trace!("Entity {:?}: animation data is stale, skipping", entity.entity);
            output.skipped += 1;
            continue;
        }

        let Some(skeleton) = skeletons.skeleton(entity.model_identity) else {
            output.skipped += 1;
            continue;
        };

        if !is_compatible(skeleton, data) {
            debug!(
                "Entity {:?}: animation data does not fit skeleton of {:?}",
                entity.entity, entity.model_identity
            );
            output.skipped += 1;
            continue;
        }

        let outcome = simulate_record(skeleton, data, dt);
        output.animated += 1;

        output
            .finished
            .extend(outcome.finished.into_iter().map(|(slot, callback)| FinishedAnimation {
                owner: AnimationOwner::Entity(entity.entity),
                slot,
                callback,
            }));

        if outcome.bones || outcome.textures {
            output.updates.push(EntityUpdate {
                index: offset + i,
                bones: outcome.bones,
                textures: outcome.textures,
            });
        }

        if outcome.bones
            && let Some(attachments) = entity.attachments.as_mut()
        {
            output
                .attachments
                .extend(attachment::update_attachments(skeleton, data, attachments));
        }
    }

    output
}

/// Drives animation for a set of entities
#[derive(Debug)]
pub struct AnimationSystem {
    config: SimulationConfig,
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
    shared: HashMap<ModelIdentity, SharedAnimation>,
}

impl AnimationSystem {
    /// Create a system; a dedicated thread pool is built when
    /// `max_threads` is set
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;

        #[cfg(feature = "parallel")]
        let pool = if config.parallel && config.max_threads > 0 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.max_threads)
                .thread_name(|index| format!("anim-worker-{index}"))
                .build()
                .map_err(|e| AnimError::ConfigError(format!("Failed to build thread pool: {e}")))?;
            Some(pool)
        } else {
            None
        };

        debug!("Animation system created with {config:?}");

        Ok(Self {
            config,
            #[cfg(feature = "parallel")]
            pool,
            shared: HashMap::new(),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Shared record of a model's static instances
    pub fn shared_animation(&self, model_identity: ModelIdentity) -> Option<&AnimationData> {
        self.shared.get(&model_identity).map(|shared| &shared.data)
    }

    pub fn shared_animation_mut(
        &mut self,
        model_identity: ModelIdentity,
    ) -> Option<&mut AnimationData> {
        self.shared
            .get_mut(&model_identity)
            .map(|shared| &mut shared.data)
    }

    /// Forget the shared record of a model, e.g. after it was unloaded
    pub fn release_shared(&mut self, model_identity: ModelIdentity) -> bool {
        self.shared.remove(&model_identity).is_some()
    }

    /// Advance every entity by `dt` seconds
    pub fn tick<S, R, T>(
        &mut self,
        dt: f32,
        entities: &mut [AnimatedEntity],
        skeletons: &S,
        renderer: &mut R,
        transforms: &mut T,
    ) -> TickReport
    where
        S: SkeletonProvider + ?Sized,
        R: RenderSink + ?Sized,
        T: TransformSink + ?Sized,
    {
        let dt = (dt * self.config.time_scale).max(0.0);

        self.initialize_pending(entities, skeletons, renderer);

        let output = self.simulate_entities(entities, skeletons, dt);

        let mut report = TickReport {
            animated: output.animated,
            skipped: output.skipped,
            renderer_updates: 0,
            finished: output.finished,
        };

        for update in &output.updates {
            let entity = &entities[update.index];
            let Some(data) = entity.animation.as_ref() else {
                continue;
            };

            let target = AnimationTarget::Instance(entity.instance_id);
            if update.bones {
                renderer.mark_bone_matrices_dirty(target, 0, &data.bone_transforms);
            }
            if update.textures {
                renderer.mark_texture_transforms_dirty(target, 0, &data.texture_transforms);
            }
            report.renderer_updates += 1;
        }

        for (entity, transform) in &output.attachments {
            transforms.set_local_transform(
                *entity,
                transform.position,
                transform.rotation,
                transform.scale,
            );
        }

        self.simulate_shared(entities, skeletons, renderer, transforms, dt, &mut report);

        trace!(
            "Animation tick: dt={dt:.4} animated={} skipped={} renderer_updates={} finished={}",
            report.animated,
            report.skipped,
            report.renderer_updates,
            report.finished.len()
        );

        report
    }

    /// Consume init markers, building records for entities that need them
    fn initialize_pending<S, R>(
        &mut self,
        entities: &mut [AnimatedEntity],
        skeletons: &S,
        renderer: &mut R,
    ) where
        S: SkeletonProvider + ?Sized,
        R: RenderSink + ?Sized,
    {
        for entity in entities.iter_mut().filter(|entity| entity.needs_init) {
            entity.needs_init = false;

            let Some(skeleton) = skeletons.skeleton(entity.model_identity) else {
                debug!(
                    "Entity {:?}: skeleton of {:?} is not loaded, init dropped",
                    entity.entity, entity.model_identity
                );
                continue;
            };

            if !entity.is_static {
                let seed = self.config.rng_seed ^ u64::from(entity.entity.0);
                entity.animation = Some(
                    AnimationData::new(skeleton, entity.model_identity, seed)
                        .with_max_state_slots(self.config.max_state_slots),
                );
                continue;
            }

            entity.animation = None;
            let model_identity = entity.model_identity;

            if !self.shared.contains_key(&model_identity) {
                let Some(slot) = renderer.allocate_shared_animation_slot(model_identity) else {
                    debug!("Renderer refused a shared animation slot for {model_identity:?}");
                    continue;
                };

                let seed = self.config.rng_seed ^ u64::from(model_identity.0);
                let data = AnimationData::new(skeleton, model_identity, seed)
                    .with_max_state_slots(self.config.max_state_slots);
                self.shared
                    .insert(model_identity, SharedAnimation { data, slot });
            }

            if let Some(shared) = self.shared.get(&model_identity) {
                renderer.bind_instance_to_shared_slot(entity.instance_id, shared.slot);
            }
        }
    }

    #[cfg(feature = "parallel")]
    fn simulate_entities<S>(
        &self,
        entities: &mut [AnimatedEntity],
        skeletons: &S,
        dt: f32,
    ) -> PartitionOutput
    where
        S: SkeletonProvider + ?Sized,
    {
        if !self.config.parallel || entities.len() <= self.config.min_partition_size {
            return simulate_partition(0, entities, skeletons, dt);
        }

        let threads = self
            .pool
            .as_ref()
            .map_or_else(rayon::current_num_threads, |pool| pool.current_num_threads());
        let size = self.config.partition_size(entities.len(), threads);

        let mut run = move || {
            entities
                .par_chunks_mut(size)
                .enumerate()
                .map(|(chunk, partition)| {
                    simulate_partition(chunk * size, partition, skeletons, dt)
                })
                .reduce(PartitionOutput::default, PartitionOutput::merge)
        };

        match &self.pool {
            Some(pool) => pool.install(run),
            None => run(),
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn simulate_entities<S>(
        &self,
        entities: &mut [AnimatedEntity],
        skeletons: &S,
        dt: f32,
    ) -> PartitionOutput
    where
        S: SkeletonProvider + ?Sized,
    {
        simulate_partition(0, entities, skeletons, dt)
    }

    /// Simulate shared records and forward them with their shared offsets
    fn simulate_shared<S, R, T>(
        &mut self,
        entities: &mut [AnimatedEntity],
        skeletons: &S,
        renderer: &mut R,
        transforms: &mut T,
        dt: f32,
        report: &mut TickReport,
    ) where
        S: SkeletonProvider + ?Sized,
        R: RenderSink + ?Sized,
        T: TransformSink + ?Sized,
    {
        let mut moved = Vec::new();

        for (&model_identity, shared) in self.shared.iter_mut() {
            let Some(skeleton) = skeletons.skeleton(model_identity) else {
                continue;
            };
            if !is_compatible(skeleton, &shared.data) {
                continue;
            }

            let outcome = simulate_record(skeleton, &mut shared.data, dt);
            report.animated += 1;
            report
                .finished
                .extend(outcome.finished.into_iter().map(|(slot, callback)| FinishedAnimation {
                    owner: AnimationOwner::Shared(model_identity),
                    slot,
                    callback,
                }));

            let target = AnimationTarget::Shared(model_identity);
            if outcome.bones {
                renderer.mark_bone_matrices_dirty(
                    target,
                    shared.slot.bone_offset,
                    &shared.data.bone_transforms,
                );
                moved.push(model_identity);
            }
            if outcome.textures {
                renderer.mark_texture_transforms_dirty(
                    target,
                    shared.slot.texture_offset,
                    &shared.data.texture_transforms,
                );
            }
            if outcome.bones || outcome.textures {
                report.renderer_updates += 1;
            }
        }

        if moved.is_empty() {
            return;
        }

        // Static instances read their attachments off the shared record
        for entity in entities.iter_mut().filter(|entity| entity.is_static) {
            if !moved.contains(&entity.model_identity) {
                continue;
            }
            let (Some(attachments), Some(shared), Some(skeleton)) = (
                entity.attachments.as_mut(),
                self.shared.get(&entity.model_identity),
                skeletons.skeleton(entity.model_identity),
            ) else {
                continue;
            };

            for (proxy, transform) in
                attachment::update_attachments(skeleton, &shared.data, attachments)
            {
                transforms.set_local_transform(
                    proxy,
                    transform.position,
                    transform.rotation,
                    transform.scale,
                );
            }
        }
    }
}
