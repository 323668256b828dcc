//! Per-tick driver: partitioning, shared records and reporting

use glam::{Mat4, Quat, Vec3};
use pretty_assertions::assert_eq;
use wow_m2_anim::{
    AnimatedEntity, AnimationCallback, AnimationOwner, AnimationRequest, AnimationSystem,
    AnimationTarget, Attachment, AttachmentType, Bone, Channel, EntityId, FinishedAnimation,
    InstanceId, ModelIdentity, NoMetadata, Sequence, SimulationConfig, Skeleton, SkeletonBuilder,
    Track, animation_id, play_animation,
};

use super::{RecordingRenderer, RecordingTransforms, init_logging, skeletons, walking_skeleton};

/// Two weighted Stand variations and a Walk, each with its own root motion
fn varied_skeleton() -> Skeleton {
    let quarter_turn = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
    let root = Bone::new(None, Vec3::new(0.0, 0.0, 1.0)).with_rotation(Channel::per_sequence(vec![
        Track::new(vec![0.0, 0.8], vec![Quat::IDENTITY, quarter_turn]),
        Track::constant(Quat::from_rotation_x(0.3)),
        Track::new(vec![0.0, 0.5, 1.0], vec![Quat::IDENTITY, quarter_turn, Quat::IDENTITY]),
    ]));
    let child = Bone::new(Some(0), Vec3::ZERO).with_translation(Channel::per_sequence(vec![
        Track::constant(Vec3::new(0.0, 1.0, 0.0)),
        Track::new(vec![0.0, 0.5], vec![Vec3::ZERO, Vec3::new(0.0, 2.0, 0.0)]),
        Track::constant(Vec3::new(0.0, 1.0, 0.0)),
    ]));

    SkeletonBuilder::new()
        .with_bone(root)
        .with_bone(child)
        .with_sequence(Sequence::new(animation_id::STAND, 800).with_frequency(0x2000))
        .with_sequence(
            Sequence::new(animation_id::STAND, 500)
                .with_frequency(0x5fff)
                .with_repetitions(0, 2),
        )
        .with_sequence(Sequence::new(animation_id::WALK, 1000))
        .build()
        .expect("valid skeleton")
}

/// Walking skeleton with a Head attachment on the child bone
fn armed_skeleton() -> Skeleton {
    let mut skeleton = walking_skeleton();
    skeleton.attachments.push(Attachment {
        bone: 1,
        position: Vec3::new(0.0, 0.0, 0.5),
    });
    skeleton.attachment_lookup.insert(AttachmentType::Head, 0);
    skeleton
}

struct Run {
    matrices: Vec<Vec<Mat4>>,
    bone_calls: Vec<(AnimationTarget, u32, Vec<Mat4>)>,
    finished: usize,
}

fn run_crowd(config: SimulationConfig) -> Run {
    let skeletons = skeletons(vec![(1, varied_skeleton()), (2, walking_skeleton())]);
    let mut system = AnimationSystem::new(config).unwrap();
    let mut renderer = RecordingRenderer::default();
    let mut transforms = RecordingTransforms::default();

    let mut entities: Vec<AnimatedEntity> = (0..150u32)
        .map(|i| AnimatedEntity::new(EntityId(i), ModelIdentity(1 + i % 2), InstanceId(i)))
        .collect();

    system.tick(0.0, &mut entities, &skeletons, &mut renderer, &mut transforms);

    for entity in entities.iter_mut().step_by(3) {
        let skeleton = &skeletons[&entity.model_identity];
        let callback = AnimationCallback(u64::from(entity.entity.0));
        let data = entity.current_animation_mut().unwrap();
        assert!(play_animation(
            skeleton,
            data,
            &NoMetadata,
            AnimationRequest::new(animation_id::WALK).with_callback(callback),
        ));
    }

    let mut finished = 0;
    for _ in 0..90 {
        let dt = 1.0 / 30.0;
        let report = system.tick(dt, &mut entities, &skeletons, &mut renderer, &mut transforms);
        assert_eq!(report.animated, 150);
        finished += report.finished.len();
    }

    Run {
        matrices: entities
            .iter()
            .map(|entity| entity.current_animation().unwrap().bone_transforms.clone())
            .collect(),
        bone_calls: renderer.bone_calls,
        finished,
    }
}

#[test]
fn test_parallel_matches_sequential() {
    init_logging();

    let sequential = run_crowd(SimulationConfig::sequential());
    let parallel = run_crowd(SimulationConfig {
        min_partition_size: 4,
        max_threads: 3,
        ..SimulationConfig::default()
    });

    assert_eq!(sequential.matrices, parallel.matrices);
    assert_eq!(sequential.bone_calls.len(), parallel.bone_calls.len());
    assert!(sequential.bone_calls == parallel.bone_calls);
    assert_eq!(sequential.finished, parallel.finished);
    assert!(sequential.finished > 0);
}

#[test]
fn test_one_renderer_call_per_updated_entity() {
    let skeletons = skeletons(vec![(2, walking_skeleton())]);
    let mut system = AnimationSystem::new(SimulationConfig::default()).unwrap();
    let mut renderer = RecordingRenderer::default();
    let mut transforms = RecordingTransforms::default();
    let mut entities: Vec<AnimatedEntity> = (0..100u32)
        .map(|i| AnimatedEntity::new(EntityId(i), ModelIdentity(2), InstanceId(500 + i)))
        .collect();

    let report = system.tick(0.25, &mut entities, &skeletons, &mut renderer, &mut transforms);

    assert_eq!(report.renderer_updates, 100);
    assert_eq!(renderer.bone_calls.len(), 100);
    for (i, (target, offset, matrices)) in renderer.bone_calls.iter().enumerate() {
        assert_eq!(*target, AnimationTarget::Instance(InstanceId(500 + i as u32)));
        assert_eq!(*offset, 0);
        assert_eq!(matrices.len(), 2);
    }
}

#[test]
fn test_finished_callback_is_reported() {
    let skeletons = skeletons(vec![(2, walking_skeleton())]);
    let mut system = AnimationSystem::new(SimulationConfig::sequential()).unwrap();
    let mut renderer = RecordingRenderer::default();
    let mut transforms = RecordingTransforms::default();
    let mut entities = vec![AnimatedEntity::new(EntityId(7), ModelIdentity(2), InstanceId(7))];

    system.tick(0.0, &mut entities, &skeletons, &mut renderer, &mut transforms);
    let data = entities[0].current_animation_mut().unwrap();
    assert!(play_animation(
        &skeletons[&ModelIdentity(2)],
        data,
        &NoMetadata,
        AnimationRequest::new(animation_id::WALK).with_callback(AnimationCallback(42)),
    ));

    // Walk replaces Stand; Stand had no callback to release
    let report = system.tick(0.1, &mut entities, &skeletons, &mut renderer, &mut transforms);
    assert!(report.finished.is_empty());

    // Walk runs out and loops, releasing its callback
    let report = system.tick(1.0, &mut entities, &skeletons, &mut renderer, &mut transforms);
    assert_eq!(
        report.finished,
        vec![FinishedAnimation {
            owner: AnimationOwner::Entity(EntityId(7)),
            slot: 0,
            callback: AnimationCallback(42),
        }]
    );

    let report = system.tick(1.0, &mut entities, &skeletons, &mut renderer, &mut transforms);
    assert!(report.finished.is_empty());
}

#[test]
fn test_static_instances_follow_shared_record() {
    init_logging();

    let skeletons = skeletons(vec![(1, armed_skeleton())]);
    let mut system = AnimationSystem::new(SimulationConfig::sequential()).unwrap();
    let mut renderer = RecordingRenderer::default();
    let mut transforms = RecordingTransforms::default();
    let mut entities = vec![
        AnimatedEntity::shared(EntityId(1), ModelIdentity(1), InstanceId(1)),
        AnimatedEntity::shared(EntityId(2), ModelIdentity(1), InstanceId(2)),
    ];
    assert!(entities[0].enable_attachment(&skeletons, AttachmentType::Head, &mut transforms));

    let report = system.tick(0.5, &mut entities, &skeletons, &mut renderer, &mut transforms);

    assert_eq!(report.animated, 1);
    assert_eq!(renderer.bound.len(), 2);
    assert_eq!(renderer.bone_calls.len(), 1);
    assert_eq!(renderer.bone_calls[0].0, AnimationTarget::Shared(ModelIdentity(1)));
    assert!(entities.iter().all(|entity| entity.animation.is_none()));

    let proxy = transforms.created[0].1;
    let (position, _, scale) = transforms.transforms[&proxy];
    assert!(position.abs_diff_eq(Vec3::new(0.5, 1.0, 0.5), 1e-5), "{position}");
    assert!(scale.abs_diff_eq(Vec3::ONE, 1e-5));

    let shared = system.shared_animation(ModelIdentity(1)).unwrap();
    assert_eq!(shared.states[0].progress, 0.5);
}

#[test]
fn test_model_change_reinitializes() {
    let skeletons = skeletons(vec![(1, varied_skeleton()), (2, walking_skeleton())]);
    let mut system = AnimationSystem::new(SimulationConfig::sequential()).unwrap();
    let mut renderer = RecordingRenderer::default();
    let mut transforms = RecordingTransforms::default();
    let mut entities = vec![AnimatedEntity::new(EntityId(3), ModelIdentity(1), InstanceId(3))];
    system.tick(0.1, &mut entities, &skeletons, &mut renderer, &mut transforms);

    // Without the init marker the old record is stale
    entities[0].model_identity = ModelIdentity(2);
    let report = system.tick(0.1, &mut entities, &skeletons, &mut renderer, &mut transforms);
    assert_eq!((report.animated, report.skipped), (0, 1));

    entities[0].change_model(ModelIdentity(2));
    let report = system.tick(0.1, &mut entities, &skeletons, &mut renderer, &mut transforms);
    assert_eq!((report.animated, report.skipped), (1, 0));

    let data = entities[0].current_animation().unwrap();
    assert_eq!(data.model_identity, ModelIdentity(2));
    assert_eq!(data.bone_transforms.len(), 2);
}

#[test]
fn test_missing_skeleton_is_dropped() {
    let skeletons = skeletons(vec![(2, walking_skeleton())]);
    let mut system = AnimationSystem::new(SimulationConfig::sequential()).unwrap();
    let mut renderer = RecordingRenderer::default();
    let mut transforms = RecordingTransforms::default();
    let mut entities = vec![
        AnimatedEntity::new(EntityId(1), ModelIdentity(9), InstanceId(1)),
        AnimatedEntity::shared(EntityId(2), ModelIdentity(9), InstanceId(2)),
    ];

    let report = system.tick(0.1, &mut entities, &skeletons, &mut renderer, &mut transforms);

    assert_eq!(report.animated, 0);
    assert!(entities.iter().all(|entity| !entity.needs_init && entity.animation.is_none()));
    assert!(renderer.bound.is_empty());
    assert!(system.shared_animation(ModelIdentity(9)).is_none());
}
