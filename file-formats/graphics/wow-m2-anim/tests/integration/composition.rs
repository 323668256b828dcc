//! Bone matrices and attachment points built from sampled tracks

use glam::{Mat4, Quat, Vec3};
use wow_m2_anim::{
    AnimationData, Attachment, AttachmentType, Bone, Channel, DirtyMask, ModelIdentity, Sequence,
    SkeletonBuilder, Track, animation_id, compose_bone_matrix, resolve_attachment_matrix,
    set_procedural_rotation, update_bone_matrices,
};

use super::walking_skeleton;

fn root_dirty() -> DirtyMask {
    let mut mask = DirtyMask::NONE;
    mask.set(0);
    mask
}

#[test]
fn test_two_bone_chain_reaches_one_one_zero() {
    let skeleton = SkeletonBuilder::new()
        .with_bone(Bone::new(None, Vec3::ZERO).with_translation(Channel::per_sequence(vec![
            Track::constant(Vec3::new(1.0, 0.0, 0.0)),
        ])))
        .with_bone(Bone::new(Some(0), Vec3::ZERO).with_translation(Channel::per_sequence(vec![
            Track::constant(Vec3::new(0.0, 1.0, 0.0)),
        ])))
        .with_sequence(Sequence::new(animation_id::STAND, 1000))
        .build()
        .expect("valid skeleton");
    let mut data = AnimationData::new(&skeleton, ModelIdentity(1), 0);

    update_bone_matrices(&skeleton, &mut data, root_dirty(), false);

    let origin = data.bone_transforms[1].transform_point3(Vec3::ZERO);
    assert!(origin.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-6), "{origin}");
}

#[test]
fn test_chain_follows_progress() {
    let skeleton = walking_skeleton();
    let mut data = AnimationData::new(&skeleton, ModelIdentity(1), 0);
    data.states[0].progress = 0.5;

    update_bone_matrices(&skeleton, &mut data, root_dirty(), false);

    let child = data.bone_transforms[1].transform_point3(Vec3::ZERO);
    assert!(child.abs_diff_eq(Vec3::new(0.5, 1.0, 0.0), 1e-6), "{child}");
}

#[test]
fn test_child_inherits_parent_rotation() {
    let rotation = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
    let skeleton = SkeletonBuilder::new()
        .with_bone(
            Bone::new(None, Vec3::ZERO)
                .with_rotation(Channel::per_sequence(vec![Track::constant(rotation)])),
        )
        .with_bone(Bone::new(Some(0), Vec3::ZERO).with_translation(Channel::per_sequence(vec![
            Track::constant(Vec3::new(2.0, 0.0, 0.0)),
        ])))
        .with_sequence(Sequence::new(animation_id::STAND, 1000))
        .build()
        .expect("valid skeleton");
    let mut data = AnimationData::new(&skeleton, ModelIdentity(1), 0);

    update_bone_matrices(&skeleton, &mut data, root_dirty(), false);

    let child = data.bone_transforms[1].transform_point3(Vec3::ZERO);
    assert!(child.abs_diff_eq(Vec3::new(0.0, 2.0, 0.0), 1e-5), "{child}");
}

#[test]
fn test_procedural_rotation_on_animated_bone() {
    let skeleton = walking_skeleton();
    let mut data = AnimationData::new(&skeleton, ModelIdentity(1), 0);
    assert!(set_procedural_rotation(
        &mut data,
        0,
        Quat::from_rotation_z(std::f32::consts::PI)
    ));

    let root = compose_bone_matrix(&skeleton, &data, 0);
    assert!(
        root.transform_point3(Vec3::new(1.0, 0.0, 0.0))
            .abs_diff_eq(Vec3::new(-1.0, 0.0, 0.0), 1e-5)
    );
}

#[test]
fn test_attachment_out_of_range_bone_uses_root() {
    let skeleton = SkeletonBuilder::new()
        .with_bone(Bone::new(None, Vec3::ZERO))
        .with_bone(Bone::new(Some(0), Vec3::ZERO))
        .with_sequence(Sequence::new(animation_id::STAND, 1000))
        .with_attachment(
            AttachmentType::Head,
            Attachment {
                bone: 17,
                position: Vec3::new(0.0, 0.0, 0.5),
            },
        )
        .build()
        .expect("valid skeleton");
    let mut data = AnimationData::new(&skeleton, ModelIdentity(1), 0);
    data.bone_transforms[0] = Mat4::from_translation(Vec3::new(3.0, 0.0, 0.0));
    data.bone_transforms[1] = Mat4::from_translation(Vec3::new(-9.0, 0.0, 0.0));

    let matrix = resolve_attachment_matrix(&skeleton, &data, AttachmentType::Head)
        .expect("attachment declared");
    let position = matrix.transform_point3(Vec3::ZERO);
    assert!(position.abs_diff_eq(Vec3::new(3.0, 0.0, 0.5), 1e-6));

    assert!(resolve_attachment_matrix(&skeleton, &data, AttachmentType::Back).is_none());
}
