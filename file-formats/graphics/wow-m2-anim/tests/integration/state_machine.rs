//! State slot behavior over many ticks

use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;
use test_case::test_case;
use wow_m2_anim::{
    AnimationFlags, AnimationState, Sequence, SequenceFlags, SkeletonBuilder, animation_id,
};

use super::init_logging;

#[test]
fn test_hold_at_end_is_idempotent() {
    init_logging();

    let skeleton = SkeletonBuilder::new()
        .with_sequence(Sequence::new(animation_id::STAND, 1500))
        .build()
        .expect("valid skeleton");
    let mut rng = StdRng::seed_from_u64(1);
    let mut state =
        AnimationState::playing(&skeleton, animation_id::STAND, 0, AnimationFlags::HOLD_AT_END);

    for _ in 0..10 {
        state.update(&skeleton, 0.2, &mut rng);
    }
    assert_eq!(state.progress, 1.5);
    assert!(state.flags.is_finished());

    let settled = state.clone();
    for _ in 0..10 {
        state.update(&skeleton, 0.2, &mut rng);
    }
    assert_eq!(state, settled);
}

#[test]
fn test_transition_swaps_after_blend_time() {
    init_logging();

    let skeleton = SkeletonBuilder::new()
        .with_sequence(Sequence::new(animation_id::STAND, 2000))
        .with_sequence(Sequence::new(animation_id::RUN, 700))
        .build()
        .expect("valid skeleton");
    let mut rng = StdRng::seed_from_u64(2);
    let mut state =
        AnimationState::playing(&skeleton, animation_id::STAND, 0, AnimationFlags::empty());
    state.force_next(&skeleton, animation_id::RUN, 1, AnimationFlags::empty(), Some(200));
    assert_eq!(state.time_to_transition_ms, 200);

    let mut swapped_on = None;
    for tick in 1..=4 {
        let before = state.transition_time;
        state.update(&skeleton, 0.05, &mut rng);
        if state.current_sequence == Some(1) {
            // The swap happens once the accumulated blend time reaches 0.2s
            assert!(before + 0.05 >= 0.2 - 1e-5);
            swapped_on = Some(tick);
            break;
        }
    }

    assert_eq!(swapped_on, Some(4));
    assert_eq!(state.next_sequence, None);
    assert_eq!(state.current_animation, animation_id::RUN);
}

#[test]
fn test_looping_never_leaves_bounds() {
    let skeleton = SkeletonBuilder::new()
        .with_sequence(
            Sequence::new(animation_id::STAND, 1000)
                .with_flags(SequenceFlags::BLEND_TRANSITION)
                .with_blend_time(150)
                .with_frequency(0x4000),
        )
        .with_sequence(
            Sequence::new(animation_id::STAND, 600)
                .with_blend_time(100)
                .with_frequency(0x3fff)
                .with_repetitions(1, 3),
        )
        .build()
        .expect("valid skeleton");

    let mut rng = StdRng::seed_from_u64(1312);
    let mut state =
        AnimationState::playing(&skeleton, animation_id::STAND, 0, AnimationFlags::empty());
    let mut seen = [false; 2];

    for _ in 0..2000 {
        state.update(&skeleton, 1.0 / 30.0, &mut rng);

        let current = state.current_sequence.expect("slot never goes idle");
        seen[current as usize] = true;
        let duration = skeleton.sequences[current as usize].duration();
        assert!(state.progress >= 0.0 && state.progress <= duration + 1e-5);
        assert!(state.transition_progress() <= 1.0);
    }

    assert_eq!(seen, [true, true]);
}

#[test_case(AnimationFlags::empty(), 0.0 ; "forward restarts at zero")]
#[test_case(AnimationFlags::PLAY_REVERSED, 0.8 ; "reversed restarts at the end")]
fn test_progress_after_loop(flags: AnimationFlags, expected: f32) {
    let skeleton = SkeletonBuilder::new()
        .with_sequence(Sequence::new(animation_id::WALK, 800))
        .build()
        .expect("valid skeleton");
    let mut rng = StdRng::seed_from_u64(3);
    let mut state = AnimationState::playing(&skeleton, animation_id::WALK, 0, flags);

    state.update(&skeleton, 5.0, &mut rng);
    assert_eq!(state.current_sequence, Some(0));
    assert_eq!(state.progress, expected);
}
