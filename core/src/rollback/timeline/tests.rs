//! Tests for input timelines

use riposte_shared::InputBits;

use super::{InputTimeline, RemoteInput, RemoteRecord};

const A: InputBits = InputBits(0b0001);
const B: InputBits = InputBits(0b0010);
const C: InputBits = InputBits(0b0100);

#[test]
fn test_local_input_buffered_by_delay() {
    let mut timeline = InputTimeline::new(2);
    let target = timeline.record_local(0, A);
    assert_eq!(target, 2);
    assert_eq!(timeline.local_input(2), A);
    assert_eq!(timeline.local_input(0), InputBits::NEUTRAL);
}

#[test]
fn test_set_frame_delay_not_retroactive() {
    let mut timeline = InputTimeline::new(2);
    timeline.record_local(0, A);
    assert_eq!(timeline.set_frame_delay(0), 0);
    timeline.record_local(1, B);

    assert_eq!(timeline.local_input(2), A);
    assert_eq!(timeline.local_input(1), B);
}

#[test]
fn test_fill_local_only_for_missing_frames() {
    let mut timeline = InputTimeline::new(0);
    timeline.record_local(0, A);
    timeline.set_frame_delay(2);
    timeline.record_local(1, B);

    assert!(!timeline.fill_local(0));
    assert!(timeline.fill_local(1));
    assert!(timeline.fill_local(2));
    assert!(!timeline.fill_local(3));
    assert_eq!(timeline.local_input(0), A);
    assert_eq!(timeline.local_input(1), InputBits::NEUTRAL);
    assert_eq!(timeline.local_input(3), B);
}

#[test]
fn test_set_frame_delay_clamps() {
    let mut timeline = InputTimeline::new(0);
    assert_eq!(timeline.set_frame_delay(50), 10);
    assert_eq!(timeline.frame_delay(), 10);
    assert_eq!(InputTimeline::new(12).frame_delay(), 10);
}

#[test]
fn test_resolve_prefers_confirmed() {
    let mut timeline = InputTimeline::new(0);
    timeline.record_remote(4, C, 0);
    assert_eq!(timeline.resolve_remote(4), RemoteInput::Confirmed(C));
    assert_eq!(timeline.predicted_remote(4), None);
}

#[test]
fn test_prediction_repeats_previous_confirmed() {
    let mut timeline = InputTimeline::new(0);
    timeline.record_remote(3, B, 0);
    assert_eq!(timeline.resolve_remote(4), RemoteInput::Predicted(B));
}

#[test]
fn test_prediction_chains_through_previous_prediction() {
    let mut timeline = InputTimeline::new(0);
    timeline.record_remote(0, B, 0);
    assert_eq!(timeline.resolve_remote(1), RemoteInput::Predicted(B));
    assert_eq!(timeline.resolve_remote(2), RemoteInput::Predicted(B));
}

#[test]
fn test_prediction_defaults_to_neutral() {
    let mut timeline = InputTimeline::new(0);
    assert_eq!(
        timeline.resolve_remote(0),
        RemoteInput::Predicted(InputBits::NEUTRAL)
    );
    assert_eq!(
        timeline.resolve_remote(7),
        RemoteInput::Predicted(InputBits::NEUTRAL)
    );
}

#[test]
fn test_prediction_is_cached() {
    let mut timeline = InputTimeline::new(0);
    assert_eq!(timeline.resolve_remote(5).bits(), InputBits::NEUTRAL);

    // Confirming the previous frame afterwards does not move the cached guess
    timeline.record_remote(4, C, 0);
    assert_eq!(timeline.resolve_remote(5), RemoteInput::Predicted(InputBits::NEUTRAL));
}

#[test]
fn test_refresh_rederives_prediction() {
    let mut timeline = InputTimeline::new(0);
    timeline.resolve_remote(5);
    timeline.record_remote(4, C, 0);
    assert_eq!(timeline.refresh_remote(5), RemoteInput::Predicted(C));
}

#[test]
fn test_refresh_drops_stale_prediction_once_confirmed() {
    let mut timeline = InputTimeline::new(0);
    timeline.resolve_remote(2);
    timeline.record_remote(2, A, 3);
    assert_eq!(timeline.refresh_remote(2), RemoteInput::Confirmed(A));
    assert_eq!(timeline.predicted_remote(2), None);
}

#[test]
fn test_record_remote_outcomes() {
    let mut timeline = InputTimeline::new(0);
    assert_eq!(timeline.record_remote(1, A, 0), RemoteRecord::Confirmed);
    assert_eq!(timeline.record_remote(1, A, 0), RemoteRecord::Unchanged);
    assert_eq!(
        timeline.record_remote(1, B, 0),
        RemoteRecord::Replaced { previous: A }
    );
    assert_eq!(timeline.confirmed_remote(1), Some(B));
}

#[test]
fn test_duplicate_confirmation_changes_nothing() {
    let mut timeline = InputTimeline::new(0);
    timeline.resolve_remote(0);
    timeline.record_remote(0, A, 1);
    let len = timeline.len();
    let until = timeline.remote_confirmed_until();

    timeline.record_remote(0, A, 1);
    assert_eq!(timeline.len(), len);
    assert_eq!(timeline.remote_confirmed_until(), until);
    assert_eq!(timeline.divergence_at(0).map(|d| d.confirmed), Some(A));
}

#[test]
fn test_replacing_consumed_confirmation_exposes_divergence() {
    let mut timeline = InputTimeline::new(0);
    timeline.record_remote(1, A, 0);
    // Frame 1 was stepped with A; a different confirmation arrives later
    timeline.record_remote(1, C, 3);

    let divergence = timeline.divergence_at(1).unwrap();
    assert_eq!(divergence.predicted, A);
    assert_eq!(divergence.confirmed, C);
}

#[test]
fn test_replacing_unconsumed_confirmation_is_silent() {
    let mut timeline = InputTimeline::new(0);
    timeline.record_remote(5, A, 0);
    timeline.record_remote(5, C, 2);
    assert_eq!(timeline.divergence_at(5), None);
}

#[test]
fn test_divergence_requires_both_values() {
    let mut timeline = InputTimeline::new(0);
    timeline.record_remote(0, A, 0);
    assert_eq!(timeline.divergence_at(0), None);

    timeline.resolve_remote(1);
    assert_eq!(timeline.divergence_at(1), None);

    timeline.record_remote(1, B, 2);
    assert!(timeline.divergence_at(1).is_some());
}

#[test]
fn test_settle_drops_matching_predictions_only() {
    let mut timeline = InputTimeline::new(0);
    timeline.resolve_remote(0);
    timeline.resolve_remote(1);
    timeline.record_remote(0, InputBits::NEUTRAL, 2);
    timeline.record_remote(1, B, 2);

    timeline.settle(0..2);
    assert_eq!(timeline.predicted_remote(0), None);
    assert_eq!(timeline.predicted_remote(1), Some(InputBits::NEUTRAL));
}

#[test]
fn test_confirmed_until_tracks_contiguous_prefix() {
    let mut timeline = InputTimeline::new(0);
    timeline.record_remote(1, A, 0);
    assert_eq!(timeline.remote_confirmed_until(), 0);
    timeline.record_remote(0, A, 0);
    assert_eq!(timeline.remote_confirmed_until(), 2);
    timeline.record_remote(3, A, 0);
    assert_eq!(timeline.remote_confirmed_until(), 2);
    timeline.record_remote(2, A, 0);
    assert_eq!(timeline.remote_confirmed_until(), 4);
}

#[test]
fn test_prune_forgets_old_frames() {
    let mut timeline = InputTimeline::new(0);
    for frame in 0..10 {
        timeline.record_local(frame, A);
        timeline.record_remote(frame, B, frame);
        timeline.resolve_remote(frame + 10);
    }
    timeline.prune(5);

    assert_eq!(timeline.local_input(4), InputBits::NEUTRAL);
    assert_eq!(timeline.local_input(5), A);
    assert_eq!(timeline.confirmed_remote(4), None);
    assert_eq!(timeline.confirmed_remote(5), Some(B));
    assert_eq!(timeline.len(), 5 + 5 + 10);
}

#[test]
fn test_clear() {
    let mut timeline = InputTimeline::new(3);
    timeline.record_local(0, A);
    timeline.record_remote(0, A, 0);
    timeline.clear();
    assert!(timeline.is_empty());
    assert_eq!(timeline.remote_confirmed_until(), 0);
    assert_eq!(timeline.frame_delay(), 3);
}
