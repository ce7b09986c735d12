//! Unit tests for status lines and check-in prompts.

use std::time::Duration;

use crate::status::{CheckInPrompt, StatusMessage, Tone};
use lumigram_core::{CheckInState, OriginMode, ProximitySnapshot, StableId};
use rstest::{fixture, rstest};

#[fixture]
fn snapshot() -> ProximitySnapshot {
    ProximitySnapshot {
        state: CheckInState::AwaitingLocation,
        target: Some(StableId::new("node/1")),
        origin: None,
        distance_m: None,
        hold_progress: 0.0,
        origin_error: None,
        origin_mode: OriginMode::LiveTracking,
        threshold_m: 15.0,
        hold_duration: Duration::from_millis(3000),
    }
}

#[rstest]
#[case(StatusMessage::RequestingLocation, "Requesting your location…")]
#[case(StatusMessage::Searching, "Searching for nearby places of worship…")]
#[case(
    StatusMessage::Found { count: 3, radius_m: 2500.0 },
    "Found 3 places within 2.5 km."
)]
#[case(StatusMessage::Loaded { count: 0 }, "Loaded 0 places in view.")]
#[case(StatusMessage::ZoomedOut, "Zoom in to load places.")]
#[case(StatusMessage::Failed("Request blocked".into()), "Request blocked")]
fn status_lines_render(#[case] status: StatusMessage, #[case] expected: &str) {
    assert_eq!(status.to_string(), expected);
}

#[rstest]
fn no_target_asks_for_selection(snapshot: ProximitySnapshot) {
    let prompt = CheckInPrompt::from_snapshot(&ProximitySnapshot {
        target: None,
        state: CheckInState::Idle,
        ..snapshot
    });
    assert_eq!(prompt.title, "Select a place");
    assert_eq!(prompt.subtitle, "Tap a marker on the map");
    assert_eq!(prompt.tone, Tone::Locked);
}

#[rstest]
fn collected_target_is_stamped(snapshot: ProximitySnapshot) {
    let prompt = CheckInPrompt::from_snapshot(&ProximitySnapshot {
        state: CheckInState::Collected,
        distance_m: Some(400.0),
        hold_progress: 1.0,
        ..snapshot
    });
    assert_eq!(prompt.title, "Already stamped");
    assert_eq!(prompt.tone, Tone::Stamped);
    assert_eq!(prompt.progress, 1.0);
}

#[rstest]
#[case(OriginMode::LiveTracking, "Enable GPS")]
#[case(OriginMode::MapCenter, "Map center not ready")]
fn origin_errors_lock_the_control(
    snapshot: ProximitySnapshot,
    #[case] mode: OriginMode,
    #[case] title: &str,
) {
    let prompt = CheckInPrompt::from_snapshot(&ProximitySnapshot {
        origin_error: Some("location permission denied".into()),
        origin_mode: mode,
        ..snapshot
    });
    assert_eq!(prompt.title, title);
    assert_eq!(prompt.subtitle, "location permission denied");
    assert_eq!(prompt.tone, Tone::Locked);
}

#[rstest]
#[case(OriginMode::LiveTracking, "Locating…", "Waiting for GPS signal.")]
#[case(OriginMode::MapCenter, "Pick a map center", "Pan the map to set the center.")]
fn unknown_distance_waits_for_origin(
    snapshot: ProximitySnapshot,
    #[case] mode: OriginMode,
    #[case] title: &str,
    #[case] subtitle: &str,
) {
    let prompt = CheckInPrompt::from_snapshot(&ProximitySnapshot {
        origin_mode: mode,
        ..snapshot
    });
    assert_eq!(prompt.title, title);
    assert_eq!(prompt.subtitle, subtitle);
}

#[rstest]
fn out_of_range_reports_distance_and_meter(snapshot: ProximitySnapshot) {
    let prompt = CheckInPrompt::from_snapshot(&ProximitySnapshot {
        state: CheckInState::OutOfRange,
        distance_m: Some(60.0),
        ..snapshot
    });
    assert_eq!(prompt.title, "Move closer");
    assert_eq!(prompt.subtitle, "Distance: 60 m");
    assert_eq!(prompt.meter, Some(0.25));
    assert_eq!(prompt.to_string(), "Move closer (Distance: 60 m) [25%]");
}

#[rstest]
#[case(CheckInState::InRange, 0.0)]
#[case(CheckInState::Holding, 0.5)]
fn in_range_invites_a_hold(
    snapshot: ProximitySnapshot,
    #[case] state: CheckInState,
    #[case] progress: f64,
) {
    let prompt = CheckInPrompt::from_snapshot(&ProximitySnapshot {
        state,
        distance_m: Some(9.0),
        hold_progress: progress,
        ..snapshot
    });
    assert_eq!(prompt.title, "Hold 3s to stamp");
    assert_eq!(prompt.subtitle, "Within 15 m");
    assert_eq!(prompt.tone, Tone::Ready);
    assert_eq!(prompt.progress, progress);
    assert_eq!(prompt.meter, None);
}

#[rstest]
fn fractional_hold_durations_keep_one_decimal(snapshot: ProximitySnapshot) {
    let prompt = CheckInPrompt::from_snapshot(&ProximitySnapshot {
        state: CheckInState::InRange,
        distance_m: Some(2.0),
        hold_duration: Duration::from_millis(1500),
        ..snapshot
    });
    assert_eq!(prompt.title, "Hold 1.5s to stamp");
}
