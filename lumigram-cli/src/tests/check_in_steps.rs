//! Behaviour-driven step definitions driving the check-in CLI scenarios.

use super::helpers::{StubPlaceSourceBuilder, Workspace, ljubljana, paused_runtime};
use super::*;
use crate::check_in::run_check_in_with;
use camino::Utf8PathBuf;
use lumigram_core::test_support::{north_of, place_at};
use lumigram_core::{CollectedStore, StableId};
use lumigram_data::test_support::StubExecutor;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;

const TARGET: &str = "way/7";

#[derive(Debug)]
struct CheckInWorld {
    workspace: Workspace,
    place: RefCell<String>,
    map_center: RefCell<bool>,
    track: RefCell<Option<Utf8PathBuf>>,
    stdout: RefCell<Vec<u8>>,
    result: RefCell<Option<Result<(), CliError>>>,
}

impl CheckInWorld {
    fn new() -> Self {
        Self {
            workspace: Workspace::new(),
            place: RefCell::new(TARGET.to_string()),
            map_center: RefCell::new(false),
            track: RefCell::new(None),
            stdout: RefCell::new(Vec::new()),
            result: RefCell::new(None),
        }
    }

    fn walk(&self, meters_north: &[f64]) {
        let positions: Vec<_> = meters_north
            .iter()
            .map(|meters| north_of(ljubljana(), *meters))
            .collect();
        self.track
            .replace(Some(self.workspace.write_track(&positions)));
    }

    fn build_command_line(&self) -> Vec<String> {
        let mut argv = vec![
            "lumigram".to_string(),
            "check-in".to_string(),
            self.place.borrow().clone(),
        ];
        if let Some(track) = self.track.borrow().as_ref() {
            argv.extend([format!("--{ARG_TRACK}"), track.as_str().to_string()]);
        }
        argv.extend([
            format!("--{ARG_DATA_DIR}"),
            self.workspace.root().as_str().to_string(),
        ]);
        if *self.map_center.borrow() {
            argv.push(format!("--{ARG_MAP_CENTER}"));
        }
        argv
    }

    fn stdout(&self) -> String {
        String::from_utf8(self.stdout.borrow().clone()).expect("stdout utf-8")
    }

    fn succeeded(&self) {
        let borrowed = self.result.borrow();
        borrowed
            .as_ref()
            .expect("result recorded")
            .as_ref()
            .expect("expected success");
    }
}

#[fixture]
fn world() -> CheckInWorld {
    CheckInWorld::new()
}

#[given("a track that walks up to the place")]
fn track_walks_up(#[from(world)] world: &CheckInWorld) {
    world.walk(&[120.0, 40.0, 4.0, 60.0]);
}

#[given("a track that stays out of range")]
fn track_stays_away(#[from(world)] world: &CheckInWorld) {
    world.walk(&[120.0, 60.0, 30.0]);
}

#[given("the place is already collected")]
fn place_already_collected(#[from(world)] world: &CheckInWorld) {
    world.workspace.collect(&[TARGET]);
}

#[given("the map center is used as the origin")]
fn map_center_origin(#[from(world)] world: &CheckInWorld) {
    world.map_center.replace(true);
}

#[given("I ask for a place that is not nearby")]
fn ask_for_unknown_place(#[from(world)] world: &CheckInWorld) {
    world.place.replace("node/404".to_string());
}

#[when("I run the check-in command")]
fn run_check_in_command(#[from(world)] world: &CheckInWorld) {
    let invocation = world.build_command_line();
    let parsed = Cli::try_parse_from(invocation).map_err(CliError::from);
    let builder = StubPlaceSourceBuilder {
        executor: StubExecutor::with_places(vec![
            place_at(TARGET, 46.05, 14.5),
            place_at("node/8", 46.06, 14.5),
        ]),
    };
    let outcome = parsed.and_then(|cli| match cli.command {
        Command::CheckIn(args) => {
            let mut buffer = world.stdout.borrow_mut();
            paused_runtime().block_on(run_check_in_with(args, &builder, &mut *buffer))
        }
        other => panic!("expected check-in command, found {other:?}"),
    });

    world.result.replace(Some(outcome));
}

#[then("the place is collected and saved")]
fn place_collected_and_saved(#[from(world)] world: &CheckInWorld) {
    world.succeeded();
    let stdout = world.stdout();
    assert!(stdout.contains("Move closer"), "unexpected output: {stdout}");
    assert!(stdout.contains("Hold 3s to stamp"), "unexpected output: {stdout}");
    assert_eq!(stdout.lines().last(), Some("Collected way/7."));

    let saved = world.workspace.store().load();
    assert!(saved.contains(&StableId::new(TARGET)));
    assert!(saved.updated_at().is_some());
}

#[then("the track ends without a check-in")]
fn track_ends_without_check_in(#[from(world)] world: &CheckInWorld) {
    world.succeeded();
    let stdout = world.stdout();
    assert_eq!(stdout.lines().last(), Some("Track ended before check-in."));
    assert!(!stdout.contains("Hold 3s"), "unexpected output: {stdout}");
    assert!(world.workspace.store().load().is_empty());
}

#[then("the place is reported as already stamped")]
fn place_reported_stamped(#[from(world)] world: &CheckInWorld) {
    world.succeeded();
    let stdout = world.stdout();
    assert!(
        stdout.contains("Already stamped (You have collected this place.)"),
        "unexpected output: {stdout}"
    );
    assert!(!stdout.contains("Collected way/7."));
}

#[then("the command fails because the place is unknown")]
fn command_fails_unknown_place(#[from(world)] world: &CheckInWorld) {
    let borrowed = world.result.borrow();
    let error = borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect_err("expected error");
    match error {
        CliError::UnknownPlace { id } => assert_eq!(id, "node/404"),
        other => panic!("expected UnknownPlace, found {other:?}"),
    }
}

#[then("the command fails because the track is missing")]
fn command_fails_missing_track(#[from(world)] world: &CheckInWorld) {
    let borrowed = world.result.borrow();
    let error = borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect_err("expected error");
    match error {
        CliError::MissingArgument { field, .. } => assert_eq!(*field, ARG_TRACK),
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

macro_rules! register_check_in_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/check_in_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: CheckInWorld) {
            let _ = world;
        }
    };
}

register_check_in_scenario!(check_in_walk_up, "collecting a place after walking up to it");
register_check_in_scenario!(check_in_map_center, "collecting a place by panning the map center");
register_check_in_scenario!(check_in_out_of_range, "running out of track before reaching the place");
register_check_in_scenario!(check_in_already_collected, "revisiting a collected place");
register_check_in_scenario!(check_in_unknown_place, "rejecting a place outside the results");
register_check_in_scenario!(check_in_missing_track, "rejecting a missing track");
