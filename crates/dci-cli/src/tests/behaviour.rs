//! BDD step definitions for `dcictl` behavioural tests.
//!
//! Scenarios live in `tests/features/dcictl.feature` and drive the runtime
//! against the loopback fake device.

use super::support::*;

use std::cell::RefCell;
use std::process::ExitCode;

use dci_protocol::MessageKey;
use rstest_bdd_macros::{given, scenario, then, when};

#[given("a fake device listing playlists {uuids}")]
fn given_fake_device(world: &RefCell<TestWorld>, uuids: String) {
    let uuids: Vec<&str> = uuids.split_whitespace().collect();
    world
        .borrow_mut()
        .start_device(&uuids)
        .expect("failed to start fake device");
}

#[given("no device is listening")]
fn given_no_device(world: &RefCell<TestWorld>) {
    world
        .borrow_mut()
        .use_closed_port()
        .expect("failed to reserve a closed port");
}

#[when("the operator runs {command}")]
fn when_operator_runs(world: &RefCell<TestWorld>, command: String) {
    world.borrow_mut().run(&command);
}

#[then("the CLI exits with code {status}")]
fn then_exit_code(world: &RefCell<TestWorld>, status: u8) {
    assert_eq!(world.borrow().exit_code, Some(ExitCode::from(status)));
}

#[then("the CLI fails")]
fn then_exit_failure(world: &RefCell<TestWorld>) {
    assert_eq!(world.borrow().exit_code, Some(ExitCode::FAILURE));
}

#[then("stdout is {expected}")]
fn then_stdout_is(world: &RefCell<TestWorld>, expected: String) {
    let expected = expected.trim().trim_matches('"');
    assert_eq!(world.borrow().stdout_text().trim_end(), expected);
}

#[then("stdout contains {snippet}")]
fn then_stdout_contains(world: &RefCell<TestWorld>, snippet: String) {
    let stdout = world.borrow().stdout_text();
    let snippet = snippet.trim().trim_matches('"');
    assert!(
        stdout.contains(snippet),
        "stdout {stdout:?} did not contain {snippet:?}"
    );
}

#[then("stderr contains {snippet}")]
fn then_stderr_contains(world: &RefCell<TestWorld>, snippet: String) {
    let stderr = world.borrow().stderr_text();
    let snippet = snippet.trim().trim_matches('"');
    assert!(
        stderr.contains(snippet),
        "stderr {stderr:?} did not contain {snippet:?}"
    );
}

#[then("the device received {count} request")]
fn then_device_received(world: &RefCell<TestWorld>, count: usize) {
    let world = world.borrow();
    assert_eq!(world.requests.len(), count);
    let first = world.requests.first().expect("recorded request");
    assert_eq!(first.key, MessageKey::new([0x01, 0x01, 0x00]));
    assert!((1..=59_999).contains(&first.request_id));
    assert!(first.payload.is_empty());
}

#[then("the session was dialled at {host}")]
fn then_dialled_at(world: &RefCell<TestWorld>, host: String) {
    let world = world.borrow();
    let dialled = world.dialer.dialled();
    assert_eq!(dialled.len(), 1, "expected one dial, got {dialled:?}");
    assert!(dialled[0].starts_with(&format!("{host}:")));
}

#[then("no session was dialled")]
fn then_not_dialled(world: &RefCell<TestWorld>) {
    let world = world.borrow();
    assert!(world.dialer.dialled().is_empty());
    if let Some(device) = world.device.as_ref() {
        assert_eq!(device.sessions().expect("session count"), 0);
    }
}

#[scenario(path = "tests/features/dcictl.feature")]
fn dcictl_behaviour(world: RefCell<TestWorld>) {
    let _ = world;
}
