//! Runtime tests for the `dcictl` CLI.

mod behaviour;
mod support;

use std::process::ExitCode;

use support::{TestWorld, world};

use rstest::rstest;
use std::cell::RefCell;

const FEATURE_PLAYLIST: &str = "6f2c0d6e-2b8c-4a55-9d0a-5e1f3c2b1a00";
const TRAILER_PLAYLIST: &str = "0a0b0c0d-0e0f-1011-1213-141516171819";

#[rstest]
fn version_prints_package_version(world: RefCell<TestWorld>) {
    let mut world = world.borrow_mut();
    world.run("version");
    assert_eq!(world.exit_code, Some(ExitCode::SUCCESS));
    assert_eq!(
        world.stdout_text(),
        format!("dcictl {}\n", env!("CARGO_PKG_VERSION"))
    );
}

#[rstest]
fn list_prints_usage_lines_in_registration_order(world: RefCell<TestWorld>) {
    let mut world = world.borrow_mut();
    world.run("list");
    let stdout = world.stdout_text();
    let names: Vec<_> = stdout
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .collect();
    assert_eq!(names, ["GetCPLList", "GetSPLList", "GetCPLInfo"]);
    assert!(stdout.contains("GetCPLInfo <uuid>"));
}

#[rstest]
fn snmplist_prints_builtin_queries(world: RefCell<TestWorld>) {
    let mut world = world.borrow_mut();
    world.run("snmplist");
    assert_eq!(world.exit_code, Some(ExitCode::SUCCESS));
    let stdout = world.stdout_text();
    assert!(stdout.starts_with("Description"));
    assert!(stdout.contains("Location     1.3.6.1.2.1.1.6.0"));
}

#[rstest]
fn unknown_query_fails(world: RefCell<TestWorld>) {
    let mut world = world.borrow_mut();
    world.run("snmp 127.0.0.1 Temperature");
    assert_eq!(world.exit_code, Some(ExitCode::FAILURE));
    assert!(world.stderr_text().contains("unknown query 'Temperature'"));
}

#[rstest]
fn help_flag_goes_to_stdout(world: RefCell<TestWorld>) {
    let mut world = world.borrow_mut();
    world.run("--help");
    assert_eq!(world.exit_code, Some(ExitCode::SUCCESS));
    assert!(world.stdout_text().contains("Usage: dcictl"));
    assert!(world.stderr_text().is_empty());
}

#[rstest]
fn missing_subcommand_is_a_usage_error(world: RefCell<TestWorld>) {
    let mut world = world.borrow_mut();
    world.run("");
    assert_eq!(world.exit_code, Some(ExitCode::FAILURE));
    assert!(world.stderr_text().contains("Usage: dcictl"));
}

#[rstest]
fn configured_output_format_applies_without_flag(world: RefCell<TestWorld>) {
    let mut world = world.borrow_mut();
    world
        .start_device(&[FEATURE_PLAYLIST])
        .expect("start fake device");
    world.config.output_format = String::from("xml");
    world.run("execute 10.0.0.5 GetCPLList");
    assert_eq!(world.exit_code, Some(ExitCode::SUCCESS));
    let stdout = world.stdout_text();
    assert!(stdout.contains(r#"<entry key="list" type="array">"#), "{stdout}");
    let item = format!(r#"<item type="string">{FEATURE_PLAYLIST}</item>"#);
    assert!(stdout.contains(&item), "{stdout}");
}

#[rstest]
fn shipped_playlist_listing_decodes_uuid_lists(world: RefCell<TestWorld>) {
    let mut world = world.borrow_mut();
    world
        .start_device(&[FEATURE_PLAYLIST, TRAILER_PLAYLIST])
        .expect("start fake device");
    world.run("execute 10.0.0.5 GetSPLList --format json");
    assert_eq!(world.exit_code, Some(ExitCode::SUCCESS), "{}", world.stderr_text());
    assert_eq!(
        world.stdout_text(),
        format!(
            "{{\"amount\": 2, \"item_length\": 16, \"list\": [\"{FEATURE_PLAYLIST}\", \"{TRAILER_PLAYLIST}\"], \"response\": 0}}\n"
        )
    );
    let request = world.requests.first().expect("recorded request");
    assert_eq!(request.key, dci_protocol::MessageKey::new([0x03, 0x01, 0x00]));
}

#[rstest]
fn uuid_list_with_wrong_item_size_is_a_protocol_error(world: RefCell<TestWorld>) {
    let mut world = world.borrow_mut();
    let mut payload = support::uuid_list_payload(&[FEATURE_PLAYLIST]).expect("payload");
    if let Some(size) = payload.get_mut(7) {
        *size = 8;
    }
    let device = support::FakeDevice::spawn(payload).expect("start fake device");
    world.config.device_port = device.port();
    world.device = Some(device);
    world.run("execute 10.0.0.5 GetCPLList");
    assert_eq!(world.exit_code, Some(ExitCode::FAILURE));
    let stderr = world.stderr_text();
    assert!(stderr.contains("item size 8 is not a UUID"), "{stderr}");
}
