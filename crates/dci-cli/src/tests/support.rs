//! Harness types shared by the runtime tests.
//!
//! Supplies a static configuration loader, a dialer that routes every
//! endpoint to a loopback fake device, and the [`TestWorld`] that captures
//! CLI output.

mod fake_device;

use std::ffi::OsString;
use std::io;
use std::net::{TcpListener, TcpStream};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::cell::RefCell;

use anyhow::{Context, Result, anyhow};
use dci_config::{Config, DeviceEndpoint};
use rstest::fixture;

pub(super) use fake_device::{FakeDevice, RecordedRequest};

use crate::connection::{Dialer, Timeouts};
use crate::{AppError, CliRunner, ConfigLoader, IoStreams};

pub(super) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(super) fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// Sends every session to `127.0.0.1` on the endpoint's port and records the
/// hosts it was asked for.
#[derive(Clone, Default)]
pub(super) struct LoopbackDialer {
    dialled: Arc<Mutex<Vec<String>>>,
}

impl LoopbackDialer {
    pub(super) fn dialled(&self) -> Vec<String> {
        self.dialled.lock().map(|hosts| hosts.clone()).unwrap_or_default()
    }
}

impl Dialer for LoopbackDialer {
    type Stream = TcpStream;

    fn dial(&self, endpoint: &DeviceEndpoint, timeouts: Timeouts) -> io::Result<TcpStream> {
        if let Ok(mut hosts) = self.dialled.lock() {
            hosts.push(endpoint.to_string());
        }
        let stream = TcpStream::connect(("127.0.0.1", endpoint.port()))?;
        stream.set_read_timeout(Some(timeouts.io))?;
        stream.set_write_timeout(Some(timeouts.io))?;
        Ok(stream)
    }
}

pub(super) struct TestWorld {
    pub config: Config,
    pub device: Option<FakeDevice>,
    pub dialer: LoopbackDialer,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: Option<ExitCode>,
    pub requests: Vec<RecordedRequest>,
}

impl Default for TestWorld {
    fn default() -> Self {
        let config = Config {
            connect_timeout_ms: 1_000,
            io_timeout_ms: 2_000,
            snmp_timeout_ms: 200,
            ..Config::default()
        };
        Self {
            config,
            device: None,
            dialer: LoopbackDialer::default(),
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: None,
            requests: Vec::new(),
        }
    }
}

impl TestWorld {
    /// Starts a fake device whose playlist listings return `uuids`.
    pub fn start_device(&mut self, uuids: &[&str]) -> Result<()> {
        let device = FakeDevice::spawn(uuid_list_payload(uuids)?)?;
        self.config.device_port = device.port();
        self.device = Some(device);
        Ok(())
    }

    /// Points the configuration at a port with no listener.
    pub fn use_closed_port(&mut self) -> Result<()> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind spare listener")?;
        let port = listener.local_addr().context("spare listener address")?.port();
        drop(listener);
        self.config.device_port = port;
        Ok(())
    }

    pub fn run(&mut self, command: &str) {
        self.stdout.clear();
        self.stderr.clear();
        self.requests.clear();
        let args = Self::build_args(command);
        let loader = StaticConfigLoader::new(self.config.clone());
        let io = IoStreams::new(&mut self.stdout, &mut self.stderr);
        let exit = CliRunner::new(io, &loader)
            .with_dialer(self.dialer.clone())
            .run(args);
        self.exit_code = Some(exit);
        if let Some(device) = self.device.as_mut() {
            self.requests = device.take_requests().expect("collect device requests");
        }
    }

    fn build_args(command: &str) -> Vec<OsString> {
        let mut args = vec![OsString::from("dcictl")];
        args.extend(
            command
                .trim()
                .trim_matches('"')
                .split_whitespace()
                .map(OsString::from),
        );
        args
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8(self.stdout.clone()).expect("stdout utf8")
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8(self.stderr.clone()).expect("stderr utf8")
    }
}

/// Builds a listing payload: big-endian count and item size, the raw UUID
/// bytes, then a zero response code.
pub(super) fn uuid_list_payload(uuids: &[&str]) -> Result<Vec<u8>> {
    let count = u32::try_from(uuids.len()).context("uuid count")?;
    let mut payload = count.to_be_bytes().to_vec();
    payload.extend_from_slice(&16_u32.to_be_bytes());
    for uuid in uuids {
        payload.extend(uuid_bytes(uuid)?);
    }
    payload.push(0);
    Ok(payload)
}

fn uuid_bytes(text: &str) -> Result<Vec<u8>> {
    let digits: Vec<char> = text.chars().filter(|character| *character != '-').collect();
    if digits.len() != 32 {
        return Err(anyhow!("'{text}' is not a hyphenated UUID"));
    }
    digits
        .chunks(2)
        .map(|pair| {
            let pair: String = pair.iter().collect();
            u8::from_str_radix(&pair, 16).with_context(|| format!("hex pair '{pair}' in '{text}'"))
        })
        .collect()
}

#[fixture]
pub(super) fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::default())
}
