//! Loopback stand-in for a DCP-2000 device.
//!
//! The device accepts sessions until dropped. Every request frame is recorded
//! and answered with the response key of the matching listing command and a
//! canned payload, echoing the request id.

use std::io::{self, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use dci_protocol::{Frame, FrameError, MessageKey};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// One frame received by the fake device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(in crate::tests) struct RecordedRequest {
    pub key: MessageKey,
    pub request_id: u32,
    pub payload: Vec<u8>,
}

pub(in crate::tests) struct FakeDevice {
    port: u16,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    sessions: Arc<Mutex<usize>>,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl FakeDevice {
    /// Spawns a device on an ephemeral port answering with `payload`.
    pub fn spawn(payload: Vec<u8>) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind fake device")?;
        listener
            .set_nonblocking(true)
            .context("fake device nonblocking")?;
        let port = listener.local_addr().context("local addr")?.port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let sessions = Arc::new(Mutex::new(0_usize));
        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let requests = Arc::clone(&requests);
            let sessions = Arc::clone(&sessions);
            let stop = Arc::clone(&stop);
            thread::spawn(move || Self::accept_loop(&listener, &payload, &requests, &sessions, &stop))
        };

        Ok(Self {
            port,
            requests,
            sessions,
            stop,
            handle: Some(handle),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Number of sessions accepted so far.
    pub fn sessions(&self) -> Result<usize> {
        self.sessions
            .lock()
            .map(|count| *count)
            .map_err(|error| anyhow!("lock sessions: {error}"))
    }

    /// Drains the requests recorded so far.
    pub fn take_requests(&mut self) -> Result<Vec<RecordedRequest>> {
        let mut requests = self
            .requests
            .lock()
            .map_err(|error| anyhow!("lock requests: {error}"))?;
        Ok(std::mem::take(&mut *requests))
    }

    fn accept_loop(
        listener: &TcpListener,
        payload: &[u8],
        requests: &Mutex<Vec<RecordedRequest>>,
        sessions: &Mutex<usize>,
        stop: &AtomicBool,
    ) {
        while !stop.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((stream, _)) => {
                    if let Ok(mut count) = sessions.lock() {
                        *count += 1;
                    }
                    // A failed session only ends that session.
                    let _ = Self::serve(stream, payload, requests);
                }
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(POLL_INTERVAL);
                }
                Err(_) => break,
            }
        }
    }

    fn serve(
        mut stream: TcpStream,
        payload: &[u8],
        requests: &Mutex<Vec<RecordedRequest>>,
    ) -> Result<()> {
        stream.set_nonblocking(false).context("blocking session")?;
        loop {
            let request = match Frame::read_from(&mut stream) {
                Ok(frame) => frame,
                Err(FrameError::Truncated { received: 0, .. }) => return Ok(()),
                Err(error) => return Err(error).context("read request frame"),
            };
            requests
                .lock()
                .map_err(|error| anyhow!("lock requests: {error}"))?
                .push(RecordedRequest {
                    key: request.key,
                    request_id: request.request_id,
                    payload: request.payload.clone(),
                });
            let response = Frame::new(response_key(request.key), request.request_id, payload.to_vec());
            let bytes = response.encode().context("encode response")?;
            stream.write_all(&bytes).context("write response")?;
            stream.flush().context("flush response")?;
        }
    }
}

/// Request keys end in `0x00`; the matching response differs in the second
/// byte, which is one higher.
fn response_key(request: MessageKey) -> MessageKey {
    let [group, kind, tail] = request.bytes();
    MessageKey::new([group, kind.wrapping_add(1), tail])
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
