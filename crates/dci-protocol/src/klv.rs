//! KLV framing for the DCP-2000 control protocol.
//!
//! Every message, in both directions, is laid out as:
//!
//! ```text
//! +-----------+---------+-------------+--------------+---------+
//! | header 13 | key 3   | BER length  | request id 4 | payload |
//! +-----------+---------+-------------+--------------+---------+
//! ```
//!
//! The BER length counts the request id and the payload. Requests are always
//! written with a four-byte long-form length (`0x83` followed by three bytes);
//! responses are accepted in either short or long form.

use std::fmt::{self, Write as _};
use std::io::{self, Read};

use thiserror::Error;

/// Fixed universal label prefix carried by every message.
///
/// SMPTE KLV pack designator registered to Doremi Labs for DCP-2000
/// intra-theater messages, version 1.
pub const HEADER: [u8; 13] = [
    0x06, 0x0E, 0x2B, 0x34, 0x02, 0x05, 0x01, 0x0A, 0x0E, 0x10, 0x01, 0x01, 0x01,
];

/// Size of the request id that prefixes every payload.
pub const REQUEST_ID_LEN: usize = 4;

/// Largest frame body accepted from a device.
pub const MAX_FRAME_LEN: usize = 0x00FF_FFFF;

const LONG_FORM_LENGTH_BYTES: u8 = 3;
const DESCRIBE_PAYLOAD_LIMIT: usize = 20;

/// Three-byte message key identifying a request or response type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageKey([u8; 3]);

impl MessageKey {
    /// Wraps raw key bytes.
    #[must_use]
    pub const fn new(bytes: [u8; 3]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes.
    #[must_use]
    pub const fn bytes(self) -> [u8; 3] {
        self.0
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&hex::encode_upper(self.0))
    }
}

/// A decoded message envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message key.
    pub key: MessageKey,
    /// Correlation id chosen by the client and echoed by the device.
    pub request_id: u32,
    /// Message body following the request id.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Builds a frame.
    #[must_use]
    pub const fn new(key: MessageKey, request_id: u32, payload: Vec<u8>) -> Self {
        Self {
            key,
            request_id,
            payload,
        }
    }

    /// Serialises the frame into wire bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::TooLarge`] when the body cannot be described by a
    /// three-byte BER length.
    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        let body_len = REQUEST_ID_LEN + self.payload.len();
        if body_len > MAX_FRAME_LEN {
            return Err(FrameError::TooLarge {
                length: body_len,
                limit: MAX_FRAME_LEN,
            });
        }
        let mut bytes = Vec::with_capacity(HEADER.len() + 3 + 4 + body_len);
        bytes.extend_from_slice(&HEADER);
        bytes.extend_from_slice(&self.key.bytes());
        bytes.extend_from_slice(&encode_ber_length(body_len));
        bytes.extend_from_slice(&self.request_id.to_be_bytes());
        bytes.extend_from_slice(&self.payload);
        Ok(bytes)
    }

    /// Reads exactly one frame from `reader`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Truncated`] when the stream ends before the frame
    /// is complete, [`FrameError::UnexpectedHeader`] or
    /// [`FrameError::InvalidLength`] for broken framing, and
    /// [`FrameError::Io`] for any other read failure (including timeouts).
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, FrameError> {
        let mut header = [0_u8; 13];
        read_exact_counted(reader, &mut header, "header")?;
        if header != HEADER {
            return Err(FrameError::UnexpectedHeader { actual: header });
        }

        let mut key = [0_u8; 3];
        read_exact_counted(reader, &mut key, "key")?;

        let body_len = read_ber_length(reader)?;
        if body_len < REQUEST_ID_LEN {
            return Err(FrameError::InvalidLength(format!(
                "body length {body_len} is shorter than the request id"
            )));
        }
        if body_len > MAX_FRAME_LEN {
            return Err(FrameError::TooLarge {
                length: body_len,
                limit: MAX_FRAME_LEN,
            });
        }

        let mut request_id = [0_u8; REQUEST_ID_LEN];
        read_exact_counted(reader, &mut request_id, "request id")?;

        let mut payload = vec![0_u8; body_len - REQUEST_ID_LEN];
        read_exact_counted(reader, &mut payload, "payload")?;

        Ok(Self {
            key: MessageKey::new(key),
            request_id: u32::from_be_bytes(request_id),
            payload,
        })
    }

    /// Renders an annotated hex dump for debug logging.
    ///
    /// `label` names the message type when the caller knows it.
    #[must_use]
    pub fn describe(&self, label: Option<&str>) -> String {
        let body_len = REQUEST_ID_LEN + self.payload.len();
        let mut payload_hex = hex::encode_upper(
            self.payload
                .get(..DESCRIBE_PAYLOAD_LIMIT)
                .unwrap_or(&self.payload),
        );
        if self.payload.len() > DESCRIBE_PAYLOAD_LIMIT {
            payload_hex.push_str("...");
        }
        let mut output = String::new();
        let _ = writeln!(output, "header : {}", hex::encode_upper(HEADER));
        let _ = match label {
            Some(label) => writeln!(output, "key    : {} ({label})", self.key),
            None => writeln!(output, "key    : {}", self.key),
        };
        let _ = writeln!(
            output,
            "length : {} ({body_len})",
            hex::encode_upper(encode_ber_length(body_len))
        );
        let _ = writeln!(
            output,
            "id     : {} ({})",
            hex::encode_upper(self.request_id.to_be_bytes()),
            self.request_id
        );
        let _ = write!(output, "payload: {payload_hex}");
        output
    }
}

/// Errors raised while encoding or reading frames.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The stream closed before the frame was complete.
    #[error("truncated frame: expected {expected} bytes of {part}, received {received}")]
    Truncated {
        /// Frame section being read.
        part: &'static str,
        /// Bytes required for the section.
        expected: usize,
        /// Bytes received before the stream closed.
        received: usize,
    },
    /// The universal label prefix did not match [`HEADER`].
    #[error("unexpected frame header {}", hex::encode_upper(actual))]
    UnexpectedHeader {
        /// Header bytes actually received.
        actual: [u8; 13],
    },
    /// The BER length was malformed.
    #[error("invalid BER length: {0}")]
    InvalidLength(String),
    /// The frame body exceeds [`MAX_FRAME_LEN`].
    #[error("frame body of {length} bytes exceeds the {limit} byte limit")]
    TooLarge {
        /// Declared body length.
        length: usize,
        /// Accepted maximum.
        limit: usize,
    },
    /// Reading from the underlying stream failed.
    #[error("read failed: {0}")]
    Io(#[source] io::Error),
}

/// Encodes `length` as a four-byte long-form BER length.
#[must_use]
pub fn encode_ber_length(length: usize) -> [u8; 4] {
    let [_, high, mid, low] = u32::try_from(length).unwrap_or(u32::MAX).to_be_bytes();
    [0x80 | LONG_FORM_LENGTH_BYTES, high, mid, low]
}

fn read_ber_length<R: Read>(reader: &mut R) -> Result<usize, FrameError> {
    let mut first = [0_u8; 1];
    read_exact_counted(reader, &mut first, "length")?;
    let [lead] = first;
    if lead & 0x80 == 0 {
        return Ok(usize::from(lead));
    }
    let count = usize::from(lead & 0x7F);
    if count == 0 || count > 8 {
        return Err(FrameError::InvalidLength(format!(
            "long form declares {count} length bytes"
        )));
    }
    let mut buffer = [0_u8; 8];
    let slot = buffer
        .get_mut(8 - count..)
        .ok_or_else(|| FrameError::InvalidLength(String::from("length overflow")))?;
    read_exact_counted(reader, slot, "length")?;
    let length = u64::from_be_bytes(buffer);
    usize::try_from(length).map_err(|_| FrameError::TooLarge {
        length: usize::MAX,
        limit: MAX_FRAME_LEN,
    })
}

fn read_exact_counted<R: Read>(
    reader: &mut R,
    buffer: &mut [u8],
    part: &'static str,
) -> Result<(), FrameError> {
    let expected = buffer.len();
    let mut received = 0;
    while received < expected {
        let Some(rest) = buffer.get_mut(received..) else {
            break;
        };
        match reader.read(rest) {
            Ok(0) => {
                return Err(FrameError::Truncated {
                    part,
                    expected,
                    received,
                });
            }
            Ok(count) => received += count,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(FrameError::Io(error)),
        }
    }
    Ok(())
}
