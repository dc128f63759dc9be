//! Declarative command definitions.
//!
//! A [`CommandDefinition`] pairs a request key and its positional parameters
//! with a response key and the byte layout of the response payload. Both
//! sides are described with closed enums so every command shares one encoder
//! and one decoder.

use std::fmt;

use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::klv::{Frame, MessageKey};
use crate::result::CommandResult;

/// Label used when an enumerated field carries a code outside its table.
pub const UNKNOWN_LABEL: &str = "unknown value";

/// Wire encoding of one positional request parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// Canonical UUID text encoded as 16 raw bytes.
    Uuid,
    /// Decimal integer encoded big-endian in `width` bytes.
    UInt {
        /// Encoded width in bytes, at most 8.
        width: usize,
    },
    /// UTF-8 text NUL-padded to `width` bytes.
    Text {
        /// Encoded width in bytes.
        width: usize,
    },
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid => formatter.write_str("uuid"),
            Self::UInt { width } => write!(formatter, "u{}", width * 8),
            Self::Text { width } => write!(formatter, "text[{width}]"),
        }
    }
}

/// Named positional parameter of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    /// Name shown in help output.
    pub name: &'static str,
    /// Wire encoding.
    pub kind: ParameterKind,
}

impl Parameter {
    /// Declares a parameter.
    #[must_use]
    pub const fn new(name: &'static str, kind: ParameterKind) -> Self {
        Self { name, kind }
    }

    fn encode(&self, value: &str, out: &mut Vec<u8>) -> Result<(), String> {
        match self.kind {
            ParameterKind::Uuid => {
                let uuid = Uuid::parse_str(value.trim()).map_err(|error| error.to_string())?;
                out.extend_from_slice(uuid.as_bytes());
            }
            ParameterKind::UInt { width } => {
                if width == 0 || width > 8 {
                    return Err(format!("unsupported integer width {width}"));
                }
                let number = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|error| error.to_string())?;
                if width < 8 && number >> (width * 8) != 0 {
                    return Err(format!("does not fit in {width} bytes"));
                }
                let bytes = number.to_be_bytes();
                out.extend_from_slice(bytes.get(8 - width..).unwrap_or(&bytes));
            }
            ParameterKind::Text { width } => {
                let bytes = value.as_bytes();
                if bytes.len() > width {
                    return Err(format!("longer than {width} bytes"));
                }
                out.extend_from_slice(bytes);
                out.resize(out.len() + width - bytes.len(), 0);
            }
        }
        Ok(())
    }
}

/// Interpretation of a slice of the response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Unsigned big-endian integer of 1 to 8 bytes.
    UInt,
    /// 16 raw bytes rendered as a canonical UUID.
    Uuid,
    /// Count (4 bytes), item size (4 bytes), then that many UUIDs.
    UuidList,
    /// UTF-8 text terminated by the first NUL byte.
    Text,
    /// NUL-separated UTF-8 strings; empty segments are skipped.
    TextList,
}

/// One entry of a response layout.
///
/// `start` and `end` index the payload. Negative values count from the end,
/// and an `end` of `None` runs to the end of the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Result key.
    pub name: &'static str,
    /// Inclusive start offset.
    pub start: isize,
    /// Exclusive end offset.
    pub end: Option<isize>,
    /// Decoder.
    pub kind: FieldKind,
    /// Labels for enumerated integer codes.
    pub labels: &'static [(u64, &'static str)],
}

impl Field {
    /// Declares a field over `start..end`.
    #[must_use]
    pub const fn new(
        name: &'static str,
        start: isize,
        end: Option<isize>,
        kind: FieldKind,
    ) -> Self {
        Self {
            name,
            start,
            end,
            kind,
            labels: &[],
        }
    }

    /// Attaches a code-to-label table. The decoded result gains a
    /// `<name>_text` entry alongside the raw code.
    #[must_use]
    pub const fn with_labels(mut self, labels: &'static [(u64, &'static str)]) -> Self {
        self.labels = labels;
        self
    }

    fn slice<'a>(&self, payload: &'a [u8]) -> Result<&'a [u8], DecodeError> {
        let out_of_range = || DecodeError::FieldOutOfRange {
            field: self.name,
            start: self.start,
            end: self.end,
            length: payload.len(),
        };
        let start = resolve_offset(self.start, payload.len()).ok_or_else(out_of_range)?;
        let end = match self.end {
            Some(end) => resolve_offset(end, payload.len()).ok_or_else(out_of_range)?,
            None => payload.len(),
        };
        if start > end {
            return Err(out_of_range());
        }
        payload.get(start..end).ok_or_else(out_of_range)
    }

    fn decode_into(&self, payload: &[u8], result: &mut CommandResult) -> Result<(), DecodeError> {
        let bytes = self.slice(payload)?;
        let value = match self.kind {
            FieldKind::UInt => {
                let number = decode_uint(bytes).ok_or_else(|| self.invalid(format!(
                    "{} bytes cannot hold an unsigned integer",
                    bytes.len()
                )))?;
                result.insert(self.name, number);
                if !self.labels.is_empty() {
                    let label = self
                        .labels
                        .iter()
                        .find(|(code, _)| *code == number)
                        .map_or(UNKNOWN_LABEL, |(_, label)| *label);
                    result.insert(format!("{}_text", self.name), label);
                }
                return Ok(());
            }
            FieldKind::Uuid => Value::from(
                decode_uuid(bytes)
                    .ok_or_else(|| self.invalid(format!("expected 16 bytes, got {}", bytes.len())))?,
            ),
            FieldKind::UuidList => Value::from(self.decode_uuid_list(bytes)?),
            FieldKind::Text => Value::from(decode_text(bytes)),
            FieldKind::TextList => Value::from(
                bytes
                    .split(|byte| *byte == 0)
                    .filter(|segment| !segment.is_empty())
                    .map(|segment| String::from_utf8_lossy(segment).into_owned())
                    .collect::<Vec<_>>(),
            ),
        };
        result.insert(self.name, value);
        Ok(())
    }

    fn decode_uuid_list(&self, bytes: &[u8]) -> Result<Vec<String>, DecodeError> {
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        let header = |range: std::ops::Range<usize>| {
            bytes
                .get(range)
                .and_then(decode_uint)
                .and_then(|value| usize::try_from(value).ok())
                .ok_or_else(|| self.invalid(String::from("missing list header")))
        };
        let count = header(0..4)?;
        let item_size = header(4..8)?;
        if count > 0 && item_size != 16 {
            return Err(self.invalid(format!("item size {item_size} is not a UUID")));
        }
        let mut items = Vec::with_capacity(count.min(1024));
        for index in 0..count {
            let offset = 8 + index * item_size;
            let uuid = bytes
                .get(offset..offset + item_size)
                .and_then(decode_uuid)
                .ok_or_else(|| {
                    self.invalid(format!("list declares {count} items, item {index} is missing"))
                })?;
            items.push(uuid);
        }
        Ok(items)
    }

    fn invalid(&self, reason: String) -> DecodeError {
        DecodeError::InvalidField {
            field: self.name,
            reason,
        }
    }
}

fn resolve_offset(offset: isize, length: usize) -> Option<usize> {
    let resolved = if offset < 0 {
        length.checked_sub(offset.unsigned_abs())?
    } else {
        offset.unsigned_abs()
    };
    (resolved <= length).then_some(resolved)
}

fn decode_uint(bytes: &[u8]) -> Option<u64> {
    if bytes.is_empty() || bytes.len() > 8 {
        return None;
    }
    Some(
        bytes
            .iter()
            .fold(0_u64, |acc, byte| (acc << 8) | u64::from(*byte)),
    )
}

fn decode_uuid(bytes: &[u8]) -> Option<String> {
    Uuid::from_slice(bytes)
        .ok()
        .map(|uuid| uuid.hyphenated().to_string())
}

fn decode_text(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|byte| *byte == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(bytes.get(..end).unwrap_or(bytes)).into_owned()
}

/// Static description of one device command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDefinition {
    /// Case-sensitive command name.
    pub name: &'static str,
    /// Key sent with the request.
    pub request_key: MessageKey,
    /// Key expected on the response.
    pub response_key: MessageKey,
    /// Positional request parameters.
    pub parameters: &'static [Parameter],
    /// Response layout, decoded in order.
    pub fields: &'static [Field],
    /// One-line description for help output.
    pub summary: &'static str,
}

impl CommandDefinition {
    /// Declares a command with no parameters and an empty layout.
    #[must_use]
    pub const fn new(name: &'static str, request_key: [u8; 3], response_key: [u8; 3]) -> Self {
        Self {
            name,
            request_key: MessageKey::new(request_key),
            response_key: MessageKey::new(response_key),
            parameters: &[],
            fields: &[],
            summary: "",
        }
    }

    /// Sets the positional parameters.
    #[must_use]
    pub const fn with_parameters(mut self, parameters: &'static [Parameter]) -> Self {
        self.parameters = parameters;
        self
    }

    /// Sets the response layout.
    #[must_use]
    pub const fn with_fields(mut self, fields: &'static [Field]) -> Self {
        self.fields = fields;
        self
    }

    /// Sets the help summary.
    #[must_use]
    pub const fn with_summary(mut self, summary: &'static str) -> Self {
        self.summary = summary;
        self
    }

    /// Parameter names in positional order.
    pub fn parameter_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.parameters.iter().map(|parameter| parameter.name)
    }

    /// Builds the request frame for `args`.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::Arity`] when the argument count differs from the
    /// parameter count and [`EncodeError::InvalidArgument`] when a value cannot
    /// be encoded.
    pub fn encode_request<S: AsRef<str>>(
        &self,
        request_id: u32,
        args: &[S],
    ) -> Result<Frame, EncodeError> {
        if args.len() != self.parameters.len() {
            return Err(EncodeError::Arity {
                command: self.name,
                expected: self.parameters.len(),
                actual: args.len(),
            });
        }
        let mut payload = Vec::new();
        for (parameter, value) in self.parameters.iter().zip(args) {
            let value = value.as_ref();
            parameter
                .encode(value, &mut payload)
                .map_err(|reason| EncodeError::InvalidArgument {
                    parameter: parameter.name,
                    value: value.to_owned(),
                    reason,
                })?;
        }
        Ok(Frame::new(self.request_key, request_id, payload))
    }

    /// Decodes a response frame into a result tree.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnexpectedKey`] when the frame answers another
    /// command and field errors when the payload does not match the layout.
    pub fn decode_response(&self, frame: &Frame) -> Result<CommandResult, DecodeError> {
        if frame.key != self.response_key {
            return Err(DecodeError::UnexpectedKey {
                command: self.name,
                expected: self.response_key,
                actual: frame.key,
            });
        }
        let mut result = CommandResult::new();
        for field in self.fields {
            field.decode_into(&frame.payload, &mut result)?;
        }
        Ok(result)
    }
}

/// Request arguments that cannot be encoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    /// Wrong number of positional arguments.
    #[error("{command} expects {expected} argument(s), got {actual}")]
    Arity {
        /// Command name.
        command: &'static str,
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        actual: usize,
    },
    /// An argument value does not fit its parameter encoding.
    #[error("invalid value '{value}' for {parameter}: {reason}")]
    InvalidArgument {
        /// Parameter name.
        parameter: &'static str,
        /// Supplied value.
        value: String,
        /// Why encoding failed.
        reason: String,
    },
}

/// Response frames that do not match the command layout.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The frame key belongs to another message.
    #[error("{command} expected response key {expected}, received {actual}")]
    UnexpectedKey {
        /// Command name.
        command: &'static str,
        /// Declared response key.
        expected: MessageKey,
        /// Key received.
        actual: MessageKey,
    },
    /// A field range lies outside the payload.
    #[error("field {field} ({start}..{end:?}) is outside a {length} byte payload")]
    FieldOutOfRange {
        /// Field name.
        field: &'static str,
        /// Declared start.
        start: isize,
        /// Declared end.
        end: Option<isize>,
        /// Payload length.
        length: usize,
    },
    /// Field bytes cannot be interpreted as declared.
    #[error("field {field} is malformed: {reason}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Decoder message.
        reason: String,
    },
}
