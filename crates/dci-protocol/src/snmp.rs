//! Minimal SNMPv2c codec for single-object `GetRequest` exchanges.
//!
//! Only the subset needed to read scalar MIB objects is covered: one
//! variable binding per request, BER definite lengths, and the SMIv2
//! application types.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

const TAG_INTEGER: u8 = 0x02;
const TAG_OCTET_STRING: u8 = 0x04;
const TAG_NULL: u8 = 0x05;
const TAG_OID: u8 = 0x06;
const TAG_SEQUENCE: u8 = 0x30;
const TAG_IP_ADDRESS: u8 = 0x40;
const TAG_COUNTER32: u8 = 0x41;
const TAG_GAUGE32: u8 = 0x42;
const TAG_TIMETICKS: u8 = 0x43;
const TAG_OPAQUE: u8 = 0x44;
const TAG_COUNTER64: u8 = 0x46;
const TAG_NO_SUCH_OBJECT: u8 = 0x80;
const TAG_NO_SUCH_INSTANCE: u8 = 0x81;
const TAG_END_OF_MIB_VIEW: u8 = 0x82;
const TAG_GET_REQUEST: u8 = 0xA0;
const TAG_RESPONSE: u8 = 0xA2;

/// SNMP version field value for v2c.
pub const VERSION_2C: i64 = 1;

/// Dotted object identifier such as `1.3.6.1.2.1.1.5.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectIdentifier(Vec<u32>);

impl ObjectIdentifier {
    /// Arcs of the identifier.
    #[must_use]
    pub fn arcs(&self) -> &[u32] {
        &self.0
    }

    fn encode(&self) -> Result<Vec<u8>, SnmpError> {
        let (first, second, rest) = match self.0.as_slice() {
            [first, second, rest @ ..] => (*first, *second, rest),
            _ => return Err(SnmpError::InvalidOid(self.to_string())),
        };
        let leading = first
            .checked_mul(40)
            .and_then(|value| value.checked_add(second))
            .ok_or_else(|| SnmpError::InvalidOid(self.to_string()))?;
        let mut bytes = Vec::new();
        push_base128(&mut bytes, leading);
        for arc in rest {
            push_base128(&mut bytes, *arc);
        }
        Ok(bytes)
    }

    fn decode(bytes: &[u8]) -> Result<Self, SnmpError> {
        let mut subidentifiers = Vec::new();
        let mut current: u32 = 0;
        for byte in bytes {
            current = current
                .checked_mul(128)
                .map(|value| value | u32::from(byte & 0x7F))
                .ok_or_else(|| SnmpError::Malformed(String::from("OID arc overflows")))?;
            if byte & 0x80 == 0 {
                subidentifiers.push(current);
                current = 0;
            }
        }
        let Some((&leading, rest)) = subidentifiers.split_first() else {
            return Err(SnmpError::Malformed(String::from("empty OID")));
        };
        let (first, second) = match leading {
            0..40 => (0, leading),
            40..80 => (1, leading - 40),
            _ => (2, leading - 80),
        };
        let mut arcs = vec![first, second];
        arcs.extend_from_slice(rest);
        Ok(Self(arcs))
    }
}

impl FromStr for ObjectIdentifier {
    type Err = SnmpError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let arcs = input
            .trim()
            .trim_start_matches('.')
            .split('.')
            .map(str::parse::<u32>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| SnmpError::InvalidOid(input.to_owned()))?;
        match arcs.as_slice() {
            [first, second, ..] if *first <= 2 && (*first == 2 || *second < 40) => Ok(Self(arcs)),
            _ => Err(SnmpError::InvalidOid(input.to_owned())),
        }
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut arcs = self.0.iter();
        if let Some(first) = arcs.next() {
            write!(formatter, "{first}")?;
        }
        for arc in arcs {
            write!(formatter, ".{arc}")?;
        }
        Ok(())
    }
}

/// Value carried by a variable binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnmpValue {
    /// Signed integer.
    Integer(i64),
    /// Raw octets, usually text.
    OctetString(Vec<u8>),
    /// Placeholder value.
    Null,
    /// Object identifier value.
    ObjectId(ObjectIdentifier),
    /// IPv4 address.
    IpAddress([u8; 4]),
    /// Wrapping 32-bit counter.
    Counter32(u32),
    /// Non-wrapping 32-bit gauge.
    Gauge32(u32),
    /// Hundredths of a second.
    TimeTicks(u32),
    /// Opaque BER payload.
    Opaque(Vec<u8>),
    /// Wrapping 64-bit counter.
    Counter64(u64),
    /// The agent does not implement the object.
    NoSuchObject,
    /// The object exists but not this instance.
    NoSuchInstance,
    /// Walk passed the end of the MIB.
    EndOfMibView,
}

impl SnmpValue {
    /// Whether the value is one of the v2c exception markers.
    #[must_use]
    pub const fn is_exception(&self) -> bool {
        matches!(
            self,
            Self::NoSuchObject | Self::NoSuchInstance | Self::EndOfMibView
        )
    }
}

impl fmt::Display for SnmpValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(formatter, "{value}"),
            Self::OctetString(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) if !text.chars().any(|c| c.is_control() && c != '\n' && c != '\r' && c != '\t') => {
                    formatter.write_str(text)
                }
                _ => write!(formatter, "0x{}", hex::encode_upper(bytes)),
            },
            Self::Null => formatter.write_str(""),
            Self::ObjectId(oid) => write!(formatter, "{oid}"),
            Self::IpAddress([a, b, c, d]) => write!(formatter, "{a}.{b}.{c}.{d}"),
            Self::Counter32(value) | Self::Gauge32(value) | Self::TimeTicks(value) => {
                write!(formatter, "{value}")
            }
            Self::Opaque(bytes) => write!(formatter, "0x{}", hex::encode_upper(bytes)),
            Self::Counter64(value) => write!(formatter, "{value}"),
            Self::NoSuchObject => formatter.write_str("No Such Object currently exists at this OID"),
            Self::NoSuchInstance => {
                formatter.write_str("No Such Instance currently exists at this OID")
            }
            Self::EndOfMibView => formatter.write_str("No more variables left in this MIB View"),
        }
    }
}

/// Decoded `Response` PDU with a single binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnmpResponse {
    /// Echoed request id.
    pub request_id: i32,
    /// Agent error status; zero means success.
    pub error_status: i64,
    /// One-based index of the failing binding.
    pub error_index: i64,
    /// Object identifier of the binding.
    pub oid: ObjectIdentifier,
    /// Bound value.
    pub value: SnmpValue,
}

/// Codec failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnmpError {
    /// The object identifier text or bytes are invalid.
    #[error("invalid object identifier '{0}'")]
    InvalidOid(String),
    /// The message does not follow the expected BER structure.
    #[error("malformed SNMP message: {0}")]
    Malformed(String),
    /// A different element was found where another was expected.
    #[error("expected tag 0x{expected:02X}, found 0x{actual:02X}")]
    UnexpectedTag {
        /// Expected BER tag.
        expected: u8,
        /// Tag found.
        actual: u8,
    },
}

/// Encodes an SNMPv2c `GetRequest` for one object.
///
/// # Errors
///
/// Fails when `oid` has fewer than two arcs.
pub fn encode_get_request(
    community: &str,
    request_id: i32,
    oid: &ObjectIdentifier,
) -> Result<Vec<u8>, SnmpError> {
    let mut binding = tlv(TAG_OID, &oid.encode()?);
    binding.extend(tlv(TAG_NULL, &[]));
    let bindings = tlv(TAG_SEQUENCE, &tlv(TAG_SEQUENCE, &binding));

    let mut pdu = tlv(TAG_INTEGER, &encode_integer(i64::from(request_id)));
    pdu.extend(tlv(TAG_INTEGER, &encode_integer(0)));
    pdu.extend(tlv(TAG_INTEGER, &encode_integer(0)));
    pdu.extend(bindings);

    let mut message = tlv(TAG_INTEGER, &encode_integer(VERSION_2C));
    message.extend(tlv(TAG_OCTET_STRING, community.as_bytes()));
    message.extend(tlv(TAG_GET_REQUEST, &pdu));
    Ok(tlv(TAG_SEQUENCE, &message))
}

/// Decodes a `Response` PDU carrying at least one binding. Only the first
/// binding is returned.
///
/// # Errors
///
/// Fails on any structural problem in the message.
pub fn decode_get_response(bytes: &[u8]) -> Result<SnmpResponse, SnmpError> {
    let mut outer = Reader::new(bytes);
    let mut message = Reader::new(outer.expect(TAG_SEQUENCE)?);
    let version = decode_integer(message.expect(TAG_INTEGER)?)?;
    if version != VERSION_2C {
        return Err(SnmpError::Malformed(format!("unsupported version {version}")));
    }
    message.expect(TAG_OCTET_STRING)?;
    let mut pdu = Reader::new(message.expect(TAG_RESPONSE)?);
    let request_id = i32::try_from(decode_integer(pdu.expect(TAG_INTEGER)?)?)
        .map_err(|_| SnmpError::Malformed(String::from("request id out of range")))?;
    let error_status = decode_integer(pdu.expect(TAG_INTEGER)?)?;
    let error_index = decode_integer(pdu.expect(TAG_INTEGER)?)?;
    let mut bindings = Reader::new(pdu.expect(TAG_SEQUENCE)?);
    let mut binding = Reader::new(bindings.expect(TAG_SEQUENCE)?);
    let oid = ObjectIdentifier::decode(binding.expect(TAG_OID)?)?;
    let (tag, content) = binding.next()?;
    Ok(SnmpResponse {
        request_id,
        error_status,
        error_index,
        oid,
        value: decode_value(tag, content)?,
    })
}

fn decode_value(tag: u8, content: &[u8]) -> Result<SnmpValue, SnmpError> {
    let value = match tag {
        TAG_INTEGER => SnmpValue::Integer(decode_integer(content)?),
        TAG_OCTET_STRING => SnmpValue::OctetString(content.to_vec()),
        TAG_NULL => SnmpValue::Null,
        TAG_OID => SnmpValue::ObjectId(ObjectIdentifier::decode(content)?),
        TAG_IP_ADDRESS => SnmpValue::IpAddress(
            content
                .try_into()
                .map_err(|_| SnmpError::Malformed(String::from("IpAddress is not 4 bytes")))?,
        ),
        TAG_COUNTER32 => SnmpValue::Counter32(decode_u32(content)?),
        TAG_GAUGE32 => SnmpValue::Gauge32(decode_u32(content)?),
        TAG_TIMETICKS => SnmpValue::TimeTicks(decode_u32(content)?),
        TAG_OPAQUE => SnmpValue::Opaque(content.to_vec()),
        TAG_COUNTER64 => SnmpValue::Counter64(decode_unsigned(content)?),
        TAG_NO_SUCH_OBJECT => SnmpValue::NoSuchObject,
        TAG_NO_SUCH_INSTANCE => SnmpValue::NoSuchInstance,
        TAG_END_OF_MIB_VIEW => SnmpValue::EndOfMibView,
        other => {
            return Err(SnmpError::Malformed(format!(
                "unsupported value tag 0x{other:02X}"
            )));
        }
    };
    Ok(value)
}

struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn next(&mut self) -> Result<(u8, &'a [u8]), SnmpError> {
        let truncated = || SnmpError::Malformed(String::from("truncated element"));
        let (&tag, rest) = self.bytes.split_first().ok_or_else(truncated)?;
        let (&lead, mut rest) = rest.split_first().ok_or_else(truncated)?;
        let length = if lead & 0x80 == 0 {
            usize::from(lead)
        } else {
            let count = usize::from(lead & 0x7F);
            if count == 0 || count > 4 {
                return Err(SnmpError::Malformed(format!(
                    "unsupported length of {count} bytes"
                )));
            }
            let (digits, tail) = rest.split_at_checked(count).ok_or_else(truncated)?;
            rest = tail;
            digits
                .iter()
                .fold(0_usize, |acc, byte| (acc << 8) | usize::from(*byte))
        };
        let (content, tail) = rest.split_at_checked(length).ok_or_else(truncated)?;
        self.bytes = tail;
        Ok((tag, content))
    }

    fn expect(&mut self, expected: u8) -> Result<&'a [u8], SnmpError> {
        let (actual, content) = self.next()?;
        if actual == expected {
            Ok(content)
        } else {
            Err(SnmpError::UnexpectedTag { expected, actual })
        }
    }
}

fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut bytes = vec![tag];
    let length = content.len();
    if length < 0x80 {
        bytes.push(u8::try_from(length).unwrap_or(0x7F));
    } else {
        let digits: Vec<u8> = length
            .to_be_bytes()
            .into_iter()
            .skip_while(|byte| *byte == 0)
            .collect();
        bytes.push(0x80 | u8::try_from(digits.len()).unwrap_or(0));
        bytes.extend(digits);
    }
    bytes.extend_from_slice(content);
    bytes
}

fn encode_integer(value: i64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < 7 {
        let (Some(current), Some(next)) = (bytes.get(start), bytes.get(start + 1)) else {
            break;
        };
        let redundant = (*current == 0x00 && next & 0x80 == 0) || (*current == 0xFF && next & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes.get(start..).unwrap_or(&bytes).to_vec()
}

fn decode_integer(content: &[u8]) -> Result<i64, SnmpError> {
    if content.is_empty() || content.len() > 8 {
        return Err(SnmpError::Malformed(format!(
            "integer of {} bytes",
            content.len()
        )));
    }
    let negative = content.first().is_some_and(|byte| byte & 0x80 != 0);
    let seed: i64 = if negative { -1 } else { 0 };
    Ok(content
        .iter()
        .fold(seed, |acc, byte| (acc << 8) | i64::from(*byte)))
}

fn decode_unsigned(content: &[u8]) -> Result<u64, SnmpError> {
    let trimmed = match content {
        [0, rest @ ..] if !rest.is_empty() => rest,
        other => other,
    };
    if trimmed.is_empty() || trimmed.len() > 8 {
        return Err(SnmpError::Malformed(format!(
            "unsigned integer of {} bytes",
            content.len()
        )));
    }
    Ok(trimmed
        .iter()
        .fold(0_u64, |acc, byte| (acc << 8) | u64::from(*byte)))
}

fn decode_u32(content: &[u8]) -> Result<u32, SnmpError> {
    u32::try_from(decode_unsigned(content)?)
        .map_err(|_| SnmpError::Malformed(String::from("32-bit value overflows")))
}

fn push_base128(bytes: &mut Vec<u8>, value: u32) {
    let mut groups = vec![u8::try_from(value & 0x7F).unwrap_or(0)];
    let mut remaining = value >> 7;
    while remaining > 0 {
        groups.push(0x80 | u8::try_from(remaining & 0x7F).unwrap_or(0));
        remaining >>= 7;
    }
    bytes.extend(groups.into_iter().rev());
}
