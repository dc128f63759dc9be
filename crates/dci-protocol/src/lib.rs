//! Wire protocols spoken by `dcictl`.
//!
//! The device side uses KLV frames ([`klv`]) carrying commands described by
//! [`CommandDefinition`] values. The built-in Doremi DCP-2000 table lives in
//! [`doremi`]. Management queries use a small SNMPv2c codec ([`snmp`]).
//!
//! Nothing in this crate performs I/O beyond reading a frame from a caller
//! supplied reader.

pub mod doremi;
pub mod klv;
mod message;
mod result;
pub mod snmp;

pub use klv::{Frame, FrameError, MessageKey};
pub use message::{
    CommandDefinition, DecodeError, EncodeError, Field, FieldKind, Parameter, ParameterKind,
    UNKNOWN_LABEL,
};
pub use result::CommandResult;
pub use serde_json::{Map, Value};
