//! Single-line JSON rendering with `": "` and `", "` separators.

use std::io;

use dci_protocol::CommandResult;
use serde::Serialize;
use serde_json::Serializer;
use serde_json::ser::Formatter;

/// Compact formatter that keeps one space after separators.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Renders `result` as one line of JSON, keys in insertion order.
#[must_use]
pub fn render_json(result: &CommandResult) -> String {
    let mut buffer = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buffer, SpacedFormatter);
    // In-memory values with string keys always serialise.
    if result.serialize(&mut serializer).is_err() {
        buffer.clear();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
