//! Rendering of command results for operators and scripts.
//!
//! Every renderer is a pure function of the result tree, so the same result
//! always produces the same bytes. Unknown format names fall back to plain
//! text; callers surface the returned notice so the fallback is never silent.

mod json;
mod markup;
mod text;

use dci_protocol::CommandResult;
use strum::{Display, EnumString, VariantNames};

pub use json::render_json;
pub use markup::{render_html, render_xml};
pub use text::{DEFAULT_INDENT, render_text};

/// Supported output formats.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, EnumString, Display, VariantNames)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OutputFormat {
    /// Indented `key: value` lines.
    #[default]
    Text,
    /// Single-line JSON object.
    Json,
    /// `<result>` document with `<entry>` elements.
    Xml,
    /// Nested HTML tables.
    Html,
}

/// Outcome of resolving a format name.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FormatSelection {
    /// Format to render with.
    pub format: OutputFormat,
    /// Set when the requested name was not recognised.
    pub fallback_notice: Option<String>,
}

impl OutputFormat {
    /// Resolves `name`, falling back to [`OutputFormat::Text`] when the name
    /// is not recognised.
    #[must_use]
    pub fn select(name: &str) -> FormatSelection {
        match name.trim().parse::<Self>() {
            Ok(format) => FormatSelection {
                format,
                fallback_notice: None,
            },
            Err(_) => FormatSelection {
                format: Self::Text,
                fallback_notice: Some(format!(
                    "unknown output format '{name}', using text (expected one of: {})",
                    Self::VARIANTS.join(", ")
                )),
            },
        }
    }
}

/// Renders `result` in `format` with default settings.
#[must_use]
pub fn render(result: &CommandResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => render_text(result, DEFAULT_INDENT),
        OutputFormat::Json => render_json(result),
        OutputFormat::Xml => render_xml(result),
        OutputFormat::Html => render_html(result),
    }
}

/// Renders `result` as text starting at `indent` levels.
#[must_use]
pub fn render_with_indent(result: &CommandResult, indent: usize) -> String {
    render_text(result, indent)
}
