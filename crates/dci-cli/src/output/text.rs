//! Indented plain-text rendering.

use std::fmt::Write as _;

use dci_protocol::{CommandResult, Map, Value};

/// Root indentation level used by [`super::render`].
pub const DEFAULT_INDENT: usize = 1;

const INDENT_UNIT: &str = "    ";

/// Renders `result` as `key: value` lines starting at `indent` levels.
#[must_use]
pub fn render_text(result: &CommandResult, indent: usize) -> String {
    let mut output = String::new();
    write_map(&mut output, result.as_map(), indent);
    output
}

fn write_map(output: &mut String, map: &Map<String, Value>, level: usize) {
    for (key, value) in map {
        match value {
            Value::Object(children) => {
                line(output, level, &format!("{key}:"));
                write_map(output, children, level + 1);
            }
            Value::Array(items) => {
                line(output, level, &format!("{key}:"));
                write_items(output, items, level + 1);
            }
            scalar => line(output, level, &format!("{key}: {}", scalar_text(scalar))),
        }
    }
}

fn write_items(output: &mut String, items: &[Value], level: usize) {
    for item in items {
        match item {
            Value::Object(children) => {
                line(output, level, "-");
                write_map(output, children, level + 1);
            }
            Value::Array(nested) => {
                line(output, level, "-");
                write_items(output, nested, level + 1);
            }
            scalar => line(output, level, &format!("- {}", scalar_text(scalar))),
        }
    }
}

fn line(output: &mut String, level: usize, text: &str) {
    let _ = writeln!(output, "{}{text}", INDENT_UNIT.repeat(level));
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_nested_tree() {
        let result = CommandResult::from_json(
            r#"{"amount": 2, "list": ["a", "b"], "info": {"title": "Feature", "keys": [{"id": 1}]}, "flag": false, "missing": null}"#,
        )
        .expect("parse");
        insta::assert_snapshot!(render_text(&result, 0), @r"
        amount: 2
        list:
            - a
            - b
        info:
            title: Feature
            keys:
                -
                    id: 1
        flag: false
        missing: null
        ");
    }

    #[test]
    fn root_level_indents_every_line() {
        let result = CommandResult::from_json(r#"{"info": {"title": "Feature"}}"#).expect("parse");
        assert_eq!(render_text(&result, 1), "    info:\n        title: Feature\n");
    }

    #[test]
    fn empty_result_renders_nothing() {
        assert_eq!(render_text(&CommandResult::new(), 1), "");
    }

    #[test]
    fn strings_render_without_quotes() {
        let result: CommandResult = [("name", json!("Screen 1"))].into_iter().collect();
        assert_eq!(render_text(&result, 0), "name: Screen 1\n");
    }
}
