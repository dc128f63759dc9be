//! XML and HTML rendering.
//!
//! Keys never become element names: XML entries carry the key in a `key`
//! attribute and HTML rows carry it in a `<th>` cell. All text is escaped, and
//! characters XML 1.0 cannot carry are replaced with U+FFFD.
//!
//! Every XML `entry` and `item` carries a `type` attribute (`null`, `object`,
//! `array`, `string`, `number` or `boolean`) so the document keeps the JSON
//! value kinds apart.

use std::fmt::Write as _;

use dci_protocol::{CommandResult, Map, Value};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Cell content for a JSON `null`, kept apart from an empty string.
const HTML_NULL: &str = "<em>null</em>";

/// Renders `result` as an indented XML document rooted at `<result>`.
#[must_use]
pub fn render_xml(result: &CommandResult) -> String {
    let mut output = String::from(XML_DECLARATION);
    output.push('\n');
    if result.is_empty() {
        output.push_str("<result/>\n");
        return output;
    }
    output.push_str("<result>\n");
    write_xml_entries(&mut output, result.as_map(), 1);
    output.push_str("</result>\n");
    output
}

fn write_xml_entries(output: &mut String, map: &Map<String, Value>, depth: usize) {
    for (key, value) in map {
        let open = format!(r#"entry key="{}" type="{}""#, escape(key), value_type(value));
        write_xml_node(output, &open, "entry", value, depth);
    }
}

fn write_xml_node(output: &mut String, open: &str, close: &str, value: &Value, depth: usize) {
    let pad = "  ".repeat(depth);
    match value {
        Value::Null => {
            let _ = writeln!(output, "{pad}<{open}/>");
        }
        Value::Object(children) if children.is_empty() => {
            let _ = writeln!(output, "{pad}<{open}/>");
        }
        Value::Array(items) if items.is_empty() => {
            let _ = writeln!(output, "{pad}<{open}/>");
        }
        Value::Object(children) => {
            let _ = writeln!(output, "{pad}<{open}>");
            write_xml_entries(output, children, depth + 1);
            let _ = writeln!(output, "{pad}</{close}>");
        }
        Value::Array(items) => {
            let _ = writeln!(output, "{pad}<{open}>");
            for item in items {
                let item_open = format!(r#"item type="{}""#, value_type(item));
                write_xml_node(output, &item_open, "item", item, depth + 1);
            }
            let _ = writeln!(output, "{pad}</{close}>");
        }
        scalar => {
            let _ = writeln!(output, "{pad}<{open}>{}</{close}>", escape(&scalar_text(scalar)));
        }
    }
}

const fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Renders `result` as a nested HTML table on a single line.
#[must_use]
pub fn render_html(result: &CommandResult) -> String {
    let mut output = String::new();
    write_html_table(&mut output, result.as_map());
    output.push('\n');
    output
}

fn write_html_table(output: &mut String, map: &Map<String, Value>) {
    output.push_str("<table>");
    for (key, value) in map {
        let _ = write!(output, "<tr><th>{}</th><td>", escape(key));
        write_html_value(output, value);
        output.push_str("</td></tr>");
    }
    output.push_str("</table>");
}

fn write_html_value(output: &mut String, value: &Value) {
    match value {
        Value::Object(children) => write_html_table(output, children),
        Value::Array(items) => {
            output.push_str("<ul>");
            for item in items {
                output.push_str("<li>");
                write_html_value(output, item);
                output.push_str("</li>");
            }
            output.push_str("</ul>");
        }
        Value::Null => output.push_str(HTML_NULL),
        scalar => output.push_str(&escape(&scalar_text(scalar))),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for character in text.chars() {
        match character {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other if is_markup_char(other) => escaped.push(other),
            _ => escaped.push(char::REPLACEMENT_CHARACTER),
        }
    }
    escaped
}

/// XML 1.0 `Char` production. Surrogates cannot occur in a `char`.
const fn is_markup_char(character: char) -> bool {
    matches!(
        character,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn sample() -> CommandResult {
        CommandResult::from_json(
            r#"{"title": "Fish & <Chips>", "list": ["a", {"k": true}], "info": {"n": 2}, "none": null}"#,
        )
        .expect("parse")
    }

    #[rstest]
    fn xml_uses_entry_elements(sample: CommandResult) {
        insta::assert_snapshot!(render_xml(&sample), @r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <result>
          <entry key="title" type="string">Fish &amp; &lt;Chips&gt;</entry>
          <entry key="list" type="array">
            <item type="string">a</item>
            <item type="object">
              <entry key="k" type="boolean">true</entry>
            </item>
          </entry>
          <entry key="info" type="object">
            <entry key="n" type="number">2</entry>
          </entry>
          <entry key="none" type="null"/>
        </result>
        "#);
    }

    #[rstest]
    #[case::null("null", r#"<entry key="v" type="null"/>"#)]
    #[case::empty_map("{}", r#"<entry key="v" type="object"/>"#)]
    #[case::empty_list("[]", r#"<entry key="v" type="array"/>"#)]
    #[case::empty_text(r#""""#, r#"<entry key="v" type="string"></entry>"#)]
    #[case::text_digit(r#""1""#, r#"<entry key="v" type="string">1</entry>"#)]
    #[case::number(r#"1"#, r#"<entry key="v" type="number">1</entry>"#)]
    #[case::text_true(r#""true""#, r#"<entry key="v" type="string">true</entry>"#)]
    #[case::boolean("true", r#"<entry key="v" type="boolean">true</entry>"#)]
    fn xml_keeps_value_kinds_apart(#[case] value: &str, #[case] expected: &str) {
        let result = CommandResult::from_json(&format!(r#"{{"v": {value}}}"#)).expect("parse");
        let xml = render_xml(&result);
        assert!(xml.contains(&format!("  {expected}\n")), "{xml}");
    }

    #[test]
    fn xml_replaces_characters_outside_the_xml_charset() {
        let result = CommandResult::from_json(r#"{"a\u0001key": "a\u0001b\tc\u001fd"}"#)
            .expect("parse");
        let xml = render_xml(&result);
        assert!(
            xml.contains("<entry key=\"a\u{FFFD}key\" type=\"string\">a\u{FFFD}b\tc\u{FFFD}d</entry>"),
            "{xml}"
        );
        assert!(!xml.chars().any(|character| character.is_control() && !matches!(character, '\t' | '\n')));
    }

    #[test]
    fn xml_keys_are_attributes_not_element_names() {
        let result = CommandResult::from_json(r#"{"1 bad key\"<": 1}"#).expect("parse");
        let xml = render_xml(&result);
        assert!(xml.contains(r#"<entry key="1 bad key&quot;&lt;" type="number">1</entry>"#));
    }

    #[test]
    fn empty_xml_result_is_self_closing() {
        assert!(render_xml(&CommandResult::new()).ends_with("<result/>\n"));
    }

    #[rstest]
    fn html_nests_tables_and_lists(sample: CommandResult) {
        assert_eq!(
            render_html(&sample),
            concat!(
                "<table>",
                "<tr><th>title</th><td>Fish &amp; &lt;Chips&gt;</td></tr>",
                "<tr><th>list</th><td><ul><li>a</li><li><table><tr><th>k</th><td>true</td></tr></table></li></ul></td></tr>",
                "<tr><th>info</th><td><table><tr><th>n</th><td>2</td></tr></table></td></tr>",
                "<tr><th>none</th><td><em>null</em></td></tr>",
                "</table>\n"
            )
        );
    }

    #[test]
    fn html_escapes_keys() {
        let result = CommandResult::from_json(r#"{"<script>": "'x'"}"#).expect("parse");
        assert_eq!(
            render_html(&result),
            "<table><tr><th>&lt;script&gt;</th><td>&#39;x&#39;</td></tr></table>\n"
        );
    }

    #[test]
    fn html_tells_null_apart_from_empty_text() {
        let result = CommandResult::from_json(r#"{"missing": null, "blank": ""}"#).expect("parse");
        assert_eq!(
            render_html(&result),
            concat!(
                "<table>",
                "<tr><th>missing</th><td><em>null</em></td></tr>",
                "<tr><th>blank</th><td></td></tr>",
                "</table>\n"
            )
        );
    }
}
