//! Splits shell input into words.
//!
//! Whitespace separates words. Single quotes group text literally. Double
//! quotes group text and still honour backslash escapes. Outside single quotes
//! a backslash makes the next character literal.

use thiserror::Error;

/// Input that cannot be split into words.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenizeError {
    /// A quote was opened and never closed.
    #[error("unterminated {0} quote")]
    UnterminatedQuote(char),
    /// The line ends with a lone backslash.
    #[error("no character follows the trailing backslash")]
    DanglingEscape,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Plain,
    Single,
    Double,
}

/// Splits `line` into words following the quoting rules above.
///
/// # Errors
///
/// Returns [`TokenizeError`] for unbalanced quotes or a trailing backslash.
pub fn split_line(line: &str) -> Result<Vec<String>, TokenizeError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut mode = Mode::Plain;
    let mut chars = line.chars();

    while let Some(character) = chars.next() {
        match (mode, character) {
            (Mode::Single, '\'') | (Mode::Double, '"') => mode = Mode::Plain,
            (Mode::Single, other) => current.push(other),
            (Mode::Plain | Mode::Double, '\\') => {
                let escaped = chars.next().ok_or(TokenizeError::DanglingEscape)?;
                current.push(escaped);
                in_word = true;
            }
            (Mode::Double, other) => current.push(other),
            (Mode::Plain, '\'') => {
                mode = Mode::Single;
                in_word = true;
            }
            (Mode::Plain, '"') => {
                mode = Mode::Double;
                in_word = true;
            }
            (Mode::Plain, other) if other.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (Mode::Plain, other) => {
                current.push(other);
                in_word = true;
            }
        }
    }

    match mode {
        Mode::Single => Err(TokenizeError::UnterminatedQuote('\'')),
        Mode::Double => Err(TokenizeError::UnterminatedQuote('"')),
        Mode::Plain => {
            if in_word {
                words.push(current);
            }
            Ok(words)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", &[])]
    #[case("   ", &[])]
    #[case("GetCPLList", &["GetCPLList"])]
    #[case("  GetCPLInfo   abc  ", &["GetCPLInfo", "abc"])]
    #[case("cmd 'two words'", &["cmd", "two words"])]
    #[case(r#"cmd "two words""#, &["cmd", "two words"])]
    #[case(r#"cmd "a \"b\"""#, &["cmd", r#"a "b""#])]
    #[case(r"cmd 'a\b'", &["cmd", r"a\b"])]
    #[case(r"cmd a\ b", &["cmd", "a b"])]
    #[case(r#"cmd '' """#, &["cmd", "", ""])]
    #[case(r#"cmd pre'fix'"post""#, &["cmd", "prefixpost"])]
    fn splits_words(#[case] line: &str, #[case] expected: &[&str]) {
        assert_eq!(split_line(line), Ok(expected.iter().map(|word| (*word).to_owned()).collect()));
    }

    #[rstest]
    #[case("cmd 'open", TokenizeError::UnterminatedQuote('\''))]
    #[case(r#"cmd "open"#, TokenizeError::UnterminatedQuote('"'))]
    #[case("cmd trailing\\", TokenizeError::DanglingEscape)]
    fn rejects_broken_lines(#[case] line: &str, #[case] expected: TokenizeError) {
        assert_eq!(split_line(line), Err(expected));
    }
}
