// src/command/argument.rs - Typing of a single literal argument
//!
//! Argument text is typed in a fixed priority order: boolean, quoted string,
//! float, integer, bare word. Typing never fails: anything that is not a
//! recognised literal becomes a string.
//!
//! Names and string values are bounded to [`MAX_TEXT_LEN`] characters. Longer
//! input is truncated, not rejected.

use std::fmt;

/// Longest function name, argument name or string value kept, in characters.
pub const MAX_TEXT_LEN: usize = 31;

/// Most argument substrings a command may carry, sub-action keyword included.
pub const MAX_ARGUMENTS: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    None,
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
}

impl ArgValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Bool(_) => "bool",
        }
    }

    /// Int or Float widened to f64.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }
}

/// Renders the value so that [`parse_argument`] types it back the same way.
impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => f.write_str(&float_literal(*v)),
            Self::Bool(v) => write!(f, "{}", v),
            Self::String(s) if s.contains('"') => write!(f, "'{}'", s),
            Self::String(s) => write!(f, "\"{}\"", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandArgument {
    pub name: Option<String>,
    pub value: ArgValue,
}

impl CommandArgument {
    pub fn positional(value: ArgValue) -> Self {
        Self { name: None, value }
    }

    pub fn named(name: &str, value: ArgValue) -> Self {
        Self { name: Some(truncate_bounded(name).to_string()), value }
    }
}

impl fmt::Display for CommandArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}={}", name, self.value),
            None => write!(f, "{}", self.value),
        }
    }
}

/// Cut `text` to at most [`MAX_TEXT_LEN`] characters, on a char boundary.
pub fn truncate_bounded(text: &str) -> &str {
    match text.char_indices().nth(MAX_TEXT_LEN) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Type one argument substring, splitting off a `name=` prefix when the `=`
/// comes before any quote or parenthesis.
pub fn parse_argument(text: &str) -> CommandArgument {
    let text = text.trim();
    let split = text
        .find(['=', '"', '\'', '(', ')'])
        .filter(|&i| text.as_bytes()[i] == b'=');
    if let Some(eq) = split {
        let name = text[..eq].trim();
        if !name.is_empty() {
            return CommandArgument::named(name, parse_literal(&text[eq + 1..]));
        }
    }
    CommandArgument::positional(parse_literal(text))
}

/// Type a literal with no name prefix.
pub fn parse_literal(text: &str) -> ArgValue {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        return ArgValue::Bool(true);
    }
    if text.eq_ignore_ascii_case("false") {
        return ArgValue::Bool(false);
    }
    if let Some(inner) = quoted_interior(text) {
        return ArgValue::String(truncate_bounded(inner).to_string());
    }
    if text.contains('.') {
        if let Ok(v) = text.parse::<f64>() {
            if v.is_finite() {
                return ArgValue::Float(v);
            }
        }
    }
    if is_decimal_integer(text) {
        if let Ok(v) = text.parse::<i64>() {
            return ArgValue::Int(v);
        }
    }
    let bare = text.trim_start_matches(['"', '\'']).trim_end_matches(['"', '\'']).trim_end();
    ArgValue::String(truncate_bounded(bare).to_string())
}

fn quoted_interior(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
    if (first == b'"' || first == b'\'') && first == last {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}

fn is_decimal_integer(text: &str) -> bool {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn float_literal(v: f64) -> String {
    let mut s = v.to_string();
    if !s.contains('.') {
        s.push_str(".0");
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booleans_ignore_case() {
        assert_eq!(parse_literal("true"), ArgValue::Bool(true));
        assert_eq!(parse_literal("FALSE"), ArgValue::Bool(false));
        assert_eq!(parse_literal("True"), ArgValue::Bool(true));
    }

    #[test]
    fn numbers_split_on_decimal_point() {
        assert_eq!(parse_literal("3.0"), ArgValue::Float(3.0));
        assert_eq!(parse_literal("-2.5"), ArgValue::Float(-2.5));
        assert_eq!(parse_literal("3"), ArgValue::Int(3));
        assert_eq!(parse_literal("+7"), ArgValue::Int(7));
        assert_eq!(parse_literal("1.2.3"), ArgValue::String("1.2.3".to_string()));
    }

    #[test]
    fn quoted_strings_are_copied_literally() {
        assert_eq!(parse_literal("\"x\""), ArgValue::String("x".to_string()));
        assert_eq!(parse_literal("'a, b'"), ArgValue::String("a, b".to_string()));
        assert_eq!(parse_literal("\"3\""), ArgValue::String("3".to_string()));
        assert_eq!(parse_literal("'\\n'"), ArgValue::String("\\n".to_string()));
    }

    #[test]
    fn bare_words_lose_stray_quotes() {
        assert_eq!(parse_literal("HIGH"), ArgValue::String("HIGH".to_string()));
        assert_eq!(parse_literal("\"open"), ArgValue::String("open".to_string()));
    }

    #[test]
    fn named_argument_splits_before_quotes() {
        let arg = parse_argument("save=False");
        assert_eq!(arg, CommandArgument::named("save", ArgValue::Bool(false)));
        let arg = parse_argument(" text = \"a=b\" ");
        assert_eq!(arg, CommandArgument::named("text", ArgValue::String("a=b".to_string())));
        let arg = parse_argument("\"a=b\"");
        assert_eq!(arg, CommandArgument::positional(ArgValue::String("a=b".to_string())));
    }

    #[test]
    fn empty_name_is_positional() {
        let arg = parse_argument("=5");
        assert_eq!(arg.name, None);
        assert_eq!(arg.value, ArgValue::String("=5".to_string()));
    }

    #[test]
    fn long_values_truncate() {
        let long = "x".repeat(40);
        match parse_literal(&format!("\"{}\"", long)) {
            ArgValue::String(s) => assert_eq!(s.len(), MAX_TEXT_LEN),
            other => panic!("expected string, got {:?}", other),
        }
        let arg = parse_argument(&format!("{}=1", "n".repeat(40)));
        assert_eq!(arg.name.map(|n| n.len()), Some(MAX_TEXT_LEN));
    }

    #[test]
    fn display_reparses_to_same_value() {
        for value in [
            ArgValue::Int(-4),
            ArgValue::Float(3.0),
            ArgValue::Float(0.125),
            ArgValue::Bool(false),
            ArgValue::String("12".to_string()),
            ArgValue::String("say \"hi\"".to_string()),
        ] {
            assert_eq!(parse_literal(&value.to_string()), value);
        }
    }
}
