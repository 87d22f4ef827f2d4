// src/command/response.rs - Response wire format and translation to typed values
//!
//! Responses are single lines:
//!
//! ```text
//! SUCCESS: <summary>[ = <value><unit>]
//! ERROR: <message>
//! ```
//!
//! [`translate_response`] reads only this text, so anything that produces
//! the same line (inline execution, a drained queue entry, a log replay)
//! yields the same typed result.

use std::fmt;

use serde::Serialize;

use crate::error::{CommandError, ErrorKind};

pub const SUCCESS_PREFIX: &str = "SUCCESS:";
pub const ERROR_PREFIX: &str = "ERROR:";

/// Separates the call echo from a query's value.
const VALUE_SEPARATOR: &str = " = ";

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Success {
        summary: String,
        /// Value text including any unit, e.g. `1.650 V`.
        value: Option<String>,
    },
    Error { kind: ErrorKind, message: String },
}

impl Response {
    pub fn success(summary: impl Into<String>) -> Self {
        Self::Success { summary: summary.into(), value: None }
    }

    pub fn value(summary: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Success { summary: summary.into(), value: Some(value.into()) }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Error { kind, .. } => Some(*kind),
            Self::Success { .. } => None,
        }
    }
}

impl From<&CommandError> for Response {
    fn from(err: &CommandError) -> Self {
        Self::Error { kind: err.kind(), message: err.to_string() }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { summary, value: Some(value) } => {
                write!(f, "{} {}{}{}", SUCCESS_PREFIX, summary, VALUE_SEPARATOR, value)
            }
            Self::Success { summary, value: None } => write!(f, "{} {}", SUCCESS_PREFIX, summary),
            Self::Error { message, .. } => write!(f, "{} {}", ERROR_PREFIX, message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    Bool,
    Int,
    Float,
    String,
    Error,
}

impl TypeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Error => "error",
        }
    }
}

/// Typed view of a response line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypedResult {
    pub value_text: String,
    pub type_tag: TypeTag,
    /// Int/Float value, 1/0 for booleans, 0 otherwise.
    pub numeric: f64,
}

impl TypedResult {
    fn new(value_text: &str, type_tag: TypeTag, numeric: f64) -> Self {
        Self { value_text: value_text.to_string(), type_tag, numeric }
    }

    pub fn is_error(&self) -> bool {
        self.type_tag == TypeTag::Error
    }

    pub fn as_bool(&self) -> Option<bool> {
        (self.type_tag == TypeTag::Bool).then_some(self.numeric != 0.0)
    }
}

pub fn translate_response(line: &str) -> TypedResult {
    let line = line.trim();
    if let Some(message) = line.strip_prefix(ERROR_PREFIX) {
        return TypedResult::new(message.trim(), TypeTag::Error, 0.0);
    }
    let body = line.strip_prefix(SUCCESS_PREFIX).unwrap_or(line).trim();
    let value = match split_value(body) {
        Some(value) => value.trim(),
        None => return TypedResult::new(body, TypeTag::String, 0.0),
    };

    match value {
        "HIGH" => return TypedResult::new(value, TypeTag::Bool, 1.0),
        "LOW" => return TypedResult::new(value, TypeTag::Bool, 0.0),
        v if v.eq_ignore_ascii_case("true") => return TypedResult::new(value, TypeTag::Bool, 1.0),
        v if v.eq_ignore_ascii_case("false") => return TypedResult::new(value, TypeTag::Bool, 0.0),
        _ => {}
    }

    if let Some(numeral) = leading_numeral(value) {
        if numeral.contains('.') {
            if let Ok(v) = numeral.parse::<f64>() {
                return TypedResult::new(numeral, TypeTag::Float, v);
            }
        } else if let Ok(v) = numeral.parse::<i64>() {
            return TypedResult::new(numeral, TypeTag::Int, v as f64);
        }
    }
    TypedResult::new(value, TypeTag::String, 0.0)
}

/// Text after the first separator that sits outside the call echo's parens
/// and quotes. Argument text inside the echo never matches, and the value
/// is returned whole even when it contains the separator itself.
fn split_value(body: &str) -> Option<&str> {
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    for (i, c) in body.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, _) if depth == 0 && body[i..].starts_with(VALUE_SEPARATOR) => {
                return Some(&body[i + VALUE_SEPARATOR.len()..]);
            }
            _ => {}
        }
    }
    None
}

/// A signed decimal numeral with optional fraction, followed by nothing or
/// by whitespace and a unit.
fn leading_numeral(value: &str) -> Option<&str> {
    let bytes = value.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'-' | b'+')) {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    match bytes.get(end) {
        None => Some(value),
        Some(b) if b.is_ascii_whitespace() => Some(&value[..end]),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_with_unit() {
        let result = translate_response("SUCCESS: adc(get, channel=0) = 1.650 V");
        assert_eq!(result.type_tag, TypeTag::Float);
        assert_eq!(result.value_text, "1.650");
        assert!((result.numeric - 1.65).abs() < 1e-9);
    }

    #[test]
    fn integer_value() {
        let result = translate_response("SUCCESS: slot(get) = 3");
        assert_eq!(result.type_tag, TypeTag::Int);
        assert_eq!(result.numeric, 3.0);
        assert_eq!(translate_response("SUCCESS: probe(get) = -1").numeric, -1.0);
    }

    #[test]
    fn boolean_keywords() {
        assert_eq!(translate_response("SUCCESS: gpio(get, pin=2) = HIGH").as_bool(), Some(true));
        assert_eq!(translate_response("SUCCESS: gpio(get, pin=2) = LOW").as_bool(), Some(false));
        assert_eq!(translate_response("SUCCESS: nodes(check, a=1, b=5) = false").as_bool(), Some(false));
    }

    #[test]
    fn echo_equals_signs_are_not_values() {
        let result = translate_response("SUCCESS: gpio(set, pin=3, value=HIGH)");
        assert_eq!(result.type_tag, TypeTag::String);
        assert_eq!(result.value_text, "gpio(set, pin=3, value=HIGH)");
    }

    #[test]
    fn separator_inside_quoted_echo_argument_is_ignored() {
        let result = translate_response("SUCCESS: oled(print, text=\"v = 3 \")");
        assert_eq!(result.type_tag, TypeTag::String);
        assert_eq!(result.value_text, "oled(print, text=\"v = 3 \")");
    }

    #[test]
    fn value_containing_separator_is_kept_whole() {
        let result = translate_response("SUCCESS: config(get, section=\"display\", key=\"rotation\") = a = b");
        assert_eq!(result.type_tag, TypeTag::String);
        assert_eq!(result.value_text, "a = b");
    }

    #[test]
    fn text_values_stay_strings() {
        let result = translate_response("SUCCESS: display(print) = 1-5,2-7");
        assert_eq!(result.type_tag, TypeTag::String);
        assert_eq!(result.value_text, "1-5,2-7");
        assert_eq!(translate_response("SUCCESS: x(get) = 12abc").type_tag, TypeTag::String);
    }

    #[test]
    fn error_prefix_tags_error() {
        let result = translate_response("ERROR: dac channel 9 out of range (0..4)");
        assert!(result.is_error());
        assert_eq!(result.value_text, "dac channel 9 out of range (0..4)");
    }

    #[test]
    fn response_display_matches_wire_format() {
        assert_eq!(Response::value("adc(get, channel=0)", "1.650 V").to_string(), "SUCCESS: adc(get, channel=0) = 1.650 V");
        assert_eq!(Response::success("target reset").to_string(), "SUCCESS: target reset");
        let err = CommandError::InvalidFunction("zap".to_string());
        assert_eq!(Response::from(&err).to_string(), "ERROR: unknown function 'zap'");
    }
}
