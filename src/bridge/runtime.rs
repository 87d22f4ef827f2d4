// src/bridge/runtime.rs - Scripting runtime capability interface
//!
//! The engine never links against an interpreter. It sees the runtime only
//! through [`ScriptRuntime`]: run a string of code, assign a global, and
//! report whether doing either from inside the console-output hook is safe.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::command::argument::{parse_literal, ArgValue};
use crate::command::response::{TypeTag, TypedResult};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScriptError {
    #[error("syntax error: {0}")]
    Syntax(String),
    #[error("runtime error: {0}")]
    Runtime(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ScriptValue {
    /// Python-style source literal.
    pub fn literal(&self) -> String {
        match self {
            Self::None => "None".to_string(),
            Self::Bool(true) => "True".to_string(),
            Self::Bool(false) => "False".to_string(),
            Self::Int(v) => v.to_string(),
            Self::Float(v) if v.is_finite() => {
                let mut s = v.to_string();
                if !s.contains('.') {
                    s.push_str(".0");
                }
                s
            }
            Self::Float(v) => format!("float('{}')", v),
            Self::Str(s) => {
                let mut out = String::with_capacity(s.len() + 2);
                out.push('"');
                for c in s.chars() {
                    match c {
                        '"' => out.push_str("\\\""),
                        '\\' => out.push_str("\\\\"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        c => out.push(c),
                    }
                }
                out.push('"');
                out
            }
        }
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            other => f.write_str(&other.literal()),
        }
    }
}

impl From<&TypedResult> for ScriptValue {
    fn from(result: &TypedResult) -> Self {
        match result.type_tag {
            TypeTag::Bool => Self::Bool(result.numeric != 0.0),
            TypeTag::Int => Self::Int(result.numeric as i64),
            TypeTag::Float => Self::Float(result.numeric),
            TypeTag::String | TypeTag::Error => Self::Str(result.value_text.clone()),
        }
    }
}

impl From<ArgValue> for ScriptValue {
    fn from(value: ArgValue) -> Self {
        match value {
            ArgValue::None => Self::None,
            ArgValue::Bool(b) => Self::Bool(b),
            ArgValue::Int(v) => Self::Int(v),
            ArgValue::Float(v) => Self::Float(v),
            ArgValue::String(s) => Self::Str(s),
        }
    }
}

/// Host-visible capabilities of the embedded scripting runtime.
///
/// # Re-entry
///
/// The bridge calls [`exec_string`](Self::exec_string) and
/// [`set_global`](Self::set_global) from inside the console-output hook, i.e.
/// while the runtime is itself suspended in a `print`. That is only sound if
/// the entry point does not depend on the frame that invoked the hook. A
/// runtime that cannot promise this must return `false` from
/// [`reentry_safe`](Self::reentry_safe); synchronous sentinels are then routed
/// through the command queue instead of being executed inline.
pub trait ScriptRuntime {
    /// Run `code` to completion on the caller's stack.
    fn exec_string(&mut self, code: &str) -> Result<(), ScriptError>;

    /// Assign a global from host code.
    fn set_global(&mut self, name: &str, value: ScriptValue) -> Result<(), ScriptError> {
        self.exec_string(&format!("{} = {}", name, value.literal()))
    }

    fn reentry_safe(&self) -> bool {
        true
    }
}

/// Minimal in-memory runtime: a global table and `name = literal` statements.
#[derive(Debug, Clone)]
pub struct HostRuntime {
    globals: BTreeMap<String, ScriptValue>,
    reentry_safe: bool,
    exec_calls: u64,
}

impl Default for HostRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl HostRuntime {
    pub fn new() -> Self {
        Self { globals: BTreeMap::new(), reentry_safe: true, exec_calls: 0 }
    }

    /// A runtime whose hook frames must not be re-entered.
    pub fn non_reentrant() -> Self {
        Self { reentry_safe: false, ..Self::new() }
    }

    pub fn global(&self, name: &str) -> Option<&ScriptValue> {
        self.globals.get(name)
    }

    pub fn globals(&self) -> impl Iterator<Item = (&String, &ScriptValue)> {
        self.globals.iter()
    }

    /// Number of times host code entered the runtime.
    pub fn exec_calls(&self) -> u64 {
        self.exec_calls
    }
}

impl ScriptRuntime for HostRuntime {
    fn exec_string(&mut self, code: &str) -> Result<(), ScriptError> {
        self.exec_calls += 1;
        for statement in code.lines().map(str::trim).filter(|s| !s.is_empty() && !s.starts_with('#')) {
            let (name, value) = statement
                .split_once('=')
                .ok_or_else(|| ScriptError::Syntax(format!("expected assignment, got '{}'", statement)))?;
            let name = name.trim();
            if !is_identifier(name) {
                return Err(ScriptError::Syntax(format!("'{}' is not a valid name", name)));
            }
            let value = script_literal(value.trim())?;
            self.globals.insert(name.to_string(), value);
        }
        Ok(())
    }

    fn set_global(&mut self, name: &str, value: ScriptValue) -> Result<(), ScriptError> {
        if !is_identifier(name) {
            return Err(ScriptError::Runtime(format!("'{}' is not a valid name", name)));
        }
        self.exec_calls += 1;
        self.globals.insert(name.to_string(), value);
        Ok(())
    }

    fn reentry_safe(&self) -> bool {
        self.reentry_safe
    }
}

/// `None`, a double-quoted string with backslash escapes, or anything the
/// argument parser accepts.
fn script_literal(text: &str) -> Result<ScriptValue, ScriptError> {
    if text == "None" {
        return Ok(ScriptValue::None);
    }
    let Some(inner) = text.strip_prefix('"').and_then(|t| t.strip_suffix('"')).filter(|_| text.len() >= 2) else {
        return Ok(ScriptValue::from(parse_literal(text)));
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(c @ ('"' | '\\' | '\'')) => out.push(c),
            Some(c) => return Err(ScriptError::Syntax(format!("unknown escape '\\{}'", c))),
            None => return Err(ScriptError::Syntax("unterminated escape".to_string())),
        }
    }
    Ok(ScriptValue::Str(out))
}

pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_are_typed() {
        let mut runtime = HostRuntime::new();
        runtime.exec_string("a = 3\nb = 2.5\nc = True\nd = 'x'\ne = None").unwrap();
        assert_eq!(runtime.global("a"), Some(&ScriptValue::Int(3)));
        assert_eq!(runtime.global("b"), Some(&ScriptValue::Float(2.5)));
        assert_eq!(runtime.global("c"), Some(&ScriptValue::Bool(true)));
        assert_eq!(runtime.global("d"), Some(&ScriptValue::Str("x".to_string())));
        assert_eq!(runtime.global("e"), Some(&ScriptValue::None));
    }

    #[test]
    fn bad_statements_are_syntax_errors() {
        let mut runtime = HostRuntime::new();
        assert!(matches!(runtime.exec_string("print(1)"), Err(ScriptError::Syntax(_))));
        assert!(matches!(runtime.exec_string("1x = 2"), Err(ScriptError::Syntax(_))));
    }

    #[test]
    fn escaped_literal_round_trips() {
        let mut runtime = HostRuntime::new();
        let value = ScriptValue::Str("a\"b\\c\nd".to_string());
        runtime.exec_string(&format!("v = {}", value.literal())).unwrap();
        assert_eq!(runtime.global("v"), Some(&value));
    }

    #[test]
    fn literal_escapes_strings() {
        assert_eq!(ScriptValue::Str("a\"b".to_string()).literal(), "\"a\\\"b\"");
        assert_eq!(ScriptValue::Float(3.0).literal(), "3.0");
        assert_eq!(ScriptValue::Bool(false).literal(), "False");
    }

    struct ExecOnly(Vec<String>);

    impl ScriptRuntime for ExecOnly {
        fn exec_string(&mut self, code: &str) -> Result<(), ScriptError> {
            self.0.push(code.to_string());
            Ok(())
        }
    }

    #[test]
    fn default_set_global_goes_through_exec_string() {
        let mut runtime = ExecOnly(Vec::new());
        runtime.set_global("_sync_numeric", ScriptValue::Float(1.65)).unwrap();
        assert_eq!(runtime.0, vec!["_sync_numeric = 1.65".to_string()]);
    }
}
