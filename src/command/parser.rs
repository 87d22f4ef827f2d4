// src/command/parser.rs - Splits `name(args)` into a resolved command
//!
//! Grammar:
//!
//! ```text
//! command := name '(' [arg (',' arg)*] ')'
//! arg     := [name '='] (int | float | quoted-string | true | false | bareword)
//! ```
//!
//! There is no nesting and no operators. Commas inside a quote pair do not
//! split arguments. Parsing is deterministic and free of side effects, which
//! is what lets the bridge cache parse results by exact command text.

use std::fmt;

use super::argument::{parse_argument, parse_literal, truncate_bounded, ArgValue, CommandArgument, MAX_ARGUMENTS};
use super::dispatch::{infer_sub_action, leading_verb, resolve_function, ActionCategory, SubAction, SubActionSource};
use crate::error::CommandError;

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand {
    pub function_name: String,
    pub category: ActionCategory,
    pub sub_action: SubAction,
    /// Keyword as written, or the verb taken from a legacy name.
    pub sub_action_text: String,
    pub form: SubActionSource,
    /// Arguments after the sub-action keyword, in call order.
    pub args: Vec<CommandArgument>,
}

impl ParsedCommand {
    pub fn positional(&self) -> impl Iterator<Item = &ArgValue> {
        self.args.iter().filter(|a| a.name.is_none()).map(|a| &a.value)
    }

    pub fn named(&self, name: &str) -> Option<&ArgValue> {
        self.args
            .iter()
            .find(|a| a.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name)))
            .map(|a| &a.value)
    }
}

/// Renders the command back into text that parses to the same value.
impl fmt::Display for ParsedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.function_name)?;
        let mut first = true;
        if self.form == SubActionSource::Keyword {
            f.write_str(&self.sub_action_text)?;
            first = false;
        }
        for arg in &self.args {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{}", arg)?;
            first = false;
        }
        f.write_str(")")
    }
}

pub fn parse_command(input: &str) -> Result<ParsedCommand, CommandError> {
    let text = input.trim();
    let open = text
        .find('(')
        .ok_or_else(|| CommandError::InvalidCommand(format!("missing '(' in '{}'", text)))?;
    let close = text
        .rfind(')')
        .filter(|&close| close > open)
        .ok_or_else(|| CommandError::InvalidCommand(format!("missing ')' in '{}'", text)))?;
    if !text[close + 1..].trim().is_empty() {
        return Err(CommandError::InvalidCommand(format!("unexpected text after ')' in '{}'", text)));
    }

    let function_name = truncate_bounded(text[..open].trim());
    if function_name.is_empty() {
        return Err(CommandError::InvalidCommand(format!("missing function name in '{}'", text)));
    }
    let entry = resolve_function(function_name)
        .ok_or_else(|| CommandError::InvalidFunction(function_name.to_string()))?;

    let mut pieces = split_top_level(&text[open + 1..close]);
    if pieces.len() > MAX_ARGUMENTS {
        return Err(CommandError::InvalidParameterType(format!(
            "{} takes at most {} arguments, got {}",
            function_name,
            MAX_ARGUMENTS,
            pieces.len()
        )));
    }
    if let Some(position) = pieces.iter().position(|p| p.is_empty()) {
        return Err(CommandError::InvalidParameterType(format!(
            "empty argument at position {} in {}",
            position + 1,
            function_name
        )));
    }

    let (sub_action, sub_action_text) = match entry.source {
        SubActionSource::Keyword => {
            let keyword = pieces.first().copied().unwrap_or("");
            let action = keyword_text(keyword).and_then(|kw| entry.category.lookup_sub_action(&kw));
            match action {
                Some(action) => {
                    pieces.remove(0);
                    (action, keyword.to_string())
                }
                None => {
                    return Err(CommandError::InvalidSubaction {
                        function: function_name.to_string(),
                        sub_action: keyword.to_string(),
                    });
                }
            }
        }
        SubActionSource::Verb => match infer_sub_action(function_name, entry.category) {
            Some(action) => (action, leading_verb(function_name).unwrap_or_default().to_string()),
            None => {
                return Err(CommandError::InvalidSubaction {
                    function: function_name.to_string(),
                    sub_action: leading_verb(function_name).unwrap_or_default().to_string(),
                });
            }
        },
    };

    let args = pieces.into_iter().map(parse_argument).collect();
    let parsed = ParsedCommand {
        function_name: function_name.to_string(),
        category: entry.category,
        sub_action,
        sub_action_text,
        form: entry.source,
        args,
    };
    tracing::debug!("parsed {} -> {}/{}", text, parsed.category, parsed.sub_action);
    Ok(parsed)
}

/// A keyword slot must be an unnamed word, quoted or bare.
fn keyword_text(piece: &str) -> Option<String> {
    let arg = parse_argument(piece);
    if arg.name.is_some() {
        return None;
    }
    match parse_literal(piece) {
        ArgValue::String(word) => Some(word),
        _ => None,
    }
}

/// Split on commas outside quote pairs. Pieces come back trimmed; an empty
/// body yields no pieces.
fn split_top_level(body: &str) -> Vec<&str> {
    if body.trim().is_empty() {
        return Vec::new();
    }
    let mut pieces = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in body.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, ',') => {
                pieces.push(body[start..i].trim());
                start = i + 1;
            }
            (None, _) => {}
        }
    }
    pieces.push(body[start..].trim());
    pieces
}
