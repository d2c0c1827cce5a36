//! Placeholder extraction and substitution
//!
//! Placeholders look like `{{name}}` or `{{name:type}}`. Untyped placeholders
//! have type `string`; callers supply values keyed by `type + key`.

use regex::{Captures, Regex};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use shared::{PromptData, RoleMessage, Variable};

/// Type assigned to placeholders without an explicit annotation
pub const DEFAULT_VARIABLE_TYPE: &str = "string";

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.\-]*)\s*(?::\s*([A-Za-z_][A-Za-z0-9_]*)\s*)?\}\}")
            .expect("placeholder pattern is valid")
    })
}

fn variable_from(caps: &Captures<'_>) -> Variable {
    let key = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    let kind = caps.get(2).map(|m| m.as_str()).unwrap_or(DEFAULT_VARIABLE_TYPE);
    Variable::new(key, kind)
}

/// Variables referenced by a prompt, unique by key, in first-seen order
///
/// Role segments are concatenated before scanning so a key repeated across
/// segments is reported once.
pub fn extract_variables(source: &PromptData) -> Vec<Variable> {
    match source {
        PromptData::FlatTemplate(body) => extract_from_text(body),
        PromptData::RoleSequence(messages) => {
            let joined = messages
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            extract_from_text(&joined)
        }
    }
}

pub fn extract_from_text(text: &str) -> Vec<Variable> {
    let mut seen = HashSet::new();
    placeholder_regex()
        .captures_iter(text)
        .map(|caps| variable_from(&caps))
        .filter(|variable| seen.insert(variable.key.clone()))
        .collect()
}

/// Result of filling placeholders in one body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub text: String,
    /// Composite keys with no supplied value, each listed once
    pub missing: Vec<String>,
}

/// Replace every placeholder with `values[type + key]`
///
/// Absent values become the empty string and are reported in `missing`.
pub fn substitute(body: &str, values: &HashMap<String, String>) -> Substitution {
    let mut missing: Vec<String> = Vec::new();
    let text = placeholder_regex()
        .replace_all(body, |caps: &Captures<'_>| {
            let composite = variable_from(caps).composite_key();
            match values.get(&composite) {
                Some(value) => value.clone(),
                None => {
                    if !missing.contains(&composite) {
                        missing.push(composite);
                    }
                    String::new()
                }
            }
        })
        .into_owned();

    Substitution { text, missing }
}

/// Substitute each role segment in place, merging the missing keys
pub fn substitute_messages(messages: &[RoleMessage], values: &HashMap<String, String>) -> (Vec<RoleMessage>, Vec<String>) {
    let mut missing: Vec<String> = Vec::new();
    let filled = messages
        .iter()
        .map(|message| {
            let substitution = substitute(&message.content, values);
            for key in substitution.missing {
                if !missing.contains(&key) {
                    missing.push(key);
                }
            }
            RoleMessage::new(message.role, substitution.text)
        })
        .collect();

    (filled, missing)
}
