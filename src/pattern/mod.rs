//! Name-template compilation and placeholder substitution.
//!
//! A name template such as `deploy {service} to {env}` is split into literal
//! segments and `{identifier}` slots, validated once, and turned into a
//! [`Matcher`] that can decompose concrete user input into a
//! [`VariableBinding`]. Steps reference the same identifiers and are filled in
//! with [`substitute`].

mod binding;

pub use binding::VariableBinding;

use regex::Regex;
use std::collections::HashSet;

use crate::error::{MacroError, Result};

/// A piece of a parsed name template.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Slot(String),
}

/// Compiled form of a name template.
#[derive(Debug, Clone)]
pub struct Matcher {
    template: String,
    placeholders: Vec<String>,
    /// `None` for templates without placeholders, which match by equality.
    regex: Option<Regex>,
}

impl Matcher {
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholder identifiers in template order.
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    pub fn is_parameterized(&self) -> bool {
        self.regex.is_some()
    }

    /// Decompose `input` into a binding, or `None` when it does not fit the template.
    ///
    /// Literal segments must appear verbatim. Each slot captures up to the next
    /// literal, internal whitespace included; the last slot takes the rest of the
    /// input. Captured values are trimmed and must not be empty.
    pub fn try_match(&self, input: &str) -> Option<VariableBinding> {
        let input = input.trim();
        let Some(regex) = &self.regex else {
            return (input == self.template).then(VariableBinding::default);
        };

        let captures = regex.captures(input)?;
        let mut binding = VariableBinding::default();
        for (index, name) in self.placeholders.iter().enumerate() {
            let value = captures.get(index + 1)?.as_str().trim();
            if value.is_empty() {
                return None;
            }
            binding.insert(name.clone(), value.to_string());
        }
        tracing::trace!("Template '{}' matched input '{}'", self.template, input);
        Some(binding)
    }
}

/// Compile a name template into a [`Matcher`].
///
/// The template is trimmed and internal whitespace runs become single spaces
/// before compiling, so `"greet  {name}"` is stored and matched as
/// `"greet {name}"`.
///
/// Fails with [`MacroError::InvalidTemplate`] for empty templates, empty or
/// duplicated identifiers, unbalanced braces, and adjacent slots with no
/// literal text between them.
pub fn compile(template: &str) -> Result<Matcher> {
    // Whitespace runs collapse to one space, matching name identity.
    let canonical = template.split_whitespace().collect::<Vec<_>>().join(" ");
    let template = canonical.as_str();
    if template.is_empty() {
        return Err(MacroError::invalid_template(template, "template is empty"));
    }

    let segments = parse_template(template)?;
    let placeholders: Vec<String> = segments
        .iter()
        .filter_map(|segment| match segment {
            Segment::Slot(name) => Some(name.clone()),
            Segment::Literal(_) => None,
        })
        .collect();

    let mut seen = HashSet::new();
    for name in &placeholders {
        if !seen.insert(name.as_str()) {
            return Err(MacroError::invalid_template(
                template,
                format!("placeholder '{{{name}}}' is declared more than once"),
            ));
        }
    }

    for pair in segments.windows(2) {
        if let [Segment::Slot(a), Segment::Slot(b)] = pair {
            return Err(MacroError::invalid_template(
                template,
                format!("placeholders '{{{a}}}' and '{{{b}}}' need literal text between them"),
            ));
        }
    }

    let regex = if placeholders.is_empty() {
        None
    } else {
        Some(build_regex(template, &segments)?)
    };

    tracing::debug!(
        "Compiled template '{}' with {} placeholder(s)",
        template,
        placeholders.len()
    );

    Ok(Matcher {
        template: template.to_string(),
        placeholders,
        regex,
    })
}

/// Whether a name template declares any placeholder.
pub fn has_placeholders(template: &str) -> bool {
    parse_template(template)
        .map(|segments| segments.iter().any(|s| matches!(s, Segment::Slot(_))))
        .unwrap_or(false)
}

/// Identifiers referenced as `{identifier}` in a step, in order of appearance.
///
/// `${...}` is shell parameter expansion and is left alone, as are brace forms
/// that are not a plain identifier (`{}`, `{a,b}`, `{1..3}`).
pub fn step_placeholders(step: &str) -> Vec<String> {
    scan_step(step)
        .into_iter()
        .map(|(_, _, name)| name.to_string())
        .collect()
}

/// Replace every `{identifier}` bound in `binding` with its value.
///
/// Replacement is literal and single-pass: a value that itself contains
/// `{something}` is not expanded again.
pub fn substitute(step: &str, binding: &VariableBinding) -> String {
    let mut result = String::with_capacity(step.len());
    let mut last_end = 0;
    for (start, end, name) in scan_step(step) {
        if let Some(value) = binding.get(name) {
            result.push_str(&step[last_end..start]);
            result.push_str(value);
            last_end = end;
        }
    }
    result.push_str(&step[last_end..]);
    result
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Byte ranges and identifiers of step placeholders.
fn scan_step(step: &str) -> Vec<(usize, usize, &str)> {
    let mut found = Vec::new();
    let mut previous: Option<char> = None;
    let mut iter = step.char_indices().peekable();

    while let Some((start, c)) = iter.next() {
        if c == '{' && previous != Some('$') {
            let rest = &step[start + 1..];
            if let Some(close) = rest.find('}') {
                let name = &rest[..close];
                if !name.is_empty() && name.chars().all(is_identifier_char) {
                    let end = start + 1 + close + 1;
                    found.push((start, end, name));
                    while iter.peek().is_some_and(|(i, _)| *i < end) {
                        iter.next();
                    }
                    previous = Some('}');
                    continue;
                }
            }
        }
        previous = Some(c);
    }
    found
}

fn parse_template(template: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    match inner {
                        '}' => {
                            closed = true;
                            break;
                        }
                        '{' => {
                            return Err(MacroError::invalid_template(
                                template,
                                "nested '{' inside a placeholder",
                            ))
                        }
                        other => name.push(other),
                    }
                }
                if !closed {
                    return Err(MacroError::invalid_template(template, "unclosed '{'"));
                }
                if name.is_empty() {
                    return Err(MacroError::invalid_template(
                        template,
                        "placeholder identifier is empty",
                    ));
                }
                if !name.chars().all(is_identifier_char) {
                    return Err(MacroError::invalid_template(
                        template,
                        format!("placeholder identifier '{name}' may only contain letters, digits and '_'"),
                    ));
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Slot(name));
            }
            '}' => {
                return Err(MacroError::invalid_template(template, "unbalanced '}'"));
            }
            other => literal.push(other),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

fn build_regex(template: &str, segments: &[Segment]) -> Result<Regex> {
    let last = segments.len() - 1;
    let mut pattern = String::from("(?s)^");
    for (index, segment) in segments.iter().enumerate() {
        match segment {
            Segment::Literal(text) => pattern.push_str(&regex::escape(text)),
            Segment::Slot(_) if index == last => pattern.push_str("(.+)"),
            Segment::Slot(_) => pattern.push_str("(.+?)"),
        }
    }
    pattern.push('$');

    Regex::new(&pattern).map_err(|e| MacroError::invalid_template(template, e.to_string()))
}
