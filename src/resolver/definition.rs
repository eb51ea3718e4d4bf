//! Parser for the macro definition language:
//!
//! ```text
//! remember: "<name template>" -> <step> ; <step> ; ...
//! remember "<name template>": <step> ; <step> ; ...
//! ```

use crate::error::{MacroError, Result};
use crate::model::{MacroDefinition, Step};
use crate::pattern;

const KEYWORD: &str = "remember";

/// The two accepted layouts of a definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Form {
    /// `remember: "name" -> steps`
    Arrow,
    /// `remember "name": steps`
    Colon,
}

/// Strip the `remember` keyword and return which form follows it.
///
/// Input that merely starts with the word (for example a stored macro called
/// "remember the milk") is not a definition.
fn definition_body(input: &str) -> Option<(Form, &str)> {
    let head = input.get(..KEYWORD.len())?;
    if !head.eq_ignore_ascii_case(KEYWORD) {
        return None;
    }
    let rest = &input[KEYWORD.len()..];

    if let Some(after_colon) = rest.strip_prefix(':') {
        return Some((Form::Arrow, after_colon.trim_start()));
    }
    let trimmed = rest.trim_start();
    if trimmed.len() < rest.len() && trimmed.starts_with(['"', '\'']) {
        return Some((Form::Colon, trimmed));
    }
    None
}

/// Whether `input` is written in the definition syntax, well formed or not.
pub fn is_definition(input: &str) -> bool {
    definition_body(input.trim()).is_some()
}

/// Parse a definition.
///
/// Returns `Ok(None)` when the input is not a definition at all and
/// `MalformedDefinition` / `InvalidTemplate` when it is one but broken.
pub fn parse_definition(input: &str) -> Result<Option<MacroDefinition>> {
    let Some((form, body)) = definition_body(input.trim()) else {
        return Ok(None);
    };

    let (name, rest) = take_quoted_name(body)?;
    let rest = rest.trim_start();
    let steps_text = match form {
        Form::Arrow => rest.strip_prefix("->").ok_or_else(|| {
            MacroError::malformed(format!("expected '->' after the name \"{name}\""))
        })?,
        Form::Colon => rest.strip_prefix(':').ok_or_else(|| {
            MacroError::malformed(format!("expected ':' after the name \"{name}\""))
        })?,
    };

    let name = name.trim();
    if name.is_empty() {
        return Err(MacroError::malformed("macro name is empty"));
    }

    let steps = split_steps(steps_text)?;
    if steps.is_empty() {
        return Err(MacroError::malformed(format!(
            "macro \"{name}\" has no steps"
        )));
    }

    let matcher = pattern::compile(name)?;
    for step in &steps {
        if let Some(missing) = pattern::step_placeholders(step)
            .into_iter()
            .find(|p| !matcher.placeholders().contains(p))
        {
            return Err(MacroError::malformed(format!(
                "step '{step}' uses {{{missing}}}, which \"{name}\" does not declare"
            )));
        }
    }

    tracing::debug!("Parsed definition '{}' with {} step(s)", name, steps.len());
    Ok(Some(MacroDefinition::new(
        matcher.template(),
        steps.into_iter().map(Step::new).collect(),
        None,
    )))
}

/// Split off a `"..."` or `'...'` quoted name, returning it and the remainder.
fn take_quoted_name(body: &str) -> Result<(&str, &str)> {
    let mut chars = body.chars();
    let quote = match chars.next() {
        Some(q @ ('"' | '\'')) => q,
        _ => return Err(MacroError::malformed("the macro name must be quoted")),
    };
    let inner = &body[quote.len_utf8()..];
    let close = inner
        .find(quote)
        .ok_or_else(|| MacroError::malformed("unterminated quote around the macro name"))?;
    Ok((&inner[..close], &inner[close + quote.len_utf8()..]))
}

/// Split step text on `;` outside quotes.
///
/// `\;` is not a separator and is kept verbatim, so the shell still sees an
/// escaped semicolon. Steps are trimmed and empty segments dropped.
pub fn split_steps(text: &str) -> Result<Vec<String>> {
    let mut steps = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                // Inside single quotes a backslash is literal.
                if quote != Some('\'') {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                }
            }
            '"' | '\'' if quote.is_none() => {
                quote = Some(c);
                current.push(c);
            }
            c if Some(c) == quote => {
                quote = None;
                current.push(c);
            }
            ';' if quote.is_none() => {
                push_step(&mut steps, &current);
                current.clear();
            }
            _ => current.push(c),
        }
    }

    if let Some(q) = quote {
        return Err(MacroError::malformed(format!(
            "unterminated {q} quote in steps"
        )));
    }
    push_step(&mut steps, &current);
    Ok(steps)
}

fn push_step(steps: &mut Vec<String>, raw: &str) {
    let step = raw.trim();
    if !step.is_empty() {
        steps.push(step.to_string());
    }
}
