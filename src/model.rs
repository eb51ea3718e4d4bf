//! Macro definitions as they are stored and handed around.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest step prefix quoted in a derived description.
const DESCRIPTION_PREVIEW_CHARS: usize = 60;

/// One command-line template within a macro.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Step(String);

impl Step {
    pub fn new(command: impl Into<String>) -> Self {
        Self(command.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named, ordered list of command templates.
///
/// The name template is the macro's identity. Steps are never edited in place;
/// changing a macro means deleting it and defining it again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub steps: Vec<Step>,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub run_count: u64,
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
}

impl MacroDefinition {
    /// Build a definition, deriving the description from the steps when none is given.
    pub fn new(name: impl Into<String>, steps: Vec<Step>, description: Option<String>) -> Self {
        let description = description
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| derive_description(&steps));
        Self {
            name: name.into(),
            description,
            steps,
            created: Utc::now(),
            tags: Vec::new(),
            run_count: 0,
            last_run: None,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Append tags not already present (compared case-insensitively).
    pub fn add_tags(&mut self, tags: &[String]) {
        for tag in tags {
            let tag = tag.trim();
            if !tag.is_empty() && !self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
                self.tags.push(tag.to_string());
            }
        }
    }

    /// Normalized form of the name, used as the uniqueness key.
    pub fn key(&self) -> String {
        normalize_name(&self.name)
    }

    pub fn has_placeholders(&self) -> bool {
        crate::pattern::has_placeholders(&self.name)
    }

    pub fn step_texts(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.as_str().to_string()).collect()
    }

    /// Update run statistics after the macro reached the execution engine.
    pub fn mark_run(&mut self) {
        self.run_count += 1;
        self.last_run = Some(Utc::now());
    }

    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.name.to_lowercase().contains(&query)
            || self.description.to_lowercase().contains(&query)
            || self.tags.iter().any(|t| t.to_lowercase().contains(&query))
    }
}

/// Trim, collapse whitespace runs and lowercase a macro name.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn derive_description(steps: &[Step]) -> String {
    match steps {
        [only] => {
            let preview: String = only.as_str().chars().take(DESCRIPTION_PREVIEW_CHARS).collect();
            format!("Runs: {preview}")
        }
        _ => format!("Runs {} commands", steps.len()),
    }
}
