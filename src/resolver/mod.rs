//! Maps raw user text to a concrete action.
//!
//! Precedence: definition syntax, management grammar, exact name lookup,
//! placeholder templates in repository order, fuzzy suggestion, and finally
//! "unrecognized".

pub mod definition;
pub mod fuzzy;
pub mod management;

#[cfg(test)]
mod tests;

pub use definition::{is_definition, parse_definition};
pub use management::{parse_management, ManagementOp};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{Config, DEFAULT_FUZZY_THRESHOLD};
use crate::error::{MacroError, Result};
use crate::model::MacroDefinition;
use crate::pattern::{self, VariableBinding};
use crate::repository::MacroRepository;

/// How to choose between several placeholder templates matching one input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchPolicy {
    /// The first match in repository order wins
    #[default]
    #[serde(rename = "first")]
    FirstMatch,
    /// More than one match is an `AmbiguousMatch` error
    #[serde(rename = "reject-ambiguous")]
    RejectAmbiguous,
}

/// A macro invocation with its steps already substituted.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRun {
    pub name: String,
    pub steps: Vec<String>,
    pub binding: VariableBinding,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedAction {
    Define(MacroDefinition),
    Manage(ManagementOp),
    Run(ResolvedRun),
    Suggest { candidate: String, score: f64 },
    Unrecognized,
}

pub struct Resolver {
    repository: Arc<dyn MacroRepository>,
    fuzzy_threshold: f64,
    match_policy: MatchPolicy,
}

impl Resolver {
    pub fn new(repository: Arc<dyn MacroRepository>) -> Self {
        Self {
            repository,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            match_policy: MatchPolicy::FirstMatch,
        }
    }

    pub fn from_config(config: &Config, repository: Arc<dyn MacroRepository>) -> Self {
        Self::new(repository)
            .with_fuzzy_threshold(config.fuzzy_threshold)
            .with_match_policy(config.match_policy)
    }

    pub fn with_fuzzy_threshold(mut self, threshold: f64) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    pub fn with_match_policy(mut self, policy: MatchPolicy) -> Self {
        self.match_policy = policy;
        self
    }

    pub fn repository(&self) -> &Arc<dyn MacroRepository> {
        &self.repository
    }

    /// Resolve one line of user input.
    pub async fn resolve(&self, input: &str) -> Result<ResolvedAction> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(ResolvedAction::Unrecognized);
        }

        if let Some(definition) = parse_definition(input)? {
            tracing::debug!("Resolved '{}' as a definition", input);
            return Ok(ResolvedAction::Define(definition));
        }

        if let Some(op) = parse_management(input) {
            tracing::debug!("Resolved '{}' as management op '{}'", input, op);
            return Ok(ResolvedAction::Manage(op));
        }

        self.resolve_invocation(input).await
    }

    /// Resolve input as a macro invocation only: exact name, placeholder
    /// templates, then fuzzy suggestion.
    pub async fn resolve_invocation(&self, input: &str) -> Result<ResolvedAction> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(ResolvedAction::Unrecognized);
        }

        if let Some(found) = self.repository.find_exact(input).await? {
            if !found.has_placeholders() {
                tracing::debug!("Resolved '{}' by exact name", input);
                return Ok(ResolvedAction::Run(ResolvedRun {
                    steps: found.step_texts(),
                    name: found.name,
                    binding: VariableBinding::default(),
                }));
            }
        }

        if let Some(run) = self.match_templates(input).await? {
            return Ok(ResolvedAction::Run(run));
        }

        if let Some((candidate, score)) = self.suggest(input).await? {
            tracing::debug!("Suggesting '{}' for '{}' (score {:.2})", candidate, input, score);
            return Ok(ResolvedAction::Suggest { candidate, score });
        }

        tracing::debug!("Input '{}' is unrecognized", input);
        Ok(ResolvedAction::Unrecognized)
    }

    /// Closest stored name scoring above the fuzzy threshold.
    pub async fn suggest(&self, input: &str) -> Result<Option<(String, f64)>> {
        let all = self.repository.find_all().await?;
        Ok(
            fuzzy::best_match(input, all.iter().map(|m| m.name.as_str()), self.fuzzy_threshold)
                .map(|(name, score)| (name.to_string(), score)),
        )
    }

    async fn match_templates(&self, input: &str) -> Result<Option<ResolvedRun>> {
        let mut matches = Vec::new();

        for candidate in self.repository.find_all_with_placeholders().await? {
            let matcher = match pattern::compile(&candidate.name) {
                Ok(matcher) => matcher,
                Err(e) => {
                    tracing::warn!("Skipping stored macro with bad template: {e}");
                    continue;
                }
            };
            let Some(binding) = matcher.try_match(input) else {
                continue;
            };

            tracing::debug!("Input '{}' matched template '{}'", input, candidate.name);
            let run = ResolvedRun {
                steps: candidate
                    .steps
                    .iter()
                    .map(|step| pattern::substitute(step.as_str(), &binding))
                    .collect(),
                name: candidate.name,
                binding,
            };
            if self.match_policy == MatchPolicy::FirstMatch {
                return Ok(Some(run));
            }
            matches.push(run);
        }

        if matches.len() > 1 {
            return Err(MacroError::AmbiguousMatch {
                input: input.to_string(),
                candidates: matches.into_iter().map(|run| run.name).collect(),
            });
        }
        Ok(matches.pop())
    }
}
