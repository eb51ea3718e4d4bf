//! Advisory classification of command text into risk tiers.
//!
//! Matching is keyword based and can be evaded by obfuscation (variable
//! expansion, aliases, encoding). Dangerous steps are flagged for a stronger
//! confirmation, never blocked.

mod rules;

pub use rules::{SafetyRule, RULES};

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Safe,
    Dangerous,
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskTier::Safe => write!(f, "safe"),
            RiskTier::Dangerous => write!(f, "dangerous"),
        }
    }
}

/// One rule that matched one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub step_index: usize,
    pub label: &'static str,
}

/// Tier plus every (step, rule) pair that made it dangerous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    pub tier: RiskTier,
    pub findings: Vec<Finding>,
}

impl RiskAssessment {
    pub fn is_dangerous(&self) -> bool {
        self.tier == RiskTier::Dangerous
    }

    /// Indices of steps with at least one finding, ascending.
    pub fn dangerous_steps(&self) -> Vec<usize> {
        let mut steps: Vec<usize> = self.findings.iter().map(|f| f.step_index).collect();
        steps.dedup();
        steps
    }

    pub fn labels_for(&self, step_index: usize) -> Vec<&'static str> {
        self.findings
            .iter()
            .filter(|f| f.step_index == step_index)
            .map(|f| f.label)
            .collect()
    }
}

/// Classify an ordered list of step texts.
///
/// Every rule is evaluated against every step; nothing short-circuits, so the
/// caller can show the user everything that matched.
pub fn classify<S: AsRef<str>>(steps: &[S]) -> RiskAssessment {
    let findings: Vec<Finding> = steps
        .iter()
        .enumerate()
        .flat_map(|(step_index, step)| {
            matching_labels(step.as_ref())
                .into_iter()
                .map(move |label| Finding { step_index, label })
        })
        .collect();

    let tier = if findings.is_empty() {
        RiskTier::Safe
    } else {
        RiskTier::Dangerous
    };

    tracing::debug!(
        "Classified {} step(s) as {} ({} finding(s))",
        steps.len(),
        tier,
        findings.len()
    );

    RiskAssessment { tier, findings }
}

/// Labels of every rule matching a single command.
pub fn matching_labels(command: &str) -> Vec<&'static str> {
    RULES
        .iter()
        .filter(|rule| rule.matches(command))
        .map(|rule| rule.label)
        .collect()
}
