//! The confirmation gate between resolution and execution.
//!
//! Safe runs need an ordinary yes/no; dangerous runs need the exact
//! [`DANGER_TOKEN`], so a reflexive "y" is never enough.

use crate::safety::RiskAssessment;

use super::console::Prompt;

pub const DANGER_TOKEN: &str = "RUN";

/// Strength of confirmation a run needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationLevel {
    /// No prompt at all
    Automatic,
    YesNo,
    Token,
}

/// Confirmation policy knobs from the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub safety_checks: bool,
    pub auto_confirm_safe: bool,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            safety_checks: true,
            auto_confirm_safe: false,
        }
    }
}

impl ConfirmationPolicy {
    /// With safety checks off, every run is confirmed as if it were safe.
    pub fn level_for(&self, assessment: &RiskAssessment) -> ConfirmationLevel {
        if self.safety_checks && assessment.is_dangerous() {
            ConfirmationLevel::Token
        } else if self.auto_confirm_safe {
            ConfirmationLevel::Automatic
        } else {
            ConfirmationLevel::YesNo
        }
    }
}

/// The prompt for a run of `step_count` steps, if one is needed
pub fn run_prompt(level: ConfirmationLevel, step_count: usize) -> Option<Prompt> {
    let plural = if step_count == 1 { "" } else { "s" };
    match level {
        ConfirmationLevel::Automatic => None,
        ConfirmationLevel::YesNo => Some(Prompt::YesNo(format!(
            "Run {step_count} step{plural}?"
        ))),
        ConfirmationLevel::Token => Some(Prompt::Token {
            message: format!(
                "This macro contains dangerous commands. Type {DANGER_TOKEN} to execute {step_count} step{plural}"
            ),
            token: DANGER_TOKEN.to_string(),
        }),
    }
}

pub fn is_affirmative(reply: &str) -> bool {
    matches!(reply.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Exact, case-sensitive match after trimming surrounding whitespace
pub fn token_matches(reply: &str, token: &str) -> bool {
    reply.trim() == token
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::classify;

    #[test]
    fn test_levels() {
        let safe = classify(&["ls"]);
        let dangerous = classify(&["sudo rm -rf /"]);

        let default = ConfirmationPolicy::default();
        assert_eq!(default.level_for(&safe), ConfirmationLevel::YesNo);
        assert_eq!(default.level_for(&dangerous), ConfirmationLevel::Token);

        let auto = ConfirmationPolicy {
            auto_confirm_safe: true,
            ..ConfirmationPolicy::default()
        };
        assert_eq!(auto.level_for(&safe), ConfirmationLevel::Automatic);
        assert_eq!(auto.level_for(&dangerous), ConfirmationLevel::Token);

        let unchecked = ConfirmationPolicy {
            safety_checks: false,
            auto_confirm_safe: false,
        };
        assert_eq!(unchecked.level_for(&dangerous), ConfirmationLevel::YesNo);
    }

    #[test]
    fn test_run_prompt() {
        assert_eq!(run_prompt(ConfirmationLevel::Automatic, 2), None);
        assert_eq!(
            run_prompt(ConfirmationLevel::YesNo, 1),
            Some(Prompt::YesNo("Run 1 step?".to_string()))
        );
        match run_prompt(ConfirmationLevel::Token, 3) {
            Some(Prompt::Token { token, message }) => {
                assert_eq!(token, "RUN");
                assert!(message.contains("3 steps"));
            }
            other => panic!("unexpected prompt {other:?}"),
        }
    }

    #[test]
    fn test_replies() {
        assert!(is_affirmative("Y"));
        assert!(is_affirmative("yes\n"));
        assert!(!is_affirmative("yep"));
        assert!(token_matches(" RUN\n", "RUN"));
        assert!(!token_matches("RUN!", "RUN"));
    }
}
