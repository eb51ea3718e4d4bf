//! Session controller: drives resolution, confirmation and execution for one
//! line of input at a time and reports back through a [`Console`].

pub mod confirm;
pub mod console;
pub mod render;


pub use confirm::{ConfirmationLevel, ConfirmationPolicy, DANGER_TOKEN};
pub use console::{Console, Prompt, ScriptedConsole, TerminalConsole};

use std::sync::Arc;

use crate::config::Config;
use crate::engine::{ExecutionEngine, ExecutionResult, FailurePolicy};
use crate::error::{MacroError, Result};
use crate::model::MacroDefinition;
use crate::repository::MacroRepository;
use crate::resolver::{ManagementOp, ResolvedAction, ResolvedRun, Resolver};
use crate::safety;
use crate::subprocess::ProcessRunner;

const PROMPT: &str = "nlm> ";

/// What handling one line amounted to
#[derive(Debug)]
pub enum LineOutcome {
    /// Nothing ran (definition, management, help, declined suggestion)
    Handled,
    /// A macro reached the execution engine
    Ran(ExecutionResult),
    /// The user declined a confirmation
    Cancelled,
    Unrecognized,
    Exit,
}

pub struct Session<C: Console> {
    resolver: Resolver,
    engine: ExecutionEngine,
    console: C,
    failure_policy: FailurePolicy,
    confirmation: ConfirmationPolicy,
}

impl<C: Console> Session<C> {
    pub fn new(
        config: &Config,
        repository: Arc<dyn MacroRepository>,
        runner: Arc<dyn ProcessRunner>,
        console: C,
    ) -> Self {
        Self {
            resolver: Resolver::from_config(config, repository),
            engine: ExecutionEngine::from_config(config, runner),
            console,
            failure_policy: config.on_error,
            confirmation: ConfirmationPolicy {
                safety_checks: config.safety_checks,
                auto_confirm_safe: config.auto_confirm_safe,
            },
        }
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    fn repository(&self) -> &Arc<dyn MacroRepository> {
        self.resolver.repository()
    }

    /// Read-eval loop until end of input or an exit command. Errors are
    /// reported and the loop continues.
    pub async fn run_interactive(&mut self) {
        self.console
            .say("nlm: natural-language macros. Type 'help' for usage.");
        while let Some(line) = self.console.read_line(PROMPT) {
            match self.handle_line(&line).await {
                Ok(LineOutcome::Exit) => break,
                Ok(_) => {}
                Err(e) => self.report_error(&e),
            }
        }
        self.console.say("Goodbye!");
    }

    pub fn report_error(&mut self, error: &MacroError) {
        tracing::debug!("Line failed: {error:?}");
        self.console.say(&format!("[X] {error}"));
    }

    /// Handle one line of input.
    pub async fn handle_line(&mut self, line: &str) -> Result<LineOutcome> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(LineOutcome::Handled);
        }

        match line.to_lowercase().as_str() {
            "exit" | "quit" | "q" => return Ok(LineOutcome::Exit),
            "help" | "?" => {
                self.console.say(&render::help());
                return Ok(LineOutcome::Handled);
            }
            _ => {}
        }

        let action = self.resolver.resolve(line).await?;
        match action {
            ResolvedAction::Define(definition) => self.define(definition).await,
            ResolvedAction::Manage(op) => self.manage(op).await,
            ResolvedAction::Run(run) => self.run(run).await,
            ResolvedAction::Suggest { candidate, .. } => self.offer_suggestion(&candidate).await,
            ResolvedAction::Unrecognized => {
                self.console.say(&format!(
                    "[X] Unrecognized input: '{line}'. Type 'help' for usage."
                ));
                Ok(LineOutcome::Unrecognized)
            }
        }
    }

    async fn define(&mut self, definition: MacroDefinition) -> Result<LineOutcome> {
        if self.repository().find_exact(&definition.name).await?.is_some() {
            return Err(MacroError::DuplicateName(definition.name));
        }

        let steps = definition.step_texts();
        let assessment = safety::classify(&steps);
        if assessment.is_dangerous() && self.confirmation.safety_checks {
            self.console.say(&render::warning(&assessment, &steps));
            let prompt = Prompt::YesNo("Do you still want to save this macro?".to_string());
            if !self.console.ask(&prompt) {
                self.console.say("Macro not saved.");
                return Ok(LineOutcome::Cancelled);
            }
        }

        self.repository().insert(definition.clone()).await?;
        tracing::info!("Saved macro '{}'", definition.name);
        self.console.say(&render::saved(&definition));
        Ok(LineOutcome::Handled)
    }

    /// Preview, classify, confirm, execute, report, then record the run.
    pub async fn run(&mut self, run: ResolvedRun) -> Result<LineOutcome> {
        self.console.say(&render::preview(&run.name, &run.steps));

        let assessment = safety::classify(&run.steps);
        if assessment.is_dangerous() {
            self.console.say(&render::warning(&assessment, &run.steps));
        }

        let level = self.confirmation.level_for(&assessment);
        if let Some(prompt) = confirm::run_prompt(level, run.steps.len()) {
            if !self.console.ask(&prompt) {
                self.console.say("Cancelled.");
                return Ok(LineOutcome::Cancelled);
            }
        }

        let result = self.engine.execute(&run.steps, self.failure_policy).await;
        for outcome in &result.outcomes {
            self.console.say(&render::outcome(outcome, run.steps.len()));
        }
        self.console.say(&render::verdict(&result));

        if let Err(e) = self.repository().record_run(&run.name).await {
            tracing::warn!("Failed to record run of '{}': {e}", run.name);
        }
        Ok(LineOutcome::Ran(result))
    }

    async fn offer_suggestion(&mut self, candidate: &str) -> Result<LineOutcome> {
        let prompt = Prompt::YesNo(format!("Did you mean '{candidate}'?"));
        if !self.console.ask(&prompt) {
            return Ok(LineOutcome::Cancelled);
        }

        let found = self
            .repository()
            .find_exact(candidate)
            .await?
            .ok_or_else(|| MacroError::NotFound(candidate.to_string()))?;
        if found.has_placeholders() {
            self.console.say(&format!(
                "'{}' takes parameters; type it with values filled in.",
                found.name
            ));
            return Ok(LineOutcome::Handled);
        }

        let action = self.resolver.resolve_invocation(&found.name).await?;
        match action {
            ResolvedAction::Run(run) => self.run(run).await,
            _ => Err(MacroError::NotFound(found.name)),
        }
    }

    /// Carry out a management command.
    pub async fn manage(&mut self, op: ManagementOp) -> Result<LineOutcome> {
        tracing::debug!("Management op: {op}");
        match op {
            ManagementOp::List => {
                let macros = self.repository().find_all().await?;
                if macros.is_empty() {
                    self.console.say("No macros defined yet.");
                    self.console
                        .say("Try: remember: \"example\" -> echo Hello");
                } else {
                    self.console.say(&render::macro_list("Macros", &macros));
                }
            }
            ManagementOp::Show(name) => {
                let existing = self.repository().find_exact(&name).await?;
                let found = match existing {
                    Some(found) => found,
                    None => {
                        let (candidate, _) = self
                            .resolver
                            .suggest(&name)
                            .await?
                            .ok_or_else(|| MacroError::NotFound(name.clone()))?;
                        self.console.say(&format!("Did you mean '{candidate}'?"));
                        self.repository()
                            .find_exact(&candidate)
                            .await?
                            .ok_or(MacroError::NotFound(candidate))?
                    }
                };
                self.console.say(&render::macro_details(&found));
            }
            ManagementOp::Delete(name) => {
                let found = self
                    .repository()
                    .find_exact(&name)
                    .await?
                    .ok_or_else(|| MacroError::NotFound(name.clone()))?;
                let prompt = Prompt::YesNo(format!("Delete macro '{}'?", found.name));
                if !self.console.ask(&prompt) {
                    self.console.say("Cancelled.");
                    return Ok(LineOutcome::Cancelled);
                }
                self.repository().delete(&found.name).await?;
                tracing::info!("Deleted macro '{}'", found.name);
                self.console
                    .say(&format!("[OK] Macro '{}' deleted.", found.name));
            }
            ManagementOp::Edit(name) => {
                self.console.say(&format!(
                    "Editing is not supported. Delete '{name}' and define it again."
                ));
            }
            ManagementOp::Search(query) => {
                let found = self.repository().search(&query).await?;
                if found.is_empty() {
                    self.console.say(&format!("No macros match '{query}'."));
                } else {
                    self.console.say(&render::macro_list(
                        &format!("Macros matching '{query}'"),
                        &found,
                    ));
                }
            }
            ManagementOp::Tag { name, tags } => {
                let tagged = self.repository().add_tags(&name, &tags).await?;
                tracing::info!("Tagged macro '{}' with {:?}", tagged.name, tags);
                self.console.say(&format!(
                    "[OK] Macro '{}' tags: {}",
                    tagged.name,
                    tagged.tags.join(", ")
                ));
            }
            ManagementOp::Stats => {
                let macros = self.repository().find_all().await?;
                self.console.say(&render::stats(&macros));
            }
        }
        Ok(LineOutcome::Handled)
    }

    /// Classify literal commands and print the assessment.
    pub fn check(&mut self, commands: &[String]) -> safety::RiskAssessment {
        let assessment = safety::classify(commands);
        if assessment.is_dangerous() {
            self.console.say(&render::warning(&assessment, commands));
        } else {
            self.console
                .say(&format!("safe: no dangerous patterns in {} command(s)", commands.len()));
        }
        assessment
    }
}
