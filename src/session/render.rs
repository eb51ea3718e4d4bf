//! Text shown to the user. Everything here is a pure function of its input.

use crate::engine::{ExecutionResult, StepOutcome, StepStatus};
use crate::model::MacroDefinition;
use crate::safety::RiskAssessment;

pub fn help() -> String {
    [
        "Usage:",
        "  remember: \"name\" -> cmd1 ; cmd2      Define a macro",
        "  remember \"name\": cmd1 ; cmd2         Same, alternate form",
        "  remember: \"greet {who}\" -> echo Hi {who}",
        "                                       Placeholders are filled from the invocation",
        "  <macro name>                         Run a macro",
        "  macros list | list macros            List macros",
        "  macros show <name>                   Show a macro's steps",
        "  macros delete <name>                 Delete a macro",
        "  macros tag <name> #tag [#tag ...]    Tag a macro",
        "  macros search <text>                 Search names, descriptions and tags",
        "  macros stats                         Usage statistics",
        "  help | ?                             This help",
        "  exit | quit | q                      Leave",
    ]
    .join("\n")
}

/// Numbered step list, one line per step
pub fn steps<S: AsRef<str>>(steps: &[S]) -> String {
    steps
        .iter()
        .enumerate()
        .map(|(i, step)| format!("  {}. {}", i + 1, step.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn preview<S: AsRef<str>>(name: &str, step_list: &[S]) -> String {
    format!("Macro: {name}\n{}", steps(step_list))
}

/// Every finding, grouped by step. Empty for safe assessments.
pub fn warning<S: AsRef<str>>(assessment: &RiskAssessment, step_list: &[S]) -> String {
    if !assessment.is_dangerous() {
        return String::new();
    }
    let mut lines = vec!["[!] WARNING: dangerous commands detected".to_string()];
    for index in assessment.dangerous_steps() {
        let command = step_list.get(index).map(|s| s.as_ref()).unwrap_or("");
        lines.push(format!(
            "  step {}: {} ({})",
            index + 1,
            command,
            assessment.labels_for(index).join(", ")
        ));
    }
    lines.join("\n")
}

pub fn outcome(outcome: &StepOutcome, total: usize) -> String {
    let mut lines = vec![format!("[{}/{}] {}", outcome.index + 1, total, outcome.command)];
    for stream in [&outcome.stdout, &outcome.stderr] {
        let text = stream.trim_end();
        if !text.is_empty() {
            lines.extend(text.lines().map(|l| format!("    {l}")));
        }
    }
    lines.push(match &outcome.status {
        StepStatus::Succeeded => "  ok".to_string(),
        StepStatus::Failed(failure) => format!("  FAILED: {failure}"),
    });
    lines.join("\n")
}

pub fn verdict(result: &ExecutionResult) -> String {
    if result.is_success() {
        format!("[OK] {}", result.verdict)
    } else {
        format!("[X] {}", result.verdict)
    }
}

fn step_count(count: usize) -> String {
    format!("{count} step{}", if count == 1 { "" } else { "s" })
}

pub fn macro_list(title: &str, macros: &[MacroDefinition]) -> String {
    let mut lines = vec![format!("{title} ({}):", macros.len())];
    for m in macros {
        lines.push(format!("  * {}", m.name));
        lines.push(format!("    {} ({})", m.description, step_count(m.steps.len())));
    }
    lines.join("\n")
}

pub fn macro_details(m: &MacroDefinition) -> String {
    let mut lines = vec![
        format!("Macro: {}", m.name),
        format!("Description: {}", m.description),
        format!("Created: {}", m.created.format("%Y-%m-%d %H:%M UTC")),
    ];
    if !m.tags.is_empty() {
        lines.push(format!("Tags: {}", m.tags.join(", ")));
    }
    lines.push(format!("Runs: {}", m.run_count));
    lines.push("Steps:".to_string());
    lines.push(steps(&m.step_texts()));
    lines.join("\n")
}

pub fn saved(m: &MacroDefinition) -> String {
    format!(
        "[OK] Macro '{}' saved\n  Description: {}\n  Steps: {}",
        m.name,
        m.description,
        m.steps.len()
    )
}

pub fn stats(macros: &[MacroDefinition]) -> String {
    let mut lines = vec![format!("Total macros: {}", macros.len())];

    if let Some(top) = macros
        .iter()
        .filter(|m| m.run_count > 0)
        .max_by_key(|m| m.run_count)
    {
        lines.push(format!("Most used: {} ({} runs)", top.name, top.run_count));
    }

    if let Some((recent, at)) = macros
        .iter()
        .filter_map(|m| m.last_run.map(|at| (m, at)))
        .max_by_key(|(_, at)| *at)
    {
        lines.push(format!(
            "Most recent: {} ({})",
            recent.name,
            at.format("%Y-%m-%d %H:%M UTC")
        ));
    }

    let total_runs: u64 = macros.iter().map(|m| m.run_count).sum();
    lines.push(format!("Total runs: {total_runs}"));
    lines.join("\n")
}
