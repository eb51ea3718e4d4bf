//! Where session output goes and where answers come from.

use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal, Write};

use super::confirm;

/// A question the session needs answered before continuing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// Ordinary yes/no
    YesNo(String),
    /// The user must type `token` exactly
    Token { message: String, token: String },
}

impl Prompt {
    pub fn message(&self) -> &str {
        match self {
            Prompt::YesNo(message) | Prompt::Token { message, .. } => message,
        }
    }

    /// Whether a typed reply satisfies this prompt
    pub fn accepts(&self, reply: &str) -> bool {
        match self {
            Prompt::YesNo(_) => confirm::is_affirmative(reply),
            Prompt::Token { token, .. } => confirm::token_matches(reply, token),
        }
    }
}

pub trait Console: Send {
    fn say(&mut self, text: &str);

    /// Ask a question; any failure to get an answer counts as "no".
    fn ask(&mut self, prompt: &Prompt) -> bool;

    /// Next input line, `None` at end of input
    fn read_line(&mut self, prompt: &str) -> Option<String>;
}

/// stdout/stdin console.
///
/// Presets answer prompts without reading: `assume_yes` answers yes/no
/// questions, `token` is offered as the reply to token prompts.
#[derive(Debug, Default)]
pub struct TerminalConsole {
    assume_yes: bool,
    token: Option<String>,
}

impl TerminalConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    fn prompt_stdin(prompt: &str) -> Option<String> {
        print!("{prompt}");
        if let Err(e) = io::stdout().flush() {
            tracing::debug!("Failed to flush stdout: {e}");
        }
        let mut input = String::new();
        match io::stdin().lock().read_line(&mut input) {
            Ok(0) => None,
            Ok(_) => Some(input.trim_end_matches(['\n', '\r']).to_string()),
            Err(e) => {
                tracing::warn!("Failed to read input: {e}");
                None
            }
        }
    }
}

impl Console for TerminalConsole {
    fn say(&mut self, text: &str) {
        println!("{text}");
    }

    fn ask(&mut self, prompt: &Prompt) -> bool {
        match prompt {
            Prompt::YesNo(message) if self.assume_yes => {
                println!("{message} (yes/no): yes");
                return true;
            }
            Prompt::Token { message, token } => {
                if let Some(preset) = &self.token {
                    let accepted = confirm::token_matches(preset, token);
                    println!("{message}: {}", if accepted { "confirmed" } else { "rejected" });
                    return accepted;
                }
            }
            Prompt::YesNo(_) => {}
        }

        if !io::stdin().is_terminal() {
            tracing::debug!("stdin is not a terminal; declining '{}'", prompt.message());
            println!("{} (no input available, declined)", prompt.message());
            return false;
        }

        let suffix = match prompt {
            Prompt::YesNo(_) => " (yes/no): ".to_string(),
            Prompt::Token { token, .. } => format!(" (type {token} to confirm): "),
        };
        Self::prompt_stdin(&format!("{}{suffix}", prompt.message()))
            .is_some_and(|reply| prompt.accepts(&reply))
    }

    fn read_line(&mut self, prompt: &str) -> Option<String> {
        Self::prompt_stdin(prompt)
    }
}

/// Console driven by pre-recorded replies, recording everything said.
///
/// Prompts consume replies in order; when they run out every prompt is
/// declined and `read_line` reports end of input.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    replies: VecDeque<String>,
    lines: VecDeque<String>,
    output: Vec<String>,
    asked: Vec<Prompt>,
}

impl ScriptedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue replies to prompts
    pub fn with_replies<I, S>(mut self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.replies.extend(replies.into_iter().map(Into::into));
        self
    }

    /// Queue input lines for `read_line`
    pub fn with_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lines.extend(lines.into_iter().map(Into::into));
        self
    }

    pub fn output(&self) -> &[String] {
        &self.output
    }

    /// Everything said so far, one entry per line
    pub fn transcript(&self) -> String {
        self.output.join("\n")
    }

    pub fn asked(&self) -> &[Prompt] {
        &self.asked
    }
}

impl Console for ScriptedConsole {
    fn say(&mut self, text: &str) {
        self.output.extend(text.lines().map(str::to_string));
    }

    fn ask(&mut self, prompt: &Prompt) -> bool {
        self.asked.push(prompt.clone());
        self.replies
            .pop_front()
            .is_some_and(|reply| prompt.accepts(&reply))
    }

    fn read_line(&mut self, _prompt: &str) -> Option<String> {
        self.lines.pop_front()
    }
}
