//! # nlm
//!
//! Natural-language macros for the shell. Users name a sequence of shell
//! commands in plain words, optionally with `{placeholders}`, and later run it
//! by typing the name.
//!
//! ## Usage
//!
//! ```bash
//! nlm                                   # interactive session
//! nlm do 'remember: "greet {who}" -> echo Hello {who}'
//! nlm do greet world --yes
//! ```
//!
//! ## Modules
//!
//! - `pattern` - Template compilation, matching and placeholder substitution
//! - `safety` - Destructive-command classification
//! - `resolver` - Turns a line of input into a definition, management command or run
//! - `engine` - Sequential step execution with halt-on-failure
//! - `subprocess` - Process plumbing with a mockable runner
//! - `repository` - Macro storage behind an async trait (memory and JSON file)
//! - `session` - Confirmation gate and user-facing dialogue
//! - `config` - Layered configuration (defaults, TOML file, environment)
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod pattern;
pub mod repository;
pub mod resolver;
pub mod safety;
pub mod session;
pub mod subprocess;


pub use config::Config;
pub use engine::{ExecutionEngine, ExecutionResult, FailurePolicy, StepOutcome, Verdict};
pub use error::{MacroError, Result};
pub use model::{MacroDefinition, Step};
pub use repository::{FileRepository, MacroRepository, MemoryRepository, StorageError};
pub use resolver::{MatchPolicy, ResolvedAction, ResolvedRun, Resolver};
pub use safety::{RiskAssessment, RiskTier};
pub use session::{LineOutcome, Session};
