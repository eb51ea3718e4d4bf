use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, trace};
use tracing_subscriber::EnvFilter;

use nlm::config::Config;
use nlm::repository;
use nlm::resolver::{definition::split_steps, ManagementOp};
use nlm::session::{LineOutcome, Session, TerminalConsole};
use nlm::subprocess::{InterruptHandler, TokioProcessRunner};

/// Name shell command sequences in plain words and run them by name
#[derive(Parser)]
#[command(name = "nlm", version)]
#[command(about = "Natural-language macros for the shell", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Macro store to use instead of the configured one
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle one line of input, as if typed in the interactive session
    Do {
        /// The line: a definition, a management command or a macro name
        #[arg(required = true, num_args = 1..)]
        line: Vec<String>,

        /// Answer yes to yes/no prompts
        #[arg(short, long)]
        yes: bool,

        /// Token to supply when a dangerous macro asks for confirmation
        #[arg(long, value_name = "TOKEN")]
        confirm: Option<String>,
    },
    /// List stored macros
    List,
    /// Show one macro
    Show {
        /// Macro name
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
    /// Delete a macro
    Delete {
        /// Macro name
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Classify commands without running them (separate several with ';')
    Check {
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        commands: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref());

    let log_level = match cli.verbose {
        0 => config
            .as_ref()
            .map(|c| c.log_level.clone())
            .unwrap_or_else(|_| "info".to_string()),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(cli.verbose >= 2)
        .with_thread_ids(cli.verbose >= 3)
        .with_line_number(cli.verbose >= 3)
        .init();

    debug!("nlm started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    }
}

/// Dispatch the subcommand. `Ok(false)` means the command ran but did not
/// succeed, which maps to exit status 1.
async fn run(cli: Cli, mut config: Config) -> anyhow::Result<bool> {
    if let Some(store) = cli.store {
        config.store_path = store;
    }

    let repository = repository::open(&config)
        .await
        .with_context(|| format!("Failed to open macro store {}", config.store_path.display()))?;
    let interrupts = InterruptHandler::exit_on_idle();
    interrupts
        .install()
        .context("Failed to install the Ctrl-C handler")?;
    let runner = Arc::new(TokioProcessRunner::new().with_interrupts(interrupts));

    match cli.command {
        None => {
            let mut session = Session::new(&config, repository, runner, TerminalConsole::new());
            session.run_interactive().await;
            Ok(true)
        }
        Some(Commands::Do { line, yes, confirm }) => {
            let console = TerminalConsole::new().assume_yes(yes).with_token(confirm);
            let mut session = Session::new(&config, repository, runner, console);
            let outcome = session.handle_line(&line.join(" ")).await?;
            Ok(match outcome {
                LineOutcome::Ran(result) => result.is_success(),
                LineOutcome::Unrecognized | LineOutcome::Cancelled => false,
                LineOutcome::Handled | LineOutcome::Exit => true,
            })
        }
        Some(Commands::List) => {
            let mut session = Session::new(&config, repository, runner, TerminalConsole::new());
            session.manage(ManagementOp::List).await?;
            Ok(true)
        }
        Some(Commands::Show { name }) => {
            let mut session = Session::new(&config, repository, runner, TerminalConsole::new());
            session.manage(ManagementOp::Show(name.join(" "))).await?;
            Ok(true)
        }
        Some(Commands::Delete { name, yes }) => {
            let console = TerminalConsole::new().assume_yes(yes);
            let mut session = Session::new(&config, repository, runner, console);
            let outcome = session.manage(ManagementOp::Delete(name.join(" "))).await?;
            Ok(!matches!(outcome, LineOutcome::Cancelled))
        }
        Some(Commands::Check { commands }) => {
            let steps = split_steps(&commands.join(" "))?;
            let mut session = Session::new(&config, repository, runner, TerminalConsole::new());
            session.check(&steps);
            Ok(true)
        }
    }
}
