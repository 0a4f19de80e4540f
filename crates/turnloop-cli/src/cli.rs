use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use turnloop_core::{CancellationToken, GenerationOptions, HistoryWindow};
use turnloop_tools::AgentSettings;

#[derive(Debug, Parser)]
#[command(name = "turnloop", version, about = "Run the turnloop console agents")]
pub struct Cli {
    /// Model backend.
    #[arg(long, value_enum, default_value_t = ProviderKind::Ollama)]
    pub provider: ProviderKind,

    /// Model name passed to the backend.
    #[arg(long, env = "TURNLOOP_MODEL")]
    pub model: Option<String>,

    /// Deadline for a single model call, in seconds.
    #[arg(long, default_value_t = 120)]
    pub timeout_secs: u64,

    /// Model calls allowed per turn.
    #[arg(long, default_value_t = 10)]
    pub max_iterations: usize,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    Ollama,
    Openai,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Free-form chat that remembers earlier messages
    Chat(ChatArgs),
    /// Draft a document with `update` and `save`
    Draft(DraftArgs),
    /// Answer one arithmetic query step by step
    React(ReactArgs),
    /// List the models the backend offers
    Models,
}

#[derive(Debug, Args)]
pub struct ChatArgs {
    /// Messages kept before the oldest are dropped.
    #[arg(long, default_value_t = 10)]
    pub history_max: usize,

    /// Messages dropped at once when the window overflows.
    #[arg(long, default_value_t = 2)]
    pub history_drop: usize,

    /// Where the transcript is written on exit.
    #[arg(long, default_value = "logging.txt")]
    pub log_file: PathBuf,
}

#[derive(Debug, Args)]
pub struct DraftArgs {
    /// Directory saved documents are written to.
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,
}

#[derive(Debug, Args)]
pub struct ReactArgs {
    /// Query to answer; a built-in example is used when omitted.
    pub query: Option<String>,
}

impl Cli {
    pub fn settings(&self, cancel: CancellationToken) -> AgentSettings {
        let mut generation = GenerationOptions::default();
        if let Some(model) = &self.model {
            generation.model.clone_from(model);
        }

        let history = match &self.command {
            Command::Chat(args) => HistoryWindow {
                max_messages: args.history_max,
                drop_count: args.history_drop,
            },
            _ => HistoryWindow::default(),
        };

        AgentSettings {
            generation,
            max_iterations: self.max_iterations,
            timeout: Duration::from_secs(self.timeout_secs),
            history,
            cancel,
        }
    }
}
