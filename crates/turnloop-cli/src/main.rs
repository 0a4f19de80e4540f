//! turnloop console
//!
//! Runs one of the bundled agents against Ollama or an OpenAI-compatible
//! endpoint. Ctrl-C cancels the model call in flight, or the prompt waiting
//! for input.

mod cli;
mod console;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use turnloop_core::{AgentError, CancellationToken, LlmProvider, transcript};
use turnloop_runtime::{OllamaProvider, OpenAiProvider};
use turnloop_tools::{AgentSettings, Chatbot, DocumentState, Drafter, ReactAgent, prompts};

use crate::cli::{ChatArgs, Cli, Command, DraftArgs, ProviderKind, ReactArgs};
use crate::console::Console;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let provider = connect(cli.provider)?;
    check_provider(provider.as_ref()).await;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted");
            on_interrupt.cancel();
        }
    });

    let settings = cli.settings(cancel);
    match cli.command {
        Command::Chat(args) => chat(provider, &settings, args).await,
        Command::Draft(args) => draft(provider, &settings, args).await,
        Command::React(args) => react(provider, &settings, args).await,
        Command::Models => list_models(provider.as_ref()).await,
    }
}

fn connect(kind: ProviderKind) -> anyhow::Result<Arc<dyn LlmProvider>> {
    Ok(match kind {
        ProviderKind::Ollama => Arc::new(OllamaProvider::from_env()),
        ProviderKind::Openai => Arc::new(
            OpenAiProvider::from_env().context("configuring the OpenAI provider")?,
        ),
    })
}

async fn check_provider(provider: &dyn LlmProvider) {
    match provider.health_check().await {
        Ok(true) => tracing::info!("✓ Model backend reachable"),
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ Model backend not available - calls will fail");
            tracing::warn!("  For Ollama, make sure it is running: ollama serve");
        }
    }
}

async fn list_models(provider: &dyn LlmProvider) -> anyhow::Result<()> {
    let info = provider.info().await?;
    println!("{} (native tool calls: {})", info.name, info.supports_tools);
    for model in info.models {
        println!("  {}", model.id);
    }
    Ok(())
}

async fn chat(
    provider: Arc<dyn LlmProvider>,
    settings: &AgentSettings,
    args: ChatArgs,
) -> anyhow::Result<()> {
    let mut bot = Chatbot::new(provider, settings)?;
    let mut term = Console::stdin(settings.cancel.clone());

    while let Some(input) = term.prompt("Enter: ").await? {
        if console::is_exit(&input) {
            break;
        }
        if input.is_empty() {
            continue;
        }

        match bot.send(&input).await {
            Ok(reply) => println!("\nAI: {reply}\n"),
            Err(e) if e.is_retryable() => report(&e),
            Err(e) => {
                report(&e);
                break;
            }
        }
    }

    let session = bot.finish();
    tracing::info!(
        session = %session.id,
        title = %session.title(),
        messages = session.message_count(),
        "Chat ended"
    );
    transcript::export(&args.log_file, &session.conversation).await?;
    println!("Conversation history saved to {}", args.log_file.display());
    Ok(())
}

async fn draft(
    provider: Arc<dyn LlmProvider>,
    settings: &AgentSettings,
    args: DraftArgs,
) -> anyhow::Result<()> {
    let mut drafter = Drafter::new(provider, settings, DocumentState::in_dir(&args.dir))?;
    let mut term = Console::stdin(settings.cancel.clone());

    println!("\n=== DRAFTER ===\n");
    drafter.start().await?;
    console::show(drafter.session().conversation.messages());

    while !drafter.is_finished() {
        let Some(input) = term
            .prompt("What would you like to do with the document? ")
            .await?
        else {
            break;
        };
        if input.is_empty() {
            continue;
        }

        let seen = drafter.session().conversation.len();
        if let Err(e) = drafter.send(&input).await {
            report(&e);
            break;
        }
        console::show(&drafter.session().conversation.messages()[seen..]);
    }

    if let Some(path) = drafter.document().saved_to() {
        println!("Document saved to {}", path.display());
    }
    println!("\n=== DRAFTER FINISHED ===");
    Ok(())
}

async fn react(
    provider: Arc<dyn LlmProvider>,
    settings: &AgentSettings,
    args: ReactArgs,
) -> anyhow::Result<()> {
    let agent = ReactAgent::new(provider, settings)?;
    let query = args.query.as_deref().unwrap_or(prompts::REACT_DEFAULT_QUERY);

    let run = agent.run(query).await?;
    for message in run.session.conversation.messages() {
        if let Some(text) = console::render(message) {
            println!("{text}\n");
        }
    }
    tracing::debug!(answer = %run.answer, "Finished");
    Ok(())
}

fn report(error: &AgentError) {
    tracing::error!(error = %error, "Turn failed");
    eprintln!("{}", error.user_message());
}
