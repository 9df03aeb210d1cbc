//! Command-line interface for inngestabot.
//!
//! Provides commands for serving the orchestrator endpoint, listing
//! functions, submitting events, and running a workflow locally against a
//! memo file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{DiscordClient, EventEmitter, HttpCompletionBackend, InngestClient};
use crate::config::{self, ResolvedConfig};
use crate::core::{InvokeBody, ProtocolAdapter, StepMemo, StepOutcome, WorkflowRegistry};
use crate::domain::{Event, RunState};
use crate::relay::{strip_mentions, InboundMessage, MessageRelay, RelayOutcome};
use crate::workflows::build_registry;

/// inngestabot - chat relay with durable workflow steps
#[derive(Parser, Debug)]
#[command(name = "inngestabot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the orchestrator endpoint over HTTP
    Serve {
        /// Address to bind to (defaults to the configured address)
        #[arg(short, long)]
        address: Option<String>,
    },

    /// Print registration descriptors for all workflows
    Functions,

    /// Submit a message.received event for a chat message
    Send {
        /// Channel the message was posted in
        #[arg(long)]
        channel: String,

        /// Message ID
        #[arg(long)]
        message: String,

        /// Author user ID
        #[arg(long)]
        author: String,

        /// Message content (mention tokens are stripped)
        #[arg(long)]
        content: String,
    },

    /// Run a workflow locally for an event, resuming from a memo file
    Run {
        /// Event JSON file
        #[arg(short, long)]
        event: PathBuf,

        /// Memo JSON file from a previous run
        #[arg(short, long)]
        memo: Option<PathBuf>,

        /// Where to write the updated memo (defaults to --memo, else stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Function ID (defaults to the first workflow triggered by the event)
        #[arg(short, long)]
        function: Option<String>,
    },

    /// Show resolved configuration (secrets redacted)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let cfg = config::config()?;

        match self.command {
            Commands::Serve { address } => {
                let address = address.unwrap_or_else(|| cfg.bind_address.clone());
                let adapter = build_adapter(cfg)?;
                crate::server::serve(&address, Arc::new(adapter)).await
            }
            Commands::Functions => list_functions(cfg),
            Commands::Send {
                channel,
                message,
                author,
                content,
            } => send_message(cfg, channel, message, author, content).await,
            Commands::Run {
                event,
                memo,
                out,
                function,
            } => run_local(cfg, &event, memo, out, function).await,
            Commands::Config => show_config(cfg),
        }
    }
}

/// Registry wired to the real chat platform and completion backend
fn registry_for(cfg: &ResolvedConfig) -> Result<WorkflowRegistry> {
    let chat = DiscordClient::with_api_base(cfg.require_discord_token()?, &cfg.discord_api_base);
    let backend = HttpCompletionBackend::new(cfg.require_backend_endpoint()?);

    Ok(build_registry(
        Arc::new(chat),
        Arc::new(backend),
        &cfg.thinking_reaction,
    )?)
}

fn orchestrator_client(cfg: &ResolvedConfig) -> Result<InngestClient> {
    let client = InngestClient::new(&cfg.inngest_base_url, cfg.require_event_key()?);
    Ok(match cfg.signing_key {
        Some(ref key) => client.with_signing_key(key),
        None => client,
    })
}

/// Protocol adapter for `serve`; registration is forwarded only when an
/// event key is configured
pub fn build_adapter(cfg: &ResolvedConfig) -> Result<ProtocolAdapter> {
    let registry = Arc::new(registry_for(cfg)?);
    let adapter = ProtocolAdapter::new(registry, cfg.adapter_settings());

    Ok(if cfg.event_key.is_some() {
        adapter.with_registrar(Arc::new(orchestrator_client(cfg)?))
    } else {
        adapter
    })
}

fn list_functions(cfg: &ResolvedConfig) -> Result<()> {
    // Listing never calls out, so unset secrets are fine here
    let chat = DiscordClient::with_api_base(
        cfg.discord_token.clone().unwrap_or_default(),
        &cfg.discord_api_base,
    );
    let backend = HttpCompletionBackend::new(cfg.backend_endpoint.clone().unwrap_or_default());
    let registry = build_registry(Arc::new(chat), Arc::new(backend), &cfg.thinking_reaction)?;

    println!("{}", serde_json::to_string_pretty(&registry.descriptors())?);
    Ok(())
}

async fn send_message(
    cfg: &ResolvedConfig,
    channel: String,
    message: String,
    author: String,
    content: String,
) -> Result<()> {
    let emitter: Arc<dyn EventEmitter> = Arc::new(orchestrator_client(cfg)?);
    let bot_id = cfg.require_bot_id()?.to_string();

    let relay = MessageRelay::new(bot_id.clone(), emitter);
    let inbound = InboundMessage {
        id: message,
        channel_id: channel,
        author_id: author,
        content,
        // Sending by hand always targets the bot
        mentioned_user_ids: vec![bot_id],
        is_from_bot: false,
    };
    let stripped = strip_mentions(&inbound.content);

    match relay.relay(inbound).await? {
        RelayOutcome::Submitted => eprintln!("[Event submitted: {:?}]", stripped),
        other => eprintln!("[Message not relayed: {:?}]", other),
    }
    Ok(())
}

async fn run_local(
    cfg: &ResolvedConfig,
    event_path: &Path,
    memo_path: Option<PathBuf>,
    out: Option<PathBuf>,
    function: Option<String>,
) -> Result<()> {
    let event: Event = read_json(event_path)?;
    let memo: StepMemo = match memo_path {
        Some(ref path) if path.exists() => read_json(path)?,
        _ => StepMemo::new(),
    };

    let adapter = ProtocolAdapter::new(Arc::new(registry_for(cfg)?), cfg.adapter_settings());
    let fn_id = match function {
        Some(id) => id,
        None => adapter
            .registry()
            .lookup_by_trigger(&event.name)
            .first()
            .map(|d| d.id.clone())
            .with_context(|| format!("No workflow is triggered by '{}'", event.name))?,
    };

    let report = adapter
        .invoke(
            &fn_id,
            None,
            InvokeBody {
                event,
                memo,
                run_id: None,
            },
        )
        .await?;

    let memo_json = serde_json::to_string_pretty(&report.memo)?;
    match out.or(memo_path) {
        Some(path) => std::fs::write(&path, memo_json)
            .with_context(|| format!("Failed to write memo: {}", path.display()))?,
        None => println!("{}", memo_json),
    }

    eprintln!("Steps:");
    for line in memo_summary(&report.memo, &report.steps_executed) {
        eprintln!("  {}", line);
    }
    match report.state {
        RunState::Completed { result } => {
            eprintln!("\n[Run {} completed: {}]", report.run_id, result);
        }
        RunState::Failed { step, failure } => {
            eprintln!(
                "\n[Run {} failed at step {}: {}]",
                report.run_id,
                step.as_deref().unwrap_or("(none)"),
                failure.message
            );
            std::process::exit(1);
        }
    }

    Ok(())
}

/// One line per recorded step: whether it ran now or came from the memo,
/// and how it ended
fn memo_summary(memo: &StepMemo, executed: &[String]) -> Vec<String> {
    memo.iter()
        .map(|(step, outcome)| {
            let origin = if executed.iter().any(|s| s == step) {
                "ran"
            } else {
                "memoized"
            };
            let status = match outcome {
                StepOutcome::Completed(_) => "completed".to_string(),
                StepOutcome::Failed(failure) => format!("failed: {}", failure.message),
            };
            format!("{:<16} {:<8} {}", step, origin, status)
        })
        .collect()
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn show_config(cfg: &ResolvedConfig) -> Result<()> {
    println!("Inngestabot Configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using env and defaults)".to_string())
    );
    println!("Mode:        {}", if cfg.production { "production" } else { "dev" });
    println!();
    for (name, value) in cfg.redacted_summary() {
        println!("  {:<22} {}", name, value);
    }
    Ok(())
}
