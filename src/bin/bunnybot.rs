//! Console host for BunnyBot.
//!
//! Each stdin line is one transcript; spoken segments are printed to stdout.
//! Replies come from an OpenAI-compatible server. All tracing output goes to
//! stderr so that stdout only carries what the agent says.

use async_trait::async_trait;
use bunnybot::classify::KeywordClassifier;
use bunnybot::llm::ApiLlm;
use bunnybot::memory::{HashingEmbedder, InMemoryMemoryStore};
use bunnybot::status::{HttpStatusSink, LogStatusSink, StatusSink};
use bunnybot::{AgentConfig, Collaborators, SpeechSynthesizer, TurnOrchestrator};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// BunnyBot: a voice conversational agent, driven from the console.
#[derive(Parser)]
#[command(name = "bunnybot", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Chat using stdin as the microphone and stdout as the speaker.
    Chat,
    /// Write the default configuration to the config path and exit.
    InitConfig,
}

/// Prints each segment and pauses roughly as long as speaking it would take.
struct ConsoleSpeaker {
    name: String,
}

#[async_trait]
impl SpeechSynthesizer for ConsoleSpeaker {
    async fn synthesize(&self, segment: &str) -> bunnybot::Result<()> {
        println!("{}: {segment}", self.name);
        let words = segment.split_whitespace().count() as u64;
        tokio::time::sleep(Duration::from_millis(250 * words.max(1))).await;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bunnybot=info")),
        )
        .init();

    let cli = Cli::parse();
    let path = cli.config.unwrap_or_else(AgentConfig::default_config_path);

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => run_chat(load_config(&path)?).await,
        Command::InitConfig => {
            AgentConfig::default().save_to_file(&path)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
    }
}

/// Load `path` if it exists, otherwise fall back to defaults.
fn load_config(path: &Path) -> anyhow::Result<AgentConfig> {
    if path.exists() {
        info!("loading config from {}", path.display());
        Ok(AgentConfig::from_file(path)?)
    } else {
        Ok(AgentConfig::default())
    }
}

async fn run_chat(config: AgentConfig) -> anyhow::Result<()> {
    println!("BunnyBot v{}", env!("CARGO_PKG_VERSION"));

    let status: Arc<dyn StatusSink> = match &config.status.url {
        Some(url) => Arc::new(HttpStatusSink::new(url)?),
        None => Arc::new(LogStatusSink),
    };
    let embedder = Arc::new(HashingEmbedder::default());
    let collaborators = Collaborators {
        synthesizer: Arc::new(ConsoleSpeaker {
            name: config.conversation.assistant_name.clone(),
        }),
        completion: Arc::new(ApiLlm::new(&config.llm)?),
        classifier: Arc::new(KeywordClassifier),
        memory: Arc::new(InMemoryMemoryStore::new(embedder.clone())),
        embedder,
        status,
    };

    let (mut orchestrator, transcripts) = TurnOrchestrator::new(config, collaborators);
    if let Err(e) = orchestrator.seed_memory().await {
        warn!("could not seed memory: {e}");
    }

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, shutting down...");
            cancel_clone.cancel();
        }
    });

    // Dropping the sender at EOF ends the orchestrator loop.
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if transcripts.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("stdin read failed: {e}");
                    break;
                }
            }
        }
    });

    println!("\nReady! Type what you would say. Press Ctrl+C to stop.\n");
    orchestrator.run(cancel).await;
    Ok(())
}
