use std::{io::Write, path::PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines},
    sync::Mutex,
};
use tracing::{debug, error};
use triage_core::{ClarificationPrompter, Dispatcher, TriageConfig, build_dispatcher};

const MENU: &str = "\nHealth Assistant\n  1. Describe symptoms or ask a question\n  2. Exit";

/// Terminal front end for the health triage assistant.
#[derive(Debug, Parser)]
#[command(name = "triage", version, about)]
struct Args {
    /// Condition table (JSON)
    #[arg(long)]
    conditions: Option<PathBuf>,

    /// Labeled intent examples (JSON)
    #[arg(long)]
    intents: Option<PathBuf>,

    /// Minimum confidence that ends disambiguation
    #[arg(long)]
    threshold: Option<f64>,

    /// Maximum clarification prompts before giving up
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Minimum fuzzy score for a condition name match (0-100)
    #[arg(long)]
    match_threshold: Option<f64>,

    /// Handle a single message and exit
    #[arg(long, value_name = "TEXT")]
    once: Option<String>,
}

impl Args {
    /// Flags win over `TRIAGE_*` variables and the config file.
    fn apply(&self, mut config: TriageConfig) -> triage_core::Result<TriageConfig> {
        if let Some(path) = &self.conditions {
            config.conditions_path = path.clone();
        }
        if let Some(path) = &self.intents {
            config.intents_path = path.clone();
        }
        if let Some(threshold) = self.threshold {
            config.confidence_threshold = threshold;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.max_attempts = max_attempts;
        }
        if let Some(match_threshold) = self.match_threshold {
            config.match_threshold = match_threshold;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Line-oriented console shared by the menu and the clarification prompts.
struct Console<R> {
    lines: Mutex<Lines<R>>,
}

impl<R: AsyncBufRead + Unpin + Send> Console<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: Mutex::new(reader.lines()),
        }
    }

    /// Print `prompt` and wait for the next line; `None` at end of input.
    async fn read_line(&self, prompt: &str) -> Option<String> {
        print!("{prompt}\n> ");
        let _ = std::io::stdout().flush();

        match self.lines.lock().await.next_line().await {
            Ok(line) => line,
            Err(e) => {
                error!(error = %e, "Failed to read from stdin");
                None
            }
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> ClarificationPrompter for Console<R> {
    async fn ask(&self, prompt: &str) -> Option<String> {
        let reply = self.read_line(prompt).await;
        debug!(answered = reply.is_some(), "Clarification prompt answered");
        reply
    }
}

async fn run_menu<R: AsyncBufRead + Unpin + Send>(
    dispatcher: &Dispatcher,
    console: &Console<R>,
) -> anyhow::Result<()> {
    loop {
        let Some(choice) = console.read_line(MENU).await else {
            break;
        };

        match choice.trim() {
            "1" => {
                let Some(text) = console.read_line("What would you like to tell me?").await
                else {
                    break;
                };
                let response = dispatcher.handle(&text, console).await;
                println!("{}", response.message());
            }
            "2" => break,
            other => debug!(choice = %other, "Unknown menu choice"),
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn".into());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = args
        .apply(TriageConfig::from_env()?)
        .context("invalid configuration")?;
    let dispatcher = build_dispatcher(&config).context("failed to load triage models")?;

    let console = Console::new(BufReader::new(tokio::io::stdin()));

    if let Some(text) = &args.once {
        let response = dispatcher.handle(text, &console).await;
        println!("{}", response.message());
        return Ok(());
    }

    run_menu(&dispatcher, &console).await
}
