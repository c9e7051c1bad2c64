//! Chat with a persona from the terminal.
//!
//! Reads the OpenRouter API key from the `OPENROUTER_KEY` environment
//! variable. Log verbosity follows `MIMIC_LOG` (or `RUST_LOG`).
//!
//! # Examples
//!
//! ```sh
//! # Interactive session with the configured persona and preset
//! mimic --name "John Doe" --birthday 1970-01-01 --sex Male --race Caucasian
//!
//! # One-shot prompt with a different preset
//! mimic --name Ada --birthday 1990-05-02 --sex Female --race Other \
//!   --preset creative --prompt "Tell me about your day."
//!
//! # Debug logging, including every summarization pass
//! MIMIC_LOG=mimic_rs=debug mimic --name Ada --birthday 1990-05-02 --sex Female --race Asian
//! ```

use clap::Parser;
use mimic_rs::agent::{AgentConfig, LoggingHandler, PersonaAgent, Race, Sex, UserProfile};
use mimic_rs::memory::LlmAnalyzers;
use mimic_rs::{MimicError, OpenRouterClient};
use std::io::Write;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Chat with a persona-driven language model.
#[derive(Parser)]
#[command(name = "mimic")]
struct Cli {
    // ── Locations ──────────────────────────────────────────────
    /// Directory holding config.json and presets.json
    #[arg(long, default_value = "configs")]
    config_dir: PathBuf,

    /// Directory holding one sub-directory per persona
    #[arg(long, default_value = "persona")]
    persona_dir: PathBuf,

    /// Directory chat logs are written to
    #[arg(long, default_value = "chat_logs")]
    chat_logs: PathBuf,

    /// Generation preset (defaults to the one in config.json)
    #[arg(long)]
    preset: Option<String>,

    // ── User profile ───────────────────────────────────────────
    /// Your name
    #[arg(long)]
    name: String,

    /// Your birthday, e.g. 1970-01-01
    #[arg(long)]
    birthday: String,

    /// Male, Female or Non-binary
    #[arg(long)]
    sex: Sex,

    /// Caucasian, Asian, "Black or African American", "Hispanic or Latino" or Other
    #[arg(long)]
    race: Race,

    /// Anything else the persona should know about you
    #[arg(long)]
    details: Option<String>,

    // ── Conversation ───────────────────────────────────────────
    /// Send a single prompt, print the reply and exit
    #[arg(long)]
    prompt: Option<String>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("MIMIC_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), MimicError> {
    let config = AgentConfig::load(cli.config_dir.join("config.json"))?;
    let api_key = std::env::var("OPENROUTER_KEY")
        .map_err(|_| MimicError::Client("OPENROUTER_KEY environment variable not set".into()))?;

    let client = Arc::new(
        OpenRouterClient::new(api_key)
            .map_err(MimicError::Client)?
            .with_model(config.model.clone())
            .with_summary_model(config.summary_model()),
    );
    let preset = cli.preset.unwrap_or_else(|| config.preset.clone());

    let mut agent = PersonaAgent::builder(config, &cli.config_dir, cli.persona_dir, cli.chat_logs)
        .generator(client.clone())
        .summarizer(client.clone())
        .analyzers(Arc::new(LlmAnalyzers::new(client)))
        .event_handler(Arc::new(LoggingHandler))
        .build()?;

    let mut profile = UserProfile::new(cli.name, cli.birthday, cli.sex, cli.race);
    if let Some(details) = cli.details {
        profile = profile.with_details(details);
    }
    agent.start(profile, &preset).await?;

    if let Some(prompt) = cli.prompt {
        let reply = agent.generate_response(&prompt).await?;
        println!("{reply}");
        return agent.end();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();
        let Ok(Some(line)) = lines.next_line().await else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }
        match agent.generate_response(line).await {
            Ok(reply) => println!("{reply}"),
            Err(e) => eprintln!("Error: {e}"),
        }
    }
    agent.end()
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
