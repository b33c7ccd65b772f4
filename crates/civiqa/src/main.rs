use std::io::Read;

use anyhow::{Context, Result};
use civiqa_models::CiviqaConfig;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "civiqa", about = "Civic question answering over Chicago open data")]
struct Cli {
    /// Question to answer; read from stdin when omitted
    question: Option<String>,

    /// Path to configuration file
    #[arg(short, long, default_value = "config/civiqa.toml")]
    config: String,

    /// Print the full answer report JSON (answer, run trace, timings)
    #[arg(long)]
    trace: bool,

    /// Pretty-print the report JSON
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load config
    let config_str = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("Failed to read config: {}", cli.config))?;
    let config: CiviqaConfig =
        toml::from_str(&config_str).with_context(|| "Failed to parse config")?;

    // Read question
    let question = if let Some(question) = cli.question {
        question
    } else {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read question from stdin")?;
        buf.trim().to_string()
    };
    if question.is_empty() {
        anyhow::bail!("No question given (pass one as an argument or on stdin)");
    }

    // Build engine and answer
    let engine = civiqa::build_engine(&config)
        .await
        .context("Failed to build engine")?;

    let report = engine
        .answer(&question)
        .await
        .map_err(|e| anyhow::anyhow!("Run failed: {e}"))?;

    if cli.trace {
        let output = if cli.pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };
        println!("{output}");
    } else {
        println!("{}", report.answer);
    }

    Ok(())
}
