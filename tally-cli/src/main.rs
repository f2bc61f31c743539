use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tally_ingest::Ingestor;
use tally_store::Store;

mod auth;
mod config;
mod conversation;
mod llm;
mod logging;
mod state;
mod tool;

use config::Config;
use conversation::{DEFAULT_QUESTION, answer_question};
use llm::OpenAiChat;

const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("TALLY_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(
    name = "tally",
    version,
    long_version = LONG_VERSION,
    about = "Import bank statements and ask questions about your spending"
)]
struct Cli {
    /// Database file (overrides store.db_path)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Config file (default: ~/.tally/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert and ingest every statement in a directory
    Import {
        /// Statement directory (overrides ingest.dir)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Ask a question about your transactions
    Ask {
        /// Defaults to the top-10 October spending question
        question: Option<String>,
    },

    /// Configuration file commands
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write ~/.tally/config.toml with defaults if it does not exist
    Init,

    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config.clone() {
        Some(p) => p,
        None => config::config_path()?,
    };
    let cfg = config::load_config_from(&config_path)?;
    logging::init_tracing(&cfg.log.level);

    let db_path = cli.db.clone().unwrap_or_else(|| cfg.store.db_path.clone());

    match cli.command {
        Command::Import { dir } => {
            let dir = dir.unwrap_or_else(|| cfg.ingest.dir.clone());
            import_blocking(&cfg, &db_path, &dir)?;
        }

        Command::Ask { question } => {
            let question = question.unwrap_or_else(|| DEFAULT_QUESTION.to_string());
            ask(&cfg, &db_path, &question).await?;
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => {
                config::init_config(&config_path)?;
            }
            ConfigCommand::Show => {
                print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            }
        },
    }

    Ok(())
}

fn open_store(cfg: &Config, db_path: &Path) -> Result<Store> {
    let store = Store::open(db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    Ok(store.with_read_only_queries(cfg.store.read_only_queries))
}

/// Scoped worker threads and SQLite I/O; keep them off the async workers.
fn import_blocking(cfg: &Config, db_path: &Path, dir: &Path) -> Result<()> {
    tokio::task::block_in_place(|| import(cfg, db_path, dir))
}

fn import(cfg: &Config, db_path: &Path, dir: &Path) -> Result<()> {
    if !dir.is_dir() {
        bail!("statement directory not found: {}", dir.display());
    }
    let store = open_store(cfg, db_path)?;
    let report = Ingestor::new(store)?
        .with_converter(cfg.ingest.converter.clone())
        .run(dir)?;

    for f in &report.files {
        match &f.error {
            None => println!(
                "{}: {} parsed, {} inserted, {} duplicates, {} rejected",
                f.path.display(),
                f.parsed,
                f.inserted,
                f.duplicates,
                f.rejected
            ),
            Some(e) => println!("{}: failed: {}", f.path.display(), e),
        }
    }
    println!(
        "\nInserted {} transactions ({} duplicates skipped, {} files failed)",
        report.inserted(),
        report.duplicates(),
        report.failed().count()
    );
    Ok(())
}

async fn ask(cfg: &Config, db_path: &Path, question: &str) -> Result<()> {
    let api_key = auth::api_key_from_env()?;
    let store = open_store(cfg, db_path)?;
    let model = OpenAiChat::new(api_key, &cfg.llm);

    let answer = answer_question(
        &model,
        &store,
        question,
        cfg.llm.max_tool_rounds,
        cfg.llm.timeout(),
    )
    .await?;

    tracing::info!(
        rounds = answer.tool_rounds,
        queries = answer.queries_executed,
        "answered"
    );
    println!("Your financial analysis:");
    println!("{}", answer.text);
    Ok(())
}
