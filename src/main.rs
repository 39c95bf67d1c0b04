//! # codeplan CLI
//!
//! ```bash
//! codeplan --config ./config/codeplan.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `codeplan init` | Create the SQLite schema |
//! | `codeplan index` | Embed every eligible source file into the vector collection |
//! | `codeplan search` | Read a query from stdin and list the closest files |
//! | `codeplan plan` | Read a task from stdin and generate an implementation plan |
//! | `codeplan interview add` | Register an interview |
//! | `codeplan interview grant` | Grant a user access to an interview |
//! | `codeplan attempt start` | Start an interview attempt for a user |
//! | `codeplan attempt list` | List a user's attempts |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use codeplan::interview::{CreateInterviewAttemptInteractor, SqliteInterviewStorage};
use codeplan::{config, db, index, migrate, plan, search};

#[derive(Parser)]
#[command(
    name = "codeplan",
    about = "Index a code base into a vector store and generate task plans from it",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/codeplan.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Embed and upsert every eligible file under `[index].root`.
    ///
    /// Files that are blank are skipped; a failure on one file is logged and
    /// the run continues with the next.
    Index,

    /// Nearest-neighbor search over the indexed files.
    ///
    /// Reads one line from stdin as the query.
    Search,

    /// Generate an implementation plan for a task.
    ///
    /// Reads one line from stdin as the task description, retrieves the
    /// closest files, asks the chat model for a plan, and saves query, plan
    /// and context to `[plan].queries_dir`.
    Plan,

    /// Manage interview reference data.
    Interview {
        #[command(subcommand)]
        action: InterviewAction,
    },

    /// Manage interview attempts.
    Attempt {
        #[command(subcommand)]
        action: AttemptAction,
    },
}

#[derive(Subcommand)]
enum InterviewAction {
    /// Register an interview with its default config.
    Add {
        title: String,
        /// Interview length in seconds.
        #[arg(long)]
        duration: i64,
        #[arg(long)]
        description: Option<String>,
    },
    /// Grant a user access to an interview.
    Grant { interview_id: String, user_id: String },
}

#[derive(Subcommand)]
enum AttemptAction {
    /// Start an attempt. Fails if the interview does not exist.
    Start { interview_id: String, user_id: String },
    /// List a user's attempts, oldest first.
    List { user_id: String },
}

/// Read one line from stdin, showing `prompt` only on a terminal.
fn read_query(prompt: &str) -> Result<String> {
    if atty::is(atty::Stream::Stdin) {
        print!("{}", prompt);
        std::io::stdout().flush()?;
    }
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "codeplan=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // A missing .env is fine; keys may come from the real environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Index => {
            index::run_index(&cfg).await?;
        }
        Commands::Search => {
            let query = read_query("Enter your search query: ")?;
            search::run_search(&cfg, &query).await?;
        }
        Commands::Plan => {
            let query = read_query("Enter your task description: ")?;
            plan::run_plan(&cfg, &query).await?;
        }
        Commands::Interview { action } => {
            let storage = SqliteInterviewStorage::new(db::connect(&cfg).await?);
            match action {
                InterviewAction::Add {
                    title,
                    duration,
                    description,
                } => {
                    let id = storage
                        .create_interview(&title, description.as_deref(), duration)
                        .await?;
                    println!("interview created: {}", id);
                }
                InterviewAction::Grant {
                    interview_id,
                    user_id,
                } => {
                    storage.grant_access(&interview_id, &user_id).await?;
                    println!("access granted: {} -> {}", user_id, interview_id);
                }
            }
        }
        Commands::Attempt { action } => {
            let storage = Arc::new(SqliteInterviewStorage::new(db::connect(&cfg).await?));
            match action {
                AttemptAction::Start {
                    interview_id,
                    user_id,
                } => {
                    let interactor = CreateInterviewAttemptInteractor::new(storage);
                    interactor
                        .create_interview_attempt(&interview_id, &user_id)
                        .await?;
                    println!("attempt started: {} for {}", interview_id, user_id);
                }
                AttemptAction::List { user_id } => {
                    let attempts = storage.list_attempts_for_user(&user_id).await?;
                    if attempts.is_empty() {
                        println!("No attempts.");
                    }
                    for a in attempts {
                        println!(
                            "{}  interview={}  started={}  ended={}",
                            a.id,
                            a.interview_id,
                            a.start_datetime.format("%Y-%m-%d %H:%M:%S"),
                            a.end_datetime
                                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                                .unwrap_or_else(|| "-".to_string())
                        );
                    }
                }
            }
        }
    }

    Ok(())
}
