//! # Hope Log CLI (`hopelog`)
//!
//! The `hopelog` binary drives the journaling backend: database setup,
//! user registration, journal entry capture, the suggestion batch, and
//! the HTTP API server.
//!
//! ## Usage
//!
//! ```bash
//! hopelog --config ./config/hopelog.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `hopelog init` | Create the SQLite database and run schema migrations |
//! | `hopelog user add <username> <email>` | Register a user |
//! | `hopelog journal add <user-id> "<text>"` | Save a journal entry (with sentiment analysis) |
//! | `hopelog process user <user-id>` | Run the suggestion batch for one user |
//! | `hopelog process all` | Run the suggestion batch for every user |
//! | `hopelog serve api` | Start the HTTP API server |
//!
//! ## Examples
//!
//! ```bash
//! hopelog init
//! hopelog user add sam sam@example.com
//! hopelog journal add 7c9e... "I keep meaning to get back into Spanish"
//! hopelog process user 7c9e... --max-entries 10
//! hopelog serve api
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use hopelog::config;
use hopelog::journal;
use hopelog::llm;
use hopelog::migrate;
use hopelog::reconcile::SuggestionEngine;
use hopelog::server;
use hopelog::store::sqlite::SqliteStore;
use hopelog::store::Store;
use hopelog::{db, models};

/// Hope Log CLI — backend for a mental-wellness journaling app with
/// AI goal, task, and habit suggestions.
#[derive(Parser)]
#[command(
    name = "hopelog",
    about = "Hope Log — journaling backend with AI goal, task, and habit suggestions",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/hopelog.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables. Idempotent —
    /// running it multiple times is safe.
    Init,

    /// Manage users.
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Manage journal entries.
    Journal {
        #[command(subcommand)]
        action: JournalAction,
    },

    /// Run the suggestion pipeline over unanalyzed entries.
    Process {
        #[command(subcommand)]
        target: ProcessTarget,
    },

    /// Start the HTTP API server.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },
}

/// User management subcommands.
#[derive(Subcommand)]
enum UserAction {
    /// Register a new user.
    Add {
        /// Unique username.
        username: String,
        /// Unique email address.
        email: String,
    },
}

/// Journal subcommands.
#[derive(Subcommand)]
enum JournalAction {
    /// Save a journal entry for a user.
    ///
    /// Runs inline sentiment analysis (when an LLM provider is configured)
    /// and indexes the entry for semantic retrieval. The suggestion batch
    /// picks the entry up later.
    Add {
        /// Owning user's id.
        user_id: String,
        /// Entry text.
        content: String,
        /// Optional entry title.
        #[arg(long)]
        title: Option<String>,
    },
}

/// Suggestion batch targets.
#[derive(Subcommand)]
enum ProcessTarget {
    /// Process unanalyzed entries for one user.
    User {
        /// User id to process.
        user_id: String,
        /// Maximum entries to process this run (defaults from config).
        #[arg(long)]
        max_entries: Option<usize>,
    },
    /// Process unanalyzed entries for every user.
    All {
        /// Maximum entries per user this run (defaults from config).
        #[arg(long)]
        max_entries: Option<usize>,
    },
}

/// Server subcommands.
#[derive(Subcommand)]
enum ServeService {
    /// Start the JSON API server on the configured bind address.
    Api,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hopelog=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::User { action } => match action {
            UserAction::Add { username, email } => {
                let pool = db::connect(&cfg).await?;
                let store = SqliteStore::new(pool);
                let user = models::User {
                    id: uuid::Uuid::new_v4().to_string(),
                    username,
                    email,
                    created_at: chrono::Utc::now().timestamp(),
                };
                store.create_user(&user).await?;
                println!("Created user {} ({})", user.username, user.id);
            }
        },
        Commands::Journal { action } => match action {
            JournalAction::Add {
                user_id,
                content,
                title,
            } => {
                let pool = db::connect(&cfg).await?;
                let store = SqliteStore::new(pool);
                let chat = llm::create_chat_provider(&cfg.llm)?;
                let entry = journal::add_entry(
                    &store,
                    chat.as_ref(),
                    &cfg.llm,
                    &cfg.embedding,
                    &user_id,
                    title,
                    &content,
                )
                .await?;
                match &entry.sentiment {
                    Some(s) => println!(
                        "Saved entry {} (sentiment {}/5: {})",
                        entry.id,
                        s.score,
                        s.emotions.join(", ")
                    ),
                    None => println!("Saved entry {}", entry.id),
                }
            }
        },
        Commands::Process { target } => {
            let pool = db::connect(&cfg).await?;
            let store: Arc<dyn Store> = Arc::new(SqliteStore::new(pool));
            let chat: Arc<dyn llm::ChatProvider> = Arc::from(llm::create_chat_provider(&cfg.llm)?);
            let engine = SuggestionEngine::new(
                store,
                chat,
                cfg.embedding.clone(),
                cfg.suggestions.clone(),
            );

            match target {
                ProcessTarget::User {
                    user_id,
                    max_entries,
                } => {
                    let result = engine
                        .process_all_entries_for_user(&user_id, max_entries)
                        .await?;
                    print_result(&user_id, &result);
                }
                ProcessTarget::All { max_entries } => {
                    engine.process_all_entries(max_entries).await?;
                    println!("Batch run complete.");
                }
            }
        }
        Commands::Serve { service } => match service {
            ServeService::Api => {
                let pool = db::connect(&cfg).await?;
                let store: Arc<dyn Store> = Arc::new(SqliteStore::new(pool));
                server::run_server(&cfg, store).await?;
            }
        },
    }

    Ok(())
}

fn print_result(user_id: &str, result: &models::ProcessingResult) {
    println!(
        "Processed entries for user {}: {} goals, {} tasks, {} habits created ({} / {} / {} skipped as duplicates)",
        user_id,
        result.goals_created,
        result.tasks_created,
        result.habits_created,
        result.goals_skipped,
        result.tasks_skipped,
        result.habits_skipped
    );
}
