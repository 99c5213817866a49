//! Taskdeck — live-syncing task list client.
//!
//! Thin subcommand CLI over the session and task stores. Configuration
//! via CLI flags, environment variables, or config file
//! (`~/.config/taskdeck/config.toml`).
//!
//! ```bash
//! taskdeck login -u alice -p secret
//! taskdeck add "Buy milk"
//! taskdeck list
//! taskdeck toggle 42
//! # Follow live updates until Ctrl-C
//! taskdeck watch
//! ```

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use taskdeck::api::{ApiClient, ApiError};
use taskdeck::config::{CliArgs, ClientConfig, ConfigError};
use taskdeck::live::{self, ConnectionStatus, LiveConfig};
use taskdeck::session::{SessionStore, TokenStore};
use taskdeck::store::{StoreError, TaskStore};
use taskdeck_api::task::TaskId;

#[derive(Parser, Debug)]
#[command(version, about = "Live-syncing task list client")]
struct Cli {
    #[command(flatten)]
    args: CliArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Log in and persist the session token.
    Login {
        /// Login name.
        #[arg(short, long)]
        username: String,
        /// Password.
        #[arg(short, long)]
        password: String,
    },
    /// Create an account and log in.
    Register {
        /// Login name.
        #[arg(long)]
        username: String,
        /// Contact email.
        #[arg(long)]
        email: String,
        /// Password.
        #[arg(long)]
        password: String,
        /// Display name.
        #[arg(long)]
        fullname: String,
    },
    /// Clear the session and the persisted token.
    Logout,
    /// Print the task list.
    List,
    /// Create a task.
    Add {
        /// Title for the new task.
        title: String,
    },
    /// Flip a task's completion flag.
    Toggle {
        /// Task id.
        id: String,
    },
    /// Change a task's title.
    Edit {
        /// Task id.
        id: String,
        /// New title.
        title: String,
    },
    /// Delete a task.
    Remove {
        /// Task id.
        id: String,
    },
    /// Follow live updates, printing the list as it changes.
    Watch,
}

/// Errors surfaced to the terminal with a non-zero exit code.
#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Usage(String),
    #[error("not logged in (run `taskdeck login`)")]
    NotAuthenticated,
    #[error("could not determine a path for the session token")]
    NoTokenPath,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load and resolve configuration (CLI args > config file > defaults).
    let config = match ClientConfig::load(&cli.args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    let _log_guard = init_logging(&cli.args.log_level, cli.args.log_file.as_deref());

    tracing::info!("taskdeck starting");
    let result = run(cli.command, &config).await;
    tracing::info!("taskdeck exiting");

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging to stderr, or to a file when `--log-file` is given.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown so buffered
/// file entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if let Some(log_path) = file_path {
        let log_dir = log_path.parent()?;
        let file_name = log_path.file_name()?.to_str()?;
        let file_appender = tracing_appender::rolling::never(log_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        tracing_subscriber::fmt()
            .with_writer(non_blocking)
            .with_env_filter(env_filter)
            .with_ansi(false)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(env_filter)
            .init();
        None
    }
}

/// Dispatches a subcommand against the stores.
async fn run(command: Command, config: &ClientConfig) -> Result<(), AppError> {
    let session = SessionStore::new(token_store(config)?);

    match command {
        Command::Login { username, password } => {
            let client = ApiClient::new(config)?;
            let user = session.login(&client, &username, &password).await?;
            println!("logged in as {}", user.username);
            Ok(())
        }
        Command::Register {
            username,
            email,
            password,
            fullname,
        } => {
            let client = ApiClient::new(config)?;
            let user = session
                .register(&client, &username, &email, &password, &fullname)
                .await?;
            println!("registered and logged in as {}", user.username);
            Ok(())
        }
        Command::Logout => {
            session.logout();
            println!("logged out");
            Ok(())
        }
        Command::List => {
            let client = authed_client(config, &session)?;
            let store = TaskStore::new();
            store.fetch_tasks(&client).await;
            check(&store)?;
            print_tasks(&store);
            Ok(())
        }
        Command::Add { title } => {
            let title = validate_title(&title, config.max_title_len)?;
            let client = authed_client(config, &session)?;
            let store = TaskStore::new();
            store.add_task(&client, &title).await;
            check(&store)?;
            println!("added");
            Ok(())
        }
        Command::Toggle { id } => {
            let client = authed_client(config, &session)?;
            let store = TaskStore::new();
            store.fetch_tasks(&client).await;
            check(&store)?;
            let id = TaskId::new(id);
            let Some(task) = store.task(&id) else {
                return Err(AppError::Usage(format!("no task with id {id}")));
            };
            store.toggle_task(&client, &id).await;
            check(&store)?;
            println!(
                "{} {}",
                if task.done { "reopened" } else { "completed" },
                task.title
            );
            Ok(())
        }
        Command::Edit { id, title } => {
            let title = validate_title(&title, config.max_title_len)?;
            let client = authed_client(config, &session)?;
            let store = TaskStore::new();
            store.fetch_tasks(&client).await;
            check(&store)?;
            let id = TaskId::new(id);
            let Some(task) = store.task(&id) else {
                return Err(AppError::Usage(format!("no task with id {id}")));
            };
            // Skip no-op updates; the store deliberately does not.
            if task.title.trim() == title {
                println!("title unchanged");
                return Ok(());
            }
            store.update_task(&client, &id, &title).await;
            check(&store)?;
            println!("updated");
            Ok(())
        }
        Command::Remove { id } => {
            let client = authed_client(config, &session)?;
            let store = TaskStore::new();
            store.delete_task(&client, &TaskId::new(id)).await;
            check(&store)?;
            println!("removed");
            Ok(())
        }
        Command::Watch => watch(config, &session).await,
    }
}

/// Fetches once, then follows live updates until Ctrl-C or the listener
/// gives up.
async fn watch(config: &ClientConfig, session: &SessionStore) -> Result<(), AppError> {
    let client = authed_client(config, session)?;
    let token = session.token().ok_or(AppError::NotAuthenticated)?;

    let store = Arc::new(TaskStore::new());
    store.fetch_tasks(&client).await;
    check(&store)?;
    print_tasks(&store);

    let live_config = LiveConfig::from_config(config, token)?;
    let handle = live::spawn(live_config, Arc::clone(&store));
    let mut status = handle.subscribe();
    let mut last = store.tasks();
    let mut tick = tokio::time::interval(Duration::from_millis(500));

    enum Step {
        Quit,
        Status,
        Timer,
    }

    loop {
        let step = tokio::select! {
            _ = tokio::signal::ctrl_c() => Step::Quit,
            changed = status.changed() => {
                if changed.is_err() { Step::Quit } else { Step::Status }
            }
            _ = tick.tick() => Step::Timer,
        };
        match step {
            Step::Quit => break,
            Step::Status => {
                let current = *status.borrow_and_update();
                println!("live: {current}");
                if current == ConnectionStatus::Gone {
                    break;
                }
            }
            Step::Timer => {
                let now = store.tasks();
                if now != last {
                    print_tasks(&store);
                    last = now;
                }
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

/// Builds an authenticated client from the restored session.
fn authed_client(config: &ClientConfig, session: &SessionStore) -> Result<ApiClient, AppError> {
    if !session.restore() {
        return Err(AppError::NotAuthenticated);
    }
    let token = session.token().ok_or(AppError::NotAuthenticated)?;
    Ok(ApiClient::new(config)?.with_token(token))
}

/// Resolves the token file path from config or the platform default.
fn token_store(config: &ClientConfig) -> Result<TokenStore, AppError> {
    config
        .token_file
        .clone()
        .or_else(TokenStore::default_path)
        .map(TokenStore::new)
        .ok_or(AppError::NoTokenPath)
}

/// Caller-side title contract: non-empty after trimming, bounded length.
fn validate_title(title: &str, max_len: usize) -> Result<String, AppError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(AppError::Usage("title must not be empty".to_string()));
    }
    if trimmed.chars().count() > max_len {
        return Err(AppError::Usage(format!(
            "title too long (max {max_len} characters)"
        )));
    }
    Ok(trimmed.to_string())
}

/// Surfaces the store's error field as a command failure.
fn check(store: &TaskStore) -> Result<(), AppError> {
    match store.error() {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn print_tasks(store: &TaskStore) {
    let tasks = store.tasks();
    if tasks.is_empty() {
        println!("no tasks");
        return;
    }
    for task in tasks {
        println!(
            "[{}] {}  {}",
            if task.done { "x" } else { " " },
            task.id,
            task.title
        );
    }
}
