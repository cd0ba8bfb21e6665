//! sqlnav - interactive SQL navigator
//!
//! An interactive SQL shell with an object browser and completion that
//! understands the statement being written.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode against the data sources of a fixture
//! sqlnav --fixture sources.toml shop
//! ```

use std::fs::{self, OpenOptions};
use std::io;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use sqlnav::cli::CliInterface;
use sqlnav::completion::CompletionEngine;
use sqlnav::config::{Config, LoggingConfig};
use sqlnav::connection::Session;
use sqlnav::driver::Driver;
use sqlnav::error::Result;
use sqlnav::formatter::Colorizer;
use sqlnav::repl::{ReplEngine, SharedState};

/// Application entry point
#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Main application logic
///
/// 1. Parse command-line arguments and load configuration
/// 2. Initialize logging
/// 3. Handle subcommands or start the shell
async fn run() -> Result<()> {
    let cli = CliInterface::new()?;

    initialize_logging(&cli.config().logging)?;

    if cli.handle_subcommand()? {
        return Ok(());
    }

    cli.print_banner();

    run_interactive_mode(&cli).await
}

/// Run application in interactive shell mode
async fn run_interactive_mode(cli: &CliInterface) -> Result<()> {
    let driver = cli.build_driver()?;
    let sessions = create_sessions(&driver, cli.config());
    if sessions.is_empty() && !cli.args().quiet {
        println!("No data sources found. Pass --fixture or set connection.fixture.");
    }

    let shared_state = SharedState::with_config(sessions, &cli.config().display);
    let completion = create_completion_engine(cli.config(), &shared_state);
    let mut repl = ReplEngine::new(shared_state, completion, cli.config().clone())?
        .with_credentials(
            cli.args().username.clone().unwrap_or_default(),
            cli.args().password.clone().unwrap_or_default(),
        );

    if let Some(dsn) = cli.startup_dsn()
        && let Err(e) = repl.connect(Some(dsn), None, None).await
    {
        let colorizer = Colorizer::new(cli.config().display.color_output);
        eprintln!("{}", colorizer.error(&e.to_string()));
    }

    repl.run().await?;

    if !cli.args().quiet {
        println!("Goodbye!");
    }
    Ok(())
}

/// One session per data source, in discovery order
fn create_sessions(driver: &Arc<dyn Driver>, config: &Config) -> Vec<Arc<Session>> {
    let sessions: Vec<Arc<Session>> = driver
        .data_sources()
        .into_iter()
        .map(|source| {
            Arc::new(Session::new(
                source.name,
                Arc::clone(driver),
                config.connection_timeout(),
            ))
        })
        .collect();
    debug!("discovered {} data sources", sessions.len());
    sessions
}

/// Completion engine bound to the active session
fn create_completion_engine(config: &Config, shared_state: &SharedState) -> Arc<CompletionEngine> {
    let engine = CompletionEngine::new(
        shared_state.active_session_resolver(),
        config.completion.clone(),
    );
    engine.set_named_queries(config.named_queries.clone());

    if let Some(path) = &config.completion.casing_file
        && let Err(e) = engine.load_casing_file(path)
    {
        warn!("casing file {} not loaded: {e}", path.display());
    }
    Arc::new(engine)
}

/// Initialize logging from configuration
///
/// `RUST_LOG` wins over the configured level. A log file keeps log lines
/// out of the interactive display.
fn initialize_logging(config: &LoggingConfig) -> Result<()> {
    let level = config.level.to_tracing_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match &config.file_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let subscriber = subscriber.with_ansi(false).with_writer(Mutex::new(file));
            if config.timestamps {
                subscriber.init();
            } else {
                subscriber.without_time().init();
            }
        }
        None => {
            let subscriber = subscriber.with_writer(io::stderr);
            if config.timestamps {
                subscriber.init();
            } else {
                subscriber.without_time().init();
            }
        }
    }
    Ok(())
}
