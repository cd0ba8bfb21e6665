//! Command-line interface for sqlnav
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and validation
//! - Subcommands that run without opening the shell
//! - Selection of the driver and the data source connected at startup

pub mod completion;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::{Config, LogLevel, OutputFormat};
use crate::driver::memory::Fixture;
use crate::driver::{Driver, MemoryDriver, Value};
use crate::error::{ConfigError, Result};
use crate::formatter::TableFormatter;

/// sqlnav - browse databases and write SQL with context-aware completion
#[derive(Parser, Debug)]
#[command(
    name = "sqlnav",
    version,
    about = "Interactive SQL navigator",
    long_about = "An interactive SQL shell with an object browser for catalogs, schemas, tables
and columns, and completion that understands the statement being written."
)]
pub struct CliArgs {
    /// Data source to connect to at startup
    #[arg(value_name = "DSN")]
    pub dsn: Option<String>,

    /// Username for authentication
    #[arg(short = 'u', long, value_name = "USERNAME")]
    pub username: Option<String>,

    /// Password for authentication
    #[arg(short = 'p', long, value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// In-memory driver fixture describing the data sources
    #[arg(long, value_name = "FILE")]
    pub fixture: Option<PathBuf>,

    /// Output format (table, json, json-pretty, compact)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Disable colored output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Quiet mode (minimal output)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Very verbose mode (trace logging)
    #[arg(long = "vv")]
    pub very_verbose: bool,

    /// Connection timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Start without connecting to any data source
    #[arg(long)]
    pub no_connect: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands for sqlnav
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version,

    /// Generate shell completion script
    Completion {
        /// Shell type (bash, zsh, fish)
        #[arg(value_name = "SHELL")]
        shell: String,
    },

    /// Show configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration file
        #[arg(long)]
        validate: bool,
    },

    /// List the data sources the driver knows about
    Sources {
        /// Print names only, one per line
        #[arg(long)]
        names: bool,
    },
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Loaded configuration
    config: Config,
}

impl CliInterface {
    /// Parse the process arguments and load the configuration
    pub fn new() -> Result<Self> {
        Self::from_args(CliArgs::parse())
    }

    /// Build from already parsed arguments
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Self::load_config(&args)?;
        Ok(Self { args, config })
    }

    /// Load configuration from file and merge with arguments
    fn load_config(args: &CliArgs) -> Result<Config> {
        let config_path = args.config_file.as_deref();
        let mut config = Config::load_from_file(config_path)?;

        if let Err(e) = config.validate() {
            eprintln!("Warning: Configuration validation failed: {}", e);
            eprintln!("Using default configuration instead.");
            config = Config::default();
        }

        Self::apply_args_to_config(&mut config, args)?;

        Ok(config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// Path of the configuration file in use
    pub fn config_path(&self) -> PathBuf {
        self.args
            .config_file
            .clone()
            .unwrap_or_else(Config::default_config_path)
    }

    /// Apply CLI arguments to configuration
    ///
    /// Overrides configuration values with CLI arguments where provided
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) -> Result<()> {
        Self::apply_display_args(config, args)?;
        Self::apply_logging_args(config, args);
        Self::apply_connection_args(config, args);
        Ok(())
    }

    /// Apply display-related CLI arguments to configuration
    fn apply_display_args(config: &mut Config, args: &CliArgs) -> Result<()> {
        if let Some(name) = &args.format {
            config.display.format =
                OutputFormat::parse(name).ok_or_else(|| ConfigError::InvalidValue {
                    field: "format".to_string(),
                    value: name.clone(),
                })?;
        }

        if args.no_color {
            config.display.color_output = false;
        }
        Ok(())
    }

    /// Apply logging-related CLI arguments to configuration
    fn apply_logging_args(config: &mut Config, args: &CliArgs) {
        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else if args.quiet {
            LogLevel::Error
        } else {
            config.logging.level
        };
    }

    /// Apply connection-related CLI arguments to configuration
    fn apply_connection_args(config: &mut Config, args: &CliArgs) {
        if let Some(timeout) = args.timeout {
            config.connection.timeout = timeout;
        }
        if let Some(fixture) = &args.fixture {
            config.connection.fixture = Some(fixture.clone());
        }
    }

    /// Data source connected at startup, if any
    ///
    /// The `DSN` argument wins over `connection.default_datasource`.
    pub fn startup_dsn(&self) -> Option<String> {
        if self.args.no_connect {
            return None;
        }
        self.args
            .dsn
            .clone()
            .or_else(|| self.config.connection.default_datasource.clone())
    }

    /// Driver serving the data sources
    ///
    /// Without a fixture the driver knows no data sources.
    pub fn build_driver(&self) -> Result<Arc<dyn Driver>> {
        let driver = match &self.config.connection.fixture {
            Some(path) => MemoryDriver::from_file(path)?,
            None => MemoryDriver::new(Fixture::default()),
        };
        Ok(Arc::new(driver))
    }

    /// Handle subcommands
    ///
    /// # Returns
    /// * `Result<bool>` - True if subcommand was handled, false to continue
    pub fn handle_subcommand(&self) -> Result<bool> {
        match &self.args.command {
            Some(Commands::Version) => {
                self.show_version();
                Ok(true)
            }
            Some(Commands::Completion { shell }) => {
                completion::generate_completion(shell, &mut io::stdout().lock())?;
                Ok(true)
            }
            Some(Commands::Config { show, validate }) => {
                self.handle_config_command(*show, *validate)?;
                Ok(true)
            }
            Some(Commands::Sources { names }) => {
                println!("{}", self.sources_listing(*names)?);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn show_version(&self) {
        println!("sqlnav version {}", env!("CARGO_PKG_VERSION"));
        println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
    }

    /// Data sources of the configured driver, as a table or bare names
    fn sources_listing(&self, names_only: bool) -> Result<String> {
        let sources = self.build_driver()?.data_sources();
        if names_only {
            return Ok(sources
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join("\n"));
        }
        let rows: Vec<Vec<Value>> = sources
            .into_iter()
            .map(|s| vec![Value::Text(s.name), Value::Text(s.description)])
            .collect();
        TableFormatter::with_colors(self.config.display.color_output)
            .format(&["name", "description"], &rows)
    }

    fn handle_config_command(&self, show: bool, validate: bool) -> Result<()> {
        if validate {
            self.validate_config_file();
        }

        if show {
            self.show_config()?;
        }

        Ok(())
    }

    /// Validate configuration file
    fn validate_config_file(&self) {
        let path = self.config_path();
        println!("Validating configuration file: {}", path.display());

        if !path.exists() {
            println!("Configuration file does not exist");
            return;
        }

        match Config::from_file(&path) {
            Ok(config) => match config.validate() {
                Ok(_) => println!("Configuration is valid"),
                Err(e) => println!("Configuration validation failed: {}", e),
            },
            Err(e) => println!("Failed to load configuration: {}", e),
        }
    }

    /// Show effective configuration
    fn show_config(&self) -> Result<()> {
        println!("Configuration file: {}", self.config_path().display());
        println!();
        println!("{}", self.config.to_toml()?);
        Ok(())
    }

    /// Print banner with version
    pub fn print_banner(&self) {
        if !self.args.quiet {
            println!("sqlnav {}", env!("CARGO_PKG_VERSION"));
            println!("Type \\? for help, \\q to quit.");
        }
    }
}
