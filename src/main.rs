use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use lockstep::commands::{self, StatusFormat};
use lockstep::config::{self, ConfigInput, MigrationInput};
use lockstep::migrator::MigrationMode;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(long, default_value = lockstep::constants::CONFIG_FILENAME, global = true)]
    config_file: PathBuf,

    /// Enable verbose output (info level)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress all non-essential output (error level only)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Enable debug output (debug level)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that talks to target databases
#[derive(Args, Debug, Clone, Default)]
struct TargetArgs {
    #[command(flatten)]
    database_args: config::DatabaseArgs,

    #[command(flatten)]
    directory_args: config::DirectoryArgs,

    #[command(flatten)]
    migration_args: config::MigrationArgs,
}

impl TargetArgs {
    fn into_input(self, mode: Option<MigrationMode>, to_version: Option<i64>) -> ConfigInput {
        let mut migration: MigrationInput = self.migration_args.into();
        migration.mode = mode.map(|m| m.to_string());
        migration.to_version = to_version;

        ConfigInput {
            databases: Some(self.database_args.into()),
            directories: Some(self.directory_args.into()),
            migration: Some(migration),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Apply outstanding migrations to every target database
    Migrate {
        /// Stop after this migration index (never rolls back)
        #[arg(long)]
        to_version: Option<i64>,

        #[command(flatten)]
        target_args: TargetArgs,
    },

    /// Check every target records the latest migration (for CI)
    Validate {
        #[command(flatten)]
        target_args: TargetArgs,
    },

    /// Show recorded, latest and outstanding migrations per target
    Status {
        /// Output format
        #[arg(long, value_enum, default_value = "human")]
        format: StatusFormat,

        #[command(flatten)]
        target_args: TargetArgs,
    },

    /// Create a new change-script with the next index
    New {
        /// Migration name (letters, digits, '_' and '-')
        name: String,

        #[command(flatten)]
        directory_args: config::DirectoryArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    initialize_logging(&cli);

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("Received shutdown signal, stopping after the current migration...");
        signal_token.cancel();
    });

    run_main(cli, &cancel).await
}

async fn wait_for_shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn initialize_logging(cli: &Cli) {
    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else if cli.quiet {
        "error"
    } else {
        "warn" // default level
    };

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(level)
    };

    fmt().with_env_filter(filter).with_target(false).init();
}

fn resolve_config(file_config: ConfigInput, cli_config: ConfigInput) -> Result<config::Config> {
    Ok(config::ConfigBuilder::new()
        .with_file(file_config)
        .with_cli_args(cli_config)
        .resolve()?)
}

async fn run_main(cli: Cli, cancel: &CancellationToken) -> Result<()> {
    let file_config = config::load_config(&cli.config_file)?;
    let root_dir = cli
        .config_file
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    match cli.command {
        Commands::Migrate {
            to_version,
            target_args,
        } => {
            let cli_config = target_args.into_input(Some(MigrationMode::Migrate), to_version);
            let config = resolve_config(file_config, cli_config)?;

            info!("Migrating target databases");
            commands::cmd_migrate_apply(&config, &root_dir, cancel).await
        }
        Commands::Validate { target_args } => {
            let cli_config = target_args.into_input(Some(MigrationMode::Validate), None);
            let config = resolve_config(file_config, cli_config)?;

            info!("Validating target databases");
            commands::cmd_validate(&config, &root_dir).await
        }
        Commands::Status {
            format,
            target_args,
        } => {
            let cli_config = target_args.into_input(None, None);
            let config = resolve_config(file_config, cli_config)?;

            info!("Checking migration status");
            commands::cmd_migrate_status(&config, &root_dir, format).await
        }
        Commands::New {
            name,
            directory_args,
        } => {
            let cli_config = ConfigInput {
                directories: Some(directory_args.into()),
                ..ConfigInput::default()
            };
            let config = resolve_config(file_config, cli_config)?;

            commands::cmd_migrate_new(&config, &root_dir, &name)?;
            Ok(())
        }
    }
}
