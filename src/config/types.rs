use crate::migrator::{MigrationMode, MigratorSettings};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Raw configuration input - all fields Optional for merging
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigInput {
    pub databases: Option<DatabasesInput>,
    pub directories: Option<DirectoriesInput>,
    pub migration: Option<MigrationInput>,
}

/// Resolved configuration with all defaults applied
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub databases: Databases,
    pub directories: Directories,
    pub migration: MigrationSettings,
}

// Database configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatabasesInput {
    pub urls: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct Databases {
    /// Every target a run applies to
    pub urls: Vec<String>,
}

// Directory configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DirectoriesInput {
    pub migrations: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Directories {
    pub migrations: PathBuf,
}

// Migration configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MigrationInput {
    pub mode: Option<String>,
    pub to_version: Option<i64>,
    pub lock_name: Option<String>,
    /// Duration text such as "30s" or "1m30s"
    pub lock_timeout: Option<String>,
    pub default_schema: Option<String>,
    pub history_table: Option<HistoryTableInput>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HistoryTableInput {
    pub schema: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MigrationSettings {
    pub mode: MigrationMode,
    pub to_version: Option<i64>,
    pub lock_name: String,
    pub lock_timeout: Duration,
    pub default_schema: Option<String>,
    pub history_table: HistoryTable,
}

impl MigrationSettings {
    pub fn migrator_settings(&self) -> MigratorSettings {
        MigratorSettings {
            mode: self.mode,
            to_version: self.to_version,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTable {
    pub schema: String,
    pub name: String,
}

// CLI argument groups shared by commands
#[derive(Debug, Clone, Default, Args)]
pub struct DatabaseArgs {
    #[arg(
        long = "database-url",
        value_name = "URL",
        help = "Target database URL (repeat for several targets)"
    )]
    pub database_urls: Vec<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct DirectoryArgs {
    #[arg(long, help = "Migrations directory path")]
    pub migrations_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct MigrationArgs {
    #[arg(long, help = "Schema holding the history table")]
    pub history_schema: Option<String>,

    #[arg(long, help = "History table name")]
    pub history_table: Option<String>,

    #[arg(long, help = "Advisory lock name")]
    pub lock_name: Option<String>,

    #[arg(long, help = "How long to wait for the advisory lock (e.g. 30s, 2m)")]
    pub lock_timeout: Option<String>,

    #[arg(long, help = "Default schema for change-scripts (session search_path)")]
    pub default_schema: Option<String>,
}

// Conversion functions from CLI args to config input
impl From<DatabaseArgs> for DatabasesInput {
    fn from(args: DatabaseArgs) -> Self {
        Self {
            urls: if args.database_urls.is_empty() {
                None
            } else {
                Some(args.database_urls)
            },
        }
    }
}

impl From<DirectoryArgs> for DirectoriesInput {
    fn from(args: DirectoryArgs) -> Self {
        Self {
            migrations: args.migrations_dir,
        }
    }
}

impl From<MigrationArgs> for MigrationInput {
    fn from(args: MigrationArgs) -> Self {
        let history_table = if args.history_schema.is_some() || args.history_table.is_some() {
            Some(HistoryTableInput {
                schema: args.history_schema,
                name: args.history_table,
            })
        } else {
            None
        };

        Self {
            mode: None, // Set by the command being run
            to_version: None,
            lock_name: args.lock_name,
            lock_timeout: args.lock_timeout,
            default_schema: args.default_schema,
            history_table,
        }
    }
}
