use crate::config::duration::parse_duration;
use crate::config::{merge::Merge, types::*};
use crate::error::{Error, Result};
use crate::migrator::MigrationMode;

pub struct ConfigBuilder {
    config_input: ConfigInput,
    env_database_url: Option<String>,
}

impl ConfigBuilder {
    /// Start from defaults, with `DATABASE_URL` as the lowest-priority target
    pub fn new() -> Self {
        Self {
            config_input: ConfigInput::default(),
            env_database_url: std::env::var("DATABASE_URL").ok(),
        }
    }

    pub fn with_file(mut self, file_input: ConfigInput) -> Self {
        self.config_input = self.config_input.merge(file_input);
        self
    }

    pub fn with_cli_args(mut self, cli_input: ConfigInput) -> Self {
        self.config_input = self.config_input.merge(cli_input);
        self
    }

    /// Override the environment fallback for the target database
    pub fn with_env_database_url(mut self, url: Option<String>) -> Self {
        self.env_database_url = url;
        self
    }

    pub fn resolve(self) -> Result<Config> {
        let defaults = Config::default();

        Ok(Config {
            databases: self.resolve_databases(&defaults.databases),
            directories: self.resolve_directories(&defaults.directories),
            migration: self.resolve_migration(&defaults.migration)?,
        })
    }

    fn resolve_databases(&self, defaults: &Databases) -> Databases {
        let urls = self
            .config_input
            .databases
            .as_ref()
            .and_then(|d| d.urls.as_ref())
            .cloned()
            .or_else(|| self.env_database_url.clone().map(|url| vec![url]))
            .unwrap_or_else(|| defaults.urls.clone());

        Databases { urls }
    }

    fn resolve_directories(&self, defaults: &Directories) -> Directories {
        let dir_input = self.config_input.directories.as_ref();

        Directories {
            migrations: dir_input
                .and_then(|d| d.migrations.as_ref())
                .map(Into::into)
                .unwrap_or_else(|| defaults.migrations.clone()),
        }
    }

    fn resolve_migration(&self, defaults: &MigrationSettings) -> Result<MigrationSettings> {
        let mig_input = self.config_input.migration.as_ref();

        let mode = match mig_input.and_then(|m| m.mode.as_deref()) {
            Some(text) => text.parse::<MigrationMode>()?,
            None => defaults.mode,
        };

        let lock_timeout = match mig_input.and_then(|m| m.lock_timeout.as_deref()) {
            Some(text) => parse_duration(text)?,
            None => defaults.lock_timeout,
        };

        let lock_name = mig_input
            .and_then(|m| m.lock_name.as_ref())
            .cloned()
            .unwrap_or_else(|| defaults.lock_name.clone());
        if lock_name.trim().is_empty() {
            return Err(Error::Configuration("Lock name must not be empty".to_string()));
        }

        let history_table = mig_input
            .and_then(|m| m.history_table.as_ref())
            .map(|t| HistoryTable {
                schema: t
                    .schema
                    .as_ref()
                    .cloned()
                    .unwrap_or_else(|| defaults.history_table.schema.clone()),
                name: t
                    .name
                    .as_ref()
                    .cloned()
                    .unwrap_or_else(|| defaults.history_table.name.clone()),
            })
            .unwrap_or_else(|| defaults.history_table.clone());

        Ok(MigrationSettings {
            mode,
            to_version: mig_input
                .and_then(|m| m.to_version)
                .or(defaults.to_version),
            lock_name,
            lock_timeout,
            default_schema: mig_input
                .and_then(|m| m.default_schema.as_ref())
                .cloned()
                .or_else(|| defaults.default_schema.clone()),
            history_table,
        })
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
