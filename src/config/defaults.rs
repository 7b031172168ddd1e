use crate::config::types::*;
use crate::constants::{
    DEFAULT_HISTORY_SCHEMA, DEFAULT_HISTORY_TABLE, DEFAULT_LOCK_NAME, DEFAULT_LOCK_TIMEOUT,
};
use crate::migrator::MigrationMode;

// Config and Databases derive Default

impl Default for Directories {
    fn default() -> Self {
        Self {
            migrations: "migrations".into(),
        }
    }
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            mode: MigrationMode::Migrate,
            to_version: None,
            lock_name: DEFAULT_LOCK_NAME.to_string(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            default_schema: None,
            history_table: HistoryTable::default(),
        }
    }
}

impl Default for HistoryTable {
    fn default() -> Self {
        Self {
            schema: DEFAULT_HISTORY_SCHEMA.to_string(),
            name: DEFAULT_HISTORY_TABLE.to_string(),
        }
    }
}
