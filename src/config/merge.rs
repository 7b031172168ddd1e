use crate::config::types::*;

/// Trait for merging optional configuration values
pub trait Merge<T> {
    fn merge(self, other: T) -> T;
}

impl<T> Merge<Option<T>> for Option<T> {
    fn merge(self, other: Option<T>) -> Option<T> {
        other.or(self)
    }
}

impl Merge<ConfigInput> for ConfigInput {
    fn merge(self, other: ConfigInput) -> ConfigInput {
        ConfigInput {
            databases: match (self.databases, other.databases) {
                (Some(a), Some(b)) => Some(a.merge_with(b)),
                (a, b) => b.or(a),
            },
            directories: match (self.directories, other.directories) {
                (Some(a), Some(b)) => Some(a.merge_with(b)),
                (a, b) => b.or(a),
            },
            migration: match (self.migration, other.migration) {
                (Some(a), Some(b)) => Some(a.merge_with(b)),
                (a, b) => b.or(a),
            },
        }
    }
}

impl DatabasesInput {
    pub fn merge_with(self, other: DatabasesInput) -> DatabasesInput {
        DatabasesInput {
            urls: self.urls.merge(other.urls),
        }
    }
}

impl DirectoriesInput {
    pub fn merge_with(self, other: DirectoriesInput) -> DirectoriesInput {
        DirectoriesInput {
            migrations: self.migrations.merge(other.migrations),
        }
    }
}

impl MigrationInput {
    pub fn merge_with(self, other: MigrationInput) -> MigrationInput {
        MigrationInput {
            mode: self.mode.merge(other.mode),
            to_version: self.to_version.merge(other.to_version),
            lock_name: self.lock_name.merge(other.lock_name),
            lock_timeout: self.lock_timeout.merge(other.lock_timeout),
            default_schema: self.default_schema.merge(other.default_schema),
            history_table: match (self.history_table, other.history_table) {
                (Some(a), Some(b)) => Some(a.merge_with(b)),
                (a, b) => b.or(a),
            },
        }
    }
}

impl HistoryTableInput {
    pub fn merge_with(self, other: HistoryTableInput) -> HistoryTableInput {
        HistoryTableInput {
            schema: self.schema.merge(other.schema),
            name: self.name.merge(other.name),
        }
    }
}
