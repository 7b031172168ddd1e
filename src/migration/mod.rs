pub mod parser;
pub mod source;

pub use parser::{parse_migration, parse_migration_str, render_migration};
pub use source::{FilesystemSource, MemorySource, MigrationSource};

/// One indexed unit of database change.
///
/// A migration carrying a `down_command` is the up/down variant; the reverse
/// script is kept for callers that roll back explicitly and is never run by
/// the migrator.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Migration {
    name: String,
    index: i64,
    command: String,
    down_command: Option<String>,
}

impl Migration {
    pub fn new(index: i64, name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            index,
            command: command.into(),
            down_command: None,
        }
    }

    pub fn with_down(mut self, down_command: impl Into<String>) -> Self {
        self.down_command = Some(down_command.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> i64 {
        self.index
    }

    /// Forward ("up") script
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Reverse ("down") script, present only for the up/down variant
    pub fn down_command(&self) -> Option<&str> {
        self.down_command.as_deref()
    }

    pub fn is_reversible(&self) -> bool {
        self.down_command.is_some()
    }
}

/// Highest-indexed migration of a catalog
pub fn latest_of(migrations: &[Migration]) -> Option<&Migration> {
    migrations.iter().max_by_key(|m| m.index)
}
