use std::time::Duration;

// Change-script directives
pub const DIRECTIVE_SENTINEL: &str = "+lockstep";
pub const LINE_COMMENT: &str = "--";

// Migration names are stored in a bounded history column
pub const MAX_NAME_LENGTH: usize = 256;

// Advisory lock defaults
pub const DEFAULT_LOCK_NAME: &str = "lockstep_migrations";
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);
pub const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(250);

// History table defaults
pub const DEFAULT_HISTORY_SCHEMA: &str = "public";
pub const DEFAULT_HISTORY_TABLE: &str = "lockstep_history";

// Configuration file name
pub const CONFIG_FILENAME: &str = "lockstep.yaml";

// Change-script file extension
pub const SCRIPT_EXTENSION: &str = "sql";
