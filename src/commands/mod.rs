pub mod migrate;
pub mod validate;

// Re-export all command functions
pub use migrate::{StatusFormat, cmd_migrate_apply, cmd_migrate_new, cmd_migrate_status};
pub use validate::cmd_validate;
