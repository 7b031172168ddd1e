pub mod apply;
pub mod common;
pub mod new;
pub mod status;

// Re-export all command functions
pub use apply::cmd_migrate_apply;
pub use new::cmd_migrate_new;
pub use status::{StatusFormat, cmd_migrate_status};
