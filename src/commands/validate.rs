use super::migrate::cmd_migrate_apply;
use crate::config::Config;
use crate::migrator::MigrationMode;
use anyhow::{Result, ensure};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Check every target records the latest available migration, without writing
pub async fn cmd_validate(config: &Config, root_dir: &Path) -> Result<()> {
    ensure!(
        config.migration.mode == MigrationMode::Validate,
        "validate requires validate mode, got '{}'",
        config.migration.mode
    );

    println!("🔍 Validating migration state...");
    cmd_migrate_apply(config, root_dir, &CancellationToken::new()).await
}
