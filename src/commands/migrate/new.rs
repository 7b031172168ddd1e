use crate::config::Config;
use crate::constants::{MAX_NAME_LENGTH, SCRIPT_EXTENSION};
use crate::migration::{FilesystemSource, Migration, MigrationSource, render_migration};
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Scaffold a change-script with the next free index
pub fn cmd_migrate_new(config: &Config, root_dir: &Path, name: &str) -> Result<PathBuf> {
    validate_name(name)?;

    let migrations_dir = root_dir.join(&config.directories.migrations);
    std::fs::create_dir_all(&migrations_dir).with_context(|| {
        format!(
            "Failed to create migrations directory {}",
            migrations_dir.display()
        )
    })?;

    let source = FilesystemSource::new(&migrations_dir)?;
    let index = match source.latest_blocking()? {
        Some(latest) => latest.index() + 1,
        None => 1,
    };
    debug!("Next migration index is {}", index);

    let migration = Migration::new(index, name, "-- Forward change\n").with_down("-- Reverse change\n");
    let path = migrations_dir.join(format!("{:04}_{}.{}", index, name, SCRIPT_EXTENSION));
    if path.exists() {
        bail!("{} already exists", path.display());
    }

    std::fs::write(&path, render_migration(&migration))
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("📝 Created {}", path.display());
    Ok(path)
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("Migration name cannot be empty");
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        bail!("Migration name must be {} characters or less", MAX_NAME_LENGTH);
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        bail!("Migration name may only contain letters, digits, '_' and '-'");
    }
    Ok(())
}
