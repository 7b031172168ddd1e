use crate::config::Config;
use crate::db::connection::mask_url_password;
use crate::db::provider::{PostgresProvider, ProviderOptions};
use crate::migration::FilesystemSource;
use crate::migrator::Migrator;
use anyhow::{Context, Result, bail};
use futures_util::future::join_all;
use std::path::Path;
use std::sync::Arc;

pub type TargetMigrator = Migrator<Arc<FilesystemSource>, PostgresProvider>;

/// Open the configured migrations directory, relative to the config file's directory
pub fn open_source(config: &Config, root_dir: &Path) -> Result<Arc<FilesystemSource>> {
    let dir = root_dir.join(&config.directories.migrations);
    let source = FilesystemSource::new(&dir)
        .with_context(|| format!("Cannot read migrations from {}", dir.display()))?;
    Ok(Arc::new(source))
}

/// Connect one migrator per configured target.
///
/// Targets that cannot be reached are returned separately so the rest
/// still run.
pub async fn connect_targets(
    config: &Config,
    source: Arc<FilesystemSource>,
) -> Result<(Vec<(String, TargetMigrator)>, Vec<(String, anyhow::Error)>)> {
    if config.databases.urls.is_empty() {
        bail!("No database URL configured: pass --database-url, set databases.urls, or set DATABASE_URL");
    }

    let options = ProviderOptions::from(&config.migration);
    let settings = config.migration.migrator_settings();

    let attempts = config.databases.urls.iter().map(|url| {
        let options = options.clone();
        async move {
            let label = mask_url_password(url);
            let provider = PostgresProvider::connect(url, options)
                .await
                .with_context(|| format!("Failed to connect to {}", label));
            (label, provider)
        }
    });

    let mut connected = Vec::new();
    let mut unreachable = Vec::new();
    for (label, provider) in join_all(attempts).await {
        match provider {
            Ok(provider) => connected.push((
                label,
                Migrator::new(source.clone(), provider, settings.clone()),
            )),
            Err(e) => unreachable.push((label, e)),
        }
    }

    Ok((connected, unreachable))
}

/// Close every target connection, logging failures
pub async fn close_targets(targets: Vec<(String, TargetMigrator)>) {
    for (label, migrator) in targets {
        let (_, provider) = migrator.into_parts();
        if let Err(e) = provider.close().await {
            tracing::debug!("Failed to close connection to {}: {}", label, e);
        }
    }
}
