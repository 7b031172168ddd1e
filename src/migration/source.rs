use super::{Migration, latest_of, parse_migration_str};
use crate::constants::SCRIPT_EXTENSION;
use crate::error::{Error, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Enumerates the migrations available to a migrator.
///
/// Order is discovery order, not necessarily index order; callers sort.
#[async_trait]
pub trait MigrationSource: Send + Sync {
    async fn migrations(&self) -> Result<&[Migration]>;

    /// Highest-indexed migration, if any
    async fn latest(&self) -> Result<Option<&Migration>> {
        Ok(latest_of(self.migrations().await?))
    }

    fn migrations_blocking(&self) -> Result<&[Migration]>;

    fn latest_blocking(&self) -> Result<Option<&Migration>> {
        Ok(latest_of(self.migrations_blocking()?))
    }
}

#[async_trait]
impl<T: MigrationSource + ?Sized> MigrationSource for Arc<T> {
    async fn migrations(&self) -> Result<&[Migration]> {
        (**self).migrations().await
    }

    fn migrations_blocking(&self) -> Result<&[Migration]> {
        (**self).migrations_blocking()
    }
}

/// Change-scripts read from a directory tree.
///
/// The catalog is built on first use and cached for the lifetime of the
/// source; later calls never touch the filesystem again.
#[derive(Debug)]
pub struct FilesystemSource {
    root: PathBuf,
    catalog: OnceCell<Vec<Migration>>,
}

impl FilesystemSource {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::NotFound(root));
        }

        Ok(Self {
            root,
            catalog: OnceCell::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn load_blocking(&self) -> Result<Vec<Migration>> {
        let mut scripts = Vec::new();
        for path in discover_scripts(&self.root)? {
            let text = std::fs::read_to_string(&path)?;
            scripts.push((path, text));
        }
        build_catalog(scripts)
    }

    async fn load(&self) -> Result<Vec<Migration>> {
        let root = self.root.clone();
        let paths = tokio::task::spawn_blocking(move || discover_scripts(&root))
            .await
            .map_err(std::io::Error::other)??;

        let mut scripts = Vec::with_capacity(paths.len());
        for path in paths {
            let text = tokio::fs::read_to_string(&path).await?;
            scripts.push((path, text));
        }
        build_catalog(scripts)
    }
}

#[async_trait]
impl MigrationSource for FilesystemSource {
    async fn migrations(&self) -> Result<&[Migration]> {
        if let Some(catalog) = self.catalog.get() {
            return Ok(catalog.as_slice());
        }

        let built = self.load().await?;
        // A concurrent loader may have won the race; both read the same files
        Ok(self.catalog.get_or_init(|| built).as_slice())
    }

    fn migrations_blocking(&self) -> Result<&[Migration]> {
        self.catalog
            .get_or_try_init(|| self.load_blocking())
            .map(Vec::as_slice)
    }
}

/// Migrations defined in code
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    migrations: Vec<Migration>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a migration, rejecting an index that is already present
    pub fn push(&mut self, migration: Migration) -> Result<()> {
        if let Some(existing) = self
            .migrations
            .iter()
            .find(|m| m.index() == migration.index())
        {
            return Err(Error::DuplicateIndex {
                index: migration.index(),
                first: existing.name().to_string(),
                second: migration.name().to_string(),
            });
        }

        self.migrations.push(migration);
        Ok(())
    }

    pub fn with_migration(mut self, migration: Migration) -> Result<Self> {
        self.push(migration)?;
        Ok(self)
    }

    /// Build a catalog from `migrations`, failing on the first repeated index
    pub fn from_migrations(migrations: impl IntoIterator<Item = Migration>) -> Result<Self> {
        let mut source = Self::new();
        for migration in migrations {
            source.push(migration)?;
        }
        Ok(source)
    }
}


#[async_trait]
impl MigrationSource for MemorySource {
    async fn migrations(&self) -> Result<&[Migration]> {
        Ok(self.migrations.as_slice())
    }

    fn migrations_blocking(&self) -> Result<&[Migration]> {
        Ok(self.migrations.as_slice())
    }
}

/// Parse discovered scripts and reject duplicate indices
fn build_catalog(scripts: Vec<(PathBuf, String)>) -> Result<Vec<Migration>> {
    let mut seen: HashMap<i64, String> = HashMap::new();
    let mut catalog = Vec::with_capacity(scripts.len());

    for (path, text) in scripts {
        let migration =
            parse_migration_str(&text).map_err(|source| Error::Script {
                path: path.clone(),
                source,
            })?;

        if let Some(first) = seen.insert(migration.index(), migration.name().to_string()) {
            return Err(Error::DuplicateIndex {
                index: migration.index(),
                first,
                second: migration.name().to_string(),
            });
        }

        debug!(
            "Loaded migration {} ({}) from {}",
            migration.index(),
            migration.name(),
            path.display()
        );
        catalog.push(migration);
    }

    Ok(catalog)
}

/// Find change-scripts recursively, sorted by file name at every level
pub fn discover_scripts(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::NotFound(dir.to_path_buf()));
    }

    fn collect(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
        let mut entries = std::fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            if path.is_dir() {
                collect(&path, files)?;
            } else if is_script(&path) {
                files.push(path);
            }
        }

        Ok(())
    }

    let mut files = Vec::new();
    collect(dir, &mut files)?;
    Ok(files)
}

fn is_script(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(SCRIPT_EXTENSION))
}
