//! Synchronous entry points for callers without an async runtime.
//!
//! Each facade owns a current-thread runtime and drives the async
//! implementation on it, so connections stay bound to the runtime that
//! created them.

use crate::db::provider::{DatabaseProvider, PostgresProvider, ProviderOptions};
use crate::error::{Error, Result};
use crate::migration::{Migration, MigrationSource};
use crate::migrator::{MigrationReport, MigrationStatus, Migrator, MigratorSettings, RunOutcome};
use std::future::Future;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio_util::sync::CancellationToken;

struct BlockingRuntime {
    runtime: Runtime,
}

impl BlockingRuntime {
    fn new() -> Result<Self> {
        ensure_outside_runtime()?;
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { runtime })
    }

    fn block_on<F: Future>(&self, future: F) -> Result<F::Output> {
        ensure_outside_runtime()?;
        Ok(self.runtime.block_on(future))
    }
}

fn ensure_outside_runtime() -> Result<()> {
    if Handle::try_current().is_ok() {
        return Err(Error::Configuration(
            "Blocking API called from within an async runtime; use the async API instead"
                .to_string(),
        ));
    }
    Ok(())
}

/// Blocking counterpart of `Migrator`
pub struct BlockingMigrator<S, P = PostgresProvider> {
    // Field order matters: the migrator must drop before its runtime
    inner: Migrator<S, P>,
    runtime: BlockingRuntime,
}

impl<S: MigrationSource> BlockingMigrator<S, PostgresProvider> {
    /// Connect to PostgreSQL inside a private runtime
    pub fn connect(
        source: S,
        url: &str,
        options: ProviderOptions,
        settings: MigratorSettings,
    ) -> Result<Self> {
        Self::build(|| async move {
            let provider = PostgresProvider::connect(url, options).await?;
            Ok(Migrator::new(source, provider, settings))
        })
    }
}

impl<S: MigrationSource, P: DatabaseProvider> BlockingMigrator<S, P> {
    /// Build the migrator on the facade's runtime
    pub fn build<F, Fut>(init: F) -> Result<Self>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Migrator<S, P>>>,
    {
        let runtime = BlockingRuntime::new()?;
        let inner = runtime.block_on(init())??;
        Ok(Self { inner, runtime })
    }

    pub fn migrator(&self) -> &Migrator<S, P> {
        &self.inner
    }

    pub fn run(&self, cancel: &CancellationToken) -> Result<RunOutcome> {
        self.runtime.block_on(self.inner.run(cancel))?
    }

    pub fn all_migrations_applied(&self) -> Result<Option<i64>> {
        self.runtime.block_on(self.inner.all_migrations_applied())?
    }

    pub fn migrate_outstanding(&self, cancel: &CancellationToken) -> Result<MigrationReport> {
        self.runtime.block_on(self.inner.migrate_outstanding(cancel))?
    }

    pub fn migrate_to_version(
        &self,
        version: i64,
        cancel: &CancellationToken,
    ) -> Result<MigrationReport> {
        self.runtime
            .block_on(self.inner.migrate_to_version(version, cancel))?
    }

    pub fn status(&self) -> Result<MigrationStatus> {
        self.runtime.block_on(self.inner.status())?
    }
}

/// Blocking counterpart of a `DatabaseProvider`
pub struct BlockingProvider<P = PostgresProvider> {
    inner: P,
    runtime: BlockingRuntime,
}

impl BlockingProvider<PostgresProvider> {
    pub fn connect(url: &str, options: ProviderOptions) -> Result<Self> {
        Self::build(|| PostgresProvider::connect(url, options))
    }
}

impl<P: DatabaseProvider> BlockingProvider<P> {
    pub fn build<F, Fut>(init: F) -> Result<Self>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<P>>,
    {
        let runtime = BlockingRuntime::new()?;
        let inner = runtime.block_on(init())??;
        Ok(Self { inner, runtime })
    }

    pub fn lock(&self) -> Result<()> {
        self.runtime.block_on(self.inner.lock())?
    }

    pub fn release_lock(&self) -> Result<()> {
        self.runtime.block_on(self.inner.release_lock())?
    }

    pub fn version(&self) -> Result<Option<i64>> {
        self.runtime.block_on(self.inner.version())?
    }

    pub fn apply_migration(&self, migration: &Migration) -> Result<()> {
        self.runtime.block_on(self.inner.apply_migration(migration))?
    }
}
