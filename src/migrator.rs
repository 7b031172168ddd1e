use crate::db::provider::DatabaseProvider;
use crate::error::{Error, Result};
use crate::migration::{Migration, MigrationSource};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What a `run` does
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationMode {
    /// Fail unless the database records the latest available migration
    Validate,
    /// Apply outstanding migrations
    #[default]
    Migrate,
}

impl MigrationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Migrate => "migrate",
        }
    }
}

impl fmt::Display for MigrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MigrationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "validate" => Ok(Self::Validate),
            "migrate" => Ok(Self::Migrate),
            other => Err(Error::Configuration(format!(
                "Unrecognized migration mode '{}': expected 'validate' or 'migrate'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigratorSettings {
    pub mode: MigrationMode,
    /// Upper bound for Migrate mode; never causes a rollback
    pub to_version: Option<i64>,
}

/// Result of a migrate call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub recorded_before: Option<i64>,
    /// Indices applied by this call, ascending
    pub applied: Vec<i64>,
}

impl MigrationReport {
    pub fn recorded_after(&self) -> Option<i64> {
        self.applied.last().copied().or(self.recorded_before)
    }

    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Result of a `run`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Validated { version: Option<i64> },
    Migrated(MigrationReport),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingMigration {
    pub index: i64,
    pub name: String,
}

/// Snapshot of a target without touching it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub recorded: Option<i64>,
    pub latest: Option<i64>,
    pub outstanding: Vec<PendingMigration>,
}

impl MigrationStatus {
    pub fn is_up_to_date(&self) -> bool {
        self.outstanding.is_empty()
    }
}

/// Select the migrations to apply, ascending by index.
///
/// Takes every entry above `recorded` and at or below `target`. A recorded
/// index missing from the catalog is refused so history and scripts cannot
/// silently diverge.
pub fn plan_outstanding(
    catalog: &[Migration],
    recorded: Option<i64>,
    target: Option<i64>,
) -> Result<Vec<&Migration>> {
    if let Some(recorded) = recorded
        && !catalog.iter().any(|m| m.index() == recorded)
    {
        return Err(Error::UnknownAppliedVersion(recorded));
    }

    let mut plan: Vec<&Migration> = catalog
        .iter()
        .filter(|m| recorded.is_none_or(|r| m.index() > r))
        .filter(|m| target.is_none_or(|t| m.index() <= t))
        .collect();
    plan.sort_by_key(|m| m.index());
    Ok(plan)
}

/// Drives a source's migrations into a provider
pub struct Migrator<S, P> {
    source: S,
    provider: P,
    settings: MigratorSettings,
}

impl<S: MigrationSource, P: DatabaseProvider> Migrator<S, P> {
    pub fn new(source: S, provider: P, settings: MigratorSettings) -> Self {
        Self {
            source,
            provider,
            settings,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn settings(&self) -> &MigratorSettings {
        &self.settings
    }

    pub fn into_parts(self) -> (S, P) {
        (self.source, self.provider)
    }

    /// Execute the configured mode
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunOutcome> {
        match self.settings.mode {
            MigrationMode::Validate => {
                let version = self.all_migrations_applied().await?;
                Ok(RunOutcome::Validated { version })
            }
            MigrationMode::Migrate => {
                let report = match self.settings.to_version {
                    Some(version) => self.migrate_to_version(version, cancel).await?,
                    None => self.migrate_outstanding(cancel).await?,
                };
                Ok(RunOutcome::Migrated(report))
            }
        }
    }

    /// Check that the latest available migration is the one recorded.
    ///
    /// Returns the shared version on success and never writes.
    pub async fn all_migrations_applied(&self) -> Result<Option<i64>> {
        let expected = self.source.latest().await?.map(Migration::index);
        let recorded = self.provider.version().await?;

        if expected != recorded {
            warn!(
                "Migration drift: latest available {:?}, recorded {:?}",
                expected, recorded
            );
            return Err(Error::ValidationFailed { expected, recorded });
        }

        debug!("All migrations applied (version {:?})", recorded);
        Ok(recorded)
    }

    /// Apply every migration above the recorded version
    pub async fn migrate_outstanding(&self, cancel: &CancellationToken) -> Result<MigrationReport> {
        self.migrate(None, cancel).await
    }

    /// Apply migrations above the recorded version up to and including
    /// `version`; a database already at or past it is left alone
    pub async fn migrate_to_version(
        &self,
        version: i64,
        cancel: &CancellationToken,
    ) -> Result<MigrationReport> {
        self.migrate(Some(version), cancel).await
    }

    pub async fn status(&self) -> Result<MigrationStatus> {
        let catalog = self.source.migrations().await?;
        let recorded = self.provider.version().await?;
        let plan = plan_outstanding(catalog, recorded, self.settings.to_version)?;

        Ok(MigrationStatus {
            recorded,
            latest: self.source.latest().await?.map(Migration::index),
            outstanding: plan
                .into_iter()
                .map(|m| PendingMigration {
                    index: m.index(),
                    name: m.name().to_string(),
                })
                .collect(),
        })
    }

    /// Plan and apply under the provider lock so a concurrent runner reads
    /// the version only after this one has finished writing it
    async fn migrate(
        &self,
        target: Option<i64>,
        cancel: &CancellationToken,
    ) -> Result<MigrationReport> {
        let catalog = self.source.migrations().await?;

        self.provider.lock().await?;
        let migrated = self.migrate_locked(catalog, target, cancel).await;
        let released = self.provider.release_lock().await;

        let report = migrated?;
        released?;
        Ok(report)
    }

    async fn migrate_locked(
        &self,
        catalog: &[Migration],
        target: Option<i64>,
        cancel: &CancellationToken,
    ) -> Result<MigrationReport> {
        let recorded_before = self.provider.version().await?;
        let plan = plan_outstanding(catalog, recorded_before, target)?;

        if plan.is_empty() {
            info!("Database is up to date (version {:?})", recorded_before);
            return Ok(MigrationReport {
                recorded_before,
                applied: Vec::new(),
            });
        }

        debug!("{} migration(s) outstanding", plan.len());
        let mut applied = Vec::with_capacity(plan.len());

        for migration in plan {
            if cancel.is_cancelled() {
                warn!("Cancelled after applying {} migration(s)", applied.len());
                return Err(Error::Cancelled {
                    applied: applied.len(),
                });
            }

            info!(
                "Applying migration {} ({})",
                migration.index(),
                migration.name()
            );
            self.provider.apply_migration(migration).await?;
            applied.push(migration.index());
        }

        info!("Applied {} migration(s)", applied.len());
        Ok(MigrationReport {
            recorded_before,
            applied,
        })
    }
}
