use crate::config::types::{HistoryTable, MigrationSettings};
use crate::constants::{DEFAULT_LOCK_NAME, DEFAULT_LOCK_TIMEOUT, LOCK_POLL_INTERVAL};
use crate::db::connection::{ConnectionConfig, connect_with_retry};
use crate::db::dialect::{Dialect, Postgres};
use crate::db::history::{parse_recorded_version, qualified_table_name, quote_identifier};
use crate::error::{Error, Result};
use crate::migration::Migration;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Connection, Executor};
use sqlx::postgres::PgConnection;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Storage a migrator applies migrations to.
///
/// Implementations create their history storage on first use and serialize
/// history writes across processes with an advisory lock.
#[async_trait]
pub trait DatabaseProvider: Send + Sync {
    /// Wait for the advisory lock, failing with `LockTimeout`
    async fn lock(&self) -> Result<()>;

    /// Release the advisory lock; releasing a lock that is not held only warns
    async fn release_lock(&self) -> Result<()>;

    /// Most recently recorded migration index
    async fn version(&self) -> Result<Option<i64>>;

    /// Record the migration in history, then run its forward script.
    ///
    /// Fails with `AlreadyApplied` when the recorded version has already
    /// reached the migration's index.
    async fn apply_migration(&self, migration: &Migration) -> Result<()>;
}

#[async_trait]
impl<T: DatabaseProvider + ?Sized> DatabaseProvider for Arc<T> {
    async fn lock(&self) -> Result<()> {
        (**self).lock().await
    }

    async fn release_lock(&self) -> Result<()> {
        (**self).release_lock().await
    }

    async fn version(&self) -> Result<Option<i64>> {
        (**self).version().await
    }

    async fn apply_migration(&self, migration: &Migration) -> Result<()> {
        (**self).apply_migration(migration).await
    }
}

/// Settings for a `SqlProvider`
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    pub lock_name: String,
    pub lock_timeout: Duration,
    pub history_table: HistoryTable,
    /// Session `search_path` for change-scripts using unqualified names
    pub default_schema: Option<String>,
    pub connection: ConnectionConfig,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            lock_name: DEFAULT_LOCK_NAME.to_string(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            history_table: HistoryTable::default(),
            default_schema: None,
            connection: ConnectionConfig::default(),
        }
    }
}

impl From<&MigrationSettings> for ProviderOptions {
    fn from(settings: &MigrationSettings) -> Self {
        Self {
            lock_name: settings.lock_name.clone(),
            lock_timeout: settings.lock_timeout,
            history_table: settings.history_table.clone(),
            default_schema: settings.default_schema.clone(),
            connection: ConnectionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Readiness {
    Uninitialized,
    Ready,
}

struct Session {
    conn: PgConnection,
    readiness: Readiness,
}

/// Provider driving one dedicated connection with SQL from a `Dialect`.
///
/// Advisory locks are session-scoped, so every statement goes through the
/// same connection. The session mutex doubles as the in-process latch for
/// one-time history table setup.
pub struct SqlProvider<D: Dialect = Postgres> {
    dialect: D,
    session: Mutex<Session>,
    lock_name: String,
    lock_timeout: Duration,
    history_schema: String,
    history_table: String,
}

pub type PostgresProvider = SqlProvider<Postgres>;

impl SqlProvider<Postgres> {
    pub async fn connect(url: &str, options: ProviderOptions) -> Result<Self> {
        Self::connect_with_dialect(Postgres, url, options).await
    }
}

impl<D: Dialect> SqlProvider<D> {
    pub async fn connect_with_dialect(
        dialect: D,
        url: &str,
        options: ProviderOptions,
    ) -> Result<Self> {
        if options.lock_timeout.is_zero() {
            return Err(Error::Configuration(
                "Lock timeout must be greater than zero".to_string(),
            ));
        }

        let history_schema = quote_identifier("schema", &options.history_table.schema)?;
        let history_table = qualified_table_name(&options.history_table)?;
        let default_schema = options
            .default_schema
            .as_deref()
            .map(|schema| quote_identifier("schema", schema))
            .transpose()?;

        let mut conn = connect_with_retry(url, &options.connection).await?;

        if let Some(sql) = default_schema
            .as_deref()
            .and_then(|schema| dialect.session_setup_sql(schema))
        {
            Executor::execute(&mut conn, sql.as_str()).await?;
            debug!("Session initialized: {}", sql);
        }

        Ok(Self {
            dialect,
            session: Mutex::new(Session {
                conn,
                readiness: Readiness::Uninitialized,
            }),
            lock_name: options.lock_name,
            lock_timeout: options.lock_timeout,
            history_schema,
            history_table,
        })
    }

    pub fn lock_name(&self) -> &str {
        &self.lock_name
    }

    /// Quoted, schema-qualified history table
    pub fn history_table(&self) -> &str {
        &self.history_table
    }

    /// Close the underlying connection gracefully
    pub async fn close(self) -> Result<()> {
        let session = self.session.into_inner();
        session.conn.close().await?;
        Ok(())
    }

    async fn try_lock(&self, conn: &mut PgConnection) -> Result<bool> {
        let acquired: bool = sqlx::query_scalar(self.dialect.lock_sql())
            .bind(&self.lock_name)
            .fetch_one(&mut *conn)
            .await?;
        Ok(acquired)
    }

    async fn acquire(&self, conn: &mut PgConnection) -> Result<()> {
        let deadline = Instant::now() + self.lock_timeout;

        loop {
            if self.try_lock(conn).await? {
                debug!("Acquired advisory lock '{}'", self.lock_name);
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::LockTimeout {
                    name: self.lock_name.clone(),
                    timeout: self.lock_timeout,
                });
            }

            debug!("Advisory lock '{}' is busy, waiting", self.lock_name);
            tokio::time::sleep(LOCK_POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn release(&self, conn: &mut PgConnection) -> Result<()> {
        let released: bool = sqlx::query_scalar(self.dialect.unlock_sql())
            .bind(&self.lock_name)
            .fetch_one(&mut *conn)
            .await?;

        if released {
            debug!("Released advisory lock '{}'", self.lock_name);
        } else {
            warn!(
                "Advisory lock '{}' was not held by this session",
                self.lock_name
            );
        }

        Ok(())
    }

    /// Create the history table once per provider, under the advisory lock
    async fn ensure_ready(&self, session: &mut Session) -> Result<()> {
        if session.readiness == Readiness::Ready {
            return Ok(());
        }

        self.acquire(&mut session.conn).await?;
        let setup = self.create_history_table(&mut session.conn).await;
        let released = self.release(&mut session.conn).await;
        setup?;
        released?;

        session.readiness = Readiness::Ready;
        debug!("History table {} is ready", self.history_table);
        Ok(())
    }

    async fn create_history_table(&self, conn: &mut PgConnection) -> Result<()> {
        for statement in self
            .dialect
            .schema_setup_sql(&self.history_schema, &self.history_table)
        {
            Executor::execute(&mut *conn, statement.as_str()).await?;
        }
        Ok(())
    }

    async fn read_version(&self, conn: &mut PgConnection) -> Result<Option<i64>> {
        let query = self.dialect.version_query(&self.history_table);
        let raw: Option<String> = sqlx::query_scalar(&query)
            .fetch_optional(&mut *conn)
            .await?;

        parse_recorded_version(raw)
    }

    /// Refuse a migration another session recorded while this one waited for the lock
    async fn apply_if_outstanding(
        &self,
        conn: &mut PgConnection,
        migration: &Migration,
    ) -> Result<()> {
        if let Some(recorded) = self.read_version(conn).await?
            && recorded >= migration.index()
        {
            return Err(Error::AlreadyApplied {
                index: migration.index(),
                recorded,
            });
        }

        self.record_and_execute(conn, migration).await
    }

    async fn record_and_execute(
        &self,
        conn: &mut PgConnection,
        migration: &Migration,
    ) -> Result<()> {
        let insert = self.dialect.insert_sql(&self.history_table);
        sqlx::query(&insert)
            .bind(migration.index())
            .bind(migration.name())
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;

        if migration.command().trim().is_empty() {
            debug!("Migration {} has an empty forward script", migration.index());
            return Ok(());
        }

        Executor::execute(&mut *conn, migration.command())
            .await
            .map_err(|source| Error::Apply {
                index: migration.index(),
                name: migration.name().to_string(),
                source,
            })?;

        Ok(())
    }
}

#[async_trait]
impl<D: Dialect> DatabaseProvider for SqlProvider<D> {
    async fn lock(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        self.acquire(&mut session.conn).await
    }

    async fn release_lock(&self) -> Result<()> {
        let mut session = self.session.lock().await;
        self.release(&mut session.conn).await
    }

    async fn version(&self) -> Result<Option<i64>> {
        let mut session = self.session.lock().await;
        self.ensure_ready(&mut session).await?;
        self.read_version(&mut session.conn).await
    }

    async fn apply_migration(&self, migration: &Migration) -> Result<()> {
        let mut session = self.session.lock().await;
        self.ensure_ready(&mut session).await?;

        let conn = &mut session.conn;
        self.acquire(conn).await?;
        let applied = self.apply_if_outstanding(conn, migration).await;
        let released = self.release(conn).await;
        applied?;
        released
    }
}
