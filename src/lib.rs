//! Directive-based change-script migrations for PostgreSQL.
//!
//! A [`Migrator`] reads migrations from a [`MigrationSource`], compares them
//! with the version recorded by a [`DatabaseProvider`] and applies whatever
//! is outstanding, one migration at a time, in ascending index order.

pub mod blocking;
pub mod commands;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod migration;
pub mod migrator;
pub mod runner;

pub use blocking::{BlockingMigrator, BlockingProvider};
pub use db::{DatabaseProvider, PostgresProvider, ProviderOptions, SqlProvider};
pub use error::{Error, ParseError, ParseErrorKind, Result};
pub use migration::{FilesystemSource, MemorySource, Migration, MigrationSource};
pub use migrator::{
    MigrationMode, MigrationReport, MigrationStatus, Migrator, MigratorSettings, RunOutcome,
    plan_outstanding,
};
pub use runner::{RunSummary, TargetOutcome, run_all};
