use super::common::{close_targets, connect_targets, open_source};
use crate::config::Config;
use crate::migrator::RunOutcome;
use crate::runner::run_all;
use anyhow::{Result, bail};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Run the configured mode against every target and report per target
pub async fn cmd_migrate_apply(
    config: &Config,
    root_dir: &Path,
    cancel: &CancellationToken,
) -> Result<()> {
    let source = open_source(config, root_dir)?;
    let (targets, unreachable) = connect_targets(config, source).await?;
    let total = targets.len() + unreachable.len();

    info!(
        "Running {} against {} target(s)",
        config.migration.mode, total
    );
    let summary = run_all(&targets, cancel).await;

    for outcome in summary.outcomes() {
        match &outcome.result {
            Ok(RunOutcome::Migrated(report)) if report.is_noop() => {
                println!(
                    "✅ {}: up to date at {}",
                    outcome.target,
                    describe_version(report.recorded_before)
                );
            }
            Ok(RunOutcome::Migrated(report)) => {
                println!(
                    "✅ {}: applied {} migration(s), now at {}",
                    outcome.target,
                    report.applied.len(),
                    describe_version(report.recorded_after())
                );
            }
            Ok(RunOutcome::Validated { version }) => {
                println!(
                    "✅ {}: all migrations applied ({})",
                    outcome.target,
                    describe_version(*version)
                );
            }
            Err(e) => eprintln!("❌ {}: {}", outcome.target, e),
        }
    }
    for (label, e) in &unreachable {
        eprintln!("❌ {}: {:#}", label, e);
    }

    let failed = summary.failures().count() + unreachable.len();
    close_targets(targets).await;

    if failed > 0 {
        bail!("{} of {} target(s) failed", failed, total);
    }
    Ok(())
}

pub(crate) fn describe_version(version: Option<i64>) -> String {
    match version {
        Some(v) => format!("version {}", v),
        None => "no recorded version".to_string(),
    }
}
