use crate::db::provider::DatabaseProvider;
use crate::error::Error;
use crate::migration::MigrationSource;
use crate::migrator::{Migrator, RunOutcome};
use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// One target's result from `run_all`
#[derive(Debug)]
pub struct TargetOutcome {
    pub target: String,
    pub result: crate::Result<RunOutcome>,
}

/// Every target's outcome, in the order the targets were given
#[derive(Debug, Default)]
pub struct RunSummary {
    outcomes: Vec<TargetOutcome>,
}

impl RunSummary {
    pub fn outcomes(&self) -> &[TargetOutcome] {
        &self.outcomes
    }

    pub fn into_outcomes(self) -> Vec<TargetOutcome> {
        self.outcomes
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &Error)> {
        self.outcomes.iter().filter_map(|outcome| match &outcome.result {
            Ok(_) => None,
            Err(e) => Some((outcome.target.as_str(), e)),
        })
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.result.is_ok())
    }
}

/// Run every target concurrently; one target failing never stops another
pub async fn run_all<S, P>(
    targets: &[(String, Migrator<S, P>)],
    cancel: &CancellationToken,
) -> RunSummary
where
    S: MigrationSource,
    P: DatabaseProvider,
{
    let runs = targets.iter().map(|(target, migrator)| async move {
        let result = migrator.run(cancel).await;
        match &result {
            Ok(_) => info!("{}: done", target),
            Err(e) => error!("{}: {}", target, e),
        }
        TargetOutcome {
            target: target.clone(),
            result,
        }
    });

    RunSummary {
        outcomes: join_all(runs).await,
    }
}
