use crate::helpers::recording::{RecordingProvider, catalog};
use lockstep::{Error, MemorySource, Migrator, MigratorSettings, RunOutcome, run_all};
use tokio_util::sync::CancellationToken;

fn target(
    label: &str,
    source: MemorySource,
    provider: RecordingProvider,
) -> (String, Migrator<MemorySource, RecordingProvider>) {
    (
        label.to_string(),
        Migrator::new(source, provider, MigratorSettings::default()),
    )
}

#[tokio::test]
async fn test_every_target_runs_and_failures_are_collected() {
    let targets = vec![
        target("alpha", catalog(&[1, 2]), RecordingProvider::new()),
        target("beta", catalog(&[1, 2]), RecordingProvider::new().with_recorded(9)),
        target("gamma", catalog(&[1, 2]), RecordingProvider::new().with_recorded(1)),
    ];

    let summary = run_all(&targets, &CancellationToken::new()).await;

    assert!(!summary.is_success());
    let labels: Vec<_> = summary.outcomes().iter().map(|o| o.target.as_str()).collect();
    assert_eq!(labels, vec!["alpha", "beta", "gamma"]);

    let failures: Vec<_> = summary.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "beta");
    assert!(matches!(failures[0].1, Error::UnknownAppliedVersion(9)));

    // The failing target did not stop the others
    assert_eq!(targets[0].1.provider().applied(), vec![1, 2]);
    assert_eq!(targets[2].1.provider().applied(), vec![2]);
    assert!(matches!(
        &summary.outcomes()[2].result,
        Ok(RunOutcome::Migrated(report)) if report.applied == vec![2]
    ));
}

#[tokio::test]
async fn test_all_targets_succeeding() {
    let targets = vec![
        target("one", catalog(&[1]), RecordingProvider::new()),
        target("two", catalog(&[1]), RecordingProvider::new()),
    ];

    let summary = run_all(&targets, &CancellationToken::new()).await;
    assert!(summary.is_success());
    assert_eq!(summary.failures().count(), 0);
    assert_eq!(summary.into_outcomes().len(), 2);
}
