use crate::helpers::recording::{RecordingProvider, catalog};
use lockstep::{
    BlockingMigrator, BlockingProvider, DatabaseProvider, Error, MemorySource, Migration,
    Migrator, MigratorSettings,
};
use tokio_util::sync::CancellationToken;

fn blocking_migrator(
    source: MemorySource,
    provider: RecordingProvider,
) -> BlockingMigrator<MemorySource, RecordingProvider> {
    BlockingMigrator::build(|| async move {
        Ok(Migrator::new(source, provider, MigratorSettings::default()))
    })
    .unwrap()
}

#[test]
fn test_blocking_migrate_matches_async_semantics() {
    let migrator = blocking_migrator(catalog(&[3, 1, 2]), RecordingProvider::new());
    let cancel = CancellationToken::new();

    let report = migrator.migrate_outstanding(&cancel).unwrap();
    assert_eq!(report.applied, vec![1, 2, 3]);

    let again = migrator.migrate_outstanding(&cancel).unwrap();
    assert!(again.is_noop());
    assert_eq!(migrator.all_migrations_applied().unwrap(), Some(3));
}

#[test]
fn test_blocking_target_and_status() {
    let migrator = blocking_migrator(catalog(&[1, 2, 3, 4]), RecordingProvider::new());

    let report = migrator
        .migrate_to_version(2, &CancellationToken::new())
        .unwrap();
    assert_eq!(report.applied, vec![1, 2]);

    let status = migrator.status().unwrap();
    assert_eq!(status.recorded, Some(2));
    assert_eq!(status.outstanding.len(), 2);
}

#[test]
fn test_blocking_provider() {
    let provider = BlockingProvider::build(|| async { Ok(RecordingProvider::new()) }).unwrap();

    assert_eq!(provider.version().unwrap(), None);
    provider.lock().unwrap();
    provider.release_lock().unwrap();
    provider
        .apply_migration(&Migration::new(5, "five", "SELECT 5;\n"))
        .unwrap();
    assert_eq!(provider.version().unwrap(), Some(5));
}

#[tokio::test]
async fn test_blocking_api_refuses_async_context() {
    let result = BlockingMigrator::build(|| async {
        Ok(Migrator::new(
            catalog(&[1]),
            RecordingProvider::new(),
            MigratorSettings::default(),
        ))
    });
    assert!(matches!(result, Err(Error::Configuration(_))));

    // The async provider is still usable directly here
    let provider = RecordingProvider::new();
    assert_eq!(provider.version().await.unwrap(), None);
}
