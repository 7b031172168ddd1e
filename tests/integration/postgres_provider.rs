use crate::helpers::harness::with_test_db;
use lockstep::config::HistoryTable;
use futures_util::future::join_all;
use lockstep::{
    DatabaseProvider, Error, MemorySource, Migration, Migrator, MigratorSettings,
    PostgresProvider, ProviderOptions,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn options() -> ProviderOptions {
    ProviderOptions::default()
}

#[tokio::test]
async fn test_history_table_created_on_first_use() {
    with_test_db(async |db| {
        let provider = PostgresProvider::connect(db.url(), options()).await.unwrap();
        assert!(!db.table_exists("public", "lockstep_history").await);

        assert_eq!(provider.version().await.unwrap(), None);
        assert!(db.table_exists("public", "lockstep_history").await);

        // Setup is idempotent across providers
        let second = PostgresProvider::connect(db.url(), options()).await.unwrap();
        assert_eq!(second.version().await.unwrap(), None);

        provider.close().await.unwrap();
        second.close().await.unwrap();
    })
    .await;
}

#[tokio::test]
async fn test_custom_history_table_in_new_schema() {
    with_test_db(async |db| {
        let provider = PostgresProvider::connect(
            db.url(),
            ProviderOptions {
                history_table: HistoryTable {
                    schema: "ops".to_string(),
                    name: "applied_changes".to_string(),
                },
                ..options()
            },
        )
        .await
        .unwrap();

        assert_eq!(provider.version().await.unwrap(), None);
        assert!(db.table_exists("ops", "applied_changes").await);
        assert!(!db.table_exists("public", "lockstep_history").await);
    })
    .await;
}

#[tokio::test]
async fn test_apply_records_then_runs_script() {
    with_test_db(async |db| {
        let provider = PostgresProvider::connect(db.url(), options()).await.unwrap();

        let migration = Migration::new(
            1,
            "create_widgets",
            "CREATE TABLE widgets (id BIGSERIAL PRIMARY KEY);\nINSERT INTO widgets DEFAULT VALUES;\n",
        );
        provider.apply_migration(&migration).await.unwrap();

        assert_eq!(provider.version().await.unwrap(), Some(1));
        assert!(db.table_exists("public", "widgets").await);

        let (index, name): (i64, String) =
            sqlx::query_as(r#"SELECT "index", name FROM lockstep_history ORDER BY id DESC LIMIT 1"#)
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(index, 1);
        assert_eq!(name, "create_widgets");

        provider
            .apply_migration(&Migration::new(2, "noop", ""))
            .await
            .unwrap();
        assert_eq!(provider.version().await.unwrap(), Some(2));
    })
    .await;
}

#[tokio::test]
async fn test_failed_script_reports_apply_error() {
    with_test_db(async |db| {
        let provider = PostgresProvider::connect(db.url(), options()).await.unwrap();

        let err = provider
            .apply_migration(&Migration::new(3, "broken", "SELEC nonsense;\n"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Apply { index: 3, .. }));

        // The lock was released despite the failure
        let other = PostgresProvider::connect(
            db.url(),
            ProviderOptions {
                lock_timeout: Duration::from_millis(500),
                ..options()
            },
        )
        .await
        .unwrap();
        other.lock().await.unwrap();
        other.release_lock().await.unwrap();
    })
    .await;
}

#[tokio::test]
async fn test_lock_timeout_when_held_elsewhere() {
    with_test_db(async |db| {
        let holder = PostgresProvider::connect(db.url(), options()).await.unwrap();
        let waiter = PostgresProvider::connect(
            db.url(),
            ProviderOptions {
                lock_timeout: Duration::from_millis(400),
                ..options()
            },
        )
        .await
        .unwrap();

        holder.lock().await.unwrap();

        let err = waiter.lock().await.unwrap_err();
        assert!(matches!(err, Error::LockTimeout { .. }));
        assert!(err.is_retryable());

        holder.release_lock().await.unwrap();
        waiter.lock().await.unwrap();
        waiter.release_lock().await.unwrap();
    })
    .await;
}

#[tokio::test]
async fn test_releasing_unheld_lock_is_not_an_error() {
    with_test_db(async |db| {
        let provider = PostgresProvider::connect(db.url(), options()).await.unwrap();
        provider.release_lock().await.unwrap();
    })
    .await;
}

#[tokio::test]
async fn test_default_schema_receives_unqualified_objects() {
    with_test_db(async |db| {
        db.execute("CREATE SCHEMA app").await;

        let provider = PostgresProvider::connect(
            db.url(),
            ProviderOptions {
                default_schema: Some("app".to_string()),
                ..options()
            },
        )
        .await
        .unwrap();

        provider
            .apply_migration(&Migration::new(1, "gadgets", "CREATE TABLE gadgets (id INT);\n"))
            .await
            .unwrap();

        assert!(db.table_exists("app", "gadgets").await);
        assert!(!db.table_exists("public", "gadgets").await);
        // History stays where it was configured
        assert!(db.table_exists("public", "lockstep_history").await);
    })
    .await;
}

#[tokio::test]
async fn test_concurrent_first_use_shares_one_setup() {
    with_test_db(async |db| {
        let provider = Arc::new(PostgresProvider::connect(db.url(), options()).await.unwrap());

        let readers = (0..8).map(|_| {
            let provider = Arc::clone(&provider);
            tokio::spawn(async move { provider.version().await })
        });

        for reader in join_all(readers).await {
            assert_eq!(reader.unwrap().unwrap(), None);
        }
        assert!(db.table_exists("public", "lockstep_history").await);
    })
    .await;
}

#[tokio::test]
async fn test_apply_refuses_migration_recorded_by_another_session() {
    with_test_db(async |db| {
        let first = PostgresProvider::connect(db.url(), options()).await.unwrap();
        let second = PostgresProvider::connect(db.url(), options()).await.unwrap();
        assert_eq!(second.version().await.unwrap(), None);

        let migration = Migration::new(1, "counters", "CREATE TABLE counters (n INT);\n");
        first.apply_migration(&migration).await.unwrap();

        let err = second.apply_migration(&migration).await.unwrap_err();
        assert!(matches!(
            err,
            Error::AlreadyApplied {
                index: 1,
                recorded: 1
            }
        ));

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lockstep_history")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(rows, 1);
    })
    .await;
}

#[tokio::test]
async fn test_concurrent_migrators_apply_each_script_once() {
    with_test_db(async |db| {
        db.execute("CREATE TABLE run_log (idx BIGINT NOT NULL)").await;

        let scripts = || {
            MemorySource::from_migrations((1..=3).map(|i| {
                Migration::new(
                    i,
                    format!("step_{}", i),
                    format!("SELECT pg_sleep(0.3);\nINSERT INTO run_log VALUES ({});\n", i),
                )
            }))
            .unwrap()
        };

        let runner_a = PostgresProvider::connect(db.url(), options()).await.unwrap();
        let runner_b = PostgresProvider::connect(db.url(), options()).await.unwrap();
        // Both sessions see an empty history before either starts
        assert_eq!(runner_a.version().await.unwrap(), None);
        assert_eq!(runner_b.version().await.unwrap(), None);

        let a = Migrator::new(scripts(), runner_a, MigratorSettings::default());
        let b = Migrator::new(scripts(), runner_b, MigratorSettings::default());
        let cancel = CancellationToken::new();

        let (report_a, report_b) =
            tokio::join!(a.migrate_outstanding(&cancel), b.migrate_outstanding(&cancel));
        let (report_a, report_b) = (report_a.unwrap(), report_b.unwrap());

        let mut applied = [report_a.applied.clone(), report_b.applied.clone()].concat();
        applied.sort();
        assert_eq!(applied, vec![1, 2, 3]);
        assert!(report_a.is_noop() || report_b.is_noop());

        let executed: Vec<i64> = sqlx::query_scalar("SELECT idx FROM run_log ORDER BY idx")
            .fetch_all(db.pool())
            .await
            .unwrap();
        assert_eq!(executed, vec![1, 2, 3]);

        let recorded: Vec<i64> =
            sqlx::query_scalar(r#"SELECT "index" FROM lockstep_history ORDER BY id"#)
                .fetch_all(db.pool())
                .await
                .unwrap();
        assert_eq!(recorded, vec![1, 2, 3]);
    })
    .await;
}
