//! Standard installation against file-backed `SQLite` databases.

#![allow(clippy::unwrap_used)] // Test code

use whippet_data::{DatabaseConfig, DatabaseConnection, DatabaseProvider, WhippetConnection};
use whippet_installer::{ActionOutcome, InstallContext, Installer, InstallerConfig, Seed};
use whippet_testing::init_test_tracing;

async fn context(dir: &std::path::Path) -> InstallContext {
    let server = dir.join("server.sqlite");
    let database = DatabaseConfig::new(
        DatabaseProvider::Sqlite,
        &format!("Data Source={}", server.display()),
    )
    .unwrap();
    let connection = WhippetConnection::open(&database).await.unwrap();
    let target = dir.join("whippet");

    InstallContext::new(
        InstallerConfig::new(database).with_target_database(target.display().to_string()),
    )
    .with_connection(connection)
}

#[tokio::test]
async fn installs_schema_into_target_file() {
    init_test_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut context = context(dir.path()).await;

    let report = Installer::standard(Seed::new()).run(&mut context).await;

    assert!(report.is_success(), "{:?}", report.failure);
    let outcomes: Vec<_> = report.completed.iter().map(|step| &step.outcome).collect();
    assert!(matches!(outcomes[0], ActionOutcome::Skipped { .. }));
    assert!(matches!(outcomes[1], ActionOutcome::Skipped { .. }));
    assert_eq!(outcomes[2], &ActionOutcome::Applied);
    assert!(matches!(outcomes[3], ActionOutcome::Skipped { .. }));

    assert!(dir.path().join("whippet.sqlite").exists());
    let connection = context.connection().unwrap();
    assert!(connection.database().unwrap().ends_with("whippet.sqlite"));

    let pool = connection.as_sqlite().unwrap().pool().clone();
    let count: i64 = sqlx::query_scalar(
        "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name IN ('tenants', 'users', 'roles')",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(count, 3);
}

#[tokio::test]
async fn reinstalling_is_harmless() {
    let dir = tempfile::tempdir().unwrap();

    for _ in 0..2 {
        let mut context = context(dir.path()).await;
        let report = Installer::standard(Seed::new()).run(&mut context).await;
        assert!(report.is_success(), "{:?}", report.failure);
        context.take_connection().unwrap().close().await;
    }
}
