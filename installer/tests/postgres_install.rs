//! End-to-end installation against `PostgreSQL` using testcontainers.
//!
//! # Requirements
//!
//! Docker must be running. Run with `cargo test -p whippet-installer -- --ignored`.

#![allow(clippy::expect_used, clippy::unwrap_used)] // Test code uses expect for clear failure messages

use std::time::Duration;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use whippet_core::crud::{Create, GetAll};
use whippet_core::environment::Clock;
use whippet_data::{DatabaseConfig, DatabaseConnection, DatabaseProvider, WhippetConnection};
use whippet_installer::actions::LOGIN_NAME;
use whippet_installer::{
    ActionOutcome, CountrySeed, InstallContext, Installer, InstallerConfig, RootTenantSeed, Seed,
};
use whippet_localization::stores::postgres::PostgresAddressingStore;
use whippet_localization::{
    City, DEFAULT_COUNTRIES, GetCitiesByStateProvince, GetCountryByAbbreviation, GetStateProvinceByName,
    StateProvince,
};
use whippet_runtime::{Dispatcher, RetryPolicy};
use whippet_security::stores::postgres::PostgresSecurityStore;
use whippet_security::{
    GetRoleUserAssignmentsByUser, GetTenantByName, IsPasswordBlacklisted, PasswordBlacklistEntry, Role,
    RoleUserAssignment, Tenant, User, register_handlers,
};
use whippet_testing::{init_test_tracing, test_clock};

async fn start() -> (ContainerAsync<Postgres>, InstallerConfig) {
    let container = Postgres::default()
        .start()
        .await
        .expect("Failed to start postgres container");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get postgres port");

    let database = DatabaseConfig::new(
        DatabaseProvider::PostgreSql,
        &format!("Host=127.0.0.1;Port={port};Database=postgres;Username=postgres;Password=postgres"),
    )
    .expect("valid connection string")
    .with_retry(
        RetryPolicy::builder()
            .max_retries(30)
            .initial_delay(Duration::from_millis(200))
            .max_delay(Duration::from_secs(1))
            .build(),
    );
    let config = InstallerConfig::new(database)
        .with_target_database("WhippetE2E")
        .with_login_password("it's-a-secret");
    (container, config)
}

async fn install(config: &InstallerConfig) -> (InstallContext, whippet_installer::InstallReport) {
    let connection = WhippetConnection::open(&config.database)
        .await
        .expect("Failed to connect to postgres");
    let mut context = InstallContext::new(config.clone()).with_connection(connection);
    let seed = Seed::new()
        .with_seeder(0, RootTenantSeed)
        .unwrap()
        .with_seeder(10, CountrySeed)
        .unwrap();

    let report = Installer::standard(seed).run(&mut context).await;
    (context, report)
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn installs_and_serves_security_handlers() {
    init_test_tracing();
    let (_container, config) = start().await;

    let (context, report) = install(&config).await;
    assert!(report.is_success(), "{:?}", report.failure);
    assert!(
        report
            .completed
            .iter()
            .all(|step| step.outcome == ActionOutcome::Applied)
    );

    let connection = context.connection().unwrap();
    assert_eq!(connection.database(), Some("whippete2e"));
    assert!(connection.login_exists(LOGIN_NAME).await.unwrap());

    let store = PostgresSecurityStore::from_connection(connection.as_postgres().unwrap());
    let dispatcher = register_handlers(Dispatcher::builder(), &store).unwrap().build();
    let clock = test_clock();

    let root = dispatcher.query(GetTenantByName::new("ROOT")).await.unwrap();
    assert_eq!(root.len(), 1);
    assert!(root[0].is_root());

    let user = User::new("alice", "hash", &clock);
    let role = Role::new(Tenant::ROOT_ID, "admins", &clock);
    dispatcher.send(Create::new(user.clone())).await.unwrap();
    dispatcher.send(Create::new(role.clone())).await.unwrap();
    dispatcher
        .send(Create::new(RoleUserAssignment::new(role.id, user.id, &clock)))
        .await
        .unwrap();
    dispatcher
        .send(Create::new(PasswordBlacklistEntry::new("Password1", &clock)))
        .await
        .unwrap();

    let memberships = dispatcher
        .query(GetRoleUserAssignmentsByUser::new(user.id))
        .await
        .unwrap();
    assert_eq!(memberships.len(), 1);
    assert_eq!(memberships[0].role_id, role.id);

    let hits = dispatcher.query(IsPasswordBlacklisted::new("PASSWORD1")).await.unwrap();
    assert_eq!(hits.len(), 1);

    let duplicate = dispatcher.send(Create::new(User::new("ALICE", "other", &clock))).await;
    assert!(matches!(duplicate, Err(whippet_core::WhippetError::Conflict(_))));

    let users = dispatcher.query(GetAll::<User>::new()).await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].created_at, clock.now());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn seeded_countries_serve_addressing_handlers() {
    let (_container, config) = start().await;

    let (context, report) = install(&config).await;
    assert!(report.is_success(), "{:?}", report.failure);

    let connection = context.connection().unwrap().as_postgres().unwrap();
    let store = PostgresAddressingStore::from_connection(connection);
    let dispatcher = whippet_localization::register_handlers(Dispatcher::builder(), &store)
        .unwrap()
        .build();
    let clock = test_clock();

    let countries = dispatcher.query(GetAll::<whippet_localization::Country>::new()).await.unwrap();
    assert_eq!(countries.len(), DEFAULT_COUNTRIES.len());

    let canada = dispatcher
        .query(GetCountryByAbbreviation::new("ca"))
        .await
        .unwrap()
        .pop()
        .unwrap();
    let quebec = StateProvince::new(canada.id, "Québec", &clock).with_abbreviation("QC");
    dispatcher.send(Create::new(quebec.clone())).await.unwrap();
    dispatcher
        .send(Create::new(City::new(quebec.id, "Montréal", &clock)))
        .await
        .unwrap();

    let found = dispatcher
        .query(GetStateProvinceByName::new("québec", canada.id))
        .await
        .unwrap();
    assert_eq!(found, vec![quebec.clone()]);
    let cities = dispatcher.query(GetCitiesByStateProvince::new(quebec.id)).await.unwrap();
    assert_eq!(cities.len(), 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn second_install_skips_existing_objects() {
    let (_container, config) = start().await;

    let (first, report) = install(&config).await;
    assert!(report.is_success(), "{:?}", report.failure);
    first.connection().unwrap().close().await;

    let (_second, report) = install(&config).await;
    assert!(report.is_success(), "{:?}", report.failure);
    let outcomes: Vec<_> = report.completed.iter().map(|step| step.outcome.clone()).collect();
    assert!(matches!(outcomes[0], ActionOutcome::Skipped { .. }));
    assert!(matches!(outcomes[1], ActionOutcome::Skipped { .. }));
    assert_eq!(outcomes[2], ActionOutcome::Applied);
    assert_eq!(outcomes[3], ActionOutcome::Applied);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn missing_login_password_fails_the_login_step() {
    let (_container, mut config) = start().await;
    config.login_password = None;

    let (_context, report) = install(&config).await;

    assert_eq!(report.completed.len(), 1);
    let (description, error) = report.failure.unwrap();
    assert_eq!(description, "Creating Login");
    assert_eq!(error, whippet_core::WhippetError::argument_null("password"));
}
