//! `whippet-install`: provision a Whippet database from the environment.
//!
//! Reads `WHIPPET_DB_PROVIDER`, `WHIPPET_CONNECTION_STRING`,
//! `WHIPPET_INSTALL_DATABASE` and `WHIPPET_INSTALL_LOGIN_PASSWORD`, then runs
//! the standard installer sequence. Setting `WHIPPET_METRICS_ADDR` exposes a
//! Prometheus endpoint for the duration of the run.

use anyhow::Context;
use whippet_data::{DatabaseConnection, DatabaseProvider, WhippetConnection};
use whippet_installer::{
    CountrySeed, InstallContext, Installer, InstallerConfig, ProgressReporter, RootTenantSeed, Seed,
};
use whippet_runtime::metrics::MetricsServer;
use whippet_runtime::telemetry::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info,whippet_installer=debug,whippet_data=debug")?;

    if let Ok(addr) = std::env::var("WHIPPET_METRICS_ADDR") {
        let addr: std::net::SocketAddr = addr.parse().context("Invalid WHIPPET_METRICS_ADDR")?;
        MetricsServer::new(addr).start()?;
    }

    let config = InstallerConfig::from_env().context("Failed to read installer configuration")?;
    tracing::info!(
        provider = %config.database.provider,
        server = %config.database.connection_string,
        target = %config.target_database,
        "Configuration loaded"
    );

    let connection = WhippetConnection::open(&config.database)
        .await
        .context("Failed to connect to the database server")?;

    let seed = if config.database.provider == DatabaseProvider::PostgreSql {
        Seed::new()
            .with_seeder(0, RootTenantSeed)?
            .with_seeder(10, CountrySeed)?
    } else {
        Seed::new()
    };

    let progress = ProgressReporter::new()
        .on_status(|status, percent| tracing::info!(percent = percent.round(), "{status}"))
        .on_percent(|percent| tracing::debug!(percent = percent.round(), "Progress"));
    let mut context = InstallContext::new(config)
        .with_connection(connection)
        .with_progress(progress);

    let report = Installer::standard(seed).run(&mut context).await;
    if let Some(connection) = context.take_connection() {
        connection.close().await;
    }

    let report = report.into_result().context("Installation failed")?;
    for step in &report.completed {
        tracing::info!(
            action = %step.description,
            outcome = ?step.outcome,
            elapsed_ms = step.duration.as_millis(),
            "Step finished"
        );
    }
    Ok(())
}
