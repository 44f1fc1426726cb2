use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use catalog_coordinator::monitor::NodeMonitor;
use catalog_coordinator::sync::PendingSyncService;
use catalog_coordinator::txn::{IsolationLevel, RetryManager};
use catalog_coordinator::{api, ConnectionBroker, NodeRegistry};
use catalog_sql::NodeName;
use clap::Parser;
use futures::FutureExt;

/// Catalog write coordinator: accepts writes while the master is reachable,
/// routes them to the correct slave partition, and reconciles anything it
/// couldn't deliver immediately.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// URL of the master Postgres database.
    #[clap(long = "master-database-url", env = "MASTER_DATABASE_URL")]
    master_database_url: String,
    /// URL of the slave A Postgres database (single-platform partition).
    #[clap(long = "slave-a-database-url", env = "SLAVE_A_DATABASE_URL")]
    slave_a_database_url: String,
    /// URL of the slave B Postgres database (multi-platform partition).
    #[clap(long = "slave-b-database-url", env = "SLAVE_B_DATABASE_URL")]
    slave_b_database_url: String,

    /// How often the pending sync service drains both queues.
    #[clap(long, env = "SYNC_INTERVAL", default_value = "10s", value_parser = humantime::parse_duration)]
    sync_interval: Duration,
    /// How often the node monitor re-checks every node.
    #[clap(long, env = "HEALTH_INTERVAL", default_value = "5s", value_parser = humantime::parse_duration)]
    health_interval: Duration,
    /// How often the transaction retry manager replays logged rows.
    #[clap(long, env = "RETRY_INTERVAL", default_value = "10s", value_parser = humantime::parse_duration)]
    retry_interval: Duration,
    /// Isolation level for C6's per-node transactions. Currently inert:
    /// this binary never instantiates a `TransactionManager`, only its
    /// `RetryManager` companion, which replays through plain upserts/deletes
    /// with no isolation level applied. Parsed and validated anyway so the
    /// flag fails fast once something does consume it.
    #[clap(long, env = "ISOLATION_LEVEL", default_value = "REPEATABLE READ")]
    isolation_level: String,
    /// Port to serve the HTTP API on.
    #[clap(long, env = "API_PORT", default_value = "8080")]
    api_port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let isolation: IsolationLevel = args
        .isolation_level
        .parse()
        .context("parsing --isolation-level")?;

    // Bind early so a slow migration or slave doesn't delay accepting
    // connections once everything else is ready.
    let api_listener = tokio::net::TcpListener::bind(format!("[::]:{}", args.api_port))
        .await
        .context("failed to bind API port")?;

    let master_pool = connect(&args.master_database_url, "master")
        .await
        .context("connecting to master")?;

    let mut reachable_slaves = Vec::new();
    for (node, url) in [
        (NodeName::SlaveA, &args.slave_a_database_url),
        (NodeName::SlaveB, &args.slave_b_database_url),
    ] {
        match connect(url, node.as_str()).await {
            Ok(pool) => reachable_slaves.push((node, pool)),
            Err(err) => {
                tracing::warn!(node = node.as_str(), ?err, "slave unreachable at startup, skipping its schema");
            }
        }
    }
    catalog_migrate::run_migrations(&master_pool, &reachable_slaves)
        .await
        .context("running startup migrations")?;

    let slave_a_pool = pool_for_broker(&args.slave_a_database_url, NodeName::SlaveA, &reachable_slaves)?;
    let slave_b_pool = pool_for_broker(&args.slave_b_database_url, NodeName::SlaveB, &reachable_slaves)?;

    let registry = Arc::new(NodeRegistry::new());
    let broker = Arc::new(ConnectionBroker::new(master_pool.clone(), slave_a_pool, slave_b_pool));

    spawn_pool_stats_logger(master_pool.clone());

    let shutdown = tokio::signal::ctrl_c().map(|_| ()).shared();

    let router = api::build_router(registry.clone(), broker.clone());
    let api_server = axum::serve(api_listener, router).with_graceful_shutdown(shutdown.clone());
    let api_server = async move { anyhow::Result::Ok(api_server.await?) };

    let sync_service = PendingSyncService { registry: registry.clone(), broker: broker.clone() };
    let sync_handle = tokio::spawn(catalog_automations::run(sync_service, args.sync_interval, shutdown.clone()));

    let retry_manager = RetryManager { registry: registry.clone(), broker: broker.clone() };
    let retry_handle = tokio::spawn(catalog_automations::run(retry_manager, args.retry_interval, shutdown.clone()));

    let node_monitor = NodeMonitor { registry: registry.clone(), broker: broker.clone() };
    let monitor_handle = tokio::spawn(catalog_automations::run(node_monitor, args.health_interval, shutdown.clone()));

    // No TransactionManager is constructed in this binary, so `isolation`
    // has nothing to be threaded into yet -- see its --help text above.
    let _ = isolation;

    let (api_result, sync_result, retry_result, monitor_result) =
        tokio::join!(api_server, sync_handle, retry_handle, monitor_handle);
    api_result?;
    sync_result?;
    retry_result?;
    monitor_result?;

    Ok(())
}

fn pool_for_broker(
    url: &str,
    node: NodeName,
    reachable: &[(NodeName, sqlx::PgPool)],
) -> anyhow::Result<sqlx::PgPool> {
    if let Some((_, pool)) = reachable.iter().find(|(n, _)| *n == node) {
        return Ok(pool.clone());
    }
    sqlx::postgres::PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(10))
        .connect_lazy(url)
        .with_context(|| format!("building lazy pool for {node}"))
}

async fn connect(url: &str, label: &str) -> anyhow::Result<sqlx::PgPool> {
    sqlx::postgres::PgPoolOptions::new()
        .acquire_timeout(Duration::from_secs(10))
        .max_connections(5)
        .connect(url)
        .await
        .with_context(|| format!("connecting to {label}"))
}

/// Periodically logs pool size and idle-connection count for the master,
/// following `agent/src/main.rs`'s connection-pool-stats loop.
fn spawn_pool_stats_logger(pool: sqlx::PgPool) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(120));
        loop {
            interval.tick().await;
            tracing::info!(
                total_connections = pool.size(),
                idle_connections = pool.num_idle(),
                "db connection pool stats"
            );
        }
    });
}
