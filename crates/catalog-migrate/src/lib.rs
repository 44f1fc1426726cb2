//! Schema setup and teardown for the master/slave topology.
//!
//! Mirrors what the upstream system's `DatabaseManager.create_tables` does
//! at process start -- create the tables a node needs if they're missing --
//! except driven as a standalone command rather than bundled into every
//! process boot, and spread across three independent Postgres databases
//! rather than one MySQL instance with bound models.

use catalog_sql::{schema, NodeName};

/// Drops every table this crate knows about on `pool`, swallowing errors so
/// that re-running migrate against a fresh database (where nothing exists
/// yet) is not an error.
async fn drop_table_if_exists(pool: &sqlx::PgPool, table: &str) {
    let sql = format!("drop table if exists {table} cascade");
    if let Err(err) = sqlx::query(&sql).execute(pool).await {
        tracing::warn!(table, ?err, "failed to drop table (continuing)");
    }
}

/// Creates the full master schema: the canonical `games` table, both
/// pending queues, `node_status`, and `transaction_log`. Seeds one
/// `node_status` row per known node.
#[tracing::instrument(skip(pool))]
pub async fn migrate_master(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    for table in schema::all_table_names() {
        drop_table_if_exists(pool, table).await;
    }

    sqlx::query(&schema::create_games_table()).execute(pool).await?;
    sqlx::query(&schema::create_pending_windows_table()).execute(pool).await?;
    sqlx::query(&schema::create_pending_multi_os_table()).execute(pool).await?;
    sqlx::query(schema::create_node_status_table()).execute(pool).await?;
    sqlx::query(schema::create_transaction_log_table()).execute(pool).await?;

    catalog_sql::node_status::seed(pool).await?;

    tracing::info!("master schema created");
    Ok(())
}

/// Creates just the `games` table on a slave. Slaves never see the pending
/// queues, node_status, or transaction_log -- those are master-only by
/// design (spec §4.7, §3).
#[tracing::instrument(skip(pool), fields(node = %node))]
pub async fn migrate_slave(pool: &sqlx::PgPool, node: NodeName) -> anyhow::Result<()> {
    drop_table_if_exists(pool, "games").await;
    sqlx::query(&schema::create_games_table()).execute(pool).await?;
    tracing::info!("slave schema created");
    Ok(())
}

/// Runs the full migration: master unconditionally, then every slave the
/// caller was able to connect to. A slave that's down at migration time is
/// simply skipped -- the node monitor will surface it as unavailable once
/// the coordinator starts, and a later re-run of this command catches it up.
pub async fn run_migrations(
    master: &sqlx::PgPool,
    reachable_slaves: &[(NodeName, sqlx::PgPool)],
) -> anyhow::Result<()> {
    migrate_master(master).await?;
    for (node, pool) in reachable_slaves {
        migrate_slave(pool, *node).await?;
    }
    Ok(())
}

/// Drops just `node`'s own tables, leaving the others untouched.
#[tracing::instrument(skip(pool), fields(node = %node))]
pub async fn rollback(pool: &sqlx::PgPool, node: NodeName) -> anyhow::Result<()> {
    match node {
        NodeName::Master => {
            for table in schema::all_table_names() {
                drop_table_if_exists(pool, table).await;
            }
        }
        NodeName::SlaveA | NodeName::SlaveB => {
            drop_table_if_exists(pool, "games").await;
        }
    }
    tracing::info!("rolled back node schema");
    Ok(())
}
