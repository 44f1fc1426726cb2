use chrono::{DateTime, Utc};

use crate::NodeName;

/// One row per node, living on the master for the master process's lifetime
/// (spec §3).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NodeStatusRow {
    pub node_name: String,
    pub is_available: bool,
    pub last_checked: DateTime<Utc>,
    pub last_sync: Option<DateTime<Utc>>,
    pub failure_count: i32,
    pub last_error: Option<String>,
}

/// Seeds one row per known node (spec §4.7), skipping any that already
/// exist -- the migrator may run against a master that already has history.
#[tracing::instrument(level = "debug", skip(executor))]
pub async fn seed<'e, E>(executor: E) -> sqlx::Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    for node in NodeName::ALL {
        sqlx::query!(
            r#"
            insert into node_status (node_name, is_available, last_checked, failure_count)
            values ($1, true, now(), 0)
            on conflict (node_name) do nothing
            "#,
            node.as_str(),
        )
        .execute(executor)
        .await?;
    }
    Ok(())
}

#[tracing::instrument(level = "debug", skip(executor))]
pub async fn fetch_all<'e, E>(executor: E) -> sqlx::Result<Vec<NodeStatusRow>>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as!(NodeStatusRow, r#"select * from node_status"#)
        .fetch_all(executor)
        .await
}

#[tracing::instrument(level = "debug", skip(executor))]
pub async fn mark_online<'e, E>(executor: E, node: NodeName) -> sqlx::Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query!(
        r#"
        update node_status
        set is_available = true, last_checked = now(), failure_count = 0, last_error = null
        where node_name = $1
        "#,
        node.as_str(),
    )
    .execute(executor)
    .await?;
    Ok(())
}

#[tracing::instrument(level = "debug", skip(executor, error))]
pub async fn mark_offline<'e, E>(executor: E, node: NodeName, error: &str) -> sqlx::Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query!(
        r#"
        update node_status
        set is_available = false,
            last_checked = now(),
            failure_count = failure_count + 1,
            last_error = $2
        where node_name = $1
        "#,
        node.as_str(),
        error,
    )
    .execute(executor)
    .await?;
    Ok(())
}

#[tracing::instrument(level = "debug", skip(executor))]
pub async fn mark_synced_now<'e, E>(executor: E, node: NodeName) -> sqlx::Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query!(
        r#"update node_status set last_sync = now() where node_name = $1"#,
        node.as_str(),
    )
    .execute(executor)
    .await?;
    Ok(())
}
