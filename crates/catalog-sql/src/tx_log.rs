use chrono::{DateTime, Utc};
use serde_json::value::RawValue;
use uuid::Uuid;

use crate::{AppId, NodeName};

#[derive(Debug, Copy, Clone, PartialEq, Eq, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TxOperation {
    Insert,
    Update,
    Delete,
}

impl TxOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxOperation::Insert => "INSERT",
            TxOperation::Update => "UPDATE",
            TxOperation::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, sqlx::Type, serde::Serialize, serde::Deserialize)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TxStatus {
    Pending,
    Committed,
    Failed,
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "PENDING",
            TxStatus::Committed => "COMMITTED",
            TxStatus::Failed => "FAILED",
        }
    }
}

/// One row of the append-only transaction log (spec §3, C6 only). Writers
/// only ever append; the retry path is the sole mutator after insertion.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TxLogRow {
    pub log_id: i64,
    pub transaction_id: Uuid,
    pub node_id: i16,
    pub operation: String,
    pub record_id: Option<AppId>,
    pub old_data: Option<sqlx::types::Json<Box<RawValue>>>,
    pub new_data: Option<sqlx::types::Json<Box<RawValue>>>,
    pub timestamp: DateTime<Utc>,
    pub status: String,
    pub error_message: Option<String>,
    pub processed: bool,
}

#[tracing::instrument(level = "debug", skip(executor, old_data, new_data))]
pub async fn append<'e, E>(
    executor: E,
    transaction_id: Uuid,
    node: NodeName,
    operation: TxOperation,
    record_id: Option<AppId>,
    old_data: Option<&RawValue>,
    new_data: Option<&RawValue>,
    status: TxStatus,
    error_message: Option<&str>,
) -> sqlx::Result<i64>
where
    E: sqlx::PgExecutor<'e>,
{
    let processed = matches!(status, TxStatus::Committed);
    let old_data = old_data.map(|v| v.get().to_string());
    let new_data = new_data.map(|v| v.get().to_string());
    let row = sqlx::query!(
        r#"
        insert into transaction_log (
            transaction_id, node_id, operation, record_id, old_data, new_data,
            timestamp, status, error_message, processed
        ) values ($1, $2, $3, $4, $5::json, $6::json, now(), $7, $8, $9)
        returning log_id
        "#,
        transaction_id,
        node.node_id(),
        operation.as_str(),
        record_id,
        old_data,
        new_data,
        status.as_str(),
        error_message,
        processed,
    )
    .fetch_one(executor)
    .await?;
    Ok(row.log_id)
}

/// Rows with an open-ended outcome: `Processed = false` and
/// `Status ∈ {PENDING, FAILED}` (spec §4.5 retry manager).
#[tracing::instrument(level = "debug", skip(executor))]
pub async fn list_unprocessed<'e, E>(executor: E) -> sqlx::Result<Vec<TxLogRow>>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query_as!(
        TxLogRow,
        r#"
        select
            log_id, transaction_id, node_id, operation, record_id,
            old_data as "old_data: sqlx::types::Json<Box<RawValue>>",
            new_data as "new_data: sqlx::types::Json<Box<RawValue>>",
            timestamp, status, error_message, processed
        from transaction_log
        where processed = false and status in ('PENDING', 'FAILED')
        order by log_id asc
        "#
    )
    .fetch_all(executor)
    .await
}

#[tracing::instrument(level = "debug", skip(executor))]
pub async fn mark_committed<'e, E>(executor: E, log_id: i64) -> sqlx::Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query!(
        r#"
        update transaction_log
        set status = 'COMMITTED', processed = true, error_message = null
        where log_id = $1
        "#,
        log_id,
    )
    .execute(executor)
    .await?;
    Ok(())
}

#[tracing::instrument(level = "debug", skip(executor, error))]
pub async fn update_error<'e, E>(executor: E, log_id: i64, error: &str) -> sqlx::Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query!(
        r#"update transaction_log set error_message = $2 where log_id = $1"#,
        log_id,
        error,
    )
    .execute(executor)
    .await?;
    Ok(())
}
