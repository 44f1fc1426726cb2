//! Transaction Manager (spec §4.5, C6): the alternate CRUD path with
//! per-node transactional bookkeeping, an append-only transaction log on
//! the master, and a companion retry manager.

use std::sync::Arc;

use catalog_automations::PeriodicWorker;
use catalog_sql::tx_log::{self, TxLogRow, TxOperation, TxStatus};
use catalog_sql::{games, AppId, NodeName};
use serde_json::value::RawValue;
use uuid::Uuid;

use crate::broker::ConnectionBroker;
use crate::model::{classify, GameInput, GameRecord, Partition};
use crate::registry::NodeRegistry;

/// Isolation level for the per-node DML (spec §4.5, §6). Stored as a
/// closed enum rather than a free string so an invalid `--isolation-level`
/// flag fails at startup, not mid-transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

impl std::str::FromStr for IsolationLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "READ UNCOMMITTED" => Ok(IsolationLevel::ReadUncommitted),
            "READ COMMITTED" => Ok(IsolationLevel::ReadCommitted),
            "REPEATABLE READ" => Ok(IsolationLevel::RepeatableRead),
            "SERIALIZABLE" => Ok(IsolationLevel::Serializable),
            other => anyhow::bail!("unknown isolation level: {other}"),
        }
    }
}

/// `create`/`update`/`delete` targets computed the same way C4 routes, but
/// always including the master (spec §4.5 "Routing").
fn insert_update_targets(windows: bool, mac: bool, linux: bool) -> Vec<NodeName> {
    let mut targets = vec![NodeName::Master];
    match classify(windows, mac, linux) {
        Partition::WindowsOnly => targets.push(NodeName::SlaveA),
        Partition::MultiPlatform => targets.push(NodeName::SlaveB),
        Partition::MasterOnly => {}
    }
    targets
}

fn delete_targets() -> Vec<NodeName> {
    NodeName::ALL.to_vec()
}

pub struct TransactionManager<'a> {
    pub registry: &'a NodeRegistry,
    pub broker: &'a ConnectionBroker,
    pub isolation: IsolationLevel,
}

impl<'a> TransactionManager<'a> {
    /// CREATE: assigns the next id on master the same way C4 does, then
    /// logs+applies an INSERT to every target (spec §4.5 "Routing").
    #[tracing::instrument(level = "info", skip(self, input))]
    pub async fn create(&self, master: &sqlx::PgPool, input: GameInput) -> anyhow::Result<GameRecord> {
        let app_id = games::max_app_id(master).await? + 1;
        let record = GameRecord::canonicalize(input, app_id, chrono::Utc::now())?;
        self.write(master, &record, TxOperation::Insert).await?;
        Ok(record)
    }

    /// READ: a plain point lookup on master, no logging (spec §4.5 only
    /// describes transactional bookkeeping for the write operations).
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn read(&self, master: &sqlx::PgPool, app_id: AppId) -> anyhow::Result<Option<GameRecord>> {
        let row = games::fetch(master, app_id).await?;
        Ok(row.map(|row| GameRecord::from_game_row(&row)))
    }

    /// UPDATE: same routing as CREATE but against an existing id; targets
    /// that don't have the row yet receive it via the idempotent upsert.
    #[tracing::instrument(level = "info", skip(self, input))]
    pub async fn update(
        &self,
        master: &sqlx::PgPool,
        app_id: AppId,
        input: GameInput,
    ) -> anyhow::Result<GameRecord> {
        let record = GameRecord::canonicalize(input, app_id, chrono::Utc::now())?;
        self.write(master, &record, TxOperation::Update).await?;
        Ok(record)
    }

    /// spec §4.5 "Per-target transaction": one uuid shared across every
    /// per-node row for this logical operation.
    async fn write(&self, master: &sqlx::PgPool, record: &GameRecord, operation: TxOperation) -> anyhow::Result<()> {
        let transaction_id = Uuid::new_v4();
        let row = record.to_game_row();
        let new_data = serde_json::value::to_raw_value(&row)?;
        let targets = insert_update_targets(record.windows, record.mac, record.linux);

        for target in targets {
            self.apply_one(master, target, transaction_id, operation, Some(record.app_id), None, Some(&new_data), |pool| {
                let row = row.clone();
                Box::pin(async move { games::upsert(pool, &row).await.map_err(anyhow::Error::from) })
            })
            .await;
        }
        Ok(())
    }

    /// spec §4.5 "DELETE targets all three nodes unconditionally"; old_data
    /// is read from master before touching any target.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn delete(&self, master: &sqlx::PgPool, app_id: AppId) -> anyhow::Result<()> {
        let transaction_id = Uuid::new_v4();
        let old = games::fetch(master, app_id).await?;
        let old_data = match &old {
            Some(row) => Some(serde_json::value::to_raw_value(row)?),
            None => None,
        };

        for target in delete_targets() {
            self.apply_one(
                master,
                target,
                transaction_id,
                TxOperation::Delete,
                Some(app_id),
                old_data.as_deref(),
                None,
                move |pool| Box::pin(async move { games::delete(pool, app_id).await.map_err(anyhow::Error::from) }),
            )
            .await;
        }
        Ok(())
    }

    /// Runs `op` against `target` inside its own local transaction at the
    /// configured isolation level; appends the matching log row regardless
    /// of outcome (spec §4.5 steps 2-3).
    async fn apply_one<F>(
        &self,
        master: &sqlx::PgPool,
        target: NodeName,
        transaction_id: Uuid,
        operation: TxOperation,
        record_id: Option<catalog_sql::AppId>,
        old_data: Option<&RawValue>,
        new_data: Option<&RawValue>,
        op: F,
    ) where
        F: FnOnce(&sqlx::PgPool) -> std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send + '_>>,
    {
        let Some(pool) = self.broker.get(self.registry, target) else {
            tracing::info!(?target, "node offline, logging pending transaction");
            let _ = tx_log::append(
                master, transaction_id, target, operation, record_id, old_data, new_data,
                TxStatus::Pending, None,
            )
            .await;
            return;
        };

        match run_in_transaction(&pool, self.isolation, op).await {
            Ok(()) => {
                let _ = tx_log::append(
                    master, transaction_id, target, operation, record_id, old_data, new_data,
                    TxStatus::Committed, None,
                )
                .await;
            }
            Err(err) => {
                tracing::warn!(?target, %err, "transaction failed on node");
                let _ = tx_log::append(
                    master, transaction_id, target, operation, record_id, old_data, new_data,
                    TxStatus::Failed, Some(&err.to_string()),
                )
                .await;
            }
        }
    }
}

async fn run_in_transaction<F>(pool: &sqlx::PgPool, isolation: IsolationLevel, op: F) -> anyhow::Result<()>
where
    F: FnOnce(&sqlx::PgPool) -> std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send + '_>>,
{
    sqlx::query(&format!("set transaction isolation level {}", isolation.as_sql()))
        .execute(pool)
        .await?;
    op(pool).await
}

/// Retry manager: replays not-yet-committed log rows once their node is
/// back online (spec §4.5 "Retry").
pub struct RetryManager {
    pub registry: Arc<NodeRegistry>,
    pub broker: Arc<ConnectionBroker>,
}

impl PeriodicWorker for RetryManager {
    fn name(&self) -> &str {
        "txn-retry"
    }

    #[tracing::instrument(level = "info", skip(self))]
    async fn run_once(&mut self) -> anyhow::Result<()> {
        let Some(master) = self.broker.get(&self.registry, NodeName::Master) else {
            return Ok(());
        };

        let rows = tx_log::list_unprocessed(&master).await?;
        for row in rows {
            self.retry_one(&master, row).await;
        }
        Ok(())
    }
}

impl RetryManager {
    async fn retry_one(&self, master: &sqlx::PgPool, row: TxLogRow) {
        let Some(node) = NodeName::from_node_id(row.node_id) else {
            tracing::error!(node_id = row.node_id, "unknown node id in transaction log");
            return;
        };
        let Some(pool) = self.broker.get(&self.registry, node) else {
            return;
        };

        let operation = row.operation.as_str();
        let result: anyhow::Result<()> = match operation {
            "INSERT" | "UPDATE" => {
                if let Some(new_data) = &row.new_data {
                    replay_upsert(&pool, new_data.0.get()).await
                } else {
                    Ok(())
                }
            }
            "DELETE" => match row.record_id {
                Some(app_id) => games::delete(&pool, app_id).await.map_err(anyhow::Error::from),
                None => Ok(()),
            },
            other => {
                tracing::error!(other, "unknown transaction log operation");
                Ok(())
            }
        };

        match result {
            Ok(()) => {
                let _ = tx_log::mark_committed(master, row.log_id).await;
            }
            Err(err) => {
                let _ = tx_log::update_error(master, row.log_id, &err.to_string()).await;
            }
        }
    }
}

async fn replay_upsert(pool: &sqlx::PgPool, raw_json: &str) -> anyhow::Result<()> {
    let row: games::GameRow = serde_json::from_str(raw_json)?;
    games::upsert(pool, &row).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_targets_always_include_master() {
        assert_eq!(insert_update_targets(true, false, false), vec![NodeName::Master, NodeName::SlaveA]);
        assert_eq!(insert_update_targets(false, true, false), vec![NodeName::Master]);
    }

    #[test]
    fn delete_targets_every_node() {
        assert_eq!(delete_targets(), vec![NodeName::Master, NodeName::SlaveA, NodeName::SlaveB]);
    }

    #[test]
    fn isolation_level_parses_its_canonical_forms() {
        assert_eq!("REPEATABLE READ".parse::<IsolationLevel>().unwrap(), IsolationLevel::RepeatableRead);
        assert_eq!("serializable".parse::<IsolationLevel>().unwrap(), IsolationLevel::Serializable);
        assert!("nonsense".parse::<IsolationLevel>().is_err());
    }
}
