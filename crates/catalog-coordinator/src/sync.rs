//! Pending Sync Service (spec §4.4, C5): a single periodic worker that
//! drains both pending queues while the master is up, respecting node
//! availability and idempotent convergence.

use catalog_sql::{games, node_status, pending, NodeName, PendingTable};
use catalog_automations::PeriodicWorker;

use crate::broker::ConnectionBroker;
use crate::registry::NodeRegistry;
use std::sync::Arc;

pub struct PendingSyncService {
    pub registry: Arc<NodeRegistry>,
    pub broker: Arc<ConnectionBroker>,
}

impl PeriodicWorker for PendingSyncService {
    fn name(&self) -> &str {
        "pending-sync"
    }

    #[tracing::instrument(level = "info", skip(self))]
    async fn run_once(&mut self) -> anyhow::Result<()> {
        let Some(master) = self.broker.get(&self.registry, NodeName::Master) else {
            tracing::debug!("master down, skipping sync cycle");
            return Ok(());
        };

        drain_queue(&master, &self.registry, &self.broker, PendingTable::Windows).await;
        drain_queue(&master, &self.registry, &self.broker, PendingTable::MultiOs).await;

        Ok(())
    }
}

/// Drains one pending table's `PENDING ∪ FAILED` rows oldest-first (spec
/// §4.4). Each row is handled independently; a down target short-circuits
/// the whole queue for this cycle rather than failing row by row.
async fn drain_queue(
    master: &sqlx::PgPool,
    registry: &NodeRegistry,
    broker: &ConnectionBroker,
    table: PendingTable,
) {
    let target = table.target();
    let Some(slave) = broker.get(registry, target) else {
        tracing::debug!(?target, "slave down, skipping its half of the sync cycle");
        return;
    };

    let rows = match pending::list_ready(master, table).await {
        Ok(rows) => rows,
        Err(err) => {
            tracing::error!(?err, ?table, "failed to list pending rows");
            return;
        }
    };

    for row in rows {
        let app_id = row.app_id;
        let outcome = sync_one(&slave, &row).await;
        match outcome {
            Ok(()) => {
                if let Err(err) = pending::mark_synced(master, table, app_id).await {
                    tracing::error!(app_id, ?err, "failed to mark pending row synced");
                }
                if let Err(err) = node_status::mark_synced_now(master, target).await {
                    tracing::error!(?target, ?err, "failed to record node_status last_sync");
                }
            }
            Err(err) => {
                tracing::warn!(app_id, %err, "pending row sync failed, will retry next cycle");
                if let Err(err) = pending::mark_failed(master, table, app_id, &err.to_string()).await {
                    tracing::error!(app_id, ?err, "failed to mark pending row failed");
                }
            }
        }
    }
}

/// spec §4.4: re-sync of an id already present on the target is success,
/// not failure -- the worker must tolerate restarts mid-sync.
async fn sync_one(slave: &sqlx::PgPool, row: &pending::PendingRow) -> anyhow::Result<()> {
    if games::exists(slave, row.app_id).await? {
        return Ok(());
    }
    games::insert(slave, &row.as_game_row()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_table_targets_slave_a() {
        assert_eq!(PendingTable::Windows.target(), NodeName::SlaveA);
    }
}
