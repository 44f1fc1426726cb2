//! Write Coordinator (spec §4.3, C4): the single `create_game` entry point.
//! Master write is durable before anything else happens; a slave write
//! failure never fails the request, it falls back to a pending row.

use catalog_sql::{games, pending, NodeName, PendingTable};
use chrono::Utc;
use sqlx::error::DatabaseError as _;

use crate::broker::ConnectionBroker;
use crate::error::CoordinatorError;
use crate::model::{GameInput, GameRecord, Partition};
use crate::registry::NodeRegistry;

/// Bounded retries on a primary-key race (spec §4.3 step 1).
const MAX_ID_RETRIES: u32 = 5;

pub struct WriteCoordinator<'a> {
    pub registry: &'a NodeRegistry,
    pub broker: &'a ConnectionBroker,
}

impl<'a> WriteCoordinator<'a> {
    pub fn new(registry: &'a NodeRegistry, broker: &'a ConnectionBroker) -> Self {
        WriteCoordinator { registry, broker }
    }

    #[tracing::instrument(level = "info", skip(self, input))]
    pub async fn create_game(&self, input: GameInput) -> Result<GameRecord, CoordinatorError> {
        if !self.registry.is_up(NodeName::Master) {
            return Err(CoordinatorError::MasterDown);
        }
        if !input.has_platform() {
            return Err(CoordinatorError::ValidationError(
                "at least one platform flag must be true".to_string(),
            ));
        }

        let master = self
            .broker
            .get(self.registry, NodeName::Master)
            .ok_or(CoordinatorError::MasterDown)?;

        let record = self.assign_and_insert(&master, input).await?;
        let row = record.to_game_row();

        match record.partition() {
            Partition::WindowsOnly => {
                self.write_slave_or_enqueue(&master, NodeName::SlaveA, PendingTable::Windows, &row)
                    .await
            }
            Partition::MultiPlatform => {
                self.write_slave_or_enqueue(&master, NodeName::SlaveB, PendingTable::MultiOs, &row)
                    .await
            }
            Partition::MasterOnly => {}
        }

        Ok(record)
    }

    /// spec §4.3 steps 1, 2, 4: assign an id from `max(app_id)+1`, retrying
    /// on a race, canonicalize, insert, then verify by point lookup.
    async fn assign_and_insert(
        &self,
        master: &sqlx::PgPool,
        input: GameInput,
    ) -> Result<GameRecord, CoordinatorError> {
        let mut attempt = 0;
        loop {
            let max = games::max_app_id(master)
                .await
                .map_err(|err| CoordinatorError::MasterWriteFailed(0).with_source(err))?;
            let app_id = max + 1;
            let now = Utc::now();
            let record = GameRecord::canonicalize(input.clone(), app_id, now)
                .map_err(|err| CoordinatorError::ValidationError(err.to_string()))?;
            let row = record.to_game_row();

            match games::insert(master, &row).await {
                Ok(()) => {
                    let verified = games::fetch(master, app_id)
                        .await
                        .map_err(|err| CoordinatorError::MasterWriteFailed(app_id).with_source(err))?;
                    return match verified {
                        Some(_) => Ok(record),
                        None => Err(CoordinatorError::MasterWriteFailed(app_id)),
                    };
                }
                Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                    attempt += 1;
                    if attempt >= MAX_ID_RETRIES {
                        return Err(CoordinatorError::MasterWriteFailed(app_id));
                    }
                    tracing::warn!(app_id, attempt, "id collision on master, retrying");
                    continue;
                }
                Err(err) => return Err(CoordinatorError::MasterWriteFailed(app_id).with_source(err)),
            }
        }
    }

    /// spec §4.3 steps 5-6: write the slave if reachable (idempotent on an
    /// existing id), else enqueue a pending row. Never surfaced to the
    /// caller (spec §7).
    async fn write_slave_or_enqueue(
        &self,
        master: &sqlx::PgPool,
        slave: NodeName,
        table: PendingTable,
        row: &games::GameRow,
    ) {
        if let Some(pool) = self.broker.get(self.registry, slave) {
            match self.try_write_slave(&pool, row).await {
                Ok(()) => return,
                Err(err) => {
                    tracing::warn!(app_id = row.app_id, ?slave, ?err, "slave write failed, enqueuing pending row");
                }
            }
        } else {
            tracing::info!(app_id = row.app_id, ?slave, "slave unreachable, enqueuing pending row");
        }

        if let Err(err) = pending::upsert(master, table, row).await {
            tracing::error!(app_id = row.app_id, ?err, "failed to enqueue pending row");
        }
    }

    async fn try_write_slave(&self, pool: &sqlx::PgPool, row: &games::GameRow) -> anyhow::Result<()> {
        if !games::exists(pool, row.app_id).await? {
            games::insert(pool, row).await?;
        }
        if !games::exists(pool, row.app_id).await? {
            anyhow::bail!("slave write did not verify");
        }
        Ok(())
    }
}

impl CoordinatorError {
    fn with_source(self, err: impl std::fmt::Display) -> Self {
        if let CoordinatorError::MasterWriteFailed(id) = self {
            tracing::error!(app_id = id, %err, "master write failed");
        }
        self
    }
}
