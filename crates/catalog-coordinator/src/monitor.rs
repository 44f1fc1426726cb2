//! Node Monitor (spec §4.7, C7): periodic health checks that drive the
//! in-memory registry (C1) and mirror the result into `node_status` on the
//! master. Must never stop the loop because the master itself is down.

use std::sync::Arc;

use catalog_automations::PeriodicWorker;
use catalog_sql::{node_status, NodeName};

use crate::broker::ConnectionBroker;
use crate::registry::NodeRegistry;

pub struct NodeMonitor {
    pub registry: Arc<NodeRegistry>,
    pub broker: Arc<ConnectionBroker>,
}

impl PeriodicWorker for NodeMonitor {
    fn name(&self) -> &str {
        "node-monitor"
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn run_once(&mut self) -> anyhow::Result<()> {
        for node in NodeName::ALL {
            self.check_one(node).await;
        }

        if let Some(master) = self.broker.get(&self.registry, NodeName::Master) {
            self.persist(&master).await;
        } else {
            tracing::debug!("master down, skipping node_status persistence this cycle");
        }

        Ok(())
    }
}

impl NodeMonitor {
    /// Attempts to reopen `node`'s pool if it was closed, then pings it.
    /// Either outcome just updates the in-memory registry (spec §4.2/§4.7);
    /// the database mirror happens separately, once per cycle.
    ///
    /// A node an operator crashed via `POST /api/nodes/crash/:node` is left
    /// alone here -- `crash` only closes the app-side pool, so reopening it
    /// on the next tick would silently undo the simulated crash. Only the
    /// matching `/api/nodes/restore/:node` call clears `admin_crashed`
    /// (spec §8 scenario 3).
    async fn check_one(&self, node: NodeName) {
        if self.registry.is_admin_crashed(node) {
            tracing::debug!(?node, "node administratively crashed, skipping health check");
            return;
        }

        if let Err(err) = self.broker.restore(node).await {
            tracing::debug!(?node, %err, "could not reopen pool");
        }

        match self.broker.ping(node).await {
            Ok(()) => self.registry.mark_up(node),
            Err(err) => {
                tracing::warn!(?node, %err, "node health check failed");
                self.registry.mark_down(node, &err.to_string());
            }
        }
    }

    async fn persist(&self, master: &sqlx::PgPool) {
        for node in NodeName::ALL {
            let state = self.registry.state(node);
            let result = if state.available {
                node_status::mark_online(master, node).await
            } else {
                let error = state.last_error.as_deref().unwrap_or("unknown error");
                node_status::mark_offline(master, node, error).await
            };
            if let Err(err) = result {
                tracing::error!(?node, %err, "failed to persist node status");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monitor_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<NodeMonitor>();
    }
}
