//! Connection Broker (spec §4.2): one `PgPool` per node. `sqlx` already
//! pools connections, so "open"/"close" here means the pool handle exists
//! and pings successfully -- crash/restore drop and recreate the pool
//! rather than managing a raw socket.

use std::collections::HashMap;
use std::sync::Mutex;

use catalog_sql::NodeName;

use crate::registry::NodeRegistry;

struct NodeConn {
    options: sqlx::postgres::PgConnectOptions,
    pool: Option<sqlx::PgPool>,
}

/// Owns the three node connection pools. `get` is the only hot-path entry
/// point: it returns a pool handle iff the registry says the node is up and
/// a `SELECT 1` against the pool succeeds, per spec §4.2.
pub struct ConnectionBroker {
    conns: Mutex<HashMap<NodeName, NodeConn>>,
}

impl ConnectionBroker {
    pub fn new(
        master: sqlx::PgPool,
        slave_a: sqlx::PgPool,
        slave_b: sqlx::PgPool,
    ) -> Self {
        let mut conns = HashMap::new();
        for (node, pool) in [
            (NodeName::Master, master),
            (NodeName::SlaveA, slave_a),
            (NodeName::SlaveB, slave_b),
        ] {
            conns.insert(
                node,
                NodeConn { options: pool.connect_options().as_ref().clone(), pool: Some(pool) },
            );
        }
        ConnectionBroker { conns: Mutex::new(conns) }
    }

    /// Returns a usable pool for `node`, or `None` if the registry reports
    /// it down or the pool isn't open. Does not itself ping -- call
    /// `ping(node)` first (or rely on the caller already having done so via
    /// the monitor) to decide liveness; `get` is a cheap handle lookup.
    pub fn get(&self, registry: &NodeRegistry, node: NodeName) -> Option<sqlx::PgPool> {
        if !registry.is_up(node) {
            return None;
        }
        self.conns.lock().unwrap().get(&node).and_then(|c| c.pool.clone())
    }

    /// Pings `node` regardless of registry state -- used by the health
    /// monitor and by `get` callers who need a fresh liveness check rather
    /// than the registry's last-known value.
    pub async fn ping(&self, node: NodeName) -> anyhow::Result<()> {
        let pool = self.conns.lock().unwrap().get(&node).and_then(|c| c.pool.clone());
        let Some(pool) = pool else {
            anyhow::bail!("no open connection for {node}");
        };
        sqlx::query("select 1").execute(&pool).await?;
        Ok(())
    }

    /// Closes `node`'s pool (spec §4.2 `close(name)` on crash).
    pub async fn crash(&self, node: NodeName) {
        let pool = {
            let mut conns = self.conns.lock().unwrap();
            conns.get_mut(&node).and_then(|c| c.pool.take())
        };
        if let Some(pool) = pool {
            pool.close().await;
        }
    }

    /// Reopens `node`'s pool with its original connect options (spec §4.2
    /// `open(name, reuse-if-open=true)` on restore). Idempotent: a no-op if
    /// already open.
    pub async fn restore(&self, node: NodeName) -> anyhow::Result<()> {
        let options = {
            let conns = self.conns.lock().unwrap();
            let conn = conns.get(&node).expect("every NodeName has a broker entry");
            if conn.pool.is_some() {
                return Ok(());
            }
            conn.options.clone()
        };
        let pool = sqlx::postgres::PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_secs(10))
            .connect_with(options)
            .await?;
        self.conns.lock().unwrap().get_mut(&node).unwrap().pool = Some(pool);
        Ok(())
    }

    pub async fn close_all(&self) {
        for node in NodeName::ALL {
            self.crash(node).await;
        }
    }
}
