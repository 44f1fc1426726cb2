//! Node Registry (spec §4.1): in-memory liveness tracking for the three
//! nodes. A boolean gate in front of every connection attempt, cheaper and
//! more deterministic than catching connect errors on the request hot path.

use std::collections::HashMap;
use std::sync::Mutex;

use catalog_sql::NodeName;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct NodeState {
    pub available: bool,
    pub last_error: Option<String>,
    pub failure_count: u32,
    pub last_checked: DateTime<Utc>,
    /// Set by an explicit `POST /api/nodes/crash/:node` and cleared only by
    /// the matching `POST /api/nodes/restore/:node` (spec §8 scenario 3: a
    /// simulated crash must persist until an operator restores it). The
    /// health monitor checks this before attempting to reopen a pool, so it
    /// never un-crashes a node on its own.
    pub admin_crashed: bool,
}

impl NodeState {
    fn fresh() -> Self {
        NodeState {
            available: true,
            last_error: None,
            failure_count: 0,
            last_checked: Utc::now(),
            admin_crashed: false,
        }
    }
}

/// Process-wide mapping from node name to liveness state (spec §4.1).
/// All three nodes start available; `markDown`/`markUp`/`markCrashed` are
/// the only mutators, called by the broker (on a failed ping), the monitor,
/// and the crash/restore handlers.
pub struct NodeRegistry {
    nodes: Mutex<HashMap<NodeName, NodeState>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        let nodes = NodeName::ALL.into_iter().map(|n| (n, NodeState::fresh())).collect();
        NodeRegistry { nodes: Mutex::new(nodes) }
    }

    pub fn is_up(&self, node: NodeName) -> bool {
        self.nodes.lock().unwrap().get(&node).map(|s| s.available).unwrap_or(false)
    }

    pub fn state(&self, node: NodeName) -> NodeState {
        self.nodes.lock().unwrap().get(&node).cloned().expect("every NodeName is seeded")
    }

    pub fn all_states(&self) -> Vec<(NodeName, NodeState)> {
        let nodes = self.nodes.lock().unwrap();
        NodeName::ALL.into_iter().map(|n| (n, nodes[&n].clone())).collect()
    }

    #[tracing::instrument(level = "debug", skip(self, err))]
    pub fn mark_down(&self, node: NodeName, err: &str) {
        let mut nodes = self.nodes.lock().unwrap();
        let state = nodes.entry(node).or_insert_with(NodeState::fresh);
        state.available = false;
        state.failure_count += 1;
        state.last_error = Some(err.to_string());
        state.last_checked = Utc::now();
    }

    /// Marks `node` down the same way `mark_down` does, but also sets the
    /// sticky `admin_crashed` flag so the monitor leaves it alone until
    /// `mark_up` is called explicitly.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn mark_crashed(&self, node: NodeName, err: &str) {
        let mut nodes = self.nodes.lock().unwrap();
        let state = nodes.entry(node).or_insert_with(NodeState::fresh);
        state.available = false;
        state.failure_count += 1;
        state.last_error = Some(err.to_string());
        state.last_checked = Utc::now();
        state.admin_crashed = true;
    }

    pub fn is_admin_crashed(&self, node: NodeName) -> bool {
        self.nodes.lock().unwrap().get(&node).map(|s| s.admin_crashed).unwrap_or(false)
    }

    /// Marks `node` up and clears `admin_crashed` -- the only way a
    /// sticky crash is lifted (spec §8 scenario 3).
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn mark_up(&self, node: NodeName) {
        let mut nodes = self.nodes.lock().unwrap();
        let state = nodes.entry(node).or_insert_with(NodeState::fresh);
        state.available = true;
        state.failure_count = 0;
        state.last_error = None;
        state.last_checked = Utc::now();
        state.admin_crashed = false;
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_every_node_available() {
        let registry = NodeRegistry::new();
        for node in NodeName::ALL {
            assert!(registry.is_up(node));
        }
    }

    #[test]
    fn mark_down_then_up_resets_failure_count() {
        let registry = NodeRegistry::new();
        registry.mark_down(NodeName::SlaveA, "connection refused");
        registry.mark_down(NodeName::SlaveA, "connection refused");
        assert!(!registry.is_up(NodeName::SlaveA));
        assert_eq!(registry.state(NodeName::SlaveA).failure_count, 2);

        registry.mark_up(NodeName::SlaveA);
        let state = registry.state(NodeName::SlaveA);
        assert!(state.available);
        assert_eq!(state.failure_count, 0);
        assert!(state.last_error.is_none());
    }

    #[test]
    fn nodes_are_independent() {
        let registry = NodeRegistry::new();
        registry.mark_down(NodeName::Master, "boom");
        assert!(!registry.is_up(NodeName::Master));
        assert!(registry.is_up(NodeName::SlaveA));
        assert!(registry.is_up(NodeName::SlaveB));
    }

    #[test]
    fn mark_crashed_sets_the_sticky_flag_and_only_mark_up_clears_it() {
        let registry = NodeRegistry::new();
        registry.mark_crashed(NodeName::SlaveA, "simulated crash");
        assert!(!registry.is_up(NodeName::SlaveA));
        assert!(registry.is_admin_crashed(NodeName::SlaveA));

        registry.mark_up(NodeName::SlaveA);
        assert!(registry.is_up(NodeName::SlaveA));
        assert!(!registry.is_admin_crashed(NodeName::SlaveA));
    }

    #[test]
    fn mark_down_never_sets_the_sticky_flag() {
        let registry = NodeRegistry::new();
        registry.mark_down(NodeName::SlaveB, "connection refused");
        assert!(!registry.is_admin_crashed(NodeName::SlaveB));
    }
}
