//! SQL access layer for the catalog write coordinator.
//!
//! This crate owns table and column names and every `sqlx` query. It holds
//! no routing or retry logic -- that lives in `catalog-coordinator`, which
//! calls through these functions the same way `agent` calls through
//! `agent-sql` in the upstream control plane.

pub mod games;
pub mod node_status;
pub mod pending;
pub mod schema;
pub mod tx_log;

/// The catalog's primary key. A plain integer rather than a typed domain,
/// since app ids are coordinator-assigned monotonic integers with no
/// further encoding.
pub type AppId = i64;

/// The three nodes in the topology. Kept as a closed enum rather than a
/// free-form string so that an invalid node name is a parse error at the
/// boundary, never a runtime surprise deep in a query.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeName {
    Master,
    SlaveA,
    SlaveB,
}

impl NodeName {
    pub const ALL: [NodeName; 3] = [NodeName::Master, NodeName::SlaveA, NodeName::SlaveB];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeName::Master => "master",
            NodeName::SlaveA => "slave_a",
            NodeName::SlaveB => "slave_b",
        }
    }

    /// Stable small integer identity used by the transaction log
    /// (spec §3: `NodeID ∈ {1,2,3}`).
    pub fn node_id(&self) -> i16 {
        match self {
            NodeName::Master => 1,
            NodeName::SlaveA => 2,
            NodeName::SlaveB => 3,
        }
    }

    pub fn from_node_id(id: i16) -> Option<NodeName> {
        match id {
            1 => Some(NodeName::Master),
            2 => Some(NodeName::SlaveA),
            3 => Some(NodeName::SlaveB),
            _ => None,
        }
    }
}

impl std::str::FromStr for NodeName {
    type Err = InvalidNodeName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "master" => Ok(NodeName::Master),
            "slave_a" => Ok(NodeName::SlaveA),
            "slave_b" => Ok(NodeName::SlaveB),
            other => Err(InvalidNodeName(other.to_string())),
        }
    }
}

impl std::fmt::Display for NodeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid node name: {0}")]
pub struct InvalidNodeName(pub String);

/// The two partitioned pending queues (spec §3, §4.4).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PendingTable {
    Windows,
    MultiOs,
}

impl PendingTable {
    pub fn table_name(&self) -> &'static str {
        match self {
            PendingTable::Windows => "pending_windows_games",
            PendingTable::MultiOs => "pending_multi_os_games",
        }
    }

    pub fn target(&self) -> NodeName {
        match self {
            PendingTable::Windows => NodeName::SlaveA,
            PendingTable::MultiOs => NodeName::SlaveB,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_name_round_trips_through_its_string_form() {
        for node in NodeName::ALL {
            assert_eq!(node.as_str().parse::<NodeName>().unwrap(), node);
        }
    }

    #[test]
    fn invalid_node_name_is_rejected() {
        assert!("node4".parse::<NodeName>().is_err());
    }

    #[test]
    fn pending_table_targets_match_the_partition_rule() {
        assert_eq!(PendingTable::Windows.target(), NodeName::SlaveA);
        assert_eq!(PendingTable::MultiOs.target(), NodeName::SlaveB);
    }
}
