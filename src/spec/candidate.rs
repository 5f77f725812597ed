//! Candidate artifact schemas (candidate.json).
//!
//! A candidate bundle is one generation attempt:
//! {
//!   "task_id": "T1",
//!   "packet_sequence": [
//!     {"packet_id": 1, "tx_host": "h1", "scenario": "positive_main",
//!      "protocol_stack": ["Ethernet", "IPv4", "TCP"],
//!      "fields": {"IPv4.dst": "10.0.3.3", "TCP.flags": "S"}}
//!   ],
//!   "entities": [
//!     {"table_name": "MyIngress.ipv4_lpm", "match_type": "lpm",
//!      "match_keys": {"hdr.ipv4.dstAddr": ["10.0.3.3", 32]},
//!      "action_name": "MyIngress.ipv4_forward",
//!      "action_data": {"dstAddr": "08:00:00:00:03:33", "port": 3}}
//!   ],
//!   "control_plane_sequence": [...],
//!   "execution_sequence": [...]
//! }
//!
//! Validators borrow these types and never mutate them.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

pub const DEFAULT_SCENARIO: &str = "default";

#[derive(Debug, Clone, Deserialize)]
pub struct PacketSpec {
    pub packet_id: u64,

    /// Topology host that sends this packet, e.g. h1/h3.
    pub tx_host: String,

    #[serde(default)]
    pub scenario: Option<String>,

    #[serde(default)]
    pub protocol_stack: Vec<String>,

    /// Flattened header fields, e.g. "IPv4.dst" -> "10.0.3.3".
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl PacketSpec {
    pub fn scenario_tag(&self) -> &str {
        self.scenario.as_deref().unwrap_or(DEFAULT_SCENARIO)
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// A candidate forwarding-table rule.
#[derive(Debug, Clone, Deserialize)]
pub struct TableRule {
    pub table_name: String,

    #[serde(default)]
    pub match_type: String,

    #[serde(default)]
    pub match_keys: BTreeMap<String, Value>,

    pub action_name: String,

    #[serde(default)]
    pub action_data: BTreeMap<String, Value>,

    /// Mandatory for ternary/range/optional tables.
    #[serde(default)]
    pub priority: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    ApplyTableEntry,
    ReadRegister,
    WriteRegister,
    ReadCounter,
    Custom,
    SendPacket,
}

/// One control-plane step; `entity_index` is 1-based into the rule list.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlPlaneOperation {
    pub order: i64,
    pub operation_type: OperationType,

    #[serde(default)]
    pub target: String,

    #[serde(default)]
    pub entity_index: Option<usize>,

    #[serde(default)]
    pub parameters: BTreeMap<String, Value>,
}

/// One entry of the merged execution timeline (control-plane ops + packet sends).
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionOperation {
    pub order: i64,
    pub operation_type: OperationType,

    #[serde(default)]
    pub entity_index: Option<usize>,

    /// Back-reference to the `order` of the control-plane op this step replays.
    #[serde(default)]
    pub control_plane_order: Option<i64>,

    #[serde(default)]
    pub packet_id: Option<u64>,

    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateBundle {
    #[serde(default)]
    pub task_id: Option<String>,

    pub packet_sequence: Vec<PacketSpec>,

    #[serde(default)]
    pub entities: Vec<TableRule>,

    #[serde(default)]
    pub control_plane_sequence: Vec<ControlPlaneOperation>,

    #[serde(default)]
    pub execution_sequence: Vec<ExecutionOperation>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn packet_scenario_tag_defaults() {
        let p: PacketSpec = serde_json::from_value(json!({
            "packet_id": 1,
            "tx_host": "h1",
        }))
        .unwrap();
        assert_eq!(p.scenario_tag(), "default");
    }

    #[test]
    fn operation_types_parse_snake_case() {
        let op: ExecutionOperation = serde_json::from_value(json!({
            "order": 3,
            "operation_type": "send_packet",
            "packet_id": 1,
        }))
        .unwrap();
        assert_eq!(op.operation_type, OperationType::SendPacket);

        let op: ControlPlaneOperation = serde_json::from_value(json!({
            "order": 1,
            "operation_type": "apply_table_entry",
            "target": "MyIngress.ipv4_lpm",
            "entity_index": 1,
        }))
        .unwrap();
        assert_eq!(op.operation_type, OperationType::ApplyTableEntry);
    }

    #[test]
    fn bundle_sections_default_empty() {
        let b: CandidateBundle = serde_json::from_value(json!({
            "packet_sequence": [],
        }))
        .unwrap();
        assert!(b.entities.is_empty());
        assert!(b.execution_sequence.is_empty());
    }
}
