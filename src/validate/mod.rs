//! Deterministic validators: pure functions of (context, contract, candidate)
//! returning a PASS/FAIL verdict with actionable feedback.
//!
//! Business-rule violations are always a `CriticResult` FAIL naming the
//! offending scenario/step/entity/field, never an error; only malformed input
//! files are fatal, and those never reach this layer.

pub mod entities;
pub mod execution;
pub mod sequence;
pub mod value;

pub use entities::validate_entities;
pub use execution::validate_execution;
pub use sequence::validate_packet_sequence;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAIL")]
    Fail,
}

/// The sole verdict type every validator returns. Feedback is specific
/// enough to drive a retry by the upstream generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticResult {
    pub status: Status,
    pub feedback: String,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
        }
    }
}

impl CriticResult {
    pub fn pass(feedback: impl Into<String>) -> Self {
        Self {
            status: Status::Pass,
            feedback: feedback.into(),
        }
    }

    pub fn fail(feedback: impl Into<String>) -> Self {
        Self {
            status: Status::Fail,
            feedback: feedback.into(),
        }
    }

    pub fn is_pass(&self) -> bool {
        self.status == Status::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::load::fixtures::firewall_context;
    use crate::spec::{CandidateBundle, TaskSpec};
    use serde_json::json;

    /// End-to-end: SYN / SYN-ACK / ACK across the internal/external boundary,
    /// entities covering both destinations, and a merged execution timeline.
    #[test]
    fn firewall_handshake_passes_all_validators() {
        let ctx = firewall_context();
        let task: TaskSpec = serde_json::from_value(json!({
            "task_id": "T1",
            "task_description": "contract-driven handshake",
            "feature_under_test": "firewall",
            "role_bindings": {"initiator": "h1", "responder": "h3"},
            "sequence_contract": [
                {
                    "scenario": "positive_main",
                    "kind": "positive",
                    "required": true,
                    "allow_additional_packets": false,
                    "steps": [
                        {"tx_role": "initiator", "rx_role": "responder",
                         "protocol_stack": ["Ethernet", "IPv4", "TCP"],
                         "field_expectations": {
                            "Ethernet.etherType": {"equals": "0x0800"},
                            "IPv4.proto": {"one_of": [6, "6"]},
                            "TCP.flags": {"contains": "S", "not_contains": "A"}}},
                        {"tx_role": "responder", "rx_role": "initiator",
                         "protocol_stack": ["Ethernet", "IPv4", "TCP"],
                         "field_expectations": {"TCP.flags": {"equals": "SA"}}},
                        {"tx_role": "initiator", "rx_role": "responder",
                         "protocol_stack": ["Ethernet", "IPv4", "TCP"],
                         "field_expectations": {
                            "TCP.flags": {"contains": "A", "not_contains": "S"}}}
                    ],
                    "field_relations": [
                        {"left_step": 2, "left_field": "TCP.ack", "op": "eq",
                         "right_step": 1, "right_field": "TCP.seq", "right_delta": 1},
                        {"left_step": 3, "left_field": "TCP.ack", "op": "eq",
                         "right_step": 2, "right_field": "TCP.seq", "right_delta": 1}
                    ]
                },
                {
                    "scenario": "negative_probe",
                    "kind": "negative",
                    "required": true,
                    "allow_additional_packets": false,
                    "steps": [
                        {"tx_role": "responder", "rx_role": "initiator",
                         "protocol_stack": ["Ethernet", "IPv4", "TCP"],
                         "field_expectations": {"TCP.flags": {"equals": "S"}}}
                    ]
                }
            ]
        }))
        .unwrap();

        let bundle: CandidateBundle = serde_json::from_value(json!({
            "task_id": "T1",
            "packet_sequence": [
                {"packet_id": 1, "tx_host": "h1", "scenario": "positive_main",
                 "protocol_stack": ["Ethernet", "IPv4", "TCP"],
                 "fields": {"Ethernet.etherType": "0x0800", "Ethernet.dst": "08:00:00:00:03:33",
                            "IPv4.proto": 6, "IPv4.dst": "10.0.3.3",
                            "TCP.flags": "S", "TCP.seq": 1000}},
                {"packet_id": 2, "tx_host": "h3", "scenario": "positive_main",
                 "protocol_stack": ["Ethernet", "IPv4", "TCP"],
                 "fields": {"Ethernet.etherType": "0x0800", "Ethernet.dst": "08:00:00:00:01:11",
                            "IPv4.proto": 6, "IPv4.dst": "10.0.1.1",
                            "TCP.flags": "SA", "TCP.seq": 5000, "TCP.ack": 1001}},
                {"packet_id": 3, "tx_host": "h1", "scenario": "positive_main",
                 "protocol_stack": ["Ethernet", "IPv4", "TCP"],
                 "fields": {"Ethernet.etherType": "0x0800", "Ethernet.dst": "08:00:00:00:03:33",
                            "IPv4.proto": 6, "IPv4.dst": "10.0.3.3",
                            "TCP.flags": "A", "TCP.seq": 1001, "TCP.ack": 5001}},
                {"packet_id": 4, "tx_host": "h3", "scenario": "negative_probe",
                 "protocol_stack": ["Ethernet", "IPv4", "TCP"],
                 "fields": {"Ethernet.etherType": "0x0800", "Ethernet.dst": "08:00:00:00:01:11",
                            "IPv4.proto": 6, "IPv4.dst": "10.0.1.1",
                            "TCP.flags": "S", "TCP.seq": 7000}}
            ],
            "entities": [
                {"table_name": "MyIngress.ipv4_lpm", "match_type": "lpm",
                 "match_keys": {"hdr.ipv4.dstAddr": ["10.0.3.3", 32]},
                 "action_name": "MyIngress.ipv4_forward",
                 "action_data": {"dstAddr": "08:00:00:00:03:33", "port": 3}},
                {"table_name": "MyIngress.ipv4_lpm", "match_type": "lpm",
                 "match_keys": {"hdr.ipv4.dstAddr": ["10.0.1.1", 32]},
                 "action_name": "MyIngress.ipv4_forward",
                 "action_data": {"dstAddr": "08:00:00:00:01:11", "port": 1}}
            ],
            "control_plane_sequence": [
                {"order": 1, "operation_type": "apply_table_entry",
                 "target": "MyIngress.ipv4_lpm", "entity_index": 1},
                {"order": 2, "operation_type": "apply_table_entry",
                 "target": "MyIngress.ipv4_lpm", "entity_index": 2}
            ],
            "execution_sequence": [
                {"order": 1, "operation_type": "apply_table_entry",
                 "entity_index": 1, "control_plane_order": 1},
                {"order": 2, "operation_type": "apply_table_entry",
                 "entity_index": 2, "control_plane_order": 2},
                {"order": 3, "operation_type": "send_packet", "packet_id": 1},
                {"order": 4, "operation_type": "send_packet", "packet_id": 2},
                {"order": 5, "operation_type": "send_packet", "packet_id": 3},
                {"order": 6, "operation_type": "send_packet", "packet_id": 4}
            ]
        }))
        .unwrap();

        let res = validate_packet_sequence(&ctx, &task, &bundle.packet_sequence);
        assert!(res.is_pass(), "{}", res.feedback);

        let res = validate_entities(
            &ctx,
            &task,
            &bundle.packet_sequence,
            &bundle.entities,
            Some(&bundle.control_plane_sequence),
        );
        assert!(res.is_pass(), "{}", res.feedback);

        let res = validate_execution(
            &bundle.packet_sequence,
            &bundle.entities,
            &bundle.control_plane_sequence,
            &bundle.execution_sequence,
        );
        assert!(res.is_pass(), "{}", res.feedback);
    }
}
