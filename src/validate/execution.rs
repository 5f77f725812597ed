//! Execution-sequence validator: the merged timeline must replay every
//! declared control-plane operation in declaration order and send every
//! candidate packet exactly once, in candidate order.

use crate::spec::{
    ControlPlaneOperation, ExecutionOperation, OperationType, PacketSpec, TableRule,
};
use crate::validate::CriticResult;

pub fn validate_execution(
    packet_sequence: &[PacketSpec],
    entities: &[TableRule],
    control_plane_sequence: &[ControlPlaneOperation],
    execution_sequence: &[ExecutionOperation],
) -> CriticResult {
    if execution_sequence.is_empty() {
        return CriticResult::fail("execution_sequence is empty.");
    }

    let mut prev_order: Option<i64> = None;
    for op in execution_sequence {
        if prev_order.is_some_and(|prev| op.order <= prev) {
            return CriticResult::fail(format!(
                "execution_sequence order values must be strictly increasing; got {} after {}.",
                op.order,
                prev_order.unwrap_or_default()
            ));
        }
        prev_order = Some(op.order);

        match op.operation_type {
            OperationType::ApplyTableEntry => {
                let ok = op
                    .entity_index
                    .is_some_and(|idx| idx >= 1 && idx <= entities.len());
                if !ok {
                    return CriticResult::fail(format!(
                        "execution_sequence order {}: apply_table_entry requires a valid entity_index (1..={}); got {:?}.",
                        op.order,
                        entities.len(),
                        op.entity_index
                    ));
                }
            }
            OperationType::SendPacket => {
                if op.packet_id.is_none() {
                    return CriticResult::fail(format!(
                        "execution_sequence order {}: send_packet requires a packet_id.",
                        op.order
                    ));
                }
            }
            _ => {}
        }
    }

    // Control-plane replay: the back-references, taken in execution order,
    // must reproduce the declared order list exactly.
    let expected_cp: Vec<i64> = control_plane_sequence.iter().map(|op| op.order).collect();
    let got_cp: Vec<i64> = execution_sequence
        .iter()
        .filter_map(|op| op.control_plane_order)
        .collect();
    if got_cp != expected_cp {
        return CriticResult::fail(format!(
            "control_plane order/coverage mismatch: expected {expected_cp:?}, got {got_cp:?}."
        ));
    }

    let expected_sends: Vec<u64> = packet_sequence.iter().map(|p| p.packet_id).collect();
    let got_sends: Vec<u64> = execution_sequence
        .iter()
        .filter(|op| op.operation_type == OperationType::SendPacket)
        .filter_map(|op| op.packet_id)
        .collect();
    if got_sends != expected_sends {
        return CriticResult::fail(format!(
            "send_packet order/coverage mismatch: expected {expected_sends:?}, got {got_sends:?}."
        ));
    }

    CriticResult::pass("Execution sequence is a valid interleaving of control-plane operations and packet sends.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn packets() -> Vec<PacketSpec> {
        serde_json::from_value(json!([
            {"packet_id": 1, "tx_host": "h1",
             "protocol_stack": ["Ethernet", "IPv4", "TCP"],
             "fields": {"IPv4.dst": "10.0.3.3"}},
            {"packet_id": 2, "tx_host": "h3",
             "protocol_stack": ["Ethernet", "IPv4", "TCP"],
             "fields": {"IPv4.dst": "10.0.1.1"}}
        ]))
        .unwrap()
    }

    fn entities() -> Vec<TableRule> {
        serde_json::from_value(json!([
            {"table_name": "MyIngress.ipv4_lpm", "match_type": "lpm",
             "match_keys": {"hdr.ipv4.dstAddr": ["10.0.3.3", 32]},
             "action_name": "MyIngress.ipv4_forward",
             "action_data": {"dstAddr": "08:00:00:00:03:33", "port": 3}},
            {"table_name": "MyIngress.ipv4_lpm", "match_type": "lpm",
             "match_keys": {"hdr.ipv4.dstAddr": ["10.0.1.1", 32]},
             "action_name": "MyIngress.ipv4_forward",
             "action_data": {"dstAddr": "08:00:00:00:01:11", "port": 1}}
        ]))
        .unwrap()
    }

    fn control_plane() -> Vec<ControlPlaneOperation> {
        serde_json::from_value(json!([
            {"order": 1, "operation_type": "apply_table_entry",
             "target": "MyIngress.ipv4_lpm", "entity_index": 1},
            {"order": 2, "operation_type": "apply_table_entry",
             "target": "MyIngress.ipv4_lpm", "entity_index": 2},
            {"order": 3, "operation_type": "read_register",
             "target": "conn_state", "parameters": {"index": 0}}
        ]))
        .unwrap()
    }

    fn execution(v: serde_json::Value) -> Vec<ExecutionOperation> {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn interleaved_timeline_passes() {
        let exec = execution(json!([
            {"order": 1, "operation_type": "apply_table_entry", "entity_index": 1, "control_plane_order": 1},
            {"order": 2, "operation_type": "apply_table_entry", "entity_index": 2, "control_plane_order": 2},
            {"order": 3, "operation_type": "send_packet", "packet_id": 1},
            {"order": 4, "operation_type": "read_register", "target": "conn_state", "control_plane_order": 3},
            {"order": 5, "operation_type": "send_packet", "packet_id": 2}
        ]));
        let res = validate_execution(&packets(), &entities(), &control_plane(), &exec);
        assert!(res.is_pass(), "{}", res.feedback);
    }

    #[test]
    fn missing_packet_send_is_a_coverage_mismatch() {
        let exec = execution(json!([
            {"order": 1, "operation_type": "apply_table_entry", "entity_index": 1, "control_plane_order": 1},
            {"order": 2, "operation_type": "apply_table_entry", "entity_index": 2, "control_plane_order": 2},
            {"order": 3, "operation_type": "read_register", "target": "conn_state", "control_plane_order": 3},
            {"order": 4, "operation_type": "send_packet", "packet_id": 1}
        ]));
        let res = validate_execution(&packets(), &entities(), &control_plane(), &exec);
        assert!(!res.is_pass());
        assert!(
            res.feedback.contains("send_packet order/coverage mismatch"),
            "{}",
            res.feedback
        );
    }

    #[test]
    fn reordered_packet_sends_are_rejected() {
        let exec = execution(json!([
            {"order": 1, "operation_type": "apply_table_entry", "entity_index": 1, "control_plane_order": 1},
            {"order": 2, "operation_type": "apply_table_entry", "entity_index": 2, "control_plane_order": 2},
            {"order": 3, "operation_type": "read_register", "target": "conn_state", "control_plane_order": 3},
            {"order": 4, "operation_type": "send_packet", "packet_id": 2},
            {"order": 5, "operation_type": "send_packet", "packet_id": 1}
        ]));
        let res = validate_execution(&packets(), &entities(), &control_plane(), &exec);
        assert!(res.feedback.contains("send_packet order/coverage mismatch"), "{}", res.feedback);
    }

    #[test]
    fn control_plane_replay_must_match_declaration_order() {
        let exec = execution(json!([
            {"order": 1, "operation_type": "apply_table_entry", "entity_index": 2, "control_plane_order": 2},
            {"order": 2, "operation_type": "apply_table_entry", "entity_index": 1, "control_plane_order": 1},
            {"order": 3, "operation_type": "read_register", "target": "conn_state", "control_plane_order": 3},
            {"order": 4, "operation_type": "send_packet", "packet_id": 1},
            {"order": 5, "operation_type": "send_packet", "packet_id": 2}
        ]));
        let res = validate_execution(&packets(), &entities(), &control_plane(), &exec);
        assert!(
            res.feedback.contains("control_plane order/coverage mismatch"),
            "{}",
            res.feedback
        );
    }

    #[test]
    fn orders_must_strictly_increase() {
        let exec = execution(json!([
            {"order": 1, "operation_type": "send_packet", "packet_id": 1},
            {"order": 1, "operation_type": "send_packet", "packet_id": 2}
        ]));
        let res = validate_execution(&packets(), &[], &[], &exec);
        assert!(res.feedback.contains("strictly increasing"), "{}", res.feedback);
    }

    #[test]
    fn apply_needs_valid_entity_index() {
        let exec = execution(json!([
            {"order": 1, "operation_type": "apply_table_entry", "entity_index": 9, "control_plane_order": 1}
        ]));
        let res = validate_execution(&[], &entities(), &[], &exec);
        assert!(
            res.feedback.contains("requires a valid entity_index"),
            "{}",
            res.feedback
        );
    }

    #[test]
    fn send_needs_packet_id() {
        let exec = execution(json!([
            {"order": 1, "operation_type": "send_packet"}
        ]));
        let res = validate_execution(&packets(), &[], &[], &exec);
        assert_eq!(
            res.feedback,
            "execution_sequence order 1: send_packet requires a packet_id."
        );
    }

    #[test]
    fn empty_timeline_is_rejected() {
        let res = validate_execution(&packets(), &entities(), &control_plane(), &[]);
        assert_eq!(res.feedback, "execution_sequence is empty.");
    }
}
