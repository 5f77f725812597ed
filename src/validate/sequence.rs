//! Scenario contract validator: checks a candidate packet sequence against
//! the task's declared per-scenario contracts.
//!
//! Checks run in a fixed order and the first failure wins, so feedback always
//! points at the earliest violated rule.

use crate::context::ProgramContext;
use crate::spec::{PacketSpec, ScenarioKind, SequenceScenarioSpec, TaskSpec};
use crate::topology::{normalize_ipv4, normalize_ipv4_value};
use crate::validate::value::{compare, expectation_matches, to_number};
use crate::validate::CriticResult;
use std::collections::BTreeSet;

pub fn validate_packet_sequence(
    ctx: &ProgramContext,
    task: &TaskSpec,
    packet_sequence: &[PacketSpec],
) -> CriticResult {
    if packet_sequence.is_empty() {
        return CriticResult::fail("packet_sequence is empty");
    }

    for packet in packet_sequence {
        if !ctx.has_host(&packet.tx_host) {
            return CriticResult::fail(format!(
                "packet_id {}: tx_host '{}' not in topology hosts.",
                packet.packet_id, packet.tx_host
            ));
        }
    }

    if task.role_bindings.is_empty() {
        return CriticResult::fail("task.role_bindings is empty.");
    }
    for (role, host_id) in &task.role_bindings {
        if !ctx.has_host(host_id) {
            return CriticResult::fail(format!(
                "task.role_bindings['{role}'] references unknown host '{host_id}'."
            ));
        }
    }

    if task.sequence_contract.is_empty() {
        return CriticResult::fail("task.sequence_contract is empty.");
    }

    if task.require_positive_and_negative {
        let has_required = |kind: ScenarioKind| {
            task.sequence_contract
                .iter()
                .any(|c| c.required && c.kind == kind)
        };
        if !has_required(ScenarioKind::Positive) {
            return CriticResult::fail(
                "task.require_positive_and_negative=true, but sequence_contract has no required positive scenario.",
            );
        }
        if !has_required(ScenarioKind::Negative) {
            return CriticResult::fail(
                "task.require_positive_and_negative=true, but sequence_contract has no required negative scenario.",
            );
        }
    }

    for contract in &task.sequence_contract {
        if let Some(fail) = validate_scenario(ctx, task, packet_sequence, contract) {
            return fail;
        }
    }

    if task.require_positive_and_negative {
        let tags: BTreeSet<&str> = packet_sequence.iter().map(PacketSpec::scenario_tag).collect();
        let has_kind = |kind: ScenarioKind| {
            task.sequence_contract
                .iter()
                .any(|c| c.kind == kind && tags.contains(c.scenario.as_str()))
        };
        if !has_kind(ScenarioKind::Positive) || !has_kind(ScenarioKind::Negative) {
            return CriticResult::fail(
                "packet_sequence must include both positive and negative scenarios when task.require_positive_and_negative=true.",
            );
        }
    }

    CriticResult::pass("packet_sequence satisfies task.sequence_contract.")
}

/// `None` means the scenario contract is satisfied (or absent and optional).
fn validate_scenario(
    ctx: &ProgramContext,
    task: &TaskSpec,
    packet_sequence: &[PacketSpec],
    contract: &SequenceScenarioSpec,
) -> Option<CriticResult> {
    let packets: Vec<&PacketSpec> = packet_sequence
        .iter()
        .filter(|p| p.scenario_tag() == contract.scenario)
        .collect();

    if packets.is_empty() {
        if contract.required {
            return Some(CriticResult::fail(format!(
                "Missing required scenario '{}'.",
                contract.scenario
            )));
        }
        return None;
    }

    if packets.len() < contract.steps.len() {
        return Some(CriticResult::fail(format!(
            "Scenario '{}' has {} packet(s), but contract requires at least {} step(s).",
            contract.scenario,
            packets.len(),
            contract.steps.len()
        )));
    }
    if !contract.allow_additional_packets && packets.len() != contract.steps.len() {
        return Some(CriticResult::fail(format!(
            "Scenario '{}' must have exactly {} packet(s); got {}.",
            contract.scenario,
            contract.steps.len(),
            packets.len()
        )));
    }

    for (idx, step) in contract.steps.iter().enumerate() {
        let step_no = idx + 1;
        let packet = packets[idx];

        let Some(expected_tx_host) = task.role_bindings.get(&step.tx_role) else {
            return Some(CriticResult::fail(format!(
                "Scenario '{}' step {step_no}: unknown tx_role '{}'.",
                contract.scenario, step.tx_role
            )));
        };
        if &packet.tx_host != expected_tx_host {
            return Some(CriticResult::fail(format!(
                "Scenario '{}' step {step_no}: tx_host must be '{expected_tx_host}' for role '{}', got '{}'.",
                contract.scenario, step.tx_role, packet.tx_host
            )));
        }

        if !step.protocol_stack.is_empty() && packet.protocol_stack != step.protocol_stack {
            return Some(CriticResult::fail(format!(
                "Scenario '{}' step {step_no}: protocol_stack mismatch; expected {:?}, got {:?}.",
                contract.scenario, step.protocol_stack, packet.protocol_stack
            )));
        }

        if let Some(rx_role) = &step.rx_role {
            let Some(expected_rx_host) = task.role_bindings.get(rx_role) else {
                return Some(CriticResult::fail(format!(
                    "Scenario '{}' step {step_no}: unknown rx_role '{rx_role}'.",
                    contract.scenario
                )));
            };
            let host = ctx.host(expected_rx_host);

            let expected_ip =
                host.and_then(|h| h.ip.as_deref()).and_then(normalize_ipv4);
            let packet_dst_ip = normalize_ipv4_value(packet.field("IPv4.dst"));
            if let (Some(expected_ip), Some(packet_dst_ip)) = (&expected_ip, &packet_dst_ip) {
                if packet_dst_ip != expected_ip {
                    return Some(CriticResult::fail(format!(
                        "Scenario '{}' step {step_no}: IPv4.dst must target role '{rx_role}' host '{expected_rx_host}' ({expected_ip}); got '{packet_dst_ip}'.",
                        contract.scenario
                    )));
                }
            }

            let expected_mac = host.and_then(|h| h.mac.as_deref());
            let packet_dst_mac = packet.field("Ethernet.dst").and_then(|v| v.as_str());
            if let (Some(expected_mac), Some(packet_dst_mac)) = (expected_mac, packet_dst_mac) {
                if !packet_dst_mac.eq_ignore_ascii_case(expected_mac) {
                    return Some(CriticResult::fail(format!(
                        "Scenario '{}' step {step_no}: Ethernet.dst must target role '{rx_role}' host '{expected_rx_host}' ({expected_mac}); got '{packet_dst_mac}'.",
                        contract.scenario
                    )));
                }
            }
        }

        for (field, expected) in &step.field_expectations {
            let actual = packet.field(field);
            if !expectation_matches(actual, expected) {
                return Some(CriticResult::fail(format!(
                    "Scenario '{}' step {step_no}: field '{field}' violates expectation; actual={actual:?}, expected={expected:?}.",
                    contract.scenario
                )));
            }
        }
    }

    for relation in &contract.field_relations {
        let in_range =
            |step: usize| step >= 1 && step <= packets.len();
        if !in_range(relation.left_step) || !in_range(relation.right_step) {
            return Some(CriticResult::fail(format!(
                "Scenario '{}' relation references out-of-range step (left={}, right={}).",
                contract.scenario, relation.left_step, relation.right_step
            )));
        }
        let left_packet = packets[relation.left_step - 1];
        let right_packet = packets[relation.right_step - 1];
        let left = left_packet.field(&relation.left_field).and_then(to_number);
        let right = right_packet.field(&relation.right_field).and_then(to_number);
        let (Some(left), Some(right)) = (left, right) else {
            return Some(CriticResult::fail(format!(
                "Scenario '{}' relation requires numeric fields {}/{}.",
                contract.scenario, relation.left_field, relation.right_field
            )));
        };
        let rhs = right + relation.right_delta;
        if !compare(relation.op, left, rhs) {
            return Some(CriticResult::fail(format!(
                "Scenario '{}' relation failed: step {}.{} ({left}) {} step {}.{} + {} ({rhs}).",
                contract.scenario,
                relation.left_step,
                relation.left_field,
                relation.op.as_str(),
                relation.right_step,
                relation.right_field,
                relation.right_delta
            )));
        }
    }

    None
}
