//! Control-plane entity validator: table rules checked against the program's
//! table/action schemas, plus cross-artifact destination-IP coverage.

use crate::context::ProgramContext;
use crate::spec::{ControlPlaneOperation, PacketSpec, TableRule, TaskSpec};
use crate::topology::normalize_ipv4;
use crate::validate::CriticResult;
use serde_json::Value;
use std::collections::BTreeSet;

/// Match kinds that require an explicit rule priority on BMv2.
const PRIORITY_MATCH_TYPES: [&str; 3] = ["ternary", "range", "optional"];

pub fn validate_entities(
    ctx: &ProgramContext,
    task: &TaskSpec,
    packet_sequence: &[PacketSpec],
    entities: &[TableRule],
    control_plane_sequence: Option<&[ControlPlaneOperation]>,
) -> CriticResult {
    if entities.is_empty() {
        return CriticResult::fail("entities is empty; at least one table rule is required.");
    }

    let packet_dst_ips = packet_destination_ips(packet_sequence);
    let mut covered_ips: BTreeSet<String> = BTreeSet::new();

    for (idx, rule) in entities.iter().enumerate() {
        let idx = idx + 1;
        let Some(table) = ctx.table(&rule.table_name) else {
            return CriticResult::fail(format!(
                "entity[{idx}]: unknown table '{}'.",
                rule.table_name
            ));
        };

        let allowed = table
            .get("actions")
            .and_then(Value::as_array)
            .map(|actions| {
                actions
                    .iter()
                    .any(|a| a.as_str() == Some(rule.action_name.as_str()))
            })
            .unwrap_or(false);
        if !allowed {
            return CriticResult::fail(format!(
                "entity[{idx}]: action '{}' is not allowed by table '{}'.",
                rule.action_name, rule.table_name
            ));
        }

        let table_keys = table.get("key").and_then(Value::as_array);
        let key_match_types = collect_match_types(table_keys);
        let rule_match_type = normalize_match_type(&rule.match_type);
        if !key_match_types.is_empty()
            && !rule_match_type
                .as_deref()
                .is_some_and(|mt| key_match_types.contains(mt))
        {
            return CriticResult::fail(format!(
                "entity[{idx}]: match_type '{}' is incompatible with table '{}' key match type(s) {:?}.",
                rule.match_type,
                rule.table_name,
                key_match_types.iter().collect::<Vec<_>>()
            ));
        }

        let needs_priority = key_match_types
            .iter()
            .any(|mt| PRIORITY_MATCH_TYPES.contains(&mt.as_str()));
        if needs_priority && rule.priority.is_none() {
            return CriticResult::fail(format!(
                "entity[{idx}]: table '{}' requires priority for ternary/range/optional matches.",
                rule.table_name
            ));
        }

        if let Some(keys) = table_keys {
            let missing: Vec<String> = keys
                .iter()
                .filter_map(table_key_field)
                .filter(|field| !rule.match_keys.contains_key(field))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            if !missing.is_empty() {
                return CriticResult::fail(format!(
                    "entity[{idx}]: missing required match key(s) {missing:?} for table '{}'.",
                    rule.table_name
                ));
            }
        }

        if let Some(action) = ctx.action(&rule.action_name) {
            let missing_params: Vec<&str> = action
                .get("runtime_data")
                .and_then(Value::as_array)
                .map(|params| {
                    params
                        .iter()
                        .filter_map(|p| p.get("name").and_then(Value::as_str))
                        .filter(|name| !rule.action_data.contains_key(*name))
                        .collect()
                })
                .unwrap_or_default();
            if !missing_params.is_empty() {
                return CriticResult::fail(format!(
                    "entity[{idx}]: missing action_data parameter(s) {missing_params:?} for action '{}'.",
                    rule.action_name
                ));
            }
        }

        covered_ips.extend(rule_destination_ips(rule));
    }

    // Keep rule generation aligned with the packet sequence intent: every
    // destination IP the packets reference must be matchable by some entry.
    if !packet_dst_ips.is_empty() {
        let uncovered: Vec<&String> = packet_dst_ips.difference(&covered_ips).collect();
        if !uncovered.is_empty() {
            return CriticResult::fail(format!(
                "entities do not cover packet_sequence destination IP(s): {uncovered:?}."
            ));
        }
    }

    if let Some(sequence) = control_plane_sequence {
        if let Some(fail) = check_control_plane_sequence(sequence, entities.len()) {
            return fail;
        }
    }

    if task.role_bindings.is_empty() {
        return CriticResult::fail("task.role_bindings is empty.");
    }
    let missing_role_hosts: Vec<String> = task
        .role_bindings
        .iter()
        .filter(|(_, host_id)| !ctx.has_host(host_id))
        .map(|(role, host_id)| format!("{role}:{host_id}"))
        .collect();
    if !missing_role_hosts.is_empty() {
        return CriticResult::fail(format!(
            "Task role binding host(s) are not present in topology: {missing_role_hosts:?}."
        ));
    }

    CriticResult::pass("Control-plane entities are structurally valid and aligned with packet_sequence.")
}

fn check_control_plane_sequence(
    sequence: &[ControlPlaneOperation],
    entity_count: usize,
) -> Option<CriticResult> {
    let mut prev_order: Option<i64> = None;
    let mut prev_entity: Option<usize> = None;
    for op in sequence {
        if prev_order.is_some_and(|prev| op.order <= prev) {
            return Some(CriticResult::fail(format!(
                "control_plane_sequence order values must be strictly increasing; got {} after {}.",
                op.order,
                prev_order.unwrap_or_default()
            )));
        }
        prev_order = Some(op.order);

        if let Some(entity_index) = op.entity_index {
            if entity_index < 1 || entity_index > entity_count {
                return Some(CriticResult::fail(format!(
                    "control_plane_sequence references entity_index {entity_index}, but only {entity_count} entit(y/ies) are declared."
                )));
            }
            if prev_entity.is_some_and(|prev| entity_index <= prev) {
                return Some(CriticResult::fail(format!(
                    "control_plane_sequence entity_index order must follow declaration order; got {entity_index} after {}.",
                    prev_entity.unwrap_or_default()
                )));
            }
            prev_entity = Some(entity_index);
        }
    }
    None
}

fn packet_destination_ips(packet_sequence: &[PacketSpec]) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for packet in packet_sequence {
        if !packet.protocol_stack.iter().any(|p| p == "IPv4") {
            continue;
        }
        let ip = packet
            .field("IPv4.dst")
            .and_then(Value::as_str)
            .and_then(normalize_ipv4);
        if let Some(ip) = ip {
            out.insert(ip);
        }
    }
    out
}

/// Destination IPs a rule matches. Keys are recognized by substring
/// ("dstaddr" or "ipv4.dst"); values come as a bare string, a
/// `[value, prefix]` pair, or an object with a value/ip/addr member.
fn rule_destination_ips(rule: &TableRule) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for (key, value) in &rule.match_keys {
        let lower = key.to_ascii_lowercase();
        if !lower.contains("dstaddr") && !lower.contains("ipv4.dst") {
            continue;
        }
        match value {
            Value::String(s) => {
                if let Some(ip) = normalize_ipv4(s) {
                    out.insert(ip);
                }
            }
            Value::Array(items) => {
                if let Some(ip) = items.first().and_then(Value::as_str).and_then(normalize_ipv4) {
                    out.insert(ip);
                }
            }
            Value::Object(map) => {
                for member in ["value", "ip", "addr"] {
                    let ip = map.get(member).and_then(Value::as_str).and_then(normalize_ipv4);
                    if let Some(ip) = ip {
                        out.insert(ip);
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    out
}

/// "hdr.{header}.{field}" for a `[header, field]` target, the target string
/// verbatim otherwise.
fn table_key_field(key: &Value) -> Option<String> {
    match key.get("target")? {
        Value::Array(pair) if pair.len() == 2 => {
            let (h, f) = (pair[0].as_str()?, pair[1].as_str()?);
            Some(format!("hdr.{h}.{f}"))
        }
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn normalize_match_type(value: &str) -> Option<String> {
    let normalized = value.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

fn collect_match_types(table_keys: Option<&Vec<Value>>) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    let Some(keys) = table_keys else {
        return out;
    };
    for item in keys {
        let mt = item
            .get("match_type")
            .and_then(Value::as_str)
            .and_then(normalize_match_type);
        if let Some(mt) = mt {
            out.insert(mt);
        }
    }
    out
}
