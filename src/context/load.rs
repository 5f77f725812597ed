//! Context construction: read the three input artifacts and build the
//! name-indexed maps, one linear pass per collection.
//!
//! `load` is the only place in the crate that touches the filesystem; tests
//! and embedding callers use `from_values` with already-parsed documents.

use crate::Result;
use crate::context::{HostInfo, ProgramContext};
use crate::graph::{ControlGraph, dot};
use anyhow::Context;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

impl ProgramContext {
    /// Load and index the program description, the graphs directory and the
    /// topology file. Missing or unparseable inputs are fatal; they are
    /// environment errors, not candidate failures.
    pub fn load(program_path: &Path, graphs_dir: &Path, topology_path: &Path) -> Result<Self> {
        let program: Value = read_json(program_path).context("load program description")?;
        let graphs = dot::load_dot_dir(graphs_dir)?;
        if graphs.is_empty() {
            eprintln!(
                "warning: no .dot graphs in {}; graph queries will return nothing",
                graphs_dir.display()
            );
        }
        let topology: Value = read_json(topology_path).context("load topology")?;
        let ctx = Self::from_values(program, graphs, topology);
        if ctx.hosts.is_empty() {
            eprintln!("warning: topology declares no hosts; every tx_host check will fail");
        }
        Ok(ctx)
    }

    /// Build all indexes from parsed documents.
    pub fn from_values(
        program: Value,
        graphs: BTreeMap<String, ControlGraph>,
        topology: Value,
    ) -> Self {
        let tables = index_tables(&program);
        let actions = index_by_name(program.get("actions"));
        let header_types = index_by_name(program.get("header_types"));
        let headers = index_by_name(program.get("headers"));
        let header_fields = index_header_fields(&headers, &header_types);
        let (host_to_switch, hosts) = index_topology(&topology);
        let program_name = program
            .get("program")
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            program,
            program_name,
            tables,
            actions,
            header_types,
            headers,
            header_fields,
            graphs,
            topology,
            hosts,
            host_to_switch,
        }
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let value =
        serde_json::from_str(&text).with_context(|| format!("parse JSON {}", path.display()))?;
    Ok(value)
}

/// name -> item for a top-level array of objects carrying a "name" string.
fn index_by_name(items: Option<&Value>) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    let Some(items) = items.and_then(Value::as_array) else {
        return out;
    };
    for item in items {
        if let Some(name) = item.get("name").and_then(Value::as_str) {
            out.insert(name.to_string(), item.clone());
        }
    }
    out
}

/// Tables live under pipelines[].tables[]; flatten across all pipelines.
fn index_tables(program: &Value) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    let Some(pipelines) = program.get("pipelines").and_then(Value::as_array) else {
        return out;
    };
    for pipe in pipelines {
        let Some(tables) = pipe.get("tables").and_then(Value::as_array) else {
            continue;
        };
        for table in tables {
            if let Some(name) = table.get("name").and_then(Value::as_str) {
                out.insert(name.to_string(), table.clone());
            }
        }
    }
    out
}

/// header instance -> field -> bitwidth. BMv2 encodes each field as a
/// [name, bitwidth, signed] triple; entries with a non-integer width
/// (varbits) are skipped.
fn index_header_fields(
    headers: &BTreeMap<String, Value>,
    header_types: &BTreeMap<String, Value>,
) -> BTreeMap<String, BTreeMap<String, u32>> {
    let mut out = BTreeMap::new();
    for (instance, header) in headers {
        let Some(type_name) = header.get("header_type").and_then(Value::as_str) else {
            continue;
        };
        let Some(fields) = header_types
            .get(type_name)
            .and_then(|ht| ht.get("fields"))
            .and_then(Value::as_array)
        else {
            continue;
        };
        let mut defs = BTreeMap::new();
        for field in fields {
            let Some(parts) = field.as_array() else {
                continue;
            };
            if let (Some(name), Some(bits)) = (
                parts.first().and_then(Value::as_str),
                parts.get(1).and_then(Value::as_u64),
            ) {
                defs.insert(name.to_string(), bits as u32);
            }
        }
        out.insert(instance.clone(), defs);
    }
    out
}

/// Derive host info and the host -> switch map from topology. A link pairs a
/// host endpoint ("h1") with a switch-port composite ("s1-p1"); the switch id
/// is the prefix before the "-p" separator.
fn index_topology(topology: &Value) -> (BTreeMap<String, String>, BTreeMap<String, HostInfo>) {
    let mut host_to_switch = BTreeMap::new();
    let mut hosts = BTreeMap::new();

    if let Some(host_map) = topology.get("hosts").and_then(Value::as_object) {
        for (hid, info) in host_map {
            if !info.is_object() {
                continue;
            }
            hosts.insert(
                hid.clone(),
                HostInfo {
                    ip: info.get("ip").and_then(Value::as_str).map(str::to_string),
                    mac: info.get("mac").and_then(Value::as_str).map(str::to_string),
                    commands: info
                        .get("commands")
                        .and_then(Value::as_array)
                        .map(|cmds| {
                            cmds.iter()
                                .filter_map(Value::as_str)
                                .map(str::to_string)
                                .collect()
                        })
                        .unwrap_or_default(),
                },
            );
        }
    }

    if let Some(links) = topology.get("links").and_then(Value::as_array) {
        for link in links {
            let Some(pair) = link.as_array() else {
                continue;
            };
            let (Some(a), Some(b)) = (
                pair.first().and_then(Value::as_str),
                pair.get(1).and_then(Value::as_str),
            ) else {
                continue;
            };
            if a.starts_with('h') && b.contains("-p") {
                if let Some((switch, _)) = b.split_once("-p") {
                    host_to_switch.insert(a.to_string(), switch.to_string());
                }
            } else if b.starts_with('h') && a.contains("-p") {
                if let Some((switch, _)) = a.split_once("-p") {
                    host_to_switch.insert(b.to_string(), switch.to_string());
                }
            }
        }
    }

    (host_to_switch, hosts)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use serde_json::json;

    /// Minimal firewall-style program + pod topology used across the
    /// validator and extractor tests.
    pub fn firewall_context() -> ProgramContext {
        let program = json!({
            "program": "firewall.p4",
            "header_types": [
                {"name": "ethernet_t", "fields": [["dstAddr", 48, false], ["srcAddr", 48, false], ["etherType", 16, false]]},
                {"name": "ipv4_t", "fields": [["ttl", 8, false], ["protocol", 8, false], ["srcAddr", 32, false], ["dstAddr", 32, false]]},
                {"name": "tcp_t", "fields": [["srcPort", 16, false], ["dstPort", 16, false], ["seqNo", 32, false], ["ackNo", 32, false], ["flags", 8, false]]}
            ],
            "headers": [
                {"name": "ethernet", "header_type": "ethernet_t"},
                {"name": "ipv4", "header_type": "ipv4_t"},
                {"name": "tcp", "header_type": "tcp_t"}
            ],
            "parsers": [{
                "name": "parser",
                "init_state": "start",
                "parse_states": [
                    {
                        "name": "start",
                        "parser_ops": [{"op": "extract", "parameters": [{"type": "regular", "value": "ethernet"}]}],
                        "transition_key": [{"type": "field", "value": ["ethernet", "etherType"]}],
                        "transitions": [
                            {"type": "hexstr", "value": "0x0800", "mask": null, "next_state": "parse_ipv4"},
                            {"type": "default", "value": null, "mask": null, "next_state": null}
                        ]
                    },
                    {
                        "name": "parse_ipv4",
                        "parser_ops": [{"op": "extract", "parameters": [{"type": "regular", "value": "ipv4"}]}],
                        "transition_key": [{"type": "field", "value": ["ipv4", "protocol"]}],
                        "transitions": [
                            {"type": "hexstr", "value": "0x06", "mask": null, "next_state": "parse_tcp"},
                            {"type": "default", "value": null, "mask": null, "next_state": null}
                        ]
                    },
                    {
                        "name": "parse_tcp",
                        "parser_ops": [{"op": "extract", "parameters": [{"type": "regular", "value": "tcp"}]}],
                        "transition_key": [],
                        "transitions": []
                    }
                ]
            }],
            "pipelines": [{
                "name": "ingress",
                "tables": [
                    {
                        "name": "MyIngress.ipv4_lpm",
                        "key": [{"target": ["ipv4", "dstAddr"], "match_type": "lpm"}],
                        "actions": ["MyIngress.ipv4_forward", "MyIngress.drop"],
                        "max_size": 1024,
                        "default_entry": {"action_id": 1}
                    },
                    {
                        "name": "MyIngress.check_ports",
                        "key": [{"target": ["standard_metadata", "ingress_port"], "match_type": "ternary"}],
                        "actions": ["MyIngress.set_direction"],
                        "max_size": 16
                    }
                ]
            }],
            "actions": [
                {"name": "MyIngress.ipv4_forward",
                 "runtime_data": [{"name": "dstAddr", "bitwidth": 48}, {"name": "port", "bitwidth": 9}],
                 "primitives": []},
                {"name": "MyIngress.drop", "runtime_data": [], "primitives": []},
                {"name": "MyIngress.set_direction", "runtime_data": [{"name": "dir", "bitwidth": 1}], "primitives": []}
            ],
            "register_arrays": [{"name": "conn_state", "bitwidth": 32, "size": 4096}],
            "counter_arrays": [],
            "meter_arrays": []
        });

        let topology = json!({
            "hosts": {
                "h1": {"ip": "10.0.1.1/24", "mac": "08:00:00:00:01:11", "commands": []},
                "h2": {"ip": "10.0.2.2/24", "mac": "08:00:00:00:02:22", "commands": []},
                "h3": {"ip": "10.0.3.3/24", "mac": "08:00:00:00:03:33", "commands": []}
            },
            "switches": {"s1": {}, "s2": {}},
            "links": [
                ["h1", "s1-p1"], ["h2", "s1-p2"], ["h3", "s2-p1"],
                ["s1-p3", "s2-p3"]
            ]
        });

        let mut graphs = BTreeMap::new();
        let text = r#"
digraph MyIngress {
    node_0 [label="__START__" shape=circle]
    node_1 [label="hdr.ipv4.isValid()" shape=diamond]
    node_2 [label="MyIngress.check_ports" shape=ellipse]
    node_3 [label="MyIngress.ipv4_lpm" shape=ellipse]
    node_4 [label="__EXIT__" shape=circle]
    node_0 -> node_1
    node_1 -> node_2 [label="true"]
    node_1 -> node_4 [label="false"]
    node_2 -> node_3
    node_3 -> node_4
}
"#;
        graphs.insert(
            "MyIngress".to_string(),
            dot::parse_dot("MyIngress", text).unwrap(),
        );

        ProgramContext::from_values(program, graphs, topology)
    }
}
