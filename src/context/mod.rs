//! Program context: every ground-truth artifact of the target program,
//! loaded once and then shared read-only.
//!
//! Validators and evidence queries never get the raw files; they read this
//! context. Lookups are total (`Option`), only loading is fatal.

pub mod load;

use crate::graph::ControlGraph;
use serde_json::Value;
use std::collections::BTreeMap;

/// Graph names tried when a requested control graph is absent.
const GRAPH_FALLBACKS: [&str; 3] = ["MyIngress", "Ingress", "ingress"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostInfo {
    pub ip: Option<String>,
    pub mac: Option<String>,
    pub commands: Vec<String>,
}

/// Immutable composite context; built once per run, passed by reference.
#[derive(Debug, Clone)]
pub struct ProgramContext {
    /// Raw program description (BMv2 JSON).
    pub program: Value,
    pub program_name: Option<String>,

    /// table name -> raw table schema, collected across all pipelines.
    pub tables: BTreeMap<String, Value>,
    /// action name -> raw action schema.
    pub actions: BTreeMap<String, Value>,
    pub header_types: BTreeMap<String, Value>,
    pub headers: BTreeMap<String, Value>,
    /// header instance -> field -> bitwidth, resolved through header_type.
    pub header_fields: BTreeMap<String, BTreeMap<String, u32>>,

    /// graph name (file stem) -> control-flow graph.
    pub graphs: BTreeMap<String, ControlGraph>,

    /// Raw topology description.
    pub topology: Value,
    pub hosts: BTreeMap<String, HostInfo>,
    pub host_to_switch: BTreeMap<String, String>,
}

impl ProgramContext {
    pub fn table(&self, name: &str) -> Option<&Value> {
        self.tables.get(name)
    }

    pub fn action(&self, name: &str) -> Option<&Value> {
        self.actions.get(name)
    }

    pub fn host(&self, host_id: &str) -> Option<&HostInfo> {
        self.hosts.get(host_id)
    }

    pub fn has_host(&self, host_id: &str) -> bool {
        self.hosts.contains_key(host_id)
    }

    pub fn connected_switch(&self, host_id: &str) -> Option<&str> {
        self.host_to_switch
            .get(host_id)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Look up a control graph, falling back to the usual ingress names.
    pub fn graph(&self, name: &str) -> Option<&ControlGraph> {
        if let Some(g) = self.graphs.get(name) {
            return Some(g);
        }
        GRAPH_FALLBACKS.iter().find_map(|cand| self.graphs.get(*cand))
    }

    /// First parser block of the program description, if any.
    pub fn parser(&self) -> Option<&Value> {
        self.program.get("parsers")?.as_array()?.first()
    }
}
