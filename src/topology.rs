//! Topology zone classification and IPv4 normalization.
//!
//! Zones are a fixed, configuration-free mapping from the connected switch:
//! the pod topology wires internal hosts to s1 and external hosts to s2.

use crate::context::ProgramContext;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

const INTERNAL_SWITCH: &str = "s1";
const EXTERNAL_SWITCH: &str = "s2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Internal,
    External,
    Unknown,
}

impl Zone {
    pub fn as_str(self) -> &'static str {
        match self {
            Zone::Internal => "internal",
            Zone::External => "external",
            Zone::Unknown => "unknown",
        }
    }
}

/// Classify a host from its connected switch; hosts with no link evidence are
/// unknown.
pub fn classify_zone(ctx: &ProgramContext, host_id: &str) -> Zone {
    match ctx.connected_switch(host_id) {
        Some(INTERNAL_SWITCH) => Zone::Internal,
        Some(EXTERNAL_SWITCH) => Zone::External,
        _ => Zone::Unknown,
    }
}

/// Default (internal client, external peer) pair: lexicographically first
/// host of each zone, falling back to h1/h3 when classification yields
/// nothing.
pub fn default_host_pair(ctx: &ProgramContext) -> (String, String) {
    let mut internal = None;
    let mut external = None;
    for hid in ctx.hosts.keys() {
        match classify_zone(ctx, hid) {
            Zone::Internal => {
                if internal.is_none() {
                    internal = Some(hid.clone());
                }
            }
            Zone::External => {
                if external.is_none() {
                    external = Some(hid.clone());
                }
            }
            Zone::Unknown => {}
        }
    }
    (
        internal.unwrap_or_else(|| "h1".to_string()),
        external.unwrap_or_else(|| "h3".to_string()),
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct HostSummary {
    pub ip: Option<String>,
    pub mac: Option<String>,
}

/// Small host/link summary embedded in emitted test cases.
#[derive(Debug, Clone, Serialize)]
pub struct TopologySummary {
    pub hosts: BTreeMap<String, HostSummary>,
    pub links: Vec<Value>,
}

pub fn summarize(ctx: &ProgramContext) -> TopologySummary {
    let hosts = ctx
        .hosts
        .iter()
        .map(|(hid, info)| {
            (
                hid.clone(),
                HostSummary {
                    ip: info.ip.clone(),
                    mac: info.mac.clone(),
                },
            )
        })
        .collect();
    let links = ctx
        .topology
        .get("links")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    TopologySummary { hosts, links }
}

/// Canonical dotted IPv4 from a string like "10.0.1.1" or "10.0.1.1/24";
/// the CIDR suffix is dropped. `None` for anything unparseable.
pub fn normalize_ipv4(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let addr = raw.split('/').next().unwrap_or(raw);
    addr.parse::<Ipv4Addr>().ok().map(|ip| ip.to_string())
}

/// Same, reading a JSON value; only strings can hold addresses.
pub fn normalize_ipv4_value(value: Option<&Value>) -> Option<String> {
    normalize_ipv4(value?.as_str()?)
}
