//! DOT graph file parsing.
//!
//! p4c emits one DOT file per control (e.g. MyIngress.dot); we only need node
//! labels/shapes, edge labels and adjacency, so this is a line-oriented parse
//! rather than a full DOT grammar:
//!
//!   node_5 [label="hdr.ipv4.isValid()" shape=diamond]
//!   node_5 -> node_7 [label="true"]
//!
//! Nodes and edges often sit inside `subgraph cluster_*` blocks; brace and
//! subgraph lines are skipped so nested statements are still collected.
//! A file that fails to parse is a setup error, not a FAIL verdict.

use crate::Result;
use crate::graph::ControlGraph;
use anyhow::{Context, bail};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;

/// Load every `*.dot` file in `dir` (sorted by file name) keyed by file stem.
pub fn load_dot_dir(dir: &Path) -> Result<BTreeMap<String, ControlGraph>> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("read graphs dir {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "dot"))
        .collect();
    paths.sort();

    let mut graphs = BTreeMap::new();
    for path in paths {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("read DOT file {}", path.display()))?;
        let graph = parse_dot(&name, &text)
            .with_context(|| format!("parse DOT file {}", path.display()))?;
        graphs.insert(name, graph);
    }
    Ok(graphs)
}

/// Parse one DOT document into a `ControlGraph`.
pub fn parse_dot(name: &str, text: &str) -> Result<ControlGraph> {
    // Statement shapes we care about:
    // 1) edge:  id -> id [attrs]
    // 2) node:  id [attrs]
    // 3) bare:  id
    let edge_re = Regex::new(
        r#"^\s*("[^"]*"|[A-Za-z0-9_.]+)\s*->\s*("[^"]*"|[A-Za-z0-9_.]+)\s*(?:\[(.*)\])?\s*;?\s*$"#,
    )?;
    let node_re = Regex::new(r#"^\s*("[^"]*"|[A-Za-z0-9_.]+)\s*\[(.*)\]\s*;?\s*$"#)?;
    let bare_re = Regex::new(r#"^\s*("[^"]*"|[A-Za-z0-9_.]+)\s*;?\s*$"#)?;
    let attr_re = Regex::new(r#"(\w+)\s*=\s*("(?:\\.|[^"\\])*"|[^,\]\s]+)"#)?;
    let attr_stmt_re = Regex::new(r#"^[A-Za-z_]\w*\s*="#)?;

    let mut graph = ControlGraph::new(name);

    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line == "{" || line == "}" {
            continue;
        }
        if line.starts_with("//") || line.starts_with('#') {
            continue;
        }
        if line.starts_with("digraph") || line.starts_with("graph") || line.starts_with("subgraph")
        {
            continue;
        }
        // Default-attribute statements and subgraph attributes.
        if line.starts_with("node ") || line.starts_with("node[") {
            continue;
        }
        if line.starts_with("edge ") || line.starts_with("edge[") {
            continue;
        }
        // Graph-level attribute statements like rankdir=LR or label="...".
        if attr_stmt_re.is_match(line) {
            continue;
        }

        if let Some(caps) = edge_re.captures(line) {
            let src = strip_quotes(caps.get(1).unwrap().as_str());
            let dst = strip_quotes(caps.get(2).unwrap().as_str());
            let attrs = parse_attrs(&attr_re, caps.get(3).map_or("", |m| m.as_str()));
            let label = attrs.get("label").cloned().unwrap_or_default();
            graph.add_edge(&src, &dst, label);
            continue;
        }

        if let Some(caps) = node_re.captures(line) {
            let id = strip_quotes(caps.get(1).unwrap().as_str());
            if id == "graph" || id == "node" || id == "edge" {
                continue;
            }
            let attrs = parse_attrs(&attr_re, caps.get(2).unwrap().as_str());
            let label = attrs.get("label").cloned().unwrap_or_default();
            graph.add_node(&id, label, attrs.get("shape").cloned());
            continue;
        }

        if let Some(caps) = bare_re.captures(line) {
            let id = strip_quotes(caps.get(1).unwrap().as_str());
            if id != "graph" && id != "node" && id != "edge" {
                graph.add_node(&id, String::new(), None);
            }
            continue;
        }

        bail!("cannot parse DOT statement at {}:{}: {:?}", name, lineno + 1, line);
    }

    Ok(graph)
}

fn parse_attrs(attr_re: &Regex, s: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for caps in attr_re.captures_iter(s) {
        let key = caps.get(1).unwrap().as_str().to_string();
        let value = strip_quotes(caps.get(2).unwrap().as_str());
        out.insert(key, value);
    }
    out
}

fn strip_quotes(s: &str) -> String {
    let s = s.trim();
    let inner = if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    };
    inner.replace("\\\"", "\"")
}
