//! Parser state-machine extractor.
//!
//! The parser graph is a rooted, possibly-cyclic directed graph embedded in
//! the program description (distinct from the control-flow graphs). Two
//! extractions run over it:
//! - `protocol_stacks`: every legal ordered header stack reachable from the
//!   initial state, e.g. Ethernet -> IPv4 -> TCP.
//! - `transition_constraints`: the field/value pairs that select each branch,
//!   e.g. Ethernet.etherType == 0x0800 -> parse_ipv4.
//!
//! Acceptance is implicit: a state with no progressing non-default transition
//! captures the accumulated stack.

use crate::context::ProgramContext;
use serde::Serialize;
use serde_json::Value;

/// Hard bound on parser traversal depth; cyclic parser graphs terminate here
/// at the cost of missing deeper stacks.
pub const MAX_PARSE_DEPTH: usize = 32;

/// One field-driven branch selection of the parser.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionConstraint {
    pub state: String,
    /// Display form, e.g. "Ethernet.etherType" or "IPv4.proto".
    pub field: String,
    pub value: Option<Value>,
    pub mask: Option<Value>,
    pub next_state: Option<String>,
}

/// Enumerate every protocol stack reachable from the parser's initial state,
/// deduplicated by exact sequence equality, first occurrence kept.
pub fn protocol_stacks(ctx: &ProgramContext) -> Vec<Vec<String>> {
    let Some(parser) = ctx.parser() else {
        return Vec::new();
    };
    let Some(init_state) = parser.get("init_state").and_then(Value::as_str) else {
        return Vec::new();
    };
    let Some(states) = parser.get("parse_states").and_then(Value::as_array) else {
        return Vec::new();
    };

    let state_by_name = |name: &str| -> Option<&Value> {
        states
            .iter()
            .find(|st| st.get("name").and_then(Value::as_str) == Some(name))
    };

    let mut raw_paths: Vec<Vec<String>> = Vec::new();
    // Worklist of (state name, accumulated stack, depth), explored LIFO with
    // transitions pushed in reverse so acceptance order matches a recursive
    // depth-first walk.
    let mut work: Vec<(String, Vec<String>, usize)> = vec![(init_state.to_string(), Vec::new(), 0)];

    while let Some((state_name, stack, depth)) = work.pop() {
        if depth > MAX_PARSE_DEPTH {
            continue;
        }
        let Some(state) = state_by_name(&state_name) else {
            continue;
        };

        let mut stack = stack;
        stack.extend(extracted_headers(state));

        let transitions: Vec<&Value> = state
            .get("transitions")
            .and_then(Value::as_array)
            .map(|t| t.iter().collect())
            .unwrap_or_default();

        let progressing: Vec<&str> = transitions
            .iter()
            .filter(|tr| tr.get("type").and_then(Value::as_str) != Some("default"))
            .filter_map(|tr| tr.get("next_state").and_then(Value::as_str))
            .collect();

        if progressing.is_empty() {
            raw_paths.push(stack);
            continue;
        }
        for next in progressing.iter().rev() {
            work.push((next.to_string(), stack.clone(), depth + 1));
        }
    }

    let mut out: Vec<Vec<String>> = Vec::new();
    for path in raw_paths {
        let display: Vec<String> = path.iter().map(|h| display_header(h)).collect();
        if !display.is_empty() && !out.contains(&display) {
            out.push(display);
        }
    }
    out
}

/// Collect `{state, field, value, mask, next_state}` for every non-default
/// transition of a state whose branch key is a single scalar field.
pub fn transition_constraints(ctx: &ProgramContext) -> Vec<TransitionConstraint> {
    let Some(parser) = ctx.parser() else {
        return Vec::new();
    };
    let Some(states) = parser.get("parse_states").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for state in states {
        let Some(field) = scalar_transition_key(state) else {
            continue;
        };
        let state_name = state
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let Some(transitions) = state.get("transitions").and_then(Value::as_array) else {
            continue;
        };
        for tr in transitions {
            if tr.get("type").and_then(Value::as_str) == Some("default") {
                continue;
            }
            out.push(TransitionConstraint {
                state: state_name.clone(),
                field: field.clone(),
                value: non_null(tr.get("value")),
                mask: non_null(tr.get("mask")),
                next_state: tr
                    .get("next_state")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            });
        }
    }
    out
}

/// Bitwidth for a display field expression like "Ethernet.etherType" or
/// "IPv4.proto".
pub fn header_bits(ctx: &ProgramContext, field_expr: &str) -> Option<u32> {
    let (header, field) = field_expr.split_once('.')?;
    let header = header.to_ascii_lowercase();
    let field = canonical_field(&header, field);
    ctx.header_fields.get(&header)?.get(field).copied()
}

fn extracted_headers(state: &Value) -> Vec<String> {
    let Some(ops) = state.get("parser_ops").and_then(Value::as_array) else {
        return Vec::new();
    };
    ops.iter()
        .filter(|op| op.get("op").and_then(Value::as_str) == Some("extract"))
        .filter_map(|op| {
            op.get("parameters")
                .and_then(Value::as_array)?
                .first()?
                .get("value")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .collect()
}

/// The display form of a state's transition key, when it is exactly one
/// scalar header field.
fn scalar_transition_key(state: &Value) -> Option<String> {
    let key = state
        .get("transition_key")
        .and_then(Value::as_array)?
        .first()?;
    if key.get("type").and_then(Value::as_str) != Some("field") {
        return None;
    }
    let pair = key.get("value").and_then(Value::as_array)?;
    let (header, field) = (pair.first()?.as_str()?, pair.get(1)?.as_str()?);
    let header_disp = display_header(header);
    let field_disp = friendly_field(&header_disp, field);
    Some(format!("{header_disp}.{field_disp}"))
}

fn display_header(instance: &str) -> String {
    match instance.to_ascii_lowercase().as_str() {
        "ethernet" => "Ethernet".to_string(),
        "ipv4" => "IPv4".to_string(),
        "tcp" => "TCP".to_string(),
        "udp" => "UDP".to_string(),
        _ => instance.to_string(),
    }
}

/// BMv2 names the IPv4 protocol field "protocol"; prompts and contracts use
/// the short "proto".
fn friendly_field<'a>(header_display: &str, field: &'a str) -> &'a str {
    if header_display == "IPv4" && field == "protocol" {
        "proto"
    } else {
        field
    }
}

fn canonical_field<'a>(header_lower: &str, field: &'a str) -> &'a str {
    if header_lower == "ipv4" && (field == "proto" || field == "protocol") {
        "protocol"
    } else {
        field
    }
}

fn non_null(v: Option<&Value>) -> Option<Value> {
    v.filter(|v| !v.is_null()).cloned()
}
