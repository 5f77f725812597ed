//! Evidence queries: deterministic read-only summaries of the program
//! context, shaped for JSON emission.

use crate::context::ProgramContext;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// One table key signature; `field` is the "hdr.{header}.{field}" display
/// form when the schema target is a [header, field] pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableKey {
    pub field: String,
    pub match_type: Option<String>,
    pub mask: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub name: String,
    pub keys: Vec<TableKey>,
    pub actions: Vec<String>,
    pub size: Option<i64>,
    pub default_action: Option<Value>,
    pub is_const: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionParam {
    pub name: Option<String>,
    pub bitwidth: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionSummary {
    pub name: String,
    pub runtime_data: Vec<ActionParam>,
    pub primitives: Vec<Value>,
}

/// A register/counter/meter array discovered in the program description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatefulObject {
    pub kind: String,
    pub name: Option<String>,
    pub bitwidth: Option<i64>,
    pub size: Option<i64>,
}

/// All tables with key/action signatures, in name order.
pub fn tables(ctx: &ProgramContext) -> Vec<TableSummary> {
    ctx.tables
        .iter()
        .map(|(name, schema)| summarize_table(name, schema))
        .collect()
}

pub fn table(ctx: &ProgramContext, name: &str) -> Option<TableSummary> {
    ctx.table(name).map(|schema| summarize_table(name, schema))
}

pub fn action(ctx: &ProgramContext, name: &str) -> Option<ActionSummary> {
    let schema = ctx.action(name)?;
    let runtime_data = schema
        .get("runtime_data")
        .and_then(Value::as_array)
        .map(|params| {
            params
                .iter()
                .map(|p| ActionParam {
                    name: p.get("name").and_then(Value::as_str).map(str::to_string),
                    bitwidth: p.get("bitwidth").and_then(Value::as_i64),
                })
                .collect()
        })
        .unwrap_or_default();
    let primitives = schema
        .get("primitives")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    Some(ActionSummary {
        name: name.to_string(),
        runtime_data,
        primitives,
    })
}

/// header instance -> field -> bitwidth.
pub fn headers(ctx: &ProgramContext) -> &BTreeMap<String, BTreeMap<String, u32>> {
    &ctx.header_fields
}

/// Registers, counters and meters, in the program's declaration order per
/// kind.
pub fn stateful_objects(ctx: &ProgramContext) -> Vec<StatefulObject> {
    let mut out = Vec::new();
    for kind in ["register_arrays", "counter_arrays", "meter_arrays"] {
        let Some(items) = ctx.program.get(kind).and_then(Value::as_array) else {
            continue;
        };
        for item in items {
            out.push(StatefulObject {
                kind: kind.to_string(),
                name: item.get("name").and_then(Value::as_str).map(str::to_string),
                bitwidth: item.get("bitwidth").and_then(Value::as_i64),
                size: item.get("size").and_then(Value::as_i64),
            });
        }
    }
    out
}

fn summarize_table(name: &str, schema: &Value) -> TableSummary {
    let keys = schema
        .get("key")
        .and_then(Value::as_array)
        .map(|keys| keys.iter().filter_map(table_key).collect())
        .unwrap_or_default();
    let actions = schema
        .get("actions")
        .and_then(Value::as_array)
        .map(|actions| {
            actions
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    TableSummary {
        name: name.to_string(),
        keys,
        actions,
        size: schema.get("max_size").and_then(Value::as_i64),
        default_action: schema
            .get("default_entry")
            .and_then(|d| d.get("action_id"))
            .filter(|v| !v.is_null())
            .cloned(),
        is_const: schema.get("is_const_table").and_then(Value::as_bool),
    }
}

fn table_key(key: &Value) -> Option<TableKey> {
    let field = match key.get("target")? {
        Value::Array(pair) if pair.len() == 2 => {
            format!("hdr.{}.{}", pair[0].as_str()?, pair[1].as_str()?)
        }
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Some(TableKey {
        field,
        match_type: key
            .get("match_type")
            .and_then(Value::as_str)
            .map(str::to_string),
        mask: key.get("mask").filter(|m| !m.is_null()).cloned(),
    })
}
