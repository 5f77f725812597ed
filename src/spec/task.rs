//! Task contract schema (task.json).
//!
//! JSON shape:
//! {
//!   "task_id": "T1",
//!   "task_description": "contract-driven handshake",
//!   "feature_under_test": "firewall",
//!   "role_bindings": {"initiator": "h1", "responder": "h3"},
//!   "require_positive_and_negative": true,
//!   "sequence_contract": [
//!     {
//!       "scenario": "positive_main",
//!       "kind": "positive",
//!       "required": true,
//!       "allow_additional_packets": false,
//!       "steps": [
//!         {
//!           "tx_role": "initiator",
//!           "rx_role": "responder",
//!           "protocol_stack": ["Ethernet", "IPv4", "TCP"],
//!           "field_expectations": {
//!             "Ethernet.etherType": {"equals": "0x0800"},
//!             "TCP.flags": {"contains": "S", "not_contains": "A"}
//!           }
//!         }
//!       ],
//!       "field_relations": [
//!         {"left_step": 2, "left_field": "TCP.ack", "op": "eq",
//!          "right_step": 1, "right_field": "TCP.seq", "right_delta": 1}
//!       ]
//!     }
//!   ]
//! }
//!
//! The contract is authored upstream; a malformed contract is a setup error
//! (deserialization failure), not a FAIL verdict.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
pub struct TaskSpec {
    pub task_id: String,

    #[serde(default)]
    pub task_description: String,

    #[serde(default)]
    pub feature_under_test: String,

    #[serde(default)]
    pub role_bindings: BTreeMap<String, String>,

    /// When true, the contract must declare (and the candidate must exercise)
    /// at least one required positive and one required negative scenario.
    #[serde(default = "default_true")]
    pub require_positive_and_negative: bool,

    #[serde(default)]
    pub sequence_contract: Vec<SequenceScenarioSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SequenceScenarioSpec {
    /// Scenario tag; packets carrying this tag are validated against this contract.
    pub scenario: String,
    pub kind: ScenarioKind,

    #[serde(default = "default_true")]
    pub required: bool,

    /// When false, the packet count must equal the step count exactly.
    #[serde(default)]
    pub allow_additional_packets: bool,

    pub steps: Vec<PacketStepSpec>,

    #[serde(default)]
    pub field_relations: Vec<FieldRelationSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PacketStepSpec {
    pub tx_role: String,

    #[serde(default)]
    pub rx_role: Option<String>,

    /// Expected ordered header stack; empty means "don't care".
    #[serde(default)]
    pub protocol_stack: Vec<String>,

    #[serde(default)]
    pub field_expectations: BTreeMap<String, Expectation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationOp {
    Eq,
    Neq,
    Gt,
    Lt,
    Ge,
    Le,
}

impl RelationOp {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationOp::Eq => "eq",
            RelationOp::Neq => "neq",
            RelationOp::Gt => "gt",
            RelationOp::Lt => "lt",
            RelationOp::Ge => "ge",
            RelationOp::Le => "le",
        }
    }
}

/// Cross-step numeric relation: `left <op> right + delta`, steps 1-based.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldRelationSpec {
    pub left_step: usize,
    pub left_field: String,
    pub op: RelationOp,
    pub right_step: usize,
    pub right_field: String,

    #[serde(default)]
    pub right_delta: f64,
}

/// A field expectation: either a plain literal compared after numeric
/// normalization, or a closed set of combinable checks. All checks present
/// in one expectation must hold.
#[derive(Debug, Clone)]
pub enum Expectation {
    Literal(Value),
    Checks(ExpectationChecks),
}

#[derive(Debug, Clone, Default)]
pub struct ExpectationChecks {
    pub equals: Option<Value>,
    /// Alias key "eq"; kept separate so both may appear and both must hold.
    pub eq: Option<Value>,
    pub contains: Option<Needle>,
    pub not_contains: Option<Needle>,
    pub one_of: Option<Vec<Value>>,
}

/// Substring probe for contains/not_contains: one needle or all of a list.
#[derive(Debug, Clone)]
pub enum Needle {
    One(String),
    Many(Vec<String>),
}

impl Needle {
    fn from_value(v: Value) -> Result<Self, String> {
        match v {
            Value::String(s) => Ok(Needle::One(s)),
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => out.push(s),
                        other => {
                            return Err(format!("expected a string, got {other}"));
                        }
                    }
                }
                Ok(Needle::Many(out))
            }
            other => Err(format!("expected a string or list of strings, got {other}")),
        }
    }
}

impl Expectation {
    /// An object is a check set and every key must be recognized; anything
    /// else is a literal. Unknown keys are rejected here instead of being
    /// silently ignored at match time.
    fn from_value(v: Value) -> Result<Self, String> {
        let map = match v {
            Value::Object(map) => map,
            other => return Ok(Expectation::Literal(other)),
        };

        let mut checks = ExpectationChecks::default();
        for (key, val) in map {
            match key.as_str() {
                "equals" => checks.equals = Some(val),
                "eq" => checks.eq = Some(val),
                "contains" => {
                    checks.contains =
                        Some(Needle::from_value(val).map_err(|e| format!("contains: {e}"))?);
                }
                "not_contains" => {
                    checks.not_contains =
                        Some(Needle::from_value(val).map_err(|e| format!("not_contains: {e}"))?);
                }
                "one_of" => match val {
                    Value::Array(items) => checks.one_of = Some(items),
                    other => return Err(format!("one_of: expected a list, got {other}")),
                },
                other => return Err(format!("unrecognized expectation key '{other}'")),
            }
        }
        Ok(Expectation::Checks(checks))
    }
}

impl<'de> Deserialize<'de> for Expectation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Value::deserialize(deserializer)?;
        Expectation::from_value(v).map_err(serde::de::Error::custom)
    }
}

fn default_true() -> bool {
    true
}
