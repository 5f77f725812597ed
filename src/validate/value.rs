//! Value normalization and expectation matching.
//!
//! Contract fields and packet fields arrive as free-form JSON; equality is
//! decided after normalizing numeric-looking strings, so "6" equals 6 while
//! "6.0" stays a float and does not equal integer 6. Hex strings ("0x0800")
//! normalize to integers.

use crate::spec::task::{Expectation, ExpectationChecks, Needle, RelationOp};
use serde_json::Value;

/// Normalized comparison value. Integer and float are distinct on purpose.
#[derive(Debug, Clone, PartialEq)]
pub enum NormValue {
    Int(i64),
    Float(f64),
    Str(String),
    Other(Value),
}

/// Normalize a JSON value for equality: strings that parse as hex or decimal
/// numbers become numbers, other strings are trimmed, everything else is
/// compared structurally.
pub fn coerce(value: &Value) -> NormValue {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return NormValue::Str(String::new());
            }
            let lower = trimmed.to_ascii_lowercase();
            if let Some(hex) = lower.strip_prefix("0x") {
                if let Ok(n) = i64::from_str_radix(hex, 16) {
                    return NormValue::Int(n);
                }
            }
            if let Ok(n) = trimmed.parse::<i64>() {
                return NormValue::Int(n);
            }
            if let Ok(f) = trimmed.parse::<f64>() {
                if f.is_finite() {
                    return NormValue::Float(f);
                }
            }
            NormValue::Str(trimmed.to_string())
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                NormValue::Int(i)
            } else if let Some(f) = n.as_f64() {
                NormValue::Float(f)
            } else {
                NormValue::Other(value.clone())
            }
        }
        other => NormValue::Other(other.clone()),
    }
}

/// Numeric view used by cross-step relations: decimal or 0x-prefixed hex
/// strings, numbers, and booleans (0/1) resolve; anything else is `None`.
pub fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let raw = s.trim().to_ascii_lowercase();
            if raw.is_empty() {
                return None;
            }
            if let Some(hex) = raw.strip_prefix("0x") {
                return i64::from_str_radix(hex, 16).ok().map(|n| n as f64);
            }
            raw.parse::<f64>().ok()
        }
        _ => None,
    }
}

pub fn compare(op: RelationOp, left: f64, right: f64) -> bool {
    match op {
        RelationOp::Eq => left == right,
        RelationOp::Neq => left != right,
        RelationOp::Gt => left > right,
        RelationOp::Lt => left < right,
        RelationOp::Ge => left >= right,
        RelationOp::Le => left <= right,
    }
}

fn literal_eq(actual: &Value, expected: &Value) -> bool {
    coerce(actual) == coerce(expected)
}

/// Does the packet's field value satisfy the expectation? A missing field is
/// treated as JSON null. All checks present in a check set must hold.
pub fn expectation_matches(actual: Option<&Value>, expected: &Expectation) -> bool {
    let actual = actual.unwrap_or(&Value::Null);
    match expected {
        Expectation::Literal(v) => literal_eq(actual, v),
        Expectation::Checks(checks) => checks_match(actual, checks),
    }
}

fn checks_match(actual: &Value, checks: &ExpectationChecks) -> bool {
    if let Some(v) = &checks.equals {
        if !literal_eq(actual, v) {
            return false;
        }
    }
    if let Some(v) = &checks.eq {
        if !literal_eq(actual, v) {
            return false;
        }
    }
    if let Some(needle) = &checks.contains {
        let Some(s) = actual.as_str() else {
            return false;
        };
        match needle {
            Needle::One(n) => {
                if !s.contains(n.as_str()) {
                    return false;
                }
            }
            Needle::Many(ns) => {
                if !ns.iter().all(|n| s.contains(n.as_str())) {
                    return false;
                }
            }
        }
    }
    if let Some(needle) = &checks.not_contains {
        let Some(s) = actual.as_str() else {
            return false;
        };
        match needle {
            Needle::One(n) => {
                if s.contains(n.as_str()) {
                    return false;
                }
            }
            Needle::Many(ns) => {
                if ns.iter().any(|n| s.contains(n.as_str())) {
                    return false;
                }
            }
        }
    }
    if let Some(candidates) = &checks.one_of {
        let norm = coerce(actual);
        if !candidates.iter().any(|c| coerce(c) == norm) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn expect(v: serde_json::Value) -> Expectation {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn numeric_string_normalization() {
        assert_eq!(coerce(&json!("6")), NormValue::Int(6));
        assert_eq!(coerce(&json!(6)), NormValue::Int(6));
        assert_eq!(coerce(&json!("0x0800")), NormValue::Int(0x0800));
        assert_eq!(coerce(&json!("6.5")), NormValue::Float(6.5));
        assert_eq!(coerce(&json!(" flag ")), NormValue::Str("flag".into()));
    }

    #[test]
    fn int_and_float_stay_distinct() {
        assert_ne!(coerce(&json!("6.0")), coerce(&json!(6)));
        assert_eq!(coerce(&json!("6")), coerce(&json!(6)));
    }

    #[test]
    fn to_number_accepts_hex_and_bool() {
        assert_eq!(to_number(&json!("0x10")), Some(16.0));
        assert_eq!(to_number(&json!(true)), Some(1.0));
        assert_eq!(to_number(&json!("1001")), Some(1001.0));
        assert_eq!(to_number(&json!("nope")), None);
        assert_eq!(to_number(&json!([1])), None);
    }

    #[test]
    fn literal_expectation_matches_across_representations() {
        let e = expect(json!("0x0800"));
        assert!(expectation_matches(Some(&json!(2048)), &e));
        assert!(expectation_matches(Some(&json!("0x0800")), &e));
        assert!(!expectation_matches(Some(&json!("0x0801")), &e));
        assert!(!expectation_matches(None, &e));
    }

    #[test]
    fn contains_and_not_contains() {
        let e = expect(json!({"contains": "S", "not_contains": "A"}));
        assert!(expectation_matches(Some(&json!("S")), &e));
        assert!(!expectation_matches(Some(&json!("SA")), &e));
        // Non-string actual fails a substring check.
        assert!(!expectation_matches(Some(&json!(6)), &e));

        let e = expect(json!({"contains": ["SYN", "ACK"]}));
        assert!(expectation_matches(Some(&json!("SYN|ACK")), &e));
        assert!(!expectation_matches(Some(&json!("SYN")), &e));
    }

    #[test]
    fn one_of_normalizes_both_sides() {
        let e = expect(json!({"one_of": [6, "17"]}));
        assert!(expectation_matches(Some(&json!("6")), &e));
        assert!(expectation_matches(Some(&json!(17)), &e));
        assert!(!expectation_matches(Some(&json!(7)), &e));
    }

    #[test]
    fn combined_checks_are_conjunctive() {
        let e = expect(json!({"contains": "S", "one_of": ["S", "SA"]}));
        assert!(expectation_matches(Some(&json!("S")), &e));
        assert!(!expectation_matches(Some(&json!("F")), &e));
    }

    #[test]
    fn missing_field_equals_null() {
        let e = expect(json!(null));
        assert!(expectation_matches(None, &e));
    }
}
