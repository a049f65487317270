//! Filter DSL types: a clause per field, parsed once into a tagged union.
//!
//! ```json
//! { "nume": "Laptop", "pret": { "min": 100, "max": 200 }, "string": { "like": "lap" } }
//! ```

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Reserved key: the clause is matched against every string field of the row.
pub const ANY_STRING: &str = "string";
/// Reserved key: the clause is matched against every numeric field of the row.
pub const ANY_NUMBER: &str = "number";

#[derive(Clone, Debug, PartialEq)]
pub enum FilterClause {
    /// Type-sensitive equality.
    Exact(Value),
    /// Case-insensitive substring match against string values.
    Like(String),
    /// Inclusive numeric bounds; a missing bound is unbounded.
    Range { min: Option<f64>, max: Option<f64> },
}

impl FilterClause {
    pub fn from_value(v: Value) -> Result<Self, String> {
        let Value::Object(mut obj) = v else {
            return Ok(FilterClause::Exact(v));
        };
        if obj.is_empty() {
            return Err("filter clause cannot be an empty object".into());
        }
        if let Some(unknown) = obj
            .keys()
            .find(|k| !matches!(k.as_str(), "like" | "min" | "max" | "exact"))
        {
            return Err(format!(
                "unknown filter operator '{}' (expected like, min, max or exact)",
                unknown
            ));
        }
        if let Some(exact) = obj.remove("exact") {
            if !obj.is_empty() {
                return Err("'exact' cannot be combined with other operators".into());
            }
            return Ok(FilterClause::Exact(exact));
        }
        if let Some(like) = obj.remove("like") {
            if !obj.is_empty() {
                return Err("'like' cannot be combined with 'min'/'max'".into());
            }
            return match like {
                Value::String(s) => Ok(FilterClause::Like(s)),
                other => Err(format!("'like' expects a string, got {}", type_name_of_json(&other))),
            };
        }
        let min = bound("min", obj.remove("min"))?;
        let max = bound("max", obj.remove("max"))?;
        if min.is_none() && max.is_none() {
            return Err("range needs at least one of 'min' or 'max'".into());
        }
        Ok(FilterClause::Range { min, max })
    }
}

fn bound(key: &str, v: Option<Value>) -> Result<Option<f64>, String> {
    match v {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(other) => Err(format!("'{}' expects a number, got {}", key, type_name_of_json(&other))),
    }
}

fn type_name_of_json(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl<'de> Deserialize<'de> for FilterClause {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = Value::deserialize(deserializer)?;
        FilterClause::from_value(v).map_err(serde::de::Error::custom)
    }
}

/// What a condition is evaluated against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldRef {
    Named(String),
    AnyString,
    AnyNumber,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub target: FieldRef,
    pub clause: FilterClause,
}

impl Condition {
    /// False when the operand is blank (`null`, `""` or `[]`), so the condition narrows nothing.
    pub fn is_criterion(&self) -> bool {
        match &self.clause {
            FilterClause::Exact(v) => !is_blank(v),
            FilterClause::Like(s) => !s.is_empty(),
            FilterClause::Range { min, max } => min.is_some() || max.is_some(),
        }
    }
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

/// One filter object; all conditions are ANDed. An empty spec matches every row.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(try_from = "BTreeMap<String, FilterClause>")]
pub struct FilterSpec {
    conditions: Vec<Condition>,
}

impl FilterSpec {
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// At least one condition with a non-blank operand.
    pub fn has_criteria(&self) -> bool {
        self.conditions.iter().any(Condition::is_criterion)
    }

    pub fn from_value(v: Value) -> Result<Self, crate::error::AppError> {
        serde_json::from_value(v)
            .map_err(|e| crate::error::AppError::BadRequest(format!("invalid filter: {}", e)))
    }
}

impl TryFrom<BTreeMap<String, FilterClause>> for FilterSpec {
    type Error = String;

    fn try_from(map: BTreeMap<String, FilterClause>) -> Result<Self, Self::Error> {
        let mut conditions = Vec::with_capacity(map.len());
        for (key, clause) in map {
            let condition = match key.as_str() {
                ANY_STRING => Condition {
                    target: FieldRef::AnyString,
                    clause: match clause {
                        FilterClause::Exact(Value::String(s)) => FilterClause::Like(s),
                        FilterClause::Like(s) => FilterClause::Like(s),
                        _ => return Err("'string' accepts a string or { \"like\": ... }".into()),
                    },
                },
                ANY_NUMBER => Condition {
                    target: FieldRef::AnyNumber,
                    clause: match clause {
                        c @ FilterClause::Exact(Value::Number(_)) => c,
                        c @ FilterClause::Range { .. } => c,
                        _ => return Err("'number' accepts a number or { \"min\": ..., \"max\": ... }".into()),
                    },
                },
                _ => Condition {
                    target: FieldRef::Named(key),
                    clause,
                },
            };
            conditions.push(condition);
        }
        Ok(FilterSpec { conditions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: Value) -> Result<FilterSpec, crate::error::AppError> {
        FilterSpec::from_value(v)
    }

    #[test]
    fn literal_is_exact() {
        let spec = parse(json!({ "nume": "Laptop" })).unwrap();
        assert_eq!(
            spec.conditions(),
            &[Condition {
                target: FieldRef::Named("nume".into()),
                clause: FilterClause::Exact(json!("Laptop")),
            }]
        );
    }

    #[test]
    fn range_with_one_bound() {
        let spec = parse(json!({ "pret": { "min": 100 } })).unwrap();
        assert_eq!(
            spec.conditions()[0].clause,
            FilterClause::Range { min: Some(100.0), max: None }
        );
    }

    #[test]
    fn explicit_exact_operator() {
        let spec = parse(json!({ "produse": { "exact": [1, 2] } })).unwrap();
        assert_eq!(spec.conditions()[0].clause, FilterClause::Exact(json!([1, 2])));
    }

    #[test]
    fn string_wildcard_literal_becomes_like() {
        let spec = parse(json!({ "string": "lap" })).unwrap();
        assert_eq!(
            spec.conditions()[0],
            Condition {
                target: FieldRef::AnyString,
                clause: FilterClause::Like("lap".into()),
            }
        );
    }

    #[test]
    fn malformed_clauses_are_rejected() {
        for bad in [
            json!({ "pret": {} }),
            json!({ "pret": { "between": [1, 2] } }),
            json!({ "pret": { "min": "cheap" } }),
            json!({ "nume": { "like": 5 } }),
            json!({ "nume": { "like": "a", "min": 1 } }),
            json!({ "string": { "min": 1 } }),
            json!({ "number": "ten" }),
            json!({ "number": { "like": "1" } }),
            json!(["not", "an", "object"]),
        ] {
            assert!(parse(bad.clone()).is_err(), "accepted {}", bad);
        }
    }

    #[test]
    fn empty_spec_parses() {
        assert!(parse(json!({})).unwrap().is_empty());
    }

    #[test]
    fn blank_operands_are_not_criteria() {
        for blank in [
            json!({ "string": "" }),
            json!({ "nume": { "like": "" } }),
            json!({ "nume": "", "produse": [], "brand": null }),
        ] {
            let spec = parse(blank.clone()).unwrap();
            assert!(!spec.has_criteria(), "criteria in {}", blank);
        }
        assert!(parse(json!({ "string": "", "nume": "a" })).unwrap().has_criteria());
        assert!(parse(json!({ "garantie": 0 })).unwrap().has_criteria());
    }
}
