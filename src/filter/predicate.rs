//! Compile a `FilterSpec` against a table schema and evaluate it over rows.

use crate::config::{FieldKind, ResolvedTable, ID_FIELD};
use crate::error::AppError;
use crate::filter::clause::{FieldRef, FilterClause, FilterSpec};
use crate::row::{value_eq, Row};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum Term {
    /// Clause on one named field.
    Field { name: String, clause: FilterClause },
    /// Clause satisfied by any field of `kind`. `fields` are the schema columns of that kind.
    AnyField {
        kind: FieldKind,
        clause: FilterClause,
        fields: Vec<String>,
    },
    /// Clause that can never hold for the field's schema kind.
    Never,
}

/// Conjunction of terms. No terms matches every row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Predicate {
    terms: Vec<Term>,
}

impl Predicate {
    pub fn compile(spec: &FilterSpec, table: &ResolvedTable) -> Result<Self, AppError> {
        let mut terms = Vec::with_capacity(spec.conditions().len());
        for c in spec.conditions() {
            let term = match &c.target {
                FieldRef::Named(name) => {
                    let kind = table.field_kind(name).ok_or_else(|| {
                        AppError::BadRequest(format!(
                            "unknown field '{}' in filter for '{}'",
                            name, table.name
                        ))
                    })?;
                    if clause_fits_kind(&c.clause, kind) {
                        Term::Field {
                            name: name.clone(),
                            clause: c.clause.clone(),
                        }
                    } else {
                        Term::Never
                    }
                }
                FieldRef::AnyString => Term::AnyField {
                    kind: FieldKind::String,
                    clause: c.clause.clone(),
                    fields: table.fields_of_kind(FieldKind::String),
                },
                FieldRef::AnyNumber => Term::AnyField {
                    kind: FieldKind::Numeric,
                    clause: c.clause.clone(),
                    fields: table.fields_of_kind(FieldKind::Numeric),
                },
            };
            terms.push(term);
        }
        Ok(Predicate { terms })
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.terms.iter().all(|t| term_matches(t, row))
    }
}

fn term_matches(term: &Term, row: &Row) -> bool {
    match term {
        Term::Field { name, clause } => clause_matches(clause, row.get(name).unwrap_or(&Value::Null)),
        Term::AnyField { kind, clause, fields } => fields
            .iter()
            .filter_map(|f| row.get(f))
            .any(|v| kind_of_value(v) == Some(*kind) && clause_matches(clause, v)),
        Term::Never => false,
    }
}

/// Whether a clause can ever hold against a field of `kind`.
fn clause_fits_kind(clause: &FilterClause, kind: FieldKind) -> bool {
    match clause {
        FilterClause::Like(_) => kind == FieldKind::String,
        FilterClause::Range { .. } => kind == FieldKind::Numeric,
        FilterClause::Exact(v) => {
            v.is_null() || kind == FieldKind::Other || kind_of_value(v) == Some(kind)
        }
    }
}

fn kind_of_value(v: &Value) -> Option<FieldKind> {
    match v {
        Value::String(_) => Some(FieldKind::String),
        Value::Number(_) => Some(FieldKind::Numeric),
        Value::Bool(_) => Some(FieldKind::Boolean),
        Value::Null => None,
        Value::Array(_) | Value::Object(_) => Some(FieldKind::Other),
    }
}

/// Evaluate one clause against one value; a value of the wrong type never matches.
pub fn clause_matches(clause: &FilterClause, value: &Value) -> bool {
    match clause {
        FilterClause::Exact(expected) => value_eq(value, expected),
        FilterClause::Like(needle) => value
            .as_str()
            .map(|s| s.to_lowercase().contains(&needle.to_lowercase()))
            .unwrap_or(false),
        FilterClause::Range { min, max } => {
            let Some(n) = value.as_f64() else {
                return false;
            };
            min.map_or(true, |m| n >= m) && max.map_or(true, |m| n <= m)
        }
    }
}

/// Row ids are compared as plain equality on the `id` field.
pub fn id_in(row: &Row, ids: &[crate::row::RowId]) -> bool {
    row.get(ID_FIELD)
        .and_then(Value::as_i64)
        .map(|id| ids.contains(&id))
        .unwrap_or(false)
}
