//! Builds parameterized SELECT, INSERT, UPDATE, DELETE from a resolved table and compiled predicates.

use crate::config::{FieldType, ResolvedTable, ID_FIELD};
use crate::filter::{FilterClause, Predicate, Term};
use crate::row::{Row, RowId};
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: only from config).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
fn qualified_table(table: &ResolvedTable) -> String {
    format!("{}.{}", quoted(&table.sql_schema), quoted(&table.sql_table))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }

    /// Placeholder for a value bound to `field`, cast to the field's SQL type when configured.
    /// JSON null is emitted as a literal so the column type decides.
    fn value_for(&mut self, table: &ResolvedTable, field: &str, v: &Value) -> String {
        if v.is_null() {
            return "NULL".into();
        }
        let n = self.push_param(v.clone());
        table
            .field(field)
            .and_then(|f| f.sql_type.as_deref())
            .map(|t| format!("${}::{}", n, t))
            .unwrap_or_else(|| format!("${}", n))
    }
}

/// SELECT list: integer fields as int8 and float fields as float8 (NUMERIC would otherwise decode as text).
fn select_column_list(table: &ResolvedTable) -> String {
    table
        .fields
        .values()
        .map(|f| {
            let q = quoted(&f.name);
            match f.field_type {
                FieldType::Integer => format!("{}::int8 AS {}", q, q),
                FieldType::Float => format!("{}::float8 AS {}", q, q),
                _ => q,
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Escape LIKE metacharacters so the needle is matched literally.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Comparison of one column against one clause. Wildcards reuse the same parameter across columns.
fn clause_sql(table: &ResolvedTable, column: &str, clause: &FilterClause, params: &[u32]) -> String {
    let col = quoted(column);
    match clause {
        FilterClause::Exact(Value::Null) => format!("{} IS NULL", col),
        FilterClause::Exact(_) => {
            let cast = table
                .field(column)
                .and_then(|f| f.sql_type.as_deref())
                .map(|t| format!("::{}", t))
                .unwrap_or_default();
            format!("{} = ${}{}", col, params[0], cast)
        }
        FilterClause::Like(_) => format!("{}::text ILIKE ${}", col, params[0]),
        FilterClause::Range { min, max } => {
            let mut parts = Vec::new();
            let mut next = params.iter();
            if min.is_some() {
                parts.push(format!("{} >= ${}", col, next.next().copied().unwrap_or_default()));
            }
            if max.is_some() {
                parts.push(format!("{} <= ${}", col, next.next().copied().unwrap_or_default()));
            }
            format!("({})", parts.join(" AND "))
        }
    }
}

/// Push the parameters a clause needs, in the order `clause_sql` consumes them.
fn clause_params(q: &mut QueryBuf, clause: &FilterClause) -> Vec<u32> {
    match clause {
        FilterClause::Exact(Value::Null) => Vec::new(),
        FilterClause::Exact(v) => vec![q.push_param(v.clone())],
        FilterClause::Like(needle) => vec![q.push_param(Value::String(like_pattern(needle)))],
        FilterClause::Range { min, max } => [min, max]
            .into_iter()
            .flatten()
            .map(|b| {
                let v = serde_json::Number::from_f64(*b)
                    .map(Value::Number)
                    .unwrap_or(Value::Null);
                q.push_param(v)
            })
            .collect(),
    }
}

/// WHERE body for a predicate; None when the predicate matches everything.
fn where_predicate(table: &ResolvedTable, q: &mut QueryBuf, predicate: &Predicate) -> Option<String> {
    let mut parts = Vec::new();
    for term in predicate.terms() {
        let part = match term {
            Term::Never => "FALSE".to_string(),
            Term::Field { name, clause } => {
                let params = clause_params(q, clause);
                clause_sql(table, name, clause, &params)
            }
            Term::AnyField { clause, fields, .. } => {
                if fields.is_empty() {
                    "FALSE".to_string()
                } else {
                    let params = clause_params(q, clause);
                    let ors: Vec<String> = fields
                        .iter()
                        .map(|f| clause_sql(table, f, clause, &params))
                        .collect();
                    format!("({})", ors.join(" OR "))
                }
            }
        };
        parts.push(part);
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" AND "))
    }
}

fn lock_clause(for_update: bool) -> &'static str {
    if for_update {
        " FOR UPDATE"
    } else {
        ""
    }
}

/// SELECT rows matching a compiled predicate, ORDER BY id.
pub fn select_matching(table: &ResolvedTable, predicate: &Predicate, for_update: bool) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = where_predicate(table, &mut q, predicate)
        .map(|w| format!(" WHERE {}", w))
        .unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}{}",
        select_column_list(table),
        qualified_table(table),
        where_clause,
        quoted(ID_FIELD),
        lock_clause(for_update)
    );
    q
}

/// SELECT rows WHERE id IN ($1, $2, ...) ORDER BY id.
pub fn select_by_ids(table: &ResolvedTable, ids: &[RowId], for_update: bool) -> QueryBuf {
    let mut q = QueryBuf::new();
    let cols = select_column_list(table);
    if ids.is_empty() {
        q.sql = format!("SELECT {} FROM {} WHERE 1 = 0", cols, qualified_table(table));
        return q;
    }
    let placeholders: Vec<String> = ids
        .iter()
        .map(|id| format!("${}", q.push_param(Value::Number((*id).into()))))
        .collect();
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} IN ({}) ORDER BY {}{}",
        cols,
        qualified_table(table),
        quoted(ID_FIELD),
        placeholders.join(", "),
        quoted(ID_FIELD),
        lock_clause(for_update)
    );
    q
}

/// INSERT every schema field except id (the row already carries defaults). Returns the generated id.
pub fn insert(table: &ResolvedTable, row: &Row) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for f in table.fields.values() {
        if f.name == ID_FIELD {
            continue;
        }
        let Some(v) = row.get(&f.name) else { continue };
        placeholders.push(q.value_for(table, &f.name, v));
        cols.push(quoted(&f.name));
    }
    let id = quoted(ID_FIELD);
    q.sql = if cols.is_empty() {
        format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}::int8 AS {}",
            qualified_table(table),
            id,
            id
        )
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}::int8 AS {}",
            qualified_table(table),
            cols.join(", "),
            placeholders.join(", "),
            id,
            id
        )
    };
    q
}

/// UPDATE by id: SET only schema fields present in `changes`, never id. None when nothing to set.
pub fn update_by_id(table: &ResolvedTable, id: RowId, changes: &Row) -> Option<QueryBuf> {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for (k, v) in changes {
        if k == ID_FIELD || table.field(k).is_none() {
            continue;
        }
        let rhs = q.value_for(table, k, v);
        sets.push(format!("{} = {}", quoted(k), rhs));
    }
    if sets.is_empty() {
        return None;
    }
    let id_param = q.push_param(Value::Number(id.into()));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ${}",
        qualified_table(table),
        sets.join(", "),
        quoted(ID_FIELD),
        id_param
    );
    Some(q)
}

/// DELETE by id.
pub fn delete_by_id(table: &ResolvedTable, id: RowId) -> QueryBuf {
    let mut q = QueryBuf::new();
    let id_param = q.push_param(Value::Number(id.into()));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = ${}",
        qualified_table(table),
        quoted(ID_FIELD),
        id_param
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, FullConfig};
    use crate::filter::FilterSpec;
    use serde_json::json;
    use std::sync::Arc;

    fn products() -> Arc<ResolvedTable> {
        let config: FullConfig = serde_json::from_value(json!({ "tables": [{
            "name": "products", "backend": "relational",
            "sql_table": "Products",
            "fields": { "nume": "", "descriere": "", "pret": 0.0, "garantie": 0, "data_adaugare": null },
            "kinds": { "data_adaugare": "string" },
            "sql_types": { "data_adaugare": "date" }
        }] }))
        .unwrap();
        resolve(&config).unwrap().table("products").unwrap().clone()
    }

    fn predicate(spec: Value) -> Predicate {
        Predicate::compile(&FilterSpec::from_value(spec).unwrap(), &products()).unwrap()
    }

    #[test]
    fn select_casts_numeric_columns() {
        let q = select_matching(&products(), &Predicate::default(), false);
        assert_eq!(
            q.sql,
            "SELECT \"data_adaugare\", \"descriere\", \"garantie\"::int8 AS \"garantie\", \
             \"id\"::int8 AS \"id\", \"nume\", \"pret\"::float8 AS \"pret\" \
             FROM \"public\".\"Products\" ORDER BY \"id\""
        );
        assert!(q.params.is_empty());
    }

    #[test]
    fn exact_like_and_range_are_anded() {
        let q = select_matching(
            &products(),
            &predicate(json!({ "nume": { "like": "50%_off" }, "pret": { "min": 100, "max": 200 } })),
            true,
        );
        assert!(q.sql.ends_with(
            "WHERE \"nume\"::text ILIKE $1 AND (\"pret\" >= $2 AND \"pret\" <= $3) ORDER BY \"id\" FOR UPDATE"
        ));
        assert_eq!(q.params, vec![json!("%50\\%\\_off%"), json!(100.0), json!(200.0)]);
    }

    #[test]
    fn string_wildcard_is_or_over_text_columns() {
        let q = select_matching(&products(), &predicate(json!({ "string": "lap" })), false);
        assert!(q.sql.contains(
            "WHERE (\"data_adaugare\"::text ILIKE $1 OR \"descriere\"::text ILIKE $1 OR \"nume\"::text ILIKE $1)"
        ));
        assert_eq!(q.params, vec![json!("%lap%")]);
    }

    #[test]
    fn number_wildcard_reuses_bounds() {
        let q = select_matching(&products(), &predicate(json!({ "number": { "max": 5 } })), false);
        assert!(q.sql.contains(
            "WHERE ((\"garantie\" <= $1) OR (\"id\" <= $1) OR (\"pret\" <= $1))"
        ));
    }

    #[test]
    fn incompatible_clause_is_false_and_null_is_is_null() {
        let q = select_matching(&products(), &predicate(json!({ "pret": { "like": "1" } })), false);
        assert!(q.sql.contains("WHERE FALSE"));
        let q = select_matching(&products(), &predicate(json!({ "descriere": null })), false);
        assert!(q.sql.contains("WHERE \"descriere\" IS NULL"));
        assert!(q.params.is_empty());
    }

    #[test]
    fn exact_uses_configured_cast() {
        let q = select_matching(&products(), &predicate(json!({ "data_adaugare": "2024-01-02" })), false);
        assert!(q.sql.contains("WHERE \"data_adaugare\" = $1::date"));
    }

    #[test]
    fn select_by_ids_lists_placeholders() {
        let q = select_by_ids(&products(), &[1, 3], true);
        assert!(q.sql.contains("WHERE \"id\" IN ($1, $2) ORDER BY \"id\" FOR UPDATE"));
        assert_eq!(q.params, vec![json!(1), json!(3)]);
    }

    #[test]
    fn insert_skips_id_and_inlines_null() {
        let row = json!({ "id": 9, "nume": "Laptop", "descriere": "", "pret": 10.0, "garantie": 0, "data_adaugare": null });
        let q = insert(&products(), row.as_object().unwrap());
        assert_eq!(
            q.sql,
            "INSERT INTO \"public\".\"Products\" (\"data_adaugare\", \"descriere\", \"garantie\", \"nume\", \"pret\") \
             VALUES (NULL, $1, $2, $3, $4) RETURNING \"id\"::int8 AS \"id\""
        );
        assert_eq!(q.params, vec![json!(""), json!(0), json!("Laptop"), json!(10.0)]);
    }

    #[test]
    fn update_never_sets_id() {
        let changes = json!({ "id": 4, "nume": "New" });
        let q = update_by_id(&products(), 7, changes.as_object().unwrap()).unwrap();
        assert_eq!(q.sql, "UPDATE \"public\".\"Products\" SET \"nume\" = $1 WHERE \"id\" = $2");
        assert_eq!(q.params, vec![json!("New"), json!(7)]);

        let only_id = json!({ "id": 4 });
        assert!(update_by_id(&products(), 7, only_id.as_object().unwrap()).is_none());
    }

    #[test]
    fn delete_by_id_binds_id() {
        let q = delete_by_id(&products(), 2);
        assert_eq!(q.sql, "DELETE FROM \"public\".\"Products\" WHERE \"id\" = $1");
        assert_eq!(q.params, vec![json!(2)]);
    }
}
