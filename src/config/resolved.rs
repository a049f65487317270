//! Resolved table model: config validated and flattened for runtime use.
//! This is the schema registry: defaults for add, field kinds for the filter evaluator.

use crate::config::{BackendKind, FieldKind, FieldType, ValidationRule};
use crate::error::AppError;
use crate::row::Row;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

pub const ROLE_CLIENT: &str = "Client";
pub const ROLE_EMPLOYEE: &str = "Employee";
pub const ROLE_ADMINISTRATOR: &str = "Administrator";

/// Roles allowed to mutate (and, unless widened, read) any table.
pub const STAFF_ROLES: &[&str] = &[ROLE_EMPLOYEE, ROLE_ADMINISTRATOR];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

#[derive(Clone, Debug)]
pub struct FieldInfo {
    pub name: String,
    pub default: serde_json::Value,
    pub field_type: FieldType,
    /// PostgreSQL type name for parameter casts (e.g. "date") when binding values.
    pub sql_type: Option<String>,
}

impl FieldInfo {
    pub fn kind(&self) -> FieldKind {
        self.field_type.kind()
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedTable {
    pub name: String,
    pub backend: BackendKind,
    /// All fields including `id`, ordered by name.
    pub fields: BTreeMap<String, FieldInfo>,
    /// Defaults for every field except `id`.
    pub defaults: Row,
    pub sql_schema: String,
    pub sql_table: String,
    pub read_roles: Vec<String>,
    pub write_roles: Vec<String>,
    /// Field names to strip from all search results (sensitive data).
    pub sensitive_fields: HashSet<String>,
    pub validation: HashMap<String, ValidationRule>,
    /// Compiled `pattern` rules, keyed by field.
    pub patterns: HashMap<String, Regex>,
}

impl ResolvedTable {
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.get(name)
    }

    pub fn field_kind(&self, name: &str) -> Option<FieldKind> {
        self.fields.get(name).map(FieldInfo::kind)
    }

    /// Schema fields of one kind, in name order. Used by the `string` / `number` wildcards.
    pub fn fields_of_kind(&self, kind: FieldKind) -> Vec<String> {
        self.fields
            .values()
            .filter(|f| f.kind() == kind)
            .map(|f| f.name.clone())
            .collect()
    }

    /// Gate a verb on the caller's role. `None` means no caller was resolved upstream.
    pub fn authorize(&self, access: Access, role: Option<&str>) -> Result<(), AppError> {
        let role = role.ok_or(AppError::Unauthorized)?;
        let allowed = match access {
            Access::Read => &self.read_roles,
            Access::Write => &self.write_roles,
        };
        if allowed.iter().any(|r| r.eq_ignore_ascii_case(role)) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "role '{}' may not {} '{}'",
                role,
                match access {
                    Access::Read => "read",
                    Access::Write => "modify",
                },
                self.name
            )))
        }
    }

    pub fn strip_sensitive(&self, row: &mut Row) {
        for f in &self.sensitive_fields {
            row.remove(f);
        }
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedModel {
    pub tables: Vec<Arc<ResolvedTable>>,
    pub table_by_name: HashMap<String, Arc<ResolvedTable>>,
}

impl ResolvedModel {
    pub fn table(&self, name: &str) -> Result<&Arc<ResolvedTable>, AppError> {
        self.table_by_name
            .get(&name.to_lowercase())
            .ok_or_else(|| AppError::NotFound(format!("table '{}' does not exist", name)))
    }

    pub fn defaults_for(&self, table: &str) -> Result<&Row, AppError> {
        Ok(&self.table(table)?.defaults)
    }

    pub fn field_kind(&self, table: &str, field: &str) -> Result<FieldKind, AppError> {
        let t = self.table(table)?;
        t.field_kind(field)
            .ok_or_else(|| AppError::NotFound(format!("field '{}' does not exist in '{}'", field, t.name)))
    }
}
