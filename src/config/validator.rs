//! Config validation: unique table names, sane defaults, and references to declared fields.

use crate::config::{BackendKind, FullConfig, TableConfig, ValidationRule};
use crate::error::ConfigError;
use regex::Regex;
use std::collections::{HashMap, HashSet};

pub const ID_FIELD: &str = "id";

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn validate(config: &FullConfig) -> Result<(), ConfigError> {
    if config.tables.is_empty() {
        return Err(ConfigError::Validation("at least one table required".into()));
    }
    let mut names = HashSet::new();
    for t in &config.tables {
        let name = t.name.to_lowercase();
        if !is_identifier(&name) {
            return Err(ConfigError::Validation(format!("invalid table name '{}'", t.name)));
        }
        if !names.insert(name) {
            return Err(ConfigError::DuplicateTable(t.name.clone()));
        }
        validate_table(t)?;
    }
    Ok(())
}

fn validate_table(t: &TableConfig) -> Result<(), ConfigError> {
    for field in t.fields.keys() {
        if !is_identifier(field) {
            return Err(ConfigError::Validation(format!(
                "table {}: invalid field name '{}'",
                t.name, field
            )));
        }
    }
    if let Some(id_default) = t.fields.get(ID_FIELD) {
        if !id_default.is_i64() && !id_default.is_u64() {
            return Err(ConfigError::InvalidDefault {
                table: t.name.clone(),
                field: ID_FIELD.into(),
                reason: "id default must be an integer".into(),
            });
        }
    }

    let known = |f: &str| f == ID_FIELD || t.fields.contains_key(f);
    let references = t
        .kinds
        .keys()
        .map(|k| ("kinds", k))
        .chain(t.sql_types.keys().map(|k| ("sql_types", k)))
        .chain(t.sensitive_fields.iter().map(|k| ("sensitive_fields", k)))
        .chain(t.validation.keys().map(|k| ("validation", k)));
    for (section, field) in references {
        if !known(field) {
            return Err(ConfigError::Validation(format!(
                "table {}: {} references unknown field '{}'",
                t.name, section, field
            )));
        }
    }

    compile_patterns(&t.name, &t.validation)?;

    if t.backend == BackendKind::Relational {
        for ident in [t.sql_schema.as_deref(), t.sql_table.as_deref()].into_iter().flatten() {
            if !is_identifier(ident) {
                return Err(ConfigError::Validation(format!(
                    "table {}: invalid SQL identifier '{}'",
                    t.name, ident
                )));
            }
        }
        for (field, ty) in &t.sql_types {
            if !ty.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ' ') {
                return Err(ConfigError::Validation(format!(
                    "table {}: invalid sql type '{}' for field {}",
                    t.name, ty, field
                )));
            }
        }
    }
    Ok(())
}

/// Compile every `pattern` rule of a table, keyed by field.
pub fn compile_patterns(
    table: &str,
    rules: &HashMap<String, ValidationRule>,
) -> Result<HashMap<String, Regex>, ConfigError> {
    let mut patterns = HashMap::new();
    for (field, rule) in rules {
        let Some(pattern) = &rule.pattern else { continue };
        let re = Regex::new(pattern).map_err(|e| {
            ConfigError::Validation(format!("table {}: invalid pattern for {}: {}", table, field, e))
        })?;
        patterns.insert(field.clone(), re);
    }
    Ok(patterns)
}
