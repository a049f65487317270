//! Load table config from a JSON file and resolve it into the runtime model.

use crate::config::resolved::{FieldInfo, ResolvedModel, ResolvedTable, STAFF_ROLES};
use crate::config::types::*;
use crate::config::{compile_patterns, validate, ID_FIELD};
use crate::error::ConfigError;
use crate::row::Row;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// Build resolved model from full config (validates first).
pub fn resolve(config: &FullConfig) -> Result<ResolvedModel, ConfigError> {
    validate(config)?;

    let mut tables = Vec::with_capacity(config.tables.len());
    let mut table_by_name = HashMap::new();

    for t in &config.tables {
        let name = t.name.to_lowercase();
        let mut fields = BTreeMap::new();
        let mut defaults = Row::new();

        fields.insert(
            ID_FIELD.to_string(),
            FieldInfo {
                name: ID_FIELD.to_string(),
                default: serde_json::Value::Number(0.into()),
                field_type: FieldType::Integer,
                sql_type: None,
            },
        );
        for (field, default) in &t.fields {
            if field == ID_FIELD {
                continue;
            }
            let field_type = t
                .kinds
                .get(field)
                .copied()
                .map(FieldType::from)
                .unwrap_or_else(|| FieldType::of_default(default));
            check_default(&t.name, field, default, field_type)?;
            fields.insert(
                field.clone(),
                FieldInfo {
                    name: field.clone(),
                    default: default.clone(),
                    field_type,
                    sql_type: t.sql_types.get(field).cloned(),
                },
            );
            defaults.insert(field.clone(), default.clone());
        }

        let roles = |configured: &Option<Vec<String>>| {
            configured
                .clone()
                .unwrap_or_else(|| STAFF_ROLES.iter().map(|r| r.to_string()).collect())
        };
        let table = Arc::new(ResolvedTable {
            name: name.clone(),
            backend: t.backend,
            fields,
            defaults,
            sql_schema: t.sql_schema.clone().unwrap_or_else(|| "public".into()),
            sql_table: t.sql_table.clone().unwrap_or_else(|| t.name.clone()),
            read_roles: roles(&t.read_roles),
            write_roles: roles(&t.write_roles),
            sensitive_fields: t.sensitive_fields.iter().cloned().collect::<HashSet<_>>(),
            validation: t.validation.clone(),
            patterns: compile_patterns(&t.name, &t.validation)?,
        });
        table_by_name.insert(name, table.clone());
        tables.push(table);
    }

    Ok(ResolvedModel {
        tables,
        table_by_name,
    })
}

/// A declared kind must agree with a non-null default.
fn check_default(
    table: &str,
    field: &str,
    default: &serde_json::Value,
    field_type: FieldType,
) -> Result<(), ConfigError> {
    if default.is_null() {
        return Ok(());
    }
    let implied = FieldType::of_default(default);
    let compatible = implied == field_type
        || (implied == FieldType::Integer && field_type == FieldType::Float)
        || field_type == FieldType::Composite;
    if compatible {
        Ok(())
    } else {
        Err(ConfigError::InvalidDefault {
            table: table.to_string(),
            field: field.to_string(),
            reason: format!("default {} does not fit declared type {:?}", default, field_type),
        })
    }
}

/// Read and parse `tables.json` (`{ "tables": [...] }`).
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<FullConfig, ConfigError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    let config: FullConfig =
        serde_json::from_str(&raw).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    tracing::debug!(path = %path.display(), tables = config.tables.len(), "loaded table config");
    Ok(config)
}
