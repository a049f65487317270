//! Raw config types matching the table config JSON (`tables.json`).

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Which storage adapter a table is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Flat `<data_dir>/<table>.json` document, rewritten whole on every mutation.
    File,
    /// PostgreSQL table; ids come from the table's primary key sequence.
    Relational,
}

/// Field kind as used by the filter DSL: `like` needs `String`, `min`/`max` need `Numeric`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Numeric,
    Boolean,
    Other,
}

/// Primitive type implied by a field's default value (or declared in `kinds`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Integer,
    Float,
    Boolean,
    Composite,
}

impl FieldType {
    pub fn of_default(v: &serde_json::Value) -> Self {
        use serde_json::Value;
        match v {
            Value::String(_) => FieldType::String,
            Value::Bool(_) => FieldType::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => FieldType::Integer,
            Value::Number(_) => FieldType::Float,
            Value::Null | Value::Array(_) | Value::Object(_) => FieldType::Composite,
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            FieldType::String => FieldKind::String,
            FieldType::Integer | FieldType::Float => FieldKind::Numeric,
            FieldType::Boolean => FieldKind::Boolean,
            FieldType::Composite => FieldKind::Other,
        }
    }
}

/// Explicit type for fields whose default does not say enough (e.g. `null`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum FieldTypeConfig {
    String,
    Integer,
    Float,
    Boolean,
    Composite,
}

impl<'de> Deserialize<'de> for FieldTypeConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.to_lowercase().as_str() {
            "string" | "text" => Ok(FieldTypeConfig::String),
            "integer" | "int" => Ok(FieldTypeConfig::Integer),
            "float" | "number" | "decimal" => Ok(FieldTypeConfig::Float),
            "boolean" | "bool" => Ok(FieldTypeConfig::Boolean),
            "composite" | "list" | "json" | "other" => Ok(FieldTypeConfig::Composite),
            other => Err(serde::de::Error::custom(format!(
                "unknown field type '{}' (expected string, integer, float, boolean or composite)",
                other
            ))),
        }
    }
}

impl From<FieldTypeConfig> for FieldType {
    fn from(t: FieldTypeConfig) -> Self {
        match t {
            FieldTypeConfig::String => FieldType::String,
            FieldTypeConfig::Integer => FieldType::Integer,
            FieldTypeConfig::Float => FieldType::Float,
            FieldTypeConfig::Boolean => FieldType::Boolean,
            FieldTypeConfig::Composite => FieldType::Composite,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TableConfig {
    pub name: String,
    pub backend: BackendKind,
    /// Field name -> default value. `id` is implied when absent.
    pub fields: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub kinds: BTreeMap<String, FieldTypeConfig>,
    /// PostgreSQL schema for relational tables. Default `public`.
    #[serde(default)]
    pub sql_schema: Option<String>,
    /// PostgreSQL table name for relational tables. Default: `name`.
    #[serde(default)]
    pub sql_table: Option<String>,
    /// Parameter casts for relational columns (e.g. `"data_adaugare": "date"`).
    #[serde(default)]
    pub sql_types: BTreeMap<String, String>,
    #[serde(default)]
    pub read_roles: Option<Vec<String>>,
    #[serde(default)]
    pub write_roles: Option<Vec<String>>,
    /// Field names that must never be exposed in search results (e.g. password hashes).
    #[serde(default)]
    pub sensitive_fields: Vec<String>,
    #[serde(default)]
    pub validation: HashMap<String, ValidationRule>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

/// All tables in one struct for in-memory loading.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FullConfig {
    pub tables: Vec<TableConfig>,
}

impl FullConfig {
    pub fn needs_database(&self) -> bool {
        self.tables.iter().any(|t| t.backend == BackendKind::Relational)
    }
}
