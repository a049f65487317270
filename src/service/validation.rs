//! Per-field checks from a table's `validation` rules.

use crate::config::ValidationRule;
use crate::error::AppError;
use crate::row::{value_eq, Row};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

const UUID_PATTERN: &str =
    r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$";

static UUID_RE: OnceLock<Option<Regex>> = OnceLock::new();

type Patterns = HashMap<String, Regex>;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a complete object. Required fields must be present and non-null.
    pub fn validate(
        row: &Row,
        rules: &HashMap<String, ValidationRule>,
        patterns: &Patterns,
    ) -> Result<(), AppError> {
        for (field, rule) in rules {
            let val = row.get(field);
            if rule.required == Some(true) && val.map_or(true, Value::is_null) {
                return Err(AppError::Validation(format!("{} is required", field)));
            }
            if let Some(v) = val {
                validate_field(field, v, rule, patterns.get(field))?;
            }
        }
        Ok(())
    }

    /// Validate only the fields being changed. Setting a required field to null is rejected.
    pub fn validate_partial(
        changes: &Row,
        rules: &HashMap<String, ValidationRule>,
        patterns: &Patterns,
    ) -> Result<(), AppError> {
        for (field, v) in changes {
            let Some(rule) = rules.get(field) else { continue };
            if rule.required == Some(true) && v.is_null() {
                return Err(AppError::Validation(format!("{} is required", field)));
            }
            validate_field(field, v, rule, patterns.get(field))?;
        }
        Ok(())
    }
}

fn validate_field(field: &str, v: &Value, rule: &ValidationRule, pattern: Option<&Regex>) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    if let Some(format) = &rule.format {
        validate_format(field, v, format)?;
    }
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(max) = rule.max_length {
            if len > max as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at most {} characters",
                    field, max
                )));
            }
        }
        if let Some(min) = rule.min_length {
            if len < min as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at least {} characters",
                    field, min
                )));
            }
        }
        if let Some(re) = pattern {
            if !re.is_match(s) {
                return Err(AppError::Validation(format!(
                    "{} does not match required pattern",
                    field
                )));
            }
        }
    }
    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            return Err(AppError::Validation(format!(
                "{} must be one of: {:?}",
                field,
                allowed.iter().take(5).collect::<Vec<_>>()
            )));
        }
    }
    if let Some(n) = v.as_f64() {
        if let Some(min) = rule.minimum {
            if n < min {
                return Err(AppError::Validation(format!("{} must be at least {}", field, min)));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                return Err(AppError::Validation(format!("{} must be at most {}", field, max)));
            }
        }
    }
    Ok(())
}

/// Formats apply to non-empty strings; `""` is the unset default.
fn validate_format(field: &str, v: &Value, format: &str) -> Result<(), AppError> {
    let Some(s) = v.as_str().filter(|s| !s.is_empty()) else {
        return Ok(());
    };
    let ok = match format.to_lowercase().as_str() {
        "email" => s.len() >= 3 && s.contains('@'),
        "uuid" => UUID_RE
            .get_or_init(|| Regex::new(UUID_PATTERN).ok())
            .as_ref()
            .is_some_and(|re| re.is_match(s)),
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(AppError::Validation(format!("{} must be a valid {}", field, format)))
    }
}
