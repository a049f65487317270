#![allow(dead_code)]

use serde_json::{json, Value};
use std::path::Path;
use tablekit::backend::FileBackend;
use tablekit::{resolve, FullConfig, Row, TableRegistry};

pub fn config() -> FullConfig {
    serde_json::from_value(json!({ "tables": [
        {
            "name": "products",
            "backend": "file",
            "fields": {
                "nume": "", "brand": "", "descriere": "", "pret": 0.0,
                "categorie": "", "garantie": 0
            },
            "read_roles": ["Client", "Employee", "Administrator"],
            "validation": { "pret": { "minimum": 0 } }
        },
        {
            "name": "users",
            "backend": "file",
            "fields": { "username": "", "password": "", "role": "Client" },
            "write_roles": ["Administrator"],
            "sensitive_fields": ["password"]
        }
    ] }))
    .unwrap()
}

pub fn registry(dir: &Path) -> TableRegistry {
    let model = resolve(&config()).unwrap();
    let names: Vec<String> = model.tables.iter().map(|t| t.name.clone()).collect();
    TableRegistry::new(model, FileBackend::new(dir, names), None).unwrap()
}

pub fn row(v: Value) -> Row {
    v.as_object().unwrap().clone()
}

pub fn read_table(dir: &Path, table: &str) -> Vec<Value> {
    let raw: Value = serde_json::from_slice(&std::fs::read(dir.join(format!("{}.json", table))).unwrap()).unwrap();
    raw[table].as_array().unwrap().clone()
}
