mod common;

use common::{read_table, registry, row};
use serde_json::json;
use tablekit::filter::FilterSpec;
use tablekit::backend::FileBackend;
use tablekit::request::{DeleteRequest, UpdateRequest};
use tablekit::{load_from_path, resolve, AppError, CrudService, TableRegistry};

fn spec(v: serde_json::Value) -> FilterSpec {
    FilterSpec::from_value(v).unwrap()
}

fn update_req(v: serde_json::Value) -> UpdateRequest {
    serde_json::from_value(v).unwrap()
}

fn delete_req(v: serde_json::Value) -> DeleteRequest {
    serde_json::from_value(v).unwrap()
}

#[tokio::test]
async fn add_fills_defaults_and_warns() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(dir.path());
    let products = reg.table("products").unwrap();

    let out = CrudService::add(
        &products,
        vec![row(json!({ "id": 42, "nume": "Laptop", "brand": "X", "pret": 3000.0, "categorie": "IT", "garantie": 24 }))],
    )
    .await
    .unwrap();

    assert_eq!(out.ids, vec![1]);
    assert_eq!(out.warnings.len(), 1);
    assert!(out.warnings[0].contains("descriere=\"\""), "{}", out.warnings[0]);
    assert_eq!(out.message(), "1 object(s) added to 'products'");

    let stored = read_table(dir.path(), "products");
    assert_eq!(stored[0]["id"], json!(1));
    assert_eq!(stored[0]["descriere"], json!(""));
}

#[tokio::test]
async fn added_rows_are_found_by_id() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(dir.path());
    let products = reg.table("products").unwrap();
    let out = CrudService::add(
        &products,
        vec![row(json!({ "nume": "A" })), row(json!({ "nume": "B" }))],
    )
    .await
    .unwrap();
    assert_eq!(out.ids, vec![1, 2]);

    let found = CrudService::search(&products, &[spec(json!({ "id": 2 }))]).await.unwrap();
    assert_eq!(found.count, 1);
    assert_eq!(found.results[0]["nume"], json!("B"));
}

#[tokio::test]
async fn delete_renumbers_remaining_rows() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(dir.path());
    let products = reg.table("products").unwrap();
    CrudService::add(
        &products,
        vec![
            row(json!({ "nume": "first" })),
            row(json!({ "nume": "second" })),
            row(json!({ "nume": "third" })),
        ],
    )
    .await
    .unwrap();

    let out = CrudService::delete(&products, vec![delete_req(json!({ "ids": [1, 3] }))])
        .await
        .unwrap();
    assert_eq!(out.ids, vec![1, 3]);
    assert_eq!(out.status(), axum::http::StatusCode::OK);

    let all = CrudService::search(&products, &[FilterSpec::default()]).await.unwrap();
    assert_eq!(all.count, 1);
    assert_eq!(all.results[0]["id"], json!(1));
    assert_eq!(all.results[0]["nume"], json!("second"));
}

#[tokio::test]
async fn string_wildcard_matches_description() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(dir.path());
    let products = reg.table("products").unwrap();
    CrudService::add(
        &products,
        vec![
            row(json!({ "nume": "Notebook", "descriere": "Laptop subtire" })),
            row(json!({ "nume": "Mouse", "descriere": "wireless" })),
        ],
    )
    .await
    .unwrap();

    let found = CrudService::search(&products, &[spec(json!({ "string": { "like": "lap" } }))])
        .await
        .unwrap();
    assert_eq!(found.count, 1);
    assert_eq!(found.results[0]["nume"], json!("Notebook"));
}

#[tokio::test]
async fn range_update_includes_bounds() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(dir.path());
    let products = reg.table("products").unwrap();
    CrudService::add(
        &products,
        vec![
            row(json!({ "nume": "a", "pret": 99.99 })),
            row(json!({ "nume": "b", "pret": 100.0 })),
            row(json!({ "nume": "c", "pret": 200.0 })),
            row(json!({ "nume": "d", "pret": 200.01 })),
        ],
    )
    .await
    .unwrap();

    let out = CrudService::update(
        &products,
        vec![update_req(json!({
            "filter": { "pret": { "min": 100, "max": 200 } },
            "update": { "garantie": 36, "id": 99 }
        }))],
    )
    .await
    .unwrap();
    assert_eq!(out.ids, vec![2, 3]);

    let stored = read_table(dir.path(), "products");
    let warranties: Vec<_> = stored.iter().map(|r| r["garantie"].clone()).collect();
    assert_eq!(warranties, vec![json!(0), json!(36), json!(36), json!(0)]);
    let ids: Vec<_> = stored.iter().map(|r| r["id"].clone()).collect();
    assert_eq!(ids, vec![json!(1), json!(2), json!(3), json!(4)]);
}

#[tokio::test]
async fn repeated_delete_only_warns() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(dir.path());
    let products = reg.table("products").unwrap();
    CrudService::add(&products, vec![row(json!({ "nume": "a" }))]).await.unwrap();

    let first = CrudService::delete(&products, vec![delete_req(json!({ "filter": { "nume": "a" } }))])
        .await
        .unwrap();
    assert_eq!(first.ids, vec![1]);

    let second = CrudService::delete(&products, vec![delete_req(json!({ "filter": { "nume": "a" } }))])
        .await
        .unwrap();
    assert!(second.ids.is_empty());
    assert_eq!(second.status(), axum::http::StatusCode::NOT_FOUND);
    assert_eq!(second.warnings, vec!["request 0: no rows matched in 'products'".to_string()]);
}

#[tokio::test]
async fn search_has_no_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(dir.path());
    let products = reg.table("products").unwrap();
    CrudService::add(&products, vec![row(json!({ "nume": "a" }))]).await.unwrap();
    let before = std::fs::read(dir.path().join("products.json")).unwrap();

    let found = CrudService::search(
        &products,
        &[spec(json!({ "nume": "a" })), spec(json!({ "nume": { "like": "A" } }))],
    )
    .await
    .unwrap();
    assert_eq!(found.count, 2, "union keeps duplicates");

    let after = std::fs::read(dir.path().join("products.json")).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn invalid_batch_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(dir.path());
    let products = reg.table("products").unwrap();

    let err = CrudService::add(
        &products,
        vec![row(json!({ "nume": "ok" })), row(json!({ "nume": "bad", "pret": -1 }))],
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(ref m) if m.starts_with("object 1:")), "{}", err);

    let err = CrudService::add(&products, vec![row(json!({ "culoare": "rosu" }))])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert!(!dir.path().join("products.json").exists());
}

#[tokio::test]
async fn empty_update_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(dir.path());
    let products = reg.table("products").unwrap();
    let err = CrudService::update(&products, vec![update_req(json!({ "ids": [1], "update": {} }))])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("update cannot be empty"), "{}", err);

    let err = CrudService::update(&products, vec![update_req(json!({ "ids": [1], "update": { "id": 5 } }))])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn sensitive_fields_are_not_returned() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(dir.path());
    let users = reg.table("users").unwrap();
    CrudService::add(&users, vec![row(json!({ "username": "ana", "password": "secret" }))])
        .await
        .unwrap();

    let found = CrudService::search(&users, &[FilterSpec::default()]).await.unwrap();
    assert_eq!(found.results[0]["username"], json!("ana"));
    assert!(!found.results[0].contains_key("password"));
    assert_eq!(read_table(dir.path(), "users")[0]["password"], json!("secret"));
}

#[tokio::test]
async fn unknown_table_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(dir.path());
    assert!(matches!(reg.table("invoices"), Err(AppError::NotFound(_))));
    assert!(reg.table("PRODUCTS").is_ok());
}

#[tokio::test]
async fn blank_filter_cannot_wipe_a_table() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(dir.path());
    let products = reg.table("products").unwrap();
    CrudService::add(
        &products,
        vec![row(json!({ "nume": "a" })), row(json!({ "nume": "b" })), row(json!({ "nume": "c" }))],
    )
    .await
    .unwrap();

    for filter in [
        json!({ "string": "" }),
        json!({ "nume": { "like": "" } }),
        json!({ "nume": "", "brand": null }),
    ] {
        let err = CrudService::delete(&products, vec![delete_req(json!({ "filter": filter.clone() }))])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "filter cannot be empty"), "{}: {}", filter, err);

        let err = CrudService::update(
            &products,
            vec![update_req(json!({ "filter": filter, "update": { "garantie": 1 } }))],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
    assert_eq!(read_table(dir.path(), "products").len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_keep_every_row() {
    let dir = tempfile::tempdir().unwrap();
    let reg = registry(dir.path());
    let products = reg.table("products").unwrap();

    let tasks: Vec<_> = (0..40)
        .map(|i| {
            let products = products.clone();
            tokio::spawn(async move {
                CrudService::add(&products, vec![row(json!({ "nume": format!("p{}", i) }))]).await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let stored = read_table(dir.path(), "products");
    assert_eq!(stored.len(), 40);
    let mut ids: Vec<i64> = stored.iter().map(|r| r["id"].as_i64().unwrap()).collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=40).collect::<Vec<_>>());
}

#[tokio::test]
async fn shipped_config_supports_status_updates() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_from_path(concat!(env!("CARGO_MANIFEST_DIR"), "/server/tables.json"))
        .await
        .unwrap();
    let model = resolve(&config).unwrap();
    let names: Vec<String> = model.tables.iter().map(|t| t.name.clone()).collect();
    let reg = TableRegistry::new(model, FileBackend::new(dir.path(), names), None).unwrap();
    let products = reg.table("products").unwrap();

    CrudService::add(
        &products,
        vec![row(json!({ "nume": "x", "pret": 150.0 })), row(json!({ "nume": "y", "pret": 250.0 }))],
    )
    .await
    .unwrap();
    let stored = read_table(dir.path(), "products");
    assert_eq!(stored[0]["status"], json!("testare"));
    assert_eq!(stored[0]["data_adaugare"], json!(null));

    let out = CrudService::update(
        &products,
        vec![update_req(json!({
            "filter": { "pret": { "min": 100, "max": 200 } },
            "update": { "status": "sold", "data_adaugare": "2024-05-01" }
        }))],
    )
    .await
    .unwrap();
    assert_eq!(out.ids, vec![1]);

    let stored = read_table(dir.path(), "products");
    assert_eq!(stored[0]["status"], json!("sold"));
    assert_eq!(stored[0]["data_adaugare"], json!("2024-05-01"));
    assert_eq!(stored[1]["status"], json!("testare"));
}
