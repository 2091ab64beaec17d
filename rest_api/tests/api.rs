use std::sync::Arc;

use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

use rest_api::{AppState, app};
use storage::SledPatientStore;

// Serves the full router on an ephemeral port backed by a throwaway store,
// so every test runs against its own isolated server.
async fn spawn_server() -> (String, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let store = SledPatientStore::open(dir.path()).expect("open store");
    let state = AppState {
        store: Arc::new(store),
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app(state).into_make_service())
            .await
            .expect("serve");
    });

    (format!("http://{}", addr), dir)
}

fn patient_body(name: &str, email: &str) -> Value {
    json!({
        "name": name,
        "email": email,
        "phone": "1",
        "bdate": "2000-01-01",
    })
}

async fn create_patient(client: &reqwest::Client, base: &str, name: &str, email: &str) -> Value {
    let res = client
        .post(format!("{base}/api/patient/patients"))
        .json(&patient_body(name, email))
        .send()
        .await
        .expect("create request");
    assert_eq!(res.status().as_u16(), 200);
    res.json().await.expect("created patient body")
}

#[tokio::test]
async fn should_create_patient_and_reject_duplicate_email() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let created = create_patient(&client, &base, "A", "a@x.com").await;
    assert!(created["id"].as_str().is_some());
    assert_eq!(created["email"], "a@x.com");
    assert_eq!(created["clinical"], json!([]));

    let res = client
        .post(format!("{base}/api/patient/patients"))
        .json(&patient_body("A", "a@x.com"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Patient already exists");
}

#[tokio::test]
async fn should_serve_latest_entry_and_critical_set_after_append() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let created = create_patient(&client, &base, "A", "a@x.com").await;
    let id = created["id"].as_str().unwrap();

    let res = client
        .post(format!("{base}/api/patient/patients/{id}/clinical"))
        .json(&json!({"bph": 200, "bpl": 70, "rr": 16, "bol": 98, "hbr": 80}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["clinical"].as_array().unwrap().len(), 1);

    let res = client
        .get(format!("{base}/api/patient/patients/{id}/clinical/latest"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let latest: Value = res.json().await.unwrap();
    assert_eq!(latest["bph"], 200.0);

    // bph > 150 puts the patient in the critical set
    let res = client
        .get(format!("{base}/api/patient/patients/critical"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let critical: Value = res.json().await.unwrap();
    let ids: Vec<&str> = critical
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![id]);
}

#[tokio::test]
async fn should_block_delete_until_clinical_data_removed() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let created = create_patient(&client, &base, "A", "a@x.com").await;
    let id = created["id"].as_str().unwrap();

    client
        .post(format!("{base}/api/patient/patients/{id}/clinical"))
        .json(&json!({"bph": 120, "bpl": 80}))
        .send()
        .await
        .unwrap();

    let res = client
        .delete(format!("{base}/api/patient/patients/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Cannot delete patient with clinical data");

    let res = client
        .delete(format!("{base}/api/patient/patients/{id}/clinical/0"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);

    let res = client
        .delete(format!("{base}/api/patient/patients/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 204);

    let res = client
        .get(format!("{base}/api/patient/patients/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
}

#[tokio::test]
async fn should_update_patient_with_created_status() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let created = create_patient(&client, &base, "A", "a@x.com").await;
    let id = created["id"].as_str().unwrap();

    let res = client
        .put(format!("{base}/api/patient/patients/{id}"))
        .json(&json!({"phone": "2"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 201);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["phone"], "2");
    assert_eq!(updated["name"], "A");
}

#[tokio::test]
async fn should_merge_clinical_update_and_shift_on_removal() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let created = create_patient(&client, &base, "A", "a@x.com").await;
    let id = created["id"].as_str().unwrap();

    for bph in [100, 110, 120] {
        client
            .post(format!("{base}/api/patient/patients/{id}/clinical"))
            .json(&json!({"bph": bph, "bpl": 80}))
            .send()
            .await
            .unwrap();
    }

    let res = client
        .put(format!("{base}/api/patient/patients/{id}/clinical/1"))
        .json(&json!({"bpl": 85}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["clinical"][1]["bph"], 110.0);
    assert_eq!(updated["clinical"][1]["bpl"], 85.0);

    client
        .delete(format!("{base}/api/patient/patients/{id}/clinical/0"))
        .send()
        .await
        .unwrap();

    let res = client
        .get(format!("{base}/api/patient/patients/{id}/clinical/0"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let shifted: Value = res.json().await.unwrap();
    assert_eq!(shifted["bph"], 110.0);
}

#[tokio::test]
async fn should_report_unknown_and_malformed_ids_as_not_found() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!(
            "{base}/api/patient/patients/00000000-0000-0000-0000-000000000000"
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Patient not found");

    let res = client
        .get(format!("{base}/api/patient/patients/not-a-uuid"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
}

#[tokio::test]
async fn should_reject_invalid_clinical_indices() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let created = create_patient(&client, &base, "A", "a@x.com").await;
    let id = created["id"].as_str().unwrap();

    for bad_index in ["5", "-1"] {
        let res = client
            .get(format!(
                "{base}/api/patient/patients/{id}/clinical/{bad_index}"
            ))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status().as_u16(), 400);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["message"], "Invalid clinical data index");
    }
}

#[tokio::test]
async fn should_report_empty_store_per_endpoint() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{base}/api/patient/patients"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Patient not found");

    let res = client
        .get(format!("{base}/api/patient/patients/critical"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "No patients in critical condition found");
}

#[tokio::test]
async fn should_expose_health_and_version() {
    let (base, _dir) = spawn_server().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{base}/api/v1/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let res = client
        .get(format!("{base}/api/v1/version"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
}
