use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use uuid::Uuid;

use anyhow::Context;
use anyhow::Error as AnyhowError;

use models::errors::PatientError;
use models::patient::{ClinicalEntry, ClinicalEntryUpdate, NewPatient, Patient, PatientUpdate};
use storage::PatientStore;

pub mod config;
pub use crate::config::{ServerConfig, load_server_config};

// Define the REST API error enum
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Patient(#[from] PatientError),
}

// Implement IntoResponse for ApiError to convert it into an HTTP response.
// Client-visible conditions become 4xx with a human-readable message;
// infrastructure faults are logged and collapsed into a generic 500.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ApiError::Patient(err) = self;
        let status = match &err {
            PatientError::NotFound
            | PatientError::NoClinicalData
            | PatientError::NoCriticalPatients => StatusCode::NOT_FOUND,
            PatientError::DuplicateEmail
            | PatientError::HasClinicalData
            | PatientError::IndexOutOfRange
            | PatientError::EmptyResult
            | PatientError::InvalidData(_) => StatusCode::BAD_REQUEST,
            PatientError::Storage(_) | PatientError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("request failed: {}", err);
            return (status, Json(json!({ "error": "Internal server error" }))).into_response();
        }

        (status, Json(json!({ "message": err.to_string() }))).into_response()
    }
}

// Shared state for the Axum application
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PatientStore>,
}

// A malformed id cannot name any patient, so it is reported the same way
// as an absent one.
fn parse_patient_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::Patient(PatientError::NotFound))
}

// Indices arrive as text; anything that does not parse as an unsigned
// integer (including negative values) is out of range by definition.
fn parse_clinical_index(raw: &str) -> Result<usize, ApiError> {
    raw.parse::<usize>()
        .map_err(|_| ApiError::Patient(PatientError::IndexOutOfRange))
}

// Handler for POST /api/patient/patients
async fn create_patient_handler(
    State(state): State<AppState>,
    Json(payload): Json<NewPatient>,
) -> Result<Json<Patient>, ApiError> {
    let patient = state.store.create_patient(payload).await?;
    Ok(Json(patient))
}

// Handler for GET /api/patient/patients
async fn fetch_patients_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let patients = state.store.list_patients().await?;
    Ok(Json(patients))
}

// Handler for GET /api/patient/patients/:id
async fn fetch_patient_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Patient>, ApiError> {
    let id = parse_patient_id(&id)?;
    let patient = state.store.get_patient(id).await?;
    Ok(Json(patient))
}

// Handler for PUT /api/patient/patients/:id
async fn update_patient_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<PatientUpdate>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let id = parse_patient_id(&id)?;
    let patient = state.store.update_patient(id, payload).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

// Handler for DELETE /api/patient/patients/:id
async fn delete_patient_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_patient_id(&id)?;
    state.store.delete_patient(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Handler for POST /api/patient/patients/:id/clinical
async fn add_clinical_data_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(entry): Json<ClinicalEntry>,
) -> Result<Json<Patient>, ApiError> {
    let id = parse_patient_id(&id)?;
    let patient = state.store.append_clinical_entry(id, entry).await?;
    Ok(Json(patient))
}

// Handler for GET /api/patient/patients/:id/clinical/:index
async fn fetch_clinical_data_by_index_handler(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, String)>,
) -> Result<Json<ClinicalEntry>, ApiError> {
    let id = parse_patient_id(&id)?;
    let index = parse_clinical_index(&index)?;
    let entry = state.store.get_clinical_entry_at(id, index).await?;
    Ok(Json(entry))
}

// Handler for GET /api/patient/patients/:id/clinical/latest
async fn fetch_latest_clinical_data_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClinicalEntry>, ApiError> {
    let id = parse_patient_id(&id)?;
    let entry = state.store.get_latest_clinical_entry(id).await?;
    Ok(Json(entry))
}

// Handler for PUT /api/patient/patients/:id/clinical/:index
async fn update_clinical_data_handler(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, String)>,
    Json(payload): Json<ClinicalEntryUpdate>,
) -> Result<Json<Patient>, ApiError> {
    let id = parse_patient_id(&id)?;
    let index = parse_clinical_index(&index)?;
    let patient = state.store.update_clinical_entry_at(id, index, payload).await?;
    Ok(Json(patient))
}

// Handler for DELETE /api/patient/patients/:id/clinical/:index
async fn delete_clinical_data_handler(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, String)>,
) -> Result<Json<Patient>, ApiError> {
    let id = parse_patient_id(&id)?;
    let index = parse_clinical_index(&index)?;
    let patient = state.store.remove_clinical_entry_at(id, index).await?;
    Ok(Json(patient))
}

// Handler for GET /api/patient/patients/critical
async fn find_critical_patients_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let patients = state.store.find_critical_patients().await?;
    Ok(Json(patients))
}

// Handler for the /api/v1/health endpoint
async fn health_check_handler() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "message": "Patient API is healthy" })),
    )
}

// Handler for the /api/v1/version endpoint
async fn version_handler() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "version": env!("CARGO_PKG_VERSION"), "api_level": 1 })),
    )
}

/// Builds the application router. Exposed separately so tests can serve it
/// on an ephemeral port.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_origin(Any);

    Router::new()
        .route(
            "/api/patient/patients",
            get(fetch_patients_handler).post(create_patient_handler),
        )
        .route(
            "/api/patient/patients/critical",
            get(find_critical_patients_handler),
        )
        .route(
            "/api/patient/patients/:id",
            get(fetch_patient_handler)
                .put(update_patient_handler)
                .delete(delete_patient_handler),
        )
        .route(
            "/api/patient/patients/:id/clinical",
            post(add_clinical_data_handler),
        )
        .route(
            "/api/patient/patients/:id/clinical/latest",
            get(fetch_latest_clinical_data_handler),
        )
        .route(
            "/api/patient/patients/:id/clinical/:index",
            get(fetch_clinical_data_by_index_handler)
                .put(update_clinical_data_handler)
                .delete(delete_clinical_data_handler),
        )
        .route("/api/v1/health", get(health_check_handler))
        .route("/api/v1/version", get(version_handler))
        .with_state(state)
        .layer(cors)
}

// Main function to start the REST API server
pub async fn start_server(
    config: ServerConfig,
    store: Arc<dyn PatientStore>,
) -> Result<(), AnyhowError> {
    let state = AppState { store };
    let app = app(state);

    let host: IpAddr = config
        .host
        .parse()
        .context(format!("Invalid HOST value: {}", config.host))?;
    let addr = SocketAddr::from((host, config.port));

    let listener = TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind to address: {}", addr))?;
    info!("REST API server listening on {}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("REST API server failed to start or run")?;

    info!("REST API server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Received shutdown signal.");
}
