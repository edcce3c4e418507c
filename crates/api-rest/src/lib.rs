//! # API REST
//!
//! REST API for an MME node.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (status codes, CORS, request schema validation)
//!
//! Patient operations run on the blocking pool: canonicalisation may call the gene
//! nomenclature service, which uses a blocking HTTP client.

#![warn(rust_2018_idioms)]

use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use mme_core::{
    CoreConfig, FileRepository, IdentifierResolver, PatientError, PatientId, PatientRepository,
    PatientService, UpsertOutcome,
};
use mme_genes::{EnsemblClient, EnsemblConfig};
use mme_schema::{Mode, Violation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across REST API handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub patient_service: PatientService,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// MME request body carrying one patient.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddPatientReq {
    #[schema(value_type = Object)]
    pub patient: Value,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddPatientRes {
    pub message: String,
    pub id: String,
    /// `false` when an existing patient with the same id was replaced.
    pub created: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeletePatientRes {
    pub message: String,
}

/// MME response listing stored patients.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientsRes {
    #[schema(value_type = Vec<Object>)]
    pub results: Vec<Value>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schema(value_type = Vec<Object>)]
    pub violations: Vec<Value>,
}

/// Errors returned by handlers, mapped to HTTP statuses.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    /// The document does not conform to the MME schema.
    Unprocessable(Vec<Violation>),
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorRes {
                    message,
                    violations: Vec::new(),
                },
            ),
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                ErrorRes {
                    message,
                    violations: Vec::new(),
                },
            ),
            ApiError::Unprocessable(violations) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorRes {
                    message: "document does not conform to the MME schema".into(),
                    violations: violations
                        .iter()
                        .filter_map(|v| serde_json::to_value(v).ok())
                        .collect(),
                },
            ),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorRes {
                    message: "Internal error".into(),
                    violations: Vec::new(),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

impl From<PatientError> for ApiError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::SchemaViolation(schema) if !schema.violations().is_empty() => {
                ApiError::Unprocessable(schema.violations().to_vec())
            }
            invalid @ (PatientError::InvalidInput(_)
            | PatientError::MissingRequiredField(_)
            | PatientError::MalformedField { .. }) => ApiError::BadRequest(invalid.to_string()),
            other => {
                tracing::error!("Patient operation error: {:?}", other);
                ApiError::Internal
            }
        }
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Runs a blocking patient operation off the async executor.
async fn blocking<T, F>(op: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, PatientError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(op).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(e) => {
            tracing::error!("Blocking task failed: {:?}", e);
            Err(ApiError::Internal)
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health, add_patient, delete_patient, view_patients),
    components(schemas(
        HealthRes,
        AddPatientReq,
        AddPatientRes,
        DeletePatientRes,
        PatientsRes,
        ErrorRes,
    ))
)]
pub struct ApiDoc;

/// Builds the file-backed patient service described by `cfg`.
///
/// When gene resolution is enabled an Ensembl client is created. That client is blocking and
/// must not be constructed on an async executor thread; call this from `spawn_blocking` or
/// before the runtime starts.
pub fn build_service(cfg: Arc<CoreConfig>) -> anyhow::Result<PatientService> {
    let repo: Arc<dyn PatientRepository> = Arc::new(FileRepository::from_config(&cfg)?);

    let resolver = if cfg.resolve_genes() {
        let client = EnsemblClient::new(EnsemblConfig {
            base_url: cfg.ensembl_url().to_owned(),
            request_timeout: cfg.gene_lookup_timeout(),
        })?;
        Some(Arc::new(IdentifierResolver::new(Arc::new(client))))
    } else {
        None
    };

    Ok(PatientService::new(cfg, repo, resolver))
}

/// Router with every endpoint, Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/patient/add", post(add_patient))
        .route("/patient/delete/:id", delete(delete_patient))
        .route("/patient/view", get(view_patients))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "MME REST API is alive".into(),
    })
}

#[utoipa::path(
    post,
    path = "/patient/add",
    request_body = AddPatientReq,
    responses(
        (status = 200, description = "Patient stored", body = AddPatientRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 422, description = "Request violates the MME schema", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Add or update a patient.
///
/// The whole body is validated as an MME request before anything else happens; a failing
/// request is answered with every violated constraint and nothing is stored. Gene references
/// are resolved to Ensembl accessions when the node is configured to do so.
async fn add_patient(
    State(state): State<AppState>,
    Json(req): Json<Value>,
) -> ApiResult<AddPatientRes> {
    if let Err(err) = mme_schema::validate(&req, Mode::Request) {
        tracing::info!("Rejected patient request: {}", err);
        return Err(PatientError::from(err).into());
    }
    let patient = match req {
        Value::Object(mut fields) => fields.remove("patient").unwrap_or(Value::Null),
        _ => Value::Null,
    };

    let service = state.patient_service.clone();
    let added = blocking(move || service.add_patient(patient)).await?;

    let created = added.outcome == UpsertOutcome::Created;
    Ok(Json(AddPatientRes {
        message: if created {
            "Patient was successfully added".into()
        } else {
            "Patient was successfully updated".into()
        },
        id: added.id.to_string(),
        created,
    }))
}

#[utoipa::path(
    delete,
    path = "/patient/delete/{id}",
    params(("id" = String, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient removed", body = DeletePatientRes),
        (status = 400, description = "Bad request", body = ErrorRes),
        (status = 404, description = "No such patient", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Remove a patient by id.
async fn delete_patient(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> ApiResult<DeletePatientRes> {
    let id = PatientId::new(id).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let service = state.patient_service.clone();
    let target = id.clone();
    let removed = blocking(move || service.delete_patient(&target)).await?;

    if removed {
        Ok(Json(DeletePatientRes {
            message: format!("Patient {id} was successfully deleted"),
        }))
    } else {
        Err(ApiError::NotFound(format!("Patient {id} not found")))
    }
}

#[utoipa::path(
    get,
    path = "/patient/view",
    responses(
        (status = 200, description = "Stored patients as an MME response", body = PatientsRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// List every stored patient in wire form.
async fn view_patients(State(state): State<AppState>) -> ApiResult<PatientsRes> {
    let service = state.patient_service.clone();
    let response = blocking(move || service.patients_response()).await?;

    serde_json::from_value(response).map(Json).map_err(|e| {
        tracing::error!("Malformed patients response: {:?}", e);
        ApiError::Internal
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use mme_core::MemoryRepository;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_app(temp_dir: &TempDir) -> Router {
        let cfg = Arc::new(
            CoreConfig::new(
                temp_dir.path().to_path_buf(),
                false,
                "https://grch37.rest.ensembl.org".into(),
                Duration::from_secs(1),
            )
            .expect("CoreConfig::new should succeed"),
        );
        let service = PatientService::new(cfg, Arc::new(MemoryRepository::new()), None);
        router(AppState {
            patient_service: service,
        })
    }

    fn add_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/patient/add")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn patient() -> Value {
        json!({
            "id": "patient_1",
            "contact": {"name": "Contact Name", "href": "mailto:contact_name@mail.com"},
            "features": [{"id": "HP:0100026"}]
        })
    }

    #[tokio::test]
    async fn health_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let response = test_app(&temp_dir)
            .oneshot(get_request("/health"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["ok"], true);
    }

    #[tokio::test]
    async fn add_then_view() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_app(&temp_dir);

        let response = app
            .clone()
            .oneshot(add_request(json!({"patient": patient()})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["id"], "patient_1");
        assert_eq!(body["created"], true);

        let response = app.oneshot(get_request("/patient/view")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let listed = &body["results"][0]["patient"];
        assert_eq!(listed["id"], "patient_1");
        assert!(listed.get("_id").is_none());
    }

    #[tokio::test]
    async fn schema_violations_are_unprocessable() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_app(&temp_dir);

        let mut no_contact = patient();
        no_contact.as_object_mut().unwrap().remove("contact");
        let response = app
            .clone()
            .oneshot(add_request(json!({"patient": no_contact})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["violations"][0]["path"], "/patient/contact");

        let response = app.oneshot(get_request("/patient/view")).await.unwrap();
        assert_eq!(body_json(response).await, json!({"results": []}));
    }

    #[tokio::test]
    async fn delete_existing_then_missing() {
        let temp_dir = TempDir::new().unwrap();
        let app = test_app(&temp_dir);
        app.clone()
            .oneshot(add_request(json!({"patient": patient()})))
            .await
            .unwrap();

        let delete = || {
            Request::builder()
                .method("DELETE")
                .uri("/patient/delete/patient_1")
                .body(Body::empty())
                .unwrap()
        };
        let response = app.clone().oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
