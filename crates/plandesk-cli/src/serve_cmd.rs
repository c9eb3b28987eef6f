use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use plandesk_core::plan::{
    self as plan_store, NewPlan, Plan, PlanStoreError, PlanSummary, PlanType, PlanUpdate,
};

use crate::config::ApiConfig;

type SharedConfig = Arc<ApiConfig>;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        tracing::error!(error = %format!("{err:#}"), "request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{err:#}"),
        }
    }
}

impl From<PlanStoreError> for AppError {
    fn from(err: PlanStoreError) -> Self {
        match err {
            PlanStoreError::NotFound(filename) => {
                Self::not_found(format!("Plan not found: {filename}"))
            }
            PlanStoreError::InvalidFilename(_) | PlanStoreError::EmptyContent => {
                Self::bad_request(err.to_string())
            }
            other => Self::internal(other.into()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingDirQuery {
    pub working_dir: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlanRequest {
    pub content: Option<String>,
    pub working_dir: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub plan_type: Option<String>,
    pub session_id: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePlanRequest {
    pub content: Option<String>,
    pub working_dir: Option<String>,
    pub title: Option<String>,
}

/// Required, non-blank `content`.
fn require_content(content: Option<String>) -> Result<String, AppError> {
    match content {
        Some(c) if !c.trim().is_empty() => Ok(c),
        _ => Err(AppError::bad_request("content is required and must not be empty")),
    }
}

fn parse_plan_type(raw: Option<&str>) -> Result<Option<PlanType>, AppError> {
    raw.map(|t| t.parse::<PlanType>())
        .transpose()
        .map_err(|e| AppError::bad_request(e.to_string()))
}

impl CreatePlanRequest {
    fn into_new_plan(self) -> Result<(Option<String>, NewPlan), AppError> {
        let content = require_content(self.content)?;
        let plan_type = parse_plan_type(self.plan_type.as_deref())?;
        Ok((
            self.working_dir,
            NewPlan {
                content,
                title: self.title,
                plan_type,
                session_id: self.session_id,
                tags: self.tags.unwrap_or_default(),
            },
        ))
    }
}

impl UpdatePlanRequest {
    fn into_update(self) -> Result<(Option<String>, PlanUpdate), AppError> {
        let content = require_content(self.content)?;
        Ok((
            self.working_dir,
            PlanUpdate {
                content,
                title: self.title,
            },
        ))
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanListResponse {
    pub plans: Vec<PlanSummary>,
    pub count: usize,
    pub working_dir: PathBuf,
}

#[derive(Debug, Serialize)]
pub struct PlanMutationResponse {
    pub success: bool,
    pub plan: Plan,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(config: ApiConfig) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/plans", get(list_plans).post(create_plan))
        .route(
            "/api/plans/{filename}",
            get(get_plan).put(update_plan).delete(delete_plan),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(config))
}

/// Pick the request's working directory, or the configured default.
fn resolve_working_dir(config: &ApiConfig, requested: Option<String>) -> PathBuf {
    requested
        .filter(|d| !d.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| config.default_working_dir.clone())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(config: ApiConfig, bind: &str, port: u16) -> Result<()> {
    let default_dir = config.default_working_dir.display().to_string();
    let app = build_router(config);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!(default_working_dir = %default_dir, "plandesk serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("plandesk serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_plans(
    State(config): State<SharedConfig>,
    Query(query): Query<WorkingDirQuery>,
) -> Result<axum::response::Response, AppError> {
    let working_dir = resolve_working_dir(&config, query.working_dir);
    let plans = plan_store::list_plans(&working_dir).await?;

    Ok(Json(PlanListResponse {
        count: plans.len(),
        plans,
        working_dir,
    })
    .into_response())
}

async fn get_plan(
    State(config): State<SharedConfig>,
    Path(filename): Path<String>,
    Query(query): Query<WorkingDirQuery>,
) -> Result<axum::response::Response, AppError> {
    let working_dir = resolve_working_dir(&config, query.working_dir);
    let plan = plan_store::load_plan(&working_dir, &filename).await?;
    Ok(Json(plan).into_response())
}

async fn create_plan(
    State(config): State<SharedConfig>,
    payload: Result<Json<CreatePlanRequest>, JsonRejection>,
) -> Result<axum::response::Response, AppError> {
    let Json(request) = payload?;
    let (requested_dir, new_plan) = request.into_new_plan()?;
    let working_dir = resolve_working_dir(&config, requested_dir);

    let plan = plan_store::save_plan(&working_dir, new_plan).await?;
    Ok((
        StatusCode::CREATED,
        Json(PlanMutationResponse {
            success: true,
            plan,
        }),
    )
        .into_response())
}

async fn update_plan(
    State(config): State<SharedConfig>,
    Path(filename): Path<String>,
    payload: Result<Json<UpdatePlanRequest>, JsonRejection>,
) -> Result<axum::response::Response, AppError> {
    let Json(request) = payload?;
    let (requested_dir, update) = request.into_update()?;
    let working_dir = resolve_working_dir(&config, requested_dir);

    let plan = plan_store::update_plan(&working_dir, &filename, update).await?;
    Ok(Json(PlanMutationResponse {
        success: true,
        plan,
    })
    .into_response())
}

async fn delete_plan(
    State(config): State<SharedConfig>,
    Path(filename): Path<String>,
    Query(query): Query<WorkingDirQuery>,
) -> Result<axum::response::Response, AppError> {
    let working_dir = resolve_working_dir(&config, query.working_dir);

    match plan_store::delete_plan(&working_dir, &filename).await {
        Ok(()) => Ok(Json(SuccessResponse { success: true }).into_response()),
        Err(err @ PlanStoreError::InvalidFilename(_)) => Err(err.into()),
        Err(err) => {
            if !matches!(err, PlanStoreError::NotFound(_)) {
                tracing::warn!(filename = %filename, error = %err, "plan delete failed");
            }
            Err(AppError::not_found(format!(
                "Plan not found or could not be deleted: {filename}"
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
