use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use racectl_core::db::Database;
use racectl_core::models::{
    AddRunnerRequest, AddRunnersBulkRequest, AuthoritativeId, BulkFinishesResponse,
    BulkRunnersResponse, CreateRaceRequest, FinishRequest, FinishResult, Race,
    RecordFinishesBulkRequest, ResultView, Runner, UpdateRaceRequest,
};
use racectl_core::service::ReconciliationService;

use crate::error::AppError;

/// The store serialized behind one lock: a finish upsert and its rerank can
/// never interleave with another device's write to the same race.
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Database>>,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    /// Run a closure against the reconciliation service under the store lock
    async fn with_service<T>(
        &self,
        f: impl FnOnce(&ReconciliationService<'_>) -> racectl_core::Result<T>,
    ) -> Result<T, AppError> {
        let db = self.db.lock().await;
        let service = ReconciliationService::new(db.connection());
        f(&service).map_err(AppError::from)
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/races", get(list_races).post(create_race))
        .route("/api/races/{id}", get(get_race).put(update_race))
        .route("/api/races/{id}/start", post(start_race))
        .route("/api/races/{id}/end", post(end_race))
        .route("/api/runners", post(add_runner))
        .route("/api/runners/bulk", post(add_runners_bulk))
        .route("/api/runners/race/{race_id}", get(list_runners))
        .route("/api/runners/race/{race_id}/bib/{bib}", get(runner_by_bib))
        .route("/api/results/finish", post(record_finish))
        .route("/api/results/batch", post(record_finishes_bulk))
        .route("/api/results/race/{race_id}", get(list_results))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

async fn list_races(State(state): State<AppState>) -> Result<Json<Vec<Race>>, AppError> {
    let races = state.with_service(|service| service.list_races()).await?;
    Ok(Json(races))
}

async fn create_race(
    State(state): State<AppState>,
    Json(request): Json<CreateRaceRequest>,
) -> Result<(StatusCode, Json<Race>), AppError> {
    let race = state
        .with_service(|service| service.create_race(&request.name, request.description.as_deref()))
        .await?;
    Ok((StatusCode::CREATED, Json(race)))
}

async fn get_race(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Race>, AppError> {
    let race = state
        .with_service(|service| service.get_race(AuthoritativeId(id)))
        .await?;
    Ok(Json(race))
}

async fn update_race(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateRaceRequest>,
) -> Result<Json<Race>, AppError> {
    let race = state
        .with_service(|service| service.update_race(AuthoritativeId(id), &request))
        .await?;
    Ok(Json(race))
}

async fn start_race(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Race>, AppError> {
    let race = state
        .with_service(|service| service.start_race(AuthoritativeId(id), None))
        .await?;
    Ok(Json(race))
}

async fn end_race(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Race>, AppError> {
    let race = state
        .with_service(|service| service.end_race(AuthoritativeId(id)))
        .await?;
    Ok(Json(race))
}

async fn add_runner(
    State(state): State<AppState>,
    Json(request): Json<AddRunnerRequest>,
) -> Result<(StatusCode, Json<Runner>), AppError> {
    let runner = state
        .with_service(|service| service.add_runner(&request))
        .await?;
    Ok((StatusCode::CREATED, Json(runner)))
}

async fn add_runners_bulk(
    State(state): State<AppState>,
    Json(request): Json<AddRunnersBulkRequest>,
) -> Result<(StatusCode, Json<BulkRunnersResponse>), AppError> {
    let response = state
        .with_service(|service| service.add_runners_bulk(&request))
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn list_runners(
    State(state): State<AppState>,
    Path(race_id): Path<i64>,
) -> Result<Json<Vec<Runner>>, AppError> {
    let runners = state
        .with_service(|service| service.list_runners(AuthoritativeId(race_id)))
        .await?;
    Ok(Json(runners))
}

async fn runner_by_bib(
    State(state): State<AppState>,
    Path((race_id, bib)): Path<(i64, i64)>,
) -> Result<Json<Runner>, AppError> {
    let runner = state
        .with_service(|service| service.runner_by_bib(AuthoritativeId(race_id), bib))
        .await?;
    Ok(Json(runner))
}

async fn record_finish(
    State(state): State<AppState>,
    Json(request): Json<FinishRequest>,
) -> Result<Json<FinishResult>, AppError> {
    let result = state
        .with_service(|service| service.record_finish(&request))
        .await?;
    Ok(Json(result))
}

async fn record_finishes_bulk(
    State(state): State<AppState>,
    Json(request): Json<RecordFinishesBulkRequest>,
) -> Result<(StatusCode, Json<BulkFinishesResponse>), AppError> {
    let response = state
        .with_service(|service| service.record_finishes_bulk(&request))
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn list_results(
    State(state): State<AppState>,
    Path(race_id): Path<i64>,
) -> Result<Json<Vec<ResultView>>, AppError> {
    let results = state
        .with_service(|service| service.list_results(AuthoritativeId(race_id)))
        .await?;
    Ok(Json(results))
}
