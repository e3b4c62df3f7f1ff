//! Служебные и административные маршруты: полный список, сводка, регистрация,
//! изменение и удаление узлов.

use crate::api::middleware::AdminAccess;
use crate::api::AppState;
use crate::error::AppError;
use crate::services::registry_service::{NewServer, ServerPatch};
use crate::services::{admin_service, selection_service};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use speedtest_entities::servers::{Model, ServerStatus};

// ── Типы запросов/ответов ────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateServerRequest {
    pub id: String,
    pub region: String,
    pub city: String,
    pub url: String,
    pub status: Option<ServerStatus>,
    pub load: Option<f64>,
}

/// Отсутствующие и пустые поля не меняются.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateServerRequest {
    pub region: Option<String>,
    pub city: Option<String>,
    pub url: Option<String>,
    pub status: Option<ServerStatus>,
    pub load: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub up: u64,
    pub down: u64,
    pub last_ping_at: Option<DateTime<Utc>>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/servers/all", get(list_all))
        .route("/health", get(health))
        .route("/servers", post(create_server))
        .route("/servers/{id}", put(update_server).delete(delete_server))
}

// ── Обработчики ──────────────────────────────────────────────────────────────

/// GET /api/v1/servers/all — все узлы, самые свежие первыми.
async fn list_all(State(state): State<AppState>) -> Result<Json<Vec<Model>>, AppError> {
    let servers = selection_service::list_all(state.store.as_ref()).await?;
    Ok(Json(servers))
}

/// GET /api/v1/health — число UP/DOWN и время последней проверки.
async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    let summary = admin_service::health_summary(state.store.as_ref()).await?;
    Ok(Json(HealthResponse {
        up: summary.up,
        down: summary.down,
        last_ping_at: summary.last_ping_at,
    }))
}

/// POST /api/v1/servers — регистрация узла.
async fn create_server(
    State(state): State<AppState>,
    _admin: AdminAccess,
    payload: Result<Json<CreateServerRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Model>), AppError> {
    let Json(req) = payload?;
    let server = validate_create(req)?;
    let id = server.id.clone();
    let created = state.store.create(server).await?;
    tracing::info!("Узел зарегистрирован: {id} ({})", created.url);
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/v1/servers/{id} — частичное обновление.
async fn update_server(
    State(state): State<AppState>,
    _admin: AdminAccess,
    Path(id): Path<String>,
    payload: Result<Json<UpdateServerRequest>, JsonRejection>,
) -> Result<Json<Model>, AppError> {
    let Json(req) = payload?;
    let patch = validate_patch(req)?;
    let updated = state.store.update_fields(&id, patch).await?;
    tracing::info!("Узел обновлён: {id}");
    Ok(Json(updated))
}

/// DELETE /api/v1/servers/{id} — удаление узла.
async fn delete_server(
    State(state): State<AppState>,
    _admin: AdminAccess,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.store.delete(&id).await?;
    tracing::info!("Узел удалён: {id}");
    Ok(Json(serde_json::json!({ "ok": true })))
}

// ── Проверка входных данных ──────────────────────────────────────────────────

pub(crate) fn validate_create(req: CreateServerRequest) -> Result<NewServer, AppError> {
    let id = req.id.trim().to_string();
    let region = req.region.trim().to_string();
    let city = req.city.trim().to_string();
    let url = normalize_url(&req.url);

    if id.is_empty() || region.is_empty() || city.is_empty() || url.is_empty() {
        return Err(AppError::BadRequest(
            "id, region, city и url обязательны".into(),
        ));
    }
    validate_url(&url)?;

    let load = req.load.unwrap_or(0.0);
    validate_load(load)?;

    Ok(NewServer {
        id,
        region,
        city,
        url,
        status: req.status.unwrap_or(ServerStatus::Unknown),
        load,
    })
}

pub(crate) fn validate_patch(req: UpdateServerRequest) -> Result<ServerPatch, AppError> {
    let url = non_empty(req.url).map(|u| normalize_url(&u));
    if let Some(url) = &url {
        validate_url(url)?;
    }
    if let Some(load) = req.load {
        validate_load(load)?;
    }

    Ok(ServerPatch {
        region: non_empty(req.region),
        city: non_empty(req.city),
        url,
        status: req.status,
        load: req.load,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// URL узла: схема http(s) и непустой хост.
fn validate_url(url: &str) -> Result<(), AppError> {
    let parsed =
        url::Url::parse(url).map_err(|_| AppError::BadRequest("Некорректный URL".into()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        _ => {
            return Err(AppError::BadRequest(
                "url должен начинаться с http:// или https://".into(),
            ))
        }
    }

    match parsed.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(AppError::BadRequest("url не содержит хост".into())),
    }

    Ok(())
}

fn validate_load(load: f64) -> Result<(), AppError> {
    if !load.is_finite() || load < 0.0 {
        return Err(AppError::BadRequest(
            "load должен быть неотрицательным числом".into(),
        ));
    }
    Ok(())
}
