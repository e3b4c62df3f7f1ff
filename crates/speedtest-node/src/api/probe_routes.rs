//! Маршруты измерений: конфигурация, задержка, скачивание, выгрузка.

use crate::api::NodeState;
use crate::services::download_service::{download_stream, DownloadLimits};
use crate::services::upload_service::{consume_upload, cutoff_after};
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::time::Instant;

const NO_STORE: &str = "no-store";
const DOWNLOAD_CACHE_CONTROL: &str = "no-store, no-cache, must-revalidate, proxy-revalidate";

// ── Типы запросов/ответов ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigResponse {
    pub node_id: String,
    pub region: String,
    pub max_streams: u32,
    pub max_duration_sec: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    /// Длительность, секунды
    pub time: Option<u64>,
    /// Сколько байт отправить
    pub bytes: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    /// Ожидаемая длительность выгрузки, секунды
    pub time: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub received_bytes: u64,
    pub duration_ms: u64,
}

pub fn routes() -> Router<NodeState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/v1/config", get(config))
        .route("/api/v1/latency", get(latency))
        .route("/api/v1/download", get(download))
        .route("/api/v1/upload", post(upload))
}

// ── Обработчики ──────────────────────────────────────────────────────────────

/// GET /healthz — узел жив.
async fn healthz() -> &'static str {
    "ok"
}

/// GET /api/v1/config — идентификатор и возможности узла.
async fn config(State(state): State<NodeState>) -> Json<ConfigResponse> {
    let config = &state.config;
    Json(ConfigResponse {
        node_id: config.node_id.clone(),
        region: config.region.clone(),
        max_streams: config.max_streams,
        max_duration_sec: config.max_duration_sec,
    })
}

/// GET /api/v1/latency — пустой ответ для замера времени приёма-передачи.
async fn latency() -> impl IntoResponse {
    (StatusCode::NO_CONTENT, [(header::CACHE_CONTROL, NO_STORE)])
}

/// GET /api/v1/download?time=&bytes= — поток случайных байт.
async fn download(
    State(state): State<NodeState>,
    Query(query): Query<DownloadQuery>,
) -> impl IntoResponse {
    let limits = DownloadLimits::from_request(
        query.time,
        query.bytes,
        state.config.max_duration(),
        Instant::now(),
    );
    tracing::debug!(time = ?query.time, bytes = ?query.bytes, "Скачивание начато");

    let body = Body::from_stream(download_stream(state.block.clone(), limits));
    (
        [
            (header::CONTENT_TYPE, "application/octet-stream"),
            (header::CACHE_CONTROL, DOWNLOAD_CACHE_CONTROL),
        ],
        body,
    )
}

/// POST /api/v1/upload?time= — принять тело и сообщить объём и длительность.
async fn upload(
    State(state): State<NodeState>,
    Query(query): Query<UploadQuery>,
    body: Body,
) -> impl IntoResponse {
    let report = consume_upload(body, cutoff_after(query.time, state.config.max_duration())).await;
    tracing::debug!(
        received = report.received_bytes,
        duration_ms = report.duration_ms,
        forced = report.forced,
        "Выгрузка принята"
    );

    (
        [(header::CACHE_CONTROL, NO_STORE)],
        Json(UploadResponse {
            received_bytes: report.received_bytes,
            duration_ms: report.duration_ms,
        }),
    )
}
