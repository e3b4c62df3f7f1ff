//! Публичные маршруты: ранжированный список и выбор узла.

use crate::api::AppState;
use crate::error::AppError;
use crate::services::selection_service;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use speedtest_entities::servers::Model;

#[derive(Debug, Default, Deserialize)]
pub struct RegionQuery {
    pub region: Option<String>,
}

impl RegionQuery {
    fn region(&self) -> Option<&str> {
        self.region
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/servers", get(list_active))
        .route("/servers/choose", get(choose))
}

/// GET /api/v1/servers — активные узлы в порядке ранжирования.
async fn list_active(
    State(state): State<AppState>,
    Query(query): Query<RegionQuery>,
) -> Result<Json<Vec<Model>>, AppError> {
    let servers = selection_service::list_active(state.store.as_ref(), query.region()).await?;
    Ok(Json(servers))
}

/// GET /api/v1/servers/choose — лучший узел, с предпочтением региона.
async fn choose(
    State(state): State<AppState>,
    Query(query): Query<RegionQuery>,
) -> Result<Json<Model>, AppError> {
    selection_service::choose(state.store.as_ref(), query.region())
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Нет доступных узлов".into()))
}
