//! HTTP API узла: маршрутизация и состояние.

pub mod probe_routes;

use crate::config::NodeConfig;
use axum::http::{header, HeaderValue, Method};
use axum::Router;
use bytes::Bytes;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Общее состояние узла.
#[derive(Clone)]
pub struct NodeState {
    pub config: Arc<NodeConfig>,
    /// Блок для скачивания; клонирование не копирует данные
    pub block: Bytes,
}

/// Построить маршрутизатор Axum.
pub fn build_router(state: NodeState) -> Router {
    let cors = cors(&state.config.cors_origin);

    Router::new()
        .merge(probe_routes::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors(origin: &str) -> CorsLayer {
    let allow_origin = match origin.trim() {
        "" | "*" => AllowOrigin::from(Any),
        exact => match HeaderValue::from_str(exact) {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                tracing::warn!("Некорректный CORS origin {exact:?}, разрешены все");
                AllowOrigin::from(Any)
            }
        },
    };

    // Браузеры из публичных сетей ходят к узлам в локальной сети
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_private_network(true)
}
