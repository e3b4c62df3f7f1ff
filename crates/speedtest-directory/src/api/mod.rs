//! HTTP API: маршрутизация и состояние приложения.

pub mod admin_routes;
pub mod middleware;
pub mod server_routes;

use crate::services::registry_service::RegistryStore;
use axum::http::{HeaderValue, Method};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Общее состояние приложения.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RegistryStore>,
    pub admin_token: String,
}

/// Построить маршрутизатор Axum.
pub fn build_router(state: AppState, public_origin: &str, admin_origin: &str) -> Router {
    let public_routes = server_routes::routes().layer(cors(public_origin));
    let admin_routes = admin_routes::routes().layer(cors(admin_origin));

    Router::new()
        .nest("/api/v1", public_routes.merge(admin_routes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS для группы маршрутов: "*" — любой Origin, иначе только указанный.
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

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
}
