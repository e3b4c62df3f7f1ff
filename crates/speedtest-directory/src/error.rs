//! Типы ошибок каталога узлов.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sea_orm::{DbErr, SqlErr};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Не авторизован: {0}")]
    Unauthorized(String),

    #[error("Не найдено: {0}")]
    NotFound(String),

    #[error("Конфликт: {0}")]
    Conflict(String),

    #[error("Внутренняя ошибка: {0}")]
    Internal(String),

    #[error("Неверный запрос: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            AppError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
            AppError::Internal(m) => {
                tracing::error!("Ошибка обработки запроса: {m}");
                (StatusCode::INTERNAL_SERVER_ERROR, m.clone())
            }
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
        };
        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(e: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(m)) = e.sql_err() {
            return AppError::Conflict(format!("Узел с таким id или url уже существует: {m}"));
        }
        match e {
            DbErr::RecordNotUpdated => AppError::NotFound("Узел не найден".into()),
            DbErr::RecordNotFound(m) => AppError::NotFound(m),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::BadRequest(e.body_text())
    }
}
