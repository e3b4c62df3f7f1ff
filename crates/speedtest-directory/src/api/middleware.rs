//! Проверка bearer-токена администратора.

use crate::api::AppState;
use crate::config::verify_admin_token;
use crate::error::AppError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// Экстрактор: запрос предъявил верный административный токен.
pub struct AdminAccess;

impl FromRequestParts<AppState> for AdminAccess {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(parts)?;
        if !verify_admin_token(token.trim(), &state.admin_token) {
            return Err(AppError::Unauthorized("Неверный токен".into()));
        }
        Ok(AdminAccess)
    }
}

fn extract_bearer_token(parts: &Parts) -> Result<&str, AppError> {
    parts
        .headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Отсутствует заголовок Authorization".into()))?
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Ожидается Bearer токен".into()))
}
