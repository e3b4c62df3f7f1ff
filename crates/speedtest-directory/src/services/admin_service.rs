//! Служебный сервис: сводка о состоянии реестра.

use crate::error::AppError;
use crate::services::registry_service::RegistryStore;
use chrono::{DateTime, Utc};
use speedtest_entities::servers::ServerStatus;

/// Сводка по результатам проверок.
pub struct HealthSummary {
    pub up: u64,
    pub down: u64,
    pub last_ping_at: Option<DateTime<Utc>>,
}

/// Получить число доступных и недоступных узлов и время последней проверки.
pub async fn health_summary(store: &dyn RegistryStore) -> Result<HealthSummary, AppError> {
    let up = store.count_by_status(ServerStatus::Up).await?;
    let down = store.count_by_status(ServerStatus::Down).await?;
    let last_ping_at = store.max_last_ping_at().await?;

    Ok(HealthSummary {
        up,
        down,
        last_ping_at,
    })
}
