//! Реестр узлов: хранилище записей и его реализация поверх sea-orm.

use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait,
    ActiveValue::{Set, Unchanged},
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use speedtest_entities::servers::{ActiveModel, Column, Entity as ServerEntity, Model, ServerStatus};

/// Данные для регистрации узла (уже проверенные).
#[derive(Debug, Clone)]
pub struct NewServer {
    pub id: String,
    pub region: String,
    pub city: String,
    pub url: String,
    pub status: ServerStatus,
    pub load: f64,
}

/// Частичное обновление: меняются только заданные поля.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerPatch {
    pub region: Option<String>,
    pub city: Option<String>,
    pub url: Option<String>,
    pub status: Option<ServerStatus>,
    pub load: Option<f64>,
}

impl ServerPatch {
    pub fn is_empty(&self) -> bool {
        self.region.is_none()
            && self.city.is_none()
            && self.url.is_none()
            && self.status.is_none()
            && self.load.is_none()
    }
}

/// Результат одной проверки, записываемый в реестр.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeWrite {
    pub status: ServerStatus,
    /// `None` при неудачной проверке: старое значение затирается
    pub latency_ms: Option<f64>,
    /// Момент начала проверки (UTC)
    pub pinged_at: DateTime<Utc>,
}

/// Хранилище записей реестра.
///
/// Каждая операция изменяет не больше одной записи, поэтому параллельные
/// записи разных узлов не мешают друг другу.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Все записи, самые свежие первыми.
    async fn list_all(&self) -> Result<Vec<Model>, AppError>;

    async fn get(&self, id: &str) -> Result<Option<Model>, AppError>;

    async fn create(&self, server: NewServer) -> Result<Model, AppError>;

    /// Применить заданные поля патча и обновить `updated_at`.
    async fn update_fields(&self, id: &str, patch: ServerPatch) -> Result<Model, AppError>;

    /// Записать статус, задержку и время проверки одного узла.
    async fn record_probe(&self, id: &str, probe: ProbeWrite) -> Result<(), AppError>;

    async fn delete(&self, id: &str) -> Result<(), AppError>;

    async fn count_by_status(&self, status: ServerStatus) -> Result<u64, AppError>;

    /// Время самой поздней проверки среди всех узлов.
    async fn max_last_ping_at(&self) -> Result<Option<DateTime<Utc>>, AppError>;
}

/// Реестр в реляционной БД (sqlite или postgres).
#[derive(Clone)]
pub struct SqlRegistry {
    db: DatabaseConnection,
}

impl SqlRegistry {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RegistryStore for SqlRegistry {
    async fn list_all(&self) -> Result<Vec<Model>, AppError> {
        let servers = ServerEntity::find()
            .order_by_desc(Column::UpdatedAt)
            .all(&self.db)
            .await?;
        Ok(servers)
    }

    async fn get(&self, id: &str) -> Result<Option<Model>, AppError> {
        Ok(ServerEntity::find_by_id(id.to_string()).one(&self.db).await?)
    }

    async fn create(&self, server: NewServer) -> Result<Model, AppError> {
        let now = Utc::now();
        let model = ActiveModel {
            id: Set(server.id),
            region: Set(server.region),
            city: Set(server.city),
            url: Set(server.url),
            status: Set(server.status),
            load: Set(server.load),
            last_ping_at: Set(None),
            last_latency_ms: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Ok(model.insert(&self.db).await?)
    }

    async fn update_fields(&self, id: &str, patch: ServerPatch) -> Result<Model, AppError> {
        if patch.is_empty() {
            return self
                .get(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Узел не найден: {id}")));
        }

        let mut model = ActiveModel {
            id: Unchanged(id.to_string()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        if let Some(region) = patch.region {
            model.region = Set(region);
        }
        if let Some(city) = patch.city {
            model.city = Set(city);
        }
        if let Some(url) = patch.url {
            model.url = Set(url);
        }
        if let Some(status) = patch.status {
            model.status = Set(status);
        }
        if let Some(load) = patch.load {
            model.load = Set(load);
        }

        Ok(model.update(&self.db).await?)
    }

    async fn record_probe(&self, id: &str, probe: ProbeWrite) -> Result<(), AppError> {
        let model = ActiveModel {
            id: Unchanged(id.to_string()),
            status: Set(probe.status),
            last_latency_ms: Set(probe.latency_ms),
            last_ping_at: Set(Some(probe.pinged_at)),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        model.update(&self.db).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let result = ServerEntity::delete_by_id(id.to_string())
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Узел не найден: {id}")));
        }
        Ok(())
    }

    async fn count_by_status(&self, status: ServerStatus) -> Result<u64, AppError> {
        let count = ServerEntity::find()
            .filter(Column::Status.eq(status))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    async fn max_last_ping_at(&self) -> Result<Option<DateTime<Utc>>, AppError> {
        let latest = ServerEntity::find()
            .filter(Column::LastPingAt.is_not_null())
            .order_by_desc(Column::LastPingAt)
            .one(&self.db)
            .await?;
        Ok(latest.and_then(|s| s.last_ping_at))
    }
}
