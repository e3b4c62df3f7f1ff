//! Entity для таблицы servers.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Состояние узла по результатам последней проверки.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "UPPERCASE")]
pub enum ServerStatus {
    #[sea_orm(string_value = "UP")]
    #[serde(alias = "up")]
    Up,

    #[sea_orm(string_value = "DOWN")]
    #[serde(alias = "down")]
    Down,

    /// Узел ещё ни разу не проверялся
    #[sea_orm(string_value = "UNKNOWN")]
    #[serde(alias = "unknown")]
    Unknown,
}

impl ServerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerStatus::Up => "UP",
            ServerStatus::Down => "DOWN",
            ServerStatus::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "servers")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Идентификатор узла, задаётся при регистрации
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Регион (например "id-dps")
    pub region: String,

    /// Город для отображения
    pub city: String,

    /// Базовый URL сервера измерений узла
    #[sea_orm(unique)]
    pub url: String,

    pub status: ServerStatus,

    /// Подсказка о нагрузке, основной ключ ранжирования
    pub load: f64,

    /// Время последней проверки (успешной или нет)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_ping_at: Option<DateTimeUtc>,

    /// Задержка последней успешной проверки, мс
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_latency_ms: Option<f64>,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
