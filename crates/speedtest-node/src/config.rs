//! Конфигурация узла измерений.

use std::time::Duration;

/// Верхний предел длительности теста, секунды.
pub const MAX_DURATION_CEILING_SEC: u64 = 86_400;

/// Верхний предел длительности теста.
pub const MAX_DURATION_CEILING: Duration = Duration::from_secs(MAX_DURATION_CEILING_SEC);

#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Адрес для прослушивания (например "0.0.0.0:8080")
    pub listen: String,

    /// Идентификатор узла, сообщается клиентам
    pub node_id: String,

    /// Регион узла
    pub region: String,

    /// Рекомендуемое число параллельных потоков для клиента
    pub max_streams: u32,

    /// Верхняя граница длительности одного теста, секунды
    pub max_duration_sec: u64,

    /// Разрешённый Origin ("*" — любой)
    pub cors_origin: String,
}

impl NodeConfig {
    /// Не больше [`MAX_DURATION_CEILING`].
    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_duration_sec).min(MAX_DURATION_CEILING)
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".to_string(),
            node_id: "node-1".to_string(),
            region: "id-dps".to_string(),
            max_streams: 16,
            max_duration_sec: 30,
            cors_origin: "*".to_string(),
        }
    }
}
