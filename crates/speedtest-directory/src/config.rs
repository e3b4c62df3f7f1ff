//! Конфигурация каталога узлов.

use std::time::Duration;

/// Интервал проверки узлов по умолчанию.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(60);

/// Максимум одновременных проверок за один проход.
pub const PROBE_CONCURRENCY: usize = 10;

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Адрес для прослушивания (например "0.0.0.0:9088")
    pub listen: String,

    /// URL подключения к БД (sqlite или postgres)
    pub db_url: String,

    /// Bearer-токен для изменяющих запросов
    pub admin_token: String,

    /// Разрешённый Origin для публичных маршрутов ("*" — любой)
    pub public_cors_origin: String,

    /// Разрешённый Origin для служебных и административных маршрутов
    pub admin_cors_origin: String,

    pub prober: ProberConfig,
}

/// Параметры фоновой проверки узлов.
#[derive(Debug, Clone)]
pub struct ProberConfig {
    /// Период между проходами
    pub interval: Duration,

    /// Сколько проверок может идти одновременно
    pub concurrency: usize,

    /// Общий таймаут одного запроса
    pub request_timeout: Duration,

    /// Таймаут установки соединения
    pub connect_timeout: Duration,

    /// Выполнить проход сразу при запуске
    pub probe_on_start: bool,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_PING_INTERVAL,
            concurrency: PROBE_CONCURRENCY,
            request_timeout: Duration::from_secs(3),
            connect_timeout: Duration::from_secs(2),
            probe_on_start: true,
        }
    }
}

/// Интервал проверки из числа секунд; ноль заменяется значением по умолчанию.
pub fn ping_interval_from_secs(secs: u64) -> Duration {
    if secs == 0 {
        DEFAULT_PING_INTERVAL
    } else {
        Duration::from_secs(secs)
    }
}

/// Сравнить предъявленный токен с административным за постоянное время.
pub fn verify_admin_token(provided: &str, expected: &str) -> bool {
    use subtle::ConstantTimeEq;

    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}
