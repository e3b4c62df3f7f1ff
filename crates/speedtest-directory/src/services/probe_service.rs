//! Фоновая проверка узлов: замер задержки и запись статуса в реестр.
//!
//! Каждый проход берёт снимок реестра, опрашивает `/api/v1/latency` всех
//! узлов через пул ограниченной ёмкости и дожидается всех ответов до
//! следующего прохода. Проходы не перекрываются.

use crate::config::ProberConfig;
use crate::error::AppError;
use crate::services::registry_service::{ProbeWrite, RegistryStore};
use crate::services::worker_pool::WorkerPool;
use async_trait::async_trait;
use chrono::Utc;
use speedtest_entities::servers::ServerStatus;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Путь, который опрашивается на каждом узле.
pub const LATENCY_PATH: &str = "/api/v1/latency";

/// Результат одной проверки.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbeOutcome {
    /// Узел ответил 2xx за отведённое время
    Reachable { latency_ms: f64 },
    /// Ошибка соединения, таймаут или не-2xx
    Unreachable,
}

impl ProbeOutcome {
    /// Что записать в реестр по итогам проверки, начатой в `pinged_at`.
    pub fn to_write(self, pinged_at: chrono::DateTime<Utc>) -> ProbeWrite {
        match self {
            ProbeOutcome::Reachable { latency_ms } => ProbeWrite {
                status: ServerStatus::Up,
                latency_ms: Some(latency_ms),
                pinged_at,
            },
            ProbeOutcome::Unreachable => ProbeWrite {
                status: ServerStatus::Down,
                latency_ms: None,
                pinged_at,
            },
        }
    }
}

/// Замер задержки до узла по его базовому URL.
#[async_trait]
pub trait LatencyProbe: Send + Sync {
    async fn measure(&self, base_url: &str) -> ProbeOutcome;
}

/// HTTP-проверка: GET на latency-эндпоинт, время до получения заголовков.
#[derive(Clone)]
pub struct HttpLatencyProbe {
    client: reqwest::Client,
}

impl HttpLatencyProbe {
    pub fn new(request_timeout: Duration, connect_timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .user_agent(concat!("speedtest-directory/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal(format!("Ошибка создания HTTP-клиента: {e}")))?;
        Ok(Self { client })
    }

    pub fn from_config(config: &ProberConfig) -> Result<Self, AppError> {
        Self::new(config.request_timeout, config.connect_timeout)
    }
}

#[async_trait]
impl LatencyProbe for HttpLatencyProbe {
    async fn measure(&self, base_url: &str) -> ProbeOutcome {
        let url = latency_url(base_url);
        let start = Instant::now();

        match self
            .client
            .get(&url)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await
        {
            Ok(resp) if resp.status().is_success() => ProbeOutcome::Reachable {
                latency_ms: start.elapsed().as_secs_f64() * 1000.0,
            },
            Ok(resp) => {
                tracing::debug!(status = %resp.status(), %url, "Проверка: ответ не 2xx");
                ProbeOutcome::Unreachable
            }
            Err(e) => {
                tracing::debug!(error = %e, %url, "Проверка: узел недоступен");
                ProbeOutcome::Unreachable
            }
        }
    }
}

/// URL проверки с параметром против кэширования.
pub fn latency_url(base_url: &str) -> String {
    let nonce = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{}{LATENCY_PATH}?t={nonce}", base_url.trim_end_matches('/'))
}

/// Итог одного прохода.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub probed: usize,
    pub up: usize,
    pub down: usize,
    /// Проверки, результат которых не удалось записать
    pub write_failures: usize,
}

struct ProbeTarget {
    id: String,
    url: String,
}

struct ProbeReport {
    status: ServerStatus,
    written: bool,
}

/// Периодическая проверка всех узлов реестра.
pub struct HealthProber {
    store: Arc<dyn RegistryStore>,
    probe: Arc<dyn LatencyProbe>,
    pool: WorkerPool,
    config: ProberConfig,
}

impl HealthProber {
    pub fn new(
        store: Arc<dyn RegistryStore>,
        probe: Arc<dyn LatencyProbe>,
        config: ProberConfig,
    ) -> Self {
        Self {
            store,
            probe,
            pool: WorkerPool::new(config.concurrency),
            config,
        }
    }

    /// Один проход по снимку реестра. Возвращается, когда все проверки завершены.
    ///
    /// Ошибка возможна только при чтении списка; сбой записи одного узла
    /// учитывается в `write_failures` и на остальные не влияет.
    pub async fn tick(&self) -> Result<TickSummary, AppError> {
        let targets: Vec<ProbeTarget> = self
            .store
            .list_all()
            .await?
            .into_iter()
            .filter(|s| !s.id.is_empty() && !s.url.is_empty())
            .map(|s| ProbeTarget { id: s.id, url: s.url })
            .collect();

        let store = Arc::clone(&self.store);
        let probe = Arc::clone(&self.probe);
        let reports = self
            .pool
            .run(targets, move |target| {
                let store = Arc::clone(&store);
                let probe = Arc::clone(&probe);
                async move { probe_one(store.as_ref(), probe.as_ref(), target).await }
            })
            .await;

        let mut summary = TickSummary {
            probed: reports.len(),
            ..Default::default()
        };
        for report in reports {
            match report.status {
                ServerStatus::Up => summary.up += 1,
                _ => summary.down += 1,
            }
            if !report.written {
                summary.write_failures += 1;
            }
        }
        Ok(summary)
    }

    /// Бесконечный цикл проверок до сигнала завершения.
    ///
    /// Следующий проход начинается не раньше, чем закончится текущий;
    /// пропущенные срабатывания таймера не накапливаются.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Первое срабатывание interval мгновенное
        if !self.config.probe_on_start {
            ticker.tick().await;
        }

        tracing::info!(
            "Проверка узлов запущена (интервал {:?}, параллельно {})",
            self.config.interval,
            self.pool.capacity()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let started = Instant::now();
                    match self.tick().await {
                        Ok(summary) => tracing::info!(
                            probed = summary.probed,
                            up = summary.up,
                            down = summary.down,
                            write_failures = summary.write_failures,
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "Проход проверки завершён"
                        ),
                        Err(e) => tracing::error!("Ошибка чтения реестра для проверки: {e}"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Проверка узлов остановлена");
                        break;
                    }
                }
            }
        }
    }
}

async fn probe_one(
    store: &dyn RegistryStore,
    probe: &dyn LatencyProbe,
    target: ProbeTarget,
) -> ProbeReport {
    let pinged_at = Utc::now();
    let outcome = probe.measure(&target.url).await;
    let write = outcome.to_write(pinged_at);

    let written = match store.record_probe(&target.id, write).await {
        Ok(()) => true,
        Err(AppError::NotFound(_)) => {
            tracing::debug!("Узел {} удалён во время проверки", target.id);
            false
        }
        Err(e) => {
            tracing::warn!("Не удалось записать результат проверки {}: {e}", target.id);
            false
        }
    };

    ProbeReport {
        status: write.status,
        written,
    }
}
