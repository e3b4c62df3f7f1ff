//! Приём выгрузки: тело читается до конца или до принудительной отсечки.

use crate::config::MAX_DURATION_CEILING;
use axum::body::Body;
use futures_util::StreamExt;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Запас после заявленной длительности, прежде чем чтение прерывается.
pub const UPLOAD_GRACE: Duration = Duration::from_secs(1);

/// Итог выгрузки.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadReport {
    pub received_bytes: u64,
    pub duration_ms: u64,
    /// Чтение прервано отсечкой, а не концом тела
    pub forced: bool,
}

/// Отсечка по сроку: после `after` сигнал поднимается один раз.
struct Cutoff {
    rx: Option<watch::Receiver<bool>>,
    timer: Option<JoinHandle<()>>,
}

impl Cutoff {
    fn arm(after: Option<Duration>) -> Self {
        let Some(after) = after else {
            return Self {
                rx: None,
                timer: None,
            };
        };

        let (tx, rx) = watch::channel(false);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(true);
        });
        Self {
            rx: Some(rx),
            timer: Some(timer),
        }
    }

    /// Завершается, когда отсечка сработала. Без срока не завершается никогда.
    async fn fired(&mut self) {
        if let Some(rx) = self.rx.as_mut() {
            while !*rx.borrow_and_update() {
                if rx.changed().await.is_err() {
                    break;
                }
            }
            if *rx.borrow() {
                return;
            }
        }
        std::future::pending::<()>().await
    }
}

impl Drop for Cutoff {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Срок отсечки: заявленное время (не больше `max_duration` и
/// [`MAX_DURATION_CEILING`]) плюс запас.
pub fn cutoff_after(time_secs: Option<u64>, max_duration: Duration) -> Option<Duration> {
    let max_duration = max_duration.min(MAX_DURATION_CEILING);
    time_secs
        .filter(|t| *t > 0)
        .map(|t| Duration::from_secs(t).min(max_duration) + UPLOAD_GRACE)
}

/// Прочитать тело, считая байты.
///
/// При срабатывании отсечки входящий поток закрывается, а отчёт содержит
/// всё, что успело прийти. Ошибка транспорта тоже завершает чтение.
pub async fn consume_upload(body: Body, cutoff_in: Option<Duration>) -> UploadReport {
    let start = Instant::now();
    let mut cutoff = Cutoff::arm(cutoff_in);
    let mut stream = body.into_data_stream();

    let mut received: u64 = 0;
    let mut forced = false;

    loop {
        tokio::select! {
            biased;
            _ = cutoff.fired() => {
                forced = true;
                break;
            }
            chunk = stream.next() => match chunk {
                Some(Ok(data)) => received += data.len() as u64,
                Some(Err(e)) => {
                    tracing::debug!(error = %e, received, "Выгрузка прервана клиентом");
                    break;
                }
                None => break,
            },
        }
    }
    drop(stream);

    let report = UploadReport {
        received_bytes: received,
        duration_ms: start.elapsed().as_millis() as u64,
        forced,
    };
    if forced {
        tracing::debug!(
            received = report.received_bytes,
            duration_ms = report.duration_ms,
            "Выгрузка завершена отсечкой"
        );
    }
    report
}
