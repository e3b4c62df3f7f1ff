//! Поток скачивания: один и тот же случайный блок отдаётся, пока не
//! истечёт время или не будет отправлено нужное число байт.

use crate::config::MAX_DURATION_CEILING;
use bytes::Bytes;
use futures_util::stream::{self, Stream};
use std::convert::Infallible;
use std::time::{Duration, Instant};

/// Размер блока, 1 МиБ.
pub const BLOCK_SIZE: usize = 1 << 20;

/// Заполнить блок случайными байтами из ОС.
pub fn random_block(size: usize) -> Result<Bytes, getrandom::Error> {
    let mut buf = vec![0u8; size];
    getrandom::fill(&mut buf)?;
    Ok(Bytes::from(buf))
}

/// Условия остановки скачивания. Срабатывает первое из заданных.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadLimits {
    pub deadline: Option<Instant>,
    pub byte_target: Option<u64>,
}

impl DownloadLimits {
    /// Разобрать параметры запроса.
    ///
    /// Нули считаются отсутствием параметра. `time` ограничивается сверху
    /// `max_duration`; при одном `bytes` срок тоже равен `max_duration`.
    /// Сам `max_duration` не превышает [`MAX_DURATION_CEILING`].
    /// Без обоих параметров поток пуст.
    pub fn from_request(
        time_secs: Option<u64>,
        bytes: Option<u64>,
        max_duration: Duration,
        now: Instant,
    ) -> Self {
        let max_duration = max_duration.min(MAX_DURATION_CEILING);
        let time = time_secs
            .filter(|t| *t > 0)
            .map(|t| Duration::from_secs(t).min(max_duration));
        let byte_target = bytes.filter(|b| *b > 0);

        let deadline = match (time, byte_target) {
            (Some(time), _) => Some(now + time),
            (None, Some(_)) => Some(now + max_duration),
            (None, None) => None,
        };

        Self {
            deadline,
            byte_target,
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.deadline.is_none() && self.byte_target.is_none()
    }

    /// Пора ли остановиться, отправив `sent` байт, в момент `now`.
    pub fn should_stop(&self, sent: u64, now: Instant) -> bool {
        if self.is_unbounded() {
            return true;
        }
        if self.deadline.is_some_and(|d| now >= d) {
            return true;
        }
        self.byte_target.is_some_and(|target| sent >= target)
    }
}

/// Поток блоков для тела ответа.
///
/// Следующий блок запрашивается транспортом только после отправки
/// предыдущего, поэтому проверка лимитов идёт в темпе реальной передачи.
pub fn download_stream(
    block: Bytes,
    limits: DownloadLimits,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    stream::unfold(0u64, move |sent| {
        let block = block.clone();
        async move {
            if limits.should_stop(sent, Instant::now()) {
                tracing::debug!(sent, "Скачивание завершено");
                return None;
            }
            let next = sent + block.len() as u64;
            Some((Ok(block), next))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    const MAX: Duration = Duration::from_secs(30);

    #[test]
    fn test_limits_without_parameters_stop_immediately() {
        let now = Instant::now();
        let limits = DownloadLimits::from_request(None, None, MAX, now);
        assert!(limits.is_unbounded());
        assert!(limits.should_stop(0, now));

        let zeros = DownloadLimits::from_request(Some(0), Some(0), MAX, now);
        assert!(zeros.is_unbounded());
    }

    #[test]
    fn test_limits_time_is_clamped() {
        let now = Instant::now();
        let limits = DownloadLimits::from_request(Some(600), None, MAX, now);
        assert_eq!(limits.deadline, Some(now + MAX));
        assert_eq!(limits.byte_target, None);
    }

    #[test]
    fn test_limits_bytes_only_gets_max_duration_deadline() {
        let now = Instant::now();
        let limits = DownloadLimits::from_request(None, Some(1000), MAX, now);
        assert_eq!(limits.deadline, Some(now + MAX));
        assert_eq!(limits.byte_target, Some(1000));
    }

    #[test]
    fn test_either_limit_stops() {
        let now = Instant::now();
        let limits = DownloadLimits::from_request(Some(2), Some(5_000), MAX, now);

        assert!(!limits.should_stop(0, now));
        assert!(limits.should_stop(5_000, now));
        assert!(limits.should_stop(0, now + Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn test_stream_overshoots_by_less_than_one_block() {
        let block = Bytes::from(vec![7u8; 1000]);
        let limits = DownloadLimits::from_request(None, Some(2_500), MAX, Instant::now());

        let chunks: Vec<_> = download_stream(block, limits).collect().await;
        let total: usize = chunks
            .into_iter()
            .map(|c| c.map(|b| b.len()).unwrap_or_default())
            .sum();
        assert_eq!(total, 3_000);
    }

    #[tokio::test]
    async fn test_stream_without_limits_is_empty() {
        let block = Bytes::from(vec![7u8; 1000]);
        let limits = DownloadLimits::from_request(None, None, MAX, Instant::now());
        assert_eq!(download_stream(block, limits).count().await, 0);
    }

    #[test]
    fn test_limits_survive_huge_max_duration() {
        let now = Instant::now();
        let huge = Duration::from_secs(u64::MAX);

        let bytes_only = DownloadLimits::from_request(None, Some(1), huge, now);
        assert_eq!(bytes_only.deadline, Some(now + MAX_DURATION_CEILING));

        let timed = DownloadLimits::from_request(Some(u64::MAX), None, huge, now);
        assert_eq!(timed.deadline, Some(now + MAX_DURATION_CEILING));
    }

    #[test]
    fn test_random_block_size() {
        let block = random_block(4096).unwrap();
        assert_eq!(block.len(), 4096);
    }
}
