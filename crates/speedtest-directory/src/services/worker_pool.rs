//! Пул обработчиков фиксированной ёмкости.
//!
//! Задачи кладутся в общую очередь, её разбирают не более `capacity`
//! обработчиков. [`WorkerPool::run`] возвращается только после того, как
//! все задачи завершены.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    capacity: usize,
}

impl WorkerPool {
    /// Ёмкость меньше единицы заменяется единицей.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Обработать все `items`, держа в работе не больше `capacity` задач,
    /// и дождаться завершения всех. Порядок результатов не определён.
    ///
    /// Паника в задаче теряет только её результат; очередь разбирается дальше.
    pub async fn run<T, R, F, Fut>(&self, items: Vec<T>, handler: F) -> Vec<R>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        if items.is_empty() {
            return Vec::new();
        }

        let workers = self.capacity.min(items.len());
        let total = items.len();

        let (tx, rx) = mpsc::unbounded_channel();
        for item in items {
            // Получатель жив, пока не запущены обработчики
            let _ = tx.send(item);
        }
        drop(tx);

        let queue = Arc::new(Mutex::new(rx));
        let handler = Arc::new(handler);

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let queue = Arc::clone(&queue);
            let handler = Arc::clone(&handler);
            handles.push(tokio::spawn(async move {
                let mut done = Vec::new();
                loop {
                    let next = queue.lock().await.recv().await;
                    let Some(item) = next else {
                        break;
                    };
                    // Отдельная задача: паника не роняет обработчика
                    match tokio::spawn(handler(item)).await {
                        Ok(result) => done.push(result),
                        Err(e) => tracing::error!("Задача пула завершилась аварийно: {e}"),
                    }
                }
                done
            }));
        }

        let mut results = Vec::with_capacity(total);
        for handle in handles {
            match handle.await {
                Ok(done) => results.extend(done),
                Err(e) => tracing::error!("Обработчик пула остановлен: {e}"),
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_pool_processes_every_item() {
        let pool = WorkerPool::new(4);
        let mut results = pool.run((0..25).collect(), |n: u32| async move { n * 2 }).await;
        results.sort();
        assert_eq!(results, (0..25).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_pool_never_exceeds_capacity() {
        let pool = WorkerPool::new(3);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (f, p) = (Arc::clone(&in_flight), Arc::clone(&peak));
        let results = pool
            .run((0..20).collect::<Vec<u32>>(), move |_| {
                let in_flight = Arc::clone(&f);
                let peak = Arc::clone(&p);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                }
            })
            .await;

        assert_eq!(results.len(), 20);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_pool_empty_input() {
        let pool = WorkerPool::new(10);
        let results: Vec<()> = pool.run(Vec::<u8>::new(), |_| async {}).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_pool_survives_panicking_task() {
        let pool = WorkerPool::new(2);
        let results = pool
            .run((0..6).collect::<Vec<u32>>(), |n| async move {
                if n == 3 {
                    panic!("сбой задачи {n}");
                }
                n
            })
            .await;

        assert_eq!(results.len(), 5);
        assert!(!results.contains(&3));
    }

    #[test]
    fn test_zero_capacity_becomes_one() {
        assert_eq!(WorkerPool::new(0).capacity(), 1);
    }
}
