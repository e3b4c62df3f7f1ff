//! Узел измерений speedtest: задержка, скачивание и выгрузка.

pub mod api;
pub mod config;
pub mod services;

#[cfg(test)]
mod tests;

use api::NodeState;
use config::NodeConfig;
use services::download_service::{random_block, BLOCK_SIZE};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Запустить узел измерений.
pub async fn run(config: NodeConfig) -> anyhow::Result<()> {
    let block = random_block(BLOCK_SIZE)
        .map_err(|e| anyhow::anyhow!("Ошибка генерации блока данных: {e}"))?;

    let listen = config.listen.clone();
    info!(
        "Узел {} ({}), тест не дольше {} с",
        config.node_id, config.region, config.max_duration_sec
    );

    let state = NodeState {
        config: Arc::new(config),
        block,
    };
    let app = api::build_router(state);

    // Graceful shutdown
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Получен сигнал завершения, останавливаю узел...");
        let _ = shutdown_tx.send(true);
    });

    let addr: SocketAddr = listen.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Узел слушает {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while !*shutdown_rx.borrow_and_update() {
                if shutdown_rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await?;

    info!("Узел остановлен");
    Ok(())
}
