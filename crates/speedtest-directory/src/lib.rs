//! Каталог узлов speedtest: реестр, фоновая проверка и выбор лучшего узла.

pub mod api;
pub mod config;
pub mod error;
pub mod services;


use api::AppState;
use config::DirectoryConfig;
use sea_orm::{Database, DatabaseConnection};
use services::probe_service::{HealthProber, HttpLatencyProbe};
use services::registry_service::{RegistryStore, SqlRegistry};
use speedtest_migration::{Migrator, MigratorTrait};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Запустить каталог узлов.
pub async fn run(config: DirectoryConfig) -> anyhow::Result<()> {
    // 1. Подключение к БД
    info!("Подключение к базе данных: {}", config.db_url);
    let db: DatabaseConnection = Database::connect(&config.db_url).await?;

    // 2. Автоматические миграции
    info!("Выполнение миграций...");
    Migrator::up(&db, None).await?;

    let store: Arc<dyn RegistryStore> = Arc::new(SqlRegistry::new(db));

    // 3. Состояние приложения
    let state = AppState {
        store: Arc::clone(&store),
        admin_token: config.admin_token.clone(),
    };

    // 4. Маршрутизатор
    let app = api::build_router(state, &config.public_cors_origin, &config.admin_cors_origin);

    // 5. Graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Получен сигнал завершения, останавливаю сервер...");
        let _ = shutdown_tx.send(true);
    });

    // 6. Фоновая проверка узлов
    let probe = Arc::new(HttpLatencyProbe::from_config(&config.prober)?);
    let prober = HealthProber::new(store, probe, config.prober.clone());
    let prober_rx = shutdown_rx.clone();
    let prober_task = tokio::spawn(async move {
        prober.run(prober_rx).await;
    });

    // 7. Запуск сервера
    serve(&config.listen, app, shutdown_rx).await?;

    prober_task.await.ok();
    info!("Каталог узлов остановлен");
    Ok(())
}

/// HTTP-сервер до сигнала завершения.
async fn serve(
    listen: &str,
    app: axum::Router,
    mut shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let addr: SocketAddr = listen.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Каталог узлов слушает {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while !*shutdown_rx.borrow_and_update() {
                if shutdown_rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await?;
    Ok(())
}
