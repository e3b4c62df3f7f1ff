//! Точка входа узла измерений speedtest.

use clap::Parser;
use speedtest_node::config::{NodeConfig, MAX_DURATION_CEILING_SEC};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "speedtest-node",
    about = "Узел speedtest — замер задержки, скачивания и выгрузки"
)]
struct Cli {
    /// Адрес для прослушивания (host:port)
    #[arg(long, default_value = "0.0.0.0:8080", env = "ADDR")]
    listen: String,

    /// Идентификатор узла
    #[arg(long, default_value = "node-1", env = "NODE_ID")]
    node_id: String,

    /// Регион узла
    #[arg(long, default_value = "id-dps", env = "REGION")]
    region: String,

    /// Максимальная длительность одного теста, секунды
    #[arg(
        long,
        default_value_t = 30,
        env = "MAX_DURATION_SEC",
        value_parser = clap::value_parser!(u64).range(1..=MAX_DURATION_CEILING_SEC)
    )]
    max_duration_sec: u64,

    /// Рекомендуемое число параллельных потоков
    #[arg(long, default_value_t = 16, env = "MAX_STREAMS")]
    max_streams: u32,

    /// Разрешённый CORS Origin
    #[arg(long, default_value = "*", env = "CORS_ORIGIN")]
    cors_origin: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Инициализация логгера
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = NodeConfig {
        listen: cli.listen,
        node_id: cli.node_id,
        region: cli.region,
        max_streams: cli.max_streams,
        max_duration_sec: cli.max_duration_sec,
        cors_origin: cli.cors_origin,
    };

    speedtest_node::run(config).await
}
