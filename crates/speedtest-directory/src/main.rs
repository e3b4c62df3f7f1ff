//! Точка входа каталога узлов speedtest.

use clap::Parser;
use speedtest_directory::config::{ping_interval_from_secs, DirectoryConfig, ProberConfig};
use tracing_subscriber::EnvFilter;

const DEFAULT_ADMIN_TOKEN: &str = "changeme-admin-token";

#[derive(Parser)]
#[command(
    name = "speedtest-directory",
    about = "Каталог узлов speedtest — реестр, проверка доступности и ранжирование"
)]
struct Cli {
    /// Адрес для прослушивания (host:port)
    #[arg(long, default_value = "0.0.0.0:9088", env = "BIND_ADDR")]
    listen: String,

    /// URL базы данных
    #[arg(
        long,
        default_value = "sqlite:./data/dir.db?mode=rwc",
        env = "DATABASE_URL"
    )]
    db_url: String,

    /// Bearer-токен для регистрации, изменения и удаления узлов
    #[arg(long, env = "ADMIN_TOKEN")]
    admin_token: Option<String>,

    /// Разрешённый Origin для публичных маршрутов
    #[arg(long, default_value = "*", env = "PUBLIC_CORS_ORIGIN")]
    public_cors_origin: String,

    /// Разрешённый Origin для служебных маршрутов
    #[arg(long, default_value = "*", env = "ADMIN_CORS_ORIGIN")]
    admin_cors_origin: String,

    /// Интервал проверки узлов, секунды
    #[arg(long, default_value_t = 60, env = "PING_INTERVAL_SEC")]
    ping_interval_sec: u64,

    /// Не проверять узлы сразу при запуске
    #[arg(long)]
    no_initial_probe: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Инициализация логгера
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let admin_token = cli.admin_token.unwrap_or_else(|| {
        tracing::warn!("Токен администратора не задан, используется значение по умолчанию (небезопасно!)");
        DEFAULT_ADMIN_TOKEN.to_string()
    });

    // Каталог для sqlite-файла по умолчанию
    if cli.db_url.starts_with("sqlite:./data/") {
        std::fs::create_dir_all("data")?;
    }

    let config = DirectoryConfig {
        listen: cli.listen,
        db_url: cli.db_url,
        admin_token,
        public_cors_origin: cli.public_cors_origin,
        admin_cors_origin: cli.admin_cors_origin,
        prober: ProberConfig {
            interval: ping_interval_from_secs(cli.ping_interval_sec),
            probe_on_start: !cli.no_initial_probe,
            ..ProberConfig::default()
        },
    };

    speedtest_directory::run(config).await
}
