use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use tenant_auth::auth::{InMemoryBlacklist, RedisBlacklist, TokenBlacklist, TokenCodec, TokenIssuer};
use tenant_auth::configuration::{get_configuration, BlacklistBackend, Settings};
use tenant_auth::startup::run;
use tenant_auth::telemetry::init_telemetry;
use tenant_auth::users::PgUserStore;

fn startup_error(kind: std::io::ErrorKind, message: &str) -> std::io::Error {
    std::io::Error::new(kind, message.to_string())
}

async fn build_blacklist(configuration: &Settings) -> std::io::Result<Arc<dyn TokenBlacklist>> {
    match configuration.blacklist.backend {
        BlacklistBackend::Redis => {
            let blacklist = RedisBlacklist::connect(&configuration.redis.url)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to connect to Redis: {}", e);
                    startup_error(std::io::ErrorKind::ConnectionRefused, "Blacklist connection error")
                })?;
            Ok(Arc::new(blacklist))
        }
        BlacklistBackend::Memory => {
            tracing::warn!("Using in-memory blacklist; revocations are not shared between instances");
            let blacklist = InMemoryBlacklist::new();
            blacklist.spawn_sweeper(Duration::from_secs(configuration.blacklist.sweep_interval.max(1)));
            Ok(Arc::new(blacklist))
        }
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = init_telemetry("info") {
        eprintln!("Failed to initialise telemetry: {}", e);
    }

    tracing::info!("Starting application");

    let configuration = get_configuration().map_err(|e| {
        tracing::error!("Failed to read configuration: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;
    tracing::info!("Configuration loaded successfully");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            startup_error(std::io::ErrorKind::ConnectionRefused, "Database connection error")
        })?;

    sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
        tracing::error!("Failed to run migrations: {}", e);
        startup_error(std::io::ErrorKind::Other, "Migration error")
    })?;
    tracing::info!("Database ready");

    let blacklist = build_blacklist(&configuration).await?;
    let issuer = TokenIssuer::new(
        Arc::new(PgUserStore::new(pool)),
        blacklist,
        TokenCodec::new(&configuration.jwt),
    );

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, issuer)?.await
}
