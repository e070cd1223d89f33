use std::net::SocketAddr;
use std::sync::Arc;

use aeroflow_api::state::{AppState, AuthConfig};
use aeroflow_api::worker::{spawn_notification_worker, Notifier, TracingNotifier};
use aeroflow_api::app;
use aeroflow_core::repository::AirportStore;
use aeroflow_store::app_config::Config;
use aeroflow_store::{MemoryStore, PgStore, RedisClient};
use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "aeroflow_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting AeroFlow API on port {}", config.server.port);

    let store: Arc<dyn AirportStore> = match &config.database.url {
        Some(url) => {
            let db = PgStore::connect(url, config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            Arc::new(db)
        }
        None => {
            tracing::warn!("No database.url configured, using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let redis = match &config.redis.url {
        Some(url) => Some(Arc::new(RedisClient::new(url).context("Invalid Redis URL")?)),
        None => {
            tracing::info!("No redis.url configured, rate limiting disabled");
            None
        }
    };

    let auth = AuthConfig {
        secret: config.auth.jwt_secret.clone(),
        expiration: config.auth.jwt_expiration_seconds,
    };
    let (app_state, notifications) = AppState::new(store, &config.business_rules, auth, redis);

    spawn_notification_worker(notifications, notifier(&config)?);

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}

#[cfg(feature = "kafka")]
fn notifier(config: &Config) -> anyhow::Result<Arc<dyn Notifier>> {
    match &config.kafka.brokers {
        Some(brokers) => {
            let producer = aeroflow_store::NotificationProducer::new(brokers)
                .context("Failed to create Kafka producer")?;
            Ok(Arc::new(aeroflow_api::worker::KafkaNotifier::new(producer)))
        }
        None => Ok(Arc::new(TracingNotifier)),
    }
}

#[cfg(not(feature = "kafka"))]
fn notifier(_config: &Config) -> anyhow::Result<Arc<dyn Notifier>> {
    Ok(Arc::new(TracingNotifier))
}
