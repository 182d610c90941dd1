//! Catalog & order management service

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catalog_orders::api::{self, AppState};
use catalog_orders::config::Config;
use catalog_orders::domain::events::EventPublisher;
use catalog_orders::services::Services;
use catalog_orders::store::{InMemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.max_connections).await?;
            store.migrate().await?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store, data will not survive a restart");
            Arc::new(InMemoryStore::new())
        }
    };

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable; events will only be logged");
                None
            }
        },
        None => None,
    };

    let services = Services::new(store, EventPublisher::new(nats), &config);
    let app = api::router(AppState::new(services), config.request_timeout);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(mode = ?config.workflow_mode, "catalog-orders listening on {addr}");
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
