//! Load sample data into the configured database, replacing what is there.
//!
//! Usage: `import-data [path]` (default `data/sample-data.json`).

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catalog_orders::config::Config;
use catalog_orders::seed::{self, SampleData};
use catalog_orders::store::PgStore;

const DEFAULT_PATH: &str = "data/sample-data.json";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let url = config.database_url.as_deref().context("DATABASE_URL must be set to import data")?;
    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_PATH.to_string());

    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let data: SampleData = serde_json::from_str(&raw).with_context(|| format!("parsing {path}"))?;

    let store = PgStore::connect(url, config.max_connections).await?;
    store.migrate().await?;

    let summary = seed::import(&store, data).await?;
    tracing::info!(%path, "imported {summary}");
    Ok(())
}
