mod api;
mod config;
mod db;
mod dispatch;
mod error;
mod formatter;
mod models;
mod mqtt;
mod sms;

use config::AppConfig;
use db::store::PgAlertStore;
use mqtt::router::TopicRouter;
use sms::VonageSms;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config
    let config = AppConfig::load()?;

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(config.log_level.as_str())
        .init();

    info!("Starting Panic Button Alert Service...");

    // Init DB
    let pool = db::init_pool(&config.database_url).await?;
    info!("Connected to database");

    // Start the broker client; startup continues even if the broker is down.
    let router = TopicRouter::new(&config.mqtt_namespace);
    let mqtt = mqtt::start(&config, router).await?;

    let state = api::AppState {
        store: Arc::new(PgAlertStore::new(pool)),
        gateway: Arc::new(VonageSms::from_config(&config)),
        mqtt,
    };

    api::serve(&config.http_listen_addr, state).await
}
