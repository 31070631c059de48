mod cli;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use deploy_config::Config;
use deploy_platform::{KubernetesPlatform, Platform};
use deploy_queue::{Queue, RabbitMqQueue};
use deploy_store::{PostgresStore, StateStore};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load process configuration")?;

    let store: Arc<dyn StateStore> = Arc::new(
        PostgresStore::connect(&config.database_url())
            .await
            .context("failed to connect to the store")?,
    );
    let queue: Arc<dyn Queue> =
        Arc::new(RabbitMqQueue::new(config.amqp_connection.clone(), config.amqp_queue_name.clone()));

    if cli.server {
        tracing::info!("running in server (ingress) mode");
        let app = deploy_api::build_app(store, queue);
        let listener = tokio::net::TcpListener::bind("0.0.0.0:8080")
            .await
            .context("failed to bind to 0.0.0.0:8080")?;
        axum::serve(listener, app).await.context("ingress server error")?;
    } else {
        tracing::info!("running in worker mode");
        let platform: Arc<dyn Platform> = Arc::new(KubernetesPlatform::new());
        deploy_worker::run(store, queue, platform).await.context("worker loop exited with an error")?;
    }

    Ok(())
}
