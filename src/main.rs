//! hookgate — webhook ingestion gateway.
//!
//! Binds the HTTP server that receives, verifies, normalizes, and dispatches
//! webhooks from the supported revenue/CRM platforms.

use std::sync::Arc;

use axum::http::Request;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use hookgate::compliance::SHOPIFY_APP_SECRET_NAME;
use hookgate::connectors::{hubspot, ConnectorRegistry};
use hookgate::store::{
    MemoryCustomerStore, MemoryEndpointStore, MemoryEventStore, MemoryQueue, MemorySecretStore,
};
use hookgate::{router, Config, Gateway};

/// Webhook ingestion gateway for revenue/CRM platforms.
#[derive(Parser, Debug)]
#[command(name = "hookgate")]
#[command(about = "Receives, verifies, and dispatches provider webhooks", long_about = None)]
struct Args {
    /// Path to .env file (optional).
    #[arg(long, env = "DOTENV_PATH", default_value = ".env")]
    dotenv: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if std::path::Path::new(&args.dotenv).exists() {
        dotenvy::from_path(&args.dotenv)?;
    }

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let secrets = Arc::new(MemorySecretStore::new());
    if let Some(secret) = &config.shopify_app_secret {
        secrets.set(SHOPIFY_APP_SECRET_NAME, secret).await;
    }
    if let Some(secret) = &config.hubspot_app_secret {
        secrets.set(hubspot::APP_SECRET_NAME, secret).await;
    }

    let gateway = Arc::new(Gateway {
        registry: ConnectorRegistry::new(),
        secrets,
        endpoints: Arc::new(MemoryEndpointStore::new()),
        events: Arc::new(MemoryEventStore::new()),
        queue: Arc::new(MemoryQueue::new()),
        customers: Arc::new(MemoryCustomerStore::new()),
    });

    let app = router(gateway).layer(TraceLayer::new_for_http().make_span_with(
        |request: &Request<_>| {
            tracing::span!(
                Level::INFO,
                "http_request",
                method = %request.method(),
                path = %request.uri().path(),
            )
        },
    ));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "starting webhook gateway");

    axum::serve(listener, app).await?;

    Ok(())
}
