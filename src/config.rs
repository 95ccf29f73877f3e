//! Environment-driven configuration.

/// Gateway configuration loaded from environment variables.
///
/// Optional variables:
/// - `HOOKGATE_BIND_ADDR`: server bind address (default `0.0.0.0:8080`)
/// - `HOOKGATE_SHOPIFY_APP_SECRET`: application-level Shopify webhook secret
/// - `HOOKGATE_HUBSPOT_APP_SECRET`: application-level HubSpot webhook secret
///
/// Application-level secrets may also be provisioned directly in the secret
/// store; the environment values only seed it at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub shopify_app_secret: Option<String>,
    pub hubspot_app_secret: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr =
            std::env::var("HOOKGATE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let shopify_app_secret = std::env::var("HOOKGATE_SHOPIFY_APP_SECRET").ok();
        let hubspot_app_secret = std::env::var("HOOKGATE_HUBSPOT_APP_SECRET").ok();

        tracing::info!(
            bind_addr = %bind_addr,
            shopify_app_secret = shopify_app_secret.is_some(),
            hubspot_app_secret = hubspot_app_secret.is_some(),
            "configuration loaded"
        );

        Ok(Self {
            bind_addr,
            shopify_app_secret,
            hubspot_app_secret,
        })
    }
}
