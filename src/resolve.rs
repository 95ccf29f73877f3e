//! Endpoint configuration resolution: which organization and which shared
//! secret apply to an inbound request.
//!
//! Resolution order: explicit caller-supplied organization id, then
//! provider-specific reverse lookup (e.g. a shop domain header mapped to a
//! registered connection), then the application-level path for providers
//! whose webhooks are declared app-wide rather than per connection. All of
//! this happens before any signature work.

use axum::http::HeaderMap;

use crate::connectors::Connector;
use crate::error::IngestError;
use crate::store::{EndpointStore, SecretStore};
use crate::types::WebhookEndpointConfig;

/// Outcome of resolution: the organization, the secret to verify with, and
/// the per-organization endpoint record when one applies. `endpoint` is
/// `None` exactly for application-level providers, where the per-org lookup
/// is bypassed by design.
#[derive(Debug, Clone)]
pub struct ResolvedEndpoint {
    pub org_id: String,
    pub secret: String,
    pub endpoint: Option<WebhookEndpointConfig>,
}

pub async fn resolve(
    connector: &dyn Connector,
    headers: &HeaderMap,
    org_query: Option<&str>,
    endpoints: &dyn EndpointStore,
    secrets: &dyn SecretStore,
) -> Result<ResolvedEndpoint, IngestError> {
    if connector.app_level() {
        let org_id = org_query.map(str::to_string).ok_or(IngestError::MissingOrg)?;
        let name = connector
            .app_secret_name()
            .expect("app-level connector must name its secret");
        let secret = secrets
            .get_secret(name)
            .await?
            .ok_or_else(|| IngestError::ConfigurationError(name.to_string()))?;
        return Ok(ResolvedEndpoint {
            org_id,
            secret,
            endpoint: None,
        });
    }

    let org_id = match org_query {
        Some(org) => org.to_string(),
        None => {
            let hint = connector.org_hint(headers).ok_or(IngestError::MissingOrg)?;
            endpoints
                .resolve_org(connector.name(), &hint)
                .await?
                .ok_or(IngestError::UnknownShop(hint))?
        }
    };

    let endpoint = endpoints
        .get_endpoint(&org_id, connector.name())
        .await?
        .ok_or(IngestError::EndpointNotFound)?;
    if !endpoint.active {
        return Err(IngestError::EndpointDisabled);
    }

    Ok(ResolvedEndpoint {
        org_id,
        secret: endpoint.secret.clone(),
        endpoint: Some(endpoint),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::{Hubspot, LemonSqueezy, Shopify};
    use crate::store::{MemoryEndpointStore, MemorySecretStore};

    fn endpoint_config(org: &str, provider: &str, active: bool) -> WebhookEndpointConfig {
        WebhookEndpointConfig {
            id: format!("ep_{org}"),
            org_id: org.into(),
            provider: provider.into(),
            secret: "per-org-secret".into(),
            active,
            subscribed: Vec::new(),
            receive_count: 0,
            error_count: 0,
            last_received_at: None,
        }
    }

    #[tokio::test]
    async fn explicit_org_takes_precedence() {
        let endpoints = MemoryEndpointStore::new();
        endpoints
            .insert(endpoint_config("org_1", "lemonsqueezy", true))
            .await;
        let secrets = MemorySecretStore::new();

        let resolved = resolve(
            &LemonSqueezy,
            &HeaderMap::new(),
            Some("org_1"),
            &endpoints,
            &secrets,
        )
        .await
        .unwrap();
        assert_eq!(resolved.org_id, "org_1");
        assert_eq!(resolved.secret, "per-org-secret");
        assert!(resolved.endpoint.is_some());
    }

    #[tokio::test]
    async fn shop_domain_reverse_lookup() {
        let endpoints = MemoryEndpointStore::new();
        endpoints
            .insert(endpoint_config("org_2", "shopify", true))
            .await;
        endpoints
            .register_identifier("shopify", "acme.myshopify.com", "org_2")
            .await;
        let secrets = MemorySecretStore::new();

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-shopify-shop-domain",
            "acme.myshopify.com".parse().unwrap(),
        );
        let resolved = resolve(&Shopify, &headers, None, &endpoints, &secrets)
            .await
            .unwrap();
        assert_eq!(resolved.org_id, "org_2");

        // Unregistered shop is its own rejection case.
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-shopify-shop-domain",
            "ghost.myshopify.com".parse().unwrap(),
        );
        let err = resolve(&Shopify, &headers, None, &endpoints, &secrets)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_SHOP");
    }

    #[tokio::test]
    async fn missing_org_without_hint() {
        let endpoints = MemoryEndpointStore::new();
        let secrets = MemorySecretStore::new();
        let err = resolve(&LemonSqueezy, &HeaderMap::new(), None, &endpoints, &secrets)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "MISSING_ORG");
    }

    #[tokio::test]
    async fn inactive_endpoint_is_disabled() {
        let endpoints = MemoryEndpointStore::new();
        endpoints
            .insert(endpoint_config("org_3", "lemonsqueezy", false))
            .await;
        let secrets = MemorySecretStore::new();
        let err = resolve(
            &LemonSqueezy,
            &HeaderMap::new(),
            Some("org_3"),
            &endpoints,
            &secrets,
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "ENDPOINT_DISABLED");
    }

    #[tokio::test]
    async fn app_level_bypasses_endpoint_lookup() {
        let endpoints = MemoryEndpointStore::new();
        let secrets = MemorySecretStore::new();
        secrets.set("hubspot.app_secret", "app-secret").await;

        let resolved = resolve(&Hubspot, &HeaderMap::new(), Some("org_4"), &endpoints, &secrets)
            .await
            .unwrap();
        assert_eq!(resolved.secret, "app-secret");
        assert!(resolved.endpoint.is_none());

        // Missing app secret is a configuration error, not endpoint-not-found.
        let empty = MemorySecretStore::new();
        let err = resolve(&Hubspot, &HeaderMap::new(), Some("org_4"), &endpoints, &empty)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CONFIGURATION_ERROR");
    }
}
