//! Provider connectors and the capability registry.
//!
//! Each connector bundles the provider's signature verification, payload
//! parsing, and event-type normalization behind a single trait. Parsing
//! takes the request headers explicitly so side-channel values (e.g. a topic
//! header) flow as arguments, never as instance state — connectors hold no
//! per-request state and are safely shared across concurrent requests.

pub mod hubspot;
pub mod lemonsqueezy;
pub mod shopify;
pub mod stripe;

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::HeaderMap;

use crate::types::{RawEvent, UnifiedEventType};

pub use hubspot::Hubspot;
pub use lemonsqueezy::LemonSqueezy;
pub use shopify::Shopify;
pub use stripe::Stripe;

/// Borrowed view of an inbound webhook request.
///
/// Carries the exact body bytes; signatures are always computed over these,
/// never over a reparsed payload.
#[derive(Clone, Copy)]
pub struct InboundRequest<'a> {
    pub method: &'a str,
    pub uri: &'a str,
    pub headers: &'a HeaderMap,
    pub body: &'a [u8],
}

/// Why a connector could not produce a [`RawEvent`] from a request.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ParseError(pub String);

pub trait Connector: Send + Sync {
    /// Canonical provider name used in the request path and the registry.
    fn name(&self) -> &'static str;

    /// Providers whose webhooks are declared at the application level use an
    /// application-wide secret and bypass the per-organization endpoint
    /// lookup entirely.
    fn app_level(&self) -> bool {
        false
    }

    /// Secret-store key for the application-level secret, when applicable.
    fn app_secret_name(&self) -> Option<&'static str> {
        None
    }

    /// Verify the request signature against the resolved secret. `now` is
    /// the current unix time in seconds, passed in for determinism.
    fn verify(&self, request: &InboundRequest<'_>, secret: &str, now: i64) -> bool;

    /// Turn the raw body (and any side-channel headers) into a neutral
    /// [`RawEvent`].
    fn parse(&self, request: &InboundRequest<'_>) -> Result<RawEvent, ParseError>;

    /// Provider-carried identifier usable for reverse organization lookup
    /// (e.g. a shop domain header). `None` when the provider has no such
    /// channel or the request lacks it.
    fn org_hint(&self, headers: &HeaderMap) -> Option<String> {
        let _ = headers;
        None
    }

    /// Unified event type for a provider-native raw type. Pure; a miss is
    /// `None`, never an error.
    fn unified_type(&self, raw_type: &str) -> Option<UnifiedEventType> {
        crate::normalize::normalize(self.name(), raw_type)
    }
}

/// Immutable provider lookup, built once at startup and read concurrently.
pub struct ConnectorRegistry {
    connectors: HashMap<&'static str, Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    /// Build the registry with the fixed provider set.
    pub fn new() -> Self {
        let mut connectors: HashMap<&'static str, Arc<dyn Connector>> = HashMap::new();
        for connector in [
            Arc::new(Stripe) as Arc<dyn Connector>,
            Arc::new(Shopify),
            Arc::new(Hubspot),
            Arc::new(LemonSqueezy),
        ] {
            connectors.insert(connector.name(), connector);
        }
        Self { connectors }
    }

    /// Look up a connector by provider name. An unknown name is a first-class
    /// rejection for the caller, not a default path.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Connector>> {
        self.connectors.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.connectors.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
