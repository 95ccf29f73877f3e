//! Webhook ingestion gateway for revenue/CRM platforms.
//!
//! The pipeline proves each inbound notification's authenticity against the
//! provider's signature scheme, converts provider-specific event shapes into
//! a canonical vocabulary, records each external event at most once, and
//! hands a pointer to the dispatch queue — acknowledging the provider fast
//! enough to stay inside its retry window.
//!
//! ## Guarantees
//! - Verification over the exact raw body bytes, constant-time comparisons
//! - At most one stored record per (organization, provider, external id)
//! - No silent loss: a failed queue handoff leaves a durable `queue_failed`
//!   row for the sweep job instead of an error to the provider
//!
//! ## Non-guarantees
//! - Cross-event ordering
//! - Synchronous end-to-end processing; the pipeline's job ends at
//!   "durably recorded and handed off"

pub mod compliance;
pub mod config;
pub mod connectors;
pub mod error;
pub mod http;
pub mod ingest;
pub mod normalize;
pub mod resolve;
pub mod store;
pub mod types;
pub mod verify;

pub use compliance::ComplianceAction;
pub use config::Config;
pub use connectors::{Connector, ConnectorRegistry, InboundRequest};
pub use error::IngestError;
pub use http::router;
pub use ingest::Gateway;
pub use types::{
    Ack, EventStatus, QueueMessage, RawEvent, UnifiedEventType, WebhookEndpointConfig, WebhookEvent,
};
