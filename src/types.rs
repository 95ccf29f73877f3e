use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical, provider-agnostic business event taxonomy.
///
/// The mapping from a provider's raw event type into this enum lives in
/// [`crate::normalize`]. Events with no mapping keep `None` as their unified
/// type and still flow through the pipeline for content-based matching
/// downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnifiedEventType {
    #[serde(rename = "subscription.created")]
    SubscriptionCreated,
    #[serde(rename = "subscription.updated")]
    SubscriptionUpdated,
    #[serde(rename = "subscription.cancelled")]
    SubscriptionCancelled,
    #[serde(rename = "payment.completed")]
    PaymentCompleted,
    #[serde(rename = "payment.failed")]
    PaymentFailed,
    #[serde(rename = "refund.issued")]
    RefundIssued,
    #[serde(rename = "order.placed")]
    OrderPlaced,
    #[serde(rename = "order.fulfilled")]
    OrderFulfilled,
    #[serde(rename = "customer.created")]
    CustomerCreated,
    #[serde(rename = "customer.updated")]
    CustomerUpdated,
    #[serde(rename = "compliance.data_request")]
    ComplianceDataRequest,
    #[serde(rename = "compliance.customer_redact")]
    ComplianceCustomerRedact,
    #[serde(rename = "compliance.shop_redact")]
    ComplianceShopRedact,
}

impl UnifiedEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubscriptionCreated => "subscription.created",
            Self::SubscriptionUpdated => "subscription.updated",
            Self::SubscriptionCancelled => "subscription.cancelled",
            Self::PaymentCompleted => "payment.completed",
            Self::PaymentFailed => "payment.failed",
            Self::RefundIssued => "refund.issued",
            Self::OrderPlaced => "order.placed",
            Self::OrderFulfilled => "order.fulfilled",
            Self::CustomerCreated => "customer.created",
            Self::CustomerUpdated => "customer.updated",
            Self::ComplianceDataRequest => "compliance.data_request",
            Self::ComplianceCustomerRedact => "compliance.customer_redact",
            Self::ComplianceShopRedact => "compliance.shop_redact",
        }
    }
}

/// Per-request, provider-neutral view of an inbound event.
///
/// Produced by a connector's parser and consumed within the same request;
/// folded into a [`WebhookEvent`] before anything is persisted.
#[derive(Debug, Clone)]
pub struct RawEvent {
    /// Provider-assigned event id. Not every provider supplies one.
    pub external_id: Option<String>,
    /// Provider-native event type string (e.g. `orders/fulfilled`).
    pub raw_type: String,
    /// Full raw payload, opaque to the pipeline.
    pub payload: Value,
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Lifecycle of a persisted webhook event.
///
/// `Pending` is set at persist time. The downstream consumer moves rows to
/// `Processing` and then to `Completed` or `Failed`. `QueueFailed` is entered
/// directly from `Pending` when the dispatch handoff throws; a sweep job
/// re-enqueues such rows and returns them to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    QueueFailed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::QueueFailed => "queue_failed",
        }
    }
}

/// Durable record of one ingestion attempt. Never deleted; retained for audit
/// even after compliance redaction of downstream tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    pub org_id: String,
    /// `None` for application-level flows (no per-organization endpoint).
    pub endpoint_id: Option<String>,
    pub provider: String,
    pub raw_type: String,
    pub unified_type: Option<UnifiedEventType>,
    /// Idempotency key component when present.
    pub external_id: Option<String>,
    /// SHA-256 hex of the raw request body, for tamper evidence and
    /// content-based dedup when no external id exists.
    pub payload_hash: String,
    pub payload: Value,
    pub status: EventStatus,
    pub attempts: u32,
    pub error: Option<String>,
    pub received_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Per-(organization, provider) webhook endpoint configuration.
///
/// Created administratively; read-only to the ingestion pipeline apart from
/// its counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEndpointConfig {
    pub id: String,
    pub org_id: String,
    pub provider: String,
    pub secret: String,
    pub active: bool,
    /// Raw event types this endpoint subscribes to. Empty means "all".
    pub subscribed: Vec<String>,
    pub receive_count: u64,
    pub error_count: u64,
    pub last_received_at: Option<DateTime<Utc>>,
}

/// Pointer message handed to the dispatch queue. Deliberately minimal: the
/// consumer reads the full event back from the event store by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub org_id: String,
    pub provider: String,
    pub unified_type: Option<UnifiedEventType>,
    pub event_id: String,
}

/// Acknowledgement envelope returned to the sending platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub received: bool,
    pub event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<bool>,
}

impl Ack {
    pub fn received(event_id: Option<String>) -> Self {
        Self {
            received: true,
            event_id,
            duplicate: None,
            skipped: None,
        }
    }

    pub fn duplicate(event_id: Option<String>) -> Self {
        Self {
            received: true,
            event_id,
            duplicate: Some(true),
            skipped: None,
        }
    }

    pub fn skipped(event_id: Option<String>) -> Self {
        Self {
            received: true,
            event_id,
            duplicate: None,
            skipped: Some(true),
        }
    }
}
