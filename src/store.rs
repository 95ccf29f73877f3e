//! Collaborator seams: secret store, endpoint config store, event store,
//! dispatch queue, and the downstream customer tables touched by compliance
//! redaction.
//!
//! The pipeline only ever talks to these traits. The in-memory
//! implementations back the test suite and lightweight deployments; a real
//! deployment substitutes database-backed implementations without touching
//! the orchestrator.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::types::{EventStatus, WebhookEndpointConfig, WebhookEvent, QueueMessage};

/// Failure of a point-to-point store operation.
///
/// `NotConfigured` is an expected outcome (a specific 4xx/5xx for the
/// caller); `Unavailable` is a transient fault eligible for the
/// queue_failed/sweep recovery path.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failure to hand a message to the dispatch queue.
#[derive(Debug, Clone, thiserror::Error)]
#[error("queue send failed: {0}")]
pub struct QueueError(pub String);

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch a named secret. `Ok(None)` means the secret is absent, which is
    /// a configuration problem, not a transient fault.
    async fn get_secret(&self, name: &str) -> Result<Option<String>, StoreError>;
}

#[async_trait]
pub trait EndpointStore: Send + Sync {
    async fn get_endpoint(
        &self,
        org_id: &str,
        provider: &str,
    ) -> Result<Option<WebhookEndpointConfig>, StoreError>;

    /// Reverse lookup: map a provider-carried identifier (e.g. a shop
    /// domain header) to the organization that registered it.
    async fn resolve_org(
        &self,
        provider: &str,
        identifier: &str,
    ) -> Result<Option<String>, StoreError>;

    async fn record_received(&self, endpoint_id: &str) -> Result<(), StoreError>;

    async fn record_error(&self, endpoint_id: &str) -> Result<(), StoreError>;

    /// Deactivate every connection for the organization/provider pair.
    /// Used by full-tenant compliance redaction.
    async fn deactivate(&self, org_id: &str, provider: &str) -> Result<(), StoreError>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn find_by_external_id(
        &self,
        org_id: &str,
        provider: &str,
        external_id: &str,
    ) -> Result<Option<WebhookEvent>, StoreError>;

    /// Secondary dedup key for providers that supply no external id.
    async fn find_by_payload_hash(
        &self,
        org_id: &str,
        provider: &str,
        payload_hash: &str,
    ) -> Result<Option<WebhookEvent>, StoreError>;

    async fn insert(&self, event: WebhookEvent) -> Result<(), StoreError>;

    async fn update_status(
        &self,
        event_id: &str,
        status: EventStatus,
        error: Option<String>,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait DispatchQueue: Send + Sync {
    async fn send(&self, message: &QueueMessage) -> Result<(), QueueError>;
}

/// A customer row in the downstream tables compliance redaction acts on.
/// The webhook event log itself is never redacted; it is retained for audit.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerRecord {
    pub org_id: String,
    pub customer_id: String,
    pub email_hash: Option<String>,
    pub name: Option<String>,
    pub phone_hash: Option<String>,
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Null all personally-identifying fields for one customer across the
    /// organization's downstream tables. Returns the number of rows touched.
    /// Aggregate rows keyed by the customer id remain queryable.
    async fn redact_customer(&self, org_id: &str, customer_id: &str) -> Result<u64, StoreError>;

    /// Null personally-identifying fields for every customer of the
    /// organization (full-tenant redaction).
    async fn redact_org(&self, org_id: &str) -> Result<u64, StoreError>;
}

// ─── In-memory implementations ──────────────────────────────────────────────

#[derive(Default)]
pub struct MemorySecretStore {
    secrets: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, name: &str, value: &str) {
        self.secrets
            .lock()
            .await
            .insert(name.to_string(), value.to_string());
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get_secret(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.secrets.lock().await.get(name).cloned())
    }
}

#[derive(Default)]
pub struct MemoryEndpointStore {
    endpoints: Mutex<HashMap<(String, String), WebhookEndpointConfig>>,
    /// (provider, identifier) → org_id, e.g. shop domain registrations.
    identifiers: Mutex<HashMap<(String, String), String>>,
    /// When set, the counter updates fail. Exercises the requirement that
    /// counter outages never change the response the provider sees.
    fail_counters: Mutex<bool>,
}

impl MemoryEndpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, endpoint: WebhookEndpointConfig) {
        let key = (endpoint.org_id.clone(), endpoint.provider.clone());
        self.endpoints.lock().await.insert(key, endpoint);
    }

    pub async fn register_identifier(&self, provider: &str, identifier: &str, org_id: &str) {
        self.identifiers.lock().await.insert(
            (provider.to_string(), identifier.to_string()),
            org_id.to_string(),
        );
    }

    pub async fn get(&self, org_id: &str, provider: &str) -> Option<WebhookEndpointConfig> {
        self.endpoints
            .lock()
            .await
            .get(&(org_id.to_string(), provider.to_string()))
            .cloned()
    }

    pub async fn set_fail_counters(&self, fail: bool) {
        *self.fail_counters.lock().await = fail;
    }
}

#[async_trait]
impl EndpointStore for MemoryEndpointStore {
    async fn get_endpoint(
        &self,
        org_id: &str,
        provider: &str,
    ) -> Result<Option<WebhookEndpointConfig>, StoreError> {
        Ok(self
            .endpoints
            .lock()
            .await
            .get(&(org_id.to_string(), provider.to_string()))
            .cloned())
    }

    async fn resolve_org(
        &self,
        provider: &str,
        identifier: &str,
    ) -> Result<Option<String>, StoreError> {
        Ok(self
            .identifiers
            .lock()
            .await
            .get(&(provider.to_string(), identifier.to_string()))
            .cloned())
    }

    async fn record_received(&self, endpoint_id: &str) -> Result<(), StoreError> {
        if *self.fail_counters.lock().await {
            return Err(StoreError::Unavailable("counter update rejected".into()));
        }
        let mut endpoints = self.endpoints.lock().await;
        if let Some(ep) = endpoints.values_mut().find(|ep| ep.id == endpoint_id) {
            ep.receive_count += 1;
            ep.last_received_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn record_error(&self, endpoint_id: &str) -> Result<(), StoreError> {
        if *self.fail_counters.lock().await {
            return Err(StoreError::Unavailable("counter update rejected".into()));
        }
        let mut endpoints = self.endpoints.lock().await;
        if let Some(ep) = endpoints.values_mut().find(|ep| ep.id == endpoint_id) {
            ep.error_count += 1;
        }
        Ok(())
    }

    async fn deactivate(&self, org_id: &str, provider: &str) -> Result<(), StoreError> {
        let mut endpoints = self.endpoints.lock().await;
        if let Some(ep) = endpoints.get_mut(&(org_id.to_string(), provider.to_string())) {
            ep.active = false;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryEventStore {
    events: Mutex<Vec<WebhookEvent>>,
    /// When set, `update_status` fails. Exercises the one unrecoverable
    /// condition in the pipeline.
    fail_updates: Mutex<bool>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<WebhookEvent> {
        self.events.lock().await.clone()
    }

    pub async fn get(&self, event_id: &str) -> Option<WebhookEvent> {
        self.events
            .lock()
            .await
            .iter()
            .find(|e| e.id == event_id)
            .cloned()
    }

    pub async fn set_fail_updates(&self, fail: bool) {
        *self.fail_updates.lock().await = fail;
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn find_by_external_id(
        &self,
        org_id: &str,
        provider: &str,
        external_id: &str,
    ) -> Result<Option<WebhookEvent>, StoreError> {
        Ok(self
            .events
            .lock()
            .await
            .iter()
            .find(|e| {
                e.org_id == org_id
                    && e.provider == provider
                    && e.external_id.as_deref() == Some(external_id)
            })
            .cloned())
    }

    async fn find_by_payload_hash(
        &self,
        org_id: &str,
        provider: &str,
        payload_hash: &str,
    ) -> Result<Option<WebhookEvent>, StoreError> {
        Ok(self
            .events
            .lock()
            .await
            .iter()
            .find(|e| e.org_id == org_id && e.provider == provider && e.payload_hash == payload_hash)
            .cloned())
    }

    async fn insert(&self, event: WebhookEvent) -> Result<(), StoreError> {
        self.events.lock().await.push(event);
        Ok(())
    }

    async fn update_status(
        &self,
        event_id: &str,
        status: EventStatus,
        error: Option<String>,
    ) -> Result<(), StoreError> {
        if *self.fail_updates.lock().await {
            return Err(StoreError::Unavailable("status update rejected".into()));
        }
        let mut events = self.events.lock().await;
        if let Some(event) = events.iter_mut().find(|e| e.id == event_id) {
            event.status = status;
            event.error = error;
            if matches!(status, EventStatus::Completed | EventStatus::Failed) {
                event.processed_at = Some(Utc::now());
            }
        }
        Ok(())
    }
}

/// In-memory dispatch queue. `fail_sends` simulates a broker outage.
#[derive(Default)]
pub struct MemoryQueue {
    messages: Mutex<Vec<QueueMessage>>,
    fail_sends: Mutex<bool>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_sends(&self, fail: bool) {
        *self.fail_sends.lock().await = fail;
    }

    pub async fn drain(&self) -> Vec<QueueMessage> {
        std::mem::take(&mut *self.messages.lock().await)
    }

    pub async fn len(&self) -> usize {
        self.messages.lock().await.len()
    }
}

#[async_trait]
impl DispatchQueue for MemoryQueue {
    async fn send(&self, message: &QueueMessage) -> Result<(), QueueError> {
        if *self.fail_sends.lock().await {
            return Err(QueueError("broker unavailable".into()));
        }
        self.messages.lock().await.push(message.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCustomerStore {
    records: Mutex<Vec<CustomerRecord>>,
    fail_batches: Mutex<bool>,
}

impl MemoryCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: CustomerRecord) {
        self.records.lock().await.push(record);
    }

    pub async fn all(&self) -> Vec<CustomerRecord> {
        self.records.lock().await.clone()
    }

    pub async fn set_fail_batches(&self, fail: bool) {
        *self.fail_batches.lock().await = fail;
    }
}

#[async_trait]
impl CustomerStore for MemoryCustomerStore {
    async fn redact_customer(&self, org_id: &str, customer_id: &str) -> Result<u64, StoreError> {
        if *self.fail_batches.lock().await {
            return Err(StoreError::Unavailable("redaction batch rejected".into()));
        }
        let mut records = self.records.lock().await;
        let mut touched = 0;
        for record in records
            .iter_mut()
            .filter(|r| r.org_id == org_id && r.customer_id == customer_id)
        {
            record.email_hash = None;
            record.name = None;
            record.phone_hash = None;
            touched += 1;
        }
        Ok(touched)
    }

    async fn redact_org(&self, org_id: &str) -> Result<u64, StoreError> {
        if *self.fail_batches.lock().await {
            return Err(StoreError::Unavailable("redaction batch rejected".into()));
        }
        let mut records = self.records.lock().await;
        let mut touched = 0;
        for record in records.iter_mut().filter(|r| r.org_id == org_id) {
            record.email_hash = None;
            record.name = None;
            record.phone_hash = None;
            touched += 1;
        }
        Ok(touched)
    }
}
