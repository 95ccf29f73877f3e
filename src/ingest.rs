//! The ingestion orchestrator: the request-scoped control flow that
//! sequences connector lookup, endpoint resolution, signature verification,
//! parsing, normalization, subscription filtering, idempotency, persistence,
//! and queue handoff.

use std::sync::Arc;

use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::connectors::{Connector as _, ConnectorRegistry, InboundRequest};
use crate::error::IngestError;
use crate::store::{CustomerStore, DispatchQueue, EndpointStore, EventStore, SecretStore};
use crate::types::{Ack, EventStatus, QueueMessage, WebhookEvent};

/// Shared pipeline state: the immutable connector registry plus the
/// collaborator seams. Built once at startup; requests borrow it through an
/// `Arc` and hold no state of their own.
pub struct Gateway {
    pub registry: ConnectorRegistry,
    pub secrets: Arc<dyn SecretStore>,
    pub endpoints: Arc<dyn EndpointStore>,
    pub events: Arc<dyn EventStore>,
    pub queue: Arc<dyn DispatchQueue>,
    pub customers: Arc<dyn CustomerStore>,
}

pub fn payload_hash(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

impl Gateway {
    /// Ingest one inbound webhook request end to end.
    ///
    /// Every rejection before and including signature verification surfaces
    /// as an error (the provider retries). Everything after a successful
    /// persist acknowledges 200 regardless of what fails, because the
    /// durable record — not the HTTP status — is the source of truth for
    /// recovery.
    pub async fn ingest(
        &self,
        provider: &str,
        org_query: Option<&str>,
        request: InboundRequest<'_>,
    ) -> Result<Ack, IngestError> {
        let connector = self
            .registry
            .get(provider)
            .ok_or_else(|| IngestError::UnknownConnector(provider.to_string()))?;
        if request.body.is_empty() {
            return Err(IngestError::EmptyBody);
        }

        let resolved = crate::resolve::resolve(
            connector.as_ref(),
            request.headers,
            org_query,
            self.endpoints.as_ref(),
            self.secrets.as_ref(),
        )
        .await?;

        let now = Utc::now().timestamp();
        if !connector.verify(&request, &resolved.secret, now) {
            // Security monitoring signal. Never log the secret.
            tracing::warn!(
                provider,
                org_id = %resolved.org_id,
                "webhook signature verification failed"
            );
            if let Some(endpoint) = &resolved.endpoint {
                // A counter failure must not change the rejection the
                // provider sees.
                if let Err(err) = self.endpoints.record_error(&endpoint.id).await {
                    tracing::warn!(
                        endpoint_id = %endpoint.id,
                        error = %err,
                        "failed to record endpoint error counter"
                    );
                }
            }
            return Err(IngestError::InvalidSignature);
        }

        let raw = connector
            .parse(&request)
            .map_err(|e| IngestError::InvalidPayload(e.to_string()))?;
        let unified = connector.unified_type(&raw.raw_type);

        // Subscription filter: an unsubscribed raw type is acknowledged and
        // dropped without a persisted row.
        if let Some(endpoint) = &resolved.endpoint {
            if !endpoint.subscribed.is_empty() && !endpoint.subscribed.contains(&raw.raw_type) {
                tracing::debug!(provider, raw_type = %raw.raw_type, "event not subscribed, skipping");
                return Ok(Ack::skipped(raw.external_id));
            }
        }

        // Idempotency: lookup-before-insert so the duplicate case also
        // drives the response shape. Providers without an external id fall
        // back to the payload content hash.
        let hash = payload_hash(request.body);
        let existing = match &raw.external_id {
            Some(external_id) => {
                self.events
                    .find_by_external_id(&resolved.org_id, provider, external_id)
                    .await?
            }
            None => {
                self.events
                    .find_by_payload_hash(&resolved.org_id, provider, &hash)
                    .await?
            }
        };
        if existing.is_some() {
            tracing::debug!(
                provider,
                external_id = raw.external_id.as_deref().unwrap_or("<content-hash>"),
                "duplicate delivery acknowledged"
            );
            return Ok(Ack::duplicate(raw.external_id));
        }

        let event = WebhookEvent {
            id: Uuid::new_v4().to_string(),
            org_id: resolved.org_id.clone(),
            endpoint_id: resolved.endpoint.as_ref().map(|ep| ep.id.clone()),
            provider: provider.to_string(),
            raw_type: raw.raw_type.clone(),
            unified_type: unified,
            external_id: raw.external_id.clone(),
            payload_hash: hash,
            payload: raw.payload,
            status: EventStatus::Pending,
            attempts: 0,
            error: None,
            received_at: Utc::now(),
            processed_at: None,
        };
        let event_id = event.id.clone();
        self.events.insert(event).await?;
        if let Some(endpoint) = &resolved.endpoint {
            // The event is already durable; a counter failure here must not
            // turn into a non-200 that makes the provider redeliver.
            if let Err(err) = self.endpoints.record_received(&endpoint.id).await {
                tracing::warn!(
                    endpoint_id = %endpoint.id,
                    error = %err,
                    "failed to record endpoint receive counter"
                );
            }
        }

        tracing::info!(
            provider,
            org_id = %resolved.org_id,
            raw_type = %raw.raw_type,
            unified = unified.map(|u| u.as_str()).unwrap_or("-"),
            event_id = %event_id,
            "webhook event persisted"
        );

        // Hand off a pointer only; the consumer reads the payload back from
        // the event store.
        let message = QueueMessage {
            org_id: resolved.org_id.clone(),
            provider: provider.to_string(),
            unified_type: unified,
            event_id: event_id.clone(),
        };
        if let Err(send_err) = self.queue.send(&message).await {
            tracing::warn!(
                event_id = %event_id,
                error = %send_err,
                "queue handoff failed, marking event queue_failed"
            );
            if let Err(update_err) = self
                .events
                .update_status(&event_id, EventStatus::QueueFailed, Some(send_err.to_string()))
                .await
            {
                // The one unrecoverable condition in the pipeline: the event
                // is persisted as pending but neither enqueued nor marked.
                tracing::error!(
                    event_id = %event_id,
                    send_error = %send_err,
                    update_error = %update_err,
                    "event persisted but undispatched and unmarked; operator intervention required"
                );
            }
            // The provider must not retry a request that was durably
            // received; the stored record drives recovery.
        }

        Ok(Ack::received(raw.external_id))
    }
}
