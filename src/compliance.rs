//! Compliance redaction handlers.
//!
//! Three fixed-shape Shopify endpoints (customer data request, customer
//! redaction, full-shop redaction) share the ingestion entry point's
//! verification but use the application-level secret and skip the generic
//! per-organization endpoint lookup, subscription filter, and queue handoff.
//! Each persists an audit row immediately and then runs its redaction batch
//! synchronously. Batch failures are recorded on the audit row and still
//! acknowledged 200 — the obligation is to have accepted and recorded the
//! request inside the provider's response window.

use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::connectors::{Connector, InboundRequest, Shopify};
use crate::error::IngestError;
use crate::ingest::{payload_hash, Gateway};
use crate::types::{Ack, EventStatus, WebhookEvent};

/// Secret-store key for Shopify's application-level webhook secret, used by
/// the compliance endpoints instead of any per-organization secret.
pub const SHOPIFY_APP_SECRET_NAME: &str = "shopify.app_secret";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplianceAction {
    DataRequest,
    CustomerRedact,
    ShopRedact,
}

impl ComplianceAction {
    pub fn raw_type(&self) -> &'static str {
        match self {
            Self::DataRequest => "customers/data_request",
            Self::CustomerRedact => "customers/redact",
            Self::ShopRedact => "shop/redact",
        }
    }
}

impl Gateway {
    pub async fn handle_compliance(
        &self,
        action: ComplianceAction,
        request: InboundRequest<'_>,
    ) -> Result<Ack, IngestError> {
        if request.body.is_empty() {
            return Err(IngestError::EmptyBody);
        }

        let secret = self
            .secrets
            .get_secret(SHOPIFY_APP_SECRET_NAME)
            .await?
            .ok_or_else(|| IngestError::ConfigurationError(SHOPIFY_APP_SECRET_NAME.to_string()))?;

        let now = Utc::now().timestamp();
        if !Shopify.verify(&request, &secret, now) {
            tracing::warn!(
                action = action.raw_type(),
                "compliance webhook signature verification failed"
            );
            return Err(IngestError::InvalidSignature);
        }

        let payload: Value = serde_json::from_slice(request.body)
            .map_err(|e| IngestError::InvalidPayload(format!("invalid JSON body: {e}")))?;

        let shop_domain = payload
            .get("shop_domain")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Shopify.org_hint(request.headers))
            .ok_or_else(|| IngestError::InvalidPayload("missing shop_domain".into()))?;

        // A shop we no longer track still gets its request recorded; the
        // audit row is scoped to the shop domain itself in that case.
        let resolved_org = self
            .endpoints
            .resolve_org("shopify", &shop_domain)
            .await?;
        let org_id = resolved_org
            .clone()
            .unwrap_or_else(|| shop_domain.clone());

        let raw_type = action.raw_type().to_string();
        let unified = Shopify.unified_type(&raw_type);
        let event = WebhookEvent {
            id: Uuid::new_v4().to_string(),
            org_id: org_id.clone(),
            // Application-level flow: no per-organization endpoint.
            endpoint_id: None,
            provider: "shopify".to_string(),
            raw_type: raw_type.clone(),
            unified_type: unified,
            external_id: None,
            payload_hash: payload_hash(request.body),
            payload: payload.clone(),
            status: EventStatus::Processing,
            attempts: 0,
            error: None,
            received_at: Utc::now(),
            processed_at: None,
        };
        let audit_id = event.id.clone();
        self.events.insert(event).await?;

        let outcome = match resolved_org {
            None => Err(format!("no connection registered for shop {shop_domain}")),
            Some(org) => self.run_redaction(action, &org, &payload).await,
        };

        match outcome {
            Ok(()) => {
                // The redaction itself succeeded; a failed audit update is
                // logged, not surfaced as a non-200.
                if let Err(update_err) = self
                    .events
                    .update_status(&audit_id, EventStatus::Completed, None)
                    .await
                {
                    tracing::warn!(
                        audit_id = %audit_id,
                        error = %update_err,
                        "failed to mark compliance audit row completed"
                    );
                }
                tracing::info!(
                    action = raw_type,
                    org_id = %org_id,
                    audit_id = %audit_id,
                    "compliance request completed"
                );
            }
            Err(reason) => {
                // Still acknowledged 200; remediation is tracked via the
                // audit row's status.
                tracing::error!(
                    action = raw_type,
                    org_id = %org_id,
                    audit_id = %audit_id,
                    error = %reason,
                    "compliance batch failed, acknowledged anyway"
                );
                if let Err(update_err) = self
                    .events
                    .update_status(&audit_id, EventStatus::Failed, Some(reason))
                    .await
                {
                    tracing::error!(
                        audit_id = %audit_id,
                        error = %update_err,
                        "failed to record compliance batch failure"
                    );
                }
            }
        }

        Ok(Ack::received(None))
    }

    async fn run_redaction(
        &self,
        action: ComplianceAction,
        org_id: &str,
        payload: &Value,
    ) -> Result<(), String> {
        match action {
            // The export itself is produced out-of-band; accepting and
            // recording the request is this pipeline's whole obligation.
            ComplianceAction::DataRequest => Ok(()),
            ComplianceAction::CustomerRedact => {
                let customer_id = customer_id(payload)
                    .ok_or_else(|| "missing customer id in redaction payload".to_string())?;
                let touched = self
                    .customers
                    .redact_customer(org_id, &customer_id)
                    .await
                    .map_err(|e| e.to_string())?;
                tracing::info!(org_id, customer_id = %customer_id, touched, "customer PII redacted");
                Ok(())
            }
            ComplianceAction::ShopRedact => {
                let touched = self
                    .customers
                    .redact_org(org_id)
                    .await
                    .map_err(|e| e.to_string())?;
                self.endpoints
                    .deactivate(org_id, "shopify")
                    .await
                    .map_err(|e| e.to_string())?;
                tracing::info!(org_id, touched, "full-tenant redaction completed");
                Ok(())
            }
        }
    }
}

fn customer_id(payload: &Value) -> Option<String> {
    match payload.pointer("/customer/id") {
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}
