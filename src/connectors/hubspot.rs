//! HubSpot connector: dual-version signature (v3 composite preferred, legacy
//! v1 fallback), application-level secret, array-of-sub-events payloads.

use chrono::DateTime;
use serde_json::Value;

use super::{header_str, Connector, InboundRequest, ParseError};
use crate::types::RawEvent;
use crate::verify;

pub const SIGNATURE_V3_HEADER: &str = "x-hubspot-signature-v3";
pub const TIMESTAMP_HEADER: &str = "x-hubspot-request-timestamp";
pub const SIGNATURE_V1_HEADER: &str = "x-hubspot-signature";

/// Secret-store key for the application-level webhook secret.
pub const APP_SECRET_NAME: &str = "hubspot.app_secret";

pub struct Hubspot;

impl Connector for Hubspot {
    fn name(&self) -> &'static str {
        "hubspot"
    }

    fn app_level(&self) -> bool {
        true
    }

    fn app_secret_name(&self) -> Option<&'static str> {
        Some(APP_SECRET_NAME)
    }

    fn verify(&self, request: &InboundRequest<'_>, secret: &str, now: i64) -> bool {
        let v3 = header_str(request.headers, SIGNATURE_V3_HEADER);
        let timestamp = header_str(request.headers, TIMESTAMP_HEADER);

        // Prefer the v3 composite scheme whenever its headers are present.
        if let (Some(signature), Some(timestamp)) = (v3, timestamp) {
            return verify::verify_composite_v3(
                secret,
                request.method,
                request.uri,
                request.body,
                timestamp,
                signature,
                now,
            );
        }

        // Legacy fallback always signs with the real application secret.
        match header_str(request.headers, SIGNATURE_V1_HEADER) {
            Some(signature) => verify::verify_composite_legacy(secret, request.body, signature),
            None => false,
        }
    }

    // HubSpot batches sub-events into one request. The first sub-event's
    // identity and type become the record's own; the full array is retained
    // as the payload.
    fn parse(&self, request: &InboundRequest<'_>) -> Result<RawEvent, ParseError> {
        let payload: Value = serde_json::from_slice(request.body)
            .map_err(|e| ParseError(format!("invalid JSON body: {e}")))?;

        let events = payload
            .as_array()
            .ok_or_else(|| ParseError("expected an array of events".into()))?;
        let first = events
            .first()
            .ok_or_else(|| ParseError("empty event array".into()))?;

        let raw_type = first
            .get("subscriptionType")
            .and_then(Value::as_str)
            .ok_or_else(|| ParseError("missing subscriptionType".into()))?
            .to_string();

        let external_id = match first.get("eventId") {
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        };

        let occurred_at = first
            .get("occurredAt")
            .and_then(Value::as_i64)
            .and_then(DateTime::from_timestamp_millis);

        Ok(RawEvent {
            external_id,
            raw_type,
            payload,
            occurred_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    const NOW: i64 = 1_700_000_000;

    fn request<'a>(headers: &'a HeaderMap, body: &'a [u8]) -> InboundRequest<'a> {
        InboundRequest {
            method: "POST",
            uri: "/webhooks/hubspot",
            headers,
            body,
        }
    }

    #[test]
    fn first_sub_event_is_surfaced_full_array_retained() {
        let body = br#"[{"eventId":101,"subscriptionType":"contact.creation","occurredAt":1700000000000},{"eventId":102,"subscriptionType":"contact.propertyChange"}]"#;
        let headers = HeaderMap::new();
        let event = Hubspot.parse(&request(&headers, body)).unwrap();
        assert_eq!(event.external_id.as_deref(), Some("101"));
        assert_eq!(event.raw_type, "contact.creation");
        assert_eq!(event.payload.as_array().unwrap().len(), 2);
        assert!(event.occurred_at.is_some());
    }

    #[test]
    fn empty_array_and_non_array_fail_parsing() {
        let headers = HeaderMap::new();
        assert!(Hubspot.parse(&request(&headers, b"[]")).is_err());
        assert!(Hubspot.parse(&request(&headers, b"{}")).is_err());
    }

    #[test]
    fn v3_headers_take_precedence() {
        let body = b"[]";
        let ts_ms = NOW * 1000;
        let sig =
            crate::verify::test_support::sign_composite_v3("app_secret", "POST", "/webhooks/hubspot", body, ts_ms);
        let mut headers = HeaderMap::new();
        headers.insert(SIGNATURE_V3_HEADER, sig.parse().unwrap());
        headers.insert(TIMESTAMP_HEADER, ts_ms.to_string().parse().unwrap());
        assert!(Hubspot.verify(&request(&headers, body), "app_secret", NOW));
        assert!(!Hubspot.verify(&request(&headers, body), "other", NOW));
    }

    #[test]
    fn legacy_fallback_never_accepts_empty_secret() {
        let body = b"[]";
        let mut headers = HeaderMap::new();
        headers.insert(
            SIGNATURE_V1_HEADER,
            hex::encode([0u8; 32]).parse().unwrap(),
        );
        assert!(!Hubspot.verify(&request(&headers, body), "", NOW));
    }
}
