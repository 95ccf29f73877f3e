//! Stripe connector: timestamped-HMAC signatures, event type embedded in the
//! JSON body.

use chrono::DateTime;
use serde_json::Value;

use super::{header_str, Connector, InboundRequest, ParseError};
use crate::types::RawEvent;
use crate::verify;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

pub struct Stripe;

impl Connector for Stripe {
    fn name(&self) -> &'static str {
        "stripe"
    }

    fn verify(&self, request: &InboundRequest<'_>, secret: &str, now: i64) -> bool {
        match header_str(request.headers, SIGNATURE_HEADER) {
            Some(header) => verify::verify_timestamped_hmac(secret, request.body, header, now),
            None => false,
        }
    }

    fn parse(&self, request: &InboundRequest<'_>) -> Result<RawEvent, ParseError> {
        let payload: Value = serde_json::from_slice(request.body)
            .map_err(|e| ParseError(format!("invalid JSON body: {e}")))?;

        let raw_type = payload
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ParseError("missing event type field".into()))?
            .to_string();

        let external_id = payload
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string);

        let occurred_at = payload
            .get("created")
            .and_then(Value::as_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0));

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

    fn request<'a>(headers: &'a HeaderMap, body: &'a [u8]) -> InboundRequest<'a> {
        InboundRequest {
            method: "POST",
            uri: "/webhooks/stripe",
            headers,
            body,
        }
    }

    #[test]
    fn parses_body_embedded_event() {
        let body = br#"{"id":"evt_123","type":"invoice.paid","created":1700000000,"data":{"object":{}}}"#;
        let headers = HeaderMap::new();
        let event = Stripe.parse(&request(&headers, body)).unwrap();
        assert_eq!(event.external_id.as_deref(), Some("evt_123"));
        assert_eq!(event.raw_type, "invoice.paid");
        assert!(event.occurred_at.is_some());
    }

    #[test]
    fn rejects_body_without_type() {
        let headers = HeaderMap::new();
        let err = Stripe.parse(&request(&headers, br#"{"id":"evt_1"}"#));
        assert!(err.is_err());
        assert!(Stripe.parse(&request(&headers, b"not json")).is_err());
    }

    #[test]
    fn verify_requires_signature_header() {
        let headers = HeaderMap::new();
        assert!(!Stripe.verify(&request(&headers, b"{}"), "whsec_x", 1_700_000_000));
    }

    #[test]
    fn verify_accepts_signed_request() {
        let now = 1_700_000_000;
        let body = br#"{"id":"evt_1","type":"charge.refunded"}"#;
        let header = crate::verify::test_support::sign_timestamped("whsec_x", body, now);
        let mut headers = HeaderMap::new();
        headers.insert(SIGNATURE_HEADER, header.parse().unwrap());
        assert!(Stripe.verify(&request(&headers, body), "whsec_x", now));
        assert!(!Stripe.verify(&request(&headers, body), "whsec_y", now));
    }
}
