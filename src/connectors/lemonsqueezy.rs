//! Lemon Squeezy connector: hex HMAC over the raw body, event name embedded
//! in the payload's meta object. Supplies no external event id; dedup for
//! this provider falls back to the payload content hash.

use serde_json::Value;

use super::{header_str, Connector, InboundRequest, ParseError};
use crate::types::RawEvent;
use crate::verify;

pub const SIGNATURE_HEADER: &str = "x-signature";

pub struct LemonSqueezy;

impl Connector for LemonSqueezy {
    fn name(&self) -> &'static str {
        "lemonsqueezy"
    }

    fn verify(&self, request: &InboundRequest<'_>, secret: &str, _now: i64) -> bool {
        match header_str(request.headers, SIGNATURE_HEADER) {
            Some(signature) => verify::verify_hmac_hex(secret, request.body, signature),
            None => false,
        }
    }

    fn parse(&self, request: &InboundRequest<'_>) -> Result<RawEvent, ParseError> {
        let payload: Value = serde_json::from_slice(request.body)
            .map_err(|e| ParseError(format!("invalid JSON body: {e}")))?;

        let raw_type = payload
            .pointer("/meta/event_name")
            .and_then(Value::as_str)
            .ok_or_else(|| ParseError("missing meta.event_name".into()))?
            .to_string();

        Ok(RawEvent {
            external_id: None,
            raw_type,
            payload,
            occurred_at: None,
        })
    }
}
