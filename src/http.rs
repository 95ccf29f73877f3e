//! HTTP surface: the axum router and request handlers.
//!
//! Handlers extract the body as raw `Bytes` so signature verification runs
//! over the exact bytes the provider signed, never a reparsed payload.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{OriginalUri, Path, Query, State};
use axum::http::{HeaderMap, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::compliance::ComplianceAction;
use crate::connectors::InboundRequest;
use crate::error::IngestError;
use crate::ingest::Gateway;
use crate::types::Ack;

#[derive(Debug, Deserialize, Default)]
pub struct WebhookQuery {
    pub org_id: Option<String>,
}

pub fn router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/webhooks/{provider}", post(handle_webhook))
        .route(
            "/webhooks/shopify/compliance/customers-data-request",
            post(handle_customers_data_request),
        )
        .route(
            "/webhooks/shopify/compliance/customers-redact",
            post(handle_customers_redact),
        )
        .route(
            "/webhooks/shopify/compliance/shop-redact",
            post(handle_shop_redact),
        )
        .with_state(gateway)
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn handle_webhook(
    Path(provider): Path<String>,
    Query(query): Query<WebhookQuery>,
    State(gateway): State<Arc<Gateway>>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Ack>, IngestError> {
    let request = InboundRequest {
        method: method.as_str(),
        uri: uri.path(),
        headers: &headers,
        body: &body,
    };
    let ack = gateway
        .ingest(&provider, query.org_id.as_deref(), request)
        .await?;
    Ok(Json(ack))
}

async fn handle_customers_data_request(
    State(gateway): State<Arc<Gateway>>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Ack>, IngestError> {
    compliance(gateway, ComplianceAction::DataRequest, method, uri, headers, body).await
}

async fn handle_customers_redact(
    State(gateway): State<Arc<Gateway>>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Ack>, IngestError> {
    compliance(gateway, ComplianceAction::CustomerRedact, method, uri, headers, body).await
}

async fn handle_shop_redact(
    State(gateway): State<Arc<Gateway>>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Ack>, IngestError> {
    compliance(gateway, ComplianceAction::ShopRedact, method, uri, headers, body).await
}

async fn compliance(
    gateway: Arc<Gateway>,
    action: ComplianceAction,
    method: Method,
    uri: axum::http::Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Ack>, IngestError> {
    let request = InboundRequest {
        method: method.as_str(),
        uri: uri.path(),
        headers: &headers,
        body: &body,
    };
    let ack = gateway.handle_compliance(action, request).await?;
    Ok(Json(ack))
}
