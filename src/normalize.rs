//! Static mapping from provider-native event types into the unified taxonomy.
//!
//! Pure and total-or-null: every lookup is deterministic and side-effect
//! free, and a miss is `None`, never an error. Unmapped events stay eligible
//! for generic content-based matching downstream and must not be dropped.

use crate::types::UnifiedEventType;

/// Resolve the unified event type for a provider's raw event type.
pub fn normalize(provider: &str, raw_type: &str) -> Option<UnifiedEventType> {
    use UnifiedEventType::*;

    match (provider, raw_type) {
        ("stripe", "customer.subscription.created") => Some(SubscriptionCreated),
        ("stripe", "customer.subscription.updated") => Some(SubscriptionUpdated),
        ("stripe", "customer.subscription.deleted") => Some(SubscriptionCancelled),
        ("stripe", "payment_intent.succeeded") => Some(PaymentCompleted),
        ("stripe", "payment_intent.payment_failed") => Some(PaymentFailed),
        ("stripe", "invoice.paid") => Some(PaymentCompleted),
        ("stripe", "invoice.payment_failed") => Some(PaymentFailed),
        ("stripe", "charge.refunded") => Some(RefundIssued),
        ("stripe", "customer.created") => Some(CustomerCreated),
        ("stripe", "customer.updated") => Some(CustomerUpdated),

        ("shopify", "orders/create") => Some(OrderPlaced),
        ("shopify", "orders/paid") => Some(PaymentCompleted),
        ("shopify", "orders/fulfilled") => Some(OrderFulfilled),
        ("shopify", "refunds/create") => Some(RefundIssued),
        ("shopify", "customers/create") => Some(CustomerCreated),
        ("shopify", "customers/update") => Some(CustomerUpdated),
        ("shopify", "customers/data_request") => Some(ComplianceDataRequest),
        ("shopify", "customers/redact") => Some(ComplianceCustomerRedact),
        ("shopify", "shop/redact") => Some(ComplianceShopRedact),

        ("hubspot", "deal.creation") => Some(OrderPlaced),
        ("hubspot", "deal.propertyChange") => Some(OrderFulfilled),
        ("hubspot", "contact.creation") => Some(CustomerCreated),
        ("hubspot", "contact.propertyChange") => Some(CustomerUpdated),
        ("hubspot", "contact.privacyDeletion") => Some(ComplianceCustomerRedact),

        ("lemonsqueezy", "subscription_created") => Some(SubscriptionCreated),
        ("lemonsqueezy", "subscription_updated") => Some(SubscriptionUpdated),
        ("lemonsqueezy", "subscription_cancelled") => Some(SubscriptionCancelled),
        ("lemonsqueezy", "order_created") => Some(OrderPlaced),
        ("lemonsqueezy", "order_refunded") => Some(RefundIssued),

        _ => None,
    }
}
