//! Adapter boundary to the external payment network (§13 non-goals: the
//! engine never speaks to a concrete gateway directly, only through this
//! port — concrete card handling is the provider's concern, not ours).

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::errors::TransactionError;

#[derive(Debug, Clone)]
pub struct AuthorizeRequest {
    pub transaction_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub payment_method_id: String,
    pub idempotency_key: String,
}

#[derive(Debug, Clone)]
pub struct AuthorizeResponse {
    pub provider_reference: String,
    pub details: serde_json::Value,
}

/// The port a `TransactionManager` calls through; never the other way round.
/// Implementations must be safe to retry — the engine may call `authorize`
/// again for the same `idempotency_key` after a network timeout.
#[async_trait]
pub trait PaymentProviderPort: Send + Sync {
    async fn authorize(&self, request: &AuthorizeRequest) -> Result<AuthorizeResponse, TransactionError>;
}

/// In-memory provider used by tests and local development. Behavior is
/// driven entirely by `payment_method_id` so scenarios are deterministic:
/// anything starting with `fail-network` raises a retryable error, anything
/// starting with `fail-decline` raises a terminal decline, everything else
/// succeeds.
pub struct MockPaymentProvider;

#[async_trait]
impl PaymentProviderPort for MockPaymentProvider {
    async fn authorize(&self, request: &AuthorizeRequest) -> Result<AuthorizeResponse, TransactionError> {
        if request.payment_method_id.starts_with("fail-network") {
            return Err(TransactionError::new(
                "NETWORK_ERROR",
                "provider did not respond before the deadline",
                true,
                true,
            ));
        }

        if request.payment_method_id.starts_with("fail-decline") {
            return Err(TransactionError::new(
                "PROVIDER_DECLINED",
                "provider declined the transaction",
                false,
                false,
            ));
        }

        Ok(AuthorizeResponse {
            provider_reference: format!("mock-{}", request.transaction_id),
            details: serde_json::json!({ "provider": "mock" }),
        })
    }
}
