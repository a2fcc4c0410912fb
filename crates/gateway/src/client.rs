use std::sync::Arc;

use async_trait::async_trait;
use domain::{GatewayIntentId, GatewayOutcome, GatewayTransactionToken, Money};

use crate::GatewayError;

/// What the gateway hands back when an intent is created.
#[derive(Debug, Clone)]
pub struct IntentHandle {
    /// Gateway-side identifier of the intent; stored on the order.
    pub intent_id: GatewayIntentId,

    /// Single-use credential for the paying client; returned to the
    /// caller, never persisted.
    pub transaction_token: GatewayTransactionToken,
}

/// Outbound contract to the payment gateway.
///
/// Implementations hold no shared mutable state visible to callers and
/// must be safe to invoke concurrently for different orders. The
/// gateway's `confirm` step is intentionally absent: it belongs to the
/// untrusted paying client, not to this core.
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Creates a payment intent for the given amount.
    async fn create_intent(
        &self,
        amount: Money,
        currency: &str,
    ) -> Result<IntentHandle, GatewayError>;

    /// Queries the gateway for the ground-truth outcome of an intent.
    async fn query_intent(
        &self,
        intent_id: &GatewayIntentId,
    ) -> Result<GatewayOutcome, GatewayError>;
}

#[async_trait]
impl<T: GatewayClient + ?Sized> GatewayClient for Arc<T> {
    async fn create_intent(
        &self,
        amount: Money,
        currency: &str,
    ) -> Result<IntentHandle, GatewayError> {
        (**self).create_intent(amount, currency).await
    }

    async fn query_intent(
        &self,
        intent_id: &GatewayIntentId,
    ) -> Result<GatewayOutcome, GatewayError> {
        (**self).query_intent(intent_id).await
    }
}
