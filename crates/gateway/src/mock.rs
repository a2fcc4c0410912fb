//! In-memory gateway for tests and default wiring.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use domain::{
    GatewayIntentId, GatewayOutcome, GatewayPaymentId, GatewayResult, GatewayTransactionToken,
    Money,
};

use crate::client::{GatewayClient, IntentHandle};
use crate::error::GatewayError;

#[derive(Debug, Default)]
struct MockGatewayState {
    intents: HashMap<GatewayIntentId, GatewayResult>,
    next_id: u32,
    fail_on_create_intent: bool,
    fail_on_query: bool,
}

/// In-memory payment gateway.
///
/// New intents start out `Pending`; tests play the external confirmation
/// step through the `resolve_*` hooks, and failure injection simulates
/// an unreachable gateway.
#[derive(Debug, Clone, Default)]
pub struct MockGatewayClient {
    state: Arc<RwLock<MockGatewayState>>,
}

impl MockGatewayClient {
    /// Creates a new mock gateway with no intents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures `create_intent` to fail until reset.
    pub fn set_fail_on_create_intent(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create_intent = fail;
    }

    /// Configures `query_intent` to fail until reset.
    pub fn set_fail_on_query(&self, fail: bool) {
        self.state.write().unwrap().fail_on_query = fail;
    }

    /// Marks an intent as succeeded, as the paying client's external
    /// confirmation would. Returns the charge id the gateway assigned.
    pub fn resolve_succeeded(&self, intent_id: &GatewayIntentId) -> GatewayPaymentId {
        let mut state = self.state.write().unwrap();
        state.next_id += 1;
        let payment_id = GatewayPaymentId::new(format!("pay_{:04}", state.next_id));
        state.intents.insert(
            intent_id.clone(),
            GatewayResult::Succeeded {
                payment_id: payment_id.clone(),
            },
        );
        payment_id
    }

    /// Marks an intent as declined.
    pub fn resolve_declined(&self, intent_id: &GatewayIntentId, error_detail: impl Into<String>) {
        self.state.write().unwrap().intents.insert(
            intent_id.clone(),
            GatewayResult::Declined {
                error_detail: error_detail.into(),
            },
        );
    }

    /// Pins an intent to an arbitrary result.
    pub fn set_outcome(&self, intent_id: &GatewayIntentId, result: GatewayResult) {
        self.state
            .write()
            .unwrap()
            .intents
            .insert(intent_id.clone(), result);
    }

    /// Drops an intent entirely, so queries for it error out.
    pub fn forget_intent(&self, intent_id: &GatewayIntentId) {
        self.state.write().unwrap().intents.remove(intent_id);
    }

    /// Returns the number of intents the gateway knows about.
    pub fn intent_count(&self) -> usize {
        self.state.read().unwrap().intents.len()
    }
}

#[async_trait]
impl GatewayClient for MockGatewayClient {
    async fn create_intent(
        &self,
        _amount: Money,
        _currency: &str,
    ) -> Result<IntentHandle, GatewayError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create_intent {
            return Err(GatewayError::Unavailable(
                "mock gateway unreachable".to_string(),
            ));
        }

        state.next_id += 1;
        let intent_id = GatewayIntentId::new(format!("gi_{:04}", state.next_id));
        let transaction_token =
            GatewayTransactionToken::new(format!("tok_{:04}", state.next_id));
        state
            .intents
            .insert(intent_id.clone(), GatewayResult::Pending);

        Ok(IntentHandle {
            intent_id,
            transaction_token,
        })
    }

    async fn query_intent(
        &self,
        intent_id: &GatewayIntentId,
    ) -> Result<GatewayOutcome, GatewayError> {
        let state = self.state.read().unwrap();

        if state.fail_on_query {
            return Err(GatewayError::Unavailable(
                "mock gateway unreachable".to_string(),
            ));
        }

        let result = state
            .intents
            .get(intent_id)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownIntent(intent_id.to_string()))?;

        Ok(GatewayOutcome::new(intent_id.clone(), result))
    }
}
