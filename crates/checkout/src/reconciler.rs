//! Applies gateway outcomes onto orders under the state machine's
//! idempotency and compare-and-swap rules.

use common::OrderId;
use domain::{GatewayOutcome, GatewayResult, Order};
use gateway::GatewayClient;
use order_store::{OrderStore, OrderStoreError, StatusTransition};

use crate::error::{CheckoutError, Result};

/// Reconciles a local order with a gateway outcome.
///
/// Invoked from two directions: the client-driven finalize call and the
/// reconciliation sweep. Both funnel into the same conditional-write
/// path, so a duplicate or racing call observes the winner's result
/// instead of corrupting it.
pub struct PaymentReconciler<S, G> {
    store: S,
    gateway: G,
}

impl<S, G> PaymentReconciler<S, G>
where
    S: OrderStore,
    G: GatewayClient,
{
    /// Creates a new reconciler.
    pub fn new(store: S, gateway: G) -> Self {
        Self { store, gateway }
    }

    /// Finalizes an order from a client-supplied outcome.
    ///
    /// The claimed outcome must name the intent stored on the order, and
    /// a settled claim is never taken on faith: the gateway is queried
    /// for ground truth and the truth is what gets applied. A claim the
    /// gateway does not corroborate leaves the order untouched for the
    /// sweeper to resolve.
    #[tracing::instrument(skip(self, claimed), fields(intent_id = %claimed.intent_id))]
    pub async fn finalize(&self, order_id: OrderId, claimed: GatewayOutcome) -> Result<Order> {
        metrics::counter!("finalize_calls_total").increment(1);

        let order = self.load_matching(order_id, &claimed).await?;
        let order = match order {
            Reconcilable::Terminal(order) => return Ok(order),
            Reconcilable::Open(order) => order,
        };

        if !claimed.result.is_settled() {
            // Nothing to apply; the sweeper retries later.
            return Ok(order);
        }

        let truth = self.gateway.query_intent(&claimed.intent_id).await?;
        if truth.result != claimed.result {
            tracing::warn!(
                %order_id,
                "client-claimed outcome disagrees with gateway ground truth; applying the gateway's"
            );
        }

        self.apply(order, truth).await
    }

    /// Applies an outcome already obtained from the gateway, without a
    /// second verification query. This is the sweeper's entry point.
    #[tracing::instrument(skip(self, outcome), fields(intent_id = %outcome.intent_id))]
    pub async fn apply_gateway_outcome(
        &self,
        order_id: OrderId,
        outcome: GatewayOutcome,
    ) -> Result<Order> {
        let order = self.load_matching(order_id, &outcome).await?;
        match order {
            Reconcilable::Terminal(order) => Ok(order),
            Reconcilable::Open(order) => self.apply(order, outcome).await,
        }
    }

    async fn load_matching(
        &self,
        order_id: OrderId,
        outcome: &GatewayOutcome,
    ) -> Result<Reconcilable> {
        let order = self
            .store
            .get(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;

        // The mismatch check comes first so a wrong-order finalize is
        // rejected loudly even when the order is already terminal.
        if order.gateway_intent_id.as_ref() != Some(&outcome.intent_id) {
            tracing::warn!(
                %order_id,
                supplied = %outcome.intent_id,
                "finalize rejected: gateway intent mismatch"
            );
            metrics::counter!("finalize_intent_mismatch_total").increment(1);
            return Err(CheckoutError::IntentMismatch {
                order_id,
                supplied: outcome.intent_id.clone(),
            });
        }

        if order.is_terminal() {
            // Idempotent no-op for duplicate finalize and sweep calls.
            return Ok(Reconcilable::Terminal(order));
        }

        Ok(Reconcilable::Open(order))
    }

    async fn apply(&self, order: Order, outcome: GatewayOutcome) -> Result<Order> {
        let transition = match outcome.result {
            GatewayResult::Succeeded { payment_id } => StatusTransition::paid(payment_id),
            GatewayResult::Declined { error_detail } => {
                tracing::info!(order_id = %order.id, %error_detail, "gateway declined payment");
                StatusTransition::declined()
            }
            GatewayResult::Pending | GatewayResult::Unknown => {
                // Never infer a terminal state from ambiguity.
                return Ok(order);
            }
        };

        let order_id = order.id;
        match self.store.transition(order_id, transition).await {
            Ok(updated) => {
                metrics::counter!("finalize_transitions_total", "status" => updated.status.as_str())
                    .increment(1);
                tracing::info!(%order_id, status = %updated.status, "order reconciled");
                Ok(updated)
            }
            Err(OrderStoreError::StatusConflict { .. }) => {
                // Another writer won the race; surface its result.
                self.store
                    .get(order_id)
                    .await?
                    .ok_or(CheckoutError::OrderNotFound(order_id))
            }
            Err(e) => Err(e.into()),
        }
    }
}

enum Reconcilable {
    Terminal(Order),
    Open(Order),
}
