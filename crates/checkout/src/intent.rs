//! Order creation and gateway intent hand-off.

use common::UserId;
use domain::{GatewayTransactionToken, Order, OrderItem, OrderStatus, validate_items};
use gateway::GatewayClient;
use order_store::{NewOrder, OrderStore, StatusTransition};

use crate::error::{CheckoutError, Result};

/// What order creation hands back to the caller: the persisted order
/// and the single-use token the client needs to drive gateway-side
/// confirmation.
#[derive(Debug, Clone)]
pub struct CheckoutIntent {
    pub order: Order,
    pub transaction_token: GatewayTransactionToken,
}

/// Orchestrates order creation: validate, persist, request a gateway
/// intent, and move the order into AwaitingConfirmation.
pub struct OrderIntentService<S, G> {
    store: S,
    gateway: G,
    currency: String,
}

impl<S, G> OrderIntentService<S, G>
where
    S: OrderStore,
    G: GatewayClient,
{
    /// Creates a new intent service.
    pub fn new(store: S, gateway: G, currency: impl Into<String>) -> Self {
        Self {
            store,
            gateway,
            currency: currency.into(),
        }
    }

    /// Creates an order and its gateway intent.
    ///
    /// Exactly one create write plus, on gateway success, one status
    /// transition. If the gateway cannot be reached the freshly created
    /// order fails closed to `Failed` instead of lingering in Pending,
    /// and the gateway error surfaces as
    /// [`CheckoutError::GatewayUnavailable`].
    #[tracing::instrument(skip(self, items), fields(user_id = %user_id))]
    pub async fn create_order(
        &self,
        user_id: UserId,
        items: Vec<OrderItem>,
    ) -> Result<CheckoutIntent> {
        validate_items(&items)?;

        let order = self.store.create(NewOrder::new(user_id, items)?).await?;
        metrics::counter!("orders_created_total").increment(1);

        match self.gateway.create_intent(order.total, &self.currency).await {
            Ok(handle) => {
                let order = self
                    .store
                    .transition(
                        order.id,
                        StatusTransition::awaiting_confirmation(handle.intent_id),
                    )
                    .await?;

                tracing::info!(order_id = %order.id, total = %order.total, "order awaiting gateway confirmation");

                Ok(CheckoutIntent {
                    order,
                    transaction_token: handle.transaction_token,
                })
            }
            Err(gateway_err) => {
                tracing::warn!(
                    order_id = %order.id,
                    error = %gateway_err,
                    "gateway intent creation failed, failing order closed"
                );
                metrics::counter!("orders_failed_at_intent_total").increment(1);

                // The failure transition is best-effort: the caller gets
                // the gateway error either way.
                if let Err(store_err) = self
                    .store
                    .transition(order.id, StatusTransition::failed_from(OrderStatus::Pending))
                    .await
                {
                    tracing::error!(
                        order_id = %order.id,
                        error = %store_err,
                        "could not mark order Failed after gateway error"
                    );
                }

                Err(CheckoutError::GatewayUnavailable(gateway_err))
            }
        }
    }
}
