//! Background reconciliation sweep for orders stuck in
//! AwaitingConfirmation.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use common::OrderId;
use domain::{Order, OrderStatus};
use gateway::GatewayClient;
use order_store::{OrderStore, OrderStoreError, StatusTransition};

use crate::error::Result;
use crate::reconciler::PaymentReconciler;

/// Tuning knobs for the reconciliation sweep.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// How often the background loop runs.
    pub sweep_interval: Duration,
    /// How long an order may sit in AwaitingConfirmation before it is
    /// considered stuck.
    pub confirmation_timeout: Duration,
    /// How many sweeps may see an order unresolved before it is failed
    /// closed.
    pub max_attempts: u32,
    /// Upper bound on the number of orders examined per sweep.
    pub batch_limit: usize,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(30),
            confirmation_timeout: Duration::from_secs(15 * 60),
            max_attempts: 5,
            batch_limit: 100,
        }
    }
}

/// What happened during one sweep pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    pub examined: usize,
    pub resolved: usize,
    pub exhausted: usize,
    pub errors: usize,
}

/// Periodically queries the gateway for orders stuck in
/// AwaitingConfirmation and drives them to a terminal status.
///
/// Attempt counts are process-local; a restart grants a stuck order a
/// fresh retry budget, which only delays the fail-closed decision by at
/// most one full cycle of sweeps.
pub struct ReconciliationSweeper<S, G> {
    store: S,
    gateway: G,
    reconciler: PaymentReconciler<S, G>,
    config: SweeperConfig,
    attempts: Mutex<HashMap<OrderId, u32>>,
}

impl<S, G> ReconciliationSweeper<S, G>
where
    S: OrderStore + Clone,
    G: GatewayClient + Clone,
{
    /// Creates a new sweeper over the given store and gateway.
    pub fn new(store: S, gateway: G, config: SweeperConfig) -> Self {
        let reconciler = PaymentReconciler::new(store.clone(), gateway.clone());
        Self {
            store,
            gateway,
            reconciler,
            config,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Runs the sweep loop until the task is aborted.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.config.sweep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.config.sweep_interval.as_secs(),
            timeout_secs = self.config.confirmation_timeout.as_secs(),
            max_attempts = self.config.max_attempts,
            "reconciliation sweeper started"
        );

        loop {
            ticker.tick().await;
            match self.sweep_once().await {
                Ok(summary) if summary.examined > 0 => {
                    tracing::info!(
                        examined = summary.examined,
                        resolved = summary.resolved,
                        exhausted = summary.exhausted,
                        errors = summary.errors,
                        "sweep pass complete"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "sweep pass failed");
                }
            }
        }
    }

    /// Executes a single sweep pass.
    ///
    /// Each stuck order is handled independently; one order's gateway or
    /// store error never blocks the rest of the batch.
    #[tracing::instrument(skip(self))]
    pub async fn sweep_once(&self) -> Result<SweepSummary> {
        let Some(cutoff) = Utc::now().checked_sub_signed(
            chrono::Duration::from_std(self.config.confirmation_timeout)
                .unwrap_or_else(|_| chrono::Duration::zero()),
        ) else {
            return Ok(SweepSummary::default());
        };

        let stuck = self
            .store
            .find_awaiting_confirmation_before(cutoff, self.config.batch_limit)
            .await?;

        // Orders that left AwaitingConfirmation through some other path,
        // such as a client finalize, drop out of the scan; their attempt
        // entries must not accumulate for the life of the process.
        let in_batch: HashSet<OrderId> = stuck.iter().map(|o| o.id).collect();
        self.attempts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|order_id, _| in_batch.contains(order_id));

        let mut summary = SweepSummary {
            examined: stuck.len(),
            ..SweepSummary::default()
        };

        for order in stuck {
            let order_id = order.id;
            match self.reconcile_order(order).await {
                Ok(SweepOutcome::Resolved) => summary.resolved += 1,
                Ok(SweepOutcome::Exhausted) => summary.exhausted += 1,
                Ok(SweepOutcome::StillPending) => {}
                Err(e) => {
                    summary.errors += 1;
                    tracing::warn!(%order_id, error = %e, "sweep could not reconcile order");
                }
            }
        }

        metrics::counter!("sweep_orders_examined_total").increment(summary.examined as u64);
        metrics::counter!("sweep_orders_resolved_total").increment(summary.resolved as u64);
        Ok(summary)
    }

    async fn reconcile_order(&self, order: Order) -> Result<SweepOutcome> {
        let order_id = order.id;

        let Some(intent_id) = order.gateway_intent_id.clone() else {
            // AwaitingConfirmation without an intent is unreconcilable.
            tracing::error!(%order_id, "stuck order has no gateway intent, failing closed");
            self.force_fail(order_id).await?;
            return Ok(SweepOutcome::Exhausted);
        };

        let outcome = match self.gateway.query_intent(&intent_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(%order_id, error = %e, "gateway query failed during sweep");
                if self.bump_attempts(order_id) >= self.config.max_attempts {
                    self.force_fail(order_id).await?;
                    return Ok(SweepOutcome::Exhausted);
                }
                return Err(e.into());
            }
        };

        if outcome.result.is_settled() {
            self.reconciler.apply_gateway_outcome(order_id, outcome).await?;
            self.clear_attempts(order_id);
            return Ok(SweepOutcome::Resolved);
        }

        if self.bump_attempts(order_id) >= self.config.max_attempts {
            self.force_fail(order_id).await?;
            return Ok(SweepOutcome::Exhausted);
        }
        Ok(SweepOutcome::StillPending)
    }

    async fn force_fail(&self, order_id: OrderId) -> Result<()> {
        let transition = StatusTransition::failed_from(OrderStatus::AwaitingConfirmation);
        match self.store.transition(order_id, transition).await {
            Ok(_) => {
                metrics::counter!("reconciliation_exhausted_total").increment(1);
                tracing::error!(%order_id, "reconciliation attempts exhausted, order failed closed");
            }
            Err(OrderStoreError::StatusConflict { actual, .. }) => {
                // Another writer settled the order first.
                tracing::info!(%order_id, status = %actual, "order settled before fail-closed applied");
            }
            Err(e) => return Err(e.into()),
        }
        self.clear_attempts(order_id);
        Ok(())
    }

    fn bump_attempts(&self, order_id: OrderId) -> u32 {
        let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        let count = attempts.entry(order_id).or_insert(0);
        *count += 1;
        *count
    }

    fn clear_attempts(&self, order_id: OrderId) {
        let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        attempts.remove(&order_id);
    }
}

enum SweepOutcome {
    Resolved,
    Exhausted,
    StillPending,
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::UserId;
    use domain::{GatewayIntentId, Money, OrderItem};
    use gateway::MockGatewayClient;
    use order_store::InMemoryOrderStore;

    use crate::intent::OrderIntentService;

    fn immediate_config() -> SweeperConfig {
        SweeperConfig {
            confirmation_timeout: Duration::ZERO,
            max_attempts: 3,
            ..SweeperConfig::default()
        }
    }

    async fn awaiting_order(
        store: &InMemoryOrderStore,
        gateway: &MockGatewayClient,
    ) -> (OrderId, GatewayIntentId) {
        let service = OrderIntentService::new(store.clone(), gateway.clone(), "usd");
        let items = vec![OrderItem::new("101", 1, Money::from_cents(34999))];
        let intent = service.create_order(UserId::new(), items).await.unwrap();
        let intent_id = intent.order.gateway_intent_id.clone().unwrap();
        (intent.order.id, intent_id)
    }

    #[tokio::test]
    async fn test_sweep_heals_succeeded_order() {
        let store = InMemoryOrderStore::new();
        let gateway = MockGatewayClient::new();
        let (order_id, intent_id) = awaiting_order(&store, &gateway).await;
        let payment_id = gateway.resolve_succeeded(&intent_id);

        let sweeper =
            ReconciliationSweeper::new(store.clone(), gateway.clone(), immediate_config());
        let summary = sweeper.sweep_once().await.unwrap();

        assert_eq!(summary.examined, 1);
        assert_eq!(summary.resolved, 1);
        let order = store.get(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.gateway_payment_id, Some(payment_id));
    }

    #[tokio::test]
    async fn test_sweep_heals_declined_order() {
        let store = InMemoryOrderStore::new();
        let gateway = MockGatewayClient::new();
        let (order_id, intent_id) = awaiting_order(&store, &gateway).await;
        gateway.resolve_declined(&intent_id, "insufficient_funds");

        let sweeper =
            ReconciliationSweeper::new(store.clone(), gateway.clone(), immediate_config());
        let summary = sweeper.sweep_once().await.unwrap();

        assert_eq!(summary.resolved, 1);
        let order = store.get(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn test_pending_order_fails_closed_after_max_attempts() {
        let store = InMemoryOrderStore::new();
        let gateway = MockGatewayClient::new();
        let (order_id, _intent_id) = awaiting_order(&store, &gateway).await;
        // Gateway never settles the intent.

        let sweeper =
            ReconciliationSweeper::new(store.clone(), gateway.clone(), immediate_config());

        for _ in 0..2 {
            let summary = sweeper.sweep_once().await.unwrap();
            assert_eq!(summary.exhausted, 0);
        }
        let summary = sweeper.sweep_once().await.unwrap();
        assert_eq!(summary.exhausted, 1);

        let order = store.get(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Failed);

        // The now-terminal order drops out of later sweeps.
        let summary = sweeper.sweep_once().await.unwrap();
        assert_eq!(summary.examined, 0);
    }

    #[tokio::test]
    async fn test_gateway_errors_count_toward_attempts() {
        let store = InMemoryOrderStore::new();
        let gateway = MockGatewayClient::new();
        let (order_id, _intent_id) = awaiting_order(&store, &gateway).await;
        gateway.set_fail_on_query(true);

        let sweeper =
            ReconciliationSweeper::new(store.clone(), gateway.clone(), immediate_config());

        for _ in 0..2 {
            let summary = sweeper.sweep_once().await.unwrap();
            assert_eq!(summary.errors, 1);
            assert_eq!(summary.exhausted, 0);
        }
        let summary = sweeper.sweep_once().await.unwrap();
        assert_eq!(summary.exhausted, 1);

        let order = store.get(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn test_one_bad_order_does_not_block_the_batch() {
        let store = InMemoryOrderStore::new();
        let gateway = MockGatewayClient::new();
        let (_broken_id, broken_intent) = awaiting_order(&store, &gateway).await;
        let (healthy_id, healthy_intent) = awaiting_order(&store, &gateway).await;

        // The first order's intent vanishes from the gateway.
        gateway.forget_intent(&broken_intent);
        let payment_id = gateway.resolve_succeeded(&healthy_intent);

        let sweeper =
            ReconciliationSweeper::new(store.clone(), gateway.clone(), immediate_config());
        let summary = sweeper.sweep_once().await.unwrap();

        assert_eq!(summary.examined, 2);
        assert_eq!(summary.resolved, 1);
        assert_eq!(summary.errors, 1);

        let healthy = store.get(healthy_id).await.unwrap().unwrap();
        assert_eq!(healthy.status, OrderStatus::Paid);
        assert_eq!(healthy.gateway_payment_id, Some(payment_id));
    }

    #[tokio::test]
    async fn test_attempts_pruned_when_order_settles_outside_the_sweep() {
        let store = InMemoryOrderStore::new();
        let gateway = MockGatewayClient::new();
        let (order_id, intent_id) = awaiting_order(&store, &gateway).await;

        let sweeper =
            ReconciliationSweeper::new(store.clone(), gateway.clone(), immediate_config());

        // Two unresolved passes accrue attempts for the order.
        sweeper.sweep_once().await.unwrap();
        sweeper.sweep_once().await.unwrap();
        assert_eq!(sweeper.attempts.lock().unwrap().len(), 1);

        // A client finalize settles the order behind the sweeper's back.
        let payment_id = gateway.resolve_succeeded(&intent_id);
        store
            .transition(order_id, StatusTransition::paid(payment_id))
            .await
            .unwrap();

        // The next pass no longer sees the order and drops its entry.
        let summary = sweeper.sweep_once().await.unwrap();
        assert_eq!(summary.examined, 0);
        assert!(sweeper.attempts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_attempt_counter_resets_after_resolution() {
        let store = InMemoryOrderStore::new();
        let gateway = MockGatewayClient::new();
        let (order_id, intent_id) = awaiting_order(&store, &gateway).await;

        let sweeper =
            ReconciliationSweeper::new(store.clone(), gateway.clone(), immediate_config());

        // Two unresolved passes, then the gateway settles.
        sweeper.sweep_once().await.unwrap();
        sweeper.sweep_once().await.unwrap();
        gateway.resolve_succeeded(&intent_id);
        let summary = sweeper.sweep_once().await.unwrap();

        assert_eq!(summary.resolved, 1);
        let order = store.get(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Paid);
        assert!(sweeper.attempts.lock().unwrap().is_empty());
    }
}
