//! The checkout saga: order creation, gateway hand-off, and the
//! reconciliation machinery that brings local orders into agreement
//! with the gateway's outcome.
//!
//! Three components share one discipline: every order mutation is a
//! conditional status write on the store, so a client finalize, a
//! duplicate retry and a sweeper pass can race freely and the order
//! still reaches exactly one terminal state.

mod error;
mod intent;
mod reconciler;
mod sweeper;

pub use error::CheckoutError;
pub use intent::{CheckoutIntent, OrderIntentService};
pub use reconciler::PaymentReconciler;
pub use sweeper::{ReconciliationSweeper, SweepSummary, SweeperConfig};
