//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of an order in its payment lifecycle.
///
/// Transitions:
/// ```text
/// Pending ──┬──► AwaitingConfirmation ──┬──► Paid
///           │             │             └──► Failed
///           ├─────────────┴──► Cancelled
///           └──► Failed
/// ```
///
/// `Paid`, `Failed` and `Cancelled` are terminal: no transition ever
/// leaves them. Applying an event to a terminal order is an idempotent
/// no-op, which is what duplicate finalize and sweep calls rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order persisted locally, no gateway intent yet.
    #[default]
    Pending,

    /// Gateway intent created, waiting for the gateway outcome.
    AwaitingConfirmation,

    /// Gateway confirmed the charge (terminal).
    Paid,

    /// Gateway declined, the gateway was unreachable at creation, or
    /// reconciliation retries were exhausted (terminal).
    Failed,

    /// Order was cancelled before reaching a payment outcome (terminal).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Paid | OrderStatus::Failed | OrderStatus::Cancelled
        )
    }

    /// Returns true if the order can still be cancelled.
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::AwaitingConfirmation
        )
    }

    /// Returns true if `self -> to` is a legal edge in the transition table.
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        matches!(
            (self, to),
            (OrderStatus::Pending, OrderStatus::AwaitingConfirmation)
                | (OrderStatus::Pending, OrderStatus::Failed)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::AwaitingConfirmation, OrderStatus::Paid)
                | (OrderStatus::AwaitingConfirmation, OrderStatus::Failed)
                | (OrderStatus::AwaitingConfirmation, OrderStatus::Cancelled)
        )
    }

    /// Returns the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::AwaitingConfirmation => "AwaitingConfirmation",
            OrderStatus::Paid => "Paid",
            OrderStatus::Failed => "Failed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Parses a status from its stored string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(OrderStatus::Pending),
            "AwaitingConfirmation" => Some(OrderStatus::AwaitingConfirmation),
            "Paid" => Some(OrderStatus::Paid),
            "Failed" => Some(OrderStatus::Failed),
            "Cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::AwaitingConfirmation.is_terminal());
        assert!(OrderStatus::Paid.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_can_cancel_from_non_terminal_only() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(OrderStatus::AwaitingConfirmation.can_cancel());
        assert!(!OrderStatus::Paid.can_cancel());
        assert!(!OrderStatus::Failed.can_cancel());
        assert!(!OrderStatus::Cancelled.can_cancel());
    }

    #[test]
    fn test_transition_table_edges() {
        use OrderStatus::*;

        assert!(Pending.can_transition_to(AwaitingConfirmation));
        assert!(Pending.can_transition_to(Failed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(AwaitingConfirmation.can_transition_to(Paid));
        assert!(AwaitingConfirmation.can_transition_to(Failed));
        assert!(AwaitingConfirmation.can_transition_to(Cancelled));

        // No shortcut from Pending straight to Paid.
        assert!(!Pending.can_transition_to(Paid));

        // Terminal statuses have no outgoing edges.
        for from in [Paid, Failed, Cancelled] {
            for to in [Pending, AwaitingConfirmation, Paid, Failed, Cancelled] {
                assert!(!from.can_transition_to(to));
            }
        }
    }

    #[test]
    fn test_parse_roundtrip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::AwaitingConfirmation,
            OrderStatus::Paid,
            OrderStatus::Failed,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("Shipped"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            OrderStatus::AwaitingConfirmation.to_string(),
            "AwaitingConfirmation"
        );
        assert_eq!(OrderStatus::Paid.to_string(), "Paid");
    }

    #[test]
    fn test_serialization() {
        let status = OrderStatus::AwaitingConfirmation;
        let json = serde_json::to_string(&status).unwrap();
        let deserialized: OrderStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(status, deserialized);
    }
}
