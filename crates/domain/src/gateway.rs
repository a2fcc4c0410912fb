//! Gateway-facing value types.
//!
//! These are fixed-shape, tagged representations of what the payment
//! gateway reports. They are validated at the boundary so malformed
//! payloads never reach the state machine.

use serde::{Deserialize, Serialize};

/// Gateway-side identifier of a payment intent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatewayIntentId(String);

impl GatewayIntentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GatewayIntentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for GatewayIntentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for GatewayIntentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Gateway-side identifier of a successful charge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatewayPaymentId(String);

impl GatewayPaymentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GatewayPaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for GatewayPaymentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for GatewayPaymentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque, single-use credential handed to the paying client so it can
/// drive gateway-side confirmation. Never persisted by this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatewayTransactionToken(String);

impl GatewayTransactionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for GatewayTransactionToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// What the gateway reports for a payment intent.
///
/// `Succeeded` always carries the charge id, `Declined` always carries
/// the decline detail; there is no way to express a success without a
/// payment id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum GatewayResult {
    /// Money moved; the charge id identifies the settlement.
    Succeeded { payment_id: GatewayPaymentId },

    /// The gateway refused the charge.
    Declined { error_detail: String },

    /// The gateway has the intent but has not settled it yet.
    Pending,

    /// The gateway could not say; resolved later by the sweeper.
    Unknown,
}

impl GatewayResult {
    /// Returns true if the gateway has reached a final answer.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            GatewayResult::Succeeded { .. } | GatewayResult::Declined { .. }
        )
    }
}

/// A gateway outcome for a specific intent. Transient; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOutcome {
    pub intent_id: GatewayIntentId,
    #[serde(flatten)]
    pub result: GatewayResult,
}

impl GatewayOutcome {
    pub fn new(intent_id: impl Into<GatewayIntentId>, result: GatewayResult) -> Self {
        Self {
            intent_id: intent_id.into(),
            result,
        }
    }
}
