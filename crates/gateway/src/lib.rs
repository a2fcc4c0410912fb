//! Outbound interface to the external payment gateway.
//!
//! The gateway is the source of truth for whether money moved. This
//! crate owns no durable state: it creates payment intents and queries
//! their outcomes. Gateway-side confirmation is driven by the paying
//! client with the transaction token and never passes through here.

mod client;
mod error;
mod http;
mod mock;

pub use client::{GatewayClient, IntentHandle};
pub use error::GatewayError;
pub use http::HttpGatewayClient;
pub use mock::MockGatewayClient;
