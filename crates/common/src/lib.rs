//! Shared identifier types used across the checkout service.

mod types;

pub use types::{OrderId, UserId};
