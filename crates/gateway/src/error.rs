use thiserror::Error;

/// Errors that can occur when talking to the payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway rejected or could not serve the request.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    /// Transport-level failure, including timeouts.
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway responded with something this core cannot interpret.
    #[error("malformed gateway response: {0}")]
    MalformedResponse(String),

    /// The gateway has no record of the intent.
    #[error("unknown gateway intent: {0}")]
    UnknownIntent(String),
}
