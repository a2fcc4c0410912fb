//! HTTP gateway client.
//!
//! Speaks a small JSON protocol against the gateway's intent endpoints.
//! The request timeout here is the I/O budget for a single gateway call
//! and is deliberately much shorter than the business-level
//! confirmation timeout the sweeper works with.

use std::time::Duration;

use async_trait::async_trait;
use domain::{
    GatewayIntentId, GatewayOutcome, GatewayPaymentId, GatewayResult, GatewayTransactionToken,
    Money,
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::client::{GatewayClient, IntentHandle};
use crate::error::GatewayError;

/// Gateway client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpGatewayClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct CreateIntentRequest<'a> {
    amount_cents: i64,
    currency: &'a str,
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    intent_id: String,
    transaction_token: Option<String>,
    status: String,
    payment_id: Option<String>,
    error_detail: Option<String>,
}

impl HttpGatewayClient {
    /// Builds an HTTP gateway client with a bounded per-request timeout.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        api_key: Option<String>,
    ) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl GatewayClient for HttpGatewayClient {
    async fn create_intent(
        &self,
        amount: Money,
        currency: &str,
    ) -> Result<IntentHandle, GatewayError> {
        let url = format!("{}/v1/intents", self.base_url);
        let response = self
            .request(self.http.post(&url))
            .json(&CreateIntentRequest {
                amount_cents: amount.cents(),
                currency,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::Unavailable(format!(
                "intent creation returned {}",
                response.status()
            )));
        }

        let body: IntentResponse = response.json().await?;
        let transaction_token = body.transaction_token.ok_or_else(|| {
            GatewayError::MalformedResponse(
                "intent creation response missing transaction_token".to_string(),
            )
        })?;

        tracing::debug!(intent_id = %body.intent_id, "gateway intent created");

        Ok(IntentHandle {
            intent_id: GatewayIntentId::new(body.intent_id),
            transaction_token: GatewayTransactionToken::new(transaction_token),
        })
    }

    async fn query_intent(
        &self,
        intent_id: &GatewayIntentId,
    ) -> Result<GatewayOutcome, GatewayError> {
        let url = format!("{}/v1/intents/{}", self.base_url, intent_id);
        let response = self.request(self.http.get(&url)).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GatewayError::UnknownIntent(intent_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(GatewayError::Unavailable(format!(
                "intent query returned {}",
                response.status()
            )));
        }

        let body: IntentResponse = response.json().await?;
        let result = outcome_from_response(&body)?;
        Ok(GatewayOutcome::new(GatewayIntentId::new(body.intent_id), result))
    }
}

/// Maps the gateway's wire status onto the outcome contract.
///
/// A success without a charge id is malformed rather than trusted, and
/// statuses this core does not recognize collapse to `Unknown` so the
/// sweeper decides, never a guess here.
fn outcome_from_response(body: &IntentResponse) -> Result<GatewayResult, GatewayError> {
    match body.status.as_str() {
        "succeeded" => {
            let payment_id = body.payment_id.as_deref().ok_or_else(|| {
                GatewayError::MalformedResponse(
                    "succeeded intent missing payment_id".to_string(),
                )
            })?;
            Ok(GatewayResult::Succeeded {
                payment_id: GatewayPaymentId::new(payment_id),
            })
        }
        "declined" => Ok(GatewayResult::Declined {
            error_detail: body.error_detail.clone().unwrap_or_default(),
        }),
        "pending" | "processing" => Ok(GatewayResult::Pending),
        _ => Ok(GatewayResult::Unknown),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: &str, payment_id: Option<&str>, error_detail: Option<&str>) -> IntentResponse {
        IntentResponse {
            intent_id: "gi_1".to_string(),
            transaction_token: None,
            status: status.to_string(),
            payment_id: payment_id.map(String::from),
            error_detail: error_detail.map(String::from),
        }
    }

    #[test]
    fn test_succeeded_maps_with_payment_id() {
        let result = outcome_from_response(&response("succeeded", Some("pay_1"), None)).unwrap();
        assert_eq!(
            result,
            GatewayResult::Succeeded {
                payment_id: GatewayPaymentId::new("pay_1")
            }
        );
    }

    #[test]
    fn test_succeeded_without_payment_id_is_malformed() {
        let err = outcome_from_response(&response("succeeded", None, None)).unwrap_err();
        assert!(matches!(err, GatewayError::MalformedResponse(_)));
    }

    #[test]
    fn test_declined_carries_detail() {
        let result =
            outcome_from_response(&response("declined", None, Some("card_declined"))).unwrap();
        assert_eq!(
            result,
            GatewayResult::Declined {
                error_detail: "card_declined".to_string()
            }
        );
    }

    #[test]
    fn test_pending_statuses() {
        for status in ["pending", "processing"] {
            let result = outcome_from_response(&response(status, None, None)).unwrap();
            assert_eq!(result, GatewayResult::Pending);
        }
    }

    #[test]
    fn test_unrecognized_status_collapses_to_unknown() {
        let result = outcome_from_response(&response("requires_action", None, None)).unwrap();
        assert_eq!(result, GatewayResult::Unknown);
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = HttpGatewayClient::new(
            "https://gateway.example.com/",
            Duration::from_secs(5),
            None,
        )
        .unwrap();
        assert_eq!(client.base_url, "https://gateway.example.com");
    }
}
