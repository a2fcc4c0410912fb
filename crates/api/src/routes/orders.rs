//! Order creation, lookup and finalize endpoints.

use axum::Json;
use axum::extract::{Path, State};
use common::{OrderId, UserId};
use domain::{GatewayOutcome, GatewayResult, Money, Order, OrderItem};
use gateway::GatewayClient;
use order_store::OrderStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use checkout::{OrderIntentService, PaymentReconciler};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S, G> {
    pub intent_service: OrderIntentService<S, G>,
    pub reconciler: PaymentReconciler<S, G>,
    pub store: S,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    /// Owning user. Required: orders are never minted for an anonymous
    /// or fabricated owner. Kept optional in the wire shape so absence
    /// maps to the same 400 as other validation failures.
    pub user_id: Option<String>,
    pub items: Vec<OrderItemRequest>,
}

#[derive(Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

/// Body of PUT /orders/{id}/finalize: the intent the client confirmed
/// and the outcome it claims the gateway reported.
#[derive(Deserialize)]
pub struct FinalizeRequest {
    pub gateway_intent_id: String,
    pub outcome: OutcomePayload,
}

#[derive(Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum OutcomePayload {
    Succeeded { payment_id: String },
    Declined { error_detail: String },
    Pending,
    Unknown,
}

impl From<OutcomePayload> for GatewayResult {
    fn from(payload: OutcomePayload) -> Self {
        match payload {
            OutcomePayload::Succeeded { payment_id } => GatewayResult::Succeeded {
                payment_id: payment_id.into(),
            },
            OutcomePayload::Declined { error_detail } => GatewayResult::Declined { error_detail },
            OutcomePayload::Pending => GatewayResult::Pending,
            OutcomePayload::Unknown => GatewayResult::Unknown,
        }
    }
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub user_id: String,
    pub status: String,
    pub items: Vec<OrderItemResponse>,
    pub total_cents: i64,
    pub gateway_intent_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub order: OrderResponse,
    pub gateway_transaction_token: String,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        OrderResponse {
            id: order.id.to_string(),
            user_id: order.user_id.to_string(),
            status: order.status.as_str().to_string(),
            items: order
                .items
                .iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id.to_string(),
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price.cents(),
                })
                .collect(),
            total_cents: order.total.cents(),
            gateway_intent_id: order.gateway_intent_id.as_ref().map(ToString::to_string),
            gateway_payment_id: order.gateway_payment_id.as_ref().map(ToString::to_string),
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// POST /orders — create an order and its gateway intent.
#[tracing::instrument(skip(state, req))]
pub async fn create<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(axum::http::StatusCode, Json<CheckoutResponse>), ApiError>
where
    S: OrderStore + 'static,
    G: GatewayClient + 'static,
{
    let id_str = req
        .user_id
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("user_id is required".to_string()))?;
    let user_id = uuid::Uuid::parse_str(id_str)
        .map(UserId::from_uuid)
        .map_err(|e| ApiError::BadRequest(format!("Invalid user_id: {e}")))?;

    let items: Vec<OrderItem> = req
        .items
        .iter()
        .map(|item| {
            OrderItem::new(
                item.product_id.as_str(),
                item.quantity,
                Money::from_cents(item.unit_price_cents),
            )
        })
        .collect();

    let intent = state.intent_service.create_order(user_id, items).await?;

    let response = CheckoutResponse {
        order: OrderResponse::from(&intent.order),
        gateway_transaction_token: intent.transaction_token.as_str().to_string(),
    };

    Ok((axum::http::StatusCode::CREATED, Json(response)))
}

/// GET /orders/:id — load an order by ID.
#[tracing::instrument(skip(state))]
pub async fn get<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: OrderStore + 'static,
    G: GatewayClient + 'static,
{
    let order_id = parse_order_id(&id)?;
    let order = state
        .store
        .get(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(OrderResponse::from(&order)))
}

/// PUT /orders/:id/finalize — reconcile an order with a client-claimed
/// gateway outcome.
#[tracing::instrument(skip(state, req))]
pub async fn finalize<S, G>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
    Json(req): Json<FinalizeRequest>,
) -> Result<Json<OrderResponse>, ApiError>
where
    S: OrderStore + 'static,
    G: GatewayClient + 'static,
{
    let order_id = parse_order_id(&id)?;
    let claimed = GatewayOutcome::new(req.gateway_intent_id, req.outcome.into());
    let order = state.reconciler.finalize(order_id, claimed).await?;

    Ok(Json(OrderResponse::from(&order)))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    uuid::Uuid::parse_str(id)
        .map(OrderId::from_uuid)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order id: {e}")))
}
