use axum::{Json, Router, extract::State, routing::post};
use serde_json::Value;

use crate::{
    dto::orders::WebhookAck,
    error::{AppError, AppResult},
    payments::webhook::PaymentEvent,
    services::reconcile_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/webhook", post(payment_webhook))
}

/// Inbound payment-status callback. The provider posts here asynchronously;
/// the storefront success page posts the same contract as a fallback when
/// the real webhook is delayed, tagged `source: client-redirect-fallback`.
#[utoipa::path(
    post,
    path = "/payments/webhook",
    responses(
        (status = 200, description = "Event reconciled", body = WebhookAck),
        (status = 400, description = "No resolvable order id in payload"),
        (status = 500, description = "Store update failed; provider should retry"),
    ),
    tag = "Payments"
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> AppResult<Json<WebhookAck>> {
    let event =
        PaymentEvent::from_value(payload).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let outcome = reconcile_service::apply_payment_event(&state, event).await?;

    Ok(Json(WebhookAck {
        message: "Webhook processed".into(),
        order_id: outcome.order_id,
        new_status: outcome.new_status,
    }))
}
