use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::checkout::{CheckoutRequest, CheckoutResponse},
    error::AppResult,
    response::ApiResponse,
    services::checkout_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(create_checkout))
}

#[utoipa::path(
    post,
    path = "/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Hosted checkout link created", body = ApiResponse<CheckoutResponse>),
        (status = 400, description = "Invalid order draft"),
        (status = 502, description = "Payment provider rejected the checkout"),
        (status = 504, description = "Payment provider timed out"),
    ),
    tag = "Checkout"
)]
pub async fn create_checkout(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<CheckoutResponse>>> {
    let resp = checkout_service::create_checkout(&state, payload).await?;
    Ok(Json(resp))
}
