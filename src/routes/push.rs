use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::push::{PushReport, SendPushRequest, SubscribeRequest},
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    models::PushSubscription,
    response::ApiResponse,
    services::push_service::{self, PushNotification},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/subscriptions", post(subscribe))
        .route("/send", post(send))
}

#[utoipa::path(
    post,
    path = "/push/subscriptions",
    request_body = SubscribeRequest,
    responses(
        (status = 200, description = "Subscription registered", body = ApiResponse<PushSubscription>),
    ),
    tag = "Push"
)]
pub async fn subscribe(
    State(state): State<AppState>,
    Json(payload): Json<SubscribeRequest>,
) -> AppResult<Json<ApiResponse<PushSubscription>>> {
    let resp = push_service::subscribe(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/push/send",
    request_body = SendPushRequest,
    responses(
        (status = 200, description = "Broadcast result", body = ApiResponse<PushReport>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Push"
)]
pub async fn send(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SendPushRequest>,
) -> AppResult<Json<ApiResponse<PushReport>>> {
    ensure_admin(&user)?;

    // Default deep link is the admin panel; a specific order gets its own.
    let url = payload.url.unwrap_or_else(|| match payload.order_id {
        Some(id) => format!("./#/admin/orders/{id}"),
        None => "./#/admin".into(),
    });
    let note = PushNotification {
        title: payload.title.unwrap_or_else(|| "🛍️ Novo Pedido Pago!".into()),
        body: payload.body.unwrap_or_else(|| "Verifique o painel.".into()),
        url,
    };
    let report = push_service::broadcast(&state, &note).await?;

    Ok(Json(ApiResponse::ok("Broadcast finished", report)))
}
