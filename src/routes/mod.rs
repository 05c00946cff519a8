use axum::Router;

use crate::state::AppState;

pub mod checkout;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod payments;
pub mod push;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/checkout", checkout::router())
        .nest("/payments", payments::router())
        .nest("/push", push::router())
        .nest("/orders", orders::router())
}
