use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Customer;

/// One cart line as submitted by the storefront. `price` is in currency
/// units (reais) and is never trusted for catalog products; the validator
/// overwrites it. Negative-price pseudo-items (client-side discounts) and
/// ids unknown to the catalog pass through unchanged.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CartItemInput {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub price: f64,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    /// Client-generated order id, used as the provider correlation key.
    pub order_id: Uuid,
    pub items: Vec<CartItemInput>,
    pub customer: Customer,
    /// Caller's base URL; selects the local success page for dev origins.
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutResponse {
    pub url: String,
}

/// Manual path: the customer closes the deal over WhatsApp instead of the
/// hosted checkout. Shares the Order entity, no provider involved.
#[derive(Debug, Deserialize, ToSchema)]
pub struct NegotiateRequest {
    pub items: Vec<CartItemInput>,
    pub customer: Customer,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NegotiateResponse {
    pub order_id: Uuid,
    pub total_cents: i64,
}
