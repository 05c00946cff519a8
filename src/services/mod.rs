use chrono::Utc;

use crate::entity::{orders, push_subscriptions};
use crate::error::AppResult;
use crate::models::{Order, PushSubscription};

pub mod checkout_service;
pub mod coupon_service;
pub mod fulfillment_service;
pub mod push_service;
pub mod reconcile_service;

pub(crate) fn order_from_entity(model: orders::Model) -> AppResult<Order> {
    let items = serde_json::from_value(model.items).map_err(anyhow::Error::from)?;
    let address = match model.address {
        Some(value) => Some(serde_json::from_value(value).map_err(anyhow::Error::from)?),
        None => None,
    };
    Ok(Order {
        id: model.id,
        customer_name: model.customer_name,
        customer_email: model.customer_email,
        customer_phone: model.customer_phone,
        address,
        items,
        total_cents: model.total_cents,
        discount_cents: model.discount_cents,
        coupon_code: model.coupon_code,
        status: model.status,
        payment_status: model.payment_status,
        payment_link: model.payment_link,
        payment_id: model.payment_id,
        tracking_code: model.tracking_code,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

pub(crate) fn subscription_from_entity(model: push_subscriptions::Model) -> PushSubscription {
    PushSubscription {
        id: model.id,
        endpoint: model.endpoint,
        p256dh: model.p256dh,
        auth: model.auth,
        user_agent: model.user_agent,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
