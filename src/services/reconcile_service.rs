//! Reconciliation of payment-status events into order state.
//!
//! Both the provider's server-to-server webhook and the client-redirect
//! fallback land here, so delivery is at-least-once and duplicates race each
//! other. The `paid` transition is the sole mutation point: it takes a row
//! lock, short-circuits when the order is already settled, and only then
//! applies the side effects (stock decrement, push notification).

use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, EntityTrait, QuerySelect, Set, Statement, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    entity::orders::{ActiveModel as OrderActive, Entity as Orders},
    error::{AppError, AppResult},
    models::{OrderLine, OrderStatus},
    payments::webhook::{PaymentEvent, Settlement},
    services::push_service::{self, PushNotification},
    state::AppState,
};

#[derive(Debug)]
pub struct ReconcileOutcome {
    pub order_id: Uuid,
    pub new_status: String,
    /// False when the event was a duplicate or carried no actionable status.
    pub applied: bool,
}

pub async fn apply_payment_event(
    state: &AppState,
    event: PaymentEvent,
) -> AppResult<ReconcileOutcome> {
    let source = event.source.as_deref().unwrap_or("provider").to_string();
    tracing::info!(
        order_id = %event.order_id,
        status = ?event.status,
        source = %source,
        fallback = event.is_client_fallback(),
        "processing payment event"
    );

    match event.settlement() {
        Some(Settlement::Paid) => settle_paid(state, event, &source).await,
        Some(Settlement::Cancelled) => settle_cancelled(state, event, &source).await,
        None => record_metadata_only(state, event).await,
    }
}

async fn settle_paid(
    state: &AppState,
    event: PaymentEvent,
    source: &str,
) -> AppResult<ReconcileOutcome> {
    let order_id = event.order_id;

    let txn = state.orm.begin().await?;
    let order = Orders::find_by_id(order_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("Unknown order {order_id}")))?;

    if order.payment_status == OrderStatus::Paid.as_str() {
        // Duplicate delivery or the fallback racing the real webhook. The
        // settlement already happened; repeating the side effects would
        // double-decrement stock and double-notify.
        txn.commit().await?;
        tracing::info!(order_id = %order_id, source = %source, "order already paid, skipping");
        return Ok(ReconcileOutcome {
            order_id,
            new_status: OrderStatus::Paid.as_str().into(),
            applied: false,
        });
    }

    let lines: Vec<OrderLine> =
        serde_json::from_value(order.items.clone()).map_err(anyhow::Error::from)?;
    let customer = if order.customer_name.trim().is_empty() {
        order.customer_email.clone()
    } else {
        order.customer_name.clone()
    };
    let total_cents = order.total_cents;

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Paid.as_str().into());
    active.payment_status = Set(OrderStatus::Paid.as_str().into());
    active.payment_id = Set(event.transaction_id.clone());
    active.provider_metadata = Set(Some(event.raw.clone()));
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;

    // Stock moves in the same transaction as the status flip. A failed
    // decrement rolls everything back, so the provider's retry is not
    // swallowed by the already-paid guard with the decrement lost.
    for line in &lines {
        if let Some(product_id) = line.product_id {
            decrement_stock(&txn, product_id, line.quantity).await?;
        }
    }
    txn.commit().await?;

    // Best-effort: a failed notification must never fail the webhook.
    let item_count = lines.iter().filter(|l| l.unit_cents >= 0).count();
    let notification = PushNotification {
        title: format!("🛍️ Novo Pedido — R$ {:.2}", total_cents as f64 / 100.0),
        body: format!("{customer} • {item_count} item(s)"),
        url: "./#/admin".into(),
    };
    if let Err(err) = push_service::broadcast(state, &notification).await {
        tracing::warn!(order_id = %order_id, error = %err, "push dispatch failed (non-fatal)");
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(source),
        "order_paid",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": order_id,
            "transaction_id": event.transaction_id,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ReconcileOutcome {
        order_id,
        new_status: OrderStatus::Paid.as_str().into(),
        applied: true,
    })
}

async fn settle_cancelled(
    state: &AppState,
    event: PaymentEvent,
    source: &str,
) -> AppResult<ReconcileOutcome> {
    let order_id = event.order_id;

    let txn = state.orm.begin().await?;
    let order = Orders::find_by_id(order_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("Unknown order {order_id}")))?;

    let current = OrderStatus::parse(&order.status);
    let cancellable = matches!(current, Some(OrderStatus::Pending | OrderStatus::Paid));
    if !cancellable {
        // Record the payload for audit, leave the state machine alone.
        let status = order.status.clone();
        let mut active: OrderActive = order.into();
        active.provider_metadata = Set(Some(event.raw.clone()));
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await?;
        txn.commit().await?;
        return Ok(ReconcileOutcome {
            order_id,
            new_status: status,
            applied: false,
        });
    }

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Cancelled.as_str().into());
    active.payment_status = Set(OrderStatus::Cancelled.as_str().into());
    active.payment_id = Set(event.transaction_id.clone());
    active.provider_metadata = Set(Some(event.raw.clone()));
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;
    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(source),
        "order_cancelled",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ReconcileOutcome {
        order_id,
        new_status: OrderStatus::Cancelled.as_str().into(),
        applied: true,
    })
}

/// Provider statuses outside the paid/cancelled vocabularies ("created",
/// "authorized", ...) change nothing; the payload is kept for diagnosis.
async fn record_metadata_only(
    state: &AppState,
    event: PaymentEvent,
) -> AppResult<ReconcileOutcome> {
    let order_id = event.order_id;
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest(format!("Unknown order {order_id}")))?;

    let status = order.status.clone();
    let mut active: OrderActive = order.into();
    active.provider_metadata = Set(Some(event.raw.clone()));
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    tracing::info!(order_id = %order_id, status = ?event.status, "payload recorded, no status change");

    Ok(ReconcileOutcome {
        order_id,
        new_status: status,
        applied: false,
    })
}

/// Atomic clamped decrement, run on the settlement transaction. Concurrent
/// settlements for the same product serialize inside Postgres; stock never
/// goes negative.
async fn decrement_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    quantity: i32,
) -> AppResult<()> {
    let row = conn
        .query_one(Statement::from_sql_and_values(
            conn.get_database_backend(),
            "UPDATE products SET stock = GREATEST(stock - $2, 0) WHERE id = $1 RETURNING stock",
            [product_id.into(), quantity.into()],
        ))
        .await?;

    match row {
        Some(row) => {
            let remaining: i32 = row.try_get("", "stock")?;
            if remaining == 0 {
                tracing::warn!(%product_id, "stock reached zero after settlement");
            }
        }
        None => tracing::warn!(%product_id, "settled order references unknown product"),
    }
    Ok(())
}
