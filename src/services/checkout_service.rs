use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::checkout::{
        CartItemInput, CheckoutRequest, CheckoutResponse, NegotiateRequest, NegotiateResponse,
    },
    entity::products::{Column as ProdCol, Entity as Products, Model as ProductModel},
    entity::orders::ActiveModel as OrderActive,
    error::{AppError, AppResult},
    models::{Customer, OrderLine, OrderStatus},
    payments::client::{CheckoutLinkRequest, ProviderAddress, ProviderCustomer, ProviderItem, format_phone},
    response::ApiResponse,
    services::coupon_service,
    state::AppState,
};

/// Convert a client-submitted price in currency units to integer cents.
/// Only ever used for pass-through items; catalog prices are already cents.
pub fn to_cents(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

/// Re-derive authoritative prices for a cart. Items whose id resolves to a
/// catalog product get price and name overwritten; everything else (discount
/// pseudo-items, ids the catalog does not know) passes through unchanged.
///
/// A failed catalog read aborts the whole checkout. Falling back to the
/// client's prices is not an option.
pub async fn validate_items<C: ConnectionTrait>(
    conn: &C,
    items: &[CartItemInput],
) -> AppResult<Vec<OrderLine>> {
    // Every id goes into the lookup, whatever price the client claims.
    // Filtering on the submitted price would let a zero-priced item dodge
    // the catalog read entirely.
    let ids: Vec<Uuid> = items
        .iter()
        .filter_map(|i| i.id.as_deref().and_then(|s| Uuid::parse_str(s).ok()))
        .collect();

    let catalog = if ids.is_empty() {
        Vec::new()
    } else {
        // One batched read for the whole cart, never per-item queries.
        Products::find()
            .filter(ProdCol::Id.is_in(ids))
            .all(conn)
            .await
            .map_err(|e| AppError::PriceValidation(e.to_string()))?
    };

    Ok(build_order_lines(items, &catalog))
}

fn build_order_lines(items: &[CartItemInput], catalog: &[ProductModel]) -> Vec<OrderLine> {
    items
        .iter()
        .map(|item| {
            let parsed = item.id.as_deref().and_then(|s| Uuid::parse_str(s).ok());
            match parsed.and_then(|id| catalog.iter().find(|p| p.id == id)) {
                Some(product) => {
                    tracing::debug!(
                        product_id = %product.id,
                        client_cents = to_cents(item.price),
                        catalog_cents = product.price_cents,
                        "overwriting client price with catalog price"
                    );
                    OrderLine {
                        product_id: Some(product.id),
                        name: product.name.clone(),
                        unit_cents: product.price_cents,
                        quantity: item.quantity,
                    }
                }
                None => OrderLine {
                    product_id: parsed,
                    name: item.name.clone(),
                    unit_cents: to_cents(item.price),
                    quantity: item.quantity,
                },
            }
        })
        .collect()
}

fn validate_draft(items: &[CartItemInput], customer: &Customer) -> AppResult<()> {
    if items.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }
    if items.iter().any(|i| i.quantity <= 0) {
        return Err(AppError::BadRequest("Cart has invalid quantity".into()));
    }
    if customer.name.trim().is_empty() || customer.email.trim().is_empty() {
        return Err(AppError::BadRequest("Customer name and email are required".into()));
    }
    Ok(())
}

/// Create a pending order and a hosted checkout link for it.
///
/// The order row is inserted before the provider is contacted, so a provider
/// failure still leaves an auditable `pending` record; it is deliberately not
/// rolled back on error.
pub async fn create_checkout(
    state: &AppState,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    validate_draft(&payload.items, &payload.customer)?;

    let mut lines = validate_items(&state.orm, &payload.items).await?;
    let gross: i64 = lines.iter().map(OrderLine::line_total_cents).sum();

    let mut discount_cents = 0;
    if let Some(code) = payload.coupon_code.as_deref() {
        discount_cents = coupon_service::preview_discount(&state.orm, code, gross).await?;
        coupon_service::redeem(&state.pool, code).await?;
        lines.push(OrderLine {
            product_id: None,
            name: format!("Desconto ({code})"),
            unit_cents: -discount_cents,
            quantity: 1,
        });
    }

    // Authoritative amount: integer cents summed over validated lines, the
    // synthetic discount line included, so the provider sees our exact total.
    let total_cents: i64 = lines.iter().map(OrderLine::line_total_cents).sum();
    if total_cents <= 0 {
        return Err(AppError::BadRequest("Order total must be positive".into()));
    }

    let order = OrderActive {
        id: Set(payload.order_id),
        customer_name: Set(payload.customer.name.clone()),
        customer_email: Set(payload.customer.email.clone()),
        customer_phone: Set(payload.customer.phone.clone()),
        address: Set(match &payload.customer.address {
            Some(a) => Some(serde_json::to_value(a).map_err(anyhow::Error::from)?),
            None => None,
        }),
        items: Set(serde_json::to_value(&lines).map_err(anyhow::Error::from)?),
        total_cents: Set(total_cents),
        discount_cents: Set(discount_cents),
        coupon_code: Set(payload.coupon_code.clone()),
        status: Set(OrderStatus::Pending.as_str().into()),
        payment_status: Set(OrderStatus::Pending.as_str().into()),
        payment_link: Set(None),
        payment_id: Set(None),
        provider_metadata: Set(None),
        tracking_code: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let cfg = &state.config.payments;
    let request = CheckoutLinkRequest {
        handle: cfg.merchant_handle.clone(),
        description: format!("Pedido #{}", short_id(&payload.order_id)),
        amount: total_cents,
        order_nsu: payload.order_id.to_string(),
        redirect_url: cfg.redirect_url_for(payload.origin.as_deref()).to_string(),
        notification_url: cfg.notification_url(),
        items: lines
            .iter()
            .map(|l| ProviderItem {
                id: l
                    .product_id
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| "custom".into()),
                description: l.name.clone(),
                price: l.unit_cents,
                quantity: l.quantity,
            })
            .collect(),
        customer: provider_customer(&payload.customer),
    };

    // A failure from here on leaves the pending order in place for
    // reconciliation and support.
    let response = state.payments.create_checkout_link(&request).await?;
    let url = response
        .link()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("provider response missing checkout url")))?
        .to_string();

    let mut active: OrderActive = order.into();
    active.payment_link = Set(Some(url.clone()));
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        None,
        "checkout_created",
        Some("orders"),
        Some(serde_json::json!({ "order_id": payload.order_id, "total_cents": total_cents })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::ok("Checkout created", CheckoutResponse { url }))
}

/// Create an order for the WhatsApp negotiation path. Prices are validated
/// the same way, but no provider call is made and no link is issued.
pub async fn create_negotiation_order(
    state: &AppState,
    payload: NegotiateRequest,
) -> AppResult<ApiResponse<NegotiateResponse>> {
    validate_draft(&payload.items, &payload.customer)?;

    let lines = validate_items(&state.orm, &payload.items).await?;
    let total_cents: i64 = lines.iter().map(OrderLine::line_total_cents).sum();
    let order_id = Uuid::new_v4();

    OrderActive {
        id: Set(order_id),
        customer_name: Set(payload.customer.name.clone()),
        customer_email: Set(payload.customer.email.clone()),
        customer_phone: Set(payload.customer.phone.clone()),
        address: Set(match &payload.customer.address {
            Some(a) => Some(serde_json::to_value(a).map_err(anyhow::Error::from)?),
            None => None,
        }),
        items: Set(serde_json::to_value(&lines).map_err(anyhow::Error::from)?),
        total_cents: Set(total_cents),
        discount_cents: Set(0),
        coupon_code: Set(None),
        status: Set(OrderStatus::NegotiatingWhatsapp.as_str().into()),
        payment_status: Set(OrderStatus::Pending.as_str().into()),
        payment_link: Set(None),
        payment_id: Set(None),
        provider_metadata: Set(None),
        tracking_code: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::ok(
        "Order registered for negotiation",
        NegotiateResponse {
            order_id,
            total_cents,
        },
    ))
}

fn provider_customer(customer: &Customer) -> ProviderCustomer {
    ProviderCustomer {
        email: customer.email.clone(),
        name: customer.name.clone(),
        phone_number: format_phone(customer.phone.as_deref().unwrap_or("11999999999")),
        address: customer.address.as_ref().map(|a| ProviderAddress {
            street: a.street.clone(),
            number: a.number.clone(),
            neighborhood: a.neighborhood.clone(),
            city: a.city.clone(),
            state: a.state.clone(),
            zipcode: a.zipcode.chars().filter(|c| c.is_ascii_digit()).collect(),
            complement: a.complement.clone().unwrap_or_default(),
        }),
    }
}

fn short_id(id: &Uuid) -> String {
    id.to_string().chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn catalog_product(id: Uuid, name: &str, price_cents: i64) -> ProductModel {
        ProductModel {
            id,
            name: name.into(),
            description: None,
            price_cents,
            stock: 10,
            created_at: Utc::now().into(),
        }
    }

    fn cart_item(id: Option<String>, name: &str, price: f64, quantity: i32) -> CartItemInput {
        CartItemInput {
            id,
            name: name.into(),
            price,
            quantity,
        }
    }

    #[test]
    fn client_price_is_overwritten_by_catalog() {
        let id = Uuid::new_v4();
        let catalog = vec![catalog_product(id, "Anel Solitário", 4990)];
        // Client claims the ring costs R$ 1.
        let items = vec![cart_item(Some(id.to_string()), "hacked name", 1.0, 1)];

        let lines = build_order_lines(&items, &catalog);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].unit_cents, 4990);
        assert_eq!(lines[0].name, "Anel Solitário");
        let total: i64 = lines.iter().map(OrderLine::line_total_cents).sum();
        assert_eq!(total, 4990);
    }

    #[test]
    fn unknown_ids_and_discount_items_pass_through() {
        let items = vec![
            cart_item(Some(Uuid::new_v4().to_string()), "Peça sob medida", 120.0, 1),
            cart_item(None, "Desconto", -10.0, 1),
        ];
        let lines = build_order_lines(&items, &[]);
        assert_eq!(lines[0].unit_cents, 12000);
        assert_eq!(lines[0].name, "Peça sob medida");
        assert_eq!(lines[1].unit_cents, -1000);
    }

    #[test]
    fn quantity_multiplies_into_line_total() {
        let id = Uuid::new_v4();
        let catalog = vec![catalog_product(id, "Brinco", 2500)];
        let items = vec![cart_item(Some(id.to_string()), "Brinco", 25.0, 3)];
        let lines = build_order_lines(&items, &catalog);
        assert_eq!(lines[0].line_total_cents(), 7500);
    }

    #[test]
    fn to_cents_rounds_half_cents() {
        assert_eq!(to_cents(49.90), 4990);
        assert_eq!(to_cents(0.015), 2);
        assert_eq!(to_cents(-10.0), -1000);
    }

    #[test]
    fn draft_validation_rejects_bad_input() {
        let customer = Customer {
            name: "Ana".into(),
            email: "ana@example.com".into(),
            phone: None,
            address: None,
        };
        assert!(validate_draft(&[], &customer).is_err());

        let zero_qty = vec![cart_item(None, "x", 10.0, 0)];
        assert!(validate_draft(&zero_qty, &customer).is_err());

        let anon = Customer {
            name: "".into(),
            email: "ana@example.com".into(),
            phone: None,
            address: None,
        };
        let ok_items = vec![cart_item(None, "x", 10.0, 1)];
        assert!(validate_draft(&ok_items, &anon).is_err());
        assert!(validate_draft(&ok_items, &customer).is_ok());
    }
}
