use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set, Statement};
use uuid::Uuid;

use atelier_commerce_api::{
    config::{AppConfig, PaymentConfig, PushConfig},
    db::{create_orm_conn, create_pool, run_migrations},
    dto::checkout::{CartItemInput, CheckoutRequest, NegotiateRequest},
    entity::{
        coupons::{ActiveModel as CouponActive, Entity as Coupons},
        orders::Entity as Orders,
        products::ActiveModel as ProductActive,
    },
    error::AppError,
    models::{Customer, PushSubscription},
    payments::PaymentClient,
    push::{PushSendError, PushTransport},
    services::{checkout_service, coupon_service},
    state::AppState,
};

struct NoopPush;

#[async_trait]
impl PushTransport for NoopPush {
    async fn deliver(&self, _sub: &PushSubscription, _payload: &str) -> Result<(), PushSendError> {
        Ok(())
    }
}

fn database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE orders, products, push_subscriptions, coupons, audit_logs RESTART IDENTITY CASCADE",
    ))
    .await?;

    let config = AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 3000,
        jwt_secret: "test-secret".into(),
        payments: PaymentConfig {
            merchant_handle: "atelier".into(),
            // Connection-refused on purpose: checkout tests exercise the
            // provider-failure path without leaving the machine.
            api_base: "http://127.0.0.1:1".into(),
            success_url: "https://shop.example.com/#/sucesso".into(),
            local_success_url: "http://localhost:3000/#/sucesso".into(),
            callback_base: "https://api.example.com".into(),
            request_timeout: Duration::from_secs(2),
        },
        push: PushConfig {
            vapid_public_key: "test-public".into(),
            vapid_private_key_pem: "unused in tests".into(),
            vapid_subject: "mailto:ops@example.com".into(),
        },
    };
    let payments = PaymentClient::new(&config.payments)?;

    Ok(AppState {
        pool,
        orm,
        config: Arc::new(config),
        payments,
        push: Arc::new(NoopPush),
    })
}

async fn seed_product(state: &AppState, name: &str, price_cents: i64, stock: i32) -> anyhow::Result<Uuid> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.into()),
        description: Set(None),
        price_cents: Set(price_cents),
        stock: Set(stock),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(product.id)
}

fn customer() -> Customer {
    Customer {
        name: "Ana".into(),
        email: "ana@example.com".into(),
        phone: Some("11999717163".into()),
        address: None,
    }
}

// Tampered client price is overwritten from the catalog before totalling.
#[tokio::test]
async fn validator_overrides_tampered_prices() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests.");
        return Ok(());
    };
    let state = setup_state(&url).await?;
    let product_id = seed_product(&state, "Anel Solitário", 4990, 10).await?;

    let items = vec![CartItemInput {
        id: Some(product_id.to_string()),
        name: "Anel Solitário".into(),
        price: 0.01,
        quantity: 1,
    }];
    let lines = checkout_service::validate_items(&state.orm, &items).await?;
    let total: i64 = lines.iter().map(|l| l.line_total_cents()).sum();
    assert_eq!(total, 4990, "client claimed 1 cent, catalog says 49.90");
    Ok(())
}

// A catalog item submitted with price 0 must still hit the catalog read;
// skipping it would sell the product for nothing.
#[tokio::test]
async fn zero_priced_item_cannot_bypass_catalog() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests.");
        return Ok(());
    };
    let state = setup_state(&url).await?;
    let product_id = seed_product(&state, "Anel Solitário", 4990, 10).await?;

    for claimed in [0.0, -49.90] {
        let items = vec![CartItemInput {
            id: Some(product_id.to_string()),
            name: "Anel Solitário".into(),
            price: claimed,
            quantity: 1,
        }];
        let lines = checkout_service::validate_items(&state.orm, &items).await?;
        assert_eq!(
            lines[0].unit_cents, 4990,
            "catalog price must win over a claimed price of {claimed}"
        );
    }
    Ok(())
}

// Provider unreachable: the checkout errors but the pending order survives
// for support and reconciliation.
#[tokio::test]
async fn provider_failure_keeps_pending_order() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests.");
        return Ok(());
    };
    let state = setup_state(&url).await?;
    let product_id = seed_product(&state, "Pulseira", 25000, 4).await?;

    let order_id = Uuid::new_v4();
    let request = CheckoutRequest {
        order_id,
        items: vec![CartItemInput {
            id: Some(product_id.to_string()),
            name: "Pulseira".into(),
            price: 250.0,
            quantity: 1,
        }],
        customer: customer(),
        origin: Some("https://shop.example.com".into()),
        coupon_code: None,
    };

    let result = checkout_service::create_checkout(&state, request).await;
    assert!(result.is_err(), "unreachable provider must fail the checkout");

    let order = Orders::find_by_id(order_id).one(&state.orm).await?.expect("pending order kept");
    assert_eq!(order.status, "pending");
    assert_eq!(order.total_cents, 25000);
    assert!(order.payment_link.is_none());
    Ok(())
}

// Empty carts and blank customers never reach the provider.
#[tokio::test]
async fn invalid_drafts_are_rejected_up_front() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests.");
        return Ok(());
    };
    let state = setup_state(&url).await?;

    let request = CheckoutRequest {
        order_id: Uuid::new_v4(),
        items: vec![],
        customer: customer(),
        origin: None,
        coupon_code: None,
    };
    let result = checkout_service::create_checkout(&state, request).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    Ok(())
}

// The WhatsApp path shares the Order entity with validated prices.
#[tokio::test]
async fn negotiation_order_uses_catalog_prices() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests.");
        return Ok(());
    };
    let state = setup_state(&url).await?;
    let product_id = seed_product(&state, "Gargantilha", 89900, 2).await?;

    let request = NegotiateRequest {
        items: vec![CartItemInput {
            id: Some(product_id.to_string()),
            name: "Gargantilha".into(),
            price: 1.0,
            quantity: 1,
        }],
        customer: customer(),
    };
    let resp = checkout_service::create_negotiation_order(&state, request).await?;
    let data = resp.data.expect("negotiation data");
    assert_eq!(data.total_cents, 89900);

    let order = Orders::find_by_id(data.order_id).one(&state.orm).await?.expect("order");
    assert_eq!(order.status, "negotiating_whatsapp");
    assert!(order.payment_link.is_none());
    Ok(())
}

// The conditional redemption can never push used_count past max_uses.
#[tokio::test]
async fn coupon_redemption_stops_at_max_uses() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests.");
        return Ok(());
    };
    let state = setup_state(&url).await?;

    CouponActive {
        id: Set(Uuid::new_v4()),
        code: Set("ULTIMA".into()),
        discount_type: Set("fixed".into()),
        discount_value: Set(1000),
        min_order_cents: Set(None),
        max_uses: Set(Some(1)),
        used_count: Set(0),
        expires_at: Set(None),
        active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    coupon_service::redeem(&state.pool, "ULTIMA").await?;
    let second = coupon_service::redeem(&state.pool, "ULTIMA").await;
    assert!(matches!(second, Err(AppError::BadRequest(_))));

    let coupon = Coupons::find().one(&state.orm).await?.expect("coupon");
    assert_eq!(coupon.used_count, 1);
    Ok(())
}
