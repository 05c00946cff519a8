use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        checkout::{CartItemInput, CheckoutRequest, CheckoutResponse, NegotiateRequest, NegotiateResponse},
        orders::{OrderList, SetTrackingRequest, UpdateOrderStatusRequest, WebhookAck},
        push::{PushReport, SendPushRequest, SubscribeRequest, SubscriptionKeys},
    },
    models::{Address, Coupon, Customer, Order, OrderLine, Product, PushSubscription},
    response::{ApiResponse, Meta},
    routes::{checkout, health, orders, params, payments, push},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        checkout::create_checkout,
        payments::payment_webhook,
        push::subscribe,
        push::send,
        orders::list_orders,
        orders::get_order,
        orders::update_order_status,
        orders::set_tracking,
        orders::negotiate,
    ),
    components(
        schemas(
            Address,
            Customer,
            Order,
            OrderLine,
            Product,
            Coupon,
            PushSubscription,
            CartItemInput,
            CheckoutRequest,
            CheckoutResponse,
            NegotiateRequest,
            NegotiateResponse,
            OrderList,
            UpdateOrderStatusRequest,
            SetTrackingRequest,
            WebhookAck,
            SubscribeRequest,
            SubscriptionKeys,
            SendPushRequest,
            PushReport,
            params::Pagination,
            params::OrderListQuery,
            Meta,
            ApiResponse<CheckoutResponse>,
            ApiResponse<Order>,
            ApiResponse<OrderList>,
            ApiResponse<PushReport>,
            ApiResponse<PushSubscription>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Checkout", description = "Hosted checkout creation"),
        (name = "Payments", description = "Payment provider callbacks"),
        (name = "Push", description = "Operator push notifications"),
        (name = "Orders", description = "Order management"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
