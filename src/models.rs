use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Settlement + fulfillment states collapsed into one machine. Settlement
/// (`Pending`/`Paid`/`Cancelled`) is owned by the webhook reconciler;
/// fulfillment states are only ever set by staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    NegotiatingWhatsapp,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::NegotiatingWhatsapp => "negotiating_whatsapp",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            "processing" => Some(OrderStatus::Processing),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            "negotiating_whatsapp" => Some(OrderStatus::NegotiatingWhatsapp),
            _ => None,
        }
    }

    /// Legal transitions for staff edits. The reconciler has its own rules
    /// and does not go through this check.
    pub fn staff_can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        match (self, next) {
            (Pending | Paid, Cancelled) => true,
            (Paid, Processing) | (Processing, Shipped) | (Shipped, Delivered) => true,
            (NegotiatingWhatsapp, Pending | Paid | Cancelled) => true,
            _ => false,
        }
    }
}

/// One order line as stored in the `orders.items` jsonb column. `product_id`
/// is optional: discount pseudo-items and custom lines carry none.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderLine {
    pub product_id: Option<Uuid>,
    pub name: String,
    /// Unit price in integer cents; negative for discount lines.
    pub unit_cents: i64,
    pub quantity: i32,
}

impl OrderLine {
    pub fn line_total_cents(&self) -> i64 {
        self.unit_cents * i64::from(self.quantity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Address {
    pub street: String,
    pub number: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub zipcode: String,
    #[serde(default)]
    pub complement: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Customer {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<Address>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub address: Option<Address>,
    pub items: Vec<OrderLine>,
    pub total_cents: i64,
    pub discount_cents: i64,
    pub coupon_code: Option<String>,
    pub status: String,
    pub payment_status: String,
    pub payment_link: Option<String>,
    pub payment_id: Option<String>,
    pub tracking_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PushSubscription {
    pub id: Uuid,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub discount_type: String,
    pub discount_value: i64,
    pub min_order_cents: Option<i64>,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staff_transitions_follow_fulfillment_chain() {
        assert!(OrderStatus::Paid.staff_can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Processing.staff_can_transition_to(OrderStatus::Shipped));
        assert!(OrderStatus::Shipped.staff_can_transition_to(OrderStatus::Delivered));
        assert!(!OrderStatus::Pending.staff_can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Delivered.staff_can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn cancellation_only_from_pending_or_paid() {
        assert!(OrderStatus::Pending.staff_can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Paid.staff_can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Shipped.staff_can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn status_round_trips_through_strings() {
        for s in [
            "pending",
            "paid",
            "processing",
            "shipped",
            "delivered",
            "cancelled",
            "negotiating_whatsapp",
        ] {
            let parsed = OrderStatus::parse(s).unwrap();
            assert_eq!(parsed.as_str(), s);
        }
        assert!(OrderStatus::parse("authorized").is_none());
    }
}
