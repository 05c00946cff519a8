use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub address: Option<Json>,
    /// Validated line items, `Vec<OrderLine>` serialized as jsonb.
    pub items: Json,
    pub total_cents: i64,
    pub discount_cents: i64,
    pub coupon_code: Option<String>,
    pub status: String,
    pub payment_status: String,
    pub payment_link: Option<String>,
    pub payment_id: Option<String>,
    /// Latest raw provider payload, last-write-wins, diagnostic only.
    pub provider_metadata: Option<Json>,
    pub tracking_code: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
