use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::{
    db::DbPool,
    entity::coupons::{Column as CouponCol, Entity as Coupons, Model as CouponModel},
    error::{AppError, AppResult},
};

/// Compute the discount a coupon grants on a given subtotal, without
/// consuming it. Rejections carry a customer-presentable reason.
pub async fn preview_discount<C: ConnectionTrait>(
    conn: &C,
    code: &str,
    subtotal_cents: i64,
) -> AppResult<i64> {
    let coupon = Coupons::find()
        .filter(CouponCol::Code.eq(code))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::BadRequest("Unknown coupon".into()))?;

    discount_for(&coupon, subtotal_cents, Utc::now()).map_err(|reason| AppError::BadRequest(reason.into()))
}

fn discount_for(
    coupon: &CouponModel,
    subtotal_cents: i64,
    now: DateTime<Utc>,
) -> Result<i64, &'static str> {
    if !coupon.active {
        return Err("Coupon is not active");
    }
    if let Some(expires_at) = coupon.expires_at {
        if expires_at.with_timezone(&Utc) <= now {
            return Err("Coupon has expired");
        }
    }
    if let Some(max_uses) = coupon.max_uses {
        if coupon.used_count >= max_uses {
            return Err("Coupon has been fully redeemed");
        }
    }
    if let Some(min) = coupon.min_order_cents {
        if subtotal_cents < min {
            return Err("Order does not meet the coupon minimum");
        }
    }

    let discount = match coupon.discount_type.as_str() {
        "percentage" => subtotal_cents * coupon.discount_value / 100,
        "fixed" => coupon.discount_value,
        _ => return Err("Coupon has an unknown discount type"),
    };

    // A discount can never exceed the order itself.
    Ok(discount.clamp(0, subtotal_cents))
}

/// Consume one use of a coupon. The increment is a single conditional
/// UPDATE, so concurrent checkouts near `max_uses` cannot overshoot it.
pub async fn redeem(pool: &DbPool, code: &str) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE coupons
        SET used_count = used_count + 1
        WHERE code = $1
          AND active
          AND (max_uses IS NULL OR used_count < max_uses)
          AND (expires_at IS NULL OR expires_at > now())
        "#,
    )
    .bind(code)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::BadRequest("Coupon is no longer available".into()));
    }
    Ok(())
}
