use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    dto::push::{PushReport, SubscribeRequest},
    entity::push_subscriptions::{
        ActiveModel as SubscriptionActive, Column as SubCol, Entity as PushSubscriptions,
    },
    error::AppResult,
    models::PushSubscription,
    push::PushSendError,
    response::ApiResponse,
    services::subscription_from_entity,
    state::AppState,
};

#[derive(Debug, Clone)]
pub struct PushNotification {
    pub title: String,
    pub body: String,
    pub url: String,
}

/// Fan a notification out to every registered subscription. Deliveries are
/// independent: one failure never aborts the rest. Endpoints the push
/// service reports as gone are pruned on the spot.
pub async fn broadcast(state: &AppState, note: &PushNotification) -> AppResult<PushReport> {
    let subscriptions = PushSubscriptions::find().all(&state.orm).await?;
    let total = subscriptions.len();
    if total == 0 {
        tracing::info!("no push subscriptions registered");
        return Ok(PushReport {
            sent: 0,
            failed: 0,
            total: 0,
        });
    }

    let payload = serde_json::to_string(&serde_json::json!({
        "title": note.title,
        "body": note.body,
        "url": note.url,
    }))
    .map_err(anyhow::Error::from)?;

    let mut sent = 0;
    let mut failed = 0;
    for model in subscriptions {
        let sub = subscription_from_entity(model);
        match state.push.deliver(&sub, &payload).await {
            Ok(()) => {
                sent += 1;
                tracing::debug!(endpoint = %truncated(&sub.endpoint), "push delivered");
            }
            Err(PushSendError::Gone) => {
                failed += 1;
                // Pruning is housekeeping; a failed delete must not stop
                // deliveries to the remaining subscribers.
                match PushSubscriptions::delete_by_id(sub.id).exec(&state.orm).await {
                    Ok(_) => {
                        tracing::info!(endpoint = %truncated(&sub.endpoint), "pruned stale push subscription");
                    }
                    Err(err) => {
                        tracing::warn!(endpoint = %truncated(&sub.endpoint), error = %err, "failed to prune stale subscription");
                    }
                }
            }
            Err(err) => {
                failed += 1;
                tracing::warn!(endpoint = %truncated(&sub.endpoint), error = %err, "push delivery failed");
            }
        }
    }

    tracing::info!(sent, failed, total, "push broadcast finished");
    Ok(PushReport {
        sent,
        failed,
        total,
    })
}

/// Register (or refresh) a browser subscription, unique by endpoint.
pub async fn subscribe(
    state: &AppState,
    payload: SubscribeRequest,
) -> AppResult<ApiResponse<PushSubscription>> {
    let existing = PushSubscriptions::find()
        .filter(SubCol::Endpoint.eq(payload.endpoint.clone()))
        .one(&state.orm)
        .await?;

    let model = match existing {
        Some(model) => {
            let mut active: SubscriptionActive = model.into();
            active.p256dh = Set(payload.keys.p256dh);
            active.auth = Set(payload.keys.auth);
            active.user_agent = Set(payload.user_agent);
            active.update(&state.orm).await?
        }
        None => {
            SubscriptionActive {
                id: Set(Uuid::new_v4()),
                endpoint: Set(payload.endpoint),
                p256dh: Set(payload.keys.p256dh),
                auth: Set(payload.keys.auth),
                user_agent: Set(payload.user_agent),
                created_at: NotSet,
            }
            .insert(&state.orm)
            .await?
        }
    };

    Ok(ApiResponse::ok(
        "Subscription registered",
        subscription_from_entity(model),
    ))
}

/// First 50 characters of an endpoint for log lines. Character based, so an
/// endpoint with multi-byte UTF-8 in it cannot panic the slice.
fn truncated(endpoint: &str) -> &str {
    match endpoint.char_indices().nth(50) {
        Some((idx, _)) => &endpoint[..idx],
        None => endpoint,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_endpoints_are_kept_whole() {
        assert_eq!(truncated("https://push.example.com/x"), "https://push.example.com/x");
    }

    #[test]
    fn long_endpoints_are_cut_at_fifty_chars() {
        let endpoint = format!("https://push.example.com/{}", "a".repeat(100));
        assert_eq!(truncated(&endpoint).chars().count(), 50);
    }

    #[test]
    fn multibyte_endpoints_do_not_panic() {
        let endpoint = format!("https://push.example.com/{}", "é".repeat(100));
        let cut = truncated(&endpoint);
        assert_eq!(cut.chars().count(), 50);
        assert!(endpoint.starts_with(cut));
    }
}
