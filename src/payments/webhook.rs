//! Parsing of inbound payment webhooks.
//!
//! The provider has shipped the same fields at different JSON paths across
//! revisions, so extraction happens here with fixed priority rules and the
//! reconciliation logic only ever sees a flat [`PaymentEvent`].

use serde_json::Value;
use uuid::Uuid;

/// Settlement outcome a provider status maps to. `None` from
/// [`Settlement::from_provider`] means the event is recorded but changes no
/// order state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Paid,
    Cancelled,
}

impl Settlement {
    pub fn from_provider(status: &str) -> Option<Self> {
        match status.to_ascii_lowercase().as_str() {
            "paid" | "approved" | "succeeded" | "completed" => Some(Settlement::Paid),
            "canceled" | "refused" | "failed" | "refunded" => Some(Settlement::Cancelled),
            _ => None,
        }
    }
}

/// A payment-status event, either a genuine provider webhook or the
/// client-redirect fallback re-submitting a synthetic `paid` signal.
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    /// Correlation id: the order id we handed the provider as `order_nsu`.
    pub order_id: Uuid,
    pub status: Option<String>,
    pub transaction_id: Option<String>,
    /// Provenance marker; `client-redirect-fallback` for the synthetic path.
    pub source: Option<String>,
    pub raw: Value,
}

impl PaymentEvent {
    /// Extract an event from a raw payload. Fails only when no correlation
    /// id can be found; every other field is best-effort.
    pub fn from_value(payload: Value) -> Result<Self, EventParseError> {
        let order_id = extract_str(
            &payload,
            &[
                &["order_nsu"],
                &["data", "attributes", "order_nsu"],
                &["metadata", "order_id"],
            ],
        )
        .ok_or(EventParseError::MissingOrderId)?;
        let order_id = Uuid::parse_str(&order_id)
            .map_err(|_| EventParseError::InvalidOrderId(order_id))?;

        let status = extract_str(&payload, &[&["status"], &["data", "attributes", "status"]]);
        let transaction_id = extract_str(&payload, &[&["id"], &["data", "id"]]);
        let source = extract_str(&payload, &[&["source"]]);

        Ok(Self {
            order_id,
            status,
            transaction_id,
            source,
            raw: payload,
        })
    }

    pub fn settlement(&self) -> Option<Settlement> {
        self.status.as_deref().and_then(Settlement::from_provider)
    }

    pub fn is_client_fallback(&self) -> bool {
        self.source.as_deref() == Some("client-redirect-fallback")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventParseError {
    #[error("no order id found in webhook payload")]
    MissingOrderId,
    #[error("order id {0:?} is not a valid UUID")]
    InvalidOrderId(String),
}

/// First match wins across the candidate paths. Numbers are accepted where
/// the provider serializes ids unquoted.
fn extract_str(payload: &Value, paths: &[&[&str]]) -> Option<String> {
    for path in paths {
        let mut node = payload;
        let mut found = true;
        for key in *path {
            match node.get(key) {
                Some(next) => node = next,
                None => {
                    found = false;
                    break;
                }
            }
        }
        if !found {
            continue;
        }
        match node {
            Value::String(s) if !s.is_empty() => return Some(s.clone()),
            Value::Number(n) => return Some(n.to_string()),
            _ => continue,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn paid_family_maps_to_paid() {
        for s in ["paid", "approved", "succeeded", "completed", "PAID"] {
            assert_eq!(Settlement::from_provider(s), Some(Settlement::Paid), "{s}");
        }
    }

    #[test]
    fn cancelled_family_maps_to_cancelled() {
        for s in ["canceled", "refused", "failed", "refunded"] {
            assert_eq!(Settlement::from_provider(s), Some(Settlement::Cancelled), "{s}");
        }
    }

    #[test]
    fn unknown_statuses_map_to_none() {
        for s in ["created", "authorized", "", "chargeback"] {
            assert_eq!(Settlement::from_provider(s), None, "{s}");
        }
    }

    #[test]
    fn extracts_from_root_fields() {
        let id = Uuid::new_v4();
        let event = PaymentEvent::from_value(json!({
            "order_nsu": id.to_string(),
            "status": "paid",
            "id": "tx-123",
        }))
        .unwrap();
        assert_eq!(event.order_id, id);
        assert_eq!(event.settlement(), Some(Settlement::Paid));
        assert_eq!(event.transaction_id.as_deref(), Some("tx-123"));
    }

    #[test]
    fn extracts_from_nested_data_attributes() {
        let id = Uuid::new_v4();
        let event = PaymentEvent::from_value(json!({
            "event": "invoice.paid",
            "data": {
                "id": 9981,
                "attributes": { "order_nsu": id.to_string(), "status": "approved" }
            }
        }))
        .unwrap();
        assert_eq!(event.order_id, id);
        assert_eq!(event.settlement(), Some(Settlement::Paid));
        assert_eq!(event.transaction_id.as_deref(), Some("9981"));
    }

    #[test]
    fn root_fields_win_over_nested_ones() {
        let root = Uuid::new_v4();
        let nested = Uuid::new_v4();
        let event = PaymentEvent::from_value(json!({
            "order_nsu": root.to_string(),
            "data": { "attributes": { "order_nsu": nested.to_string() } }
        }))
        .unwrap();
        assert_eq!(event.order_id, root);
    }

    #[test]
    fn missing_order_id_is_rejected() {
        let err = PaymentEvent::from_value(json!({ "status": "paid" })).unwrap_err();
        assert!(matches!(err, EventParseError::MissingOrderId));
    }

    #[test]
    fn fallback_source_is_recognized() {
        let id = Uuid::new_v4();
        let event = PaymentEvent::from_value(json!({
            "order_nsu": id.to_string(),
            "status": "paid",
            "source": "client-redirect-fallback",
        }))
        .unwrap();
        assert!(event.is_client_fallback());
    }
}
