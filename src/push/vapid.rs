//! VAPID (RFC 8292) authorization for Web Push requests.

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::Serialize;

use crate::config::PushConfig;

#[derive(Debug, Serialize)]
struct VapidClaims<'a> {
    aud: &'a str,
    exp: i64,
    sub: &'a str,
}

/// Build the `Authorization: vapid ...` header value for a push endpoint.
/// The token audience is the endpoint's origin, valid for 12 hours.
pub fn authorization_header(config: &PushConfig, endpoint: &str) -> anyhow::Result<String> {
    let aud = endpoint_origin(endpoint)
        .ok_or_else(|| anyhow::anyhow!("push endpoint has no origin: {endpoint}"))?;

    let claims = VapidClaims {
        aud: &aud,
        exp: (Utc::now() + chrono::Duration::hours(12)).timestamp(),
        sub: &config.vapid_subject,
    };
    let key = EncodingKey::from_ec_pem(config.vapid_private_key_pem.as_bytes())?;
    let token = encode(&Header::new(Algorithm::ES256), &claims, &key)?;

    Ok(format!("vapid t={token}, k={}", config.vapid_public_key))
}

/// `scheme://host[:port]` part of a URL, without pulling in a URL crate.
pub fn endpoint_origin(endpoint: &str) -> Option<String> {
    let scheme_end = endpoint.find("://")?;
    let rest = &endpoint[scheme_end + 3..];
    if rest.is_empty() {
        return None;
    }
    let host_end = rest.find('/').unwrap_or(rest.len());
    Some(format!(
        "{}://{}",
        &endpoint[..scheme_end],
        &rest[..host_end]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_strips_path_and_keeps_port() {
        assert_eq!(
            endpoint_origin("https://fcm.googleapis.com/fcm/send/abc123").as_deref(),
            Some("https://fcm.googleapis.com")
        );
        assert_eq!(
            endpoint_origin("https://push.example.com:8443/sub/xyz").as_deref(),
            Some("https://push.example.com:8443")
        );
    }

    #[test]
    fn origin_rejects_malformed_endpoints() {
        assert_eq!(endpoint_origin("not-a-url"), None);
        assert_eq!(endpoint_origin("https://"), None);
    }
}
