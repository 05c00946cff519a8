use std::env;
use std::time::Duration;

/// Everything the business logic needs from the environment, resolved once at
/// startup and injected through `AppState`. Handlers never read env vars.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub payments: PaymentConfig,
    pub push: PushConfig,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Merchant handle at the payment provider (leading `$` stripped).
    pub merchant_handle: String,
    /// Base URL of the provider's public checkout-link API.
    pub api_base: String,
    /// Public success page the provider redirects to after payment.
    pub success_url: String,
    /// Success page used when the checkout originates from a dev server.
    pub local_success_url: String,
    /// Server-reachable base URL for the payment webhook callback.
    pub callback_base: String,
    pub request_timeout: Duration,
}

impl PaymentConfig {
    /// Redirect target for a given caller origin. Origins that point at a
    /// local dev server get the local success page so the redirect does not
    /// leave the developer's machine.
    pub fn redirect_url_for(&self, origin: Option<&str>) -> &str {
        match origin {
            Some(o) if o.contains("localhost") || o.contains("127.0.0.1") => {
                &self.local_success_url
            }
            _ => &self.success_url,
        }
    }

    pub fn notification_url(&self) -> String {
        format!(
            "{}/api/payments/webhook",
            self.callback_base.trim_end_matches('/')
        )
    }
}

#[derive(Debug, Clone)]
pub struct PushConfig {
    /// VAPID public key, base64url as handed to the browser.
    pub vapid_public_key: String,
    /// VAPID private key, PEM-encoded EC (P-256) key for ES256 signing.
    pub vapid_private_key_pem: String,
    /// `sub` claim of the VAPID token, e.g. `mailto:ops@example.com`.
    pub vapid_subject: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET")?;

        let callback_base =
            env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| format!("http://{host}:{port}"));
        let timeout_secs = env::var("PAYMENT_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse::<u64>().ok())
            .unwrap_or(15);

        let payments = PaymentConfig {
            merchant_handle: env::var("MERCHANT_HANDLE")?
                .trim_start_matches('$')
                .to_string(),
            api_base: env::var("PAYMENT_API_BASE")
                .unwrap_or_else(|_| "https://api.infinitepay.io".to_string()),
            success_url: env::var("CHECKOUT_SUCCESS_URL")?,
            local_success_url: env::var("CHECKOUT_LOCAL_SUCCESS_URL")
                .unwrap_or_else(|_| "http://localhost:3000/#/sucesso".to_string()),
            callback_base,
            request_timeout: Duration::from_secs(timeout_secs),
        };

        let push = PushConfig {
            vapid_public_key: env::var("VAPID_PUBLIC_KEY")?,
            vapid_private_key_pem: env::var("VAPID_PRIVATE_KEY_PEM")?,
            vapid_subject: env::var("VAPID_SUBJECT")
                .unwrap_or_else(|_| "mailto:ops@example.com".to_string()),
        };

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            payments,
            push,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment_config() -> PaymentConfig {
        PaymentConfig {
            merchant_handle: "atelier".into(),
            api_base: "https://api.infinitepay.io".into(),
            success_url: "https://shop.example.com/#/sucesso".into(),
            local_success_url: "http://localhost:3000/#/sucesso".into(),
            callback_base: "https://api.example.com".into(),
            request_timeout: Duration::from_secs(15),
        }
    }

    #[test]
    fn production_origin_gets_public_success_url() {
        let cfg = payment_config();
        assert_eq!(
            cfg.redirect_url_for(Some("https://shop.example.com")),
            "https://shop.example.com/#/sucesso"
        );
        assert_eq!(
            cfg.redirect_url_for(None),
            "https://shop.example.com/#/sucesso"
        );
    }

    #[test]
    fn local_origins_get_local_success_url() {
        let cfg = payment_config();
        assert_eq!(
            cfg.redirect_url_for(Some("http://localhost:3000")),
            "http://localhost:3000/#/sucesso"
        );
        assert_eq!(
            cfg.redirect_url_for(Some("http://127.0.0.1:8080")),
            "http://localhost:3000/#/sucesso"
        );
    }

    #[test]
    fn notification_url_joins_without_double_slash() {
        let mut cfg = payment_config();
        cfg.callback_base = "https://api.example.com/".into();
        assert_eq!(
            cfg.notification_url(),
            "https://api.example.com/api/payments/webhook"
        );
    }
}
