//! HTTP client for the hosted-checkout payment provider.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::PaymentConfig;
use crate::error::AppError;

/// Payload of the provider's public checkout-link endpoint. Amounts are
/// integer cents throughout.
#[derive(Debug, Serialize)]
pub struct CheckoutLinkRequest {
    pub handle: String,
    pub description: String,
    pub amount: i64,
    /// Our order id; the provider echoes it back in webhooks.
    pub order_nsu: String,
    pub redirect_url: String,
    pub notification_url: String,
    pub items: Vec<ProviderItem>,
    pub customer: ProviderCustomer,
}

#[derive(Debug, Serialize)]
pub struct ProviderItem {
    pub id: String,
    pub description: String,
    pub price: i64,
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct ProviderCustomer {
    pub email: String,
    pub name: String,
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<ProviderAddress>,
}

#[derive(Debug, Serialize)]
pub struct ProviderAddress {
    pub street: String,
    pub number: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
    pub zipcode: String,
    pub complement: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutLinkResponse {
    /// The provider has answered with either key across API revisions.
    pub checkout_url: Option<String>,
    pub url: Option<String>,
    #[serde(flatten)]
    pub metadata: Value,
}

impl CheckoutLinkResponse {
    pub fn link(&self) -> Option<&str> {
        self.checkout_url.as_deref().or(self.url.as_deref())
    }
}

#[derive(Clone)]
pub struct PaymentClient {
    http: reqwest::Client,
    api_base: String,
}

impl PaymentClient {
    pub fn new(config: &PaymentConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Create a hosted checkout session. Timeouts map to their own error so
    /// the caller can offer the WhatsApp fallback; any non-2xx surfaces the
    /// provider's raw body for operator diagnosis.
    pub async fn create_checkout_link(
        &self,
        payload: &CheckoutLinkRequest,
    ) -> Result<CheckoutLinkResponse, AppError> {
        let url = format!("{}/invoices/public/checkout/links", self.api_base);
        tracing::debug!(order_nsu = %payload.order_nsu, amount = payload.amount, "calling payment provider");

        let response = self
            .http
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::ProviderTimeout
                } else {
                    AppError::Internal(anyhow::anyhow!("provider request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("provider response unreadable: {e}")))?;

        if !status.is_success() {
            return Err(AppError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CheckoutLinkResponse = serde_json::from_str(&body)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("provider response malformed: {e}")))?;
        Ok(parsed)
    }
}

/// Normalize a Brazilian phone number into E.164, defaulting the country
/// code to +55 when absent.
pub fn format_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.starts_with("55") && digits.len() > 11 {
        format!("+{digits}")
    } else {
        format!("+55{digits}")
    }
}
