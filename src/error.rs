use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::response::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Forbidden")]
    Forbidden,

    /// Catalog could not be read while validating checkout prices. The
    /// checkout must abort; client-submitted prices are never trusted.
    #[error("Price validation failed: {0}")]
    PriceValidation(String),

    /// The payment provider answered with a non-2xx status. Carries the raw
    /// body for operator diagnosis; only a generic message reaches customers.
    #[error("Payment provider error ({status}): {body}")]
    Provider { status: u16, body: String },

    /// The payment provider did not answer within the configured deadline.
    /// Callers use this to offer the WhatsApp fallback instead.
    #[error("Payment provider timed out")]
    ProviderTimeout,

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::PriceValidation(_) => (
                StatusCode::BAD_GATEWAY,
                "Checkout is temporarily unavailable".to_string(),
            ),
            AppError::Provider { status, .. } => {
                tracing::error!(provider_status = status, error = %self, "provider call failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "Payment provider rejected the checkout".to_string(),
                )
            }
            AppError::ProviderTimeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "Payment provider timed out".to_string(),
            ),
            AppError::DbError(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::OrmError(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        // Provider diagnostics stay in the logs; customers get the generic
        // message only.
        let detail = match &self {
            AppError::PriceValidation(_) | AppError::Provider { .. } | AppError::ProviderTimeout => {
                message.clone()
            }
            _ => self.to_string(),
        };

        let body = ApiResponse {
            message,
            data: Some(ErrorData { error: detail }),
            meta: None,
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
