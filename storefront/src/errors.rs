// storefront/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use storefront_core::ShopError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error(transparent)]
  Shop(#[from] ShopError),

  #[error("Configuration Error: {0}")]
  Config(String),

  /// A status change was submitted without the admin confirming it.
  #[error("Status change for order {order_id} was not confirmed.")]
  Unconfirmed { order_id: i64 },
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Shop(e) if e.is_validation() => StatusCode::BAD_REQUEST,
      AppError::Shop(ShopError::NotFound { .. }) => StatusCode::NOT_FOUND,
      AppError::Unconfirmed { .. } => StatusCode::CONFLICT,
      AppError::Shop(_) | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    tracing::error!(application_error = %self, "Responding with error");
    let body = match self {
      AppError::Shop(ShopError::PartialOrder { order_id, .. }) => {
        json!({"error": self.user_message(), "orderId": order_id})
      }
      _ => json!({"error": self.user_message()}),
    };
    HttpResponse::build(self.status_code()).json(body)
  }
}

impl AppError {
  /// The flat message clients show; internals stay in the log.
  pub fn user_message(&self) -> String {
    match self {
      AppError::Shop(e) => e.user_message(),
      AppError::Config(_) => "Configuration issue".to_string(),
      AppError::Unconfirmed { .. } => "Status change must be confirmed.".to_string(),
    }
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
