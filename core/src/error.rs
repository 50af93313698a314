// core/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShopError {
  /// A required field was blank or malformed. Raised before any store call.
  #[error("Validation error: {0}")]
  Validation(String),

  #[error("Cart is empty")]
  EmptyCart,

  #[error("No row with id {id} in table '{table}'")]
  NotFound { table: &'static str, id: i64 },

  #[error("Store operation '{operation}' failed. Source: {source}")]
  Store {
    operation: &'static str,
    #[source]
    source: AnyhowError,
  },

  /// The order header was committed but its detail rows were not.
  #[error("Order {order_id} was recorded without its line items. Source: {source}")]
  PartialOrder {
    order_id: i64,
    #[source]
    source: Box<ShopError>,
  },

  #[error("Local storage error: {0}")]
  Storage(String),

  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  #[error("Internal error: {0}")]
  Internal(String),
}

impl ShopError {
  pub fn store(operation: &'static str, source: impl Into<AnyhowError>) -> Self {
    ShopError::Store {
      operation,
      source: source.into(),
    }
  }

  /// The single line shown to a shopper or admin. Store failures are not
  /// distinguished beyond "could not save" / "could not load".
  pub fn user_message(&self) -> String {
    match self {
      ShopError::Validation(m) => m.clone(),
      ShopError::EmptyCart => "Your cart is empty.".to_string(),
      ShopError::NotFound { .. } => "The requested item no longer exists.".to_string(),
      ShopError::Store { operation, .. } if operation.starts_with("select") => "Could not load data.".to_string(),
      ShopError::Store { .. } | ShopError::PartialOrder { .. } => "Placing the order failed.".to_string(),
      ShopError::Storage(_) => "Could not save your cart on this device.".to_string(),
      _ => "Something went wrong.".to_string(),
    }
  }

  pub fn is_validation(&self) -> bool {
    matches!(self, ShopError::Validation(_) | ShopError::EmptyCart)
  }
}

impl From<sqlx::Error> for ShopError {
  fn from(err: sqlx::Error) -> Self {
    ShopError::store("sql", err)
  }
}

impl From<serde_json::Error> for ShopError {
  fn from(err: serde_json::Error) -> Self {
    ShopError::Storage(format!("malformed local storage document: {}", err))
  }
}

impl From<std::io::Error> for ShopError {
  fn from(err: std::io::Error) -> Self {
    ShopError::Storage(err.to_string())
  }
}

pub type ShopResult<T, E = ShopError> = std::result::Result<T, E>;
