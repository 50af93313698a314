// core/src/models/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Stored as a small integer: 0 placed, 1 received, 2 delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub enum OrderStatus {
  #[default]
  Placed,
  Received,
  Delivered,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid order status {0}; expected 0, 1 or 2")]
pub struct InvalidStatus(pub i16);

impl TryFrom<i16> for OrderStatus {
  type Error = InvalidStatus;

  fn try_from(value: i16) -> Result<Self, Self::Error> {
    match value {
      0 => Ok(OrderStatus::Placed),
      1 => Ok(OrderStatus::Received),
      2 => Ok(OrderStatus::Delivered),
      other => Err(InvalidStatus(other)),
    }
  }
}

impl From<OrderStatus> for i16 {
  fn from(status: OrderStatus) -> Self {
    match status {
      OrderStatus::Placed => 0,
      OrderStatus::Received => 1,
      OrderStatus::Delivered => 2,
    }
  }
}

impl OrderStatus {
  /// Forward transition offered in the back-office; delivered stays delivered.
  pub fn next(self) -> OrderStatus {
    match self {
      OrderStatus::Placed => OrderStatus::Received,
      OrderStatus::Received | OrderStatus::Delivered => OrderStatus::Delivered,
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      OrderStatus::Placed => "Placed",
      OrderStatus::Received => "Received",
      OrderStatus::Delivered => "Delivered",
    }
  }
}

/// A row of the `orders` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Order {
  pub id: i64,
  pub customer_name: String,
  pub phone: String,
  pub address: String,
  pub note: Option<String>,
  /// Computed by the client at submission; never re-checked against the details.
  pub total_price: i64,
  #[sqlx(try_from = "i16")]
  pub status: OrderStatus,
  pub created_at: DateTime<Utc>,
}

/// Insert payload for `orders`; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
  pub customer_name: String,
  pub phone: String,
  pub address: String,
  #[serde(default)]
  pub note: Option<String>,
  pub total_price: i64,
  #[serde(default)]
  pub status: OrderStatus,
}

impl NewOrder {
  pub fn into_order(self, id: i64, created_at: DateTime<Utc>) -> Order {
    Order {
      id,
      customer_name: self.customer_name,
      phone: self.phone,
      address: self.address,
      note: self.note,
      total_price: self.total_price,
      status: self.status,
      created_at,
    }
  }
}
