// core/src/models/order_detail.rs

use super::product::ProductRef;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of the `order_details` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct OrderDetail {
  pub id: i64,
  pub order_id: i64,
  pub product_id: i64,
  pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderDetail {
  pub order_id: i64,
  pub product_id: i64,
  pub quantity: i32,
}

/// A detail row joined against `products`. `product` is `None` once the
/// referenced product has been deleted; prices are not snapshotted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetailView {
  pub id: i64,
  pub quantity: i32,
  pub product: Option<ProductRef>,
}

impl OrderDetailView {
  pub fn line_total(&self) -> i64 {
    self.product.as_ref().map_or(0, |p| p.price * i64::from(self.quantity))
  }

  pub fn product_name(&self) -> &str {
    self.product.as_ref().map_or("(deleted)", |p| p.name.as_str())
  }
}
