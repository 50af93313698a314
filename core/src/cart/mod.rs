// core/src/cart/mod.rs

//! The shopper's cart: an ordered, quantity-keyed list of products. Lines are
//! unique per product id and never hold a quantity below one.

pub mod storage;

use crate::error::{ShopError, ShopResult};
use crate::models::Product;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

pub use storage::{CartStorage, FileCartStorage, MemoryCartStorage, CART_KEY};

/// One cart entry: the product as it was when added, plus a count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
  #[serde(flatten)]
  pub product: Product,
  pub quantity: i32,
}

impl CartLine {
  /// Saturates instead of overflowing; `checked_line_total` tells the two apart.
  pub fn line_total(&self) -> i64 {
    self.product.price.saturating_mul(i64::from(self.quantity))
  }

  pub fn checked_line_total(&self) -> Option<i64> {
    self.product.price.checked_mul(i64::from(self.quantity))
  }
}

fn quantity_overflow(product_id: i64) -> ShopError {
  ShopError::Validation(format!("Quantity for product {} is too large.", product_id))
}

/// What `Cart::reprice` changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepriceOutcome {
  /// Lines whose stored price differed from the catalog.
  pub repriced: Vec<i64>,
  /// Lines dropped because the product is gone from the catalog.
  pub dropped: Vec<i64>,
}

impl RepriceOutcome {
  pub fn is_unchanged(&self) -> bool {
    self.repriced.is_empty() && self.dropped.is_empty()
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
  lines: Vec<CartLine>,
}

impl Cart {
  pub fn new() -> Self {
    Self::default()
  }

  /// Builds a cart from raw lines, e.g. a request body. Lines with a quantity
  /// below one are dropped and repeated product ids are merged in first-seen
  /// order. A merged quantity that does not fit an `i32` is a validation error.
  pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> ShopResult<Self> {
    let mut cart = Cart::new();
    for line in lines.into_iter().filter(|l| l.quantity > 0) {
      match cart.lines.iter_mut().find(|l| l.product.id == line.product.id) {
        Some(existing) => {
          existing.quantity = existing
            .quantity
            .checked_add(line.quantity)
            .ok_or_else(|| quantity_overflow(line.product.id))?;
        }
        None => cart.lines.push(line),
      }
    }
    Ok(cart)
  }

  /// Adds one unit of `product` and returns the new quantity.
  pub fn add(&mut self, product: &Product) -> ShopResult<i32> {
    let quantity = match self.lines.iter_mut().find(|l| l.product.id == product.id) {
      Some(line) => {
        line.quantity = line.quantity.checked_add(1).ok_or_else(|| quantity_overflow(product.id))?;
        line.quantity
      }
      None => {
        self.lines.push(CartLine {
          product: product.clone(),
          quantity: 1,
        });
        1
      }
    };
    debug!(product_id = product.id, quantity, "Cart line added.");
    Ok(quantity)
  }

  /// Removes one unit; the line disappears when it reaches zero. Absent ids
  /// are ignored. Returns the remaining quantity.
  pub fn remove_one(&mut self, product_id: i64) -> i32 {
    let Some(idx) = self.lines.iter().position(|l| l.product.id == product_id) else {
      return 0;
    };
    if self.lines[idx].quantity <= 1 {
      self.lines.remove(idx);
      debug!(product_id, "Cart line removed.");
      0
    } else {
      self.lines[idx].quantity -= 1;
      self.lines[idx].quantity
    }
  }

  pub fn quantity_of(&self, product_id: i64) -> i32 {
    self
      .lines
      .iter()
      .find(|l| l.product.id == product_id)
      .map_or(0, |l| l.quantity)
  }

  /// Sum of the line totals, saturating at `i64::MAX`.
  pub fn total(&self) -> i64 {
    self.lines.iter().fold(0i64, |acc, l| acc.saturating_add(l.line_total()))
  }

  /// The exact total, or a validation error when it does not fit an `i64`.
  pub fn checked_total(&self) -> ShopResult<i64> {
    self
      .lines
      .iter()
      .try_fold(0i64, |acc, l| l.checked_line_total().and_then(|t| acc.checked_add(t)))
      .ok_or_else(|| ShopError::Validation("Order total is too large.".to_string()))
  }

  pub fn clear(&mut self) {
    self.lines.clear();
  }

  pub fn lines(&self) -> &[CartLine] {
    &self.lines
  }

  pub fn len(&self) -> usize {
    self.lines.len()
  }

  pub fn is_empty(&self) -> bool {
    self.lines.is_empty()
  }

  /// Brings every line in line with `catalog`: prices and names are refreshed,
  /// lines whose product no longer exists are dropped.
  pub fn reprice(&mut self, catalog: &[Product]) -> RepriceOutcome {
    let by_id: HashMap<i64, &Product> = catalog.iter().map(|p| (p.id, p)).collect();
    let mut outcome = RepriceOutcome::default();

    self.lines.retain_mut(|line| match by_id.get(&line.product.id) {
      Some(current) => {
        if line.product.price != current.price {
          outcome.repriced.push(line.product.id);
        }
        line.product = (*current).clone();
        true
      }
      None => {
        outcome.dropped.push(line.product.id);
        false
      }
    });
    outcome
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn product(id: i64, price: i64) -> Product {
    Product {
      id,
      name: format!("Product {}", id),
      price,
      image_url: String::new(),
      description: None,
    }
  }

  #[test]
  fn from_lines_merges_duplicates_and_drops_non_positive() {
    let cart = Cart::from_lines(vec![
      CartLine { product: product(1, 100), quantity: 2 },
      CartLine { product: product(2, 50), quantity: 0 },
      CartLine { product: product(1, 100), quantity: 1 },
      CartLine { product: product(3, 10), quantity: -4 },
    ])
    .unwrap();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart.quantity_of(1), 3);
    assert_eq!(cart.total(), 300);
  }

  #[test]
  fn reprice_refreshes_prices_and_drops_missing_products() {
    let mut cart = Cart::new();
    cart.add(&product(1, 100)).unwrap();
    cart.add(&product(2, 50)).unwrap();
    cart.add(&product(2, 50)).unwrap();

    let outcome = cart.reprice(&[product(2, 70)]);
    assert_eq!(outcome.dropped, vec![1]);
    assert_eq!(outcome.repriced, vec![2]);
    assert_eq!(cart.total(), 140);
    assert!(cart.reprice(&[product(2, 70)]).is_unchanged());
  }

  #[test]
  fn merged_quantity_overflow_is_rejected() {
    let err = Cart::from_lines(vec![
      CartLine { product: product(1, 100), quantity: i32::MAX },
      CartLine { product: product(1, 100), quantity: 1 },
    ])
    .unwrap_err();
    assert!(matches!(err, ShopError::Validation(_)));
  }

  #[test]
  fn add_past_i32_max_is_rejected() {
    let mut cart = Cart::from_lines(vec![CartLine { product: product(1, 1), quantity: i32::MAX }]).unwrap();
    assert!(matches!(cart.add(&product(1, 1)), Err(ShopError::Validation(_))));
    assert_eq!(cart.quantity_of(1), i32::MAX);
  }

  #[test]
  fn total_overflow_saturates_and_checked_total_rejects() {
    let cart = Cart::from_lines(vec![
      CartLine { product: product(1, i64::MAX / 2 + 1), quantity: 2 },
      CartLine { product: product(2, 10), quantity: 1 },
    ])
    .unwrap();
    assert_eq!(cart.total(), i64::MAX);
    assert!(matches!(cart.checked_total(), Err(ShopError::Validation(_))));

    let small = Cart::from_lines(vec![CartLine { product: product(2, 10), quantity: 3 }]).unwrap();
    assert_eq!(small.checked_total().unwrap(), 30);
  }

  #[test]
  fn line_json_is_flat() {
    let line = CartLine { product: product(4, 25), quantity: 2 };
    let json = serde_json::to_value(&line).unwrap();
    assert_eq!(json["id"], 4);
    assert_eq!(json["price"], 25);
    assert_eq!(json["quantity"], 2);
  }
}
