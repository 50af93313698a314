// core/src/models/product.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of the `products` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Product {
  pub id: i64,
  pub name: String,
  /// Whole VND, never negative.
  pub price: i64,
  #[serde(default)]
  pub image_url: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

/// Insert payload for `products`; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
  pub name: String,
  pub price: i64,
  #[serde(default)]
  pub image_url: String,
  #[serde(default)]
  pub description: Option<String>,
}

impl NewProduct {
  pub fn into_product(self, id: i64) -> Product {
    Product {
      id,
      name: self.name,
      price: self.price,
      image_url: self.image_url,
      description: self.description,
    }
  }
}

/// The slice of a product the admin detail view joins in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
  pub id: i64,
  pub name: String,
  pub price: i64,
}

impl From<&Product> for ProductRef {
  fn from(p: &Product) -> Self {
    ProductRef {
      id: p.id,
      name: p.name.clone(),
      price: p.price,
    }
  }
}
