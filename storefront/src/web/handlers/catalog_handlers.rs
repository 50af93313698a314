// storefront/src/web/handlers/catalog_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Serialize;
use serde_json::json;
use storefront_core::models::{format_vnd, Product};
use storefront_core::SortOrder;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

/// A product as the catalog page shows it.
#[derive(Debug, Serialize)]
pub struct CatalogEntry {
  #[serde(flatten)]
  pub product: Product,
  #[serde(rename = "displayPrice")]
  pub display_price: String,
}

impl From<Product> for CatalogEntry {
  fn from(product: Product) -> Self {
    let display_price = format_vnd(product.price);
    CatalogEntry { product, display_price }
  }
}

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let products = app_state.store.list_products(SortOrder::IdAscending).await?;
  info!("Fetched {} products.", products.len());

  let entries: Vec<CatalogEntry> = products.into_iter().map(CatalogEntry::from).collect();
  Ok(HttpResponse::Ok().json(json!({ "products": entries })))
}
