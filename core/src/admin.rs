// core/src/admin.rs

//! Back-office operations. Each call is one store round-trip with no local
//! bookkeeping; lists are expected to refresh through a `LiveListing`. Status
//! changes go through a two-phase request/confirm, everything else runs
//! immediately.

use crate::checkout::{validate_contact, CheckoutPolicy};
use crate::error::{ShopError, ShopResult};
use crate::models::{NewOrder, NewProduct, Order, OrderDetailView, OrderStatus, Product};
use crate::store::{SortOrder, Store};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Clone)]
pub struct AdminConsole {
  store: Arc<dyn Store>,
  utc_offset_hours: i32,
}

impl AdminConsole {
  /// `utc_offset_hours` decides where "today" starts for the dashboard.
  pub fn new(store: Arc<dyn Store>, utc_offset_hours: i32) -> Self {
    Self { store, utc_offset_hours }
  }

  pub fn store(&self) -> &Arc<dyn Store> {
    &self.store
  }

  pub async fn list_products(&self) -> ShopResult<Vec<Product>> {
    self.store.list_products(SortOrder::IdDescending).await
  }

  #[instrument(name = "admin::add_product", skip(self, product), fields(name = %product.name))]
  pub async fn add_product(&self, product: NewProduct) -> ShopResult<Product> {
    if product.name.trim().is_empty() {
      return Err(ShopError::Validation("Product name is required.".to_string()));
    }
    if product.price < 0 {
      return Err(ShopError::Validation("Price cannot be negative.".to_string()));
    }
    let stored = self
      .store
      .insert_product(NewProduct {
        name: product.name.trim().to_string(),
        ..product
      })
      .await?;
    info!(product_id = stored.id, "Product added.");
    Ok(stored)
  }

  #[instrument(name = "admin::delete_product", skip(self))]
  pub async fn delete_product(&self, id: i64) -> ShopResult<()> {
    let removed = self.store.delete_product(id).await?;
    if removed == 0 {
      return Err(ShopError::NotFound { table: "products", id });
    }
    info!("Product deleted.");
    Ok(())
  }

  pub async fn list_orders(&self) -> ShopResult<Vec<Order>> {
    self.store.list_orders().await
  }

  /// Manual order entry. Name, phone and address are required; the total is
  /// taken as typed.
  #[instrument(name = "admin::add_order", skip(self, order), fields(status = ?order.status))]
  pub async fn add_order(&self, order: NewOrder) -> ShopResult<Order> {
    validate_contact(&order.customer_name, &order.phone, &order.address, &CheckoutPolicy::default())?;
    if order.total_price < 0 {
      return Err(ShopError::Validation("Total cannot be negative.".to_string()));
    }
    let note = order.note.filter(|n| !n.trim().is_empty());
    let stored = self.store.insert_order(NewOrder { note, ..order }).await?;
    info!(order_id = stored.id, "Order added manually.");
    Ok(stored)
  }

  /// Stages a status change. Nothing is written until the returned request is
  /// confirmed.
  pub fn request_status_change(&self, order_id: i64, status: OrderStatus) -> PendingStatusChange {
    PendingStatusChange {
      store: Arc::clone(&self.store),
      order_id,
      status,
    }
  }

  #[instrument(name = "admin::delete_order", skip(self))]
  pub async fn delete_order(&self, id: i64) -> ShopResult<()> {
    let removed = self.store.delete_order(id).await?;
    if removed == 0 {
      return Err(ShopError::NotFound { table: "orders", id });
    }
    info!("Order deleted.");
    Ok(())
  }

  pub async fn order_details(&self, order_id: i64) -> ShopResult<Vec<OrderDetailView>> {
    self.store.list_order_details(order_id).await
  }

  pub async fn dashboard(&self) -> ShopResult<OrderDashboard> {
    let orders = self.store.list_orders().await?;
    Ok(OrderDashboard::from_orders(&orders, Utc::now(), self.utc_offset_hours))
  }
}

/// A status change waiting for the admin's confirmation.
#[must_use = "a status change does nothing until confirmed"]
pub struct PendingStatusChange {
  store: Arc<dyn Store>,
  order_id: i64,
  status: OrderStatus,
}

impl PendingStatusChange {
  pub fn order_id(&self) -> i64 {
    self.order_id
  }

  pub fn status(&self) -> OrderStatus {
    self.status
  }

  /// Writes the new status. Only `status` on the one row is touched.
  #[instrument(name = "admin::confirm_status_change", skip(self), fields(order_id = self.order_id, status = ?self.status))]
  pub async fn confirm(self) -> ShopResult<()> {
    let updated = self.store.update_order_status(self.order_id, self.status).await?;
    if updated == 0 {
      warn!("Status change matched no order.");
      return Err(ShopError::NotFound {
        table: "orders",
        id: self.order_id,
      });
    }
    info!("Order status updated.");
    Ok(())
  }

  pub fn cancel(self) {
    info!(order_id = self.order_id, "Status change cancelled.");
  }
}

/// Headline numbers for the orders page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDashboard {
  pub orders: usize,
  /// Sum of `total_price` over orders created today in the store's timezone.
  pub revenue_today: i64,
  pub delivered: usize,
}

impl OrderDashboard {
  pub fn from_orders(orders: &[Order], now: DateTime<Utc>, utc_offset_hours: i32) -> Self {
    let offset = FixedOffset::east_opt(utc_offset_hours * 3600).unwrap_or_else(|| Utc.fix());
    let today = now.with_timezone(&offset).date_naive();

    OrderDashboard {
      orders: orders.len(),
      revenue_today: orders
        .iter()
        .filter(|o| o.created_at.with_timezone(&offset).date_naive() == today)
        .fold(0i64, |acc, o| acc.saturating_add(o.total_price)),
      delivered: orders.iter().filter(|o| o.status == OrderStatus::Delivered).count(),
    }
  }
}
