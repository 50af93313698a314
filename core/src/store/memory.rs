// core/src/store/memory.rs

//! An in-process store with the same observable contract as the hosted one:
//! store-assigned ids and timestamps, row-change notifications after every
//! write, and no transactions. Used for local runs and tests. Failures can be
//! scripted per operation to exercise the partial-order path.

use super::change::{ChangeEvent, ChangeFeed, ChangeFilter, ChangeKind, ChangeSubscription, Table};
use super::{SortOrder, Store};
use crate::error::{ShopError, ShopResult};
use crate::models::{
  NewOrder, NewOrderDetail, NewProduct, Order, OrderDetail, OrderDetailView, OrderStatus, Product, ProductRef,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, instrument, warn};

/// Names a store call, for scripted failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
  ListProducts,
  InsertProduct,
  DeleteProduct,
  ListOrders,
  InsertOrder,
  InsertOrderDetails,
  UpdateOrderStatus,
  DeleteOrder,
  ListOrderDetails,
}

impl StoreOp {
  fn operation_name(self) -> &'static str {
    match self {
      StoreOp::ListProducts => "select products",
      StoreOp::InsertProduct => "insert products",
      StoreOp::DeleteProduct => "delete products",
      StoreOp::ListOrders => "select orders",
      StoreOp::InsertOrder => "insert orders",
      StoreOp::InsertOrderDetails => "insert order_details",
      StoreOp::UpdateOrderStatus => "update orders",
      StoreOp::DeleteOrder => "delete orders",
      StoreOp::ListOrderDetails => "select order_details",
    }
  }
}

#[derive(Default)]
struct Tables {
  products: BTreeMap<i64, Product>,
  orders: BTreeMap<i64, Order>,
  order_details: BTreeMap<i64, OrderDetail>,
  next_product_id: i64,
  next_order_id: i64,
  next_detail_id: i64,
}

impl Tables {
  fn bump(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
  }
}

#[derive(Default)]
pub struct MemoryStore {
  tables: RwLock<Tables>,
  feed: ChangeFeed,
  scripted_failures: Mutex<HashSet<StoreOp>>,
  writes: AtomicUsize,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Makes the next call of `op` fail with a store error.
  pub fn fail_next(&self, op: StoreOp) {
    self.scripted_failures.lock().insert(op);
  }

  /// Number of write calls that reached the tables.
  pub fn write_count(&self) -> usize {
    self.writes.load(Ordering::SeqCst)
  }

  pub fn order_details_snapshot(&self) -> Vec<OrderDetail> {
    self.tables.read().order_details.values().cloned().collect()
  }

  /// Inserts a starter catalog, one notification per row.
  pub async fn seed_products(&self, products: Vec<NewProduct>) -> ShopResult<Vec<Product>> {
    let mut seeded = Vec::with_capacity(products.len());
    for product in products {
      seeded.push(self.insert_product(product).await?);
    }
    Ok(seeded)
  }

  fn check_scripted(&self, op: StoreOp) -> ShopResult<()> {
    if self.scripted_failures.lock().remove(&op) {
      warn!(operation = op.operation_name(), "Scripted store failure.");
      return Err(ShopError::store(
        op.operation_name(),
        anyhow::anyhow!("scripted failure for {:?}", op),
      ));
    }
    Ok(())
  }

  fn record_write(&self) {
    self.writes.fetch_add(1, Ordering::SeqCst);
  }

  fn notify(&self, table: Table, kind: ChangeKind, id: i64, order_id: Option<i64>) {
    self.feed.publish(ChangeEvent {
      table,
      kind,
      id,
      order_id,
    });
  }
}

#[async_trait]
impl Store for MemoryStore {
  #[instrument(name = "memory_store::list_products", skip(self))]
  async fn list_products(&self, order: SortOrder) -> ShopResult<Vec<Product>> {
    self.check_scripted(StoreOp::ListProducts)?;
    let tables = self.tables.read();
    let mut products: Vec<Product> = tables.products.values().cloned().collect();
    if order == SortOrder::IdDescending {
      products.reverse();
    }
    Ok(products)
  }

  #[instrument(name = "memory_store::insert_product", skip(self, product), fields(name = %product.name))]
  async fn insert_product(&self, product: NewProduct) -> ShopResult<Product> {
    self.check_scripted(StoreOp::InsertProduct)?;
    let stored = {
      let mut tables = self.tables.write();
      let id = Tables::bump(&mut tables.next_product_id);
      let stored = product.into_product(id);
      tables.products.insert(id, stored.clone());
      stored
    };
    self.record_write();
    self.notify(Table::Products, ChangeKind::Insert, stored.id, None);
    debug!(product_id = stored.id, "Product inserted.");
    Ok(stored)
  }

  #[instrument(name = "memory_store::delete_product", skip(self))]
  async fn delete_product(&self, id: i64) -> ShopResult<u64> {
    self.check_scripted(StoreOp::DeleteProduct)?;
    let removed = self.tables.write().products.remove(&id).is_some();
    self.record_write();
    if removed {
      self.notify(Table::Products, ChangeKind::Delete, id, None);
    }
    Ok(u64::from(removed))
  }

  #[instrument(name = "memory_store::list_orders", skip(self))]
  async fn list_orders(&self) -> ShopResult<Vec<Order>> {
    self.check_scripted(StoreOp::ListOrders)?;
    Ok(self.tables.read().orders.values().rev().cloned().collect())
  }

  #[instrument(name = "memory_store::insert_order", skip(self, order), fields(total_price = order.total_price))]
  async fn insert_order(&self, order: NewOrder) -> ShopResult<Order> {
    self.check_scripted(StoreOp::InsertOrder)?;
    let stored = {
      let mut tables = self.tables.write();
      let id = Tables::bump(&mut tables.next_order_id);
      let stored = order.into_order(id, Utc::now());
      tables.orders.insert(id, stored.clone());
      stored
    };
    self.record_write();
    self.notify(Table::Orders, ChangeKind::Insert, stored.id, None);
    Ok(stored)
  }

  #[instrument(name = "memory_store::insert_order_details", skip(self, details), fields(rows = details.len()))]
  async fn insert_order_details(&self, details: Vec<NewOrderDetail>) -> ShopResult<Vec<OrderDetail>> {
    self.check_scripted(StoreOp::InsertOrderDetails)?;
    let stored: Vec<OrderDetail> = {
      let mut tables = self.tables.write();
      details
        .into_iter()
        .map(|d| {
          let id = Tables::bump(&mut tables.next_detail_id);
          let row = OrderDetail {
            id,
            order_id: d.order_id,
            product_id: d.product_id,
            quantity: d.quantity,
          };
          tables.order_details.insert(id, row.clone());
          row
        })
        .collect()
    };
    self.record_write();
    for row in &stored {
      self.notify(Table::OrderDetails, ChangeKind::Insert, row.id, Some(row.order_id));
    }
    Ok(stored)
  }

  #[instrument(name = "memory_store::update_order_status", skip(self))]
  async fn update_order_status(&self, id: i64, status: OrderStatus) -> ShopResult<u64> {
    self.check_scripted(StoreOp::UpdateOrderStatus)?;
    let updated = match self.tables.write().orders.get_mut(&id) {
      Some(order) => {
        order.status = status;
        true
      }
      None => false,
    };
    self.record_write();
    if updated {
      self.notify(Table::Orders, ChangeKind::Update, id, None);
    }
    Ok(u64::from(updated))
  }

  /// Detail rows go with their order, like `ON DELETE CASCADE`.
  #[instrument(name = "memory_store::delete_order", skip(self))]
  async fn delete_order(&self, id: i64) -> ShopResult<u64> {
    self.check_scripted(StoreOp::DeleteOrder)?;
    let (removed, cascaded) = {
      let mut tables = self.tables.write();
      let removed = tables.orders.remove(&id).is_some();
      let cascaded: Vec<i64> = tables
        .order_details
        .values()
        .filter(|d| d.order_id == id)
        .map(|d| d.id)
        .collect();
      for detail_id in &cascaded {
        tables.order_details.remove(detail_id);
      }
      (removed, cascaded)
    };
    self.record_write();
    for detail_id in cascaded {
      self.notify(Table::OrderDetails, ChangeKind::Delete, detail_id, Some(id));
    }
    if removed {
      self.notify(Table::Orders, ChangeKind::Delete, id, None);
    }
    Ok(u64::from(removed))
  }

  #[instrument(name = "memory_store::list_order_details", skip(self))]
  async fn list_order_details(&self, order_id: i64) -> ShopResult<Vec<OrderDetailView>> {
    self.check_scripted(StoreOp::ListOrderDetails)?;
    let tables = self.tables.read();
    Ok(
      tables
        .order_details
        .values()
        .filter(|d| d.order_id == order_id)
        .map(|d| OrderDetailView {
          id: d.id,
          quantity: d.quantity,
          product: tables.products.get(&d.product_id).map(ProductRef::from),
        })
        .collect(),
    )
  }

  async fn subscribe(&self, filter: ChangeFilter) -> ShopResult<ChangeSubscription> {
    Ok(self.feed.subscribe(filter))
  }
}
