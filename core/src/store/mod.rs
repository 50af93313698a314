// core/src/store/mod.rs

//! Access to the three remote tables. Every method is a single passthrough
//! call; nothing here validates, retries or spans two writes.

pub mod change;
pub mod memory;
pub mod postgres;

use crate::error::ShopResult;
use crate::models::{NewOrder, NewOrderDetail, NewProduct, Order, OrderDetail, OrderDetailView, OrderStatus, Product};
use async_trait::async_trait;

pub use change::{ChangeEvent, ChangeFeed, ChangeFilter, ChangeKind, ChangeSubscription, Notification, Table};
pub use memory::{MemoryStore, StoreOp};
pub use postgres::PgStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
  /// Store order, oldest id first. What the catalog uses.
  #[default]
  IdAscending,
  /// Newest first. What the back-office lists use.
  IdDescending,
}

/// The generic query client: one configured connection, built once at start-up
/// and handed to every consumer as `Arc<dyn Store>`.
///
/// Write methods that target a row by id return the number of rows affected;
/// zero is not an error, matching a filtered update/delete on a hosted store.
#[async_trait]
pub trait Store: Send + Sync + 'static {
  async fn list_products(&self, order: SortOrder) -> ShopResult<Vec<Product>>;

  async fn insert_product(&self, product: NewProduct) -> ShopResult<Product>;

  async fn delete_product(&self, id: i64) -> ShopResult<u64>;

  /// All orders, newest first.
  async fn list_orders(&self) -> ShopResult<Vec<Order>>;

  /// Inserts one order and hands back the stored row with its new id.
  async fn insert_order(&self, order: NewOrder) -> ShopResult<Order>;

  /// Inserts the batch in one call.
  async fn insert_order_details(&self, details: Vec<NewOrderDetail>) -> ShopResult<Vec<OrderDetail>>;

  /// Touches only `status`.
  async fn update_order_status(&self, id: i64, status: OrderStatus) -> ShopResult<u64>;

  async fn delete_order(&self, id: i64) -> ShopResult<u64>;

  /// Detail rows of one order joined against `products` by `product_id`.
  async fn list_order_details(&self, order_id: i64) -> ShopResult<Vec<OrderDetailView>>;

  /// Opens a realtime channel for the rows matching `filter`.
  async fn subscribe(&self, filter: ChangeFilter) -> ShopResult<ChangeSubscription>;
}
