// core/src/store/postgres.rs

//! The hosted relational store, reached with runtime `sqlx` queries. Row
//! changes are announced by a trigger through `pg_notify` and relayed to
//! subscribers by one background `PgListener`.

use super::change::{ChangeEvent, ChangeFeed, ChangeFilter, ChangeSubscription};
use super::{SortOrder, Store};
use crate::error::{ShopError, ShopResult};
use crate::models::{
  NewOrder, NewOrderDetail, NewProduct, Order, OrderDetail, OrderDetailView, OrderStatus, Product, ProductRef,
};
use async_trait::async_trait;
use sqlx::postgres::{PgListener, PgPool};
use sqlx::Row;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

/// NOTIFY channel the trigger publishes on.
pub const CHANGE_CHANNEL: &str = "storefront_changes";

/// Tables plus the change trigger. Idempotent.
///
/// `order_details.product_id` deliberately has no foreign key: deleting a
/// product leaves its detail rows in place and the joined view shows a
/// placeholder.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS products (
  id BIGSERIAL PRIMARY KEY,
  name TEXT NOT NULL,
  price BIGINT NOT NULL CHECK (price >= 0),
  image_url TEXT NOT NULL DEFAULT '',
  description TEXT
);

CREATE TABLE IF NOT EXISTS orders (
  id BIGSERIAL PRIMARY KEY,
  customer_name TEXT NOT NULL,
  phone TEXT NOT NULL,
  address TEXT NOT NULL,
  note TEXT,
  total_price BIGINT NOT NULL,
  status SMALLINT NOT NULL DEFAULT 0,
  created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS order_details (
  id BIGSERIAL PRIMARY KEY,
  order_id BIGINT NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
  product_id BIGINT NOT NULL,
  quantity INTEGER NOT NULL CHECK (quantity > 0)
);

CREATE OR REPLACE FUNCTION storefront_notify_change() RETURNS trigger AS $$
DECLARE
  row_data RECORD;
BEGIN
  IF TG_OP = 'DELETE' THEN
    row_data := OLD;
  ELSE
    row_data := NEW;
  END IF;
  PERFORM pg_notify(
    'storefront_changes',
    json_build_object(
      'table', TG_TABLE_NAME,
      'event', TG_OP,
      'id', (to_jsonb(row_data) ->> 'id')::bigint,
      'order_id', (to_jsonb(row_data) ->> 'order_id')::bigint
    )::text
  );
  RETURN row_data;
END;
$$ LANGUAGE plpgsql;

DROP TRIGGER IF EXISTS products_notify_change ON products;
CREATE TRIGGER products_notify_change AFTER INSERT OR UPDATE OR DELETE ON products
  FOR EACH ROW EXECUTE FUNCTION storefront_notify_change();

DROP TRIGGER IF EXISTS orders_notify_change ON orders;
CREATE TRIGGER orders_notify_change AFTER INSERT OR UPDATE OR DELETE ON orders
  FOR EACH ROW EXECUTE FUNCTION storefront_notify_change();

DROP TRIGGER IF EXISTS order_details_notify_change ON order_details;
CREATE TRIGGER order_details_notify_change AFTER INSERT OR UPDATE OR DELETE ON order_details
  FOR EACH ROW EXECUTE FUNCTION storefront_notify_change();
"#;

const PRODUCT_COLUMNS: &str = "id, name, price, image_url, description";
const ORDER_COLUMNS: &str = "id, customer_name, phone, address, note, total_price, status, created_at";

pub struct PgStore {
  pool: PgPool,
  feed: ChangeFeed,
  relay: JoinHandle<()>,
}

impl PgStore {
  /// Connects the pool and starts relaying change notifications.
  pub async fn connect(database_url: &str) -> ShopResult<Self> {
    let pool = PgPool::connect(database_url)
      .await
      .map_err(|e| ShopError::store("connect", e))?;
    Self::with_pool(pool).await
  }

  pub async fn with_pool(pool: PgPool) -> ShopResult<Self> {
    let mut listener = PgListener::connect_with(&pool)
      .await
      .map_err(|e| ShopError::store("listen", e))?;
    listener
      .listen(CHANGE_CHANNEL)
      .await
      .map_err(|e| ShopError::store("listen", e))?;

    let feed = ChangeFeed::default();
    let relay = tokio::spawn(relay_notifications(listener, feed.clone()));
    info!(channel = CHANGE_CHANNEL, "Listening for row changes.");
    Ok(Self { pool, feed, relay })
  }

  pub async fn apply_schema(&self) -> ShopResult<()> {
    sqlx::raw_sql(SCHEMA_SQL)
      .execute(&self.pool)
      .await
      .map_err(|e| ShopError::store("apply schema", e))?;
    info!("Schema applied.");
    Ok(())
  }

  pub fn pool(&self) -> &PgPool {
    &self.pool
  }
}

impl Drop for PgStore {
  fn drop(&mut self) {
    self.relay.abort();
  }
}

async fn relay_notifications(mut listener: PgListener, feed: ChangeFeed) {
  loop {
    match listener.recv().await {
      Ok(notification) => match serde_json::from_str::<ChangeEvent>(notification.payload()) {
        Ok(event) => feed.publish(event),
        Err(e) => warn!(error = %e, payload = notification.payload(), "Ignoring malformed change payload."),
      },
      Err(e) => {
        // The listener reconnects on the next recv.
        error!(error = %e, "Change listener lost its connection; retrying.");
        tokio::time::sleep(Duration::from_secs(1)).await;
      }
    }
  }
}

#[async_trait]
impl Store for PgStore {
  #[instrument(name = "pg_store::list_products", skip(self))]
  async fn list_products(&self, order: SortOrder) -> ShopResult<Vec<Product>> {
    let direction = match order {
      SortOrder::IdAscending => "ASC",
      SortOrder::IdDescending => "DESC",
    };
    let sql = format!("SELECT {} FROM products ORDER BY id {}", PRODUCT_COLUMNS, direction);
    sqlx::query_as::<_, Product>(&sql)
      .fetch_all(&self.pool)
      .await
      .map_err(|e| ShopError::store("select products", e))
  }

  #[instrument(name = "pg_store::insert_product", skip(self, product), fields(name = %product.name))]
  async fn insert_product(&self, product: NewProduct) -> ShopResult<Product> {
    let sql = format!(
      "INSERT INTO products (name, price, image_url, description) VALUES ($1, $2, $3, $4) RETURNING {}",
      PRODUCT_COLUMNS
    );
    sqlx::query_as::<_, Product>(&sql)
      .bind(&product.name)
      .bind(product.price)
      .bind(&product.image_url)
      .bind(&product.description)
      .fetch_one(&self.pool)
      .await
      .map_err(|e| ShopError::store("insert products", e))
  }

  #[instrument(name = "pg_store::delete_product", skip(self))]
  async fn delete_product(&self, id: i64) -> ShopResult<u64> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await
      .map_err(|e| ShopError::store("delete products", e))?;
    Ok(result.rows_affected())
  }

  #[instrument(name = "pg_store::list_orders", skip(self))]
  async fn list_orders(&self) -> ShopResult<Vec<Order>> {
    let sql = format!("SELECT {} FROM orders ORDER BY id DESC", ORDER_COLUMNS);
    sqlx::query_as::<_, Order>(&sql)
      .fetch_all(&self.pool)
      .await
      .map_err(|e| ShopError::store("select orders", e))
  }

  #[instrument(name = "pg_store::insert_order", skip(self, order), fields(total_price = order.total_price))]
  async fn insert_order(&self, order: NewOrder) -> ShopResult<Order> {
    let sql = format!(
      "INSERT INTO orders (customer_name, phone, address, note, total_price, status) \
       VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
      ORDER_COLUMNS
    );
    sqlx::query_as::<_, Order>(&sql)
      .bind(&order.customer_name)
      .bind(&order.phone)
      .bind(&order.address)
      .bind(&order.note)
      .bind(order.total_price)
      .bind(i16::from(order.status))
      .fetch_one(&self.pool)
      .await
      .map_err(|e| ShopError::store("insert orders", e))
  }

  #[instrument(name = "pg_store::insert_order_details", skip(self, details), fields(rows = details.len()))]
  async fn insert_order_details(&self, details: Vec<NewOrderDetail>) -> ShopResult<Vec<OrderDetail>> {
    let order_ids: Vec<i64> = details.iter().map(|d| d.order_id).collect();
    let product_ids: Vec<i64> = details.iter().map(|d| d.product_id).collect();
    let quantities: Vec<i32> = details.iter().map(|d| d.quantity).collect();

    sqlx::query_as::<_, OrderDetail>(
      "INSERT INTO order_details (order_id, product_id, quantity) \
       SELECT * FROM UNNEST($1::bigint[], $2::bigint[], $3::int[]) \
       RETURNING id, order_id, product_id, quantity",
    )
    .bind(order_ids)
    .bind(product_ids)
    .bind(quantities)
    .fetch_all(&self.pool)
    .await
    .map_err(|e| ShopError::store("insert order_details", e))
  }

  #[instrument(name = "pg_store::update_order_status", skip(self))]
  async fn update_order_status(&self, id: i64, status: OrderStatus) -> ShopResult<u64> {
    let result = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
      .bind(id)
      .bind(i16::from(status))
      .execute(&self.pool)
      .await
      .map_err(|e| ShopError::store("update orders", e))?;
    Ok(result.rows_affected())
  }

  #[instrument(name = "pg_store::delete_order", skip(self))]
  async fn delete_order(&self, id: i64) -> ShopResult<u64> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await
      .map_err(|e| ShopError::store("delete orders", e))?;
    Ok(result.rows_affected())
  }

  #[instrument(name = "pg_store::list_order_details", skip(self))]
  async fn list_order_details(&self, order_id: i64) -> ShopResult<Vec<OrderDetailView>> {
    let rows = sqlx::query(
      "SELECT d.id, d.quantity, p.id AS product_id, p.name AS product_name, p.price AS product_price \
       FROM order_details d LEFT JOIN products p ON p.id = d.product_id \
       WHERE d.order_id = $1 ORDER BY d.id",
    )
    .bind(order_id)
    .fetch_all(&self.pool)
    .await
    .map_err(|e| ShopError::store("select order_details", e))?;

    rows
      .into_iter()
      .map(|row| {
        let product_id: Option<i64> = row.try_get("product_id")?;
        let product = match product_id {
          Some(id) => Some(ProductRef {
            id,
            name: row.try_get("product_name")?,
            price: row.try_get("product_price")?,
          }),
          None => None,
        };
        Ok(OrderDetailView {
          id: row.try_get("id")?,
          quantity: row.try_get("quantity")?,
          product,
        })
      })
      .collect::<Result<Vec<_>, sqlx::Error>>()
      .map_err(|e| ShopError::store("select order_details", e))
  }

  async fn subscribe(&self, filter: ChangeFilter) -> ShopResult<ChangeSubscription> {
    Ok(self.feed.subscribe(filter))
  }
}
