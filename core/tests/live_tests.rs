// tests/live_tests.rs
mod common;

use common::*;
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;
use storefront_core::models::{NewOrderDetail, OrderStatus};
use storefront_core::store::{ChangeFilter, Notification, StoreOp, Table};
use storefront_core::{AdminConsole, LiveListing, MemoryStore, SortOrder, Store};

const WAIT: Duration = Duration::from_secs(2);

fn detail(order_id: i64, product_id: i64) -> NewOrderDetail {
  NewOrderDetail {
    order_id,
    product_id,
    quantity: 1,
  }
}

#[tokio::test]
#[serial]
async fn test_order_listing_refetches_after_each_change() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let console = AdminConsole::new(store.clone(), 7);

  let mut listing = LiveListing::orders(store.clone()).await.unwrap();
  let initial = tokio::time::timeout(WAIT, listing.wait_for_revision(1)).await.unwrap().unwrap();
  assert!(initial.rows.is_empty());

  let order = console
    .add_order(storefront_core::models::NewOrder {
      customer_name: "An".to_string(),
      phone: "0912345678".to_string(),
      address: "1 Main St".to_string(),
      note: None,
      total_price: 5_000,
      status: OrderStatus::Placed,
    })
    .await
    .unwrap();
  let after_insert = tokio::time::timeout(WAIT, listing.wait_for_revision(2)).await.unwrap().unwrap();
  assert_eq!(after_insert.rows.len(), 1);

  console
    .request_status_change(order.id, OrderStatus::Received)
    .confirm()
    .await
    .unwrap();
  let after_update = tokio::time::timeout(WAIT, listing.wait_for_revision(3)).await.unwrap().unwrap();
  assert_eq!(after_update.rows[0].status, OrderStatus::Received);

  console.delete_order(order.id).await.unwrap();
  let after_delete = tokio::time::timeout(WAIT, listing.wait_for_revision(4)).await.unwrap().unwrap();
  assert!(after_delete.rows.is_empty());
}

#[tokio::test]
#[serial]
async fn test_detail_listing_ignores_other_orders() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());

  let mut subscription = store.subscribe(ChangeFilter::details_of(1)).await.unwrap();
  store.insert_order_details(vec![detail(2, 10)]).await.unwrap();
  store.insert_order_details(vec![detail(1, 11)]).await.unwrap();

  match tokio::time::timeout(WAIT, subscription.next()).await.unwrap() {
    Some(Notification::Change(event)) => {
      assert_eq!(event.table, Table::OrderDetails);
      assert_eq!(event.order_id, Some(1));
    }
    other => panic!("expected a change for order 1, got {:?}", other),
  }

  let mut listing = LiveListing::order_details(store.clone(), 1).await.unwrap();
  let first = tokio::time::timeout(WAIT, listing.wait_for_revision(1)).await.unwrap().unwrap();
  assert_eq!(first.rows.len(), 1);

  store.insert_order_details(vec![detail(2, 12)]).await.unwrap();
  store.insert_order_details(vec![detail(1, 13)]).await.unwrap();
  let second = tokio::time::timeout(WAIT, listing.wait_for_revision(2)).await.unwrap().unwrap();
  assert_eq!(second.rows.len(), 2);

  // Only one refetch happened: the change to order 2 was filtered out.
  tokio::time::sleep(Duration::from_millis(50)).await;
  assert_eq!(listing.snapshot().revision, 2);
}

#[tokio::test]
#[serial]
async fn test_failed_refetch_keeps_previous_rows() {
  setup_tracing();
  let (store, products) = seeded_store().await;
  let mut listing = LiveListing::products(store.clone(), SortOrder::IdAscending).await.unwrap();
  let first = tokio::time::timeout(WAIT, listing.wait_for_revision(1)).await.unwrap().unwrap();
  assert_eq!(first.rows, products);

  store.fail_next(StoreOp::ListProducts);
  store.delete_product(products[0].id).await.unwrap();
  let failed = tokio::time::timeout(WAIT, listing.wait_for_revision(2)).await.unwrap().unwrap();
  assert_eq!(failed.rows, products);
  assert_eq!(failed.error.as_deref(), Some("Could not load data."));

  store.insert_product(new_product("Juice", 30_000)).await.unwrap();
  let recovered = tokio::time::timeout(WAIT, listing.wait_for_revision(3)).await.unwrap().unwrap();
  assert_eq!(recovered.rows.len(), 3);
  assert!(recovered.error.is_none());
}

#[tokio::test]
#[serial]
async fn test_dropping_listing_releases_subscription() {
  setup_tracing();
  let store = Arc::new(MemoryStore::new());
  let mut listing = LiveListing::products(store.clone(), SortOrder::IdDescending).await.unwrap();
  tokio::time::timeout(WAIT, listing.wait_for_revision(1)).await.unwrap().unwrap();
  drop(listing);
  tokio::task::yield_now().await;

  // Writes after the listing is gone still succeed.
  store.insert_product(new_product("Tea", 25_000)).await.unwrap();
  assert_eq!(store.list_products(SortOrder::IdDescending).await.unwrap().len(), 1);
}
