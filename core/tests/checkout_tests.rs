// tests/checkout_tests.rs
mod common;

use common::*;
use serial_test::serial;
use std::sync::Arc;
use storefront_core::models::OrderStatus;
use storefront_core::store::StoreOp;
use storefront_core::{
  build_place_order_pipeline, place_order, Cart, CartLine, CartStorage, CheckoutForm, CheckoutPolicy,
  MemoryCartStorage, ShopError, ShopResult, Storefront, Store,
};

/// Cart storage whose `clear` always fails; loads and saves go to memory.
struct StuckCartStorage {
  inner: MemoryCartStorage,
}

#[async_trait::async_trait]
impl CartStorage for StuckCartStorage {
  async fn load(&self) -> ShopResult<Option<Cart>> {
    self.inner.load().await
  }

  async fn save(&self, cart: &Cart) -> ShopResult<()> {
    self.inner.save(cart).await
  }

  async fn clear(&self) -> ShopResult<()> {
    Err(ShopError::Storage("device storage is read-only".to_string()))
  }
}

#[tokio::test]
#[serial]
async fn test_checkout_writes_header_then_one_detail_per_line() {
  setup_tracing();
  let mut shop = open_shop(CheckoutPolicy::default()).await;
  let (coffee, cake) = (shop.products[0].clone(), shop.products[2].clone());
  shop.storefront.add_to_cart(&coffee).await.unwrap();
  shop.storefront.add_to_cart(&coffee).await.unwrap();
  shop.storefront.add_to_cart(&cake).await.unwrap();
  let expected_total = shop.storefront.total();
  let writes_before = shop.store.write_count();

  let placement = shop.storefront.checkout(valid_form()).await.unwrap();

  assert_eq!(placement.order.total_price, expected_total);
  assert_eq!(placement.order.status, OrderStatus::Placed);
  assert_eq!(placement.details.len(), 2);
  assert_eq!(shop.store.write_count() - writes_before, 2);

  let orders = shop.store.list_orders().await.unwrap();
  assert_eq!(orders.len(), 1);
  let details = shop.store.order_details_snapshot();
  let quantities: Vec<(i64, i32)> = details.iter().map(|d| (d.product_id, d.quantity)).collect();
  assert_eq!(quantities, vec![(coffee.id, 2), (cake.id, 1)]);
  assert!(details.iter().all(|d| d.order_id == placement.order.id));

  // Cart is emptied locally and in storage.
  assert!(shop.storefront.cart().is_empty());
  assert!(shop.storage.load().await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn test_committed_order_is_reported_even_if_stored_cart_cannot_be_cleared() {
  setup_tracing();
  let (store, products) = seeded_store().await;
  let storage = Arc::new(StuckCartStorage {
    inner: MemoryCartStorage::new(),
  });
  let mut storefront = Storefront::open(
    store.clone() as Arc<dyn Store>,
    storage.clone(),
    Arc::new(build_place_order_pipeline(CheckoutPolicy::default())),
  )
  .await;
  storefront.add_to_cart(&products[1]).await.unwrap();

  let placement = storefront.checkout(valid_form()).await.unwrap();

  assert_eq!(placement.order.total_price, products[1].price);
  assert_eq!(placement.details.len(), 1);
  assert_eq!(store.list_orders().await.unwrap().len(), 1);
  assert!(storefront.cart().is_empty());
}

#[tokio::test]
#[serial]
async fn test_empty_cart_is_rejected_without_writes() {
  setup_tracing();
  let mut shop = open_shop(CheckoutPolicy::default()).await;
  let writes_before = shop.store.write_count();

  let err = shop.storefront.checkout(valid_form()).await.unwrap_err();

  assert!(matches!(err, ShopError::EmptyCart));
  assert_eq!(shop.store.write_count(), writes_before);
}

#[tokio::test]
#[serial]
async fn test_out_of_range_total_is_rejected_without_writes() {
  setup_tracing();
  let (store, products) = seeded_store().await;
  let mut pricey = products[0].clone();
  pricey.price = i64::MAX / 2 + 1;
  let cart = Cart::from_lines(vec![CartLine {
    product: pricey,
    quantity: 2,
  }])
  .unwrap();
  let writes_before = store.write_count();

  let pipeline = build_place_order_pipeline(CheckoutPolicy::default());
  let err = place_order(&pipeline, store.clone(), valid_form(), cart).await.unwrap_err();

  assert!(matches!(err, ShopError::Validation(_)));
  assert_eq!(store.write_count(), writes_before);
  assert!(store.list_orders().await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn test_blank_field_is_rejected_without_writes() {
  setup_tracing();
  let mut shop = open_shop(CheckoutPolicy::default()).await;
  let tea = shop.products[1].clone();
  shop.storefront.add_to_cart(&tea).await.unwrap();
  let writes_before = shop.store.write_count();

  for form in [
    CheckoutForm {
      customer_name: "   ".to_string(),
      ..valid_form()
    },
    CheckoutForm {
      phone: String::new(),
      ..valid_form()
    },
    CheckoutForm {
      address: String::new(),
      ..valid_form()
    },
  ] {
    let err = shop.storefront.checkout(form).await.unwrap_err();
    assert!(err.is_validation(), "unexpected error: {:?}", err);
  }

  assert_eq!(shop.store.write_count(), writes_before);
  assert_eq!(shop.storefront.quantity_of(tea.id), 1);
}

#[tokio::test]
#[serial]
async fn test_strict_phone_policy() {
  setup_tracing();
  let policy = CheckoutPolicy {
    strict_phone: true,
    ..Default::default()
  };
  let mut shop = open_shop(policy).await;
  let tea = shop.products[1].clone();
  shop.storefront.add_to_cart(&tea).await.unwrap();

  let err = shop
    .storefront
    .checkout(CheckoutForm {
      phone: "12-34".to_string(),
      ..valid_form()
    })
    .await
    .unwrap_err();
  assert!(matches!(err, ShopError::Validation(_)));

  shop.storefront.checkout(valid_form()).await.unwrap();
}

#[tokio::test]
#[serial]
async fn test_detail_failure_leaves_orphan_and_keeps_cart() {
  setup_tracing();
  let mut shop = open_shop(CheckoutPolicy::default()).await;
  let coffee = shop.products[0].clone();
  shop.storefront.add_to_cart(&coffee).await.unwrap();
  shop.store.fail_next(StoreOp::InsertOrderDetails);

  let err = shop.storefront.checkout(valid_form()).await.unwrap_err();

  let orders = shop.store.list_orders().await.unwrap();
  assert_eq!(orders.len(), 1);
  match err {
    ShopError::PartialOrder { order_id, .. } => assert_eq!(order_id, orders[0].id),
    other => panic!("expected PartialOrder, got {:?}", other),
  }
  assert!(shop.store.order_details_snapshot().is_empty());
  assert_eq!(shop.storefront.quantity_of(coffee.id), 1);
  let stored = shop.storage.load().await.unwrap().unwrap();
  assert_eq!(&stored, shop.storefront.cart());
}

#[tokio::test]
#[serial]
async fn test_rollback_policy_deletes_orphaned_header() {
  setup_tracing();
  let policy = CheckoutPolicy {
    rollback_orphaned_orders: true,
    ..Default::default()
  };
  let mut shop = open_shop(policy).await;
  let cake = shop.products[2].clone();
  shop.storefront.add_to_cart(&cake).await.unwrap();
  shop.store.fail_next(StoreOp::InsertOrderDetails);

  let err = shop.storefront.checkout(valid_form()).await.unwrap_err();

  assert!(matches!(err, ShopError::PartialOrder { .. }));
  assert_eq!(err.user_message(), "Placing the order failed.");
  assert!(shop.store.list_orders().await.unwrap().is_empty());
  assert_eq!(shop.storefront.quantity_of(cake.id), 1);
}

#[tokio::test]
#[serial]
async fn test_header_failure_writes_nothing() {
  setup_tracing();
  let mut shop = open_shop(CheckoutPolicy::default()).await;
  let tea = shop.products[1].clone();
  shop.storefront.add_to_cart(&tea).await.unwrap();
  shop.store.fail_next(StoreOp::InsertOrder);

  let err = shop.storefront.checkout(valid_form()).await.unwrap_err();

  assert!(matches!(err, ShopError::Store { operation: "insert orders", .. }));
  assert!(shop.store.list_orders().await.unwrap().is_empty());
  assert_eq!(shop.storefront.quantity_of(tea.id), 1);
}

#[tokio::test]
#[serial]
async fn test_reprice_policy_uses_catalog_prices() {
  setup_tracing();
  let (store, products) = seeded_store().await;
  let (coffee, tea) = (products[0].clone(), products[1].clone());

  // A cart saved while prices were different, and with a product that is gone.
  let mut stale_coffee = coffee.clone();
  stale_coffee.price = 1;
  let mut cart = Cart::new();
  cart.add(&stale_coffee).unwrap();
  cart.add(&stale_coffee).unwrap();
  cart.add(&tea).unwrap();
  store.delete_product(tea.id).await.unwrap();

  let store: Arc<dyn Store> = store;
  let plain = build_place_order_pipeline(CheckoutPolicy::default());
  let placed = place_order(&plain, store.clone(), valid_form(), cart.clone()).await.unwrap();
  assert_eq!(placed.order.total_price, 2 + 25_000);
  assert!(placed.reprice.is_none());

  let repricing = build_place_order_pipeline(CheckoutPolicy {
    reprice_at_checkout: true,
    ..Default::default()
  });
  let placed = place_order(&repricing, store.clone(), valid_form(), cart).await.unwrap();
  assert_eq!(placed.order.total_price, 2 * coffee.price);
  assert_eq!(placed.details.len(), 1);
  let outcome = placed.reprice.unwrap();
  assert_eq!(outcome.repriced, vec![coffee.id]);
  assert_eq!(outcome.dropped, vec![tea.id]);
}

#[tokio::test]
#[serial]
async fn test_reprice_that_empties_cart_is_rejected() {
  setup_tracing();
  let (store, products) = seeded_store().await;
  let cake = products[2].clone();
  let mut cart = Cart::new();
  cart.add(&cake).unwrap();
  store.delete_product(cake.id).await.unwrap();
  let writes_before = store.write_count();

  let pipeline = build_place_order_pipeline(CheckoutPolicy {
    reprice_at_checkout: true,
    ..Default::default()
  });
  let err = place_order(&pipeline, store.clone(), valid_form(), cart).await.unwrap_err();

  assert!(matches!(err, ShopError::EmptyCart));
  assert_eq!(store.write_count(), writes_before);
}

#[test]
fn test_place_order_steps_run_header_before_details() {
  let pipeline = build_place_order_pipeline(CheckoutPolicy::default());
  assert_eq!(
    pipeline.step_names(),
    vec![
      "validate_checkout_form",
      "reprice_cart_lines",
      "insert_order_header",
      "insert_order_details",
    ]
  );
}
