// tests/cart_tests.rs
mod common;

use common::*;
use proptest::prelude::*;
use serial_test::serial;
use std::collections::HashMap;
use std::sync::Arc;
use storefront_core::cart::CART_KEY;
use storefront_core::models::Product;
use storefront_core::{
  build_place_order_pipeline, Cart, CartStorage, CheckoutPolicy, FileCartStorage, MemoryStore, Store, Storefront,
};

#[tokio::test]
#[serial]
async fn test_add_and_remove_follow_quantity_rules() {
  setup_tracing();
  let mut shop = open_shop(CheckoutPolicy::default()).await;
  let coffee = shop.products[0].clone();
  let tea = shop.products[1].clone();

  assert_eq!(shop.storefront.add_to_cart(&coffee).await.unwrap(), 1);
  assert_eq!(shop.storefront.add_to_cart(&coffee).await.unwrap(), 2);
  assert_eq!(shop.storefront.add_to_cart(&tea).await.unwrap(), 1);
  assert_eq!(shop.storefront.total(), 2 * 10_000 + 25_000);

  assert_eq!(shop.storefront.remove_from_cart(tea.id).await.unwrap(), 0);
  assert_eq!(shop.storefront.quantity_of(tea.id), 0);
  assert_eq!(shop.storefront.cart().len(), 1);

  // Removing something that is not in the cart changes nothing.
  assert_eq!(shop.storefront.remove_from_cart(999).await.unwrap(), 0);
  assert_eq!(shop.storefront.total(), 20_000);
}

#[tokio::test]
#[serial]
async fn test_every_mutation_is_persisted() {
  setup_tracing();
  let mut shop = open_shop(CheckoutPolicy::default()).await;
  let cake = shop.products[2].clone();

  shop.storefront.add_to_cart(&cake).await.unwrap();
  shop.storefront.add_to_cart(&cake).await.unwrap();
  shop.storefront.remove_from_cart(cake.id).await.unwrap();
  assert_eq!(shop.storage.save_count(), 3);

  let stored = shop.storage.load().await.unwrap().unwrap();
  assert_eq!(stored.quantity_of(cake.id), 1);
  assert_eq!(&stored, shop.storefront.cart());
}

fn priced_catalog() -> Vec<Product> {
  [("Coffee", 10_000), ("Tea", 25_000), ("Cake", 40_000), ("Water", 0)]
    .iter()
    .enumerate()
    .map(|(i, (name, price))| new_product(name, *price).into_product(i as i64 + 1))
    .collect()
}

proptest! {
  /// Any sequence of adds and removes keeps the cart in step with a plain
  /// id -> quantity model.
  #[test]
  fn test_cart_tracks_quantity_model(ops in prop::collection::vec((any::<bool>(), 0usize..4), 0..120)) {
    let catalog = priced_catalog();
    let mut cart = Cart::new();
    let mut model: HashMap<i64, i32> = HashMap::new();

    for (is_add, idx) in ops {
      let product = &catalog[idx];
      if is_add {
        let quantity = cart.add(product).unwrap();
        let expected = model.entry(product.id).or_insert(0);
        *expected += 1;
        prop_assert_eq!(quantity, *expected);
      } else {
        let remaining = cart.remove_one(product.id);
        match model.get_mut(&product.id) {
          Some(q) if *q > 1 => *q -= 1,
          Some(_) => {
            model.remove(&product.id);
          }
          None => {}
        }
        prop_assert_eq!(remaining, model.get(&product.id).copied().unwrap_or(0));
      }

      prop_assert!(cart.lines().iter().all(|l| l.quantity > 0));
      prop_assert_eq!(cart.len(), model.len());
      for p in &catalog {
        prop_assert_eq!(cart.quantity_of(p.id), model.get(&p.id).copied().unwrap_or(0));
      }
      let expected_total: i64 = catalog
        .iter()
        .map(|p| p.price * i64::from(model.get(&p.id).copied().unwrap_or(0)))
        .sum();
      prop_assert_eq!(cart.total(), expected_total);
      prop_assert_eq!(cart.checked_total().unwrap(), expected_total);
    }
  }
}

#[tokio::test]
#[serial]
async fn test_cart_survives_reopening_the_storage_file() {
  setup_tracing();
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("local_storage.json");
  std::fs::write(&path, r#"{"theme":"dark"}"#).unwrap();

  let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
  let tea = store.insert_product(new_product("Tea", 25_000)).await.unwrap();
  let pipeline = Arc::new(build_place_order_pipeline(CheckoutPolicy::default()));

  {
    let mut storefront = Storefront::open(store.clone(), Arc::new(FileCartStorage::new(&path)), pipeline.clone()).await;
    assert!(storefront.cart().is_empty());
    storefront.add_to_cart(&tea).await.unwrap();
    storefront.add_to_cart(&tea).await.unwrap();
  }

  let reopened = Storefront::open(store.clone(), Arc::new(FileCartStorage::new(&path)), pipeline).await;
  assert_eq!(reopened.quantity_of(tea.id), 2);

  // Other keys in the document are left alone.
  let doc: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
  assert_eq!(doc["theme"], "dark");
  assert_eq!(doc[CART_KEY][0]["quantity"], 2);
}

#[tokio::test]
#[serial]
async fn test_unreadable_cart_starts_empty() {
  setup_tracing();
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("local_storage.json");
  std::fs::write(&path, "not json at all").unwrap();

  let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
  let storage = Arc::new(FileCartStorage::new(&path));
  let mut storefront = Storefront::open(
    store.clone(),
    storage.clone(),
    Arc::new(build_place_order_pipeline(CheckoutPolicy::default())),
  )
  .await;
  assert!(storefront.cart().is_empty());

  // The next save replaces the broken document.
  let cake = store.insert_product(new_product("Cake", 40_000)).await.unwrap();
  storefront.add_to_cart(&cake).await.unwrap();
  let loaded: Cart = storage.load().await.unwrap().unwrap();
  assert_eq!(loaded.quantity_of(cake.id), 1);
}

#[tokio::test]
#[serial]
async fn test_missing_storage_file_loads_nothing() {
  setup_tracing();
  let dir = tempfile::tempdir().unwrap();
  let storage = FileCartStorage::new(dir.path().join("nested").join("cart.json"));
  assert!(storage.load().await.unwrap().is_none());
  storage.clear().await.unwrap();

  let mut cart = Cart::new();
  cart.add(&new_product("Tea", 25_000).into_product(1)).unwrap();
  storage.save(&cart).await.unwrap();
  assert_eq!(storage.load().await.unwrap(), Some(cart));

  storage.clear().await.unwrap();
  assert!(storage.load().await.unwrap().is_none());
}
