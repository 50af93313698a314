// tests/common/mod.rs
#![allow(dead_code)]

use once_cell::sync::Lazy;
use std::sync::Arc;
use storefront_core::flow::{ContextData, PipelineControl};
use storefront_core::models::{NewProduct, Product};
use storefront_core::{
  build_place_order_pipeline, CheckoutForm, CheckoutPolicy, MemoryCartStorage, MemoryStore, ShopError, Store,
  Storefront,
};
use tracing::Level;

static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

// --- Fixtures ---

pub fn new_product(name: &str, price: i64) -> NewProduct {
  NewProduct {
    name: name.to_string(),
    price,
    image_url: format!("https://img.example/{}.png", name.to_lowercase()),
    description: None,
  }
}

pub fn valid_form() -> CheckoutForm {
  CheckoutForm {
    customer_name: "Nguyen Van An".to_string(),
    phone: "0912345678".to_string(),
    address: "12 Ly Thuong Kiet, Ha Noi".to_string(),
    note: None,
  }
}

/// A memory store seeded with three products priced 10 000, 25 000 and 40 000.
pub async fn seeded_store() -> (Arc<MemoryStore>, Vec<Product>) {
  let store = Arc::new(MemoryStore::new());
  let products = store
    .seed_products(vec![
      new_product("Coffee", 10_000),
      new_product("Tea", 25_000),
      new_product("Cake", 40_000),
    ])
    .await
    .expect("seeding a memory store cannot fail");
  (store, products)
}

pub struct Shop {
  pub store: Arc<MemoryStore>,
  pub storage: Arc<MemoryCartStorage>,
  pub products: Vec<Product>,
  pub storefront: Storefront,
}

pub async fn open_shop(policy: CheckoutPolicy) -> Shop {
  let (store, products) = seeded_store().await;
  let storage = Arc::new(MemoryCartStorage::new());
  let storefront = Storefront::open(
    store.clone() as Arc<dyn Store>,
    storage.clone(),
    Arc::new(build_place_order_pipeline(policy)),
  )
  .await;
  Shop {
    store,
    storage,
    products,
    storefront,
  }
}

// --- Pipeline helpers ---

#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub steps_executed: Vec<String>,
  pub compensated: Vec<String>,
}

pub fn recording_handler(
  step_name: &'static str,
) -> impl Fn(ContextData<TestContext>) -> std::pin::Pin<
  Box<dyn std::future::Future<Output = Result<PipelineControl, ShopError>> + Send>,
> + Send
     + Sync
     + 'static {
  move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push(step_name.to_string());
      Ok(PipelineControl::Continue)
    })
  }
}
