// core/src/session.rs

//! One shopper's view of the store: the catalog, a cart that is persisted on
//! every change, and checkout.

use crate::cart::{Cart, CartStorage};
use crate::checkout::{place_order, CheckoutForm, OrderPlacement, PlaceOrderCtxData};
use crate::error::{ShopError, ShopResult};
use crate::flow::Pipeline;
use crate::models::Product;
use crate::store::{SortOrder, Store};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct Storefront {
  store: Arc<dyn Store>,
  storage: Arc<dyn CartStorage>,
  pipeline: Arc<Pipeline<PlaceOrderCtxData, ShopError>>,
  cart: Cart,
  catalog: Vec<Product>,
}

impl Storefront {
  /// Restores the saved cart. A missing or unreadable record starts an empty
  /// cart instead of failing.
  pub async fn open(
    store: Arc<dyn Store>,
    storage: Arc<dyn CartStorage>,
    pipeline: Arc<Pipeline<PlaceOrderCtxData, ShopError>>,
  ) -> Self {
    let cart = match storage.load().await {
      Ok(Some(cart)) => cart,
      Ok(None) => Cart::new(),
      Err(e) => {
        warn!(error = %e, "Saved cart could not be read; starting empty.");
        Cart::new()
      }
    };
    info!(lines = cart.len(), "Storefront opened.");
    Self {
      store,
      storage,
      pipeline,
      cart,
      catalog: Vec::new(),
    }
  }

  /// Replaces the local catalog with the store's products in store order.
  pub async fn load_catalog(&mut self) -> ShopResult<&[Product]> {
    self.catalog = self.store.list_products(SortOrder::IdAscending).await?;
    Ok(&self.catalog)
  }

  pub fn catalog(&self) -> &[Product] {
    &self.catalog
  }

  pub fn cart(&self) -> &Cart {
    &self.cart
  }

  pub fn quantity_of(&self, product_id: i64) -> i32 {
    self.cart.quantity_of(product_id)
  }

  pub fn total(&self) -> i64 {
    self.cart.total()
  }

  pub async fn add_to_cart(&mut self, product: &Product) -> ShopResult<i32> {
    let quantity = self.cart.add(product)?;
    self.storage.save(&self.cart).await?;
    Ok(quantity)
  }

  pub async fn remove_from_cart(&mut self, product_id: i64) -> ShopResult<i32> {
    let quantity = self.cart.remove_one(product_id);
    self.storage.save(&self.cart).await?;
    Ok(quantity)
  }

  pub async fn reset_cart(&mut self) -> ShopResult<()> {
    self.cart.clear();
    self.storage.clear().await
  }

  /// Places the current cart as an order. The cart is emptied, locally and in
  /// storage, only when both the header and the details were written. Once
  /// they are, the order is reported as placed even if the stored cart cannot
  /// be cleared.
  #[instrument(name = "storefront::checkout", skip_all, fields(lines = self.cart.len(), total = self.cart.total()))]
  pub async fn checkout(&mut self, form: CheckoutForm) -> ShopResult<OrderPlacement> {
    let placement = place_order(&self.pipeline, Arc::clone(&self.store), form, self.cart.clone()).await?;
    match self.reset_cart().await {
      Ok(()) => info!(order_id = placement.order.id, "Checkout succeeded; cart cleared."),
      Err(e) => warn!(
        order_id = placement.order.id,
        error = %e,
        "Checkout succeeded but the stored cart could not be cleared."
      ),
    }
    Ok(placement)
  }
}
