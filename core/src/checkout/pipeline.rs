// core/src/checkout/pipeline.rs

//! Order placement as a four-step pipeline:
//!
//! 1. `validate_checkout_form`: non-empty cart and required fields. No writes.
//! 2. `reprice_cart_lines`: only with `reprice_at_checkout`.
//! 3. `insert_order_header`: one `orders` row with the cart total.
//! 4. `insert_order_details`: one `order_details` row per cart line, as a batch.
//!
//! Steps 3 and 4 are two independent writes. When step 4 fails the header
//! stays behind and the run fails with `ShopError::PartialOrder`; with
//! `rollback_orphaned_orders` a compensation tries to delete that header.

use super::{CheckoutForm, CheckoutPolicy};
use crate::cart::{Cart, RepriceOutcome};
use crate::error::{ShopError, ShopResult};
use crate::flow::{ContextData, Pipeline, PipelineControl, PipelineResult, SkipCondition};
use crate::models::{NewOrder, NewOrderDetail, Order, OrderDetail, OrderStatus};
use crate::store::{SortOrder, Store};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

pub const VALIDATE_STEP: &str = "validate_checkout_form";
pub const REPRICE_STEP: &str = "reprice_cart_lines";
pub const HEADER_STEP: &str = "insert_order_header";
pub const DETAILS_STEP: &str = "insert_order_details";

/// State shared by the checkout steps of one run.
pub struct PlaceOrderCtxData {
  pub store: Arc<dyn Store>,
  pub form: CheckoutForm,
  pub cart: Cart,
  pub total: i64,
  pub reprice: Option<RepriceOutcome>,
  pub order: Option<Order>,
  pub details: Vec<OrderDetail>,
}

impl PlaceOrderCtxData {
  pub fn new(store: Arc<dyn Store>, form: CheckoutForm, cart: Cart) -> Self {
    Self {
      store,
      form: form.normalized(),
      cart,
      total: 0,
      reprice: None,
      order: None,
      details: Vec::new(),
    }
  }
}

/// A successfully placed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlacement {
  pub order: Order,
  pub details: Vec<OrderDetail>,
  /// Set when the cart was repriced before placing.
  pub reprice: Option<RepriceOutcome>,
}

pub fn build_place_order_pipeline(policy: CheckoutPolicy) -> Pipeline<PlaceOrderCtxData, ShopError> {
  let skip_reprice: SkipCondition<PlaceOrderCtxData> =
    Arc::new(move |_: ContextData<PlaceOrderCtxData>| !policy.reprice_at_checkout);
  let mut p = Pipeline::<PlaceOrderCtxData, ShopError>::new(&[
    (VALIDATE_STEP, false, None),
    (REPRICE_STEP, true, Some(skip_reprice)),
    (HEADER_STEP, false, None),
    (DETAILS_STEP, false, None),
  ]);

  p.on_step(VALIDATE_STEP, move |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let guard = ctx_data.read();
      if guard.cart.is_empty() {
        warn!("Checkout rejected: cart is empty.");
        return Err(ShopError::EmptyCart);
      }
      guard.form.validate(&policy)?;
      if let Err(e) = guard.cart.checked_total() {
        warn!(error = %e, "Checkout rejected: cart total out of range.");
        return Err(e);
      }
      info!(lines = guard.cart.len(), "Checkout form validated.");
      Ok::<_, ShopError>(PipelineControl::Continue)
    })
  });

  p.on_step(REPRICE_STEP, |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let store = ctx_data.read().store.clone();
      let catalog = store.list_products(SortOrder::IdAscending).await?;

      let mut guard = ctx_data.write();
      let outcome = guard.cart.reprice(&catalog);
      if !outcome.is_unchanged() {
        warn!(
          repriced = ?outcome.repriced,
          dropped = ?outcome.dropped,
          "Cart lines changed against the current catalog."
        );
      }
      let emptied = guard.cart.is_empty();
      guard.reprice = Some(outcome);
      if emptied {
        return Err(ShopError::EmptyCart);
      }
      Ok::<_, ShopError>(PipelineControl::Continue)
    })
  });

  p.on_step(HEADER_STEP, |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let (store, new_order) = {
        let mut guard = ctx_data.write();
        let total = guard.cart.checked_total()?;
        guard.total = total;
        let new_order = NewOrder {
          customer_name: guard.form.customer_name.clone(),
          phone: guard.form.phone.clone(),
          address: guard.form.address.clone(),
          note: guard.form.note.clone(),
          total_price: guard.total,
          status: OrderStatus::Placed,
        };
        (guard.store.clone(), new_order)
      };

      let order = store.insert_order(new_order).await?;
      info!(order_id = order.id, total_price = order.total_price, "Order header inserted.");
      ctx_data.write().order = Some(order);
      Ok::<_, ShopError>(PipelineControl::Continue)
    })
  });

  p.on_step(DETAILS_STEP, |ctx_data: ContextData<PlaceOrderCtxData>| {
    Box::pin(async move {
      let (store, order_id, rows) = {
        let guard = ctx_data.read();
        let order_id = guard
          .order
          .as_ref()
          .map(|o| o.id)
          .ok_or_else(|| ShopError::Internal("order header missing before detail insert".to_string()))?;
        let rows: Vec<NewOrderDetail> = guard
          .cart
          .lines()
          .iter()
          .map(|line| NewOrderDetail {
            order_id,
            product_id: line.product.id,
            quantity: line.quantity,
          })
          .collect();
        (guard.store.clone(), order_id, rows)
      };

      match store.insert_order_details(rows).await {
        Ok(details) => {
          info!(order_id, rows = details.len(), "Order details inserted.");
          ctx_data.write().details = details;
          Ok::<_, ShopError>(PipelineControl::Continue)
        }
        Err(e) => {
          error!(order_id, error = %e, "Order header committed but its details were not.");
          Err(ShopError::PartialOrder {
            order_id,
            source: Box::new(e),
          })
        }
      }
    })
  });

  if policy.rollback_orphaned_orders {
    p.on_failure(DETAILS_STEP, |ctx_data: ContextData<PlaceOrderCtxData>| {
      Box::pin(async move {
        let (store, order_id) = {
          let guard = ctx_data.read();
          (guard.store.clone(), guard.order.as_ref().map(|o| o.id))
        };
        let Some(order_id) = order_id else {
          return Ok(());
        };
        let removed = store.delete_order(order_id).await?;
        info!(order_id, removed, "Orphaned order header deleted.");
        Ok::<_, ShopError>(())
      })
    });
  }

  p
}

/// Runs `pipeline` for one checkout and hands back the stored rows.
#[instrument(name = "checkout::place_order", skip_all, fields(lines = cart.len()))]
pub async fn place_order(
  pipeline: &Pipeline<PlaceOrderCtxData, ShopError>,
  store: Arc<dyn Store>,
  form: CheckoutForm,
  cart: Cart,
) -> ShopResult<OrderPlacement> {
  let ctx_data = ContextData::new(PlaceOrderCtxData::new(store, form, cart));

  match pipeline.run(ctx_data.clone()).await? {
    PipelineResult::Completed => {
      let mut guard = ctx_data.write();
      let order = guard
        .order
        .take()
        .ok_or_else(|| ShopError::Internal("checkout completed without an order".to_string()))?;
      Ok(OrderPlacement {
        order,
        details: std::mem::take(&mut guard.details),
        reprice: guard.reprice.take(),
      })
    }
    PipelineResult::Stopped => Err(ShopError::Internal("checkout stopped before placing the order".to_string())),
  }
}
