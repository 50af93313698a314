// storefront/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use storefront_core::{place_order, Cart, CartLine, CheckoutForm};
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::state::AppState;

/// The checkout form plus the client-held cart.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
  #[serde(flatten)]
  pub form: CheckoutForm,
  #[serde(default)]
  pub lines: Vec<CartLine>,
}

#[instrument(
  name = "handler::checkout",
  skip(app_state, payload),
  fields(lines = payload.lines.len())
)]
pub async fn checkout_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
  let CheckoutRequest { form, lines } = payload.into_inner();
  let cart = Cart::from_lines(lines)?;
  let submitted_total = cart.total();

  let placement = match place_order(&app_state.checkout, app_state.store.clone(), form, cart).await {
    Ok(placement) => placement,
    Err(e) => {
      warn!(error = %e, "Checkout failed; the client keeps its cart.");
      return Err(e.into());
    }
  };

  info!(
    order_id = placement.order.id,
    total_price = placement.order.total_price,
    submitted_total,
    "Order placed."
  );

  Ok(HttpResponse::Created().json(json!({
    "message": "Order placed successfully.",
    "orderId": placement.order.id,
    "totalPrice": placement.order.total_price,
    "lineCount": placement.details.len(),
    "repriced": placement.reprice.as_ref().map_or(false, |r| !r.is_unchanged()),
    "clearCart": true,
  })))
}
