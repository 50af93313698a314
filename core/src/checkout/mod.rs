// core/src/checkout/mod.rs

//! Checkout inputs and the switches that tune order placement. The placement
//! itself lives in [`pipeline`].

pub mod pipeline;

use crate::error::{ShopError, ShopResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use pipeline::{build_place_order_pipeline, place_order, OrderPlacement, PlaceOrderCtxData};

static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0\d{9}$").expect("phone pattern is a valid regex"));

/// What the shopper types in at checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutForm {
  pub customer_name: String,
  pub phone: String,
  pub address: String,
  #[serde(default)]
  pub note: Option<String>,
}

impl CheckoutForm {
  /// Trims every field; a blank note becomes `None`.
  pub fn normalized(&self) -> CheckoutForm {
    CheckoutForm {
      customer_name: self.customer_name.trim().to_string(),
      phone: self.phone.trim().to_string(),
      address: self.address.trim().to_string(),
      note: self
        .note
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string),
    }
  }

  /// Presence checks, plus the phone pattern when `policy.strict_phone` is on.
  pub fn validate(&self, policy: &CheckoutPolicy) -> ShopResult<()> {
    validate_contact(&self.customer_name, &self.phone, &self.address, policy)
  }
}

/// Shared by checkout and the back-office's manual order entry.
pub(crate) fn validate_contact(name: &str, phone: &str, address: &str, policy: &CheckoutPolicy) -> ShopResult<()> {
  let missing: Vec<&str> = [("name", name), ("phone", phone), ("address", address)]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(field, _)| field)
    .collect();
  if !missing.is_empty() {
    return Err(ShopError::Validation(format!(
      "Please fill in all required fields (missing: {}).",
      missing.join(", ")
    )));
  }
  if policy.strict_phone && !PHONE_PATTERN.is_match(phone.trim()) {
    return Err(ShopError::Validation(
      "Phone number must be 10 digits starting with 0.".to_string(),
    ));
  }
  Ok(())
}

/// All switches default to off, which places orders exactly as submitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutPolicy {
  pub strict_phone: bool,
  /// Refresh cart prices from the catalog and drop vanished products before
  /// the total is computed.
  pub reprice_at_checkout: bool,
  /// Delete the order header again when its detail rows could not be written.
  pub rollback_orphaned_orders: bool,
}
