// storefront/src/state.rs
use crate::config::AppConfig;
use std::sync::Arc;
use storefront_core::{AdminConsole, PlaceOrderPipeline, Store};

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn Store>,
  pub checkout: Arc<PlaceOrderPipeline>,
  pub admin: AdminConsole,
  pub config: Arc<AppConfig>,
}

impl AppState {
  pub fn new(store: Arc<dyn Store>, config: Arc<AppConfig>) -> Self {
    let checkout = Arc::new(storefront_core::build_place_order_pipeline(config.checkout));
    let admin = AdminConsole::new(Arc::clone(&store), config.utc_offset_hours);
    Self {
      store,
      checkout,
      admin,
      config,
    }
  }
}
