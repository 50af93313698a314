// src/lib.rs

//! Storefront core: catalog, cart and checkout for shoppers, plus the
//! back-office operations, all as thin passthroughs to a relational store
//! with row-change notifications.
//!
//!  - `store`: the `Store` trait, an in-memory and a Postgres implementation,
//!    and the change feed that drives realtime listings.
//!  - `cart`: the shopper's cart and its device-local persistence.
//!  - `checkout`: order placement as a step pipeline (header, then details).
//!  - `admin`: product/order CRUD, confirmed status changes, dashboard numbers.
//!  - `live`: listings that refetch on every matching change.
//!  - `flow`: the step pipeline engine checkout runs on.

pub mod admin;
pub mod cart;
pub mod checkout;
pub mod error;
pub mod flow;
pub mod live;
pub mod models;
pub mod session;
pub mod store;

pub use crate::admin::{AdminConsole, OrderDashboard, PendingStatusChange};
pub use crate::cart::{Cart, CartLine, CartStorage, FileCartStorage, MemoryCartStorage};
pub use crate::checkout::{
  build_place_order_pipeline, place_order, CheckoutForm, CheckoutPolicy, OrderPlacement, PlaceOrderCtxData,
};
pub use crate::error::{ShopError, ShopResult};
pub use crate::flow::{ContextData, Pipeline, PipelineControl, PipelineResult};
pub use crate::live::{ListingSnapshot, LiveListing};
pub use crate::session::Storefront;
pub use crate::store::{MemoryStore, PgStore, SortOrder, Store};

/// The checkout pipeline type every caller shares.
pub type PlaceOrderPipeline = Pipeline<PlaceOrderCtxData, ShopError>;
