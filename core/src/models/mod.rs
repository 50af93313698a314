// core/src/models/mod.rs

//! Rows of the three store tables, their insert payloads, and the views the
//! storefront renders.

pub mod money;
pub mod order;
pub mod order_detail;
pub mod product;

pub use money::format_vnd;
pub use order::{NewOrder, Order, OrderStatus};
pub use order_detail::{NewOrderDetail, OrderDetail, OrderDetailView};
pub use product::{NewProduct, Product, ProductRef};
