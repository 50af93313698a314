// storefront/src/web/handlers/admin_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use storefront_core::models::{format_vnd, NewOrder, NewProduct, OrderStatus};
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::state::AppState;

// --- Products ---

#[instrument(name = "handler::admin_list_products", skip(app_state))]
pub async fn list_products_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let products = app_state.admin.list_products().await?;
  Ok(HttpResponse::Ok().json(json!({ "products": products })))
}

#[instrument(name = "handler::admin_add_product", skip(app_state, payload))]
pub async fn add_product_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<NewProduct>,
) -> Result<HttpResponse, AppError> {
  let product = app_state.admin.add_product(payload.into_inner()).await?;
  Ok(HttpResponse::Created().json(json!({ "product": product })))
}

#[instrument(name = "handler::admin_delete_product", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  app_state.admin.delete_product(path.into_inner()).await?;
  Ok(HttpResponse::NoContent().finish())
}

// --- Orders ---

#[instrument(name = "handler::admin_list_orders", skip(app_state))]
pub async fn list_orders_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let orders = app_state.admin.list_orders().await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

#[instrument(name = "handler::admin_add_order", skip(app_state, payload))]
pub async fn add_order_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<NewOrder>,
) -> Result<HttpResponse, AppError> {
  let order = app_state.admin.add_order(payload.into_inner()).await?;
  Ok(HttpResponse::Created().json(json!({ "order": order })))
}

#[instrument(name = "handler::admin_dashboard", skip(app_state))]
pub async fn dashboard_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let dashboard = app_state.admin.dashboard().await?;
  Ok(HttpResponse::Ok().json(json!({
    "orders": dashboard.orders,
    "revenueToday": dashboard.revenue_today,
    "revenueTodayLabel": format_vnd(dashboard.revenue_today),
    "delivered": dashboard.delivered,
    "asOf": chrono::Utc::now(),
  })))
}

#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
  pub status: OrderStatus,
  /// The admin's answer to the confirmation prompt.
  #[serde(default)]
  pub confirmed: bool,
}

#[instrument(
  name = "handler::admin_update_status",
  skip(app_state, path, payload),
  fields(order_id = %path.as_ref(), status = ?payload.status)
)]
pub async fn update_status_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
  payload: web::Json<StatusChangeRequest>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let StatusChangeRequest { status, confirmed } = payload.into_inner();

  let pending = app_state.admin.request_status_change(order_id, status);
  if !confirmed {
    warn!("Status change submitted without confirmation.");
    pending.cancel();
    return Err(AppError::Unconfirmed { order_id });
  }
  pending.confirm().await?;
  info!("Order status changed to {}.", status.label());

  Ok(HttpResponse::Ok().json(json!({ "orderId": order_id, "status": status })))
}

#[instrument(name = "handler::admin_delete_order", skip(app_state, path), fields(order_id = %path.as_ref()))]
pub async fn delete_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  app_state.admin.delete_order(path.into_inner()).await?;
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::admin_order_details", skip(app_state, path), fields(order_id = %path.as_ref()))]
pub async fn order_details_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let order_id = path.into_inner();
  let details = app_state.admin.order_details(order_id).await?;

  let rows: Vec<serde_json::Value> = details
    .iter()
    .map(|d| {
      json!({
        "id": d.id,
        "productName": d.product_name(),
        "price": d.product.as_ref().map(|p| p.price),
        "quantity": d.quantity,
        "lineTotal": d.line_total(),
      })
    })
    .collect();
  Ok(HttpResponse::Ok().json(json!({ "orderId": order_id, "details": rows })))
}
