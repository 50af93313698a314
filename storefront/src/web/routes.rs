// storefront/src/web/routes.rs

use actix_web::web;

use crate::state::AppState;
use crate::web::handlers::{admin_handlers, catalog_handlers, checkout_handlers, realtime_handlers};

async fn health_check_handler(app_state: web::Data<AppState>) -> actix_web::HttpResponse {
  let store = if app_state.config.database_url.is_some() { "postgres" } else { "memory" };
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok", "store": store }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      // Shopper-facing
      .route("/products", web::get().to(catalog_handlers::list_products_handler))
      .route("/checkout", web::post().to(checkout_handlers::checkout_handler))
      // Back-office
      .service(
        web::scope("/admin/products")
          .route("", web::get().to(admin_handlers::list_products_handler))
          .route("", web::post().to(admin_handlers::add_product_handler))
          .route("/{product_id}", web::delete().to(admin_handlers::delete_product_handler)),
      )
      .service(
        web::scope("/admin/orders")
          .route("", web::get().to(admin_handlers::list_orders_handler))
          .route("", web::post().to(admin_handlers::add_order_handler))
          // Fixed segments go before `/{order_id}`.
          .route("/dashboard", web::get().to(admin_handlers::dashboard_handler))
          .route("/stream", web::get().to(realtime_handlers::orders_stream_handler))
          .route("/{order_id}", web::delete().to(admin_handlers::delete_order_handler))
          .route("/{order_id}/status", web::put().to(admin_handlers::update_status_handler))
          .route("/{order_id}/details", web::get().to(admin_handlers::order_details_handler))
          .route(
            "/{order_id}/details/stream",
            web::get().to(realtime_handlers::order_details_stream_handler),
          ),
      ),
  );
}
