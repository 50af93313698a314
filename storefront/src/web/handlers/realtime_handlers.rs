// storefront/src/web/handlers/realtime_handlers.rs

//! Server-sent events for the back-office. Each frame carries the complete,
//! freshly fetched listing, never a diff.

use actix_web::http::header;
use actix_web::{web, HttpResponse};
use futures_util::stream;
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use storefront_core::{ListingSnapshot, LiveListing};
use tracing::{debug, info, instrument};

use crate::errors::AppError;
use crate::state::AppState;

fn sse_frame<T: Serialize>(event: &str, snapshot: &ListingSnapshot<T>) -> web::Bytes {
  let data = json!({
    "revision": snapshot.revision,
    "rows": snapshot.rows,
    "error": snapshot.error,
  });
  web::Bytes::from(format!("event: {}\ndata: {}\n\n", event, data))
}

fn sse_response<T>(event: &'static str, listing: LiveListing<T>) -> HttpResponse
where
  T: Clone + Serialize + Send + Sync + 'static,
{
  let frames = stream::unfold((listing, 0u64), move |(mut listing, seen)| async move {
    let snapshot = listing.wait_for_revision(seen + 1).await.ok()?;
    debug!(event, revision = snapshot.revision, "Pushing listing frame.");
    let frame = sse_frame(event, &snapshot);
    Some((Ok::<_, Infallible>(frame), (listing, snapshot.revision)))
  });

  HttpResponse::Ok()
    .insert_header((header::CONTENT_TYPE, "text/event-stream"))
    .insert_header((header::CACHE_CONTROL, "no-cache"))
    .streaming(frames)
}

#[instrument(name = "handler::orders_stream", skip(app_state))]
pub async fn orders_stream_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let listing = LiveListing::orders(app_state.store.clone()).await?;
  info!("Order stream opened.");
  Ok(sse_response("orders", listing))
}

#[instrument(name = "handler::order_details_stream", skip(app_state, path), fields(order_id = %path.as_ref()))]
pub async fn order_details_stream_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let listing = LiveListing::order_details(app_state.store.clone(), path.into_inner()).await?;
  Ok(sse_response("order_details", listing))
}
