// core/src/live.rs

//! Listings that stay current. A `LiveListing` subscribes to row changes,
//! loads once, then reloads the whole listing after every matching
//! notification and publishes the result on a `watch` channel. Notification
//! payloads are only a trigger; local state is always replaced by a fresh
//! fetch. Dropping the listing stops its task and releases the subscription.

use crate::error::{ShopError, ShopResult};
use crate::models::{Order, OrderDetailView, Product};
use crate::store::{ChangeFilter, Notification, SortOrder, Store, Table};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info_span, Instrument};

/// The latest state of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingSnapshot<T> {
  /// Number of completed fetches, successful or not. 0 while the first load
  /// is still running.
  pub revision: u64,
  pub rows: Vec<T>,
  /// Set when the last fetch failed; `rows` then still holds the previous
  /// successful result.
  pub error: Option<String>,
}

impl<T> Default for ListingSnapshot<T> {
  fn default() -> Self {
    ListingSnapshot {
      revision: 0,
      rows: Vec::new(),
      error: None,
    }
  }
}

pub struct LiveListing<T> {
  rx: watch::Receiver<ListingSnapshot<T>>,
  task: JoinHandle<()>,
}

impl<T> LiveListing<T>
where
  T: Clone + Send + Sync + 'static,
{
  /// Subscribes with `filter` and keeps `fetch`'s result current. The
  /// subscription is opened before the first load so no change slips between
  /// the two.
  pub async fn spawn<F, Fut>(store: Arc<dyn Store>, filter: ChangeFilter, fetch: F) -> ShopResult<Self>
  where
    F: Fn(Arc<dyn Store>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ShopResult<Vec<T>>> + Send + 'static,
  {
    let mut subscription = store.subscribe(filter).await?;
    let (tx, rx) = watch::channel(ListingSnapshot::default());
    let span = info_span!("live_listing", table = filter.table.as_str(), order_id = ?filter.order_id);

    let task = tokio::spawn(
      async move {
        refresh(&store, &fetch, &tx).await;
        while let Some(notification) = subscription.next().await {
          match &notification {
            Notification::Change(event) => debug!(event = ?event.kind, id = event.id, "Change received, refetching."),
            Notification::Lagged(missed) => debug!(missed, "Missed changes, refetching."),
          }
          if tx.is_closed() {
            break;
          }
          refresh(&store, &fetch, &tx).await;
        }
        debug!("Live listing stopped.");
      }
      .instrument(span),
    );

    Ok(Self { rx, task })
  }

  pub fn snapshot(&self) -> ListingSnapshot<T> {
    self.rx.borrow().clone()
  }

  /// Waits until a fetch newer than the last one seen has been published.
  pub async fn changed(&mut self) -> ShopResult<()> {
    self
      .rx
      .changed()
      .await
      .map_err(|_| ShopError::Internal("live listing task ended".to_string()))
  }

  /// Waits until at least `revision` fetches have completed.
  pub async fn wait_for_revision(&mut self, revision: u64) -> ShopResult<ListingSnapshot<T>> {
    let snapshot = self
      .rx
      .wait_for(|s| s.revision >= revision)
      .await
      .map_err(|_| ShopError::Internal("live listing task ended".to_string()))?;
    Ok(snapshot.clone())
  }
}

impl LiveListing<Order> {
  /// Every order, newest first.
  pub async fn orders(store: Arc<dyn Store>) -> ShopResult<Self> {
    LiveListing::spawn(store, ChangeFilter::table(Table::Orders), |store: Arc<dyn Store>| async move {
      store.list_orders().await
    })
    .await
  }
}

impl LiveListing<Product> {
  pub async fn products(store: Arc<dyn Store>, order: SortOrder) -> ShopResult<Self> {
    LiveListing::spawn(store, ChangeFilter::table(Table::Products), move |store: Arc<dyn Store>| async move {
      store.list_products(order).await
    })
    .await
  }
}

impl LiveListing<OrderDetailView> {
  /// Detail rows of one order; changes to other orders' details are ignored.
  pub async fn order_details(store: Arc<dyn Store>, order_id: i64) -> ShopResult<Self> {
    LiveListing::spawn(store, ChangeFilter::details_of(order_id), move |store: Arc<dyn Store>| async move {
      store.list_order_details(order_id).await
    })
    .await
  }
}

impl<T> Drop for LiveListing<T> {
  fn drop(&mut self) {
    self.task.abort();
  }
}

async fn refresh<T, F, Fut>(store: &Arc<dyn Store>, fetch: &F, tx: &watch::Sender<ListingSnapshot<T>>)
where
  F: Fn(Arc<dyn Store>) -> Fut,
  Fut: Future<Output = ShopResult<Vec<T>>>,
{
  let result = fetch(Arc::clone(store)).await;
  tx.send_modify(|snapshot| {
    snapshot.revision += 1;
    match result {
      Ok(rows) => {
        snapshot.rows = rows;
        snapshot.error = None;
      }
      Err(e) => {
        error!(error = %e, "Listing refetch failed; keeping previous rows.");
        snapshot.error = Some(e.user_message());
      }
    }
  });
}
