// core/src/store/change.rs

//! Row-change notifications. A store publishes one `ChangeEvent` per inserted,
//! updated or deleted row; listeners filter by table (and, for details, by
//! order) and react by refetching. Payloads are never merged into local state.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
  Products,
  Orders,
  OrderDetails,
}

impl Table {
  pub fn as_str(self) -> &'static str {
    match self {
      Table::Products => "products",
      Table::Orders => "orders",
      Table::OrderDetails => "order_details",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
  Insert,
  Update,
  Delete,
}

/// The JSON shape of a notification, shared by the in-memory feed and the
/// Postgres trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
  pub table: Table,
  #[serde(rename = "event")]
  pub kind: ChangeKind,
  pub id: i64,
  /// Set for `order_details` rows so per-order listeners can filter.
  #[serde(default)]
  pub order_id: Option<i64>,
}

/// Which events a listener cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeFilter {
  pub table: Table,
  pub order_id: Option<i64>,
}

impl ChangeFilter {
  pub fn table(table: Table) -> Self {
    ChangeFilter { table, order_id: None }
  }

  pub fn details_of(order_id: i64) -> Self {
    ChangeFilter {
      table: Table::OrderDetails,
      order_id: Some(order_id),
    }
  }

  pub fn matches(&self, event: &ChangeEvent) -> bool {
    if event.table != self.table {
      return false;
    }
    match self.order_id {
      Some(wanted) => event.order_id == Some(wanted),
      None => true,
    }
  }
}

/// What a subscription yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
  Change(ChangeEvent),
  /// The listener fell behind and dropped this many events. Callers that
  /// refetch treat it like a change.
  Lagged(u64),
}

/// Fan-out of change events to any number of subscribers.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
  tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
  pub fn new(capacity: usize) -> Self {
    let (tx, _rx) = broadcast::channel(capacity);
    ChangeFeed { tx }
  }

  /// Publishing with no subscribers is not an error.
  pub fn publish(&self, event: ChangeEvent) {
    let _ = self.tx.send(event);
  }

  pub fn subscribe(&self, filter: ChangeFilter) -> ChangeSubscription {
    ChangeSubscription {
      filter,
      rx: self.tx.subscribe(),
    }
  }
}

impl Default for ChangeFeed {
  fn default() -> Self {
    ChangeFeed::new(256)
  }
}

pub struct ChangeSubscription {
  filter: ChangeFilter,
  rx: broadcast::Receiver<ChangeEvent>,
}

impl ChangeSubscription {
  pub fn filter(&self) -> ChangeFilter {
    self.filter
  }

  /// Waits for the next matching notification. `None` once the feed is gone.
  pub async fn next(&mut self) -> Option<Notification> {
    loop {
      match self.rx.recv().await {
        Ok(event) if self.filter.matches(&event) => return Some(Notification::Change(event)),
        Ok(_) => continue,
        Err(broadcast::error::RecvError::Lagged(missed)) => {
          warn!(table = self.filter.table.as_str(), missed, "Change listener lagged behind.");
          return Some(Notification::Lagged(missed));
        }
        Err(broadcast::error::RecvError::Closed) => return None,
      }
    }
  }
}
