// core/src/cart/storage.rs

//! Durable, device-local persistence for the cart. The on-disk format is a
//! JSON object of string keys; the cart occupies `CART_KEY` and other keys are
//! left untouched.

use super::Cart;
use crate::error::{ShopError, ShopResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, instrument, warn};

pub const CART_KEY: &str = "cart";

#[async_trait]
pub trait CartStorage: Send + Sync + 'static {
  /// `None` when nothing has been saved yet.
  async fn load(&self) -> ShopResult<Option<Cart>>;

  /// Replaces the stored cart with `cart`.
  async fn save(&self, cart: &Cart) -> ShopResult<()>;

  async fn clear(&self) -> ShopResult<()>;
}

/// Stores the cart inside a JSON document on disk.
#[derive(Debug, Clone)]
pub struct FileCartStorage {
  path: PathBuf,
}

impl FileCartStorage {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  async fn read_document(&self) -> ShopResult<Option<Map<String, Value>>> {
    match tokio::fs::read_to_string(&self.path).await {
      Ok(raw) if raw.trim().is_empty() => Ok(Some(Map::new())),
      Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }

  /// A malformed document is replaced rather than blocking every write.
  async fn read_document_for_update(&self) -> ShopResult<Map<String, Value>> {
    match self.read_document().await {
      Ok(doc) => Ok(doc.unwrap_or_default()),
      Err(ShopError::Storage(msg)) if msg.starts_with("malformed") => {
        warn!(path = %self.path.display(), error = %msg, "Discarding malformed storage document.");
        Ok(Map::new())
      }
      Err(e) => Err(e),
    }
  }

  async fn write_document(&self, doc: &Map<String, Value>) -> ShopResult<()> {
    if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
      tokio::fs::create_dir_all(parent).await?;
    }
    let raw = serde_json::to_string_pretty(doc)?;
    tokio::fs::write(&self.path, raw).await?;
    Ok(())
  }
}

#[async_trait]
impl CartStorage for FileCartStorage {
  #[instrument(name = "file_cart_storage::load", skip(self), fields(path = %self.path.display()))]
  async fn load(&self) -> ShopResult<Option<Cart>> {
    let Some(doc) = self.read_document().await? else {
      return Ok(None);
    };
    match doc.get(CART_KEY) {
      Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
      None => Ok(None),
    }
  }

  #[instrument(name = "file_cart_storage::save", skip(self, cart), fields(lines = cart.len()))]
  async fn save(&self, cart: &Cart) -> ShopResult<()> {
    let mut doc = self.read_document_for_update().await?;
    doc.insert(CART_KEY.to_string(), serde_json::to_value(cart)?);
    self.write_document(&doc).await?;
    debug!("Cart persisted.");
    Ok(())
  }

  #[instrument(name = "file_cart_storage::clear", skip(self))]
  async fn clear(&self) -> ShopResult<()> {
    let mut doc = self.read_document_for_update().await?;
    if doc.remove(CART_KEY).is_some() {
      self.write_document(&doc).await?;
    }
    Ok(())
  }
}

/// Keeps the serialized cart in memory. Counts saves so tests can check that
/// every mutation was persisted.
#[derive(Debug, Default)]
pub struct MemoryCartStorage {
  slot: Mutex<Option<String>>,
  saves: AtomicUsize,
}

impl MemoryCartStorage {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn save_count(&self) -> usize {
    self.saves.load(Ordering::SeqCst)
  }

  /// The stored JSON, as a persisted document would hold it.
  pub fn raw(&self) -> Option<String> {
    self.slot.lock().clone()
  }
}

#[async_trait]
impl CartStorage for MemoryCartStorage {
  async fn load(&self) -> ShopResult<Option<Cart>> {
    let raw = self.slot.lock().clone();
    match raw {
      Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
      None => Ok(None),
    }
  }

  async fn save(&self, cart: &Cart) -> ShopResult<()> {
    let raw = serde_json::to_string(cart)?;
    *self.slot.lock() = Some(raw);
    self.saves.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }

  async fn clear(&self) -> ShopResult<()> {
    *self.slot.lock() = None;
    Ok(())
  }
}
