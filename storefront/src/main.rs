// storefront/src/main.rs

mod config;
mod errors;
mod state;
mod web;

use crate::config::AppConfig;
use crate::state::AppState;

use actix_web::{web as actix_data, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use storefront_core::models::NewProduct;
use storefront_core::{MemoryStore, PgStore, Store};
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

fn demo_catalog() -> Vec<NewProduct> {
  [
    ("Ca phe sua da", 29_000),
    ("Tra dao cam sa", 45_000),
    ("Banh mi pate", 25_000),
    ("Banh flan", 18_000),
  ]
  .into_iter()
  .map(|(name, price)| NewProduct {
    name: name.to_string(),
    price,
    image_url: String::new(),
    description: None,
  })
  .collect()
}

async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn Store>> {
  match &config.database_url {
    Some(url) => {
      let store = PgStore::connect(url)
        .await
        .context("Failed to connect to the database")?;
      tracing::info!("Successfully connected to the database.");
      if config.apply_schema {
        store.apply_schema().await.context("Failed to apply the database schema")?;
        tracing::info!("Database schema applied.");
      }
      if config.seed_db {
        tracing::warn!("SEED_DB only seeds the in-process store; ignoring.");
      }
      Ok(Arc::new(store))
    }
    None => {
      let store = MemoryStore::new();
      if config.seed_db {
        let seeded = store
          .seed_products(demo_catalog())
          .await
          .context("Failed to seed the in-process store")?;
        tracing::info!("Seeded {} demo products.", seeded.len());
      }
      tracing::warn!("DATABASE_URL is not set; data lives in memory and is lost on restart.");
      Ok(Arc::new(store))
    }
  }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting storefront server...");

  let app_config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(anyhow::anyhow!("configuration error: {}", e));
    }
  };

  let store = build_store(&app_config).await?;
  let app_state = AppState::new(store, app_config.clone());

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(web::configure_app_routes)
  })
  .bind(&server_address)
  .with_context(|| format!("Failed to bind {}", server_address))?
  .run()
  .await
  .context("Server terminated with an error")
}
