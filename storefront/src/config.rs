// storefront/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use storefront_core::CheckoutPolicy;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// Absent: run against the in-process store.
  pub database_url: Option<String>,
  pub apply_schema: bool,
  /// Seed a demo catalog into an empty in-process store.
  pub seed_db: bool,
  pub checkout: CheckoutPolicy,
  /// Where the dashboard's "today" starts.
  pub utc_offset_hours: i32,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|name| env::var(name).ok())
  }

  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |var_name: &str| lookup(var_name).filter(|v| !v.trim().is_empty());

    fn parse<T: FromStr>(var_name: &str, raw: Option<String>, default: T) -> Result<T>
    where
      T::Err: std::fmt::Display,
    {
      match raw {
        Some(value) => value
          .trim()
          .parse::<T>()
          .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", var_name, value, e))),
        None => Ok(default),
      }
    }

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = parse("SERVER_PORT", get_env("SERVER_PORT"), 8080u16)?;
    let database_url = get_env("DATABASE_URL");
    let apply_schema = parse("APPLY_SCHEMA", get_env("APPLY_SCHEMA"), false)?;
    let seed_db = parse("SEED_DB", get_env("SEED_DB"), false)?;

    let checkout = CheckoutPolicy {
      strict_phone: parse("CHECKOUT_STRICT_PHONE", get_env("CHECKOUT_STRICT_PHONE"), false)?,
      reprice_at_checkout: parse("CHECKOUT_REPRICE", get_env("CHECKOUT_REPRICE"), false)?,
      rollback_orphaned_orders: parse("CHECKOUT_ROLLBACK_ORPHANS", get_env("CHECKOUT_ROLLBACK_ORPHANS"), false)?,
    };

    let utc_offset_hours = parse("STORE_UTC_OFFSET_HOURS", get_env("STORE_UTC_OFFSET_HOURS"), 7i32)?;
    if !(-12..=14).contains(&utc_offset_hours) {
      return Err(AppError::Config(format!(
        "STORE_UTC_OFFSET_HOURS must be between -12 and 14, got {}",
        utc_offset_hours
      )));
    }

    if apply_schema && database_url.is_none() {
      tracing::warn!("APPLY_SCHEMA is set but DATABASE_URL is not; ignoring.");
    }

    let store_kind = if database_url.is_some() { "postgres" } else { "memory" };
    tracing::info!(
      store = store_kind,
      ?checkout,
      "Application configuration loaded successfully."
    );

    Ok(Self {
      server_host,
      server_port,
      database_url,
      apply_schema,
      seed_db,
      checkout,
      utc_offset_hours,
    })
  }
}
