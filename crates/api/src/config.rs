//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use common::Money;
use domain::PricingPolicy;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string; unset selects the in-memory store
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `10`)
/// - `TAX_RATE_BPS`: tax rate in basis points (default: `1000`)
/// - `FLAT_SHIPPING_CENTS`: shipping fee below the threshold (default: `999`)
/// - `FREE_SHIPPING_OVER_CENTS`: subtotal above which shipping is free (default: `10000`)
/// - `CART_STALE_AFTER_DAYS`: idle days before an active cart is swept (default: `7`)
/// - `MAINTENANCE_INTERVAL_SECS`: seconds between sweeps (default: `86400`)
///
/// Unparseable values fall back to the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub tax_rate_bps: u32,
    pub flat_shipping_cents: i64,
    pub free_shipping_over_cents: i64,
    pub cart_stale_after_days: i64,
    pub maintenance_interval_secs: u64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            tax_rate_bps: parse_or(&lookup, "TAX_RATE_BPS", defaults.tax_rate_bps),
            flat_shipping_cents: parse_or(
                &lookup,
                "FLAT_SHIPPING_CENTS",
                defaults.flat_shipping_cents,
            ),
            free_shipping_over_cents: parse_or(
                &lookup,
                "FREE_SHIPPING_OVER_CENTS",
                defaults.free_shipping_over_cents,
            ),
            cart_stale_after_days: parse_or(
                &lookup,
                "CART_STALE_AFTER_DAYS",
                defaults.cart_stale_after_days,
            ),
            maintenance_interval_secs: parse_or(
                &lookup,
                "MAINTENANCE_INTERVAL_SECS",
                defaults.maintenance_interval_secs,
            ),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn pricing(&self) -> PricingPolicy {
        PricingPolicy::new(
            self.tax_rate_bps,
            Money::from_cents(self.flat_shipping_cents),
            Money::from_cents(self.free_shipping_over_cents),
        )
    }

    pub fn cart_stale_after(&self) -> chrono::Duration {
        chrono::Duration::days(self.cart_stale_after_days)
    }

    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance_interval_secs.max(1))
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            database_max_connections: 10,
            tax_rate_bps: 1000,
            flat_shipping_cents: 999,
            free_shipping_over_cents: 10000,
            cart_stale_after_days: 7,
            maintenance_interval_secs: 86400,
        }
    }
}
