use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub pricing: PricingConfig,
}

/// Business constants the pricing and cart code treat as configuration
/// rather than algorithm: drift tolerance, shipping step rates and the
/// domestic tax rule. Money values are minor currency units (cents).
#[derive(Debug, Clone)]
pub struct PricingConfig {
    /// Percent a variant's live price may drift from the cart snapshot
    /// before validation reports a price change.
    pub price_drift_percent: f64,
    /// Shipping estimate for a single unit.
    pub shipping_single: i64,
    /// 2-3 units.
    pub shipping_small: i64,
    /// 4-5 units.
    pub shipping_medium: i64,
    /// 6 or more units.
    pub shipping_bulk: i64,
    /// Flat tax percent applied when shipping to the domestic country.
    pub tax_percent: f64,
    /// ISO country code the tax estimate applies to.
    pub domestic_country: String,
    /// Cart items untouched for this many days are eligible for the sweep.
    pub stale_cart_days: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            price_drift_percent: 5.0,
            shipping_single: 499,
            shipping_small: 699,
            shipping_medium: 899,
            shipping_bulk: 0,
            tax_percent: 19.0,
            domestic_country: "DE".to_string(),
            stale_cart_days: 30,
        }
    }
}

impl PricingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            price_drift_percent: env_parse("PRICE_DRIFT_PERCENT", defaults.price_drift_percent),
            shipping_single: env_parse("SHIPPING_RATE_SINGLE", defaults.shipping_single),
            shipping_small: env_parse("SHIPPING_RATE_SMALL", defaults.shipping_small),
            shipping_medium: env_parse("SHIPPING_RATE_MEDIUM", defaults.shipping_medium),
            shipping_bulk: env_parse("SHIPPING_RATE_BULK", defaults.shipping_bulk),
            tax_percent: env_parse("TAX_PERCENT", defaults.tax_percent),
            domestic_country: env::var("DOMESTIC_COUNTRY").unwrap_or(defaults.domestic_country),
            stale_cart_days: env_parse("STALE_CART_DAYS", defaults.stale_cart_days),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        Ok(Self {
            port,
            database_url,
            host,
            pricing: PricingConfig::from_env(),
        })
    }
}
