use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Price used when no quote has ever been obtained.
pub const FALLBACK_UNIT_PRICE: f64 = 100_000.0;
pub const DEFAULT_PRICE_TTL: Duration = Duration::from_secs(300);
pub const UNIT_PRICE_KEY: &str = "unit-price";

#[derive(Debug, Error)]
pub enum PriceError {
    #[error("price source unavailable: {0}")]
    Unavailable(String),
    #[error("price source returned an unusable quote: {0}")]
    InvalidQuote(f64),
}

pub trait PriceSource {
    fn fetch_unit_price(&self) -> Result<f64, PriceError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConfiguredPriceSource {
    price: Option<f64>,
}

impl ConfiguredPriceSource {
    pub fn new(price: Option<f64>) -> Self {
        Self { price }
    }
}

impl PriceSource for ConfiguredPriceSource {
    fn fetch_unit_price(&self) -> Result<f64, PriceError> {
        self.price
            .ok_or_else(|| PriceError::Unavailable("no unit price configured".to_string()))
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedPrice {
    value: f64,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct PriceCache {
    ttl: Duration,
    entries: HashMap<String, CachedPrice>,
}

impl PriceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn get_fresh(&self, key: &str, now: Instant) -> Option<f64> {
        self.entries
            .get(key)
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.value)
    }

    pub fn get_stale(&self, key: &str) -> Option<f64> {
        self.entries.get(key).map(|entry| entry.value)
    }

    pub fn insert(&mut self, key: &str, value: f64, now: Instant) {
        self.entries.insert(
            key.to_string(),
            CachedPrice {
                value,
                expires_at: now + self.ttl,
            },
        );
    }
}

impl Default for PriceCache {
    fn default() -> Self {
        Self::new(DEFAULT_PRICE_TTL)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceOrigin {
    Supplied,
    Live,
    Cached,
    Stale,
    Fallback,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    pub price: f64,
    pub origin: PriceOrigin,
}

impl PriceQuote {
    pub fn supplied(price: f64) -> Self {
        Self {
            price,
            origin: PriceOrigin::Supplied,
        }
    }
}

pub fn current_unit_price<S: PriceSource + ?Sized>(
    source: &S,
    cache: &mut PriceCache,
    now: Instant,
) -> PriceQuote {
    if let Some(price) = cache.get_fresh(UNIT_PRICE_KEY, now) {
        return PriceQuote {
            price,
            origin: PriceOrigin::Cached,
        };
    }

    let fetched = source.fetch_unit_price().and_then(|price| {
        if price.is_finite() && price > 0.0 {
            Ok(price)
        } else {
            Err(PriceError::InvalidQuote(price))
        }
    });

    match fetched {
        Ok(price) => {
            debug!(price, "fetched live unit price");
            cache.insert(UNIT_PRICE_KEY, price, now);
            PriceQuote {
                price,
                origin: PriceOrigin::Live,
            }
        }
        Err(err) => match cache.get_stale(UNIT_PRICE_KEY) {
            Some(price) => {
                warn!(error = %err, price, "price lookup failed; using stale cached price");
                PriceQuote {
                    price,
                    origin: PriceOrigin::Stale,
                }
            }
            None => {
                warn!(
                    error = %err,
                    price = FALLBACK_UNIT_PRICE,
                    "price lookup failed; using fallback price"
                );
                PriceQuote {
                    price: FALLBACK_UNIT_PRICE,
                    origin: PriceOrigin::Fallback,
                }
            }
        },
    }
}
