use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use rex_schemas::{Pair, PriceBounds, PricePoint, PriceSource};

use crate::backoff::SourceBackoff;
use crate::source::{FeedError, PriceFeed};

/// Outcome of a `get_price` call, distinguishing a fresh valid point from a
/// stale-but-returned one so the caller can apply the fail-closed rule
/// itself: stale is never valid for a trading decision.
pub enum PriceOutcome {
    Fresh(PricePoint),
    Stale { point: PricePoint, reason: String },
    Unavailable { reason: String },
}

struct CacheEntry {
    point: PricePoint,
}

/// Dual-source, fail-closed price provider. Never fabricates or
/// interpolates a price; a quote outside configured bounds is treated as
/// schema corruption, not a valid price.
pub struct PriceOracle {
    primary: Arc<dyn PriceFeed>,
    secondary: Arc<dyn PriceFeed>,
    bounds: HashMap<String, PriceBounds>,
    ttl: chrono::Duration,
    cache: std::sync::Mutex<HashMap<String, CacheEntry>>,
    primary_backoff: std::sync::Mutex<SourceBackoff>,
    secondary_backoff: std::sync::Mutex<SourceBackoff>,
}

impl PriceOracle {
    pub fn new(
        primary: Arc<dyn PriceFeed>,
        secondary: Arc<dyn PriceFeed>,
        bounds: HashMap<String, PriceBounds>,
        ttl: chrono::Duration,
    ) -> Self {
        let backoff_window = chrono::Duration::seconds(30);
        let backoff_max = chrono::Duration::minutes(5);
        Self {
            primary,
            secondary,
            bounds,
            ttl,
            cache: std::sync::Mutex::new(HashMap::new()),
            primary_backoff: std::sync::Mutex::new(SourceBackoff::new(backoff_window, backoff_max)),
            secondary_backoff: std::sync::Mutex::new(SourceBackoff::new(backoff_window, backoff_max)),
        }
    }

    pub async fn get_price(&self, pair: &Pair, now: DateTime<Utc>) -> PriceOutcome {
        let identity = pair.identity();

        if let Some(cached) = self.cached(&identity) {
            if cached.is_fresh(now, self.ttl) {
                return PriceOutcome::Fresh(cached);
            }
        }

        let mut reasons = Vec::new();

        if !self.primary_backoff.lock().unwrap().in_backoff(now) {
            match self.try_source(&self.primary, pair, PriceSource::Primary, now).await {
                Ok(point) => {
                    self.primary_backoff.lock().unwrap().record_success();
                    self.store(&identity, point.clone());
                    return PriceOutcome::Fresh(point);
                }
                Err(reason) => {
                    reasons.push(format!("primary:{reason}"));
                }
            }
        } else {
            reasons.push("primary:backoff".to_string());
        }

        if !self.secondary_backoff.lock().unwrap().in_backoff(now) {
            match self.try_source(&self.secondary, pair, PriceSource::Secondary, now).await {
                Ok(point) => {
                    self.secondary_backoff.lock().unwrap().record_success();
                    self.store(&identity, point.clone());
                    return PriceOutcome::Fresh(point);
                }
                Err(reason) => {
                    reasons.push(format!("secondary:{reason}"));
                }
            }
        } else {
            reasons.push("secondary:backoff".to_string());
        }

        let combined = reasons.join(",");
        if let Some(stale) = self.cached(&identity) {
            PriceOutcome::Stale {
                point: stale,
                reason: format!("stale_cache:age={}:{combined}", (now - stale_captured_at(&self.cache, &identity)).num_seconds()),
            }
        } else {
            PriceOutcome::Unavailable { reason: combined }
        }
    }

    async fn try_source(
        &self,
        feed: &Arc<dyn PriceFeed>,
        pair: &Pair,
        source: PriceSource,
        now: DateTime<Utc>,
    ) -> Result<PricePoint, String> {
        let raw = feed.fetch(&pair.base_mint, &pair.quote_mint).await;
        let raw = match raw {
            Ok(v) => v,
            Err(FeedError::RateLimited) => {
                self.record_failure(source, now);
                return Err("rate_limited".to_string());
            }
            Err(e) => {
                return Err(e.to_string());
            }
        };

        let price = extract_price(&raw).ok_or_else(|| "schema_missing_price".to_string())?;

        if !price.is_finite() || price <= 0.0 {
            return Err(format!("invalid_price:{price}"));
        }

        let identity = pair.identity();
        let bounds = self
            .bounds
            .get(&identity)
            .ok_or_else(|| format!("no_bounds_configured:{identity}"))?;
        if !bounds.contains(price) {
            return Err(format!("out_of_bounds:{price}"));
        }

        Ok(PricePoint {
            pair_identity: identity,
            price,
            captured_at: now,
            source,
            base_decimals: pair.base_decimals,
            quote_decimals: pair.quote_decimals,
        })
    }

    fn record_failure(&self, source: PriceSource, now: DateTime<Utc>) {
        match source {
            PriceSource::Primary => self.primary_backoff.lock().unwrap().record_failure(now),
            PriceSource::Secondary => self.secondary_backoff.lock().unwrap().record_failure(now),
        }
    }

    fn cached(&self, identity: &str) -> Option<PricePoint> {
        self.cache.lock().unwrap().get(identity).map(|e| e.point.clone())
    }

    fn store(&self, identity: &str, point: PricePoint) {
        self.cache.lock().unwrap().insert(identity.to_string(), CacheEntry { point });
    }
}

fn stale_captured_at(cache: &std::sync::Mutex<HashMap<String, CacheEntry>>, identity: &str) -> DateTime<Utc> {
    cache.lock().unwrap().get(identity).map(|e| e.point.captured_at).unwrap_or_else(Utc::now)
}

/// Validates the minimum required schema (`price` present and numeric);
/// unknown fields are discarded.
fn extract_price(raw: &serde_json::Value) -> Option<f64> {
    raw.get("price")?.as_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedFeed {
        name: &'static str,
        price: Option<f64>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PriceFeed for FixedFeed {
        async fn fetch(&self, _base: &str, _quote: &str) -> Result<serde_json::Value, FeedError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.price {
                Some(p) => Ok(json!({"price": p})),
                None => Err(FeedError::Other("boom".to_string())),
            }
        }
        fn name(&self) -> &'static str {
            self.name
        }
    }

    fn pair() -> Pair {
        Pair {
            base_symbol: "SOL".into(),
            quote_symbol: "USDC".into(),
            base_mint: "So1".into(),
            quote_mint: "USDC1".into(),
            base_decimals: 9,
            quote_decimals: 6,
        }
    }

    fn bounds() -> HashMap<String, PriceBounds> {
        let mut m = HashMap::new();
        m.insert("SOL/USDC".to_string(), PriceBounds { low: 50.0, high: 500.0 });
        m
    }

    #[tokio::test]
    async fn primary_success_returns_fresh() {
        let primary = Arc::new(FixedFeed { name: "primary", price: Some(100.0), calls: AtomicUsize::new(0) });
        let secondary = Arc::new(FixedFeed { name: "secondary", price: Some(100.0), calls: AtomicUsize::new(0) });
        let oracle = PriceOracle::new(primary, secondary, bounds(), chrono::Duration::seconds(10));
        match oracle.get_price(&pair(), Utc::now()).await {
            PriceOutcome::Fresh(p) => assert_eq!(p.price, 100.0),
            _ => panic!("expected fresh price"),
        }
    }

    #[tokio::test]
    async fn falls_back_to_secondary_on_primary_failure() {
        let primary = Arc::new(FixedFeed { name: "primary", price: None, calls: AtomicUsize::new(0) });
        let secondary = Arc::new(FixedFeed { name: "secondary", price: Some(120.0), calls: AtomicUsize::new(0) });
        let oracle = PriceOracle::new(primary, secondary, bounds(), chrono::Duration::seconds(10));
        match oracle.get_price(&pair(), Utc::now()).await {
            PriceOutcome::Fresh(p) => assert_eq!(p.price, 120.0),
            _ => panic!("expected fresh price from secondary"),
        }
    }

    #[tokio::test]
    async fn out_of_bounds_price_is_rejected() {
        let primary = Arc::new(FixedFeed { name: "primary", price: Some(5.0), calls: AtomicUsize::new(0) });
        let secondary = Arc::new(FixedFeed { name: "secondary", price: Some(5.0), calls: AtomicUsize::new(0) });
        let oracle = PriceOracle::new(primary, secondary, bounds(), chrono::Duration::seconds(10));
        match oracle.get_price(&pair(), Utc::now()).await {
            PriceOutcome::Unavailable { reason } => assert!(reason.contains("out_of_bounds")),
            _ => panic!("expected unavailable due to bounds"),
        }
    }

    #[tokio::test]
    async fn both_sources_down_returns_stale_cache_when_present() {
        let primary = Arc::new(FixedFeed { name: "primary", price: Some(100.0), calls: AtomicUsize::new(0) });
        let secondary = Arc::new(FixedFeed { name: "secondary", price: Some(100.0), calls: AtomicUsize::new(0) });
        let ttl = chrono::Duration::seconds(1);
        let oracle = PriceOracle::new(primary.clone(), secondary.clone(), bounds(), ttl);
        let t0 = Utc::now();
        let _ = oracle.get_price(&pair(), t0).await;

        let primary_down = Arc::new(FixedFeed { name: "primary", price: None, calls: AtomicUsize::new(0) });
        let secondary_down = Arc::new(FixedFeed { name: "secondary", price: None, calls: AtomicUsize::new(0) });
        let oracle2 = PriceOracle::new(primary_down, secondary_down, bounds(), ttl);
        oracle2.store(&pair().identity(), PricePoint {
            pair_identity: pair().identity(),
            price: 100.0,
            captured_at: t0,
            source: PriceSource::Primary,
            base_decimals: 9,
            quote_decimals: 6,
        });
        let t1 = t0 + chrono::Duration::seconds(5);
        match oracle2.get_price(&pair(), t1).await {
            PriceOutcome::Stale { point, reason } => {
                assert_eq!(point.price, 100.0);
                assert!(reason.starts_with("stale_cache:"));
            }
            _ => panic!("expected stale cache fallback"),
        }
    }
}
