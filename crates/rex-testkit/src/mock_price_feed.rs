//! Deterministic `PriceFeed`, promoted from the private test double used
//! inside `rex-price`'s own unit tests so scenario tests elsewhere in the
//! workspace can reuse it instead of redefining it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use rex_price::{FeedError, PriceFeed};

pub struct MockPriceFeed {
    name: &'static str,
    price: Mutex<Option<f64>>,
    calls: AtomicUsize,
}

impl MockPriceFeed {
    pub fn new(name: &'static str, price: Option<f64>) -> Self {
        Self { name, price: Mutex::new(price), calls: AtomicUsize::new(0) }
    }

    pub fn set_price(&self, price: Option<f64>) {
        *self.price.lock().unwrap() = price;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceFeed for MockPriceFeed {
    async fn fetch(&self, _base_mint: &str, _quote_mint: &str) -> Result<serde_json::Value, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match *self.price.lock().unwrap() {
            Some(p) => Ok(json!({ "price": p })),
            None => Err(FeedError::Other("mock feed has no price configured".to_string())),
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
