use async_trait::async_trait;

#[derive(Debug, Clone)]
pub enum FeedError {
    Network(String),
    RateLimited,
    Other(String),
}

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedError::Network(s) => write!(f, "network error: {s}"),
            FeedError::RateLimited => write!(f, "rate limited"),
            FeedError::Other(s) => write!(f, "{s}"),
        }
    }
}

impl std::error::Error for FeedError {}

/// A pluggable upstream price feed. Returns the raw JSON body so the oracle
/// itself performs schema validation at the edge — a feed implementation
/// must not pre-parse into a typed price, so that a missing/renamed field
/// upstream surfaces as a schema failure here rather than a silent default.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn fetch(&self, base_mint: &str, quote_mint: &str) -> Result<serde_json::Value, FeedError>;

    fn name(&self) -> &'static str;
}

/// A feed backed by a simple HTTP GET against a base URL, expecting a JSON
/// body with at least a `price` field. This is the shape both the primary
/// and secondary price sources take in production; what differs between
/// them is only the base URL and auth header.
pub struct HttpPriceFeed {
    name: &'static str,
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpPriceFeed {
    pub fn new(name: &'static str, base_url: String, api_key: Option<String>) -> Self {
        Self {
            name,
            base_url,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PriceFeed for HttpPriceFeed {
    async fn fetch(&self, base_mint: &str, quote_mint: &str) -> Result<serde_json::Value, FeedError> {
        let mut req = self
            .client
            .get(&self.base_url)
            .query(&[("base", base_mint), ("quote", quote_mint)]);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(|e| FeedError::Network(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(FeedError::RateLimited);
        }
        if !resp.status().is_success() {
            return Err(FeedError::Other(format!("http status {}", resp.status())));
        }

        resp.json::<serde_json::Value>()
            .await
            .map_err(|e| FeedError::Other(format!("invalid json body: {e}")))
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
