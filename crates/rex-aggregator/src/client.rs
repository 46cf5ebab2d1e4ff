use async_trait::async_trait;

use crate::types::{PriorityFeeLamports, Quote};

#[async_trait]
pub trait AggregatorClient: Send + Sync {
    /// Fetches a route quote. Returns `None` on any schema breach or
    /// exhausted retry — never a partially-filled `Quote`.
    async fn quote(&self, input_mint: &str, output_mint: &str, amount_in_smallest_unit: u64, slippage_bps: u32) -> Option<Quote>;

    /// Builds swap transaction bytes for a previously obtained quote. Not
    /// retried internally — the attempt ladder owns retry policy here.
    async fn build_swap(&self, quote: &Quote, user_address: &str, priority_fee: PriorityFeeLamports) -> Option<Vec<u8>>;
}

pub struct HttpAggregatorClient {
    base_url: String,
    client: reqwest::Client,
    max_quote_retries: u32,
}

impl HttpAggregatorClient {
    pub fn new(base_url: String, max_quote_retries: u32) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
            max_quote_retries,
        }
    }

    async fn fetch_quote_once(
        &self,
        input_mint: &str,
        output_mint: &str,
        amount: u64,
        slippage_bps: u32,
    ) -> Result<serde_json::Value, QuoteAttemptError> {
        let url = format!("{}/quote", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("inputMint", input_mint.to_string()),
                ("outputMint", output_mint.to_string()),
                ("amount", amount.to_string()),
                ("slippageBps", slippage_bps.to_string()),
            ])
            .send()
            .await
            .map_err(|e| QuoteAttemptError::Terminal(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(QuoteAttemptError::Retryable);
        }
        if !status.is_success() {
            return Err(QuoteAttemptError::Terminal(format!("http status {status}")));
        }

        resp.json::<serde_json::Value>()
            .await
            .map_err(|e| QuoteAttemptError::Terminal(format!("invalid json body: {e}")))
    }
}

enum QuoteAttemptError {
    Retryable,
    Terminal(String),
}

#[async_trait]
impl AggregatorClient for HttpAggregatorClient {
    async fn quote(&self, input_mint: &str, output_mint: &str, amount_in_smallest_unit: u64, slippage_bps: u32) -> Option<Quote> {
        let mut delay_ms: u64 = 200;
        for attempt in 0..=self.max_quote_retries {
            match self
                .fetch_quote_once(input_mint, output_mint, amount_in_smallest_unit, slippage_bps)
                .await
            {
                Ok(raw) => return Quote::from_json(&raw),
                Err(QuoteAttemptError::Terminal(msg)) => {
                    tracing::warn!(attempt, error = %msg, "quote request failed terminally");
                    return None;
                }
                Err(QuoteAttemptError::Retryable) => {
                    if attempt == self.max_quote_retries {
                        tracing::warn!("quote retries exhausted");
                        return None;
                    }
                    tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                    delay_ms = (delay_ms * 2).min(5_000);
                }
            }
        }
        None
    }

    async fn build_swap(&self, quote: &Quote, user_address: &str, priority_fee: PriorityFeeLamports) -> Option<Vec<u8>> {
        let url = format!("{}/swap", self.base_url);
        let body = serde_json::json!({
            "quoteResponse": {
                "inAmount": quote.in_amount.to_string(),
                "outAmount": quote.out_amount.to_string(),
                "routePlan": quote.route_plan,
                "priceImpactPct": (quote.price_impact_bps as f64 / 100.0).to_string(),
            },
            "userPublicKey": user_address,
            "wrapAndUnwrapSol": true,
            "prioritizationFeeLamports": priority_fee.to_json(),
        });

        let resp = self.client.post(&url).json(&body).send().await.ok()?;
        if !resp.status().is_success() {
            return None;
        }
        let parsed: serde_json::Value = resp.json().await.ok()?;
        let b64 = parsed.get("swapTransaction")?.as_str()?;
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.decode(b64).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_fee_serializes_auto_as_string() {
        assert_eq!(PriorityFeeLamports::Auto.to_json(), serde_json::Value::String("auto".to_string()));
    }

    #[test]
    fn priority_fee_serializes_fixed_as_number() {
        assert_eq!(PriorityFeeLamports::Fixed(5000).to_json(), serde_json::json!(5000));
    }
}
