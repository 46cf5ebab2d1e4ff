use serde::{Deserialize, Serialize};

/// Validated route quote. Construction only succeeds when every required
/// field is present — a schema breach never yields a partially-filled Quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub in_amount: u64,
    pub out_amount: u64,
    pub route_plan: serde_json::Value,
    pub price_impact_bps: u32,
}

impl Quote {
    /// Parses a quote response body, requiring `inAmount`, `outAmount`, and
    /// `priceImpactPct` (converted to bps). `routePlan` defaults to an empty
    /// array if absent — it is carried through opaquely, never interpreted.
    pub fn from_json(v: &serde_json::Value) -> Option<Self> {
        let in_amount = v.get("inAmount")?.as_str()?.parse::<u64>().ok()?;
        let out_amount = v.get("outAmount")?.as_str()?.parse::<u64>().ok()?;
        let price_impact_pct: f64 = v
            .get("priceImpactPct")?
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .or_else(|| v.get("priceImpactPct").and_then(|x| x.as_f64()))?;
        let route_plan = v.get("routePlan").cloned().unwrap_or(serde_json::Value::Array(vec![]));

        Some(Quote {
            in_amount,
            out_amount,
            route_plan,
            price_impact_bps: (price_impact_pct * 100.0).round() as u32,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub enum PriorityFeeLamports {
    Auto,
    Fixed(u64),
}

impl PriorityFeeLamports {
    pub fn to_json(self) -> serde_json::Value {
        match self {
            PriorityFeeLamports::Auto => serde_json::Value::String("auto".to_string()),
            PriorityFeeLamports::Fixed(v) => serde_json::Value::Number(v.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_well_formed_quote() {
        let body = json!({
            "inAmount": "10000000",
            "outAmount": "100000000",
            "priceImpactPct": "0.12",
            "routePlan": [{"swapInfo": {}}]
        });
        let q = Quote::from_json(&body).unwrap();
        assert_eq!(q.in_amount, 10_000_000);
        assert_eq!(q.out_amount, 100_000_000);
        assert_eq!(q.price_impact_bps, 12);
    }

    #[test]
    fn missing_required_field_yields_none() {
        let body = json!({"inAmount": "1", "priceImpactPct": "0.1"});
        assert!(Quote::from_json(&body).is_none());
    }
}
