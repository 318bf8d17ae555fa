//! In-memory quote source for offline runs and tests.

use async_trait::async_trait;
use harvest_core::{HarvestError, QuoteSource};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct StaticQuoteSource {
    prices: HashMap<String, f64>,
}

impl StaticQuoteSource {
    pub fn new(prices: HashMap<String, f64>) -> Self {
        Self { prices }
    }

    pub fn with_price(mut self, ticker: &str, price: f64) -> Self {
        self.prices.insert(ticker.to_string(), price);
        self
    }

    /// Load a `{"AAPL": 150.0, ...}` price file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, HarvestError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            HarvestError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let prices = serde_json::from_str(&json).map_err(|e| {
            HarvestError::ConfigError(format!("invalid price file {}: {}", path.display(), e))
        })?;
        Ok(Self::new(prices))
    }
}

#[async_trait]
impl QuoteSource for StaticQuoteSource {
    async fn current_price(&self, ticker: &str) -> Result<f64, HarvestError> {
        self.prices
            .get(ticker)
            .copied()
            .ok_or_else(|| HarvestError::QuoteUnavailable {
                ticker: ticker.to_string(),
                reason: "no price on file".to_string(),
            })
    }
}
