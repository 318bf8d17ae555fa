use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use crate::{AnalysisResult, HarvestError};

/// Source of current market prices
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn current_price(&self, ticker: &str) -> Result<f64, HarvestError>;
}

/// Prose layer over computed results. Receives the result read-only.
#[async_trait]
pub trait RecommendationNarrator: Send + Sync {
    async fn narrate(&self, result: &AnalysisResult) -> Result<String, HarvestError>;
}

/// Supplies the evaluation instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Noon UTC on the given date
    pub fn on(date: NaiveDate) -> Self {
        Self(date.and_hms_opt(12, 0, 0).unwrap_or_default().and_utc())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
