use crate::HarvestError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Lowest accepted federal marginal bracket
pub const MIN_TAX_BRACKET: f64 = 0.10;
/// Highest accepted federal marginal bracket
pub const MAX_TAX_BRACKET: f64 = 0.37;

const MAX_TICKER_LEN: usize = 10;

/// A position as submitted by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub ticker: String,
    pub shares: f64,
    /// Total dollars paid for the position
    pub cost_basis: f64,
    /// Purchase date in YYYY-MM-DD format
    pub purchase_date: String,
}

impl Position {
    pub fn new(ticker: &str, shares: f64, cost_basis: f64, purchase_date: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            shares,
            cost_basis,
            purchase_date: purchase_date.to_string(),
        }
    }

    /// Reject positions that cannot be enriched
    pub fn validate(&self) -> Result<(), HarvestError> {
        let invalid = |reason: String| HarvestError::InvalidPosition {
            ticker: self.ticker.clone(),
            reason,
        };

        if self.ticker.is_empty() {
            return Err(invalid("ticker is empty".to_string()));
        }
        if self.ticker.len() > MAX_TICKER_LEN {
            return Err(invalid(format!(
                "ticker is longer than {} characters",
                MAX_TICKER_LEN
            )));
        }
        if !self
            .ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return Err(invalid("ticker contains invalid characters".to_string()));
        }
        if !self.shares.is_finite() || self.shares <= 0.0 {
            return Err(invalid(format!("shares must be positive, got {}", self.shares)));
        }
        if !self.cost_basis.is_finite() || self.cost_basis <= 0.0 {
            return Err(invalid(format!(
                "cost basis must be positive, got {}",
                self.cost_basis
            )));
        }

        Ok(())
    }
}

/// Portfolio submitted for analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioRequest {
    pub positions: Vec<Position>,
    /// Federal marginal bracket, applied to short-term losses
    pub tax_bracket: f64,
}

impl PortfolioRequest {
    pub fn validate_tax_bracket(&self) -> Result<(), HarvestError> {
        validate_tax_bracket(self.tax_bracket)
    }
}

pub fn validate_tax_bracket(rate: f64) -> Result<(), HarvestError> {
    if rate.is_finite() && (MIN_TAX_BRACKET..=MAX_TAX_BRACKET).contains(&rate) {
        Ok(())
    } else {
        Err(HarvestError::InvalidTaxBracket(rate))
    }
}

/// Position priced and classified as of one evaluation instant.
///
/// Built once by the enricher. If the price changes, enrich the raw
/// position again instead of editing these fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedPosition {
    pub ticker: String,
    pub shares: f64,
    pub cost_basis: f64,
    pub purchase_date: String,
    pub current_price: f64,
    pub current_value: f64,
    /// Signed; negative is a loss
    pub unrealized_gain_loss: f64,
    pub holding_period_days: i64,
    pub is_long_term: bool,
}

impl EnrichedPosition {
    /// Loss as a positive number, zero for gains
    pub fn loss_magnitude(&self) -> f64 {
        if self.unrealized_gain_loss < 0.0 {
            -self.unrealized_gain_loss
        } else {
            0.0
        }
    }
}

/// A security that can be bought in place of a harvested one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementEntry {
    pub ticker: String,
    pub name: String,
}

impl ReplacementEntry {
    pub fn new(ticker: &str, name: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            name: name.to_string(),
        }
    }
}

/// A tax-loss harvesting opportunity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestOpportunity {
    pub ticker: String,
    pub shares: f64,
    /// Unrealized loss (positive number)
    pub unrealized_loss: f64,
    pub replacement_ticker: String,
    pub replacement_name: String,
    pub tax_savings: f64,
    pub is_long_term: bool,
    /// Sell, buy the replacement, rebuy reminder
    pub action_steps: [String; 3],
    /// First date the original can be bought back
    pub rebuy_date: NaiveDate,
}

/// Ranked opportunities with totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub total_tax_savings: f64,
    pub opportunities: Vec<HarvestOpportunity>,
    pub summary: String,
    pub annual_projection: f64,
}

/// Why a position was excluded or degraded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidPosition,
    QuoteUnavailable,
    DateParseFailure,
}

/// Per-position problem reported alongside the result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionFailure {
    pub ticker: String,
    pub kind: FailureKind,
    pub message: String,
}

impl PositionFailure {
    /// Build from a per-position error; `None` for batch-level errors
    pub fn from_error(error: &HarvestError) -> Option<Self> {
        let kind = match error {
            HarvestError::InvalidPosition { .. } => FailureKind::InvalidPosition,
            HarvestError::QuoteUnavailable { .. } => FailureKind::QuoteUnavailable,
            HarvestError::DateParseFailure { .. } => FailureKind::DateParseFailure,
            _ => return None,
        };

        Some(Self {
            ticker: error.ticker().unwrap_or_default().to_string(),
            kind,
            message: error.to_string(),
        })
    }
}

/// Full outcome of one portfolio evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestReport {
    #[serde(flatten)]
    pub result: AnalysisResult,
    /// Positions left out of the result
    pub failures: Vec<PositionFailure>,
    /// Positions included with degraded data
    pub warnings: Vec<PositionFailure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    pub evaluated_at: DateTime<Utc>,
}

impl HarvestReport {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}
