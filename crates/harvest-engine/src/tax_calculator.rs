//! Tax Calculator
//!
//! Two-tier rate model: short-term losses offset ordinary income at the
//! filer's bracket, long-term losses at a flat capital gains rate.

use harvest_core::{
    round_cents, validate_tax_bracket, EnrichedPosition, HarvestError, HarvestOpportunity,
};
use serde::{Deserialize, Serialize};

/// Capital gains rate applied to long-term losses. Fixed, not user-adjustable.
pub const LONG_TERM_RATE: f64 = 0.15;

/// Multiplier from one harvest to projected annual savings, assuming a
/// quarterly harvesting cadence. Fixed policy constant.
pub const ANNUAL_HARVEST_MULTIPLIER: f64 = 3.0;

/// Holding period classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldingPeriod {
    ShortTerm,
    LongTerm,
}

impl HoldingPeriod {
    pub fn from_long_term(is_long_term: bool) -> Self {
        if is_long_term {
            HoldingPeriod::LongTerm
        } else {
            HoldingPeriod::ShortTerm
        }
    }

    pub fn is_long_term(&self) -> bool {
        matches!(self, HoldingPeriod::LongTerm)
    }
}

impl std::fmt::Display for HoldingPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HoldingPeriod::ShortTerm => write!(f, "Short-term"),
            HoldingPeriod::LongTerm => write!(f, "Long-term"),
        }
    }
}

/// Rates for one filer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxRates {
    /// Marginal bracket, applied to short-term losses
    pub ordinary_income_rate: f64,
    /// Applied to long-term losses
    pub long_term_rate: f64,
}

/// Tax estimate for harvesting one position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxEstimate {
    /// Loss amount (positive)
    pub loss: f64,
    pub holding_period: HoldingPeriod,
    /// Applicable tax rate
    pub tax_rate: f64,
    pub tax_savings: f64,
}

pub struct TaxCalculator {
    rates: TaxRates,
}

impl TaxCalculator {
    /// Create a calculator for a filer in the given bracket
    pub fn new(ordinary_income_rate: f64) -> Result<Self, HarvestError> {
        validate_tax_bracket(ordinary_income_rate)?;
        Ok(Self {
            rates: TaxRates {
                ordinary_income_rate,
                long_term_rate: LONG_TERM_RATE,
            },
        })
    }

    pub fn rates(&self) -> &TaxRates {
        &self.rates
    }

    pub fn rate_for(&self, holding_period: HoldingPeriod) -> f64 {
        match holding_period {
            HoldingPeriod::ShortTerm => self.rates.ordinary_income_rate,
            HoldingPeriod::LongTerm => self.rates.long_term_rate,
        }
    }

    /// Estimate savings from realizing a position's loss. Gains save nothing.
    pub fn estimate(&self, position: &EnrichedPosition) -> TaxEstimate {
        let holding_period = HoldingPeriod::from_long_term(position.is_long_term);
        let tax_rate = self.rate_for(holding_period);
        let loss = position.loss_magnitude();

        TaxEstimate {
            loss,
            holding_period,
            tax_rate,
            tax_savings: round_cents(loss * tax_rate),
        }
    }

    pub fn tax_savings(&self, position: &EnrichedPosition) -> f64 {
        self.estimate(position).tax_savings
    }

    /// Sum of opportunity savings, rounded to cents
    pub fn total_savings(&self, opportunities: &[HarvestOpportunity]) -> f64 {
        round_cents(opportunities.iter().map(|o| o.tax_savings).sum())
    }

    /// Projected yearly savings for a given per-harvest total
    pub fn annual_projection(&self, total_tax_savings: f64) -> f64 {
        round_cents(total_tax_savings * ANNUAL_HARVEST_MULTIPLIER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(gain_loss: f64, is_long_term: bool) -> EnrichedPosition {
        EnrichedPosition {
            ticker: "TSLA".to_string(),
            shares: 20.0,
            cost_basis: 10000.0,
            purchase_date: "2024-01-02".to_string(),
            current_price: (10000.0 + gain_loss) / 20.0,
            current_value: 10000.0 + gain_loss,
            unrealized_gain_loss: gain_loss,
            holding_period_days: if is_long_term { 400 } else { 100 },
            is_long_term,
        }
    }

    #[test]
    fn test_long_term_uses_capital_gains_rate() {
        let calculator = TaxCalculator::new(0.24).unwrap();
        let estimate = calculator.estimate(&position(-4000.0, true));

        assert_eq!(estimate.holding_period, HoldingPeriod::LongTerm);
        assert_eq!(estimate.tax_rate, 0.15);
        assert_eq!(estimate.tax_savings, 600.0);
    }

    #[test]
    fn test_short_term_uses_bracket() {
        let calculator = TaxCalculator::new(0.24).unwrap();
        let estimate = calculator.estimate(&position(-4000.0, false));

        assert_eq!(estimate.tax_rate, 0.24);
        assert_eq!(estimate.tax_savings, 960.0);
    }

    #[test]
    fn test_savings_rounded_to_cents() {
        let calculator = TaxCalculator::new(0.37).unwrap();
        // 1234.57 * 0.37 = 456.7909
        assert_eq!(calculator.tax_savings(&position(-1234.57, false)), 456.79);
    }

    #[test]
    fn test_gain_saves_nothing() {
        let calculator = TaxCalculator::new(0.24).unwrap();
        assert_eq!(calculator.tax_savings(&position(2500.0, false)), 0.0);
    }

    #[test]
    fn test_bracket_validated() {
        assert!(TaxCalculator::new(0.10).is_ok());
        assert!(TaxCalculator::new(0.37).is_ok());
        assert!(matches!(
            TaxCalculator::new(0.5),
            Err(HarvestError::InvalidTaxBracket(_))
        ));
    }

    #[test]
    fn test_annual_projection() {
        let calculator = TaxCalculator::new(0.24).unwrap();
        assert_eq!(calculator.annual_projection(1560.0), 4680.0);
        assert_eq!(calculator.annual_projection(0.0), 0.0);
        assert_eq!(calculator.annual_projection(0.1), 0.3);
    }
}
