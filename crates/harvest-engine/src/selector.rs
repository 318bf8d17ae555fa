//! Harvest candidate selection.

use harvest_core::EnrichedPosition;

/// Minimum loss (in dollars) worth harvesting
pub const DEFAULT_LOSS_THRESHOLD: f64 = 1000.0;

pub struct HarvestSelector {
    loss_threshold: f64,
}

impl HarvestSelector {
    pub fn new(loss_threshold: f64) -> Self {
        Self { loss_threshold }
    }

    pub fn loss_threshold(&self) -> f64 {
        self.loss_threshold
    }

    /// Positions whose loss strictly exceeds the threshold, in input order
    pub fn select<'a>(&self, positions: &'a [EnrichedPosition]) -> Vec<&'a EnrichedPosition> {
        positions
            .iter()
            .filter(|p| p.unrealized_gain_loss < -self.loss_threshold)
            .collect()
    }
}

impl Default for HarvestSelector {
    fn default() -> Self {
        Self::new(DEFAULT_LOSS_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(ticker: &str, gain_loss: f64) -> EnrichedPosition {
        EnrichedPosition {
            ticker: ticker.to_string(),
            shares: 10.0,
            cost_basis: 10000.0,
            purchase_date: "2024-01-02".to_string(),
            current_price: (10000.0 + gain_loss) / 10.0,
            current_value: 10000.0 + gain_loss,
            unrealized_gain_loss: gain_loss,
            holding_period_days: 100,
            is_long_term: false,
        }
    }

    #[test]
    fn test_threshold_is_strict() {
        let positions = vec![
            position("AAA", -1000.0),
            position("BBB", -1000.01),
            position("CCC", -500.0),
            position("DDD", 2500.0),
        ];

        let selected = HarvestSelector::default().select(&positions);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].ticker, "BBB");
    }

    #[test]
    fn test_order_preserved() {
        let positions = vec![
            position("SMALL", -1500.0),
            position("GAIN", 300.0),
            position("BIG", -9000.0),
            position("MID", -4000.0),
        ];

        let tickers: Vec<_> = HarvestSelector::default()
            .select(&positions)
            .iter()
            .map(|p| p.ticker.as_str())
            .collect();
        assert_eq!(tickers, vec!["SMALL", "BIG", "MID"]);
    }

    #[test]
    fn test_custom_threshold_and_empty_input() {
        let positions = vec![position("AAA", -600.0)];
        assert_eq!(HarvestSelector::new(500.0).select(&positions).len(), 1);
        assert!(HarvestSelector::default().select(&positions).is_empty());
        assert!(HarvestSelector::default().select(&[]).is_empty());
    }
}
