//! Position Enricher
//!
//! Prices a raw position and classifies its holding period.

use chrono::{DateTime, NaiveDate, Utc};
use harvest_core::{round_cents, EnrichedPosition, HarvestError, Position};

/// Holding periods longer than this are long-term
pub const LONG_TERM_THRESHOLD_DAYS: i64 = 365;

const PURCHASE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a YYYY-MM-DD purchase date
pub fn parse_purchase_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), PURCHASE_DATE_FORMAT).ok()
}

/// Whole days held as of `as_of`, never negative
pub fn holding_period_days(purchase_date: NaiveDate, as_of: DateTime<Utc>) -> i64 {
    (as_of.date_naive() - purchase_date).num_days().max(0)
}

pub struct PositionEnricher {
    as_of: DateTime<Utc>,
}

impl PositionEnricher {
    pub fn new(as_of: DateTime<Utc>) -> Self {
        Self { as_of }
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    /// Price a position. An unparsable purchase date degrades to a
    /// zero-day, short-term holding.
    pub fn enrich(
        &self,
        position: &Position,
        current_price: f64,
    ) -> Result<EnrichedPosition, HarvestError> {
        if !current_price.is_finite() || current_price <= 0.0 {
            return Err(HarvestError::QuoteUnavailable {
                ticker: position.ticker.clone(),
                reason: format!("invalid price {}", current_price),
            });
        }

        let current_value = round_cents(current_price * position.shares);
        let unrealized_gain_loss = round_cents(current_value - position.cost_basis);
        if !current_value.is_finite() || !unrealized_gain_loss.is_finite() {
            return Err(HarvestError::InvalidPosition {
                ticker: position.ticker.clone(),
                reason: "position value out of range".to_string(),
            });
        }

        let holding_days = match parse_purchase_date(&position.purchase_date) {
            Some(date) => holding_period_days(date, self.as_of),
            None => {
                tracing::warn!(
                    "{}: unparsable purchase date '{}', treating as short-term",
                    position.ticker,
                    position.purchase_date
                );
                0
            }
        };

        Ok(EnrichedPosition {
            ticker: position.ticker.clone(),
            shares: position.shares,
            cost_basis: position.cost_basis,
            purchase_date: position.purchase_date.clone(),
            current_price,
            current_value,
            unrealized_gain_loss,
            holding_period_days: holding_days,
            is_long_term: holding_days > LONG_TERM_THRESHOLD_DAYS,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use harvest_core::{Clock, FixedClock};

    fn as_of() -> DateTime<Utc> {
        FixedClock::on(NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()).now()
    }

    fn bought_days_ago(days: i64) -> String {
        (as_of().date_naive() - Duration::days(days))
            .format("%Y-%m-%d")
            .to_string()
    }

    #[test]
    fn test_enrich_values() {
        let enricher = PositionEnricher::new(as_of());
        let position = Position::new("TSLA", 20.0, 10000.0, &bought_days_ago(400));

        let enriched = enricher.enrich(&position, 300.0).unwrap();
        assert_eq!(enriched.current_value, 6000.0);
        assert_eq!(enriched.unrealized_gain_loss, -4000.0);
        assert_eq!(enriched.holding_period_days, 400);
        assert!(enriched.is_long_term);
        assert_eq!(enriched.loss_magnitude(), 4000.0);
    }

    #[test]
    fn test_values_rounded_to_cents() {
        let enricher = PositionEnricher::new(as_of());
        let position = Position::new("AAPL", 3.0, 100.0, &bought_days_ago(10));

        let enriched = enricher.enrich(&position, 33.333).unwrap();
        assert_eq!(enriched.current_value, 100.0);
        assert_eq!(enriched.unrealized_gain_loss, 0.0);
    }

    #[test]
    fn test_long_term_boundary() {
        let enricher = PositionEnricher::new(as_of());

        let at_365 = enricher
            .enrich(&Position::new("AAPL", 1.0, 100.0, &bought_days_ago(365)), 50.0)
            .unwrap();
        assert_eq!(at_365.holding_period_days, 365);
        assert!(!at_365.is_long_term);

        let at_366 = enricher
            .enrich(&Position::new("AAPL", 1.0, 100.0, &bought_days_ago(366)), 50.0)
            .unwrap();
        assert!(at_366.is_long_term);
    }

    #[test]
    fn test_bad_date_degrades_to_short_term() {
        let enricher = PositionEnricher::new(as_of());
        let position = Position::new("AAPL", 10.0, 5000.0, "01/02/2020");

        let enriched = enricher.enrich(&position, 100.0).unwrap();
        assert_eq!(enriched.holding_period_days, 0);
        assert!(!enriched.is_long_term);
    }

    #[test]
    fn test_future_purchase_date_clamped() {
        let enricher = PositionEnricher::new(as_of());
        let position = Position::new("AAPL", 10.0, 5000.0, &bought_days_ago(-5));

        let enriched = enricher.enrich(&position, 100.0).unwrap();
        assert_eq!(enriched.holding_period_days, 0);
    }

    #[test]
    fn test_invalid_price_is_quote_failure() {
        let enricher = PositionEnricher::new(as_of());
        let position = Position::new("AAPL", 10.0, 5000.0, "2024-01-02");

        assert!(matches!(
            enricher.enrich(&position, 0.0),
            Err(HarvestError::QuoteUnavailable { .. })
        ));
        assert!(enricher.enrich(&position, f64::NAN).is_err());
    }

    #[test]
    fn test_out_of_range_value_is_invalid_position() {
        let enricher = PositionEnricher::new(as_of());

        let huge_basis = Position::new("AAPL", 1.0, 1e307, "2024-01-02");
        assert!(matches!(
            enricher.enrich(&huge_basis, 1.0),
            Err(HarvestError::InvalidPosition { ref ticker, .. }) if ticker == "AAPL"
        ));

        let huge_value = Position::new("MSFT", 1e300, 100.0, "2024-01-02");
        assert!(matches!(
            enricher.enrich(&huge_value, 1e10),
            Err(HarvestError::InvalidPosition { .. })
        ));
    }

    #[test]
    fn test_parse_purchase_date() {
        assert_eq!(
            parse_purchase_date(" 2024-02-29 "),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(parse_purchase_date("2023-02-29"), None);
        assert_eq!(parse_purchase_date(""), None);
    }
}
