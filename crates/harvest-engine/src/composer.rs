//! Opportunity Composer
//!
//! Turns harvest candidates into ranked, explained opportunities.

use crate::substitutes::ReplacementCatalog;
use crate::tax_calculator::TaxCalculator;
use crate::wash_sale::RebuyPolicy;
use chrono::NaiveDate;
use harvest_core::{format_usd, AnalysisResult, EnrichedPosition, HarvestOpportunity};

pub struct OpportunityComposer<'a> {
    catalog: &'a ReplacementCatalog,
    calculator: &'a TaxCalculator,
    rebuy_policy: RebuyPolicy,
    evaluation_date: NaiveDate,
    loss_threshold: f64,
}

impl<'a> OpportunityComposer<'a> {
    pub fn new(
        catalog: &'a ReplacementCatalog,
        calculator: &'a TaxCalculator,
        rebuy_policy: RebuyPolicy,
        evaluation_date: NaiveDate,
        loss_threshold: f64,
    ) -> Self {
        Self {
            catalog,
            calculator,
            rebuy_policy,
            evaluation_date,
            loss_threshold,
        }
    }

    /// Build the opportunity for one candidate, assuming it is sold on the evaluation date
    pub fn compose(&self, candidate: &EnrichedPosition) -> HarvestOpportunity {
        let replacement = self.catalog.best(&candidate.ticker);
        let estimate = self.calculator.estimate(candidate);
        let rebuy_date = self.rebuy_policy.rebuy_date(self.evaluation_date);

        let action_steps = [
            format!(
                "Sell {} shares of {} (currently at ${:.2}/share)",
                format_shares(candidate.shares),
                candidate.ticker,
                candidate.current_price
            ),
            format!(
                "Immediately buy equivalent dollar amount ({}) of {} ({})",
                format_usd(candidate.current_value, 2),
                replacement.ticker,
                replacement.name
            ),
            format!(
                "Set calendar reminder for {} - you can rebuy {} after this date without triggering wash sale",
                rebuy_date.format("%Y-%m-%d"),
                candidate.ticker
            ),
        ];

        HarvestOpportunity {
            ticker: candidate.ticker.clone(),
            shares: candidate.shares,
            unrealized_loss: estimate.loss,
            replacement_ticker: replacement.ticker,
            replacement_name: replacement.name,
            tax_savings: estimate.tax_savings,
            is_long_term: estimate.holding_period.is_long_term(),
            action_steps,
            rebuy_date,
        }
    }

    /// Compose all candidates, rank by savings and total them up
    pub fn compose_all(&self, candidates: &[&EnrichedPosition]) -> AnalysisResult {
        if candidates.is_empty() {
            return AnalysisResult {
                total_tax_savings: 0.0,
                opportunities: Vec::new(),
                summary: format!(
                    "No tax-loss harvesting opportunities found. All positions are either gains or losses less than {}.",
                    format_usd(self.loss_threshold, 0)
                ),
                annual_projection: 0.0,
            };
        }

        let mut opportunities: Vec<HarvestOpportunity> =
            candidates.iter().map(|c| self.compose(c)).collect();

        // Stable: equal savings keep candidate order
        opportunities.sort_by(|a, b| b.tax_savings.total_cmp(&a.tax_savings));

        let total_tax_savings = self.calculator.total_savings(&opportunities);
        let annual_projection = self.calculator.annual_projection(total_tax_savings);

        let summary = format!(
            "Found {} tax-loss harvesting {} with total immediate savings of {}",
            opportunities.len(),
            if opportunities.len() == 1 { "opportunity" } else { "opportunities" },
            format_usd(total_tax_savings, 2)
        );

        AnalysisResult {
            total_tax_savings,
            opportunities,
            summary,
            annual_projection,
        }
    }
}

/// Whole share counts without decimals, fractional ones with up to four places
fn format_shares(shares: f64) -> String {
    if shares.fract() == 0.0 {
        format!("{:.0}", shares)
    } else {
        let formatted = format!("{:.4}", shares);
        formatted.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
