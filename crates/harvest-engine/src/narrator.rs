//! Template narration of an analysis result.

use async_trait::async_trait;
use harvest_core::{format_usd, AnalysisResult, HarvestError, RecommendationNarrator};

/// Renders a Markdown action plan from the computed numbers
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainNarrator;

impl PlainNarrator {
    pub fn render(&self, result: &AnalysisResult) -> String {
        if result.opportunities.is_empty() {
            return result.summary.clone();
        }

        let mut out = String::from("## Tax-Loss Harvesting Plan\n\n");
        out.push_str(&format!("{}.\n\n", result.summary));

        for (i, opp) in result.opportunities.iter().enumerate() {
            let term = if opp.is_long_term {
                "long-term, capital gains rate"
            } else {
                "short-term, ordinary income rate"
            };

            out.push_str(&format!("{}. **{}**\n", i + 1, opp.ticker));
            out.push_str(&format!("   - **Loss**: {}\n", format_usd(-opp.unrealized_loss, 2)));
            out.push_str(&format!(
                "   - **Replacement**: {} ({})\n",
                opp.replacement_ticker, opp.replacement_name
            ));
            out.push_str(&format!(
                "   - **Tax Savings**: {} ({})\n",
                format_usd(opp.tax_savings, 2),
                term
            ));
            out.push_str("   - **Steps**:\n");
            for (n, step) in opp.action_steps.iter().enumerate() {
                out.push_str(&format!("     {}. {}\n", n + 1, step));
            }
        }

        out.push_str(&format!(
            "\n**Total Immediate Tax Savings**: {}\n",
            format_usd(result.total_tax_savings, 2)
        ));
        out.push_str(&format!(
            "**Projected Annual Savings**: {} (if harvested quarterly)",
            format_usd(result.annual_projection, 2)
        ));

        out
    }
}

#[async_trait]
impl RecommendationNarrator for PlainNarrator {
    async fn narrate(&self, result: &AnalysisResult) -> Result<String, HarvestError> {
        Ok(self.render(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use harvest_core::HarvestOpportunity;

    fn result() -> AnalysisResult {
        AnalysisResult {
            total_tax_savings: 960.0,
            opportunities: vec![HarvestOpportunity {
                ticker: "TSLA".to_string(),
                shares: 20.0,
                unrealized_loss: 4000.0,
                replacement_ticker: "ARKK".to_string(),
                replacement_name: "ARK Innovation ETF".to_string(),
                tax_savings: 960.0,
                is_long_term: false,
                action_steps: [
                    "Sell 20 shares of TSLA".to_string(),
                    "Buy ARKK".to_string(),
                    "Wait".to_string(),
                ],
                rebuy_date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            }],
            summary: "Found 1 tax-loss harvesting opportunity".to_string(),
            annual_projection: 2880.0,
        }
    }

    #[tokio::test]
    async fn test_narration_reports_computed_numbers() {
        let result = result();
        let before = result.clone();

        let text = PlainNarrator.narrate(&result).await.unwrap();
        assert!(text.contains("**TSLA**"));
        assert!(text.contains("-$4,000.00"));
        assert!(text.contains("$960.00 (short-term, ordinary income rate)"));
        assert!(text.contains("1. Sell 20 shares of TSLA"));
        assert!(text.contains("**Projected Annual Savings**: $2,880.00"));
        assert_eq!(result, before);
    }

    #[test]
    fn test_render_lists_steps_in_order() {
        let text = PlainNarrator.render(&result());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "## Tax-Loss Harvesting Plan");
        let steps: Vec<&str> = lines
            .iter()
            .filter(|l| l.starts_with("     "))
            .map(|l| l.trim())
            .collect();
        assert_eq!(steps, vec!["1. Sell 20 shares of TSLA", "2. Buy ARKK", "3. Wait"]);
        assert!(text.ends_with("(if harvested quarterly)"));
    }

    #[tokio::test]
    async fn test_empty_result_narrates_summary() {
        let mut empty = result();
        empty.opportunities.clear();
        empty.summary = "No tax-loss harvesting opportunities found.".to_string();

        let text = PlainNarrator.narrate(&empty).await.unwrap();
        assert_eq!(text, "No tax-loss harvesting opportunities found.");
    }
}
