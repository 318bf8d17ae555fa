//! Harvest Analyzer
//!
//! Runs a portfolio through the whole pipeline: validation, concurrent quote
//! fetching, enrichment, selection, composition and optional narration.
//! Problems with one position are reported and never abort the batch.

use crate::composer::OpportunityComposer;
use crate::config::HarvestingConfig;
use crate::enricher::{parse_purchase_date, PositionEnricher};
use crate::selector::HarvestSelector;
use crate::substitutes::ReplacementCatalog;
use crate::tax_calculator::TaxCalculator;
use crate::wash_sale::RebuyPolicy;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use harvest_core::{
    format_usd, Clock, HarvestError, HarvestReport, PortfolioRequest, Position, PositionFailure,
    QuoteSource, RecommendationNarrator, SystemClock,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Quote lookup results keyed by ticker
pub type QuoteMap = HashMap<String, Result<f64, HarvestError>>;

pub struct HarvestAnalyzer {
    quotes: Arc<dyn QuoteSource>,
    catalog: Arc<ReplacementCatalog>,
    clock: Arc<dyn Clock>,
    narrator: Option<Arc<dyn RecommendationNarrator>>,
    config: HarvestingConfig,
}

impl HarvestAnalyzer {
    pub fn new(
        quotes: Arc<dyn QuoteSource>,
        catalog: Arc<ReplacementCatalog>,
        config: HarvestingConfig,
    ) -> Self {
        Self {
            quotes,
            catalog,
            clock: Arc::new(SystemClock),
            narrator: None,
            config,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_narrator(mut self, narrator: Arc<dyn RecommendationNarrator>) -> Self {
        self.narrator = Some(narrator);
        self
    }

    pub fn config(&self) -> &HarvestingConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ReplacementCatalog {
        &self.catalog
    }

    /// Analyze a portfolio. Only an invalid tax bracket fails the whole request.
    pub async fn analyze(&self, request: &PortfolioRequest) -> Result<HarvestReport, HarvestError> {
        request.validate_tax_bracket()?;
        let as_of = self.clock.now();

        tracing::info!(
            "Analyzing portfolio with {} positions (bracket {:.0}%)",
            request.positions.len(),
            request.tax_bracket * 100.0
        );

        let tickers = quotable_tickers(&request.positions);
        let quotes = self.fetch_quotes(&tickers).await;

        let mut report = self.evaluate(&request.positions, request.tax_bracket, &quotes, as_of)?;

        if let Some(narrator) = &self.narrator {
            match narrator.narrate(&report.result).await {
                Ok(text) => report.narrative = Some(text),
                Err(e) => tracing::warn!("Narration skipped: {}", e),
            }
        }

        Ok(report)
    }

    /// Fetch quotes for the given tickers concurrently
    pub async fn fetch_quotes(&self, tickers: &[String]) -> QuoteMap {
        stream::iter(tickers.iter().cloned())
            .map(|ticker| async move {
                let quote = self.fetch_quote(&ticker).await;
                (ticker, quote)
            })
            .buffer_unordered(self.config.max_concurrent_quotes.max(1))
            .collect()
            .await
    }

    /// One quote with a per-attempt timeout and bounded retries
    async fn fetch_quote(&self, ticker: &str) -> Result<f64, HarvestError> {
        let attempts = self.config.quote_retries + 1;
        let mut reason = String::new();

        for attempt in 1..=attempts {
            let fetched =
                tokio::time::timeout(self.config.quote_timeout(), self.quotes.current_price(ticker))
                    .await;

            match fetched {
                Ok(Ok(price)) if price.is_finite() && price > 0.0 => {
                    tracing::debug!("{}: ${:.2} (attempt {}/{})", ticker, price, attempt, attempts);
                    return Ok(price);
                }
                Ok(Ok(price)) => reason = format!("invalid price {}", price),
                Ok(Err(e)) => reason = e.to_string(),
                Err(_) => reason = format!("timed out after {}s", self.config.quote_timeout_secs),
            }

            tracing::debug!("{}: quote attempt {}/{} failed: {}", ticker, attempt, attempts, reason);
        }

        tracing::warn!("✗ {}: no quote after {} attempt(s): {}", ticker, attempts, reason);
        Err(HarvestError::QuoteUnavailable {
            ticker: ticker.to_string(),
            reason,
        })
    }

    /// Deterministic part of the pipeline, given already-fetched quotes
    pub fn evaluate(
        &self,
        positions: &[Position],
        tax_bracket: f64,
        quotes: &QuoteMap,
        as_of: DateTime<Utc>,
    ) -> Result<HarvestReport, HarvestError> {
        let calculator = TaxCalculator::new(tax_bracket)?;
        let enricher = PositionEnricher::new(as_of);

        let mut failures = Vec::new();
        let mut warnings = Vec::new();
        let mut enriched = Vec::with_capacity(positions.len());

        for position in positions {
            if let Err(e) = position.validate() {
                record(&mut failures, &e);
                continue;
            }

            let price = match quotes.get(&position.ticker) {
                Some(Ok(price)) => *price,
                Some(Err(e)) => {
                    record(&mut failures, &as_quote_failure(&position.ticker, e));
                    continue;
                }
                None => {
                    record(
                        &mut failures,
                        &HarvestError::QuoteUnavailable {
                            ticker: position.ticker.clone(),
                            reason: "no quote fetched".to_string(),
                        },
                    );
                    continue;
                }
            };

            match enricher.enrich(position, price) {
                Ok(p) => {
                    if parse_purchase_date(&p.purchase_date).is_none() {
                        record(
                            &mut warnings,
                            &HarvestError::DateParseFailure {
                                ticker: p.ticker.clone(),
                                value: p.purchase_date.clone(),
                            },
                        );
                    }

                    tracing::info!(
                        "✓ {}: {} {}",
                        p.ticker,
                        format_usd(p.unrealized_gain_loss, 2),
                        if p.unrealized_gain_loss > 0.0 { "gain" } else { "loss" }
                    );
                    enriched.push(p);
                }
                Err(e) => record(&mut failures, &e),
            }
        }

        let selector = HarvestSelector::new(self.config.loss_threshold);
        let candidates = selector.select(&enriched);
        tracing::info!(
            "Found {} positions with losses over {}",
            candidates.len(),
            format_usd(selector.loss_threshold(), 0)
        );

        let sale_date = as_of.date_naive();
        let rebuy_policy = RebuyPolicy::new(self.config.rebuy_offset_days);
        if !candidates.is_empty() && !rebuy_policy.clears_window(sale_date) {
            tracing::warn!(
                "Rebuy offset of {} days falls inside the 30-day post-sale wash sale window",
                rebuy_policy.offset_days
            );
        }

        let composer = OpportunityComposer::new(
            &self.catalog,
            &calculator,
            rebuy_policy,
            sale_date,
            self.config.loss_threshold,
        );
        let result = composer.compose_all(&candidates);

        tracing::info!(
            "{} ({} failed, {} degraded)",
            result.summary,
            failures.len(),
            warnings.len()
        );

        Ok(HarvestReport {
            result,
            failures,
            warnings,
            narrative: None,
            evaluated_at: as_of,
        })
    }
}

/// Distinct tickers of positions that pass validation, in first-seen order
fn quotable_tickers(positions: &[Position]) -> Vec<String> {
    let mut seen = HashSet::new();
    positions
        .iter()
        .filter(|p| p.validate().is_ok())
        .filter(|p| seen.insert(p.ticker.as_str()))
        .map(|p| p.ticker.clone())
        .collect()
}

fn as_quote_failure(ticker: &str, error: &HarvestError) -> HarvestError {
    match error {
        HarvestError::QuoteUnavailable { .. } => error.clone(),
        other => HarvestError::QuoteUnavailable {
            ticker: ticker.to_string(),
            reason: other.to_string(),
        },
    }
}

fn record(list: &mut Vec<PositionFailure>, error: &HarvestError) {
    tracing::warn!("{}", error);
    if let Some(failure) = PositionFailure::from_error(error) {
        list.push(failure);
    }
}
