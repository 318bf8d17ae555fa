//! Harvest Engine
//!
//! Tax-loss harvesting recommendations: finds positions with losses worth
//! realizing, pairs them with wash-sale-safe replacements and ranks them by
//! tax savings.

pub mod analyzer;
pub mod composer;
pub mod config;
pub mod enricher;
pub mod narrator;
pub mod quotes;
pub mod selector;
pub mod substitutes;
pub mod tax_calculator;
pub mod wash_sale;


pub use analyzer::{HarvestAnalyzer, QuoteMap};
pub use composer::OpportunityComposer;
pub use config::HarvestingConfig;
pub use enricher::{PositionEnricher, LONG_TERM_THRESHOLD_DAYS};
pub use narrator::PlainNarrator;
pub use quotes::StaticQuoteSource;
pub use selector::{HarvestSelector, DEFAULT_LOSS_THRESHOLD};
pub use substitutes::ReplacementCatalog;
pub use tax_calculator::{
    HoldingPeriod, TaxCalculator, TaxEstimate, TaxRates, ANNUAL_HARVEST_MULTIPLIER, LONG_TERM_RATE,
};
pub use wash_sale::{RebuyPolicy, WashSaleWindow, REBUY_OFFSET_DAYS};
