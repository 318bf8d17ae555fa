use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HarvestError {
    #[error("Invalid position {ticker}: {reason}")]
    InvalidPosition { ticker: String, reason: String },

    #[error("Quote unavailable for {ticker}: {reason}")]
    QuoteUnavailable { ticker: String, reason: String },

    #[error("Could not parse purchase date '{value}' for {ticker}")]
    DateParseFailure { ticker: String, value: String },

    #[error("Invalid tax bracket {0}: expected a rate between 0.10 and 0.37")]
    InvalidTaxBracket(f64),

    #[error("Catalog error: {0}")]
    CatalogError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Narration error: {0}")]
    NarrationError(String),
}

impl HarvestError {
    /// Ticker the error is attached to, if it is a per-position error
    pub fn ticker(&self) -> Option<&str> {
        match self {
            HarvestError::InvalidPosition { ticker, .. }
            | HarvestError::QuoteUnavailable { ticker, .. }
            | HarvestError::DateParseFailure { ticker, .. } => Some(ticker),
            _ => None,
        }
    }
}
