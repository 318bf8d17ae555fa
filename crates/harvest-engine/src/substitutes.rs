//! Replacement Catalog
//!
//! Maps a harvested security to replacement securities that keep similar
//! market exposure without being substantially identical.

use harvest_core::{HarvestError, ReplacementEntry};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Broad-market funds used for any ticker the catalog does not know
const DEFAULT_REPLACEMENTS: [(&str, &str); 2] = [
    ("VTI", "Vanguard Total Stock Market ETF"),
    ("VOO", "Vanguard S&P 500 ETF"),
];

/// Pairs treated as the same security for wash sale purposes
const IDENTICAL_PAIRS: [(&str, &str); 5] = [
    ("SPY", "VOO"),
    ("SPY", "IVV"),
    ("VOO", "IVV"),
    ("GOOGL", "GOOG"),
    ("BRK.A", "BRK.B"),
];

/// On-disk catalog entry: `{"AAPL": {"replacements": [{"ticker": .., "name": ..}]}}`
#[derive(Debug, Deserialize)]
struct CatalogRecord {
    replacements: Vec<ReplacementEntry>,
}

/// Read-only lookup from ticker to ordered replacements (best first)
#[derive(Debug, Clone)]
pub struct ReplacementCatalog {
    entries: HashMap<String, Vec<ReplacementEntry>>,
    defaults: Vec<ReplacementEntry>,
    identical_pairs: Vec<(String, String)>,
}

impl ReplacementCatalog {
    /// Build from an explicit table. Tickers mapped to an empty list fall back to the defaults.
    pub fn new(entries: HashMap<String, Vec<ReplacementEntry>>) -> Self {
        Self {
            entries,
            defaults: DEFAULT_REPLACEMENTS
                .iter()
                .map(|(ticker, name)| ReplacementEntry::new(ticker, name))
                .collect(),
            identical_pairs: IDENTICAL_PAIRS
                .iter()
                .map(|(a, b)| (a.to_string(), b.to_string()))
                .collect(),
        }
    }

    /// Table shipped with the application
    pub fn builtin() -> Self {
        let table: [(&str, [(&str, &str); 2]); 7] = [
            ("AAPL", [
                ("SCHG", "Schwab US Large-Cap Growth ETF"),
                ("QQQ", "Invesco QQQ Trust"),
            ]),
            ("MSFT", [
                ("VGT", "Vanguard Information Technology ETF"),
                ("XLK", "Technology Select Sector SPDR Fund"),
            ]),
            ("TSLA", [
                ("ARKK", "ARK Innovation ETF"),
                ("XLY", "Consumer Discretionary Select Sector SPDR"),
            ]),
            ("NVDA", [
                ("SMH", "VanEck Semiconductor ETF"),
                ("SOXX", "iShares Semiconductor ETF"),
            ]),
            ("AMZN", [
                ("XLY", "Consumer Discretionary Select Sector SPDR"),
                ("VCR", "Vanguard Consumer Discretionary ETF"),
            ]),
            ("GOOGL", [
                ("XLC", "Communication Services Select Sector SPDR"),
                ("VOX", "Vanguard Communication Services ETF"),
            ]),
            ("META", [
                ("XLC", "Communication Services Select Sector SPDR"),
                ("VOX", "Vanguard Communication Services ETF"),
            ]),
        ];

        let entries = table
            .iter()
            .map(|(ticker, replacements)| {
                let list = replacements
                    .iter()
                    .map(|(t, n)| ReplacementEntry::new(t, n))
                    .collect();
                (ticker.to_string(), list)
            })
            .collect();

        Self::new(entries)
    }

    /// Parse the JSON catalog format. Any defect is fatal.
    pub fn from_json_str(json: &str) -> Result<Self, HarvestError> {
        let records: HashMap<String, CatalogRecord> = serde_json::from_str(json)
            .map_err(|e| HarvestError::CatalogError(format!("invalid catalog JSON: {}", e)))?;

        let mut entries = HashMap::with_capacity(records.len());
        for (ticker, record) in records {
            if ticker.trim().is_empty() {
                return Err(HarvestError::CatalogError("catalog contains an empty ticker".to_string()));
            }
            if record.replacements.is_empty() {
                return Err(HarvestError::CatalogError(format!(
                    "no replacements listed for {}",
                    ticker
                )));
            }
            if let Some(bad) = record.replacements.iter().find(|r| r.ticker.trim().is_empty()) {
                return Err(HarvestError::CatalogError(format!(
                    "replacement for {} has an empty ticker (name '{}')",
                    ticker, bad.name
                )));
            }
            entries.insert(ticker, record.replacements);
        }

        Ok(Self::new(entries))
    }

    /// Load the JSON catalog file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, HarvestError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            HarvestError::CatalogError(format!("cannot read {}: {}", path.display(), e))
        })?;
        let catalog = Self::from_json_str(&json)?;
        tracing::info!("Loaded replacement catalog from {} ({} tickers)", path.display(), catalog.len());
        Ok(catalog)
    }

    /// Ordered replacements for a ticker; the default pair if unmapped
    pub fn find_replacements(&self, ticker: &str) -> &[ReplacementEntry] {
        match self.entries.get(ticker) {
            Some(list) if !list.is_empty() => list,
            _ => &self.defaults,
        }
    }

    /// Best replacement that is not substantially identical to `ticker`
    pub fn best(&self, ticker: &str) -> ReplacementEntry {
        self.find_replacements(ticker)
            .iter()
            .chain(self.defaults.iter())
            .find(|r| !self.is_substantially_identical(ticker, &r.ticker))
            .or_else(|| self.defaults.first())
            .cloned()
            .unwrap_or_else(|| {
                let (ticker, name) = DEFAULT_REPLACEMENTS[0];
                ReplacementEntry::new(ticker, name)
            })
    }

    /// Check if two symbols are substantially identical (would trigger wash sale)
    pub fn is_substantially_identical(&self, symbol1: &str, symbol2: &str) -> bool {
        if symbol1 == symbol2 {
            return true;
        }

        self.identical_pairs
            .iter()
            .any(|(a, b)| (a == symbol1 && b == symbol2) || (a == symbol2 && b == symbol1))
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.entries.contains_key(ticker)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn defaults(&self) -> &[ReplacementEntry] {
        &self.defaults
    }
}

impl Default for ReplacementCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_best_is_first_entry() {
        let catalog = ReplacementCatalog::builtin();

        assert_eq!(catalog.best("AAPL").ticker, "SCHG");
        assert_eq!(catalog.best("TSLA").ticker, "ARKK");
        assert_eq!(catalog.best("META").ticker, "XLC");
        assert_eq!(catalog.find_replacements("NVDA").len(), 2);
    }

    #[test]
    fn test_unknown_ticker_uses_default_pair() {
        let catalog = ReplacementCatalog::builtin();

        let replacements = catalog.find_replacements("ZZZZ");
        assert_eq!(replacements.len(), 2);
        assert_eq!(replacements[0].ticker, "VTI");
        assert_eq!(replacements[1].ticker, "VOO");

        let best = catalog.best("ZZZZ");
        assert_eq!(best.ticker, "VTI");
        assert_eq!(best.name, "Vanguard Total Stock Market ETF");
    }

    #[test]
    fn test_best_skips_substantially_identical() {
        let catalog = ReplacementCatalog::builtin();

        // VTI harvested: default VTI would be a wash sale, VOO is not
        assert_eq!(catalog.best("VTI").ticker, "VOO");
        // SPY is identical to VOO, so only VTI qualifies
        assert_eq!(catalog.best("SPY").ticker, "VTI");
    }

    #[test]
    fn test_substantially_identical() {
        let catalog = ReplacementCatalog::builtin();

        assert!(catalog.is_substantially_identical("SPY", "SPY"));
        assert!(catalog.is_substantially_identical("SPY", "VOO"));
        assert!(catalog.is_substantially_identical("GOOG", "GOOGL"));
        assert!(!catalog.is_substantially_identical("AAPL", "MSFT"));
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "AAPL": {"replacements": [
                {"ticker": "QQQ", "name": "Invesco QQQ Trust"},
                {"ticker": "SCHG", "name": "Schwab US Large-Cap Growth ETF"}
            ]},
            "JPM": {"replacements": [{"ticker": "XLF", "name": "Financial Select Sector SPDR"}]}
        }"#;

        let catalog = ReplacementCatalog::from_json_str(json).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.best("AAPL").ticker, "QQQ");
        assert_eq!(catalog.best("JPM").ticker, "XLF");
        assert_eq!(catalog.best("TSLA").ticker, "VTI");
    }

    #[test]
    fn test_from_json_rejects_bad_catalogs() {
        let cases = [
            "not json",
            r#"{"AAPL": {"replacements": []}}"#,
            r#"{"AAPL": {"replacements": [{"ticker": "", "name": "x"}]}}"#,
            r#"{"": {"replacements": [{"ticker": "VTI", "name": "x"}]}}"#,
            r#"{"AAPL": {"substitutes": []}}"#,
        ];

        for json in cases {
            assert!(
                matches!(ReplacementCatalog::from_json_str(json), Err(HarvestError::CatalogError(_))),
                "{} should fail to load",
                json
            );
        }
    }

    #[test]
    fn test_from_missing_path_is_fatal() {
        let result = ReplacementCatalog::from_path("/nonexistent/etf_replacements.json");
        assert!(matches!(result, Err(HarvestError::CatalogError(_))));
    }
}
