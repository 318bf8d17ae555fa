//! Harvesting engine configuration.

use crate::selector::DEFAULT_LOSS_THRESHOLD;
use crate::wash_sale::REBUY_OFFSET_DAYS;
use harvest_core::HarvestError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestingConfig {
    /// Minimum loss to harvest (in dollars, exclusive)
    pub loss_threshold: f64,
    /// Days after the sale before the original may be rebought
    pub rebuy_offset_days: i64,
    /// Per-attempt timeout for a quote fetch
    pub quote_timeout_secs: u64,
    /// Extra attempts after a failed quote fetch
    pub quote_retries: u32,
    /// Quotes fetched in parallel
    pub max_concurrent_quotes: usize,
}

impl Default for HarvestingConfig {
    fn default() -> Self {
        Self {
            loss_threshold: DEFAULT_LOSS_THRESHOLD,
            rebuy_offset_days: REBUY_OFFSET_DAYS,
            quote_timeout_secs: 10,
            quote_retries: 1,
            max_concurrent_quotes: 8,
        }
    }
}

impl HarvestingConfig {
    /// Defaults overridden by `HARVEST_*` environment variables
    pub fn from_env() -> Result<Self, HarvestError> {
        let defaults = Self::default();
        let config = Self {
            loss_threshold: env_or("HARVEST_LOSS_THRESHOLD", defaults.loss_threshold),
            rebuy_offset_days: env_or("HARVEST_REBUY_OFFSET_DAYS", defaults.rebuy_offset_days),
            quote_timeout_secs: env_or("HARVEST_QUOTE_TIMEOUT_SECS", defaults.quote_timeout_secs),
            quote_retries: env_or("HARVEST_QUOTE_RETRIES", defaults.quote_retries),
            max_concurrent_quotes: env_or(
                "HARVEST_MAX_CONCURRENT_QUOTES",
                defaults.max_concurrent_quotes,
            ),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), HarvestError> {
        if !self.loss_threshold.is_finite() || self.loss_threshold < 0.0 {
            return Err(HarvestError::ConfigError(format!(
                "loss threshold must be a non-negative amount, got {}",
                self.loss_threshold
            )));
        }
        if self.rebuy_offset_days <= 0 {
            return Err(HarvestError::ConfigError(format!(
                "rebuy offset must be positive, got {} days",
                self.rebuy_offset_days
            )));
        }
        if self.quote_timeout_secs == 0 {
            return Err(HarvestError::ConfigError("quote timeout must be positive".to_string()));
        }
        if self.max_concurrent_quotes == 0 {
            return Err(HarvestError::ConfigError(
                "max concurrent quotes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn quote_timeout(&self) -> Duration {
        Duration::from_secs(self.quote_timeout_secs)
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Ignoring unparsable {}={:?}, using default", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HarvestingConfig::default();
        assert_eq!(config.loss_threshold, 1000.0);
        assert_eq!(config.rebuy_offset_days, 31);
        assert_eq!(config.quote_retries, 1);
        assert_eq!(config.quote_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            HarvestingConfig { loss_threshold: -1.0, ..Default::default() },
            HarvestingConfig { loss_threshold: f64::INFINITY, ..Default::default() },
            HarvestingConfig { rebuy_offset_days: 0, ..Default::default() },
            HarvestingConfig { quote_timeout_secs: 0, ..Default::default() },
            HarvestingConfig { max_concurrent_quotes: 0, ..Default::default() },
        ];

        for config in bad {
            assert!(matches!(config.validate(), Err(HarvestError::ConfigError(_))));
        }
    }

    #[test]
    fn test_env_or_parses_and_falls_back() {
        std::env::set_var("HARVEST_TEST_ENV_OR_VALUE", " 2500.5 ");
        assert_eq!(env_or("HARVEST_TEST_ENV_OR_VALUE", 1.0), 2500.5);

        std::env::set_var("HARVEST_TEST_ENV_OR_BAD", "lots");
        assert_eq!(env_or("HARVEST_TEST_ENV_OR_BAD", 7u32), 7);

        assert_eq!(env_or("HARVEST_TEST_ENV_OR_MISSING", 3usize), 3);
    }
}
