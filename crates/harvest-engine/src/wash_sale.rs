//! Wash Sale Rule
//!
//! Rebuy timing for harvested positions and the IRS window it approximates.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Days after the sale before the original security may be rebought
pub const REBUY_OFFSET_DAYS: i64 = 31;

/// IRS wash sale window on each side of the sale date
pub const IRS_WINDOW_DAYS: i64 = 30;

/// A wash sale window period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WashSaleWindow {
    pub sale_date: NaiveDate,
    /// Start of wash sale window
    pub window_start: NaiveDate,
    /// End of wash sale window
    pub window_end: NaiveDate,
}

impl WashSaleWindow {
    /// 61-day window: 30 days before, the day of sale, 30 days after
    pub fn around(sale_date: NaiveDate) -> Self {
        Self {
            sale_date,
            window_start: sale_date - Duration::days(IRS_WINDOW_DAYS),
            window_end: sale_date + Duration::days(IRS_WINDOW_DAYS),
        }
    }

    /// Check if a date is within this window
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.window_start && date <= self.window_end
    }

    pub fn len_days(&self) -> i64 {
        (self.window_end - self.window_start).num_days() + 1
    }
}

/// When a harvested position may be rebought
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuyPolicy {
    pub offset_days: i64,
}

impl RebuyPolicy {
    pub fn new(offset_days: i64) -> Self {
        Self { offset_days }
    }

    pub fn rebuy_date(&self, sale_date: NaiveDate) -> NaiveDate {
        sale_date + Duration::days(self.offset_days)
    }

    /// Whether the rebuy date falls after the post-sale side of the IRS window
    pub fn clears_window(&self, sale_date: NaiveDate) -> bool {
        !WashSaleWindow::around(sale_date).contains(self.rebuy_date(sale_date))
            && self.offset_days > 0
    }
}

impl Default for RebuyPolicy {
    fn default() -> Self {
        Self::new(REBUY_OFFSET_DAYS)
    }
}
