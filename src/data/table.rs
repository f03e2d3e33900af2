//! Feature Table
//!
//! Chronological per-ticker table of OHLCV plus derived indicators,
//! consumed read-only by the market environment.

use chrono::NaiveDate;

use crate::config::N_FEATURES;
use crate::error::{Result, TraderError};

/// One daily row of prices and derived indicators
#[derive(Debug, Clone)]
pub struct FeatureRow {
    /// Trading date
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Split/dividend-adjusted close; the traded price
    pub adj_close: f64,
    pub volume: f64,
    /// One-day adjusted-close return (first row 0)
    pub ret: f64,
    /// 5-day simple moving average of adj_close
    pub sma_5: f64,
    /// 10-day simple moving average of adj_close
    pub sma_10: f64,
    /// 5-day mean volume
    pub vol_5: f64,
}

impl FeatureRow {
    /// Feature columns in observation order.
    pub fn features(&self) -> [f64; N_FEATURES] {
        [
            self.open,
            self.high,
            self.low,
            self.close,
            self.adj_close,
            self.volume,
            self.ret,
            self.sma_5,
            self.sma_10,
            self.vol_5,
        ]
    }
}

/// Chronologically ordered feature rows for a single ticker
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    rows: Vec<FeatureRow>,
}

impl FeatureTable {
    pub fn new(rows: Vec<FeatureRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> &FeatureRow {
        &self.rows[index]
    }

    /// Traded price at `index` (adjusted close).
    pub fn price(&self, index: usize) -> f64 {
        self.rows[index].adj_close
    }

    /// Check there is enough history for one lookback window plus at least
    /// one tradable step before the reserved last row.
    pub fn check_window(&self, window_size: usize) -> Result<()> {
        let required = window_size + 2;
        if self.rows.len() < required {
            return Err(TraderError::InsufficientHistory {
                rows: self.rows.len(),
                required,
            });
        }
        Ok(())
    }
}
