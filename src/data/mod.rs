//! Market Data
//!
//! Per-ticker feature tables and the CSV loader that produces them.

pub mod loader;
pub mod table;

pub use loader::{load_dataset, load_ticker_csv, split_table, Dataset, TickerData};
pub use table::{FeatureRow, FeatureTable};
