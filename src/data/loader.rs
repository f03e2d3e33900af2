//! CSV Loader
//!
//! Reads daily OHLCV history from one CSV per ticker, or from a single
//! combined CSV carrying a `ticker` column, derives the technical indicator
//! columns, and splits each table chronologically into train and held-out
//! slices.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use csv::StringRecord;
use serde::Deserialize;
use tracing::info;

use crate::data::table::{FeatureRow, FeatureTable};
use crate::error::{Result, TraderError};

/// SMA window for the short moving average and mean volume
const SMA_SHORT: usize = 5;
/// SMA window for the long moving average
const SMA_LONG: usize = 10;
/// Number of tickers kept from a combined dataset
const TOP_TICKER_COUNT: usize = 5;

/// Train/test slices for one ticker
#[derive(Debug, Clone)]
pub struct TickerData {
    pub ticker: String,
    pub train: Arc<FeatureTable>,
    pub test: Arc<FeatureTable>,
}

/// The full basket, one entry per ticker
pub type Dataset = Vec<TickerData>;

/// Raw CSV row after header normalization
#[derive(Debug, Deserialize)]
struct RawRecord {
    date: String,
    #[serde(default, alias = "symbol", alias = "company")]
    ticker: Option<String>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(
        default,
        alias = "adjclose",
        alias = "adjusted_close",
        alias = "adjustedclose"
    )]
    adj_close: Option<f64>,
    volume: f64,
}

/// Parsed row before indicator derivation
#[derive(Debug, Clone)]
struct PriceRow {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    adj_close: f64,
    volume: f64,
}

fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    let candidate = raw.split_whitespace().next().unwrap_or(raw);
    NaiveDate::parse_from_str(candidate, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(candidate, "%m/%d/%Y"))
        .map_err(|_| TraderError::Data(format!("unparseable date: {raw:?}")))
}

fn read_records<R: Read>(reader: R) -> Result<Vec<(Option<String>, PriceRow)>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let normalized: StringRecord = rdr.headers()?.iter().map(normalize_header).collect();

    for required in ["date", "open", "high", "low", "close", "volume"] {
        if !normalized.iter().any(|h| h == required) {
            return Err(TraderError::Data(format!(
                "missing required column: {required}"
            )));
        }
    }
    rdr.set_headers(normalized);

    let mut out = Vec::new();
    for record in rdr.deserialize::<RawRecord>() {
        let record = record?;
        let row = PriceRow {
            date: parse_date(&record.date)?,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            adj_close: record.adj_close.unwrap_or(record.close),
            volume: record.volume,
        };
        out.push((record.ticker, row));
    }
    Ok(out)
}

/// Rolling mean; warmup rows before the window fills are back-filled with
/// the first full-window value.
fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    if n < window {
        let mean = values.iter().sum::<f64>() / n.max(1) as f64;
        return vec![mean; n];
    }

    let mut out = vec![0.0; n];
    let mut sum: f64 = values[..window].iter().sum();
    out[window - 1] = sum / window as f64;
    for i in window..n {
        sum += values[i] - values[i - window];
        out[i] = sum / window as f64;
    }
    // Back-fill the warmup rows with the first full-window value
    for i in 0..window - 1 {
        out[i] = out[window - 1];
    }
    out
}

fn derive_features(mut rows: Vec<PriceRow>) -> FeatureTable {
    rows.sort_by_key(|r| r.date);

    let prices: Vec<f64> = rows.iter().map(|r| r.adj_close).collect();
    let volumes: Vec<f64> = rows.iter().map(|r| r.volume).collect();

    let sma_5 = rolling_mean(&prices, SMA_SHORT);
    let sma_10 = rolling_mean(&prices, SMA_LONG);
    let vol_5 = rolling_mean(&volumes, SMA_SHORT);

    let feature_rows = rows
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let ret = if i == 0 || prices[i - 1] == 0.0 {
                0.0
            } else {
                (prices[i] - prices[i - 1]) / prices[i - 1]
            };
            FeatureRow {
                date: r.date,
                open: r.open,
                high: r.high,
                low: r.low,
                close: r.close,
                adj_close: r.adj_close,
                volume: r.volume,
                ret,
                sma_5: sma_5[i],
                sma_10: sma_10[i],
                vol_5: vol_5[i],
            }
        })
        .collect();

    FeatureTable::new(feature_rows)
}

/// Split a table chronologically at `ratio`.
pub fn split_table(table: &FeatureTable, ratio: f64) -> (FeatureTable, FeatureTable) {
    let cut = (table.len() as f64 * ratio) as usize;
    let (train, test) = table.rows().split_at(cut);
    (
        FeatureTable::new(train.to_vec()),
        FeatureTable::new(test.to_vec()),
    )
}

/// Load and prepare a single-ticker CSV file.
pub fn load_ticker_csv<P: AsRef<Path>>(path: P) -> Result<FeatureTable> {
    let file = File::open(path.as_ref())?;
    let rows = read_records(file)?
        .into_iter()
        .map(|(_, row)| row)
        .collect();
    Ok(derive_features(rows))
}

/// Load a combined CSV with a `ticker` column and keep the tickers with the
/// most rows.
fn load_combined_csv<P: AsRef<Path>>(path: P, ratio: f64) -> Result<Dataset> {
    let file = File::open(path.as_ref())?;
    let records = read_records(file)?;

    let mut by_ticker: HashMap<String, Vec<PriceRow>> = HashMap::new();
    for (ticker, row) in records {
        let ticker = ticker.ok_or_else(|| {
            TraderError::Data("combined dataset has no ticker column".to_string())
        })?;
        by_ticker.entry(ticker).or_default().push(row);
    }

    let mut counts: Vec<(String, usize)> = by_ticker
        .iter()
        .map(|(t, rows)| (t.clone(), rows.len()))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let selected: Vec<String> = counts
        .into_iter()
        .take(TOP_TICKER_COUNT)
        .map(|(t, _)| t)
        .collect();
    info!("Selected tickers from combined dataset: {:?}", selected);

    let mut dataset = Vec::with_capacity(selected.len());
    for ticker in selected {
        let rows = by_ticker.remove(&ticker).unwrap_or_default();
        let table = derive_features(rows);
        let (train, test) = split_table(&table, ratio);
        dataset.push(TickerData {
            ticker,
            train: Arc::new(train),
            test: Arc::new(test),
        });
    }
    Ok(dataset)
}

/// Load the basket: a combined CSV when `data_file` exists, otherwise one
/// `<TICKER>.csv` per ticker under `data_dir`.
pub fn load_dataset(
    data_dir: &Path,
    data_file: &Path,
    tickers: &[String],
    ratio: f64,
) -> Result<Dataset> {
    if data_file.exists() {
        info!("Loading combined dataset from {}", data_file.display());
        return load_combined_csv(data_file, ratio);
    }

    let mut dataset = Vec::with_capacity(tickers.len());
    for ticker in tickers {
        let path = data_dir.join(format!("{ticker}.csv"));
        if !path.exists() {
            return Err(TraderError::Data(format!(
                "expected {} or combined dataset {} to exist",
                path.display(),
                data_file.display()
            )));
        }
        info!("Loading {}", path.display());
        let table = load_ticker_csv(&path)?;
        let (train, test) = split_table(&table, ratio);
        dataset.push(TickerData {
            ticker: ticker.clone(),
            train: Arc::new(train),
            test: Arc::new(test),
        });
    }
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_csv() -> &'static str {
        "Date,Open,High,Low,Close,Adj Close,Volume\n\
         2020-01-02,10,11,9,10,10,100\n\
         2020-01-03,10,12,9,11,11,200\n\
         2020-01-06,11,13,10,12,12,300\n\
         2020-01-07,12,14,11,13,13,400\n\
         2020-01-08,13,15,12,14,14,500\n\
         2020-01-09,14,16,13,15,15,600\n"
    }

    #[test]
    fn reads_yahoo_style_headers() {
        let records = read_records(sample_csv().as_bytes()).unwrap();
        assert_eq!(records.len(), 6);
        assert_eq!(records[0].1.adj_close, 10.0);
    }

    #[test]
    fn adj_close_falls_back_to_close() {
        let csv = "date,open,high,low,close,volume\n2020-01-02,1,2,1,1.5,10\n";
        let records = read_records(csv.as_bytes()).unwrap();
        assert_eq!(records[0].1.adj_close, 1.5);
    }

    #[test]
    fn missing_column_is_a_data_error() {
        let csv = "date,open,high,low,volume\n2020-01-02,1,2,1,10\n";
        let err = read_records(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, TraderError::Data(_)));
    }

    #[test]
    fn derives_return_and_backfilled_smas() {
        let records = read_records(sample_csv().as_bytes()).unwrap();
        let rows = records.into_iter().map(|(_, r)| r).collect();
        let table = derive_features(rows);

        assert_eq!(table.row(0).ret, 0.0);
        assert!((table.row(1).ret - 0.1).abs() < 1e-12);

        // First full 5-window mean of adj_close: (10+11+12+13+14)/5 = 12
        assert!((table.row(4).sma_5 - 12.0).abs() < 1e-12);
        // Warmup rows back-fill the first full-window value
        assert!((table.row(0).sma_5 - 12.0).abs() < 1e-12);
        // 6 rows < 10: sma_10 degrades to the full-series mean
        assert!((table.row(0).sma_10 - 12.5).abs() < 1e-12);
        assert!((table.row(4).vol_5 - 300.0).abs() < 1e-12);
    }

    #[test]
    fn split_is_chronological() {
        let records = read_records(sample_csv().as_bytes()).unwrap();
        let rows = records.into_iter().map(|(_, r)| r).collect();
        let table = derive_features(rows);

        let (train, test) = split_table(&table, 0.7);
        assert_eq!(train.len(), 4);
        assert_eq!(test.len(), 2);
        assert!(train.row(train.len() - 1).date < test.row(0).date);
    }

    #[test]
    fn rows_are_sorted_by_date() {
        let csv = "date,open,high,low,close,adj_close,volume\n\
                   2020-01-03,1,1,1,2,2,10\n\
                   2020-01-02,1,1,1,1,1,10\n";
        let records = read_records(csv.as_bytes()).unwrap();
        let rows = records.into_iter().map(|(_, r)| r).collect();
        let table = derive_features(rows);
        assert_eq!(table.price(0), 1.0);
        assert_eq!(table.price(1), 2.0);
    }
}
