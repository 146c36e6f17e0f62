//! Aggregate statistics over the historical transaction table.
//!
//! The table is the cleaned credit card CSV with a `Class` label column
//! (1 = fraud) and an `Amount` column. Lower-case headers are accepted.

use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const CLASS_COLUMN: &str = "Class";
pub const AMOUNT_COLUMN: &str = "Amount";

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Data file not found. Please verify the path {0}")]
    NotFound(PathBuf),

    #[error("Column '{column}' not found. Available columns: {available:?}")]
    MissingColumn {
        column: &'static str,
        available: Vec<String>,
    },

    #[error("row {row}: invalid {column} value {value:?}")]
    InvalidValue {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("failed to read dataset: {0}")]
    Csv(#[from] csv::Error),
}

/// One equal-width bucket of the fraud amount histogram
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: u64,
}

/// Summary shown by the monitoring view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub total_transactions: u64,
    pub fraud_cases: u64,
    /// fraud / total * 100
    pub fraud_rate_pct: f64,
    /// Row count per class label
    pub class_distribution: BTreeMap<i64, u64>,
    /// Distribution of amounts over fraudulent rows
    pub fraud_amounts: Vec<HistogramBin>,
}

/// Read and summarize the table at `path`.
pub fn load_summary(path: &Path, bins: usize) -> Result<DatasetSummary, DatasetError> {
    if !path.exists() {
        return Err(DatasetError::NotFound(path.to_path_buf()));
    }
    let reader = csv::Reader::from_path(path)?;
    let summary = summarize_records(reader, bins)?;

    info!(
        path = %path.display(),
        rows = summary.total_transactions,
        fraud = summary.fraud_cases,
        "Historical dataset summarized"
    );

    Ok(summary)
}

/// Summarize CSV data from any reader (header row required).
pub fn summarize<R: Read>(data: R, bins: usize) -> Result<DatasetSummary, DatasetError> {
    summarize_records(csv::Reader::from_reader(data), bins)
}

fn summarize_records<R: Read>(
    mut reader: csv::Reader<R>,
    bins: usize,
) -> Result<DatasetSummary, DatasetError> {
    let headers = reader.headers()?.clone();
    let class_idx = column_index(&headers, CLASS_COLUMN)?;
    let amount_idx = column_index(&headers, AMOUNT_COLUMN)?;

    let mut total = 0u64;
    let mut class_distribution = BTreeMap::new();
    let mut fraud_amounts = Vec::new();

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let class = parse_field(&record, class_idx, row, CLASS_COLUMN)? as i64;
        total += 1;
        *class_distribution.entry(class).or_insert(0) += 1;

        if class == 1 {
            fraud_amounts.push(parse_field(&record, amount_idx, row, AMOUNT_COLUMN)?);
        }
    }

    let fraud_cases = class_distribution.get(&1).copied().unwrap_or(0);
    let fraud_rate_pct = if total > 0 {
        fraud_cases as f64 / total as f64 * 100.0
    } else {
        0.0
    };

    Ok(DatasetSummary {
        total_transactions: total,
        fraud_cases,
        fraud_rate_pct,
        class_distribution,
        fraud_amounts: histogram(&fraud_amounts, bins),
    })
}

/// Position of `column`, also matching its all-lowercase spelling
fn column_index(headers: &csv::StringRecord, column: &'static str) -> Result<usize, DatasetError> {
    let lower = column.to_lowercase();
    headers
        .iter()
        .position(|h| h.trim() == column || h.trim() == lower)
        .ok_or_else(|| DatasetError::MissingColumn {
            column,
            available: headers.iter().map(str::to_string).collect(),
        })
}

fn parse_field(
    record: &csv::StringRecord,
    idx: usize,
    row: usize,
    column: &'static str,
) -> Result<f64, DatasetError> {
    let raw = record.get(idx).unwrap_or("").trim();
    raw.trim_matches('\'')
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| DatasetError::InvalidValue {
            row: row + 1,
            column,
            value: raw.to_string(),
        })
}

/// Equal-width histogram over `[min, max]`
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if max == min {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: values.len() as u64,
        }];
    }

    let width = (max - min) / bins as f64;
    let mut result: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count: 0,
        })
        .collect();

    for &v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        result[idx].count += 1;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Time,V1,Amount,Class\n\
                          0,-1.3,149.62,0\n\
                          1,1.19,2.69,0\n\
                          2,-10.2,500.00,1\n\
                          3,0.5,100.00,1\n";

    #[test]
    fn test_summary_counts() {
        let summary = summarize(SAMPLE.as_bytes(), 30).unwrap();
        assert_eq!(summary.total_transactions, 4);
        assert_eq!(summary.fraud_cases, 2);
        assert!((summary.fraud_rate_pct - 50.0).abs() < 1e-9);
        assert_eq!(summary.class_distribution[&0], 2);
        assert_eq!(summary.class_distribution[&1], 2);
    }

    #[test]
    fn test_fraud_amount_histogram() {
        let summary = summarize(SAMPLE.as_bytes(), 4).unwrap();
        let bins = &summary.fraud_amounts;
        assert_eq!(bins.len(), 4);
        assert_eq!(bins[0].lower, 100.0);
        assert_eq!(bins[3].upper, 500.0);
        assert_eq!(bins[0].count, 1);
        assert_eq!(bins[3].count, 1);
        assert_eq!(bins.iter().map(|b| b.count).sum::<u64>(), 2);
    }

    #[test]
    fn test_lowercase_headers_accepted() {
        let data = "amount,class\n10.0,1\n20.0,0\n";
        let summary = summarize(data.as_bytes(), 30).unwrap();
        assert_eq!(summary.fraud_cases, 1);
        assert_eq!(summary.fraud_amounts.len(), 1);
        assert_eq!(summary.fraud_amounts[0].count, 1);
    }

    #[test]
    fn test_missing_column_lists_available() {
        let data = "Time,Amount\n0,1.0\n";
        let err = summarize(data.as_bytes(), 30).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Column 'Class' not found"));
        assert!(message.contains("Time"));
    }

    #[test]
    fn test_quoted_class_labels() {
        let data = "Amount,Class\n5.0,\"'1'\"\n";
        let summary = summarize(data.as_bytes(), 30).unwrap();
        assert_eq!(summary.fraud_cases, 1);
    }

    #[test]
    fn test_invalid_value_reports_row() {
        let data = "Amount,Class\n5.0,0\nabc,1\n";
        let err = summarize(data.as_bytes(), 30).unwrap_err();
        assert!(matches!(err, DatasetError::InvalidValue { row: 2, column: "Amount", .. }));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_summary(&dir.path().join("creditcard.csv"), 30).unwrap_err();
        assert!(matches!(err, DatasetError::NotFound(_)));
    }

    #[test]
    fn test_empty_table() {
        let summary = summarize("Amount,Class\n".as_bytes(), 30).unwrap();
        assert_eq!(summary.total_transactions, 0);
        assert_eq!(summary.fraud_rate_pct, 0.0);
        assert!(summary.fraud_amounts.is_empty());
    }

    #[test]
    fn test_constant_amounts_single_bin() {
        let bins = histogram(&[42.0, 42.0, 42.0], 30);
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].count, 3);
    }
}
