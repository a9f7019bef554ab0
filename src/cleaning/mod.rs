//! The cleaning checkpoint between raw input and the store.
//!
//! Rows pass through deduplication, the missing-value policy, type
//! normalisation and the invoice-id uniqueness check, in that order. A row
//! that fails any step is excluded and recorded as a [`Rejection`]; nothing
//! is imputed and nothing is retried.

pub mod parse;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::constants::{self, REQUIRED_FIELDS};
use crate::domain::{RawBatch, RawSaleRow, SaleRecord, SourceRow};
use crate::metrics::CleaningMetrics;

/// Why a row was excluded from the cleaned batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    /// Exact copy of an earlier row
    Duplicate { first_line: u64 },
    /// A required field is null
    MissingField { field: String },
    /// A field could not be normalised to its type
    Malformed { field: String, value: String },
    /// The invoice id was already taken by a different row
    ConflictingInvoiceId { invoice_id: String, first_line: u64 },
    /// The CSV decoder rejected the line
    Unreadable { message: String },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::Duplicate { first_line } => {
                write!(f, "duplicate of line {first_line}")
            }
            RejectReason::MissingField { field } => write!(f, "missing required field '{field}'"),
            RejectReason::Malformed { field, value } => {
                write!(f, "malformed {field}: '{value}'")
            }
            RejectReason::ConflictingInvoiceId {
                invoice_id,
                first_line,
            } => write!(
                f,
                "invoice id '{invoice_id}' already used on line {first_line}"
            ),
            RejectReason::Unreadable { message } => write!(f, "unreadable: {message}"),
        }
    }
}

/// A single excluded row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub line: u64,
    pub reason: RejectReason,
}

/// Row accounting for one cleaning run. The exclusion counts and
/// `clean_rows` always add up to `input_rows`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanStats {
    pub input_rows: usize,
    pub unreadable_rows: usize,
    pub duplicate_rows: usize,
    pub missing_field_rows: usize,
    pub malformed_rows: usize,
    pub conflicting_id_rows: usize,
    pub clean_rows: usize,
}

impl CleanStats {
    pub fn dropped_rows(&self) -> usize {
        self.unreadable_rows
            + self.duplicate_rows
            + self.missing_field_rows
            + self.malformed_rows
            + self.conflicting_id_rows
    }
}

/// Output of the cleaner
#[derive(Debug, Clone, Default)]
pub struct CleanedBatch {
    pub records: Vec<SaleRecord>,
    pub stats: CleanStats,
    pub rejections: Vec<Rejection>,
}

/// Configuration for the cleaning rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    /// Date formats tried in order
    pub date_formats: Vec<String>,
    /// Time formats tried in order
    pub time_formats: Vec<String>,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            date_formats: constants::default_date_formats(),
            time_formats: constants::default_time_formats(),
        }
    }
}

/// Trait for turning a raw batch into clean sale records
pub trait Cleaner {
    fn clean(&self, batch: RawBatch) -> CleanedBatch;
}

/// Default cleaner implementing the drop-don't-impute policy
pub struct DefaultCleaner {
    pub config: CleanerConfig,
}

impl DefaultCleaner {
    /// Create a cleaner with the default date/time formats
    pub fn new() -> Self {
        Self {
            config: CleanerConfig::default(),
        }
    }

    /// Create a cleaner with custom configuration
    pub fn with_config(config: CleanerConfig) -> Self {
        Self { config }
    }

    fn missing_field(row: &RawSaleRow) -> Option<&'static str> {
        REQUIRED_FIELDS
            .iter()
            .copied()
            .find(|field| row.field(field).is_none())
    }

    /// Normalise one fully-populated row into a typed record
    fn normalize(&self, row: &RawSaleRow) -> std::result::Result<SaleRecord, RejectReason> {
        fn required<'a>(row: &'a RawSaleRow, field: &'static str) -> std::result::Result<&'a str, RejectReason> {
            row.field(field).ok_or_else(|| RejectReason::MissingField {
                field: field.to_string(),
            })
        }
        fn malformed(field: &str, value: &str) -> RejectReason {
            RejectReason::Malformed {
                field: field.to_string(),
                value: value.to_string(),
            }
        }

        let raw_price = required(row, constants::UNIT_PRICE)?;
        let unit_price = parse::parse_currency(raw_price)
            .ok_or_else(|| malformed(constants::UNIT_PRICE, raw_price))?;

        let raw_qty = required(row, constants::QUANTITY)?;
        let quantity = parse::parse_quantity(raw_qty)
            .ok_or_else(|| malformed(constants::QUANTITY, raw_qty))?;

        let raw_date = required(row, constants::DATE)?;
        let date = parse::parse_date(raw_date, &self.config.date_formats)
            .ok_or_else(|| malformed(constants::DATE, raw_date))?;

        let raw_time = required(row, constants::TIME)?;
        let time = parse::parse_time(raw_time, &self.config.time_formats)
            .ok_or_else(|| malformed(constants::TIME, raw_time))?;

        let raw_rating = required(row, constants::RATING)?;
        let rating = parse::parse_rating(raw_rating)
            .ok_or_else(|| malformed(constants::RATING, raw_rating))?;

        let profit_margin = match row.field(constants::PROFIT_MARGIN) {
            Some(raw) => Some(
                parse::parse_margin(raw).ok_or_else(|| malformed(constants::PROFIT_MARGIN, raw))?,
            ),
            None => None,
        };

        Ok(SaleRecord {
            invoice_id: required(row, constants::INVOICE_ID)?.to_string(),
            branch: required(row, constants::BRANCH)?.to_string(),
            city: required(row, constants::CITY)?.to_string(),
            category: required(row, constants::CATEGORY)?.to_string(),
            unit_price,
            quantity,
            date,
            time,
            payment_method: required(row, constants::PAYMENT_METHOD)?.to_string(),
            rating,
            profit_margin,
            total: SaleRecord::compute_total(unit_price, quantity),
        })
    }
}

impl Default for DefaultCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl Cleaner for DefaultCleaner {
    fn clean(&self, batch: RawBatch) -> CleanedBatch {
        let mut stats = CleanStats {
            input_rows: batch.rows.len() + batch.unreadable.len(),
            unreadable_rows: batch.unreadable.len(),
            ..Default::default()
        };
        let mut rejections: Vec<Rejection> = batch
            .unreadable
            .into_iter()
            .map(|(line, message)| Rejection {
                line,
                reason: RejectReason::Unreadable { message },
            })
            .collect();

        // Step 1: exact duplicates, first instance wins
        let mut first_seen: HashMap<RawSaleRow, u64> = HashMap::new();
        let mut unique: Vec<SourceRow> = Vec::with_capacity(batch.rows.len());
        for source in batch.rows {
            if let Some(&first_line) = first_seen.get(&source.row) {
                stats.duplicate_rows += 1;
                rejections.push(Rejection {
                    line: source.line,
                    reason: RejectReason::Duplicate { first_line },
                });
                continue;
            }
            first_seen.insert(source.row.clone(), source.line);
            unique.push(source);
        }
        debug!("{} rows after exact deduplication", unique.len());

        // Steps 2-4: missing values, normalisation, id uniqueness
        let mut ids: HashMap<String, u64> = HashMap::new();
        let mut records = Vec::with_capacity(unique.len());
        for source in unique {
            if let Some(field) = Self::missing_field(&source.row) {
                stats.missing_field_rows += 1;
                rejections.push(Rejection {
                    line: source.line,
                    reason: RejectReason::MissingField {
                        field: field.to_string(),
                    },
                });
                continue;
            }

            let record = match self.normalize(&source.row) {
                Ok(record) => record,
                Err(reason) => {
                    stats.malformed_rows += 1;
                    rejections.push(Rejection {
                        line: source.line,
                        reason,
                    });
                    continue;
                }
            };

            if let Some(&first_line) = ids.get(&record.invoice_id) {
                stats.conflicting_id_rows += 1;
                warn!(
                    "Invoice id {} on line {} conflicts with line {}",
                    record.invoice_id, source.line, first_line
                );
                rejections.push(Rejection {
                    line: source.line,
                    reason: RejectReason::ConflictingInvoiceId {
                        invoice_id: record.invoice_id,
                        first_line,
                    },
                });
                continue;
            }
            ids.insert(record.invoice_id.clone(), source.line);
            records.push(record);
        }

        stats.clean_rows = records.len();
        rejections.sort_by_key(|r| r.line);

        info!(
            "Cleaned {} of {} rows ({} duplicates, {} missing, {} malformed, {} conflicting ids, {} unreadable)",
            stats.clean_rows,
            stats.input_rows,
            stats.duplicate_rows,
            stats.missing_field_rows,
            stats.malformed_rows,
            stats.conflicting_id_rows,
            stats.unreadable_rows
        );
        CleaningMetrics::record_batch(&stats);

        CleanedBatch {
            records,
            stats,
            rejections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(invoice_id: &str, price: &str, qty: &str) -> RawSaleRow {
        RawSaleRow {
            invoice_id: Some(invoice_id.to_string()),
            branch: Some("WALM001".to_string()),
            city: Some("San Antonio".to_string()),
            category: Some("Health and beauty".to_string()),
            unit_price: Some(price.to_string()),
            quantity: Some(qty.to_string()),
            date: Some("05/01/19".to_string()),
            time: Some("13:08:00".to_string()),
            payment_method: Some("Ewallet".to_string()),
            rating: Some("9.1".to_string()),
            profit_margin: Some("0.48".to_string()),
        }
    }

    fn batch(rows: Vec<RawSaleRow>) -> RawBatch {
        RawBatch {
            rows: rows
                .into_iter()
                .enumerate()
                .map(|(i, row)| SourceRow {
                    line: i as u64 + 2,
                    row,
                })
                .collect(),
            unreadable: Vec::new(),
        }
    }

    #[test]
    fn test_cleaner_normalizes_currency_and_derives_total() {
        let cleaned = DefaultCleaner::new().clean(batch(vec![raw("1", "$74.69", "7")]));
        assert_eq!(cleaned.records.len(), 1);
        let record = &cleaned.records[0];
        assert_eq!(record.unit_price, 74.69);
        assert_eq!(record.quantity, 7);
        assert_eq!(record.total, 74.69 * 7.0);
        assert_eq!(record.profit_margin, Some(0.48));
    }

    #[test]
    fn test_cleaner_drops_exact_duplicates_keeping_first() {
        let cleaned = DefaultCleaner::new().clean(batch(vec![
            raw("1", "$10.00", "2"),
            raw("1", "$10.00", "2"),
            raw("2", "$5.00", "1"),
        ]));
        assert_eq!(cleaned.records.len(), 2);
        assert_eq!(cleaned.stats.duplicate_rows, 1);
        assert_eq!(
            cleaned.rejections[0],
            Rejection {
                line: 3,
                reason: RejectReason::Duplicate { first_line: 2 }
            }
        );
    }

    #[test]
    fn test_cleaner_drops_rows_with_missing_required_fields() {
        let mut missing_city = raw("1", "$10.00", "2");
        missing_city.city = None;
        let cleaned = DefaultCleaner::new().clean(batch(vec![missing_city]));
        assert!(cleaned.records.is_empty());
        assert_eq!(cleaned.stats.missing_field_rows, 1);
        assert!(matches!(
            &cleaned.rejections[0].reason,
            RejectReason::MissingField { field } if field == "city"
        ));
    }

    #[test]
    fn test_cleaner_keeps_rows_without_profit_margin() {
        let mut no_margin = raw("1", "$10.00", "2");
        no_margin.profit_margin = None;
        let cleaned = DefaultCleaner::new().clean(batch(vec![no_margin]));
        assert_eq!(cleaned.records.len(), 1);
        assert_eq!(cleaned.records[0].profit_margin, None);
    }

    #[test]
    fn test_cleaner_rejects_malformed_price() {
        let cleaned = DefaultCleaner::new().clean(batch(vec![raw("1", "$1O.00", "2")]));
        assert!(cleaned.records.is_empty());
        assert_eq!(cleaned.stats.malformed_rows, 1);
        assert_eq!(
            cleaned.rejections[0].reason,
            RejectReason::Malformed {
                field: "unit_price".to_string(),
                value: "$1O.00".to_string()
            }
        );
    }

    #[test]
    fn test_cleaner_rejects_dash_date_with_two_digit_year() {
        let mut short_year = raw("1", "$10.00", "2");
        short_year.date = Some("05-01-22".to_string());
        let cleaned = DefaultCleaner::new().clean(batch(vec![short_year]));
        assert!(cleaned.records.is_empty());
        assert_eq!(
            cleaned.rejections[0].reason,
            RejectReason::Malformed {
                field: "date".to_string(),
                value: "05-01-22".to_string()
            }
        );
    }

    #[test]
    fn test_cleaner_rejects_conflicting_invoice_ids() {
        let cleaned = DefaultCleaner::new().clean(batch(vec![
            raw("7", "$10.00", "2"),
            raw("7", "$11.00", "2"),
        ]));
        assert_eq!(cleaned.records.len(), 1);
        assert_eq!(cleaned.records[0].unit_price, 10.0);
        assert_eq!(cleaned.stats.conflicting_id_rows, 1);
    }

    #[test]
    fn test_stats_account_for_every_row() {
        let mut missing = raw("3", "$1.00", "1");
        missing.branch = None;
        let mut input = batch(vec![
            raw("1", "$10.00", "2"),
            raw("1", "$10.00", "2"),
            missing,
            raw("4", "oops", "1"),
            raw("1", "$9.00", "2"),
        ]);
        input.unreadable.push((9, "invalid utf-8".to_string()));
        let cleaned = DefaultCleaner::new().clean(input);
        let stats = &cleaned.stats;
        assert_eq!(stats.input_rows, 6);
        assert_eq!(stats.clean_rows + stats.dropped_rows(), stats.input_rows);
        assert_eq!(cleaned.rejections.len(), stats.dropped_rows());
    }
}
