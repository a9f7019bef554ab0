//! Delimited-text input and output for the sales dataset.
//!
//! Reading is lenient: column names are trimmed and lowercased, unknown
//! columns are ignored, short rows are kept (their missing cells become
//! nulls), and lines the CSV decoder rejects are reported rather than fatal.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::constants::{self, NULL_TOKENS};
use crate::domain::{RawBatch, RawSaleRow, SaleRecord, SourceRow};
use crate::error::Result;

/// Lowercase and trim a header row
pub fn normalize_headers(headers: &StringRecord) -> StringRecord {
    headers
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_lowercase())
        .collect()
}

/// Whether a cell should be read as null
pub fn is_null_cell(cell: &str) -> bool {
    let trimmed = cell.trim();
    trimmed.is_empty() || NULL_TOKENS.contains(&trimmed.to_lowercase().as_str())
}

fn scrub(cell: Option<String>) -> Option<String> {
    cell.and_then(|c| {
        if is_null_cell(&c) {
            None
        } else {
            Some(c.trim().to_string())
        }
    })
}

fn scrub_row(row: RawSaleRow) -> RawSaleRow {
    RawSaleRow {
        invoice_id: scrub(row.invoice_id),
        branch: scrub(row.branch),
        city: scrub(row.city),
        category: scrub(row.category),
        unit_price: scrub(row.unit_price),
        quantity: scrub(row.quantity),
        date: scrub(row.date),
        time: scrub(row.time),
        payment_method: scrub(row.payment_method),
        rating: scrub(row.rating),
        profit_margin: scrub(row.profit_margin),
    }
}

/// Read raw rows from any reader
pub fn read_raw<R: Read>(reader: R, delimiter: u8) -> Result<RawBatch> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let headers = normalize_headers(rdr.headers()?);
    debug!("Normalized headers: {:?}", headers);
    for required in constants::REQUIRED_FIELDS {
        if !headers.iter().any(|h| h == required) {
            warn!("Input is missing column '{}'; every row will be dropped", required);
        }
    }
    rdr.set_headers(headers.clone());

    let mut batch = RawBatch::default();
    let mut record = StringRecord::new();
    loop {
        match rdr.read_record(&mut record) {
            Ok(true) => {
                // Header is line 1
                let line = record.position().map(|p| p.line()).unwrap_or(0);
                match record.deserialize::<RawSaleRow>(Some(&headers)) {
                    Ok(row) => batch.rows.push(SourceRow {
                        line,
                        row: scrub_row(row),
                    }),
                    Err(e) => batch.unreadable.push((line, e.to_string())),
                }
            }
            Ok(false) => break,
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                if matches!(e.kind(), csv::ErrorKind::Io(_)) {
                    return Err(e.into());
                }
                batch.unreadable.push((line, e.to_string()));
            }
        }
    }

    Ok(batch)
}

/// Read raw rows from a file on disk
pub fn read_raw_file<P: AsRef<Path>>(path: P, delimiter: u8) -> Result<RawBatch> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let batch = read_raw(file, delimiter)?;
    info!(
        "Read {} rows ({} unreadable) from {}",
        batch.rows.len(),
        batch.unreadable.len(),
        path.display()
    );
    Ok(batch)
}

/// SHA-256 of a file's contents, hex encoded
pub fn fingerprint_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Write cleaned records as CSV with lowercase headers and the derived `total`
pub fn write_clean<W: Write>(writer: W, records: &[SaleRecord]) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record([
        constants::INVOICE_ID,
        constants::BRANCH,
        constants::CITY,
        constants::CATEGORY,
        constants::UNIT_PRICE,
        constants::QUANTITY,
        constants::DATE,
        constants::TIME,
        constants::PAYMENT_METHOD,
        constants::RATING,
        constants::PROFIT_MARGIN,
        constants::TOTAL,
    ])?;
    for r in records {
        wtr.write_record([
            r.invoice_id.clone(),
            r.branch.clone(),
            r.city.clone(),
            r.category.clone(),
            r.unit_price.to_string(),
            r.quantity.to_string(),
            r.date.format("%Y-%m-%d").to_string(),
            r.time.format("%H:%M:%S").to_string(),
            r.payment_method.clone(),
            r.rating.to_string(),
            r.profit_margin.map(|m| m.to_string()).unwrap_or_default(),
            r.total.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write cleaned records to a file, creating parent directories
pub fn write_clean_file<P: AsRef<Path>>(path: P, records: &[SaleRecord]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    write_clean(file, records)?;
    info!("Wrote {} cleaned records to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_are_lowercased() {
        let data = "Invoice_ID,Branch,City,category,unit_price,quantity,date,time,payment_method,rating,profit_margin\n\
                    1,WALM003,San Antonio,Health and beauty,$74.69,7,05/01/19,13:08:00,Ewallet,9.1,0.48\n";
        let batch = read_raw(data.as_bytes(), b',').unwrap();
        assert_eq!(batch.rows.len(), 1);
        let row = &batch.rows[0].row;
        assert_eq!(row.invoice_id.as_deref(), Some("1"));
        assert_eq!(row.branch.as_deref(), Some("WALM003"));
        assert_eq!(row.unit_price.as_deref(), Some("$74.69"));
        assert_eq!(batch.rows[0].line, 2);
    }

    #[test]
    fn test_null_tokens_become_none() {
        let data = "invoice_id,branch,city,category,unit_price,quantity,date,time,payment_method,rating,profit_margin\n\
                    2,WALM001,Austin,Food,NaN,,2023-01-01,10:00:00,Cash, 7.0 ,NA\n";
        let batch = read_raw(data.as_bytes(), b',').unwrap();
        let row = &batch.rows[0].row;
        assert_eq!(row.unit_price, None);
        assert_eq!(row.quantity, None);
        assert_eq!(row.profit_margin, None);
        assert_eq!(row.rating.as_deref(), Some("7.0"));
    }

    #[test]
    fn test_short_rows_are_kept_with_missing_cells() {
        let data = "invoice_id,branch,city\n3,WALM002\n";
        let batch = read_raw(data.as_bytes(), b',').unwrap();
        assert_eq!(batch.rows.len(), 1);
        assert_eq!(batch.rows[0].row.city, None);
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        std::fs::write(&path, "invoice_id\n1\n").unwrap();
        let a = fingerprint_file(&path).unwrap();
        let b = fingerprint_file(&path).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }
}
