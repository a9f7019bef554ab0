use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::ResultSet;
use crate::error::Result;

/// Output format for result sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Table,
    Json,
    Csv,
}

/// Render one result set
pub fn render(rs: &ResultSet, format: Format) -> Result<String> {
    match format {
        Format::Table => Ok(render_table(rs)),
        Format::Json => Ok(serde_json::to_string_pretty(&rs.to_records())?),
        Format::Csv => render_csv(rs),
    }
}

/// Render several result sets; JSON output is a single object keyed by query name
pub fn render_all(results: &[ResultSet], format: Format) -> Result<String> {
    match format {
        Format::Json => {
            let mut doc = serde_json::Map::new();
            for rs in results {
                doc.insert(rs.query.clone(), serde_json::to_value(rs.to_records())?);
            }
            Ok(serde_json::to_string_pretty(&doc)?)
        }
        _ => {
            let mut out = String::new();
            for rs in results {
                if format == Format::Csv {
                    let _ = writeln!(out, "# {}", rs.query);
                }
                out.push_str(&render(rs, format)?);
                out.push('\n');
            }
            Ok(out)
        }
    }
}

fn render_table(rs: &ResultSet) -> String {
    let cells: Vec<Vec<String>> = rs
        .rows
        .iter()
        .map(|row| row.iter().map(|v| v.to_string()).collect())
        .collect();
    let mut widths: Vec<usize> = rs.columns.iter().map(|c| c.chars().count()).collect();
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "== {} ({} rows)", rs.query, rs.rows.len());
    let header: Vec<String> = rs
        .columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{c:<w$}"))
        .collect();
    let _ = writeln!(out, "{}", header.join(" | ").trim_end());
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("-+-"));
    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{c:<w$}"))
            .collect();
        let _ = writeln!(out, "{}", line.join(" | ").trim_end());
    }
    out
}

fn render_csv(rs: &ResultSet) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(&rs.columns)?;
    for row in &rs.rows {
        wtr.write_record(row.iter().map(|v| v.to_string()))?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
