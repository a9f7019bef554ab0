//! The reporting layer: a fixed catalog of read-only aggregate queries run
//! against a loaded [`SalesStore`](crate::store::SalesStore), one at a time.

pub mod catalog;
pub mod render;

use std::fmt;
use std::time::Instant;

use rusqlite::types::ValueRef;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::constants;
use crate::error::{Result, SalesError};
use crate::metrics::ReportMetrics;
use crate::store::SalesStore;

pub use catalog::{catalog, find_query, QueryDef};
pub use render::{render, render_all, Format};

/// Parameters shared by the catalog queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportParams {
    pub previous_year: i32,
    pub current_year: i32,
    pub top_k: u32,
    pub limit: u32,
}

impl Default for ReportParams {
    fn default() -> Self {
        Self {
            previous_year: constants::DEFAULT_PREVIOUS_YEAR,
            current_year: constants::DEFAULT_CURRENT_YEAR,
            top_k: constants::DEFAULT_TOP_K,
            limit: constants::DEFAULT_LIMIT,
        }
    }
}

impl ReportParams {
    fn named(&self) -> [(&'static str, i64); 4] {
        [
            (":previous_year", i64::from(self.previous_year)),
            (":current_year", i64::from(self.current_year)),
            (":top_k", i64::from(self.top_k)),
            (":limit", i64::from(self.limit)),
        ]
    }
}

/// A single result cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value; integers widen to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    fn from_ref(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(r) => Value::Real(r),
            ValueRef::Text(t) | ValueRef::Blob(t) => {
                Value::Text(String::from_utf8_lossy(t).into_owned())
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// Rows returned by one catalog query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub query: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of one column, top to bottom
    pub fn column<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Value> + 'a {
        let idx = self.column_index(name);
        self.rows
            .iter()
            .filter_map(move |row| idx.and_then(|i| row.get(i)))
    }

    /// Rows as (column name -> value) JSON objects
    pub fn to_records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().map(|v| serde_json::to_value(v).unwrap_or_default()))
                    .collect()
            })
            .collect()
    }
}

/// Run one catalog query against the store
#[instrument(skip(store, query, params), fields(query = query.name))]
pub fn run_query(store: &SalesStore, query: &QueryDef, params: &ReportParams) -> Result<ResultSet> {
    let started = Instant::now();
    let result = execute(store, query, params);
    match &result {
        Ok(rs) => {
            let secs = started.elapsed().as_secs_f64();
            debug!("{} returned {} rows in {:.3}s", query.name, rs.len(), secs);
            ReportMetrics::record_query(query.name, rs.len(), secs);
        }
        Err(e) => {
            error!("Query {} failed: {}", query.name, e);
            ReportMetrics::record_query_error(query.name);
        }
    }
    result
}

fn execute(store: &SalesStore, query: &QueryDef, params: &ReportParams) -> Result<ResultSet> {
    let mut stmt = store.connection().prepare(&query.sql)?;

    for (name, value) in params.named() {
        if let Some(idx) = stmt.parameter_index(name)? {
            stmt.raw_bind_parameter(idx, value)?;
        }
    }

    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    if columns.iter().map(String::as_str).ne(query.columns.iter().copied()) {
        return Err(SalesError::ColumnContract {
            query: query.name.to_string(),
            expected: query.columns.iter().map(|c| c.to_string()).collect(),
            actual: columns,
        });
    }

    let width = columns.len();
    let mut rows = Vec::new();
    let mut cursor = stmt.raw_query();
    while let Some(row) = cursor.next()? {
        let mut cells = Vec::with_capacity(width);
        for i in 0..width {
            cells.push(Value::from_ref(row.get_ref(i)?));
        }
        rows.push(cells);
    }

    Ok(ResultSet {
        query: query.name.to_string(),
        columns,
        rows,
    })
}

/// Run a query by catalog name
pub fn run_named(store: &SalesStore, name: &str, params: &ReportParams) -> Result<ResultSet> {
    let query = find_query(name).ok_or_else(|| SalesError::UnknownQuery(name.to_string()))?;
    run_query(store, query, params)
}

/// Run every catalog query in order
pub fn run_all(store: &SalesStore, params: &ReportParams) -> Result<Vec<ResultSet>> {
    catalog()
        .iter()
        .map(|q| run_query(store, q, params))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_query_runs_on_empty_store() {
        let store = SalesStore::open_in_memory().unwrap();
        let results = run_all(&store, &ReportParams::default()).unwrap();
        assert_eq!(results.len(), catalog().len());
        for (rs, def) in results.iter().zip(catalog()) {
            assert_eq!(rs.columns, def.columns, "columns of {}", def.name);
            assert!(rs.is_empty(), "{} should be empty", def.name);
        }
    }

    #[test]
    fn test_unknown_query_is_an_error() {
        let store = SalesStore::open_in_memory().unwrap();
        let err = run_named(&store, "nope", &ReportParams::default()).unwrap_err();
        assert!(matches!(err, SalesError::UnknownQuery(_)));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Integer(3).to_string(), "3");
        assert_eq!(Value::Real(12.5).to_string(), "12.5");
        assert_eq!(Value::Text("Cash".into()).to_string(), "Cash");
        assert_eq!(Value::Null.to_string(), "");
    }
}
