use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// A row exactly as read from the source file, after header lowercasing.
/// Every cell is optional; nulls are resolved by the cleaner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSaleRow {
    pub invoice_id: Option<String>,
    pub branch: Option<String>,
    pub city: Option<String>,
    pub category: Option<String>,
    pub unit_price: Option<String>,
    pub quantity: Option<String>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub payment_method: Option<String>,
    pub rating: Option<String>,
    pub profit_margin: Option<String>,
}

impl RawSaleRow {
    /// Look up a cell by canonical column name
    pub fn field(&self, name: &str) -> Option<&str> {
        let cell = match name {
            "invoice_id" => &self.invoice_id,
            "branch" => &self.branch,
            "city" => &self.city,
            "category" => &self.category,
            "unit_price" => &self.unit_price,
            "quantity" => &self.quantity,
            "date" => &self.date,
            "time" => &self.time,
            "payment_method" => &self.payment_method,
            "rating" => &self.rating,
            "profit_margin" => &self.profit_margin,
            _ => return None,
        };
        cell.as_deref()
    }
}

/// A raw row together with its 1-based line number in the source file
#[derive(Debug, Clone)]
pub struct SourceRow {
    pub line: u64,
    pub row: RawSaleRow,
}

/// Everything read from one source file
#[derive(Debug, Clone, Default)]
pub struct RawBatch {
    pub rows: Vec<SourceRow>,
    /// Lines the CSV reader could not decode at all
    pub unreadable: Vec<(u64, String)>,
}

/// A cleaned, fully-typed sale record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub invoice_id: String,
    pub branch: String,
    pub city: String,
    pub category: String,
    pub unit_price: f64,
    pub quantity: u32,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub payment_method: String,
    pub rating: f64,
    pub profit_margin: Option<f64>,
    pub total: f64,
}

impl SaleRecord {
    /// Derived revenue for a line item
    pub fn compute_total(unit_price: f64, quantity: u32) -> f64 {
        unit_price * f64::from(quantity)
    }
}
