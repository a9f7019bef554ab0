//! Metrics for the cleaning, load and reporting phases.
//!
//! Metric names follow `sales_{phase}_{name}[_total]`. A Prometheus recorder
//! is installed once; its handle is kept so short-lived runs can render a
//! text snapshot instead of being scraped.

use std::sync::{Once, OnceLock};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{info, warn};

use crate::cleaning::CleanStats;

static INIT: Once = Once::new();
static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("sales_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("sales_", $phase, "_", $name)
    };
}

/// Install the global Prometheus recorder. Idempotent.
pub fn init_metrics() {
    INIT.call_once(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if HANDLE.set(handle).is_err() {
                warn!("Metrics handle was already set");
            }
            info!("Prometheus recorder installed");
        }
        Err(e) => {
            warn!("Failed to install Prometheus recorder: {}", e);
        }
    });
}

/// Render the current metrics in Prometheus text format, if a recorder is installed
pub fn render() -> Option<String> {
    HANDLE.get().map(|h| h.render())
}

/// Metrics for the cleaning phase
pub struct CleaningMetrics;

impl CleaningMetrics {
    pub fn record_batch(stats: &CleanStats) {
        ::metrics::counter!(phase_metric!(counter, "cleaning", "rows_read"))
            .increment(stats.input_rows as u64);
        ::metrics::counter!(phase_metric!(counter, "cleaning", "rows_clean"))
            .increment(stats.clean_rows as u64);
        for (reason, count) in [
            ("unreadable", stats.unreadable_rows),
            ("duplicate", stats.duplicate_rows),
            ("missing_field", stats.missing_field_rows),
            ("malformed", stats.malformed_rows),
            ("conflicting_id", stats.conflicting_id_rows),
        ] {
            ::metrics::counter!(phase_metric!(counter, "cleaning", "rows_dropped"), "reason" => reason)
                .increment(count as u64);
        }
    }
}

/// Metrics for loading the store
pub struct StoreMetrics;

impl StoreMetrics {
    pub fn record_load(rows: usize, duration_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "store", "loads")).increment(1);
        ::metrics::counter!(phase_metric!(counter, "store", "rows_loaded")).increment(rows as u64);
        ::metrics::histogram!(phase_metric!(histogram, "store", "load_duration_seconds"))
            .record(duration_secs);
    }

    pub fn record_load_skipped() {
        ::metrics::counter!(phase_metric!(counter, "store", "loads_skipped")).increment(1);
    }
}

/// Metrics for the report catalog
pub struct ReportMetrics;

impl ReportMetrics {
    pub fn record_query(query: &'static str, rows: usize, duration_secs: f64) {
        ::metrics::counter!(phase_metric!(counter, "reports", "queries"), "query" => query)
            .increment(1);
        ::metrics::histogram!(phase_metric!(histogram, "reports", "query_duration_seconds"), "query" => query)
            .record(duration_secs);
        ::metrics::histogram!(phase_metric!(histogram, "reports", "rows_returned"), "query" => query)
            .record(rows as f64);
    }

    pub fn record_query_error(query: &'static str) {
        ::metrics::counter!(phase_metric!(counter, "reports", "query_errors"), "query" => query)
            .increment(1);
    }
}
