use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::cleaning::{CleanStats, CleanedBatch, Cleaner, DefaultCleaner, Rejection};
use crate::config::Config;
use crate::error::Result;
use crate::ingest;
use crate::reports::{self, ResultSet};
use crate::store::{LoadOutcome, SalesStore};

/// Result of a complete pipeline run
#[derive(Debug, Serialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub source: String,
    pub source_sha256: String,
    pub stats: CleanStats,
    pub rejections: Vec<Rejection>,
    pub records_loaded: u64,
    pub reports: Vec<ResultSet>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct Pipeline;

impl Pipeline {
    /// Read and clean a source file
    #[instrument(skip(config))]
    pub fn clean_file(config: &Config, input: &Path) -> Result<CleanedBatch> {
        let raw = ingest::read_raw_file(input, config.input.delimiter_byte()?)?;
        let cleaner = DefaultCleaner::with_config(config.cleaning.clone());
        let cleaned = cleaner.clean(raw);
        for rejection in cleaned.rejections.iter().take(20) {
            warn!("Dropped line {}: {}", rejection.line, rejection.reason);
        }
        if cleaned.rejections.len() > 20 {
            warn!("... and {} more dropped rows", cleaned.rejections.len() - 20);
        }
        Ok(cleaned)
    }

    /// Clean a source file and load it into `store`
    #[instrument(skip(config, store))]
    pub fn load_file(config: &Config, input: &Path, store: &mut SalesStore) -> Result<(CleanedBatch, String, LoadOutcome)> {
        let sha256 = ingest::fingerprint_file(input)?;
        let cleaned = Self::clean_file(config, input)?;
        let outcome = store.load(&cleaned.records, &input.display().to_string(), &sha256)?;
        Ok((cleaned, sha256, outcome))
    }

    /// Clean, load into a fresh in-memory store, and run every report
    #[instrument(skip(config))]
    pub fn run(config: &Config, input: &Path) -> Result<PipelineResult> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        info!("🚀 Starting pipeline run {} for {}", run_id, input.display());

        let mut store = SalesStore::open_in_memory()?;
        let (cleaned, source_sha256, _) = Self::load_file(config, input, &mut store)?;
        let records_loaded = store.record_count()?;

        info!("📊 Running {} reports", reports::catalog().len());
        let results = reports::run_all(&store, &config.reports.params())?;

        let finished_at = Utc::now();
        info!(
            "✅ Pipeline finished: {} records loaded, {} reports",
            records_loaded,
            results.len()
        );

        Ok(PipelineResult {
            run_id,
            source: input.display().to_string(),
            source_sha256,
            stats: cleaned.stats,
            rejections: cleaned.rejections,
            records_loaded,
            reports: results,
            started_at,
            finished_at,
        })
    }

    /// Persist a pipeline result to a timestamped JSON file
    pub fn persist_to_json(result: &PipelineResult, output_dir: &str) -> Result<String> {
        fs::create_dir_all(output_dir)?;

        let timestamp = result.finished_at.format("%Y%m%d_%H%M%S");
        let filename = format!("report_{timestamp}.json");
        let filepath = Path::new(output_dir).join(&filename);

        let json_content = serde_json::to_string_pretty(result)?;
        fs::write(&filepath, json_content)?;

        Ok(filepath.to_string_lossy().to_string())
    }
}
