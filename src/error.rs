use thiserror::Error;

#[derive(Error, Debug)]
pub enum SalesError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown report query: {0}")]
    UnknownQuery(String),

    #[error("Query '{query}' returned columns {actual:?}, expected {expected:?}")]
    ColumnContract {
        query: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Store not found: {0}")]
    StoreMissing(String),

    #[error("Store already holds {existing} records from a different source (fingerprint {fingerprint})")]
    StoreNotEmpty { existing: u64, fingerprint: String },
}

pub type Result<T> = std::result::Result<T, SalesError>;
