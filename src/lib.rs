pub mod cleaning;
pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod reports;
pub mod store;

pub use error::{Result, SalesError};
