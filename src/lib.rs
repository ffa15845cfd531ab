pub mod archive;
pub mod config;
pub mod deduplication;
pub mod errors;
pub mod features;
pub mod ingest;
pub mod model;
pub mod notify;
pub mod pipeline;
pub mod ranker;
pub mod report;
pub mod store;
pub mod tracker;
pub mod types;

pub use config::PipelineConfig;
pub use errors::PipelineError;
pub use pipeline::{Pipeline, RunSummary};
