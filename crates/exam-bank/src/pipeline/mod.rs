//! Batch ingestion of an input directory into the problem bank

mod orchestrator;
pub mod subject;

pub use orchestrator::{discover, FileOutcome, FileReport, IngestPipeline, IngestSummary};
pub use subject::SubjectInferrer;
