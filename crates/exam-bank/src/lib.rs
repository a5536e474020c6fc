//! exam-bank: builds a multiple-choice question bank from exam-prep documents
//!
//! PDFs and slide decks are extracted to plain text, split into LLM-sized chunks,
//! turned into structured questions by a text-generation service, and stored in
//! SQLite for the wrong-answer notebook.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod storage;
pub mod types;

pub use config::BankConfig;
pub use error::{Error, Result};
pub use pipeline::{IngestPipeline, IngestSummary};
pub use types::{
    document::{FileType, SourceDocument, TextChunk},
    question::{ParsedQuestion, StoredProblem},
};
