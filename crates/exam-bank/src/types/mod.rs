//! Core types for the question bank

pub mod document;
pub mod question;

pub use document::{FileType, SourceDocument, TextChunk};
pub use question::{ParsedQuestion, StoredProblem, FIELD_DELIMITER};
