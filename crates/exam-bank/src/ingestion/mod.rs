//! Document ingestion: text extraction and chunking

mod chunker;
mod extractor;
mod pdf;
mod slides;

pub use chunker::TextChunker;
pub use extractor::{ExtractionAdapter, TextExtractor};
pub use pdf::PdfExtractor;
pub use slides::SlideDeckExtractor;
