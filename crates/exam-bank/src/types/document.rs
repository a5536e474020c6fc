//! Source document and chunk types

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Supported input file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Old Microsoft PowerPoint (.ppt) - requires LibreOffice
    Ppt,
    /// Microsoft PowerPoint presentation (.pptx)
    Pptx,
    /// Anything else
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "ppt" => Self::Ppt,
            "pptx" => Self::Pptx,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a path's extension
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Check if this is a supported file type
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Ppt => "PowerPoint (.ppt)",
            Self::Pptx => "PowerPoint (.pptx)",
            Self::Unknown => "Unknown",
        }
    }
}

/// A discovered input file with its inferred subject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Full path to the file
    pub path: PathBuf,
    /// File name as shown in logs and stored as provenance
    pub filename: String,
    /// Detected file type
    pub file_type: FileType,
    /// Subject label inferred from the file name
    pub subject: String,
}

impl SourceDocument {
    /// Create a document record for a path
    pub fn new(path: PathBuf, subject: impl Into<String>) -> Self {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_type = FileType::from_path(&path);

        Self {
            path,
            filename,
            file_type,
            subject: subject.into(),
        }
    }
}

/// A bounded slice of one document's extracted text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Chunk text
    pub content: String,
    /// Subject of the originating document
    pub subject: String,
    /// File name of the originating document
    pub source: String,
    /// Position within the document (0-based)
    pub index: usize,
}
