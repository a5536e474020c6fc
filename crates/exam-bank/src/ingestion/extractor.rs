//! Extraction adapter dispatching to per-format capabilities

use std::path::Path;
use std::sync::Arc;

use crate::config::ExtractionConfig;
use crate::error::Result;
use crate::types::FileType;

use super::pdf::PdfExtractor;
use super::slides::SlideDeckExtractor;

/// A format-specific text extraction capability
pub trait TextExtractor: Send + Sync {
    /// Extract plain text from the file at `path`
    fn extract(&self, path: &Path) -> Result<String>;

    /// Name for logging
    fn name(&self) -> &str;
}

/// One call for every supported format; never fails
#[derive(Clone)]
pub struct ExtractionAdapter {
    pdf: Arc<dyn TextExtractor>,
    slides: Arc<dyn TextExtractor>,
}

impl ExtractionAdapter {
    /// Create an adapter backed by the bundled extractors
    pub fn new(config: &ExtractionConfig) -> Self {
        Self::with_extractors(
            Arc::new(PdfExtractor::new(config)),
            Arc::new(SlideDeckExtractor::new(config)),
        )
    }

    /// Create an adapter from explicit capabilities
    pub fn with_extractors(pdf: Arc<dyn TextExtractor>, slides: Arc<dyn TextExtractor>) -> Self {
        Self { pdf, slides }
    }

    /// Extract text from `path`, or an empty string on any failure
    pub fn extract(&self, path: &Path) -> String {
        let extractor = match FileType::from_path(path) {
            FileType::Pdf => &self.pdf,
            FileType::Ppt | FileType::Pptx => &self.slides,
            FileType::Unknown => {
                tracing::debug!("No extractor for {}", path.display());
                return String::new();
            }
        };

        match extractor.extract(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(
                    "{} extraction failed for {}: {}",
                    extractor.name(),
                    path.display(),
                    e
                );
                String::new()
            }
        }
    }

    /// Run [`Self::extract`] on the blocking pool
    pub async fn extract_blocking(&self, path: &Path) -> String {
        let adapter = self.clone();
        let owned = path.to_path_buf();

        match tokio::task::spawn_blocking(move || adapter.extract(&owned)).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Extraction task for {} aborted: {}", path.display(), e);
                String::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::path::PathBuf;

    struct Fixed(&'static str);

    impl TextExtractor for Fixed {
        fn extract(&self, _path: &Path) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct Broken;

    impl TextExtractor for Broken {
        fn extract(&self, path: &Path) -> Result<String> {
            Err(Error::file_parse(path.display().to_string(), "corrupt stream"))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    #[test]
    fn test_dispatch_by_extension() {
        let adapter = ExtractionAdapter::with_extractors(Arc::new(Fixed("pdf text")), Arc::new(Fixed("slide text")));

        assert_eq!(adapter.extract(&PathBuf::from("a.pdf")), "pdf text");
        assert_eq!(adapter.extract(&PathBuf::from("a.PPTX")), "slide text");
        assert_eq!(adapter.extract(&PathBuf::from("a.ppt")), "slide text");
        assert_eq!(adapter.extract(&PathBuf::from("a.docx")), "");
    }

    #[test]
    fn test_failure_becomes_empty_text() {
        let adapter = ExtractionAdapter::with_extractors(Arc::new(Broken), Arc::new(Broken));
        assert_eq!(adapter.extract(&PathBuf::from("broken.pdf")), "");
        assert_eq!(adapter.extract(&PathBuf::from("broken.pptx")), "");
    }

    #[test]
    fn test_real_extractors_survive_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("garbage.pdf");
        let pptx = dir.path().join("garbage.pptx");
        std::fs::write(&pdf, b"definitely not a pdf").unwrap();
        std::fs::write(&pptx, b"definitely not a zip").unwrap();

        let adapter = ExtractionAdapter::new(&ExtractionConfig::default());
        assert_eq!(adapter.extract(&pdf), "");
        assert_eq!(adapter.extract(&pptx), "");
        assert_eq!(adapter.extract(&dir.path().join("missing.pdf")), "");
    }

    #[tokio::test]
    async fn test_extract_blocking() {
        let adapter = ExtractionAdapter::with_extractors(Arc::new(Fixed("p")), Arc::new(Fixed("s")));
        assert_eq!(adapter.extract_blocking(&PathBuf::from("x.pdf")).await, "p");
    }
}
