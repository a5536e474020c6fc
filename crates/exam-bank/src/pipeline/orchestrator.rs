//! Ingestion run: discover → extract → chunk → parse → store, one file at a time

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use walkdir::WalkDir;

use crate::config::BankConfig;
use crate::error::Result;
use crate::generation::QuestionParser;
use crate::ingestion::{ExtractionAdapter, TextChunker};
use crate::providers::LlmProvider;
use crate::storage::ProblemStore;
use crate::types::{FileType, SourceDocument};

use super::subject::SubjectInferrer;

/// Supported files directly inside `dir`, sorted by file name.
///
/// Subdirectories are not descended into.
pub fn discover(dir: &Path, subjects: &SubjectInferrer) -> Result<Vec<SourceDocument>> {
    std::fs::metadata(dir)?;

    let mut documents = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };

        let path = entry.path();
        if !path.is_file() || !FileType::from_path(path).is_supported() {
            continue;
        }

        documents.push(SourceDocument::new(path.to_path_buf(), subjects.infer(path)));
    }

    Ok(documents)
}

/// How a single file ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileOutcome {
    /// Chunks were parsed and the file's transaction committed
    Ingested,
    /// Extraction produced no text
    NoText,
    /// A contained failure; the run went on
    Failed(String),
}

/// Per-file counts
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub filename: String,
    pub subject: String,
    pub chunks: usize,
    /// Responses that decoded into a question
    pub parsed: usize,
    /// Questions admitted to the store
    pub inserted: usize,
    pub outcome: FileOutcome,
}

impl FileReport {
    fn new(doc: &SourceDocument) -> Self {
        Self {
            filename: doc.filename.clone(),
            subject: doc.subject.clone(),
            chunks: 0,
            parsed: 0,
            inserted: 0,
            outcome: FileOutcome::Ingested,
        }
    }
}

/// Result of one ingestion run
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestSummary {
    pub files: Vec<FileReport>,
    pub elapsed_ms: u64,
}

impl IngestSummary {
    /// Sum of per-file insert counts
    pub fn total_inserted(&self) -> usize {
        self.files.iter().map(|f| f.inserted).sum()
    }

    /// Total chunks sent to the parser
    pub fn total_chunks(&self) -> usize {
        self.files.iter().map(|f| f.chunks).sum()
    }

    /// Files that ended in a contained failure
    pub fn failed_files(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Failed(_)))
            .count()
    }
}

/// Drives the whole ingestion flow against one store
pub struct IngestPipeline {
    extractor: ExtractionAdapter,
    chunker: TextChunker,
    parser: QuestionParser,
    store: ProblemStore,
    subjects: SubjectInferrer,
}

impl IngestPipeline {
    /// Build a pipeline from configuration and an explicit generation service
    pub fn new(config: &BankConfig, llm: Arc<dyn LlmProvider>) -> Result<Self> {
        Ok(Self::with_components(
            ExtractionAdapter::new(&config.extraction),
            TextChunker::new(config.chunking.max_chars),
            QuestionParser::new(llm, config.parser.clone()),
            ProblemStore::open(&config.storage.database_path)?,
            SubjectInferrer::new(&config.subjects)?,
        ))
    }

    /// Assemble a pipeline from prebuilt parts
    pub fn with_components(
        extractor: ExtractionAdapter,
        chunker: TextChunker,
        parser: QuestionParser,
        store: ProblemStore,
        subjects: SubjectInferrer,
    ) -> Self {
        Self {
            extractor,
            chunker,
            parser,
            store,
            subjects,
        }
    }

    /// The store this pipeline writes to
    pub fn store(&self) -> &ProblemStore {
        &self.store
    }

    /// Ingest every supported file directly inside `dir`.
    ///
    /// Failures inside a file are logged and the run moves on; a store that
    /// cannot be written halts the run with the storage error.
    pub async fn run(&self, dir: &Path) -> Result<IngestSummary> {
        let start = Instant::now();
        let documents = discover(dir, &self.subjects)?;
        tracing::info!("Found {} documents in {}", documents.len(), dir.display());

        let mut summary = IngestSummary::default();
        let mut total_inserted = 0usize;

        for doc in &documents {
            let report = match self.process_file(doc).await {
                Ok(report) => report,
                Err(e) if e.is_fatal() => {
                    tracing::error!("[{}] Storage failure, aborting run: {}", doc.filename, e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!("[{}] Failed: {}", doc.filename, e);
                    FileReport {
                        outcome: FileOutcome::Failed(e.to_string()),
                        ..FileReport::new(doc)
                    }
                }
            };

            total_inserted += report.inserted;
            tracing::info!(
                "[{}] {} questions stored (running total {})",
                doc.filename,
                report.inserted,
                total_inserted
            );
            summary.files.push(report);
        }

        summary.elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Ingestion complete: {} questions from {} files in {}ms",
            summary.total_inserted(),
            summary.files.len(),
            summary.elapsed_ms
        );

        Ok(summary)
    }

    async fn process_file(&self, doc: &SourceDocument) -> Result<FileReport> {
        let mut report = FileReport::new(doc);
        tracing::info!(
            "[{}] Processing {} (subject: {})",
            doc.filename,
            doc.file_type.display_name(),
            doc.subject
        );

        let text = self.extractor.extract_blocking(&doc.path).await;
        let chunks = self.chunker.chunk_document(doc, &text);
        report.chunks = chunks.len();

        if chunks.is_empty() {
            tracing::warn!("[{}] No text extracted, skipping", doc.filename);
            report.outcome = FileOutcome::NoText;
            return Ok(report);
        }

        tracing::info!("[{}] Split into {} chunks", doc.filename, chunks.len());

        let mut writer = self.store.begin_file()?;
        for chunk in &chunks {
            let Some(question) = self.parser.parse_chunk(chunk).await else {
                continue;
            };
            report.parsed += 1;

            if !writer.insert(&question)? {
                tracing::debug!(
                    "[{}] Chunk #{} missing question or answer, not stored",
                    doc.filename,
                    chunk.index + 1
                );
            }
        }
        report.inserted = writer.commit()?;

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ParserConfig, SubjectConfig};
    use crate::error::Error;
    use crate::generation::parser::tests::ScriptedLlm;
    use crate::ingestion::TextExtractor;
    use rusqlite::Connection;
    use std::collections::HashMap;
    use tempfile::TempDir;

    const VALID: &str = "Q|||a|||b|||c|||d|||1|||e";

    /// Returns canned text per file name; unknown files fail
    struct CannedExtractor(HashMap<String, String>);

    impl TextExtractor for CannedExtractor {
        fn extract(&self, path: &Path) -> Result<String> {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.0
                .get(&name)
                .cloned()
                .ok_or_else(|| Error::file_parse(name, "unreadable"))
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    struct Fixture {
        input: TempDir,
        db: TempDir,
    }

    impl Fixture {
        fn new(files: &[&str]) -> Self {
            let input = TempDir::new().unwrap();
            for name in files {
                std::fs::write(input.path().join(name), b"").unwrap();
            }
            Self {
                input,
                db: TempDir::new().unwrap(),
            }
        }

        fn pipeline(&self, texts: &[(&str, String)], llm: Arc<ScriptedLlm>) -> IngestPipeline {
            let extractor = Arc::new(CannedExtractor(
                texts.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            ));
            IngestPipeline::with_components(
                ExtractionAdapter::with_extractors(extractor.clone(), extractor),
                TextChunker::new(4000),
                QuestionParser::new(llm, ParserConfig::default()),
                ProblemStore::open(self.db.path().join("bank.db")).unwrap(),
                SubjectInferrer::new(&SubjectConfig::default()).unwrap(),
            )
        }
    }

    #[test]
    fn test_discover_filters_and_sorts() {
        let fixture = Fixture::new(&["b_강의.pptx", "a.pdf", "notes.txt", "c.PPT"]);
        std::fs::create_dir(fixture.input.path().join("nested.pdf")).unwrap();

        let subjects = SubjectInferrer::new(&SubjectConfig::default()).unwrap();
        let docs = discover(fixture.input.path(), &subjects).unwrap();
        let names: Vec<&str> = docs.iter().map(|d| d.filename.as_str()).collect();

        assert_eq!(names, vec!["a.pdf", "b_강의.pptx", "c.PPT"]);
        assert_eq!(docs[1].subject, "b");
        assert_eq!(docs[2].file_type, FileType::Ppt);
    }

    #[test]
    fn test_discover_missing_dir() {
        let subjects = SubjectInferrer::new(&SubjectConfig::default()).unwrap();
        let err = discover(Path::new("/nonexistent/exam-bank-input"), &subjects).unwrap_err();
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_long_document_three_chunks() {
        let fixture = Fixture::new(&["2026_정보처리기사_필기.pdf"]);
        let llm = Arc::new(ScriptedLlm::new(vec![Some(VALID), Some("2번\n"), Some(VALID)]));
        let pipeline = fixture.pipeline(
            &[("2026_정보처리기사_필기.pdf", "가".repeat(9000))],
            llm.clone(),
        );

        let summary = pipeline.run(fixture.input.path()).await.unwrap();

        assert_eq!(llm.calls(), 3);
        assert_eq!(summary.files.len(), 1);
        let report = &summary.files[0];
        assert_eq!(report.subject, "정보처리기사");
        assert_eq!(report.chunks, 3);
        assert_eq!(report.parsed, 2);
        assert_eq!(report.inserted, 2);
        assert_eq!(summary.total_inserted(), 2);
        assert_eq!(summary.total_chunks(), 3);

        let stored = pipeline.store().list_problems(10).unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|p| p.subject == "정보처리기사"));
        assert!(stored.iter().all(|p| p.source == "2026_정보처리기사_필기.pdf"));
    }

    #[tokio::test]
    async fn test_empty_and_failed_extraction_skip_parser() {
        let fixture = Fixture::new(&["a.pdf", "b.pptx", "c.pdf"]);
        let llm = Arc::new(ScriptedLlm::new(vec![Some(VALID)]));
        // b.pptx is absent from the map, so extraction fails
        let pipeline = fixture.pipeline(
            &[("a.pdf", "  \n\n ".to_string()), ("c.pdf", "본문".to_string())],
            llm.clone(),
        );

        let summary = pipeline.run(fixture.input.path()).await.unwrap();

        assert_eq!(llm.calls(), 1);
        assert_eq!(summary.files[0].outcome, FileOutcome::NoText);
        assert_eq!(summary.files[1].outcome, FileOutcome::NoText);
        assert_eq!(summary.files[2].outcome, FileOutcome::Ingested);
        assert_eq!(summary.files[2].inserted, 1);
        assert_eq!(summary.failed_files(), 0);
        assert_eq!(pipeline.store().count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_and_failed_chunks_are_not_stored() {
        let fixture = Fixture::new(&["a.pdf"]);
        let text = format!("{}\n\n{}\n\n{}", "가".repeat(3000), "나".repeat(3000), "다".repeat(3000));
        let llm = Arc::new(ScriptedLlm::new(vec![None, Some("질문|||보기"), Some(VALID)]));
        let pipeline = fixture.pipeline(&[("a.pdf", text)], llm.clone());

        let summary = pipeline.run(fixture.input.path()).await.unwrap();

        assert_eq!(llm.calls(), 3);
        assert_eq!(summary.files[0].chunks, 3);
        assert_eq!(summary.files[0].parsed, 2);
        assert_eq!(summary.files[0].inserted, 1);
        assert_eq!(pipeline.store().count_by_source("a.pdf").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_repeat_runs_are_deterministic() {
        let responses = vec![Some(VALID), Some("Q2|||x|||y|||z|||w|||2|||")];
        let texts = [("a.pdf", "첫 문서".to_string()), ("b.ppt", "둘째 문서".to_string())];

        let mut stored = Vec::new();
        for _ in 0..2 {
            let fixture = Fixture::new(&["a.pdf", "b.ppt"]);
            let llm = Arc::new(ScriptedLlm::new(responses.clone()));
            let pipeline = fixture.pipeline(&texts, llm);
            pipeline.run(fixture.input.path()).await.unwrap();
            stored.push(pipeline.store().list_problems(10).unwrap());
        }

        assert_eq!(stored[0].len(), 2);
        assert_eq!(stored[0], stored[1]);
    }

    #[tokio::test]
    async fn test_storage_failure_halts_run() {
        let fixture = Fixture::new(&["a.pdf", "b.pdf"]);
        let llm = Arc::new(ScriptedLlm::new(vec![Some(VALID), Some(VALID)]));
        let pipeline = fixture.pipeline(
            &[("a.pdf", "본문".to_string()), ("b.pdf", "본문".to_string())],
            llm.clone(),
        );
        Connection::open(pipeline.store().path())
            .unwrap()
            .execute_batch("DROP TABLE problems")
            .unwrap();

        let err = pipeline.run(fixture.input.path()).await.unwrap_err();

        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(llm.calls(), 1);
    }
}
