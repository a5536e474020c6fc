//! PDF text extraction (pdf-extract with a lopdf fallback)

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};

use super::extractor::TextExtractor;

/// Ligatures and typographic characters pdf-extract commonly leaves behind
const GLYPH_REPLACEMENTS: &[(char, &str)] = &[
    ('\0', ""),
    ('\u{00A0}', " "),
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{2010}', "-"),
    ('\u{2011}', "-"),
    ('\u{2022}', "* "),
];

/// pdf-extract threads still running; past this many, go straight to lopdf
const MAX_STALLED_WORKERS: usize = 4;

/// PDF extraction capability
pub struct PdfExtractor {
    timeout: Duration,
    /// pdf-extract threads that have not finished yet, including timed-out ones
    in_flight: Arc<AtomicUsize>,
}

/// Decrements the in-flight count when a worker thread ends, even by panic
struct WorkerSlot(Arc<AtomicUsize>);

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl PdfExtractor {
    /// Create a new PDF extractor
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.pdf_timeout_secs.max(1)),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Extract text from in-memory PDF bytes
    pub fn extract_from_mem(&self, filename: &str, data: &[u8]) -> Result<String> {
        let raw = self.extract_with_timeout(filename, data)?;
        let text = normalize_pdf_text(&raw);

        if text.is_empty() {
            return Err(Error::file_parse(filename, "No text layer (image-only PDF?)"));
        }

        Ok(text)
    }

    /// Run pdf-extract on a helper thread so a pathological font cannot hang the run.
    ///
    /// A thread that times out cannot be stopped and keeps its copy of the file
    /// until pdf-extract returns. Once `MAX_STALLED_WORKERS` are still running,
    /// new files skip pdf-extract and use the lopdf page walk directly.
    fn extract_with_timeout(&self, filename: &str, data: &[u8]) -> Result<String> {
        let running = self.in_flight.load(Ordering::SeqCst);
        if running >= MAX_STALLED_WORKERS {
            tracing::warn!(
                "{} pdf-extract workers still running, using page walk for {}",
                running,
                filename
            );
            return extract_pages_fallback(filename, data);
        }

        let data_vec = data.to_vec();
        let (tx, rx) = mpsc::channel();

        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let slot = WorkerSlot(Arc::clone(&self.in_flight));
        let handle = thread::spawn(move || {
            let _slot = slot;
            let result = pdf_extract::extract_text_from_mem(&data_vec);
            let _ = tx.send(result.map_err(|e| e.to_string()));
        });

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(text)) if !text.trim().is_empty() => {
                let _ = handle.join();
                Ok(text)
            }
            Ok(Ok(_)) => {
                let _ = handle.join();
                tracing::debug!("pdf-extract found no text in {}, trying page walk", filename);
                extract_pages_fallback(filename, data)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                tracing::warn!("pdf-extract failed for {}: {}, trying fallback", filename, e);
                extract_pages_fallback(filename, data)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::error!(
                    "PDF extraction timeout after {:?} for {}",
                    self.timeout,
                    filename
                );
                extract_pages_fallback(filename, data)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                let _ = handle.join();
                tracing::error!("PDF extraction thread crashed on {}", filename);
                extract_pages_fallback(filename, data)
            }
        }
    }
}

impl TextExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        let filename = path.display().to_string();
        let data = std::fs::read(path)?;
        self.extract_from_mem(&filename, &data)
    }

    fn name(&self) -> &str {
        "pdf"
    }
}

/// Page-by-page extraction with lopdf, in page order
fn extract_pages_fallback(filename: &str, data: &[u8]) -> Result<String> {
    let doc = lopdf::Document::load_mem(data)
        .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;

    let mut all_text = String::new();

    for page_number in doc.get_pages().keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(text) if !text.trim().is_empty() => {
                all_text.push_str(&text);
                all_text.push_str("\n\n");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("No text on page {} of {}: {}", page_number, filename, e);
            }
        }
    }

    Ok(all_text)
}

/// Clean glyph artefacts, trim lines, and keep at most one blank line between paragraphs
pub(crate) fn normalize_pdf_text(raw: &str) -> String {
    let mut cleaned = raw.to_string();
    for (glyph, replacement) in GLYPH_REPLACEMENTS {
        cleaned = cleaned.replace(*glyph, replacement);
    }

    let mut out = String::with_capacity(cleaned.len());
    let mut pending_break = false;

    for line in cleaned.lines().map(str::trim) {
        if line.is_empty() {
            pending_break = !out.is_empty();
            continue;
        }
        if !out.is_empty() {
            out.push_str(if pending_break { "\n\n" } else { "\n" });
        }
        out.push_str(line);
        pending_break = false;
    }

    out
}
