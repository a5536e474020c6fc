//! Slide deck text extraction (.pptx directly, .ppt through LibreOffice)

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::Read;
use std::path::Path;
use std::process::Command;

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use crate::types::FileType;

use super::extractor::TextExtractor;

const SLIDE_PREFIX: &str = "ppt/slides/slide";

/// PowerPoint extraction capability
pub struct SlideDeckExtractor {
    libreoffice_bin: String,
}

impl SlideDeckExtractor {
    /// Create a new slide deck extractor
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            libreoffice_bin: config.libreoffice_bin.clone(),
        }
    }

    /// Extract text from in-memory .pptx bytes, slides in order
    pub fn extract_pptx(&self, filename: &str, data: &[u8]) -> Result<String> {
        let cursor = std::io::Cursor::new(data);
        let mut archive = zip::ZipArchive::new(cursor)
            .map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut slide_names: Vec<(u32, String)> = archive
            .file_names()
            .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
            .collect();
        slide_names.sort();

        let mut slides = Vec::with_capacity(slide_names.len());

        for (number, slide_name) in slide_names {
            let mut xml = String::new();
            let read = archive
                .by_name(&slide_name)
                .map_err(|e| e.to_string())
                .and_then(|mut file| file.read_to_string(&mut xml).map_err(|e| e.to_string()));

            if let Err(e) = read {
                tracing::debug!("Skipping slide {} of {}: {}", number, filename, e);
                continue;
            }

            let text = extract_text_from_slide_xml(&xml);
            if !text.is_empty() {
                slides.push(text);
            }
        }

        Ok(slides.join("\n\n"))
    }

    /// Convert a legacy .ppt to .pptx with LibreOffice and return the new bytes
    fn convert_ppt(&self, path: &Path) -> Result<Vec<u8>> {
        let filename = path.display().to_string();
        let temp_dir = tempfile::tempdir()?;

        let output = Command::new(&self.libreoffice_bin)
            .arg("--headless")
            .arg("--convert-to")
            .arg("pptx")
            .arg("--outdir")
            .arg(temp_dir.path())
            .arg(path)
            .output()
            .map_err(|e| Error::file_parse(&filename, format!("LibreOffice not runnable: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::file_parse(&filename, format!("LibreOffice error: {}", stderr.trim())));
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let converted = temp_dir.path().join(format!("{}.pptx", stem));

        std::fs::read(&converted).map_err(|e| {
            Error::file_parse(&filename, format!("Converted deck not found: {}", e))
        })
    }
}

impl TextExtractor for SlideDeckExtractor {
    fn extract(&self, path: &Path) -> Result<String> {
        let filename = path.display().to_string();

        let data = match FileType::from_path(path) {
            FileType::Pptx => std::fs::read(path)?,
            FileType::Ppt => self.convert_ppt(path)?,
            other => {
                return Err(Error::UnsupportedFileType(format!(
                    "{} is {}",
                    filename,
                    other.display_name()
                )))
            }
        };

        self.extract_pptx(&filename, &data)
    }

    fn name(&self) -> &str {
        "slides"
    }
}

/// `ppt/slides/slide12.xml` -> 12
fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix(SLIDE_PREFIX)?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// Concatenate `<a:t>` runs; each `<a:p>` ends a line
fn extract_text_from_slide_xml(xml: &str) -> String {
    let mut reader = Reader::from_str(xml);

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut in_text_element = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => {
                in_text_element = true;
            }
            Ok(Event::Text(e)) if in_text_element => {
                // runs split words at formatting changes; spacing lives inside the runs
                if let Ok(text) = e.unescape() {
                    current_line.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_element = false,
                b"p" => {
                    let line = current_line.trim();
                    if !line.is_empty() {
                        lines.push(line.to_string());
                    }
                    current_line.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!("Malformed slide XML: {}", e);
                break;
            }
            _ => {}
        }
    }

    let tail = current_line.trim();
    if !tail.is_empty() {
        lines.push(tail.to_string());
    }

    lines.join("\n")
}
