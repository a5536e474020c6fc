//! Paragraph-aware text chunking bounded by a character budget

use crate::types::{SourceDocument, TextChunk};

const PARAGRAPH_BREAK: [char; 2] = ['\n', '\n'];

/// Greedy splitter that prefers paragraph breaks inside each window
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk length in characters
    max_chars: usize,
}

impl TextChunker {
    /// Create a new chunker
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.max(1),
        }
    }

    /// Maximum chunk length in characters
    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Split `text` into trimmed, non-empty pieces of at most `max_chars` characters.
    ///
    /// Each window of `max_chars` is cut at its last blank-line paragraph break
    /// when that break lies in the second half of the window, otherwise at the
    /// window edge. Single pass, no backtracking.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= self.max_chars {
            return vec![text.to_string()];
        }

        let mut pieces = Vec::new();
        let mut start = 0usize;

        while start < chars.len() {
            if chars.len() - start <= self.max_chars {
                pieces.push(&chars[start..]);
                break;
            }

            let end = start + self.max_chars;
            let window = &chars[start..end];
            let midpoint = self.max_chars / 2;

            let cut = match last_paragraph_break(window) {
                Some(pos) if pos >= midpoint && pos > 0 => start + pos,
                _ => end,
            };

            pieces.push(&chars[start..cut]);
            start = cut;
        }

        pieces
            .into_iter()
            .map(|piece| piece.iter().collect::<String>().trim().to_string())
            .filter(|piece| !piece.is_empty())
            .collect()
    }

    /// Chunk a document's extracted text, tagging each piece with its provenance
    pub fn chunk_document(&self, doc: &SourceDocument, text: &str) -> Vec<TextChunk> {
        self.chunk(text)
            .into_iter()
            .enumerate()
            .map(|(index, content)| TextChunk {
                content,
                subject: doc.subject.clone(),
                source: doc.filename.clone(),
                index,
            })
            .collect()
    }
}

/// Start index of the last `\n\n` in `window`
fn last_paragraph_break(window: &[char]) -> Option<usize> {
    window
        .windows(PARAGRAPH_BREAK.len())
        .rposition(|pair| pair == PARAGRAPH_BREAK)
}
