//! Recursive character splitter for company-directory documents.
//!
//! Text is cut on the first separator it contains, headings first. Pieces
//! still longer than the chunk size are cut again with the remaining
//! separators. Short neighbouring pieces are merged back up to the chunk
//! size, with a trailing overlap carried into the next chunk. Lengths are
//! counted in chars.

use std::collections::VecDeque;

/// Chunk size used for the company directory.
pub const DIRECTORY_CHUNK_SIZE: usize = 1000;
/// Overlap used for the company directory.
pub const DIRECTORY_CHUNK_OVERLAP: usize = 200;

/// Coarsest first. The empty separator splits into single chars.
const DIRECTORY_SEPARATORS: &[&str] = &[
    "\n## ",
    "\n### ",
    "\n\n",
    "\n",
    " ",
    ".",
    ",",
    "\u{200b}",
    "\u{ff0c}",
    "\u{3001}",
    "\u{ff0e}",
    "\u{3002}",
    "",
];

#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    /// Splitter with the directory separators. The overlap is capped at
    /// the chunk size.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size),
            separators: DIRECTORY_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn directory() -> Self {
        Self::new(DIRECTORY_CHUNK_SIZE, DIRECTORY_CHUNK_OVERLAP)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Trimmed, non-empty chunks in document order.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let separators: Vec<&str> = self.separators.iter().map(String::as_str).collect();
        self.split_with(text, &separators)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = separators.last().copied().unwrap_or("");
        let mut finer: &[&str] = &[];
        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = *candidate;
                break;
            }
            if text.contains(candidate) {
                separator = *candidate;
                finer = &separators[i + 1..];
                break;
            }
        }

        let mut chunks = Vec::new();
        let mut short: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                short.push(piece);
                continue;
            }
            if !short.is_empty() {
                chunks.extend(self.merge(&short));
                short.clear();
            }
            if finer.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_with(piece, finer));
            }
        }
        if !short.is_empty() {
            chunks.extend(self.merge(&short));
        }
        chunks
    }

    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !current.is_empty() {
                push_joined(&mut chunks, &current);
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    match current.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }
            current.push_back(piece);
            total += len;
        }
        push_joined(&mut chunks, &current);
        chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_joined(chunks: &mut Vec<String>, pieces: &VecDeque<&str>) {
    let joined: String = pieces.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Pieces of `text` with each separator kept at the start of the piece
/// that follows it. Empty pieces are dropped.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    for (at, _) in text.match_indices(separator) {
        pieces.push(&text[start..at]);
        start = at;
    }
    pieces.push(&text[start..]);
    pieces.retain(|p| !p.is_empty());
    pieces
}
