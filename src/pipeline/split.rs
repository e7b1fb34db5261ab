//! Character-budget text splitting.
//!
//! Text is cut at blank lines (`"\n\n"`) and the pieces are greedily merged
//! back together until the next one would push the chunk over
//! `chunk_size` characters. When a chunk is emitted, its leading pieces are
//! dropped until what is carried into the next chunk fits in
//! `chunk_overlap` characters, so neighbouring chunks share a short tail.
//!
//! A single piece longer than `chunk_size` is cut into fixed windows that
//! advance by `chunk_size - chunk_overlap` characters. Every emitted chunk
//! therefore respects the size bound.
//!
//! Lengths are counted in `char`s, not bytes.

use std::collections::VecDeque;
use tracing::{debug, warn};

/// Separator used both to cut and to re-join pieces.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Splits text into overlapping chunks of bounded length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextSplitter {
    /// Create a splitter. `chunk_overlap` is clamped below `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split one logical document. Returns no chunks for blank input.
    pub fn split(&self, text: &str) -> Vec<String> {
        let pieces: Vec<&str> = text
            .split(PARAGRAPH_SEPARATOR)
            .filter(|p| !p.is_empty())
            .flat_map(|p| self.windows(p))
            .collect();

        let chunks = self.merge(&pieces);
        debug!(
            "Split {} chars into {} chunks ({} pieces)",
            char_len(text),
            chunks.len(),
            pieces.len()
        );
        chunks
    }

    /// Split several documents, keeping document order.
    pub fn split_all<'a, I>(&self, documents: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        documents.into_iter().flat_map(|d| self.split(d)).collect()
    }

    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let sep_len = char_len(PARAGRAPH_SEPARATOR);
        let mut chunks = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            let joined_len = |current: &VecDeque<&str>, total: usize| {
                total + len + if current.is_empty() { 0 } else { sep_len }
            };

            if joined_len(&current, total) > self.chunk_size && !current.is_empty() {
                push_joined(&mut chunks, &current);

                while total > self.chunk_overlap
                    || (joined_len(&current, total) > self.chunk_size && total > 0)
                {
                    let extra = if current.len() > 1 { sep_len } else { 0 };
                    match current.pop_front() {
                        Some(first) => total = total.saturating_sub(char_len(first) + extra),
                        None => {
                            total = 0;
                            break;
                        }
                    }
                }
            }

            current.push_back(piece);
            total += len + if current.len() > 1 { sep_len } else { 0 };
        }

        push_joined(&mut chunks, &current);
        chunks
    }

    /// Cut an oversized piece into `chunk_size` windows.
    fn windows<'t>(&self, piece: &'t str) -> Vec<&'t str> {
        if char_len(piece) <= self.chunk_size {
            return vec![piece];
        }

        let bounds: Vec<usize> = piece
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(piece.len()))
            .collect();
        let n_chars = bounds.len() - 1;
        let step = self.chunk_size - self.chunk_overlap;
        warn!(
            "Segment of {} chars has no paragraph break within {}; cutting it mid-text",
            n_chars, self.chunk_size
        );

        let mut out = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(n_chars);
            out.push(&piece[bounds[start]..bounds[end]]);
            if end == n_chars {
                break;
            }
            start += step;
        }
        out
    }
}

fn push_joined(chunks: &mut Vec<String>, current: &VecDeque<&str>) {
    let joined = current
        .iter()
        .copied()
        .collect::<Vec<_>>()
        .join(PARAGRAPH_SEPARATOR);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
