//! Overlapping chunk windows over normalized page text.
//!
//! Each source text is cut into windows of at most `chunk_size` characters.
//! A window prefers to end right after a paragraph break, then a line break,
//! then a sentence stop, then a space; only when none of those fits does it
//! fall back to a hard cut at `chunk_size`. The next window starts exactly
//! `chunk_overlap` characters before the previous one ended.
//!
//! Chunks are contiguous slices of their source, so dropping each chunk's
//! `overlap` prefix and concatenating gives back the source text byte for
//! byte ([`reassemble`]). Sizes are counted in `char`s; a code point is never
//! split.

use crate::config::validate_chunking;
use crate::error::SummaryError;
use crate::pipeline::pages::{Metadata, Page};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Break candidates, most preferred first.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ".", " "];

/// A bounded window of source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    /// The source's metadata, unmodified.
    pub metadata: Metadata,
    /// Char offset of this chunk within its source text.
    pub start: usize,
    /// Chars shared with the previous chunk of the same source (0 for the first).
    pub overlap: usize,
}

impl Chunk {
    /// `page_label` from the metadata, when the source was a PDF page.
    pub fn page_label(&self) -> Option<&str> {
        self.metadata.get("page_label").and_then(|v| v.as_str())
    }
}

/// Splits texts into overlapping [`Chunk`]s.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    /// Create a chunker; fails unless `0 < chunk_size` and `chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, SummaryError> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split every `(text, metadata)` source, preserving source order.
    pub fn split<I, S>(&self, sources: I) -> Vec<Chunk>
    where
        I: IntoIterator<Item = (S, Metadata)>,
        S: AsRef<str>,
    {
        let mut chunks = Vec::new();
        for (text, metadata) in sources {
            let text = text.as_ref();
            for span in self.spans(text) {
                chunks.push(Chunk {
                    text: span.slice(text).to_string(),
                    metadata: metadata.clone(),
                    start: span.start,
                    overlap: span.overlap,
                });
            }
        }
        debug!(
            "Split into {} chunks (size={}, overlap={})",
            chunks.len(),
            self.chunk_size,
            self.chunk_overlap
        );
        chunks
    }

    /// Split pages, each chunk carrying its page's metadata.
    pub fn split_pages(&self, pages: &[Page]) -> Vec<Chunk> {
        self.split(pages.iter().map(|p| (p.text.as_str(), p.metadata())))
    }

    fn spans(&self, text: &str) -> Vec<Span> {
        // Byte offset of every char boundary, including the end of the text.
        let bounds: Vec<usize> = text
            .char_indices()
            .map(|(b, _)| b)
            .chain(std::iter::once(text.len()))
            .collect();
        let n = bounds.len() - 1;

        let mut spans = Vec::new();
        let mut start = 0;
        let mut overlap = 0;
        while start < n {
            let limit = (start + self.chunk_size).min(n);
            let end = if limit == n {
                n
            } else {
                self.find_break(text, &bounds, start, limit)
            };
            spans.push(Span {
                start,
                end,
                overlap,
                byte_start: bounds[start],
                byte_end: bounds[end],
            });
            if end == n {
                break;
            }
            start = end - self.chunk_overlap;
            overlap = self.chunk_overlap;
        }
        spans
    }

    /// Char index to end the window `[start, limit)` at.
    ///
    /// A separator cut must leave `cut - overlap > start`, or the next
    /// window would not advance.
    fn find_break(&self, text: &str, bounds: &[usize], start: usize, limit: usize) -> usize {
        let window = &text[bounds[start]..bounds[limit]];
        for sep in SEPARATORS {
            if let Some(pos) = window.rfind(sep) {
                let cut = start + window[..pos + sep.len()].chars().count();
                if cut > start + self.chunk_overlap {
                    return cut;
                }
            }
        }
        limit
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: crate::config::DEFAULT_CHUNK_SIZE,
            chunk_overlap: crate::config::DEFAULT_CHUNK_OVERLAP,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
    overlap: usize,
    byte_start: usize,
    byte_end: usize,
}

impl Span {
    fn slice<'a>(&self, text: &'a str) -> &'a str {
        debug_assert!(self.end >= self.start);
        &text[self.byte_start..self.byte_end]
    }
}

/// Rebuild source text by dropping each chunk's overlap prefix.
///
/// Pass the chunks of a single source, in order.
pub fn reassemble(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .flat_map(|c| c.text.chars().skip(c.overlap))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(page: usize) -> Metadata {
        let mut m = Metadata::new();
        m.insert("source_path".into(), "case.pdf".into());
        m.insert("page_number".into(), page.into());
        m
    }

    fn split_one(chunker: &Chunker, text: &str) -> Vec<Chunk> {
        chunker.split([(text, meta(1))])
    }

    #[test]
    fn overlap_not_smaller_than_size_is_a_config_error() {
        assert!(matches!(
            Chunker::new(10, 10),
            Err(SummaryError::InvalidConfig(_))
        ));
        assert!(Chunker::new(10, 11).is_err());
        assert!(Chunker::new(10, 9).is_ok());
    }

    #[test]
    fn hard_cut_overlaps_by_exactly_the_configured_amount() {
        let chunker = Chunker::new(10, 3).unwrap();
        let chunks = split_one(&chunker, "abcdefghijklmno");
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["abcdefghij", "hijklmno"]);
        assert_eq!(chunks[1].overlap, 3);
        assert_eq!(&chunks[0].text[7..], &chunks[1].text[..3]);
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 10));
    }

    #[test]
    fn prefers_paragraph_break_over_line_break() {
        let chunker = Chunker::new(20, 2).unwrap();
        let text = "para one\n\nline a\nline b and more";
        let chunks = split_one(&chunker, text);
        assert_eq!(chunks[0].text, "para one\n\n");
        assert_eq!(reassemble(&chunks), text);
    }

    #[test]
    fn falls_back_to_sentence_then_word() {
        let chunker = Chunker::new(12, 2).unwrap();
        let chunks = split_one(&chunker, "Seen today. Doing well overall");
        assert_eq!(chunks[0].text, "Seen today.");
        let chunks = split_one(&chunker, "alpha beta gamma delta");
        assert_eq!(chunks[0].text, "alpha beta ");
    }

    #[test]
    fn separator_too_close_to_start_is_ignored() {
        // The only space sits inside the overlap zone, so a hard cut is used.
        let chunker = Chunker::new(8, 4).unwrap();
        let chunks = split_one(&chunker, "ab cdefghijklm");
        assert_eq!(chunks[0].text, "ab cdefg");
    }

    #[test]
    fn round_trip_reconstructs_source() {
        let texts = [
            "",
            "short",
            "Chief complaint: low back pain.\n\nHistory: fell at work in 2019. Seen by Dr. Lee.\nMRI shows L4-L5 herniation.",
            "ünïcödé téxt wïth áccents. ünïcödé téxt wïth áccents. ünïcödé",
            "no separators at all in this one just letters",
        ];
        for (size, overlap) in [(5, 0), (10, 3), (16, 15), (40, 8)] {
            let chunker = Chunker::new(size, overlap).unwrap();
            for text in texts {
                let chunks = split_one(&chunker, text);
                assert_eq!(reassemble(&chunks), text, "size={size} overlap={overlap}");
                assert!(chunks.iter().all(|c| c.text.chars().count() <= size));
            }
        }
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(split_one(&Chunker::default(), "").is_empty());
    }

    #[test]
    fn chunks_inherit_metadata_and_keep_source_order() {
        let chunker = Chunker::new(6, 1).unwrap();
        let chunks = chunker.split([("first page text", meta(1)), ("second", meta(3))]);
        let pages: Vec<u64> = chunks
            .iter()
            .map(|c| c.metadata["page_number"].as_u64().unwrap())
            .collect();
        let mut sorted = pages.clone();
        sorted.sort_unstable();
        assert_eq!(pages, sorted);
        assert!(chunks.iter().filter(|c| c.metadata == meta(1)).count() > 1);
        assert_eq!(chunks.last().unwrap().metadata, meta(3));
        assert_eq!(chunks.last().unwrap().overlap, 0);
    }
}
