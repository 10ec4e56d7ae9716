//! Structure-aware chunking for oversized documents
//!
//! Splits at detected section markers when the document has structure,
//! otherwise packs paragraphs greedily up to the chunk budget. Chunks carry
//! their source offsets, so concatenating chunk payloads reconstructs the
//! original text without gaps. Every chunk after the first is prefixed with
//! the tail of the previous chunk (behind a sentinel) so per-chunk
//! extraction keeps minimal cross-chunk context.

use regex::Regex;
use tracing::debug;

/// Separator between the overlap prefix and the chunk's own payload
pub const OVERLAP_SENTINEL: &str = "\n...\n";

/// How a chunk was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkType {
    /// The whole document fit in one chunk
    Complete,
    /// Split at a detected section/chapter marker
    Section,
    /// Greedy paragraph packing (no usable structure)
    Paragraphs,
}

/// One ordered piece of a chunked document.
///
/// `start`/`end` are byte offsets of the payload in the original text; the
/// `content` may additionally carry an overlap prefix from the previous
/// chunk.
#[derive(Debug, Clone)]
pub struct DocumentChunk {
    /// Chunk text as handed to the extractor (overlap prefix included)
    pub content: String,

    /// Position in the chunk sequence
    pub index: usize,

    /// Payload start offset in the original text
    pub start: usize,

    /// Payload end offset in the original text
    pub end: usize,

    /// How this chunk was produced
    pub chunk_type: ChunkType,

    /// Total number of chunks the document was split into
    pub total_chunks: usize,

    /// Whether `content` starts with an overlap prefix
    pub has_overlap: bool,

    /// Byte length of the overlap prefix plus sentinel inside `content`
    overlap_prefix_len: usize,
}

impl DocumentChunk {
    /// The chunk's own text, with any overlap prefix stripped
    pub fn payload(&self) -> &str {
        &self.content[self.overlap_prefix_len..]
    }
}

/// Structure-aware text chunker
pub struct TextChunker {
    max_chunk_size: usize,
    overlap: usize,
    section_patterns: Vec<Regex>,
}

impl TextChunker {
    /// Create a chunker.
    ///
    /// - `max_chunk_size`: payload budget per chunk, in bytes
    /// - `overlap`: trailing-context size carried into the next chunk, in chars
    pub fn new(max_chunk_size: usize, overlap: usize) -> Self {
        // Ordered passes: explicit chapter words, markdown headers,
        // numbered headings, ALL-CAPS titles.
        let section_patterns = [
            r"(?mi)^(capítulo|chapter|cap\.)\s+\d+",
            r"(?m)^#{1,6}\s+\S",
            r"(?mi)^(seção|section)\s+\d+",
            r"(?m)^\d+(\.\d+)*\.?\s+[A-ZÀ-Ü]",
            r"(?m)^[A-ZÀ-Ü][A-ZÀ-Ü0-9 ]{3,}$",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static section regex"))
        .collect();

        Self {
            max_chunk_size,
            overlap,
            section_patterns,
        }
    }

    /// Split the text into ordered chunks.
    ///
    /// Text at or under the budget always yields exactly one `Complete`
    /// chunk.
    pub fn chunk(&self, text: &str) -> Vec<DocumentChunk> {
        if text.len() <= self.max_chunk_size {
            return vec![DocumentChunk {
                content: text.to_string(),
                index: 0,
                start: 0,
                end: text.len(),
                chunk_type: ChunkType::Complete,
                total_chunks: 1,
                has_overlap: false,
                overlap_prefix_len: 0,
            }];
        }

        let markers = self.section_markers(text);
        let mut chunks = if markers.is_empty() {
            self.chunk_span(text, 0, ChunkType::Paragraphs)
        } else {
            self.chunk_by_sections(text, &markers)
        };

        let total = chunks.len();
        for (i, chunk) in chunks.iter_mut().enumerate() {
            chunk.index = i;
            chunk.total_chunks = total;
        }
        self.add_overlap(&mut chunks);

        debug!(
            chars = text.len(),
            chunks = chunks.len(),
            structured = !markers.is_empty(),
            "document chunked"
        );
        chunks
    }

    /// Byte offsets of detected section markers, sorted and deduplicated
    fn section_markers(&self, text: &str) -> Vec<usize> {
        let mut markers: Vec<usize> = self
            .section_patterns
            .iter()
            .flat_map(|pattern| pattern.find_iter(text).map(|m| m.start()))
            .collect();
        markers.sort_unstable();
        markers.dedup();
        markers
    }

    /// Split at marker boundaries; oversized sections recurse into
    /// paragraph packing
    fn chunk_by_sections(&self, text: &str, markers: &[usize]) -> Vec<DocumentChunk> {
        let mut bounds = vec![0];
        bounds.extend(markers.iter().copied().filter(|&m| m > 0 && m < text.len()));
        bounds.push(text.len());
        bounds.dedup();

        let mut chunks = Vec::new();
        for window in bounds.windows(2) {
            let (start, end) = (window[0], window[1]);
            let section = &text[start..end];
            if section.len() <= self.max_chunk_size {
                chunks.push(raw_chunk(section, start, end, ChunkType::Section));
            } else {
                chunks.extend(self.chunk_span(section, start, ChunkType::Paragraphs));
            }
        }
        chunks
    }

    /// Greedy paragraph packing of one span; falls back to hard cuts for
    /// paragraphs larger than the budget
    fn chunk_span(&self, span: &str, base: usize, chunk_type: ChunkType) -> Vec<DocumentChunk> {
        let para_starts = paragraph_starts(span);

        // Greedy packing: cut whenever adding the next paragraph would
        // overflow the budget.
        let mut cuts = vec![0usize];
        for i in 1..para_starts.len() {
            let chunk_start = *cuts.last().expect("cuts never empty");
            let para_end = para_starts.get(i + 1).copied().unwrap_or(span.len());
            if para_end - chunk_start > self.max_chunk_size && para_starts[i] > chunk_start {
                cuts.push(para_starts[i]);
            }
        }
        cuts.push(span.len());
        cuts.dedup();

        // Second pass: hard-split anything still over budget (one giant
        // paragraph), respecting char boundaries.
        let mut final_cuts = Vec::new();
        for window in cuts.windows(2) {
            let (start, end) = (window[0], window[1]);
            final_cuts.push(start);
            if end - start > self.max_chunk_size {
                let mut pos = start + self.max_chunk_size;
                while pos < end {
                    while !span.is_char_boundary(pos) {
                        pos -= 1;
                    }
                    if pos > *final_cuts.last().expect("non-empty") {
                        final_cuts.push(pos);
                    }
                    pos += self.max_chunk_size;
                }
            }
        }
        final_cuts.push(span.len());
        final_cuts.dedup();

        final_cuts
            .windows(2)
            .map(|w| raw_chunk(&span[w[0]..w[1]], base + w[0], base + w[1], chunk_type))
            .collect()
    }

    /// Prefix each chunk after the first with the previous payload's tail
    fn add_overlap(&self, chunks: &mut [DocumentChunk]) {
        if self.overlap == 0 {
            return;
        }
        for i in 1..chunks.len() {
            let tail = tail_chars(chunks[i - 1].payload(), self.overlap).to_string();
            if tail.is_empty() {
                continue;
            }
            let chunk = &mut chunks[i];
            let prefix = format!("{tail}{OVERLAP_SENTINEL}");
            chunk.overlap_prefix_len = prefix.len();
            chunk.content = format!("{prefix}{}", chunk.content);
            chunk.has_overlap = true;
        }
    }
}

fn raw_chunk(content: &str, start: usize, end: usize, chunk_type: ChunkType) -> DocumentChunk {
    DocumentChunk {
        content: content.to_string(),
        index: 0,
        start,
        end,
        chunk_type,
        total_chunks: 0,
        has_overlap: false,
        overlap_prefix_len: 0,
    }
}

/// Byte offsets where paragraphs start (position 0 included)
fn paragraph_starts(span: &str) -> Vec<usize> {
    let mut starts = vec![0];
    let mut search = 0;
    while let Some(pos) = span[search..].find("\n\n") {
        let next = search + pos + 2;
        if next < span.len() {
            starts.push(next);
        }
        search = next;
        if search >= span.len() {
            break;
        }
    }
    starts
}

/// Last `n` chars of a string, on char boundaries
fn tail_chars(s: &str, n: usize) -> &str {
    let count = s.chars().count();
    if count <= n {
        return s;
    }
    let (idx, _) = s
        .char_indices()
        .nth(count - n)
        .expect("index within char count");
    &s[idx..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker() -> TextChunker {
        TextChunker::new(3000, 200)
    }

    fn reassemble(chunks: &[DocumentChunk]) -> String {
        chunks.iter().map(|c| c.payload()).collect()
    }

    #[test]
    fn test_small_text_single_complete_chunk() {
        let text = "Documento pequeno que cabe inteiro.";
        let chunks = chunker().chunk(text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_type, ChunkType::Complete);
        assert_eq!(chunks[0].content, text);
        assert_eq!(chunks[0].total_chunks, 1);
        assert!(!chunks[0].has_overlap);
    }

    #[test]
    fn test_text_at_exact_budget_is_complete() {
        let text = "x".repeat(3000);
        let chunks = chunker().chunk(&text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_type, ChunkType::Complete);
    }

    #[test]
    fn test_markdown_headers_produce_sections() {
        let section = format!("conteúdo da seção {}\n", "palavra ".repeat(700));
        let text = format!(
            "# Primeira parte\n{section}\n# Segunda parte\n{section}\n# Terceira parte\n{section}"
        );
        assert!(text.len() > 8000);

        let chunks = TextChunker::new(8000, 200).chunk(&text);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chunk_type == ChunkType::Section));
        assert!(chunks[0].payload().starts_with("# Primeira parte"));
        assert!(chunks[1].payload().starts_with("# Segunda parte"));
        assert!(chunks[2].payload().starts_with("# Terceira parte"));
    }

    #[test]
    fn test_unstructured_text_packs_paragraphs() {
        let paragraph = format!("{}\n\n", "texto corrido sem estrutura ".repeat(20));
        let text = paragraph.repeat(12);
        assert!(text.len() > 3000);

        let chunks = chunker().chunk(&text);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chunk_type == ChunkType::Paragraphs));
        for chunk in &chunks {
            assert!(chunk.payload().len() <= 3000);
        }
    }

    #[test]
    fn test_payloads_cover_original_without_gaps() {
        let paragraph = format!("{}\n\n", "cobertura total do documento ".repeat(15));
        let text = paragraph.repeat(15);
        let chunks = chunker().chunk(&text);

        assert_eq!(reassemble(&chunks), text);
        // Offsets tile the document
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks.last().unwrap().end, text.len());
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_sectioned_payloads_cover_original() {
        let body = format!("{}\n", "linha de conteúdo da seção ".repeat(150));
        let text = format!("# Um\n{body}# Dois\n{body}# Três\n{body}");
        let chunks = TextChunker::new(8000, 200).chunk(&text);
        assert_eq!(reassemble(&chunks), text);
    }

    #[test]
    fn test_overlap_prefix_carries_previous_tail() {
        let paragraph = format!("{}\n\n", "contexto compartilhado entre pedaços ".repeat(15));
        let text = paragraph.repeat(12);
        let chunks = chunker().chunk(&text);
        assert!(chunks.len() > 1);

        assert!(!chunks[0].has_overlap);
        for pair in chunks.windows(2) {
            let next = &pair[1];
            assert!(next.has_overlap);
            assert!(next.content.contains(OVERLAP_SENTINEL));
            let tail = tail_chars(pair[0].payload(), 200);
            assert!(next.content.starts_with(tail));
        }
    }

    #[test]
    fn test_oversized_section_recurses_into_paragraphs() {
        let huge_body = format!("{}\n\n", "parágrafo dentro da seção gigante ".repeat(30))
            .repeat(8);
        let text = format!("# Seção pequena\ncurta\n\n# Seção gigante\n{huge_body}");
        let chunks = chunker().chunk(&text);

        assert!(chunks.len() > 2);
        assert_eq!(chunks[0].chunk_type, ChunkType::Section);
        assert!(chunks
            .iter()
            .any(|c| c.chunk_type == ChunkType::Paragraphs));
    }

    #[test]
    fn test_giant_paragraph_hard_split_respects_char_boundaries() {
        let text = "ção".repeat(4000); // multibyte, no paragraph breaks
        let chunks = chunker().chunk(&text);
        assert!(chunks.len() > 1);
        assert_eq!(reassemble(&chunks), text);
    }

    #[test]
    fn test_all_caps_titles_detected_as_sections() {
        let body = format!("{}\n", "conteúdo da cláusula contratual ".repeat(120));
        let text = format!("CLÁUSULA PRIMEIRA\n{body}CLÁUSULA SEGUNDA\n{body}");
        let chunks = TextChunker::new(6000, 100).chunk(&text);
        assert!(chunks.iter().any(|c| c.chunk_type == ChunkType::Section));
    }

    #[test]
    fn test_tail_chars() {
        assert_eq!(tail_chars("abcdef", 3), "def");
        assert_eq!(tail_chars("ab", 5), "ab");
        assert_eq!(tail_chars("àéîõü", 2), "õü");
    }
}
