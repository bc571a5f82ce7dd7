//! Overlapping text chunker for knowledge indexing.
//!
//! Windows of ~1000 characters with a 200-character overlap, breaking
//! preferentially at paragraph, then line, then word boundaries so local
//! context survives across chunk edges.

/// A chunk of an ingested document, in document order.
#[derive(Debug, Clone)]
pub struct TextChunk {
    pub content: String,
    pub chunk_index: usize,
}

pub struct OverlapChunker {
    chunk_size: usize,
    overlap: usize,
}

impl OverlapChunker {
    pub fn new() -> Self {
        Self::with_limits(1000, 200)
    }

    /// `overlap` is clamped below `chunk_size` to guarantee forward progress.
    pub fn with_limits(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    pub fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut chunk_index = 0;
        let mut start = 0;
        let len = text.len();

        while start < len {
            let mut end = (start + self.chunk_size).min(len);
            while !text.is_char_boundary(end) {
                end -= 1;
            }

            let break_at = if end < len {
                find_break(text, start, end)
            } else {
                end
            };

            let content = text[start..break_at].trim();
            if !content.is_empty() {
                chunks.push(TextChunk {
                    content: content.to_string(),
                    chunk_index,
                });
                chunk_index += 1;
            }

            if break_at >= len {
                break;
            }

            // Step back into the previous chunk so context spans the edge.
            let mut next = break_at.saturating_sub(self.overlap);
            if next <= start {
                next = break_at;
            }
            while !text.is_char_boundary(next) {
                next -= 1;
            }
            start = next;
        }

        chunks
    }
}

impl Default for OverlapChunker {
    fn default() -> Self {
        Self::new()
    }
}

/// Best break position in `(start, end]`: paragraph, then line, then word.
/// Only the second half of the window is searched so chunks stay near the
/// target size; a hard cut at `end` is the last resort.
fn find_break(text: &str, start: usize, end: usize) -> usize {
    let mut window_start = start + (end - start) / 2;
    while !text.is_char_boundary(window_start) {
        window_start += 1;
    }
    let window = &text[window_start..end];

    if let Some(pos) = window.rfind("\n\n") {
        return window_start + pos + 2;
    }
    if let Some(pos) = window.rfind('\n') {
        return window_start + pos + 1;
    }
    if let Some(pos) = window.rfind(' ') {
        return window_start + pos + 1;
    }
    end
}
