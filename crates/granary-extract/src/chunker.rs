//! Semantic-aware text chunker
//!
//! Splits extracted text into overlapping chunks, preferring paragraph
//! boundaries, then sentence boundaries, then a hard character cut. Offsets
//! are character positions into the source text so chunks stay traceable.

/// Chunker tuning
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Target chunk size in characters
    pub target_chars: usize,
    /// Overlap between adjacent chunks in characters
    pub overlap_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            target_chars: 1000,
            overlap_chars: 100,
        }
    }
}

/// One chunk of extracted text with its source offsets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// The chunk text, never empty or whitespace-only
    pub content: String,
    /// Character offset of the chunk start in the source text
    pub char_start: usize,
    /// Character offset one past the chunk end
    pub char_end: usize,
    /// Which boundary kind ended this chunk ("paragraph", "sentence"), if any
    pub structure_hint: Option<String>,
}

/// Split text into overlapping chunks along semantic boundaries
///
/// Text at or under the target size yields exactly one chunk spanning the
/// whole input. Whitespace-only input yields no chunks.
pub fn chunk_text(text: &str, config: &ChunkerConfig) -> Vec<TextChunk> {
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();

    if text.trim().is_empty() {
        return Vec::new();
    }

    if total <= config.target_chars {
        return vec![TextChunk {
            content: text.to_string(),
            char_start: 0,
            char_end: total,
            structure_hint: None,
        }];
    }

    // Boundary search floor: never shrink a chunk below half the target.
    let min_cut = config.target_chars / 2;
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < total {
        let hard_end = start.saturating_add(config.target_chars).min(total);

        let (end, hint) = if hard_end == total {
            (total, None)
        } else {
            find_cut(&chars, start, hard_end, min_cut)
        };

        let content: String = chars
            .get(start..end)
            .map(|slice| slice.iter().collect())
            .unwrap_or_default();

        if !content.trim().is_empty() {
            chunks.push(TextChunk {
                content,
                char_start: start,
                char_end: end,
                structure_hint: hint,
            });
        }

        if end >= total {
            break;
        }

        // Step back by the overlap, but always make forward progress.
        let next = end.saturating_sub(config.overlap_chars);
        start = if next > start { next } else { end };
    }

    chunks
}

/// Pick the best cut position within `(start + min_cut, hard_end]`
fn find_cut(chars: &[char], start: usize, hard_end: usize, min_cut: usize) -> (usize, Option<String>) {
    let floor = start.saturating_add(min_cut);

    if let Some(cut) = rfind_boundary(chars, floor, hard_end, is_paragraph_break) {
        return (cut, Some("paragraph".to_string()));
    }
    if let Some(cut) = rfind_boundary(chars, floor, hard_end, is_sentence_break) {
        return (cut, Some("sentence".to_string()));
    }
    (hard_end, None)
}

/// Scan backward for a boundary, returning the position after it
fn rfind_boundary(
    chars: &[char],
    floor: usize,
    hard_end: usize,
    predicate: fn(&[char], usize) -> bool,
) -> Option<usize> {
    let mut pos = hard_end;
    while pos > floor {
        pos = pos.saturating_sub(1);
        if predicate(chars, pos) {
            return Some(pos.saturating_add(1));
        }
    }
    None
}

/// A newline followed by another newline (possibly with spaces between)
fn is_paragraph_break(chars: &[char], pos: usize) -> bool {
    if chars.get(pos) != Some(&'\n') {
        return false;
    }
    let mut i = pos;
    while i > 0 {
        i = i.saturating_sub(1);
        match chars.get(i) {
            Some('\n') => return true,
            Some(c) if c.is_whitespace() => {}
            _ => return false,
        }
    }
    false
}

/// Sentence-ending punctuation followed by whitespace
fn is_sentence_break(chars: &[char], pos: usize) -> bool {
    let Some(c) = chars.get(pos) else {
        return false;
    };
    if !c.is_whitespace() {
        return false;
    }
    matches!(
        pos.checked_sub(1).and_then(|i| chars.get(i)),
        Some('.' | '!' | '?')
    )
}
