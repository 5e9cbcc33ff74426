//! Line-boundary text chunker.
//!
//! Splits decoded document text into [`Chunk`]s no longer than a configurable
//! `max_chars` budget. Sizes are counted in **characters** (Unicode scalar
//! values), not bytes and not model tokens.
//!
//! # Algorithm
//!
//! Two independent passes:
//!
//! 1. [`pack_lines`] — split the text into lines that keep their terminators,
//!    then greedily accumulate them into a buffer. Before appending a line,
//!    if the buffer is non-empty and the line would push it past `max_chars`,
//!    the buffer is flushed as a chunk first. The line is then always placed
//!    whole into the (possibly fresh) buffer.
//! 2. [`split_oversized`] — any packed part still longer than `max_chars`
//!    (only possible when a single line exceeds the budget) is hard-cut into
//!    consecutive `max_chars`-sized slices; the last slice may be shorter.
//!
//! # Guarantees
//!
//! - Empty text yields no chunks.
//! - Concatenating the chunk texts in index order reproduces the input exactly.
//! - Every chunk is at most `max_chars` characters.
//! - A chunk boundary falls mid-line only when that line alone exceeds `max_chars`.
//! - Chunk indices are contiguous: `0, 1, 2, …, N-1`.
//!
//! # Example
//!
//! ```rust
//! use blob_reindex::chunk::chunk_text;
//!
//! let chunks = chunk_text("line1\nline2\nline3\n", 12);
//! let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
//! assert_eq!(texts, vec!["line1\nline2\n", "line3\n"]);
//! ```

use crate::models::Chunk;

/// Default character budget per chunk when none is configured.
pub const DEFAULT_MAX_CHARS: usize = 1800;

/// Split text into chunks on line boundaries, respecting `max_chars`.
///
/// A `max_chars` of zero is treated as one; configuration loading rejects
/// zero before it gets here.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<Chunk> {
    let max_chars = max_chars.max(1);

    if text.is_empty() {
        return Vec::new();
    }

    let packed = pack_lines(text, max_chars);
    split_oversized(packed, max_chars)
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk { index, text })
        .collect()
}

/// First pass: greedily pack whole lines into parts of at most `max_chars`.
///
/// A part only exceeds `max_chars` when it consists of a single line that is
/// itself longer than the budget.
pub fn pack_lines(text: &str, max_chars: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut buf = String::new();
    let mut count = 0usize;

    for line in split_lines_inclusive(text) {
        let len = line.chars().count();
        if count + len > max_chars && !buf.is_empty() {
            parts.push(std::mem::take(&mut buf));
            count = 0;
        }
        buf.push_str(line);
        count += len;
    }

    if !buf.is_empty() {
        parts.push(buf);
    }

    parts
}

/// Second pass: hard-cut any part longer than `max_chars` into fixed slices.
///
/// Parts within budget pass through untouched. Cuts always land on `char`
/// boundaries.
pub fn split_oversized(parts: Vec<String>, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut out = Vec::with_capacity(parts.len());

    for part in parts {
        if part.chars().count() <= max_chars {
            out.push(part);
            continue;
        }

        let mut start = 0;
        let mut taken = 0;
        for (byte_idx, _) in part.char_indices() {
            if taken == max_chars {
                out.push(part[start..byte_idx].to_string());
                start = byte_idx;
                taken = 0;
            }
            taken += 1;
        }
        if start < part.len() {
            out.push(part[start..].to_string());
        }
    }

    out
}

/// Split text into lines, each keeping its terminator.
///
/// Recognised terminators are `\n`, `\r`, `\r\n`, `\x0b`, `\x0c`, `\x1c`,
/// `\x1d`, `\x1e`, `\u{85}`, `\u{2028}` and `\u{2029}`. A trailing fragment
/// without a terminator is returned as the last line. Concatenating the
/// result reproduces `text` exactly.
pub fn split_lines_inclusive(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut iter = text.char_indices().peekable();

    while let Some((idx, c)) = iter.next() {
        if !is_line_break(c) {
            continue;
        }
        let mut end = idx + c.len_utf8();
        if c == '\r' {
            if let Some(&(next_idx, '\n')) = iter.peek() {
                end = next_idx + 1;
                iter.next();
            }
        }
        lines.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        lines.push(&text[start..]);
    }

    lines
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r'
            | '\u{0b}'
            | '\u{0c}'
            | '\u{1c}'
            | '\u{1d}'
            | '\u{1e}'
            | '\u{85}'
            | '\u{2028}'
            | '\u{2029}'
    )
}
