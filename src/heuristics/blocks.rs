use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{2,}").unwrap());

/// First N characters of a block shown for human review; nothing downstream
/// reads the preview.
pub const PREVIEW_CHARS: usize = 60;

/// Candidate parts with fewer lines than this are dropped as stray fragments
/// (headers, page numbers).
pub const DEFAULT_MIN_LINES: usize = 2;

/// Half-open byte span `[start, end)` into the normalized source text, one
/// candidate product entry. Spans are emitted left-to-right, strictly
/// increasing and non-overlapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub start: usize,
    pub end: usize,
    pub preview: String,
}

/// Normalize raw document text before segmentation: CRLF → LF, outer
/// whitespace trimmed. Span offsets are relative to this copy, so callers
/// must slice the normalized text, not the raw input. Idempotent.
pub fn normalize(raw: &str) -> String {
    raw.replace("\r\n", "\n").trim().to_string()
}

/// Split normalized text into candidate product blocks on blank-line
/// separators (a run of two or more newlines counts as one separator).
///
/// Each surviving part is located by scanning forward from the end of the
/// previous one, so repeated content cannot make offsets jump backward or
/// collide. A text with no separator is a single candidate; zero surviving
/// candidates is a valid empty result.
pub fn split_blocks(text: &str, min_lines: usize) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut cursor = 0;

    for part in SEPARATOR_RE.split(text) {
        let Some(found) = text[cursor..].find(part) else {
            continue;
        };
        let start = cursor + found;
        let end = start + part.len();
        cursor = end;

        if part.trim().is_empty() {
            continue;
        }
        if part.matches('\n').count() + 1 < min_lines {
            continue;
        }

        blocks.push(Block {
            start,
            end,
            preview: part.chars().take(PREVIEW_CHARS).collect(),
        });
    }

    blocks
}

// ── Tests ──
