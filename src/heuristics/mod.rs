pub mod blocks;
pub mod fields;
pub mod validate;

pub use blocks::{normalize, split_blocks, Block, DEFAULT_MIN_LINES};
pub use validate::validate;

use crate::model::Product;

/// Run the full heuristic pipeline over one raw document text: normalize,
/// segment into blocks, extract one record per block. Blocks are independent
/// of each other, so callers batching many documents can fan out freely.
pub fn products_from_text(raw: &str, min_lines: usize) -> Vec<Product> {
    let text = blocks::normalize(raw);
    blocks::split_blocks(&text, min_lines)
        .iter()
        .map(|b| fields::extract(&text[b.start..b.end]))
        .collect()
}

// ── Tests ──
