use std::sync::LazyLock;

use regex::Regex;

use crate::model::Product;

// First match wins for both patterns. The price pattern has no word-boundary
// guard, so a bare digit run (including digits inside an SKU like "ABC-123")
// matches as a price. Known false-positive risk, kept for reproducibility.
static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:₹|\$|EUR|INR)?\s*([0-9][0-9,]*\.?[0-9]{0,2})").unwrap());
static SKU_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:SKU|Item Code|Code|Model No\.?)\s*[:\-]?\s*([A-Za-z0-9\-_/]+)").unwrap()
});

/// A line containing any of these (case-insensitively) is metadata, not
/// free-text description.
const LABEL_MARKERS: &[&str] = &["price", "mrp", "sku", "item code", "code", "model"];

pub const DESCRIPTION_CHARS: usize = 500;

/// Derive a structured record from one block's text.
///
/// First non-empty line is the name, verbatim. Label lines are excluded from
/// the description; the rest join with single spaces, capped at 500 chars.
/// Price is the earliest match of the numeric pattern over the comma-stripped
/// text; currency resolves on the original text with fixed precedence
/// (₹/INR, then $, then EUR). Anything unrecognized is simply absent.
pub fn extract(block_text: &str) -> Product {
    let lines: Vec<&str> = block_text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let name = lines.first().map(|l| l.to_string());

    let desc_lines: Vec<&str> = lines
        .iter()
        .skip(1)
        .filter(|l| !is_label_line(l))
        .copied()
        .collect();
    let description = if desc_lines.is_empty() {
        None
    } else {
        Some(truncate_chars(&desc_lines.join(" "), DESCRIPTION_CHARS))
    };

    let mut price = None;
    let mut currency = None;
    let stripped = block_text.replace(',', "");
    if let Some(caps) = PRICE_RE.captures(&stripped) {
        // A match that fails to parse stays absent; it never aborts extraction.
        price = caps[1].parse::<f64>().ok();
        currency = detect_currency(block_text);
    }

    let sku = SKU_RE.captures(block_text).map(|caps| caps[1].to_string());

    Product {
        name,
        sku,
        price,
        currency,
        description,
    }
}

fn is_label_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    LABEL_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Fixed precedence: rupee sign or INR beats dollar beats EUR. Evaluated on
/// the original text so a stripped comma can't change the outcome.
fn detect_currency(text: &str) -> Option<String> {
    let upper = text.to_uppercase();
    if text.contains('₹') || upper.contains("INR") {
        Some("INR".to_string())
    } else if text.contains('$') {
        Some("USD".to_string())
    } else if upper.contains("EUR") {
        Some("EUR".to_string())
    } else {
        None
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_block() {
        let p = extract("Widget A\nPrice: $12.50\nSKU: WA-100\nA sturdy widget.");
        assert_eq!(p.name.as_deref(), Some("Widget A"));
        assert_eq!(p.price, Some(12.50));
        assert_eq!(p.currency.as_deref(), Some("USD"));
        assert_eq!(p.sku.as_deref(), Some("WA-100"));
        assert_eq!(p.description.as_deref(), Some("A sturdy widget."));
    }

    #[test]
    fn name_only_block() {
        let p = extract("Widget B\nPrice: ₹500");
        assert_eq!(p.name.as_deref(), Some("Widget B"));
        assert_eq!(p.price, Some(500.0));
        assert_eq!(p.currency.as_deref(), Some("INR"));
        assert_eq!(p.sku, None);
        assert_eq!(p.description, None);
    }

    #[test]
    fn empty_block() {
        let p = extract("");
        assert_eq!(p, Product::default());
    }

    #[test]
    fn whitespace_only_block() {
        let p = extract("  \n\t\n ");
        assert_eq!(p.name, None);
        assert_eq!(p.description, None);
    }

    #[test]
    fn label_lines_never_reach_description() {
        let p = extract("Gadget\nPrice: $10\nMRP 12\nModel X200\nItem Code: G-1\nRuns on air.");
        assert_eq!(p.description.as_deref(), Some("Runs on air."));
    }

    #[test]
    fn description_joined_in_order() {
        let p = extract("Gadget\nfirst part\nsecond part\nthird part");
        assert_eq!(p.description.as_deref(), Some("first part second part third part"));
    }

    #[test]
    fn description_truncated_to_500_chars() {
        let filler = "d".repeat(300);
        let p = extract(&format!("Gadget\n{}\n{}", filler, filler));
        // 300 + 1 (joining space) + 300 truncates to exactly 500.
        assert_eq!(p.description.as_ref().unwrap().chars().count(), 500);
    }

    #[test]
    fn first_price_match_wins() {
        let p = extract("Combo\nPrice: $5.25\nWas $9.99 before");
        assert_eq!(p.price, Some(5.25));
    }

    #[test]
    fn thousands_separators_stripped() {
        let p = extract("Sofa\nPrice: ₹1,25,000.00");
        assert_eq!(p.price, Some(125000.0));
        assert_eq!(p.currency.as_deref(), Some("INR"));
    }

    #[test]
    fn rupee_beats_dollar() {
        let p = extract("Thing\nPrice: ₹100 (about $1.20)");
        assert_eq!(p.currency.as_deref(), Some("INR"));
    }

    #[test]
    fn inr_token_case_insensitive() {
        let p = extract("Thing\nPrice: inr 450");
        assert_eq!(p.currency.as_deref(), Some("INR"));
    }

    #[test]
    fn dollar_alone_is_usd() {
        let p = extract("Thing\nPrice: $42");
        assert_eq!(p.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn eur_token_last_in_precedence() {
        let p = extract("Thing\nPrice: eur 30");
        assert_eq!(p.currency.as_deref(), Some("EUR"));
        let p = extract("Thing\nPrice: EUR 30 or $33");
        assert_eq!(p.currency.as_deref(), Some("USD"));
    }

    #[test]
    fn no_marker_no_currency() {
        let p = extract("Thing\nWeighs 12 kg");
        assert_eq!(p.price, Some(12.0));
        assert_eq!(p.currency, None);
    }

    #[test]
    fn sku_label_variants() {
        assert_eq!(extract("X\nSKU: AB-1").sku.as_deref(), Some("AB-1"));
        assert_eq!(extract("X\nItem Code - IC_2").sku.as_deref(), Some("IC_2"));
        assert_eq!(extract("X\nCode X/3").sku.as_deref(), Some("X/3"));
        assert_eq!(extract("X\nModel No. M4").sku.as_deref(), Some("M4"));
    }

    #[test]
    fn sku_digits_also_match_as_price() {
        // The price pattern deliberately has no currency guard, so the digit
        // run inside the SKU is picked up as a price. Inherited looseness.
        let p = extract("Model No: ABC-123");
        assert_eq!(p.sku.as_deref(), Some("ABC-123"));
        assert_eq!(p.price, Some(123.0));
        assert_eq!(p.currency, None);
    }

    #[test]
    fn no_digits_no_price() {
        let p = extract("Plain thing\nNo numbers here");
        assert_eq!(p.price, None);
        assert_eq!(p.currency, None);
    }
}
