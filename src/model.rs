use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One structured catalog record. Every field is optional: the heuristics are
/// best-effort, and an all-absent record is a valid result, not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Named schema a batch of products is validated against before rendering.
///
/// `label_aliases` and `field_hints` are declared and persisted but not
/// consulted by the extraction heuristics, which use a fixed label set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default = "default_required")]
    pub required: Vec<String>,
    #[serde(default = "default_optional")]
    pub optional: Vec<String>,
    #[serde(default = "default_label_aliases")]
    pub label_aliases: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_field_hints")]
    pub field_hints: BTreeMap<String, serde_json::Value>,
}

impl Template {
    pub fn new(name: impl Into<String>) -> Self {
        Template {
            id: None,
            name: name.into(),
            required: default_required(),
            optional: default_optional(),
            label_aliases: default_label_aliases(),
            field_hints: default_field_hints(),
        }
    }
}

fn default_required() -> Vec<String> {
    vec!["name".to_string()]
}

fn default_optional() -> Vec<String> {
    ["sku", "price", "currency", "description"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_label_aliases() -> BTreeMap<String, Vec<String>> {
    let mut aliases = BTreeMap::new();
    aliases.insert(
        "sku".to_string(),
        ["SKU", "Item Code", "Code", "Model No."]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    aliases.insert(
        "price".to_string(),
        ["Price", "MRP", "List Price"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    aliases
}

fn default_field_hints() -> BTreeMap<String, serde_json::Value> {
    let mut hints = BTreeMap::new();
    hints.insert(
        "price_regex".to_string(),
        serde_json::json!(r"[0-9]+(?:\.[0-9]{1,2})?"),
    );
    hints.insert(
        "currency_whitelist".to_string(),
        serde_json::json!(["INR", "₹", "USD", "$", "EUR", "€"]),
    );
    hints
}

/// A single required-field violation: `row` indexes the record batch,
/// `field` names the missing required field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub row: usize,
    pub field: String,
}

/// Outcome of validating a record batch against a template. An empty report
/// is a pass; any violation rejects the whole batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

// ── Tests ──
