use crate::model::{Product, Template, ValidationReport, Violation};

/// Check a record batch against the template's required-field contract.
///
/// Records are visited in input order and required fields in the template's
/// declared order, so the report is deterministic. Any violation rejects the
/// whole batch; there is no partial pass.
pub fn validate(template: &Template, products: &[Product]) -> ValidationReport {
    let mut violations = Vec::new();
    for (row, product) in products.iter().enumerate() {
        for field in &template.required {
            if !is_satisfied(product, field) {
                violations.push(Violation {
                    row,
                    field: field.clone(),
                });
            }
        }
    }
    ValidationReport { violations }
}

/// String fields must be present and non-empty after trimming; price must be
/// present. A required field the record type does not carry is never
/// satisfied.
fn is_satisfied(product: &Product, field: &str) -> bool {
    match field {
        "name" => has_text(&product.name),
        "sku" => has_text(&product.sku),
        "currency" => has_text(&product.currency),
        "description" => has_text(&product.description),
        "price" => product.price.is_some(),
        _ => false,
    }
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Product {
        Product {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn all_present_passes() {
        let tpl = Template::new("catalog");
        let report = validate(&tpl, &[named("X"), named("Y")]);
        assert!(report.passed());
    }

    #[test]
    fn empty_name_is_a_violation() {
        let tpl = Template::new("catalog");
        let mut second = named("");
        second.sku = Some("s1".to_string());
        let report = validate(&tpl, &[named("X"), second]);
        assert_eq!(
            report.violations,
            vec![Violation { row: 1, field: "name".to_string() }]
        );
    }

    #[test]
    fn whitespace_only_is_absent() {
        let tpl = Template::new("catalog");
        let report = validate(&tpl, &[named("   ")]);
        assert!(!report.passed());
    }

    #[test]
    fn violations_ordered_by_row_then_declared_field() {
        let mut tpl = Template::new("strict");
        tpl.required = vec!["name".to_string(), "sku".to_string(), "price".to_string()];
        let complete = Product {
            name: Some("ok".into()),
            sku: Some("SK-1".into()),
            price: Some(1.0),
            ..Default::default()
        };
        let report = validate(&tpl, &[Product::default(), complete, named("n")]);
        let pairs: Vec<(usize, &str)> = report
            .violations
            .iter()
            .map(|v| (v.row, v.field.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![(0, "name"), (0, "sku"), (0, "price"), (2, "sku"), (2, "price")]
        );
    }

    #[test]
    fn price_required_checks_presence() {
        let mut tpl = Template::new("priced");
        tpl.required = vec!["price".to_string()];
        let mut p = named("X");
        assert!(!validate(&tpl, &[p.clone()]).passed());
        p.price = Some(0.0);
        assert!(validate(&tpl, std::slice::from_ref(&p)).passed());
    }

    #[test]
    fn unknown_required_field_never_satisfied() {
        let mut tpl = Template::new("odd");
        tpl.required = vec!["weight".to_string()];
        let report = validate(&tpl, &[named("X")]);
        assert_eq!(report.violations[0].field, "weight");
    }

    #[test]
    fn empty_batch_passes() {
        let tpl = Template::new("catalog");
        assert!(validate(&tpl, &[]).passed());
    }
}
