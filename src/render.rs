use crate::model::{Product, Template};

/// Render a validated product batch as a standalone HTML catalog page.
pub fn render_html(template: &Template, products: &[Product]) -> String {
    let mut items = String::new();
    for p in products {
        let price = p
            .price
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        items.push_str(&format!(
            concat!(
                "    <li style=\"margin-bottom:12px\">\n",
                "      <div><strong>{}</strong></div>\n",
                "      <div>SKU: {} | Price: {} {}</div>\n",
                "      <div><em>{}</em></div>\n",
                "    </li>\n",
            ),
            escape(p.name.as_deref().unwrap_or("Unnamed")),
            escape(p.sku.as_deref().unwrap_or("-")),
            price,
            escape(p.currency.as_deref().unwrap_or("")),
            escape(p.description.as_deref().unwrap_or("")),
        ));
    }

    format!(
        concat!(
            "<!doctype html>\n",
            "<html><head><meta charset=\"utf-8\"><title>Catalog</title></head>\n",
            "<body style=\"font-family:system-ui;max-width:800px;margin:24px auto\">\n",
            "<h1>{}</h1>\n",
            "<ul style=\"list-style:disc\">\n",
            "{}",
            "</ul>\n",
            "</body></html>\n",
        ),
        escape(&template.name),
        items,
    )
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

// ── Tests ──
