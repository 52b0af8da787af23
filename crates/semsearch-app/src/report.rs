//! Plain-text rendering of query results.

use serde_json::Value;

use semsearch_core::types::RetrievalHit;

/// What to print for each hit.
#[derive(Debug, Clone)]
pub struct ReportLayout {
    /// Metadata keys shown on the header line.
    pub fields: Vec<String>,
    /// Metadata key whose text is previewed.
    pub text_field: String,
    pub preview_chars: usize,
}

/// Render one query and its ranked hits.
pub fn render_query(query: &str, hits: &[RetrievalHit], layout: &ReportLayout) -> String {
    let mut out = format!("\nQuery: {query}\n");
    if hits.is_empty() {
        out.push_str("  (no results)\n");
    }
    for (i, hit) in hits.iter().enumerate() {
        out.push_str(&render_hit(i + 1, hit, layout));
    }
    out
}

/// Render a single hit as a header line plus an indented preview.
pub fn render_hit(rank: usize, hit: &RetrievalHit, layout: &ReportLayout) -> String {
    let fields = layout
        .fields
        .iter()
        .map(|key| format!("{key}: {}", display_value(hit.field(key))))
        .collect::<Vec<_>>()
        .join(", ");

    let mut header = format!("  {rank}. [Score: {:.3}]", hit.score);
    if !fields.is_empty() {
        header.push(' ');
        header.push_str(&fields);
    }

    let text = hit.text(&layout.text_field).unwrap_or_default();
    format!("{header}\n     {}\n\n", preview(text, layout.preview_chars))
}

/// The first `max_chars` characters of `text`, with an ellipsis when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semsearch_core::types::{Metadata, RecordId};
    use serde_json::json;

    fn hit(score: f64, metadata: Value) -> RetrievalHit {
        let metadata: Metadata = match metadata {
            Value::Object(map) => map,
            _ => panic!("metadata must be an object"),
        };
        RetrievalHit {
            record_id: RecordId::new(0),
            score,
            metadata,
        }
    }

    fn layout() -> ReportLayout {
        ReportLayout {
            fields: vec!["overall".to_string(), "reviewerName".to_string()],
            text_field: "reviewText".to_string(),
            preview_chars: 10,
        }
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("exactly ten", 11), "exactly ten");
        assert_eq!(preview("héllo wörld again", 7), "héllo w...");
        assert_eq!(preview("  padded  ", 10), "padded");
    }

    #[test]
    fn test_render_hit() {
        let h = hit(
            0.51234,
            json!({"reviewText": "Works well on Windows 10", "overall": 5.0, "reviewerName": "Ann"}),
        );
        let rendered = render_hit(1, &h, &layout());
        assert_eq!(
            rendered,
            "  1. [Score: 0.512] overall: 5.0, reviewerName: Ann\n     Works well...\n\n"
        );
    }

    #[test]
    fn test_render_hit_missing_fields() {
        let h = hit(0.0, json!({"overall": null}));
        let rendered = render_hit(3, &h, &layout());
        assert!(rendered.starts_with("  3. [Score: 0.000] overall: -, reviewerName: -\n"));
    }

    #[test]
    fn test_render_query_without_hits() {
        let rendered = render_query("anything", &[], &layout());
        assert!(rendered.contains("Query: anything"));
        assert!(rendered.contains("(no results)"));
    }
}
