//! Segment sanitization for non-link lines.
//!
//! Link-like segments are flattened to inert text carrying their resolved
//! label; live link semantics survive a copy only at line granularity (see
//! [`crate::rewrite`]). Everything else is copied field by field with a
//! normalized `type`.

use serde_json::{Map, Value};

use crate::models::{Segment, Span};
use crate::sniff::{is_link_like_type, record_name, target_in};
use crate::store::RecordLookup;

/// Text written when a segment cannot be represented at all.
pub const UNCOPIED_SEGMENT: &str = "[Uncopied segment]";

fn trimmed(v: Option<&Value>) -> Option<String> {
    let s = v?.as_str()?.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// First non-empty string among `keys`, then among `nested_keys` of `obj`.
fn field_text(span: &Span, keys: &[&str], nested_keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| trimmed(span.fields.get(*k)))
        .or_else(|| {
            let obj = span.fields.get("obj")?.as_object()?;
            nested_keys.iter().find_map(|k| trimmed(obj.get(*k)))
        })
}

/// Label shown in place of a link segment.
///
/// Resolved record name, then URL, then label/title, then `"link"`.
fn link_display(span: &Span, lookup: &dyn RecordLookup) -> String {
    target_in(&span.fields, &["obj"])
        .and_then(|guid| record_name(lookup, &guid))
        .or_else(|| field_text(span, &["url", "href"], &["url", "href"]))
        .or_else(|| {
            field_text(
                span,
                &["text", "label", "title"],
                &["displayName", "name", "title"],
            )
        })
        .unwrap_or_else(|| "link".to_string())
}

fn stringify(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Read an object whose `type` is not a string as a span.
///
/// Falsy tags (`0`, `false`, `null`) leave the type unset; other scalars
/// are stringified. A nested object or array tag is unrepresentable.
fn span_from_object(obj: &Map<String, Value>) -> Option<Span> {
    let mut fields = obj.clone();
    let kind = match fields.remove("type") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => None,
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => None,
        Some(Value::String(s)) => Some(s),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Some(v.to_string()),
        Some(Value::Object(_) | Value::Array(_)) => return None,
    };
    Some(Span { kind, fields })
}

/// Convert one segment into a form safe to write to a destination.
///
/// Never fails: anything unrepresentable becomes [`UNCOPIED_SEGMENT`].
pub fn sanitize_segment(segment: &Segment, lookup: &dyn RecordLookup) -> Segment {
    let span = match segment {
        Segment::Span(span) => span.clone(),
        Segment::Opaque(Value::Object(obj)) => match span_from_object(obj) {
            Some(span) => span,
            None => return Segment::text(UNCOPIED_SEGMENT),
        },
        Segment::Opaque(v) => return Segment::text(stringify(v)),
    };

    let kind = span
        .kind
        .as_deref()
        .filter(|k| !k.is_empty())
        .unwrap_or("text")
        .to_lowercase();

    if is_link_like_type(&kind) {
        return Segment::text(link_display(&span, lookup));
    }

    let mut copy = span;
    if copy.kind.as_deref().map_or(true, str::is_empty) {
        copy.kind = Some("text".to_string());
    }
    if kind == "text" && matches!(copy.fields.get("text"), None | Some(Value::Null)) {
        copy.fields
            .insert("text".to_string(), Value::String(String::new()));
    }
    Segment::Span(copy)
}

/// Sanitize a whole segment list; an empty result becomes one empty text run.
pub fn sanitize_segments(segments: &[Segment], lookup: &dyn RecordLookup) -> Vec<Segment> {
    let out: Vec<Segment> = segments
        .iter()
        .map(|s| sanitize_segment(s, lookup))
        .collect();
    if out.is_empty() {
        vec![Segment::text("")]
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordInfo;
    use serde_json::json;

    fn lookup(guid: &str) -> Option<RecordInfo> {
        (guid == "R1").then(|| RecordInfo::new("R1", "Project X"))
    }

    #[test]
    fn test_link_segment_resolves_record_name() {
        let seg = Segment::span("link", json!({"recordGuid": "R1"}));
        assert_eq!(sanitize_segment(&seg, &lookup), Segment::text("Project X"));
    }

    #[test]
    fn test_link_segment_fallbacks() {
        let url = Segment::span("mention", json!({"guid": "nope", "href": "https://x.test"}));
        assert_eq!(sanitize_segment(&url, &lookup), Segment::text("https://x.test"));

        let labelled = Segment::span("ref", json!({"obj": {"name": "Nested name"}}));
        assert_eq!(sanitize_segment(&labelled, &lookup), Segment::text("Nested name"));

        let bare = Segment::span("LINKOBJ", json!({}));
        assert_eq!(sanitize_segment(&bare, &lookup), Segment::text("link"));
    }

    #[test]
    fn test_plain_segment_defaults() {
        let mut span = Span::default();
        span.fields.insert("bold".into(), json!(true));
        let out = sanitize_segment(&Segment::Span(span), &lookup);
        let out = out.as_span().unwrap();
        assert_eq!(out.kind.as_deref(), Some("text"));
        assert_eq!(out.fields["text"], json!(""));
        assert_eq!(out.fields["bold"], json!(true));
    }

    #[test]
    fn test_non_text_segment_kept() {
        let seg = Segment::span("code", json!({"text": "x = 1", "lang": {"name": "py"}}));
        assert_eq!(sanitize_segment(&seg, &lookup), seg);
    }

    #[test]
    fn test_primitive_segments_wrapped() {
        assert_eq!(
            sanitize_segment(&Segment::Opaque(json!(42)), &lookup),
            Segment::text("42")
        );
        assert_eq!(
            sanitize_segment(&Segment::Opaque(json!({"type": {"a": 1}})), &lookup),
            Segment::text(UNCOPIED_SEGMENT)
        );
        assert_eq!(sanitize_segments(&[], &lookup), vec![Segment::text("")]);
    }

    #[test]
    fn test_scalar_type_tag_normalized() {
        let out = sanitize_segment(&Segment::Opaque(json!({"type": 7, "text": "x"})), &lookup);
        let span = out.as_span().unwrap();
        assert_eq!(span.kind.as_deref(), Some("7"));
        assert_eq!(span.fields["text"], json!("x"));

        let out = sanitize_segment(&Segment::Opaque(json!({"type": false, "bold": true})), &lookup);
        let span = out.as_span().unwrap();
        assert_eq!(span.kind.as_deref(), Some("text"));
        assert_eq!(span.fields["text"], json!(""));
        assert_eq!(span.fields["bold"], json!(true));
    }

    #[test]
    fn test_deserialized_numeric_tag_keeps_text() {
        let seg: Segment = serde_json::from_value(json!({"type": 3, "text": "kept"})).unwrap();
        assert!(matches!(seg, Segment::Opaque(_)));
        assert_eq!(sanitize_segment(&seg, &lookup).str_field("text"), Some("kept"));
    }
}
