//! Shape-sniffing over loosely typed host payloads.
//!
//! Link payloads differ by item type and host version: the target may sit
//! on `props`, on `props.target`, on `props.obj`, on a segment, or on a
//! segment's `obj`. None of them carries a reliable display label. Every
//! resolver here is a *ladder*: an ordered list of pure probes, tried in
//! sequence until one yields a usable string.
//!
//! Two rules hold for every display ladder:
//!
//! - A candidate is trimmed and must be non-empty.
//! - A candidate that [`looks_like_identifier`] is never returned as a label.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::models::{LineItem, Props, Segment};
use crate::store::RecordLookup;

/// Keys that may carry a link target identifier, in lookup priority order.
pub const LINK_TARGET_KEYS: [&str; 6] = [
    "recordGuid",
    "targetGuid",
    "recordId",
    "targetId",
    "guid",
    "id",
];

const LINK_LIKE_TYPES: [&str; 5] = ["linkbtn", "link", "linkobj", "ref", "mention"];

/// Structural keys never treated as display text on a line.
const LINE_STRUCTURAL_KEYS: [&str; 4] = ["guid", "id", "parent_guid", "type"];

/// Host accessor names probed on a line, in order.
const LINE_ACCESSORS: [&str; 10] = [
    "getDisplayText",
    "getLabel",
    "getTitle",
    "getText",
    "getContent",
    "getPlainText",
    "toText",
    "getLinkText",
    "getLinkLabel",
    "getDisplayLabel",
];

const LINE_DISPLAY_KEYS: [&str; 8] = [
    "label",
    "title",
    "text",
    "name",
    "displayText",
    "content",
    "caption",
    "linkText",
];

const ANY_SKIP_KEYS: [&str; 14] = [
    "type",
    "guid",
    "id",
    "recordGuid",
    "targetGuid",
    "recordId",
    "targetId",
    "parent_guid",
    "self",
    "value",
    "datetime",
    "date",
    "number",
    "choice",
];

const ANY_DISPLAY_KEYS: [&str; 7] = [
    "text",
    "label",
    "title",
    "name",
    "displayName",
    "content",
    "caption",
];

const NON_DISPLAY_TOKENS: [&str; 8] = [
    "link-icons",
    "table",
    "linkbtn",
    "link",
    "linkobj",
    "ref",
    "mention",
    "text",
];

const ANY_MAX_DEPTH: usize = 3;
const ANY_MAX_CHARS: usize = 300;

/// A resolution step: inspect a payload, maybe produce a string.
pub type Probe<T> = fn(&T) -> Option<String>;

/// Run `probes` in order and return the first hit.
pub fn first_hit<T>(probes: &[Probe<T>], input: &T) -> Option<String> {
    probes.iter().find_map(|probe| probe(input))
}

/// The content half of a line: its type tag, segments, and props.
#[derive(Debug, Clone, Copy)]
pub struct Payload<'a> {
    pub kind: &'a str,
    pub segments: &'a [Segment],
    pub props: Option<&'a Props>,
}

impl<'a> Payload<'a> {
    pub fn new(kind: &'a str, segments: &'a [Segment], props: Option<&'a Props>) -> Self {
        Self {
            kind,
            segments,
            props,
        }
    }

    pub fn of(line: &'a LineItem) -> Self {
        Self::new(&line.kind, &line.segments, line.props.as_ref())
    }
}

/// True when `s` reads as an opaque identifier rather than a label.
///
/// Requires at least 12 trimmed characters and either a hex-with-dashes
/// shape of 20+ characters or a pure alphanumeric run of 14+.
pub fn looks_like_identifier(s: &str) -> bool {
    static HEX_DASHED: OnceLock<Regex> = OnceLock::new();
    static ALNUM: OnceLock<Regex> = OnceLock::new();

    let t = s.trim();
    if t.chars().count() < 12 {
        return false;
    }
    let hex = HEX_DASHED.get_or_init(|| Regex::new(r"(?i)^[0-9a-f-]{20,}$").unwrap());
    let alnum = ALNUM.get_or_init(|| Regex::new(r"^[0-9A-Za-z]{14,}$").unwrap());
    hex.is_match(t) || alnum.is_match(t)
}

/// Case-insensitive membership in the link-like type set.
pub fn is_link_like_type(kind: &str) -> bool {
    let k = kind.to_lowercase();
    LINK_LIKE_TYPES.contains(&k.as_str())
}

/// A trimmed, non-empty, non-identifier string.
fn label(v: Option<&Value>) -> Option<String> {
    let s = v?.as_str()?.trim();
    (!s.is_empty() && !looks_like_identifier(s)).then(|| s.to_string())
}

/// First usable label among `keys` of `obj`.
fn label_at(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| label(obj.get(*k)))
}

/// First usable label among `keys` of the object nested under `nested`.
fn nested_label(obj: &Map<String, Value>, nested: &str, keys: &[&str]) -> Option<String> {
    obj.get(nested)
        .and_then(Value::as_object)
        .and_then(|inner| label_at(inner, keys))
}

/// A truthy identifier value: a non-empty string or a non-zero number.
fn id_value(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        _ => None,
    }
}

fn id_at(obj: &Map<String, Value>) -> Option<String> {
    LINK_TARGET_KEYS
        .iter()
        .find_map(|k| obj.get(*k).and_then(id_value))
}

/// Link target on `obj` itself, then on each object named in `nested`.
pub fn target_in(obj: &Map<String, Value>, nested: &[&str]) -> Option<String> {
    id_at(obj).or_else(|| {
        nested.iter().find_map(|n| {
            obj.get(*n)
                .and_then(Value::as_object)
                .and_then(id_at)
        })
    })
}

/// Link target of a single segment (direct keys, then `obj`).
pub fn segment_target(segment: &Segment) -> Option<String> {
    segment.as_span().and_then(|s| target_in(&s.fields, &["obj"]))
}

/// Link target identifier of a line's content.
///
/// Props first (direct, `target`, `obj`), then each segment (direct, `obj`).
pub fn extract_link_target(segments: &[Segment], props: Option<&Props>) -> Option<String> {
    props
        .and_then(|p| target_in(p, &["target", "obj"]))
        .or_else(|| segments.iter().find_map(segment_target))
}

/// Name of the record `guid` resolves to, rejecting identifier-shaped names.
pub fn record_name(lookup: &dyn RecordLookup, guid: &str) -> Option<String> {
    let rec = lookup.lookup(guid)?;
    label(rec.name.map(Value::String).as_ref())
}

// ─── Line display ladder ────────────────────────────────────────────

fn line_from_accessors(line: &LineItem) -> Option<String> {
    label_at(&line.accessors, &LINE_ACCESSORS)
}

fn line_from_target_object(line: &LineItem) -> Option<String> {
    let target = ["target", "targetRecord", "record"]
        .iter()
        .find_map(|k| line.extra.get(*k).and_then(Value::as_object))?;
    label_at(target, &["name", "title", "displayName"])
}

fn line_from_display_fields(line: &LineItem) -> Option<String> {
    label_at(&line.extra, &LINE_DISPLAY_KEYS)
}

fn line_from_spaced_field(line: &LineItem) -> Option<String> {
    line.extra
        .iter()
        .filter(|(k, _)| !LINE_STRUCTURAL_KEYS.contains(&k.as_str()))
        .find_map(|(_, v)| label(Some(v)).filter(|s| s.chars().any(char::is_whitespace)))
}

fn line_from_content(line: &LineItem) -> Option<String> {
    extract_any_display_text(&line.segments, line.props.as_ref())
}

const LINE_LADDER: [Probe<LineItem>; 5] = [
    line_from_accessors,
    line_from_target_object,
    line_from_display_fields,
    line_from_spaced_field,
    line_from_content,
];

/// Best-effort display text for a whole line item.
pub fn extract_display_text_from_line(line: &LineItem) -> Option<String> {
    first_hit(&LINE_LADDER, line)
}

// ─── Link text ladder ───────────────────────────────────────────────

fn link_text_from_segments(p: &Payload<'_>) -> Option<String> {
    const SEG_KEYS: [&str; 7] = ["text", "label", "title", "displayName", "content", "url", "href"];
    const OBJ_KEYS: [&str; 5] = ["displayName", "title", "name", "url", "href"];
    p.segments.iter().filter_map(Segment::as_span).find_map(|s| {
        label_at(&s.fields, &SEG_KEYS).or_else(|| nested_label(&s.fields, "obj", &OBJ_KEYS))
    })
}

fn link_text_from_props_display(p: &Payload<'_>) -> Option<String> {
    label_at(p.props?, &["label", "text", "displayText", "name", "title"])
}

fn link_text_from_props_url(p: &Payload<'_>) -> Option<String> {
    label_at(
        p.props?,
        &["url", "href", "link", "permalink", "openUrl", "targetUrl", "to"],
    )
}

fn link_text_from_props_target(p: &Payload<'_>) -> Option<String> {
    nested_label(
        p.props?,
        "target",
        &["title", "name", "displayName", "url", "href", "openUrl", "targetUrl"],
    )
}

fn link_text_from_props_obj(p: &Payload<'_>) -> Option<String> {
    nested_label(
        p.props?,
        "obj",
        &["displayName", "title", "name", "url", "href", "openUrl", "targetUrl"],
    )
}

/// A probe over a borrowed payload, generic in the payload's lifetime.
type PayloadProbe = fn(&Payload<'_>) -> Option<String>;

const LINK_TEXT_LADDER: [PayloadProbe; 5] = [
    link_text_from_segments,
    link_text_from_props_display,
    link_text_from_props_url,
    link_text_from_props_target,
    link_text_from_props_obj,
];

/// Display text carried by a link-like line's own content.
///
/// Returns `None` for non-link types.
pub fn extract_link_text(payload: &Payload<'_>) -> Option<String> {
    if !is_link_like_type(payload.kind) {
        return None;
    }
    LINK_TEXT_LADDER.iter().find_map(|probe| probe(payload))
}

// ─── Generic scan ───────────────────────────────────────────────────

struct Candidate {
    value: String,
    preferred: bool,
}

fn collect_map(obj: &Map<String, Value>, depth: usize, out: &mut Vec<Candidate>) {
    if depth > ANY_MAX_DEPTH {
        return;
    }
    for (k, v) in obj {
        if ANY_SKIP_KEYS.contains(&k.as_str()) {
            continue;
        }
        match v {
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() || s.chars().count() > ANY_MAX_CHARS {
                    continue;
                }
                if looks_like_identifier(s) || s.chars().all(|c| c.is_ascii_digit()) {
                    continue;
                }
                if NON_DISPLAY_TOKENS.contains(&s.to_lowercase().as_str()) {
                    continue;
                }
                let preferred = ANY_DISPLAY_KEYS.contains(&k.as_str())
                    || s.chars().any(char::is_whitespace);
                out.push(Candidate {
                    value: s.to_string(),
                    preferred,
                });
            }
            Value::Object(_) | Value::Array(_) => collect_value(v, depth + 1, out),
            _ => {}
        }
    }
}

fn collect_value(v: &Value, depth: usize, out: &mut Vec<Candidate>) {
    if depth > ANY_MAX_DEPTH {
        return;
    }
    match v {
        Value::Object(obj) => collect_map(obj, depth, out),
        Value::Array(items) => {
            for item in items {
                collect_value(item, depth + 1, out);
            }
        }
        _ => {}
    }
}

/// Last-resort scan for anything that reads like display text.
///
/// Walks segments and props up to three levels deep. Prefers a value found
/// under a display key or containing whitespace; otherwise the first found.
pub fn extract_any_display_text(segments: &[Segment], props: Option<&Props>) -> Option<String> {
    let mut candidates = Vec::new();
    for seg in segments {
        match seg {
            Segment::Span(span) => collect_map(&span.fields, 1, &mut candidates),
            Segment::Opaque(v) => collect_value(v, 1, &mut candidates),
        }
    }
    if let Some(p) = props {
        collect_map(p, 0, &mut candidates);
    }
    let pick = candidates
        .iter()
        .position(|c| c.preferred)
        .unwrap_or(0);
    candidates.into_iter().nth(pick).map(|c| c.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordInfo;
    use serde_json::json;

    fn props(v: Value) -> Props {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_identifier_shapes() {
        assert!(looks_like_identifier("3f2a9c4e-1b7d-4e0f-9a8b-112233445566"));
        assert!(looks_like_identifier("AbCdEf0123456789"));
        assert!(!looks_like_identifier("Project X"));
        assert!(!looks_like_identifier("short"));
        assert!(!looks_like_identifier("abc-def-123"));
        assert!(!looks_like_identifier("   "));
    }

    #[test]
    fn test_link_like_types_case_insensitive() {
        assert!(is_link_like_type("LinkBtn"));
        assert!(is_link_like_type("mention"));
        assert!(!is_link_like_type("document"));
        assert!(!is_link_like_type(""));
    }

    #[test]
    fn test_target_search_order_props_before_segments() {
        let p = props(json!({"target": {"guid": "P-TARGET"}}));
        let segs = vec![Segment::span("link", json!({"recordGuid": "S-TARGET"}))];
        assert_eq!(
            extract_link_target(&segs, Some(&p)).as_deref(),
            Some("P-TARGET")
        );
        assert_eq!(extract_link_target(&segs, None).as_deref(), Some("S-TARGET"));
    }

    #[test]
    fn test_target_key_priority_and_truthiness() {
        let p = props(json!({"id": "fallback", "recordGuid": "", "targetGuid": "primary"}));
        assert_eq!(extract_link_target(&[], Some(&p)).as_deref(), Some("primary"));

        let seg = Segment::span("ref", json!({"obj": {"guid": "nested"}}));
        assert_eq!(segment_target(&seg).as_deref(), Some("nested"));
    }

    #[test]
    fn test_line_display_ladder_order() {
        let mut line = LineItem::new("l1", "linkbtn");
        line.extra.insert("label".into(), json!("From label"));
        line.extra
            .insert("target".into(), json!({"name": "From target"}));
        assert_eq!(
            extract_display_text_from_line(&line).as_deref(),
            Some("From target")
        );

        line.accessors
            .insert("getLabel".into(), json!("From accessor"));
        assert_eq!(
            extract_display_text_from_line(&line).as_deref(),
            Some("From accessor")
        );
    }

    #[test]
    fn test_line_display_rejects_identifiers() {
        let mut line = LineItem::new("l1", "linkbtn");
        line.extra
            .insert("label".into(), json!("0123456789abcdef0123"));
        line.extra.insert("note".into(), json!("Weekly review"));
        assert_eq!(
            extract_display_text_from_line(&line).as_deref(),
            Some("Weekly review")
        );
    }

    #[test]
    fn test_link_text_only_for_link_types() {
        let segs = vec![Segment::span("text", json!({"text": "hello"}))];
        assert!(extract_link_text(&Payload::new("text", &segs, None)).is_none());
        assert_eq!(
            extract_link_text(&Payload::new("link", &segs, None)).as_deref(),
            Some("hello")
        );
    }

    #[test]
    fn test_link_text_falls_through_to_props() {
        let segs = vec![Segment::span("link", json!({"guid": "AbCdEf0123456789"}))];
        let p = props(json!({"obj": {"url": "https://example.com/x"}}));
        assert_eq!(
            extract_link_text(&Payload::new("link", &segs, Some(&p))).as_deref(),
            Some("https://example.com/x")
        );
    }

    #[test]
    fn test_any_display_prefers_display_keys_and_spaces() {
        let p = props(json!({
            "icon": "star",
            "meta": {"caption": "Quarterly plan"},
            "table": "table"
        }));
        assert_eq!(
            extract_any_display_text(&[], Some(&p)).as_deref(),
            Some("Quarterly plan")
        );

        let bare = props(json!({"icon": "star", "n": "42"}));
        assert_eq!(extract_any_display_text(&[], Some(&bare)).as_deref(), Some("star"));
    }

    #[test]
    fn test_any_display_depth_bound() {
        let p = props(json!({"a": {"b": {"c": {"d": {"title": "too deep"}}}}}));
        assert!(extract_any_display_text(&[], Some(&p)).is_none());
    }

    #[test]
    fn test_record_name_rejects_identifier_names() {
        let lookup = |g: &str| match g {
            "r1" => Some(RecordInfo::new("r1", "Project X")),
            "r2" => Some(RecordInfo::new("r2", "AbCdEf0123456789")),
            _ => None,
        };
        assert_eq!(record_name(&lookup, "r1").as_deref(), Some("Project X"));
        assert!(record_name(&lookup, "r2").is_none());
        assert!(record_name(&lookup, "missing").is_none());
    }
}
