//! Core data models shared by the copy engine and the structure renderer.
//!
//! Host payloads are loosely typed: the same logical link can be stored on a
//! line's `props`, on a segment, or nested under `target` / `obj` objects,
//! depending on item type and host version. The types here keep the fields
//! the engine relies on as real struct fields and park everything else in an
//! explicit `extra` / `fields` bag so nothing is lost on a round trip.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Open, type-specific metadata attached to a line item or segment.
pub type Props = Map<String, Value>;

/// One node of a record's content tree.
///
/// `parent_guid` is an external reference, not an owned pointer: it may be
/// absent, dangling, or point at the line itself. Anything that does not
/// resolve to another line of the same snapshot is treated as "root".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Empty when the host gave none; such lines are never copied.
    #[serde(default)]
    pub guid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_guid: Option<String>,
    #[serde(rename = "type", default = "default_line_type")]
    pub kind: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<Props>,
    /// Results of host accessor methods (`getDisplayText`, `getLabel`, ...),
    /// captured when the snapshot was taken.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub accessors: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_status: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_style: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_size: Option<Value>,
    /// Unknown host fields (`label`, `target`, `record`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_line_type() -> String {
    "text".to_string()
}

impl LineItem {
    /// Builds a line with the given identity and no content.
    pub fn new(guid: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            parent_guid: None,
            kind: kind.into(),
            segments: Vec::new(),
            props: None,
            accessors: Map::new(),
            task_status: None,
            block_style: None,
            heading_size: None,
            extra: Map::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_guid = Some(parent.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.segments.push(Segment::text(text));
        self
    }

    pub fn with_segment(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    pub fn with_props(mut self, props: Value) -> Self {
        if let Value::Object(map) = props {
            self.props = Some(map);
        }
        self
    }

    /// Concatenated `text` fields of all segments, trimmed.
    pub fn plain_text(&self) -> String {
        self.segments
            .iter()
            .filter_map(|s| s.str_field("text"))
            .collect::<String>()
            .trim()
            .to_string()
    }

    /// Owned copy of the line's type, segments, and props.
    pub fn content(&self) -> LineContent {
        LineContent {
            kind: self.kind.clone(),
            segments: self.segments.clone(),
            props: self.props.clone(),
        }
    }

    /// Line-level metadata the host copies separately from content.
    pub fn meta(&self) -> LineMeta {
        LineMeta {
            task_status: self.task_status.clone(),
            block_style: self.block_style.clone(),
            heading_size: self.heading_size.clone(),
        }
    }
}

/// The writable content of a line, detached from its identity and position.
#[derive(Debug, Clone, PartialEq)]
pub struct LineContent {
    pub kind: String,
    pub segments: Vec<Segment>,
    pub props: Option<Props>,
}

/// An inline run within a line item.
///
/// Object-shaped segments deserialize to [`Segment::Span`]; anything else
/// (a bare string, a number, `null`) is kept verbatim as [`Segment::Opaque`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segment {
    Span(Span),
    Opaque(Value),
}

/// An object-shaped segment: an optional `type` tag plus every other field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Span {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Segment {
    /// A plain `text` segment.
    pub fn text(text: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("text".to_string(), Value::String(text.into()));
        Segment::Span(Span {
            kind: Some("text".to_string()),
            fields,
        })
    }

    /// A segment of the given type built from a JSON object of fields.
    pub fn span(kind: &str, fields: Value) -> Self {
        let fields = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Segment::Span(Span {
            kind: Some(kind.to_string()),
            fields,
        })
    }

    pub fn as_span(&self) -> Option<&Span> {
        match self {
            Segment::Span(span) => Some(span),
            Segment::Opaque(_) => None,
        }
    }

    /// The lowercase `type` tag, if this is a typed span.
    pub fn kind(&self) -> Option<String> {
        self.as_span()
            .and_then(|s| s.kind.as_deref())
            .map(str::to_lowercase)
    }

    /// A string-valued field (`text`, `label`, ...) of a span.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.as_span()
            .and_then(|s| s.fields.get(key))
            .and_then(Value::as_str)
    }
}

/// Host-level document: identity and display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordInfo {
    pub guid: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl RecordInfo {
    pub fn new(guid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            name: Some(name.into()),
        }
    }

    /// The record name, or `"Untitled"` when the host has none.
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => "Untitled".to_string(),
        }
    }
}

/// A record property as exposed by the host's typed accessors.
///
/// At most one accessor is expected to be populated, but hosts are not
/// consistent; [`Property::effective_value`] applies the priority order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Property {
    /// First non-null typed value in `datetime > date > number > choice > text > value` order.
    pub fn effective_value(&self) -> Option<PropertyValue> {
        if let Some(dt) = self.datetime {
            return Some(PropertyValue::DateTime(dt));
        }
        if let Some(d) = self.date {
            return Some(PropertyValue::Date(d));
        }
        if let Some(n) = self.number {
            return Some(PropertyValue::Number(n));
        }
        if let Some(c) = &self.choice {
            return Some(PropertyValue::Choice(c.clone()));
        }
        if let Some(t) = &self.text {
            return Some(PropertyValue::Text(t.clone()));
        }
        match &self.value {
            Some(Value::Null) | None => None,
            Some(v) => Some(PropertyValue::Raw(v.clone())),
        }
    }
}

/// A single typed property value written to a destination record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
    Number(f64),
    Choice(String),
    Text(String),
    Raw(Value),
}

/// Line metadata copied best-effort after a line is created.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineMeta {
    pub task_status: Option<Value>,
    pub block_style: Option<Value>,
    pub heading_size: Option<Value>,
}

impl LineMeta {
    pub fn is_empty(&self) -> bool {
        self.task_status.is_none() && self.block_style.is_none() && self.heading_size.is_none()
    }
}

/// A request to materialize one line in a destination record.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLine {
    pub parent: Option<String>,
    pub after: Option<String>,
    pub kind: String,
    pub segments: Vec<Segment>,
    pub props: Option<Props>,
}

impl NewLine {
    /// A root-level plain text line.
    pub fn text(after: Option<String>, text: impl Into<String>) -> Self {
        Self {
            parent: None,
            after,
            kind: "text".to_string(),
            segments: vec![Segment::text(text)],
            props: None,
        }
    }

    /// Plain text content of the request, for logging and guards.
    pub fn plain_text(&self) -> String {
        self.segments
            .iter()
            .filter_map(|s| s.str_field("text"))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_line_roundtrip_keeps_unknown_fields() {
        let raw = json!({
            "guid": "l1",
            "parent_guid": "l0",
            "type": "linkbtn",
            "segments": [{"type": "text", "text": "hi"}, "bare"],
            "label": "Open project",
            "target": {"guid": "r1", "name": "Project"}
        });
        let line: LineItem = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(line.kind, "linkbtn");
        assert_eq!(line.extra.get("label"), Some(&json!("Open project")));
        assert!(matches!(line.segments[1], Segment::Opaque(_)));
        assert_eq!(serde_json::to_value(&line).unwrap(), raw);
    }

    #[test]
    fn test_missing_type_defaults_to_text() {
        let line: LineItem = serde_json::from_value(json!({"guid": "a"})).unwrap();
        assert_eq!(line.kind, "text");
        assert!(line.segments.is_empty());
    }

    #[test]
    fn test_missing_guid_defaults_to_empty() {
        let line: LineItem = serde_json::from_value(json!({"type": "task", "segments": ["x"]})).unwrap();
        assert_eq!(line.guid, "");
        assert_eq!(line.kind, "task");
    }

    #[test]
    fn test_property_priority() {
        let p = Property {
            name: "Due".into(),
            number: Some(3.0),
            text: Some("three".into()),
            ..Default::default()
        };
        assert_eq!(p.effective_value(), Some(PropertyValue::Number(3.0)));

        let empty = Property {
            name: "Nothing".into(),
            value: Some(Value::Null),
            ..Default::default()
        };
        assert_eq!(empty.effective_value(), None);
    }

    #[test]
    fn test_display_name_fallback() {
        let r = RecordInfo {
            guid: "x".into(),
            name: Some("  ".into()),
        };
        assert_eq!(r.display_name(), "Untitled");
    }
}
