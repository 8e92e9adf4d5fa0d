//! One-line text summaries for nodes the destination refuses to create.
//!
//! A summary is the last rung of the line creation ladder. It is indented
//! two spaces per tree depth and tagged with `(src:<type>)` so a reader of
//! the copy can see which node degraded.

use serde_json::Value;
use tracing::warn;

use crate::copy::CopyContext;
use crate::models::{LineItem, Segment};
use crate::sniff::{
    extract_any_display_text, extract_display_text_from_line, extract_link_target,
    extract_link_text, is_link_like_type, looks_like_identifier, record_name, Payload,
};

/// Placeholder some hosts put in segment text where a linked name belongs.
pub const LINK_TOKEN: &str = "[link]";

/// Base text used when a non-link line has nothing readable.
pub const UNCOPIABLE_LINE: &str = "[uncopiable line]";

/// Two spaces per level.
pub fn indent_prefix(depth: usize) -> String {
    "  ".repeat(depth)
}

fn is_container(kind: &str) -> bool {
    matches!(kind, "document" | "app")
}

fn segment_summary_text(segment: &Segment) -> String {
    let Some(span) = segment.as_span() else {
        return String::new();
    };
    let direct = ["text", "label", "title"].iter().find_map(|k| {
        let s = span.fields.get(*k)?.as_str()?.trim();
        (!s.is_empty()).then(|| s.to_string())
    });
    direct
        .or_else(|| {
            let obj = span.fields.get("obj")?.as_object()?;
            ["displayName", "title", "name"]
                .iter()
                .find_map(|k| obj.get(*k).and_then(Value::as_str))
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_default()
}

fn usable(candidate: Option<String>) -> Option<String> {
    candidate.filter(|s| !looks_like_identifier(s))
}

/// A token replacement must not itself contain the token.
fn usable_replacement(candidate: Option<String>) -> Option<String> {
    usable(candidate).filter(|s| !s.contains(LINK_TOKEN))
}

/// Replace every [`LINK_TOKEN`] in `text` with the best available name.
///
/// Source line display text, then the target record's name, then link
/// text, then any display text. Left unchanged when nothing resolves.
pub fn replace_link_token(
    text: &str,
    payload: &Payload<'_>,
    ctx: &CopyContext<'_>,
    source: &LineItem,
) -> String {
    if !text.contains(LINK_TOKEN) {
        return text.to_string();
    }
    let replacement = usable_replacement(extract_display_text_from_line(source))
        .or_else(|| {
            let target = extract_link_target(payload.segments, payload.props)?;
            usable_replacement(record_name(ctx.lookup, &target))
        })
        .or_else(|| usable_replacement(extract_link_text(payload)))
        .or_else(|| {
            usable_replacement(extract_any_display_text(payload.segments, payload.props))
        });
    match replacement {
        Some(r) => text.replace(LINK_TOKEN, &r),
        None => text.to_string(),
    }
}

/// Name for a link line whose own text resolved to nothing.
fn link_fallback(payload: &Payload<'_>, ctx: &CopyContext<'_>, source: &LineItem) -> String {
    let target = extract_link_target(payload.segments, payload.props);
    let points_at_source = target.as_deref() == Some(ctx.source_guid.as_str());
    let not_self_name = |name: &String| points_at_source || *name != ctx.source_name;

    if let Some(name) = target
        .as_deref()
        .and_then(|t| usable(record_name(ctx.lookup, t)))
        .filter(not_self_name)
    {
        return name;
    }
    if let Some(text) = usable(extract_display_text_from_line(source)).filter(not_self_name) {
        return text;
    }
    if let Some(text) = usable(extract_link_text(payload)) {
        return text;
    }
    if let Some(text) = usable(extract_any_display_text(payload.segments, payload.props)) {
        return text;
    }
    if let Some(t) = target {
        return format!("[link → {}]", t);
    }
    warn!(
        line = %source.guid,
        line_type = %payload.kind,
        "no display text found for link line"
    );
    LINK_TOKEN.to_string()
}

/// Summarize a line as plain text.
///
/// Returns `None` only for an empty `document`/`app` container, which is
/// skipped rather than stubbed.
pub fn summarize(
    payload: &Payload<'_>,
    depth: usize,
    ctx: &CopyContext<'_>,
    source: &LineItem,
) -> Option<String> {
    let kind = payload.kind.to_lowercase();
    let link_like = is_link_like_type(&kind);

    let joined: String = payload.segments.iter().map(segment_summary_text).collect();
    let mut text = replace_link_token(&joined, payload, ctx, source)
        .trim()
        .to_string();
    if link_like && looks_like_identifier(&text) {
        text.clear();
    }

    let base = if !text.is_empty() {
        text
    } else if is_container(&kind) {
        return None;
    } else if link_like {
        link_fallback(payload, ctx, source)
    } else {
        UNCOPIABLE_LINE.to_string()
    };

    Some(format!(
        "{}{} (src:{})",
        indent_prefix(depth),
        base,
        payload.kind
    ))
}
