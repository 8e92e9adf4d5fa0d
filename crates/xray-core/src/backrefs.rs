//! Backreference resolution: which records link to a given record.
//!
//! The host's native backreference query is preferred. When it is absent
//! or comes back empty and the host can enumerate records, every other
//! record is scanned for a link-like line or segment pointing at the
//! target. The result is deduplicated by identifier, filtered, and sorted
//! by name so output is deterministic.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{LineItem, RecordInfo, Segment};
use crate::sniff::{is_link_like_type, target_in};
use crate::store::RecordStore;

/// Maximum characters kept for a scan hit's context preview.
pub const PREVIEW_CHARS: usize = 50;

/// Shown for a backreferencing record that has no name.
pub const UNKNOWN_RECORD: &str = "Unknown Record";

/// One record linking to the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Backreference {
    pub guid: String,
    pub name: Option<String>,
    /// Text of the first matching line, when found by scanning.
    pub preview: Option<String>,
}

impl Backreference {
    fn from_record(info: RecordInfo) -> Self {
        Self {
            guid: info.guid,
            name: info.name,
            preview: None,
        }
    }

    /// The record name, or `fallback` when the host reports none.
    pub fn name_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        match self.name.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n,
            _ => fallback,
        }
    }
}

fn segment_points_at(segment: &Segment, target: &str) -> bool {
    let Some(span) = segment.as_span() else {
        return false;
    };
    let link_like = span.kind.as_deref().is_some_and(is_link_like_type);
    link_like && target_in(&span.fields, &["target", "obj"]).as_deref() == Some(target)
}

/// True when `line` carries a link to record `target`.
///
/// A link-like line matches on its props; any line matches on a link-like
/// segment.
pub fn line_points_at(line: &LineItem, target: &str) -> bool {
    let by_props = is_link_like_type(&line.kind)
        && line
            .props
            .as_ref()
            .and_then(|p| target_in(p, &["target", "obj"]))
            .as_deref()
            == Some(target);
    by_props || line.segments.iter().any(|s| segment_points_at(s, target))
}

fn preview_of(line: &LineItem) -> Option<String> {
    let text: String = line
        .segments
        .iter()
        .filter_map(|s| s.str_field("text"))
        .collect();
    let text: String = text.trim().chars().take(PREVIEW_CHARS).collect();
    (!text.is_empty()).then_some(text)
}

/// Records the host itself reports as linking to `record`.
pub async fn native_backreferences(store: &dyn RecordStore, record: &str) -> Vec<Backreference> {
    match store.backreference_records(record).await {
        Ok(Some(records)) => records
            .into_iter()
            .filter(|r| !r.guid.is_empty())
            .map(Backreference::from_record)
            .collect(),
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!(record, error = %e, "native backreference query failed");
            Vec::new()
        }
    }
}

/// Scan every other record for a link to `target`.
///
/// One entry per referencing record, carrying the first matching line's
/// text as a preview. Records whose lines cannot be read are skipped.
pub async fn scan_backreferences(store: &dyn RecordStore, target: &str) -> Vec<Backreference> {
    let Some(records) = store.all_records() else {
        return Vec::new();
    };
    let mut found = Vec::new();
    for info in records {
        if info.guid.is_empty() || info.guid == target {
            continue;
        }
        let lines = match store.line_items(&info.guid).await {
            Ok(lines) => lines,
            Err(e) => {
                debug!(record = %info.guid, error = %e, "skipping unreadable record");
                continue;
            }
        };
        if let Some(hit) = lines.iter().find(|l| line_points_at(l, target)) {
            found.push(Backreference {
                preview: preview_of(hit),
                ..Backreference::from_record(info)
            });
        }
    }
    found
}

/// Order by displayed name: case-insensitive, then case-sensitive, then
/// discovery order. Unnamed records sort as `fallback`.
pub fn sort_by_display_name(refs: &mut [Backreference], fallback: &str) {
    refs.sort_by(|a, b| {
        let (a, b) = (a.name_or(fallback), b.name_or(fallback));
        a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
    });
}

/// Deduplicated, name-sorted backreferences of `record`, minus `exclude`.
///
/// Native query first, scan fallback when that yields nothing. Sorted with
/// [`sort_by_display_name`], unnamed records as [`UNKNOWN_RECORD`].
pub async fn resolve_backreferences(
    store: &dyn RecordStore,
    record: &str,
    exclude: Option<&str>,
) -> Vec<Backreference> {
    let mut found = native_backreferences(store, record).await;
    if found.is_empty() {
        found = scan_backreferences(store, record).await;
    }

    let mut seen = HashSet::new();
    found.retain(|b| Some(b.guid.as_str()) != exclude && seen.insert(b.guid.clone()));
    sort_by_display_name(&mut found, UNKNOWN_RECORD);
    found
}
