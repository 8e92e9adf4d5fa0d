//! Line creation with a degrading fallback ladder.
//!
//! | Rung | Request | On failure |
//! |------|---------|------------|
//! | 1 | full fidelity: type, segments, props | rung 2 |
//! | 2 | same, props dropped | rung 3 |
//! | 3 | one `text` line holding a [`summarize`] result | drop |
//!
//! A host failure is either an error or a declined (`Ok(None)`) creation;
//! both move down one rung. Every line that does not land on rung 1 emits
//! exactly one [`Degradation`].

use serde::Serialize;
use tracing::{debug, warn};

use crate::copy::CopyContext;
use crate::models::{LineItem, NewLine, Segment};
use crate::sniff::{is_link_like_type, Payload};
use crate::store::RecordStore;
use crate::summary::summarize;

/// How faithfully a created line reproduces its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fidelity {
    Full,
    WithoutProps,
    Summary,
}

/// The fallback tier a degraded line ended on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Created after dropping props.
    WithoutProps,
    /// Replaced by a plain-text summary line.
    Summary,
    /// Empty `document`/`app` container, intentionally not represented.
    Skipped,
    /// Every rung failed.
    Dropped,
}

/// One degraded line, as seen by a test harness or log reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Degradation {
    pub line: String,
    pub line_type: String,
    pub depth: usize,
    pub tier: Tier,
}

impl Degradation {
    fn trace(&self) {
        match self.tier {
            Tier::WithoutProps | Tier::Summary | Tier::Skipped => debug!(
                line = %self.line,
                line_type = %self.line_type,
                depth = self.depth,
                tier = ?self.tier,
                "line degraded"
            ),
            Tier::Dropped => warn!(
                line = %self.line,
                line_type = %self.line_type,
                depth = self.depth,
                "line dropped after all fallbacks failed"
            ),
        }
    }
}

/// Result of one pass down the ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Created { id: String, fidelity: Fidelity },
    Skipped,
    Dropped,
}

impl LineOutcome {
    /// Identifier of the created line, if any.
    pub fn id(&self) -> Option<&str> {
        match self {
            LineOutcome::Created { id, .. } => Some(id),
            _ => None,
        }
    }
}

async fn attempt(store: &dyn RecordStore, record: &str, request: &NewLine, rung: u8) -> Option<String> {
    match store.create_line_item(record, request).await {
        Ok(Some(id)) => Some(id),
        Ok(None) => {
            debug!(rung, line_type = %request.kind, "host declined line creation");
            None
        }
        Err(e) => {
            debug!(rung, line_type = %request.kind, error = %e, "line creation failed");
            None
        }
    }
}

/// Materialize `request` in `record`, falling back as needed.
///
/// `source` is the untouched source line; it only feeds the summary text,
/// and for link-like lines it replaces the rewritten payload entirely.
/// Degradations are appended to `events` and mirrored to `tracing`.
pub async fn create_line(
    store: &dyn RecordStore,
    record: &str,
    mut request: NewLine,
    depth: usize,
    ctx: &CopyContext<'_>,
    source: &LineItem,
    events: &mut Vec<Degradation>,
) -> LineOutcome {
    let mut degrade = |tier: Tier| {
        let event = Degradation {
            line: source.guid.clone(),
            line_type: source.kind.clone(),
            depth,
            tier,
        };
        event.trace();
        events.push(event);
    };

    if let Some(id) = attempt(store, record, &request, 1).await {
        return LineOutcome::Created {
            id,
            fidelity: Fidelity::Full,
        };
    }

    let props = request.props.take();
    if let Some(id) = attempt(store, record, &request, 2).await {
        degrade(Tier::WithoutProps);
        return LineOutcome::Created {
            id,
            fidelity: Fidelity::WithoutProps,
        };
    }

    // Link lines name what the source pointed at, not the retargeted copy.
    let payload = if is_link_like_type(&source.kind) {
        Payload::of(source)
    } else {
        Payload::new(&request.kind, &request.segments, props.as_ref())
    };
    let Some(text) = summarize(&payload, depth, ctx, source) else {
        degrade(Tier::Skipped);
        return LineOutcome::Skipped;
    };

    let summary = NewLine {
        parent: request.parent.clone(),
        after: request.after.clone(),
        kind: "text".to_string(),
        segments: vec![Segment::text(text)],
        props: None,
    };
    match attempt(store, record, &summary, 3).await {
        Some(id) => {
            degrade(Tier::Summary);
            LineOutcome::Created {
                id,
                fidelity: Fidelity::Summary,
            }
        }
        None => {
            degrade(Tier::Dropped);
            LineOutcome::Dropped
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordInfo;
    use crate::store::memory::InMemoryWorkspace;
    use anyhow::bail;
    use serde_json::json;

    static LOOKUP: fn(&str) -> Option<RecordInfo> = |_| None;

    fn ctx() -> CopyContext<'static> {
        CopyContext {
            source_guid: "SRC".into(),
            source_name: "Source".into(),
            dest_guid: "DST".into(),
            lookup: &LOOKUP,
        }
    }

    fn request(line: &LineItem) -> NewLine {
        NewLine {
            parent: None,
            after: None,
            kind: line.kind.clone(),
            segments: line.segments.clone(),
            props: line.props.clone(),
        }
    }

    fn dest(ws: &InMemoryWorkspace) -> &InMemoryWorkspace {
        ws.insert_record(RecordInfo::new("DST", "Copy"), Vec::new(), Vec::new());
        ws
    }

    #[tokio::test]
    async fn test_full_fidelity_first() {
        let ws = InMemoryWorkspace::new();
        let line = LineItem::new("s1", "task")
            .with_text("Do it")
            .with_props(json!({"done": false}));
        let mut events = Vec::new();
        let out = create_line(dest(&ws), "DST", request(&line), 0, &ctx(), &line, &mut events).await;

        assert!(matches!(out, LineOutcome::Created { fidelity: Fidelity::Full, .. }));
        assert!(events.is_empty());
        let created = &ws.lines("DST")[0];
        assert_eq!(created.kind, "task");
        assert_eq!(created.props.as_ref().unwrap()["done"], json!(false));
    }

    #[tokio::test]
    async fn test_props_dropped_on_rejection() {
        let ws = InMemoryWorkspace::new().with_create_guard(|_, line| {
            if line.props.is_some() {
                bail!("unsupported props");
            }
            Ok(())
        });
        let line = LineItem::new("s1", "heading")
            .with_text("Title")
            .with_props(json!({"weird": {"shape": 1}}));
        let mut events = Vec::new();
        let out = create_line(dest(&ws), "DST", request(&line), 1, &ctx(), &line, &mut events).await;

        assert!(matches!(out, LineOutcome::Created { fidelity: Fidelity::WithoutProps, .. }));
        assert_eq!(events[0].tier, Tier::WithoutProps);
        assert_eq!(events[0].depth, 1);
        let created = &ws.lines("DST")[0];
        assert_eq!(created.kind, "heading");
        assert!(created.props.is_none());
    }

    #[tokio::test]
    async fn test_summary_when_type_rejected() {
        let ws = InMemoryWorkspace::new().with_create_guard(|_, line| {
            if line.kind != "text" {
                bail!("type not allowed");
            }
            Ok(())
        });
        let line = LineItem::new("s1", "table").with_text("Q3 numbers");
        let mut events = Vec::new();
        let out = create_line(dest(&ws), "DST", request(&line), 2, &ctx(), &line, &mut events).await;

        assert!(matches!(out, LineOutcome::Created { fidelity: Fidelity::Summary, .. }));
        assert_eq!(ws.lines("DST")[0].plain_text(), "Q3 numbers (src:table)");
        assert_eq!(events.last().map(|e| e.tier), Some(Tier::Summary));
    }

    #[tokio::test]
    async fn test_link_summary_names_original_target() {
        let ws = InMemoryWorkspace::new().with_create_guard(|_, line| {
            if line.kind != "text" {
                bail!("type not allowed");
            }
            Ok(())
        });
        let line = LineItem::new("s1", "linkbtn").with_props(json!({"recordGuid": "R1"}));
        let mut retargeted = request(&line);
        retargeted.props = Some(json!({"recordGuid": "DST"}).as_object().cloned().unwrap());
        let lookup = |guid: &str| match guid {
            "R1" => Some(RecordInfo::new("R1", "Project X")),
            "DST" => Some(RecordInfo::new("DST", "Source (copy)")),
            _ => None,
        };
        let ctx = CopyContext {
            source_guid: "SRC".into(),
            source_name: "Source".into(),
            dest_guid: "DST".into(),
            lookup: &lookup,
        };
        let mut events = Vec::new();
        let out = create_line(dest(&ws), "DST", retargeted, 0, &ctx, &line, &mut events).await;

        assert!(matches!(out, LineOutcome::Created { fidelity: Fidelity::Summary, .. }));
        assert_eq!(ws.lines("DST")[0].plain_text(), "Project X (src:linkbtn)");
    }

    #[tokio::test]
    async fn test_empty_container_skipped() {
        let ws = InMemoryWorkspace::new().with_create_guard(|_, _| bail!("no"));
        let line = LineItem::new("s1", "document");
        let mut events = Vec::new();
        let out = create_line(dest(&ws), "DST", request(&line), 0, &ctx(), &line, &mut events).await;

        assert_eq!(out, LineOutcome::Skipped);
        assert!(ws.lines("DST").is_empty());
        assert_eq!(events[0].tier, Tier::Skipped);
    }

    #[tokio::test]
    async fn test_all_rungs_fail() {
        let ws = InMemoryWorkspace::new().with_create_guard(|_, _| bail!("read-only"));
        let line = LineItem::new("s1", "text").with_text("Hello");
        let mut events = Vec::new();
        let out = create_line(dest(&ws), "DST", request(&line), 0, &ctx(), &line, &mut events).await;

        assert_eq!(out, LineOutcome::Dropped);
        assert_eq!(out.id(), None);
        assert_eq!(events[0].tier, Tier::Dropped);
    }
}
