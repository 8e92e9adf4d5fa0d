//! The copy command: duplicate a record's tree into a new record.
//!
//! # Flow
//!
//! ```text
//! source ──► collection? ──► create "<name> (copy)" ──► wait until visible
//!                                                            │
//!        header "COPY from: …" + spacer ◄────────────────────┘
//!                      │
//!                      ▼
//!              copy properties
//!                      │
//!                      ▼
//!   tree copy (depth-first, pre-order, source sibling order)
//!      per line: rewrite links (link-like) │ sanitize segments (other)
//!                ──► create_line ladder ──► line metadata
//!                      │
//!                      ▼
//!         "### Backreferences" section after the last root line
//! ```
//!
//! Host calls are awaited strictly one at a time. Failures below the
//! operation level are contained where they happen; nothing is rolled
//! back, so a partial copy stays in place.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backrefs::{resolve_backreferences, Backreference, UNKNOWN_RECORD};
use crate::create::{create_line, Degradation, Fidelity, LineOutcome};
use crate::models::{LineContent, LineItem, NewLine, RecordInfo};
use crate::rewrite::rewrite_link_targets;
use crate::sanitize::sanitize_segments;
use crate::sniff::{is_link_like_type, Payload};
use crate::store::{Collection, LookupChain, Notifier, RecordLookup, RecordStore};
use crate::tree::TreeIndex;

/// Title used for every notice raised by the copy command.
pub const NOTICE_TITLE: &str = "XRay";

/// Which identifier rewritten link lines point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkTarget {
    /// The newly created copy.
    #[default]
    Destination,
    /// The record being copied.
    Source,
}

/// Tunables for [`copy_record`].
#[derive(Debug, Clone)]
pub struct CopyOptions {
    pub title_suffix: String,
    pub link_target: LinkTarget,
    /// Lookups made while waiting for the new record to become readable.
    pub visibility_attempts: u32,
    pub visibility_delay: Duration,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            title_suffix: " (copy)".to_string(),
            link_target: LinkTarget::Destination,
            visibility_attempts: 40,
            visibility_delay: Duration::from_millis(150),
        }
    }
}

/// Per-operation facts shared by every layer of one copy.
pub struct CopyContext<'a> {
    pub source_guid: String,
    pub source_name: String,
    pub dest_guid: String,
    /// `getRecord(identifier)` composed from the host accessors.
    pub lookup: &'a dyn RecordLookup,
}

impl CopyContext<'_> {
    /// Identifier written into rewritten link lines.
    pub fn link_target(&self, target: LinkTarget) -> &str {
        match target {
            LinkTarget::Destination => &self.dest_guid,
            LinkTarget::Source => &self.source_guid,
        }
    }
}

/// What a finished copy wrote.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CopyReport {
    pub destination: String,
    pub title: String,
    pub lines_created: usize,
    pub properties_copied: usize,
    pub backreferences: Vec<Backreference>,
    pub degradations: Vec<Degradation>,
}

/// How a copy command ended.
#[derive(Debug, Clone)]
pub enum CopyOutcome {
    /// The source record does not exist.
    NoSource,
    /// No collection to create the destination in.
    NoCollection,
    /// The collection declined to create a destination.
    NotCreated,
    /// The destination never became readable; nothing was written.
    NotVisible { destination: String },
    /// A host call failed at operation level; a partial copy may remain.
    Failed { destination: String, error: String },
    Copied(CopyReport),
}

impl CopyOutcome {
    /// The record a host should navigate to afterwards.
    pub fn destination(&self) -> Option<&str> {
        match self {
            CopyOutcome::NoSource | CopyOutcome::NoCollection | CopyOutcome::NotCreated => None,
            CopyOutcome::NotVisible { destination } | CopyOutcome::Failed { destination, .. } => {
                Some(destination)
            }
            CopyOutcome::Copied(report) => Some(&report.destination),
        }
    }
}

// ─── Tree copier ────────────────────────────────────────────────────

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Writable content for one source line.
///
/// Link-like lines keep their raw segments with targets rewritten; every
/// other line has its segments sanitized.
pub fn prepare_line(line: &LineItem, ctx: &CopyContext<'_>, target: LinkTarget) -> LineContent {
    if is_link_like_type(&line.kind) {
        rewrite_link_targets(&Payload::of(line), ctx.link_target(target))
    } else {
        LineContent {
            kind: line.kind.clone(),
            segments: sanitize_segments(&line.segments, ctx.lookup),
            props: line.props.clone(),
        }
    }
}

/// Rebuilds a source tree inside a destination record.
pub struct TreeCopier<'a> {
    store: &'a dyn RecordStore,
    dest: &'a str,
    ctx: &'a CopyContext<'a>,
    link_target: LinkTarget,
    index: TreeIndex<'a>,
    visited: HashSet<&'a str>,
    last_root: Option<String>,
    lines_created: usize,
    degradations: Vec<Degradation>,
}

/// Counters from one tree copy.
#[derive(Debug, Default)]
pub struct TreeCopy {
    /// Last line created at destination root level, or the initial anchor.
    pub last_root: Option<String>,
    pub lines_created: usize,
    pub degradations: Vec<Degradation>,
}

impl<'a> TreeCopier<'a> {
    pub fn new(
        store: &'a dyn RecordStore,
        dest: &'a str,
        ctx: &'a CopyContext<'a>,
        link_target: LinkTarget,
        items: &'a [LineItem],
    ) -> Self {
        Self {
            store,
            dest,
            ctx,
            link_target,
            index: TreeIndex::build(items),
            visited: HashSet::new(),
            last_root: None,
            lines_created: 0,
            degradations: Vec::new(),
        }
    }

    /// Copy every root (and its subtree) after `anchor` at destination root.
    pub async fn run(mut self, anchor: Option<String>) -> TreeCopy {
        self.last_root = anchor.clone();
        self.copy_siblings(None, None, anchor, 0).await;
        TreeCopy {
            last_root: self.last_root,
            lines_created: self.lines_created,
            degradations: self.degradations,
        }
    }

    /// Copy the children of `src_parent` under `dst_parent`, after `after`.
    ///
    /// Returns the last sibling anchor at this level. A line that could not
    /// be created still has its children copied, at the same level and
    /// position it would have taken.
    fn copy_siblings<'s>(
        &'s mut self,
        src_parent: Option<&'a str>,
        dst_parent: Option<String>,
        mut after: Option<String>,
        depth: usize,
    ) -> BoxFuture<'s, Option<String>> {
        Box::pin(async move {
            let siblings = self.index.children(src_parent).to_vec();
            for line in siblings {
                if line.guid.is_empty() || !self.visited.insert(line.guid.as_str()) {
                    continue;
                }

                let content = prepare_line(line, self.ctx, self.link_target);
                let request = NewLine {
                    parent: dst_parent.clone(),
                    after: after.clone(),
                    kind: content.kind,
                    segments: content.segments,
                    props: content.props,
                };
                let outcome = create_line(
                    self.store,
                    self.dest,
                    request,
                    depth,
                    self.ctx,
                    line,
                    &mut self.degradations,
                )
                .await;

                match outcome {
                    LineOutcome::Created { id, fidelity } => {
                        self.lines_created += 1;
                        if dst_parent.is_none() {
                            self.last_root = Some(id.clone());
                        }
                        if fidelity != Fidelity::Summary {
                            self.copy_line_meta(line, &id).await;
                        }
                        self.copy_siblings(Some(line.guid.as_str()), Some(id.clone()), None, depth + 1)
                            .await;
                        after = Some(id);
                    }
                    LineOutcome::Skipped | LineOutcome::Dropped => {
                        after = self
                            .copy_siblings(Some(line.guid.as_str()), dst_parent.clone(), after, depth)
                            .await;
                    }
                }
            }
            after
        })
    }

    async fn copy_line_meta(&self, source: &LineItem, created: &str) {
        let meta = source.meta();
        if meta.is_empty() {
            return;
        }
        if let Err(e) = self.store.set_line_meta(self.dest, created, &meta).await {
            debug!(line = %source.guid, error = %e, "line metadata not copied");
        }
    }
}

// ─── Command handler ────────────────────────────────────────────────

/// Poll until `guid` is readable, up to `attempts` lookups `delay` apart.
pub async fn wait_for_record<F, Fut>(
    store: &dyn RecordStore,
    guid: &str,
    attempts: u32,
    delay: Duration,
    sleep: &F,
) -> Option<RecordInfo>
where
    F: Fn(Duration) -> Fut,
    Fut: Future<Output = ()>,
{
    for attempt in 0..attempts {
        if let Some(info) = store.record(guid) {
            return Some(info);
        }
        debug!(record = guid, attempt, "destination not visible yet");
        sleep(delay).await;
    }
    None
}

/// Copy typed properties, skipping `name`/`title`. Returns how many landed.
pub fn copy_properties(store: &dyn RecordStore, source: &str, dest: &str) -> usize {
    let props = match store.properties(source) {
        Ok(props) => props,
        Err(e) => {
            warn!(record = source, error = %e, "could not read properties");
            return 0;
        }
    };

    let mut copied = 0;
    for prop in props {
        let lower = prop.name.to_lowercase();
        if lower == "name" || lower == "title" {
            continue;
        }
        let Some(value) = prop.effective_value() else {
            continue;
        };
        match store.set_property(dest, &prop.name, &value) {
            Ok(true) => copied += 1,
            Ok(false) => debug!(property = %prop.name, "destination has no such property"),
            Err(e) => debug!(property = %prop.name, error = %e, "property not copied"),
        }
    }
    copied
}

async fn append_text(
    store: &dyn RecordStore,
    dest: &str,
    after: Option<String>,
    text: &str,
) -> Result<Option<String>> {
    let created = store
        .create_line_item(dest, &NewLine::text(after.clone(), text))
        .await?;
    Ok(created.or(after))
}

/// Append the backreference section at destination root after `after`.
///
/// Blank line, `### Backreferences`, one `- <name> (<id>)` bullet per
/// record, then a unique count; or a single "No backreferences found.".
pub async fn append_backreferences(
    store: &dyn RecordStore,
    dest: &str,
    after: Option<String>,
    backrefs: &[Backreference],
) -> Result<()> {
    let mut last = append_text(store, dest, after, "").await?;
    last = append_text(store, dest, last, "### Backreferences").await?;

    if backrefs.is_empty() {
        append_text(store, dest, last, "No backreferences found.").await?;
        return Ok(());
    }
    for b in backrefs {
        let bullet = format!("- {} ({})", b.name_or(UNKNOWN_RECORD), b.guid);
        last = append_text(store, dest, last, &bullet).await?;
    }
    append_text(
        store,
        dest,
        last,
        &format!("Backreferences (unique): {}", backrefs.len()),
    )
    .await?;
    Ok(())
}

/// Copy record `source_id` into a new record in `collection`.
///
/// Operation-level failures are reported once through `notifier` and in
/// the returned [`CopyOutcome`]. `sleep` paces the visibility wait.
pub async fn copy_record<F, Fut>(
    store: &dyn RecordStore,
    collection: Option<&dyn Collection>,
    notifier: &dyn Notifier,
    source_id: &str,
    options: &CopyOptions,
    sleep: F,
) -> CopyOutcome
where
    F: Fn(Duration) -> Fut,
    Fut: Future<Output = ()>,
{
    let Some(source) = store.record(source_id) else {
        notifier.notify(NOTICE_TITLE, "Open a record first.", 2500);
        return CopyOutcome::NoSource;
    };
    let Some(collection) = collection else {
        notifier.notify(NOTICE_TITLE, "No active collection found.", 3000);
        return CopyOutcome::NoCollection;
    };
    let source_name = source.display_name();
    let title = format!("{}{}", source_name, options.title_suffix);

    let dest = match collection.create_record(&title) {
        Ok(Some(guid)) => guid,
        Ok(None) => {
            notifier.notify(NOTICE_TITLE, "Could not create destination record.", 3500);
            return CopyOutcome::NotCreated;
        }
        Err(e) => {
            warn!(error = %e, "destination record creation failed");
            notifier.notify(NOTICE_TITLE, "Could not create destination record.", 3500);
            return CopyOutcome::NotCreated;
        }
    };

    let visible = wait_for_record(
        store,
        &dest,
        options.visibility_attempts,
        options.visibility_delay,
        &sleep,
    )
    .await;
    if visible.is_none() {
        notifier.notify(NOTICE_TITLE, "Destination record not visible yet.", 4500);
        return CopyOutcome::NotVisible { destination: dest };
    }

    let lookup = LookupChain::new(store, Some(collection));
    let ctx = CopyContext {
        source_guid: source.guid.clone(),
        source_name,
        dest_guid: dest.clone(),
        lookup: &lookup,
    };

    match write_copy(store, &ctx, options).await {
        Ok(mut report) => {
            report.title = title.clone();
            info!(
                source = %ctx.source_guid,
                destination = %dest,
                lines = report.lines_created,
                degraded = report.degradations.len(),
                "record copied"
            );
            notifier.notify(NOTICE_TITLE, &format!("Created: {}", title), 2500);
            CopyOutcome::Copied(report)
        }
        Err(e) => {
            warn!(source = %ctx.source_guid, destination = %dest, error = %e, "copy failed");
            notifier.notify(NOTICE_TITLE, &format!("Error: {}", e), 7000);
            CopyOutcome::Failed {
                destination: dest,
                error: e.to_string(),
            }
        }
    }
}

async fn write_copy(
    store: &dyn RecordStore,
    ctx: &CopyContext<'_>,
    options: &CopyOptions,
) -> Result<CopyReport> {
    let dest = ctx.dest_guid.as_str();
    let header = format!("COPY from: {} ({})", ctx.source_name, ctx.source_guid);
    let header_line = append_text(store, dest, None, &header).await?;
    let anchor = append_text(store, dest, header_line, "").await?;

    let properties_copied = copy_properties(store, &ctx.source_guid, dest);

    let items = store.line_items(&ctx.source_guid).await?;
    let tree = TreeCopier::new(store, dest, ctx, options.link_target, &items)
        .run(anchor)
        .await;

    let backreferences = resolve_backreferences(store, &ctx.source_guid, Some(dest)).await;
    append_backreferences(store, dest, tree.last_root, &backreferences).await?;

    Ok(CopyReport {
        destination: dest.to_string(),
        title: String::new(),
        lines_created: tree.lines_created,
        properties_copied,
        backreferences,
        degradations: tree.degradations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Segment, RecordInfo};
    use crate::store::memory::InMemoryWorkspace;
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

    #[test]
    fn test_prepare_rewrites_link_lines_only() {
        let link = LineItem::new("l", "linkbtn").with_props(json!({"guid": "SRC", "self": true}));
        let out = prepare_line(&link, &ctx(), LinkTarget::Destination);
        assert_eq!(out.props.as_ref().unwrap()["guid"], json!("DST"));
        assert_eq!(out.props.as_ref().unwrap()["self"], json!(false));

        let out = prepare_line(&link, &ctx(), LinkTarget::Source);
        assert_eq!(out.props.as_ref().unwrap()["guid"], json!("SRC"));

        let text = LineItem::new("t", "text")
            .with_segment(Segment::span("link", json!({"guid": "R9", "text": "Elsewhere"})));
        let out = prepare_line(&text, &ctx(), LinkTarget::Destination);
        assert_eq!(out.segments, vec![Segment::text("Elsewhere")]);
    }

    #[tokio::test]
    async fn test_wait_for_record_gives_up() {
        let ws = InMemoryWorkspace::new();
        let calls = std::sync::atomic::AtomicU32::new(0);
        let sleep = |_d: Duration| {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async {}
        };
        let found = wait_for_record(&ws, "missing", 3, Duration::ZERO, &sleep).await;
        assert!(found.is_none());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[test]
    fn test_copy_properties_skips_name_and_empty() {
        let ws = InMemoryWorkspace::new();
        ws.insert_record(
            RecordInfo::new("S", "Src"),
            Vec::new(),
            vec![
                crate::models::Property {
                    name: "Title".into(),
                    text: Some("ignored".into()),
                    ..Default::default()
                },
                crate::models::Property {
                    name: "Status".into(),
                    choice: Some("Open".into()),
                    text: Some("open".into()),
                    ..Default::default()
                },
                crate::models::Property {
                    name: "Blank".into(),
                    ..Default::default()
                },
            ],
        );
        ws.insert_record(RecordInfo::new("D", "Dst"), Vec::new(), Vec::new());

        assert_eq!(copy_properties(&ws, "S", "D"), 1);
        let status = ws.property("D", "Status").unwrap();
        assert_eq!(status.effective_value(), Some(crate::models::PropertyValue::Choice("Open".into())));
        assert!(ws.property("D", "Title").is_none());
    }
}
