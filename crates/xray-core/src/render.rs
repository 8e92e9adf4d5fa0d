//! Read-only structure view of a record: nested line nodes plus the records
//! that link to it.
//!
//! Output is an HTML fragment using `rsv-*` classes; [`STRUCTURE_CSS`] is
//! the stylesheet a host injects alongside it. Every user-derived string is
//! escaped.

use std::collections::HashSet;

use crate::backrefs::{resolve_backreferences, sort_by_display_name, Backreference};
use crate::models::LineItem;
use crate::store::RecordStore;
use crate::tree::TreeIndex;

pub const STRUCTURE_CSS: &str = r#".rsv-empty{padding:24px;color:#666}
.rsv-container{padding:20px;font-size:14px}
.rsv-section{margin-bottom:20px}
.rsv-section-title{font-weight:600;color:#333;margin-bottom:10px;font-size:15px}
.rsv-backreferences{padding:12px;background:#f0f4ff;border-radius:8px;border:1px solid #d0d8f0}
.rsv-backlinks-list{list-style:none;margin:0;padding:0}
.rsv-backlink-item{display:flex;align-items:center;gap:8px;padding:8px 10px;border-radius:6px;margin-bottom:4px;background:#fff;border:1px solid #e0e4f0;cursor:pointer}
.rsv-backlink-item:hover{background:#e8ecff;border-color:#a0b0e0}
.rsv-backlink-icon{color:#06c;font-weight:700}
.rsv-backlink-record{font-weight:600;color:#06c}
.rsv-backlink-context{font-size:12px;color:#666;overflow:hidden;text-overflow:ellipsis;white-space:nowrap;max-width:200px}
.rsv-backlinks-empty{color:#666;font-size:13px;padding:4px 0}
.rsv-summary{margin-bottom:16px;font-weight:600;color:#333}
.rsv-node{margin-bottom:4px}
.rsv-node-header{display:flex;align-items:baseline;gap:8px;flex-wrap:wrap;padding:6px 10px;border-radius:6px;background:#f5f5f5}
.rsv-node[data-depth="0"]>.rsv-node-header{background:#e8e8e8}
.rsv-node[data-depth="1"]>.rsv-node-header{background:#f0f0f0;margin-left:16px}
.rsv-node[data-depth="2"]>.rsv-node-header{margin-left:32px}
.rsv-node[data-depth="3"]>.rsv-node-header{margin-left:48px}
.rsv-children{margin-top:4px}
.rsv-icon{font-weight:700;min-width:1.2em;color:#555}
.rsv-type{font-weight:600;color:#333;min-width:90px}
.rsv-preview{color:#666;flex:1;overflow:hidden;text-overflow:ellipsis;white-space:nowrap}
.rsv-task .rsv-icon{color:#0a0}
.rsv-heading .rsv-type{color:#06c}
"#;

const UNTITLED: &str = "Untitled";

/// Rendering knobs.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Characters of line text shown before truncating with `…`.
    pub preview_chars: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { preview_chars: 60 }
    }
}

/// A rendered structure panel, ready to mount.
#[derive(Debug, Clone, PartialEq)]
pub struct StructurePanel {
    pub title: String,
    pub html: String,
    /// Record identifiers the backreference entries navigate to, in order.
    pub click_targets: Vec<String>,
}

impl StructurePanel {
    fn empty(title: &str, message: &str) -> Self {
        Self {
            title: title.to_string(),
            html: format!(r#"<div class="rsv-empty">{}</div>"#, escape_html(message)),
            click_targets: Vec::new(),
        }
    }
}

struct TypeInfo {
    label: String,
    icon: &'static str,
    class: &'static str,
}

fn type_info(kind: &str) -> TypeInfo {
    let known = |label: &str, icon, class| TypeInfo {
        label: label.to_string(),
        icon,
        class,
    };
    match kind {
        "task" => known("Task", "☐", "rsv-task"),
        "text" => known("Text", "¶", "rsv-text"),
        "heading" => known("Heading", "H", "rsv-heading"),
        "ulist" => known("Bullet list", "•", "rsv-ulist"),
        "olist" => known("Numbered list", "1.", "rsv-olist"),
        "quote" => known("Quote", "\u{201C}\u{201D}", "rsv-quote"),
        "block" => known("Block", "▢", "rsv-block"),
        "hr" => known("Divider", "—", "rsv-hr"),
        "image" => known("Image", "🖼", "rsv-image"),
        "file" => known("File", "📎", "rsv-file"),
        "ascii_banner" => known("Banner", "▤", "rsv-banner"),
        "" => known("Item", "•", "rsv-default"),
        other => known(other, "•", "rsv-default"),
    }
}

/// Escape text for HTML element content and double-quoted attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let mut cut: String = text.chars().take(max).collect();
        cut.push('…');
        cut
    } else {
        text.to_string()
    }
}

fn preview(line: &LineItem, max: usize) -> String {
    let text: String = line
        .segments
        .iter()
        .filter_map(|s| s.str_field("text"))
        .collect();
    truncate(text.trim(), max)
}

struct Renderer<'a> {
    index: TreeIndex<'a>,
    visited: HashSet<&'a str>,
    preview_chars: usize,
}

impl<'a> Renderer<'a> {
    fn node(&mut self, line: &'a LineItem, depth: usize, out: &mut String) {
        if !self.visited.insert(line.guid.as_str()) {
            return;
        }
        let info = type_info(&line.kind);
        let preview = preview(line, self.preview_chars);

        out.push_str(&format!(
            r#"<div class="rsv-node {}" data-depth="{}"><div class="rsv-node-header"><span class="rsv-icon">{}</span><span class="rsv-type">{}</span>"#,
            info.class,
            depth,
            info.icon,
            escape_html(&info.label)
        ));
        if !preview.is_empty() {
            out.push_str(&format!(
                r#"<span class="rsv-preview">{}</span>"#,
                escape_html(&preview)
            ));
        }
        out.push_str("</div>");

        let mut children = String::new();
        for child in self.index.children(Some(line.guid.as_str())).to_vec() {
            self.node(child, depth + 1, &mut children);
        }
        if !children.is_empty() {
            out.push_str(r#"<div class="rsv-children">"#);
            out.push_str(&children);
            out.push_str("</div>");
        }
        out.push_str("</div>");
    }
}

fn backreference_item(b: &Backreference) -> String {
    let context = b
        .preview
        .as_deref()
        .map(|p| {
            let p: String = p.chars().take(50).collect();
            format!(
                r#"<span class="rsv-backlink-context">"{}…"</span>"#,
                escape_html(&p)
            )
        })
        .unwrap_or_default();
    format!(
        r#"<li class="rsv-backlink-item" data-record-guid="{}"><span class="rsv-backlink-icon">↩</span><span class="rsv-backlink-record">{}</span>{}</li>"#,
        escape_html(&b.guid),
        escape_html(b.name_or(UNTITLED)),
        context
    )
}

/// Render a record's line tree and backreference list as HTML.
pub fn render_structure(
    lines: &[LineItem],
    backrefs: &[Backreference],
    options: &RenderOptions,
) -> String {
    let mut renderer = Renderer {
        index: TreeIndex::build(lines),
        visited: HashSet::new(),
        preview_chars: options.preview_chars,
    };
    let mut tree = String::new();
    for root in renderer.index.roots().to_vec() {
        renderer.node(root, 0, &mut tree);
    }

    let summary = format!(
        "{} element{}",
        lines.len(),
        if lines.len() == 1 { "" } else { "s" }
    );

    let backlinks = if backrefs.is_empty() {
        r#"<div class="rsv-backlinks-empty">No other records link to this one.</div>"#.to_string()
    } else {
        let items: String = backrefs.iter().map(backreference_item).collect();
        format!(r#"<ul class="rsv-backlinks-list">{}</ul>"#, items)
    };

    format!(
        r#"<div class="rsv-container"><div class="rsv-summary">{}</div><div class="rsv-tree">{}</div><div class="rsv-section rsv-backreferences"><div class="rsv-section-title">↩ Backreferences ({})</div>{}</div></div>"#,
        summary,
        tree,
        backrefs.len(),
        backlinks
    )
}

/// Build the structure panel for `record`, covering the empty states.
pub async fn build_structure_panel(
    store: &dyn RecordStore,
    record: Option<&str>,
    options: &RenderOptions,
) -> StructurePanel {
    const TITLE: &str = "Record Structure";

    let Some(guid) = record else {
        return StructurePanel::empty(
            TITLE,
            r#"No record selected. Open a record and use "Show record structure" again."#,
        );
    };
    let Some(info) = store.record(guid) else {
        return StructurePanel::empty(TITLE, "Record not found. It may have been deleted.");
    };

    let mut backrefs = resolve_backreferences(store, guid, None).await;
    sort_by_display_name(&mut backrefs, UNTITLED);

    let lines = match store.line_items(guid).await {
        Ok(lines) => lines,
        Err(e) => {
            return StructurePanel::empty(TITLE, &format!("Could not load line items: {}", e));
        }
    };

    StructurePanel {
        title: format!("Structure: {}", info.display_name()),
        html: render_structure(&lines, &backrefs, options),
        click_targets: backrefs.iter().map(|b| b.guid.clone()).collect(),
    }
}
