//! `xray structure`: render a record's structure panel as HTML.

use anyhow::{Context, Result};
use std::path::Path;

use xray_core::render::{build_structure_panel, escape_html, StructurePanel, STRUCTURE_CSS};

use crate::config::Config;
use crate::workspace::load_workspace;

/// Wrap a panel in a standalone HTML page with the view stylesheet.
pub fn standalone_page(panel: &StructurePanel) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n<style>\n{}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape_html(&panel.title),
        STRUCTURE_CSS,
        panel.html
    )
}

pub async fn get_structure(config: &Config, workspace: &Path, record: &str) -> Result<StructurePanel> {
    let ws = load_workspace(workspace)?;
    Ok(build_structure_panel(&ws, Some(record), &config.render_options()).await)
}

pub async fn run_structure(
    config: &Config,
    workspace: &Path,
    record: &str,
    out: Option<&Path>,
) -> Result<()> {
    let panel = get_structure(config, workspace, record).await?;
    let page = standalone_page(&panel);

    match out {
        Some(path) => {
            std::fs::write(path, page)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("{} → {}", panel.title, path.display());
        }
        None => print!("{}", page),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standalone_page_escapes_title() {
        let panel = StructurePanel {
            title: "Structure: <b>".to_string(),
            html: "<div></div>".to_string(),
            click_targets: Vec::new(),
        };
        let page = standalone_page(&panel);
        assert!(page.contains("<title>Structure: &lt;b&gt;</title>"));
        assert!(page.contains(".rsv-container"));
        assert!(page.contains("<body>\n<div></div>\n</body>"));
    }
}
