//! Workspace snapshot files.
//!
//! The CLI hosts the engine over an [`InMemoryWorkspace`] loaded from a
//! JSON snapshot and written back after mutating commands.

use anyhow::{Context, Result};
use std::path::Path;

use xray_core::store::memory::{InMemoryWorkspace, WorkspaceSnapshot};

pub fn load_workspace(path: &Path) -> Result<InMemoryWorkspace> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read workspace file: {}", path.display()))?;
    let snapshot: WorkspaceSnapshot = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse workspace file: {}", path.display()))?;
    Ok(InMemoryWorkspace::from_snapshot(snapshot))
}

pub fn save_workspace(ws: &InMemoryWorkspace, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&ws.to_snapshot())?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write workspace file: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use xray_core::store::RecordStore;

    #[test]
    fn test_load_and_save() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ws.json");
        std::fs::write(
            &path,
            r#"{"records":[{"guid":"A","name":"Alpha","lines":[{"guid":"l1","type":"text","segments":[{"type":"text","text":"hi"}]}]}]}"#,
        )
        .unwrap();

        let ws = load_workspace(&path).unwrap();
        assert_eq!(ws.record("A").unwrap().display_name(), "Alpha");
        assert_eq!(ws.lines("A").len(), 1);

        let out = dir.path().join("out.json");
        save_workspace(&ws, &out).unwrap();
        let reloaded = load_workspace(&out).unwrap();
        assert_eq!(reloaded.lines("A")[0].plain_text(), "hi");
    }

    #[test]
    fn test_line_without_guid_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ws.json");
        std::fs::write(
            &path,
            r#"{"records":[{"guid":"A","name":"Alpha","lines":[{"type":"text","segments":[{"type":"text","text":"ghost"}]},{"guid":"l2","type":"text","segments":[{"type":"text","text":"kept"}]}]}]}"#,
        )
        .unwrap();

        let ws = load_workspace(&path).unwrap();
        let lines = ws.lines("A");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].guid, "");
        assert_eq!(lines[1].plain_text(), "kept");
    }

    #[test]
    fn test_bad_json_names_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_workspace(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("broken.json"));
    }
}
