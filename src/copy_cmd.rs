//! `xray copy`: duplicate a record inside a workspace snapshot.
//!
//! Notices go to stderr, the destination id goes to stdout, and the
//! mutated workspace is written back to disk (or to `--out`). The run
//! summary is an `info` event, so the logging filter can silence it.

use anyhow::{bail, Result};
use std::path::Path;
use tracing::info;

use xray_core::copy::{copy_record, CopyOutcome, CopyReport};
use xray_core::store::memory::InMemoryWorkspace;
use xray_core::store::Notifier;

use crate::config::Config;
use crate::workspace::{load_workspace, save_workspace};

/// Prints notices as `[title] message` lines on stderr.
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, title: &str, message: &str, _duration_ms: u64) {
        eprintln!("[{}] {}", title, message);
    }
}

/// Run the copy command against an already loaded workspace.
pub async fn copy_in_workspace(
    config: &Config,
    ws: &InMemoryWorkspace,
    record: &str,
) -> Result<CopyOutcome> {
    let options = config.copy_options()?;
    Ok(copy_record(ws, Some(ws), &StderrNotifier, record, &options, tokio::time::sleep).await)
}

pub async fn run_copy(
    config: &Config,
    workspace: &Path,
    record: &str,
    out: Option<&Path>,
) -> Result<()> {
    let ws = load_workspace(workspace)?;
    let outcome = copy_in_workspace(config, &ws, record).await?;
    let target = out.unwrap_or(workspace);

    match outcome {
        CopyOutcome::Copied(report) => {
            save_workspace(&ws, target)?;
            print_report(&report);
            Ok(())
        }
        CopyOutcome::NoSource => bail!("record not found: {}", record),
        CopyOutcome::NoCollection => bail!("no collection to copy into"),
        CopyOutcome::NotCreated => bail!("destination record could not be created"),
        CopyOutcome::NotVisible { destination } => {
            bail!("destination record {} never became visible", destination)
        }
        CopyOutcome::Failed { destination, error } => {
            // Keep whatever was written; the host does not roll back.
            save_workspace(&ws, target)?;
            bail!("copy into {} failed: {}", destination, error)
        }
    }
}

fn print_report(report: &CopyReport) {
    println!("{}", report.destination);
    info!(
        destination = %report.destination,
        title = %report.title,
        lines = report.lines_created,
        properties = report.properties_copied,
        backreferences = report.backreferences.len(),
        degraded = report.degradations.len(),
        "copy finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use xray_core::models::{LineItem, RecordInfo};
    use xray_core::store::RecordStore;

    #[tokio::test]
    async fn test_copy_in_workspace_creates_titled_record() {
        let ws = InMemoryWorkspace::new();
        ws.insert_record(
            RecordInfo::new("A", "Alpha"),
            vec![LineItem::new("l1", "text").with_text("hello")],
            Vec::new(),
        );

        let outcome = copy_in_workspace(&Config::default(), &ws, "A").await.unwrap();
        let report = match outcome {
            CopyOutcome::Copied(report) => report,
            other => panic!("expected a copy, got {:?}", other),
        };
        assert_eq!(report.title, "Alpha (copy)");
        assert_eq!(
            ws.record(&report.destination).unwrap().display_name(),
            "Alpha (copy)"
        );
        assert!(ws
            .lines(&report.destination)
            .iter()
            .any(|l| l.plain_text() == "hello"));
    }

    #[tokio::test]
    async fn test_missing_record_is_no_source() {
        let ws = InMemoryWorkspace::new();
        let outcome = copy_in_workspace(&Config::default(), &ws, "nope").await.unwrap();
        assert!(matches!(outcome, CopyOutcome::NoSource));
    }
}
