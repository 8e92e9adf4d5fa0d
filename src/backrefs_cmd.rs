//! `xray backrefs`: list the records that link to a record.

use anyhow::{bail, Result};
use std::path::Path;

use xray_core::backrefs::{resolve_backreferences, sort_by_display_name, Backreference};
use xray_core::store::RecordStore;

use crate::workspace::load_workspace;

const UNTITLED: &str = "Untitled";

pub async fn get_backrefs(workspace: &Path, record: &str) -> Result<Vec<Backreference>> {
    let ws = load_workspace(workspace)?;
    if ws.record(record).is_none() {
        bail!("record not found: {}", record);
    }
    let mut backrefs = resolve_backreferences(&ws, record, None).await;
    sort_by_display_name(&mut backrefs, UNTITLED);
    Ok(backrefs)
}

pub async fn run_backrefs(workspace: &Path, record: &str) -> Result<()> {
    let backrefs = get_backrefs(workspace, record).await?;
    if backrefs.is_empty() {
        eprintln!("No backreferences found.");
        return Ok(());
    }
    for b in &backrefs {
        match &b.preview {
            Some(p) => println!("{} ({})  {}", b.name_or(UNTITLED), b.guid, p),
            None => println!("{} ({})", b.name_or(UNTITLED), b.guid),
        }
    }
    Ok(())
}
