//! In-memory host for tests and the reference CLI.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`, in insertion order,
//! so enumeration and scan results are deterministic. Line items are kept
//! as one flat list per record; hierarchy is carried only by `parent_guid`,
//! exactly like a real host snapshot.
//!
//! A few switches reproduce awkward host behavior on demand: a create guard
//! that rejects chosen line shapes, a read-after-write visibility lag for
//! new records, and an optional native backreference index.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::RwLock;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backrefs::line_points_at;
use crate::models::{LineItem, LineMeta, NewLine, Property, PropertyValue, RecordInfo};

use super::{Collection, RecordStore};

type CreateGuard = Box<dyn Fn(&str, &NewLine) -> Result<()> + Send + Sync>;

/// Serializable form of a whole workspace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceSnapshot {
    #[serde(default)]
    pub native_backreferences: bool,
    #[serde(default)]
    pub records: Vec<RecordSnapshot>,
}

/// Serializable form of one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub guid: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default)]
    pub lines: Vec<LineItem>,
}

struct StoredRecord {
    info: RecordInfo,
    lines: Vec<LineItem>,
    properties: Vec<Property>,
}

/// In-memory implementation of [`RecordStore`] and [`Collection`].
pub struct InMemoryWorkspace {
    records: RwLock<Vec<StoredRecord>>,
    /// Remaining invisible reads for freshly created records.
    pending: RwLock<HashMap<String, u32>>,
    native_backreferences: bool,
    enumerable: bool,
    accepts_new_records: bool,
    visibility_lag: u32,
    create_guard: Option<CreateGuard>,
}

impl InMemoryWorkspace {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            pending: RwLock::new(HashMap::new()),
            native_backreferences: false,
            enumerable: true,
            accepts_new_records: true,
            visibility_lag: 0,
            create_guard: None,
        }
    }

    pub fn from_snapshot(snapshot: WorkspaceSnapshot) -> Self {
        let ws = Self::new().with_native_backreferences(snapshot.native_backreferences);
        for r in snapshot.records {
            ws.insert_record(
                RecordInfo {
                    guid: r.guid,
                    name: r.name,
                },
                r.lines,
                r.properties,
            );
        }
        ws
    }

    pub fn to_snapshot(&self) -> WorkspaceSnapshot {
        let records = self.records.read().unwrap();
        WorkspaceSnapshot {
            native_backreferences: self.native_backreferences,
            records: records
                .iter()
                .map(|r| RecordSnapshot {
                    guid: r.info.guid.clone(),
                    name: r.info.name.clone(),
                    properties: r.properties.clone(),
                    lines: r.lines.clone(),
                })
                .collect(),
        }
    }

    /// Serve [`RecordStore::backreference_records`] from a live index.
    pub fn with_native_backreferences(mut self, enabled: bool) -> Self {
        self.native_backreferences = enabled;
        self
    }

    /// Hide every newly created record for `reads` lookups.
    pub fn with_visibility_lag(mut self, reads: u32) -> Self {
        self.visibility_lag = reads;
        self
    }

    /// Make [`RecordStore::all_records`] report a missing accessor.
    pub fn without_enumeration(mut self) -> Self {
        self.enumerable = false;
        self
    }

    /// Make [`Collection::create_record`] decline.
    pub fn refusing_new_records(mut self) -> Self {
        self.accepts_new_records = false;
        self
    }

    /// Run `guard` before every line creation; an `Err` rejects the line.
    pub fn with_create_guard<F>(mut self, guard: F) -> Self
    where
        F: Fn(&str, &NewLine) -> Result<()> + Send + Sync + 'static,
    {
        self.create_guard = Some(Box::new(guard));
        self
    }

    pub fn insert_record(&self, info: RecordInfo, lines: Vec<LineItem>, properties: Vec<Property>) {
        let mut records = self.records.write().unwrap();
        records.retain(|r| r.info.guid != info.guid);
        records.push(StoredRecord {
            info,
            lines,
            properties,
        });
    }

    /// Current lines of a record, in storage order.
    pub fn lines(&self, record: &str) -> Vec<LineItem> {
        let records = self.records.read().unwrap();
        records
            .iter()
            .find(|r| r.info.guid == record)
            .map(|r| r.lines.clone())
            .unwrap_or_default()
    }

    pub fn property(&self, record: &str, name: &str) -> Option<Property> {
        let records = self.records.read().unwrap();
        records
            .iter()
            .find(|r| r.info.guid == record)
            .and_then(|r| r.properties.iter().find(|p| p.name == name).cloned())
    }

    fn visible(&self, guid: &str) -> bool {
        let mut pending = self.pending.write().unwrap();
        if let Some(left) = pending.get_mut(guid) {
            if *left > 0 {
                *left -= 1;
                return false;
            }
            pending.remove(guid);
        }
        true
    }

    fn find_info(&self, guid: &str) -> Option<RecordInfo> {
        let records = self.records.read().unwrap();
        records
            .iter()
            .find(|r| r.info.guid == guid)
            .map(|r| r.info.clone())
    }
}

impl fmt::Debug for InMemoryWorkspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let records = self.records.read().unwrap();
        f.debug_struct("InMemoryWorkspace")
            .field("records", &records.len())
            .field("native_backreferences", &self.native_backreferences)
            .field("enumerable", &self.enumerable)
            .field("accepts_new_records", &self.accepts_new_records)
            .field("visibility_lag", &self.visibility_lag)
            .field("create_guard", &self.create_guard.is_some())
            .finish()
    }
}

impl Default for InMemoryWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Index one past the last line of the contiguous subtree rooted at `idx`.
fn subtree_end(lines: &[LineItem], idx: usize) -> usize {
    let mut members: HashSet<&str> = HashSet::new();
    members.insert(lines[idx].guid.as_str());
    let mut end = idx + 1;
    while end < lines.len() {
        match lines[end].parent_guid.as_deref() {
            Some(p) if members.contains(p) => {
                members.insert(lines[end].guid.as_str());
                end += 1;
            }
            _ => break,
        }
    }
    end
}

fn position_of(lines: &[LineItem], guid: &str) -> Option<usize> {
    lines.iter().position(|l| l.guid == guid)
}

fn property_from(name: &str, value: &PropertyValue) -> Property {
    let mut p = Property {
        name: name.to_string(),
        ..Default::default()
    };
    match value {
        PropertyValue::DateTime(dt) => p.datetime = Some(*dt),
        PropertyValue::Date(d) => p.date = Some(*d),
        PropertyValue::Number(n) => p.number = Some(*n),
        PropertyValue::Choice(c) => p.choice = Some(c.clone()),
        PropertyValue::Text(t) => p.text = Some(t.clone()),
        PropertyValue::Raw(v) => p.value = Some(v.clone()),
    }
    p
}

#[async_trait]
impl RecordStore for InMemoryWorkspace {
    fn record(&self, guid: &str) -> Option<RecordInfo> {
        let info = self.find_info(guid)?;
        self.visible(guid).then_some(info)
    }

    fn all_records(&self) -> Option<Vec<RecordInfo>> {
        if !self.enumerable {
            return None;
        }
        let records = self.records.read().unwrap();
        Some(records.iter().map(|r| r.info.clone()).collect())
    }

    async fn line_items(&self, record: &str) -> Result<Vec<LineItem>> {
        let records = self.records.read().unwrap();
        records
            .iter()
            .find(|r| r.info.guid == record)
            .map(|r| r.lines.clone())
            .ok_or_else(|| anyhow!("record not found: {}", record))
    }

    async fn create_line_item(&self, record: &str, line: &NewLine) -> Result<Option<String>> {
        if let Some(guard) = &self.create_guard {
            guard(record, line)?;
        }

        let mut records = self.records.write().unwrap();
        let stored = match records.iter_mut().find(|r| r.info.guid == record) {
            Some(r) => r,
            None => bail!("record not found: {}", record),
        };
        let lines = &mut stored.lines;

        if let Some(parent) = &line.parent {
            if position_of(lines, parent).is_none() {
                bail!("parent line not found: {}", parent);
            }
        }

        let insert_at = match (&line.after, &line.parent) {
            (Some(after), _) => {
                let idx = position_of(lines, after)
                    .ok_or_else(|| anyhow!("anchor line not found: {}", after))?;
                if lines[idx].parent_guid != line.parent {
                    bail!("anchor line {} is not a sibling under the requested parent", after);
                }
                subtree_end(lines, idx)
            }
            (None, Some(parent)) => position_of(lines, parent).map(|i| i + 1).unwrap_or(0),
            (None, None) => 0,
        };

        let guid = Uuid::new_v4().to_string();
        let mut item = LineItem::new(guid.clone(), line.kind.clone());
        item.parent_guid = line.parent.clone();
        item.segments = line.segments.clone();
        item.props = line.props.clone();
        lines.insert(insert_at, item);

        Ok(Some(guid))
    }

    async fn backreference_records(&self, record: &str) -> Result<Option<Vec<RecordInfo>>> {
        if !self.native_backreferences {
            return Ok(None);
        }
        let records = self.records.read().unwrap();
        let found = records
            .iter()
            .filter(|r| r.info.guid != record)
            .filter(|r| r.lines.iter().any(|l| line_points_at(l, record)))
            .map(|r| r.info.clone())
            .collect();
        Ok(Some(found))
    }

    fn properties(&self, record: &str) -> Result<Vec<Property>> {
        let records = self.records.read().unwrap();
        records
            .iter()
            .find(|r| r.info.guid == record)
            .map(|r| r.properties.clone())
            .ok_or_else(|| anyhow!("record not found: {}", record))
    }

    fn set_property(&self, record: &str, name: &str, value: &PropertyValue) -> Result<bool> {
        let mut records = self.records.write().unwrap();
        let stored = match records.iter_mut().find(|r| r.info.guid == record) {
            Some(r) => r,
            None => bail!("record not found: {}", record),
        };
        let prop = property_from(name, value);
        match stored.properties.iter_mut().find(|p| p.name == name) {
            Some(existing) => *existing = prop,
            None => stored.properties.push(prop),
        }
        Ok(true)
    }

    async fn set_line_meta(&self, record: &str, line: &str, meta: &LineMeta) -> Result<()> {
        let mut records = self.records.write().unwrap();
        let item = records
            .iter_mut()
            .find(|r| r.info.guid == record)
            .and_then(|r| r.lines.iter_mut().find(|l| l.guid == line))
            .ok_or_else(|| anyhow!("line not found: {}/{}", record, line))?;
        if meta.task_status.is_some() {
            item.task_status = meta.task_status.clone();
        }
        if meta.block_style.is_some() {
            item.block_style = meta.block_style.clone();
        }
        if meta.heading_size.is_some() {
            item.heading_size = meta.heading_size.clone();
        }
        Ok(())
    }
}

impl Collection for InMemoryWorkspace {
    fn create_record(&self, title: &str) -> Result<Option<String>> {
        if !self.accepts_new_records {
            return Ok(None);
        }
        let guid = Uuid::new_v4().to_string();
        self.insert_record(RecordInfo::new(guid.clone(), title), Vec::new(), Vec::new());
        if self.visibility_lag > 0 {
            self.pending
                .write()
                .unwrap()
                .insert(guid.clone(), self.visibility_lag);
        }
        Ok(Some(guid))
    }

    fn records(&self) -> Option<Vec<RecordInfo>> {
        self.all_records()
    }
}
