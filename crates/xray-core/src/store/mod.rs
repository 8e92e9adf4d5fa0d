//! Host collaborator contracts.
//!
//! The engine never owns records or line items. It talks to the host
//! through these traits, keyed by record identifier, so the same copy and
//! render code runs against a live editor bridge or the in-memory
//! [`memory::InMemoryWorkspace`] used by tests and the reference CLI.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{LineItem, LineMeta, NewLine, Property, PropertyValue, RecordInfo};

/// Record and line-item access for one host workspace.
///
/// Lookups are synchronous (hosts answer them from an in-process cache);
/// line reads and writes are async and may fail.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`record`](RecordStore::record) | Look a record up by identifier |
/// | [`all_records`](RecordStore::all_records) | Enumerate every record (scan fallback only) |
/// | [`line_items`](RecordStore::line_items) | Flat snapshot of a record's lines |
/// | [`create_line_item`](RecordStore::create_line_item) | Materialize one line |
/// | [`backreference_records`](RecordStore::backreference_records) | Native inbound-link query |
/// | [`properties`](RecordStore::properties) | Typed record properties |
/// | [`set_property`](RecordStore::set_property) | Write one property value |
/// | [`set_line_meta`](RecordStore::set_line_meta) | Task status / block style / heading size |
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Look up a record by identifier.
    fn record(&self, guid: &str) -> Option<RecordInfo>;

    /// Every record in the workspace, or `None` when the host has no
    /// enumeration accessor.
    fn all_records(&self) -> Option<Vec<RecordInfo>> {
        None
    }

    /// Flat, source-ordered list of a record's line items.
    async fn line_items(&self, record: &str) -> Result<Vec<LineItem>>;

    /// Create a line. `Ok(None)` means the host declined without raising.
    async fn create_line_item(&self, record: &str, line: &NewLine) -> Result<Option<String>>;

    /// Records linking to `record` via the host's own index.
    ///
    /// `Ok(None)` means the host exposes no such API.
    async fn backreference_records(&self, _record: &str) -> Result<Option<Vec<RecordInfo>>> {
        Ok(None)
    }

    /// All properties of a record.
    fn properties(&self, record: &str) -> Result<Vec<Property>>;

    /// Write one property. `Ok(false)` means the destination has no slot
    /// with that name.
    fn set_property(&self, record: &str, name: &str, value: &PropertyValue) -> Result<bool>;

    /// Apply line metadata to a created line.
    async fn set_line_meta(&self, record: &str, line: &str, meta: &LineMeta) -> Result<()>;
}

/// The collection a new destination record is created in.
pub trait Collection: Send + Sync {
    /// Create a record, returning its identifier.
    fn create_record(&self, title: &str) -> Result<Option<String>>;

    /// Collection-scoped lookup, when the host offers one.
    fn find_record(&self, _guid: &str) -> Option<RecordInfo> {
        None
    }

    /// Collection listing, when the host offers one.
    fn records(&self) -> Option<Vec<RecordInfo>> {
        None
    }
}

/// Sink for user-facing transient notices (toasts).
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str, duration_ms: u64);
}

/// Notifier that discards everything.
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _title: &str, _message: &str, _duration_ms: u64) {}
}

/// `getRecord(identifier)` as seen by the copy engine.
pub trait RecordLookup: Send + Sync {
    fn lookup(&self, guid: &str) -> Option<RecordInfo>;
}

/// Composes the host accessors into one lookup: store first, then the
/// collection's own lookup, then a linear pass over the collection listing.
pub struct LookupChain<'a> {
    store: &'a dyn RecordStore,
    collection: Option<&'a dyn Collection>,
}

impl<'a> LookupChain<'a> {
    pub fn new(store: &'a dyn RecordStore, collection: Option<&'a dyn Collection>) -> Self {
        Self { store, collection }
    }
}

impl RecordLookup for LookupChain<'_> {
    fn lookup(&self, guid: &str) -> Option<RecordInfo> {
        if let Some(r) = self.store.record(guid) {
            return Some(r);
        }
        let col = self.collection?;
        if let Some(r) = col.find_record(guid) {
            return Some(r);
        }
        col.records()?.into_iter().find(|r| r.guid == guid)
    }
}

impl<F> RecordLookup for F
where
    F: Fn(&str) -> Option<RecordInfo> + Send + Sync,
{
    fn lookup(&self, guid: &str) -> Option<RecordInfo> {
        self(guid)
    }
}
