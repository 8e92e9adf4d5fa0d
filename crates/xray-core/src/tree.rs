//! Parent → children index over a flat line-item list.
//!
//! Hosts hand out a record's lines as one flat, source-ordered list where
//! hierarchy lives only in `parent_guid`. The index is built once per
//! operation and shared by the tree copier and the structure renderer.
//!
//! ```text
//!   flat list                     index
//!   ─────────                     ─────
//!   a  (no parent)                None  → [a, d, e]
//!   b  (parent a)                 "a"   → [b, c]
//!   c  (parent a)
//!   d  (parent "zz", dangling)
//!   e  (parent e, itself)
//! ```
//!
//! A parent reference that is absent, empty, dangling, or points at the
//! line itself puts the line in the root bucket (`None`). Every line lands
//! in exactly one bucket. Cycles are not detected here; walkers keep their
//! own visited set.

use std::collections::{HashMap, HashSet};

use crate::models::LineItem;

/// Children of each parent, in source order. `None` is the root bucket.
#[derive(Debug, Default)]
pub struct TreeIndex<'a> {
    children: HashMap<Option<&'a str>, Vec<&'a LineItem>>,
    len: usize,
}

impl<'a> TreeIndex<'a> {
    pub fn build(items: &'a [LineItem]) -> Self {
        let ids: HashSet<&str> = items.iter().map(|i| i.guid.as_str()).collect();
        let mut children: HashMap<Option<&'a str>, Vec<&'a LineItem>> = HashMap::new();

        for item in items {
            let parent = item
                .parent_guid
                .as_deref()
                .filter(|p| !p.is_empty() && *p != item.guid && ids.contains(p));
            children.entry(parent).or_default().push(item);
        }

        Self {
            children,
            len: items.len(),
        }
    }

    /// Direct children of `parent` (`None` for the roots).
    pub fn children(&self, parent: Option<&'a str>) -> &[&'a LineItem] {
        self.children
            .get(&parent)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn roots(&self) -> &[&'a LineItem] {
        self.children(None)
    }

    /// Number of lines indexed.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
