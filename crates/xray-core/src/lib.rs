//! # XRay Core
//!
//! Record tree copy and structure rendering over a host-managed record
//! store: data models, host collaborator traits, link sniffing and
//! rewriting, the line creation fallback ladder, the tree copier,
//! backreference resolution, and the structure view.
//!
//! This crate contains no tokio, filesystem I/O, or other runtime-bound
//! dependencies. Hosts plug in through the traits in [`store`]; waiting is
//! done through a caller-supplied sleep function.
//!
//! | Module | Role |
//! |--------|------|
//! | [`models`] | Line items, segments, records, properties |
//! | [`store`] | Host traits and the in-memory workspace |
//! | [`sniff`] | Display-text and link-target resolution ladders |
//! | [`rewrite`] | Point copied link lines at a new record |
//! | [`sanitize`] | Flatten inline links, normalize other segments |
//! | [`summary`] | Plain-text stand-ins for uncopiable lines |
//! | [`create`] | Line creation fallback ladder and diagnostics |
//! | [`tree`] | Parent → children index |
//! | [`copy`] | Tree copier and the copy command |
//! | [`backrefs`] | Native and scanned backreferences |
//! | [`render`] | HTML structure view |

pub mod backrefs;
pub mod copy;
pub mod create;
pub mod models;
pub mod render;
pub mod rewrite;
pub mod sanitize;
pub mod sniff;
pub mod store;
pub mod summary;
pub mod tree;
