//! # XRay
//!
//! Record tree copy and structure inspection for outline-style workspaces.
//!
//! The engine lives in the `xray-core` crate; this crate is the reference
//! host around it: TOML configuration, logging setup, JSON workspace
//! snapshots, and the `xray` command-line interface.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌──────────────┐
//! │  Snapshot    │──▶│ InMemoryWorkspace│──▶│  xray-core   │
//! │  (JSON)      │   │ RecordStore +    │   │ copy/render/ │
//! └──────────────┘   │ Collection       │   │ backrefs     │
//!        ▲           └──────────────────┘   └──────┬───────┘
//!        │                                         │
//!        └──────────── copy writes back ◀──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! xray --workspace ws.json copy <record-guid>
//! xray --workspace ws.json structure <record-guid> --out view.html
//! xray --workspace ws.json backrefs <record-guid>
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`workspace`] | Snapshot load/save |
//! | [`copy_cmd`] | `xray copy` |
//! | [`structure`] | `xray structure` |
//! | [`backrefs_cmd`] | `xray backrefs` |

pub mod backrefs_cmd;
pub mod config;
pub mod copy_cmd;
pub mod logging;
pub mod structure;
pub mod workspace;
