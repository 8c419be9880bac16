//! Snapshot capture and persistence for configuration state.
//!
//! This module provides the "before" record that makes every tweak
//! reversible: capture runs before any mutation, the snapshot is persisted
//! with atomic replace before the first write is issued, and the restore
//! engine replays it backward.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.local/share/systweak/
//! └── snapshots/
//!     ├── gaming.json          # one slot per subsystem
//!     ├── network.json
//!     ├── privacy.json
//!     └── power.json
//! ```

mod manager;
mod schema;

pub use manager::{CapturePlan, SnapshotManager};
pub use schema::{ConfigEntry, Snapshot};
