//! Systweak CLI library - snapshot-based system tweak management.
//!
//! This library exposes the core functionality of the `st` CLI for use in
//! tests and potentially other applications.
//!
//! # Modules
//!
//! - `store`: Hierarchical key/value store abstraction with typed values
//! - `control`: Service and power-scheme capability surfaces
//! - `catalog`: Immutable registry of named tweaks
//! - `snapshot`: Capture-before-mutate "before" records and persistence
//! - `engine`: Apply/restore orchestration per subsystem
//! - `startup`: Startup item enable/disable toggle
//! - `error`: Error types with user-recoverable hints
#![forbid(unsafe_code)]

pub mod catalog;
pub mod cli;
pub mod control;
pub mod engine;
pub mod error;
pub mod logging;
pub mod paths;
pub mod snapshot;
pub mod startup;
pub mod store;
