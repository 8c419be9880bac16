//! Application data directory resolution.
//!
//! Everything lives in a fixed, on-demand-created per-user data directory
//! with normal user file permissions. `ST_DATA_DIR` overrides it for tests
//! and scripted runs.

use std::path::PathBuf;

use crate::error::{Result, TweakError};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "ST_DATA_DIR";

/// Resolve the per-user application data directory.
pub fn data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_local_dir()
        .map(|dir| dir.join("systweak"))
        .ok_or_else(|| TweakError::Other("Could not determine data directory".to_string()))
}

/// Directory holding the per-subsystem snapshot slot files.
pub fn snapshot_dir() -> Result<PathBuf> {
    Ok(data_dir()?.join("snapshots"))
}

/// Backing file for the local configuration store.
pub fn store_file() -> Result<PathBuf> {
    Ok(data_dir()?.join("store.json"))
}
