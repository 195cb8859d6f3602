//! Configuration management.
//!
//! This module locates the vault and loads the Longform plugin settings
//! stored inside it.
//!
//! # Vault resolution
//!
//! 1. Explicit `--vault` flag
//! 2. `LONGFORM_VAULT` environment variable
//! 3. Nearest ancestor of the current directory containing `.obsidian/`
//! 4. **Error**: no guessing

mod settings;

pub use settings::{
    load_settings, resolve_write_property, save_settings, settings_path, LongformSettings,
};

use crate::error::{Error, Result};

use std::path::{Path, PathBuf};

/// Folder marking a vault root.
pub const VAULT_MARKER: &str = ".obsidian";

/// Environment variable naming the vault root.
pub const VAULT_ENV: &str = "LONGFORM_VAULT";

/// Resolve the vault root for any command.
///
/// # Errors
///
/// Returns `VaultNotFound` if no vault can be located, or an I/O error if
/// an explicit path does not exist.
pub fn resolve_vault_root(explicit: Option<&Path>) -> Result<PathBuf> {
    // 1. Explicit path from CLI flag
    if let Some(path) = explicit {
        return existing_dir(path);
    }

    // 2. Environment variable
    if let Ok(path) = std::env::var(VAULT_ENV) {
        if !path.trim().is_empty() {
            return existing_dir(Path::new(&path));
        }
    }

    // 3. Walk up from CWD
    let cwd = std::env::current_dir()?;
    discover_vault_root(&cwd).ok_or(Error::VaultNotFound { start: cwd })
}

/// Walk up from `start` looking for a folder containing `.obsidian/`.
#[must_use]
pub fn discover_vault_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(VAULT_MARKER).is_dir())
        .map(Path::to_path_buf)
}

fn existing_dir(path: &Path) -> Result<PathBuf> {
    if path.is_dir() {
        Ok(path.to_path_buf())
    } else {
        Err(Error::VaultNotFound {
            start: path.to_path_buf(),
        })
    }
}
