//! Command implementations.

pub mod completions;
pub mod drafts;
pub mod new;
pub mod scenes;
pub mod version;
pub mod watch;

use std::path::{Path, PathBuf};

use crate::config::{self, LongformSettings};
use crate::error::{Error, Result};
use crate::model::Draft;
use crate::sync::{DiscoveryReport, StoreVaultSync, SyncOptions};
use crate::vault::{get_note, path, FsDirectory};

/// A vault whose drafts have been discovered.
pub(crate) struct OpenVault {
    pub root: PathBuf,
    pub settings: LongformSettings,
    pub sync: StoreVaultSync<FsDirectory>,
    pub report: DiscoveryReport,
}

impl OpenVault {
    /// Published draft indexed at `index_path`.
    ///
    /// An existing note without draft metadata is `NotADraft`; anything
    /// else unknown is `DraftNotFound`.
    pub async fn draft(&self, index_path: &str) -> Result<Draft> {
        let index_path = path::normalize(index_path);
        if let Some(draft) = self
            .sync
            .drafts()
            .into_iter()
            .find(|d| d.vault_path == index_path)
        {
            return Ok(draft);
        }

        if get_note(self.sync.directory(), &index_path).await?.is_some() {
            Err(Error::NotADraft { path: index_path })
        } else {
            Err(Error::DraftNotFound { path: index_path })
        }
    }
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))
}

/// Resolve the vault and build a coordinator configured from its settings.
pub(crate) fn prepare(
    vault: Option<&Path>,
) -> Result<(PathBuf, LongformSettings, StoreVaultSync<FsDirectory>)> {
    let root = config::resolve_vault_root(vault)?;
    let settings = config::load_settings(&root)?;
    let options = SyncOptions {
        write_scene_numbers: config::resolve_write_property(&settings),
    };

    let mut sync = StoreVaultSync::new(FsDirectory::new(root.clone()), options);
    sync.select_draft(settings.selected_draft_vault_path.clone());
    Ok((root, settings, sync))
}

/// Resolve the vault and discover its drafts.
pub(crate) async fn open(vault: Option<&Path>) -> Result<OpenVault> {
    let (root, settings, mut sync) = prepare(vault)?;
    let report = sync.discover_drafts().await?;
    Ok(OpenVault {
        root,
        settings,
        sync,
        report,
    })
}
