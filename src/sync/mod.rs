//! Draft sync engine.
//!
//! Keeps the published draft list and the `longform` metadata in index
//! notes consistent in both directions:
//!
//! - **Discovery**: walk the vault, derive a draft from every index note,
//!   prune scenes whose notes are gone, publish the list
//! - **Reconciliation**: re-derive drafts as notes change, appear, move or
//!   disappear
//! - **Write-back**: persist mutated drafts into their index notes, with
//!   self-write suppression so our own writes are not reconciled again
//!
//! # Example
//!
//! ```ignore
//! use longform::sync::{StoreVaultSync, SyncOptions, ops};
//! use longform::vault::FsDirectory;
//!
//! let mut sync = StoreVaultSync::new(FsDirectory::new(vault_root), SyncOptions::default());
//! sync.discover_drafts().await?;
//! sync.update_drafts(|drafts| ops::indent_scene(drafts, "Novel/Chapter 2.md")).await?;
//! ```

pub mod coordinator;
pub mod derive;
pub mod events;
pub mod ignore;
pub mod ops;
pub mod paths;

pub use coordinator::{DiscoveryReport, Reconciliation, StoreVaultSync, SyncOptions};
pub use derive::{draft_for, partition, DerivedDraft, Partition};
pub use events::{DraftUpdate, SyncEvent, SyncHandle};
pub use ignore::IgnoreMatcher;
pub use ops::{Direction, SceneInsertion};
pub use paths::{draft_for_path, find_scene, scene_folder_path, scene_path, SceneLocation};
