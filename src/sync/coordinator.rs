//! Two-way sync between index-note metadata and the published draft list.
//!
//! [`StoreVaultSync`] is the only writer of the published list. File-system
//! events flow in through the `on_*` handlers; model mutations flow in
//! through [`StoreVaultSync::update_drafts`]. Both end in the same publish
//! step, which notifies subscribers and writes every changed draft back to
//! its index note.
//!
//! Every write-back first records its path in a pending set. The change
//! notification that write produces consumes that entry and is dropped, so
//! the coordinator never reacts to its own writes.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use serde::Serialize;
use serde_yaml::{Mapping, Value};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::derive::{self, DerivedDraft};
use super::ignore::IgnoreMatcher;
use super::ops::{self, SceneInsertion};
use super::paths::{find_scene, scene_folder_of, scene_path};
use crate::error::{Error, Result};
use crate::model::record::{self, LONGFORM_KEY};
use crate::model::{scene, Draft, DraftKind, LongformRecord};
use crate::vault::{get_note, path, walk_notes, Directory, Note};

/// Behavior switches for the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Write `longform-order` / `longform-number` onto scene notes after
    /// each index write-back.
    pub write_scene_numbers: bool,
}

/// Outcome of [`StoreVaultSync::discover_drafts`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    /// Drafts published.
    pub drafts: usize,
    /// Dirty drafts written back.
    pub written: usize,
}

/// What a metadata change did to the published list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Caused by our own write-back; nothing done.
    Suppressed,
    /// Not a draft before or after.
    Ignored,
    /// Draft unchanged.
    Unchanged,
    /// Draft added or updated.
    Updated,
    /// Draft no longer has a `longform` block.
    Removed,
}

/// Coordinator between vault notes and the published draft list.
pub struct StoreVaultSync<D: Directory> {
    directory: D,
    options: SyncOptions,
    drafts: watch::Sender<Vec<Draft>>,
    selected: watch::Sender<Option<String>>,
    last_known: HashMap<String, Draft>,
    pending_self_writes: HashSet<String>,
    watching: bool,
}

impl<D: Directory> StoreVaultSync<D> {
    /// Create a coordinator over the vault root `directory`.
    pub fn new(directory: D, options: SyncOptions) -> Self {
        let (drafts, _) = watch::channel(Vec::new());
        let (selected, _) = watch::channel(None);
        Self {
            directory,
            options,
            drafts,
            selected,
            last_known: HashMap::new(),
            pending_self_writes: HashSet::new(),
            watching: false,
        }
    }

    /// The vault this coordinator syncs.
    pub const fn directory(&self) -> &D {
        &self.directory
    }

    /// Snapshot of the published draft list.
    #[must_use]
    pub fn drafts(&self) -> Vec<Draft> {
        self.drafts.borrow().clone()
    }

    /// Subscribe to the published draft list.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<Draft>> {
        self.drafts.subscribe()
    }

    /// Subscribe to the selected draft path.
    #[must_use]
    pub fn subscribe_selected(&self) -> watch::Receiver<Option<String>> {
        self.selected.subscribe()
    }

    /// Currently selected draft path.
    #[must_use]
    pub fn selected_draft(&self) -> Option<String> {
        self.selected.borrow().clone()
    }

    /// Whether a write-back to `path` is still waiting for its notification.
    #[must_use]
    pub fn is_self_write_pending(&self, path: &str) -> bool {
        self.pending_self_writes.contains(path)
    }

    /// Select a draft by index path, or clear the selection.
    pub fn select_draft(&mut self, vault_path: Option<String>) {
        let vault_path = vault_path.map(|p| path::normalize(&p));
        debug!(selected = ?vault_path, "Selecting draft");
        self.selected.send_replace(vault_path);
    }

    /// Enumerate every note with a `longform` block and publish the drafts.
    ///
    /// Dirty drafts are written back immediately. Event handlers are inert
    /// until this has run once.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault cannot be walked.
    pub async fn discover_drafts(&mut self) -> Result<DiscoveryReport> {
        let started = Instant::now();
        let mut found: Vec<DerivedDraft> = Vec::new();

        for vault_path in walk_notes(&self.directory).await? {
            let Some(note) = get_note(&self.directory, &vault_path).await? else {
                continue;
            };
            let metadata = match note.read_metadata().await {
                Ok(Some(metadata)) => metadata,
                Ok(None) => continue,
                Err(e) => {
                    warn!(path = %vault_path, error = %e, "Skipping unreadable note");
                    continue;
                }
            };
            if !LongformRecord::is_present(&metadata) {
                continue;
            }
            match derive::derive_from(&self.directory, &note, &metadata, true).await {
                Ok(Some(derived)) => found.push(derived),
                Ok(None) => {}
                Err(e) => warn!(path = %vault_path, error = %e, "Failed to derive draft"),
            }
        }

        let mut report = DiscoveryReport::default();
        let mut failed = HashSet::new();
        for derived in found.iter().filter(|d| d.dirty) {
            match self.write_draft(&derived.draft).await {
                Ok(()) => report.written += 1,
                Err(e) => {
                    error!(path = %derived.draft.vault_path, error = %e, "Failed to write back pruned draft");
                    failed.insert(derived.draft.vault_path.clone());
                }
            }
        }

        let drafts: Vec<Draft> = found.into_iter().map(|d| d.draft).collect();
        // unwritten dirty drafts stay out of the snapshot so the next
        // mutation retries them
        self.last_known = drafts
            .iter()
            .filter(|d| !failed.contains(&d.vault_path))
            .map(|d| (d.vault_path.clone(), d.clone()))
            .collect();
        report.drafts = drafts.len();
        self.drafts.send_replace(drafts);
        self.watching = true;

        info!(
            count = report.drafts,
            written = report.written,
            elapsed_ms = started.elapsed().as_millis(),
            "Loaded and watching drafts"
        );
        Ok(report)
    }

    /// Reconcile a note whose metadata changed.
    ///
    /// `metadata` is what the notifier reported, if anything; without it
    /// the note is read directly.
    ///
    /// # Errors
    ///
    /// Returns an error if the note cannot be read or a write-back fails.
    pub async fn on_metadata_changed(
        &mut self,
        vault_path: &str,
        metadata: Option<Mapping>,
    ) -> Result<Reconciliation> {
        if !self.watching {
            return Ok(Reconciliation::Ignored);
        }
        let vault_path = path::normalize(vault_path);
        if self.pending_self_writes.remove(&vault_path) {
            debug!(path = %vault_path, "Ignoring change from own write-back");
            return Ok(Reconciliation::Suppressed);
        }

        let derived = match get_note(&self.directory, &vault_path).await? {
            Some(note) => derive::draft_for(&self.directory, &note, metadata).await?,
            None => None,
        };

        let Some(DerivedDraft { draft, dirty }) = derived else {
            let known = self.last_known.contains_key(&vault_path)
                || self.drafts.borrow().iter().any(|d| d.vault_path == vault_path);
            if !known {
                return Ok(Reconciliation::Ignored);
            }
            info!(path = %vault_path, "Draft metadata removed");
            self.remove_draft(&vault_path).await?;
            return Ok(Reconciliation::Removed);
        };

        let published = self
            .drafts
            .borrow()
            .iter()
            .any(|d| d.vault_path == vault_path);
        if !dirty && published && self.last_known.get(&vault_path) == Some(&draft) {
            return Ok(Reconciliation::Unchanged);
        }

        if dirty {
            // force a write of the pruned list
            self.last_known.remove(&vault_path);
        } else {
            self.last_known.insert(vault_path.clone(), draft.clone());
        }

        let mut drafts = self.drafts();
        match drafts.iter_mut().find(|d| d.vault_path == vault_path) {
            Some(existing) => *existing = draft,
            None => drafts.push(draft),
        }
        debug!(path = %vault_path, dirty, "Draft updated from metadata");
        self.publish(drafts).await?;
        Ok(Reconciliation::Updated)
    }

    /// A file appeared in the vault.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting write-back fails.
    pub async fn on_file_created(&mut self, vault_path: &str) -> Result<()> {
        if !self.watching {
            return Ok(());
        }
        let vault_path = path::normalize(vault_path);
        let mut drafts = self.drafts();
        if add_unknown_file(&mut drafts, &vault_path) {
            debug!(path = %vault_path, "New file in scene folder");
            self.publish(drafts).await?;
        }
        Ok(())
    }

    /// A file was removed from the vault.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting write-back fails.
    pub async fn on_file_deleted(&mut self, vault_path: &str) -> Result<()> {
        if !self.watching {
            return Ok(());
        }
        let vault_path = path::normalize(vault_path);
        self.pending_self_writes.remove(&vault_path);

        if self.drafts.borrow().iter().any(|d| d.vault_path == vault_path) {
            info!(path = %vault_path, "Index note deleted");
            return self.remove_draft(&vault_path).await;
        }

        let mut drafts = self.drafts();
        if remove_file_references(&mut drafts, &vault_path) {
            debug!(path = %vault_path, "Removed file from draft");
            self.publish(drafts).await?;
        }
        Ok(())
    }

    /// A file moved from `old_path` to `vault_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting write-back fails.
    pub async fn on_file_renamed(&mut self, vault_path: &str, old_path: &str) -> Result<()> {
        if !self.watching {
            return Ok(());
        }
        let vault_path = path::normalize(vault_path);
        let old_path = path::normalize(old_path);
        let mut drafts = self.drafts();

        // index note renamed
        if let Some(draft) = drafts.iter_mut().find(|d| d.vault_path == old_path) {
            info!(from = %old_path, to = %vault_path, "Index note renamed");
            draft.vault_path.clone_from(&vault_path);
            if !draft.title_in_frontmatter {
                draft.title = path::note_stem(&vault_path);
            }
            if let Some(draft) = self.last_known.remove(&old_path) {
                self.last_known.insert(vault_path.clone(), draft);
            }
            if self.selected.borrow().as_deref() == Some(old_path.as_str()) {
                self.selected.send_replace(Some(vault_path));
            }
            return self.publish(drafts).await;
        }

        // scene renamed within its folder
        if path::is_note(&vault_path) && path::parent(&vault_path) == path::parent(&old_path) {
            if let Some(location) = find_scene(&old_path, &drafts) {
                if let Some(scenes) = drafts[location.draft].scene_draft_mut() {
                    let title = path::note_stem(&vault_path);
                    debug!(from = %old_path, title = %title, "Scene renamed");
                    scenes.unknown_files.retain(|f| *f != title);
                    scenes.scenes[location.scene].title = title;
                }
                return self.publish(drafts).await;
            }
        }

        // moved between folders (or renamed away from being a note)
        let removed = remove_file_references(&mut drafts, &old_path);
        let added = add_unknown_file(&mut drafts, &vault_path);
        if removed || added {
            debug!(from = %old_path, to = %vault_path, "File moved");
            self.publish(drafts).await?;
        }
        Ok(())
    }

    /// Apply a mutation to a copy of the published list and publish it.
    ///
    /// Nothing is published when `mutate` fails.
    ///
    /// # Errors
    ///
    /// Returns `mutate`'s error, or a write-back failure.
    pub async fn update_drafts<F, R>(&mut self, mutate: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<Draft>) -> Result<R>,
    {
        let mut drafts = self.drafts();
        let result = mutate(&mut drafts)?;
        self.publish(drafts).await?;
        Ok(result)
    }

    /// Create a scene note and insert it into a draft.
    ///
    /// Returns the new scene's vault path.
    ///
    /// # Errors
    ///
    /// Fails if the draft is unknown or not a scene draft, the position is
    /// out of range, or the note already exists.
    pub async fn insert_scene(
        &mut self,
        index_path: &str,
        title: &str,
        at: SceneInsertion,
    ) -> Result<String> {
        let index_path = path::normalize(index_path);
        let drafts = self.drafts();
        let draft = drafts
            .iter()
            .find(|d| d.vault_path == index_path)
            .ok_or_else(|| Error::DraftNotFound {
                path: index_path.clone(),
            })?;
        let folder = scene_folder_of(draft).ok_or_else(|| Error::InvalidArgument(format!(
            "{index_path} is a single-note draft"
        )))?;
        let scene_note = scene_path(draft, title)
            .ok_or_else(|| Error::InvalidPath(title.to_string()))?;

        // validate before touching the disk
        if self.directory.path_exists(&scene_note).await? {
            return Err(Error::PathExists { path: scene_note });
        }
        let mut preview = draft.clone();
        ops::insert_scene_entry(&mut preview, title, at)?;

        if !folder.is_empty() && !self.directory.path_exists(&folder).await? {
            self.directory.create_directory(&folder).await?;
        }
        self.directory.create_file(&scene_note, None).await?;
        info!(path = %scene_note, "Created scene");

        let draft_path = index_path.clone();
        let title = title.to_string();
        self.update_drafts(move |drafts| {
            let draft = drafts
                .iter_mut()
                .find(|d| d.vault_path == draft_path)
                .ok_or(Error::DraftNotFound { path: draft_path.clone() })?;
            ops::insert_scene_entry(draft, &title, at)
        })
        .await?;
        Ok(scene_note)
    }

    /// Write scene number properties for every published scene draft.
    ///
    /// Returns the number of scene notes written.
    ///
    /// # Errors
    ///
    /// Returns the first failure after attempting every scene.
    pub async fn sync_scene_indices(&mut self) -> Result<usize> {
        let mut written = 0;
        let mut failed = Vec::new();
        let mut message = String::new();
        for draft in self.drafts() {
            match self.write_scene_numbers(&draft).await {
                Ok(count) => written += count,
                Err(Error::WriteBackFailed { paths, message: m }) => {
                    failed.extend(paths);
                    message = m;
                }
                Err(e) => return Err(e),
            }
        }
        if failed.is_empty() {
            Ok(written)
        } else {
            Err(Error::WriteBackFailed { paths: failed, message })
        }
    }

    /// Notify subscribers and write back changed drafts.
    async fn publish(&mut self, drafts: Vec<Draft>) -> Result<()> {
        self.drafts.send_replace(drafts.clone());
        if self.watching {
            self.on_model_mutated(&drafts).await?;
        }
        Ok(())
    }

    /// Write every draft whose persisted form differs from the last
    /// confirmed snapshot.
    ///
    /// The snapshot only advances for drafts whose write succeeded, so a
    /// failed write is retried on the next mutation.
    async fn on_model_mutated(&mut self, drafts: &[Draft]) -> Result<usize> {
        let mut next_known = HashMap::with_capacity(drafts.len());
        let mut written = 0;
        let mut failed = Vec::new();
        let mut message = String::new();

        for draft in drafts {
            let changed = self
                .last_known
                .get(&draft.vault_path)
                .is_none_or(|known| !same_record(known, draft));
            if !changed {
                next_known.insert(draft.vault_path.clone(), draft.clone());
                continue;
            }
            match self.write_draft(draft).await {
                Ok(()) => {
                    written += 1;
                    next_known.insert(draft.vault_path.clone(), draft.clone());
                }
                Err(e) => {
                    error!(path = %draft.vault_path, error = %e, "Failed to write draft");
                    if let Some(known) = self.last_known.get(&draft.vault_path) {
                        next_known.insert(draft.vault_path.clone(), known.clone());
                    }
                    failed.push(draft.vault_path.clone());
                    message = e.to_string();
                }
            }
        }

        self.last_known = next_known;
        if failed.is_empty() {
            Ok(written)
        } else {
            Err(Error::WriteBackFailed { paths: failed, message })
        }
    }

    /// Persist a draft into its index note's `longform` block.
    async fn write_draft(&mut self, draft: &Draft) -> Result<()> {
        let Some(note) = get_note(&self.directory, &draft.vault_path).await? else {
            warn!(path = %draft.vault_path, "Index note missing, skipping write");
            return Ok(());
        };

        let block = serde_yaml::to_value(LongformRecord::from_draft(draft))?;
        self.pending_self_writes.insert(draft.vault_path.clone());
        let result = note
            .modify_metadata(move |fm| {
                fm.insert(Value::String(LONGFORM_KEY.to_string()), block);
            })
            .await;
        if let Err(e) = result {
            self.pending_self_writes.remove(&draft.vault_path);
            return Err(e);
        }
        debug!(path = %draft.vault_path, "Wrote draft metadata");

        if self.options.write_scene_numbers {
            if let Err(e) = self.write_scene_numbers(draft).await {
                warn!(path = %draft.vault_path, error = %e, "Failed to write scene numbers");
            }
        }
        Ok(())
    }

    /// Write order and number properties onto each existing scene note.
    async fn write_scene_numbers(&mut self, draft: &Draft) -> Result<usize> {
        let DraftKind::Scenes(scenes) = &draft.kind else {
            return Ok(0);
        };
        let mut written = 0;
        let mut failed = Vec::new();
        let mut message = String::new();

        for (order, numbered) in scene::number_scenes(&scenes.scenes).into_iter().enumerate() {
            let Some(scene_note) = scene_path(draft, &numbered.title) else {
                continue;
            };
            let Some(note) = get_note(&self.directory, &scene_note).await? else {
                continue;
            };
            self.pending_self_writes.insert(scene_note.clone());
            let numbering = numbered.numbering;
            let result = note
                .modify_metadata(move |fm| record::write_scene_number(fm, order, &numbering))
                .await;
            match result {
                Ok(()) => written += 1,
                Err(e) => {
                    self.pending_self_writes.remove(&scene_note);
                    message = e.to_string();
                    failed.push(scene_note);
                }
            }
        }

        if failed.is_empty() {
            Ok(written)
        } else {
            Err(Error::WriteBackFailed { paths: failed, message })
        }
    }

    /// Drop a draft from the list and fix up the selection.
    async fn remove_draft(&mut self, vault_path: &str) -> Result<()> {
        let mut drafts = self.drafts();
        drafts.retain(|d| d.vault_path != vault_path);
        self.last_known.remove(vault_path);

        if self.selected.borrow().as_deref() == Some(vault_path) {
            let next = drafts.first().map(|d| d.vault_path.clone());
            debug!(selected = ?next, "Reassigning selection");
            self.selected.send_replace(next);
        }
        self.publish(drafts).await
    }
}

/// Whether two drafts serialize to the same `longform` block.
fn same_record(a: &Draft, b: &Draft) -> bool {
    LongformRecord::from_draft(a) == LongformRecord::from_draft(b)
}

/// Record a new note as an unknown file of the draft owning its folder.
fn add_unknown_file(drafts: &mut [Draft], vault_path: &str) -> bool {
    if !path::is_note(vault_path) {
        return false;
    }
    let folder = path::parent(vault_path);
    let name = path::note_stem(vault_path);

    for draft in drafts.iter_mut() {
        if draft.vault_path == vault_path || scene_folder_of(draft).as_deref() != Some(folder.as_str()) {
            continue;
        }
        let Some(scenes) = draft.scene_draft_mut() else {
            continue;
        };
        if scenes.has_scene(&name)
            || scenes.unknown_files.contains(&name)
            || IgnoreMatcher::new(&scenes.ignored_files).is_match(&name)
        {
            return false;
        }
        scenes.unknown_files.push(name);
        return true;
    }
    false
}

/// Remove a path from whichever draft tracks it as a scene or unknown file.
fn remove_file_references(drafts: &mut [Draft], vault_path: &str) -> bool {
    if let Some(location) = find_scene(vault_path, drafts) {
        if let Some(scenes) = drafts[location.draft].scene_draft_mut() {
            scenes.scenes.remove(location.scene);
            return true;
        }
    }

    let folder = path::parent(vault_path);
    let name = path::note_stem(vault_path);
    let mut changed = false;
    for draft in drafts.iter_mut() {
        if scene_folder_of(draft).as_deref() != Some(folder.as_str()) {
            continue;
        }
        if let Some(scenes) = draft.scene_draft_mut() {
            let before = scenes.unknown_files.len();
            scenes.unknown_files.retain(|f| *f != name);
            changed |= scenes.unknown_files.len() != before;
        }
    }
    changed
}
