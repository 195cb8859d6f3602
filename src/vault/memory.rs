//! In-memory vault.
//!
//! Mirrors the behavior of [`super::FsDirectory`] closely enough to drive
//! the sync engine in tests, and records every front matter write so tests
//! can assert on write-back.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_yaml::Mapping;

use super::{frontmatter, path, relative_to, Directory, Entry, Listing, Note};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default)]
struct NoteData {
    frontmatter: Option<Mapping>,
    body: String,
    read_only: bool,
}

#[derive(Debug, Default)]
struct State {
    folders: BTreeSet<String>,
    notes: BTreeMap<String, NoteData>,
    metadata_writes: Vec<String>,
}

impl State {
    fn is_folder(&self, path: &str) -> bool {
        path.is_empty() || self.folders.contains(path)
    }
}

/// Shared in-memory folder tree.
///
/// Clones share the same tree; a clone obtained from
/// [`Directory::get_path`] is rooted at a sub-folder.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    state: Arc<Mutex<State>>,
    location: String,
}

impl MemoryDirectory {
    /// Empty vault.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve(&self, path: &str) -> String {
        path::join(&self.location, path)
    }

    /// Create a note with content, creating parent folders as needed.
    ///
    /// # Errors
    ///
    /// Fails if the content has malformed front matter or the path is taken.
    pub async fn add_note(&self, path: &str, content: &str) -> Result<MemoryNote> {
        let parent = path::parent(&self.resolve(path));
        if !parent.is_empty() {
            self.create_directory(&relative_to(&self.location, &parent)).await?;
        }
        self.create_file(path, Some(content)).await
    }

    /// Delete a note or folder (with its contents).
    pub fn remove(&self, path: &str) {
        let full = self.resolve(path);
        let prefix = format!("{full}/");
        let mut state = self.state();
        state.notes.remove(&full);
        state.notes.retain(|p, _| !p.starts_with(&prefix));
        state.folders.remove(&full);
        state.folders.retain(|p| !p.starts_with(&prefix));
    }

    /// Move a note to a new path. The target's parent must exist.
    ///
    /// # Errors
    ///
    /// Fails if the source is missing or the target is taken.
    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from = self.resolve(from);
        let to = self.resolve(to);
        let mut state = self.state();
        if state.notes.contains_key(&to) || state.folders.contains(&to) {
            return Err(Error::PathExists { path: to });
        }
        if !state.is_folder(&path::parent(&to)) {
            return Err(Error::ParentMissing { path: to });
        }
        let data = state
            .notes
            .remove(&from)
            .ok_or(Error::PathNotFound { path: from })?;
        state.notes.insert(to, data);
        Ok(())
    }

    /// Replace a note's front matter without recording a write, as an
    /// external editor would.
    ///
    /// # Errors
    ///
    /// Fails if the note does not exist.
    pub fn set_frontmatter(&self, path: &str, frontmatter: Option<Mapping>) -> Result<()> {
        let full = self.resolve(path);
        let mut state = self.state();
        let data = state
            .notes
            .get_mut(&full)
            .ok_or(Error::PathNotFound { path: full.clone() })?;
        data.frontmatter = frontmatter;
        Ok(())
    }

    /// Make front matter writes to a note fail (or succeed again).
    pub fn set_read_only(&self, path: &str, read_only: bool) {
        let full = self.resolve(path);
        if let Some(data) = self.state().notes.get_mut(&full) {
            data.read_only = read_only;
        }
    }

    /// Current front matter of a note.
    #[must_use]
    pub fn frontmatter(&self, path: &str) -> Option<Mapping> {
        let full = self.resolve(path);
        self.state()
            .notes
            .get(&full)
            .and_then(|data| data.frontmatter.clone())
    }

    /// Full text of a note as it would be written to disk.
    #[must_use]
    pub fn content(&self, path: &str) -> Option<String> {
        let full = self.resolve(path);
        let state = self.state();
        let data = state.notes.get(&full)?;
        match &data.frontmatter {
            Some(fm) => frontmatter::render(fm, &data.body).ok(),
            None => Some(data.body.clone()),
        }
    }

    /// Paths of every front matter write so far, in order.
    #[must_use]
    pub fn metadata_writes(&self) -> Vec<String> {
        self.state().metadata_writes.clone()
    }

    /// Forget recorded writes.
    pub fn clear_metadata_writes(&self) {
        self.state().metadata_writes.clear();
    }
}

impl Directory for MemoryDirectory {
    type Note = MemoryNote;

    fn location(&self) -> &str {
        &self.location
    }

    async fn path_exists(&self, path: &str) -> Result<bool> {
        let full = self.resolve(path);
        let state = self.state();
        Ok(state.is_folder(&full) || state.notes.contains_key(&full))
    }

    async fn create_directory(&self, path: &str) -> Result<()> {
        let full = self.resolve(path);
        if full.is_empty() {
            return Err(Error::InvalidPath("cannot create the vault root".to_string()));
        }

        let mut state = self.state();
        let mut prefix = String::new();
        let mut to_create = Vec::new();
        for part in full.split('/') {
            prefix = path::join(&prefix, part);
            if state.notes.contains_key(&prefix) {
                return Err(Error::WrongPathKind {
                    path: prefix,
                    expected: "folder",
                });
            }
            to_create.push(prefix.clone());
        }
        state.folders.extend(to_create);
        Ok(())
    }

    async fn create_file(&self, path: &str, content: Option<&str>) -> Result<MemoryNote> {
        let full = self.resolve(path);
        if full.is_empty() {
            return Err(Error::InvalidPath("file path cannot be empty".to_string()));
        }

        let parsed = match content {
            Some(text) => frontmatter::parse(text).map_err(|e| Error::MalformedMetadata {
                path: full.clone(),
                message: e.to_string(),
            })?,
            None => frontmatter::NoteContent {
                frontmatter: None,
                body: String::new(),
            },
        };

        let mut state = self.state();
        if state.notes.contains_key(&full) || state.folders.contains(&full) {
            return Err(Error::PathExists { path: full });
        }
        let parent = path::parent(&full);
        if state.notes.contains_key(&parent) {
            return Err(Error::WrongPathKind {
                path: parent,
                expected: "folder",
            });
        }
        if !state.is_folder(&parent) {
            return Err(Error::ParentMissing { path: full });
        }

        state.notes.insert(
            full.clone(),
            NoteData {
                frontmatter: parsed.frontmatter,
                body: parsed.body,
                read_only: false,
            },
        );
        Ok(MemoryNote {
            state: Arc::clone(&self.state),
            path: full,
        })
    }

    async fn get_path(&self, path: &str) -> Result<Option<Entry<Self, MemoryNote>>> {
        let full = self.resolve(path);
        let state = self.state();
        if state.is_folder(&full) {
            return Ok(Some(Entry::Directory(Self {
                state: Arc::clone(&self.state),
                location: full,
            })));
        }
        if state.notes.contains_key(&full) {
            return Ok(Some(Entry::Note(MemoryNote {
                state: Arc::clone(&self.state),
                path: full,
            })));
        }
        Ok(None)
    }

    async fn list(&self, subfolder: Option<&str>) -> Result<Listing> {
        let folder = self.resolve(subfolder.unwrap_or(""));
        let state = self.state();
        if !state.is_folder(&folder) {
            if state.notes.contains_key(&folder) {
                return Err(Error::WrongPathKind {
                    path: folder,
                    expected: "folder",
                });
            }
            return Err(Error::PathNotFound { path: folder });
        }

        let files = state
            .notes
            .keys()
            .filter(|p| path::parent(p) == folder)
            .cloned()
            .collect();
        let folders = state
            .folders
            .iter()
            .filter(|p| path::parent(p) == folder)
            .cloned()
            .collect();
        Ok(Listing { files, folders })
    }
}

/// A note inside a [`MemoryDirectory`].
#[derive(Debug, Clone)]
pub struct MemoryNote {
    state: Arc<Mutex<State>>,
    path: String,
}

impl MemoryNote {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Note for MemoryNote {
    fn path(&self) -> &str {
        &self.path
    }

    async fn read_metadata(&self) -> Result<Option<Mapping>> {
        let state = self.state();
        let data = state.notes.get(&self.path).ok_or_else(|| Error::PathNotFound {
            path: self.path.clone(),
        })?;
        Ok(data.frontmatter.clone())
    }

    async fn modify_metadata<F>(&self, transform: F) -> Result<()>
    where
        F: FnOnce(&mut Mapping) + Send + 'static,
    {
        let mut state = self.state();
        let data = state
            .notes
            .get_mut(&self.path)
            .ok_or_else(|| Error::PathNotFound {
                path: self.path.clone(),
            })?;
        if data.read_only {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("{} is read-only", self.path),
            )));
        }

        let mut fm = data.frontmatter.take().unwrap_or_default();
        transform(&mut fm);
        data.frontmatter = Some(fm);
        state.metadata_writes.push(self.path.clone());
        Ok(())
    }
}
