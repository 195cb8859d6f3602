//! Vault file-system abstraction.
//!
//! The sync engine never touches the disk directly. It works through a
//! [`Directory`], a view of a folder tree rooted somewhere in the vault,
//! and through [`Note`] handles that can read and rewrite front matter.
//!
//! Two implementations are provided:
//!
//! - [`FsDirectory`] - a real vault on disk
//! - [`MemoryDirectory`] - an in-memory tree used by tests
//!
//! Paths returned from a directory are vault-relative (see [`path`]).
//! Paths passed in are resolved against the directory's own location, so
//! for the vault root the two coincide.

pub mod frontmatter;
pub mod fs;
pub mod memory;
pub mod path;
pub mod watch;

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;

use serde_yaml::Mapping;

use crate::error::Result;

pub use fs::{FsDirectory, FsNote};
pub use memory::{MemoryDirectory, MemoryNote};
pub use watch::{EventTranslator, VaultWatcher, RENAME_WINDOW};

/// Immediate children of a folder, as vault-relative paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// Files (notes and attachments).
    pub files: Vec<String>,
    /// Sub-folders.
    pub folders: Vec<String>,
}

/// Result of [`Directory::get_path`].
#[derive(Debug, Clone)]
pub enum Entry<D, N> {
    /// The path is a folder.
    Directory(D),
    /// The path is a file.
    Note(N),
}

/// A handle to a single note.
pub trait Note: Clone + fmt::Debug + Send + Sync + 'static {
    /// Vault-relative path.
    fn path(&self) -> &str;

    /// Read the note's front matter, `None` if it has none.
    fn read_metadata(&self) -> impl Future<Output = Result<Option<Mapping>>> + Send;

    /// Apply `transform` to the front matter and persist the result.
    ///
    /// Notes without front matter start from an empty mapping. The body is
    /// left unchanged.
    fn modify_metadata<F>(&self, transform: F) -> impl Future<Output = Result<()>> + Send
    where
        F: FnOnce(&mut Mapping) + Send + 'static;
}

/// A folder tree the sync engine can query and create files in.
pub trait Directory: Clone + Send + Sync + 'static {
    /// Note handle type produced by this directory.
    type Note: Note;

    /// Vault-relative location of this directory (`""` for the vault root).
    fn location(&self) -> &str;

    /// Whether anything exists at `path`.
    fn path_exists(&self, path: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Create a folder and any missing parents.
    ///
    /// Fails with `WrongPathKind` if a file is in the way.
    fn create_directory(&self, path: &str) -> impl Future<Output = Result<()>> + Send;

    /// Create a new file. The parent folder must already exist.
    fn create_file(
        &self,
        path: &str,
        content: Option<&str>,
    ) -> impl Future<Output = Result<Self::Note>> + Send;

    /// Look up a path.
    fn get_path(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<Option<Entry<Self, Self::Note>>>> + Send;

    /// List the immediate children of `subfolder` (or of this directory).
    ///
    /// `subfolder` is relative to this directory; returned paths are
    /// vault-relative.
    fn list(&self, subfolder: Option<&str>) -> impl Future<Output = Result<Listing>> + Send;
}

/// Look up a path that is expected to be a note.
///
/// # Errors
///
/// Propagates lookup errors from the directory.
pub async fn get_note<D: Directory>(directory: &D, path: &str) -> Result<Option<D::Note>> {
    Ok(match directory.get_path(path).await? {
        Some(Entry::Note(note)) => Some(note),
        Some(Entry::Directory(_)) | None => None,
    })
}

/// Collect every markdown note under the directory, breadth first.
///
/// Hidden files and folders are skipped. The result holds sorted
/// vault-relative paths.
///
/// # Errors
///
/// Propagates listing errors from the directory.
pub async fn walk_notes<D: Directory>(directory: &D) -> Result<Vec<String>> {
    let mut notes = Vec::new();
    let mut pending: VecDeque<Option<String>> = VecDeque::from([None]);

    while let Some(folder) = pending.pop_front() {
        let listing = directory.list(folder.as_deref()).await?;
        notes.extend(
            listing
                .files
                .into_iter()
                .filter(|f| path::is_note(f) && !path::is_hidden(f)),
        );
        pending.extend(
            listing
                .folders
                .into_iter()
                .filter(|f| !path::is_hidden(f))
                .map(|f| Some(relative_to(directory.location(), &f))),
        );
    }

    notes.sort();
    Ok(notes)
}

/// Strip a directory's location from a vault-relative path.
pub(crate) fn relative_to(location: &str, vault_path: &str) -> String {
    if location.is_empty() {
        return vault_path.to_string();
    }
    vault_path
        .strip_prefix(location)
        .map_or(vault_path, |rest| rest.trim_start_matches('/'))
        .to_string()
}

/// Behavior every [`Directory`] implementation must share.
#[cfg(test)]
pub(crate) mod contract {
    use super::*;
    use crate::error::Error;

    pub(crate) async fn check_directory<D: Directory>(root: D) {
        // nested folders are created with their parents
        root.create_directory("sub/directory").await.unwrap();
        assert!(root.path_exists("sub").await.unwrap());
        assert!(root.path_exists("sub/directory").await.unwrap());
        assert!(!root.path_exists("missing").await.unwrap());

        // creating an existing folder is fine
        root.create_directory("sub").await.unwrap();

        // files need an existing parent
        let err = root.create_file("nowhere/x.md", None).await.unwrap_err();
        assert!(matches!(err, Error::ParentMissing { .. }), "{err:?}");

        let note = root
            .create_file("sub/directory/x.md", Some("---\ntitle: x\n---\nbody"))
            .await
            .unwrap();
        assert_eq!(note.path(), "sub/directory/x.md");

        let err = root.create_file("sub/directory/x.md", None).await.unwrap_err();
        assert!(matches!(err, Error::PathExists { .. }), "{err:?}");

        // a file in the way of a folder
        let err = root.create_directory("sub/directory/x.md/deeper").await.unwrap_err();
        assert!(matches!(err, Error::WrongPathKind { .. }), "{err:?}");

        // listings are vault-relative
        root.create_file("sub/y.md", None).await.unwrap();
        let listing = root.list(Some("sub")).await.unwrap();
        assert_eq!(listing.files, vec!["sub/y.md".to_string()]);
        assert_eq!(listing.folders, vec!["sub/directory".to_string()]);

        // sub-directories resolve relative to themselves
        let Some(Entry::Directory(sub)) = root.get_path("sub").await.unwrap() else {
            panic!("expected a directory");
        };
        assert_eq!(sub.location(), "sub");
        assert!(sub.path_exists("directory/x.md").await.unwrap());
        let listing = sub.list(Some("directory")).await.unwrap();
        assert_eq!(listing.files, vec!["sub/directory/x.md".to_string()]);

        assert!(matches!(
            root.get_path("sub/directory/x.md").await.unwrap(),
            Some(Entry::Note(_))
        ));
        assert!(root.get_path("sub/nothing.md").await.unwrap().is_none());

        // listing a file or a missing folder fails
        assert!(root.list(Some("sub/y.md")).await.is_err());
        assert!(root.list(Some("missing")).await.is_err());

        // metadata round trip through a fresh handle
        let fm = note.read_metadata().await.unwrap().unwrap();
        assert_eq!(fm["title"], serde_yaml::Value::from("x"));
        note.modify_metadata(|fm| {
            fm.insert("title".into(), "changed".into());
        })
        .await
        .unwrap();
        let again = get_note(&root, "sub/directory/x.md").await.unwrap().unwrap();
        let fm = again.read_metadata().await.unwrap().unwrap();
        assert_eq!(fm["title"], serde_yaml::Value::from("changed"));

        // a note without front matter gains one on modify
        let plain = get_note(&root, "sub/y.md").await.unwrap().unwrap();
        assert!(plain.read_metadata().await.unwrap().is_none());
        plain
            .modify_metadata(|fm| {
                fm.insert("k".into(), "v".into());
            })
            .await
            .unwrap();
        assert!(plain.read_metadata().await.unwrap().is_some());

        assert_eq!(
            walk_notes(&root).await.unwrap(),
            vec!["sub/directory/x.md".to_string(), "sub/y.md".to_string()]
        );
    }
}
