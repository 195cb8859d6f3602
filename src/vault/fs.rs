//! On-disk vault.
//!
//! Front matter rewrites are atomic: the new text goes to a hidden temp
//! file next to the note, is synced, then renamed over the original. A
//! crash mid-write leaves the old note intact.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_yaml::Mapping;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{frontmatter, path, Directory, Entry, Listing, Note};
use crate::error::{Error, Result};

/// A folder inside a vault on disk.
#[derive(Debug, Clone)]
pub struct FsDirectory {
    root: PathBuf,
    location: String,
}

impl FsDirectory {
    /// Open the vault rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            location: String::new(),
        }
    }

    /// Vault root on disk.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> String {
        path::join(&self.location, path)
    }

    fn absolute(&self, vault_path: &str) -> PathBuf {
        absolute(&self.root, vault_path)
    }
}

fn absolute(root: &Path, vault_path: &str) -> PathBuf {
    vault_path
        .split('/')
        .filter(|part| !part.is_empty())
        .fold(root.to_path_buf(), |acc, part| acc.join(part))
}

/// `Ok(None)` for a missing path, otherwise its metadata.
async fn stat(path: &Path) -> Result<Option<std::fs::Metadata>> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

impl Directory for FsDirectory {
    type Note = FsNote;

    fn location(&self) -> &str {
        &self.location
    }

    async fn path_exists(&self, path: &str) -> Result<bool> {
        Ok(stat(&self.absolute(&self.resolve(path))).await?.is_some())
    }

    async fn create_directory(&self, path: &str) -> Result<()> {
        let full = self.resolve(path);
        if full.is_empty() {
            return Err(Error::InvalidPath("cannot create the vault root".to_string()));
        }

        let mut prefix = String::new();
        for part in full.split('/') {
            prefix = path::join(&prefix, part);
            if let Some(meta) = stat(&self.absolute(&prefix)).await? {
                if !meta.is_dir() {
                    return Err(Error::WrongPathKind {
                        path: prefix,
                        expected: "folder",
                    });
                }
            }
        }

        fs::create_dir_all(self.absolute(&full)).await?;
        Ok(())
    }

    async fn create_file(&self, path: &str, content: Option<&str>) -> Result<FsNote> {
        let full = self.resolve(path);
        if full.is_empty() {
            return Err(Error::InvalidPath("file path cannot be empty".to_string()));
        }

        let parent = path::parent(&full);
        match stat(&self.absolute(&parent)).await? {
            Some(meta) if meta.is_dir() => {}
            Some(_) => {
                return Err(Error::WrongPathKind {
                    path: parent,
                    expected: "folder",
                });
            }
            None => return Err(Error::ParentMissing { path: full }),
        }

        let target = self.absolute(&full);
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(Error::PathExists { path: full });
            }
            Err(e) => return Err(e.into()),
        };
        if let Some(text) = content {
            file.write_all(text.as_bytes()).await?;
        }
        file.sync_all().await?;

        Ok(FsNote {
            root: self.root.clone(),
            path: full,
        })
    }

    async fn get_path(&self, path: &str) -> Result<Option<Entry<Self, FsNote>>> {
        let full = self.resolve(path);
        let Some(meta) = stat(&self.absolute(&full)).await? else {
            return Ok(None);
        };
        if meta.is_dir() {
            return Ok(Some(Entry::Directory(Self {
                root: self.root.clone(),
                location: full,
            })));
        }
        Ok(Some(Entry::Note(FsNote {
            root: self.root.clone(),
            path: full,
        })))
    }

    async fn list(&self, subfolder: Option<&str>) -> Result<Listing> {
        let folder = self.resolve(subfolder.unwrap_or(""));
        let dir = self.absolute(&folder);
        match stat(&dir).await? {
            Some(meta) if meta.is_dir() => {}
            Some(_) => {
                return Err(Error::WrongPathKind {
                    path: folder,
                    expected: "folder",
                });
            }
            None => return Err(Error::PathNotFound { path: folder }),
        }

        let mut listing = Listing::default();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            // temp files and tool folders such as .obsidian
            if name.starts_with('.') {
                continue;
            }
            let child = path::join(&folder, &name);
            if entry.file_type().await?.is_dir() {
                listing.folders.push(child);
            } else {
                listing.files.push(child);
            }
        }
        listing.files.sort();
        listing.folders.sort();
        Ok(listing)
    }
}

/// A note file on disk.
#[derive(Debug, Clone)]
pub struct FsNote {
    root: PathBuf,
    path: String,
}

impl FsNote {
    async fn read(&self) -> Result<frontmatter::NoteContent> {
        let target = absolute(&self.root, &self.path);
        let text = match fs::read_to_string(&target).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::PathNotFound {
                    path: self.path.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        frontmatter::parse(&text).map_err(|e| Error::MalformedMetadata {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }
}

impl Note for FsNote {
    fn path(&self) -> &str {
        &self.path
    }

    async fn read_metadata(&self) -> Result<Option<Mapping>> {
        Ok(self.read().await?.frontmatter)
    }

    async fn modify_metadata<F>(&self, transform: F) -> Result<()>
    where
        F: FnOnce(&mut Mapping) + Send + 'static,
    {
        let note = self.read().await?;
        let mut fm = note.frontmatter.unwrap_or_default();
        transform(&mut fm);
        let text = frontmatter::render(&fm, &note.body)?;
        atomic_write(&absolute(&self.root, &self.path), &text).await
    }
}

/// Write content to a file atomically.
///
/// 1. Write to a hidden temp file in the same folder
/// 2. `fsync` so the data is on disk
/// 3. Rename over the target
///
/// If any step fails, the original file remains untouched.
///
/// # Errors
///
/// Returns an error if any file operation fails.
pub async fn atomic_write(target: &Path, content: &str) -> Result<()> {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidPath(target.display().to_string()))?;
    let temp = target.with_file_name(format!(".{name}.longform-tmp"));

    let result = async {
        let mut file = fs::File::create(&temp).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&temp, target).await
    }
    .await;

    if let Err(e) = result {
        let _ = fs::remove_file(&temp).await;
        return Err(e.into());
    }
    Ok(())
}
