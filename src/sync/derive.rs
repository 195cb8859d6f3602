//! Deriving a [`Draft`] from an index note and its scene folder.

use std::collections::HashSet;

use serde_yaml::Mapping;
use tracing::{debug, info, warn};

use super::ignore::IgnoreMatcher;
use super::paths::scene_folder_path;
use crate::error::{Error, Result};
use crate::model::{scene, Draft, DraftFormat, DraftKind, IndentedScene, LongformRecord, SceneDraft};
use crate::vault::{path, Directory, Note};

/// A derived draft and whether its index note needs rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedDraft {
    /// The draft as it should be published.
    pub draft: Draft,
    /// The index note lists scenes whose notes no longer exist.
    pub dirty: bool,
}

/// Scene folder contents classified against the decoded scene list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    /// Decoded scenes with a backing note, in metadata order.
    pub known: Vec<IndentedScene>,
    /// Decoded scenes without a backing note (or repeated titles).
    pub dropped: Vec<IndentedScene>,
    /// Untracked filenames matching an ignore pattern.
    pub ignored: Vec<String>,
    /// Untracked filenames matching no pattern, in listing order.
    pub unknown: Vec<String>,
}

/// Split decoded scenes and folder filenames into known, dropped, ignored
/// and unknown.
///
/// A filename that is a tracked scene stays known even if it also matches
/// an ignore pattern.
#[must_use]
pub fn partition(decoded: &[IndentedScene], files: &[String], matcher: &IgnoreMatcher) -> Partition {
    let present: HashSet<&str> = files.iter().map(String::as_str).collect();
    let mut tracked: HashSet<&str> = HashSet::new();
    let mut result = Partition::default();

    for scene in decoded {
        if present.contains(scene.title.as_str()) && tracked.insert(scene.title.as_str()) {
            result.known.push(scene.clone());
        } else {
            result.dropped.push(scene.clone());
        }
    }

    for name in files {
        if tracked.contains(name.as_str()) {
            continue;
        }
        if matcher.is_match(name) {
            result.ignored.push(name.clone());
        } else {
            result.unknown.push(name.clone());
        }
    }

    result
}

/// Derive the draft for a note.
///
/// `cached` is the metadata reported alongside a change notification; when
/// absent the note is read directly. Returns `Ok(None)` when the note is
/// not (or no longer) a draft.
///
/// `directory` must be the vault root.
///
/// # Errors
///
/// Returns an error only for I/O failures that make the result unreliable,
/// never for missing or malformed metadata.
pub async fn draft_for<D: Directory>(
    directory: &D,
    note: &D::Note,
    cached: Option<Mapping>,
) -> Result<Option<DerivedDraft>> {
    let (metadata, fresh) = match cached {
        Some(metadata) => (Some(metadata), false),
        None => (read_metadata(note).await?, true),
    };
    match metadata {
        Some(metadata) => derive_from(directory, note, &metadata, fresh).await,
        None => Ok(None),
    }
}

/// Read metadata, treating a vanished or unreadable note as "no metadata".
async fn read_metadata<N: Note>(note: &N) -> Result<Option<Mapping>> {
    match note.read_metadata().await {
        Ok(metadata) => Ok(metadata),
        Err(Error::PathNotFound { .. }) => Ok(None),
        Err(e @ Error::MalformedMetadata { .. }) => {
            warn!(path = note.path(), error = %e, "Skipping note with unreadable front matter");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Derive from already-loaded metadata. `fresh` is true when the metadata
/// was just read from the note itself.
pub(crate) async fn derive_from<D: Directory>(
    directory: &D,
    note: &D::Note,
    metadata: &Mapping,
    fresh: bool,
) -> Result<Option<DerivedDraft>> {
    let vault_path = note.path().to_string();
    let record = match LongformRecord::from_frontmatter(metadata) {
        None => return Ok(None),
        Some(Ok(record)) => record,
        Some(Err(e)) => {
            warn!(path = %vault_path, error = %e, "Ignoring malformed longform metadata");
            return Ok(None);
        }
    };
    let Some(format) = record.draft_format() else {
        warn!(path = %vault_path, format = ?record.format, "Ignoring unknown draft format");
        return Ok(None);
    };

    let (title, title_in_frontmatter) = match &record.title {
        Some(title) => (title.clone(), true),
        None => (path::note_stem(&vault_path), false),
    };
    let mut draft = Draft {
        vault_path,
        title,
        title_in_frontmatter,
        draft_title: record.draft_title.clone(),
        workflow: record.workflow.clone(),
        kind: DraftKind::Single,
    };

    if format == DraftFormat::Single {
        return Ok(Some(DerivedDraft { draft, dirty: false }));
    }

    let mut nodes = record.scenes.clone().unwrap_or_default();
    if nodes.is_empty() && !fresh {
        // change notifications can carry a stale, empty scene list
        debug!(path = %draft.vault_path, "Re-reading metadata for empty scene list");
        if let Some(Some(Ok(reread))) = read_metadata(note)
            .await?
            .as_ref()
            .map(LongformRecord::from_frontmatter)
        {
            nodes = reread.scenes.unwrap_or_default();
        }
    }
    let decoded = scene::decode(&nodes);

    let scene_folder = record.scene_folder.clone().unwrap_or_else(|| "/".to_string());
    let folder = scene_folder_path(&draft.vault_path, &scene_folder);
    let files = scene_files(directory, &folder, &draft.vault_path).await?;

    let ignored_files = record.ignored_files.clone().unwrap_or_default();
    let split = partition(&decoded, &files, &IgnoreMatcher::new(&ignored_files));
    let dirty = !split.dropped.is_empty();
    if dirty {
        let dropped: Vec<&str> = split.dropped.iter().map(|s| s.title.as_str()).collect();
        info!(path = %draft.vault_path, ?dropped, "Pruning scenes without notes");
    }

    draft.kind = DraftKind::Scenes(SceneDraft {
        scene_folder,
        scenes: split.known,
        ignored_files,
        unknown_files: split.unknown,
        scene_template: record.scene_template,
    });
    Ok(Some(DerivedDraft { draft, dirty }))
}

/// Note titles in a scene folder, excluding the index note. A missing
/// folder has no files.
async fn scene_files<D: Directory>(
    directory: &D,
    folder: &str,
    index_path: &str,
) -> Result<Vec<String>> {
    let listing = match directory.list(Some(folder)).await {
        Ok(listing) => listing,
        Err(Error::PathNotFound { .. } | Error::WrongPathKind { .. }) => {
            debug!(folder, "Scene folder missing");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    Ok(listing
        .files
        .iter()
        .filter(|f| f.as_str() != index_path && path::is_note(f))
        .map(|f| path::note_stem(f))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::{get_note, MemoryDirectory};

    fn s(title: &str, indent: usize) -> IndentedScene {
        IndentedScene::new(title, indent)
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    async fn derive(vault: &MemoryDirectory, path: &str) -> Option<DerivedDraft> {
        let note = get_note(vault, path).await.unwrap().unwrap();
        draft_for(vault, &note, None).await.unwrap()
    }

    #[test]
    fn test_partition_is_complete() {
        let decoded = vec![s("A", 0), s("B", 1), s("Gone", 1)];
        let files = names(&["A", "B", "notes.bak", "Stray"]);
        let split = partition(&decoded, &files, &IgnoreMatcher::new(&["*.bak"]));

        assert_eq!(split.known, vec![s("A", 0), s("B", 1)]);
        assert_eq!(split.dropped, vec![s("Gone", 1)]);
        assert_eq!(split.ignored, names(&["notes.bak"]));
        assert_eq!(split.unknown, names(&["Stray"]));

        let mut union: Vec<String> = split.known.iter().map(|s| s.title.clone()).collect();
        union.extend(split.ignored.clone());
        union.extend(split.unknown.clone());
        union.sort();
        let mut expected = files.clone();
        expected.sort();
        assert_eq!(union, expected);
    }

    #[test]
    fn test_partition_keeps_ignored_scene() {
        let split = partition(&[s("old.bak", 0)], &names(&["old.bak"]), &IgnoreMatcher::new(&["*.bak"]));
        assert_eq!(split.known, vec![s("old.bak", 0)]);
        assert!(split.ignored.is_empty());
    }

    #[test]
    fn test_partition_drops_duplicate_titles() {
        let split = partition(&[s("A", 0), s("A", 1)], &names(&["A"]), &IgnoreMatcher::default());
        assert_eq!(split.known, vec![s("A", 0)]);
        assert_eq!(split.dropped, vec![s("A", 1)]);
    }

    #[tokio::test]
    async fn test_scene_draft_derivation() {
        let vault = MemoryDirectory::new();
        vault
            .add_note(
                "Novel/Index.md",
                "---\nlongform:\n  format: scenes\n  title: Novel\n  sceneFolder: /\n  scenes:\n    - One\n    - - Two\n    - Gone\n  ignoredFiles:\n    - '*.bak'\n---\n",
            )
            .await
            .unwrap();
        for name in ["One", "Two", "notes.bak", "Stray"] {
            vault.add_note(&format!("Novel/{name}.md"), "").await.unwrap();
        }

        let derived = derive(&vault, "Novel/Index.md").await.unwrap();
        assert!(derived.dirty);

        let scenes = derived.draft.scene_draft().unwrap();
        assert_eq!(scenes.scenes, vec![s("One", 0), s("Two", 1)]);
        assert_eq!(scenes.unknown_files, names(&["Stray"]));
        assert_eq!(scenes.ignored_files, names(&["*.bak"]));
        assert!(derived.draft.title_in_frontmatter);
    }

    #[tokio::test]
    async fn test_title_falls_back_to_filename() {
        let vault = MemoryDirectory::new();
        vault
            .add_note("Essay.md", "---\nlongform:\n  format: single\n---\n")
            .await
            .unwrap();

        let derived = derive(&vault, "Essay.md").await.unwrap();
        assert_eq!(derived.draft.title, "Essay");
        assert!(!derived.draft.title_in_frontmatter);
        assert!(!derived.dirty);
    }

    #[tokio::test]
    async fn test_unknown_format_is_not_a_draft() {
        let vault = MemoryDirectory::new();
        vault
            .add_note("X.md", "---\nlongform:\n  format: chapters\n---\n")
            .await
            .unwrap();
        assert!(derive(&vault, "X.md").await.is_none());
    }

    #[tokio::test]
    async fn test_missing_scene_folder_drops_all_scenes() {
        let vault = MemoryDirectory::new();
        vault
            .add_note(
                "Book.md",
                "---\nlongform:\n  format: scenes\n  sceneFolder: parts\n  scenes: [A, B]\n---\n",
            )
            .await
            .unwrap();

        let derived = derive(&vault, "Book.md").await.unwrap();
        assert!(derived.dirty);
        assert!(derived.draft.scene_draft().unwrap().scenes.is_empty());
    }

    #[tokio::test]
    async fn test_stale_empty_scene_list_is_reread() {
        let vault = MemoryDirectory::new();
        vault
            .add_note(
                "Book.md",
                "---\nlongform:\n  format: scenes\n  scenes: [A]\n---\n",
            )
            .await
            .unwrap();
        vault.add_note("A.md", "").await.unwrap();

        let stale: Mapping =
            serde_yaml::from_str("longform:\n  format: scenes\n  scenes: []\n").unwrap();
        let note = get_note(&vault, "Book.md").await.unwrap().unwrap();
        let derived = draft_for(&vault, &note, Some(stale)).await.unwrap().unwrap();

        assert_eq!(derived.draft.scene_draft().unwrap().scenes, vec![s("A", 0)]);
        assert!(!derived.dirty);
    }

    #[tokio::test]
    async fn test_index_note_is_not_a_scene_candidate() {
        let vault = MemoryDirectory::new();
        vault
            .add_note("Book.md", "---\nlongform:\n  format: scenes\n---\n")
            .await
            .unwrap();

        let derived = derive(&vault, "Book.md").await.unwrap();
        assert!(derived.draft.scene_draft().unwrap().unknown_files.is_empty());
    }
}
