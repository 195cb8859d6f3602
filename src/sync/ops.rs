//! Draft mutations requested by commands.
//!
//! The list-level operations here are pure; run them through
//! [`StoreVaultSync::update_drafts`](super::StoreVaultSync::update_drafts)
//! so the result is published and written back.

use serde_yaml::Mapping;
use tracing::info;

use super::paths::{find_scene, scene_path};
use crate::error::{Error, Result};
use crate::model::{Draft, DraftFormat, LongformRecord};
use crate::vault::{frontmatter, path, Directory};

/// Where a new scene goes in a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneInsertion {
    /// Append at top level.
    End,
    /// Before the scene at this index, at its indent.
    Before(usize),
    /// After the scene at this index, at its indent.
    After(usize),
}

/// Direction for scene navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Following scene.
    Next,
    /// Preceding scene.
    Previous,
}

/// Indent a scene one level deeper.
///
/// # Errors
///
/// Fails if no draft tracks a scene at `scene_path`.
pub fn indent_scene(drafts: &mut [Draft], scene_path: &str) -> Result<()> {
    let scene = scene_mut(drafts, scene_path)?;
    scene.indent += 1;
    Ok(())
}

/// Move a scene one level shallower.
///
/// # Errors
///
/// Fails if the scene is unknown or already at the top level.
pub fn unindent_scene(drafts: &mut [Draft], scene_path: &str) -> Result<()> {
    let scene = scene_mut(drafts, scene_path)?;
    if scene.indent == 0 {
        return Err(Error::InvalidArgument(format!(
            "{} is already at the top level",
            scene.title
        )));
    }
    scene.indent -= 1;
    Ok(())
}

fn scene_mut<'a>(
    drafts: &'a mut [Draft],
    scene_path: &str,
) -> Result<&'a mut crate::model::IndentedScene> {
    let location = find_scene(scene_path, drafts).ok_or_else(|| Error::SceneNotFound {
        path: scene_path.to_string(),
    })?;
    drafts[location.draft]
        .scene_draft_mut()
        .and_then(|scenes| scenes.scenes.get_mut(location.scene))
        .ok_or_else(|| Error::SceneNotFound {
            path: scene_path.to_string(),
        })
}

/// Insert a scene title into a scene draft. Returns its index.
///
/// The title is removed from the draft's unknown files if present.
///
/// # Errors
///
/// Fails for single-note drafts, invalid or duplicate titles, and
/// out-of-range positions.
pub fn insert_scene_entry(draft: &mut Draft, title: &str, at: SceneInsertion) -> Result<usize> {
    if title.trim().is_empty() || title.contains('/') || title.contains('\\') {
        return Err(Error::InvalidArgument(format!("invalid scene title: {title:?}")));
    }
    let index_path = draft.vault_path.clone();
    let scenes = draft.scene_draft_mut().ok_or_else(|| {
        Error::InvalidArgument(format!("{index_path} is a single-note draft"))
    })?;
    if scenes.has_scene(title) {
        return Err(Error::InvalidArgument(format!(
            "{title} is already a scene of {index_path}"
        )));
    }

    let len = scenes.scenes.len();
    let (position, indent) = match at {
        SceneInsertion::End => (len, 0),
        SceneInsertion::Before(i) if i < len => (i, scenes.scenes[i].indent),
        SceneInsertion::After(i) if i < len => (i + 1, scenes.scenes[i].indent),
        SceneInsertion::Before(i) | SceneInsertion::After(i) => {
            return Err(Error::InvalidArgument(format!(
                "scene index {i} out of range (draft has {len} scenes)"
            )));
        }
    };

    scenes
        .scenes
        .insert(position, crate::model::IndentedScene::new(title, indent));
    scenes.unknown_files.retain(|f| f != title);
    Ok(position)
}

/// Path of the scene adjacent to `current_path` in its draft.
///
/// With `same_indent`, scenes at other indents are skipped.
#[must_use]
pub fn scene_path_for_location(
    direction: Direction,
    same_indent: bool,
    current_path: &str,
    drafts: &[Draft],
) -> Option<String> {
    let location = find_scene(current_path, drafts)?;
    let draft = &drafts[location.draft];
    let scenes = &draft.scene_draft()?.scenes;
    let indent = scenes[location.scene].indent;
    let eligible = |s: &&crate::model::IndentedScene| !same_indent || s.indent == indent;

    let target = match direction {
        Direction::Next => scenes[location.scene + 1..].iter().find(eligible),
        Direction::Previous => scenes[..location.scene].iter().rev().find(eligible),
    }?;
    scene_path(draft, &target.title)
}

/// Create a new project: an index note carrying a fresh draft.
///
/// Missing parent folders are created. `directory` must be the vault root.
///
/// # Errors
///
/// Fails if the path is not a markdown note, the title is empty, or the
/// note already exists.
pub async fn create_project<D: Directory>(
    directory: &D,
    vault_path: &str,
    format: DraftFormat,
    title: &str,
) -> Result<Draft> {
    let vault_path = path::normalize(vault_path);
    if !path::is_note(&vault_path) {
        return Err(Error::InvalidPath(format!(
            "{vault_path} must be a markdown note ending in .md"
        )));
    }
    if title.trim().is_empty() {
        return Err(Error::InvalidArgument("project title cannot be empty".to_string()));
    }
    if directory.path_exists(&vault_path).await? {
        return Err(Error::PathExists { path: vault_path });
    }

    let parent = path::parent(&vault_path);
    if !parent.is_empty() {
        directory.create_directory(&parent).await?;
    }

    let draft = match format {
        DraftFormat::Single => Draft::single(vault_path.clone(), title),
        DraftFormat::Scenes => Draft::scenes(vault_path.clone(), title, Vec::new()),
    };
    let mut fm = Mapping::new();
    LongformRecord::from_draft(&draft).write_to(&mut fm)?;
    let content = frontmatter::render(&fm, "")?;
    directory.create_file(&vault_path, Some(&content)).await?;

    info!(path = %vault_path, format = %format, "Created project");
    Ok(draft)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IndentedScene;
    use crate::vault::{MemoryDirectory, Note};

    fn s(title: &str, indent: usize) -> IndentedScene {
        IndentedScene::new(title, indent)
    }

    fn book() -> Vec<Draft> {
        vec![Draft::scenes(
            "Book/Index.md",
            "Book",
            vec![s("A", 0), s("B", 1), s("C", 1), s("D", 0), s("E", 1)],
        )]
    }

    fn scenes(drafts: &[Draft]) -> Vec<IndentedScene> {
        drafts[0].scene_draft().unwrap().scenes.clone()
    }

    #[test]
    fn test_indent_and_unindent() {
        let mut drafts = book();

        indent_scene(&mut drafts, "Book/C.md").unwrap();
        assert_eq!(scenes(&drafts)[2], s("C", 2));

        unindent_scene(&mut drafts, "Book/C.md").unwrap();
        unindent_scene(&mut drafts, "Book/C.md").unwrap();
        assert_eq!(scenes(&drafts)[2], s("C", 0));

        let err = unindent_scene(&mut drafts, "Book/C.md").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_indent_unknown_scene() {
        let mut drafts = book();
        let err = indent_scene(&mut drafts, "Book/Z.md").unwrap_err();
        assert!(matches!(err, Error::SceneNotFound { .. }));
    }

    #[test]
    fn test_insert_positions_inherit_indent() {
        let mut drafts = book();
        let draft = &mut drafts[0];

        assert_eq!(insert_scene_entry(draft, "End", SceneInsertion::End).unwrap(), 5);
        assert_eq!(insert_scene_entry(draft, "Pre", SceneInsertion::Before(1)).unwrap(), 1);
        assert_eq!(insert_scene_entry(draft, "Post", SceneInsertion::After(3)).unwrap(), 4);

        let titles: Vec<_> = scenes(&drafts)
            .into_iter()
            .map(|s| (s.title, s.indent))
            .collect();
        assert_eq!(
            titles,
            vec![
                ("A".into(), 0),
                ("Pre".into(), 1),
                ("B".into(), 1),
                ("C".into(), 1),
                ("Post".into(), 1),
                ("D".into(), 0),
                ("E".into(), 1),
                ("End".into(), 0),
            ]
        );
    }

    #[test]
    fn test_insert_rejects_bad_input() {
        let mut drafts = book();
        let draft = &mut drafts[0];

        assert!(insert_scene_entry(draft, "A", SceneInsertion::End).is_err());
        assert!(insert_scene_entry(draft, "x/y", SceneInsertion::End).is_err());
        assert!(insert_scene_entry(draft, "New", SceneInsertion::After(5)).is_err());

        let mut single = Draft::single("Essay.md", "Essay");
        assert!(insert_scene_entry(&mut single, "New", SceneInsertion::End).is_err());
    }

    #[test]
    fn test_insert_claims_unknown_file() {
        let mut drafts = book();
        drafts[0]
            .scene_draft_mut()
            .unwrap()
            .unknown_files
            .push("Loose".into());

        insert_scene_entry(&mut drafts[0], "Loose", SceneInsertion::End).unwrap();
        assert!(drafts[0].scene_draft().unwrap().unknown_files.is_empty());
    }

    #[test]
    fn test_navigation() {
        let drafts = book();
        let nav = |dir, same, path| scene_path_for_location(dir, same, path, &drafts);

        assert_eq!(nav(Direction::Next, false, "Book/A.md").as_deref(), Some("Book/B.md"));
        assert_eq!(nav(Direction::Next, true, "Book/A.md").as_deref(), Some("Book/D.md"));
        assert_eq!(nav(Direction::Previous, false, "Book/D.md").as_deref(), Some("Book/C.md"));
        assert_eq!(nav(Direction::Previous, true, "Book/E.md").as_deref(), Some("Book/C.md"));
        assert_eq!(nav(Direction::Previous, false, "Book/A.md"), None);
        assert_eq!(nav(Direction::Next, false, "Book/E.md"), None);
        assert_eq!(nav(Direction::Next, false, "Book/Nope.md"), None);
    }

    #[tokio::test]
    async fn test_create_scenes_project() {
        let vault = MemoryDirectory::new();
        let draft = create_project(&vault, "Projects/Novel/Index.md", DraftFormat::Scenes, "Novel")
            .await
            .unwrap();

        assert_eq!(draft.vault_path, "Projects/Novel/Index.md");
        let fm = vault.frontmatter("Projects/Novel/Index.md").unwrap();
        let block = &fm["longform"];
        assert_eq!(block["format"], serde_yaml::Value::from("scenes"));
        assert_eq!(block["title"], serde_yaml::Value::from("Novel"));
        assert_eq!(block["sceneFolder"], serde_yaml::Value::from("/"));
        assert_eq!(block["scenes"], serde_yaml::Value::Sequence(vec![]));
        assert_eq!(block["ignoredFiles"], serde_yaml::Value::Sequence(vec![]));
    }

    #[tokio::test]
    async fn test_create_single_project_and_collision() {
        let vault = MemoryDirectory::new();
        create_project(&vault, "Essay.md", DraftFormat::Single, "Essay")
            .await
            .unwrap();

        let note = crate::vault::get_note(&vault, "Essay.md").await.unwrap().unwrap();
        let fm = note.read_metadata().await.unwrap().unwrap();
        assert!(fm["longform"].get("scenes").is_none());

        let err = create_project(&vault, "Essay.md", DraftFormat::Single, "Essay")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PathExists { .. }));

        let err = create_project(&vault, "Essay.txt", DraftFormat::Single, "Essay")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPath(_)));
    }
}
