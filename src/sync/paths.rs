//! Resolving scenes and drafts from vault paths.

use crate::model::Draft;
use crate::vault::path;

/// Where a scene sits in the draft list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneLocation {
    /// Index into the draft list.
    pub draft: usize,
    /// Index into that draft's scenes.
    pub scene: usize,
}

/// Folder holding a draft's scenes: the index note's folder joined with
/// the draft's relative scene folder.
#[must_use]
pub fn scene_folder_path(index_path: &str, scene_folder: &str) -> String {
    path::join(&path::parent(index_path), scene_folder)
}

/// Scene folder of a draft, `None` for single-note drafts.
#[must_use]
pub fn scene_folder_of(draft: &Draft) -> Option<String> {
    draft
        .scene_draft()
        .map(|scenes| scene_folder_path(&draft.vault_path, &scenes.scene_folder))
}

/// Vault path of a scene note.
#[must_use]
pub fn scene_path(draft: &Draft, title: &str) -> Option<String> {
    scene_folder_of(draft)
        .map(|folder| path::join(&folder, &format!("{title}{}", path::NOTE_EXTENSION)))
}

/// Find the draft and scene a scene note belongs to.
#[must_use]
pub fn find_scene(note_path: &str, drafts: &[Draft]) -> Option<SceneLocation> {
    let target = path::normalize(note_path);
    drafts.iter().enumerate().find_map(|(draft_idx, draft)| {
        let scenes = draft.scene_draft()?;
        scenes
            .scenes
            .iter()
            .position(|s| scene_path(draft, &s.title).as_deref() == Some(target.as_str()))
            .map(|scene| SceneLocation {
                draft: draft_idx,
                scene,
            })
    })
}

/// The draft a path belongs to: the draft indexed by it, or the draft
/// containing it as a scene.
#[must_use]
pub fn draft_for_path<'a>(vault_path: &str, drafts: &'a [Draft]) -> Option<&'a Draft> {
    let target = path::normalize(vault_path);
    drafts
        .iter()
        .find(|d| d.vault_path == target)
        .or_else(|| find_scene(&target, drafts).map(|loc| &drafts[loc.draft]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IndentedScene;

    fn novel() -> Draft {
        let mut draft = Draft::scenes(
            "Novel/Index.md",
            "Novel",
            vec![IndentedScene::new("One", 0), IndentedScene::new("Two", 1)],
        );
        if let Some(scenes) = draft.scene_draft_mut() {
            scenes.scene_folder = "scenes".to_string();
        }
        draft
    }

    #[test]
    fn test_scene_folder_path() {
        assert_eq!(scene_folder_path("Novel/Index.md", "/"), "Novel");
        assert_eq!(scene_folder_path("Novel/Index.md", "scenes"), "Novel/scenes");
        assert_eq!(scene_folder_path("Index.md", "/"), "");
        assert_eq!(scene_folder_path("Index.md", "./parts/"), "parts");
    }

    #[test]
    fn test_scene_path() {
        assert_eq!(scene_path(&novel(), "One").as_deref(), Some("Novel/scenes/One.md"));
        assert_eq!(scene_path(&Draft::single("Essay.md", "Essay"), "One"), None);
    }

    #[test]
    fn test_find_scene() {
        let drafts = vec![Draft::single("Essay.md", "Essay"), novel()];

        assert_eq!(
            find_scene("Novel/scenes/Two.md", &drafts),
            Some(SceneLocation { draft: 1, scene: 1 })
        );
        assert_eq!(find_scene("/Novel/scenes/One.md", &drafts).map(|l| l.scene), Some(0));
        assert_eq!(find_scene("Novel/One.md", &drafts), None);
    }

    #[test]
    fn test_draft_for_path() {
        let drafts = vec![Draft::single("Essay.md", "Essay"), novel()];

        assert_eq!(draft_for_path("Essay.md", &drafts).map(|d| d.title.as_str()), Some("Essay"));
        assert_eq!(
            draft_for_path("Novel/scenes/One.md", &drafts).map(|d| d.title.as_str()),
            Some("Novel")
        );
        assert!(draft_for_path("Other.md", &drafts).is_none());
    }
}
