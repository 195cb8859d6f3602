//! Draft model.
//!
//! A draft is the unit of writing tracked through an index note's
//! `longform` metadata block. It is either a single note holding all of
//! the content, or an ordered, indentable tree of scene notes stored in
//! a scene folder next to the index note.

use std::collections::BTreeMap;

use serde::Serialize;

use super::scene::IndentedScene;

/// Draft format discriminator, as written in metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftFormat {
    /// Index note is the whole draft.
    Single,
    /// Index note orders scene notes in a scene folder.
    Scenes,
}

impl DraftFormat {
    /// Metadata string for this format.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Scenes => "scenes",
        }
    }

    /// Parse a metadata `format` value. Unknown values yield `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "single" => Some(Self::Single),
            "scenes" => Some(Self::Scenes),
            _ => None,
        }
    }
}

impl std::fmt::Display for DraftFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scene-specific part of a multi-scene draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDraft {
    /// Folder holding scene notes, relative to the index note's folder.
    pub scene_folder: String,
    /// Ordered scenes; authoritative order comes from metadata.
    pub scenes: Vec<IndentedScene>,
    /// Glob patterns for files in the scene folder that are not scenes.
    pub ignored_files: Vec<String>,
    /// Notes in the scene folder that are neither scenes nor ignored.
    pub unknown_files: Vec<String>,
    /// Template used when creating new scenes; carried through untouched.
    pub scene_template: Option<String>,
}

impl SceneDraft {
    /// Empty scene draft rooted at the index note's folder.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            scene_folder: "/".to_string(),
            scenes: Vec::new(),
            ignored_files: Vec::new(),
            unknown_files: Vec::new(),
            scene_template: None,
        }
    }

    /// Index of the scene with this title.
    #[must_use]
    pub fn position_of(&self, title: &str) -> Option<usize> {
        self.scenes.iter().position(|s| s.title == title)
    }

    /// Whether a scene with this title exists.
    #[must_use]
    pub fn has_scene(&self, title: &str) -> bool {
        self.position_of(title).is_some()
    }
}

/// Format-specific payload of a [`Draft`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum DraftKind {
    /// One note is the entire draft.
    Single,
    /// Ordered scene notes.
    Scenes(SceneDraft),
}

/// A draft derived from an index note's metadata and the files around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    /// Vault-relative path of the index note; unique across drafts.
    pub vault_path: String,
    /// Project title.
    pub title: String,
    /// Whether `title` is stored in metadata or derived from the filename.
    pub title_in_frontmatter: bool,
    /// Label distinguishing drafts of the same project.
    pub draft_title: Option<String>,
    /// Name of the compile workflow; opaque here.
    pub workflow: Option<String>,
    /// Format-specific data.
    #[serde(flatten)]
    pub kind: DraftKind,
}

impl Draft {
    /// A single-note draft.
    pub fn single(vault_path: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            vault_path: vault_path.into(),
            title: title.into(),
            title_in_frontmatter: true,
            draft_title: None,
            workflow: None,
            kind: DraftKind::Single,
        }
    }

    /// A multi-scene draft with the given scenes, rooted next to its index.
    pub fn scenes(
        vault_path: impl Into<String>,
        title: impl Into<String>,
        scenes: Vec<IndentedScene>,
    ) -> Self {
        Self {
            vault_path: vault_path.into(),
            title: title.into(),
            title_in_frontmatter: true,
            draft_title: None,
            workflow: None,
            kind: DraftKind::Scenes(SceneDraft {
                scenes,
                ..SceneDraft::empty()
            }),
        }
    }

    /// The draft's format.
    #[must_use]
    pub const fn format(&self) -> DraftFormat {
        match self.kind {
            DraftKind::Single => DraftFormat::Single,
            DraftKind::Scenes(_) => DraftFormat::Scenes,
        }
    }

    /// Scene data, if this is a multi-scene draft.
    #[must_use]
    pub const fn scene_draft(&self) -> Option<&SceneDraft> {
        match &self.kind {
            DraftKind::Scenes(scenes) => Some(scenes),
            DraftKind::Single => None,
        }
    }

    /// Mutable scene data, if this is a multi-scene draft.
    pub fn scene_draft_mut(&mut self) -> Option<&mut SceneDraft> {
        match &mut self.kind {
            DraftKind::Scenes(scenes) => Some(scenes),
            DraftKind::Single => None,
        }
    }

    /// Human label: the draft title if set, else the index path.
    #[must_use]
    pub fn display_title(&self) -> &str {
        self.draft_title.as_deref().unwrap_or(&self.vault_path)
    }
}

/// Group drafts into projects by title, sorted by title.
///
/// Drafts without a stored title fall back to their filename, so they form
/// a single-draft project unless another draft shares the filename.
#[must_use]
pub fn group_projects(drafts: &[Draft]) -> BTreeMap<String, Vec<Draft>> {
    let mut projects: BTreeMap<String, Vec<Draft>> = BTreeMap::new();
    for draft in drafts {
        projects
            .entry(draft.title.clone())
            .or_default()
            .push(draft.clone());
    }
    projects
}
