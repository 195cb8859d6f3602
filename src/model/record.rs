//! Typed `longform` metadata block.
//!
//! Index notes carry their draft in front matter under the `longform` key:
//!
//! ```yaml
//! longform:
//!   format: scenes
//!   title: My Novel
//!   sceneFolder: /
//!   scenes:
//!     - Opening
//!     - - Flashback
//!   ignoredFiles:
//!     - "*.bak"
//! ```
//!
//! The rest of the front matter belongs to the user and is left alone; only
//! the `longform` value is read and replaced, and always through
//! [`LongformRecord`].

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use super::draft::{Draft, DraftFormat, DraftKind};
use super::scene::{self, SceneNode};

/// Front matter key holding the draft record.
pub const LONGFORM_KEY: &str = "longform";

/// Scene property: 0-based position within the draft.
pub const SCENE_ORDER_KEY: &str = "longform-order";

/// Scene property: formatted hierarchical number.
pub const SCENE_NUMBER_KEY: &str = "longform-number";

/// Serialized form of a draft inside front matter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LongformRecord {
    /// `scenes` or `single`; anything else is not a draft.
    #[serde(default, deserialize_with = "lenient_string")]
    pub format: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub draft_title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub workflow: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub scene_folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenes: Option<Vec<SceneNode>>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub scene_template: Option<String>,
    #[serde(default, deserialize_with = "lenient_string_list", skip_serializing_if = "Option::is_none")]
    pub ignored_files: Option<Vec<String>>,
}

impl LongformRecord {
    /// Read the `longform` block from a front matter mapping.
    ///
    /// Returns `None` when the key is missing or empty, and `Some(Err)`
    /// when the block is present but cannot be read as a record.
    #[must_use]
    pub fn from_frontmatter(frontmatter: &Mapping) -> Option<Result<Self, serde_yaml::Error>> {
        let value = frontmatter.get(LONGFORM_KEY)?;
        match value {
            Value::Null | Value::Bool(false) => None,
            other => Some(serde_yaml::from_value(other.clone())),
        }
    }

    /// Whether a front matter mapping carries a non-empty `longform` block.
    #[must_use]
    pub fn is_present(frontmatter: &Mapping) -> bool {
        !matches!(
            frontmatter.get(LONGFORM_KEY),
            None | Some(Value::Null | Value::Bool(false))
        )
    }

    /// Parsed format, if recognized.
    #[must_use]
    pub fn draft_format(&self) -> Option<DraftFormat> {
        self.format.as_deref().and_then(DraftFormat::parse)
    }

    /// Build the record persisted for a draft.
    ///
    /// `title` is written only when it came from metadata; scene drafts
    /// always carry `sceneFolder`, `scenes` and `ignoredFiles`.
    #[must_use]
    pub fn from_draft(draft: &Draft) -> Self {
        let mut record = Self {
            format: Some(draft.format().as_str().to_string()),
            title: draft.title_in_frontmatter.then(|| draft.title.clone()),
            draft_title: draft.draft_title.clone().filter(|t| !t.is_empty()),
            workflow: draft.workflow.clone().filter(|w| !w.is_empty()),
            ..Self::default()
        };

        if let DraftKind::Scenes(scenes) = &draft.kind {
            record.scene_folder = Some(scenes.scene_folder.clone());
            record.scenes = Some(scene::encode(&scenes.scenes));
            record.scene_template = scenes.scene_template.clone().filter(|t| !t.is_empty());
            record.ignored_files = Some(scenes.ignored_files.clone());
        }

        record
    }

    /// Replace the `longform` block in a front matter mapping.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be converted to YAML.
    pub fn write_to(&self, frontmatter: &mut Mapping) -> Result<(), serde_yaml::Error> {
        let value = serde_yaml::to_value(self)?;
        frontmatter.insert(Value::String(LONGFORM_KEY.to_string()), value);
        Ok(())
    }
}

/// Set the scene order and number properties on a scene's front matter.
pub fn write_scene_number(frontmatter: &mut Mapping, order: usize, numbering: &[u32]) {
    frontmatter.insert(
        Value::String(SCENE_ORDER_KEY.to_string()),
        Value::Number(serde_yaml::Number::from(order as u64)),
    );
    frontmatter.insert(
        Value::String(SCENE_NUMBER_KEY.to_string()),
        Value::String(scene::format_numbering(numbering)),
    );
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Tagged(tagged) => scalar_to_string(tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

/// Accept any scalar as a string; empty and non-scalar values become `None`.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(scalar_to_string))
}

/// A list of scalars; empty entries are dropped, a single scalar is a list of one.
fn lenient_string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::Sequence(items)) => {
            Some(items.into_iter().filter_map(scalar_to_string).collect())
        }
        Some(other) => Some(scalar_to_string(other).into_iter().collect()),
    })
}
