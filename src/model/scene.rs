//! Scene indentation codec.
//!
//! Drafts keep their scenes as a flat, ordered list of `(title, indent)`
//! pairs. The index note stores the same list as nested YAML arrays, where
//! each level of nesting is one level of indentation:
//!
//! ```yaml
//! scenes:
//!   - Opening
//!   - - Flashback
//!     - - Memory inside the flashback
//!   - Closing
//! ```
//!
//! [`encode`] and [`decode`] convert between the two shapes;
//! [`number_scenes`] derives hierarchical numbering (`1`, `1.1`, `2`, ...).

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// A scene title paired with its nesting depth.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndentedScene {
    /// Scene title; also the note's filename without `.md`.
    pub title: String,
    /// Nesting depth (0 = top level).
    pub indent: usize,
}

impl IndentedScene {
    /// Create a scene at the given depth.
    pub fn new(title: impl Into<String>, indent: usize) -> Self {
        Self {
            title: title.into(),
            indent,
        }
    }
}

/// An [`IndentedScene`] with its computed hierarchical numbering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumberedScene {
    /// Scene title.
    pub title: String,
    /// Nesting depth.
    pub indent: usize,
    /// One counter per depth; always `indent + 1` long.
    pub numbering: Vec<u32>,
}

/// One element of the nested scene array stored in metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SceneNode {
    /// A scene title at the enclosing array's depth.
    Title(String),
    /// A nested array, one level deeper.
    Group(Vec<SceneNode>),
}

impl<'de> Deserialize<'de> for SceneNode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_yaml::Value::deserialize(deserializer)?;
        Self::from_yaml(&value).map_err(de::Error::custom)
    }
}

impl SceneNode {
    /// Convert a YAML value, accepting bare numbers and booleans as titles
    /// (a scene called `1984` is written unquoted by most editors).
    fn from_yaml(value: &serde_yaml::Value) -> Result<Self, String> {
        use serde_yaml::Value;

        match value {
            Value::String(s) => Ok(Self::Title(s.clone())),
            Value::Number(n) => Ok(Self::Title(n.to_string())),
            Value::Bool(b) => Ok(Self::Title(b.to_string())),
            Value::Sequence(items) => items
                .iter()
                .map(Self::from_yaml)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Group),
            Value::Tagged(tagged) => Self::from_yaml(&tagged.value),
            Value::Null => Err("scene entries cannot be empty".to_string()),
            Value::Mapping(_) => Err("scene entries must be titles or lists".to_string()),
        }
    }
}

/// Encode a flat scene list into nested arrays.
///
/// A jump of `k` indent levels opens `k` nested arrays, one per level.
/// Dropping back to a shallower indent resumes the most recent array
/// at that depth.
#[must_use]
pub fn encode(scenes: &[IndentedScene]) -> Vec<SceneNode> {
    // stack[d] is the array currently receiving titles at depth d
    let mut stack: Vec<Vec<SceneNode>> = vec![Vec::new()];

    for scene in scenes {
        let current = stack.len() - 1;
        if scene.indent > current {
            for _ in current..scene.indent {
                stack.push(Vec::new());
            }
        } else if scene.indent < current {
            close_to(&mut stack, scene.indent);
        }

        if let Some(level) = stack.last_mut() {
            level.push(SceneNode::Title(scene.title.clone()));
        }
    }

    close_to(&mut stack, 0);
    stack.pop().unwrap_or_default()
}

/// Pop arrays deeper than `depth`, appending each to its parent.
fn close_to(stack: &mut Vec<Vec<SceneNode>>, depth: usize) {
    while stack.len() > depth + 1 {
        if let Some(finished) = stack.pop() {
            if let Some(parent) = stack.last_mut() {
                parent.push(SceneNode::Group(finished));
            }
        }
    }
}

/// Decode nested arrays into a flat scene list.
///
/// Root titles are indent 0; each nested array adds one level. Empty
/// arrays contribute nothing. The input is only borrowed.
#[must_use]
pub fn decode(nodes: &[SceneNode]) -> Vec<IndentedScene> {
    let mut scenes = Vec::new();
    decode_into(nodes, 0, &mut scenes);
    scenes
}

fn decode_into(nodes: &[SceneNode], depth: usize, out: &mut Vec<IndentedScene>) {
    for node in nodes {
        match node {
            SceneNode::Title(title) => out.push(IndentedScene::new(title.clone(), depth)),
            SceneNode::Group(children) => decode_into(children, depth + 1, out),
        }
    }
}

/// Compute hierarchical numbering for an ordered scene list.
///
/// Each scene increments the counter at its own depth and resets every
/// deeper counter. Levels skipped by a jump of more than one indent are
/// filled with 1, so `numbering.len() == indent + 1` always holds.
#[must_use]
pub fn number_scenes(scenes: &[IndentedScene]) -> Vec<NumberedScene> {
    let mut counters: Vec<u32> = vec![0];
    let mut last_indent = 0;

    scenes
        .iter()
        .map(|scene| {
            let indent = scene.indent;
            if indent > last_indent {
                counters.resize(indent + 1, 1);
                counters[indent] = 0;
            } else if indent < last_indent {
                counters.truncate(indent + 1);
            }
            last_indent = indent;

            counters[indent] += 1;
            NumberedScene {
                title: scene.title.clone(),
                indent,
                numbering: counters.clone(),
            }
        })
        .collect()
}

/// Format numbering as dotted text, e.g. `[1, 2, 1]` → `"1.2.1"`.
#[must_use]
pub fn format_numbering(numbering: &[u32]) -> String {
    numbering
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(title: &str) -> SceneNode {
        SceneNode::Title(title.to_string())
    }

    fn g(nodes: Vec<SceneNode>) -> SceneNode {
        SceneNode::Group(nodes)
    }

    fn s(title: &str, indent: usize) -> IndentedScene {
        IndentedScene::new(title, indent)
    }

    #[test]
    fn test_decode_nested_example() {
        let nodes = vec![t("A"), g(vec![t("B")]), t("C")];
        let scenes = decode(&nodes);

        assert_eq!(scenes, vec![s("A", 0), s("B", 1), s("C", 0)]);

        let numbered = number_scenes(&scenes);
        let numbers: Vec<_> = numbered.iter().map(|n| n.numbering.clone()).collect();
        assert_eq!(numbers, vec![vec![1], vec![1, 1], vec![2]]);

        let formatted: Vec<_> = numbered.iter().map(|n| format_numbering(&n.numbering)).collect();
        assert_eq!(formatted, vec!["1", "1.1", "2"]);
    }

    #[test]
    fn test_decode_does_not_consume_input() {
        let nodes = vec![t("A"), g(vec![t("B"), g(vec![t("C")])])];
        let first = decode(&nodes);
        let second = decode(&nodes);

        assert_eq!(first, second);
        assert_eq!(first, vec![s("A", 0), s("B", 1), s("C", 2)]);
    }

    #[test]
    fn test_decode_skips_empty_groups() {
        let nodes = vec![g(vec![]), t("A"), g(vec![g(vec![])])];
        assert_eq!(decode(&nodes), vec![s("A", 0)]);
    }

    #[test]
    fn test_encode_shapes() {
        let scenes = vec![s("A", 0), s("B", 1), s("C", 2), s("D", 1), s("E", 0)];
        let encoded = encode(&scenes);

        assert_eq!(
            encoded,
            vec![t("A"), g(vec![t("B"), g(vec![t("C")]), t("D")]), t("E")]
        );
    }

    #[test]
    fn test_encode_large_jump_opens_one_array_per_level() {
        let scenes = vec![s("A", 0), s("B", 3), s("C", 0)];
        let encoded = encode(&scenes);

        assert_eq!(encoded, vec![t("A"), g(vec![g(vec![g(vec![t("B")])])]), t("C")]);
        assert_eq!(decode(&encoded), scenes);
    }

    #[test]
    fn test_encode_resumes_memoized_depth() {
        // after dropping from 2 to 1 the depth-1 array keeps receiving titles
        let scenes = vec![s("A", 1), s("B", 2), s("C", 1)];
        let encoded = encode(&scenes);

        assert_eq!(encoded, vec![g(vec![t("A"), g(vec![t("B")]), t("C")])]);
    }

    #[test]
    fn test_round_trip_for_ui_shapes() {
        let cases = vec![
            vec![],
            vec![s("A", 0)],
            vec![s("A", 0), s("B", 1), s("C", 1), s("D", 0)],
            vec![s("A", 0), s("B", 1), s("C", 2), s("D", 3), s("E", 0), s("F", 1)],
            vec![s("A", 1), s("B", 1), s("C", 0)],
        ];

        for scenes in cases {
            assert_eq!(decode(&encode(&scenes)), scenes);
        }
    }

    #[test]
    fn test_numbering_fills_skipped_levels() {
        let scenes = vec![s("A", 0), s("B", 0), s("C", 2), s("D", 2), s("E", 1)];
        let numbers: Vec<_> = number_scenes(&scenes)
            .into_iter()
            .map(|n| n.numbering)
            .collect();

        assert_eq!(
            numbers,
            vec![vec![1], vec![2], vec![2, 1, 1], vec![2, 1, 2], vec![2, 2]]
        );
    }

    #[test]
    fn test_numbering_length_matches_indent() {
        let scenes = vec![s("A", 0), s("B", 1), s("C", 3), s("D", 0), s("E", 2)];
        for numbered in number_scenes(&scenes) {
            assert_eq!(numbered.numbering.len(), numbered.indent + 1);
        }
    }

    #[test]
    fn test_numbering_ignores_titles() {
        let a = vec![s("A", 0), s("B", 1), s("C", 0)];
        let b = vec![s("X", 0), s("Y", 1), s("Z", 0)];

        let na: Vec<_> = number_scenes(&a).into_iter().map(|n| n.numbering).collect();
        let nb: Vec<_> = number_scenes(&b).into_iter().map(|n| n.numbering).collect();
        assert_eq!(na, nb);
    }

    #[test]
    fn test_scene_nodes_from_yaml() {
        let yaml = "- Opening\n- - 1984\n  - - true\n- Closing\n";
        let nodes: Vec<SceneNode> = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(
            decode(&nodes),
            vec![s("Opening", 0), s("1984", 1), s("true", 2), s("Closing", 0)]
        );
    }

    #[test]
    fn test_scene_nodes_reject_mappings() {
        let yaml = "- Opening\n- title: nope\n";
        let parsed: Result<Vec<SceneNode>, _> = serde_yaml::from_str(yaml);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_scene_nodes_serialize_as_nested_arrays() {
        let encoded = encode(&[s("A", 0), s("B", 1)]);
        let json = serde_json::to_string(&encoded).unwrap();
        assert_eq!(json, r#"["A",["B"]]"#);
    }
}
