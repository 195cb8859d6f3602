//! YAML front matter parsing and rendering.
//!
//! A note's front matter is the YAML block between a leading `---` line and
//! the next `---` line. Everything after the closing line is the body and
//! is preserved byte for byte on rewrite.

use serde_yaml::{Mapping, Value};

const DELIMITER: &str = "---";

/// A note split into its front matter and body.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteContent {
    /// Parsed front matter; `None` when the note has no front matter block.
    pub frontmatter: Option<Mapping>,
    /// Text after the front matter block.
    pub body: String,
}

/// Split raw note text into (YAML text, body). Returns `None` for the YAML
/// part when there is no well-formed block.
#[must_use]
pub fn split(content: &str) -> (Option<&str>, &str) {
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return (None, content);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(['\r', '\n']) == DELIMITER {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }

    // `---` at end of file without a trailing newline
    if let Some(yaml) = rest.strip_suffix(DELIMITER) {
        if yaml.is_empty() || yaml.ends_with('\n') {
            return (Some(yaml), "");
        }
    }

    (None, content)
}

/// Parse note text into front matter and body.
///
/// # Errors
///
/// Returns an error if the front matter is not valid YAML or is not a mapping.
pub fn parse(content: &str) -> Result<NoteContent, serde_yaml::Error> {
    let (yaml, body) = split(content);
    let frontmatter = match yaml {
        None => None,
        Some(text) if text.trim().is_empty() => Some(Mapping::new()),
        Some(text) => match serde_yaml::from_str::<Value>(text)? {
            Value::Null => Some(Mapping::new()),
            Value::Mapping(map) => Some(map),
            _ => {
                return Err(serde::de::Error::custom(
                    "front matter must be a mapping of keys to values",
                ));
            }
        },
    };

    Ok(NoteContent {
        frontmatter,
        body: body.to_string(),
    })
}

/// Render front matter and body back into note text.
///
/// An empty mapping drops the block entirely.
///
/// # Errors
///
/// Returns an error if the mapping cannot be serialized.
pub fn render(frontmatter: &Mapping, body: &str) -> Result<String, serde_yaml::Error> {
    if frontmatter.is_empty() {
        return Ok(body.to_string());
    }
    let yaml = serde_yaml::to_string(frontmatter)?;
    Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n{body}"))
}
