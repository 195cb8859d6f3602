//! Vault path helpers.
//!
//! Vault paths are `/`-separated, relative to the vault root, with no
//! leading or trailing separator. The root itself is the empty string.

/// Markdown extension for notes.
pub const NOTE_EXTENSION: &str = ".md";

/// Normalize a path: unify separators, drop empty and `.` segments.
#[must_use]
pub fn normalize(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Join a base and a relative path, normalizing the result.
#[must_use]
pub fn join(base: &str, path: &str) -> String {
    normalize(&format!("{base}/{path}"))
}

/// Parent folder of a path (`""` for top-level entries).
#[must_use]
pub fn parent(path: &str) -> String {
    let normalized = normalize(path);
    match normalized.rfind('/') {
        Some(idx) => normalized[..idx].to_string(),
        None => String::new(),
    }
}

/// Last segment of a path.
#[must_use]
pub fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Whether the path names a markdown note.
#[must_use]
pub fn is_note(path: &str) -> bool {
    file_name(path).ends_with(NOTE_EXTENSION)
}

/// Note title from a path: the file name without `.md`.
#[must_use]
pub fn note_stem(path: &str) -> String {
    let name = file_name(path);
    name.strip_suffix(NOTE_EXTENSION).unwrap_or(name).to_string()
}

/// Whether any segment is hidden (starts with `.`).
#[must_use]
pub fn is_hidden(path: &str) -> bool {
    path.split('/').any(|part| part.starts_with('.') && part != "." && part != "..")
}
