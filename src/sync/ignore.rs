//! Ignored-file glob patterns.
//!
//! Patterns use a tiny glob dialect: `*` matches any run of characters,
//! `?` matches exactly one, everything else is literal. A pattern must
//! match the whole filename (without `.md`).

use regex::Regex;
use tracing::warn;

/// Compile one glob pattern into an anchored regex.
///
/// # Errors
///
/// Returns an error if the resulting expression is rejected by the regex
/// engine (for example, when it exceeds the size limit).
pub fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    let mut expr = String::with_capacity(pattern.len() + 8);
    expr.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    expr.push('$');
    Regex::new(&expr)
}

/// A set of compiled ignore patterns.
#[derive(Debug, Clone, Default)]
pub struct IgnoreMatcher {
    patterns: Vec<Regex>,
}

impl IgnoreMatcher {
    /// Compile patterns; empty patterns are skipped and invalid ones logged.
    #[must_use]
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let patterns = patterns
            .iter()
            .map(AsRef::as_ref)
            .filter(|p| !p.is_empty())
            .filter_map(|p| match compile(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(pattern = p, error = %e, "Skipping invalid ignore pattern");
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    /// Whether any pattern matches the filename.
    #[must_use]
    pub fn is_match(&self, name: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(name))
    }
}
