//! Glob pattern matching over store listings.
//!
//! Patterns follow shell/`pathlib` conventions: `*` matches within a path
//! segment, `**` matches any number of segments, `?` matches one character,
//! and `[abc]`/`[a-z]`/`[!abc]` character classes are supported. The literal
//! prefix before the first wildcard is passed to the store's `list` call so
//! only a relevant subtree is enumerated.

use regex::Regex;
use tracing::trace;

use crate::error::StoreError;
use crate::store::{ObjectList, ObjectMeta};

/// Characters that begin a glob construct.
const GLOB_CHARS: &[char] = &['*', '?', '['];

/// Paths matching `pattern` in the store's listing.
///
/// ```ignore
/// let paths = glob(&store, "data/2024/**/*.nc").await?;
/// ```
pub async fn glob<S: ObjectList>(store: &S, pattern: &str) -> Result<Vec<String>, StoreError> {
    Ok(glob_objects(store, pattern)
        .await?
        .into_iter()
        .map(|meta| meta.path)
        .collect())
}

/// Like [`glob`], but yields full [`ObjectMeta`] for each match.
pub async fn glob_objects<S: ObjectList>(
    store: &S,
    pattern: &str,
) -> Result<Vec<ObjectMeta>, StoreError> {
    let prefix = literal_prefix(pattern);
    let regex = compile_pattern(pattern)?;
    trace!(pattern, prefix, regex = regex.as_str(), "glob listing");

    let listed = store
        .list((!prefix.is_empty()).then_some(prefix))
        .await?;
    Ok(listed
        .into_iter()
        .filter(|meta| regex.is_match(&meta.path))
        .collect())
}

/// The literal prefix of `pattern` usable for listing: everything up to and
/// including the last `/` before the first wildcard character. Literal
/// patterns yield their parent directory.
fn literal_prefix(pattern: &str) -> &str {
    let wildcard = pattern.find(GLOB_CHARS).unwrap_or(pattern.len());
    match pattern[..wildcard].rfind('/') {
        Some(last_slash) => &pattern[..=last_slash],
        None => "",
    }
}

/// Compile a glob pattern into an anchored regex.
///
/// Segments are translated one at a time: `**` becomes `(?:.+/)?` in
/// non-terminal position and `.*` at the end; consecutive `**` segments
/// collapse into one.
fn compile_pattern(pattern: &str) -> Result<Regex, StoreError> {
    let segments: Vec<&str> = pattern.split('/').collect();
    let mut regex = String::with_capacity(pattern.len() * 2 + 2);
    regex.push('^');

    let mut i = 0;
    while i < segments.len() {
        let segment = segments[i];

        if segment == "**" {
            while i + 1 < segments.len() && segments[i + 1] == "**" {
                i += 1;
            }
            if i == segments.len() - 1 {
                regex.push_str(".*");
            } else {
                regex.push_str("(?:.+/)?");
            }
        } else if segment.is_empty() {
            // Leading or doubled slash.
            if i != segments.len() - 1 {
                regex.push('/');
            }
        } else {
            translate_segment(segment, &mut regex);
            if i != segments.len() - 1 {
                regex.push('/');
            }
        }

        i += 1;
    }

    regex.push('$');
    Regex::new(&regex).map_err(|e| StoreError::InvalidGlob {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Translate one path segment (no `/`) into regex syntax.
fn translate_segment(segment: &str, out: &mut String) {
    let chars: Vec<char> = segment.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                out.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            '[' => {
                // Scan for the closing bracket; `]` directly after the
                // opening (or after the negation) is a literal member.
                let mut j = i + 1;
                if j < chars.len() && (chars[j] == '!' || chars[j] == '^') {
                    j += 1;
                }
                if j < chars.len() && chars[j] == ']' {
                    j += 1;
                }
                while j < chars.len() && chars[j] != ']' {
                    j += 1;
                }

                if j >= chars.len() {
                    // Unclosed class: literal `[`.
                    out.push_str(&regex::escape("["));
                    i += 1;
                } else {
                    let negated = chars[i + 1] == '!' || chars[i + 1] == '^';
                    let body_start = i + 1 + usize::from(negated);
                    let mut body: String = chars[body_start..j].iter().collect();
                    // The regex crate needs a literal leading `]` escaped.
                    if body.starts_with(']') {
                        body.replace_range(..1, "\\]");
                    }
                    out.push('[');
                    if negated {
                        out.push('^');
                    }
                    out.push_str(&body);
                    out.push(']');
                    i = j + 1;
                }
            }
            other => {
                let mut literal = String::new();
                literal.push(other);
                out.push_str(&regex::escape(&literal));
                i += 1;
            }
        }
    }
}
