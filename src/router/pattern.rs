//! Route pattern compilation and structural path matching.
//!
//! | Pattern              | Example match              | Captured params              |
//! |----------------------|----------------------------|------------------------------|
//! | `/users`             | `/users`                   | *(none)*                     |
//! | `/users/:id`         | `/users/42`                | `id → "42"`                  |
//! | `/files/*`           | `/files/docs/readme.txt`   | `splat → "docs/readme.txt"`  |
//! | `/files/*path`       | `/files/docs/readme.txt`   | `path → "docs/readme.txt"`   |
//!
//! Patterns and paths are both split on `/` with empty segments dropped, so
//! `/users/` and `/users` are equivalent. A `*` segment is only special in the
//! last position; anywhere else it is an ordinary literal.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Parameter name bound by an anonymous trailing `*`.
pub const SPLAT: &str = "splat";

/// Errors produced while compiling a route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("parameter sigil without a name in segment {index} of pattern {pattern:?}")]
    UnnamedParameter { pattern: String, index: usize },
}

// A single path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Static(String),
    Parameter(String),
}

/// A compiled, immutable route pattern.
///
/// # Examples
///
/// ```
/// use rttp_dispatch::router::Pattern;
///
/// let pattern = Pattern::compile("/users/:id/posts/:post").unwrap();
/// let params = pattern.recognize("/users/7/posts/99").unwrap();
///
/// assert_eq!(params["id"], "7");
/// assert_eq!(params["post"], "99");
/// assert!(pattern.recognize("/users/7").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    segments: Vec<Segment>,
    // Name bound to the remainder of the path, when the pattern ends in `*`.
    wildcard: Option<String>,
}

impl Pattern {
    /// Compiles `pattern`.
    ///
    /// # Errors
    ///
    /// [`PatternError::UnnamedParameter`] when a segment is a bare `:`.
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        let raw: Vec<&str> = split_segments(pattern).collect();
        let mut segments = Vec::with_capacity(raw.len());
        let mut wildcard = None;

        for (index, segment) in raw.iter().enumerate() {
            let is_last = index + 1 == raw.len();

            if is_last {
                if let Some(name) = segment.strip_prefix('*') {
                    let name = if name.is_empty() { SPLAT } else { name };
                    wildcard = Some(name.to_owned());
                    continue;
                }
            }

            match segment.strip_prefix(':') {
                Some("") => {
                    return Err(PatternError::UnnamedParameter {
                        pattern: pattern.to_owned(),
                        index,
                    });
                }
                Some(name) => segments.push(Segment::Parameter(name.to_owned())),
                None => segments.push(Segment::Static((*segment).to_owned())),
            }
        }

        Ok(Self {
            source: pattern.to_owned(),
            segments,
            wildcard,
        })
    }

    /// Builds a pattern made only of literal segments. Never fails.
    pub fn literal(path: &str) -> Self {
        Self {
            source: path.to_owned(),
            segments: split_segments(path)
                .map(|s| Segment::Static(s.to_owned()))
                .collect(),
            wildcard: None,
        }
    }

    /// The pattern string this was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Names of the parameters this pattern binds, in path order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Parameter(name) => Some(name.as_str()),
                Segment::Static(_) => None,
            })
            .chain(self.wildcard.as_deref())
    }

    /// Matches `path` against the pattern.
    ///
    /// Returns the raw captured values keyed by parameter name on a match,
    /// `None` otherwise. No decoding or coercion is applied.
    pub fn recognize(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let parts: Vec<&str> = split_segments(path).collect();

        let fits = match self.wildcard {
            Some(_) => parts.len() >= self.segments.len(),
            None => parts.len() == self.segments.len(),
        };
        if !fits {
            return None;
        }

        let mut params = BTreeMap::new();
        for (segment, part) in self.segments.iter().zip(&parts) {
            match segment {
                Segment::Static(literal) => {
                    if literal.as_str() != *part {
                        return None;
                    }
                }
                Segment::Parameter(name) => {
                    params.insert(name.clone(), (*part).to_owned());
                }
            }
        }

        if let Some(name) = &self.wildcard {
            let rest = parts[self.segments.len()..].join("/");
            params.insert(name.clone(), rest);
        }

        Some(params)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}
