//! Typed field paths: an ordered sequence of field names and array indices.

use crate::PathError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Path into a record, e.g. `["address", "lines", "0"]` for `address.lines.0`.
///
/// Persisted as a plain array of strings. Deserialization does not validate,
/// so a stored change with a broken path only fails when it is replayed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Parse a dotted path such as `"meta.tags.1"`.
    pub fn parse(dotted: &str) -> Result<Self, PathError> {
        if dotted.is_empty() {
            return Err(PathError::Empty);
        }
        Self::from_tokens(dotted.split('.'))
    }

    /// Build from already split tokens.
    pub fn from_tokens<I, S>(tokens: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let path = Self(tokens.into_iter().map(Into::into).collect());
        path.validate()?;
        Ok(path)
    }

    /// Check the path is non-empty and has no empty tokens.
    pub fn validate(&self) -> Result<(), PathError> {
        if self.0.is_empty() {
            return Err(PathError::Empty);
        }
        if self.0.iter().any(String::is_empty) {
            return Err(PathError::EmptyToken(self.to_string()));
        }
        Ok(())
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    /// Top-level field name.
    pub fn root(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// New path with `token` appended.
    pub fn child(&self, token: impl Into<String>) -> Self {
        let mut tokens = self.0.clone();
        tokens.push(token.into());
        Self(tokens)
    }

    /// New path with an array index appended.
    pub fn index(&self, index: usize) -> Self {
        self.child(index.to_string())
    }

    /// True if `prefix` equals this path or is one of its ancestors.
    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// The path with array index tokens dropped (`items.0.secret` becomes
    /// `items.secret`), or `None` when it has none. The first token is always
    /// a field name and is kept.
    pub fn without_indices(&self) -> Option<FieldPath> {
        let (first, rest) = self.0.split_first()?;
        if !rest.iter().any(|t| is_index(t)) {
            return None;
        }
        let tokens = std::iter::once(first)
            .chain(rest.iter().filter(|t| !is_index(t)))
            .cloned()
            .collect();
        Some(Self(tokens))
    }

    /// This path followed by each of its ancestors, innermost first.
    pub fn ancestors(&self) -> impl Iterator<Item = FieldPath> + '_ {
        (1..=self.0.len())
            .rev()
            .map(move |n| Self(self.0[..n].to_vec()))
    }
}

fn is_index(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
