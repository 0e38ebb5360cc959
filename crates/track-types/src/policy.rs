//! Tracking policy, per-field annotations and record type registration.
//!
//! Policy resolves in three layers: library default, record-type override,
//! call-site override. Each layer only overrides the options it sets.

use crate::{FieldPath, PathError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn default_true() -> bool {
    true
}

/// Which difference kinds get recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackOptions {
    /// Record added fields (`N`).
    #[serde(rename = "N", default = "default_true")]
    pub added: bool,
    /// Record edited fields with before/after values (`E`).
    #[serde(rename = "E", default = "default_true")]
    pub edited: bool,
}

impl Default for TrackOptions {
    fn default() -> Self {
        Self {
            added: true,
            edited: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorOptions {
    /// Attach the mutator-supplied author to each entry.
    #[serde(default)]
    pub enable: bool,
}

/// Fully resolved tracking policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingPolicy {
    #[serde(default)]
    pub track: TrackOptions,
    #[serde(default)]
    pub author: AuthorOptions,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackOverride {
    #[serde(rename = "N", default, skip_serializing_if = "Option::is_none")]
    pub added: Option<bool>,
    #[serde(rename = "E", default, skip_serializing_if = "Option::is_none")]
    pub edited: Option<bool>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,
}

/// Partial policy; unset options fall through to the layer below.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyOverride {
    #[serde(default)]
    pub track: TrackOverride,
    #[serde(default)]
    pub author: AuthorOverride,
}

impl PolicyOverride {
    /// Read `TRACK_N`, `TRACK_E` and `TRACK_AUTHOR` from the environment.
    /// Unset or unparseable variables leave the option unset.
    pub fn from_env() -> Self {
        let flag = |name: &str| std::env::var(name).ok().and_then(|v| parse_flag(&v));
        Self {
            track: TrackOverride {
                added: flag("TRACK_N"),
                edited: flag("TRACK_E"),
            },
            author: AuthorOverride {
                enable: flag("TRACK_AUTHOR"),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl TrackingPolicy {
    /// This policy with every option set in `layer` replaced.
    pub fn merged(self, layer: &PolicyOverride) -> Self {
        Self {
            track: TrackOptions {
                added: layer.track.added.unwrap_or(self.track.added),
                edited: layer.track.edited.unwrap_or(self.track.edited),
            },
            author: AuthorOptions {
                enable: layer.author.enable.unwrap_or(self.author.enable),
            },
        }
    }

    /// Resolve default -> type -> call.
    pub fn resolve(
        default: &TrackingPolicy,
        type_override: Option<&PolicyOverride>,
        call_override: Option<&PolicyOverride>,
    ) -> Self {
        [type_override, call_override]
            .into_iter()
            .flatten()
            .fold(*default, |policy, layer| policy.merged(layer))
    }
}

/// Annotation declared alongside a field definition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Never track this field or anything below it.
    #[serde(rename = "historyIgnore", default)]
    pub history_ignore: bool,
}

/// Per-path field annotations of a record type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    fields: BTreeMap<String, FieldDef>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, path: &FieldPath, def: FieldDef) -> Self {
        self.fields.insert(path.to_string(), def);
        self
    }

    /// Shorthand for declaring `historyIgnore` on a dotted path.
    pub fn ignore(self, dotted: &str) -> Result<Self, PathError> {
        let path = FieldPath::parse(dotted)?;
        Ok(self.with_field(
            &path,
            FieldDef {
                history_ignore: true,
            },
        ))
    }

    pub fn definition(&self, path: &FieldPath) -> Option<&FieldDef> {
        self.fields.get(&path.to_string())
    }

    /// True when the path or any ancestor is declared `historyIgnore`.
    /// Fields of array elements are declared without the index
    /// (`items.secret` covers `items.3.secret`).
    pub fn is_ignored(&self, path: &FieldPath) -> bool {
        self.ignores(path) || path.without_indices().is_some_and(|p| self.ignores(&p))
    }

    fn ignores(&self, path: &FieldPath) -> bool {
        path.ancestors()
            .filter_map(|p| self.definition(&p))
            .any(|def| def.history_ignore)
    }
}

/// A registered record type: its annotations and its resolved policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordType {
    pub name: String,
    pub schema: Schema,
    pub policy: TrackingPolicy,
}

impl RecordType {
    pub fn new(
        name: impl Into<String>,
        schema: Schema,
        default: &TrackingPolicy,
        type_override: Option<&PolicyOverride>,
    ) -> Self {
        Self {
            name: name.into(),
            schema,
            policy: TrackingPolicy::resolve(default, type_override, None),
        }
    }

    /// Policy for one save, with an optional call-site override on top.
    pub fn policy_for(&self, call_override: Option<&PolicyOverride>) -> TrackingPolicy {
        TrackingPolicy::resolve(&self.policy, call_override, None)
    }
}
