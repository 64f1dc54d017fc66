//! Per-view settings.

use {
    crate::error::Result,
    serde::{Deserialize, Serialize},
};

/// What a converting view does when an inserted input
/// is already present in its identity lookup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Skip the element and log a warning.
    #[default]
    Ignore,
    /// Fault the view with `ViewError::DuplicateIdentity`.
    Reject,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Label attached to the view's log records.
    pub name: Option<String>,
    pub duplicates: DuplicatePolicy,
}

impl ProjectionConfig {
    pub fn named(name: impl Into<String>) -> Self {
        ProjectionConfig {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn with_duplicates(mut self, duplicates: DuplicatePolicy) -> Self {
        self.duplicates = duplicates;
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub(crate) fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed")
    }
}
