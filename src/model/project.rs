//! Project entity and its mutation inputs

use serde::{Deserialize, Deserializer, Serialize};

use super::Timestamp;

/// Who created or last saved a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Identity {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            kind: kind.into(),
        }
    }
}

/// Canonical project record
///
/// Holds domain and ownership fields only. Storage keys and version stamps
/// live in the row types of the adapters and never reach this struct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub created_on: Timestamp,
    pub saved_on: Timestamp,
    #[serde(default)]
    pub created_by: Option<Identity>,
    #[serde(default)]
    pub saved_by: Option<Identity>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_nice: bool,
}

impl Project {
    /// Build a brand new record from create input
    pub fn create(
        id: String,
        input: ProjectInput,
        identity: Option<Identity>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            created_on: now,
            saved_on: now,
            created_by: identity.clone(),
            saved_by: identity,
            title: input.title,
            description: input.description,
            is_nice: input.is_nice.unwrap_or(false),
        }
    }

    /// Merge a patch into this record, field by field
    ///
    /// `id`, `created_on` and `created_by` are preserved. `saved_on` always
    /// moves forward, even if `now` is not past the previous save.
    pub fn merged(&self, patch: ProjectPatch, identity: Option<Identity>, now: Timestamp) -> Self {
        let floor = self.saved_on.plus_millis(1);
        Self {
            id: self.id.clone(),
            created_on: self.created_on,
            saved_on: if now >= floor { now } else { floor },
            created_by: self.created_by.clone(),
            saved_by: identity,
            title: patch.title.unwrap_or_else(|| self.title.clone()),
            description: match patch.description {
                Some(description) => description,
                None => self.description.clone(),
            },
            is_nice: patch.is_nice.unwrap_or(self.is_nice),
        }
    }
}

/// Input for creating a project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Defaults to `false`
    #[serde(default)]
    pub is_nice: Option<bool>,
}

impl ProjectInput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_nice(mut self, is_nice: bool) -> Self {
        self.is_nice = Some(is_nice);
        self
    }
}

/// Partial update; `None` fields keep their stored value
///
/// `description` is the one clearable field: an explicit `null` arrives as
/// `Some(None)` and removes the stored description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub is_nice: Option<bool>,
}

impl ProjectPatch {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(Some(description.into()));
        self
    }

    pub fn clear_description(mut self) -> Self {
        self.description = Some(None);
        self
    }

    pub fn is_nice(mut self, is_nice: bool) -> Self {
        self.is_nice = Some(is_nice);
        self
    }

    /// No field would change
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.is_nice.is_none()
    }
}

/// A field that is present in the input, possibly as `null`
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
