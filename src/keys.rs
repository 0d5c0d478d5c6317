//! Key derivation
//!
//! Primary keys and routing index names are pure functions of
//! `(scope, entity type, id)`. Nothing here reads hidden state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Partition scope (tenant) a request operates in
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scope(String);

impl Scope {
    /// Resolve a scope from an optional tenant id
    ///
    /// Absent or empty tenants fail with `SCOPE_UNRESOLVED`. A `#` would make
    /// the partition key ambiguous, so it is rejected as invalid input.
    pub fn resolve(tenant: Option<&str>) -> Result<Self> {
        let tenant = tenant.map(str::trim).unwrap_or_default();
        if tenant.is_empty() {
            return Err(Error::ScopeUnresolved);
        }
        if tenant.contains('#') {
            return Err(Error::validation(format!(
                "tenant id {:?} must not contain '#'",
                tenant
            )));
        }
        Ok(Self(tenant.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Search routing index for an entity type within this scope
    ///
    /// `"{scope}-{entity_type}"`, so two scopes never share a query space.
    pub fn routing_index(&self, entity_type: &str) -> String {
        format!("{}-{}", self.0, entity_type)
    }

    /// Primary key for an entity within this scope
    pub fn primary_key(&self, entity_type: &str, id: &str) -> PrimaryKey {
        PrimaryKey::derive(self, entity_type, id)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Two-part primary key
///
/// - `pk`: partition component `T#{scope}#{entity_type}#{id}`
/// - `sk`: sort component, equal to the entity id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub pk: String,
    pub sk: String,
}

impl PrimaryKey {
    /// Derive the key for `id` of `entity_type` in `scope`
    pub fn derive(scope: &Scope, entity_type: &str, id: &str) -> Self {
        Self {
            pk: format!("T#{}#{}#{}", scope.as_str(), entity_type, id),
            sk: id.to_string(),
        }
    }

    /// Document id used for this key in the search store
    pub fn document_id(&self) -> String {
        format!("{}:{}", self.pk, self.sk)
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pk, self.sk)
    }
}
