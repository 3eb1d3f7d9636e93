//! The `clerk_organization` state model and its mapping to API calls.
//!
//! [`OrganizationState`] is the shape the host stores. Building request
//! parameters reads only known values; mapping a fetched [`Organization`] back
//! follows fixed rules so that a refresh right after apply reproduces exactly
//! what was stored:
//!
//! | remote value | state value |
//! |---|---|
//! | `max_allowed_memberships` > 0 | the integer |
//! | `max_allowed_memberships` absent or 0 | null |
//! | metadata non-empty document | canonical JSON text |
//! | metadata absent or `{}` | null |
//! | `slug` | always the server's value |

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{CreateOrganizationParams, Organization, UpdateOrganizationParams};
use crate::error::ProviderError;
use crate::schema::Diagnostic;
use crate::value::AttrValue;

/// Attribute name of the public metadata document.
pub const PUBLIC_METADATA: &str = "public_metadata";

/// Attribute name of the private metadata document.
pub const PRIVATE_METADATA: &str = "private_metadata";

/// Desired or recorded state of one organization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizationState {
    /// Server-assigned identifier.
    pub id: AttrValue<String>,
    /// Display name.
    pub name: AttrValue<String>,
    /// URL-friendly identifier.
    pub slug: AttrValue<String>,
    /// Membership limit.
    pub max_allowed_memberships: AttrValue<i64>,
    /// Public metadata as JSON text.
    pub public_metadata: AttrValue<String>,
    /// Private metadata as JSON text.
    pub private_metadata: AttrValue<String>,
    /// Creating user. Changing it replaces the organization.
    pub created_by: AttrValue<String>,
}

impl OrganizationState {
    /// State holding only an identifier, as produced by import.
    pub fn from_import(id: impl Into<String>) -> Self {
        Self {
            id: AttrValue::Known(id.into()),
            ..Default::default()
        }
    }

    /// Decode from the host's JSON representation.
    pub fn from_value(value: Value) -> Result<Self, ProviderError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Encode into the host's JSON representation.
    pub fn to_value(&self) -> Result<Value, ProviderError> {
        Ok(serde_json::to_value(self)?)
    }

    /// The organization identifier, which must be known and non-empty.
    pub fn id(&self) -> Result<&str, ProviderError> {
        match self.id.known() {
            Some(id) if !id.trim().is_empty() => Ok(id),
            _ => Err(ProviderError::InvalidState(
                "organization ID is not set".to_string(),
            )),
        }
    }

    fn name(&self) -> Result<&str, ProviderError> {
        self.name
            .known()
            .map(String::as_str)
            .ok_or_else(|| ProviderError::Validation("name is required".to_string()))
    }

    /// Parameters for `POST /organizations`.
    pub fn create_params(&self) -> Result<CreateOrganizationParams, ProviderError> {
        Ok(CreateOrganizationParams {
            name: self.name()?.to_string(),
            slug: self.slug.known().cloned(),
            max_allowed_memberships: self.max_allowed_memberships.known().copied(),
            created_by: self.created_by.known().cloned(),
            public_metadata: parse_metadata(PUBLIC_METADATA, &self.public_metadata)?,
            private_metadata: parse_metadata(PRIVATE_METADATA, &self.private_metadata)?,
        })
    }

    /// Parameters for `PATCH /organizations/{id}`. Never carries `created_by`.
    pub fn update_params(&self) -> Result<UpdateOrganizationParams, ProviderError> {
        Ok(UpdateOrganizationParams {
            name: Some(self.name()?.to_string()),
            slug: self.slug.known().cloned(),
            max_allowed_memberships: self.max_allowed_memberships.known().copied(),
            public_metadata: parse_metadata(PUBLIC_METADATA, &self.public_metadata)?,
            private_metadata: parse_metadata(PRIVATE_METADATA, &self.private_metadata)?,
        })
    }

    /// Overwrite every remotely owned attribute from a fetched record.
    ///
    /// `created_by` stays as configured; it is write-once on the remote side.
    pub fn apply_record(&mut self, org: &Organization) {
        self.id = AttrValue::Known(org.id.clone());
        self.name = AttrValue::Known(org.name.clone());
        self.slug = AttrValue::Known(org.slug.clone());
        self.max_allowed_memberships = match org.max_allowed_memberships {
            Some(n) if n > 0 => AttrValue::Known(n),
            _ => AttrValue::Null,
        };
        self.public_metadata = canonical_metadata(org.public_metadata.as_ref());
        self.private_metadata = canonical_metadata(org.private_metadata.as_ref());
    }

    /// Resource-specific checks beyond the schema.
    pub fn validate(&self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        if let Some(name) = self.name.known() {
            if name.trim().is_empty() {
                diagnostics.push(
                    Diagnostic::error("Invalid name")
                        .with_detail("name must not be empty")
                        .with_attribute("name"),
                );
            }
        }

        match self.max_allowed_memberships.known() {
            Some(n) if *n < 0 => diagnostics.push(
                Diagnostic::error("Invalid max_allowed_memberships")
                    .with_detail(format!("expected a positive integer, got {}", n))
                    .with_attribute("max_allowed_memberships"),
            ),
            Some(0) => diagnostics.push(
                Diagnostic::warning("max_allowed_memberships of 0 means no limit")
                    .with_detail("The value will be read back as unset; omit it instead")
                    .with_attribute("max_allowed_memberships"),
            ),
            _ => {},
        }

        diagnostics
    }
}

/// Parse a known metadata text into a JSON document.
fn parse_metadata(attr: &str, text: &AttrValue<String>) -> Result<Option<Value>, ProviderError> {
    match text.known() {
        Some(text) => serde_json::from_str(text).map(Some).map_err(|e| {
            ProviderError::Validation(format!("Could not parse {} as JSON: {}", attr, e))
        }),
        None => Ok(None),
    }
}

fn is_empty_document(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Canonical text for a metadata document; empty documents map to null.
///
/// Object keys come out sorted and without whitespace, so semantically equal
/// documents always produce identical text.
pub fn canonical_metadata(value: Option<&Value>) -> AttrValue<String> {
    match value {
        Some(doc) if !is_empty_document(doc) => AttrValue::Known(sorted(doc).to_string()),
        _ => AttrValue::Null,
    }
}

// Rebuilds objects in key order so the output does not depend on how the
// map type orders its entries.
fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sorted(v)))
                    .collect(),
            )
        },
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

/// Whether two metadata texts describe the same document.
///
/// Null and `{}` are equivalent. Text that does not parse is compared
/// verbatim.
pub fn metadata_equivalent(a: &AttrValue<String>, b: &AttrValue<String>) -> bool {
    fn document(text: &AttrValue<String>) -> Option<Result<Value, &str>> {
        match text {
            AttrValue::Null => Some(Ok(Value::Null)),
            AttrValue::Unknown => None,
            AttrValue::Known(t) => Some(serde_json::from_str::<Value>(t).map_err(|_| t.as_str())),
        }
    }

    match (document(a), document(b)) {
        (None, None) => true,
        (Some(Ok(x)), Some(Ok(y))) => {
            x == y || (is_empty_document(&x) && is_empty_document(&y))
        },
        (Some(Err(x)), Some(Err(y))) => x == y,
        _ => false,
    }
}
