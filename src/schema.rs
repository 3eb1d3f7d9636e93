//! Schema types for describing provider and resource structure.
//!
//! Schemas describe the shape of the provider configuration and of the
//! `clerk_organization` resource. The host uses them for validation and
//! documentation; the provider uses the plan-modifier flags when planning.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resource type name of the organization resource.
pub const ORGANIZATION_RESOURCE: &str = "clerk_organization";

/// The type of an attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// A string value.
    String,
    /// A 64-bit integer.
    Int64,
}

/// Describes how an attribute can be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttributeFlags {
    /// The attribute is required in configuration.
    pub required: bool,
    /// The attribute is optional in configuration.
    pub optional: bool,
    /// The attribute is computed by the provider (read-only).
    pub computed: bool,
    /// The attribute is sensitive and should be hidden in logs/UI.
    pub sensitive: bool,
}

impl AttributeFlags {
    /// Create flags for a required attribute.
    pub fn required() -> Self {
        Self {
            required: true,
            ..Default::default()
        }
    }

    /// Create flags for an optional attribute.
    pub fn optional() -> Self {
        Self {
            optional: true,
            ..Default::default()
        }
    }

    /// Create flags for a computed attribute (read-only, set by provider).
    pub fn computed() -> Self {
        Self {
            computed: true,
            ..Default::default()
        }
    }

    /// Create flags for an optional+computed attribute (can be set, but has default from provider).
    pub fn optional_computed() -> Self {
        Self {
            optional: true,
            computed: true,
            ..Default::default()
        }
    }
}

/// Describes a single attribute in a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// The type of the attribute.
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Flags describing how the attribute can be used.
    #[serde(flatten)]
    pub flags: AttributeFlags,
    /// Human-readable description of the attribute.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// If set, changing this attribute forces resource replacement.
    #[serde(default)]
    pub force_new: bool,
    /// If set, a computed value left unset in configuration keeps the prior
    /// state value instead of becoming unknown.
    #[serde(default)]
    pub use_state_for_unknown: bool,
    /// If set, the string value must be a JSON document.
    #[serde(default)]
    pub json: bool,
    /// If set, a configured integer 0 means the same as unset.
    #[serde(default)]
    pub zero_as_null: bool,
}

impl Attribute {
    /// Create a new attribute with the given type and flags.
    pub fn new(attr_type: AttributeType, flags: AttributeFlags) -> Self {
        Self {
            attr_type,
            flags,
            description: None,
            force_new: false,
            use_state_for_unknown: false,
            json: false,
            zero_as_null: false,
        }
    }

    /// Create a required string attribute.
    pub fn required_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::required())
    }

    /// Create an optional string attribute.
    pub fn optional_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional())
    }

    /// Create a computed string attribute.
    pub fn computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::computed())
    }

    /// Create an optional+computed string attribute.
    pub fn optional_computed_string() -> Self {
        Self::new(AttributeType::String, AttributeFlags::optional_computed())
    }

    /// Create an optional+computed int64 attribute.
    pub fn optional_computed_int64() -> Self {
        Self::new(AttributeType::Int64, AttributeFlags::optional_computed())
    }

    /// Set the description for this attribute.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark this attribute as forcing resource replacement when changed.
    pub fn with_force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Keep the prior state value while the planned value is unknown.
    pub fn with_use_state_for_unknown(mut self) -> Self {
        self.use_state_for_unknown = true;
        self
    }

    /// Require the string value to parse as JSON.
    pub fn with_json(mut self) -> Self {
        self.json = true;
        self
    }

    /// Treat a configured 0 as unset when comparing with prior state.
    pub fn with_zero_as_null(mut self) -> Self {
        self.zero_as_null = true;
        self
    }

    /// Mark this attribute as sensitive.
    pub fn sensitive(mut self) -> Self {
        self.flags.sensitive = true;
        self
    }
}

/// Schema for a resource or the provider block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// The version of this schema (for state upgrades).
    #[serde(default)]
    pub version: u64,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Attributes keyed by name.
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
}

impl Schema {
    /// Create a new schema with the given version.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            description: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Create a schema at version 0.
    pub fn v0() -> Self {
        Self::new(0)
    }

    /// Add an attribute to the schema.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::v0()
    }
}

/// Schema for the provider configuration and its resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProviderSchema {
    /// Schema for provider configuration.
    #[serde(default)]
    pub provider: Schema,
    /// Schemas for each resource type.
    #[serde(default)]
    pub resources: BTreeMap<String, Schema>,
}

impl ProviderSchema {
    /// Create a new empty provider schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider configuration schema.
    pub fn with_provider_config(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    /// Add a resource schema.
    pub fn with_resource(mut self, name: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(name.into(), schema);
        self
    }
}

/// Schema of the provider block.
pub fn provider_config_schema() -> Schema {
    Schema::v0()
        .with_description("Provider for managing Clerk organizations and resources.")
        .with_attribute(
            "api_key",
            Attribute::optional_string()
                .sensitive()
                .with_description(
                    "Clerk API Key. Can also be set via CLERK_API_KEY environment variable.",
                ),
        )
        .with_attribute(
            "api_url",
            Attribute::optional_string().with_description(
                "Clerk Backend API base URL. Can also be set via CLERK_API_URL environment variable.",
            ),
        )
}

/// Schema of the `clerk_organization` resource.
pub fn organization_schema() -> Schema {
    Schema::v0()
        .with_description("Manages a Clerk organization.")
        .with_attribute(
            "id",
            Attribute::computed_string()
                .with_use_state_for_unknown()
                .with_description("The unique identifier of the organization."),
        )
        .with_attribute(
            "name",
            Attribute::required_string().with_description("The name of the organization."),
        )
        .with_attribute(
            "slug",
            Attribute::optional_computed_string()
                .with_use_state_for_unknown()
                .with_description(
                    "The slug of the organization. If not provided, one will be generated from the name.",
                ),
        )
        .with_attribute(
            "max_allowed_memberships",
            Attribute::optional_computed_int64()
                .with_use_state_for_unknown()
                .with_zero_as_null()
                .with_description(
                    "The maximum number of memberships allowed for the organization.",
                ),
        )
        .with_attribute(
            "public_metadata",
            Attribute::optional_computed_string()
                .with_json()
                .with_use_state_for_unknown()
                .with_description("Public metadata for the organization (JSON string)."),
        )
        .with_attribute(
            "private_metadata",
            Attribute::optional_computed_string()
                .with_json()
                .sensitive()
                .with_use_state_for_unknown()
                .with_description("Private metadata for the organization (JSON string)."),
        )
        .with_attribute(
            "created_by",
            Attribute::optional_string()
                .with_force_new()
                .with_description("The user ID who created the organization."),
        )
}

/// The full schema served by the provider.
pub fn provider_schema() -> ProviderSchema {
    ProviderSchema::new()
        .with_provider_config(provider_config_schema())
        .with_resource(ORGANIZATION_RESOURCE, organization_schema())
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// An error that prevents the operation from completing.
    Error,
    /// A warning that doesn't prevent the operation but should be addressed.
    Warning,
}

/// A diagnostic message from the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity of the diagnostic.
    pub severity: DiagnosticSeverity,
    /// A short summary of the issue.
    pub summary: String,
    /// A detailed description of the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// The attribute path where the issue occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    /// Create an error diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Create a warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self {
            severity: DiagnosticSeverity::Warning,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Add detail to this diagnostic.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set the attribute path for this diagnostic.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Returns true for error severity.
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}
