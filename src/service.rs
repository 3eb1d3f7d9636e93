//! The callbacks the host runtime drives.
//!
//! The host owns planning order, state storage and the wire protocol. It calls
//! into a [`ProviderService`] at fixed points of its own state machine:
//!
//! 1. `validate_provider_config`, then `configure` once per run
//! 2. `validate_resource_config` and `plan` for every resource in the config
//! 3. `create`, `update` or `delete` for each planned change; a replacement is
//!    a `delete` of the prior object followed by a `create`
//! 4. `read` on refresh, `import_resource` on import
//!
//! States cross this boundary as JSON objects keyed by attribute name, with
//! unknown values carried as [`UNKNOWN_VALUE`](crate::value::UNKNOWN_VALUE).

use serde_json::Value;

use crate::error::ProviderError;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::types::{ImportedResource, PlanResult, ProviderMetadata};
use crate::validation::validate;

/// Lifecycle callbacks of a provider.
///
/// Every resource callback receives the resource type so one provider can
/// serve several; implementations reject types they do not know with
/// [`ProviderError::UnknownResource`].
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    /// Schema of the provider block and every resource.
    fn schema(&self) -> ProviderSchema;

    /// Resource types served. Derived from the schema by default.
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            resources: self.schema().resources.into_keys().collect(),
            plan_destroy: false,
        }
    }

    /// Check the provider block against the provider schema.
    async fn validate_provider_config(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&self.schema().provider, &config))
    }

    /// Build the API client from the provider block.
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Check a resource's configuration before planning.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        match self.schema().resources.get(resource_type) {
            Some(schema) => Ok(validate(schema, &config)),
            None => Err(ProviderError::UnknownResource(resource_type.to_string())),
        }
    }

    /// Plan the transition from `prior_state` to the configuration.
    ///
    /// `prior_state` is `None` for a create; a null `config` plans a destroy.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create the resource described by `planned_state` and return its state.
    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError>;

    /// Refresh `current_state` from the remote side.
    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError>;

    /// Apply `planned_state` in place to the resource recorded in `prior_state`.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete the resource recorded in `current_state`.
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError>;

    /// Adopt an existing remote object by its identifier.
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError>;
}
