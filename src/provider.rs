//! The Clerk provider.
//!
//! [`ClerkProvider`] serves the `clerk_organization` resource. The API client
//! is built once by `configure` and is read-only afterwards.

use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::client::{ClerkClient, OrganizationApi};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::organization::OrganizationState;
use crate::plan::{plan, replaced_by};
use crate::reconciler::OrganizationReconciler;
use crate::schema::{
    organization_schema, provider_schema, Diagnostic, ProviderSchema,
    ORGANIZATION_RESOURCE,
};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanResult, ProviderMetadata};
use crate::validation::validate;

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Provider for Clerk organizations.
pub struct ClerkProvider {
    reconciler: OnceLock<OrganizationReconciler>,
    env: EnvLookup,
}

impl Default for ClerkProvider {
    fn default() -> Self {
        Self {
            reconciler: OnceLock::new(),
            env: Arc::new(|name| std::env::var(name).ok()),
        }
    }
}

impl std::fmt::Debug for ClerkProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClerkProvider")
            .field("configured", &self.is_configured())
            .finish_non_exhaustive()
    }
}

impl ClerkProvider {
    /// Create an unconfigured provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the process environment as the source of `CLERK_API_KEY` and
    /// `CLERK_API_URL` fallbacks.
    pub fn with_env<F>(mut self, env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(env);
        self
    }

    /// Create a provider that talks to `api` without needing `configure`.
    pub fn with_api(api: Arc<dyn OrganizationApi>) -> Self {
        let provider = Self::new();
        // A fresh OnceLock is always empty.
        let _ = provider.reconciler.set(OrganizationReconciler::new(api));
        provider
    }

    /// Returns true once an API client is available.
    pub fn is_configured(&self) -> bool {
        self.reconciler.get().is_some()
    }

    fn reconciler(&self) -> Result<&OrganizationReconciler, ProviderError> {
        self.reconciler.get().ok_or_else(|| {
            ProviderError::Configuration("provider has not been configured".to_string())
        })
    }
}

fn check_resource_type(resource_type: &str) -> Result<(), ProviderError> {
    if resource_type == ORGANIZATION_RESOURCE {
        Ok(())
    } else {
        Err(ProviderError::UnknownResource(resource_type.to_string()))
    }
}

#[async_trait::async_trait]
impl ProviderService for ClerkProvider {
    fn schema(&self) -> ProviderSchema {
        provider_schema()
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            resources: vec![ORGANIZATION_RESOURCE.to_string()],
            plan_destroy: true,
        }
    }

    #[instrument(skip_all, name = "provider.configure")]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let client_config = ProviderConfig::from_value(config)?.resolve_with(self.env.as_ref())?;

        if self.is_configured() {
            warn!("Provider already configured, keeping existing client");
            return Ok(vec![Diagnostic::warning("Provider already configured")
                .with_detail("The existing API client is kept for the rest of this run")]);
        }

        let base_url = client_config.base_url.clone();
        let client = ClerkClient::new(client_config).map_err(|e| {
            ProviderError::Configuration(format!("could not build API client: {}", e))
        })?;

        if self
            .reconciler
            .set(OrganizationReconciler::new(Arc::new(client)))
            .is_err()
        {
            warn!("Provider configured concurrently, keeping existing client");
        }
        info!(base_url = %base_url, "Provider configured");
        Ok(vec![])
    }

    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        check_resource_type(resource_type)?;

        let mut diagnostics = validate(&organization_schema(), &config);
        if diagnostics.is_empty() {
            diagnostics.extend(OrganizationState::from_value(config)?.validate());
        }
        Ok(diagnostics)
    }

    #[instrument(skip_all, fields(resource_type = %resource_type), name = "provider.plan")]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        check_resource_type(resource_type)?;

        let desired = if config.is_object() {
            &config
        } else {
            &proposed_state
        };
        let schema = organization_schema();
        let result = plan(&schema, prior_state.as_ref(), desired)?;

        if result.requires_replace {
            info!(replaced_by = ?replaced_by(&schema, &result), "Organization must be replaced");
        }
        debug!(
            action = ?result.action(prior_state.is_some()),
            changes = result.changes.len(),
            requires_replace = result.requires_replace,
            "Plan completed"
        );
        Ok(result)
    }

    async fn create(&self, resource_type: &str, planned_state: Value) -> Result<Value, ProviderError> {
        check_resource_type(resource_type)?;
        let planned = OrganizationState::from_value(planned_state)?;
        self.reconciler()?.create(planned).await?.to_value()
    }

    async fn read(&self, resource_type: &str, current_state: Value) -> Result<Value, ProviderError> {
        check_resource_type(resource_type)?;
        let current = OrganizationState::from_value(current_state)?;
        self.reconciler()?.read(&current).await?.to_value()
    }

    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        check_resource_type(resource_type)?;
        let prior = OrganizationState::from_value(prior_state)?;
        let planned = OrganizationState::from_value(planned_state)?;
        self.reconciler()?.update(&prior, planned).await?.to_value()
    }

    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        check_resource_type(resource_type)?;
        let current = OrganizationState::from_value(current_state)?;
        self.reconciler()?.delete(&current).await
    }

    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        check_resource_type(resource_type)?;
        let state = self.reconciler()?.import(id).await?;
        Ok(vec![ImportedResource::new(resource_type, state.to_value()?)])
    }
}
