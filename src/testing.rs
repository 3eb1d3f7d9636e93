//! Testing utilities for the provider.
//!
//! [`ProviderTester`] drives any [`ProviderService`] through the same
//! plan/apply sequences the host runs, without a host. [`InMemoryOrganizationApi`]
//! stands in for the Clerk API: it generates IDs and slugs, records every call
//! and can be told to fail the next call of a given kind.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use clerk_provider::testing::{InMemoryOrganizationApi, ProviderTester};
//! use clerk_provider::ClerkProvider;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_organization() {
//!     let api = Arc::new(InMemoryOrganizationApi::new());
//!     let tester = ProviderTester::new(ClerkProvider::with_api(api));
//!
//!     let state = tester
//!         .lifecycle_create("clerk_organization", json!({"name": "Acme"}))
//!         .await
//!         .unwrap();
//!
//!     assert_eq!(state["slug"], "acme");
//! }
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::client::{
    CreateOrganizationParams, Organization, OrganizationApi, UpdateOrganizationParams,
};
use crate::error::{ClientError, Operation, ProviderError, RemoteError};
use crate::schema::{Diagnostic, DiagnosticSeverity, ProviderSchema};
use crate::service::ProviderService;
use crate::types::{ImportedResource, PlanAction, PlanResult};

/// A test harness for provider implementations.
///
/// This wraps a `ProviderService` implementation and provides simplified
/// methods for testing without a host.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Get the provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate provider configuration.
    ///
    /// Returns `Err` with the diagnostics if there are errors.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.validate_provider_config(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Configure the provider.
    ///
    /// Returns `Err` with the diagnostics if there are errors.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Plan a resource creation (no prior state).
    pub async fn plan_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, None, config.clone(), config)
            .await
    }

    /// Plan a resource update.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), config.clone(), config)
            .await
    }

    /// Plan a resource deletion.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.provider
            .plan(resource_type, Some(prior_state), Value::Null, Value::Null)
            .await
    }

    /// Create a new resource.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Read the current state of a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Import an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    // =========================================================================
    // Lifecycle Helpers
    // =========================================================================

    /// Run a full create lifecycle: plan → create → read.
    ///
    /// Returns the final state after read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self.plan_create(resource_type, config).await?;

        let created_state = self
            .create(resource_type, plan_result.planned_state)
            .await?;

        self.read(resource_type, created_state).await
    }

    /// Run a full update lifecycle: plan → update → read.
    ///
    /// When the plan requires replacement the prior resource is deleted and
    /// the planned one created instead, as the host does.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan_result = self
            .plan_update(resource_type, prior_state.clone(), config)
            .await?;

        let applied = match plan_result.action(true) {
            PlanAction::Replace => {
                self.delete(resource_type, prior_state).await?;
                self.create(resource_type, plan_result.planned_state).await?
            },
            PlanAction::Update => {
                self.update(resource_type, prior_state, plan_result.planned_state)
                    .await?
            },
            PlanAction::NoOp => prior_state,
            action => {
                return Err(ProviderError::InvalidState(format!(
                    "update planned {:?}",
                    action
                )))
            },
        };

        self.read(resource_type, applied).await
    }

    /// Run a full delete lifecycle: plan → delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        let _ = self
            .plan_delete(resource_type, current_state.clone())
            .await?;

        self.delete(resource_type, current_state).await
    }

    /// Run a full CRUD lifecycle: create → read → update → read → delete.
    ///
    /// Returns the state after the update (before delete).
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, ProviderError> {
        let created_state = self.lifecycle_create(resource_type, initial_config).await?;

        let updated_state = self
            .lifecycle_update(resource_type, created_state, updated_config)
            .await?;

        self.lifecycle_delete(resource_type, updated_state.clone())
            .await?;

        Ok(updated_state)
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Vec<Diagnostic>),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    write!(f, "  [{:?}] {}", diag.severity, diag.summary)?;
                    if let Some(detail) = &diag.detail {
                        write!(f, ": {}", detail)?;
                    }
                    if let Some(attr) = &diag.attribute {
                        write!(f, " (at {})", attr)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            },
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// In-memory API
// =========================================================================

/// A call received by [`InMemoryOrganizationApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    /// Create, with the requested name.
    Create(String),
    /// Get, with the organization ID.
    Get(String),
    /// Update, with the organization ID.
    Update(String),
    /// Delete, with the organization ID.
    Delete(String),
}

#[derive(Debug, Default)]
struct Store {
    organizations: HashMap<String, Organization>,
    calls: Vec<ApiCall>,
    failures: Vec<Operation>,
    clock: i64,
}

impl Store {
    fn tick(&mut self) -> i64 {
        self.clock += 1;
        self.clock
    }

    fn take_failure(&mut self, operation: Operation) -> Result<(), RemoteError> {
        match self.failures.iter().position(|op| *op == operation) {
            Some(index) => {
                self.failures.remove(index);
                Err(RemoteError::new(
                    operation,
                    ClientError::Api {
                        status: 500,
                        message: "injected failure".to_string(),
                    },
                ))
            },
            None => Ok(()),
        }
    }

    fn slug_taken(&self, slug: &str, except: Option<&str>) -> bool {
        self.organizations
            .values()
            .any(|org| org.slug == slug && Some(org.id.as_str()) != except)
    }

    fn find(&mut self, operation: Operation, id: &str) -> Result<&mut Organization, RemoteError> {
        self.organizations
            .get_mut(id)
            .ok_or_else(|| not_found(operation, id))
    }
}

fn not_found(operation: Operation, id: &str) -> RemoteError {
    RemoteError::new(
        operation,
        ClientError::NotFound(format!("organization {} not found", id)),
    )
}

fn slug_conflict(operation: Operation, slug: &str) -> RemoteError {
    RemoteError::new(
        operation,
        ClientError::Api {
            status: 422,
            message: format!("That slug is taken. Please try another. (form_identifier_exists: {})", slug),
        },
    )
}

fn empty_document() -> Value {
    Value::Object(Map::new())
}

/// Lowercase `name`, collapsing every run of other characters into one dash.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// An [`OrganizationApi`] backed by a map, behaving like the Clerk API.
///
/// Unset fields come back the way the real API returns them: a limit of 0
/// and `{}` metadata.
#[derive(Debug, Default)]
pub struct InMemoryOrganizationApi {
    store: Mutex<Store>,
}

impl InMemoryOrganizationApi {
    /// Create an empty API.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call received so far, in order.
    pub async fn calls(&self) -> Vec<ApiCall> {
        self.store.lock().await.calls.clone()
    }

    /// Forget recorded calls.
    pub async fn clear_calls(&self) {
        self.store.lock().await.calls.clear();
    }

    /// Make the next call of kind `operation` fail with a server error.
    pub async fn fail_next(&self, operation: Operation) {
        self.store.lock().await.failures.push(operation);
    }

    /// Store `org` as if it had been created out of band.
    pub async fn insert(&self, org: Organization) {
        self.store
            .lock()
            .await
            .organizations
            .insert(org.id.clone(), org);
    }

    /// Number of stored organizations.
    pub async fn len(&self) -> usize {
        self.store.lock().await.organizations.len()
    }

    /// Returns true if no organizations are stored.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl OrganizationApi for InMemoryOrganizationApi {
    async fn create(
        &self,
        params: &CreateOrganizationParams,
    ) -> Result<Organization, RemoteError> {
        let mut store = self.store.lock().await;
        store.calls.push(ApiCall::Create(params.name.clone()));
        store.take_failure(Operation::Create)?;

        let slug = params.slug.clone().unwrap_or_else(|| slugify(&params.name));
        if store.slug_taken(&slug, None) {
            return Err(slug_conflict(Operation::Create, &slug));
        }

        let now = store.tick();
        let org = Organization {
            id: format!("org_{:08}", now),
            name: params.name.clone(),
            slug,
            max_allowed_memberships: Some(params.max_allowed_memberships.unwrap_or(0)),
            public_metadata: Some(params.public_metadata.clone().unwrap_or_else(empty_document)),
            private_metadata: Some(
                params
                    .private_metadata
                    .clone()
                    .unwrap_or_else(empty_document),
            ),
            created_by: params.created_by.clone(),
            created_at: now,
            updated_at: now,
        };
        store.organizations.insert(org.id.clone(), org.clone());
        Ok(org)
    }

    async fn get(&self, id: &str) -> Result<Organization, RemoteError> {
        let mut store = self.store.lock().await;
        store.calls.push(ApiCall::Get(id.to_string()));
        store.take_failure(Operation::Get)?;

        store
            .organizations
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(Operation::Get, id))
    }

    async fn update(
        &self,
        id: &str,
        params: &UpdateOrganizationParams,
    ) -> Result<Organization, RemoteError> {
        let mut store = self.store.lock().await;
        store.calls.push(ApiCall::Update(id.to_string()));
        store.take_failure(Operation::Update)?;

        store.find(Operation::Update, id)?;
        if let Some(slug) = &params.slug {
            if store.slug_taken(slug, Some(id)) {
                return Err(slug_conflict(Operation::Update, slug));
            }
        }

        let now = store.tick();
        let org = store.find(Operation::Update, id)?;
        if let Some(name) = &params.name {
            org.name = name.clone();
        }
        if let Some(slug) = &params.slug {
            org.slug = slug.clone();
        }
        if let Some(max) = params.max_allowed_memberships {
            org.max_allowed_memberships = Some(max);
        }
        if let Some(metadata) = &params.public_metadata {
            org.public_metadata = Some(metadata.clone());
        }
        if let Some(metadata) = &params.private_metadata {
            org.private_metadata = Some(metadata.clone());
        }
        org.updated_at = now;
        Ok(org.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), RemoteError> {
        let mut store = self.store.lock().await;
        store.calls.push(ApiCall::Delete(id.to_string()));
        store.take_failure(Operation::Delete)?;

        store
            .organizations
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found(Operation::Delete, id))
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a plan result indicates the resource will be created.
///
/// # Panics
///
/// Panics if the plan has no changes or requires replacement.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(
        !plan.changes.is_empty(),
        "Expected plan to have changes for create, but got no changes"
    );
    assert!(
        !plan.requires_replace,
        "Expected plan to create, not replace"
    );
}

/// Assert that a plan result indicates no changes.
///
/// # Panics
///
/// Panics if the plan has any changes.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "Expected no changes, but got {} change(s): {:?}",
        plan.changes.len(),
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan requires resource replacement.
///
/// # Panics
///
/// Panics if the plan does not require replacement.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "Expected plan to require replacement, but it does not"
    );
}

/// Assert that a plan does not require resource replacement.
///
/// # Panics
///
/// Panics if the plan requires replacement.
pub fn assert_plan_updates_in_place(plan: &PlanResult) {
    assert!(
        !plan.requires_replace,
        "Expected plan to update in place, but it requires replacement"
    );
}

/// Assert that a plan has a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan does not have a change for the given path.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.changes_attribute(path),
        "Expected plan to change attribute '{}', but it was not changed. Changed attributes: {:?}",
        path,
        plan.changes.iter().map(|c| &c.path).collect::<Vec<_>>()
    );
}

/// Assert that a plan does not have a change for a specific attribute path.
///
/// # Panics
///
/// Panics if the plan has a change for the given path.
pub fn assert_plan_does_not_change_attribute(plan: &PlanResult, path: &str) {
    assert!(
        !plan.changes_attribute(path),
        "Expected plan to not change attribute '{}', but it was changed",
        path
    );
}

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics
        .iter()
        .any(|d| d.is_error() && d.summary.contains(substring));

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ClerkProvider;
    use crate::schema::ORGANIZATION_RESOURCE;
    use crate::value::UNKNOWN_VALUE;
    use serde_json::json;
    use std::sync::Arc;

    fn tester() -> (Arc<InMemoryOrganizationApi>, ProviderTester<ClerkProvider>) {
        let api = Arc::new(InMemoryOrganizationApi::new());
        let tester = ProviderTester::new(ClerkProvider::with_api(api.clone()));
        (api, tester)
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Minimal Org"), "minimal-org");
        assert_eq!(slugify("  Acme, Inc.  "), "acme-inc");
        assert_eq!(slugify("R&D -- Team 7"), "r-d-team-7");
        assert_eq!(slugify("!!!"), "");
    }

    #[tokio::test]
    async fn test_in_memory_api_defaults_and_not_found() {
        let api = InMemoryOrganizationApi::new();
        let org = api
            .create(&CreateOrganizationParams {
                name: "Acme".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(org.id.starts_with("org_"));
        assert_eq!(org.slug, "acme");
        assert_eq!(org.max_allowed_memberships, Some(0));
        assert_eq!(org.public_metadata, Some(json!({})));
        assert_eq!(api.len().await, 1);

        api.delete(&org.id).await.unwrap();
        assert!(api.is_empty().await);

        let err = api.get(&org.id).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            format!(
                "failed to get organization: not found: organization {} not found",
                org.id
            )
        );
    }

    #[tokio::test]
    async fn test_in_memory_api_rejects_duplicate_slug() {
        let api = InMemoryOrganizationApi::new();
        let params = CreateOrganizationParams {
            name: "Acme".to_string(),
            ..Default::default()
        };
        api.create(&params).await.unwrap();

        let err = api.create(&params).await.unwrap_err();
        assert!(matches!(err.source, ClientError::Api { status: 422, .. }));
    }

    #[tokio::test]
    async fn test_fail_next_applies_once() {
        let api = InMemoryOrganizationApi::new();
        api.fail_next(Operation::Get).await;

        let err = api.get("org_1").await.unwrap_err();
        assert!(matches!(err.source, ClientError::Api { status: 500, .. }));
        assert!(api.get("org_1").await.unwrap_err().is_not_found());
        assert_eq!(
            api.calls().await,
            vec![
                ApiCall::Get("org_1".to_string()),
                ApiCall::Get("org_1".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_test_org_scenario() {
        let (_, tester) = tester();

        let created = tester
            .lifecycle_create(
                ORGANIZATION_RESOURCE,
                json!({"name": "Test Org", "slug": "test-org"}),
            )
            .await
            .unwrap();
        assert_eq!(created["name"], "Test Org");
        assert_eq!(created["slug"], "test-org");
        assert!(created["id"].as_str().unwrap().starts_with("org_"));
        assert_eq!(created["max_allowed_memberships"], Value::Null);

        let updated = tester
            .lifecycle_update(
                ORGANIZATION_RESOURCE,
                created.clone(),
                json!({"name": "Test Org Updated", "slug": "test-org"}),
            )
            .await
            .unwrap();
        assert_eq!(updated["id"], created["id"]);
        assert_eq!(updated["name"], "Test Org Updated");
        assert_eq!(updated["slug"], "test-org");

        tester
            .lifecycle_delete(ORGANIZATION_RESOURCE, updated.clone())
            .await
            .unwrap();

        let err = tester.read(ORGANIZATION_RESOURCE, updated).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_refresh_after_create_plans_no_changes() {
        let (_, tester) = tester();
        let config = json!({
            "name": "Metadata Org",
            "max_allowed_memberships": 10,
            "public_metadata": "{\n  \"region\": \"us-west-1\",\n  \"environment\": \"test\"\n}",
            "private_metadata": "{}"
        });

        let state = tester
            .lifecycle_create(ORGANIZATION_RESOURCE, config.clone())
            .await
            .unwrap();
        assert_eq!(state["max_allowed_memberships"], 10);
        assert_eq!(state["private_metadata"], Value::Null);

        let plan = tester
            .plan_update(ORGANIZATION_RESOURCE, state, config)
            .await
            .unwrap();
        assert_plan_no_changes(&plan);
    }

    #[tokio::test]
    async fn test_created_by_change_replaces_organization() {
        let (api, tester) = tester();
        let created = tester
            .lifecycle_create(
                ORGANIZATION_RESOURCE,
                json!({"name": "Acme", "created_by": "user_1"}),
            )
            .await
            .unwrap();

        let new_config = json!({"name": "Acme", "created_by": "user_2"});
        let plan = tester
            .plan_update(ORGANIZATION_RESOURCE, created.clone(), new_config.clone())
            .await
            .unwrap();
        assert_plan_replaces(&plan);
        assert_plan_changes_attribute(&plan, "created_by");
        assert_plan_does_not_change_attribute(&plan, "name");
        assert_eq!(plan.planned_state["id"], UNKNOWN_VALUE);

        let replaced = tester
            .lifecycle_update(ORGANIZATION_RESOURCE, created.clone(), new_config)
            .await
            .unwrap();
        assert_ne!(replaced["id"], created["id"]);
        assert_eq!(replaced["created_by"], "user_2");
        assert_eq!(api.len().await, 1);

        let err = tester.read(ORGANIZATION_RESOURCE, created).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_plan_create_and_in_place_update() {
        let (_, tester) = tester();
        let plan = tester
            .plan_create(ORGANIZATION_RESOURCE, json!({"name": "Acme"}))
            .await
            .unwrap();
        assert_plan_creates(&plan);

        let state = tester
            .create(ORGANIZATION_RESOURCE, plan.planned_state)
            .await
            .unwrap();
        let plan = tester
            .plan_update(ORGANIZATION_RESOURCE, state, json!({"name": "Acme 2"}))
            .await
            .unwrap();
        assert_plan_updates_in_place(&plan);
        assert_plan_changes_attribute(&plan, "name");
        assert_plan_does_not_change_attribute(&plan, "slug");
    }

    #[tokio::test]
    async fn test_lifecycle_crud() {
        let (api, tester) = tester();
        let final_state = tester
            .lifecycle_crud(
                ORGANIZATION_RESOURCE,
                json!({"name": "initial"}),
                json!({"name": "updated"}),
            )
            .await
            .unwrap();

        assert_eq!(final_state["name"], "updated");
        assert_eq!(final_state["slug"], "initial");
        assert!(api.is_empty().await);
    }

    #[tokio::test]
    async fn test_import_then_plan() {
        let (api, tester) = tester();
        api.insert(Organization {
            id: "org_existing".to_string(),
            name: "Existing".to_string(),
            slug: "existing".to_string(),
            max_allowed_memberships: Some(5),
            public_metadata: Some(json!({"b": 2, "a": 1})),
            private_metadata: None,
            created_by: Some("user_1".to_string()),
            created_at: 1,
            updated_at: 1,
        })
        .await;

        let imported = tester
            .import_resource(ORGANIZATION_RESOURCE, "org_existing")
            .await
            .unwrap();
        assert_eq!(imported.len(), 1);
        let state = &imported[0].state;
        assert_eq!(state["public_metadata"], r#"{"a":1,"b":2}"#);
        assert_eq!(state["max_allowed_memberships"], 5);
        assert_eq!(state["created_by"], Value::Null);

        let plan = tester
            .plan_update(
                ORGANIZATION_RESOURCE,
                state.clone(),
                json!({
                    "name": "Existing",
                    "max_allowed_memberships": 5,
                    "public_metadata": "{\"a\": 1, \"b\": 2}"
                }),
            )
            .await
            .unwrap();
        assert_plan_no_changes(&plan);
    }

    #[tokio::test]
    async fn test_zero_limit_is_stable_after_apply() {
        let (_, tester) = tester();
        let config = json!({"name": "Zero Org", "max_allowed_memberships": 0});

        let created = tester
            .lifecycle_create(ORGANIZATION_RESOURCE, config.clone())
            .await
            .unwrap();
        assert_eq!(created["max_allowed_memberships"], Value::Null);

        let plan = tester
            .plan_update(ORGANIZATION_RESOURCE, created, config)
            .await
            .unwrap();
        assert_plan_no_changes(&plan);
    }

    #[tokio::test]
    async fn test_configure_without_key_fails() {
        let tester = ProviderTester::new(ClerkProvider::new().with_env(|_| None));
        let err = tester
            .configure(json!({"api_url": "http://127.0.0.1:1/v1"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Missing API Key Configuration"));
        assert!(!tester.provider().is_configured());
    }

    #[tokio::test]
    async fn test_validate_resource_config() {
        let (_, tester) = tester();
        assert!(tester
            .validate_resource_config(ORGANIZATION_RESOURCE, json!({"name": "Acme"}))
            .await
            .is_ok());

        let err = tester
            .validate_resource_config(ORGANIZATION_RESOURCE, json!({"slug": "acme"}))
            .await
            .unwrap_err();
        match err {
            TestError::Diagnostics(diags) => assert_error_contains(&diags, "Missing required"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_tester_schema() {
        let (_, tester) = tester();
        assert!(tester.schema().resources.contains_key(ORGANIZATION_RESOURCE));
        assert_eq!(tester.resource_types(), vec![ORGANIZATION_RESOURCE.to_string()]);
        assert!(tester.provider().is_configured());
    }

    #[test]
    fn test_assert_no_errors() {
        let diagnostics = vec![Diagnostic::warning("Just a warning")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    #[should_panic(expected = "Expected no errors")]
    fn test_assert_no_errors_fails() {
        let diagnostics = vec![Diagnostic::error("An error")];
        assert_no_errors(&diagnostics);
    }

    #[test]
    fn test_test_error_display() {
        let err = TestError::Diagnostics(vec![
            Diagnostic::error("First error").with_attribute("field1"),
            Diagnostic::error("Second error").with_detail("More info"),
        ]);

        let display = format!("{}", err);
        assert!(display.contains("First error"));
        assert!(display.contains("Second error"));
        assert!(display.contains("field1"));
        assert!(display.contains("More info"));
    }
}
