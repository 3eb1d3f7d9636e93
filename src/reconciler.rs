//! Organization lifecycle operations.
//!
//! Each operation turns state into at most two remote calls: the mutation
//! and a confirmatory read that captures server-side defaults. A failed
//! confirmatory read is reported as [`ProviderError::ReadAfterWrite`]; the
//! mutation is not rolled back.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::client::OrganizationApi;
use crate::error::{Operation, ProviderError};
use crate::organization::OrganizationState;
use crate::value::AttrValue;

/// Drives the organization API on behalf of the lifecycle callbacks.
#[derive(Clone)]
pub struct OrganizationReconciler {
    api: Arc<dyn OrganizationApi>,
}

impl std::fmt::Debug for OrganizationReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrganizationReconciler").finish_non_exhaustive()
    }
}

impl OrganizationReconciler {
    /// Create a reconciler over the given API.
    pub fn new(api: Arc<dyn OrganizationApi>) -> Self {
        Self { api }
    }

    /// Create the organization described by `planned`.
    #[instrument(skip_all, name = "organization.create")]
    pub async fn create(
        &self,
        planned: OrganizationState,
    ) -> Result<OrganizationState, ProviderError> {
        let params = planned.create_params()?;

        let created = self
            .api
            .create(&params)
            .await
            .map_err(ProviderError::Create)?;
        info!(organization_id = %created.id, "Created organization");

        let mut state = planned;
        state.id = AttrValue::Known(created.id.clone());

        let org = self.api.get(&created.id).await.map_err(|source| {
            warn!(
                organization_id = %created.id,
                "Organization was created but could not be read back"
            );
            ProviderError::ReadAfterWrite {
                operation: Operation::Create,
                id: created.id.clone(),
                source,
            }
        })?;

        state.apply_record(&org);
        Ok(state)
    }

    /// Refresh `state` from the remote side.
    ///
    /// On failure the caller's state is left untouched.
    #[instrument(skip_all, name = "organization.read")]
    pub async fn read(&self, state: &OrganizationState) -> Result<OrganizationState, ProviderError> {
        let id = state.id()?;
        debug!(organization_id = %id, "Reading organization");

        let org = self.api.get(id).await.map_err(|source| ProviderError::Read {
            id: id.to_string(),
            source,
        })?;

        let mut refreshed = state.clone();
        refreshed.apply_record(&org);
        Ok(refreshed)
    }

    /// Apply `planned` to the organization recorded in `prior`.
    ///
    /// `created_by` cannot change in place; a plan that changes it must
    /// replace the organization instead.
    #[instrument(skip_all, name = "organization.update")]
    pub async fn update(
        &self,
        prior: &OrganizationState,
        planned: OrganizationState,
    ) -> Result<OrganizationState, ProviderError> {
        let mut state = planned;
        state.id = state.id.or_prior(&prior.id);
        if state.id.is_null() {
            state.id = prior.id.clone();
        }
        let id = state.id()?.to_string();

        if state.created_by != prior.created_by {
            return Err(ProviderError::InvalidState(format!(
                "created_by of organization {} cannot be changed in place; the organization must be replaced",
                id
            )));
        }

        let params = state.update_params()?;
        self.api
            .update(&id, &params)
            .await
            .map_err(|source| ProviderError::Update {
                id: id.clone(),
                source,
            })?;
        info!(organization_id = %id, "Updated organization");

        let org = self
            .api
            .get(&id)
            .await
            .map_err(|source| ProviderError::ReadAfterWrite {
                operation: Operation::Update,
                id: id.clone(),
                source,
            })?;

        state.apply_record(&org);
        Ok(state)
    }

    /// Delete the organization recorded in `state`.
    #[instrument(skip_all, name = "organization.delete")]
    pub async fn delete(&self, state: &OrganizationState) -> Result<(), ProviderError> {
        let id = state.id()?;
        self.api
            .delete(id)
            .await
            .map_err(|source| ProviderError::Delete {
                id: id.to_string(),
                source,
            })?;
        info!(organization_id = %id, "Deleted organization");
        Ok(())
    }

    /// Adopt an existing organization by identifier.
    #[instrument(skip(self), name = "organization.import")]
    pub async fn import(&self, id: &str) -> Result<OrganizationState, ProviderError> {
        self.read(&OrganizationState::from_import(id.trim())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::testing::{ApiCall, InMemoryOrganizationApi};
    use tokio_test::{assert_err, assert_ok};

    fn setup() -> (Arc<InMemoryOrganizationApi>, OrganizationReconciler) {
        let api = Arc::new(InMemoryOrganizationApi::new());
        let reconciler = OrganizationReconciler::new(api.clone());
        (api, reconciler)
    }

    fn config(name: &str) -> OrganizationState {
        OrganizationState {
            name: name.to_string().into(),
            slug: AttrValue::Unknown,
            max_allowed_memberships: AttrValue::Unknown,
            public_metadata: AttrValue::Unknown,
            private_metadata: AttrValue::Unknown,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_then_read_is_stable() {
        let (_, reconciler) = setup();

        let created = reconciler.create(config("Minimal Org")).await.unwrap();
        let id = created.id().unwrap().to_string();
        assert!(id.starts_with("org_"));
        assert_eq!(created.name, AttrValue::Known("Minimal Org".to_string()));

        let slug = created.slug.known().cloned().unwrap();
        assert_eq!(slug, "minimal-org");

        let first = reconciler.read(&created).await.unwrap();
        let second = reconciler.read(&first).await.unwrap();
        assert_eq!(first, created);
        assert_eq!(second, created);
    }

    #[tokio::test]
    async fn test_zero_or_missing_limit_reads_back_as_null() {
        let (_, reconciler) = setup();

        let mut zero = config("Zero");
        zero.max_allowed_memberships = AttrValue::Known(0);
        let state = reconciler.create(zero).await.unwrap();
        assert_eq!(state.max_allowed_memberships, AttrValue::Null);

        let state = reconciler.create(config("Omitted")).await.unwrap();
        assert_eq!(state.max_allowed_memberships, AttrValue::Null);
        assert_eq!(state.public_metadata, AttrValue::Null);
        assert_eq!(state.private_metadata, AttrValue::Null);
    }

    #[tokio::test]
    async fn test_metadata_roundtrip_is_semantic() {
        let (_, reconciler) = setup();

        let mut desired = config("Metadata Org");
        desired.public_metadata =
            AttrValue::Known("{\n  \"region\": \"us-west-1\",\n  \"environment\": \"test\"\n}".into());
        desired.private_metadata = AttrValue::Known(r#"{"test_id":"acc-test-123"}"#.into());

        let state = reconciler.create(desired).await.unwrap();
        let read = reconciler.read(&state).await.unwrap();

        let public: serde_json::Value =
            serde_json::from_str(read.public_metadata.known().unwrap()).unwrap();
        assert_eq!(
            public,
            serde_json::json!({"environment": "test", "region": "us-west-1"})
        );
        assert_eq!(
            read.private_metadata,
            AttrValue::Known(r#"{"test_id":"acc-test-123"}"#.to_string())
        );
    }

    #[tokio::test]
    async fn test_malformed_metadata_makes_no_remote_call() {
        let (api, reconciler) = setup();

        let mut desired = config("Bad");
        desired.public_metadata = AttrValue::Known("{not json".into());
        let err = reconciler.create(desired).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(api.calls().await.is_empty());

        let created = reconciler.create(config("Good")).await.unwrap();
        api.clear_calls().await;
        let mut planned = created.clone();
        planned.private_metadata = AttrValue::Known("[1,".into());
        let err = reconciler.update(&created, planned).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(api.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_issues_confirmatory_read() {
        let (api, reconciler) = setup();
        let state = reconciler.create(config("Acme")).await.unwrap();
        let id = state.id().unwrap().to_string();

        assert_eq!(
            api.calls().await,
            vec![ApiCall::Create("Acme".to_string()), ApiCall::Get(id)]
        );
    }

    #[tokio::test]
    async fn test_read_after_create_failure_reports_id_and_keeps_remote() {
        let (api, reconciler) = setup();
        api.fail_next(Operation::Get).await;

        let err = reconciler.create(config("Orphan")).await.unwrap_err();
        let id = match &err {
            ProviderError::ReadAfterWrite {
                operation: Operation::Create,
                id,
                ..
            } => id.clone(),
            other => panic!("unexpected error: {:?}", other),
        };
        assert!(err.to_string().contains(&id));

        // The organization was not rolled back and can be imported.
        let imported = assert_ok!(reconciler.import(&id).await);
        assert_eq!(imported.name, AttrValue::Known("Orphan".to_string()));
    }

    #[tokio::test]
    async fn test_read_failure_is_read_error() {
        let (_, reconciler) = setup();
        let err = reconciler
            .read(&OrganizationState::from_import("org_missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Read { .. }));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_read_without_id_is_invalid_state() {
        let (api, reconciler) = setup();
        let err = reconciler.read(&OrganizationState::default()).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidState(_)));
        assert!(api.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_keeps_slug_and_refreshes() {
        let (api, reconciler) = setup();

        let mut desired = config("Test Org");
        desired.slug = AttrValue::Known("test-org".into());
        let created = reconciler.create(desired).await.unwrap();
        api.clear_calls().await;

        let mut planned = created.clone();
        planned.name = AttrValue::Known("Test Org Updated".into());
        let updated = reconciler.update(&created, planned).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, AttrValue::Known("Test Org Updated".to_string()));
        assert_eq!(updated.slug, AttrValue::Known("test-org".to_string()));

        let id = created.id().unwrap().to_string();
        assert_eq!(
            api.calls().await,
            vec![ApiCall::Update(id.clone()), ApiCall::Get(id)]
        );
    }

    #[tokio::test]
    async fn test_update_failure_and_read_after_update_failure() {
        let (api, reconciler) = setup();
        let created = reconciler.create(config("Acme")).await.unwrap();

        api.fail_next(Operation::Update).await;
        let err = reconciler.update(&created, created.clone()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Update { .. }));

        api.fail_next(Operation::Get).await;
        let err = reconciler.update(&created, created.clone()).await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::ReadAfterWrite {
                operation: Operation::Update,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_update_refuses_created_by_change() {
        let (api, reconciler) = setup();
        let mut desired = config("Acme");
        desired.created_by = AttrValue::Known("user_1".into());
        let created = reconciler.create(desired).await.unwrap();
        api.clear_calls().await;

        let mut planned = created.clone();
        planned.created_by = AttrValue::Known("user_2".into());
        let err = reconciler.update(&created, planned).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidState(_)));
        assert!(api.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_update_takes_id_from_prior_when_unknown() {
        let (_, reconciler) = setup();
        let created = reconciler.create(config("Acme")).await.unwrap();

        let mut planned = created.clone();
        planned.id = AttrValue::Unknown;
        let updated = reconciler.update(&created, planned).await.unwrap();
        assert_eq!(updated.id, created.id);
    }

    #[tokio::test]
    async fn test_delete_then_everything_fails_not_found() {
        let (_, reconciler) = setup();
        let created = reconciler.create(config("Doomed")).await.unwrap();

        assert_ok!(reconciler.delete(&created).await);

        let err = reconciler.read(&created).await.unwrap_err();
        assert!(err.is_not_found());

        let err = reconciler.update(&created, created.clone()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Update { .. }));
        assert!(err.is_not_found());

        let err = assert_err!(reconciler.delete(&created).await);
        assert!(matches!(err, ProviderError::Delete { .. }));
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_remote_error_message_is_forwarded() {
        let (api, reconciler) = setup();
        api.fail_next(Operation::Create).await;

        let err = reconciler.create(config("Acme")).await.unwrap_err();
        let remote = err.remote().unwrap();
        assert!(matches!(remote.source, ClientError::Api { status: 500, .. }));
        assert!(err
            .to_string()
            .starts_with("Could not create organization: failed to create organization:"));
    }

    #[tokio::test]
    async fn test_import_trims_id() {
        let (_, reconciler) = setup();
        let created = reconciler.create(config("Acme")).await.unwrap();
        let id = created.id().unwrap();

        let imported = reconciler.import(&format!(" {} ", id)).await.unwrap();
        assert_eq!(imported.id, created.id);
        assert_eq!(imported.slug, created.slug);
        assert_eq!(imported.created_by, AttrValue::Null);
    }
}
