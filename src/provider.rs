//! The provider registry: every resource and data-source kind under one
//! dispatch surface.
//!
//! Handlers address kinds by their registered names, for example
//! `oasis_deployment`. Unknown names are reported as such rather than
//! panicking, since the Host may be newer or older than this build.

use crate::api::Context;
use crate::diff::PlanResult;
use crate::error::ProviderError;
use crate::kinds::audit_log::AuditLogKind;
use crate::kinds::backup::{BackupDataSource, BackupKind};
use crate::kinds::backup_policy::BackupPolicyKind;
use crate::kinds::certificate::CertificateKind;
use crate::kinds::deployment::DeploymentKind;
use crate::kinds::example::{
    ExampleDatasetInstallationKind, ExampleDatasetInstallationsDataSource,
    ExampleDatasetsDataSource,
};
use crate::kinds::iam::{IamGroupKind, IamRoleKind};
use crate::kinds::ipallowlist::IpAllowlistKind;
use crate::kinds::organization::{
    OrganizationDataSource, OrganizationInviteKind, OrganizationKind, TermsAndConditionsDataSource,
};
use crate::kinds::platform_ds::{CloudProviderDataSource, RegionDataSource};
use crate::kinds::private_endpoint::PrivateEndpointKind;
use crate::kinds::project::{ProjectDataSource, ProjectKind};
use crate::reconcile::{DataSource, Lifecycle, Reconciler};
use crate::schema::{Attribute, Diagnostic, ProviderSchema, Schema};
use crate::translate::{Plan, StateView};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// The provider: a registry of resource and data-source kinds keyed by name.
pub struct OasisProvider {
    resources: HashMap<&'static str, Box<dyn Lifecycle>>,
    data_sources: HashMap<&'static str, Box<dyn DataSource>>,
}

impl OasisProvider {
    /// Build the registry with every supported kind.
    pub fn new() -> Self {
        let mut provider = Self {
            resources: HashMap::new(),
            data_sources: HashMap::new(),
        };

        provider.register(Reconciler::new(OrganizationKind));
        provider.register(Reconciler::new(OrganizationInviteKind));
        provider.register(Reconciler::new(ProjectKind));
        provider.register(Reconciler::new(DeploymentKind));
        provider.register(Reconciler::new(CertificateKind));
        provider.register(Reconciler::new(IpAllowlistKind));
        provider.register(Reconciler::new(BackupKind));
        provider.register(Reconciler::new(BackupPolicyKind));
        provider.register(Reconciler::new(IamGroupKind));
        provider.register(Reconciler::new(IamRoleKind));
        provider.register(Reconciler::new(AuditLogKind));
        provider.register(Reconciler::new(PrivateEndpointKind));
        provider.register(Reconciler::new(ExampleDatasetInstallationKind));

        provider.register_data_source(OrganizationDataSource);
        provider.register_data_source(TermsAndConditionsDataSource);
        provider.register_data_source(ProjectDataSource);
        provider.register_data_source(BackupDataSource);
        provider.register_data_source(ExampleDatasetsDataSource);
        provider.register_data_source(ExampleDatasetInstallationsDataSource);
        provider.register_data_source(CloudProviderDataSource);
        provider.register_data_source(RegionDataSource);

        provider
    }

    fn register(&mut self, lifecycle: impl Lifecycle + 'static) {
        self.resources.insert(lifecycle.name(), Box::new(lifecycle));
    }

    fn register_data_source(&mut self, source: impl DataSource + 'static) {
        self.data_sources.insert(source.name(), Box::new(source));
    }

    /// Schema for the provider configuration block.
    pub fn config_schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "api_key_id",
                Attribute::optional_string()
                    .with_env_default("OASIS_API_KEY_ID")
                    .sensitive(),
            )
            .with_attribute(
                "api_key_secret",
                Attribute::optional_string()
                    .with_env_default("OASIS_API_KEY_SECRET")
                    .sensitive(),
            )
            .with_attribute(
                "oasis_endpoint",
                Attribute::optional_string().with_env_default("OASIS_ENDPOINT"),
            )
            .with_attribute(
                "api_port_suffix",
                Attribute::optional_string().with_env_default("OASIS_PORT_SUFFIX"),
            )
            .with_attribute(
                "organization",
                Attribute::optional_string().with_env_default("OASIS_ORGANIZATION"),
            )
            .with_attribute(
                "project",
                Attribute::optional_string().with_env_default("OASIS_PROJECT"),
            )
    }

    /// The complete provider schema: configuration plus every kind.
    pub fn schema(&self) -> ProviderSchema {
        let mut schema = ProviderSchema::new().with_provider_config(Self::config_schema());
        for (name, lifecycle) in &self.resources {
            schema = schema.with_resource(*name, lifecycle.schema());
        }
        for (name, source) in &self.data_sources {
            schema = schema.with_data_source(*name, source.schema());
        }
        schema
    }

    /// Names of all registered resource kinds, sorted.
    pub fn resource_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.resources.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Names of all registered data-source kinds, sorted.
    pub fn data_source_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.data_sources.keys().copied().collect();
        names.sort_unstable();
        names
    }

    fn resource(&self, kind: &str) -> Result<&dyn Lifecycle, ProviderError> {
        self.resources
            .get(kind)
            .map(|r| r.as_ref())
            .ok_or_else(|| ProviderError::UnknownKind(kind.to_string()))
    }

    fn data_source(&self, kind: &str) -> Result<&dyn DataSource, ProviderError> {
        self.data_sources
            .get(kind)
            .map(|s| s.as_ref())
            .ok_or_else(|| ProviderError::UnknownKind(kind.to_string()))
    }

    /// Validate a configuration tree against a resource kind's schema.
    pub fn validate(&self, kind: &str, tree: &Value) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(self.resource(kind)?.validate(tree))
    }

    /// Plan a change for a resource kind.
    pub fn plan(
        &self,
        kind: &str,
        prior: Option<&StateView>,
        proposed: &Plan,
    ) -> Result<PlanResult, ProviderError> {
        self.resource(kind)?.plan(prior, proposed)
    }

    /// Create a resource.
    pub async fn create(
        &self,
        ctx: &Context,
        kind: &str,
        plan: &Plan,
    ) -> Result<StateView, ProviderError> {
        debug!(kind, "create");
        self.resource(kind)?.create(ctx, plan).await
    }

    /// Refresh a resource from the Platform.
    pub async fn read(
        &self,
        ctx: &Context,
        kind: &str,
        prior: &StateView,
    ) -> Result<StateView, ProviderError> {
        debug!(kind, "read");
        self.resource(kind)?.read(ctx, prior).await
    }

    /// Update a resource in place.
    pub async fn update(
        &self,
        ctx: &Context,
        kind: &str,
        prior: &StateView,
        plan: &Plan,
    ) -> Result<StateView, ProviderError> {
        debug!(kind, "update");
        self.resource(kind)?.update(ctx, prior, plan).await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        ctx: &Context,
        kind: &str,
        prior: &StateView,
    ) -> Result<StateView, ProviderError> {
        debug!(kind, "delete");
        self.resource(kind)?.delete(ctx, prior).await
    }

    /// Read a data source.
    pub async fn read_data_source(
        &self,
        ctx: &Context,
        kind: &str,
        plan: &Plan,
    ) -> Result<StateView, ProviderError> {
        debug!(kind, "read data source");
        self.data_source(kind)?.read(ctx, plan).await
    }
}

impl Default for OasisProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockPlatform;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_registry_is_complete() {
        let provider = OasisProvider::new();
        assert_eq!(provider.resource_names().len(), 13);
        assert_eq!(provider.data_source_names().len(), 8);
        assert!(provider.resource_names().contains(&"oasis_deployment"));
        assert!(provider.data_source_names().contains(&"oasis_region"));
    }

    #[test]
    fn test_schema_covers_every_kind() {
        let provider = OasisProvider::new();
        let schema = provider.schema();
        assert_eq!(schema.resources.len(), 13);
        assert_eq!(schema.data_sources.len(), 8);
        assert!(schema.provider.attribute("api_key_id").is_some());
    }

    #[test]
    fn test_unknown_kind_is_reported() {
        let provider = OasisProvider::new();
        let err = provider
            .plan("oasis_nonexistent", None, &Plan::new(json!({})).unwrap())
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownKind(_)));
    }

    #[tokio::test]
    async fn test_dispatch_by_name() {
        let provider = OasisProvider::new();
        let ctx = Context::new(Arc::new(MockPlatform::new()), "org-1", "proj-1");

        let created = provider
            .create(
                &ctx,
                "oasis_project",
                &Plan::new(json!({"name": "proj"})).unwrap(),
            )
            .await
            .unwrap();
        assert!(!created.id.is_empty());

        let refreshed = provider
            .read(&ctx, "oasis_project", &created)
            .await
            .unwrap();
        assert_eq!(refreshed.get("name"), Some(&json!("proj")));
    }

    #[test]
    fn test_validate_routes_to_kind_schema() {
        let provider = OasisProvider::new();
        let diags = provider
            .validate("oasis_ipallowlist", &json!({"name": "allow"}))
            .unwrap();
        assert!(!diags.is_empty());
    }
}
