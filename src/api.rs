//! The typed service-stub seam the core consumes.
//!
//! [`PlatformApi`] abstracts the Platform's service families behind one
//! async trait. Production code backs it with generated gRPC stubs over the
//! channel from [`crate::transport`]; tests back it with
//! [`crate::testing::MockPlatform`]. Handlers never see the wire.

use crate::error::ProviderError;
use crate::platform::*;
use crate::translate::Plan;
use async_trait::async_trait;
use std::sync::Arc;

/// Typed access to the Platform's services.
///
/// Create calls return the full created record (the Platform assigns the
/// canonical id); get calls fail with a `NotFound`-classified error when the
/// id does not exist. No method retries: transient-failure handling belongs
/// to the transport.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    // =========================================================================
    // Resource manager service
    // =========================================================================

    /// Create an organization.
    async fn create_organization(&self, org: Organization) -> Result<Organization, ProviderError>;
    /// Fetch an organization by id.
    async fn get_organization(&self, id: &str) -> Result<Organization, ProviderError>;
    /// Replace an organization's mutable fields.
    async fn update_organization(&self, org: Organization) -> Result<(), ProviderError>;
    /// Delete an organization by id.
    async fn delete_organization(&self, id: &str) -> Result<(), ProviderError>;

    /// Create a project.
    async fn create_project(&self, project: Project) -> Result<Project, ProviderError>;
    /// Fetch a project by id.
    async fn get_project(&self, id: &str) -> Result<Project, ProviderError>;
    /// Replace a project's mutable fields.
    async fn update_project(&self, project: Project) -> Result<(), ProviderError>;
    /// Delete a project by id.
    async fn delete_project(&self, id: &str) -> Result<(), ProviderError>;

    /// Invite a user into an organization.
    async fn create_organization_invite(
        &self,
        invite: OrganizationInvite,
    ) -> Result<OrganizationInvite, ProviderError>;
    /// Fetch an invite by id.
    async fn get_organization_invite(&self, id: &str)
        -> Result<OrganizationInvite, ProviderError>;
    /// Withdraw an invite.
    async fn delete_organization_invite(&self, id: &str) -> Result<(), ProviderError>;

    /// Fetch the organization's current terms and conditions.
    async fn get_current_terms_and_conditions(
        &self,
        organization_id: &str,
    ) -> Result<TermsAndConditions, ProviderError>;

    // =========================================================================
    // Data service
    // =========================================================================

    /// Create a deployment.
    async fn create_deployment(&self, dep: Deployment) -> Result<Deployment, ProviderError>;
    /// Fetch a deployment by id.
    async fn get_deployment(&self, id: &str) -> Result<Deployment, ProviderError>;
    /// Replace a deployment's mutable fields.
    async fn update_deployment(&self, dep: Deployment) -> Result<(), ProviderError>;
    /// Delete a deployment by id.
    async fn delete_deployment(&self, id: &str) -> Result<(), ProviderError>;
    /// The default database version for new deployments.
    async fn get_default_version(&self) -> Result<Version, ProviderError>;
    /// Node sizes available to a project in a region.
    async fn list_node_sizes(
        &self,
        project_id: &str,
        region_id: &str,
    ) -> Result<Vec<NodeSize>, ProviderError>;

    // =========================================================================
    // Security service
    // =========================================================================

    /// Create a CA certificate.
    async fn create_certificate(&self, cert: Certificate) -> Result<Certificate, ProviderError>;
    /// Fetch a certificate by id.
    async fn get_certificate(&self, id: &str) -> Result<Certificate, ProviderError>;
    /// Replace a certificate's mutable fields.
    async fn update_certificate(&self, cert: Certificate) -> Result<(), ProviderError>;
    /// Delete a certificate by id.
    async fn delete_certificate(&self, id: &str) -> Result<(), ProviderError>;
    /// All certificates in a project.
    async fn list_certificates(&self, project_id: &str)
        -> Result<Vec<Certificate>, ProviderError>;

    /// Create an IP allowlist.
    async fn create_ipallowlist(&self, list: IpAllowlist) -> Result<IpAllowlist, ProviderError>;
    /// Fetch an IP allowlist by id.
    async fn get_ipallowlist(&self, id: &str) -> Result<IpAllowlist, ProviderError>;
    /// Replace an IP allowlist's mutable fields.
    async fn update_ipallowlist(&self, list: IpAllowlist) -> Result<(), ProviderError>;
    /// Delete an IP allowlist by id.
    async fn delete_ipallowlist(&self, id: &str) -> Result<(), ProviderError>;

    // =========================================================================
    // Backup service
    // =========================================================================

    /// Create a backup.
    async fn create_backup(&self, backup: Backup) -> Result<Backup, ProviderError>;
    /// Fetch a backup by id.
    async fn get_backup(&self, id: &str) -> Result<Backup, ProviderError>;
    /// Replace a backup's mutable fields.
    async fn update_backup(&self, backup: Backup) -> Result<(), ProviderError>;
    /// Delete a backup by id.
    async fn delete_backup(&self, id: &str) -> Result<(), ProviderError>;

    /// Create a backup policy.
    async fn create_backup_policy(
        &self,
        policy: BackupPolicy,
    ) -> Result<BackupPolicy, ProviderError>;
    /// Fetch a backup policy by id.
    async fn get_backup_policy(&self, id: &str) -> Result<BackupPolicy, ProviderError>;
    /// Replace a backup policy's mutable fields.
    async fn update_backup_policy(&self, policy: BackupPolicy) -> Result<(), ProviderError>;
    /// Delete a backup policy by id.
    async fn delete_backup_policy(&self, id: &str) -> Result<(), ProviderError>;

    // =========================================================================
    // IAM service
    // =========================================================================

    /// Create a group.
    async fn create_group(&self, group: IamGroup) -> Result<IamGroup, ProviderError>;
    /// Fetch a group by id.
    async fn get_group(&self, id: &str) -> Result<IamGroup, ProviderError>;
    /// Replace a group's mutable fields.
    async fn update_group(&self, group: IamGroup) -> Result<(), ProviderError>;
    /// Delete a group by id.
    async fn delete_group(&self, id: &str) -> Result<(), ProviderError>;

    /// Create a role.
    async fn create_role(&self, role: IamRole) -> Result<IamRole, ProviderError>;
    /// Fetch a role by id.
    async fn get_role(&self, id: &str) -> Result<IamRole, ProviderError>;
    /// Replace a role's mutable fields.
    async fn update_role(&self, role: IamRole) -> Result<(), ProviderError>;
    /// Delete a role by id.
    async fn delete_role(&self, id: &str) -> Result<(), ProviderError>;

    // =========================================================================
    // Network service
    // =========================================================================

    /// Create a private endpoint service.
    async fn create_private_endpoint_service(
        &self,
        service: PrivateEndpointService,
    ) -> Result<PrivateEndpointService, ProviderError>;
    /// Fetch a private endpoint service by id.
    async fn get_private_endpoint_service(
        &self,
        id: &str,
    ) -> Result<PrivateEndpointService, ProviderError>;
    /// Replace a private endpoint service's mutable fields.
    async fn update_private_endpoint_service(
        &self,
        service: PrivateEndpointService,
    ) -> Result<(), ProviderError>;
    /// Delete a private endpoint service by id.
    async fn delete_private_endpoint_service(&self, id: &str) -> Result<(), ProviderError>;

    // =========================================================================
    // Example service
    // =========================================================================

    /// Datasets available to an organization.
    async fn list_example_datasets(
        &self,
        organization_id: &str,
    ) -> Result<Vec<ExampleDataset>, ProviderError>;
    /// Install a dataset into a deployment.
    async fn create_example_dataset_installation(
        &self,
        installation: ExampleDatasetInstallation,
    ) -> Result<ExampleDatasetInstallation, ProviderError>;
    /// Fetch an installation by id.
    async fn get_example_dataset_installation(
        &self,
        id: &str,
    ) -> Result<ExampleDatasetInstallation, ProviderError>;
    /// Remove an installation.
    async fn delete_example_dataset_installation(&self, id: &str) -> Result<(), ProviderError>;
    /// Installations present in a deployment.
    async fn list_example_dataset_installations(
        &self,
        deployment_id: &str,
    ) -> Result<Vec<ExampleDatasetInstallation>, ProviderError>;

    // =========================================================================
    // Audit service
    // =========================================================================

    /// Create an audit log.
    async fn create_audit_log(&self, log: AuditLog) -> Result<AuditLog, ProviderError>;
    /// Fetch an audit log by id.
    async fn get_audit_log(&self, id: &str) -> Result<AuditLog, ProviderError>;
    /// Replace an audit log's mutable fields.
    async fn update_audit_log(&self, log: AuditLog) -> Result<(), ProviderError>;
    /// Delete an audit log by id.
    async fn delete_audit_log(&self, id: &str) -> Result<(), ProviderError>;

    // =========================================================================
    // Platform service
    // =========================================================================

    /// Cloud providers available to an organization.
    async fn list_cloud_providers(
        &self,
        organization_id: &str,
    ) -> Result<Vec<CloudProvider>, ProviderError>;
    /// Regions of a provider available to an organization.
    async fn list_regions(
        &self,
        organization_id: &str,
        provider_id: &str,
    ) -> Result<Vec<Region>, ProviderError>;
}

/// Per-invocation handle passed to every handler.
///
/// Holds the Platform API and the provider-level default organization and
/// project ids. All state in here is either immutable or local to the
/// invocation; nothing is shared mutably across handlers.
#[derive(Clone)]
pub struct Context {
    api: Arc<dyn PlatformApi>,
    /// Default organization id, used when a plan omits `organization`.
    pub organization: String,
    /// Default project id, used when a plan omits `project`.
    pub project: String,
}

impl Context {
    /// Build a context over an API handle and provider-level defaults.
    pub fn new(
        api: Arc<dyn PlatformApi>,
        organization: impl Into<String>,
        project: impl Into<String>,
    ) -> Self {
        Self {
            api,
            organization: organization.into(),
            project: project.into(),
        }
    }

    /// The Platform API.
    pub fn api(&self) -> &dyn PlatformApi {
        self.api.as_ref()
    }

    /// The organization id for a plan: plan attribute, else provider default.
    pub fn organization_id(&self, plan: &Plan) -> Result<String, ProviderError> {
        let id = plan.string_or("organization", &self.organization);
        if id.is_empty() {
            return Err(ProviderError::missing_field("organization"));
        }
        Ok(id)
    }

    /// The project id for a plan: plan attribute, else provider default.
    pub fn project_id(&self, plan: &Plan) -> Result<String, ProviderError> {
        let id = plan.string_or("project", &self.project);
        if id.is_empty() {
            return Err(ProviderError::missing_field("project"));
        }
        Ok(id)
    }
}
