//! In-memory Platform used by the test suites.
//!
//! [`MockPlatform`] implements [`PlatformApi`] over per-kind hash maps with
//! a shared id counter, so reconciler and kind tests run the real state
//! machine against predictable remote behavior. Listings (node sizes,
//! certificates, terms, datasets, providers, regions) are seeded through
//! the builder methods.

use crate::api::PlatformApi;
use crate::error::ProviderError;
use crate::platform::*;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

struct Store<T> {
    items: Mutex<HashMap<String, T>>,
}

impl<T: Clone> Store<T> {
    fn new() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
        }
    }

    fn insert(&self, id: &str, item: T) {
        self.items.lock().unwrap().insert(id.to_string(), item);
    }

    fn get(&self, id: &str) -> Result<T, ProviderError> {
        self.items
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))
    }

    fn replace(&self, id: &str, item: T) -> Result<(), ProviderError> {
        let mut items = self.items.lock().unwrap();
        if !items.contains_key(id) {
            return Err(ProviderError::NotFound(id.to_string()));
        }
        items.insert(id.to_string(), item);
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<(), ProviderError> {
        self.items
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ProviderError::NotFound(id.to_string()))
    }

    fn values(&self) -> Vec<T> {
        self.items.lock().unwrap().values().cloned().collect()
    }
}

/// An in-memory stand-in for the Platform.
pub struct MockPlatform {
    counter: AtomicU64,
    organizations: Store<Organization>,
    projects: Store<Project>,
    invites: Store<OrganizationInvite>,
    deployments: Store<Deployment>,
    certificates: Store<Certificate>,
    ipallowlists: Store<IpAllowlist>,
    backups: Store<Backup>,
    backup_policies: Store<BackupPolicy>,
    groups: Store<IamGroup>,
    roles: Store<IamRole>,
    endpoint_services: Store<PrivateEndpointService>,
    installations: Store<ExampleDatasetInstallation>,
    audit_logs: Store<AuditLog>,
    terms: Mutex<Option<TermsAndConditions>>,
    default_version: Mutex<Option<Version>>,
    node_sizes: Mutex<Vec<NodeSize>>,
    datasets: Mutex<Vec<ExampleDataset>>,
    cloud_providers: Mutex<Vec<CloudProvider>>,
    regions: Mutex<Vec<Region>>,
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlatform {
    /// An empty Platform.
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
            organizations: Store::new(),
            projects: Store::new(),
            invites: Store::new(),
            deployments: Store::new(),
            certificates: Store::new(),
            ipallowlists: Store::new(),
            backups: Store::new(),
            backup_policies: Store::new(),
            groups: Store::new(),
            roles: Store::new(),
            endpoint_services: Store::new(),
            installations: Store::new(),
            audit_logs: Store::new(),
            terms: Mutex::new(None),
            default_version: Mutex::new(None),
            node_sizes: Mutex::new(Vec::new()),
            datasets: Mutex::new(Vec::new()),
            cloud_providers: Mutex::new(Vec::new()),
            regions: Mutex::new(Vec::new()),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{}", prefix, n)
    }

    /// Number of deployments the Platform currently holds.
    ///
    /// Lets tests assert that a failed create never reached the deployment
    /// endpoint.
    pub fn deployment_count(&self) -> usize {
        self.deployments.values().len()
    }

    /// Seed the current terms and conditions.
    pub fn with_terms(self, terms: TermsAndConditions) -> Self {
        *self.terms.lock().unwrap() = Some(terms);
        self
    }

    /// Seed the default database version.
    pub fn with_default_version(self, version: Version) -> Self {
        *self.default_version.lock().unwrap() = Some(version);
        self
    }

    /// Seed the node sizes every region reports.
    pub fn with_node_sizes(self, sizes: Vec<NodeSize>) -> Self {
        *self.node_sizes.lock().unwrap() = sizes;
        self
    }

    /// Seed existing certificates.
    pub fn with_certificates(self, certificates: Vec<Certificate>) -> Self {
        for cert in certificates {
            self.certificates.insert(&cert.id.clone(), cert);
        }
        self
    }

    /// Seed the installable example datasets.
    pub fn with_datasets(self, datasets: Vec<ExampleDataset>) -> Self {
        *self.datasets.lock().unwrap() = datasets;
        self
    }

    /// Seed the available cloud providers.
    pub fn with_cloud_providers(self, providers: Vec<CloudProvider>) -> Self {
        *self.cloud_providers.lock().unwrap() = providers;
        self
    }

    /// Seed the available regions.
    pub fn with_regions(self, regions: Vec<Region>) -> Self {
        *self.regions.lock().unwrap() = regions;
        self
    }

    /// Seed an existing organization.
    pub fn with_organization(self, org: Organization) -> Self {
        self.organizations.insert(&org.id.clone(), org);
        self
    }

    /// Seed an existing project.
    pub fn with_project(self, project: Project) -> Self {
        self.projects.insert(&project.id.clone(), project);
        self
    }

    /// Seed an existing backup.
    pub fn with_backup(self, backup: Backup) -> Self {
        self.backups.insert(&backup.id.clone(), backup);
        self
    }

    /// Seed an existing dataset installation.
    pub fn with_installation(self, installation: ExampleDatasetInstallation) -> Self {
        self.installations
            .insert(&installation.id.clone(), installation);
        self
    }
}

#[async_trait]
impl PlatformApi for MockPlatform {
    async fn create_organization(
        &self,
        mut org: Organization,
    ) -> Result<Organization, ProviderError> {
        org.id = self.next_id("org");
        self.organizations.insert(&org.id.clone(), org.clone());
        Ok(org)
    }

    async fn get_organization(&self, id: &str) -> Result<Organization, ProviderError> {
        self.organizations.get(id)
    }

    async fn update_organization(&self, org: Organization) -> Result<(), ProviderError> {
        self.organizations.replace(&org.id.clone(), org)
    }

    async fn delete_organization(&self, id: &str) -> Result<(), ProviderError> {
        self.organizations.remove(id)
    }

    async fn create_project(&self, mut project: Project) -> Result<Project, ProviderError> {
        project.id = self.next_id("proj");
        self.projects.insert(&project.id.clone(), project.clone());
        Ok(project)
    }

    async fn get_project(&self, id: &str) -> Result<Project, ProviderError> {
        self.projects.get(id)
    }

    async fn update_project(&self, project: Project) -> Result<(), ProviderError> {
        self.projects.replace(&project.id.clone(), project)
    }

    async fn delete_project(&self, id: &str) -> Result<(), ProviderError> {
        self.projects.remove(id)
    }

    async fn create_organization_invite(
        &self,
        mut invite: OrganizationInvite,
    ) -> Result<OrganizationInvite, ProviderError> {
        invite.id = self.next_id("invite");
        self.invites.insert(&invite.id.clone(), invite.clone());
        Ok(invite)
    }

    async fn get_organization_invite(
        &self,
        id: &str,
    ) -> Result<OrganizationInvite, ProviderError> {
        self.invites.get(id)
    }

    async fn delete_organization_invite(&self, id: &str) -> Result<(), ProviderError> {
        self.invites.remove(id)
    }

    async fn get_current_terms_and_conditions(
        &self,
        _organization_id: &str,
    ) -> Result<TermsAndConditions, ProviderError> {
        self.terms
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ProviderError::NotFound("terms and conditions".to_string()))
    }

    async fn create_deployment(&self, mut dep: Deployment) -> Result<Deployment, ProviderError> {
        dep.id = self.next_id("dep");
        self.deployments.insert(&dep.id.clone(), dep.clone());
        Ok(dep)
    }

    async fn get_deployment(&self, id: &str) -> Result<Deployment, ProviderError> {
        self.deployments.get(id)
    }

    async fn update_deployment(&self, dep: Deployment) -> Result<(), ProviderError> {
        self.deployments.replace(&dep.id.clone(), dep)
    }

    async fn delete_deployment(&self, id: &str) -> Result<(), ProviderError> {
        self.deployments.remove(id)
    }

    async fn get_default_version(&self) -> Result<Version, ProviderError> {
        self.default_version
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ProviderError::NotFound("default version".to_string()))
    }

    async fn list_node_sizes(
        &self,
        _project_id: &str,
        _region_id: &str,
    ) -> Result<Vec<NodeSize>, ProviderError> {
        Ok(self.node_sizes.lock().unwrap().clone())
    }

    async fn create_certificate(&self, mut cert: Certificate) -> Result<Certificate, ProviderError> {
        cert.id = self.next_id("cert");
        self.certificates.insert(&cert.id.clone(), cert.clone());
        Ok(cert)
    }

    async fn get_certificate(&self, id: &str) -> Result<Certificate, ProviderError> {
        self.certificates.get(id)
    }

    async fn update_certificate(&self, cert: Certificate) -> Result<(), ProviderError> {
        self.certificates.replace(&cert.id.clone(), cert)
    }

    async fn delete_certificate(&self, id: &str) -> Result<(), ProviderError> {
        self.certificates.remove(id)
    }

    async fn list_certificates(
        &self,
        project_id: &str,
    ) -> Result<Vec<Certificate>, ProviderError> {
        Ok(self
            .certificates
            .values()
            .into_iter()
            .filter(|c| c.project_id.is_empty() || c.project_id == project_id)
            .collect())
    }

    async fn create_ipallowlist(&self, mut list: IpAllowlist) -> Result<IpAllowlist, ProviderError> {
        list.id = self.next_id("allowlist");
        self.ipallowlists.insert(&list.id.clone(), list.clone());
        Ok(list)
    }

    async fn get_ipallowlist(&self, id: &str) -> Result<IpAllowlist, ProviderError> {
        self.ipallowlists.get(id)
    }

    async fn update_ipallowlist(&self, list: IpAllowlist) -> Result<(), ProviderError> {
        self.ipallowlists.replace(&list.id.clone(), list)
    }

    async fn delete_ipallowlist(&self, id: &str) -> Result<(), ProviderError> {
        self.ipallowlists.remove(id)
    }

    async fn create_backup(&self, mut backup: Backup) -> Result<Backup, ProviderError> {
        backup.id = self.next_id("backup");
        self.backups.insert(&backup.id.clone(), backup.clone());
        Ok(backup)
    }

    async fn get_backup(&self, id: &str) -> Result<Backup, ProviderError> {
        self.backups.get(id)
    }

    async fn update_backup(&self, backup: Backup) -> Result<(), ProviderError> {
        self.backups.replace(&backup.id.clone(), backup)
    }

    async fn delete_backup(&self, id: &str) -> Result<(), ProviderError> {
        self.backups.remove(id)
    }

    async fn create_backup_policy(
        &self,
        mut policy: BackupPolicy,
    ) -> Result<BackupPolicy, ProviderError> {
        policy.id = self.next_id("policy");
        self.backup_policies.insert(&policy.id.clone(), policy.clone());
        Ok(policy)
    }

    async fn get_backup_policy(&self, id: &str) -> Result<BackupPolicy, ProviderError> {
        self.backup_policies.get(id)
    }

    async fn update_backup_policy(&self, policy: BackupPolicy) -> Result<(), ProviderError> {
        self.backup_policies.replace(&policy.id.clone(), policy)
    }

    async fn delete_backup_policy(&self, id: &str) -> Result<(), ProviderError> {
        self.backup_policies.remove(id)
    }

    async fn create_group(&self, mut group: IamGroup) -> Result<IamGroup, ProviderError> {
        group.id = self.next_id("group");
        self.groups.insert(&group.id.clone(), group.clone());
        Ok(group)
    }

    async fn get_group(&self, id: &str) -> Result<IamGroup, ProviderError> {
        self.groups.get(id)
    }

    async fn update_group(&self, group: IamGroup) -> Result<(), ProviderError> {
        self.groups.replace(&group.id.clone(), group)
    }

    async fn delete_group(&self, id: &str) -> Result<(), ProviderError> {
        self.groups.remove(id)
    }

    async fn create_role(&self, mut role: IamRole) -> Result<IamRole, ProviderError> {
        role.id = self.next_id("role");
        self.roles.insert(&role.id.clone(), role.clone());
        Ok(role)
    }

    async fn get_role(&self, id: &str) -> Result<IamRole, ProviderError> {
        self.roles.get(id)
    }

    async fn update_role(&self, role: IamRole) -> Result<(), ProviderError> {
        self.roles.replace(&role.id.clone(), role)
    }

    async fn delete_role(&self, id: &str) -> Result<(), ProviderError> {
        self.roles.remove(id)
    }

    async fn create_private_endpoint_service(
        &self,
        mut service: PrivateEndpointService,
    ) -> Result<PrivateEndpointService, ProviderError> {
        service.id = self.next_id("pes");
        self.endpoint_services
            .insert(&service.id.clone(), service.clone());
        Ok(service)
    }

    async fn get_private_endpoint_service(
        &self,
        id: &str,
    ) -> Result<PrivateEndpointService, ProviderError> {
        self.endpoint_services.get(id)
    }

    async fn update_private_endpoint_service(
        &self,
        service: PrivateEndpointService,
    ) -> Result<(), ProviderError> {
        self.endpoint_services.replace(&service.id.clone(), service)
    }

    async fn delete_private_endpoint_service(&self, id: &str) -> Result<(), ProviderError> {
        self.endpoint_services.remove(id)
    }

    async fn list_example_datasets(
        &self,
        _organization_id: &str,
    ) -> Result<Vec<ExampleDataset>, ProviderError> {
        Ok(self.datasets.lock().unwrap().clone())
    }

    async fn create_example_dataset_installation(
        &self,
        mut installation: ExampleDatasetInstallation,
    ) -> Result<ExampleDatasetInstallation, ProviderError> {
        installation.id = self.next_id("install");
        installation.status = "Ready".to_string();
        self.installations
            .insert(&installation.id.clone(), installation.clone());
        Ok(installation)
    }

    async fn get_example_dataset_installation(
        &self,
        id: &str,
    ) -> Result<ExampleDatasetInstallation, ProviderError> {
        self.installations.get(id)
    }

    async fn delete_example_dataset_installation(&self, id: &str) -> Result<(), ProviderError> {
        self.installations.remove(id)
    }

    async fn list_example_dataset_installations(
        &self,
        deployment_id: &str,
    ) -> Result<Vec<ExampleDatasetInstallation>, ProviderError> {
        Ok(self
            .installations
            .values()
            .into_iter()
            .filter(|i| i.deployment_id == deployment_id)
            .collect())
    }

    async fn create_audit_log(&self, mut log: AuditLog) -> Result<AuditLog, ProviderError> {
        log.id = self.next_id("auditlog");
        self.audit_logs.insert(&log.id.clone(), log.clone());
        Ok(log)
    }

    async fn get_audit_log(&self, id: &str) -> Result<AuditLog, ProviderError> {
        self.audit_logs.get(id)
    }

    async fn update_audit_log(&self, log: AuditLog) -> Result<(), ProviderError> {
        self.audit_logs.replace(&log.id.clone(), log)
    }

    async fn delete_audit_log(&self, id: &str) -> Result<(), ProviderError> {
        self.audit_logs.remove(id)
    }

    async fn list_cloud_providers(
        &self,
        _organization_id: &str,
    ) -> Result<Vec<CloudProvider>, ProviderError> {
        Ok(self.cloud_providers.lock().unwrap().clone())
    }

    async fn list_regions(
        &self,
        _organization_id: &str,
        provider_id: &str,
    ) -> Result<Vec<Region>, ProviderError> {
        Ok(self
            .regions
            .lock()
            .unwrap()
            .iter()
            .filter(|r| provider_id.is_empty() || r.provider_id == provider_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ids_are_sequential_per_platform() {
        let platform = MockPlatform::new();
        let a = platform
            .create_project(Project::default())
            .await
            .unwrap();
        let b = platform
            .create_project(Project::default())
            .await
            .unwrap();
        assert_eq!(a.id, "proj-1");
        assert_eq!(b.id, "proj-2");
    }

    #[tokio::test]
    async fn test_get_after_delete_is_not_found() {
        let platform = MockPlatform::new();
        let dep = platform
            .create_deployment(Deployment::default())
            .await
            .unwrap();
        platform.delete_deployment(&dep.id).await.unwrap();
        let err = platform.get_deployment(&dep.id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_of_missing_record_is_not_found() {
        let platform = MockPlatform::new();
        let err = platform
            .update_certificate(Certificate {
                id: "cert-missing".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_listings_come_from_seeds() {
        let platform = MockPlatform::new().with_regions(vec![
            Region {
                id: "gcp-eu".to_string(),
                provider_id: "gcp".to_string(),
                location: "Netherlands".to_string(),
                available: true,
            },
            Region {
                id: "aws-us".to_string(),
                provider_id: "aws".to_string(),
                location: "Oregon".to_string(),
                available: true,
            },
        ]);
        let regions = platform.list_regions("org-1", "gcp").await.unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].id, "gcp-eu");
    }
}
