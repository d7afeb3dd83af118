//! Server-side default resolution for deployments.
//!
//! A deployment plan may leave version, certificate, and sizing unset; the
//! Platform requires them on create. Resolution happens once, before the
//! create call, by querying the Platform's listings. Every choice here is
//! deterministic: given the same listings, the same plan resolves to the
//! same record.

use crate::api::Context;
use crate::error::ProviderError;
use crate::platform::{Certificate, Deployment, DeploymentModel, NodeSize};
use crate::translate::Plan;
use tracing::debug;

/// The oneshard deployment model, the default.
pub const MODEL_ONESHARD: &str = "oneshard";
/// The single-node developer model.
pub const MODEL_DEVELOPER: &str = "developer";
/// The flexible model, which carries its own sizing.
pub const MODEL_FLEXIBLE: &str = "flexible";
/// Node count used when the plan leaves it unset (developer model gets 1).
pub const DEFAULT_NODE_COUNT: i32 = 3;

/// Fill every Platform-required field the plan left unset.
///
/// Terms acceptance is checked first: creating a deployment binds the
/// organization to the current terms and conditions, so an absent or false
/// acceptance flag is a hard error, never a silent default.
pub async fn resolve_deployment_defaults(
    ctx: &Context,
    dep: &mut Deployment,
    plan: &Plan,
) -> Result<(), ProviderError> {
    match plan.bool_tri_state("terms_and_conditions_accepted") {
        Some(true) => {
            let organization = ctx.organization_id(plan)?;
            let terms = ctx
                .api()
                .get_current_terms_and_conditions(&organization)
                .await?;
            dep.accepted_terms_and_conditions_id = terms.id;
        }
        Some(false) | None => {
            return Err(ProviderError::PreconditionMissing(
                "terms_and_conditions_accepted must be set to true to create a deployment"
                    .to_string(),
            ));
        }
    }

    if dep.version.is_empty() {
        let version = ctx.api().get_default_version().await?;
        debug!(version = %version.version, "using default database version");
        dep.version = version.version;
    }

    if dep.ca_certificate_id.is_empty() {
        let certificate = default_certificate(ctx, &dep.project_id).await?;
        debug!(certificate = %certificate.id, "using project default certificate");
        dep.ca_certificate_id = certificate.id;
    }

    let model = dep.model.get_or_insert_with(DeploymentModel::default);
    if model.model.is_empty() {
        model.model = MODEL_ONESHARD.to_string();
    }
    if model.node_count == 0 {
        model.node_count = if model.model == MODEL_DEVELOPER {
            1
        } else {
            DEFAULT_NODE_COUNT
        };
    }

    if model.model == MODEL_FLEXIBLE {
        // The flexible model sizes itself; a node size would be rejected,
        // but the disk size must come from the plan.
        if model.node_disk_size == 0 {
            return Err(ProviderError::PreconditionMissing(
                "node_disk_size is required for the flexible deployment model".to_string(),
            ));
        }
        return Ok(());
    }

    if model.node_size_id.is_empty() {
        let size = default_node_size(ctx, &dep.project_id, &dep.region_id).await?;
        debug!(node_size = %size.id, "using smallest available node size");
        if model.node_disk_size == 0 {
            model.node_disk_size = size.min_disk_size;
        }
        model.node_size_id = size.id;
    } else if model.node_disk_size == 0 {
        let sizes = ctx
            .api()
            .list_node_sizes(&dep.project_id, &dep.region_id)
            .await?;
        let chosen = sizes
            .into_iter()
            .find(|s| s.id == model.node_size_id)
            .ok_or_else(|| {
                ProviderError::PreconditionMissing(format!(
                    "node size {} is not available in region {}",
                    model.node_size_id, dep.region_id
                ))
            })?;
        model.node_disk_size = chosen.min_disk_size;
    }

    Ok(())
}

/// The project's default CA certificate.
///
/// Picks the certificate flagged as default; a project with exactly one
/// certificate uses that one. Anything else cannot be resolved without the
/// user choosing.
pub async fn default_certificate(
    ctx: &Context,
    project_id: &str,
) -> Result<Certificate, ProviderError> {
    let mut certificates = ctx.api().list_certificates(project_id).await?;
    if let Some(pos) = certificates.iter().position(|c| c.is_default) {
        return Ok(certificates.swap_remove(pos));
    }
    if certificates.len() == 1 {
        return Ok(certificates.remove(0));
    }
    Err(ProviderError::PreconditionMissing(format!(
        "project {} has no default certificate; set ca_certificate_id explicitly",
        project_id
    )))
}

/// The smallest node size available to a project in a region.
///
/// Listings carry no order guarantee, so the candidates are sorted by
/// memory and then by id before picking.
pub async fn default_node_size(
    ctx: &Context,
    project_id: &str,
    region_id: &str,
) -> Result<NodeSize, ProviderError> {
    let mut sizes = ctx.api().list_node_sizes(project_id, region_id).await?;
    sizes.sort_by(|a, b| (a.memory_size, &a.id).cmp(&(b.memory_size, &b.id)));
    sizes.into_iter().next().ok_or_else(|| {
        ProviderError::PreconditionMissing(format!(
            "no node sizes available to project {} in region {}",
            project_id, region_id
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{TermsAndConditions, Version};
    use crate::testing::MockPlatform;
    use serde_json::json;
    use std::sync::Arc;

    fn node_size(id: &str, memory: i32, min_disk: i32) -> NodeSize {
        NodeSize {
            id: id.to_string(),
            name: id.to_string(),
            memory_size: memory,
            min_disk_size: min_disk,
            max_disk_size: min_disk * 10,
        }
    }

    fn certificate(id: &str, is_default: bool) -> Certificate {
        Certificate {
            id: id.to_string(),
            name: id.to_string(),
            project_id: "proj-1".to_string(),
            is_default,
            ..Default::default()
        }
    }

    fn platform() -> MockPlatform {
        MockPlatform::new()
            .with_default_version(Version {
                version: "3.11".to_string(),
                is_default: true,
            })
            .with_terms(TermsAndConditions {
                id: "tc-7".to_string(),
                content: "terms".to_string(),
                created_at: None,
            })
    }

    fn ctx(platform: MockPlatform) -> Context {
        Context::new(Arc::new(platform), "org-1", "proj-1")
    }

    fn accepted_plan() -> Plan {
        Plan::new(json!({"terms_and_conditions_accepted": true})).unwrap()
    }

    fn bare_deployment() -> Deployment {
        Deployment {
            project_id: "proj-1".to_string(),
            region_id: "gcp-europe-west4".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_resolves_version_certificate_and_sizing() {
        let platform = platform()
            .with_certificates(vec![certificate("cert-def", true), certificate("cert-b", false)])
            .with_node_sizes(vec![
                node_size("c4-a8", 8, 20),
                node_size("c4-a4", 4, 10),
            ]);
        let ctx = ctx(platform);

        let mut dep = bare_deployment();
        resolve_deployment_defaults(&ctx, &mut dep, &accepted_plan())
            .await
            .unwrap();

        assert_eq!(dep.version, "3.11");
        assert_eq!(dep.ca_certificate_id, "cert-def");
        assert_eq!(dep.accepted_terms_and_conditions_id, "tc-7");
        let model = dep.model.unwrap();
        assert_eq!(model.model, MODEL_ONESHARD);
        assert_eq!(model.node_count, DEFAULT_NODE_COUNT);
        assert_eq!(model.node_size_id, "c4-a4");
        assert_eq!(model.node_disk_size, 10);
    }

    #[tokio::test]
    async fn test_terms_not_accepted_is_a_hard_error() {
        let ctx = ctx(platform());
        let mut dep = bare_deployment();

        let absent = Plan::new(json!({})).unwrap();
        let err = resolve_deployment_defaults(&ctx, &mut dep, &absent)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::PreconditionMissing(_)));

        let declined = Plan::new(json!({"terms_and_conditions_accepted": false})).unwrap();
        let err = resolve_deployment_defaults(&ctx, &mut dep, &declined)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::PreconditionMissing(_)));
    }

    #[tokio::test]
    async fn test_empty_certificate_listing_blocks_create() {
        use crate::kinds::deployment::DeploymentKind;
        use crate::reconcile::{Lifecycle, Reconciler};

        // Version and terms are seeded; the certificate listing is empty.
        let platform = Arc::new(platform());
        let ctx = Context::new(platform.clone(), "org-1", "proj-1");
        let reconciler = Reconciler::new(DeploymentKind);

        let err = reconciler
            .create(
                &ctx,
                &Plan::new(json!({
                    "name": "mydb",
                    "location": [{"region": "gcp-europe-west4"}],
                    "terms_and_conditions_accepted": true,
                }))
                .unwrap(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::PreconditionMissing(_)));
        // Resolution failed before any create request went out.
        assert_eq!(platform.deployment_count(), 0);
    }

    #[tokio::test]
    async fn test_sole_certificate_without_default_flag_is_used() {
        let platform = platform()
            .with_certificates(vec![certificate("cert-only", false)])
            .with_node_sizes(vec![node_size("c4-a4", 4, 10)]);
        let ctx = ctx(platform);

        let cert = default_certificate(&ctx, "proj-1").await.unwrap();
        assert_eq!(cert.id, "cert-only");
    }

    #[tokio::test]
    async fn test_ambiguous_certificates_fail() {
        let platform = platform().with_certificates(vec![
            certificate("cert-a", false),
            certificate("cert-b", false),
        ]);
        let ctx = ctx(platform);

        let err = default_certificate(&ctx, "proj-1").await.unwrap_err();
        assert!(matches!(err, ProviderError::PreconditionMissing(_)));
    }

    #[tokio::test]
    async fn test_node_size_tie_breaks_on_id() {
        let platform = platform().with_node_sizes(vec![
            node_size("c4-b", 4, 10),
            node_size("c4-a", 4, 10),
            node_size("c4-c", 2, 10),
        ]);
        let ctx = ctx(platform);

        // Smallest memory wins outright.
        let size = default_node_size(&ctx, "proj-1", "r").await.unwrap();
        assert_eq!(size.id, "c4-c");

        let platform =
            platform_with(vec![node_size("c4-b", 4, 10), node_size("c4-a", 4, 10)]);
        let ctx = ctx_of(platform);
        let size = default_node_size(&ctx, "proj-1", "r").await.unwrap();
        assert_eq!(size.id, "c4-a");
    }

    fn platform_with(sizes: Vec<NodeSize>) -> MockPlatform {
        platform().with_node_sizes(sizes)
    }

    fn ctx_of(platform: MockPlatform) -> Context {
        Context::new(Arc::new(platform), "org-1", "proj-1")
    }

    #[tokio::test]
    async fn test_developer_model_defaults_to_one_node() {
        let platform = platform()
            .with_certificates(vec![certificate("cert-def", true)])
            .with_node_sizes(vec![node_size("c4-a4", 4, 10)]);
        let ctx = ctx(platform);

        let mut dep = bare_deployment();
        dep.model = Some(DeploymentModel {
            model: MODEL_DEVELOPER.to_string(),
            ..Default::default()
        });
        resolve_deployment_defaults(&ctx, &mut dep, &accepted_plan())
            .await
            .unwrap();
        assert_eq!(dep.model.unwrap().node_count, 1);
    }

    #[tokio::test]
    async fn test_flexible_model_skips_sizing_but_needs_disk() {
        let platform = platform().with_certificates(vec![certificate("cert-def", true)]);
        let ctx = ctx(platform);

        let mut dep = bare_deployment();
        dep.model = Some(DeploymentModel {
            model: MODEL_FLEXIBLE.to_string(),
            node_disk_size: 32,
            ..Default::default()
        });
        resolve_deployment_defaults(&ctx, &mut dep, &accepted_plan())
            .await
            .unwrap();
        let model = dep.model.unwrap();
        assert!(model.node_size_id.is_empty());
        assert_eq!(model.node_disk_size, 32);

        let mut missing_disk = bare_deployment();
        missing_disk.model = Some(DeploymentModel {
            model: MODEL_FLEXIBLE.to_string(),
            ..Default::default()
        });
        let platform = MockPlatform::new()
            .with_default_version(Version {
                version: "3.11".to_string(),
                is_default: true,
            })
            .with_terms(TermsAndConditions {
                id: "tc-7".to_string(),
                content: String::new(),
                created_at: None,
            })
            .with_certificates(vec![certificate("cert-def", true)]);
        let err = resolve_deployment_defaults(&ctx_of(platform), &mut missing_disk, &accepted_plan())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::PreconditionMissing(_)));
    }

    #[tokio::test]
    async fn test_explicit_node_size_gets_min_disk() {
        let platform = platform()
            .with_certificates(vec![certificate("cert-def", true)])
            .with_node_sizes(vec![node_size("c4-a4", 4, 10), node_size("c4-a8", 8, 20)]);
        let ctx = ctx(platform);

        let mut dep = bare_deployment();
        dep.model = Some(DeploymentModel {
            model: MODEL_ONESHARD.to_string(),
            node_size_id: "c4-a8".to_string(),
            ..Default::default()
        });
        resolve_deployment_defaults(&ctx, &mut dep, &accepted_plan())
            .await
            .unwrap();
        let model = dep.model.unwrap();
        assert_eq!(model.node_size_id, "c4-a8");
        assert_eq!(model.node_disk_size, 20);
    }
}
