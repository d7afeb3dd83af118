//! The `oasis_certificate` resource: CA certificates within a project.

use crate::api::Context;
use crate::diff::ChangeSet;
use crate::error::ProviderError;
use crate::platform::Certificate;
use crate::reconcile::ResourceKind;
use crate::schema::{Attribute, DiffSuppress, Schema};
use crate::translate::{
    duration_from_seconds, seconds_from_duration, AttrMap, Flat, Plan,
};
use async_trait::async_trait;

/// Manages CA certificates. Lifetimes are expressed in seconds.
pub struct CertificateKind;

#[async_trait]
impl ResourceKind for CertificateKind {
    type Record = Certificate;

    fn name(&self) -> &'static str {
        "oasis_certificate"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute(
                "project",
                Attribute::optional_string()
                    .with_env_default("OASIS_PROJECT")
                    .force_new(),
            )
            .with_attribute(
                "lifetime",
                Attribute::optional_int64().with_diff_suppress(DiffSuppress::ZeroSentinel),
            )
            .with_attribute(
                "use_well_known_certificate",
                Attribute::optional_bool(),
            )
            .with_attribute("is_default", Attribute::computed_bool())
            .with_attribute("expires_at", Attribute::computed_string())
            .with_attribute("created_at", Attribute::computed_string())
    }

    fn expand(&self, ctx: &Context, plan: &Plan) -> Result<Certificate, ProviderError> {
        Ok(Certificate {
            id: String::new(),
            name: plan.required_string("name")?,
            description: plan.optional_string("description"),
            project_id: ctx.project_id(plan)?,
            lifetime: duration_from_seconds(plan.optional_i64("lifetime")),
            is_default: false,
            use_well_known_certificate: plan.optional_bool("use_well_known_certificate"),
            expires_at: None,
            created_at: None,
        })
    }

    fn flatten(&self, cert: &Certificate) -> AttrMap {
        Flat::new()
            .str("id", cert.id.clone())
            .str("name", cert.name.clone())
            .str("description", cert.description.clone())
            .str("project", cert.project_id.clone())
            .i64("lifetime", seconds_from_duration(cert.lifetime.as_ref()))
            .bool(
                "use_well_known_certificate",
                cert.use_well_known_certificate,
            )
            .bool("is_default", cert.is_default)
            .timestamp("expires_at", cert.expires_at.as_ref())
            .timestamp("created_at", cert.created_at.as_ref())
            .build()
    }

    async fn remote_create(
        &self,
        ctx: &Context,
        record: Certificate,
    ) -> Result<String, ProviderError> {
        Ok(ctx.api().create_certificate(record).await?.id)
    }

    async fn remote_get(&self, ctx: &Context, id: &str) -> Result<Certificate, ProviderError> {
        ctx.api().get_certificate(id).await
    }

    fn apply_changes(
        &self,
        current: &mut Certificate,
        plan: &Plan,
        changes: &ChangeSet,
    ) -> Result<(), ProviderError> {
        if changes.has("name") {
            current.name = plan.required_string("name")?;
        }
        if changes.has("description") {
            current.description = plan.optional_string("description");
        }
        if changes.has("lifetime") {
            current.lifetime = duration_from_seconds(plan.optional_i64("lifetime"));
        }
        if changes.has("use_well_known_certificate") {
            current.use_well_known_certificate = plan.optional_bool("use_well_known_certificate");
        }
        Ok(())
    }

    async fn remote_update(
        &self,
        ctx: &Context,
        record: Certificate,
    ) -> Result<(), ProviderError> {
        ctx.api().update_certificate(record).await
    }

    async fn remote_delete(&self, ctx: &Context, id: &str) -> Result<(), ProviderError> {
        ctx.api().delete_certificate(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{Lifecycle, Reconciler};
    use crate::testing::MockPlatform;
    use serde_json::json;
    use std::sync::Arc;

    fn ctx() -> Context {
        Context::new(Arc::new(MockPlatform::new()), "org-1", "proj-1")
    }

    fn plan(v: serde_json::Value) -> Plan {
        Plan::new(v).unwrap()
    }

    #[tokio::test]
    async fn test_lifetime_round_trips_in_seconds() {
        let reconciler = Reconciler::new(CertificateKind);
        let ctx = ctx();

        let created = reconciler
            .create(&ctx, &plan(json!({"name": "ca", "lifetime": 31536000})))
            .await
            .unwrap();
        assert_eq!(created.get("lifetime"), Some(&json!(31536000)));
    }

    #[tokio::test]
    async fn test_unset_lifetime_expands_to_no_duration() {
        let cert = CertificateKind
            .expand(&ctx(), &plan(json!({"name": "ca"})))
            .unwrap();
        assert_eq!(cert.lifetime, None);
    }

    #[tokio::test]
    async fn test_unset_lifetime_never_diffs() {
        let reconciler = Reconciler::new(CertificateKind);
        let ctx = ctx();

        let created = reconciler
            .create(&ctx, &plan(json!({"name": "ca"})))
            .await
            .unwrap();
        // The server reports lifetime 0; the plan still omits it.
        let result = reconciler
            .plan(Some(&created), &plan(json!({"name": "ca"})))
            .unwrap();
        assert!(result.changes.is_empty());
    }
}
