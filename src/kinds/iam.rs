//! IAM kinds: `oasis_iam_group` and `oasis_iam_role`.

use crate::api::Context;
use crate::diff::ChangeSet;
use crate::error::ProviderError;
use crate::platform::{IamGroup, IamRole};
use crate::reconcile::ResourceKind;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};
use crate::translate::{AttrMap, Flat, Plan};
use async_trait::async_trait;

/// Manages member groups within an organization.
pub struct IamGroupKind;

#[async_trait]
impl ResourceKind for IamGroupKind {
    type Record = IamGroup;

    fn name(&self) -> &'static str {
        "oasis_iam_group"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute(
                "organization",
                Attribute::optional_string()
                    .with_env_default("OASIS_ORGANIZATION")
                    .force_new(),
            )
            .with_attribute("created_at", Attribute::computed_string())
    }

    fn expand(&self, ctx: &Context, plan: &Plan) -> Result<IamGroup, ProviderError> {
        Ok(IamGroup {
            id: String::new(),
            name: plan.required_string("name")?,
            description: plan.optional_string("description"),
            organization_id: ctx.organization_id(plan)?,
            created_at: None,
        })
    }

    fn flatten(&self, group: &IamGroup) -> AttrMap {
        Flat::new()
            .str("id", group.id.clone())
            .str("name", group.name.clone())
            .str("description", group.description.clone())
            .str("organization", group.organization_id.clone())
            .timestamp("created_at", group.created_at.as_ref())
            .build()
    }

    async fn remote_create(&self, ctx: &Context, record: IamGroup) -> Result<String, ProviderError> {
        Ok(ctx.api().create_group(record).await?.id)
    }

    async fn remote_get(&self, ctx: &Context, id: &str) -> Result<IamGroup, ProviderError> {
        ctx.api().get_group(id).await
    }

    fn apply_changes(
        &self,
        current: &mut IamGroup,
        plan: &Plan,
        changes: &ChangeSet,
    ) -> Result<(), ProviderError> {
        if changes.has("name") {
            current.name = plan.required_string("name")?;
        }
        if changes.has("description") {
            current.description = plan.optional_string("description");
        }
        Ok(())
    }

    async fn remote_update(&self, ctx: &Context, record: IamGroup) -> Result<(), ProviderError> {
        ctx.api().update_group(record).await
    }

    async fn remote_delete(&self, ctx: &Context, id: &str) -> Result<(), ProviderError> {
        ctx.api().delete_group(id).await
    }
}

/// Manages custom roles granting permissions.
pub struct IamRoleKind;

#[async_trait]
impl ResourceKind for IamRoleKind {
    type Record = IamRole;

    fn name(&self) -> &'static str {
        "oasis_iam_role"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute(
                "organization",
                Attribute::optional_string()
                    .with_env_default("OASIS_ORGANIZATION")
                    .force_new(),
            )
            .with_attribute(
                "permissions",
                Attribute::new(
                    AttributeType::set(AttributeType::String),
                    AttributeFlags::optional(),
                ),
            )
            .with_attribute("created_at", Attribute::computed_string())
    }

    fn expand(&self, ctx: &Context, plan: &Plan) -> Result<IamRole, ProviderError> {
        Ok(IamRole {
            id: String::new(),
            name: plan.required_string("name")?,
            description: plan.optional_string("description"),
            organization_id: ctx.organization_id(plan)?,
            permissions: plan.string_list("permissions")?,
            created_at: None,
        })
    }

    fn flatten(&self, role: &IamRole) -> AttrMap {
        Flat::new()
            .str("id", role.id.clone())
            .str("name", role.name.clone())
            .str("description", role.description.clone())
            .str("organization", role.organization_id.clone())
            .str_list("permissions", &role.permissions)
            .timestamp("created_at", role.created_at.as_ref())
            .build()
    }

    async fn remote_create(&self, ctx: &Context, record: IamRole) -> Result<String, ProviderError> {
        Ok(ctx.api().create_role(record).await?.id)
    }

    async fn remote_get(&self, ctx: &Context, id: &str) -> Result<IamRole, ProviderError> {
        ctx.api().get_role(id).await
    }

    fn apply_changes(
        &self,
        current: &mut IamRole,
        plan: &Plan,
        changes: &ChangeSet,
    ) -> Result<(), ProviderError> {
        if changes.has("name") {
            current.name = plan.required_string("name")?;
        }
        if changes.has("description") {
            current.description = plan.optional_string("description");
        }
        if changes.has("permissions") {
            current.permissions = plan.string_list("permissions")?;
        }
        Ok(())
    }

    async fn remote_update(&self, ctx: &Context, record: IamRole) -> Result<(), ProviderError> {
        ctx.api().update_role(record).await
    }

    async fn remote_delete(&self, ctx: &Context, id: &str) -> Result<(), ProviderError> {
        ctx.api().delete_role(id).await
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
        Context::new(Arc::new(MockPlatform::new()), "org-1", "")
    }

    fn plan(v: serde_json::Value) -> Plan {
        Plan::new(v).unwrap()
    }

    #[tokio::test]
    async fn test_role_permissions_update_in_place() {
        let reconciler = Reconciler::new(IamRoleKind);
        let ctx = ctx();

        let created = reconciler
            .create(
                &ctx,
                &plan(json!({"name": "auditors", "permissions": ["backup.list"]})),
            )
            .await
            .unwrap();

        let updated = reconciler
            .update(
                &ctx,
                &created,
                &plan(json!({
                    "name": "auditors",
                    "permissions": ["backup.list", "deployment.get"],
                })),
            )
            .await
            .unwrap();
        assert_eq!(
            updated.get("permissions"),
            Some(&json!(["backup.list", "deployment.get"]))
        );
        assert_eq!(updated.id, created.id);
    }

    #[tokio::test]
    async fn test_group_organization_change_forces_replacement() {
        let reconciler = Reconciler::new(IamGroupKind);
        let ctx = ctx();

        let created = reconciler
            .create(&ctx, &plan(json!({"name": "devs", "organization": "org-1"})))
            .await
            .unwrap();
        let result = reconciler
            .plan(
                Some(&created),
                &plan(json!({"name": "devs", "organization": "org-2"})),
            )
            .unwrap();
        assert!(result.requires_replace);
    }
}
