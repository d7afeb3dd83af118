//! The `oasis_ipallowlist` resource: CIDR ranges guarding deployments.

use crate::api::Context;
use crate::diff::ChangeSet;
use crate::error::ProviderError;
use crate::platform::IpAllowlist;
use crate::reconcile::ResourceKind;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};
use crate::translate::{AttrMap, Flat, Plan};
use async_trait::async_trait;

/// Manages IP allowlists within a project.
pub struct IpAllowlistKind;

#[async_trait]
impl ResourceKind for IpAllowlistKind {
    type Record = IpAllowlist;

    fn name(&self) -> &'static str {
        "oasis_ipallowlist"
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
                "cidr_ranges",
                Attribute::new(
                    AttributeType::list(AttributeType::String),
                    AttributeFlags::required(),
                ),
            )
            .with_attribute(
                "remote_inspection_allowed",
                Attribute::optional_bool(),
            )
            .with_attribute("locked", Attribute::optional_bool())
            .with_attribute("created_at", Attribute::computed_string())
    }

    fn expand(&self, ctx: &Context, plan: &Plan) -> Result<IpAllowlist, ProviderError> {
        let cidr_ranges = plan.string_list("cidr_ranges")?;
        if cidr_ranges.is_empty() {
            return Err(ProviderError::missing_field("cidr_ranges"));
        }
        Ok(IpAllowlist {
            id: String::new(),
            name: plan.required_string("name")?,
            description: plan.optional_string("description"),
            project_id: ctx.project_id(plan)?,
            cidr_ranges,
            created_at: None,
            remote_inspection_allowed: plan.optional_bool("remote_inspection_allowed"),
            locked: plan.optional_bool("locked"),
        })
    }

    fn flatten(&self, list: &IpAllowlist) -> AttrMap {
        Flat::new()
            .str("id", list.id.clone())
            .str("name", list.name.clone())
            .str("description", list.description.clone())
            .str("project", list.project_id.clone())
            .str_list("cidr_ranges", &list.cidr_ranges)
            .bool(
                "remote_inspection_allowed",
                list.remote_inspection_allowed,
            )
            .bool("locked", list.locked)
            .timestamp("created_at", list.created_at.as_ref())
            .build()
    }

    async fn remote_create(
        &self,
        ctx: &Context,
        record: IpAllowlist,
    ) -> Result<String, ProviderError> {
        Ok(ctx.api().create_ipallowlist(record).await?.id)
    }

    async fn remote_get(&self, ctx: &Context, id: &str) -> Result<IpAllowlist, ProviderError> {
        ctx.api().get_ipallowlist(id).await
    }

    fn apply_changes(
        &self,
        current: &mut IpAllowlist,
        plan: &Plan,
        changes: &ChangeSet,
    ) -> Result<(), ProviderError> {
        if changes.has("name") {
            current.name = plan.required_string("name")?;
        }
        if changes.has("description") {
            current.description = plan.optional_string("description");
        }
        if changes.has("cidr_ranges") {
            current.cidr_ranges = plan.string_list("cidr_ranges")?;
        }
        if changes.has("remote_inspection_allowed") {
            current.remote_inspection_allowed = plan.optional_bool("remote_inspection_allowed");
        }
        if changes.has("locked") {
            current.locked = plan.optional_bool("locked");
        }
        Ok(())
    }

    async fn remote_update(
        &self,
        ctx: &Context,
        record: IpAllowlist,
    ) -> Result<(), ProviderError> {
        ctx.api().update_ipallowlist(record).await
    }

    async fn remote_delete(&self, ctx: &Context, id: &str) -> Result<(), ProviderError> {
        ctx.api().delete_ipallowlist(id).await
    }
}
