//! The `oasis_audit_log` resource: event delivery for an organization.

use crate::api::Context;
use crate::diff::ChangeSet;
use crate::error::ProviderError;
use crate::platform::{AuditLog, AuditLogDestination, AuditLogHttpPost};
use crate::reconcile::ResourceKind;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, NestedBlock, Schema};
use crate::translate::{AttrMap, Flat, Plan};
use async_trait::async_trait;

/// Destination type delivering events to the Platform's own storage.
pub const DESTINATION_CLOUD: &str = "cloud";
/// Destination type posting events to an external URL.
pub const DESTINATION_HTTPS_POST: &str = "https-post";

/// Manages audit logs and their delivery destinations.
pub struct AuditLogKind;

fn expand_destinations(plan: &Plan) -> Result<Vec<AuditLogDestination>, ProviderError> {
    let destinations = plan
        .block_list("destination")?
        .into_iter()
        .map(|d| {
            let destination_type = d.required_string("type")?;
            let http_post = match d.single_block("http_post")? {
                Some(hp) => Some(AuditLogHttpPost {
                    url: hp.required_string("url")?,
                    excluded_topics: hp.string_list("excluded_topics")?,
                }),
                None => None,
            };
            if destination_type == DESTINATION_HTTPS_POST && http_post.is_none() {
                return Err(ProviderError::missing_field("destination.http_post"));
            }
            Ok(AuditLogDestination {
                destination_type,
                http_post,
            })
        })
        .collect::<Result<Vec<_>, ProviderError>>()?;
    if destinations.is_empty() {
        return Err(ProviderError::missing_field("destination"));
    }
    Ok(destinations)
}

fn flatten_destinations(destinations: &[AuditLogDestination]) -> Vec<AttrMap> {
    destinations
        .iter()
        .map(|d| {
            let flat = Flat::new().str("type", d.destination_type.clone());
            match &d.http_post {
                Some(hp) => flat
                    .single_block(
                        "http_post",
                        Flat::new()
                            .str("url", hp.url.clone())
                            .str_list("excluded_topics", &hp.excluded_topics)
                            .build(),
                    )
                    .build(),
                None => flat.build(),
            }
        })
        .collect()
}

#[async_trait]
impl ResourceKind for AuditLogKind {
    type Record = AuditLog;

    fn name(&self) -> &'static str {
        "oasis_audit_log"
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
            .with_attribute("is_default", Attribute::optional_bool())
            .with_attribute("created_at", Attribute::computed_string())
            .with_block(
                "destination",
                NestedBlock::list(
                    Block::new()
                        .with_attribute("type", Attribute::required_string())
                        .with_block(
                            "http_post",
                            NestedBlock::single(
                                Block::new()
                                    .with_attribute("url", Attribute::required_string())
                                    .with_attribute(
                                        "excluded_topics",
                                        Attribute::new(
                                            AttributeType::list(AttributeType::String),
                                            AttributeFlags::optional(),
                                        ),
                                    ),
                            ),
                        ),
                )
                .with_min_items(1),
            )
    }

    fn expand(&self, ctx: &Context, plan: &Plan) -> Result<AuditLog, ProviderError> {
        Ok(AuditLog {
            id: String::new(),
            name: plan.required_string("name")?,
            description: plan.optional_string("description"),
            organization_id: ctx.organization_id(plan)?,
            is_default: plan.optional_bool("is_default"),
            destinations: expand_destinations(plan)?,
            created_at: None,
        })
    }

    fn flatten(&self, log: &AuditLog) -> AttrMap {
        Flat::new()
            .str("id", log.id.clone())
            .str("name", log.name.clone())
            .str("description", log.description.clone())
            .str("organization", log.organization_id.clone())
            .bool("is_default", log.is_default)
            .blocks("destination", flatten_destinations(&log.destinations))
            .timestamp("created_at", log.created_at.as_ref())
            .build()
    }

    async fn remote_create(&self, ctx: &Context, record: AuditLog) -> Result<String, ProviderError> {
        Ok(ctx.api().create_audit_log(record).await?.id)
    }

    async fn remote_get(&self, ctx: &Context, id: &str) -> Result<AuditLog, ProviderError> {
        ctx.api().get_audit_log(id).await
    }

    fn apply_changes(
        &self,
        current: &mut AuditLog,
        plan: &Plan,
        changes: &ChangeSet,
    ) -> Result<(), ProviderError> {
        if changes.has("name") {
            current.name = plan.required_string("name")?;
        }
        if changes.has("description") {
            current.description = plan.optional_string("description");
        }
        if changes.has("is_default") {
            current.is_default = plan.optional_bool("is_default");
        }
        if changes.has("destination") {
            current.destinations = expand_destinations(plan)?;
        }
        Ok(())
    }

    async fn remote_update(&self, ctx: &Context, record: AuditLog) -> Result<(), ProviderError> {
        ctx.api().update_audit_log(record).await
    }

    async fn remote_delete(&self, ctx: &Context, id: &str) -> Result<(), ProviderError> {
        ctx.api().delete_audit_log(id).await
    }
}
