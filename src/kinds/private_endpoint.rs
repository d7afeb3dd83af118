//! The `oasis_private_endpoint` resource: private endpoint services.

use crate::api::Context;
use crate::diff::ChangeSet;
use crate::error::ProviderError;
use crate::platform::{AwsPrincipal, PrivateEndpointService};
use crate::reconcile::ResourceKind;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, NestedBlock, Schema};
use crate::translate::{AttrMap, Flat, Plan};
use async_trait::async_trait;

/// Manages private endpoint services fronting a deployment.
pub struct PrivateEndpointKind;

fn aws_principal_block() -> NestedBlock {
    NestedBlock::set(
        Block::new()
            .with_attribute("account_id", Attribute::required_string())
            .with_attribute(
                "user_names",
                Attribute::new(
                    AttributeType::list(AttributeType::String),
                    AttributeFlags::optional(),
                ),
            )
            .with_attribute(
                "role_names",
                Attribute::new(
                    AttributeType::list(AttributeType::String),
                    AttributeFlags::optional(),
                ),
            ),
    )
}

fn expand_principals(plan: &Plan) -> Result<Vec<AwsPrincipal>, ProviderError> {
    plan.block_set("aws_principal")?
        .into_iter()
        .map(|p| {
            Ok(AwsPrincipal {
                account_id: p.required_string("account_id")?,
                user_names: p.string_list("user_names")?,
                role_names: p.string_list("role_names")?,
            })
        })
        .collect()
}

fn flatten_principals(principals: &[AwsPrincipal]) -> Vec<AttrMap> {
    principals
        .iter()
        .map(|p| {
            Flat::new()
                .str("account_id", p.account_id.clone())
                .str_list("user_names", &p.user_names)
                .str_list("role_names", &p.role_names)
                .build()
        })
        .collect()
}

#[async_trait]
impl ResourceKind for PrivateEndpointKind {
    type Record = PrivateEndpointService;

    fn name(&self) -> &'static str {
        "oasis_private_endpoint"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute("deployment_id", Attribute::required_string().force_new())
            .with_attribute(
                "alternate_dns_names",
                Attribute::new(
                    AttributeType::list(AttributeType::String),
                    AttributeFlags::optional(),
                ),
            )
            .with_attribute("enable_private_dns", Attribute::optional_bool())
            .with_attribute("created_at", Attribute::computed_string())
            .with_block("aws_principal", aws_principal_block())
    }

    fn expand(&self, _ctx: &Context, plan: &Plan) -> Result<PrivateEndpointService, ProviderError> {
        Ok(PrivateEndpointService {
            id: String::new(),
            name: plan.required_string("name")?,
            description: plan.optional_string("description"),
            deployment_id: plan.required_string("deployment_id")?,
            alternate_dns_names: plan.string_list("alternate_dns_names")?,
            enable_private_dns: plan.optional_bool("enable_private_dns"),
            aws_principals: expand_principals(plan)?,
            created_at: None,
        })
    }

    fn flatten(&self, service: &PrivateEndpointService) -> AttrMap {
        Flat::new()
            .str("id", service.id.clone())
            .str("name", service.name.clone())
            .str("description", service.description.clone())
            .str("deployment_id", service.deployment_id.clone())
            .str_list("alternate_dns_names", &service.alternate_dns_names)
            .bool("enable_private_dns", service.enable_private_dns)
            .set_blocks(
                "aws_principal",
                &aws_principal_block().block,
                flatten_principals(&service.aws_principals),
            )
            .timestamp("created_at", service.created_at.as_ref())
            .build()
    }

    async fn remote_create(
        &self,
        ctx: &Context,
        record: PrivateEndpointService,
    ) -> Result<String, ProviderError> {
        Ok(ctx.api().create_private_endpoint_service(record).await?.id)
    }

    async fn remote_get(
        &self,
        ctx: &Context,
        id: &str,
    ) -> Result<PrivateEndpointService, ProviderError> {
        ctx.api().get_private_endpoint_service(id).await
    }

    fn apply_changes(
        &self,
        current: &mut PrivateEndpointService,
        plan: &Plan,
        changes: &ChangeSet,
    ) -> Result<(), ProviderError> {
        if changes.has("name") {
            current.name = plan.required_string("name")?;
        }
        if changes.has("description") {
            current.description = plan.optional_string("description");
        }
        if changes.has("alternate_dns_names") {
            current.alternate_dns_names = plan.string_list("alternate_dns_names")?;
        }
        if changes.has("enable_private_dns") {
            current.enable_private_dns = plan.optional_bool("enable_private_dns");
        }
        if changes.has("aws_principal") {
            current.aws_principals = expand_principals(plan)?;
        }
        Ok(())
    }

    async fn remote_update(
        &self,
        ctx: &Context,
        record: PrivateEndpointService,
    ) -> Result<(), ProviderError> {
        ctx.api().update_private_endpoint_service(record).await
    }

    async fn remote_delete(&self, ctx: &Context, id: &str) -> Result<(), ProviderError> {
        ctx.api().delete_private_endpoint_service(id).await
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
    async fn test_principals_round_trip() {
        let reconciler = Reconciler::new(PrivateEndpointKind);
        let ctx = ctx();

        let created = reconciler
            .create(
                &ctx,
                &plan(json!({
                    "name": "pe",
                    "deployment_id": "dep-1",
                    "aws_principal": [
                        {"account_id": "123456789012", "role_names": ["admin"]},
                    ],
                })),
            )
            .await
            .unwrap();
        assert_eq!(
            created.get("aws_principal").unwrap()[0]["account_id"],
            json!("123456789012")
        );
    }

    #[test]
    fn test_duplicate_principals_rejected() {
        let err = PrivateEndpointKind
            .expand(
                &ctx(),
                &plan(json!({
                    "name": "pe",
                    "deployment_id": "dep-1",
                    "aws_principal": [
                        {"account_id": "123456789012"},
                        {"account_id": "123456789012"},
                    ],
                })),
            )
            .unwrap_err();
        assert!(matches!(err, ProviderError::SchemaParse { .. }));
    }
}
