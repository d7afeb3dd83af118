//! The `oasis_deployment` resource: managed database deployments.
//!
//! The plan may leave version, certificate, and sizing unset; those are
//! resolved against the Platform's listings before create, see
//! [`crate::defaults`].

use crate::api::Context;
use crate::defaults::resolve_deployment_defaults;
use crate::diff::ChangeSet;
use crate::error::ProviderError;
use crate::platform::{Deployment, DeploymentModel, NotificationSettings};
use crate::reconcile::ResourceKind;
use crate::schema::{
    Attribute, AttributeFlags, AttributeType, Block, DiffSuppress, NestedBlock, Schema,
};
use crate::translate::{AttrMap, Flat, Plan};
use async_trait::async_trait;

/// Manages database deployments.
pub struct DeploymentKind;

fn location_block() -> NestedBlock {
    NestedBlock::single(Block::new().with_attribute("region", Attribute::required_string()))
        .with_min_items(1)
        .force_new()
}

fn version_block() -> NestedBlock {
    NestedBlock::single(
        Block::new()
            .with_attribute("db_version", Attribute::server_assigned_string())
            .with_attribute("ca_certificate_id", Attribute::server_assigned_string())
            .with_attribute("ip_allowlist_id", Attribute::optional_string()),
    )
}

fn configuration_block() -> NestedBlock {
    NestedBlock::single(
        Block::new()
            .with_attribute(
                "model",
                Attribute::optional_string().with_diff_suppress(DiffSuppress::ComputedOnServer),
            )
            .with_attribute("node_size_id", Attribute::server_assigned_string())
            .with_attribute(
                "node_count",
                Attribute::optional_int64().with_diff_suppress(DiffSuppress::ZeroSentinel),
            )
            .with_attribute(
                "node_disk_size",
                Attribute::optional_int64().with_diff_suppress(DiffSuppress::ZeroSentinel),
            ),
    )
}

fn notification_block() -> NestedBlock {
    NestedBlock::single(Block::new().with_attribute(
        "email_addresses",
        Attribute::new(
            AttributeType::list(AttributeType::String),
            AttributeFlags::optional(),
        ),
    ))
}

fn flatten_model(model: &DeploymentModel) -> AttrMap {
    Flat::new()
        .str("model", model.model.clone())
        .str("node_size_id", model.node_size_id.clone())
        .i64("node_count", i64::from(model.node_count))
        .i64("node_disk_size", i64::from(model.node_disk_size))
        .build()
}

#[async_trait]
impl ResourceKind for DeploymentKind {
    type Record = Deployment;

    fn name(&self) -> &'static str {
        "oasis_deployment"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("url", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute(
                "project",
                Attribute::optional_string()
                    .with_env_default("OASIS_PROJECT")
                    .force_new(),
            )
            .with_attribute(
                "terms_and_conditions_accepted",
                Attribute::optional_bool(),
            )
            .with_attribute("disk_performance", Attribute::server_assigned_string())
            .with_attribute(
                "disable_foxx_authentication",
                Attribute::optional_bool(),
            )
            .with_attribute(
                "is_platform_authentication_enabled",
                Attribute::optional_bool(),
            )
            .with_attribute("locked", Attribute::optional_bool())
            .with_attribute("created_at", Attribute::computed_string())
            .with_block("location", location_block())
            .with_block("version", version_block())
            .with_block("configuration", configuration_block())
            .with_block("notification_settings", notification_block())
    }

    fn expand(&self, ctx: &Context, plan: &Plan) -> Result<Deployment, ProviderError> {
        let location = plan
            .single_block("location")?
            .ok_or_else(|| ProviderError::missing_field("location"))?;
        let version = plan.single_block("version")?.unwrap_or_default();
        let configuration = plan.single_block("configuration")?.unwrap_or_default();

        let notification_settings = match plan.single_block("notification_settings")? {
            Some(n) => Some(NotificationSettings {
                email_addresses: n.string_list("email_addresses")?,
            }),
            None => None,
        };

        Ok(Deployment {
            id: String::new(),
            url: String::new(),
            name: plan.required_string("name")?,
            description: plan.optional_string("description"),
            project_id: ctx.project_id(plan)?,
            region_id: location.required_string("region")?,
            version: version.optional_string("db_version"),
            ca_certificate_id: version.optional_string("ca_certificate_id"),
            ip_allowlist_id: version.optional_string("ip_allowlist_id"),
            model: Some(DeploymentModel {
                model: configuration.optional_string("model"),
                node_size_id: configuration.optional_string("node_size_id"),
                node_count: configuration.optional_i32("node_count")?,
                node_disk_size: configuration.optional_i32("node_disk_size")?,
            }),
            created_at: None,
            disk_performance_id: plan.optional_string("disk_performance"),
            notification_settings,
            disable_foxx_authentication: plan.optional_bool("disable_foxx_authentication"),
            is_platform_authentication_enabled: plan
                .optional_bool("is_platform_authentication_enabled"),
            accepted_terms_and_conditions_id: String::new(),
            locked: plan.optional_bool("locked"),
        })
    }

    fn flatten(&self, dep: &Deployment) -> AttrMap {
        let mut flat = Flat::new()
            .str("id", dep.id.clone())
            .str("url", dep.url.clone())
            .str("name", dep.name.clone())
            .str("description", dep.description.clone())
            .str("project", dep.project_id.clone())
            .single_block(
                "location",
                Flat::new().str("region", dep.region_id.clone()).build(),
            )
            .single_block(
                "version",
                Flat::new()
                    .str("db_version", dep.version.clone())
                    .str("ca_certificate_id", dep.ca_certificate_id.clone())
                    .str("ip_allowlist_id", dep.ip_allowlist_id.clone())
                    .build(),
            )
            .bool(
                "terms_and_conditions_accepted",
                !dep.accepted_terms_and_conditions_id.is_empty(),
            )
            .str("disk_performance", dep.disk_performance_id.clone())
            .bool(
                "disable_foxx_authentication",
                dep.disable_foxx_authentication,
            )
            .bool(
                "is_platform_authentication_enabled",
                dep.is_platform_authentication_enabled,
            )
            .bool("locked", dep.locked)
            .timestamp("created_at", dep.created_at.as_ref());
        if let Some(model) = &dep.model {
            flat = flat.single_block("configuration", flatten_model(model));
        }
        if let Some(settings) = &dep.notification_settings {
            flat = flat.single_block(
                "notification_settings",
                Flat::new()
                    .str_list("email_addresses", &settings.email_addresses)
                    .build(),
            );
        }
        flat.build()
    }

    async fn resolve_defaults(
        &self,
        ctx: &Context,
        record: &mut Deployment,
        plan: &Plan,
    ) -> Result<(), ProviderError> {
        resolve_deployment_defaults(ctx, record, plan).await
    }

    async fn remote_create(
        &self,
        ctx: &Context,
        record: Deployment,
    ) -> Result<String, ProviderError> {
        Ok(ctx.api().create_deployment(record).await?.id)
    }

    async fn remote_get(&self, ctx: &Context, id: &str) -> Result<Deployment, ProviderError> {
        ctx.api().get_deployment(id).await
    }

    fn apply_changes(
        &self,
        current: &mut Deployment,
        plan: &Plan,
        changes: &ChangeSet,
    ) -> Result<(), ProviderError> {
        if changes.has("name") {
            current.name = plan.required_string("name")?;
        }
        if changes.has("description") {
            current.description = plan.optional_string("description");
        }
        if changes.has("version") {
            let version = plan.single_block("version")?.unwrap_or_default();
            let db_version = version.optional_string("db_version");
            if !db_version.is_empty() {
                current.version = db_version;
            }
            let certificate = version.optional_string("ca_certificate_id");
            if !certificate.is_empty() {
                current.ca_certificate_id = certificate;
            }
            // The allowlist may legitimately be detached.
            current.ip_allowlist_id = version.optional_string("ip_allowlist_id");
        }
        if changes.has("configuration") {
            let configuration = plan.single_block("configuration")?.unwrap_or_default();
            let model = current.model.get_or_insert_with(DeploymentModel::default);
            let model_id = configuration.optional_string("model");
            if !model_id.is_empty() {
                model.model = model_id;
            }
            let node_size_id = configuration.optional_string("node_size_id");
            if !node_size_id.is_empty() {
                model.node_size_id = node_size_id;
            }
            let node_count = configuration.optional_i32("node_count")?;
            if node_count > 0 {
                model.node_count = node_count;
            }
            let node_disk_size = configuration.optional_i32("node_disk_size")?;
            if node_disk_size > 0 {
                model.node_disk_size = node_disk_size;
            }
        }
        if changes.has("notification_settings") {
            current.notification_settings = match plan.single_block("notification_settings")? {
                Some(n) => Some(NotificationSettings {
                    email_addresses: n.string_list("email_addresses")?,
                }),
                None => None,
            };
        }
        if changes.has("disk_performance") {
            current.disk_performance_id = plan.optional_string("disk_performance");
        }
        if changes.has("disable_foxx_authentication") {
            current.disable_foxx_authentication = plan.optional_bool("disable_foxx_authentication");
        }
        if changes.has("is_platform_authentication_enabled") {
            current.is_platform_authentication_enabled =
                plan.optional_bool("is_platform_authentication_enabled");
        }
        if changes.has("locked") {
            current.locked = plan.optional_bool("locked");
        }
        Ok(())
    }

    async fn remote_update(&self, ctx: &Context, record: Deployment) -> Result<(), ProviderError> {
        ctx.api().update_deployment(record).await
    }

    async fn remote_delete(&self, ctx: &Context, id: &str) -> Result<(), ProviderError> {
        ctx.api().delete_deployment(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Certificate, NodeSize, TermsAndConditions, Version};
    use crate::reconcile::{Lifecycle, Reconciler};
    use crate::testing::MockPlatform;
    use serde_json::json;
    use std::sync::Arc;

    fn seeded_platform() -> MockPlatform {
        MockPlatform::new()
            .with_default_version(Version {
                version: "3.11".to_string(),
                is_default: true,
            })
            .with_terms(TermsAndConditions {
                id: "tc-1".to_string(),
                content: String::new(),
                created_at: None,
            })
            .with_certificates(vec![Certificate {
                id: "cert-def".to_string(),
                name: "default".to_string(),
                project_id: "proj-1".to_string(),
                is_default: true,
                ..Default::default()
            }])
            .with_node_sizes(vec![
                NodeSize {
                    id: "c4-a8".to_string(),
                    name: "a8".to_string(),
                    memory_size: 8,
                    min_disk_size: 20,
                    max_disk_size: 200,
                },
                NodeSize {
                    id: "c4-a4".to_string(),
                    name: "a4".to_string(),
                    memory_size: 4,
                    min_disk_size: 10,
                    max_disk_size: 100,
                },
            ])
    }

    fn ctx() -> Context {
        Context::new(Arc::new(seeded_platform()), "org-1", "proj-1")
    }

    fn plan(v: serde_json::Value) -> Plan {
        Plan::new(v).unwrap()
    }

    fn minimal_plan() -> Plan {
        plan(json!({
            "name": "mydb",
            "location": [{"region": "gcp-europe-west4"}],
            "configuration": [{}],
            "terms_and_conditions_accepted": true,
        }))
    }

    #[tokio::test]
    async fn test_create_resolves_defaults_end_to_end() {
        let reconciler = Reconciler::new(DeploymentKind);
        let ctx = ctx();

        let created = reconciler.create(&ctx, &minimal_plan()).await.unwrap();
        assert!(!created.id.is_empty());

        let configuration = &created.get("configuration").unwrap()[0];
        assert_eq!(configuration["model"], json!("oneshard"));
        assert_eq!(configuration["node_size_id"], json!("c4-a4"));
        assert_eq!(configuration["node_count"], json!(3));
        assert_eq!(configuration["node_disk_size"], json!(10));
        assert_eq!(
            created.get("terms_and_conditions_accepted"),
            Some(&json!(true))
        );
    }

    #[tokio::test]
    async fn test_create_without_acceptance_fails() {
        let reconciler = Reconciler::new(DeploymentKind);
        let err = reconciler
            .create(
                &ctx(),
                &plan(json!({
                    "name": "mydb",
                    "location": [{"region": "gcp-europe-west4"}],
                })),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::PreconditionMissing(_)));
    }

    #[tokio::test]
    async fn test_missing_location_is_a_schema_error() {
        let err = DeploymentKind
            .expand(&ctx(), &plan(json!({"name": "mydb"})))
            .unwrap_err();
        match err {
            ProviderError::SchemaParse { field, .. } => assert_eq!(field, "location"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_region_change_forces_replacement() {
        let reconciler = Reconciler::new(DeploymentKind);
        let ctx = ctx();

        let created = reconciler.create(&ctx, &minimal_plan()).await.unwrap();
        let moved = plan(json!({
            "name": "mydb",
            "location": [{"region": "aws-us-west-2"}],
            "configuration": [{}],
            "terms_and_conditions_accepted": true,
        }));
        let result = reconciler.plan(Some(&created), &moved).unwrap();
        assert!(result.requires_replace);
    }

    #[tokio::test]
    async fn test_omitted_version_block_never_diffs() {
        let reconciler = Reconciler::new(DeploymentKind);
        let ctx = ctx();

        // The plan never declared `version`, so the server-resolved block
        // must not surface as a change on the next plan.
        let created = reconciler.create(&ctx, &minimal_plan()).await.unwrap();
        let result = reconciler.plan(Some(&created), &minimal_plan()).unwrap();
        assert!(result.changes.is_empty());
    }

    #[tokio::test]
    async fn test_update_resizes_in_place() {
        let reconciler = Reconciler::new(DeploymentKind);
        let ctx = ctx();

        let created = reconciler.create(&ctx, &minimal_plan()).await.unwrap();
        let resized = plan(json!({
            "name": "mydb",
            "location": [{"region": "gcp-europe-west4"}],
            "configuration": [{"node_count": 5, "node_disk_size": 50}],
            "terms_and_conditions_accepted": true,
        }));
        let updated = reconciler.update(&ctx, &created, &resized).await.unwrap();

        let configuration = &updated.get("configuration").unwrap()[0];
        assert_eq!(configuration["node_count"], json!(5));
        assert_eq!(configuration["node_disk_size"], json!(50));
        // Sizing kept the previously resolved node size.
        assert_eq!(configuration["node_size_id"], json!("c4-a4"));
    }
}
