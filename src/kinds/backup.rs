//! The `oasis_backup` resource and data source.

use crate::api::Context;
use crate::diff::ChangeSet;
use crate::error::ProviderError;
use crate::platform::Backup;
use crate::reconcile::{DataSource, ResourceKind};
use crate::schema::{Attribute, DiffSuppress, Schema};
use crate::translate::{AttrMap, Flat, Plan, StateView};
use async_trait::async_trait;

fn flatten_backup(backup: &Backup) -> AttrMap {
    let mut flat = Flat::new()
        .str("id", backup.id.clone())
        .str("url", backup.url.clone())
        .str("name", backup.name.clone())
        .str("description", backup.description.clone())
        .str("deployment_id", backup.deployment_id.clone())
        .str("policy_id", backup.backup_policy_id.clone())
        .timestamp("created_at", backup.created_at.as_ref());
    // Unset on the wire means the keys stay out of the flattened map.
    if backup.upload {
        flat = flat.bool("upload", true);
    }
    if backup.auto_deleted_at != 0 {
        flat = flat.i64("auto_deleted_at", i64::from(backup.auto_deleted_at));
    }
    flat.build()
}

/// Manages manual backups of a deployment.
pub struct BackupKind;

#[async_trait]
impl ResourceKind for BackupKind {
    type Record = Backup;

    fn name(&self) -> &'static str {
        "oasis_backup"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("url", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute("deployment_id", Attribute::required_string().force_new())
            .with_attribute("policy_id", Attribute::computed_string())
            .with_attribute("upload", Attribute::optional_bool())
            .with_attribute(
                "auto_deleted_at",
                Attribute::optional_int64().with_diff_suppress(DiffSuppress::ZeroSentinel),
            )
            .with_attribute("created_at", Attribute::computed_string())
    }

    fn expand(&self, _ctx: &Context, plan: &Plan) -> Result<Backup, ProviderError> {
        Ok(Backup {
            id: String::new(),
            url: String::new(),
            name: plan.required_string("name")?,
            description: plan.optional_string("description"),
            deployment_id: plan.required_string("deployment_id")?,
            backup_policy_id: String::new(),
            created_at: None,
            upload: plan.optional_bool("upload"),
            auto_deleted_at: plan.optional_i32("auto_deleted_at")?,
        })
    }

    fn flatten(&self, backup: &Backup) -> AttrMap {
        flatten_backup(backup)
    }

    async fn remote_create(&self, ctx: &Context, record: Backup) -> Result<String, ProviderError> {
        Ok(ctx.api().create_backup(record).await?.id)
    }

    async fn remote_get(&self, ctx: &Context, id: &str) -> Result<Backup, ProviderError> {
        ctx.api().get_backup(id).await
    }

    fn apply_changes(
        &self,
        current: &mut Backup,
        plan: &Plan,
        changes: &ChangeSet,
    ) -> Result<(), ProviderError> {
        if changes.has("name") {
            current.name = plan.required_string("name")?;
        }
        if changes.has("description") {
            current.description = plan.optional_string("description");
        }
        if changes.has("upload") {
            current.upload = plan.optional_bool("upload");
        }
        if changes.has("auto_deleted_at") {
            current.auto_deleted_at = plan.optional_i32("auto_deleted_at")?;
        }
        Ok(())
    }

    async fn remote_update(&self, ctx: &Context, record: Backup) -> Result<(), ProviderError> {
        ctx.api().update_backup(record).await
    }

    async fn remote_delete(&self, ctx: &Context, id: &str) -> Result<(), ProviderError> {
        ctx.api().delete_backup(id).await
    }
}

/// Looks up a single backup by id.
pub struct BackupDataSource;

#[async_trait]
impl DataSource for BackupDataSource {
    fn name(&self) -> &'static str {
        "oasis_backup"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::required_string())
            .with_attribute("url", Attribute::computed_string())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("description", Attribute::computed_string())
            .with_attribute("deployment_id", Attribute::computed_string())
            .with_attribute("policy_id", Attribute::computed_string())
            .with_attribute("upload", Attribute::computed_bool())
            .with_attribute("auto_deleted_at", Attribute::computed_int64())
            .with_attribute("created_at", Attribute::computed_string())
    }

    async fn read(&self, ctx: &Context, plan: &Plan) -> Result<StateView, ProviderError> {
        let id = plan.required_string("id")?;
        let backup = ctx.api().get_backup(&id).await?;
        Ok(StateView::from_parts(id, flatten_backup(&backup)))
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

    #[test]
    fn test_flatten_emits_exactly_the_surface_keys() {
        use crate::translate::parse_timestamp;
        use std::collections::BTreeSet;

        let backup = Backup {
            id: "test-id".to_string(),
            url: "https://test.url".to_string(),
            name: "test-name".to_string(),
            description: "test-description".to_string(),
            created_at: parse_timestamp("2022-01-01T01:01:01Z", "created_at").unwrap(),
            backup_policy_id: "test-policy-id".to_string(),
            deployment_id: "test-dep-id".to_string(),
            ..Default::default()
        };

        let flat = flatten_backup(&backup);
        let keys: BTreeSet<&str> = flat.keys().map(String::as_str).collect();
        let expected: BTreeSet<&str> = [
            "id",
            "name",
            "description",
            "url",
            "created_at",
            "deployment_id",
            "policy_id",
        ]
        .into_iter()
        .collect();
        assert_eq!(keys, expected);
        assert_eq!(flat["policy_id"], json!("test-policy-id"));
        assert_eq!(flat["created_at"], json!("2022-01-01T01:01:01Z"));
    }

    #[tokio::test]
    async fn test_create_and_data_source_agree() {
        let platform = Arc::new(MockPlatform::new());
        let ctx = Context::new(platform, "org-1", "proj-1");
        let reconciler = Reconciler::new(BackupKind);

        let created = reconciler
            .create(
                &ctx,
                &plan(json!({
                    "name": "pre-upgrade",
                    "deployment_id": "dep-1",
                    "upload": true,
                })),
            )
            .await
            .unwrap();

        let state = BackupDataSource
            .read(&ctx, &plan(json!({"id": created.id})))
            .await
            .unwrap();
        assert_eq!(state.get("name"), Some(&json!("pre-upgrade")));
        assert_eq!(state.get("upload"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn test_deployment_change_forces_replacement() {
        let reconciler = Reconciler::new(BackupKind);
        let ctx = ctx();

        let created = reconciler
            .create(
                &ctx,
                &plan(json!({"name": "b", "deployment_id": "dep-1"})),
            )
            .await
            .unwrap();
        let result = reconciler
            .plan(
                Some(&created),
                &plan(json!({"name": "b", "deployment_id": "dep-2"})),
            )
            .unwrap();
        assert!(result.requires_replace);
    }
}
