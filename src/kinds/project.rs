//! The `oasis_project` resource and data source.

use crate::api::Context;
use crate::diff::ChangeSet;
use crate::error::ProviderError;
use crate::platform::Project;
use crate::reconcile::{DataSource, ResourceKind};
use crate::schema::{Attribute, Schema};
use crate::translate::{AttrMap, Flat, Plan, StateView};
use async_trait::async_trait;

/// Manages projects within an organization.
pub struct ProjectKind;

fn flatten_project(project: &Project) -> AttrMap {
    Flat::new()
        .str("id", project.id.clone())
        .str("url", project.url.clone())
        .str("name", project.name.clone())
        .str("description", project.description.clone())
        .str("organization", project.organization_id.clone())
        .bool("locked", project.locked)
        .timestamp("created_at", project.created_at.as_ref())
        .build()
}

#[async_trait]
impl ResourceKind for ProjectKind {
    type Record = Project;

    fn name(&self) -> &'static str {
        "oasis_project"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("url", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute(
                "organization",
                Attribute::optional_string()
                    .with_env_default("OASIS_ORGANIZATION")
                    .force_new(),
            )
            .with_attribute("locked", Attribute::optional_bool())
            .with_attribute("created_at", Attribute::computed_string())
    }

    fn expand(&self, ctx: &Context, plan: &Plan) -> Result<Project, ProviderError> {
        Ok(Project {
            id: String::new(),
            url: String::new(),
            name: plan.required_string("name")?,
            description: plan.optional_string("description"),
            organization_id: ctx.organization_id(plan)?,
            created_at: None,
            locked: plan.optional_bool("locked"),
        })
    }

    fn flatten(&self, project: &Project) -> AttrMap {
        flatten_project(project)
    }

    async fn remote_create(&self, ctx: &Context, record: Project) -> Result<String, ProviderError> {
        Ok(ctx.api().create_project(record).await?.id)
    }

    async fn remote_get(&self, ctx: &Context, id: &str) -> Result<Project, ProviderError> {
        ctx.api().get_project(id).await
    }

    fn apply_changes(
        &self,
        current: &mut Project,
        plan: &Plan,
        changes: &ChangeSet,
    ) -> Result<(), ProviderError> {
        if changes.has("name") {
            current.name = plan.required_string("name")?;
        }
        if changes.has("description") {
            current.description = plan.optional_string("description");
        }
        if changes.has("locked") {
            current.locked = plan.optional_bool("locked");
        }
        Ok(())
    }

    async fn remote_update(&self, ctx: &Context, record: Project) -> Result<(), ProviderError> {
        ctx.api().update_project(record).await
    }

    async fn remote_delete(&self, ctx: &Context, id: &str) -> Result<(), ProviderError> {
        ctx.api().delete_project(id).await
    }
}

/// Looks up a single project by id.
pub struct ProjectDataSource;

#[async_trait]
impl DataSource for ProjectDataSource {
    fn name(&self) -> &'static str {
        "oasis_project"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::required_string())
            .with_attribute("url", Attribute::computed_string())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("description", Attribute::computed_string())
            .with_attribute("organization", Attribute::computed_string())
            .with_attribute("locked", Attribute::computed_bool())
            .with_attribute("created_at", Attribute::computed_string())
    }

    async fn read(&self, ctx: &Context, plan: &Plan) -> Result<StateView, ProviderError> {
        let id = plan.required_string("id")?;
        let project = ctx.api().get_project(&id).await?;
        Ok(StateView::from_parts(id, flatten_project(&project)))
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
    async fn test_organization_falls_back_to_provider_default() {
        let project = ProjectKind
            .expand(&ctx(), &plan(json!({"name": "analytics"})))
            .unwrap();
        assert_eq!(project.organization_id, "org-1");
    }

    #[tokio::test]
    async fn test_data_source_reads_created_project() {
        let platform = Arc::new(MockPlatform::new());
        let ctx = Context::new(platform, "org-1", "");
        let reconciler = Reconciler::new(ProjectKind);

        let created = reconciler
            .create(&ctx, &plan(json!({"name": "analytics"})))
            .await
            .unwrap();

        let state = ProjectDataSource
            .read(&ctx, &plan(json!({"id": created.id})))
            .await
            .unwrap();
        assert_eq!(state.get("name"), Some(&json!("analytics")));
        assert_eq!(state.get("organization"), Some(&json!("org-1")));
    }

    #[tokio::test]
    async fn test_data_source_missing_project_fails() {
        let err = ProjectDataSource
            .read(&ctx(), &plan(json!({"id": "proj-nope"})))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
