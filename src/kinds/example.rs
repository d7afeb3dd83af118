//! Example-dataset kinds: the `oasis_example_dataset_installation` resource
//! and the `oasis_example_datasets` / `oasis_example_dataset_installations`
//! data sources.

use crate::api::Context;
use crate::diff::ChangeSet;
use crate::error::ProviderError;
use crate::platform::{ExampleDataset, ExampleDatasetInstallation};
use crate::reconcile::{DataSource, ResourceKind};
use crate::schema::{Attribute, Block, NestedBlock, Schema};
use crate::translate::{hashed_id, AttrMap, Flat, Plan, StateView};
use async_trait::async_trait;

fn flatten_installation(installation: &ExampleDatasetInstallation) -> AttrMap {
    Flat::new()
        .str("id", installation.id.clone())
        .str("deployment_id", installation.deployment_id.clone())
        .str("example_dataset_id", installation.example_dataset_id.clone())
        .str("status", installation.status.clone())
        .timestamp("created_at", installation.created_at.as_ref())
        .build()
}

/// Manages installations of example datasets into a deployment.
///
/// Installations are immutable: a different dataset means a new
/// installation.
pub struct ExampleDatasetInstallationKind;

#[async_trait]
impl ResourceKind for ExampleDatasetInstallationKind {
    type Record = ExampleDatasetInstallation;

    fn name(&self) -> &'static str {
        "oasis_example_dataset_installation"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("deployment_id", Attribute::required_string().force_new())
            .with_attribute(
                "example_dataset_id",
                Attribute::required_string().force_new(),
            )
            .with_attribute("status", Attribute::computed_string())
            .with_attribute("created_at", Attribute::computed_string())
    }

    fn expand(
        &self,
        _ctx: &Context,
        plan: &Plan,
    ) -> Result<ExampleDatasetInstallation, ProviderError> {
        Ok(ExampleDatasetInstallation {
            id: String::new(),
            deployment_id: plan.required_string("deployment_id")?,
            example_dataset_id: plan.required_string("example_dataset_id")?,
            status: String::new(),
            created_at: None,
        })
    }

    fn flatten(&self, installation: &ExampleDatasetInstallation) -> AttrMap {
        flatten_installation(installation)
    }

    async fn remote_create(
        &self,
        ctx: &Context,
        record: ExampleDatasetInstallation,
    ) -> Result<String, ProviderError> {
        Ok(ctx
            .api()
            .create_example_dataset_installation(record)
            .await?
            .id)
    }

    async fn remote_get(
        &self,
        ctx: &Context,
        id: &str,
    ) -> Result<ExampleDatasetInstallation, ProviderError> {
        ctx.api().get_example_dataset_installation(id).await
    }

    fn apply_changes(
        &self,
        _current: &mut ExampleDatasetInstallation,
        _plan: &Plan,
        _changes: &ChangeSet,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Conflict(
            "example dataset installations cannot be updated".to_string(),
        ))
    }

    async fn remote_update(
        &self,
        _ctx: &Context,
        _record: ExampleDatasetInstallation,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Conflict(
            "example dataset installations cannot be updated".to_string(),
        ))
    }

    async fn remote_delete(&self, ctx: &Context, id: &str) -> Result<(), ProviderError> {
        ctx.api().delete_example_dataset_installation(id).await
    }

    fn supports_update(&self) -> bool {
        false
    }
}

fn dataset_attrs(dataset: &ExampleDataset) -> AttrMap {
    Flat::new()
        .str("id", dataset.id.clone())
        .str("name", dataset.name.clone())
        .str("description", dataset.description.clone())
        .timestamp("created_at", dataset.created_at.as_ref())
        .build()
}

/// Lists the datasets available to an organization.
pub struct ExampleDatasetsDataSource;

#[async_trait]
impl DataSource for ExampleDatasetsDataSource {
    fn name(&self) -> &'static str {
        "oasis_example_datasets"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "organization",
                Attribute::optional_string().with_env_default("OASIS_ORGANIZATION"),
            )
            .with_block(
                "items",
                NestedBlock::list(
                    Block::new()
                        .with_attribute("id", Attribute::computed_string())
                        .with_attribute("name", Attribute::computed_string())
                        .with_attribute("description", Attribute::computed_string())
                        .with_attribute("created_at", Attribute::computed_string()),
                )
                .computed(),
            )
    }

    async fn read(&self, ctx: &Context, plan: &Plan) -> Result<StateView, ProviderError> {
        let organization = ctx.organization_id(plan)?;
        let datasets = ctx.api().list_example_datasets(&organization).await?;
        let id = hashed_id(datasets.iter().map(|d| d.id.clone()));
        let attrs = Flat::new()
            .str("id", id.clone())
            .str("organization", organization)
            .blocks("items", datasets.iter().map(dataset_attrs).collect())
            .build();
        Ok(StateView::from_parts(id, attrs))
    }
}

/// Lists the installations present in a deployment.
pub struct ExampleDatasetInstallationsDataSource;

#[async_trait]
impl DataSource for ExampleDatasetInstallationsDataSource {
    fn name(&self) -> &'static str {
        "oasis_example_dataset_installations"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("deployment_id", Attribute::required_string())
            .with_block(
                "items",
                NestedBlock::list(
                    Block::new()
                        .with_attribute("id", Attribute::computed_string())
                        .with_attribute("deployment_id", Attribute::computed_string())
                        .with_attribute("example_dataset_id", Attribute::computed_string())
                        .with_attribute("status", Attribute::computed_string())
                        .with_attribute("created_at", Attribute::computed_string()),
                )
                .computed(),
            )
    }

    async fn read(&self, ctx: &Context, plan: &Plan) -> Result<StateView, ProviderError> {
        let deployment_id = plan.required_string("deployment_id")?;
        let installations = ctx
            .api()
            .list_example_dataset_installations(&deployment_id)
            .await?;
        let id = hashed_id(installations.iter().map(|i| i.id.clone()));
        let attrs = Flat::new()
            .str("id", id.clone())
            .str("deployment_id", deployment_id)
            .blocks(
                "items",
                installations.iter().map(flatten_installation).collect(),
            )
            .build();
        Ok(StateView::from_parts(id, attrs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{Lifecycle, Reconciler};
    use crate::testing::MockPlatform;
    use serde_json::json;
    use std::sync::Arc;

    fn plan(v: serde_json::Value) -> Plan {
        Plan::new(v).unwrap()
    }

    fn dataset(id: &str) -> ExampleDataset {
        ExampleDataset {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn test_install_then_list() {
        let platform = Arc::new(MockPlatform::new());
        let ctx = Context::new(platform, "org-1", "proj-1");
        let reconciler = Reconciler::new(ExampleDatasetInstallationKind);

        let created = reconciler
            .create(
                &ctx,
                &plan(json!({"deployment_id": "dep-1", "example_dataset_id": "imdb"})),
            )
            .await
            .unwrap();
        assert_eq!(created.get("status"), Some(&json!("Ready")));

        let listing = ExampleDatasetInstallationsDataSource
            .read(&ctx, &plan(json!({"deployment_id": "dep-1"})))
            .await
            .unwrap();
        assert_eq!(listing.get("items").unwrap().as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_datasets_listing_id_is_deterministic() {
        let make_ctx = |order: Vec<ExampleDataset>| {
            Context::new(
                Arc::new(MockPlatform::new().with_datasets(order)),
                "org-1",
                "",
            )
        };

        let a = ExampleDatasetsDataSource
            .read(
                &make_ctx(vec![dataset("imdb"), dataset("flights")]),
                &plan(json!({})),
            )
            .await
            .unwrap();
        let b = ExampleDatasetsDataSource
            .read(
                &make_ctx(vec![dataset("flights"), dataset("imdb")]),
                &plan(json!({})),
            )
            .await
            .unwrap();
        assert_eq!(a.id, b.id);
    }
}
