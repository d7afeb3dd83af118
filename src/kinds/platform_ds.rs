//! Platform catalog data sources: `oasis_cloud_provider` and
//! `oasis_region`.
//!
//! Both are pure listings; their ids are digests of the returned
//! identifiers so re-reads of the same catalog produce the same id.

use crate::api::Context;
use crate::error::ProviderError;
use crate::platform::{CloudProvider, Region};
use crate::reconcile::DataSource;
use crate::schema::{Attribute, Block, NestedBlock, Schema};
use crate::translate::{hashed_id, AttrMap, Flat, Plan, StateView};
use async_trait::async_trait;

/// Lists the cloud providers available to an organization.
pub struct CloudProviderDataSource;

fn provider_attrs(provider: &CloudProvider) -> AttrMap {
    Flat::new()
        .str("id", provider.id.clone())
        .str("name", provider.name.clone())
        .build()
}

#[async_trait]
impl DataSource for CloudProviderDataSource {
    fn name(&self) -> &'static str {
        "oasis_cloud_provider"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "organization",
                Attribute::optional_string().with_env_default("OASIS_ORGANIZATION"),
            )
            .with_block(
                "providers",
                NestedBlock::list(
                    Block::new()
                        .with_attribute("id", Attribute::computed_string())
                        .with_attribute("name", Attribute::computed_string()),
                )
                .computed(),
            )
    }

    async fn read(&self, ctx: &Context, plan: &Plan) -> Result<StateView, ProviderError> {
        let organization = ctx.organization_id(plan)?;
        let providers = ctx.api().list_cloud_providers(&organization).await?;
        let id = hashed_id(providers.iter().map(|p| p.id.clone()));
        let attrs = Flat::new()
            .str("id", id.clone())
            .str("organization", organization)
            .blocks("providers", providers.iter().map(provider_attrs).collect())
            .build();
        Ok(StateView::from_parts(id, attrs))
    }
}

/// Lists the regions of a cloud provider.
pub struct RegionDataSource;

fn region_attrs(region: &Region) -> AttrMap {
    Flat::new()
        .str("id", region.id.clone())
        .str("provider_id", region.provider_id.clone())
        .str("location", region.location.clone())
        .bool("available", region.available)
        .build()
}

#[async_trait]
impl DataSource for RegionDataSource {
    fn name(&self) -> &'static str {
        "oasis_region"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "organization",
                Attribute::optional_string().with_env_default("OASIS_ORGANIZATION"),
            )
            .with_attribute("provider_id", Attribute::required_string())
            .with_block(
                "regions",
                NestedBlock::list(
                    Block::new()
                        .with_attribute("id", Attribute::computed_string())
                        .with_attribute("provider_id", Attribute::computed_string())
                        .with_attribute("location", Attribute::computed_string())
                        .with_attribute("available", Attribute::computed_bool()),
                )
                .computed(),
            )
    }

    async fn read(&self, ctx: &Context, plan: &Plan) -> Result<StateView, ProviderError> {
        let organization = ctx.organization_id(plan)?;
        let provider_id = plan.required_string("provider_id")?;
        let regions = ctx.api().list_regions(&organization, &provider_id).await?;
        let id = hashed_id(regions.iter().map(|r| r.id.clone()));
        let attrs = Flat::new()
            .str("id", id.clone())
            .str("organization", organization)
            .str("provider_id", provider_id)
            .blocks("regions", regions.iter().map(region_attrs).collect())
            .build();
        Ok(StateView::from_parts(id, attrs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockPlatform;
    use serde_json::json;
    use std::sync::Arc;

    fn plan(v: serde_json::Value) -> Plan {
        Plan::new(v).unwrap()
    }

    fn seeded() -> MockPlatform {
        MockPlatform::new()
            .with_cloud_providers(vec![
                CloudProvider {
                    id: "gcp".to_string(),
                    name: "Google Cloud".to_string(),
                },
                CloudProvider {
                    id: "aws".to_string(),
                    name: "Amazon Web Services".to_string(),
                },
            ])
            .with_regions(vec![
                Region {
                    id: "gcp-europe-west4".to_string(),
                    provider_id: "gcp".to_string(),
                    location: "Netherlands".to_string(),
                    available: true,
                },
                Region {
                    id: "aws-us-west-2".to_string(),
                    provider_id: "aws".to_string(),
                    location: "Oregon".to_string(),
                    available: true,
                },
            ])
    }

    #[tokio::test]
    async fn test_providers_listing() {
        let ctx = Context::new(Arc::new(seeded()), "org-1", "");
        let state = CloudProviderDataSource
            .read(&ctx, &plan(json!({})))
            .await
            .unwrap();
        assert_eq!(state.get("providers").unwrap().as_array().unwrap().len(), 2);
        assert_eq!(state.id.len(), 64);
    }

    #[tokio::test]
    async fn test_regions_filtered_by_provider() {
        let ctx = Context::new(Arc::new(seeded()), "org-1", "");
        let state = RegionDataSource
            .read(&ctx, &plan(json!({"provider_id": "gcp"})))
            .await
            .unwrap();
        let regions = state.get("regions").unwrap().as_array().unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0]["id"], json!("gcp-europe-west4"));
    }

    #[tokio::test]
    async fn test_region_listing_requires_provider() {
        let ctx = Context::new(Arc::new(seeded()), "org-1", "");
        let err = RegionDataSource
            .read(&ctx, &plan(json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::SchemaParse { .. }));
    }
}
