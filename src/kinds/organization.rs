//! Organization kinds: the `oasis_organization` resource and data source,
//! the `oasis_organization_invite` resource, and the
//! `oasis_terms_and_conditions` data source.

use crate::api::Context;
use crate::diff::ChangeSet;
use crate::error::ProviderError;
use crate::platform::{Organization, OrganizationInvite, Tier};
use crate::reconcile::{DataSource, ResourceKind};
use crate::schema::{Attribute, Block, NestedBlock, Schema};
use crate::translate::{AttrMap, Flat, Plan, StateView};
use async_trait::async_trait;

fn tier_attrs(tier: &Tier) -> AttrMap {
    Flat::new()
        .str("id", tier.id.clone())
        .str("name", tier.name.clone())
        .bool("has_support_plans", tier.has_support_plans)
        .bool("has_backup_uploads", tier.has_backup_uploads)
        .bool(
            "requires_terms_and_conditions",
            tier.requires_terms_and_conditions,
        )
        .build()
}

fn tier_block() -> NestedBlock {
    NestedBlock::set(
        Block::new()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("has_support_plans", Attribute::computed_bool())
            .with_attribute("has_backup_uploads", Attribute::computed_bool())
            .with_attribute(
                "requires_terms_and_conditions",
                Attribute::computed_bool(),
            ),
    )
    .computed()
}

fn flatten_organization(org: &Organization) -> AttrMap {
    let flat = Flat::new()
        .str("id", org.id.clone())
        .str("url", org.url.clone())
        .str("name", org.name.clone())
        .str("description", org.description.clone())
        .bool("locked", org.locked)
        .timestamp("created_at", org.created_at.as_ref());
    match &org.tier {
        Some(tier) => flat
            .set_blocks("tier", &tier_block().block, vec![tier_attrs(tier)])
            .build(),
        None => flat.build(),
    }
}

/// Manages organizations, the root containers.
pub struct OrganizationKind;

#[async_trait]
impl ResourceKind for OrganizationKind {
    type Record = Organization;

    fn name(&self) -> &'static str {
        "oasis_organization"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("url", Attribute::computed_string())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("description", Attribute::optional_string())
            .with_attribute("locked", Attribute::optional_bool())
            .with_attribute("created_at", Attribute::computed_string())
            .with_block("tier", tier_block())
    }

    fn expand(&self, _ctx: &Context, plan: &Plan) -> Result<Organization, ProviderError> {
        Ok(Organization {
            id: String::new(),
            url: String::new(),
            name: plan.required_string("name")?,
            description: plan.optional_string("description"),
            created_at: None,
            tier: None,
            locked: plan.optional_bool("locked"),
        })
    }

    fn flatten(&self, org: &Organization) -> AttrMap {
        flatten_organization(org)
    }

    async fn remote_create(
        &self,
        ctx: &Context,
        record: Organization,
    ) -> Result<String, ProviderError> {
        Ok(ctx.api().create_organization(record).await?.id)
    }

    async fn remote_get(&self, ctx: &Context, id: &str) -> Result<Organization, ProviderError> {
        ctx.api().get_organization(id).await
    }

    fn apply_changes(
        &self,
        current: &mut Organization,
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

    async fn remote_update(
        &self,
        ctx: &Context,
        record: Organization,
    ) -> Result<(), ProviderError> {
        ctx.api().update_organization(record).await
    }

    async fn remote_delete(&self, ctx: &Context, id: &str) -> Result<(), ProviderError> {
        ctx.api().delete_organization(id).await
    }
}

/// Manages invitations of users into an organization.
///
/// Invites are immutable on the Platform: there is nothing to update, only
/// create and withdraw.
pub struct OrganizationInviteKind;

#[async_trait]
impl ResourceKind for OrganizationInviteKind {
    type Record = OrganizationInvite;

    fn name(&self) -> &'static str {
        "oasis_organization_invite"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "organization",
                Attribute::optional_string()
                    .with_env_default("OASIS_ORGANIZATION")
                    .force_new(),
            )
            .with_attribute("email", Attribute::required_string().force_new())
            .with_attribute("accepted", Attribute::computed_bool())
            .with_attribute("user_id", Attribute::computed_string())
            .with_attribute("created_at", Attribute::computed_string())
    }

    fn expand(&self, ctx: &Context, plan: &Plan) -> Result<OrganizationInvite, ProviderError> {
        Ok(OrganizationInvite {
            id: String::new(),
            organization_id: ctx.organization_id(plan)?,
            email: plan.required_string("email")?,
            created_at: None,
            accepted: false,
            user_id: String::new(),
        })
    }

    fn flatten(&self, invite: &OrganizationInvite) -> AttrMap {
        Flat::new()
            .str("id", invite.id.clone())
            .str("organization", invite.organization_id.clone())
            .str("email", invite.email.clone())
            .bool("accepted", invite.accepted)
            .str("user_id", invite.user_id.clone())
            .timestamp("created_at", invite.created_at.as_ref())
            .build()
    }

    async fn remote_create(
        &self,
        ctx: &Context,
        record: OrganizationInvite,
    ) -> Result<String, ProviderError> {
        Ok(ctx.api().create_organization_invite(record).await?.id)
    }

    async fn remote_get(
        &self,
        ctx: &Context,
        id: &str,
    ) -> Result<OrganizationInvite, ProviderError> {
        ctx.api().get_organization_invite(id).await
    }

    fn apply_changes(
        &self,
        _current: &mut OrganizationInvite,
        _plan: &Plan,
        _changes: &ChangeSet,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Conflict(
            "organization invites cannot be updated".to_string(),
        ))
    }

    async fn remote_update(
        &self,
        _ctx: &Context,
        _record: OrganizationInvite,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Conflict(
            "organization invites cannot be updated".to_string(),
        ))
    }

    async fn remote_delete(&self, ctx: &Context, id: &str) -> Result<(), ProviderError> {
        ctx.api().delete_organization_invite(id).await
    }

    fn supports_update(&self) -> bool {
        false
    }
}

/// Looks up a single organization by id.
pub struct OrganizationDataSource;

#[async_trait]
impl DataSource for OrganizationDataSource {
    fn name(&self) -> &'static str {
        "oasis_organization"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::required_string())
            .with_attribute("url", Attribute::computed_string())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("description", Attribute::computed_string())
            .with_attribute("locked", Attribute::computed_bool())
            .with_attribute("created_at", Attribute::computed_string())
            .with_block("tier", tier_block())
    }

    async fn read(&self, ctx: &Context, plan: &Plan) -> Result<StateView, ProviderError> {
        let id = plan.required_string("id")?;
        let org = ctx.api().get_organization(&id).await?;
        Ok(StateView::from_parts(id, flatten_organization(&org)))
    }
}

/// Fetches the organization's current terms and conditions.
pub struct TermsAndConditionsDataSource;

#[async_trait]
impl DataSource for TermsAndConditionsDataSource {
    fn name(&self) -> &'static str {
        "oasis_terms_and_conditions"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute(
                "organization",
                Attribute::optional_string().with_env_default("OASIS_ORGANIZATION"),
            )
            .with_attribute("content", Attribute::computed_string())
            .with_attribute("created_at", Attribute::computed_string())
    }

    async fn read(&self, ctx: &Context, plan: &Plan) -> Result<StateView, ProviderError> {
        let organization = ctx.organization_id(plan)?;
        let terms = ctx
            .api()
            .get_current_terms_and_conditions(&organization)
            .await?;
        let attrs = Flat::new()
            .str("id", terms.id.clone())
            .str("organization", organization)
            .str("content", terms.content.clone())
            .timestamp("created_at", terms.created_at.as_ref())
            .build();
        Ok(StateView::from_parts(terms.id, attrs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::TermsAndConditions;
    use crate::reconcile::{Lifecycle, Reconciler};
    use crate::testing::MockPlatform;
    use serde_json::json;
    use std::sync::Arc;

    fn ctx_with(platform: MockPlatform) -> Context {
        Context::new(Arc::new(platform), "org-1", "")
    }

    fn plan(v: serde_json::Value) -> Plan {
        Plan::new(v).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_update_description() {
        let reconciler = Reconciler::new(OrganizationKind);
        let ctx = ctx_with(MockPlatform::new());

        let created = reconciler
            .create(&ctx, &plan(json!({"name": "acme", "description": "old"})))
            .await
            .unwrap();
        assert_eq!(created.get("description"), Some(&json!("old")));

        let updated = reconciler
            .update(
                &ctx,
                &created,
                &plan(json!({"name": "acme", "description": "new"})),
            )
            .await
            .unwrap();
        assert_eq!(updated.get("description"), Some(&json!("new")));
        assert_eq!(updated.id, created.id);
    }

    #[tokio::test]
    async fn test_invite_update_is_a_conflict() {
        let reconciler = Reconciler::new(OrganizationInviteKind);
        let ctx = ctx_with(MockPlatform::new());

        let created = reconciler
            .create(&ctx, &plan(json!({"email": "dev@example.com"})))
            .await
            .unwrap();

        let err = reconciler
            .update(&ctx, &created, &plan(json!({"email": "other@example.com"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_invite_email_change_forces_replacement() {
        let reconciler = Reconciler::new(OrganizationInviteKind);
        let ctx = ctx_with(MockPlatform::new());

        let created = reconciler
            .create(&ctx, &plan(json!({"email": "dev@example.com"})))
            .await
            .unwrap();
        let result = reconciler
            .plan(Some(&created), &plan(json!({"email": "other@example.com"})))
            .unwrap();
        assert!(result.requires_replace);
    }

    #[test]
    fn test_tier_flattens_as_a_stable_single_element_set() {
        use crate::translate::{parse_timestamp, set_element_hash};

        let org = Organization {
            id: "test-id".to_string(),
            url: "https://test.url".to_string(),
            name: "test-name".to_string(),
            description: "test-description".to_string(),
            created_at: parse_timestamp("1980-01-01T01:01:01Z", "created_at").unwrap(),
            tier: Some(Tier {
                id: "free".to_string(),
                name: "Free to try".to_string(),
                has_support_plans: true,
                has_backup_uploads: true,
                requires_terms_and_conditions: true,
            }),
            ..Default::default()
        };

        let first = flatten_organization(&org);
        let second = flatten_organization(&org);

        let members = first["tier"].as_array().unwrap();
        assert_eq!(members.len(), 1);
        let member = members[0].as_object().unwrap();
        assert_eq!(member["id"], json!("free"));
        assert_eq!(member["name"], json!("Free to try"));
        assert!(member["requires_terms_and_conditions"].as_bool().unwrap());

        // Re-reading identical values yields the same set identity.
        let element = &tier_block().block;
        assert_eq!(
            set_element_hash(element, member),
            set_element_hash(element, second["tier"][0].as_object().unwrap()),
        );
    }

    #[tokio::test]
    async fn test_terms_data_source_uses_default_organization() {
        let platform = MockPlatform::new().with_terms(TermsAndConditions {
            id: "tc-3".to_string(),
            content: "the terms".to_string(),
            created_at: None,
        });
        let state = TermsAndConditionsDataSource
            .read(&ctx_with(platform), &plan(json!({})))
            .await
            .unwrap();
        assert_eq!(state.id, "tc-3");
        assert_eq!(state.get("content"), Some(&json!("the terms")));
        assert_eq!(state.get("organization"), Some(&json!("org-1")));
    }
}
