//! The CRUD reconciler: one state machine shared by every resource kind.
//!
//! A kind contributes its schema, its expand/flatten translation, and its
//! remote calls; the reconciler owns the sequencing, the tombstone rules,
//! and partial-state recovery. Key invariants:
//!
//! - Every operation ends with a persisted [`StateView`]. An empty id is
//!   the tombstone: the Host drops tracking and persists no attributes.
//! - A vanished remote object is convergence, not failure: reads and
//!   deletes that hit a NotFound-classified error succeed with the
//!   tombstone.
//! - Once the Platform has assigned an id, the id is never discarded on a
//!   later step's failure. A create whose read-back fails still persists
//!   the id, so a following refresh can recover the full state.

use crate::api::Context;
use crate::diff::{changed_keys, plan_resource, ChangeSet, PlanResult};
use crate::error::ProviderError;
use crate::schema::{Diagnostic, Schema};
use crate::translate::{AttrMap, Plan, StateView};
use crate::validation;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// One managed resource kind: translation plus remote calls.
///
/// Implementations are stateless; everything per-invocation arrives through
/// the [`Context`]. The reconciler drives these hooks and owns all state
/// machine decisions, so kinds never inspect errors for NotFound themselves.
#[async_trait]
pub trait ResourceKind: Send + Sync {
    /// The Platform record this kind manages.
    type Record: Send + 'static;

    /// The kind's name, e.g. `oasis_deployment`.
    fn name(&self) -> &'static str;

    /// The kind's schema.
    fn schema(&self) -> Schema;

    /// Expand the plan into a Platform record.
    fn expand(&self, ctx: &Context, plan: &Plan) -> Result<Self::Record, ProviderError>;

    /// Flatten a Platform record into the attribute map to persist.
    fn flatten(&self, record: &Self::Record) -> AttrMap;

    /// Fill server-side defaults into an expanded record before create.
    ///
    /// Only kinds with cross-resource defaults (deployments) override this.
    async fn resolve_defaults(
        &self,
        _ctx: &Context,
        _record: &mut Self::Record,
        _plan: &Plan,
    ) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Create the record on the Platform, returning the assigned id.
    async fn remote_create(
        &self,
        ctx: &Context,
        record: Self::Record,
    ) -> Result<String, ProviderError>;

    /// Fetch the record by id.
    async fn remote_get(&self, ctx: &Context, id: &str) -> Result<Self::Record, ProviderError>;

    /// Copy the changed plan fields into the current remote record.
    ///
    /// Updates are additive: only keys the change set names are touched, so
    /// fields the plan does not manage keep their remote values.
    fn apply_changes(
        &self,
        current: &mut Self::Record,
        plan: &Plan,
        changes: &ChangeSet,
    ) -> Result<(), ProviderError>;

    /// Push the updated record to the Platform.
    async fn remote_update(&self, ctx: &Context, record: Self::Record)
        -> Result<(), ProviderError>;

    /// Delete the record by id.
    async fn remote_delete(&self, ctx: &Context, id: &str) -> Result<(), ProviderError>;

    /// Whether the Platform supports in-place updates for this kind.
    fn supports_update(&self) -> bool {
        true
    }
}

/// Object-safe lifecycle surface the provider registry dispatches through.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    /// The kind's name.
    fn name(&self) -> &'static str;
    /// The kind's schema.
    fn schema(&self) -> Schema;
    /// Validate a raw attribute tree against the kind's schema.
    fn validate(&self, tree: &Value) -> Vec<Diagnostic>;
    /// Diff prior state against a proposed plan.
    fn plan(&self, prior: Option<&StateView>, proposed: &Plan)
        -> Result<PlanResult, ProviderError>;
    /// Create the object and persist its first state.
    async fn create(&self, ctx: &Context, plan: &Plan) -> Result<StateView, ProviderError>;
    /// Refresh persisted state from the Platform.
    async fn read(&self, ctx: &Context, prior: &StateView) -> Result<StateView, ProviderError>;
    /// Apply changed fields in place and persist the post-image.
    async fn update(
        &self,
        ctx: &Context,
        prior: &StateView,
        plan: &Plan,
    ) -> Result<StateView, ProviderError>;
    /// Delete the object, tolerating an already-gone remote.
    async fn delete(&self, ctx: &Context, prior: &StateView) -> Result<StateView, ProviderError>;
}

/// A read-only data-source kind.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// The kind's name, e.g. `oasis_region`.
    fn name(&self) -> &'static str;
    /// The kind's schema.
    fn schema(&self) -> Schema;
    /// Fetch the requested data and render it as state.
    async fn read(&self, ctx: &Context, plan: &Plan) -> Result<StateView, ProviderError>;
}

/// Drives the CRUD state machine for one [`ResourceKind`].
pub struct Reconciler<K> {
    kind: K,
    schema: Schema,
}

impl<K: ResourceKind> Reconciler<K> {
    /// Wrap a kind. The schema is captured once; it is static data.
    pub fn new(kind: K) -> Self {
        let schema = kind.schema();
        Self { kind, schema }
    }

    /// Persist the post-image of a fresh record read.
    fn persist(&self, id: &str, record: &K::Record, presence: &BTreeSet<String>) -> StateView {
        StateView::persist(id, self.kind.flatten(record), presence, &self.schema)
    }
}

#[async_trait]
impl<K: ResourceKind> Lifecycle for Reconciler<K> {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn schema(&self) -> Schema {
        self.schema.clone()
    }

    fn validate(&self, tree: &Value) -> Vec<Diagnostic> {
        validation::validate(&self.schema, tree)
    }

    fn plan(
        &self,
        prior: Option<&StateView>,
        proposed: &Plan,
    ) -> Result<PlanResult, ProviderError> {
        Ok(plan_resource(&self.schema, prior, proposed))
    }

    async fn create(&self, ctx: &Context, plan: &Plan) -> Result<StateView, ProviderError> {
        let mut record = self.kind.expand(ctx, plan)?;
        self.kind.resolve_defaults(ctx, &mut record, plan).await?;

        let id = self.kind.remote_create(ctx, record).await?;
        info!(kind = self.kind.name(), id = %id, "created");

        // The id is committed. A read-back failure must not lose it, or the
        // Host would orphan the object it just paid for.
        match self.kind.remote_get(ctx, &id).await {
            Ok(created) => Ok(self.persist(&id, &created, &plan.keys())),
            Err(err) => {
                warn!(
                    kind = self.kind.name(),
                    id = %id,
                    error = %err,
                    "read-back after create failed, persisting id only"
                );
                Ok(StateView::with_id(id))
            }
        }
    }

    async fn read(&self, ctx: &Context, prior: &StateView) -> Result<StateView, ProviderError> {
        if prior.is_absent() {
            return Ok(StateView::absent());
        }
        match self.kind.remote_get(ctx, &prior.id).await {
            Ok(record) => {
                debug!(kind = self.kind.name(), id = %prior.id, "refreshed");
                Ok(self.persist(&prior.id, &record, &prior.keys()))
            }
            Err(err) if err.is_not_found() => {
                info!(kind = self.kind.name(), id = %prior.id, "vanished remotely");
                Ok(StateView::absent())
            }
            Err(err) => Err(err),
        }
    }

    async fn update(
        &self,
        ctx: &Context,
        prior: &StateView,
        plan: &Plan,
    ) -> Result<StateView, ProviderError> {
        if !self.kind.supports_update() {
            return Err(ProviderError::Conflict(format!(
                "{} does not support in-place updates; replace the resource instead",
                self.kind.name()
            )));
        }

        let mut current = self.kind.remote_get(ctx, &prior.id).await?;
        let changes = changed_keys(&self.schema, prior, plan);
        if changes.is_empty() {
            debug!(kind = self.kind.name(), id = %prior.id, "nothing to update");
            return Ok(self.persist(&prior.id, &current, &plan.keys()));
        }

        self.kind.apply_changes(&mut current, plan, &changes)?;
        let pushed = self.kind.flatten(&current);
        self.kind.remote_update(ctx, current).await?;
        info!(kind = self.kind.name(), id = %prior.id, "updated");

        match self.kind.remote_get(ctx, &prior.id).await {
            Ok(updated) => Ok(self.persist(&prior.id, &updated, &plan.keys())),
            Err(err) => {
                // The update itself succeeded. Persist the locally applied
                // record so state does not roll back past the accepted write.
                warn!(
                    kind = self.kind.name(),
                    id = %prior.id,
                    error = %err,
                    "read-back after update failed, persisting applied record"
                );
                Ok(StateView::persist(
                    &prior.id,
                    pushed,
                    &plan.keys(),
                    &self.schema,
                ))
            }
        }
    }

    async fn delete(&self, ctx: &Context, prior: &StateView) -> Result<StateView, ProviderError> {
        if prior.is_absent() {
            return Ok(StateView::absent());
        }
        match self.kind.remote_delete(ctx, &prior.id).await {
            Ok(()) => {
                info!(kind = self.kind.name(), id = %prior.id, "deleted");
                Ok(StateView::absent())
            }
            Err(err) if err.is_not_found() => {
                info!(kind = self.kind.name(), id = %prior.id, "already deleted remotely");
                Ok(StateView::absent())
            }
            Err(err) => Err(err),
        }
    }
}
