//! Oasis Provider
//!
//! This crate is the core of a declarative-infrastructure provider for the
//! ArangoDB Oasis Platform. It reconciles resource trees handed over by a
//! Host process against the Platform's gRPC API.
//!
//! # Overview
//!
//! The crate provides:
//!
//! - **Schema registry**: Typed schemas for every resource and data-source
//!   kind, with required/optional/computed attributes, nested blocks, and
//!   diff-suppression rules
//! - **Translation**: Expand plan trees into wire records and flatten wire
//!   records back into attribute trees
//! - **Reconciliation**: A single CRUD state machine driving every kind,
//!   with tombstones for vanished objects and partial-state recovery when a
//!   create's read-back fails
//! - **Default resolution**: Deployment plans may omit version, certificate,
//!   and sizing; those are resolved against the Platform's listings
//! - **Transport**: A lazily-dialed, bearer-authenticated channel to the
//!   Platform
//! - **Error types**: One error enum shared by every handler, mapped onto
//!   Host diagnostics at the boundary
//! - **Logging**: Integration with `tracing` for structured logging
//!
//! # Quick Start
//!
//! ```ignore
//! use oasis_provider::{init_logging, Context, OasisProvider, Plan};
//! use std::sync::Arc;
//!
//! # async fn run(api: Arc<dyn oasis_provider::api::PlatformApi>) -> Result<(), oasis_provider::ProviderError> {
//! init_logging();
//!
//! let provider = OasisProvider::new();
//! let ctx = Context::new(api, "org-id", "project-id");
//!
//! let plan = Plan::new(serde_json::json!({
//!     "name": "mydb",
//!     "location": [{"region": "gcp-europe-west4"}],
//!     "terms_and_conditions_accepted": true,
//! }))?;
//! let state = provider.create(&ctx, "oasis_deployment", &plan).await?;
//! println!("created {}", state.id);
//! # Ok(())
//! # }
//! ```
//!
//! # Kinds
//!
//! Thirteen resource kinds (`oasis_organization`, `oasis_organization_invite`,
//! `oasis_project`, `oasis_deployment`, `oasis_certificate`,
//! `oasis_ipallowlist`, `oasis_backup`, `oasis_backup_policy`,
//! `oasis_iam_group`, `oasis_iam_role`, `oasis_audit_log`,
//! `oasis_private_endpoint`, `oasis_example_dataset_installation`) and eight
//! data sources (`oasis_organization`, `oasis_terms_and_conditions`,
//! `oasis_project`, `oasis_backup`, `oasis_example_datasets`,
//! `oasis_example_dataset_installations`, `oasis_cloud_provider`,
//! `oasis_region`).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod defaults;
pub mod diff;
pub mod error;
pub mod kinds;
pub mod logging;
pub mod platform;
pub mod provider;
pub mod reconcile;
pub mod schema;
pub mod testing;
pub mod translate;
pub mod transport;
pub mod validation;

// Re-export main types at crate root
pub use api::{Context, PlatformApi};
pub use diff::{plan_resource, AttributeChange, ChangeSet, PlanResult};
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::OasisProvider;
pub use reconcile::{DataSource, Lifecycle, Reconciler, ResourceKind};
pub use schema::{Diagnostic, ProviderSchema, Schema};
pub use translate::{Plan, StateView};
pub use transport::{Connection, ProviderConfig, TokenExchanger};
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tonic;
pub use tracing;
