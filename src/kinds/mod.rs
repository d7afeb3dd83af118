//! The resource and data-source kinds the provider exposes.
//!
//! Each module pairs a Platform service family with its schemas, expand and
//! flatten translations, and remote calls. The reconciler in
//! [`crate::reconcile`] drives all of them through the same state machine;
//! nothing in here sequences CRUD itself.

pub mod audit_log;
pub mod backup;
pub mod backup_policy;
pub mod certificate;
pub mod deployment;
pub mod example;
pub mod iam;
pub mod ipallowlist;
pub mod organization;
pub mod platform_ds;
pub mod private_endpoint;
pub mod project;
