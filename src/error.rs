//! Error types for the Oasis provider core.
//!
//! The taxonomy mirrors how handlers fail: schema parsing during expand,
//! remote rejections from the Platform, missing implicit dependencies during
//! default resolution, and plan-level conflicts. Every handler surfaces
//! errors to the Host as a diagnostic list; `NotFound` is additionally
//! recoverable locally on read and delete paths.

use crate::schema::Diagnostic;
use thiserror::Error;

/// Errors that can occur while reconciling a resource or data source.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// A required field was missing or malformed during expand.
    #[error("failed to parse field '{field}': {message}")]
    SchemaParse {
        /// Dotted attribute path of the offending field.
        field: String,
        /// What went wrong.
        message: String,
    },

    /// The Platform rejected a request; the remote status is kept verbatim.
    #[error("platform call failed: {0}")]
    RemoteCall(tonic::Status),

    /// The Platform reports the id does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The default resolver could not find an implicit dependency.
    #[error("missing precondition: {0}")]
    PreconditionMissing(String),

    /// The plan violates a server-side uniqueness or mutability rule.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Provider-level configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The requested kind is not in the registry.
    #[error("unknown kind: {0}")]
    UnknownKind(String),

    /// Establishing the channel to the Platform failed.
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// Encoding or decoding an attribute tree failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProviderError {
    /// Construct a [`ProviderError::SchemaParse`] for the given field.
    pub fn schema_parse(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchemaParse {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Construct a [`ProviderError::SchemaParse`] for a missing required field.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::schema_parse(field, "required field is missing or empty")
    }

    /// Whether this error means the remote object does not exist.
    ///
    /// Read and delete handlers treat this as recoverable: the id is cleared
    /// and the operation reports success.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::RemoteCall(status) => status.code() == tonic::Code::NotFound,
            _ => false,
        }
    }

    /// Render this error as a single-element diagnostic list for the Host.
    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        let diag = match &self {
            Self::SchemaParse { field, .. } => {
                Diagnostic::error(self.to_string()).with_attribute(field.clone())
            }
            _ => Diagnostic::error(self.to_string()),
        };
        vec![diag]
    }
}

impl From<tonic::Status> for ProviderError {
    /// Classify a remote status into the provider taxonomy.
    ///
    /// `NotFound` and `AlreadyExists` carry recovery semantics of their own;
    /// everything else is surfaced verbatim as [`ProviderError::RemoteCall`].
    fn from(status: tonic::Status) -> Self {
        match status.code() {
            tonic::Code::NotFound => Self::NotFound(status.message().to_string()),
            tonic::Code::AlreadyExists => Self::Conflict(status.message().to_string()),
            _ => Self::RemoteCall(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_parse_display_names_field() {
        let err = ProviderError::missing_field("cidr_ranges.1");
        assert_eq!(
            format!("{}", err),
            "failed to parse field 'cidr_ranges.1': required field is missing or empty"
        );
    }

    #[test]
    fn test_status_classification() {
        let err: ProviderError = tonic::Status::not_found("deployment gone").into();
        assert!(matches!(err, ProviderError::NotFound(_)));
        assert!(err.is_not_found());

        let err: ProviderError = tonic::Status::already_exists("duplicate name").into();
        assert!(matches!(err, ProviderError::Conflict(_)));

        let err: ProviderError = tonic::Status::permission_denied("no access").into();
        assert!(matches!(err, ProviderError::RemoteCall(_)));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_remote_not_found_status_is_recoverable() {
        let err = ProviderError::RemoteCall(tonic::Status::not_found("x"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_into_diagnostics_carries_attribute_path() {
        let diags = ProviderError::missing_field("name").into_diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].attribute, Some("name".to_string()));

        let diags = ProviderError::Conflict("taken".to_string()).into_diagnostics();
        assert_eq!(diags[0].attribute, None);
    }
}
