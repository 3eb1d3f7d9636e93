//! Error types for the Clerk provider.
//!
//! Errors are layered: [`ClientError`] describes what went wrong with a single
//! HTTP exchange, [`RemoteError`] names the organization operation that
//! failed, and [`ProviderError`] is what a lifecycle callback reports back to
//! the host.

use std::fmt;

use thiserror::Error;

use crate::schema::Diagnostic;

/// The remote operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `POST /organizations`
    Create,
    /// `GET /organizations/{id}`
    Get,
    /// `PATCH /organizations/{id}`
    Update,
    /// `DELETE /organizations/{id}`
    Delete,
}

impl Operation {
    /// The verb used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Get => "get",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single request against the Clerk API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request could not be sent or the response could not be received.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API answered 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// The API answered with a non-success status.
    #[error("API returned status {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the error body.
        message: String,
    },

    /// The response body was not a valid organization.
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured base URL cannot carry a path.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

/// A [`ClientError`] annotated with the failed operation.
#[derive(Debug, Error)]
#[error("failed to {operation} organization: {source}")]
pub struct RemoteError {
    /// The operation that failed.
    pub operation: Operation,
    /// The underlying failure.
    #[source]
    pub source: ClientError,
}

impl RemoteError {
    /// Wrap a client error for the given operation.
    pub fn new(operation: Operation, source: ClientError) -> Self {
        Self { operation, source }
    }

    /// Returns true if the organization does not exist on the remote side.
    pub fn is_not_found(&self) -> bool {
        matches!(self.source, ClientError::NotFound(_))
    }
}

/// Errors reported by lifecycle callbacks.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Caller-supplied configuration is malformed. Never sent to the API.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The provider is missing configuration it needs.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Creating the organization failed.
    #[error("Could not create organization: {0}")]
    Create(#[source] RemoteError),

    /// Reading the organization failed.
    #[error("Could not read organization ID {id}: {source}")]
    Read {
        /// The organization identifier.
        id: String,
        /// The remote failure.
        #[source]
        source: RemoteError,
    },

    /// Updating the organization failed.
    #[error("Could not update organization ID {id}: {source}")]
    Update {
        /// The organization identifier.
        id: String,
        /// The remote failure.
        #[source]
        source: RemoteError,
    },

    /// Deleting the organization failed.
    #[error("Could not delete organization ID {id}: {source}")]
    Delete {
        /// The organization identifier.
        id: String,
        /// The remote failure.
        #[source]
        source: RemoteError,
    },

    /// The mutation succeeded but the confirmatory read did not.
    ///
    /// The remote organization reflects the mutation; local state may not.
    #[error("Could not read organization ID {id} after {operation}: {source}")]
    ReadAfterWrite {
        /// The mutation that preceded the read.
        operation: Operation,
        /// The organization identifier.
        id: String,
        /// The remote failure.
        #[source]
        source: RemoteError,
    },

    /// The requested resource type is not served by this provider.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// Prior or planned state is inconsistent with the requested operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// State could not be converted to or from JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProviderError {
    /// The remote failure behind this error, if any.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            Self::Create(source) => Some(source),
            Self::Read { source, .. }
            | Self::Update { source, .. }
            | Self::Delete { source, .. }
            | Self::ReadAfterWrite { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Returns true if the failure was caused by a missing organization.
    pub fn is_not_found(&self) -> bool {
        self.remote().is_some_and(RemoteError::is_not_found)
    }

    /// Short title for the diagnostic shown to the operator.
    pub fn summary(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Invalid configuration",
            Self::Configuration(_) => "Provider configuration error",
            Self::Create(_) => "Error creating organization",
            Self::Read { .. } => "Error reading organization",
            Self::Update { .. } => "Error updating organization",
            Self::Delete { .. } => "Error deleting organization",
            Self::ReadAfterWrite {
                operation: Operation::Create,
                ..
            } => "Error reading organization after create",
            Self::ReadAfterWrite { .. } => "Error reading organization after update",
            Self::UnknownResource(_) => "Unsupported resource type",
            Self::InvalidState(_) => "Invalid resource state",
            Self::Serialization(_) => "Error decoding resource state",
        }
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(err: ProviderError) -> Self {
        let mut detail = err.to_string();
        if let ProviderError::ReadAfterWrite {
            operation: Operation::Create,
            id,
            ..
        } = &err
        {
            detail.push_str(&format!(
                ". The organization exists remotely; import it with ID {} to resume managing it",
                id
            ));
        }
        Diagnostic::error(err.summary()).with_detail(detail)
    }
}
