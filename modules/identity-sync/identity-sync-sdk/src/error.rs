//! Error types shared by every identity-sync connector.

use thiserror::Error;

/// Boxed upstream failure carried by [`ConnectorError::Upstream`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by resource builders, mutation handlers and the sync driver.
///
/// Builders never recover from an error locally except for the
/// nothing-to-revoke case, which is reported as a successful revoke carrying
/// [`Annotation::GrantAlreadyRevoked`](crate::Annotation::GrantAlreadyRevoked).
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The host supplied a page token that is not a decimal page number.
    #[error("failed to parse page token '{token}': expected a decimal page number")]
    BadPageToken { token: String },

    /// A call to the upstream service failed.
    #[error("{operation}: {source}")]
    Upstream {
        operation: String,
        #[source]
        source: BoxError,
    },

    /// A mutation received a profile that is missing a required field or
    /// carries it with the wrong shape.
    #[error("{field} {reason}")]
    ProfileContract { field: String, reason: String },

    /// Account creation resolved none of the requested teams.
    #[error("no teams found for the given names in organization '{organization}'")]
    NoTeamsFound { organization: String },

    /// The host cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// The builder does not implement the requested capability.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ConnectorError {
    pub fn upstream(
        operation: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Upstream {
            operation: operation.into(),
            source: source.into(),
        }
    }

    pub fn profile_contract(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProfileContract {
            field: field.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
