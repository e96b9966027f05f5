//! Error types for repository provisioning.
//!
//! Errors are split per component: [`RemoteError`] is what the remote gateway
//! returns, [`TemplateError`] is what the template loader returns, and [`Error`]
//! is what a provisioning run surfaces to the caller. Every [`Error`] maps to an
//! [`ErrorCategory`] so the CLI can print actionable advice.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for provisioning operations.
pub type Result<T> = std::result::Result<T, Error>;

/// HTTP status the orchestrator treats as a branch rather than a failure.
pub const STATUS_NOT_FOUND: u16 = 404;

/// Categories of provisioning errors for user feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The desired state or local setup is insufficient.
    Config,
    /// A remote resource (repository, branch, organization) does not exist.
    NotFound,
    /// The remote platform rejected a request.
    Remote,
    /// The network could not be reached.
    Network,
    /// A document could not be decoded.
    Format,
    /// A local file could not be read.
    Io,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Config => "Invalid configuration",
            Self::NotFound => "Resource not found",
            Self::Remote => "GitHub API error",
            Self::Network => "Network connectivity issue",
            Self::Format => "Invalid document format",
            Self::Io => "File access error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Config => "Check the template file and the GITHUB_TOKEN environment variable",
            Self::NotFound => "Verify the owner, repository and branch names",
            Self::Remote => "Check the token permissions and the template payload",
            Self::Network => "Check your internet connection and try again",
            Self::Format => "Validate the template file as JSON",
            Self::Io => "Check that the template path exists and is readable",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// A failed call to the remote platform.
///
/// `status` is `None` when the request never produced an HTTP response
/// (DNS, TLS, connection reset).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RemoteError {
    /// HTTP status code, if a response was received.
    pub status: Option<u16>,
    /// Human-readable description.
    pub message: String,
}

impl RemoteError {
    /// Create an error for an HTTP status response.
    pub fn from_status(status: u16) -> Self {
        Self {
            status: Some(status),
            message: format!("unexpected status code: {}", status_text(status)),
        }
    }

    /// Create an error for a failure without an HTTP response.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    /// Shorthand for a 404 response.
    pub fn not_found() -> Self {
        Self::from_status(STATUS_NOT_FOUND)
    }

    /// Whether the remote resource does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status == Some(STATUS_NOT_FOUND)
    }
}

impl From<ureq::Error> for RemoteError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::from_status(code),
            other => Self::transport(other.to_string()),
        }
    }
}

fn status_text(status: u16) -> String {
    let reason = match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => return status.to_string(),
    };
    format!("{status} {reason}")
}

/// Errors raised while loading a template document.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// The local template file could not be read.
    #[error("failed to read file {}: {cause}", .path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying IO error.
        cause: io::Error,
    },

    /// The remote template could not be downloaded.
    #[error("failed to get url {url}: {cause}")]
    Fetch {
        /// URL that was requested.
        url: String,
        /// Underlying transport or status error.
        cause: RemoteError,
    },

    /// The template bytes are not a valid desired-state document.
    #[error("failed to parse template {reference}: {cause}")]
    Parse {
        /// Path or URL of the template.
        reference: String,
        /// Underlying JSON error.
        cause: serde_json::Error,
    },
}

/// Errors that abort a provisioning run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The template could not be loaded.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// The repository does not exist and the template cannot create it.
    #[error("no repository section in template file")]
    RepoConfigNotFound,

    /// No token was provided for the GitHub API.
    #[error("GITHUB_TOKEN is not set")]
    MissingToken,

    /// Looking up the owner as an organization failed for a reason other
    /// than the organization not existing.
    #[error("failed to fetch org {owner}: {cause}")]
    OrganizationLookup {
        /// Owner that was looked up.
        owner: String,
        /// Underlying remote error.
        cause: RemoteError,
    },

    /// A branch to protect could not be fetched.
    #[error(
        "failed to get branch {branch}. check if the branch exists; if you are creating a new repository use the auto_init option: {cause}"
    )]
    BranchNotFound {
        /// Branch name.
        branch: String,
        /// Underlying remote error.
        cause: RemoteError,
    },

    /// Any other remote call failed.
    #[error("failed to {operation} {target}: {cause}")]
    Remote {
        /// What was being done, e.g. "create repo".
        operation: &'static str,
        /// What it was done to, e.g. "acme/widgets".
        target: String,
        /// Underlying remote error.
        cause: RemoteError,
    },
}

impl Error {
    /// Wrap a remote error with the failing operation and its target.
    pub fn remote(operation: &'static str, target: impl Into<String>, cause: RemoteError) -> Self {
        Self::Remote {
            operation,
            target: target.into(),
            cause,
        }
    }

    /// The remote error underlying this error, if any.
    #[must_use]
    pub fn remote_source(&self) -> Option<&RemoteError> {
        match self {
            Self::OrganizationLookup { cause, .. }
            | Self::BranchNotFound { cause, .. }
            | Self::Remote { cause, .. } => Some(cause),
            Self::Template(TemplateError::Fetch { cause, .. }) => Some(cause),
            _ => None,
        }
    }

    /// HTTP status of the underlying remote error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.remote_source().and_then(|e| e.status)
    }

    /// Get the error category for user feedback.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Template(TemplateError::Io { .. }) => ErrorCategory::Io,
            Error::Template(TemplateError::Parse { .. }) => ErrorCategory::Format,
            Error::Template(TemplateError::Fetch { cause, .. }) => match cause.status {
                Some(STATUS_NOT_FOUND) => ErrorCategory::NotFound,
                Some(_) => ErrorCategory::Remote,
                None => ErrorCategory::Network,
            },
            Error::RepoConfigNotFound | Error::MissingToken => ErrorCategory::Config,
            Error::BranchNotFound { .. } => ErrorCategory::NotFound,
            Error::OrganizationLookup { cause, .. } | Error::Remote { cause, .. } => {
                match cause.status {
                    Some(STATUS_NOT_FOUND) => ErrorCategory::NotFound,
                    Some(_) => ErrorCategory::Remote,
                    None => ErrorCategory::Network,
                }
            }
        }
    }
}
