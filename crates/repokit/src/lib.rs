//! # repokit
//!
//! Declarative GitHub repository provisioning.
//!
//! This crate provides functionality for:
//! - Loading a desired-state template from a local file or an `https://` URL
//! - Creating a repository from scratch or from a template repository
//! - Replacing topics and writing pull request / issue templates
//! - Protecting branches and requiring signed commits
//!
//! Every step is idempotent; running the same template twice converges to
//! the same repository.
//!
//! ## Example
//!
//! ```no_run
//! use repokit::{Client, RepoOptions};
//!
//! let client = Client::from_env().expect("GITHUB_TOKEN is not set");
//!
//! let opts = RepoOptions::new("acme", "widgets", "templates/service.json")
//!     .description("Widget service")
//!     .topics(["rust"])
//!     .branches(["main"]);
//!
//! let result = client.provision(&opts).expect("provisioning failed");
//! println!("{} (created: {})", result.full_name, result.created);
//! ```
//!
//! ## Template Document
//!
//! | Field                     | Effect                                         |
//! |---------------------------|------------------------------------------------|
//! | `repository`              | create-repository payload                      |
//! | `template_repo`           | generate from a template repository instead    |
//! | `branch_protection`       | rules applied to every `--branches` entry      |
//! | `required_signed_commits` | also require signed commits on those branches  |
//! | `pull_request_template`   | content of `.github/pull_request_template.md`  |
//! | `issue_template`          | content of `.github/issue_template.md`         |
//!
//! The two file templates hold either the content itself, a path to a local
//! file, or an `https://` URL to download it from.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod reconcile;
pub mod template;
pub mod types;

pub use error::{Error, ErrorCategory, RemoteError, Result, TemplateError};
pub use types::{
    BranchProtection, DesiredConfig, RepoOptions, RepositoryDescriptor, RunResult,
    TemplateRepoDescriptor,
};

use backend::Backend;
pub use backend::MockBackend;
use backend::github::GitHubBackend;

/// User agent sent with every HTTP request.
pub(crate) const USER_AGENT: &str = concat!("repokit/", env!("CARGO_PKG_VERSION"));

/// High-level client for provisioning repositories.
///
/// # Example
///
/// ```
/// use repokit::{Client, MockBackend, RepoOptions, DesiredConfig};
///
/// let mock = MockBackend::new().with_repository("acme", "widgets");
/// let client = Client::with_backend(Box::new(mock));
///
/// let opts = RepoOptions::new("acme", "widgets", "unused.json");
/// let result = client.apply(&opts, DesiredConfig::default()).unwrap();
/// assert!(!result.created);
/// ```
pub struct Client {
    backend: Box<dyn Backend>,
}

impl Client {
    /// Create a client talking to GitHub, configured from the environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            backend: Box::new(GitHubBackend::from_env()?),
        })
    }

    /// Create a client with a custom backend (useful for testing).
    #[must_use]
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Load the template referenced by `opts` and reconcile the repository.
    pub fn provision(&self, opts: &RepoOptions) -> Result<RunResult> {
        reconcile::run(self.backend.as_ref(), opts)
    }

    /// Reconcile the repository against an already loaded desired state.
    pub fn apply(&self, opts: &RepoOptions, config: DesiredConfig) -> Result<RunResult> {
        reconcile::apply(self.backend.as_ref(), opts, config)
    }
}
