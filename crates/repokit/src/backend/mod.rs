//! Remote gateway trait and implementations.
//!
//! The [`Backend`] trait is the complete set of remote capabilities a
//! provisioning run uses. The production implementation is
//! [`github::GitHubBackend`]; [`MockBackend`] keeps remote state in memory and
//! records every call, for tests.
//!
//! # Testing
//!
//! ```
//! use repokit::backend::{Backend, MockBackend, Operation};
//!
//! let mock = MockBackend::new().with_repository("acme", "widgets");
//! assert!(mock.fetch_repository("acme", "widgets").is_ok());
//! assert!(mock.fetch_repository("acme", "gadgets").unwrap_err().is_not_found());
//!
//! mock.fail(Operation::ReplaceTopics, 500);
//! assert!(mock.replace_topics("acme", "widgets", &["rust".to_string()]).is_err());
//! ```

pub mod github;

use crate::error::RemoteError;
use crate::types::{
    Branch, BranchProtection, FileContent, FileUpdate, Organization, Repository,
    RepositoryDescriptor, TemplateRepoRequest,
};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Result type for gateway calls.
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Remote repository-management capabilities.
///
/// Implementations hold no state across calls that affects results; every
/// failure carries the HTTP status it was caused by.
pub trait Backend: Send + Sync {
    /// Fetch an organization.
    fn fetch_organization(&self, owner: &str) -> RemoteResult<Organization>;

    /// Fetch a repository.
    fn fetch_repository(&self, owner: &str, name: &str) -> RemoteResult<Repository>;

    /// Create a repository from scratch.
    ///
    /// `owner` is the organization to create under; `None` creates the
    /// repository for the authenticated user.
    fn create_repository(
        &self,
        owner: Option<&str>,
        descriptor: &RepositoryDescriptor,
    ) -> RemoteResult<Repository>;

    /// Create a repository by generating it from a template repository.
    fn create_repository_from_template(
        &self,
        template_owner: &str,
        template_repo: &str,
        request: &TemplateRepoRequest,
    ) -> RemoteResult<Repository>;

    /// Fetch a branch.
    fn fetch_branch(&self, owner: &str, repo: &str, branch: &str) -> RemoteResult<Branch>;

    /// Replace the protection rules of a branch.
    fn update_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        rules: &BranchProtection,
    ) -> RemoteResult<()>;

    /// Require signed commits on a protected branch.
    fn require_signed_commits(&self, owner: &str, repo: &str, branch: &str) -> RemoteResult<()>;

    /// Replace all topics of a repository.
    fn replace_topics(&self, owner: &str, repo: &str, topics: &[String]) -> RemoteResult<()>;

    /// Fetch the metadata of a file.
    fn get_file_content(&self, owner: &str, repo: &str, path: &str) -> RemoteResult<FileContent>;

    /// Create a file, or update it when `update.sha` is set.
    fn create_or_update_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        update: &FileUpdate,
    ) -> RemoteResult<()>;
}

/// Gateway operations, used to script and inspect [`MockBackend`].
///
/// One variant per [`Backend`] method, displayed as the method name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// [`Backend::fetch_organization`].
    FetchOrganization,
    /// [`Backend::fetch_repository`].
    FetchRepository,
    /// [`Backend::create_repository`].
    CreateRepository,
    /// [`Backend::create_repository_from_template`].
    CreateRepositoryFromTemplate,
    /// [`Backend::fetch_branch`].
    FetchBranch,
    /// [`Backend::update_branch_protection`].
    UpdateBranchProtection,
    /// [`Backend::require_signed_commits`].
    RequireSignedCommits,
    /// [`Backend::replace_topics`].
    ReplaceTopics,
    /// [`Backend::get_file_content`].
    GetFileContent,
    /// [`Backend::create_or_update_file_content`].
    CreateOrUpdateFileContent,
}

impl Operation {
    /// Whether the operation changes remote state.
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Self::FetchOrganization
                | Self::FetchRepository
                | Self::FetchBranch
                | Self::GetFileContent
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FetchOrganization => "fetch_organization",
            Self::FetchRepository => "fetch_repository",
            Self::CreateRepository => "create_repository",
            Self::CreateRepositoryFromTemplate => "create_repository_from_template",
            Self::FetchBranch => "fetch_branch",
            Self::UpdateBranchProtection => "update_branch_protection",
            Self::RequireSignedCommits => "require_signed_commits",
            Self::ReplaceTopics => "replace_topics",
            Self::GetFileContent => "get_file_content",
            Self::CreateOrUpdateFileContent => "create_or_update_file_content",
        };
        f.write_str(name)
    }
}

/// A call received by [`MockBackend`], with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// Organization lookup.
    FetchOrganization {
        /// Target owner.
        owner: String,
    },
    /// Repository probe.
    FetchRepository {
        /// Target owner.
        owner: String,
        /// Target repository name.
        name: String,
    },
    /// Repository creation.
    CreateRepository {
        /// Target organization; `None` for the authenticated user.
        owner: Option<String>,
        /// Creation payload.
        descriptor: RepositoryDescriptor,
    },
    /// Generation from a template repository.
    CreateRepositoryFromTemplate {
        /// Owner of the template repository.
        template_owner: String,
        /// Name of the template repository.
        template_repo: String,
        /// Generation payload, naming the new repository.
        request: TemplateRepoRequest,
    },
    /// Branch lookup.
    FetchBranch {
        /// Target owner.
        owner: String,
        /// Target repository name.
        repo: String,
        /// Branch name.
        branch: String,
    },
    /// Protection rules write.
    UpdateBranchProtection {
        /// Target owner.
        owner: String,
        /// Target repository name.
        repo: String,
        /// Branch name.
        branch: String,
        /// Protection rules.
        rules: BranchProtection,
    },
    /// Signed commits requirement.
    RequireSignedCommits {
        /// Target owner.
        owner: String,
        /// Target repository name.
        repo: String,
        /// Branch name.
        branch: String,
    },
    /// Topics replacement.
    ReplaceTopics {
        /// Target owner.
        owner: String,
        /// Target repository name.
        repo: String,
        /// New topics.
        topics: Vec<String>,
    },
    /// File metadata lookup.
    GetFileContent {
        /// Target owner.
        owner: String,
        /// Target repository name.
        repo: String,
        /// Path inside the repository.
        path: String,
    },
    /// File write.
    CreateOrUpdateFileContent {
        /// Target owner.
        owner: String,
        /// Target repository name.
        repo: String,
        /// Path inside the repository.
        path: String,
        /// Write payload.
        update: FileUpdate,
    },
}

impl Call {
    /// The operation this call invoked.
    #[must_use]
    pub fn operation(&self) -> Operation {
        match self {
            Self::FetchOrganization { .. } => Operation::FetchOrganization,
            Self::FetchRepository { .. } => Operation::FetchRepository,
            Self::CreateRepository { .. } => Operation::CreateRepository,
            Self::CreateRepositoryFromTemplate { .. } => Operation::CreateRepositoryFromTemplate,
            Self::FetchBranch { .. } => Operation::FetchBranch,
            Self::UpdateBranchProtection { .. } => Operation::UpdateBranchProtection,
            Self::RequireSignedCommits { .. } => Operation::RequireSignedCommits,
            Self::ReplaceTopics { .. } => Operation::ReplaceTopics,
            Self::GetFileContent { .. } => Operation::GetFileContent,
            Self::CreateOrUpdateFileContent { .. } => Operation::CreateOrUpdateFileContent,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    organizations: HashSet<String>,
    repositories: HashSet<String>,
    branches: HashSet<String>,
    files: HashMap<String, String>,
    failures: HashMap<Operation, u16>,
    calls: Vec<Call>,
}

/// In-memory backend for testing without network access.
///
/// Repositories, organizations, branches and files exist only once added;
/// everything else answers 404. Creating a repository makes it exist, and
/// a repository created with `auto_init` gets its default branch. Any
/// operation can be scripted to fail with a status via [`MockBackend::fail`].
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an organization.
    #[must_use]
    pub fn with_organization(self, owner: &str) -> Self {
        self.lock().organizations.insert(owner.to_string());
        self
    }

    /// Add an existing repository.
    #[must_use]
    pub fn with_repository(self, owner: &str, name: &str) -> Self {
        self.lock().repositories.insert(repo_key(owner, name));
        self
    }

    /// Add an existing branch.
    #[must_use]
    pub fn with_branch(self, owner: &str, repo: &str, branch: &str) -> Self {
        self.lock().branches.insert(branch_key(owner, repo, branch));
        self
    }

    /// Add an existing file with its blob sha.
    #[must_use]
    pub fn with_file(self, owner: &str, repo: &str, path: &str, sha: &str) -> Self {
        self.lock()
            .files
            .insert(file_key(owner, repo, path), sha.to_string());
        self
    }

    /// Make every call of `operation` fail with `status`.
    pub fn fail(&self, operation: Operation, status: u16) {
        self.lock().failures.insert(operation, status);
    }

    /// All calls received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Operations received so far, in order.
    #[must_use]
    pub fn operations(&self) -> Vec<Operation> {
        self.lock().calls.iter().map(Call::operation).collect()
    }

    /// Number of calls received for `operation`.
    #[must_use]
    pub fn count(&self, operation: Operation) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    /// Number of calls that changed remote state.
    #[must_use]
    pub fn mutating_calls(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation().is_mutating())
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Record `call` and return the scripted failure for it, if any.
    fn record(&self, call: Call) -> (std::sync::MutexGuard<'_, MockState>, RemoteResult<()>) {
        let mut state = self.lock();
        let operation = call.operation();
        state.calls.push(call);
        let result = match state.failures.get(&operation) {
            Some(status) => Err(RemoteError::from_status(*status)),
            None => Ok(()),
        };
        (state, result)
    }
}

fn repo_key(owner: &str, name: &str) -> String {
    format!("{owner}/{name}")
}

fn branch_key(owner: &str, repo: &str, branch: &str) -> String {
    format!("{owner}/{repo}#{branch}")
}

fn file_key(owner: &str, repo: &str, path: &str) -> String {
    format!("{owner}/{repo}:{path}")
}

fn mock_repository(full_name: String, private: bool) -> Repository {
    Repository {
        full_name,
        default_branch: Some("main".to_string()),
        private,
    }
}

impl Backend for MockBackend {
    fn fetch_organization(&self, owner: &str) -> RemoteResult<Organization> {
        let (state, result) = self.record(Call::FetchOrganization {
            owner: owner.to_string(),
        });
        result?;
        if state.organizations.contains(owner) {
            Ok(Organization {
                login: owner.to_string(),
            })
        } else {
            Err(RemoteError::not_found())
        }
    }

    fn fetch_repository(&self, owner: &str, name: &str) -> RemoteResult<Repository> {
        let (state, result) = self.record(Call::FetchRepository {
            owner: owner.to_string(),
            name: name.to_string(),
        });
        result?;
        let key = repo_key(owner, name);
        if state.repositories.contains(&key) {
            Ok(mock_repository(key, false))
        } else {
            Err(RemoteError::not_found())
        }
    }

    fn create_repository(
        &self,
        owner: Option<&str>,
        descriptor: &RepositoryDescriptor,
    ) -> RemoteResult<Repository> {
        let (mut state, result) = self.record(Call::CreateRepository {
            owner: owner.map(str::to_string),
            descriptor: descriptor.clone(),
        });
        result?;
        // The mock has no notion of the authenticated user; personal
        // repositories are keyed under "@me".
        let owner = owner.unwrap_or("@me");
        let name = descriptor.name.clone().unwrap_or_default();
        let key = repo_key(owner, &name);
        if descriptor.auto_init == Some(true) {
            state.branches.insert(branch_key(owner, &name, "main"));
        }
        state.repositories.insert(key.clone());
        Ok(mock_repository(key, descriptor.private.unwrap_or(false)))
    }

    fn create_repository_from_template(
        &self,
        template_owner: &str,
        template_repo: &str,
        request: &TemplateRepoRequest,
    ) -> RemoteResult<Repository> {
        let (mut state, result) = self.record(Call::CreateRepositoryFromTemplate {
            template_owner: template_owner.to_string(),
            template_repo: template_repo.to_string(),
            request: request.clone(),
        });
        result?;
        let key = repo_key(&request.owner, &request.name);
        state
            .branches
            .insert(branch_key(&request.owner, &request.name, "main"));
        state.repositories.insert(key.clone());
        Ok(mock_repository(key, request.private.unwrap_or(false)))
    }

    fn fetch_branch(&self, owner: &str, repo: &str, branch: &str) -> RemoteResult<Branch> {
        let (state, result) = self.record(Call::FetchBranch {
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: branch.to_string(),
        });
        result?;
        if state.branches.contains(&branch_key(owner, repo, branch)) {
            Ok(Branch {
                name: branch.to_string(),
                protected: false,
            })
        } else {
            Err(RemoteError::not_found())
        }
    }

    fn update_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        rules: &BranchProtection,
    ) -> RemoteResult<()> {
        let (_state, result) = self.record(Call::UpdateBranchProtection {
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: branch.to_string(),
            rules: rules.clone(),
        });
        result
    }

    fn require_signed_commits(&self, owner: &str, repo: &str, branch: &str) -> RemoteResult<()> {
        let (_state, result) = self.record(Call::RequireSignedCommits {
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: branch.to_string(),
        });
        result
    }

    fn replace_topics(&self, owner: &str, repo: &str, topics: &[String]) -> RemoteResult<()> {
        let (_state, result) = self.record(Call::ReplaceTopics {
            owner: owner.to_string(),
            repo: repo.to_string(),
            topics: topics.to_vec(),
        });
        result
    }

    fn get_file_content(&self, owner: &str, repo: &str, path: &str) -> RemoteResult<FileContent> {
        let (state, result) = self.record(Call::GetFileContent {
            owner: owner.to_string(),
            repo: repo.to_string(),
            path: path.to_string(),
        });
        result?;
        state
            .files
            .get(&file_key(owner, repo, path))
            .map(|sha| FileContent {
                path: path.to_string(),
                sha: sha.clone(),
            })
            .ok_or_else(RemoteError::not_found)
    }

    fn create_or_update_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        update: &FileUpdate,
    ) -> RemoteResult<()> {
        let (mut state, result) = self.record(Call::CreateOrUpdateFileContent {
            owner: owner.to_string(),
            repo: repo.to_string(),
            path: path.to_string(),
            update: update.clone(),
        });
        result?;
        let revision = state.calls.len();
        state
            .files
            .insert(file_key(owner, repo, path), format!("sha-{revision}"));
        Ok(())
    }
}
