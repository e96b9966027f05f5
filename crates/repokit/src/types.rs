//! Core types for repository provisioning.
//!
//! This module contains the run inputs ([`RepoOptions`]), the desired state
//! decoded from a template document ([`DesiredConfig`] and its descriptors),
//! the typed projections of remote resources, and the run outcome
//! ([`RunResult`]).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Path the pull request template is written to.
pub const PULL_REQUEST_TEMPLATE_PATH: &str = ".github/pull_request_template.md";

/// Path the issue template is written to.
pub const ISSUE_TEMPLATE_PATH: &str = ".github/issue_template.md";

/// User intent for a single provisioning run.
///
/// Built once by the caller and never mutated during the run.
///
/// # Example
///
/// ```
/// use repokit::RepoOptions;
///
/// let opts = RepoOptions::new("acme", "widgets", "templates/service.json")
///     .description("Widget service")
///     .topics(["rust", "service"])
///     .branches(["main"]);
///
/// assert_eq!(opts.full_name(), "acme/widgets");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoOptions {
    /// Organization or user that owns the repository.
    pub owner: String,
    /// Repository name.
    pub name: String,
    /// Short description of the repository.
    pub description: String,
    /// Topics to set on the repository (order kept, duplicates allowed).
    pub topics: Vec<String>,
    /// Branches to apply protection rules to, in order.
    pub branches: Vec<String>,
    /// Template reference: local path or `https://` URL.
    pub template: String,
    /// Verbose diagnostics requested.
    pub debug: bool,
}

impl RepoOptions {
    /// Create options with the three required inputs.
    #[must_use]
    pub fn new(
        owner: impl Into<String>,
        name: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            template: template.into(),
            ..Self::default()
        }
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the topics.
    pub fn topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    /// Set the branches to protect.
    pub fn branches<I, S>(mut self, branches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.branches = branches.into_iter().map(Into::into).collect();
        self
    }

    /// Enable debug output.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// The `owner/name` form of the target repository.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

// =============================================================================
// Desired state
// =============================================================================

/// Desired state decoded from a template document.
///
/// Every field is optional in the document; unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesiredConfig {
    /// Payload for creating the repository from scratch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<RepositoryDescriptor>,
    /// Protection rules applied to every requested branch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_protection: Option<BranchProtection>,
    /// Create the repository from a template repository instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_repo: Option<TemplateRepoDescriptor>,
    /// Also require signed commits on protected branches.
    pub required_signed_commits: bool,
    /// Content of `.github/pull_request_template.md`, or a local path or
    /// `https://` URL to read it from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull_request_template: Option<String>,
    /// Content of `.github/issue_template.md`, or a reference to it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_template: Option<String>,
}

impl DesiredConfig {
    /// Whether the document says how to create a missing repository.
    #[must_use]
    pub fn can_create(&self) -> bool {
        self.repository.is_some() || self.template_repo.is_some()
    }

    /// Non-empty file templates in the order they are synchronized.
    pub fn content_files(&self) -> Vec<ContentFile<'_>> {
        [
            (
                PULL_REQUEST_TEMPLATE_PATH,
                "Add/Update Pull Request Template",
                self.pull_request_template.as_deref(),
            ),
            (
                ISSUE_TEMPLATE_PATH,
                "Add/Update Issue Template",
                self.issue_template.as_deref(),
            ),
        ]
        .into_iter()
        .filter_map(|(path, message, content)| match content {
            Some(content) if !content.is_empty() => Some(ContentFile {
                path,
                message,
                content,
            }),
            _ => None,
        })
        .collect()
    }
}

/// A file to write into the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentFile<'a> {
    /// Path inside the repository.
    pub path: &'static str,
    /// Commit message for the write.
    pub message: &'static str,
    /// Inline content or a reference to it.
    pub content: &'a str,
}

/// Create-repository payload.
///
/// Mirrors the fields GitHub accepts on `POST /orgs/{org}/repos` and
/// `POST /user/repos`. `name`, `description` and `topics` are overwritten
/// from [`RepoOptions`] before creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryDescriptor {
    /// Repository name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Short description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// URL with more information about the repository.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    /// Create a private repository.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    /// `public`, `private` or `internal`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    /// Enable issues.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_issues: Option<bool>,
    /// Enable projects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_projects: Option<bool>,
    /// Enable the wiki.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_wiki: Option<bool>,
    /// Enable discussions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_discussions: Option<bool>,
    /// Make the new repository usable as a template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_template: Option<bool>,
    /// Team granted access (organization repositories only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<u64>,
    /// Create an initial commit; needed to protect branches of a new repository.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_init: Option<bool>,
    /// `.gitignore` template name, e.g. `Rust`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gitignore_template: Option<String>,
    /// License keyword, e.g. `mit`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_template: Option<String>,
    /// Allow squash merges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_squash_merge: Option<bool>,
    /// Allow merge commits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_merge_commit: Option<bool>,
    /// Allow rebase merges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_rebase_merge: Option<bool>,
    /// Allow auto-merge on pull requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_auto_merge: Option<bool>,
    /// Offer updating pull request branches from the base branch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_update_branch: Option<bool>,
    /// Allow private forks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_forking: Option<bool>,
    /// Delete head branches once pull requests are merged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_branch_on_merge: Option<bool>,
    /// Require contributors to sign off web-based commits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_commit_signoff_required: Option<bool>,
    /// Deprecated by GitHub in favor of `squash_merge_commit_title`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_squash_pr_title_as_default: Option<bool>,
    /// `PR_TITLE` or `COMMIT_OR_PR_TITLE`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub squash_merge_commit_title: Option<String>,
    /// `PR_BODY`, `COMMIT_MESSAGES` or `BLANK`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub squash_merge_commit_message: Option<String>,
    /// `PR_TITLE` or `MERGE_MESSAGE`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_commit_title: Option<String>,
    /// `PR_BODY`, `PR_TITLE` or `BLANK`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge_commit_message: Option<String>,
    /// Topics set at creation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<String>>,
}

/// Template repository to generate the new repository from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateRepoDescriptor {
    /// Owner of the template repository; defaults to the run's owner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Name of the template repository; defaults to the run's name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    /// Copy every branch of the template, not only the default one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_all_branches: Option<bool>,
    /// Create the new repository as private.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
}

/// Body of `POST /repos/{template_owner}/{template_repo}/generate`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRepoRequest {
    /// Owner of the new repository.
    pub owner: String,
    /// Name of the new repository.
    pub name: String,
    /// Description of the new repository.
    pub description: String,
    /// Copy every branch of the template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_all_branches: Option<bool>,
    /// Create the new repository as private.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
}

/// Branch protection rules (`PUT /repos/{owner}/{repo}/branches/{branch}/protection`).
///
/// GitHub requires `required_status_checks`, `enforce_admins`,
/// `required_pull_request_reviews` and `restrictions` to be present, so
/// they serialize as `null` when unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchProtection {
    /// Status checks that must pass, or `null` to disable.
    pub required_status_checks: Option<RequiredStatusChecks>,
    /// Apply the rules to administrators too.
    pub enforce_admins: bool,
    /// Review requirements, or `null` to disable.
    pub required_pull_request_reviews: Option<PullRequestReviews>,
    /// Push restrictions, or `null` to disable.
    pub restrictions: Option<ActorAllowances>,
    /// Forbid merge commits on the branch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_linear_history: Option<bool>,
    /// Permit force pushes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_force_pushes: Option<bool>,
    /// Permit deleting the branch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_deletions: Option<bool>,
    /// Block creation of matching branches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_creations: Option<bool>,
    /// Require review conversations to be resolved before merging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_conversation_resolution: Option<bool>,
    /// Make the branch read-only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_branch: Option<bool>,
    /// Let forks sync a locked branch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_fork_syncing: Option<bool>,
}

/// Status checks that must pass before merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequiredStatusChecks {
    /// Require branches to be up to date before merging.
    pub strict: bool,
    /// Check names; superseded by `checks` on GitHub's side.
    pub contexts: Vec<String>,
    /// Checks pinned to the app that reports them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<StatusCheck>>,
}

/// A required check, optionally bound to a GitHub App.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusCheck {
    /// Check name.
    pub context: String,
    /// App that must report the check; any app when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<i64>,
}

/// Pull request review requirements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PullRequestReviews {
    /// Who may dismiss reviews.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dismissal_restrictions: Option<ActorAllowances>,
    /// Dismiss approvals when new commits are pushed.
    pub dismiss_stale_reviews: bool,
    /// Require a review from a code owner.
    pub require_code_owner_reviews: bool,
    /// Number of approvals needed.
    pub required_approving_review_count: u32,
    /// Require approval of the most recent push by someone else.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub require_last_push_approval: Option<bool>,
    /// Who may merge without the required reviews.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bypass_pull_request_allowances: Option<ActorAllowances>,
}

/// Users, teams and apps granted an exception on a protected branch.
///
/// Used for push restrictions, review dismissal and review bypass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorAllowances {
    /// User logins.
    pub users: Vec<String>,
    /// Team slugs.
    pub teams: Vec<String>,
    /// App slugs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apps: Option<Vec<String>>,
}

// =============================================================================
// Remote resources
// =============================================================================

/// An organization as returned by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    /// Organization login.
    pub login: String,
}

/// A repository as returned by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// `owner/name`.
    pub full_name: String,
    /// Default branch, absent for empty repositories.
    #[serde(default)]
    pub default_branch: Option<String>,
    /// Whether the repository is private.
    #[serde(default)]
    pub private: bool,
}

/// A branch as returned by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Branch name.
    pub name: String,
    /// Whether protection rules are already set.
    #[serde(default)]
    pub protected: bool,
}

/// Metadata of an existing file in a repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    /// Path inside the repository.
    pub path: String,
    /// Blob sha, required to update the file.
    pub sha: String,
}

/// A create-or-update write of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpdate {
    /// Commit message.
    pub message: String,
    /// Raw file bytes.
    pub content: Vec<u8>,
    /// Sha of the file being replaced; `None` creates the file.
    pub sha: Option<String>,
}

// =============================================================================
// Outcome
// =============================================================================

/// Outcome of a provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// `owner/name` of the target repository.
    pub full_name: String,
    /// Whether the repository was created during this run.
    pub created: bool,
}

impl RunResult {
    /// Build the result for a run.
    #[must_use]
    pub fn new(opts: &RepoOptions, created: bool) -> Self {
        Self {
            full_name: opts.full_name(),
            created,
        }
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.created {
            write!(f, "{} created", self.full_name)
        } else {
            write!(f, "{} already exists", self.full_name)
        }
    }
}
