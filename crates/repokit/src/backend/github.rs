//! GitHub REST API backend.
//!
//! This module provides [`GitHubBackend`], the [`Backend`] implementation that
//! talks to the GitHub REST API (or a GitHub Enterprise server) with a
//! blocking HTTP agent.
//!
//! # Authentication
//!
//! Every request carries the token as a bearer credential. Creating
//! repositories and changing branch protection need a token with `repo`
//! scope (and `admin:org` for organization repositories).

use crate::backend::{Backend, RemoteResult};
use crate::error::{Error, Result};
use crate::types::{
    Branch, BranchProtection, FileContent, FileUpdate, Organization, Repository,
    RepositoryDescriptor, TemplateRepoRequest,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

/// Default GitHub API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Environment variable holding the API token.
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";

/// Environment variable overriding the API base URL.
pub const API_URL_ENV: &str = "GITHUB_API_URL";

const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

/// GitHub REST API backend.
///
/// # Example
///
/// ```no_run
/// use repokit::backend::Backend;
/// use repokit::backend::github::GitHubBackend;
///
/// let backend = GitHubBackend::from_env().unwrap();
/// let repo = backend.fetch_repository("rust-lang", "rust").unwrap();
/// println!("default branch: {:?}", repo.default_branch);
/// ```
pub struct GitHubBackend {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// GitHub API base URL.
    api_base: String,
    /// Bearer token.
    token: String,
}

impl GitHubBackend {
    /// Create a backend for the public GitHub API.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_api_base(token, DEFAULT_API_BASE)
    }

    /// Create a backend with a custom API base (GitHub Enterprise, testing).
    pub fn with_api_base(token: impl Into<String>, api_base: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(Error::MissingToken);
        }

        Ok(Self {
            agent: ureq::Agent::new_with_defaults(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Create a backend from `GITHUB_TOKEN` and the optional `GITHUB_API_URL`.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(TOKEN_ENV).unwrap_or_default();
        let api_base =
            std::env::var(API_URL_ENV).unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        Self::with_api_base(token, api_base)
    }

    /// Get the current API base URL.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn org_url(&self, owner: &str) -> String {
        self.url(&format!("/orgs/{owner}"))
    }

    fn repo_url(&self, owner: &str, repo: &str) -> String {
        self.url(&format!("/repos/{owner}/{repo}"))
    }

    fn create_repo_url(&self, owner: Option<&str>) -> String {
        match owner {
            Some(org) => self.url(&format!("/orgs/{org}/repos")),
            None => self.url("/user/repos"),
        }
    }

    fn generate_url(&self, template_owner: &str, template_repo: &str) -> String {
        format!("{}/generate", self.repo_url(template_owner, template_repo))
    }

    fn branch_url(&self, owner: &str, repo: &str, branch: &str) -> String {
        format!("{}/branches/{branch}", self.repo_url(owner, repo))
    }

    fn protection_url(&self, owner: &str, repo: &str, branch: &str) -> String {
        format!("{}/protection", self.branch_url(owner, repo, branch))
    }

    fn signatures_url(&self, owner: &str, repo: &str, branch: &str) -> String {
        format!(
            "{}/required_signatures",
            self.protection_url(owner, repo, branch)
        )
    }

    fn topics_url(&self, owner: &str, repo: &str) -> String {
        format!("{}/topics", self.repo_url(owner, repo))
    }

    fn contents_url(&self, owner: &str, repo: &str, path: &str) -> String {
        format!("{}/contents/{path}", self.repo_url(owner, repo))
    }

    fn authorization(&self) -> String {
        format!("Bearer {}", self.token)
    }

    fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> RemoteResult<T> {
        log::trace!("GET {url}");
        let value = self
            .agent
            .get(url)
            .header("Accept", ACCEPT)
            .header("Authorization", self.authorization())
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", crate::USER_AGENT)
            .call()?
            .body_mut()
            .read_json()?;
        Ok(value)
    }

    fn post<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> RemoteResult<T> {
        log::trace!("POST {url}");
        let value = self
            .agent
            .post(url)
            .header("Accept", ACCEPT)
            .header("Authorization", self.authorization())
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", crate::USER_AGENT)
            .send_json(body)?
            .body_mut()
            .read_json()?;
        Ok(value)
    }

    fn post_empty(&self, url: &str) -> RemoteResult<()> {
        log::trace!("POST {url}");
        self.agent
            .post(url)
            .header("Accept", ACCEPT)
            .header("Authorization", self.authorization())
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", crate::USER_AGENT)
            .send_empty()?;
        Ok(())
    }

    fn put<B: Serialize>(&self, url: &str, body: &B) -> RemoteResult<()> {
        log::trace!("PUT {url}");
        self.agent
            .put(url)
            .header("Accept", ACCEPT)
            .header("Authorization", self.authorization())
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", crate::USER_AGENT)
            .send_json(body)?;
        Ok(())
    }
}

impl Backend for GitHubBackend {
    fn fetch_organization(&self, owner: &str) -> RemoteResult<Organization> {
        log::debug!("fetching org {owner}");
        self.get(&self.org_url(owner))
    }

    fn fetch_repository(&self, owner: &str, name: &str) -> RemoteResult<Repository> {
        log::debug!("fetching repo {owner}/{name}");
        self.get(&self.repo_url(owner, name))
    }

    fn create_repository(
        &self,
        owner: Option<&str>,
        descriptor: &RepositoryDescriptor,
    ) -> RemoteResult<Repository> {
        log::debug!(
            "creating repo {:?} under {}",
            descriptor.name,
            owner.unwrap_or("the authenticated user")
        );
        self.post(&self.create_repo_url(owner), descriptor)
    }

    fn create_repository_from_template(
        &self,
        template_owner: &str,
        template_repo: &str,
        request: &TemplateRepoRequest,
    ) -> RemoteResult<Repository> {
        log::debug!(
            "creating repo {}/{} from template {template_owner}/{template_repo}",
            request.owner,
            request.name
        );
        self.post(&self.generate_url(template_owner, template_repo), request)
    }

    fn fetch_branch(&self, owner: &str, repo: &str, branch: &str) -> RemoteResult<Branch> {
        log::debug!("fetching branch {branch} of {owner}/{repo}");
        self.get(&self.branch_url(owner, repo, branch))
    }

    fn update_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        rules: &BranchProtection,
    ) -> RemoteResult<()> {
        log::debug!("setting branch protection rules on {branch}");
        self.put(&self.protection_url(owner, repo, branch), rules)
    }

    fn require_signed_commits(&self, owner: &str, repo: &str, branch: &str) -> RemoteResult<()> {
        log::debug!("setting branch protection rules for signed commits on {branch}");
        self.post_empty(&self.signatures_url(owner, repo, branch))
    }

    fn replace_topics(&self, owner: &str, repo: &str, topics: &[String]) -> RemoteResult<()> {
        log::debug!("replacing topics on {owner}/{repo}: {topics:?}");
        self.put(&self.topics_url(owner, repo), &TopicsBody { names: topics })
    }

    fn get_file_content(&self, owner: &str, repo: &str, path: &str) -> RemoteResult<FileContent> {
        log::debug!("fetching file {owner}/{repo}/{path}");
        self.get(&self.contents_url(owner, repo, path))
    }

    fn create_or_update_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        update: &FileUpdate,
    ) -> RemoteResult<()> {
        log::debug!("writing file {owner}/{repo}/{path}");
        self.put(
            &self.contents_url(owner, repo, path),
            &ContentsBody::from(update),
        )
    }
}

// =============================================================================
// GitHub API request bodies
// =============================================================================

#[derive(Debug, Serialize)]
struct TopicsBody<'a> {
    names: &'a [String],
}

#[derive(Debug, PartialEq, Eq, Serialize)]
struct ContentsBody<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

impl<'a> From<&'a FileUpdate> for ContentsBody<'a> {
    fn from(update: &'a FileUpdate) -> Self {
        Self {
            message: &update.message,
            content: STANDARD.encode(&update.content),
            sha: update.sha.as_deref(),
        }
    }
}
