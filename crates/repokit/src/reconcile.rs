//! Reconciliation of a repository against its desired state.
//!
//! A run is a fixed sequence of idempotent steps:
//!
//! 1. load the desired state from the template reference
//! 2. probe whether the repository exists
//! 3. create it when missing (from a template repository, or from scratch)
//! 4. replace topics
//! 5. write the pull request and issue templates, reading them from a
//!    local file or URL when the value references one
//! 6. protect the requested branches, optionally requiring signed commits
//!
//! A 404 from the remote is the only failure that changes the path taken
//! (missing repository, organization or file). Every other failure aborts
//! the run; steps already applied are not rolled back.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::template;
use crate::types::{
    BranchProtection, DesiredConfig, FileUpdate, RepoOptions, RepositoryDescriptor, RunResult,
    TemplateRepoDescriptor, TemplateRepoRequest,
};

/// Load the template referenced by `opts` and reconcile the repository.
pub fn run(backend: &dyn Backend, opts: &RepoOptions) -> Result<RunResult> {
    let config = template::load(&opts.template)?;
    apply(backend, opts, config)
}

/// Reconcile the repository described by `opts` against `config`.
pub fn apply(
    backend: &dyn Backend,
    opts: &RepoOptions,
    config: DesiredConfig,
) -> Result<RunResult> {
    let created = ensure_repository(backend, opts, &config)?;

    if !opts.topics.is_empty() {
        replace_topics(backend, opts)?;
    }

    sync_contents(backend, opts, &config)?;

    if let Some(rules) = &config.branch_protection {
        protect_branches(backend, opts, rules, config.required_signed_commits)?;
    }

    Ok(RunResult::new(opts, created))
}

/// Make sure the repository exists; returns whether it was created.
fn ensure_repository(
    backend: &dyn Backend,
    opts: &RepoOptions,
    config: &DesiredConfig,
) -> Result<bool> {
    match backend.fetch_repository(&opts.owner, &opts.name) {
        Ok(_) => {
            log::debug!("repo {} already exists", opts.full_name());
            Ok(false)
        }
        Err(e) if e.is_not_found() => {
            create_repository(backend, opts, config)?;
            Ok(true)
        }
        Err(e) => Err(Error::remote("fetch repo", opts.full_name(), e)),
    }
}

fn create_repository(
    backend: &dyn Backend,
    opts: &RepoOptions,
    config: &DesiredConfig,
) -> Result<()> {
    if let Some(template_repo) = &config.template_repo {
        return create_from_template(backend, opts, template_repo);
    }

    let Some(descriptor) = &config.repository else {
        return Err(Error::RepoConfigNotFound);
    };

    let owner = resolve_owner(backend, &opts.owner)?;
    let descriptor = populate_descriptor(descriptor, opts);

    log::info!("creating repo {}", opts.full_name());
    backend
        .create_repository(owner, &descriptor)
        .map_err(|e| Error::remote("create repo", opts.full_name(), e))?;
    Ok(())
}

fn create_from_template(
    backend: &dyn Backend,
    opts: &RepoOptions,
    template_repo: &TemplateRepoDescriptor,
) -> Result<()> {
    let template_owner = template_repo.owner.as_deref().unwrap_or(&opts.owner);
    let template_name = template_repo.repo.as_deref().unwrap_or(&opts.name);
    let request = TemplateRepoRequest {
        owner: opts.owner.clone(),
        name: opts.name.clone(),
        description: opts.description.clone(),
        include_all_branches: template_repo.include_all_branches,
        private: template_repo.private,
    };

    log::info!(
        "creating repo {} using template {template_owner}/{template_name}",
        opts.full_name()
    );
    backend
        .create_repository_from_template(template_owner, template_name, &request)
        .map_err(|e| Error::remote("create repo using template", opts.full_name(), e))?;
    Ok(())
}

/// Organization to create under; `None` means the authenticated user.
fn resolve_owner<'a>(backend: &dyn Backend, owner: &'a str) -> Result<Option<&'a str>> {
    match backend.fetch_organization(owner) {
        Ok(_) => Ok(Some(owner)),
        Err(e) if e.is_not_found() => {
            log::debug!("{owner} is not an organization, creating repo for the authenticated user");
            Ok(None)
        }
        Err(cause) => Err(Error::OrganizationLookup {
            owner: owner.to_string(),
            cause,
        }),
    }
}

fn populate_descriptor(
    descriptor: &RepositoryDescriptor,
    opts: &RepoOptions,
) -> RepositoryDescriptor {
    RepositoryDescriptor {
        name: Some(opts.name.clone()),
        description: Some(opts.description.clone()),
        topics: (!opts.topics.is_empty()).then(|| opts.topics.clone()),
        ..descriptor.clone()
    }
}

fn replace_topics(backend: &dyn Backend, opts: &RepoOptions) -> Result<()> {
    log::debug!("replacing topics on {}", opts.full_name());
    backend
        .replace_topics(&opts.owner, &opts.name, &opts.topics)
        .map_err(|e| Error::remote("replace topics on", opts.full_name(), e))
}

fn sync_contents(backend: &dyn Backend, opts: &RepoOptions, config: &DesiredConfig) -> Result<()> {
    for file in config.content_files() {
        let target = format!("{}/{}", opts.full_name(), file.path);
        let content = template::read_content(file.content)?;

        let sha = match backend.get_file_content(&opts.owner, &opts.name, file.path) {
            Ok(existing) => Some(existing.sha),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(Error::remote("get file", target, e)),
        };

        let operation = if sha.is_some() { "update file" } else { "create file" };
        log::info!("{operation} {target}");

        let update = FileUpdate {
            message: file.message.to_string(),
            content,
            sha,
        };
        backend
            .create_or_update_file_content(&opts.owner, &opts.name, file.path, &update)
            .map_err(|e| Error::remote(operation, target, e))?;
    }
    Ok(())
}

fn protect_branches(
    backend: &dyn Backend,
    opts: &RepoOptions,
    rules: &BranchProtection,
    signed_commits: bool,
) -> Result<()> {
    for branch in &opts.branches {
        log::debug!("setting branch protection rules on {branch}");

        backend
            .fetch_branch(&opts.owner, &opts.name, branch)
            .map_err(|cause| Error::BranchNotFound {
                branch: branch.clone(),
                cause,
            })?;

        backend
            .update_branch_protection(&opts.owner, &opts.name, branch, rules)
            .map_err(|e| Error::remote("set branch protection rules on", branch.clone(), e))?;

        if signed_commits {
            backend
                .require_signed_commits(&opts.owner, &opts.name, branch)
                .map_err(|e| {
                    Error::remote(
                        "set branch protection rules for signed commits on",
                        branch.clone(),
                        e,
                    )
                })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Call, MockBackend, Operation};
    use crate::error::TemplateError;
    use crate::types::{ISSUE_TEMPLATE_PATH, PULL_REQUEST_TEMPLATE_PATH};
    use std::io::Write;

    fn opts() -> RepoOptions {
        RepoOptions::new("leocomelli", "ght", "unused.json")
            .description("A simple CLI to create GitHub repositories")
    }

    fn config(json: &str) -> DesiredConfig {
        serde_json::from_str(json).unwrap()
    }

    fn simple_repo() -> DesiredConfig {
        config(r#"{"repository": {"private": true}}"#)
    }

    fn repo_with_protection(signed: bool) -> DesiredConfig {
        config(&format!(
            r#"{{
                "repository": {{"private": true}},
                "branch_protection": {{"enforce_admins": true}},
                "required_signed_commits": {signed}
            }}"#
        ))
    }

    // -------------------------------------------------------------------------
    // Existence probe
    // -------------------------------------------------------------------------

    #[test]
    fn test_existing_repo_empty_config() {
        let mock = MockBackend::new().with_repository("leocomelli", "ght");

        let res = apply(&mock, &opts(), DesiredConfig::default()).unwrap();

        assert_eq!(res.full_name, "leocomelli/ght");
        assert!(!res.created);
        assert_eq!(mock.mutating_calls(), 0);
        assert_eq!(mock.operations(), vec![Operation::FetchRepository]);
    }

    #[test]
    fn test_existing_repo_never_creates() {
        let mock = MockBackend::new()
            .with_repository("leocomelli", "ght")
            .with_organization("leocomelli");
        let cfg = config(r#"{"repository": {}, "template_repo": {"private": true}}"#);

        let res = apply(&mock, &opts(), cfg).unwrap();

        assert!(!res.created);
        assert_eq!(mock.count(Operation::CreateRepository), 0);
        assert_eq!(mock.count(Operation::CreateRepositoryFromTemplate), 0);
        assert_eq!(mock.count(Operation::FetchOrganization), 0);
    }

    #[test]
    fn test_internal_server_error_when_get_repo() {
        let mock = MockBackend::new();
        mock.fail(Operation::FetchRepository, 500);

        let err = apply(&mock, &opts(), simple_repo()).unwrap_err();

        assert_eq!(err.status(), Some(500));
        assert!(matches!(err, Error::Remote { operation: "fetch repo", .. }));
        assert_eq!(mock.operations(), vec![Operation::FetchRepository]);
    }

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    #[test]
    fn test_create_with_no_repo_config() {
        let mock = MockBackend::new().with_organization("leocomelli");
        let cfg = config(
            r#"{"branch_protection": {"enforce_admins": true}, "pull_request_template": "x"}"#,
        );

        let err = apply(&mock, &opts().topics(["rust"]), cfg).unwrap_err();

        assert!(matches!(err, Error::RepoConfigNotFound));
        assert_eq!(err.to_string(), "no repository section in template file");
        assert_eq!(mock.mutating_calls(), 0);
        assert_eq!(mock.count(Operation::FetchOrganization), 0);
    }

    #[test]
    fn test_create_simple_repo_in_organization() {
        let mock = MockBackend::new().with_organization("leocomelli");

        let res = apply(&mock, &opts(), simple_repo()).unwrap();

        assert!(res.created);
        assert_eq!(res.full_name, "leocomelli/ght");
        assert_eq!(
            mock.operations(),
            vec![
                Operation::FetchRepository,
                Operation::FetchOrganization,
                Operation::CreateRepository,
            ]
        );
        match &mock.calls()[2] {
            Call::CreateRepository { owner, descriptor } => {
                assert_eq!(owner.as_deref(), Some("leocomelli"));
                assert_eq!(descriptor.name.as_deref(), Some("ght"));
                assert_eq!(
                    descriptor.description.as_deref(),
                    Some("A simple CLI to create GitHub repositories")
                );
                assert_eq!(descriptor.private, Some(true));
                assert_eq!(descriptor.topics, None);
            }
            other => panic!("Expected CreateRepository, got {other:?}"),
        }
    }

    #[test]
    fn test_create_simple_repo_for_user_when_org_not_found() {
        let mock = MockBackend::new();

        let res = apply(&mock, &opts(), simple_repo()).unwrap();

        assert!(res.created);
        match &mock.calls()[2] {
            Call::CreateRepository { owner, .. } => assert_eq!(*owner, None),
            other => panic!("Expected CreateRepository, got {other:?}"),
        }
    }

    #[test]
    fn test_org_lookup_error_is_not_treated_as_user() {
        let mock = MockBackend::new();
        mock.fail(Operation::FetchOrganization, 500);

        let err = apply(&mock, &opts(), simple_repo()).unwrap_err();

        match &err {
            Error::OrganizationLookup { owner, cause } => {
                assert_eq!(owner, "leocomelli");
                assert_eq!(cause.status, Some(500));
            }
            other => panic!("Expected OrganizationLookup, got {other:?}"),
        }
        assert_eq!(mock.count(Operation::CreateRepository), 0);
    }

    #[test]
    fn test_descriptor_receives_topics() {
        let mock = MockBackend::new().with_organization("leocomelli");
        let cfg = config(r#"{"repository": {"topics": ["from-template"]}}"#);

        apply(&mock, &opts().topics(["go", "cli", "go"]), cfg).unwrap();

        match &mock.calls()[2] {
            Call::CreateRepository { descriptor, .. } => {
                assert_eq!(
                    descriptor.topics,
                    Some(vec!["go".to_string(), "cli".to_string(), "go".to_string()])
                );
            }
            other => panic!("Expected CreateRepository, got {other:?}"),
        }
    }

    #[test]
    fn test_error_creating_simple_repo() {
        let mock = MockBackend::new().with_organization("leocomelli");
        mock.fail(Operation::CreateRepository, 400);

        let err = apply(&mock, &opts().topics(["rust"]), simple_repo()).unwrap_err();

        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().starts_with("failed to create repo leocomelli/ght"));
        assert_eq!(mock.count(Operation::ReplaceTopics), 0);
    }

    #[test]
    fn test_create_repo_using_template() {
        let mock = MockBackend::new().with_organization("leocomelli");
        let cfg = config(
            r#"{"repository": {"private": true},
                "template_repo": {"owner": "acme", "repo": "service-template",
                                  "include_all_branches": true, "private": false}}"#,
        );

        let res = apply(&mock, &opts(), cfg).unwrap();

        assert!(res.created);
        assert_eq!(mock.count(Operation::FetchOrganization), 0);
        assert_eq!(mock.count(Operation::CreateRepository), 0);
        match &mock.calls()[1] {
            Call::CreateRepositoryFromTemplate {
                template_owner,
                template_repo,
                request,
            } => {
                assert_eq!(template_owner, "acme");
                assert_eq!(template_repo, "service-template");
                assert_eq!(request.owner, "leocomelli");
                assert_eq!(request.name, "ght");
                assert_eq!(request.include_all_branches, Some(true));
                assert_eq!(request.private, Some(false));
            }
            other => panic!("Expected CreateRepositoryFromTemplate, got {other:?}"),
        }
    }

    #[test]
    fn test_template_source_defaults_to_target() {
        let mock = MockBackend::new();
        let cfg = config(r#"{"template_repo": {"include_all_branches": false, "private": true}}"#);

        apply(&mock, &opts(), cfg).unwrap();

        match &mock.calls()[1] {
            Call::CreateRepositoryFromTemplate {
                template_owner,
                template_repo,
                ..
            } => {
                assert_eq!(template_owner, "leocomelli");
                assert_eq!(template_repo, "ght");
            }
            other => panic!("Expected CreateRepositoryFromTemplate, got {other:?}"),
        }
    }

    #[test]
    fn test_error_creating_repo_using_template() {
        let mock = MockBackend::new();
        mock.fail(Operation::CreateRepositoryFromTemplate, 400);
        let cfg = config(r#"{"template_repo": {"private": true}}"#);

        let err = apply(&mock, &opts(), cfg).unwrap_err();

        assert_eq!(err.status(), Some(400));
        assert_eq!(mock.count(Operation::FetchOrganization), 0);
    }

    // -------------------------------------------------------------------------
    // Topics
    // -------------------------------------------------------------------------

    #[test]
    fn test_topics_replaced_when_repo_exists() {
        let mock = MockBackend::new().with_repository("leocomelli", "ght");

        apply(&mock, &opts().topics(["rust", "cli"]), DesiredConfig::default()).unwrap();

        assert_eq!(
            mock.calls()[1],
            Call::ReplaceTopics {
                owner: "leocomelli".to_string(),
                repo: "ght".to_string(),
                topics: vec!["rust".to_string(), "cli".to_string()],
            }
        );
    }

    #[test]
    fn test_topics_not_replaced_when_empty() {
        let mock = MockBackend::new().with_organization("leocomelli");

        apply(&mock, &opts(), simple_repo()).unwrap();

        assert_eq!(mock.count(Operation::ReplaceTopics), 0);
    }

    #[test]
    fn test_topics_failure_is_terminal() {
        let mock = MockBackend::new().with_repository("leocomelli", "ght");
        mock.fail(Operation::ReplaceTopics, 422);
        let cfg = config(r###"{"pull_request_template": "## PR"}"###);

        let err = apply(&mock, &opts().topics(["Not Valid"]), cfg).unwrap_err();

        assert_eq!(err.status(), Some(422));
        assert_eq!(mock.count(Operation::GetFileContent), 0);
    }

    // -------------------------------------------------------------------------
    // Content
    // -------------------------------------------------------------------------

    #[test]
    fn test_contents_created_in_order() {
        let mock = MockBackend::new().with_repository("leocomelli", "ght");
        let cfg = config(r###"{"pull_request_template": "## PR", "issue_template": "## Issue"}"###);

        apply(&mock, &opts(), cfg).unwrap();

        let writes: Vec<(String, FileUpdate)> = mock
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::CreateOrUpdateFileContent { path, update, .. } => Some((path, update)),
                _ => None,
            })
            .collect();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].0, PULL_REQUEST_TEMPLATE_PATH);
        assert_eq!(writes[0].1.content, b"## PR".to_vec());
        assert_eq!(writes[0].1.sha, None);
        assert_eq!(writes[0].1.message, "Add/Update Pull Request Template");
        assert_eq!(writes[1].0, ISSUE_TEMPLATE_PATH);
        assert_eq!(writes[1].1.message, "Add/Update Issue Template");
    }

    #[test]
    fn test_existing_content_updated_with_sha() {
        let mock = MockBackend::new()
            .with_repository("leocomelli", "ght")
            .with_file("leocomelli", "ght", ISSUE_TEMPLATE_PATH, "abc123");
        let cfg = config(r###"{"issue_template": "## Issue"}"###);

        apply(&mock, &opts(), cfg).unwrap();

        match mock.calls().last() {
            Some(Call::CreateOrUpdateFileContent { path, update, .. }) => {
                assert_eq!(path, ISSUE_TEMPLATE_PATH);
                assert_eq!(update.sha.as_deref(), Some("abc123"));
            }
            other => panic!("Expected CreateOrUpdateFileContent, got {other:?}"),
        }
    }

    #[test]
    fn test_content_read_from_local_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"## Summary\n\n<!-- What changed? -->\n").unwrap();
        let mock = MockBackend::new().with_repository("leocomelli", "ght");
        let cfg = DesiredConfig {
            pull_request_template: Some(file.path().to_string_lossy().into_owned()),
            ..DesiredConfig::default()
        };

        apply(&mock, &opts(), cfg).unwrap();

        match mock.calls().last() {
            Some(Call::CreateOrUpdateFileContent { path, update, .. }) => {
                assert_eq!(path, PULL_REQUEST_TEMPLATE_PATH);
                assert_eq!(update.content, b"## Summary\n\n<!-- What changed? -->\n");
            }
            other => panic!("Expected CreateOrUpdateFileContent, got {other:?}"),
        }
    }

    #[test]
    fn test_inline_content_written_as_is() {
        let mock = MockBackend::new().with_repository("leocomelli", "ght");
        let cfg = config(r###"{"issue_template": "## Issue\n\nSteps to reproduce"}"###);

        apply(&mock, &opts(), cfg).unwrap();

        match mock.calls().last() {
            Some(Call::CreateOrUpdateFileContent { update, .. }) => {
                assert_eq!(update.content, b"## Issue\n\nSteps to reproduce");
            }
            other => panic!("Expected CreateOrUpdateFileContent, got {other:?}"),
        }
    }

    #[test]
    fn test_unreachable_content_url_is_terminal() {
        let mock = MockBackend::new().with_repository("leocomelli", "ght");
        let cfg = config(r#"{"pull_request_template": "https://127.0.0.1:1/pr.md"}"#);

        let err = apply(&mock, &opts(), cfg).unwrap_err();

        assert!(matches!(err, Error::Template(TemplateError::Fetch { .. })));
        assert_eq!(mock.count(Operation::GetFileContent), 0);
        assert_eq!(mock.mutating_calls(), 0);
    }

    #[test]
    fn test_empty_content_skipped() {
        let mock = MockBackend::new().with_repository("leocomelli", "ght");
        let cfg = config(r#"{"pull_request_template": "", "issue_template": ""}"#);

        apply(&mock, &opts(), cfg).unwrap();

        assert_eq!(mock.count(Operation::GetFileContent), 0);
        assert_eq!(mock.mutating_calls(), 0);
    }

    #[test]
    fn test_content_lookup_failure_is_terminal() {
        let mock = MockBackend::new().with_repository("leocomelli", "ght");
        mock.fail(Operation::GetFileContent, 403);
        let cfg = config(r###"{"pull_request_template": "## PR"}"###);

        let err = apply(&mock, &opts(), cfg).unwrap_err();

        assert_eq!(err.status(), Some(403));
        assert!(err.to_string().contains(PULL_REQUEST_TEMPLATE_PATH));
        assert_eq!(mock.count(Operation::CreateOrUpdateFileContent), 0);
    }

    #[test]
    fn test_content_write_failure_is_terminal() {
        let mock = MockBackend::new()
            .with_repository("leocomelli", "ght")
            .with_branch("leocomelli", "ght", "main");
        mock.fail(Operation::CreateOrUpdateFileContent, 409);
        let cfg = config(
            r###"{"pull_request_template": "## PR", "issue_template": "## Issue",
                  "branch_protection": {"enforce_admins": true}}"###,
        );

        let err = apply(&mock, &opts().branches(["main"]), cfg).unwrap_err();

        assert_eq!(err.status(), Some(409));
        assert_eq!(mock.count(Operation::CreateOrUpdateFileContent), 1);
        assert_eq!(mock.count(Operation::FetchBranch), 0);
    }

    // -------------------------------------------------------------------------
    // Branch protection
    // -------------------------------------------------------------------------

    #[test]
    fn test_create_repo_with_branch_protection() {
        let mock = MockBackend::new()
            .with_organization("leocomelli")
            .with_branch("leocomelli", "ght", "main");

        let res = apply(&mock, &opts().branches(["main"]), repo_with_protection(false)).unwrap();

        assert!(res.created);
        assert_eq!(mock.count(Operation::UpdateBranchProtection), 1);
        assert_eq!(mock.count(Operation::RequireSignedCommits), 0);
    }

    #[test]
    fn test_protection_rules_forwarded() {
        let mock = MockBackend::new()
            .with_repository("leocomelli", "ght")
            .with_branch("leocomelli", "ght", "main");
        let cfg = repo_with_protection(false);
        let expected = cfg.branch_protection.clone().unwrap();

        apply(&mock, &opts().branches(["main"]), cfg).unwrap();

        match mock.calls().last() {
            Some(Call::UpdateBranchProtection { branch, rules, .. }) => {
                assert_eq!(branch, "main");
                assert_eq!(*rules, expected);
            }
            other => panic!("Expected UpdateBranchProtection, got {other:?}"),
        }
    }

    #[test]
    fn test_branch_not_found() {
        let mock = MockBackend::new().with_organization("leocomelli");

        let err = apply(&mock, &opts().branches(["main"]), repo_with_protection(true)).unwrap_err();

        assert_eq!(
            err.to_string(),
            "failed to get branch main. check if the branch exists; if you are creating a new repository use the auto_init option: unexpected status code: 404 Not Found"
        );
        assert_eq!(mock.count(Operation::UpdateBranchProtection), 0);
        assert_eq!(mock.count(Operation::RequireSignedCommits), 0);
    }

    #[test]
    fn test_branch_lookup_failure_carries_hint() {
        let mock = MockBackend::new().with_repository("leocomelli", "ght");
        mock.fail(Operation::FetchBranch, 500);

        let err =
            apply(&mock, &opts().branches(["main"]), repo_with_protection(false)).unwrap_err();

        assert!(matches!(err, Error::BranchNotFound { .. }));
        assert!(err.to_string().contains("auto_init"));
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_auto_init_makes_branch_protectable() {
        let mock = MockBackend::new().with_organization("leocomelli");
        let cfg = config(
            r#"{"repository": {"auto_init": true},
                "branch_protection": {"enforce_admins": true},
                "required_signed_commits": true}"#,
        );

        let res = apply(&mock, &opts().branches(["main"]), cfg).unwrap();

        assert!(res.created);
        assert_eq!(mock.count(Operation::UpdateBranchProtection), 1);
        assert_eq!(mock.count(Operation::RequireSignedCommits), 1);
    }

    #[test]
    fn test_error_setting_branch_protection() {
        let mock = MockBackend::new()
            .with_organization("leocomelli")
            .with_branch("leocomelli", "ght", "main");
        mock.fail(Operation::UpdateBranchProtection, 400);

        let err = apply(&mock, &opts().branches(["main"]), repo_with_protection(true)).unwrap_err();

        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().starts_with("failed to set branch protection rules on main"));
        assert_eq!(mock.count(Operation::RequireSignedCommits), 0);
    }

    #[test]
    fn test_branch_protection_with_signed_commits() {
        let mock = MockBackend::new()
            .with_organization("leocomelli")
            .with_branch("leocomelli", "ght", "main");

        let res = apply(&mock, &opts().branches(["main"]), repo_with_protection(true)).unwrap();

        assert!(res.created);
        let ops = mock.operations();
        assert_eq!(
            &ops[ops.len() - 3..],
            &[
                Operation::FetchBranch,
                Operation::UpdateBranchProtection,
                Operation::RequireSignedCommits,
            ]
        );
    }

    #[test]
    fn test_error_requiring_signed_commits() {
        let mock = MockBackend::new()
            .with_organization("leocomelli")
            .with_branch("leocomelli", "ght", "main");
        mock.fail(Operation::RequireSignedCommits, 400);

        let err = apply(&mock, &opts().branches(["main"]), repo_with_protection(true)).unwrap_err();

        assert_eq!(err.status(), Some(400));
        assert!(err.to_string().contains("signed commits on main"));
        assert_eq!(mock.count(Operation::UpdateBranchProtection), 1);
    }

    #[test]
    fn test_first_branch_failure_stops_remaining() {
        let mock = MockBackend::new()
            .with_repository("leocomelli", "ght")
            .with_branch("leocomelli", "ght", "main");

        let err = apply(
            &mock,
            &opts().branches(["develop", "main"]),
            repo_with_protection(false),
        )
        .unwrap_err();

        match err {
            Error::BranchNotFound { branch, .. } => assert_eq!(branch, "develop"),
            other => panic!("Expected BranchNotFound, got {other:?}"),
        }
        assert_eq!(mock.count(Operation::FetchBranch), 1);
        assert_eq!(mock.count(Operation::UpdateBranchProtection), 0);
    }

    #[test]
    fn test_branches_processed_in_order() {
        let mock = MockBackend::new()
            .with_repository("leocomelli", "ght")
            .with_branch("leocomelli", "ght", "main")
            .with_branch("leocomelli", "ght", "release");

        apply(
            &mock,
            &opts().branches(["release", "main"]),
            repo_with_protection(false),
        )
        .unwrap();

        let protected: Vec<String> = mock
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::UpdateBranchProtection { branch, .. } => Some(branch),
                _ => None,
            })
            .collect();
        assert_eq!(protected, vec!["release", "main"]);
    }

    #[test]
    fn test_no_protection_descriptor_skips_branches() {
        let mock = MockBackend::new().with_repository("leocomelli", "ght");
        let cfg = config(r#"{"required_signed_commits": true}"#);

        apply(&mock, &opts().branches(["main"]), cfg).unwrap();

        assert_eq!(mock.count(Operation::FetchBranch), 0);
    }

    // -------------------------------------------------------------------------
    // End to end
    // -------------------------------------------------------------------------

    #[test]
    fn test_scenario_create_with_topics() {
        let mock = MockBackend::new().with_organization("o");
        let opts = RepoOptions::new("o", "r", "unused.json").topics(["rust"]);

        let res = apply(&mock, &opts, simple_repo()).unwrap();

        assert_eq!(res.full_name, "o/r");
        assert!(res.created);
        assert_eq!(mock.count(Operation::CreateRepository), 1);
        assert_eq!(mock.count(Operation::ReplaceTopics), 1);
        assert_eq!(mock.mutating_calls(), 2);
    }

    #[test]
    fn test_full_sequence_order() {
        let mock = MockBackend::new().with_organization("o");
        let opts = RepoOptions::new("o", "r", "unused.json")
            .topics(["rust"])
            .branches(["main"]);
        let cfg = config(
            r###"{"repository": {"auto_init": true},
                  "branch_protection": {"enforce_admins": false},
                  "required_signed_commits": true,
                  "pull_request_template": "## PR",
                  "issue_template": "## Issue"}"###,
        );

        apply(&mock, &opts, cfg).unwrap();

        assert_eq!(
            mock.operations(),
            vec![
                Operation::FetchRepository,
                Operation::FetchOrganization,
                Operation::CreateRepository,
                Operation::ReplaceTopics,
                Operation::GetFileContent,
                Operation::CreateOrUpdateFileContent,
                Operation::GetFileContent,
                Operation::CreateOrUpdateFileContent,
                Operation::FetchBranch,
                Operation::UpdateBranchProtection,
                Operation::RequireSignedCommits,
            ]
        );
    }

    #[test]
    fn test_run_loads_template_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"repository": {"private": true}}"#).unwrap();
        let mock = MockBackend::new().with_organization("leocomelli");
        let mut opts = opts();
        opts.template = file.path().to_string_lossy().into_owned();

        let res = run(&mock, &opts).unwrap();

        assert!(res.created);
    }

    #[test]
    fn test_run_template_not_found_makes_no_calls() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockBackend::new();
        let mut opts = opts();
        opts.template = dir.path().join("nonexistent.json").to_string_lossy().into_owned();

        let err = run(&mock, &opts).unwrap_err();

        assert!(matches!(err, Error::Template(TemplateError::Io { .. })));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_run_invalid_template_makes_no_calls() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ invalid").unwrap();
        let mock = MockBackend::new();
        let mut opts = opts();
        opts.template = file.path().to_string_lossy().into_owned();

        let err = run(&mock, &opts).unwrap_err();

        assert!(matches!(err, Error::Template(TemplateError::Parse { .. })));
        assert!(mock.calls().is_empty());
    }
}
