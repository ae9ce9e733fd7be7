//! Caller options and their validation into an [`UpdateRequest`].
//!
//! Validation is the preflight: every check that can fail without touching
//! the repository runs here, so a rejected request leaves no branches
//! behind. Checks run cheapest first: local input, then the repository, then
//! the network.

use anyhow::{Context, Result};
use std::future::Future;
use tracing::{debug, info};

use crate::constants::EPHEMERAL_BRANCH_PREFIX;
use crate::core::UpdateError;
use crate::git::VcsDriver;
use crate::project::ProjectFile;
use crate::release::ReleaseClient;
use crate::templating::TemplateData;
use crate::update::plan::default_output_branch;
use crate::version::{ReleaseVersion, TargetVersion, check_ordering, resolve_source};

/// Raw options as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub from_version: Option<String>,
    pub to_version: Option<String>,
    pub from_branch: Option<String>,
    pub force: bool,
    pub squash: bool,
    pub preserve_paths: Vec<String>,
    pub output_branch: Option<String>,
    pub commit_message: Option<String>,
    pub open_pr: bool,
    pub open_issue: bool,
    pub push: bool,
}

/// A validated, immutable update request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub source_version: ReleaseVersion,
    pub target_version: ReleaseVersion,
    /// Branch holding the user's current code.
    pub base_branch: String,
    /// Commit the merge even when it left conflict markers.
    pub force_commit_on_conflict: bool,
    pub squash: bool,
    /// Trimmed, non-empty, deduplicated.
    pub preserve_paths: Vec<String>,
    pub output_branch_override: Option<String>,
    pub commit_message_override: Option<String>,
    pub open_pull_request: bool,
    pub open_issue: bool,
    pub push: bool,
}

impl UpdateRequest {
    /// Template variables for the given output branch.
    #[must_use]
    pub fn template_data(&self, branch_name: &str) -> TemplateData {
        TemplateData {
            from_version: self.source_version.to_string(),
            to_version: self.target_version.to_string(),
            branch_name: branch_name.to_string(),
        }
    }
}

/// Release lookups needed during validation.
pub trait ReleaseIndex: Send + Sync {
    fn latest_version(&self) -> impl Future<Output = Result<ReleaseVersion>> + Send;

    fn check_available(&self, version: &ReleaseVersion) -> impl Future<Output = Result<()>> + Send;
}

impl ReleaseIndex for ReleaseClient {
    async fn latest_version(&self) -> Result<ReleaseVersion> {
        ReleaseClient::latest_version(self).await
    }

    async fn check_available(&self, version: &ReleaseVersion) -> Result<()> {
        ReleaseClient::check_available(self, version).await
    }
}

/// Trims paths, drops blanks and duplicates, keeps order.
#[must_use]
pub fn normalize_preserve_paths(paths: &[String]) -> Vec<String> {
    let mut seen = Vec::new();
    for path in paths.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
        if !seen.iter().any(|s: &String| s == path) {
            seen.push(path.to_string());
        }
    }
    seen
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty()).map(String::from)
}

/// Flags that only make sense with `squash`.
fn check_squash_only_flags(options: &UpdateOptions) -> Result<(), UpdateError> {
    if options.squash {
        return Ok(());
    }

    let mut offending = Vec::new();
    if options.preserve_paths.iter().any(|p| !p.trim().is_empty()) {
        offending.push("--preserve-path");
    }
    if non_blank(options.output_branch.as_ref()).is_some() {
        offending.push("--output-branch");
    }
    if non_blank(options.commit_message.as_ref()).is_some() {
        offending.push("--commit-message");
    }
    if options.open_pr {
        offending.push("--open-pr");
    }
    if options.open_issue {
        offending.push("--open-issue");
    }
    if options.push {
        offending.push("--push");
    }

    if offending.is_empty() {
        Ok(())
    } else {
        Err(UpdateError::ConfigError {
            message: format!("{} require --squash", offending.join(", ")),
        })
    }
}

/// A pull request needs its head branch on the remote.
fn check_pull_request_needs_push(options: &UpdateOptions) -> Result<(), UpdateError> {
    if options.open_pr && !options.push {
        return Err(UpdateError::ConfigError {
            message: "--open-pr requires --push; gh cannot open a pull request for a local-only branch"
                .to_string(),
        });
    }
    Ok(())
}

/// The squash branch is reset with `checkout -B`, so it must never be the
/// base branch or one of the run's temporary branches.
fn check_output_branch(
    output_override: Option<&str>,
    target: &ReleaseVersion,
    base_branch: &str,
) -> Result<(), UpdateError> {
    let output = output_override.map_or_else(|| default_output_branch(target), String::from);

    if output == base_branch {
        return Err(UpdateError::ConfigError {
            message: format!("output branch {output} is the base branch; pass a different --output-branch"),
        });
    }
    if output.starts_with(&format!("{EPHEMERAL_BRANCH_PREFIX}-")) {
        return Err(UpdateError::ConfigError {
            message: format!("output branch {output} uses the reserved {EPHEMERAL_BRANCH_PREFIX}- prefix"),
        });
    }
    Ok(())
}

/// Validates `options` against the repository and the release index.
///
/// # Errors
///
/// Configuration errors (bad versions, missing branch, dirty tree, missing
/// `PROJECT`, downgrade) come first; network errors (latest lookup, source
/// release probe) last.
pub async fn prepare<V: VcsDriver, R: ReleaseIndex>(
    options: UpdateOptions,
    vcs: &V,
    releases: &R,
) -> Result<UpdateRequest> {
    check_squash_only_flags(&options)?;
    check_pull_request_needs_push(&options)?;

    let from_override = non_blank(options.from_version.as_ref());
    if let Some(v) = &from_override {
        ReleaseVersion::parse(v)?;
    }
    let target = TargetVersion::from_option(options.to_version.as_deref())?;

    let root = vcs.root();
    if !vcs.is_repository().await? {
        return Err(UpdateError::NotAGitRepository {
            path: root.display().to_string(),
        }
        .into());
    }
    if !vcs.working_tree_is_clean().await? {
        return Err(UpdateError::DirtyWorkingTree {
            path: root.display().to_string(),
        }
        .into());
    }

    let base_branch = match non_blank(options.from_branch.as_ref()) {
        Some(branch) => branch,
        None => {
            let current = vcs.current_branch().await.context("failed to determine current branch")?;
            if current == "HEAD" {
                return Err(UpdateError::ConfigError {
                    message: "HEAD is detached; pass --from-branch".to_string(),
                }
                .into());
            }
            current
        }
    };
    if !vcs.branch_exists(&base_branch).await? {
        return Err(UpdateError::BranchNotFound {
            branch: base_branch,
        }
        .into());
    }
    debug!("Using {} as base branch", base_branch);

    let project_path = ProjectFile::path(root);
    let project = ProjectFile::load(root).await?;
    let source_version = resolve_source(from_override.as_deref(), &project, &project_path)?;

    let target_version = match target {
        TargetVersion::Explicit(v) => v,
        TargetVersion::Latest => releases
            .latest_version()
            .await
            .context("failed to determine the latest release")?,
    };

    check_ordering(&source_version, &target_version)?;

    let output_branch_override = non_blank(options.output_branch.as_ref());
    if options.squash {
        check_output_branch(output_branch_override.as_deref(), &target_version, &base_branch)?;
    }

    releases.check_available(&source_version).await.with_context(|| {
        format!("release {source_version} is not available for download")
    })?;

    info!("Updating scaffold from {} to {} (base {})", source_version, target_version, base_branch);

    Ok(UpdateRequest {
        source_version,
        target_version,
        base_branch,
        force_commit_on_conflict: options.force,
        squash: options.squash,
        preserve_paths: normalize_preserve_paths(&options.preserve_paths),
        output_branch_override,
        commit_message_override: non_blank(options.commit_message.as_ref()),
        open_pull_request: options.open_pr,
        open_issue: options.open_issue,
        push: options.push,
    })
}
