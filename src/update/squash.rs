//! Collapses the merge result into one commit on the output branch.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::constants::GIT_DIR;
use crate::git::{CommitOutcome, VcsDriver};
use crate::templating::{DEFAULT_SQUASH_MESSAGE, render};
use crate::update::builders::commit_all;
use crate::update::plan::BranchPlan;
use crate::update::request::UpdateRequest;

/// Result of one squash run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SquashOutcome {
    pub branch: String,
    pub commit: CommitOutcome,
    /// Preserve paths actually restored from the base branch.
    pub restored_paths: Vec<String>,
}

/// The squash commit message: the override or the default template.
pub fn squash_message(request: &UpdateRequest, branch: &str) -> Result<String> {
    match &request.commit_message_override {
        Some(message) => Ok(message.clone()),
        None => Ok(render(
            "squash commit message",
            DEFAULT_SQUASH_MESSAGE,
            &request.template_data(branch),
        )?),
    }
}

/// Writes the merge branch's tree as a single commit on `plan.output`.
///
/// The output branch is reset to the base branch first, so its history is
/// always base plus exactly one commit. Preserve paths are then restored from
/// the base branch; a path the base branch lacks is skipped with a warning.
/// An unchanged tree yields [`CommitOutcome::NothingToCommit`], not an error,
/// which makes re-running safe.
pub async fn squash<V: VcsDriver>(
    vcs: &V,
    request: &UpdateRequest,
    plan: &BranchPlan,
) -> Result<SquashOutcome> {
    let base = &request.base_branch;
    let branch = &plan.output;
    let message = squash_message(request, branch)?;

    info!("Squashing {} onto {}", plan.merge, branch);
    vcs.checkout(base).await?;
    vcs.force_branch_from(branch, base).await?;

    vcs.clear_worktree(&[GIT_DIR]).await.context("failed to clean the output branch")?;
    vcs.checkout_path_from(&plan.merge, ".").await?;

    let mut restored_paths = Vec::new();
    for path in &request.preserve_paths {
        match vcs.restore_path(base, path).await {
            Ok(()) => {
                info!("Restored {} from {}", path, base);
                restored_paths.push(path.clone());
            }
            Err(e) => warn!("Could not restore {} from {}: {:#}", path, base, e),
        }
    }

    let commit = commit_all(vcs, &message).await?;
    match commit {
        CommitOutcome::Committed => info!("Squashed update committed on {}", branch),
        CommitOutcome::NothingToCommit => info!("{} already matches the merge result", branch),
    }

    Ok(SquashOutcome {
        branch: branch.clone(),
        commit,
        restored_paths,
    })
}
