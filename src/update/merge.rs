//! The three-way merge step.

use anyhow::Result;
use tracing::{info, warn};

use crate::core::UpdateError;
use crate::git::{CommitOutcome, MergeStatus, VcsDriver};
use crate::update::builders::commit_all;
use crate::update::plan::BranchPlan;
use crate::update::request::UpdateRequest;

/// What merging upgrade into original produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// No conflicts.
    pub clean: bool,
    /// Unmerged paths; empty when clean.
    pub conflicted_paths: Vec<String>,
}

impl MergeOutcome {
    #[must_use]
    pub fn is_conflicted(&self) -> bool {
        !self.clean
    }
}

/// Branches the merge branch off original.
pub(crate) async fn create_merge_branch<V: VcsDriver>(vcs: &V, plan: &BranchPlan) -> Result<()> {
    info!("Preparing merge branch {}", plan.merge);
    vcs.create_branch_from(&plan.merge, &plan.original).await
}

/// Merges upgrade into the checked-out merge branch without committing.
///
/// A conflicted merge with no unmerged paths is an error: there would be
/// nothing to resolve and nothing to report.
pub(crate) async fn attempt_merge<V: VcsDriver>(vcs: &V, plan: &BranchPlan) -> Result<MergeOutcome> {
    match vcs.merge_no_commit(&plan.upgrade).await? {
        MergeStatus::Clean => {
            info!("Merge of {} completed without conflicts", plan.upgrade);
            Ok(MergeOutcome {
                clean: true,
                conflicted_paths: Vec::new(),
            })
        }
        MergeStatus::Conflicted => {
            let conflicted_paths = vcs.conflicted_paths().await?;
            if conflicted_paths.is_empty() {
                return Err(UpdateError::Other {
                    message: format!("merge of {} reported conflicts but left no unmerged paths", plan.upgrade),
                }
                .into());
            }
            warn!("Merge stopped with conflicts in {} file(s)", conflicted_paths.len());
            for path in &conflicted_paths {
                warn!("  conflict: {}", path);
            }
            Ok(MergeOutcome {
                clean: false,
                conflicted_paths,
            })
        }
    }
}

/// Commits the merge result when clean, or when conflicted and forced.
///
/// Returns `None` when the merge was left uncommitted for manual resolution.
pub(crate) async fn finalize_merge<V: VcsDriver>(
    vcs: &V,
    request: &UpdateRequest,
    outcome: &MergeOutcome,
) -> Result<Option<CommitOutcome>> {
    let from = &request.source_version;
    let to = &request.target_version;

    if outcome.clean {
        let commit = commit_all(vcs, &format!("Merge from {from} to {to}.")).await?;
        return Ok(Some(commit));
    }

    if request.force_commit_on_conflict {
        warn!("Committing merge with conflict markers (--force)");
        let commit = commit_all(vcs, &format!("Merge from {from} to {to} with conflicts.")).await?;
        return Ok(Some(commit));
    }

    warn!("Conflicts left uncommitted; resolve them on the merge branch and commit manually");
    Ok(None)
}
