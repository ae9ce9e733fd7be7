//! Builders for the ancestor, original and upgrade branches.
//!
//! Each builder creates exactly one branch, records one or two commits on it
//! and leaves it checked out. Any failure propagates; nothing is rolled back.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::constants::{GIT_DIR, PROJECT_FILE};
use crate::generator::ScaffoldGenerator;
use crate::git::{CommitOutcome, HookPolicy, VcsDriver};
use crate::update::plan::BranchPlan;
use crate::update::request::UpdateRequest;

/// Stages everything and commits; an unchanged tree is not an error.
pub(crate) async fn commit_all<V: VcsDriver>(vcs: &V, message: &str) -> Result<CommitOutcome> {
    vcs.stage_all().await?;
    let outcome = vcs.commit(message, HookPolicy::Skip).await?;
    if outcome == CommitOutcome::NothingToCommit {
        debug!("No changes to commit for \"{}\"", message);
    }
    Ok(outcome)
}

/// Ancestor: the base branch wiped down to `PROJECT`, then scaffolded with
/// the source release.
pub(crate) async fn build_ancestor<V, G>(
    vcs: &V,
    plan: &BranchPlan,
    request: &UpdateRequest,
    source: &G,
) -> Result<()>
where
    V: VcsDriver,
    G: ScaffoldGenerator,
{
    info!("Preparing ancestor branch {}", plan.ancestor);
    vcs.create_branch_from(&plan.ancestor, &request.base_branch).await?;

    vcs.clear_worktree(&[GIT_DIR, PROJECT_FILE])
        .await
        .context("failed to clean up files in the ancestor branch")?;
    commit_all(vcs, &format!("Clean scaffolding from release version: {}", request.source_version))
        .await?;

    source
        .generate(vcs.root())
        .await
        .with_context(|| format!("failed to generate scaffold with {}", source.describe()))?;
    commit_all(
        vcs,
        &format!(
            "alpha generate in ancestor branch with {} ({})",
            request.source_version,
            source.describe()
        ),
    )
    .await?;
    Ok(())
}

/// Original: the ancestor with every file of the base branch laid over it.
pub(crate) async fn build_original<V: VcsDriver>(
    vcs: &V,
    plan: &BranchPlan,
    request: &UpdateRequest,
) -> Result<()> {
    info!("Preparing original branch {}", plan.original);
    vcs.create_branch_from(&plan.original, &plan.ancestor).await?;
    vcs.checkout_path_from(&request.base_branch, ".").await?;
    commit_all(vcs, &format!("Add code from {} into {}", request.base_branch, plan.original)).await?;
    Ok(())
}

/// Upgrade: the ancestor re-scaffolded with the target release.
pub(crate) async fn build_upgrade<V, G>(
    vcs: &V,
    plan: &BranchPlan,
    request: &UpdateRequest,
    target: &G,
) -> Result<()>
where
    V: VcsDriver,
    G: ScaffoldGenerator,
{
    info!("Preparing upgrade branch {}", plan.upgrade);
    vcs.create_branch_from(&plan.upgrade, &plan.ancestor).await?;

    target
        .generate(vcs.root())
        .await
        .with_context(|| format!("failed to generate scaffold with {}", target.describe()))?;
    commit_all(
        vcs,
        &format!(
            "alpha generate in upgrade branch with {} ({})",
            request.target_version,
            target.describe()
        ),
    )
    .await?;
    Ok(())
}
