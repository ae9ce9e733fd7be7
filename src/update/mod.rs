//! The three-way scaffold update engine.
//!
//! An update builds four branches and merges them:
//!
//! ```text
//!            base ──────────────┐ (files overlaid)
//!                               ▼
//! ancestor ──┬──────────────► original ──► merge ◄── upgrade merged in
//! (source    │                                 │
//!  scaffold) └──► upgrade (target scaffold) ───┘
//! ```
//!
//! - **ancestor**: the base branch wiped to `PROJECT` and scaffolded by the
//!   source release. It is the common base of the merge.
//! - **original**: ancestor plus the user's files, so ancestor..original is
//!   exactly the user's edits.
//! - **upgrade**: ancestor re-scaffolded by the target release, so
//!   ancestor..upgrade is exactly the scaffold change.
//! - **merge**: original with upgrade merged in.
//!
//! Optionally the merge tree is squashed onto a stable output branch, pushed
//! and published. Conflicts are an outcome, not an error.
//!
//! [`Updater`] drives the stages strictly in order and tracks progress in an
//! [`UpdateStage`]. Nothing is rolled back on failure: branches created so
//! far stay for inspection and the error names the failing stage.
//!
//! ```rust,ignore
//! let request = prepare(options, &vcs, &releases).await?;
//! let plan = BranchPlan::new(&request.source_version, &request.target_version, None, &stamp);
//! let mut updater = Updater::new(vcs, request, plan);
//! let report = updater.run(&source_generator, &target_generator).await?;
//! ```

pub mod builders;
pub mod merge;
pub mod plan;
pub mod request;
pub mod squash;
pub mod state;


use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::TemplateSettings;
use crate::core::UpdateError;
use crate::generator::ScaffoldGenerator;
use crate::git::{CommitOutcome, VcsDriver};
use crate::github::{GhCli, PublishOptions, PublishOutcome};

pub use merge::MergeOutcome;
pub use plan::{BranchPlan, default_output_branch, run_stamp};
pub use request::{ReleaseIndex, UpdateOptions, UpdateRequest, normalize_preserve_paths, prepare};
pub use squash::{SquashOutcome, squash_message};
pub use state::UpdateStage;

/// Remote the output branch is pushed to.
pub const DEFAULT_REMOTE: &str = "origin";

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub plan: BranchPlan,
    pub stage: UpdateStage,
    pub merge: MergeOutcome,
    /// `None` when conflicts were left for manual resolution.
    pub merge_commit: Option<CommitOutcome>,
    pub squash: Option<SquashOutcome>,
    pub pushed: bool,
}

impl UpdateReport {
    /// Branch holding the final result.
    #[must_use]
    pub fn result_branch(&self) -> &str {
        self.squash.as_ref().map_or(&self.plan.merge, |s| &s.branch)
    }

    /// Whether the user still has to resolve conflicts before committing.
    #[must_use]
    pub fn needs_manual_resolution(&self) -> bool {
        self.merge.is_conflicted() && self.merge_commit.is_none()
    }
}

/// Drives one update run over a [`VcsDriver`].
pub struct Updater<V: VcsDriver> {
    vcs: V,
    request: UpdateRequest,
    plan: BranchPlan,
    stage: UpdateStage,
}

impl<V: VcsDriver> Updater<V> {
    pub fn new(vcs: V, request: UpdateRequest, plan: BranchPlan) -> Self {
        Self {
            vcs,
            request,
            plan,
            stage: UpdateStage::Validated,
        }
    }

    pub fn stage(&self) -> UpdateStage {
        self.stage
    }

    pub fn plan(&self) -> &BranchPlan {
        &self.plan
    }

    pub fn request(&self) -> &UpdateRequest {
        &self.request
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    fn advance(&mut self, next: UpdateStage) -> Result<(), UpdateError> {
        self.stage.advance(next)
    }

    /// Fails if any ephemeral branch of the plan already exists.
    pub async fn ensure_branches_available(&self) -> Result<()> {
        for name in self.plan.ephemeral() {
            if self.vcs.branch_exists(name).await? {
                return Err(UpdateError::BranchAlreadyExists {
                    branch: name.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Runs every stage up to the merge, then squash and push when requested.
    ///
    /// `source` must produce the source release's scaffold and `target` the
    /// target release's. Publishing is separate, see [`Updater::publish`].
    pub async fn run<S, T>(&mut self, source: &S, target: &T) -> Result<UpdateReport>
    where
        S: ScaffoldGenerator,
        T: ScaffoldGenerator,
    {
        self.ensure_branches_available().await?;
        self.advance(UpdateStage::BinaryReady)?;

        builders::build_ancestor(&self.vcs, &self.plan, &self.request, source)
            .await
            .with_context(|| format!("failed to prepare ancestor branch {}", self.plan.ancestor))?;
        self.advance(UpdateStage::AncestorReady)?;

        builders::build_original(&self.vcs, &self.plan, &self.request)
            .await
            .with_context(|| format!("failed to prepare original branch {}", self.plan.original))?;
        self.advance(UpdateStage::OriginalReady)?;

        builders::build_upgrade(&self.vcs, &self.plan, &self.request, target)
            .await
            .with_context(|| format!("failed to prepare upgrade branch {}", self.plan.upgrade))?;
        self.advance(UpdateStage::UpgradeReady)?;

        merge::create_merge_branch(&self.vcs, &self.plan)
            .await
            .with_context(|| format!("failed to create merge branch {}", self.plan.merge))?;
        self.advance(UpdateStage::MergeBranchCreated)?;

        let outcome = merge::attempt_merge(&self.vcs, &self.plan)
            .await
            .with_context(|| format!("failed to merge {} into {}", self.plan.upgrade, self.plan.merge))?;
        self.advance(UpdateStage::MergeAttempted)?;

        let merge_commit = merge::finalize_merge(&self.vcs, &self.request, &outcome)
            .await
            .with_context(|| format!("failed to commit merge on {}", self.plan.merge))?;
        self.advance(if outcome.clean { UpdateStage::Merged } else { UpdateStage::Conflicted })?;

        let mut report = UpdateReport {
            plan: self.plan.clone(),
            stage: self.stage,
            merge: outcome,
            merge_commit,
            squash: None,
            pushed: false,
        };

        if !self.request.squash {
            return Ok(report);
        }

        if report.needs_manual_resolution() {
            warn!(
                "Skipping squash: resolve the conflicts on {} and commit, or re-run with --force",
                self.plan.merge
            );
            return Ok(report);
        }

        let squashed = squash::squash(&self.vcs, &self.request, &self.plan)
            .await
            .with_context(|| format!("failed to squash onto {}", self.plan.output))?;
        self.advance(UpdateStage::Squashed)?;
        report.squash = Some(squashed);

        if self.request.push {
            self.vcs
                .push_branch(DEFAULT_REMOTE, &self.plan.output)
                .await
                .with_context(|| format!("failed to push {}", self.plan.output))?;
            info!("Pushed {} to {}", self.plan.output, DEFAULT_REMOTE);
            report.pushed = true;
        }

        report.stage = self.stage;
        Ok(report)
    }

    /// Opens the pull request and/or issue for the squashed branch.
    ///
    /// Does nothing unless the request asked for it. Requires a completed
    /// squash.
    pub async fn publish(
        &mut self,
        gh: &GhCli,
        templates: &TemplateSettings,
    ) -> Result<Option<PublishOutcome>> {
        let options = PublishOptions {
            open_pr: self.request.open_pull_request,
            open_issue: self.request.open_issue,
        };
        if !options.any() {
            return Ok(None);
        }
        if self.stage != UpdateStage::Squashed {
            warn!("Nothing to publish: the update did not reach the squash stage");
            return Ok(None);
        }

        let data = self.request.template_data(&self.plan.output);
        let outcome = gh
            .publish(options, templates, &data, &self.request.base_branch)
            .await
            .with_context(|| format!("failed to publish {}", self.plan.output))?;
        self.advance(UpdateStage::Published)?;
        Ok(outcome)
    }
}
