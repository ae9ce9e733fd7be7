//! Version-control driver for the update engine.
//!
//! The branch builders never spawn git themselves. They talk to a
//! [`VcsDriver`], a narrow capability set (branch, checkout, stage, commit,
//! merge, restore, query) whose production implementation, [`GitCli`], shells
//! out to the system `git` through [`command_builder::GitCommand`]. Tests swap
//! in a recording mock.
//!
//! # Exit-code interpretation
//!
//! This module is the only place where git exit codes get a meaning:
//!
//! | Operation | Exit | Outcome |
//! |-----------|------|---------|
//! | `merge --no-commit` | 0 | [`MergeStatus::Clean`] |
//! | `merge --no-commit` | 1 + unmerged paths | [`MergeStatus::Conflicted`] |
//! | `merge --no-commit` | 1, nothing unmerged | [`UpdateError::GitCommandError`] |
//! | `commit` | 1 + "nothing to commit" | [`CommitOutcome::NothingToCommit`] |
//! | anything | other non-zero | [`UpdateError::GitCommandError`] |
//!
//! Nothing here retries.

pub mod command_builder;

use anyhow::{Context, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::UpdateError;
use crate::git::command_builder::GitCommand;
use crate::utils::clean_directory;

/// Result of a no-autocommit merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStatus {
    Clean,
    /// Conflict markers were left in the working tree.
    Conflicted,
}

/// Result of a commit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// The index matched HEAD; no commit was created.
    NothingToCommit,
}

/// Whether commit hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPolicy {
    Run,
    /// `--no-verify`
    Skip,
}

/// Version-control capabilities the update engine relies on.
///
/// All operations act on the repository at [`VcsDriver::root`] and are
/// strictly sequential; implementations may assume exclusive access.
pub trait VcsDriver: Send + Sync {
    /// Repository root (the working directory of every operation).
    fn root(&self) -> &Path;

    fn is_repository(&self) -> impl Future<Output = Result<bool>> + Send;

    /// `checkout -b <name>` from the current HEAD.
    fn create_and_checkout_branch(&self, name: &str) -> impl Future<Output = Result<()>> + Send;

    /// `checkout -b <name> <base>`
    fn create_branch_from(&self, name: &str, base: &str)
    -> impl Future<Output = Result<()>> + Send;

    /// `checkout -B <name> <base>`: create, or reset an existing branch.
    fn force_branch_from(&self, name: &str, base: &str) -> impl Future<Output = Result<()>> + Send;

    fn checkout(&self, branch: &str) -> impl Future<Output = Result<()>> + Send;

    /// `checkout <branch> -- <path>`; `"."` overlays the whole tree.
    fn checkout_path_from(
        &self,
        branch: &str,
        path: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Deletes every top-level entry of the working tree except `keep`.
    fn clear_worktree(&self, keep: &[&str]) -> impl Future<Output = Result<()>> + Send;

    /// `add --all`
    fn stage_all(&self) -> impl Future<Output = Result<()>> + Send;

    fn commit(
        &self,
        message: &str,
        hooks: HookPolicy,
    ) -> impl Future<Output = Result<CommitOutcome>> + Send;

    /// `merge --no-edit --no-commit --no-ff <branch>`; exit 1 with unmerged
    /// paths means conflicts.
    fn merge_no_commit(&self, branch: &str) -> impl Future<Output = Result<MergeStatus>> + Send;

    /// `restore --source <from> --staged --worktree <path>`
    fn restore_path(&self, from_branch: &str, path: &str)
    -> impl Future<Output = Result<()>> + Send;

    /// `rev-parse --abbrev-ref HEAD`
    fn current_branch(&self) -> impl Future<Output = Result<String>> + Send;

    fn branch_exists(&self, name: &str) -> impl Future<Output = Result<bool>> + Send;

    fn working_tree_is_clean(&self) -> impl Future<Output = Result<bool>> + Send;

    /// Paths git reports as unmerged.
    fn conflicted_paths(&self) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Whether any tracked file still contains a conflict start marker.
    fn has_conflict_markers(&self) -> impl Future<Output = Result<bool>> + Send;

    fn last_commit_message(&self) -> impl Future<Output = Result<String>> + Send;

    /// `push --force-with-lease -u <remote> <branch>`
    fn push_branch(&self, remote: &str, branch: &str) -> impl Future<Output = Result<()>> + Send;
}

/// [`VcsDriver`] backed by the system `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
}

impl GitCli {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn git(&self) -> GitCommand {
        GitCommand::new().current_dir(&self.root)
    }

    fn at(&self, cmd: GitCommand) -> GitCommand {
        cmd.current_dir(&self.root)
    }
}

impl VcsDriver for GitCli {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn is_repository(&self) -> Result<bool> {
        let output = self.at(GitCommand::git_dir()).execute_unchecked().await?;
        Ok(output.success())
    }

    async fn create_and_checkout_branch(&self, name: &str) -> Result<()> {
        self.at(GitCommand::checkout_new_branch(name, None))
            .execute_success()
            .await
            .with_context(|| format!("failed to create branch {name}"))
    }

    async fn create_branch_from(&self, name: &str, base: &str) -> Result<()> {
        self.at(GitCommand::checkout_new_branch(name, Some(base)))
            .execute_success()
            .await
            .with_context(|| format!("failed to create branch {name} from {base}"))
    }

    async fn force_branch_from(&self, name: &str, base: &str) -> Result<()> {
        self.at(GitCommand::checkout_branch(name, base))
            .execute_success()
            .await
            .with_context(|| format!("failed to reset branch {name} to {base}"))
    }

    async fn checkout(&self, branch: &str) -> Result<()> {
        self.at(GitCommand::checkout(branch))
            .execute_success()
            .await
            .with_context(|| format!("failed to checkout {branch}"))
    }

    async fn checkout_path_from(&self, branch: &str, path: &str) -> Result<()> {
        self.at(GitCommand::checkout_path(branch, path))
            .execute_success()
            .await
            .with_context(|| format!("failed to checkout {path} from {branch}"))
    }

    async fn clear_worktree(&self, keep: &[&str]) -> Result<()> {
        clean_directory(&self.root, keep).await?;
        Ok(())
    }

    async fn stage_all(&self) -> Result<()> {
        self.at(GitCommand::add_all()).execute_success().await.context("failed to stage changes")
    }

    async fn commit(&self, message: &str, hooks: HookPolicy) -> Result<CommitOutcome> {
        let output = self
            .at(GitCommand::commit(message, hooks == HookPolicy::Skip))
            .execute_unchecked()
            .await?;

        if output.success() {
            return Ok(CommitOutcome::Committed);
        }

        if output.exit_code == Some(1) && is_nothing_to_commit(&output.combined()) {
            debug!(target: "git", "Nothing to commit for: {}", message.lines().next().unwrap_or(""));
            return Ok(CommitOutcome::NothingToCommit);
        }

        Err(output.into_error("commit").into())
    }

    async fn merge_no_commit(&self, branch: &str) -> Result<MergeStatus> {
        let output = self.at(GitCommand::merge_no_commit(branch)).execute_unchecked().await?;

        match output.exit_code {
            Some(0) => Ok(MergeStatus::Clean),
            // Exit 1 also covers merges that never started (unknown
            // branch, untracked files in the way); only unmerged paths
            // mean conflicts.
            Some(1) if !self.conflicted_paths().await?.is_empty() => Ok(MergeStatus::Conflicted),
            _ => Err(output.into_error(format!("merge {branch}")).into()),
        }
    }

    async fn restore_path(&self, from_branch: &str, path: &str) -> Result<()> {
        self.at(GitCommand::restore(from_branch, path))
            .execute_success()
            .await
            .with_context(|| format!("failed to restore {path} from {from_branch}"))
    }

    async fn current_branch(&self) -> Result<String> {
        self.at(GitCommand::current_branch()).execute_stdout().await
    }

    async fn branch_exists(&self, name: &str) -> Result<bool> {
        let output = self
            .at(GitCommand::verify_ref(&format!("refs/heads/{name}")))
            .execute_unchecked()
            .await?;
        Ok(output.success())
    }

    async fn working_tree_is_clean(&self) -> Result<bool> {
        let status = self.at(GitCommand::status_porcelain()).execute_stdout().await?;
        Ok(status.is_empty())
    }

    async fn conflicted_paths(&self) -> Result<Vec<String>> {
        let stdout = self.at(GitCommand::conflicted_paths()).execute_stdout().await?;
        Ok(stdout.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from).collect())
    }

    async fn has_conflict_markers(&self) -> Result<bool> {
        // git grep exits 1 when nothing matches
        let output = self
            .git()
            .args(["grep", "-I", "-l", "-e", "^<<<<<<< "])
            .execute_unchecked()
            .await?;

        match output.exit_code {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(output.into_error("grep").into()),
        }
    }

    async fn last_commit_message(&self) -> Result<String> {
        self.at(GitCommand::last_commit_message()).execute_stdout().await
    }

    async fn push_branch(&self, remote: &str, branch: &str) -> Result<()> {
        self.at(GitCommand::push_branch(remote, branch))
            .execute_success()
            .await
            .with_context(|| format!("failed to push {branch} to {remote}"))
    }
}

fn is_nothing_to_commit(output: &str) -> bool {
    output.contains("nothing to commit")
        || output.contains("nothing added to commit")
        || output.contains("no changes added to commit")
}

/// Checks whether git can be executed.
pub async fn is_git_installed() -> bool {
    GitCommand::new().arg("--version").execute_success().await.is_ok()
}

/// Fails with [`UpdateError::GitNotFound`] when git is unavailable.
pub async fn ensure_git_available() -> Result<()> {
    if !is_git_installed().await {
        return Err(UpdateError::GitNotFound.into());
    }
    Ok(())
}
