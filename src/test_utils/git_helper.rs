//! Git test helper utilities
//!
//! Synchronous wrapper around the `git` binary for setting up and inspecting
//! fixture repositories. Production code goes through [`crate::git::GitCli`];
//! tests use this to stay independent of the code under test.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Git command runner bound to one repository.
pub struct TestGit {
    repo_path: PathBuf,
}

impl TestGit {
    fn run_git_command(&self, args: &[&str], action: &str) -> Result<std::process::Output> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .output()
            .with_context(|| action.to_string())?;

        if !output.status.success() {
            bail!("{} failed: {}", action, String::from_utf8_lossy(&output.stderr));
        }

        Ok(output)
    }

    /// Create a new TestGit instance for the given repository path
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.repo_path
    }

    /// Runs an arbitrary git command and returns trimmed stdout.
    pub fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.run_git_command(args, &format!("git {}", args.join(" ")))?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Initialize a repository whose initial branch is `main`
    pub fn init(&self) -> Result<()> {
        self.run_git_command(&["init"], "Failed to initialize git repository")?;
        self.run_git_command(
            &["symbolic-ref", "HEAD", "refs/heads/main"],
            "Failed to set initial branch",
        )?;
        Ok(())
    }

    /// Configure git user for tests
    pub fn config_user(&self) -> Result<()> {
        self.run_git_command(
            &["config", "user.email", "test@kb-update.example"],
            "Failed to configure git user email",
        )?;
        self.run_git_command(
            &["config", "user.name", "Test User"],
            "Failed to configure git user name",
        )?;
        self.run_git_command(
            &["config", "commit.gpgsign", "false"],
            "Failed to disable commit signing",
        )?;
        Ok(())
    }

    /// Stage everything, including deletions
    pub fn add_all(&self) -> Result<()> {
        self.run_git_command(&["add", "--all"], "Failed to add files to git")?;
        Ok(())
    }

    pub fn commit(&self, message: &str) -> Result<()> {
        self.run_git_command(&["commit", "-m", message], "Failed to create git commit")?;
        Ok(())
    }

    /// Writes, stages and commits in one go.
    pub fn commit_all(&self, message: &str) -> Result<()> {
        self.add_all()?;
        self.commit(message)
    }

    pub fn checkout(&self, branch: &str) -> Result<()> {
        self.run_git_command(&["checkout", branch], &format!("Failed to checkout {branch}"))?;
        Ok(())
    }

    /// Create and switch to a new branch
    pub fn create_branch(&self, branch: &str) -> Result<()> {
        self.run_git_command(
            &["checkout", "-b", branch],
            &format!("Failed to create branch {branch}"),
        )?;
        Ok(())
    }

    pub fn current_branch(&self) -> Result<String> {
        self.run(&["rev-parse", "--abbrev-ref", "HEAD"])
    }

    pub fn status_porcelain(&self) -> Result<String> {
        self.run(&["status", "--porcelain"])
    }

    pub fn branch_exists(&self, branch: &str) -> bool {
        Command::new("git")
            .args(["rev-parse", "--verify", "--quiet", &format!("refs/heads/{branch}")])
            .current_dir(&self.repo_path)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Local branch names.
    pub fn branches(&self) -> Result<Vec<String>> {
        let out = self.run(&["for-each-ref", "--format=%(refname:short)", "refs/heads"])?;
        Ok(out.lines().map(String::from).collect())
    }

    /// Contents of `path` at `rev`.
    pub fn show_file(&self, rev: &str, path: &str) -> Result<String> {
        let output = self.run_git_command(
            &["show", &format!("{rev}:{path}")],
            &format!("Failed to show {path} at {rev}"),
        )?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Whether `path` exists in the tree of `rev`.
    pub fn file_exists_at(&self, rev: &str, path: &str) -> bool {
        Command::new("git")
            .args(["cat-file", "-e", &format!("{rev}:{path}")])
            .current_dir(&self.repo_path)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Tree object id of `rev`.
    pub fn tree_id(&self, rev: &str) -> Result<String> {
        self.run(&["rev-parse", &format!("{rev}^{{tree}}")])
    }

    /// Commit subjects reachable from `rev`, newest first.
    pub fn log_messages(&self, rev: &str) -> Result<Vec<String>> {
        let out = self.run(&["log", "--format=%s", rev])?;
        Ok(out.lines().map(String::from).collect())
    }

    /// Number of commits in `from..to`.
    pub fn count_commits(&self, from: &str, to: &str) -> Result<usize> {
        let out = self.run(&["rev-list", "--count", &format!("{from}..{to}")])?;
        out.parse().with_context(|| format!("unexpected rev-list output: {out}"))
    }

    /// Writes `content` to `rel` inside the repository, creating parents.
    pub fn write_file(&self, rel: &str, content: &str) -> Result<()> {
        let path = self.repo_path.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content).with_context(|| format!("Failed to write {rel}"))
    }

    pub fn read_file(&self, rel: &str) -> Result<String> {
        std::fs::read_to_string(self.repo_path.join(rel))
            .with_context(|| format!("Failed to read {rel}"))
    }
}
