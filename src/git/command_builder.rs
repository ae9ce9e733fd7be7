//! Type-safe Git command builder for consistent command execution
//!
//! Every git invocation made by the update engine goes through [`GitCommand`],
//! so exit-code handling, logging and error wrapping live in one place.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::core::UpdateError;
use crate::utils::platform::get_git_command;

/// Fluent builder for a single git invocation.
///
/// # Examples
///
/// ```rust,ignore
/// use kb_update::git::command_builder::GitCommand;
///
/// # async fn example() -> anyhow::Result<()> {
/// let status = GitCommand::new()
///     .args(["status", "--porcelain"])
///     .current_dir("/path/to/repo")
///     .execute_stdout()
///     .await?;
///
/// // Merge may legitimately exit with 1; inspect the code instead of failing.
/// let output = GitCommand::merge_no_commit("tmp-upgrade")
///     .current_dir("/path/to/repo")
///     .execute_unchecked()
///     .await?;
/// if output.exit_code == Some(1) {
///     println!("conflicts");
/// }
/// # Ok(())
/// # }
/// ```
///
/// # Default Configuration
///
/// - **Timeout**: none; the engine relies on git's own behavior
/// - **Working directory**: current process directory unless set
#[derive(Debug, Default)]
pub struct GitCommand {
    /// Command arguments passed to git (e.g. `["checkout", "-b", "name"]`)
    args: Vec<String>,

    /// Working directory, passed to git as `-C <dir>`
    current_dir: Option<PathBuf>,

    /// Optional context string for log lines
    context: Option<String>,
}

impl GitCommand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// The git subcommand, used to name failures (`checkout`, `merge`, ...).
    fn operation(&self) -> String {
        self.args.first().cloned().unwrap_or_else(|| "unknown".to_string())
    }

    /// Runs the command and returns its output whatever the exit code.
    ///
    /// Only a failure to spawn git is an error here; callers that
    /// give meaning to specific non-zero codes use this and classify themselves.
    pub async fn execute_unchecked(self) -> Result<GitCommandOutput> {
        let start = std::time::Instant::now();
        let git_command = get_git_command();
        let mut cmd = Command::new(git_command);

        let mut full_args = Vec::new();
        if let Some(ref dir) = self.current_dir {
            full_args.push("-C".to_string());
            full_args.push(dir.display().to_string());
        }
        full_args.extend(self.args.iter().cloned());
        cmd.args(&full_args);

        if let Some(ref ctx) = self.context {
            tracing::debug!(target: "git", "({}) Executing command: {} {}", ctx, git_command, full_args.join(" "));
        } else {
            tracing::debug!(target: "git", "Executing command: {} {}", git_command, full_args.join(" "));
        }

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let output = map_spawn_error(cmd.output().await, &full_args)?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let exit_code = output.status.code();

        if !stdout.trim().is_empty() {
            tracing::debug!(target: "git", "{}", stdout.trim());
        }
        if !stderr.trim().is_empty() {
            tracing::debug!(target: "git", "{}", stderr.trim());
        }

        let elapsed = start.elapsed();
        if elapsed.as_secs() > 1 {
            tracing::info!(target: "git::perf", "Git {} took {:.2}s", self.operation(), elapsed.as_secs_f64());
        } else if elapsed.as_millis() > 100 {
            tracing::debug!(target: "git::perf", "Git {} took {}ms", self.operation(), elapsed.as_millis());
        }

        Ok(GitCommandOutput {
            stdout,
            stderr,
            exit_code,
        })
    }

    /// Runs the command, failing on any non-zero exit.
    pub async fn execute(self) -> Result<GitCommandOutput> {
        let operation = self.operation();
        let output = self.execute_unchecked().await?;

        if !output.success() {
            tracing::debug!(target: "git", "Command failed with exit code: {:?}", output.exit_code);
            return Err(output.into_error(operation).into());
        }

        Ok(output)
    }

    pub async fn execute_stdout(self) -> Result<String> {
        let output = self.execute().await?;
        Ok(output.stdout.trim().to_string())
    }

    pub async fn execute_success(self) -> Result<()> {
        self.execute().await?;
        Ok(())
    }
}

fn map_spawn_error(
    result: std::io::Result<std::process::Output>,
    full_args: &[String],
) -> Result<std::process::Output> {
    match result {
        Ok(output) => Ok(output),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(UpdateError::GitNotFound.into()),
        Err(e) => Err(e).context(format!("Failed to execute git {}", full_args.join(" "))),
    }
}

/// Output from a git command
#[derive(Debug, Clone, Default)]
pub struct GitCommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl GitCommandOutput {
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }

    /// stdout and stderr together, for message matching.
    #[must_use]
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }

    /// Wraps a failed invocation into [`UpdateError::GitCommandError`].
    #[must_use]
    pub fn into_error(self, operation: impl Into<String>) -> UpdateError {
        UpdateError::GitCommandError {
            operation: operation.into(),
            exit_code: self.exit_code,
            stdout: self.stdout,
            stderr: self.stderr,
        }
    }
}

// Convenience builders for the operations the update engine issues

impl GitCommand {
    pub fn checkout(ref_name: &str) -> Self {
        Self::new().args(["checkout", ref_name])
    }

    /// `checkout -b <name> [<start>]`
    pub fn checkout_new_branch(name: &str, start: Option<&str>) -> Self {
        let cmd = Self::new().args(["checkout", "-b", name]);
        match start {
            Some(start) => cmd.arg(start),
            None => cmd,
        }
    }

    /// `checkout -B <name> <start>`: create or reset.
    pub fn checkout_branch(branch_name: &str, start: &str) -> Self {
        Self::new().args(["checkout", "-B", branch_name, start])
    }

    /// `checkout <branch> -- <path>`
    pub fn checkout_path(branch: &str, path: &str) -> Self {
        Self::new().args(["checkout", branch, "--", path])
    }

    pub fn add_all() -> Self {
        Self::new().args(["add", "--all"])
    }

    pub fn commit(message: &str, no_verify: bool) -> Self {
        let cmd = Self::new().arg("commit");
        let cmd = if no_verify { cmd.arg("--no-verify") } else { cmd };
        cmd.args(["-m", message])
    }

    pub fn merge_no_commit(branch: &str) -> Self {
        Self::new().args(["merge", "--no-edit", "--no-commit", "--no-ff", branch])
    }

    pub fn restore(source: &str, path: &str) -> Self {
        Self::new().args(["restore", "--source", source, "--staged", "--worktree", "--", path])
    }

    pub fn current_branch() -> Self {
        Self::new().args(["rev-parse", "--abbrev-ref", "HEAD"])
    }

    pub fn verify_ref(ref_name: &str) -> Self {
        Self::new().args(["rev-parse", "--verify", "--quiet", ref_name])
    }

    pub fn git_dir() -> Self {
        Self::new().args(["rev-parse", "--git-dir"])
    }

    pub fn status_porcelain() -> Self {
        Self::new().args(["status", "--porcelain"])
    }

    pub fn conflicted_paths() -> Self {
        Self::new().args(["diff", "--name-only", "--diff-filter=U"])
    }

    pub fn last_commit_message() -> Self {
        Self::new().args(["log", "-1", "--pretty=%B"])
    }

    pub fn push_branch(remote: &str, branch: &str) -> Self {
        Self::new().args(["push", "--force-with-lease", "-u", remote, branch])
    }
}
