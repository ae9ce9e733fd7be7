//! Pull-request and issue creation through the `gh` CLI.
//!
//! The CLI is treated as an opaque external command: `--version` probes for
//! it, `pr create` and `issue create` do the work. When a pull request cannot
//! be opened and issue creation is enabled, an issue asking for a manual PR is
//! opened instead.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::TemplateSettings;
use crate::core::UpdateError;
use crate::templating::{TemplateData, render_issue, render_pull_request};

/// What the publishing step should attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOptions {
    pub open_pr: bool,
    pub open_issue: bool,
}

impl PublishOptions {
    #[must_use]
    pub const fn any(&self) -> bool {
        self.open_pr || self.open_issue
    }
}

/// What the publishing step actually did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    PullRequest {
        url: String,
    },
    /// Issue opened on its own (`open_issue` only).
    Issue {
        url: String,
    },
    /// Issue opened because the pull request failed.
    IssueFallback {
        url: String,
        pr_error: String,
    },
}

/// Thin wrapper over the `gh` executable.
#[derive(Debug, Clone)]
pub struct GhCli {
    command: String,
    repo_root: PathBuf,
}

impl GhCli {
    pub fn new(command: impl Into<String>, repo_root: impl AsRef<Path>) -> Self {
        Self {
            command: command.into(),
            repo_root: repo_root.as_ref().to_path_buf(),
        }
    }

    async fn run(&self, operation: &str, args: &[&str]) -> Result<String> {
        debug!("Executing command: {} {}", self.command, args.join(" "));

        let output = Command::new(&self.command)
            .args(args)
            .current_dir(&self.repo_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    anyhow::Error::from(UpdateError::PlatformCliNotFound {
                        command: self.command.clone(),
                    })
                } else {
                    anyhow::Error::from(e).context(format!("Failed to execute {}", self.command))
                }
            })?;

        if !output.status.success() {
            return Err(UpdateError::PlatformCommandFailed {
                operation: operation.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Fails with [`UpdateError::PlatformCliNotFound`] unless `<gh> --version` succeeds.
    pub async fn probe(&self) -> Result<()> {
        match self.run("gh --version", &["--version"]).await {
            Ok(version) => {
                debug!("Using {}", version.lines().next().unwrap_or_default());
                Ok(())
            }
            Err(_) => Err(UpdateError::PlatformCliNotFound {
                command: self.command.clone(),
            }
            .into()),
        }
    }

    /// Opens a pull request from `head` into `base`; returns the PR URL.
    pub async fn create_pull_request(
        &self,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<String> {
        self.run(
            "pr create",
            &["pr", "create", "--head", head, "--base", base, "--title", title, "--body", body],
        )
        .await
    }

    /// Opens an issue; returns the issue URL.
    pub async fn create_issue(&self, title: &str, body: &str) -> Result<String> {
        self.run("issue create", &["issue", "create", "--title", title, "--body", body]).await
    }

    /// Runs the publishing policy for a squashed output branch.
    ///
    /// - `open_pr`: open a PR; on failure fall back to an issue when
    ///   `open_issue` is also set, otherwise fail.
    /// - `open_issue` alone: open only the issue.
    ///
    /// All text is rendered before anything is executed, so template errors
    /// never leave a half-published state.
    pub async fn publish(
        &self,
        options: PublishOptions,
        templates: &TemplateSettings,
        data: &TemplateData,
        base_branch: &str,
    ) -> Result<Option<PublishOutcome>> {
        if !options.any() {
            return Ok(None);
        }

        let pr_text = render_pull_request(templates, data)?;
        let issue_text = render_issue(templates, data)?;

        self.probe().await?;

        if options.open_pr {
            match self
                .create_pull_request(&data.branch_name, base_branch, &pr_text.title, &pr_text.body)
                .await
            {
                Ok(url) => {
                    info!("Opened pull request {}", url);
                    return Ok(Some(PublishOutcome::PullRequest {
                        url,
                    }));
                }
                Err(e) if options.open_issue => {
                    warn!("Failed to open pull request ({}); opening an issue instead", e);
                    let url = self.create_issue(&issue_text.title, &issue_text.body).await?;
                    info!("Opened issue {}", url);
                    return Ok(Some(PublishOutcome::IssueFallback {
                        url,
                        pr_error: e.to_string(),
                    }));
                }
                Err(e) => return Err(e),
            }
        }

        let url = self.create_issue(&issue_text.title, &issue_text.body).await?;
        info!("Opened issue {}", url);
        Ok(Some(PublishOutcome::Issue {
            url,
        }))
    }
}
