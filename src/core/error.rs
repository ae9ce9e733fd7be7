//! Error handling for the update engine
//!
//! Two layers work together here:
//! 1. [`UpdateError`] - strongly typed failures raised by the engine's components
//! 2. [`ErrorContext`] - a CLI-facing wrapper adding details and an actionable suggestion
//!
//! Library code returns [`anyhow::Result`] and attaches a stage prefix with
//! [`anyhow::Context`] at every step, so a failure reads like
//! `failed to prepare ancestor branch ...: git checkout failed`. The CLI calls
//! [`user_friendly_error`] once at the top to turn the chain back into a typed
//! error plus the stage trail.
//!
//! Merge conflicts and "nothing to commit" are outcomes, not errors, and never
//! appear in this enum.
//!
//! # Examples
//!
//! ```rust,ignore
//! use kb_update::core::{UpdateError, user_friendly_error};
//!
//! let err = anyhow::Error::from(UpdateError::GitNotFound).context("preflight failed");
//! user_friendly_error(err).display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// Broad classes used to decide how a failure is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad input detected before anything was mutated.
    Configuration,
    /// Download, probe or release index failures.
    Network,
    /// Non-zero exit from git, the generator or the platform CLI.
    ExternalTool,
    /// Engine invariants or unexpected local failures.
    Internal,
}

/// Typed failures produced by the update engine.
#[derive(Error, Debug)]
pub enum UpdateError {
    /// Git could not be executed at all.
    #[error("Git is not installed or not found in PATH")]
    GitNotFound,

    #[error("Not a git repository: {path}")]
    NotAGitRepository {
        path: String,
    },

    /// Uncommitted changes would be destroyed by the branch builders.
    #[error("Working directory has uncommitted changes: {path}")]
    DirtyWorkingTree {
        path: String,
    },

    #[error("Branch '{branch}' does not exist")]
    BranchNotFound {
        branch: String,
    },

    /// An ephemeral branch name collides with an existing branch.
    #[error("Branch '{branch}' already exists")]
    BranchAlreadyExists {
        branch: String,
    },

    #[error("No PROJECT file found at {path}")]
    ProjectFileNotFound {
        path: String,
    },

    #[error("Failed to parse PROJECT file {path}: {reason}")]
    ProjectFileParse {
        path: String,
        reason: String,
    },

    #[error("PROJECT file {path} does not record a cliVersion")]
    MissingCliVersion {
        path: String,
    },

    #[error("Invalid version '{version}': {reason}")]
    InvalidVersion {
        version: String,
        reason: String,
    },

    #[error("Target version {to} is older than source version {from}")]
    VersionDowngrade {
        from: String,
        to: String,
    },

    #[error("Release {version} not found at {url}")]
    ReleaseNotFound {
        version: String,
        url: String,
    },

    #[error("Unexpected HTTP {status} from {url}")]
    HttpStatus {
        url: String,
        status: u16,
    },

    #[error("Network error during {operation}: {reason}")]
    NetworkError {
        operation: String,
        reason: String,
    },

    #[error("Checksum mismatch for {artifact}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        artifact: String,
        expected: String,
        actual: String,
    },

    /// Any git failure other than the recognized merge-conflict exit.
    #[error("Git operation failed: {operation}")]
    GitCommandError {
        operation: String,
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("Generator '{name}' not found")]
    GeneratorNotFound {
        name: String,
    },

    #[error("Generator {binary} failed with exit code {}", .exit_code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    GeneratorFailed {
        binary: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to render template '{name}': {reason}")]
    TemplateError {
        name: String,
        reason: String,
    },

    #[error("{command} CLI not found")]
    PlatformCliNotFound {
        command: String,
    },

    #[error("{operation} failed: {stderr}")]
    PlatformCommandFailed {
        operation: String,
        stderr: String,
    },

    #[error("Invalid stage transition: {from} -> {to}")]
    InvalidStageTransition {
        from: String,
        to: String,
    },

    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{message}")]
    Other {
        message: String,
    },
}

impl UpdateError {
    /// Returns the reporting class of this error.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::NotAGitRepository { .. }
            | Self::DirtyWorkingTree { .. }
            | Self::BranchNotFound { .. }
            | Self::BranchAlreadyExists { .. }
            | Self::ProjectFileNotFound { .. }
            | Self::ProjectFileParse { .. }
            | Self::MissingCliVersion { .. }
            | Self::InvalidVersion { .. }
            | Self::VersionDowngrade { .. }
            | Self::ConfigError { .. } => ErrorClass::Configuration,
            Self::ReleaseNotFound { .. }
            | Self::HttpStatus { .. }
            | Self::NetworkError { .. }
            | Self::ChecksumMismatch { .. } => ErrorClass::Network,
            Self::GitNotFound
            | Self::GitCommandError { .. }
            | Self::GeneratorNotFound { .. }
            | Self::GeneratorFailed { .. }
            | Self::PlatformCliNotFound { .. }
            | Self::PlatformCommandFailed { .. } => ErrorClass::ExternalTool,
            Self::TemplateError { .. }
            | Self::InvalidStageTransition { .. }
            | Self::Io(_)
            | Self::Other { .. } => ErrorClass::Internal,
        }
    }
}

/// Error wrapper carrying the stage trail, details and a suggestion for display.
#[derive(Debug)]
pub struct ErrorContext {
    pub error: UpdateError,
    /// Outer context messages, outermost first (e.g. the failing stage).
    pub stage: Option<String>,
    pub suggestion: Option<String>,
    pub details: Option<String>,
}

impl ErrorContext {
    #[must_use]
    pub const fn new(error: UpdateError) -> Self {
        Self {
            error,
            stage: None,
            suggestion: None,
            details: None,
        }
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Prints the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(stage) = &self.stage {
            eprintln!("{}: {}", "while".cyan(), stage);
        }

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(stage) = &self.stage {
            write!(f, "\nWhile: {stage}")?;
        }

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Converts any error into an [`ErrorContext`] with suggestions.
///
/// If an [`UpdateError`] is found anywhere in the chain it becomes the headline
/// and the context messages wrapped around it become the stage trail. Other
/// errors keep their full "Caused by" chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let chain: Vec<String> = error.chain().map(ToString::to_string).collect();

    match error.downcast::<UpdateError>() {
        Ok(update_error) => {
            let headline = update_error.to_string();
            let stages: Vec<&str> = chain
                .iter()
                .map(String::as_str)
                .take_while(|message| *message != headline)
                .collect();

            let ctx = create_error_context(update_error);
            if stages.is_empty() {
                ctx
            } else {
                ctx.with_stage(stages.join(": "))
            }
        }
        Err(error) => {
            if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
                if io_error.kind() == std::io::ErrorKind::PermissionDenied {
                    return ErrorContext::new(UpdateError::Other {
                        message: error.to_string(),
                    })
                    .with_details(io_error.to_string())
                    .with_suggestion("Check file ownership and permissions in the repository");
                }
            }

            let mut message = error.to_string();
            if chain.len() > 1 {
                message.push_str("\n\nCaused by:");
                for (i, cause) in chain.iter().skip(1).enumerate() {
                    message.push_str(&format!("\n  {}: {}", i + 1, cause));
                }
            }

            ErrorContext::new(UpdateError::Other {
                message,
            })
        }
    }
}

/// Maps each typed error to tailored details and suggestions.
fn create_error_context(error: UpdateError) -> ErrorContext {
    let (details, suggestion): (Option<String>, Option<String>) = match &error {
        UpdateError::GitNotFound => (
            None,
            Some("Install git and make sure it is on PATH".to_string()),
        ),
        UpdateError::NotAGitRepository { .. } => (None, Some("Run the update from the root of a git repository".to_string())),
        UpdateError::DirtyWorkingTree { .. } => (
            Some("The update rewrites the working tree on temporary branches".to_string()),
            Some("Commit or stash your changes, then run the update again".to_string()),
        ),
        UpdateError::BranchNotFound {
            branch,
        } => (
            None,
            Some(format!("Create '{branch}' or pass an existing branch with --from-branch")),
        ),
        UpdateError::BranchAlreadyExists {
            branch,
        } => (
            Some("A previous run may have left its working branches behind".to_string()),
            Some(format!("Delete it with `git branch -D {branch}` and retry")),
        ),
        UpdateError::ProjectFileNotFound { .. } => (None, Some("Make sure you're in the project root directory".to_string())),
        UpdateError::ProjectFileParse { .. } => (None, Some("Check the YAML syntax of the PROJECT file".to_string())),
        UpdateError::MissingCliVersion { .. } => (None, Some("Pass the original version explicitly with --from-version".to_string())),
        UpdateError::InvalidVersion { .. } => (None, Some("Expect: X.X.X (Ex.: v4.5.0)".to_string())),
        UpdateError::VersionDowngrade { .. } => (None, Some("Choose a --to-version newer than --from-version".to_string())),
        UpdateError::ReleaseNotFound { .. } => (None, Some("Check the versions available in the kubebuilder releases".to_string())),
        UpdateError::HttpStatus { .. }
        | UpdateError::NetworkError { .. } => (
            Some("Nothing in the repository was changed by this failure".to_string()),
            Some("Check your network connection and run the command again".to_string()),
        ),
        UpdateError::ChecksumMismatch { .. } => (
            Some("The downloaded binary does not match the published checksum".to_string()),
            Some("Retry the download; report the release if the mismatch persists".to_string()),
        ),
        UpdateError::GitCommandError {
            exit_code,
            stdout,
            stderr,
            ..
        } => {
            let output = if stderr.trim().is_empty() { stdout } else { stderr };
            (
                Some(format!(
                    "exit code {}: {}",
                    exit_code.map_or_else(|| "none".to_string(), |c| c.to_string()),
                    output.trim()
                )),
                Some(
                    "Temporary branches are left in place; inspect them with `git branch`"
                        .to_string(),
                ),
            )
        }
        UpdateError::GeneratorNotFound { .. } => (None, Some("Install kubebuilder or set KB_UPDATE_GENERATOR".to_string())),
        UpdateError::GeneratorFailed {
            stderr,
            ..
        } => (Some(stderr.trim().to_string()).filter(|s| !s.is_empty()), None),
        UpdateError::TemplateError { .. } => (
            None,
            Some(
                "Templates may only reference from_version, to_version and branch_name"
                    .to_string(),
            ),
        ),
        UpdateError::PlatformCliNotFound { .. } => (None, Some("Install the GitHub CLI from https://cli.github.com".to_string())),
        UpdateError::PlatformCommandFailed { .. }
        | UpdateError::InvalidStageTransition { .. }
        | UpdateError::ConfigError { .. }
        | UpdateError::Io(_)
        | UpdateError::Other { .. } => (None, None),
    };

    let mut ctx = ErrorContext::new(error);
    if let Some(details) = details {
        ctx = ctx.with_details(details);
    }
    if let Some(suggestion) = suggestion {
        ctx = ctx.with_suggestion(suggestion);
    }
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_error_classes() {
        assert_eq!(
            UpdateError::InvalidVersion {
                version: "x".into(),
                reason: "bad".into()
            }
            .class(),
            ErrorClass::Configuration
        );
        assert_eq!(
            UpdateError::HttpStatus {
                url: "u".into(),
                status: 500
            }
            .class(),
            ErrorClass::Network
        );
        assert_eq!(UpdateError::GitNotFound.class(), ErrorClass::ExternalTool);
        assert_eq!(
            UpdateError::InvalidStageTransition {
                from: "a".into(),
                to: "b".into()
            }
            .class(),
            ErrorClass::Internal
        );
    }

    #[test]
    fn test_user_friendly_error_keeps_stage_trail() {
        let result: anyhow::Result<()> = Err(UpdateError::GitCommandError {
            operation: "checkout".into(),
            exit_code: Some(128),
            stdout: String::new(),
            stderr: "fatal: bad ref".into(),
        }
        .into());
        let err = result.context("failed to prepare ancestor branch").unwrap_err();

        let ctx = user_friendly_error(err);
        assert!(matches!(ctx.error, UpdateError::GitCommandError { .. }));
        assert_eq!(ctx.stage.as_deref(), Some("failed to prepare ancestor branch"));
        assert!(ctx.details.unwrap().contains("fatal: bad ref"));
    }

    #[test]
    fn test_user_friendly_error_generic_chain() {
        let err = anyhow::anyhow!("root cause").context("outer");
        let ctx = user_friendly_error(err);
        match ctx.error {
            UpdateError::Other {
                message,
            } => {
                assert!(message.starts_with("outer"));
                assert!(message.contains("Caused by:"));
                assert!(message.contains("root cause"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_error_context_display() {
        let ctx = ErrorContext::new(UpdateError::GitNotFound)
            .with_stage("preflight")
            .with_suggestion("install git");
        let rendered = ctx.to_string();
        assert!(rendered.contains("Git is not installed"));
        assert!(rendered.contains("While: preflight"));
        assert!(rendered.contains("Suggestion: install git"));
    }
}
