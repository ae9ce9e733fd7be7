//! Invocation of the external scaffolding generator.
//!
//! The generator is opaque: it is run as `<binary> alpha generate` with the
//! repository root as working directory, reads the `PROJECT` descriptor and
//! writes regenerated files in place. Exit code 0 is success, anything else
//! is fatal.
//!
//! The binary is always invoked by its full path. Its own directory is
//! prepended to the *child's* `PATH` so that any nested lookup of the
//! generator name resolves to the same version; the engine's environment is
//! never modified.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::GeneratorSettings;
use crate::constants::GENERATOR_NAME;
use crate::core::UpdateError;
use crate::release::DownloadedBinary;
use crate::version::ReleaseVersion;

/// Something that can regenerate scaffolding in a repository.
pub trait ScaffoldGenerator: Send + Sync {
    /// Human-readable label for logs and error messages.
    fn describe(&self) -> String;

    /// Regenerates scaffolding under `repo_root`.
    fn generate(&self, repo_root: &Path) -> impl Future<Output = Result<()>> + Send;
}

/// A generator executable on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorBinary {
    path: PathBuf,
    label: String,
    make_targets: Vec<String>,
}

impl GeneratorBinary {
    pub fn new(path: impl Into<PathBuf>, label: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            label: label.into(),
            make_targets: Vec::new(),
        }
    }

    /// Wraps a binary fetched for a specific release.
    #[must_use]
    pub fn from_download(download: &DownloadedBinary) -> Self {
        Self::new(&download.binary, format!("{} {}", GENERATOR_NAME, download.version))
    }

    /// Finds the locally installed generator.
    ///
    /// An explicit `settings.path` must exist; otherwise the generator name is
    /// looked up on `PATH`. Returns `Ok(None)` when nothing is installed.
    pub fn locate_local(settings: &GeneratorSettings) -> Result<Option<Self>> {
        if let Some(path) = &settings.path {
            if !path.exists() {
                return Err(UpdateError::GeneratorNotFound {
                    name: path.display().to_string(),
                }
                .into());
            }
            return Ok(Some(Self::new(path, format!("{} (local)", path.display()))));
        }

        match which::which(GENERATOR_NAME) {
            Ok(path) => {
                debug!(target: "generator", "Found local generator at {}", path.display());
                let label = format!("{} (local)", path.display());
                Ok(Some(Self::new(path, label)))
            }
            Err(_) => Ok(None),
        }
    }

    /// Runs `make <targets>` after each successful generation (best effort).
    #[must_use]
    pub fn with_make_targets(mut self, targets: Vec<String>) -> Self {
        self.make_targets = targets;
        self
    }

    /// Applies the make-target part of `settings`.
    #[must_use]
    pub fn configured(self, settings: &GeneratorSettings) -> Self {
        if settings.run_make_targets {
            self.with_make_targets(settings.make_targets.clone())
        } else {
            self
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The release this binary reports through `<binary> version`.
    ///
    /// `Ok(None)` when the command fails or prints nothing recognizable.
    pub async fn reported_version(&self) -> Result<Option<ReleaseVersion>> {
        let output = Command::new(&self.path)
            .arg("version")
            .env("PATH", self.child_path()?)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    anyhow::Error::from(UpdateError::GeneratorNotFound {
                        name: self.path.display().to_string(),
                    })
                } else {
                    anyhow::Error::from(e).context(format!("Failed to execute {}", self.path.display()))
                }
            })?;

        if !output.status.success() {
            debug!(
                target: "generator",
                "{} version exited with {:?}",
                self.path.display(),
                output.status.code()
            );
            return Ok(None);
        }
        Ok(parse_version_output(&String::from_utf8_lossy(&output.stdout)))
    }

    /// `PATH` for the child: the binary's directory first, then the inherited value.
    fn child_path(&self) -> Result<OsString> {
        let inherited = std::env::var_os("PATH").unwrap_or_default();
        let mut entries: Vec<PathBuf> = Vec::new();
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            entries.push(dir.to_path_buf());
        }
        entries.extend(std::env::split_paths(&inherited));
        std::env::join_paths(entries).context("Failed to build PATH for generator")
    }
}

impl ScaffoldGenerator for GeneratorBinary {
    fn describe(&self) -> String {
        self.label.clone()
    }

    async fn generate(&self, repo_root: &Path) -> Result<()> {
        info!(target: "generator", "Running {} alpha generate", self.label);

        let output = Command::new(&self.path)
            .args(["alpha", "generate"])
            .current_dir(repo_root)
            .env("PATH", self.child_path()?)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    anyhow::Error::from(UpdateError::GeneratorNotFound {
                        name: self.path.display().to_string(),
                    })
                } else {
                    anyhow::Error::from(e)
                        .context(format!("Failed to execute {}", self.path.display()))
                }
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stdout.lines().chain(stderr.lines()) {
            debug!(target: "generator", "{}", line);
        }

        if !output.status.success() {
            return Err(UpdateError::GeneratorFailed {
                binary: self.label.clone(),
                exit_code: output.status.code(),
                stderr: stderr.into_owned(),
            }
            .into());
        }

        info!(target: "generator", "Successfully ran alpha generate using {}", self.label);

        if !self.make_targets.is_empty() {
            run_make_targets(repo_root, &self.make_targets).await;
        }
        Ok(())
    }
}

/// Extracts the release from `version` output.
///
/// Understands `KubeBuilderVersion:"4.6.0"` and falls back to the first
/// token that parses as a release (`v4.6.0`, `4.6.0`).
#[must_use]
pub fn parse_version_output(output: &str) -> Option<ReleaseVersion> {
    const FIELD: &str = "KubeBuilderVersion:\"";

    if let Some(start) = output.find(FIELD) {
        let rest = &output[start + FIELD.len()..];
        return rest.split('"').next().and_then(|v| ReleaseVersion::parse(v).ok());
    }

    output
        .split(|c: char| c.is_whitespace() || matches!(c, '"' | ',' | '{' | '}' | '(' | ')'))
        .find_map(|token| ReleaseVersion::parse(token).ok())
}

/// Runs `make <targets>` if the repository has a Makefile.
///
/// Failures (including a missing `make`) are logged as warnings only.
pub async fn run_make_targets(repo_root: &Path, targets: &[String]) {
    if !repo_root.join("Makefile").exists() {
        debug!(target: "generator", "No Makefile in {}, skipping make targets", repo_root.display());
        return;
    }

    info!(target: "generator", "Running make {}", targets.join(" "));
    let result = Command::new("make")
        .args(targets)
        .current_dir(repo_root)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await;

    match result {
        Ok(output) if output.status.success() => {
            debug!(target: "generator", "make {} succeeded", targets.join(" "));
        }
        Ok(output) => warn!(
            target: "generator",
            "make {} failed (exit {:?}): {}",
            targets.join(" "),
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        ),
        Err(e) => warn!(target: "generator", "Could not run make: {}", e),
    }
}
