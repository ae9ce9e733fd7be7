//! Release version handling.
//!
//! Every version that reaches a download URL, a branch name or a comparison
//! goes through [`ReleaseVersion`], which always displays in the canonical
//! `vX.Y.Z` form regardless of whether the input carried the `v` prefix.
//!
//! ```rust,ignore
//! use kb_update::version::ReleaseVersion;
//!
//! let a = ReleaseVersion::parse("4.6.0")?;
//! let b = ReleaseVersion::parse("v4.6.0")?;
//! assert_eq!(a, b);
//! assert_eq!(a.to_string(), "v4.6.0");
//! ```

use semver::Version;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

use crate::core::UpdateError;
use crate::project::ProjectFile;

const INVALID_VERSION_HINT: &str = "invalid semantic version. Expect: X.X.X (Ex.: v4.5.0)";

/// A release version in canonical `vX.Y.Z` form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReleaseVersion(Version);

impl ReleaseVersion {
    /// Parses a version with or without the leading `v`.
    ///
    /// # Errors
    ///
    /// [`UpdateError::InvalidVersion`] when the input is not `X.Y.Z` semver.
    pub fn parse(input: &str) -> Result<Self, UpdateError> {
        let trimmed = input.trim();
        let bare = trimmed.strip_prefix('v').unwrap_or(trimmed);

        Version::parse(bare).map(Self).map_err(|e| UpdateError::InvalidVersion {
            version: input.to_string(),
            reason: format!("{INVALID_VERSION_HINT}: {e}"),
        })
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl FromStr for ReleaseVersion {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Normalizes a version string to canonical `vX.Y.Z`.
pub fn normalize(input: &str) -> Result<String, UpdateError> {
    ReleaseVersion::parse(input).map(|v| v.to_string())
}

/// The requested target: a concrete release or "whatever is newest".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetVersion {
    Explicit(ReleaseVersion),
    Latest,
}

impl TargetVersion {
    /// Builds the target from an optional override; blank input means latest.
    pub fn from_option(input: Option<&str>) -> Result<Self, UpdateError> {
        match input.map(str::trim) {
            Some(v) if !v.is_empty() => ReleaseVersion::parse(v).map(Self::Explicit),
            _ => Ok(Self::Latest),
        }
    }
}

/// Resolves the source version from an override or the project descriptor.
///
/// The override wins; otherwise the descriptor's `cliVersion` is used.
/// `project_path` is only used in error messages.
pub fn resolve_source(
    override_version: Option<&str>,
    project: &ProjectFile,
    project_path: &Path,
) -> anyhow::Result<ReleaseVersion> {
    let raw = match override_version.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => project.require_cli_version(project_path)?,
    };
    Ok(ReleaseVersion::parse(raw)?)
}

/// Rejects downgrades. Equal versions are allowed with a warning since the
/// merge then only reapplies user edits on identical scaffolding.
pub fn check_ordering(source: &ReleaseVersion, target: &ReleaseVersion) -> Result<(), UpdateError> {
    if target < source {
        return Err(UpdateError::VersionDowngrade {
            from: source.to_string(),
            to: target.to_string(),
        });
    }
    if target == source {
        warn!("Source and target versions are both {}; the update will not change scaffolding", source);
    }
    Ok(())
}
