//! Branch naming for one update run.

use chrono::{DateTime, TimeZone};

use crate::constants::{EPHEMERAL_BRANCH_PREFIX, OUTPUT_BRANCH_PREFIX};
use crate::version::ReleaseVersion;

/// The branches one run creates.
///
/// Ephemeral branch names carry the version pair and a timestamp so repeated
/// runs never collide; the output branch name is stable per target version so
/// a re-run refreshes the same pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchPlan {
    /// Clean scaffold at the source version.
    pub ancestor: String,
    /// Ancestor plus the user's tree.
    pub original: String,
    /// Clean scaffold at the target version.
    pub upgrade: String,
    /// Original with upgrade merged in.
    pub merge: String,
    /// Squashed result; only created when squashing.
    pub output: String,
}

impl BranchPlan {
    /// Builds the plan; `stamp` distinguishes runs (see [`run_stamp`]).
    #[must_use]
    pub fn new(
        source: &ReleaseVersion,
        target: &ReleaseVersion,
        output_override: Option<&str>,
        stamp: &str,
    ) -> Self {
        let run_id = format!("{source}-to-{target}-{stamp}");
        let ephemeral = |role: &str| format!("{EPHEMERAL_BRANCH_PREFIX}-{role}-{run_id}");

        let output = output_override
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map_or_else(|| default_output_branch(target), ToString::to_string);

        Self {
            ancestor: ephemeral("ancestor"),
            original: ephemeral("original"),
            upgrade: ephemeral("upgrade"),
            merge: ephemeral("merge"),
            output,
        }
    }

    /// The four temporary branches, in creation order.
    #[must_use]
    pub fn ephemeral(&self) -> [&str; 4] {
        [&self.ancestor, &self.original, &self.upgrade, &self.merge]
    }
}

/// `kubebuilder-alpha-update-to-<target>`
#[must_use]
pub fn default_output_branch(target: &ReleaseVersion) -> String {
    format!("{OUTPUT_BRANCH_PREFIX}{target}")
}

/// Second-resolution run stamp, e.g. `20250101093000`.
pub fn run_stamp<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%Y%m%d%H%M%S").to_string()
}
