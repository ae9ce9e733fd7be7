//! Well-known names shared across the update engine.
//!
//! Branch prefixes, file names and environment variable names live here so the
//! orchestration code and the tests agree on a single spelling.

/// Configuration descriptor the generator reads; survives every cleanup pass.
pub const PROJECT_FILE: &str = "PROJECT";

/// Version-control metadata directory; never touched by cleanup.
pub const GIT_DIR: &str = ".git";

/// Name of the scaffolding generator binary (also the release artifact prefix).
pub const GENERATOR_NAME: &str = "kubebuilder";

/// Default host serving release artifacts.
pub const DEFAULT_RELEASE_URL: &str = "https://github.com";

/// Default API endpoint used to look up the latest release.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

pub const DEFAULT_RELEASE_ORG: &str = "kubernetes-sigs";
pub const DEFAULT_RELEASE_REPO: &str = "kubebuilder";

/// Checksum manifest published next to the release artifacts.
pub const CHECKSUMS_FILE: &str = "checksums.txt";

/// Stable prefix for the squashed output branch.
pub const OUTPUT_BRANCH_PREFIX: &str = "kubebuilder-alpha-update-to-";

/// Prefix shared by all ephemeral working branches.
pub const EPHEMERAL_BRANCH_PREFIX: &str = "tmp-kb-update";

/// Collaboration-platform CLI used for pull requests and issues.
pub const DEFAULT_GH_COMMAND: &str = "gh";

/// `make` targets run after each regeneration (best effort).
pub const DEFAULT_MAKE_TARGETS: &[&str] = &["manifests", "generate", "fmt", "vet", "lint-fix"];

/// User agent sent with every release request.
pub const USER_AGENT: &str = concat!("kb-update/", env!("CARGO_PKG_VERSION"));

/// Explicit settings file location.
pub const ENV_CONFIG: &str = "KB_UPDATE_CONFIG";
pub const ENV_RELEASE_URL: &str = "KB_UPDATE_RELEASE_URL";
pub const ENV_API_URL: &str = "KB_UPDATE_API_URL";
pub const ENV_GENERATOR: &str = "KB_UPDATE_GENERATOR";
pub const ENV_GH: &str = "KB_UPDATE_GH";

pub const ENV_PR_TITLE: &str = "KUBEBUILDER_UPDATE_PR_TITLE";
pub const ENV_PR_BODY: &str = "KUBEBUILDER_UPDATE_PR_BODY";
pub const ENV_ISSUE_TITLE: &str = "KUBEBUILDER_UPDATE_ISSUE_TITLE";
pub const ENV_ISSUE_BODY: &str = "KUBEBUILDER_UPDATE_ISSUE_BODY";
