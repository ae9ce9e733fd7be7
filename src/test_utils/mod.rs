//! Test utilities for kb-update
//!
//! Helpers shared by unit and integration tests:
//! - [`TestGit`] drives a real repository with plain `git` calls
//! - [`MockVcs`] and [`MockGenerator`] record what the update engine asks for
//! - [`write_fake_generator`] writes a shell script that behaves like
//!   `kubebuilder alpha generate` for a given release
//!
//! Available in unit tests and, through the `test-utils` feature, in
//! integration tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use kb_update::test_utils::{TestGit, init_scaffolded_repo};
//!
//! let temp = tempfile::TempDir::new()?;
//! let git = init_scaffolded_repo(temp.path(), "v4.5.2")?;
//! assert_eq!(git.current_branch()?, "main");
//! ```

pub mod git_helper;
pub mod mocks;
pub mod scaffold;

pub use git_helper::TestGit;
pub use mocks::{MockGenerator, MockVcs};
pub use scaffold::{
    fake_generator_script, init_scaffolded_repo, project_file_content, scaffold_files,
    write_fake_generator,
};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` when given, otherwise
/// `RUST_LOG`; with neither, tests stay silent.
///
/// ```bash
/// RUST_LOG=git=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}

/// Writes an executable `/bin/sh` script named `name` into `dir`.
///
/// `body` is everything after the shebang line.
pub fn write_script(dir: &Path, name: &str, body: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}"))
        .with_context(|| format!("Failed to write script {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .with_context(|| format!("Failed to make {} executable", path.display()))?;
    }

    Ok(path)
}
