//! File system helpers used by the branch builders.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Removes every entry directly under `root` except the names in `keep`.
///
/// Both tracked and untracked entries go; the caller stages the deletion
/// afterwards. Returns the number of entries removed.
///
/// # Errors
///
/// Fails if `root` cannot be listed or an entry cannot be removed.
pub async fn clean_directory(root: &Path, keep: &[&str]) -> Result<usize> {
    let mut entries = fs::read_dir(root)
        .await
        .with_context(|| format!("Failed to read directory: {}", root.display()))?;

    let mut removed = 0;
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("Failed to read directory entry in {}", root.display()))?
    {
        let name = entry.file_name();
        if keep.iter().any(|k| name.as_os_str() == *k) {
            continue;
        }

        let path = entry.path();
        let file_type = entry
            .file_type()
            .await
            .with_context(|| format!("Failed to inspect {}", path.display()))?;

        if file_type.is_dir() {
            fs::remove_dir_all(&path)
                .await
                .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
        } else {
            fs::remove_file(&path)
                .await
                .with_context(|| format!("Failed to remove file: {}", path.display()))?;
        }
        removed += 1;
    }

    debug!("Removed {} entries from {}", removed, root.display());
    Ok(removed)
}

/// Marks a file executable (`0o755`). No-op on non-unix platforms.
pub async fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o755);
        fs::set_permissions(path, permissions)
            .await
            .with_context(|| format!("Failed to make {} executable", path.display()))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
