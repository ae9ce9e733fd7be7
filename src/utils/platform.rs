//! Platform detection for release artifacts and external commands.
//!
//! Release artifacts are named after Go's `GOOS`/`GOARCH` values, so the Rust
//! target names are translated here (`macos` -> `darwin`, `x86_64` -> `amd64`).

use std::fmt;

/// Operating system and architecture pair in release-artifact spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Detects the platform this process runs on.
    #[must_use]
    pub fn current() -> Self {
        Self::from_rust(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Translates Rust `OS`/`ARCH` constants into release-artifact names.
    #[must_use]
    pub fn from_rust(os: &str, arch: &str) -> Self {
        let os = match os {
            "macos" => "darwin",
            other => other,
        };
        let arch = match arch {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "x86" => "386",
            "powerpc64" if cfg!(target_endian = "little") => "ppc64le",
            other => other,
        };
        Self::new(os, arch)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.os, self.arch)
    }
}

#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Returns the git executable name for this platform.
#[must_use]
pub const fn get_git_command() -> &'static str {
    if is_windows() {
        "git.exe"
    } else {
        "git"
    }
}
