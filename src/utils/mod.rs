//! Cross-platform utilities: platform naming, directory wiping and logging setup.

pub mod fs;
pub mod logging;
pub mod platform;

pub use fs::{clean_directory, make_executable};
pub use logging::init_logging;
pub use platform::{Platform, get_git_command, is_windows};
